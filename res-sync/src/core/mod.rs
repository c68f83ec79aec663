//! Engine-wide configuration and errors

pub mod config;
pub mod error;

pub use config::{ChildFailurePolicy, ConfigError, DriverMode, KindOptions, SyncConfig};
pub use error::{SyncError, SyncResult};
