//! Shared types for the resource sync workspace
//!
//! Vendor-neutral resource models, sync scopes, error codes and small
//! utilities used by the reconciliation engine and its callers.

pub mod cloud;
pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use cloud::{MAX_TARGET_IDS, ResourceKind, SyncScope, Vendor};
pub use error::{AppError, AppResult, ErrorCategory, ErrorCode};
pub use serde::{Deserialize, Serialize};
