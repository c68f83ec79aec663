//! res-sync - cloud resource reconciliation engine
//!
//! Mirrors the resource inventories of TCloud, AWS, HuaWei, Azure and GCP
//! into a vendor-neutral store.
//!
//! # Module layout
//!
//! ```text
//! res-sync/src/
//! ├── core/       # configuration, errors
//! ├── cursor.rs   # offset / token / marker pagination
//! ├── source.rs   # cloud source contracts
//! ├── store/      # mirror store trait, in-memory and PostgreSQL backends
//! ├── diff/       # batch classification, field comparison helpers
//! ├── driver/     # sequential and pipelined reconcilers
//! ├── cascade/    # child passes under changed parents
//! ├── sweep.rs    # deletion of records gone from the cloud
//! ├── vendor/     # per-provider adapters and kinds
//! ├── service.rs  # one entry point per (vendor, kind)
//! └── utils/      # logging
//! ```

pub mod cascade;
pub mod core;
pub mod cursor;
pub mod diff;
pub mod driver;
pub mod report;
pub mod service;
pub mod source;
pub mod store;
pub mod sweep;
pub mod utils;
pub mod vendor;

pub use cascade::{ChildReconciler, ChildResync};
pub use core::{ChildFailurePolicy, DriverMode, KindOptions, SyncConfig, SyncError, SyncResult};
pub use diff::{MapContext, ParentRef, SyncKind};
pub use driver::Reconciler;
pub use report::{SyncReport, SyncStats};
pub use service::SyncService;
pub use source::{ChildSet, ChildSource, CloudSource, Page, SourceError, SourceResult};
pub use store::{InMemoryStore, MirrorStore, StoreError};

pub use utils::logger::{init_logger, init_logger_with_file};
