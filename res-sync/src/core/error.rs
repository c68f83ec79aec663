//! Sync error taxonomy

use crate::source::SourceError;
use crate::store::StoreError;
use shared::cloud::ScopeError;
use shared::error::{AppError, ErrorCode};
use shared::{ResourceKind, Vendor};
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a reconciliation run
#[derive(Debug, Error)]
pub enum SyncError {
    /// Cloud adapter failure; the sweep is skipped
    #[error("cloud source error: {0}")]
    Source(#[from] SourceError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("{kind} resync under parent {parent} failed: {source}")]
    ChildResync {
        kind: ResourceKind,
        parent: String,
        #[source]
        source: Box<SyncError>,
    },

    /// Rejected before any I/O
    #[error("invalid scope: {0}")]
    Validation(#[from] ScopeError),

    #[error("{} resources selected for deletion still exist in the cloud", .ids.len())]
    DeleteVerification { kind: ResourceKind, ids: Vec<String> },

    #[error("sync cancelled")]
    Cancelled,

    #[error("sync exceeded its deadline of {0:?}")]
    Timeout(Duration),

    #[error("sync task failed: {0}")]
    Task(String),

    #[error("{vendor} does not support {kind}")]
    UnsupportedKind { vendor: Vendor, kind: ResourceKind },

    #[error("no cloud adapter configured for {0}")]
    NotConfigured(Vendor),
}

pub type SyncResult<T> = Result<T, SyncError>;

impl SyncError {
    pub fn child(kind: ResourceKind, parent: impl Into<String>, source: SyncError) -> Self {
        Self::ChildResync {
            kind,
            parent: parent.into(),
            source: Box::new(source),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Source(e) => e.code(),
            Self::Store(e) => e.code(),
            Self::ChildResync { .. } => ErrorCode::ChildResyncFailed,
            Self::Validation(e) => e.code(),
            Self::DeleteVerification { .. } => ErrorCode::DeleteVerificationFailed,
            Self::Cancelled => ErrorCode::SyncCancelled,
            Self::Timeout(_) => ErrorCode::SyncTimeout,
            Self::Task(_) => ErrorCode::SyncTaskFailed,
            Self::UnsupportedKind { .. } => ErrorCode::UnsupportedKind,
            Self::NotConfigured(_) => ErrorCode::VendorNotConfigured,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<tokio::task::JoinError> for SyncError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}

impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        let code = err.code();
        if matches!(err, SyncError::Store(_) | SyncError::Task(_)) {
            tracing::error!(code = %code, error = %err, "sync failed");
        }
        let app = AppError::with_message(code, err.to_string());
        match err {
            SyncError::DeleteVerification { kind, ids } => app
                .with_detail("kind", kind.as_str())
                .with_detail("cloud_ids", ids),
            SyncError::ChildResync { kind, parent, .. } => app
                .with_detail("kind", kind.as_str())
                .with_detail("parent", parent),
            SyncError::UnsupportedKind { vendor, kind } => app
                .with_detail("vendor", vendor.as_str())
                .with_detail("kind", kind.as_str()),
            SyncError::NotConfigured(vendor) => app.with_detail("vendor", vendor.as_str()),
            _ => app,
        }
    }
}
