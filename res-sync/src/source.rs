//! Cloud source contracts
//!
//! Adapters wrap a provider SDK and never retry: throttling, auth and
//! transient failures surface unchanged as [`SourceError`].

use crate::cursor::Cursor;
use async_trait::async_trait;
use shared::SyncScope;
use shared::error::ErrorCode;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("transient failure: {0}")]
    Transient(String),
    #[error("api error {code}: {message}")]
    Api { code: String, message: String },
}

pub type SourceResult<T> = Result<T, SourceError>;

impl SourceError {
    pub fn api(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::RateLimited(_) => ErrorCode::CloudRateLimited,
            Self::Unauthorized(_) => ErrorCode::CloudUnauthorized,
            Self::NotFound(_) => ErrorCode::CloudNotFound,
            Self::Transient(_) => ErrorCode::CloudTransient,
            Self::Api { .. } => ErrorCode::CloudApiError,
        }
    }
}

/// One page of provider records
#[derive(Debug, Clone)]
pub struct Page<R, C> {
    pub records: Vec<R>,
    /// `None` once the provider reports exhaustion
    pub next: Option<C>,
}

impl<R, C> Page<R, C> {
    pub fn last(records: Vec<R>) -> Self {
        Self {
            records,
            next: None,
        }
    }
}

/// Paged enumeration of one resource kind
#[async_trait]
pub trait CloudSource: Send + Sync + 'static {
    type Record: Send + Sync + 'static;
    type Cursor: Cursor;

    /// Provider maximum page size
    fn page_limit(&self) -> usize;

    async fn fetch_page(
        &self,
        scope: &SyncScope,
        cursor: Self::Cursor,
        limit: usize,
    ) -> SourceResult<Page<Self::Record, Self::Cursor>>;

    /// Describe exactly these ids; ids that do not exist are simply absent
    async fn fetch_by_ids(&self, scope: &SyncScope, ids: &[String])
    -> SourceResult<Vec<Self::Record>>;
}

/// Complete child set of one parent
#[derive(Debug, Clone)]
pub struct ChildSet<R> {
    /// Aggregate version over the whole set, when the provider has one
    pub stamp: Option<String>,
    pub records: Vec<R>,
}

impl<R> ChildSet<R> {
    pub fn unstamped(records: Vec<R>) -> Self {
        Self {
            stamp: None,
            records,
        }
    }
}

/// Identifier-scoped fetch of a parent's children
#[async_trait]
pub trait ChildSource: Send + Sync + 'static {
    type Record: Send + Sync + 'static;

    async fn fetch_children(
        &self,
        scope: &SyncScope,
        parent_cloud_id: &str,
    ) -> SourceResult<ChildSet<Self::Record>>;
}
