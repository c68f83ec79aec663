//! Pagination cursors
//!
//! A cursor is opaque to the driver. `Default` is the start position; a page
//! carries `Some(next)` while more data may follow and `None` once the
//! provider reports exhaustion.

use std::fmt::Debug;

pub trait Cursor: Default + Clone + Debug + Send + Sync + 'static {
    /// Whether a page shorter than the requested size is the last one.
    ///
    /// Offset-paged APIs guarantee this. Token-paged APIs may return short
    /// or empty pages together with a continuation token, so only the token
    /// decides there.
    const SHORT_PAGE_ENDS: bool;
}

/// True when the driver must stop after this page
pub fn is_last_page<C: Cursor>(len: usize, limit: usize, next: Option<&C>) -> bool {
    next.is_none() || (C::SHORT_PAGE_ENDS && len < limit)
}

/// Offset + limit paging (TCloud)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OffsetCursor {
    pub offset: u64,
}

impl OffsetCursor {
    pub fn advance(self, by: usize) -> Self {
        Self {
            offset: self.offset + by as u64,
        }
    }
}

impl Cursor for OffsetCursor {
    const SHORT_PAGE_ENDS: bool = true;
}

/// Continuation token paging (AWS NextToken, GCP pageToken, Azure nextLink)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenCursor(Option<String>);

impl TokenCursor {
    /// Next cursor from a provider token; blank tokens mean exhaustion
    pub fn next(token: Option<String>) -> Option<Self> {
        token.filter(|t| !t.is_empty()).map(|t| Self(Some(t)))
    }

    pub fn token(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl Cursor for TokenCursor {
    const SHORT_PAGE_ENDS: bool = false;
}

/// Marker paging (HuaWei): the marker is the last id of the previous page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerCursor(Option<String>);

impl MarkerCursor {
    /// Next cursor after a page; a page below `limit` is the last one
    pub fn after(last_id: Option<&str>, len: usize, limit: usize) -> Option<Self> {
        if len < limit {
            return None;
        }
        last_id.map(|id| Self(Some(id.to_string())))
    }

    pub fn marker(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl Cursor for MarkerCursor {
    const SHORT_PAGE_ENDS: bool = false;
}
