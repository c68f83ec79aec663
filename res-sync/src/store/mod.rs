//! Local mirror store
//!
//! The mirror is an opaque filtered-CRUD capability. Records carry their scope
//! columns, an optional parent link for child kinds, the aggregate stamp of
//! their child set and the vendor-neutral payload as JSON.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::{InMemoryStore, StoreOp};
#[cfg(feature = "postgres")]
pub use postgres::PgMirrorStore;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::error::ErrorCode;
use shared::{ResourceKind, SyncScope, Vendor};
use thiserror::Error;

/// Scan page size used when walking a whole scope
pub const STORE_PAGE_SIZE: usize = 500;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} {cloud_id} already exists in scope")]
    Conflict { kind: ResourceKind, cloud_id: String },

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("payload error: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Conflict { .. } => ErrorCode::StoreConflict,
            Self::NotFound(_) => ErrorCode::StoreRecordNotFound,
            Self::Payload(_) => ErrorCode::StorePayloadInvalid,
            Self::Database(_) => ErrorCode::StoreFailed,
        }
    }
}

/// A mirrored record as the store holds it
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: String,
    pub vendor: Vendor,
    pub kind: ResourceKind,
    pub account_id: String,
    pub region: String,
    pub cloud_id: String,
    pub parent_id: Option<String>,
    pub stamp: Option<String>,
    pub payload: Value,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A record to insert; the store assigns the local id
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub vendor: Vendor,
    pub kind: ResourceKind,
    pub account_id: String,
    pub region: String,
    pub cloud_id: String,
    pub parent_id: Option<String>,
    pub stamp: Option<String>,
    pub payload: Value,
}

/// Partial update of one record; `None` fields stay unchanged
#[derive(Debug, Clone, Default)]
pub struct RecordUpdate {
    pub id: String,
    pub payload: Option<Value>,
    pub stamp: Option<String>,
}

impl RecordUpdate {
    pub fn payload(id: impl Into<String>, payload: Value) -> Self {
        Self {
            id: id.into(),
            payload: Some(payload),
            stamp: None,
        }
    }

    pub fn stamp(id: impl Into<String>, stamp: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            payload: None,
            stamp: Some(stamp.into()),
        }
    }
}

/// Offset window over a filter's results, ordered by local id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorePage {
    pub offset: usize,
    pub limit: usize,
}

/// Scope + identifier filter
///
/// `parent_ids: None` matches any parent. Id lists, when present, restrict
/// the match to those ids; an empty list matches nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFilter {
    pub vendor: Vendor,
    pub kind: ResourceKind,
    pub account_id: String,
    pub region: String,
    pub parent_ids: Option<Vec<String>>,
    pub cloud_ids: Option<Vec<String>>,
    pub ids: Option<Vec<String>>,
    pub page: Option<StorePage>,
}

impl RecordFilter {
    pub fn scope(kind: ResourceKind, scope: &SyncScope) -> Self {
        Self {
            vendor: scope.vendor,
            kind,
            account_id: scope.account_id.clone(),
            region: scope.region.clone(),
            parent_ids: None,
            cloud_ids: None,
            ids: None,
            page: None,
        }
    }

    pub fn with_cloud_ids(mut self, ids: Vec<String>) -> Self {
        self.cloud_ids = Some(ids);
        self
    }

    pub fn with_ids(mut self, ids: Vec<String>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn with_parents(mut self, parent_ids: Vec<String>) -> Self {
        self.parent_ids = Some(parent_ids);
        self
    }

    pub fn with_page(mut self, offset: usize, limit: usize) -> Self {
        self.page = Some(StorePage { offset, limit });
        self
    }

    /// Check a record against every predicate except paging
    pub fn matches(&self, record: &StoredRecord) -> bool {
        let in_list = |list: &Option<Vec<String>>, value: &str| {
            list.as_ref().is_none_or(|l| l.iter().any(|v| v == value))
        };
        record.vendor == self.vendor
            && record.kind == self.kind
            && record.account_id == self.account_id
            && record.region == self.region
            && in_list(&self.cloud_ids, &record.cloud_id)
            && in_list(&self.ids, &record.id)
            && match (&self.parent_ids, &record.parent_id) {
                (None, _) => true,
                (Some(parents), Some(parent)) => parents.contains(parent),
                (Some(_), None) => false,
            }
    }
}

/// Persistence capability used by the engine
#[async_trait]
pub trait MirrorStore: Send + Sync + 'static {
    async fn query(&self, filter: &RecordFilter) -> StoreResult<Vec<StoredRecord>>;

    /// Insert records, returning local ids in input order
    async fn batch_create(&self, records: Vec<NewRecord>) -> StoreResult<Vec<String>>;

    async fn batch_update(&self, updates: Vec<RecordUpdate>) -> StoreResult<()>;

    /// Delete matching records, returning how many were removed
    async fn batch_delete(&self, filter: &RecordFilter) -> StoreResult<u64>;
}

/// A stored record with its payload decoded
#[derive(Debug, Clone, PartialEq)]
pub struct LocalRecord<P> {
    pub id: String,
    pub cloud_id: String,
    pub parent_id: Option<String>,
    pub stamp: Option<String>,
    pub payload: P,
}

impl<P: DeserializeOwned> LocalRecord<P> {
    pub fn decode(record: StoredRecord) -> StoreResult<Self> {
        Ok(Self {
            payload: serde_json::from_value(record.payload)?,
            id: record.id,
            cloud_id: record.cloud_id,
            parent_id: record.parent_id,
            stamp: record.stamp,
        })
    }
}

/// Encode a payload for the store
pub fn encode<P: Serialize>(payload: &P) -> StoreResult<Value> {
    Ok(serde_json::to_value(payload)?)
}

/// Walk every record matching `filter` in pages of [`STORE_PAGE_SIZE`]
pub async fn scan_all(
    store: &dyn MirrorStore,
    filter: &RecordFilter,
) -> StoreResult<Vec<StoredRecord>> {
    let mut out = Vec::new();
    let mut offset = 0;
    loop {
        let page = store
            .query(&filter.clone().with_page(offset, STORE_PAGE_SIZE))
            .await?;
        let len = page.len();
        out.extend(page);
        if len < STORE_PAGE_SIZE {
            return Ok(out);
        }
        offset += len;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(cloud_id: &str, parent: Option<&str>) -> StoredRecord {
        StoredRecord {
            id: format!("id-{cloud_id}"),
            vendor: Vendor::TCloud,
            kind: ResourceKind::SecurityGroupRule,
            account_id: "acc".into(),
            region: "ap-guangzhou".into(),
            cloud_id: cloud_id.into(),
            parent_id: parent.map(Into::into),
            stamp: None,
            payload: json!({}),
            created_at: 0,
            updated_at: 0,
        }
    }

    fn filter() -> RecordFilter {
        RecordFilter::scope(
            ResourceKind::SecurityGroupRule,
            &SyncScope::new(Vendor::TCloud, "acc", "ap-guangzhou"),
        )
    }

    #[test]
    fn filter_matches_scope_and_lists() {
        let r = record("ingress:0", Some("p1"));
        assert!(filter().matches(&r));
        assert!(filter().with_parents(vec!["p1".into()]).matches(&r));
        assert!(!filter().with_parents(vec!["p2".into()]).matches(&r));
        assert!(!filter().with_cloud_ids(vec![]).matches(&r));
        assert!(filter().with_ids(vec!["id-ingress:0".into()]).matches(&r));

        let mut other_region = filter();
        other_region.region = "ap-shanghai".into();
        assert!(!other_region.matches(&r));
    }

    #[test]
    fn parent_filter_excludes_orphans() {
        let r = record("ingress:0", None);
        assert!(!filter().with_parents(vec!["p1".into()]).matches(&r));
    }

    #[test]
    fn decode_reads_payload() {
        let mut r = record("vpc-1", None);
        r.payload = json!({"name": "main"});
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct P {
            name: String,
        }
        let local = LocalRecord::<P>::decode(r).unwrap();
        assert_eq!(local.payload.name, "main");
        assert_eq!(local.id, "id-vpc-1");
    }
}
