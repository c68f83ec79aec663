//! In-memory mirror store
//!
//! Keeps records in a `BTreeMap` keyed by local id, so scans come back in a
//! stable order, and records every call in an operation log.

use super::{
    MirrorStore, NewRecord, RecordFilter, RecordUpdate, StoreError, StoreResult, StoredRecord,
};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared::ResourceKind;
use shared::util::{new_local_id, now_millis};
use std::collections::{BTreeMap, HashSet};

/// One store call as seen by the in-memory backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Query {
        kind: ResourceKind,
        cloud_ids: Option<Vec<String>>,
        parent_ids: Option<Vec<String>>,
    },
    Create {
        kind: ResourceKind,
        cloud_ids: Vec<String>,
    },
    Update {
        kind: Option<ResourceKind>,
        cloud_ids: Vec<String>,
    },
    Delete {
        kind: ResourceKind,
        cloud_ids: Vec<String>,
    },
}

impl StoreOp {
    pub fn kind(&self) -> Option<ResourceKind> {
        match self {
            Self::Query { kind, .. } | Self::Create { kind, .. } | Self::Delete { kind, .. } => {
                Some(*kind)
            }
            Self::Update { kind, .. } => *kind,
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<BTreeMap<String, StoredRecord>>,
    ops: Mutex<Vec<StoreOp>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Operation log since creation or the last [`clear_ops`](Self::clear_ops)
    pub fn ops(&self) -> Vec<StoreOp> {
        self.ops.lock().clone()
    }

    pub fn clear_ops(&self) {
        self.ops.lock().clear();
    }

    /// Snapshot of all records of a kind
    pub fn records(&self, kind: ResourceKind) -> Vec<StoredRecord> {
        self.records
            .read()
            .values()
            .filter(|r| r.kind == kind)
            .cloned()
            .collect()
    }

    pub fn find(&self, kind: ResourceKind, cloud_id: &str) -> Option<StoredRecord> {
        self.records
            .read()
            .values()
            .find(|r| r.kind == kind && r.cloud_id == cloud_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn log(&self, op: StoreOp) {
        self.ops.lock().push(op);
    }
}

type UniqueKey = (
    shared::Vendor,
    ResourceKind,
    String,
    String,
    Option<String>,
    String,
);

fn unique_key(
    vendor: shared::Vendor,
    kind: ResourceKind,
    account_id: &str,
    region: &str,
    parent_id: Option<&String>,
    cloud_id: &str,
) -> UniqueKey {
    (
        vendor,
        kind,
        account_id.to_string(),
        region.to_string(),
        parent_id.cloned(),
        cloud_id.to_string(),
    )
}

#[async_trait]
impl MirrorStore for InMemoryStore {
    async fn query(&self, filter: &RecordFilter) -> StoreResult<Vec<StoredRecord>> {
        self.log(StoreOp::Query {
            kind: filter.kind,
            cloud_ids: filter.cloud_ids.clone(),
            parent_ids: filter.parent_ids.clone(),
        });
        let records = self.records.read();
        let matched = records.values().filter(|r| filter.matches(r));
        Ok(match filter.page {
            Some(page) => matched
                .skip(page.offset)
                .take(page.limit)
                .cloned()
                .collect(),
            None => matched.cloned().collect(),
        })
    }

    async fn batch_create(&self, new: Vec<NewRecord>) -> StoreResult<Vec<String>> {
        let Some(first) = new.first() else {
            return Ok(Vec::new());
        };
        self.log(StoreOp::Create {
            kind: first.kind,
            cloud_ids: new.iter().map(|r| r.cloud_id.clone()).collect(),
        });

        let mut records = self.records.write();
        let mut taken: HashSet<UniqueKey> = records
            .values()
            .map(|r| {
                unique_key(
                    r.vendor,
                    r.kind,
                    &r.account_id,
                    &r.region,
                    r.parent_id.as_ref(),
                    &r.cloud_id,
                )
            })
            .collect();
        // validate the whole batch before inserting anything
        for r in &new {
            let key = unique_key(
                r.vendor,
                r.kind,
                &r.account_id,
                &r.region,
                r.parent_id.as_ref(),
                &r.cloud_id,
            );
            if !taken.insert(key) {
                return Err(StoreError::Conflict {
                    kind: r.kind,
                    cloud_id: r.cloud_id.clone(),
                });
            }
        }

        let now = now_millis();
        let mut ids = Vec::with_capacity(new.len());
        for r in new {
            let mut id = new_local_id();
            while records.contains_key(&id) {
                id = new_local_id();
            }
            records.insert(
                id.clone(),
                StoredRecord {
                    id: id.clone(),
                    vendor: r.vendor,
                    kind: r.kind,
                    account_id: r.account_id,
                    region: r.region,
                    cloud_id: r.cloud_id,
                    parent_id: r.parent_id,
                    stamp: r.stamp,
                    payload: r.payload,
                    created_at: now,
                    updated_at: now,
                },
            );
            ids.push(id);
        }
        Ok(ids)
    }

    async fn batch_update(&self, updates: Vec<RecordUpdate>) -> StoreResult<()> {
        if updates.is_empty() {
            return Ok(());
        }
        let mut records = self.records.write();
        if let Some(missing) = updates.iter().find(|u| !records.contains_key(&u.id)) {
            return Err(StoreError::NotFound(missing.id.clone()));
        }

        let kind = records.get(&updates[0].id).map(|r| r.kind);
        let mut cloud_ids = Vec::with_capacity(updates.len());
        let now = now_millis();
        for update in updates {
            if let Some(record) = records.get_mut(&update.id) {
                if let Some(payload) = update.payload {
                    record.payload = payload;
                }
                if let Some(stamp) = update.stamp {
                    record.stamp = Some(stamp);
                }
                record.updated_at = now;
                cloud_ids.push(record.cloud_id.clone());
            }
        }
        drop(records);
        self.log(StoreOp::Update { kind, cloud_ids });
        Ok(())
    }

    async fn batch_delete(&self, filter: &RecordFilter) -> StoreResult<u64> {
        let mut records = self.records.write();
        let doomed: Vec<String> = records
            .values()
            .filter(|r| filter.matches(r))
            .map(|r| r.id.clone())
            .collect();
        let mut cloud_ids = Vec::with_capacity(doomed.len());
        for id in &doomed {
            if let Some(r) = records.remove(id) {
                cloud_ids.push(r.cloud_id);
            }
        }
        drop(records);
        self.log(StoreOp::Delete {
            kind: filter.kind,
            cloud_ids,
        });
        Ok(doomed.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared::{SyncScope, Vendor};

    fn scope() -> SyncScope {
        SyncScope::new(Vendor::Aws, "acc", "us-east-1")
    }

    fn new_vpc(cloud_id: &str) -> NewRecord {
        NewRecord {
            vendor: Vendor::Aws,
            kind: ResourceKind::Vpc,
            account_id: "acc".into(),
            region: "us-east-1".into(),
            cloud_id: cloud_id.into(),
            parent_id: None,
            stamp: None,
            payload: json!({"name": cloud_id}),
        }
    }

    #[tokio::test]
    async fn create_query_update_delete() {
        let store = InMemoryStore::new();
        let ids = store
            .batch_create(vec![new_vpc("vpc-1"), new_vpc("vpc-2")])
            .await
            .unwrap();
        assert_eq!(ids.len(), 2);

        let filter = RecordFilter::scope(ResourceKind::Vpc, &scope());
        assert_eq!(store.query(&filter).await.unwrap().len(), 2);

        store
            .batch_update(vec![RecordUpdate::payload(&ids[0], json!({"name": "x"}))])
            .await
            .unwrap();
        assert_eq!(store.find(ResourceKind::Vpc, "vpc-1").unwrap().payload["name"], "x");

        let removed = store
            .batch_delete(&filter.clone().with_cloud_ids(vec!["vpc-2".into()]))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.ops().last(),
            Some(&StoreOp::Delete {
                kind: ResourceKind::Vpc,
                cloud_ids: vec!["vpc-2".into()]
            })
        );
    }

    #[tokio::test]
    async fn duplicate_cloud_id_conflicts_and_inserts_nothing() {
        let store = InMemoryStore::new();
        store.batch_create(vec![new_vpc("vpc-1")]).await.unwrap();
        let err = store
            .batch_create(vec![new_vpc("vpc-2"), new_vpc("vpc-1")])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn stamp_only_update_keeps_payload() {
        let store = InMemoryStore::new();
        let ids = store.batch_create(vec![new_vpc("vpc-1")]).await.unwrap();
        store
            .batch_update(vec![RecordUpdate::stamp(&ids[0], "v7")])
            .await
            .unwrap();
        let r = store.find(ResourceKind::Vpc, "vpc-1").unwrap();
        assert_eq!(r.stamp.as_deref(), Some("v7"));
        assert_eq!(r.payload["name"], "vpc-1");
    }

    #[tokio::test]
    async fn update_of_unknown_id_fails() {
        let store = InMemoryStore::new();
        let err = store
            .batch_update(vec![RecordUpdate::stamp("nope", "v1")])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(id) if id == "nope"));
    }

    #[tokio::test]
    async fn paged_query_is_stable() {
        let store = InMemoryStore::new();
        let batch: Vec<NewRecord> = (0..7).map(|i| new_vpc(&format!("vpc-{i}"))).collect();
        store.batch_create(batch).await.unwrap();
        let filter = RecordFilter::scope(ResourceKind::Vpc, &scope());
        let first = store.query(&filter.clone().with_page(0, 5)).await.unwrap();
        let second = store.query(&filter.clone().with_page(5, 5)).await.unwrap();
        assert_eq!(first.len(), 5);
        assert_eq!(second.len(), 2);
        let all: HashSet<String> = first.iter().chain(&second).map(|r| r.id.clone()).collect();
        assert_eq!(all.len(), 7);
    }
}
