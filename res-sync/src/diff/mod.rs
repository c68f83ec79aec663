//! Diff engine
//!
//! [`classify`] splits one batch of cloud records into create / update /
//! unchanged against the mirror, with a single store query per batch.
//! Deletion candidates never come from here; see [`crate::sweep`].

pub mod detect;

use crate::store::{LocalRecord, MirrorStore, RecordFilter, StoreResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::{ResourceKind, SyncScope, Vendor};
use std::collections::HashMap;

/// Parent a child record hangs off
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentRef {
    pub local_id: String,
    pub cloud_id: String,
    /// Stored aggregate stamp of the parent's child set
    pub stamp: Option<String>,
}

/// Context handed to mappers
#[derive(Debug, Clone, Copy)]
pub struct MapContext<'a> {
    pub scope: &'a SyncScope,
    pub parent: Option<&'a ParentRef>,
}

/// One (vendor, kind) pair: how to identify, map and compare its records
pub trait SyncKind: Send + Sync + 'static {
    /// Provider-native record
    type Cloud: Send + Sync + 'static;
    /// Vendor-neutral payload stored in the mirror
    type Local: Serialize + DeserializeOwned + Send + Sync + 'static;

    const VENDOR: Vendor;
    const KIND: ResourceKind;

    fn cloud_id(cloud: &Self::Cloud) -> &str;

    fn to_local(cloud: &Self::Cloud, ctx: &MapContext<'_>) -> Self::Local;

    /// True when any semantically meaningful field differs
    fn changed(cloud: &Self::Cloud, local: &Self::Local) -> bool;
}

/// Classification of one batch
pub struct DiffResult<K: SyncKind> {
    pub to_create: Vec<K::Cloud>,
    pub to_update: Vec<(K::Cloud, LocalRecord<K::Local>)>,
    pub unchanged: Vec<LocalRecord<K::Local>>,
}

impl<K: SyncKind> DiffResult<K> {
    pub fn is_noop(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty()
    }
}

impl<K: SyncKind> Default for DiffResult<K> {
    fn default() -> Self {
        Self {
            to_create: Vec::new(),
            to_update: Vec::new(),
            unchanged: Vec::new(),
        }
    }
}

/// Last occurrence wins when a provider repeats an id inside one batch
pub fn dedup_by_cloud_id<K: SyncKind>(records: Vec<K::Cloud>) -> Vec<K::Cloud> {
    let mut position: HashMap<String, usize> = HashMap::with_capacity(records.len());
    let mut slots: Vec<Option<K::Cloud>> = Vec::with_capacity(records.len());
    for record in records {
        let id = K::cloud_id(&record).to_string();
        match position.get(&id) {
            Some(&i) => slots[i] = Some(record),
            None => {
                position.insert(id, slots.len());
                slots.push(Some(record));
            }
        }
    }
    slots.into_iter().flatten().collect()
}

/// Compare a batch against what the mirror already holds
///
/// `parent` restricts the lookup to one parent's children.
pub async fn classify<K: SyncKind>(
    store: &dyn MirrorStore,
    scope: &SyncScope,
    parent: Option<&ParentRef>,
    records: Vec<K::Cloud>,
) -> StoreResult<DiffResult<K>> {
    if records.is_empty() {
        return Ok(DiffResult::default());
    }
    let records = dedup_by_cloud_id::<K>(records);
    let ids: Vec<String> = records.iter().map(|r| K::cloud_id(r).to_string()).collect();

    let mut filter = RecordFilter::scope(K::KIND, scope).with_cloud_ids(ids);
    if let Some(parent) = parent {
        filter = filter.with_parents(vec![parent.local_id.clone()]);
    }
    let mut local: HashMap<String, LocalRecord<K::Local>> = HashMap::new();
    for stored in store.query(&filter).await? {
        let record = LocalRecord::<K::Local>::decode(stored)?;
        local.insert(record.cloud_id.clone(), record);
    }

    Ok(split::<K>(records, &mut local))
}

/// Pure part of [`classify`]
///
/// Matched entries are removed from `local`; what remains was not reported
/// by the cloud, which for a complete child set means it is gone.
pub fn split<K: SyncKind>(
    records: Vec<K::Cloud>,
    local: &mut HashMap<String, LocalRecord<K::Local>>,
) -> DiffResult<K> {
    let mut diff = DiffResult::default();
    for cloud in records {
        match local.remove(K::cloud_id(&cloud)) {
            None => diff.to_create.push(cloud),
            Some(existing) if K::changed(&cloud, &existing.payload) => {
                diff.to_update.push((cloud, existing))
            }
            Some(existing) => diff.unchanged.push(existing),
        }
    }
    diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryStore, NewRecord};
    use serde::Deserialize;
    use serde_json::json;

    struct Net;

    #[derive(Debug, Clone)]
    struct CloudNet {
        id: String,
        name: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct LocalNet {
        cloud_id: String,
        name: String,
    }

    impl SyncKind for Net {
        type Cloud = CloudNet;
        type Local = LocalNet;
        const VENDOR: Vendor = Vendor::Aws;
        const KIND: ResourceKind = ResourceKind::Vpc;

        fn cloud_id(cloud: &CloudNet) -> &str {
            &cloud.id
        }

        fn to_local(cloud: &CloudNet, _ctx: &MapContext<'_>) -> LocalNet {
            LocalNet {
                cloud_id: cloud.id.clone(),
                name: cloud.name.clone(),
            }
        }

        fn changed(cloud: &CloudNet, local: &LocalNet) -> bool {
            cloud.name != local.name
        }
    }

    fn net(id: &str, name: &str) -> CloudNet {
        CloudNet {
            id: id.into(),
            name: name.into(),
        }
    }

    #[tokio::test]
    async fn classify_splits_batch_with_one_query() {
        let store = InMemoryStore::new();
        let scope = SyncScope::new(Vendor::Aws, "acc", "us-east-1");
        for (id, name) in [("vpc-1", "a"), ("vpc-2", "b")] {
            store
                .batch_create(vec![NewRecord {
                    vendor: Vendor::Aws,
                    kind: ResourceKind::Vpc,
                    account_id: "acc".into(),
                    region: "us-east-1".into(),
                    cloud_id: id.into(),
                    parent_id: None,
                    stamp: None,
                    payload: json!({"cloud_id": id, "name": name}),
                }])
                .await
                .unwrap();
        }
        store.clear_ops();

        let diff = classify::<Net>(
            &store,
            &scope,
            None,
            vec![net("vpc-1", "a"), net("vpc-2", "renamed"), net("vpc-3", "c")],
        )
        .await
        .unwrap();

        assert_eq!(store.ops().len(), 1);
        assert_eq!(diff.to_create.len(), 1);
        assert_eq!(diff.to_create[0].id, "vpc-3");
        assert_eq!(diff.to_update.len(), 1);
        assert_eq!(diff.to_update[0].1.cloud_id, "vpc-2");
        assert_eq!(diff.unchanged.len(), 1);
        assert!(!diff.is_noop());
    }

    #[tokio::test]
    async fn empty_batch_touches_nothing() {
        let store = InMemoryStore::new();
        let scope = SyncScope::new(Vendor::Aws, "acc", "us-east-1");
        let diff = classify::<Net>(&store, &scope, None, vec![]).await.unwrap();
        assert!(diff.is_noop());
        assert!(store.ops().is_empty());
    }

    #[test]
    fn duplicate_ids_keep_last_occurrence() {
        let out = dedup_by_cloud_id::<Net>(vec![
            net("vpc-1", "old"),
            net("vpc-2", "b"),
            net("vpc-1", "new"),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].name, "new");
        assert_eq!(out[1].id, "vpc-2");
    }
}
