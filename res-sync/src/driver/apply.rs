//! Page apply: classify one batch and commit it

use crate::cascade::Cascade;
use crate::core::{SyncError, SyncResult};
use crate::diff::{self, MapContext, ParentRef, SyncKind};
use crate::report::SyncStats;
use crate::store::{
    LocalRecord, MirrorStore, NewRecord, RecordFilter, RecordUpdate, StoreError, encode,
};
use shared::{ResourceKind, SyncScope};
use std::marker::PhantomData;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Insert cloud records, returning local ids in input order
pub(crate) async fn create_records<K: SyncKind>(
    store: &dyn MirrorStore,
    scope: &SyncScope,
    parent: Option<&ParentRef>,
    records: &[K::Cloud],
    batch_limit: usize,
) -> SyncResult<Vec<String>> {
    let ctx = MapContext { scope, parent };
    let mut ids = Vec::with_capacity(records.len());
    for chunk in records.chunks(batch_limit.max(1)) {
        let batch = chunk
            .iter()
            .map(|cloud| {
                Ok(NewRecord {
                    vendor: K::VENDOR,
                    kind: K::KIND,
                    account_id: scope.account_id.clone(),
                    region: scope.region.clone(),
                    cloud_id: K::cloud_id(cloud).to_string(),
                    parent_id: parent.map(|p| p.local_id.clone()),
                    stamp: None,
                    payload: encode(&K::to_local(cloud, &ctx))?,
                })
            })
            .collect::<SyncResult<Vec<_>>>()?;
        ids.extend(store.batch_create(batch).await?);
    }
    Ok(ids)
}

/// Rewrite payloads of changed records; stamps are left alone
pub(crate) async fn update_records<K: SyncKind>(
    store: &dyn MirrorStore,
    scope: &SyncScope,
    parent: Option<&ParentRef>,
    pairs: &[(K::Cloud, LocalRecord<K::Local>)],
    batch_limit: usize,
) -> SyncResult<()> {
    let ctx = MapContext { scope, parent };
    for chunk in pairs.chunks(batch_limit.max(1)) {
        let batch = chunk
            .iter()
            .map(|(cloud, local)| {
                Ok(RecordUpdate::payload(
                    local.id.clone(),
                    encode(&K::to_local(cloud, &ctx))?,
                ))
            })
            .collect::<SyncResult<Vec<_>>>()?;
        store.batch_update(batch).await?;
    }
    Ok(())
}

/// Delete records by local id in batches
pub(crate) async fn delete_records(
    store: &dyn MirrorStore,
    kind: ResourceKind,
    scope: &SyncScope,
    ids: Vec<String>,
    batch_limit: usize,
) -> SyncResult<u64> {
    let mut deleted = 0;
    for chunk in ids.chunks(batch_limit.max(1)) {
        let filter = RecordFilter::scope(kind, scope).with_ids(chunk.to_vec());
        deleted += store.batch_delete(&filter).await?;
    }
    Ok(deleted)
}

/// Applies pages of one kind; shared by every apply task of a run
pub(crate) struct PageApplier<K> {
    store: Arc<dyn MirrorStore>,
    cascade: Arc<Cascade>,
    batch_limit: usize,
    cascade_unchanged: bool,
    _kind: PhantomData<fn() -> K>,
}

impl<K: SyncKind> PageApplier<K> {
    pub(crate) fn new(
        store: Arc<dyn MirrorStore>,
        cascade: Arc<Cascade>,
        batch_limit: usize,
        cascade_unchanged: bool,
    ) -> Self {
        Self {
            store,
            cascade,
            batch_limit,
            cascade_unchanged,
            _kind: PhantomData,
        }
    }

    /// Classify and commit one page, then run child passes for its parents
    pub(crate) async fn apply(
        &self,
        scope: &SyncScope,
        records: Vec<K::Cloud>,
        cancel: &CancellationToken,
    ) -> SyncResult<SyncStats> {
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        let store = self.store.as_ref();
        let mut diff = diff::classify::<K>(store, scope, None, records).await?;
        let mut stats = SyncStats::default();
        let mut parents = Vec::new();
        // created by a sibling page; always cascaded, the tracker drops repeats
        let mut raced = Vec::new();

        if !diff.to_create.is_empty() {
            let attempt =
                create_records::<K>(store, scope, None, &diff.to_create, self.batch_limit).await;
            let created = match attempt {
                Err(SyncError::Store(StoreError::Conflict { cloud_id, .. })) => {
                    tracing::debug!(
                        kind = %K::KIND,
                        %cloud_id,
                        "create conflict, reclassifying page"
                    );
                    let again = diff::classify::<K>(
                        store,
                        scope,
                        None,
                        std::mem::take(&mut diff.to_create),
                    )
                    .await?;
                    diff.to_update.extend(again.to_update);
                    raced = again.unchanged;
                    diff.to_create = again.to_create;
                    create_records::<K>(store, scope, None, &diff.to_create, self.batch_limit)
                        .await?
                }
                other => other?,
            };
            stats.created = created.len() as u64;
            parents.extend(created.into_iter().zip(&diff.to_create).map(|(id, cloud)| {
                ParentRef {
                    local_id: id,
                    cloud_id: K::cloud_id(cloud).to_string(),
                    stamp: None,
                }
            }));
        }
        stats.unchanged = (diff.unchanged.len() + raced.len()) as u64;
        parents.extend(raced.iter().map(parent_ref));

        if !diff.to_update.is_empty() {
            update_records::<K>(store, scope, None, &diff.to_update, self.batch_limit).await?;
            stats.updated = diff.to_update.len() as u64;
            parents.extend(diff.to_update.iter().map(|(_, local)| parent_ref(local)));
        }

        if self.cascade_unchanged {
            parents.extend(diff.unchanged.iter().map(parent_ref));
        }

        tracing::debug!(
            vendor = %K::VENDOR,
            kind = %K::KIND,
            created = stats.created,
            updated = stats.updated,
            unchanged = stats.unchanged,
            "page applied"
        );

        if !self.cascade.is_empty() && !parents.is_empty() {
            stats += self.cascade.run_for(scope, &parents, cancel).await?;
        }
        Ok(stats)
    }
}

fn parent_ref<P>(local: &LocalRecord<P>) -> ParentRef {
    ParentRef {
        local_id: local.id.clone(),
        cloud_id: local.cloud_id.clone(),
        stamp: local.stamp.clone(),
    }
}
