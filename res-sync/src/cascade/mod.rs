//! Cascading child resync
//!
//! Parents that were created or changed get a child pass right after their
//! own commit, scoped to the parent's id. A child set whose aggregate stamp
//! matches the one stored on the parent is skipped without comparing any
//! child.

use crate::core::{ChildFailurePolicy, SyncConfig, SyncError, SyncResult};
use crate::diff::{self, ParentRef, SyncKind};
use crate::driver::apply::{create_records, delete_records, update_records};
use crate::report::SyncStats;
use crate::source::ChildSource;
use crate::store::{LocalRecord, MirrorStore, RecordFilter, RecordUpdate, scan_all};
use async_trait::async_trait;
use dashmap::DashSet;
use futures::StreamExt;
use shared::{ResourceKind, SyncScope};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A child kind that can be resynced under one parent
#[async_trait]
pub trait ChildResync: Send + Sync {
    fn kind(&self) -> ResourceKind;

    fn policy(&self) -> ChildFailurePolicy;

    async fn resync(
        &self,
        scope: &SyncScope,
        parent: &ParentRef,
        cancel: &CancellationToken,
    ) -> SyncResult<SyncStats>;

    /// Remove all children of the given parents
    async fn purge(&self, scope: &SyncScope, parent_local_ids: &[String]) -> SyncResult<u64>;
}

/// Generic child pass over a [`ChildSource`]
pub struct ChildReconciler<K, S> {
    source: Arc<S>,
    store: Arc<dyn MirrorStore>,
    policy: ChildFailurePolicy,
    batch_limit: usize,
    _kind: PhantomData<fn() -> K>,
}

impl<K, S> ChildReconciler<K, S>
where
    K: SyncKind,
    S: ChildSource<Record = K::Cloud>,
{
    pub fn new(source: Arc<S>, store: Arc<dyn MirrorStore>, config: &SyncConfig) -> Self {
        Self {
            source,
            store,
            policy: config.child_policy(K::KIND),
            batch_limit: config.batch_limit,
            _kind: PhantomData,
        }
    }

    pub fn with_policy(mut self, policy: ChildFailurePolicy) -> Self {
        self.policy = policy;
        self
    }
}

#[async_trait]
impl<K, S> ChildResync for ChildReconciler<K, S>
where
    K: SyncKind,
    S: ChildSource<Record = K::Cloud>,
{
    fn kind(&self) -> ResourceKind {
        K::KIND
    }

    fn policy(&self) -> ChildFailurePolicy {
        self.policy
    }

    async fn resync(
        &self,
        scope: &SyncScope,
        parent: &ParentRef,
        cancel: &CancellationToken,
    ) -> SyncResult<SyncStats> {
        let set = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SyncError::Cancelled),
            set = self.source.fetch_children(scope, &parent.cloud_id) => set?,
        };

        let mut stats = SyncStats::default();
        if set.stamp.is_some() && set.stamp == parent.stamp {
            stats.child_skipped = 1;
            return Ok(stats);
        }

        let store = self.store.as_ref();
        let filter =
            RecordFilter::scope(K::KIND, scope).with_parents(vec![parent.local_id.clone()]);
        let mut local: HashMap<String, LocalRecord<K::Local>> = HashMap::new();
        for stored in scan_all(store, &filter).await? {
            let record = LocalRecord::<K::Local>::decode(stored)?;
            local.insert(record.cloud_id.clone(), record);
        }

        let records = diff::dedup_by_cloud_id::<K>(set.records);
        let diff = diff::split::<K>(records, &mut local);
        // the set is complete, so leftovers are gone from the cloud
        let gone: Vec<String> = local.into_values().map(|r| r.id).collect();

        if !gone.is_empty() {
            stats.child_deleted =
                delete_records(store, K::KIND, scope, gone, self.batch_limit).await?;
        }
        if !diff.to_create.is_empty() {
            let ids = create_records::<K>(
                store,
                scope,
                Some(parent),
                &diff.to_create,
                self.batch_limit,
            )
            .await?;
            stats.child_created = ids.len() as u64;
        }
        if !diff.to_update.is_empty() {
            update_records::<K>(store, scope, Some(parent), &diff.to_update, self.batch_limit)
                .await?;
            stats.child_updated = diff.to_update.len() as u64;
        }

        // advance the parent's stamp only once its children are committed
        if let Some(stamp) = set.stamp {
            store
                .batch_update(vec![RecordUpdate::stamp(parent.local_id.clone(), stamp)])
                .await?;
        }
        Ok(stats)
    }

    async fn purge(&self, scope: &SyncScope, parent_local_ids: &[String]) -> SyncResult<u64> {
        let mut removed = 0;
        for chunk in parent_local_ids.chunks(self.batch_limit.max(1)) {
            let filter = RecordFilter::scope(K::KIND, scope).with_parents(chunk.to_vec());
            let sample = self.store.query(&filter.clone().with_page(0, 1)).await?;
            if sample.is_empty() {
                continue;
            }
            removed += self.store.batch_delete(&filter).await?;
        }
        Ok(removed)
    }
}

/// Parents already cascaded in the current run
#[derive(Debug, Default)]
pub struct CascadeTracker {
    done: DashSet<String>,
}

impl CascadeTracker {
    /// True the first time a parent is claimed
    pub fn claim(&self, parent_cloud_id: &str) -> bool {
        self.done.insert(parent_cloud_id.to_string())
    }

    pub fn len(&self) -> usize {
        self.done.len()
    }

    pub fn is_empty(&self) -> bool {
        self.done.is_empty()
    }
}

/// Child kinds of one parent kind plus the per-run tracker
#[derive(Default)]
pub struct Cascade {
    children: Vec<Arc<dyn ChildResync>>,
    tracker: CascadeTracker,
}

impl Cascade {
    pub fn new(children: Vec<Arc<dyn ChildResync>>) -> Self {
        Self {
            children,
            tracker: CascadeTracker::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Run every child kind for each parent not yet cascaded this run
    pub async fn run_for(
        &self,
        scope: &SyncScope,
        parents: &[ParentRef],
        cancel: &CancellationToken,
    ) -> SyncResult<SyncStats> {
        let mut stats = SyncStats::default();
        for parent in parents {
            if !self.tracker.claim(&parent.cloud_id) {
                continue;
            }
            for child in &self.children {
                match child.resync(scope, parent, cancel).await {
                    Ok(s) => stats += s,
                    Err(e) if e.is_cancelled() => return Err(e),
                    Err(e) => match child.policy() {
                        ChildFailurePolicy::SoftFail => {
                            tracing::warn!(
                                vendor = %scope.vendor,
                                kind = %child.kind(),
                                account_id = %scope.account_id,
                                region = %scope.region,
                                parent = %parent.cloud_id,
                                error = %e,
                                "child resync failed"
                            );
                            stats.child_failures += 1;
                        }
                        ChildFailurePolicy::HardFail => {
                            return Err(SyncError::child(child.kind(), &parent.cloud_id, e));
                        }
                    },
                }
            }
        }
        Ok(stats)
    }

    /// Remove children of parents about to be deleted
    pub async fn purge(&self, scope: &SyncScope, parent_local_ids: &[String]) -> SyncResult<u64> {
        let mut removed = 0;
        for child in &self.children {
            removed += child.purge(scope, parent_local_ids).await?;
        }
        Ok(removed)
    }
}

/// Explicit child entry point: resync the children of stored parents
///
/// Parents come from `scope.cloud_ids`, or every stored parent in scope when
/// unset. Any failure is fatal here.
pub async fn resync_children(
    child: &dyn ChildResync,
    store: &dyn MirrorStore,
    scope: &SyncScope,
    concurrency: usize,
    cancel: &CancellationToken,
) -> SyncResult<SyncStats> {
    let kind = child.kind();
    let Some(parent_kind) = kind.parent() else {
        return Err(SyncError::UnsupportedKind {
            vendor: scope.vendor,
            kind,
        });
    };
    scope.validate()?;

    let mut filter = RecordFilter::scope(parent_kind, scope);
    if let Some(ids) = &scope.cloud_ids {
        filter = filter.with_cloud_ids(ids.clone());
    }
    let parents: Vec<ParentRef> = scan_all(store, &filter)
        .await?
        .into_iter()
        .map(|r| ParentRef {
            local_id: r.id,
            cloud_id: r.cloud_id,
            stamp: r.stamp,
        })
        .collect();

    tracing::info!(
        vendor = %scope.vendor,
        kind = %kind,
        account_id = %scope.account_id,
        region = %scope.region,
        parents = parents.len(),
        "child resync started"
    );

    let mut stats = SyncStats::default();
    let mut passes = futures::stream::iter(parents.iter())
        .map(|parent| async move {
            child
                .resync(scope, parent, cancel)
                .await
                .map_err(|e| match e {
                    SyncError::Cancelled => e,
                    e => SyncError::child(kind, &parent.cloud_id, e),
                })
        })
        .buffer_unordered(concurrency.max(1));
    while let Some(result) = passes.next().await {
        stats += result?;
    }
    Ok(stats)
}
