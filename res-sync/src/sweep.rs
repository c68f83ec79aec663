//! Deletion sweep
//!
//! Local records are only deleted on the strength of a
//! [`CompleteEnumeration`], which can only be produced by finishing an
//! [`Enumeration`]. Drivers finish one only when the fetch loop ran to
//! exhaustion without error.

use crate::cascade::Cascade;
use crate::core::{SyncError, SyncResult};
use crate::diff::SyncKind;
use crate::driver::apply::delete_records;
use crate::source::CloudSource;
use crate::store::{MirrorStore, RecordFilter, StoredRecord, scan_all};
use shared::{MAX_TARGET_IDS, SyncScope};
use std::collections::HashSet;

/// Cloud ids observed so far by a running fetch loop
#[derive(Debug, Default)]
pub struct Enumeration {
    seen: HashSet<String>,
}

impl Enumeration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.seen.extend(ids.into_iter().map(Into::into));
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Seal the enumeration once the provider reported exhaustion
    pub fn finish(self) -> CompleteEnumeration {
        CompleteEnumeration { seen: self.seen }
    }
}

/// Every cloud id in scope, from a fetch loop that finished cleanly
#[derive(Debug)]
pub struct CompleteEnumeration {
    seen: HashSet<String>,
}

impl CompleteEnumeration {
    pub fn contains(&self, cloud_id: &str) -> bool {
        self.seen.contains(cloud_id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

pub struct Sweeper<'a, S> {
    pub store: &'a dyn MirrorStore,
    pub source: &'a S,
    pub cascade: &'a Cascade,
    pub batch_limit: usize,
    pub verify_before_delete: bool,
}

impl<S: CloudSource> Sweeper<'_, S> {
    /// Delete local records of `K` in scope that the enumeration did not see
    pub async fn sweep<K>(&self, scope: &SyncScope, complete: CompleteEnumeration) -> SyncResult<u64>
    where
        K: SyncKind<Cloud = S::Record>,
    {
        let filter = RecordFilter::scope(K::KIND, scope);
        let candidates: Vec<StoredRecord> = scan_all(self.store, &filter)
            .await?
            .into_iter()
            .filter(|r| !complete.contains(&r.cloud_id))
            .collect();
        if candidates.is_empty() {
            return Ok(0);
        }

        if self.verify_before_delete {
            self.verify_gone::<K>(scope, &candidates).await?;
        }
        self.delete::<K>(scope, candidates).await
    }

    /// Targeted runs: delete requested ids the cloud no longer reports
    pub async fn sweep_missing<K>(&self, scope: &SyncScope, missing: Vec<String>) -> SyncResult<u64>
    where
        K: SyncKind<Cloud = S::Record>,
    {
        if missing.is_empty() {
            return Ok(0);
        }
        let filter = RecordFilter::scope(K::KIND, scope).with_cloud_ids(missing);
        let candidates = self.store.query(&filter).await?;
        if candidates.is_empty() {
            return Ok(0);
        }
        self.delete::<K>(scope, candidates).await
    }

    /// Re-describe candidates; fail without deleting if any still exists
    async fn verify_gone<K>(&self, scope: &SyncScope, candidates: &[StoredRecord]) -> SyncResult<()>
    where
        K: SyncKind<Cloud = S::Record>,
    {
        let ids: Vec<String> = candidates.iter().map(|r| r.cloud_id.clone()).collect();
        let mut alive = Vec::new();
        for chunk in ids.chunks(MAX_TARGET_IDS) {
            let found = self.source.fetch_by_ids(scope, chunk).await?;
            alive.extend(found.iter().map(|r| K::cloud_id(r).to_string()));
        }
        if alive.is_empty() {
            return Ok(());
        }
        tracing::error!(
            vendor = %scope.vendor,
            kind = %K::KIND,
            account_id = %scope.account_id,
            region = %scope.region,
            alive = alive.len(),
            "sweep candidates still exist in the cloud, nothing deleted"
        );
        Err(SyncError::DeleteVerification {
            kind: K::KIND,
            ids: alive,
        })
    }

    async fn delete<K: SyncKind>(
        &self,
        scope: &SyncScope,
        candidates: Vec<StoredRecord>,
    ) -> SyncResult<u64> {
        let ids: Vec<String> = candidates.into_iter().map(|r| r.id).collect();
        if !self.cascade.is_empty() {
            let children = self.cascade.purge(scope, &ids).await?;
            tracing::debug!(kind = %K::KIND, children, "children of swept parents removed");
        }
        let deleted = delete_records(self.store, K::KIND, scope, ids, self.batch_limit).await?;
        tracing::info!(
            vendor = %scope.vendor,
            kind = %K::KIND,
            account_id = %scope.account_id,
            region = %scope.region,
            deleted,
            "swept records missing from the cloud"
        );
        Ok(deleted)
    }
}
