//! Reconciliation driver
//!
//! One generic [`Reconciler`] per (vendor, kind), parameterized by the kind's
//! [`SyncKind`] and its [`CloudSource`]. The per-kind apply concurrency picks
//! the sequential or the pipelined loop; both defer the deletion sweep until
//! the single enumeration has finished.

pub(crate) mod apply;
mod pipelined;
mod sequential;

use crate::cascade::{Cascade, ChildResync};
use crate::core::{DriverMode, KindOptions, SyncConfig, SyncError, SyncResult};
use crate::diff::SyncKind;
use crate::report::{SyncReport, SyncStats};
use crate::source::CloudSource;
use crate::store::MirrorStore;
use crate::sweep::Sweeper;
use apply::PageApplier;
use std::collections::HashSet;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use shared::SyncScope;
use tokio_util::sync::CancellationToken;

/// Await `fut` unless the run is cancelled first
pub(crate) async fn guarded<T, F>(cancel: &CancellationToken, fut: F) -> SyncResult<T>
where
    F: Future<Output = SyncResult<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SyncError::Cancelled),
        result = fut => result,
    }
}

pub struct Reconciler<K, S> {
    source: Arc<S>,
    store: Arc<dyn MirrorStore>,
    options: KindOptions,
    page_size: usize,
    queue_capacity: usize,
    batch_limit: usize,
    verify_before_delete: bool,
    run_timeout: Duration,
    children: Vec<Arc<dyn ChildResync>>,
    _kind: PhantomData<fn() -> K>,
}

impl<K, S> Reconciler<K, S>
where
    K: SyncKind,
    S: CloudSource<Record = K::Cloud>,
{
    pub fn new(source: Arc<S>, store: Arc<dyn MirrorStore>, config: &SyncConfig) -> Self {
        let page_size = config.page_size_for(source.page_limit());
        Self {
            source,
            store,
            options: config.kind_options(K::KIND),
            page_size,
            queue_capacity: config.queue_capacity.max(1),
            batch_limit: config.batch_limit.max(1),
            verify_before_delete: config.verify_before_delete,
            run_timeout: config.run_timeout,
            children: Vec::new(),
            _kind: PhantomData,
        }
    }

    pub fn with_options(mut self, options: KindOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_child(mut self, child: Arc<dyn ChildResync>) -> Self {
        self.children.push(child);
        self
    }

    pub fn mode(&self) -> DriverMode {
        self.options.mode()
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Reconcile one scope
    ///
    /// `cancel` aborts the run from outside; the configured deadline cancels
    /// it as well and is reported as [`SyncError::Timeout`].
    pub async fn run(&self, scope: &SyncScope, cancel: CancellationToken) -> SyncResult<SyncReport> {
        scope.validate_for(K::VENDOR)?;

        let mode = self.mode();
        let report = SyncReport::new(K::KIND, scope, mode.as_str());
        tracing::info!(
            vendor = %K::VENDOR,
            kind = %K::KIND,
            account_id = %scope.account_id,
            region = %scope.region,
            mode = mode.as_str(),
            targeted = scope.is_targeted(),
            "sync started"
        );

        let run_token = cancel.child_token();
        let deadline = {
            let token = run_token.clone();
            let timeout = self.run_timeout;
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                token.cancel();
            })
        };
        let result = self.execute(scope, mode, &run_token).await;
        deadline.abort();

        let result = match result {
            Err(SyncError::Cancelled) if !cancel.is_cancelled() => {
                Err(SyncError::Timeout(self.run_timeout))
            }
            other => other,
        };

        match result {
            Ok(stats) => {
                let report = report.finish(stats);
                tracing::info!(
                    vendor = %K::VENDOR,
                    kind = %K::KIND,
                    account_id = %scope.account_id,
                    region = %scope.region,
                    pages = report.stats.pages,
                    created = report.stats.created,
                    updated = report.stats.updated,
                    deleted = report.stats.deleted,
                    child_failures = report.stats.child_failures,
                    elapsed_ms = report.elapsed_ms,
                    "sync finished"
                );
                Ok(report)
            }
            Err(e) => {
                tracing::error!(
                    vendor = %K::VENDOR,
                    kind = %K::KIND,
                    account_id = %scope.account_id,
                    region = %scope.region,
                    error = %e,
                    "sync failed"
                );
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        scope: &SyncScope,
        mode: DriverMode,
        cancel: &CancellationToken,
    ) -> SyncResult<SyncStats> {
        let cascade = Arc::new(Cascade::new(self.children.clone()));
        let applier = Arc::new(PageApplier::<K>::new(
            self.store.clone(),
            cascade.clone(),
            self.batch_limit,
            self.options.cascade_unchanged,
        ));

        if scope.is_targeted() {
            return self.run_targeted(scope, &applier, &cascade, cancel).await;
        }

        let (mut stats, complete) = match mode {
            DriverMode::Sequential => {
                sequential::enumerate::<K, S>(
                    self.source.as_ref(),
                    &applier,
                    scope,
                    self.page_size,
                    cancel,
                )
                .await?
            }
            DriverMode::Pipelined { workers } => {
                pipelined::enumerate::<K, S>(
                    self.source.clone(),
                    applier.clone(),
                    scope,
                    self.page_size,
                    self.queue_capacity,
                    workers,
                    cancel,
                )
                .await?
            }
        };

        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        stats.deleted = self.sweeper(&cascade).sweep::<K>(scope, complete).await?;
        Ok(stats)
    }

    /// Explicit id list: describe those ids, apply, delete the missing ones
    async fn run_targeted(
        &self,
        scope: &SyncScope,
        applier: &PageApplier<K>,
        cascade: &Cascade,
        cancel: &CancellationToken,
    ) -> SyncResult<SyncStats> {
        let requested = scope.cloud_ids.clone().unwrap_or_default();
        let records = guarded(cancel, async {
            Ok(self.source.fetch_by_ids(scope, &requested).await?)
        })
        .await?;

        let found: HashSet<String> = records.iter().map(|r| K::cloud_id(r).to_string()).collect();
        let mut stats = SyncStats {
            pages: 1,
            fetched: records.len() as u64,
            ..Default::default()
        };
        stats += applier.apply(scope, records, cancel).await?;

        let missing: Vec<String> = requested
            .into_iter()
            .filter(|id| !found.contains(id))
            .collect();
        stats.deleted = self
            .sweeper(cascade)
            .sweep_missing::<K>(scope, missing)
            .await?;
        Ok(stats)
    }

    fn sweeper<'a>(&'a self, cascade: &'a Cascade) -> Sweeper<'a, S> {
        Sweeper {
            store: self.store.as_ref(),
            source: self.source.as_ref(),
            cascade,
            batch_limit: self.batch_limit,
            verify_before_delete: self.verify_before_delete,
        }
    }
}
