//! One fetch task feeding a bounded queue drained by N apply tasks
//!
//! The fetch task keeps the only [`Enumeration`]; the sweep runs after both
//! sides have finished and only if every page was fetched and applied.

use super::apply::PageApplier;
use super::guarded;
use crate::core::{SyncError, SyncResult};
use crate::cursor::is_last_page;
use crate::diff::SyncKind;
use crate::report::SyncStats;
use crate::source::CloudSource;
use crate::sweep::{CompleteEnumeration, Enumeration};
use shared::SyncScope;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

type PageQueue<R> = Arc<Mutex<mpsc::Receiver<Vec<R>>>>;

pub(super) async fn enumerate<K, S>(
    source: Arc<S>,
    applier: Arc<PageApplier<K>>,
    scope: &SyncScope,
    page_size: usize,
    queue_capacity: usize,
    workers: usize,
    cancel: &CancellationToken,
) -> SyncResult<(SyncStats, CompleteEnumeration)>
where
    K: SyncKind,
    S: CloudSource<Record = K::Cloud>,
{
    // an apply failure stops the fetch side and queue intake without touching
    // the caller's token; pages already taken finish under `cancel`
    let halt = cancel.child_token();
    // offset pages over a shifting inventory can repeat an id across pages;
    // PageApplier reclassifies when a sibling created it first
    let (tx, rx) = mpsc::channel::<Vec<K::Cloud>>(queue_capacity.max(1));
    let queue: PageQueue<K::Cloud> = Arc::new(Mutex::new(rx));

    let fetch = tokio::spawn(fetch_pages::<K, S>(
        source,
        scope.clone(),
        page_size,
        tx,
        halt.clone(),
    ));

    let mut tasks = JoinSet::new();
    for worker in 0..workers.max(1) {
        tasks.spawn(apply_pages::<K>(
            worker,
            applier.clone(),
            scope.clone(),
            queue.clone(),
            halt.clone(),
            cancel.clone(),
        ));
    }

    let mut stats = SyncStats::default();
    let mut apply_err: Option<SyncError> = None;
    while let Some(joined) = tasks.join_next().await {
        match joined.map_err(SyncError::from).and_then(|r| r) {
            Ok(s) => stats += s,
            Err(e) => {
                halt.cancel();
                // keep the first real failure over the cancellations it caused
                if apply_err.as_ref().is_none_or(|prev| prev.is_cancelled()) {
                    apply_err = Some(e);
                }
            }
        }
    }

    let fetched = fetch.await.map_err(SyncError::from).and_then(|r| r);
    if let Some(e) = apply_err {
        return Err(e);
    }
    let (fetch_stats, complete) = fetched?;
    stats += fetch_stats;
    Ok((stats, complete))
}

async fn fetch_pages<K, S>(
    source: Arc<S>,
    scope: SyncScope,
    page_size: usize,
    tx: mpsc::Sender<Vec<K::Cloud>>,
    halt: CancellationToken,
) -> SyncResult<(SyncStats, CompleteEnumeration)>
where
    K: SyncKind,
    S: CloudSource<Record = K::Cloud>,
{
    let mut stats = SyncStats::default();
    let mut seen = Enumeration::new();
    let mut cursor = S::Cursor::default();

    loop {
        let page = guarded(&halt, async {
            Ok(source.fetch_page(&scope, cursor.clone(), page_size).await?)
        })
        .await?;

        let len = page.records.len();
        let last = is_last_page(len, page_size, page.next.as_ref());
        stats.pages += 1;
        stats.fetched += len as u64;
        seen.observe(page.records.iter().map(|r| K::cloud_id(r).to_string()));
        tracing::debug!(kind = %K::KIND, page = stats.pages, records = len, "page fetched");

        if len > 0 {
            tokio::select! {
                biased;
                _ = halt.cancelled() => return Err(SyncError::Cancelled),
                sent = tx.send(page.records) => {
                    if sent.is_err() {
                        // every apply task is gone
                        return Err(SyncError::Cancelled);
                    }
                }
            }
        }

        match page.next {
            Some(next) if !last => cursor = next,
            _ => break,
        }
    }

    Ok((stats, seen.finish()))
}

/// Drain the queue until it closes or `halt` fires. A page already taken is
/// applied under the run token so its parents never lose their child pass.
async fn apply_pages<K: SyncKind>(
    worker: usize,
    applier: Arc<PageApplier<K>>,
    scope: SyncScope,
    queue: PageQueue<K::Cloud>,
    halt: CancellationToken,
    cancel: CancellationToken,
) -> SyncResult<SyncStats> {
    let mut stats = SyncStats::default();
    loop {
        let next = tokio::select! {
            biased;
            _ = halt.cancelled() => return Err(SyncError::Cancelled),
            next = async { queue.lock().await.recv().await } => next,
        };
        let Some(records) = next else {
            break;
        };
        match applier.apply(&scope, records, &cancel).await {
            Ok(s) => stats += s,
            Err(e) => {
                tracing::warn!(kind = %K::KIND, worker, error = %e, "page apply failed");
                halt.cancel();
                return Err(e);
            }
        }
    }
    Ok(stats)
}
