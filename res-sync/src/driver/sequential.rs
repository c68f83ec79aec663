//! Fetch one page, apply it, fetch the next

use super::apply::PageApplier;
use super::guarded;
use crate::core::SyncResult;
use crate::cursor::is_last_page;
use crate::diff::SyncKind;
use crate::report::SyncStats;
use crate::source::CloudSource;
use crate::sweep::{CompleteEnumeration, Enumeration};
use shared::SyncScope;
use tokio_util::sync::CancellationToken;

pub(super) async fn enumerate<K, S>(
    source: &S,
    applier: &PageApplier<K>,
    scope: &SyncScope,
    page_size: usize,
    cancel: &CancellationToken,
) -> SyncResult<(SyncStats, CompleteEnumeration)>
where
    K: SyncKind,
    S: CloudSource<Record = K::Cloud>,
{
    let mut stats = SyncStats::default();
    let mut seen = Enumeration::new();
    let mut cursor = S::Cursor::default();

    loop {
        let page = guarded(cancel, async {
            Ok(source.fetch_page(scope, cursor.clone(), page_size).await?)
        })
        .await?;

        let len = page.records.len();
        let last = is_last_page(len, page_size, page.next.as_ref());
        stats.pages += 1;
        stats.fetched += len as u64;
        seen.observe(page.records.iter().map(|r| K::cloud_id(r).to_string()));
        tracing::debug!(kind = %K::KIND, page = stats.pages, records = len, "page fetched");

        if len > 0 {
            stats += applier.apply(scope, page.records, cancel).await?;
        }

        match page.next {
            Some(next) if !last => cursor = next,
            _ => break,
        }
    }

    Ok((stats, seen.finish()))
}
