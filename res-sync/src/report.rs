//! Run counters and reports

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::{ResourceKind, SyncScope, Vendor};
use std::ops::AddAssign;

/// Counters accumulated over a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub pages: u64,
    pub fetched: u64,
    pub created: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub deleted: u64,
    pub child_created: u64,
    pub child_updated: u64,
    pub child_deleted: u64,
    /// Child sets skipped because their aggregate stamp did not move
    pub child_skipped: u64,
    /// Child passes that failed under the soft-fail policy
    pub child_failures: u64,
}

impl AddAssign for SyncStats {
    fn add_assign(&mut self, rhs: Self) {
        self.pages += rhs.pages;
        self.fetched += rhs.fetched;
        self.created += rhs.created;
        self.updated += rhs.updated;
        self.unchanged += rhs.unchanged;
        self.deleted += rhs.deleted;
        self.child_created += rhs.child_created;
        self.child_updated += rhs.child_updated;
        self.child_deleted += rhs.child_deleted;
        self.child_skipped += rhs.child_skipped;
        self.child_failures += rhs.child_failures;
    }
}

/// Outcome of one successful run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub vendor: Vendor,
    pub kind: ResourceKind,
    pub account_id: String,
    pub region: String,
    pub mode: &'static str,
    pub targeted: bool,
    pub stats: SyncStats,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: i64,
}

impl SyncReport {
    pub fn new(kind: ResourceKind, scope: &SyncScope, mode: &'static str) -> Self {
        Self {
            vendor: scope.vendor,
            kind,
            account_id: scope.account_id.clone(),
            region: scope.region.clone(),
            mode,
            targeted: scope.is_targeted(),
            stats: SyncStats::default(),
            started_at: Utc::now(),
            elapsed_ms: 0,
        }
    }

    /// Record the run's counters and its wall time since `started_at`
    pub fn finish(mut self, stats: SyncStats) -> Self {
        self.stats = stats;
        self.elapsed_ms = (Utc::now() - self.started_at).num_milliseconds().max(0);
        self
    }
}
