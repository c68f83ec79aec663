//! In-memory fakes shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use res_sync::cursor::{OffsetCursor, TokenCursor};
use res_sync::store::{
    InMemoryStore, MirrorStore, NewRecord, RecordFilter, RecordUpdate, StoreError, StoreOp,
    StoreResult, StoredRecord,
};
use res_sync::{
    ChildSet, ChildSource, CloudSource, MapContext, Page, SourceError, SourceResult, SyncConfig,
    SyncKind,
};
use serde::{Deserialize, Serialize};
use shared::{ResourceKind, SyncScope, Vendor};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub fn scope() -> SyncScope {
    SyncScope::new(Vendor::TCloud, "100001", "ap-guangzhou")
}

/// Defaults without implicit cascades, so op-log assertions stay exact
pub fn config() -> SyncConfig {
    SyncConfig {
        cascade_unchanged: HashSet::new(),
        ..Default::default()
    }
}

pub fn deletes(ops: &[StoreOp], kind: ResourceKind) -> Vec<String> {
    ops.iter()
        .filter_map(|op| match op {
            StoreOp::Delete { kind: k, cloud_ids } if *k == kind => Some(cloud_ids.clone()),
            _ => None,
        })
        .flatten()
        .collect()
}

pub fn queries_of(ops: &[StoreOp], kind: ResourceKind) -> usize {
    ops.iter()
        .filter(|op| matches!(op, StoreOp::Query { kind: k, .. } if *k == kind))
        .count()
}

pub fn writes(ops: &[StoreOp]) -> usize {
    ops.iter()
        .filter(|op| !matches!(op, StoreOp::Query { .. }))
        .count()
}

pub trait Identified: Clone + Send + Sync + 'static {
    fn id(&self) -> &str;
}

// ========== Kinds ==========

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Net {
    pub id: String,
    pub name: String,
}

impl Identified for Net {
    fn id(&self) -> &str {
        &self.id
    }
}

pub fn nets(n: usize) -> Vec<Net> {
    (0..n)
        .map(|i| Net {
            id: format!("vpc-{i:04}"),
            name: format!("net {i}"),
        })
        .collect()
}

pub struct NetKind;

impl SyncKind for NetKind {
    type Cloud = Net;
    type Local = Net;

    const VENDOR: Vendor = Vendor::TCloud;
    const KIND: ResourceKind = ResourceKind::Vpc;

    fn cloud_id(cloud: &Net) -> &str {
        &cloud.id
    }

    fn to_local(cloud: &Net, _ctx: &MapContext<'_>) -> Net {
        cloud.clone()
    }

    fn changed(cloud: &Net, local: &Net) -> bool {
        cloud.name != local.name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
}

impl Identified for Group {
    fn id(&self) -> &str {
        &self.id
    }
}

pub fn groups(n: usize) -> Vec<Group> {
    (0..n)
        .map(|i| Group {
            id: format!("sg-{i}"),
            name: format!("group {i}"),
        })
        .collect()
}

pub struct GroupKind;

impl SyncKind for GroupKind {
    type Cloud = Group;
    type Local = Group;

    const VENDOR: Vendor = Vendor::TCloud;
    const KIND: ResourceKind = ResourceKind::SecurityGroup;

    fn cloud_id(cloud: &Group) -> &str {
        &cloud.id
    }

    fn to_local(cloud: &Group, _ctx: &MapContext<'_>) -> Group {
        cloud.clone()
    }

    fn changed(cloud: &Group, local: &Group) -> bool {
        cloud.name != local.name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub group_id: String,
    pub port: String,
}

pub fn rule(group: &str, n: usize, port: &str) -> Rule {
    Rule {
        id: format!("{group}-r{n}"),
        group_id: group.to_string(),
        port: port.to_string(),
    }
}

pub struct RuleKind;

impl SyncKind for RuleKind {
    type Cloud = Rule;
    type Local = Rule;

    const VENDOR: Vendor = Vendor::TCloud;
    const KIND: ResourceKind = ResourceKind::SecurityGroupRule;

    fn cloud_id(cloud: &Rule) -> &str {
        &cloud.id
    }

    fn to_local(cloud: &Rule, ctx: &MapContext<'_>) -> Rule {
        Rule {
            group_id: ctx
                .parent
                .map(|p| p.cloud_id.clone())
                .unwrap_or_else(|| cloud.group_id.clone()),
            ..cloud.clone()
        }
    }

    fn changed(cloud: &Rule, local: &Rule) -> bool {
        cloud.port != local.port
    }
}

// ========== Sources ==========

/// Offset-paged listing over a mutable inventory
pub struct OffsetSource<R> {
    listed: Mutex<Vec<R>>,
    /// Still returned by id lookups after leaving the listing
    lingering: Mutex<Vec<R>>,
    fail_at_offset: Mutex<Option<u64>>,
    delay: Mutex<Option<Duration>>,
    page_calls: AtomicUsize,
    id_calls: AtomicUsize,
}

impl<R: Identified> OffsetSource<R> {
    pub fn new(records: Vec<R>) -> Self {
        Self {
            listed: Mutex::new(records),
            lingering: Mutex::new(Vec::new()),
            fail_at_offset: Mutex::new(None),
            delay: Mutex::new(None),
            page_calls: AtomicUsize::new(0),
            id_calls: AtomicUsize::new(0),
        }
    }

    pub fn remove(&self, id: &str) {
        self.listed.lock().retain(|r| r.id() != id);
    }

    /// Drop from the listing but keep answering id lookups
    pub fn hide(&self, id: &str) {
        let mut listed = self.listed.lock();
        if let Some(pos) = listed.iter().position(|r| r.id() == id) {
            let record = listed.remove(pos);
            self.lingering.lock().push(record);
        }
    }

    pub fn push(&self, record: R) {
        self.listed.lock().push(record);
    }

    pub fn edit(&self, id: &str, f: impl FnOnce(&mut R)) {
        if let Some(r) = self.listed.lock().iter_mut().find(|r| r.id() == id) {
            f(r);
        }
    }

    pub fn fail_at(&self, offset: u64) {
        *self.fail_at_offset.lock() = Some(offset);
    }

    pub fn recover(&self) {
        *self.fail_at_offset.lock() = None;
    }

    pub fn slow(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn page_calls(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }

    pub fn id_calls(&self) -> usize {
        self.id_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<R: Identified> CloudSource for OffsetSource<R> {
    type Record = R;
    type Cursor = OffsetCursor;

    fn page_limit(&self) -> usize {
        1000
    }

    async fn fetch_page(
        &self,
        _scope: &SyncScope,
        cursor: OffsetCursor,
        limit: usize,
    ) -> SourceResult<Page<R, OffsetCursor>> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if *self.fail_at_offset.lock() == Some(cursor.offset) {
            return Err(SourceError::Transient("connection reset".into()));
        }
        let listed = self.listed.lock();
        let start = (cursor.offset as usize).min(listed.len());
        let end = (start + limit).min(listed.len());
        let records = listed[start..end].to_vec();
        let next = Some(cursor.advance(records.len()));
        Ok(Page { records, next })
    }

    async fn fetch_by_ids(&self, _scope: &SyncScope, ids: &[String]) -> SourceResult<Vec<R>> {
        self.id_calls.fetch_add(1, Ordering::SeqCst);
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let listed = self.listed.lock();
        let lingering = self.lingering.lock();
        Ok(listed
            .iter()
            .chain(lingering.iter())
            .filter(|r| wanted.contains(r.id()))
            .cloned()
            .collect())
    }
}

/// Token-paged listing with scripted page sizes
pub struct TokenSource<R> {
    records: Vec<R>,
    sizes: Vec<usize>,
    page_calls: AtomicUsize,
}

impl<R: Identified> TokenSource<R> {
    /// Page `i` carries `sizes[i]` records; every page but the last has a token
    pub fn new(records: Vec<R>, sizes: Vec<usize>) -> Self {
        Self {
            records,
            sizes,
            page_calls: AtomicUsize::new(0),
        }
    }

    pub fn page_calls(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<R: Identified> CloudSource for TokenSource<R> {
    type Record = R;
    type Cursor = TokenCursor;

    fn page_limit(&self) -> usize {
        1000
    }

    async fn fetch_page(
        &self,
        _scope: &SyncScope,
        cursor: TokenCursor,
        _limit: usize,
    ) -> SourceResult<Page<R, TokenCursor>> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        let index: usize = match cursor.token() {
            Some(t) => t
                .parse()
                .map_err(|_| SourceError::api("InvalidNextToken", t.to_string()))?,
            None => 0,
        };
        let start: usize = self.sizes[..index].iter().sum();
        let end = (start + self.sizes.get(index).copied().unwrap_or(0)).min(self.records.len());
        let records = self.records[start.min(end)..end].to_vec();
        let token = (index + 1 < self.sizes.len()).then(|| (index + 1).to_string());
        Ok(Page {
            records,
            next: TokenCursor::next(token),
        })
    }

    async fn fetch_by_ids(&self, _scope: &SyncScope, ids: &[String]) -> SourceResult<Vec<R>> {
        Ok(self
            .records
            .iter()
            .filter(|r| ids.iter().any(|id| id == r.id()))
            .cloned()
            .collect())
    }
}

/// Rule sets keyed by group id
#[derive(Default)]
pub struct RuleSource {
    sets: Mutex<HashMap<String, ChildSet<Rule>>>,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
    delay: Mutex<Option<Duration>>,
}

impl RuleSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, group: &str, stamp: Option<&str>, rules: Vec<Rule>) {
        self.sets.lock().insert(
            group.to_string(),
            ChildSet {
                stamp: stamp.map(str::to_string),
                records: rules,
            },
        );
    }

    pub fn fail_for(&self, group: &str) {
        self.failing.lock().insert(group.to_string());
    }

    pub fn slow(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Group ids asked for, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }
}

#[async_trait]
impl ChildSource for RuleSource {
    type Record = Rule;

    async fn fetch_children(
        &self,
        _scope: &SyncScope,
        parent_cloud_id: &str,
    ) -> SourceResult<ChildSet<Rule>> {
        self.calls.lock().push(parent_cloud_id.to_string());
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().contains(parent_cloud_id) {
            return Err(SourceError::RateLimited("RequestLimitExceeded".into()));
        }
        Ok(self
            .sets
            .lock()
            .get(parent_cloud_id)
            .cloned()
            .unwrap_or_else(|| ChildSet::unstamped(Vec::new())))
    }
}

// ========== Store ==========

/// Wraps the in-memory store and fails creates on demand, by kind or by
/// cloud id
pub struct FlakyStore {
    pub inner: Arc<InMemoryStore>,
    fail_creates: Mutex<Option<ResourceKind>>,
    fail_ids: Mutex<HashSet<String>>,
}

impl FlakyStore {
    pub fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            fail_creates: Mutex::new(None),
            fail_ids: Mutex::new(HashSet::new()),
        }
    }

    pub fn fail_creates(&self, kind: ResourceKind) {
        *self.fail_creates.lock() = Some(kind);
    }

    pub fn fail_create_of(&self, cloud_id: &str) {
        self.fail_ids.lock().insert(cloud_id.to_string());
    }

    pub fn heal(&self) {
        *self.fail_creates.lock() = None;
        self.fail_ids.lock().clear();
    }
}

#[async_trait]
impl MirrorStore for FlakyStore {
    async fn query(&self, filter: &RecordFilter) -> StoreResult<Vec<StoredRecord>> {
        self.inner.query(filter).await
    }

    async fn batch_create(&self, new: Vec<NewRecord>) -> StoreResult<Vec<String>> {
        let failing = *self.fail_creates.lock();
        if failing.is_some() && new.first().map(|r| r.kind) == failing {
            return Err(StoreError::Database("connection pool timed out".into()));
        }
        let hit = {
            let ids = self.fail_ids.lock();
            new.iter().any(|r| ids.contains(&r.cloud_id))
        };
        if hit {
            return Err(StoreError::Database("deadlock detected".into()));
        }
        self.inner.batch_create(new).await
    }

    async fn batch_update(&self, updates: Vec<RecordUpdate>) -> StoreResult<()> {
        self.inner.batch_update(updates).await
    }

    async fn batch_delete(&self, filter: &RecordFilter) -> StoreResult<u64> {
        self.inner.batch_delete(filter).await
    }
}
