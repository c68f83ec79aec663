//! Sync engine configuration

use shared::ResourceKind;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: unknown resource kind '{value}'")]
    UnknownKind { var: &'static str, value: String },
    #[error("{var}: malformed entry '{value}', expected kind=n")]
    Malformed { var: &'static str, value: String },
}

/// How a child kind's failure affects its parent's page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChildFailurePolicy {
    /// Log, count and carry on
    #[default]
    SoftFail,
    /// Fail the parent page
    HardFail,
}

/// Which driver a kind runs under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverMode {
    Sequential,
    Pipelined { workers: usize },
}

impl DriverMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Pipelined { .. } => "pipelined",
        }
    }
}

/// Per-kind options handed to a reconciler at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindOptions {
    pub apply_concurrency: usize,
    /// Also run child passes for parents that did not change
    pub cascade_unchanged: bool,
}

impl Default for KindOptions {
    fn default() -> Self {
        Self {
            apply_concurrency: 1,
            cascade_unchanged: false,
        }
    }
}

impl KindOptions {
    pub fn mode(&self) -> DriverMode {
        if self.apply_concurrency > 1 {
            DriverMode::Pipelined {
                workers: self.apply_concurrency,
            }
        } else {
            DriverMode::Sequential
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Page-size ceiling applied below the provider constant
    pub page_size: Option<usize>,
    /// Pipelined queue bound, in pages
    pub queue_capacity: usize,
    /// Run deadline
    pub run_timeout: Duration,
    /// Store batch size for create/update/delete
    pub batch_limit: usize,
    /// Re-check sweep candidates against the cloud before deleting
    pub verify_before_delete: bool,
    /// Parallel child passes for explicit child entry points
    pub child_concurrency: usize,
    pub apply_concurrency: HashMap<ResourceKind, usize>,
    pub child_hard_fail: HashSet<ResourceKind>,
    /// Parent kinds whose unchanged records still get child passes
    pub cascade_unchanged: HashSet<ResourceKind>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: None,
            queue_capacity: 4,
            run_timeout: Duration::from_millis(1_800_000),
            batch_limit: 100,
            verify_before_delete: true,
            child_concurrency: 10,
            apply_concurrency: HashMap::new(),
            child_hard_fail: HashSet::new(),
            // child edits never show on these parents
            cascade_unchanged: HashSet::from([
                ResourceKind::SecurityGroup,
                ResourceKind::LoadBalancer,
            ]),
        }
    }
}

impl SyncConfig {
    /// Load `.env` if present, then read the environment
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; unparsable numbers fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let number = |name: &str| lookup(name).and_then(|v| v.trim().parse::<u64>().ok());

        Ok(Self {
            page_size: number("SYNC_PAGE_SIZE")
                .filter(|n| *n > 0)
                .map(|n| n as usize),
            queue_capacity: number("SYNC_QUEUE_CAPACITY")
                .map(|n| n.max(1) as usize)
                .unwrap_or(defaults.queue_capacity),
            run_timeout: number("SYNC_RUN_TIMEOUT_MS")
                .filter(|n| *n > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.run_timeout),
            batch_limit: number("SYNC_BATCH_LIMIT")
                .map(|n| n.max(1) as usize)
                .unwrap_or(defaults.batch_limit),
            verify_before_delete: lookup("SYNC_VERIFY_BEFORE_DELETE")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.verify_before_delete),
            child_concurrency: number("SYNC_CHILD_CONCURRENCY")
                .map(|n| n.max(1) as usize)
                .unwrap_or(defaults.child_concurrency),
            apply_concurrency: parse_apply_concurrency(
                lookup("SYNC_APPLY_CONCURRENCY").as_deref().unwrap_or(""),
            )?,
            child_hard_fail: parse_kind_list(
                "SYNC_CHILD_HARD_FAIL",
                lookup("SYNC_CHILD_HARD_FAIL").as_deref().unwrap_or(""),
            )?,
            cascade_unchanged: match lookup("SYNC_CASCADE_UNCHANGED") {
                Some(list) => parse_kind_list("SYNC_CASCADE_UNCHANGED", &list)?,
                None => defaults.cascade_unchanged,
            },
        })
    }

    pub fn kind_options(&self, kind: ResourceKind) -> KindOptions {
        KindOptions {
            apply_concurrency: self.apply_concurrency.get(&kind).copied().unwrap_or(1),
            cascade_unchanged: self.cascade_unchanged.contains(&kind),
        }
    }

    pub fn child_policy(&self, kind: ResourceKind) -> ChildFailurePolicy {
        if self.child_hard_fail.contains(&kind) {
            ChildFailurePolicy::HardFail
        } else {
            ChildFailurePolicy::SoftFail
        }
    }

    /// Effective page size for a provider constant
    pub fn page_size_for(&self, provider_limit: usize) -> usize {
        self.page_size
            .map_or(provider_limit, |ceiling| ceiling.min(provider_limit))
            .max(1)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse `kind=n,kind=n`; an unparsable `n` keeps the default of 1
pub fn parse_apply_concurrency(value: &str) -> Result<HashMap<ResourceKind, usize>, ConfigError> {
    const VAR: &str = "SYNC_APPLY_CONCURRENCY";
    let mut out = HashMap::new();
    for entry in value.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let Some((kind, n)) = entry.split_once('=') else {
            return Err(ConfigError::Malformed {
                var: VAR,
                value: entry.to_string(),
            });
        };
        let kind = kind.parse::<ResourceKind>().map_err(|_| ConfigError::UnknownKind {
            var: VAR,
            value: kind.trim().to_string(),
        })?;
        if let Ok(n) = n.trim().parse::<usize>() {
            out.insert(kind, n.max(1));
        }
    }
    Ok(out)
}

pub fn parse_kind_list(
    var: &'static str,
    value: &str,
) -> Result<HashSet<ResourceKind>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(|e| {
            e.parse::<ResourceKind>()
                .map_err(|_| ConfigError::UnknownKind {
                    var,
                    value: e.to_string(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = SyncConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.page_size, None);
        assert_eq!(config.queue_capacity, 4);
        assert_eq!(config.run_timeout, Duration::from_secs(1800));
        assert_eq!(config.batch_limit, 100);
        assert!(config.verify_before_delete);
        assert_eq!(config.child_concurrency, 10);
        assert_eq!(
            config.kind_options(ResourceKind::Vpc).mode(),
            DriverMode::Sequential
        );
    }

    #[test]
    fn reads_numbers_and_falls_back_on_garbage() {
        let config = SyncConfig::from_lookup(lookup(&[
            ("SYNC_PAGE_SIZE", "50"),
            ("SYNC_QUEUE_CAPACITY", "0"),
            ("SYNC_BATCH_LIMIT", "abc"),
            ("SYNC_VERIFY_BEFORE_DELETE", "off"),
            ("SYNC_RUN_TIMEOUT_MS", "2500"),
        ]))
        .unwrap();
        assert_eq!(config.page_size, Some(50));
        assert_eq!(config.queue_capacity, 1);
        assert_eq!(config.batch_limit, 100);
        assert!(!config.verify_before_delete);
        assert_eq!(config.run_timeout, Duration::from_millis(2500));
    }

    #[test]
    fn apply_concurrency_selects_pipelined_mode() {
        let config = SyncConfig::from_lookup(lookup(&[(
            "SYNC_APPLY_CONCURRENCY",
            "security_group=4, vpc=1, load_balancer=x",
        )]))
        .unwrap();
        assert_eq!(
            config.kind_options(ResourceKind::SecurityGroup).mode(),
            DriverMode::Pipelined { workers: 4 }
        );
        assert_eq!(
            config.kind_options(ResourceKind::Vpc).mode(),
            DriverMode::Sequential
        );
        assert_eq!(
            config.kind_options(ResourceKind::LoadBalancer).apply_concurrency,
            1
        );
    }

    #[test]
    fn unknown_kind_is_an_error() {
        let err = parse_apply_concurrency("subnet=2").unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownKind {
                var: "SYNC_APPLY_CONCURRENCY",
                value: "subnet".into()
            }
        );
        assert!(matches!(
            parse_apply_concurrency("vpc"),
            Err(ConfigError::Malformed { .. })
        ));
        assert!(parse_kind_list("SYNC_CHILD_HARD_FAIL", "listener,route").is_err());
    }

    #[test]
    fn hard_fail_list_sets_child_policy() {
        let config = SyncConfig::from_lookup(lookup(&[(
            "SYNC_CHILD_HARD_FAIL",
            "security_group_rule",
        )]))
        .unwrap();
        assert_eq!(
            config.child_policy(ResourceKind::SecurityGroupRule),
            ChildFailurePolicy::HardFail
        );
        assert_eq!(
            config.child_policy(ResourceKind::Listener),
            ChildFailurePolicy::SoftFail
        );
    }

    #[test]
    fn parents_cascade_unchanged_records_by_default() {
        let config = SyncConfig::default();
        assert!(config.kind_options(ResourceKind::SecurityGroup).cascade_unchanged);
        assert!(config.kind_options(ResourceKind::LoadBalancer).cascade_unchanged);
        assert!(!config.kind_options(ResourceKind::Vpc).cascade_unchanged);

        let off = SyncConfig::from_lookup(lookup(&[("SYNC_CASCADE_UNCHANGED", "")])).unwrap();
        assert!(!off.kind_options(ResourceKind::SecurityGroup).cascade_unchanged);
    }

    #[test]
    fn page_size_is_capped_by_provider_constant() {
        let mut config = SyncConfig::default();
        assert_eq!(config.page_size_for(100), 100);
        config.page_size = Some(500);
        assert_eq!(config.page_size_for(100), 100);
        config.page_size = Some(20);
        assert_eq!(config.page_size_for(1000), 20);
    }
}
