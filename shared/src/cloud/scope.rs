//! Sync scope: the (vendor, account, region) slice a run reconciles

use super::Vendor;
use crate::error::{AppError, ErrorCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound for an explicit cloud id list in one run
pub const MAX_TARGET_IDS: usize = 100;

/// Scope of one reconciliation run
///
/// `region` holds whatever the vendor partitions by: a region, an Azure
/// resource group, a GCP zone or `"global"`. When `cloud_ids` is set the run
/// is targeted at those ids only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncScope {
    pub vendor: Vendor,
    pub account_id: String,
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    #[error("account id is required")]
    AccountRequired,
    #[error("region is required")]
    RegionRequired,
    #[error("cloud id list is empty")]
    EmptyIdList,
    #[error("cloud id list has {0} ids, at most {max} allowed", max = MAX_TARGET_IDS)]
    TooManyIds(usize),
    #[error("cloud id list contains a blank id")]
    BlankId,
    #[error("scope vendor {actual} does not match {expected}")]
    VendorMismatch { expected: Vendor, actual: Vendor },
}

impl ScopeError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::AccountRequired => ErrorCode::AccountRequired,
            Self::RegionRequired => ErrorCode::RegionRequired,
            Self::EmptyIdList => ErrorCode::EmptyIdList,
            Self::TooManyIds(_) => ErrorCode::TooManyIds,
            Self::BlankId => ErrorCode::BlankId,
            Self::VendorMismatch { .. } => ErrorCode::VendorMismatch,
        }
    }
}

impl From<ScopeError> for AppError {
    fn from(err: ScopeError) -> Self {
        AppError::with_message(err.code(), err.to_string())
    }
}

impl SyncScope {
    pub fn new(vendor: Vendor, account_id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            vendor,
            account_id: account_id.into(),
            region: region.into(),
            cloud_ids: None,
        }
    }

    /// Restrict the run to the given cloud ids
    pub fn with_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cloud_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_targeted(&self) -> bool {
        self.cloud_ids.is_some()
    }

    /// Same account and region without the id restriction
    pub fn untargeted(&self) -> Self {
        Self {
            cloud_ids: None,
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<(), ScopeError> {
        if self.account_id.trim().is_empty() {
            return Err(ScopeError::AccountRequired);
        }
        if self.region.trim().is_empty() {
            return Err(ScopeError::RegionRequired);
        }
        if let Some(ids) = &self.cloud_ids {
            if ids.is_empty() {
                return Err(ScopeError::EmptyIdList);
            }
            if ids.len() > MAX_TARGET_IDS {
                return Err(ScopeError::TooManyIds(ids.len()));
            }
            if ids.iter().any(|id| id.trim().is_empty()) {
                return Err(ScopeError::BlankId);
            }
        }
        Ok(())
    }

    /// Validate and check the scope belongs to `vendor`
    pub fn validate_for(&self, vendor: Vendor) -> Result<(), ScopeError> {
        if self.vendor != vendor {
            return Err(ScopeError::VendorMismatch {
                expected: vendor,
                actual: self.vendor,
            });
        }
        self.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> SyncScope {
        SyncScope::new(Vendor::Aws, "acc-1", "us-east-1")
    }

    #[test]
    fn plain_scope_is_valid() {
        assert_eq!(scope().validate(), Ok(()));
        assert!(!scope().is_targeted());
    }

    #[test]
    fn blank_account_or_region_is_rejected() {
        let mut s = scope();
        s.account_id = "  ".into();
        assert_eq!(s.validate(), Err(ScopeError::AccountRequired));

        let mut s = scope();
        s.region.clear();
        assert_eq!(s.validate(), Err(ScopeError::RegionRequired));
    }

    #[test]
    fn id_list_limits() {
        assert_eq!(
            scope().with_ids(Vec::<String>::new()).validate(),
            Err(ScopeError::EmptyIdList)
        );
        let many: Vec<String> = (0..=MAX_TARGET_IDS).map(|i| format!("sg-{i}")).collect();
        assert_eq!(
            scope().with_ids(many).validate(),
            Err(ScopeError::TooManyIds(MAX_TARGET_IDS + 1))
        );
        assert_eq!(
            scope().with_ids(["sg-1", ""]).validate(),
            Err(ScopeError::BlankId)
        );
        let exact: Vec<String> = (0..MAX_TARGET_IDS).map(|i| format!("sg-{i}")).collect();
        assert_eq!(scope().with_ids(exact).validate(), Ok(()));
    }

    #[test]
    fn vendor_mismatch_maps_to_error_code() {
        let err = scope().validate_for(Vendor::Gcp).unwrap_err();
        assert_eq!(err.code(), ErrorCode::VendorMismatch);
        let app: AppError = err.into();
        assert_eq!(app.code.code(), 1006);
    }

    #[test]
    fn untargeted_drops_ids() {
        let s = scope().with_ids(["sg-1"]);
        assert!(s.is_targeted());
        assert_eq!(s.untargeted(), scope());
    }
}
