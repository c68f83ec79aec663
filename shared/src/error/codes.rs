//! Unified error codes for the resource sync workspace
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Validation errors (scope, kind, vendor)
//! - 2xxx: Cloud adapter errors
//! - 3xxx: Mirror store errors
//! - 4xxx: Reconciliation errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so callers outside Rust
/// can match on them without knowing the enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,

    // ==================== 1xxx: Validation ====================
    /// Account id is missing from the scope
    AccountRequired = 1001,
    /// Region / resource group / zone is missing from the scope
    RegionRequired = 1002,
    /// Explicit id list is empty
    EmptyIdList = 1003,
    /// Explicit id list exceeds the per-run limit
    TooManyIds = 1004,
    /// Explicit id list contains a blank id
    BlankId = 1005,
    /// Scope vendor does not match the reconciler
    VendorMismatch = 1006,
    /// Resource kind is not supported for this vendor
    UnsupportedKind = 1007,

    // ==================== 2xxx: Cloud adapter ====================
    /// Cloud API returned an error
    CloudApiError = 2001,
    /// Cloud API throttled the request
    CloudRateLimited = 2002,
    /// Credentials were rejected by the cloud
    CloudUnauthorized = 2003,
    /// Cloud resource not found
    CloudNotFound = 2004,
    /// Transient cloud failure
    CloudTransient = 2005,

    // ==================== 3xxx: Store ====================
    /// Mirror store operation failed
    StoreFailed = 3001,
    /// Duplicate cloud id in scope
    StoreConflict = 3002,
    /// Local record not found
    StoreRecordNotFound = 3003,
    /// Stored payload could not be encoded or decoded
    StorePayloadInvalid = 3004,

    // ==================== 4xxx: Reconciliation ====================
    /// Child resync failed
    ChildResyncFailed = 4001,
    /// Records selected for deletion still exist in the cloud
    DeleteVerificationFailed = 4002,
    /// Run was cancelled
    SyncCancelled = 4003,
    /// Run exceeded its deadline
    SyncTimeout = 4004,
    /// Worker task failed
    SyncTaskFailed = 4005,
    /// No adapter is configured for the vendor
    VendorNotConfigured = 4006,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Network error
    NetworkError = 9003,
    /// Operation timed out
    TimeoutError = 9004,
    /// Configuration error
    ConfigError = 9005,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Get the default message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            Self::Success => "Operation completed successfully",
            Self::Unknown => "Unknown error",
            Self::ValidationFailed => "Validation failed",
            Self::NotFound => "Resource not found",
            Self::AlreadyExists => "Resource already exists",
            Self::InvalidRequest => "Invalid request",

            // Validation
            Self::AccountRequired => "Account id is required",
            Self::RegionRequired => "Region is required",
            Self::EmptyIdList => "Cloud id list must not be empty",
            Self::TooManyIds => "Too many cloud ids",
            Self::BlankId => "Cloud id must not be blank",
            Self::VendorMismatch => "Scope vendor does not match",
            Self::UnsupportedKind => "Resource kind not supported",

            // Cloud adapter
            Self::CloudApiError => "Cloud API error",
            Self::CloudRateLimited => "Cloud API rate limited",
            Self::CloudUnauthorized => "Cloud credentials rejected",
            Self::CloudNotFound => "Cloud resource not found",
            Self::CloudTransient => "Transient cloud failure",

            // Store
            Self::StoreFailed => "Mirror store operation failed",
            Self::StoreConflict => "Cloud id already mirrored",
            Self::StoreRecordNotFound => "Local record not found",
            Self::StorePayloadInvalid => "Stored payload invalid",

            // Reconciliation
            Self::ChildResyncFailed => "Child resync failed",
            Self::DeleteVerificationFailed => "Resources still exist in the cloud",
            Self::SyncCancelled => "Sync cancelled",
            Self::SyncTimeout => "Sync timed out",
            Self::SyncTaskFailed => "Sync task failed",
            Self::VendorNotConfigured => "Vendor not configured",

            // System
            Self::InternalError => "Internal server error",
            Self::DatabaseError => "Database error",
            Self::NetworkError => "Network error",
            Self::TimeoutError => "Operation timed out",
            Self::ConfigError => "Configuration error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code as u16
    }
}

/// Error returned when a u16 value does not map to any [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(Self::Success),
            1 => Ok(Self::Unknown),
            2 => Ok(Self::ValidationFailed),
            3 => Ok(Self::NotFound),
            4 => Ok(Self::AlreadyExists),
            5 => Ok(Self::InvalidRequest),

            // Validation
            1001 => Ok(Self::AccountRequired),
            1002 => Ok(Self::RegionRequired),
            1003 => Ok(Self::EmptyIdList),
            1004 => Ok(Self::TooManyIds),
            1005 => Ok(Self::BlankId),
            1006 => Ok(Self::VendorMismatch),
            1007 => Ok(Self::UnsupportedKind),

            // Cloud adapter
            2001 => Ok(Self::CloudApiError),
            2002 => Ok(Self::CloudRateLimited),
            2003 => Ok(Self::CloudUnauthorized),
            2004 => Ok(Self::CloudNotFound),
            2005 => Ok(Self::CloudTransient),

            // Store
            3001 => Ok(Self::StoreFailed),
            3002 => Ok(Self::StoreConflict),
            3003 => Ok(Self::StoreRecordNotFound),
            3004 => Ok(Self::StorePayloadInvalid),

            // Reconciliation
            4001 => Ok(Self::ChildResyncFailed),
            4002 => Ok(Self::DeleteVerificationFailed),
            4003 => Ok(Self::SyncCancelled),
            4004 => Ok(Self::SyncTimeout),
            4005 => Ok(Self::SyncTaskFailed),
            4006 => Ok(Self::VendorNotConfigured),

            // System
            9001 => Ok(Self::InternalError),
            9002 => Ok(Self::DatabaseError),
            9003 => Ok(Self::NetworkError),
            9004 => Ok(Self::TimeoutError),
            9005 => Ok(Self::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: &[ErrorCode] = &[
        ErrorCode::Success,
        ErrorCode::Unknown,
        ErrorCode::ValidationFailed,
        ErrorCode::NotFound,
        ErrorCode::AlreadyExists,
        ErrorCode::InvalidRequest,
        ErrorCode::AccountRequired,
        ErrorCode::RegionRequired,
        ErrorCode::EmptyIdList,
        ErrorCode::TooManyIds,
        ErrorCode::BlankId,
        ErrorCode::VendorMismatch,
        ErrorCode::UnsupportedKind,
        ErrorCode::CloudApiError,
        ErrorCode::CloudRateLimited,
        ErrorCode::CloudUnauthorized,
        ErrorCode::CloudNotFound,
        ErrorCode::CloudTransient,
        ErrorCode::StoreFailed,
        ErrorCode::StoreConflict,
        ErrorCode::StoreRecordNotFound,
        ErrorCode::StorePayloadInvalid,
        ErrorCode::ChildResyncFailed,
        ErrorCode::DeleteVerificationFailed,
        ErrorCode::SyncCancelled,
        ErrorCode::SyncTimeout,
        ErrorCode::SyncTaskFailed,
        ErrorCode::VendorNotConfigured,
        ErrorCode::InternalError,
        ErrorCode::DatabaseError,
        ErrorCode::NetworkError,
        ErrorCode::TimeoutError,
        ErrorCode::ConfigError,
    ];

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::TooManyIds.code(), 1004);
        assert_eq!(ErrorCode::CloudRateLimited.code(), 2002);
        assert_eq!(ErrorCode::StoreConflict.code(), 3002);
        assert_eq!(ErrorCode::DeleteVerificationFailed.code(), 4002);
        assert_eq!(ErrorCode::ConfigError.code(), 9005);
    }

    #[test]
    fn test_try_from_covers_every_code() {
        for code in ALL {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(*code));
        }
    }

    #[test]
    fn test_try_from_invalid() {
        assert_eq!(ErrorCode::try_from(999), Err(InvalidErrorCode(999)));
        assert_eq!(ErrorCode::try_from(4999), Err(InvalidErrorCode(4999)));
        assert_eq!(ErrorCode::try_from(10000), Err(InvalidErrorCode(10000)));
    }

    #[test]
    fn test_serialize() {
        let json = serde_json::to_string(&ErrorCode::CloudUnauthorized).unwrap();
        assert_eq!(json, "2003");

        let code: ErrorCode = serde_json::from_str("4004").unwrap();
        assert_eq!(code, ErrorCode::SyncTimeout);

        let result: Result<ErrorCode, _> = serde_json::from_str("1234");
        assert!(result.is_err());
    }

    #[test]
    fn test_display_and_message() {
        assert_eq!(format!("{}", ErrorCode::StoreFailed), "3001");
        assert_eq!(ErrorCode::SyncCancelled.message(), "Sync cancelled");
        assert_eq!(
            format!("{}", InvalidErrorCode(7)),
            "invalid error code: 7"
        );
    }

    #[test]
    fn test_is_success() {
        assert!(ErrorCode::Success.is_success());
        assert!(!ErrorCode::StoreFailed.is_success());
    }
}
