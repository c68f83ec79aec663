//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error category classification based on error code ranges
///
/// - 0xxx: General errors
/// - 1xxx: Validation errors
/// - 2xxx: Cloud adapter errors
/// - 3xxx: Store errors
/// - 4xxx: Reconciliation errors
/// - 5xxx and above: System errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// General errors (0xxx)
    General,
    /// Validation errors (1xxx)
    Validation,
    /// Cloud adapter errors (2xxx)
    Cloud,
    /// Store errors (3xxx)
    Store,
    /// Reconciliation errors (4xxx)
    Reconcile,
    /// System errors (9xxx)
    System,
}

impl ErrorCategory {
    /// Determine category from error code value
    pub fn from_code(code: u16) -> Self {
        match code {
            0..1000 => Self::General,
            1000..2000 => Self::Validation,
            2000..3000 => Self::Cloud,
            3000..4000 => Self::Store,
            4000..5000 => Self::Reconcile,
            _ => Self::System,
        }
    }

    /// Get the string name for this category
    pub fn name(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Validation => "validation",
            Self::Cloud => "cloud",
            Self::Store => "store",
            Self::Reconcile => "reconcile",
            Self::System => "system",
        }
    }

    /// Whether a caller may reasonably retry the whole run later
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Cloud | Self::Store | Self::System)
    }
}

impl ErrorCode {
    /// Get the category for this error code
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}
