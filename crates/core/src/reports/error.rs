//! Report error types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tally_shared::AppError;
use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Invalid date range.
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        /// Start date.
        start: NaiveDate,
        /// End date.
        end: NaiveDate,
    },

    /// Assets differ from liabilities plus equity.
    #[error("Balance sheet out of balance by {difference}")]
    OutOfBalance {
        /// Assets minus liabilities and equity.
        difference: Decimal,
    },

    /// The cash-basis settlement lookup failed.
    #[error("Settlement lookup failed: {0}")]
    SettlementLookup(String),

    /// Storage failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ReportError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidDateRange { .. } => "INVALID_DATE_RANGE",
            Self::OutOfBalance { .. } => "OUT_OF_BALANCE",
            Self::SettlementLookup(_) => "SETTLEMENT_LOOKUP_FAILED",
            Self::Store(e) => e.error_code(),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidDateRange { .. } => 400,
            Self::OutOfBalance { .. } => 409,
            Self::SettlementLookup(_) => 502,
            Self::Store(e) => e.http_status_code(),
        }
    }
}

impl From<ReportError> for AppError {
    fn from(err: ReportError) -> Self {
        Self::from_status(err.http_status_code(), err.to_string())
    }
}
