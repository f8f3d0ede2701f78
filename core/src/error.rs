//! Error types for the nutrition ledger.

use chrono::NaiveDate;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Input rejected before any storage access
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("conflict: {0}")]
    Conflict(String),

    /// Any failure from the backing store; the surrounding transaction is rolled back
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl LedgerError {
    pub(crate) fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("quantity must be greater than 0")]
    NonPositiveQuantity,

    #[error("{field} must not be negative")]
    NegativeNutrient { field: &'static str },

    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    #[error("end date {end} is before start date {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("date range spans {days} days (max {max})", max = crate::history::MAX_RANGE_DAYS)]
    RangeTooLarge { days: i64 },

    #[error("calorie target must not be negative")]
    NegativeCalories,

    #[error("invalid goal type '{0}'. Must be one of: lose, maintain, gain")]
    InvalidGoalType(String),

    #[error("invalid activity level '{0}'")]
    InvalidActivityLevel(String),

    #[error("{field} must be greater than 0")]
    InvalidBodyMetric { field: &'static str },

    #[error("invalid date '{0}'. Use YYYY-MM-DD")]
    InvalidDate(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_converts_into_ledger_error() {
        let err: LedgerError = ValidationError::NonPositiveQuantity.into();
        assert!(err.is_validation());
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "quantity must be greater than 0");
    }

    #[test]
    fn test_range_too_large_message() {
        let err = ValidationError::RangeTooLarge { days: 45 };
        assert_eq!(err.to_string(), "date range spans 45 days (max 30)");
    }

    #[test]
    fn test_not_found_message() {
        let err = LedgerError::not_found("food entry", 7);
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "food entry 7 not found");
    }
}
