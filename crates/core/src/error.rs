//! # Error Module
//!
//! Domain errors raised by core types, built with thiserror.

use thiserror::Error;

/// Core domain errors.
///
/// Business rule violations live in the business crate; these cover
/// malformed domain data (bad policies, unknown enum values).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid policy {id}: {reason}")]
    InvalidPolicy { id: String, reason: String },

    #[error("Duplicate policy id in catalog: {0}")]
    DuplicatePolicy(String),

    #[error("Unknown card type: {0}")]
    UnknownCardType(String),

    #[error("Unknown loan status: {0}")]
    UnknownLoanStatus(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Loan term of {0} days is out of range")]
    InvalidTerm(u32),

    #[error("Failed to read catalog: {0}")]
    CatalogIo(#[from] std::io::Error),

    #[error("Failed to parse catalog: {0}")]
    CatalogParse(#[from] serde_json::Error),
}

/// Result type alias with CoreError
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create an InvalidPolicy error
    pub fn invalid_policy(id: &str, reason: &str) -> Self {
        Self::InvalidPolicy {
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::invalid_policy("gold-credit", "min_interest_days must be >= 1");
        assert_eq!(
            err.to_string(),
            "Invalid policy gold-credit: min_interest_days must be >= 1"
        );

        let err = CoreError::UnknownLoanStatus("defaulted".to_string());
        assert_eq!(err.to_string(), "Unknown loan status: defaulted");
    }
}
