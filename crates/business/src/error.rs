//! Business layer errors
//!
//! Every operation returns a typed `BusinessError`. `kind()` groups the
//! variants into the failure classes a boundary layer maps to a status.

use rcard_core::UserId;
use rust_decimal::Decimal;
use thiserror::Error;

/// Failure class of a business error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    PolicyViolation,
    InsufficientFunds,
    Conflict,
    Unauthenticated,
    RateLimited,
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::PolicyViolation => "policy_violation",
            ErrorKind::InsufficientFunds => "insufficient_funds",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Storage => "storage",
        }
    }
}

/// Business operation errors
#[derive(Debug, Error)]
pub enum BusinessError {
    // === Validation errors ===
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // === Not found errors ===
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Loan not found: {0}")]
    LoanNotFound(String),

    #[error("Card not found: {0}")]
    CardNotFound(String),

    // === Policy violations ===
    #[error("Loan duration {days} days is below the card minimum of {min_days} days")]
    BelowMinDays { days: u32, min_days: u32 },

    #[error("Yearly loan limit exceeded: {used} already borrowed, {requested} requested, limit {max}")]
    YearlyLimitExceeded {
        used: Decimal,
        requested: Decimal,
        max: Decimal,
    },

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        required: Decimal,
        available: Decimal,
    },

    // === Conflicts ===
    #[error("Loan is not active: {0}")]
    LoanNotActive(String),

    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    #[error("Card already held: {0}")]
    DuplicateCard(String),

    // === Access errors ===
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Too many {action} attempts, retry in {retry_after_secs}s")]
    RateLimited {
        action: String,
        retry_after_secs: u64,
    },

    // === Wrapped errors ===
    #[error("Persistence error: {0}")]
    Persistence(#[from] rcard_persistence::PersistenceError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] sqlx::Error),

    #[error("Core error: {0}")]
    Core(#[from] rcard_core::CoreError),
}

/// Result type alias for business operations
pub type BusinessResult<T> = Result<T, BusinessError>;

impl BusinessError {
    pub fn insufficient_balance(required: Decimal, available: Decimal) -> Self {
        Self::InsufficientBalance {
            required,
            available,
        }
    }

    pub fn yearly_limit_exceeded(used: Decimal, requested: Decimal, max: Decimal) -> Self {
        Self::YearlyLimitExceeded {
            used,
            requested,
            max,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        use rcard_core::CoreError;

        match self {
            Self::InvalidInput(_) | Self::InvalidAmount(_) | Self::InvalidConfig(_) => {
                ErrorKind::Validation
            }
            Self::UserNotFound(_) | Self::LoanNotFound(_) | Self::CardNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::BelowMinDays { .. } | Self::YearlyLimitExceeded { .. } => {
                ErrorKind::PolicyViolation
            }
            Self::InsufficientBalance { .. } => ErrorKind::InsufficientFunds,
            Self::LoanNotActive(_) | Self::UsernameTaken(_) | Self::DuplicateCard(_) => {
                ErrorKind::Conflict
            }
            Self::InvalidCredentials | Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Core(CoreError::InvalidAmount(_) | CoreError::InvalidTerm(_)) => {
                ErrorKind::Validation
            }
            Self::Core(_) | Self::Persistence(_) | Self::Transaction(_) => ErrorKind::Storage,
        }
    }

    /// Transport status for this error (HTTP semantics)
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation => 400,
            ErrorKind::Unauthenticated => 401,
            ErrorKind::InsufficientFunds => 402,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::PolicyViolation => 422,
            ErrorKind::RateLimited => 429,
            ErrorKind::Storage => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_insufficient_balance_error() {
        let err = BusinessError::insufficient_balance(dec!(100), dec!(50));
        assert!(err.to_string().contains("required 100"));
        assert!(err.to_string().contains("available 50"));
        assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
    }

    #[test]
    fn test_policy_violations() {
        let err = BusinessError::yearly_limit_exceeded(dec!(500), dec!(600), dec!(1000));
        assert_eq!(err.kind(), ErrorKind::PolicyViolation);
        assert_eq!(err.status_code(), 422);

        let err = BusinessError::BelowMinDays { days: 2, min_days: 5 };
        assert_eq!(err.kind(), ErrorKind::PolicyViolation);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(BusinessError::InvalidAmount("x".into()).status_code(), 400);
        assert_eq!(BusinessError::UserNotFound(7).status_code(), 404);
        assert_eq!(BusinessError::LoanNotActive("loan_1".into()).status_code(), 409);
        assert_eq!(BusinessError::Unauthenticated.status_code(), 401);
        assert_eq!(
            BusinessError::Core(rcard_core::CoreError::InvalidAmount("x".into())).kind(),
            ErrorKind::Validation
        );
    }
}
