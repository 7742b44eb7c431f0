//! Economy error types.

use std::borrow::Cow;
use std::time::Duration;

use thiserror::Error;

use crate::{CaseId, CodeId, ListingId, UserId};

/// PostgreSQL SQLSTATE for `serialization_failure`.
const SQLSTATE_SERIALIZATION_FAILURE: &str = "40001";

/// PostgreSQL SQLSTATE for `deadlock_detected`.
const SQLSTATE_DEADLOCK_DETECTED: &str = "40P01";

/// PostgreSQL SQLSTATE for `numeric_value_out_of_range`.
pub(crate) const SQLSTATE_NUMERIC_OUT_OF_RANGE: &str = "22003";

/// Economy errors
#[derive(Debug, Error)]
pub enum EconomyError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Account not found
    #[error("User {0} not found")]
    UserNotFound(UserId),

    /// Case not found in the catalog
    #[error("Case {0} not found")]
    CaseNotFound(CaseId),

    /// Case has no items to draw from
    #[error("Case {0} has no items")]
    EmptyCase(CaseId),

    /// Item weights cannot produce a draw
    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    /// Insufficient balance
    #[error("Insufficient balance: available {available}, required {required}")]
    InsufficientBalance {
        user_id: UserId,
        available: i64,
        required: i64,
    },

    /// Redeemable code not found
    #[error("Code {0} not found")]
    CodeNotFound(CodeId),

    /// Caller does not own the code or listing
    #[error("User {user_id} does not own {resource}")]
    NotOwner { user_id: UserId, resource: String },

    /// Code was already consumed
    #[error("Code {0} already used or sold")]
    AlreadyConsumed(CodeId),

    /// Code cannot change owner in its current state
    #[error("Code {0} cannot be transferred in its current state")]
    InvalidState(CodeId),

    /// Code is missing, consumed, or not owned by the seller
    #[error("Code {0} cannot be listed")]
    InvalidCode(CodeId),

    /// Code already has an open listing
    #[error("Code {0} is already listed")]
    AlreadyListed(CodeId),

    /// Code has an open listing and cannot be redeemed
    #[error("Code {0} is listed on the market")]
    CodeListed(CodeId),

    /// Listing is missing or no longer open
    #[error("Listing {0} is not available")]
    NotAvailable(ListingId),

    /// Buyer is the seller
    #[error("Cannot buy your own listing {0}")]
    SelfTrade(ListingId),

    /// Invalid amount (must be positive)
    #[error("Invalid amount: {0}")]
    InvalidAmount(i64),

    /// Credit would overflow the balance
    #[error("Balance overflow for user {0}")]
    BalanceOverflow(UserId),

    /// Transaction attempt exceeded its deadline
    #[error("Transaction timed out after {0:?}")]
    Timeout(Duration),

    /// Transaction failed
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),
}

/// Coarse error classes, used for status mapping and retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Missing or malformed input; nothing was mutated
    Validation,
    /// Request raced or targets stale state
    StateConflict,
    /// Referenced resource does not exist
    NotFound,
    /// Caller is not allowed to act on the resource
    Forbidden,
    /// Balance too low
    InsufficientFunds,
    /// Store failure
    Internal,
}

impl EconomyError {
    /// Classify the error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            EconomyError::InvalidAmount(_) | EconomyError::InvalidCode(_) => {
                ErrorCategory::Validation
            }
            EconomyError::AlreadyConsumed(_)
            | EconomyError::InvalidState(_)
            | EconomyError::AlreadyListed(_)
            | EconomyError::CodeListed(_)
            | EconomyError::NotAvailable(_)
            | EconomyError::SelfTrade(_) => ErrorCategory::StateConflict,
            EconomyError::UserNotFound(_)
            | EconomyError::CaseNotFound(_)
            | EconomyError::CodeNotFound(_)
            | EconomyError::EmptyCase(_)
            | EconomyError::InvalidCatalog(_) => ErrorCategory::NotFound,
            EconomyError::NotOwner { .. } => ErrorCategory::Forbidden,
            EconomyError::InsufficientBalance { .. } => ErrorCategory::InsufficientFunds,
            EconomyError::Database(_)
            | EconomyError::BalanceOverflow(_)
            | EconomyError::Timeout(_)
            | EconomyError::TransactionFailed(_) => ErrorCategory::Internal,
        }
    }

    /// HTTP-style status hint for the routing layer.
    pub fn status_code(&self) -> u16 {
        match self {
            // Catalog problems surface as bad requests rather than missing resources
            EconomyError::EmptyCase(_) | EconomyError::InvalidCatalog(_) => 400,
            _ => match self.category() {
                ErrorCategory::Validation
                | ErrorCategory::StateConflict
                | ErrorCategory::InsufficientFunds => 400,
                ErrorCategory::NotFound => 404,
                ErrorCategory::Forbidden => 403,
                ErrorCategory::Internal => 500,
            },
        }
    }

    /// Whether the store aborted the transaction because of a race that a
    /// fresh attempt may not hit.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.sqlstate().as_deref(),
            Some(SQLSTATE_SERIALIZATION_FAILURE) | Some(SQLSTATE_DEADLOCK_DETECTED)
        )
    }

    /// SQLSTATE reported by the database server, if any.
    pub(crate) fn sqlstate(&self) -> Option<Cow<'_, str>> {
        match self {
            EconomyError::Database(sqlx::Error::Database(db_err)) => db_err.code(),
            _ => None,
        }
    }

    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Database errors are sanitized to prevent information disclosure about
    /// the internal system structure, and user IDs are redacted.
    pub fn client_message(&self) -> String {
        match self {
            // Sanitize database errors - don't expose SQL details
            EconomyError::Database(_) | EconomyError::TransactionFailed(_) => {
                "Internal server error".to_string()
            }
            EconomyError::UserNotFound(_) => "User not found".to_string(),
            EconomyError::InsufficientBalance { .. } => "Insufficient balance".to_string(),
            EconomyError::NotOwner { .. } => "Not the owner".to_string(),
            EconomyError::BalanceOverflow(_) => "Balance limit exceeded".to_string(),
            // All other errors are safe to expose
            _ => self.to_string(),
        }
    }
}

/// Result type for economy operations
pub type EconomyResult<T> = Result<T, EconomyError>;


#[cfg(test)]
mod tests {
    use super::testing::economy_error;
    use super::*;

    #[test]
    fn test_status_codes_follow_error_table() {
        assert_eq!(EconomyError::UserNotFound(1).status_code(), 404);
        assert_eq!(EconomyError::CaseNotFound(1).status_code(), 404);
        assert_eq!(EconomyError::CodeNotFound(1).status_code(), 404);
        assert_eq!(EconomyError::EmptyCase(1).status_code(), 400);
        assert_eq!(
            EconomyError::NotOwner {
                user_id: 1,
                resource: "code 2".to_string()
            }
            .status_code(),
            403
        );
        assert_eq!(EconomyError::AlreadyConsumed(1).status_code(), 400);
        assert_eq!(EconomyError::InvalidCode(1).status_code(), 400);
        assert_eq!(EconomyError::AlreadyListed(1).status_code(), 400);
        assert_eq!(EconomyError::NotAvailable(1).status_code(), 400);
        assert_eq!(EconomyError::SelfTrade(1).status_code(), 400);
        assert_eq!(
            EconomyError::InsufficientBalance {
                user_id: 1,
                available: 0,
                required: 1
            }
            .status_code(),
            400
        );
        assert_eq!(
            EconomyError::TransactionFailed("x".to_string()).status_code(),
            500
        );
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            EconomyError::AlreadyConsumed(3).category(),
            ErrorCategory::StateConflict
        );
        assert_eq!(
            EconomyError::InvalidAmount(0).category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            EconomyError::Timeout(Duration::from_secs(1)).category(),
            ErrorCategory::Internal
        );
    }

    #[test]
    fn test_client_message_redacts_ids() {
        let err = EconomyError::UserNotFound(4242);
        assert!(!err.client_message().contains("4242"));

        let err = EconomyError::InsufficientBalance {
            user_id: 7,
            available: 10,
            required: 20,
        };
        assert_eq!(err.client_message(), "Insufficient balance");

        let err = EconomyError::Database(sqlx::Error::RowNotFound);
        assert_eq!(err.client_message(), "Internal server error");
    }

    #[test]
    fn test_non_database_errors_are_not_transient() {
        assert!(!EconomyError::NotAvailable(1).is_transient());
        assert!(!EconomyError::Database(sqlx::Error::RowNotFound).is_transient());
    }

    #[test]
    fn test_serialization_failures_and_deadlocks_are_transient() {
        assert!(economy_error("40001").is_transient());
        assert!(economy_error("40P01").is_transient());
        assert!(!economy_error(SQLSTATE_NUMERIC_OUT_OF_RANGE).is_transient());
        assert_eq!(
            economy_error("40001").sqlstate().as_deref(),
            Some("40001")
        );
        assert!(EconomyError::UserNotFound(1).sqlstate().is_none());
    }
}
