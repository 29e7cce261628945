//! # Domain Errors
//!
//! Error types for the Access Controller.

use shared_types::{Classify, ErrorKind};
use thiserror::Error;

/// Access Controller error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    /// Unknown username or wrong password. Deliberately indistinguishable.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Too many failed attempts within the lockout window.
    #[error("Account {username} locked, retry in {retry_after_secs}s")]
    AccountLocked {
        username: String,
        retry_after_secs: i64,
    },

    #[error("Account inactive: {0}")]
    AccountInactive(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Password hashing or token signing failed.
    #[error("Credential backend error: {0}")]
    Backend(String),
}

impl Classify for AccessError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::UsernameTaken(_) => ErrorKind::StateConflict,
            Self::InvalidInput(_) => ErrorKind::Validation,
            Self::InvalidCredentials | Self::AccountLocked { .. } | Self::AccountInactive(_) => {
                ErrorKind::Authorization
            }
            Self::UserNotFound(_) => ErrorKind::NotFound,
            Self::Backend(_) => ErrorKind::Downstream,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(AccessError::InvalidCredentials.kind(), ErrorKind::Authorization);
        assert_eq!(
            AccessError::UsernameTaken("ops".into()).kind(),
            ErrorKind::StateConflict
        );
    }

    #[test]
    fn test_locked_display() {
        let err = AccessError::AccountLocked {
            username: "ops".into(),
            retry_after_secs: 42,
        };
        assert_eq!(err.to_string(), "Account ops locked, retry in 42s");
    }
}
