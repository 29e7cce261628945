//! # Error Classification
//!
//! Each subsystem owns its own error enum; all of them classify into the
//! same small set of kinds so callers at the outer boundary can surface the
//! kind alongside the human-readable reason.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse error taxonomy shared by every subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input shape or range. Rejected before any state change.
    Validation,
    /// Operation incompatible with the entity's current state.
    StateConflict,
    /// Referenced entity does not exist.
    NotFound,
    /// Missing, expired or wrong-scope session, or denied permission.
    Authorization,
    /// An asynchronous downstream step failed.
    Downstream,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::StateConflict => "state_conflict",
            Self::NotFound => "not_found",
            Self::Authorization => "authorization",
            Self::Downstream => "downstream",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implemented by every subsystem error.
pub trait Classify {
    fn kind(&self) -> ErrorKind;
}
