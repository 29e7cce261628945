//! # Domain Errors
//!
//! Error types for the Report Aggregator.

use shared_types::{Classify, ErrorKind};
use thiserror::Error;

/// Report Aggregator error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    #[error("Report template not found: {0}")]
    TemplateNotFound(String),

    #[error("Report template already registered: {0}")]
    DuplicateTemplate(String),

    /// Malformed schedule string or empty recipient list. Nothing stored.
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("Schedule not found: {0}")]
    ScheduleNotFound(String),

    #[error("Report data unavailable: {0}")]
    DataSource(String),

    #[error("Report rendering failed: {0}")]
    Render(String),
}

impl Classify for ReportError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidSchedule(_) => ErrorKind::Validation,
            Self::DuplicateTemplate(_) => ErrorKind::StateConflict,
            Self::TemplateNotFound(_) | Self::ScheduleNotFound(_) => ErrorKind::NotFound,
            Self::DataSource(_) | Self::Render(_) => ErrorKind::Downstream,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            ReportError::InvalidSchedule("hourly 09:00".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            ReportError::TemplateNotFound("x".into()).to_string(),
            "Report template not found: x"
        );
    }
}
