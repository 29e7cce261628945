//! # Coordination Errors
//!
//! Errors raised by routed calls and periodic jobs. Subsystem errors are
//! wrapped unchanged so callers keep their classification.

use pk_01_resource_manager::ResourceError;
use pk_02_transaction_processor::PaymentError;
use pk_03_access_controller::AccessError;
use pk_04_telemetry_cache::TelemetryCacheError;
use pk_05_report_aggregator::ReportError;
use shared_types::{Classify, ErrorKind, Scope, SpaceStatus};
use thiserror::Error;

/// Coordination layer error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinationError {
    /// Session missing, expired or issued for another scope.
    #[error("Unauthorized for {scope}")]
    Unauthorized { scope: Scope },

    /// Valid session, but the user lacks the permission.
    #[error("Permission denied: {permission}")]
    PermissionDenied { permission: String },

    /// Payments can only be taken for a space holding a vehicle.
    #[error("Space {space_id} has no vehicle to charge (status: {status})")]
    SpaceNotOccupied {
        space_id: String,
        status: SpaceStatus,
    },

    /// `confirm_exit` without a settled payment awaiting confirmation.
    #[error("No exit awaiting confirmation for space {0}")]
    NoPendingExit(String),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Cache(#[from] TelemetryCacheError),

    #[error(transparent)]
    Report(#[from] ReportError),
}

impl Classify for CoordinationError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized { .. } | Self::PermissionDenied { .. } => ErrorKind::Authorization,
            Self::SpaceNotOccupied { .. } => ErrorKind::StateConflict,
            Self::NoPendingExit(_) => ErrorKind::NotFound,
            Self::Resource(e) => e.kind(),
            Self::Payment(e) => e.kind(),
            Self::Access(e) => e.kind(),
            Self::Cache(e) => e.kind(),
            Self::Report(e) => e.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapped_errors_keep_their_kind() {
        let err: CoordinationError = ResourceError::SpaceOccupied("A_1".into()).into();
        assert_eq!(err.kind(), ErrorKind::StateConflict);

        let err: CoordinationError = PaymentError::Gateway("declined".into()).into();
        assert_eq!(err.kind(), ErrorKind::Downstream);

        let err: CoordinationError = ReportError::InvalidSchedule("x".into()).into();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_gate_errors_are_authorization() {
        let err = CoordinationError::Unauthorized {
            scope: Scope::Payment,
        };
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert_eq!(err.to_string(), "Unauthorized for payment");
    }
}
