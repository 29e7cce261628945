//! # Domain Errors
//!
//! Error types for the Transaction Processor.

use shared_types::{Amount, Classify, ErrorKind, TransactionStatus};
use thiserror::Error;

/// Transaction Processor error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    /// Method id unknown or disabled.
    #[error("Invalid payment method: {0}")]
    InvalidPaymentMethod(String),

    #[error("Amount {amount} outside allowed range [{min}, {max}]")]
    AmountOutOfRange { amount: Amount, min: Amount, max: Amount },

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// Only `completed` transactions can be refunded, and only once.
    #[error("Transaction {id} is not refundable (status: {status})")]
    NotRefundable { id: String, status: TransactionStatus },

    /// `execute_payment` on a transaction that already left `pending`.
    #[error("Transaction {id} is {status}, expected pending")]
    NotPending { id: String, status: TransactionStatus },

    /// The method-specific charge or refund step reported a failure.
    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Charge via {method} timed out after {timeout_ms}ms")]
    ChargeTimeout { method: String, timeout_ms: u64 },
}

impl Classify for PaymentError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPaymentMethod(_) | Self::AmountOutOfRange { .. } => ErrorKind::Validation,
            Self::TransactionNotFound(_) => ErrorKind::NotFound,
            Self::NotRefundable { .. } | Self::NotPending { .. } => ErrorKind::StateConflict,
            Self::Gateway(_) | Self::ChargeTimeout { .. } => ErrorKind::Downstream,
        }
    }
}
