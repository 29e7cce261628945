//! # Inbound Port - TransactionProcessorApi

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::{Amount, PaymentTransaction};

use crate::domain::{PaymentError, PaymentMethod};

/// Input to `prepare_payment` / `process_payment`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub ticket_ref: String,
    pub amount: Amount,
    pub method_id: String,
    pub operator: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl PaymentRequest {
    pub fn new(
        ticket_ref: impl Into<String>,
        amount: Amount,
        method_id: impl Into<String>,
        operator: impl Into<String>,
    ) -> Self {
        Self {
            ticket_ref: ticket_ref.into(),
            amount,
            method_id: method_id.into(),
            operator: operator.into(),
            metadata: serde_json::Map::new(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Primary API for the Transaction Processor.
#[async_trait]
pub trait TransactionProcessorApi: Send + Sync {
    /// Validates the request and records a `pending` transaction. Emits
    /// nothing.
    ///
    /// # Errors
    /// - `InvalidPaymentMethod`: unknown or disabled method
    /// - `AmountOutOfRange`: amount outside `[min, max]`
    async fn prepare_payment(
        &self,
        request: PaymentRequest,
    ) -> Result<PaymentTransaction, PaymentError>;

    /// Emits `PaymentInitiated`, runs the charge step and settles the
    /// transaction as `completed` or `failed`.
    ///
    /// On failure the transaction is stored as `failed`, `PaymentFailed` is
    /// emitted and the error is returned.
    async fn execute_payment(&self, tx_id: &str) -> Result<PaymentTransaction, PaymentError>;

    /// `prepare_payment` followed by `execute_payment`.
    async fn process_payment(
        &self,
        request: PaymentRequest,
    ) -> Result<PaymentTransaction, PaymentError>;

    /// Creates a linked `refunded` record for a `completed` transaction.
    async fn refund_payment(
        &self,
        original_id: &str,
        operator: &str,
        reason: Option<String>,
    ) -> Result<PaymentTransaction, PaymentError>;

    fn transaction(&self, tx_id: &str) -> Option<PaymentTransaction>;

    fn transactions_by_ticket(&self, ticket_ref: &str) -> Vec<PaymentTransaction>;

    fn transactions_since(&self, start: DateTime<Utc>) -> Vec<PaymentTransaction>;

    /// Enabled payment methods.
    fn payment_methods(&self) -> Vec<PaymentMethod>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_is_object_safe() {
        fn _assert_object_safe(_: &dyn TransactionProcessorApi) {}
    }

    #[test]
    fn test_request_builder() {
        let req = PaymentRequest::new("T-1", 500, "cash", "op")
            .with_metadata("space_id", serde_json::json!("A_1"));
        assert_eq!(req.metadata["space_id"], "A_1");
    }
}
