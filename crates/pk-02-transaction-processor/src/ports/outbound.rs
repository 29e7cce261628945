//! Outbound (Driven) ports for the Transaction Processor.

use async_trait::async_trait;
use shared_types::PaymentTransaction;

use crate::domain::{PaymentError, PaymentMethodKind};

/// Method-specific settlement step.
///
/// The service bounds each call with the configured charge timeout; an
/// implementation only reports success or a `PaymentError::Gateway`.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(
        &self,
        kind: PaymentMethodKind,
        tx: &PaymentTransaction,
    ) -> Result<(), PaymentError>;

    async fn refund(
        &self,
        kind: PaymentMethodKind,
        tx: &PaymentTransaction,
    ) -> Result<(), PaymentError>;
}
