//! Simulated settlement gateway.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::PaymentTransaction;
use tracing::debug;

use crate::domain::{PaymentError, PaymentMethodKind};
use crate::ports::PaymentGateway;

/// Sleeps for the method's settlement latency, then succeeds unless the
/// method kind has been marked as failing.
#[derive(Debug)]
pub struct SimulatedGateway {
    latency_scale: f64,
    failing: RwLock<HashSet<PaymentMethodKind>>,
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedGateway {
    pub fn new() -> Self {
        Self {
            latency_scale: 1.0,
            failing: RwLock::new(HashSet::new()),
        }
    }

    /// No simulated latency.
    pub fn instant() -> Self {
        Self {
            latency_scale: 0.0,
            ..Self::new()
        }
    }

    /// Subsequent charges and refunds through `kind` fail.
    pub fn fail_method(&self, kind: PaymentMethodKind) {
        self.failing.write().insert(kind);
    }

    pub fn restore_method(&self, kind: PaymentMethodKind) {
        self.failing.write().remove(&kind);
    }

    async fn settle(&self, kind: PaymentMethodKind, step: &str) -> Result<(), PaymentError> {
        let latency = kind.settlement_latency().mul_f64(self.latency_scale);
        if latency > Duration::ZERO {
            tokio::time::sleep(latency).await;
        }
        if self.failing.read().contains(&kind) {
            return Err(PaymentError::Gateway(format!("{kind} {step} declined")));
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn charge(
        &self,
        kind: PaymentMethodKind,
        tx: &PaymentTransaction,
    ) -> Result<(), PaymentError> {
        debug!(tx_id = %tx.id, method = %kind, total = tx.total, "Simulated charge");
        self.settle(kind, "charge").await
    }

    async fn refund(
        &self,
        kind: PaymentMethodKind,
        tx: &PaymentTransaction,
    ) -> Result<(), PaymentError> {
        debug!(tx_id = %tx.id, method = %kind, "Simulated refund");
        self.settle(kind, "refund").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared_types::TransactionStatus;

    fn sample_tx() -> PaymentTransaction {
        PaymentTransaction {
            id: "TXN_1".into(),
            ticket_ref: "T-1".into(),
            amount: 1000,
            tax: 100,
            total: 1100,
            method_id: "card".into(),
            status: TransactionStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
            operator: "op".into(),
            metadata: serde_json::Map::new(),
            receipt: None,
            error: None,
            original_transaction_id: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_charge_waits_for_latency() {
        let gateway = SimulatedGateway::new();
        let start = tokio::time::Instant::now();

        gateway
            .charge(PaymentMethodKind::Card, &sample_tx())
            .await
            .unwrap();

        assert!(start.elapsed() >= Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn test_failing_method() {
        let gateway = SimulatedGateway::instant();
        gateway.fail_method(PaymentMethodKind::EWallet);

        let err = gateway
            .charge(PaymentMethodKind::EWallet, &sample_tx())
            .await
            .unwrap_err();
        assert_eq!(err, PaymentError::Gateway("e_wallet charge declined".into()));

        gateway.restore_method(PaymentMethodKind::EWallet);
        assert!(gateway
            .charge(PaymentMethodKind::EWallet, &sample_tx())
            .await
            .is_ok());
    }
}
