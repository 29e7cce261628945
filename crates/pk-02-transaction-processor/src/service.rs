//! # Transaction Processor Service
//!
//! Payment lifecycle: `pending → completed | failed`, plus linked refund
//! records. The ledger lock is never held across the charge step.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::json;
use shared_bus::{EventPublisher, ParkingEvent};
use shared_types::{
    prefixed_id, PaymentReceipt, PaymentTransaction, TimeSource, TransactionStatus,
};
use tracing::{error, info, instrument, warn};

use crate::domain::{quote, Ledger, PaymentConfig, PaymentError, PaymentMethod, PaymentMethodKind};
use crate::ports::{PaymentGateway, PaymentRequest, TransactionProcessorApi};

/// The Transaction Processor.
pub struct TransactionProcessorService {
    config: PaymentConfig,
    ledger: RwLock<Ledger>,
    gateway: Arc<dyn PaymentGateway>,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn TimeSource>,
}

impl TransactionProcessorService {
    pub fn new(
        config: PaymentConfig,
        gateway: Arc<dyn PaymentGateway>,
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            config,
            ledger: RwLock::new(Ledger::new()),
            gateway,
            publisher,
            clock,
        }
    }

    pub fn config(&self) -> &PaymentConfig {
        &self.config
    }

    fn method_kind(&self, method_id: &str) -> Result<PaymentMethodKind, PaymentError> {
        self.config
            .method(method_id)
            .map(|method| method.kind)
            .ok_or_else(|| PaymentError::InvalidPaymentMethod(method_id.to_string()))
    }

    /// Runs one gateway step under the configured timeout.
    async fn settle(
        &self,
        kind: PaymentMethodKind,
        tx: &PaymentTransaction,
        refund: bool,
    ) -> Result<(), PaymentError> {
        let step = async {
            if refund {
                self.gateway.refund(kind, tx).await
            } else {
                self.gateway.charge(kind, tx).await
            }
        };
        match tokio::time::timeout(self.config.charge_timeout(), step).await {
            Ok(result) => result,
            Err(_) => Err(PaymentError::ChargeTimeout {
                method: kind.to_string(),
                timeout_ms: self.config.charge_timeout_ms,
            }),
        }
    }

    fn record_failure(&self, tx_id: &str, err: &PaymentError) -> Option<PaymentTransaction> {
        let now = self.clock.now();
        let mut ledger = self.ledger.write();
        let tx = ledger.get_mut(tx_id)?;
        tx.status = TransactionStatus::Failed;
        tx.error = Some(err.to_string());
        tx.metadata
            .insert("failed_at".to_string(), json!(now.to_rfc3339()));
        tx.metadata
            .insert("error_kind".to_string(), json!(shared_types::Classify::kind(err).as_str()));
        Some(tx.clone())
    }
}

#[async_trait]
impl TransactionProcessorApi for TransactionProcessorService {
    async fn prepare_payment(
        &self,
        request: PaymentRequest,
    ) -> Result<PaymentTransaction, PaymentError> {
        self.method_kind(&request.method_id)?;
        if request.amount < self.config.min_amount || request.amount > self.config.max_amount {
            return Err(PaymentError::AmountOutOfRange {
                amount: request.amount,
                min: self.config.min_amount,
                max: self.config.max_amount,
            });
        }

        let priced = quote(request.amount, self.config.tax_rate_bps, self.config.rounding);
        let tx = PaymentTransaction {
            id: prefixed_id("TXN"),
            ticket_ref: request.ticket_ref,
            amount: request.amount,
            tax: priced.tax,
            total: priced.total,
            method_id: request.method_id,
            status: TransactionStatus::Pending,
            created_at: self.clock.now(),
            completed_at: None,
            operator: request.operator,
            metadata: request.metadata,
            receipt: None,
            error: None,
            original_transaction_id: None,
        };
        self.ledger.write().insert(tx.clone());
        info!(tx_id = %tx.id, total = tx.total, method = %tx.method_id, "[pk-02] Payment prepared");
        Ok(tx)
    }

    #[instrument(skip(self), fields(subsystem = "pk-02"))]
    async fn execute_payment(&self, tx_id: &str) -> Result<PaymentTransaction, PaymentError> {
        // Claimed under the write lock so a second caller sees `processing`.
        let (tx, kind) = {
            let mut ledger = self.ledger.write();
            let entry = ledger
                .get_mut(tx_id)
                .ok_or_else(|| PaymentError::TransactionNotFound(tx_id.to_string()))?;
            if entry.status != TransactionStatus::Pending {
                return Err(PaymentError::NotPending {
                    id: entry.id.clone(),
                    status: entry.status,
                });
            }
            let kind = self.method_kind(&entry.method_id)?;
            entry.status = TransactionStatus::Processing;
            (entry.clone(), kind)
        };

        self.publisher
            .publish(ParkingEvent::PaymentInitiated {
                transaction: tx.clone(),
            })
            .await;

        match self.settle(kind, &tx, false).await {
            Ok(()) => {
                let now = self.clock.now();
                let completed = {
                    let mut ledger = self.ledger.write();
                    let entry = ledger
                        .get_mut(tx_id)
                        .ok_or_else(|| PaymentError::TransactionNotFound(tx_id.to_string()))?;
                    entry.status = TransactionStatus::Completed;
                    entry.completed_at = Some(now);
                    entry.receipt = Some(PaymentReceipt::for_transaction(entry, now));
                    entry.clone()
                };
                let receipt = completed
                    .receipt
                    .clone()
                    .unwrap_or_else(|| PaymentReceipt::for_transaction(&completed, now));

                info!(tx_id, total = completed.total, "[pk-02] Payment completed");
                self.publisher
                    .publish(ParkingEvent::PaymentCompleted {
                        transaction: completed.clone(),
                        receipt,
                    })
                    .await;
                Ok(completed)
            }
            Err(e) => {
                error!(tx_id, method = %kind, error = %e, "[pk-02] Payment failed");
                let failed = self.record_failure(tx_id, &e).unwrap_or(tx);
                self.publisher
                    .publish(ParkingEvent::PaymentFailed {
                        transaction: failed,
                        error: e.to_string(),
                    })
                    .await;
                Err(e)
            }
        }
    }

    async fn process_payment(
        &self,
        request: PaymentRequest,
    ) -> Result<PaymentTransaction, PaymentError> {
        let tx = self.prepare_payment(request).await?;
        self.execute_payment(&tx.id).await
    }

    async fn refund_payment(
        &self,
        original_id: &str,
        operator: &str,
        reason: Option<String>,
    ) -> Result<PaymentTransaction, PaymentError> {
        let original = {
            let mut ledger = self.ledger.write();
            let original = ledger
                .get(original_id)
                .cloned()
                .ok_or_else(|| PaymentError::TransactionNotFound(original_id.to_string()))?;
            if original.status != TransactionStatus::Completed
                || ledger.refund_of(original_id).is_some()
                || !ledger.begin_refund(original_id)
            {
                return Err(PaymentError::NotRefundable {
                    id: original.id,
                    status: original.status,
                });
            }
            original
        };
        let kind = match self.method_kind(&original.method_id) {
            Ok(kind) => kind,
            Err(e) => {
                self.ledger.write().end_refund(original_id);
                return Err(e);
            }
        };

        if let Err(e) = self.settle(kind, &original, true).await {
            self.ledger.write().end_refund(original_id);
            warn!(tx_id = original_id, error = %e, "[pk-02] Refund failed");
            self.publisher
                .publish(ParkingEvent::RefundFailed {
                    original_id: original_id.to_string(),
                    error: e.to_string(),
                })
                .await;
            return Err(e);
        }

        let now = self.clock.now();
        let mut metadata = serde_json::Map::new();
        metadata.insert("original_transaction_id".to_string(), json!(original_id));
        if let Some(reason) = &reason {
            metadata.insert("refund_reason".to_string(), json!(reason));
        }
        let refund = PaymentTransaction {
            id: prefixed_id("REF"),
            ticket_ref: original.ticket_ref.clone(),
            amount: original.amount,
            tax: original.tax,
            total: original.total,
            method_id: original.method_id.clone(),
            status: TransactionStatus::Refunded,
            created_at: now,
            completed_at: Some(now),
            operator: operator.to_string(),
            metadata,
            receipt: None,
            error: None,
            original_transaction_id: Some(original.id.clone()),
        };
        {
            let mut ledger = self.ledger.write();
            ledger.insert(refund.clone());
            ledger.end_refund(original_id);
        }

        info!(tx_id = %refund.id, original_id, "[pk-02] Refund completed");
        self.publisher
            .publish(ParkingEvent::RefundCompleted {
                refund: refund.clone(),
            })
            .await;
        Ok(refund)
    }

    fn transaction(&self, tx_id: &str) -> Option<PaymentTransaction> {
        self.ledger.read().get(tx_id).cloned()
    }

    fn transactions_by_ticket(&self, ticket_ref: &str) -> Vec<PaymentTransaction> {
        self.ledger.read().by_ticket(ticket_ref)
    }

    fn transactions_since(&self, start: DateTime<Utc>) -> Vec<PaymentTransaction> {
        self.ledger.read().since(start)
    }

    fn payment_methods(&self) -> Vec<PaymentMethod> {
        self.config
            .methods
            .iter()
            .filter(|method| method.enabled)
            .cloned()
            .collect()
    }
}
