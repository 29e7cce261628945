//! Cross-domain read view.
//!
//! Three parts, each replaced whole and stamped independently. Readers get a
//! clone; there is no consistency guarantee across parts.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use shared_types::{
    CrossDomainSnapshot, ParkingSnapshot, ParkingStats, PaymentTransaction, PaymentsSnapshot,
    PerformanceMetrics, PerformanceSnapshot, TransactionStatus,
};

#[derive(Debug, Default)]
pub struct CrossDomainView {
    inner: RwLock<CrossDomainSnapshot>,
}

impl CrossDomainView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> CrossDomainSnapshot {
        self.inner.read().clone()
    }

    /// Replaces the payments part.
    pub fn update_payments(&self, transactions: Vec<PaymentTransaction>, at: DateTime<Utc>) {
        self.inner.write().payments = Some(payments_snapshot(transactions, at));
    }

    /// Appends or replaces one transaction in the payments part.
    pub fn record_payment(&self, tx: PaymentTransaction, at: DateTime<Utc>) {
        let mut inner = self.inner.write();
        let mut transactions = inner
            .payments
            .take()
            .map(|p| p.transactions)
            .unwrap_or_default();
        match transactions.iter_mut().find(|existing| existing.id == tx.id) {
            Some(existing) => *existing = tx,
            None => transactions.push(tx),
        }
        inner.payments = Some(payments_snapshot(transactions, at));
    }

    pub fn update_parking(&self, stats: ParkingStats, at: DateTime<Utc>) {
        self.inner.write().parking = Some(ParkingSnapshot {
            stats,
            last_updated: at,
        });
    }

    pub fn update_performance(&self, metrics: PerformanceMetrics, at: DateTime<Utc>) {
        self.inner.write().performance = Some(PerformanceSnapshot {
            metrics,
            last_updated: at,
        });
    }
}

/// `total_amount` sums completed totals.
fn payments_snapshot(transactions: Vec<PaymentTransaction>, at: DateTime<Utc>) -> PaymentsSnapshot {
    let total_amount = transactions
        .iter()
        .filter(|tx| tx.status == TransactionStatus::Completed)
        .map(|tx| tx.total)
        .sum();
    PaymentsSnapshot {
        transactions,
        total_amount,
        last_updated: at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(id: &str, status: TransactionStatus, total: u64) -> PaymentTransaction {
        PaymentTransaction {
            id: id.into(),
            ticket_ref: "T".into(),
            amount: total,
            tax: 0,
            total,
            method_id: "cash".into(),
            status,
            created_at: Utc::now(),
            completed_at: None,
            operator: "op".into(),
            metadata: serde_json::Map::new(),
            receipt: None,
            error: None,
            original_transaction_id: None,
        }
    }

    #[test]
    fn test_parts_are_independent() {
        let view = CrossDomainView::new();
        assert_eq!(view.snapshot(), CrossDomainSnapshot::default());

        let at = Utc::now();
        view.update_parking(ParkingStats::default(), at);
        let snapshot = view.snapshot();
        assert!(snapshot.payments.is_none());
        assert_eq!(snapshot.parking.unwrap().last_updated, at);
    }

    #[test]
    fn test_payment_totals() {
        let view = CrossDomainView::new();
        let at = Utc::now();
        view.update_payments(
            vec![
                tx("A", TransactionStatus::Completed, 1100),
                tx("B", TransactionStatus::Failed, 5000),
            ],
            at,
        );
        view.record_payment(tx("C", TransactionStatus::Completed, 900), at);
        view.record_payment(tx("B", TransactionStatus::Completed, 5000), at);

        let payments = view.snapshot().payments.unwrap();
        assert_eq!(payments.transactions.len(), 3);
        assert_eq!(payments.total_amount, 7000);
    }
}
