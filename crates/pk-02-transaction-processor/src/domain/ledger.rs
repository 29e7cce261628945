//! In-memory transaction ledger.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use shared_types::{PaymentTransaction, TransactionId, TransactionStatus};

/// All transactions and refunds in insertion order.
#[derive(Debug, Default)]
pub struct Ledger {
    entries: Vec<PaymentTransaction>,
    index: HashMap<TransactionId, usize>,
    refunds_in_flight: HashSet<TransactionId>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tx: PaymentTransaction) {
        match self.index.get(&tx.id) {
            Some(&i) => self.entries[i] = tx,
            None => {
                self.index.insert(tx.id.clone(), self.entries.len());
                self.entries.push(tx);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&PaymentTransaction> {
        self.index.get(id).map(|&i| &self.entries[i])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut PaymentTransaction> {
        match self.index.get(id) {
            Some(&i) => self.entries.get_mut(i),
            None => None,
        }
    }

    pub fn by_ticket(&self, ticket_ref: &str) -> Vec<PaymentTransaction> {
        self.entries
            .iter()
            .filter(|tx| tx.ticket_ref == ticket_ref)
            .cloned()
            .collect()
    }

    pub fn since(&self, start: DateTime<Utc>) -> Vec<PaymentTransaction> {
        self.entries
            .iter()
            .filter(|tx| tx.created_at >= start)
            .cloned()
            .collect()
    }

    /// Refund already recorded against `original_id`.
    pub fn refund_of(&self, original_id: &str) -> Option<&PaymentTransaction> {
        self.entries.iter().find(|tx| {
            tx.status == TransactionStatus::Refunded
                && tx.original_transaction_id.as_deref() == Some(original_id)
        })
    }

    /// Claims the right to refund `original_id`. False while another refund
    /// of it is running.
    pub fn begin_refund(&mut self, original_id: &str) -> bool {
        self.refunds_in_flight.insert(original_id.to_string())
    }

    pub fn end_refund(&mut self, original_id: &str) {
        self.refunds_in_flight.remove(original_id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
