//! Active transaction bindings.
//!
//! A binding exists from the moment a payment is prepared for a space until
//! the payment's terminal event is handled, or the space is released by
//! some other path. It is the only place a payment and a space are linked.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use shared_types::{ParkingSpace, PaymentTransaction, TransactionId};

/// Snapshot of an in-flight payment and the space it pays for.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionBinding {
    pub transaction: PaymentTransaction,
    pub space: ParkingSpace,
    pub created_at: DateTime<Utc>,
}

impl TransactionBinding {
    /// Plate of the vehicle the payment was taken for.
    pub fn plate(&self) -> Option<&str> {
        self.space
            .current_vehicle
            .as_ref()
            .map(|vehicle| vehicle.plate.as_str())
    }
}

#[derive(Debug, Default)]
pub struct BindingTable {
    inner: RwLock<HashMap<TransactionId, TransactionBinding>>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&self, binding: TransactionBinding) {
        self.inner
            .write()
            .insert(binding.transaction.id.clone(), binding);
    }

    pub fn get(&self, tx_id: &str) -> Option<TransactionBinding> {
        self.inner.read().get(tx_id).cloned()
    }

    pub fn remove(&self, tx_id: &str) -> Option<TransactionBinding> {
        self.inner.write().remove(tx_id)
    }

    /// Replaces the space snapshot in every binding for `space.id`.
    pub fn refresh_space(&self, space: &ParkingSpace) -> usize {
        let mut inner = self.inner.write();
        let mut refreshed = 0;
        for binding in inner.values_mut().filter(|b| b.space.id == space.id) {
            binding.space = space.clone();
            refreshed += 1;
        }
        refreshed
    }

    /// Drops every binding for `space_id`; returns the transaction ids.
    pub fn remove_for_space(&self, space_id: &str) -> Vec<TransactionId> {
        let mut inner = self.inner.write();
        let stale: Vec<TransactionId> = inner
            .iter()
            .filter(|(_, binding)| binding.space.id == space_id)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &stale {
            inner.remove(id);
        }
        stale
    }

    pub fn for_space(&self, space_id: &str) -> Vec<TransactionBinding> {
        self.inner
            .read()
            .values()
            .filter(|binding| binding.space.id == space_id)
            .cloned()
            .collect()
    }

    /// Bindings created at or before `cutoff`, oldest first.
    pub fn created_before(&self, cutoff: DateTime<Utc>) -> Vec<TransactionBinding> {
        let mut stale: Vec<TransactionBinding> = self
            .inner
            .read()
            .values()
            .filter(|binding| binding.created_at <= cutoff)
            .cloned()
            .collect();
        stale.sort_by_key(|binding| binding.created_at);
        stale
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
