//! Cross-domain read views.
//!
//! Three independently refreshed snapshots. Each carries its own
//! `last_updated`; there is no global consistency between them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{Amount, ParkingStats, PaymentTransaction, PerformanceMetrics};

/// Payments observed for the current day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentsSnapshot {
    pub transactions: Vec<PaymentTransaction>,
    pub total_amount: Amount,
    pub last_updated: DateTime<Utc>,
}

/// Latest occupancy statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParkingSnapshot {
    pub stats: ParkingStats,
    pub last_updated: DateTime<Utc>,
}

/// Latest performance sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub metrics: PerformanceMetrics,
    pub last_updated: DateTime<Utc>,
}

/// The combined view. Any part may still be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrossDomainSnapshot {
    pub payments: Option<PaymentsSnapshot>,
    pub parking: Option<ParkingSnapshot>,
    pub performance: Option<PerformanceSnapshot>,
}
