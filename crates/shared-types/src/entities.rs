//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Parking**: `ParkingSpace`, `ParkingZone`, `ParkingStats`
//! - **Payment**: `PaymentTransaction`, `PaymentReceipt`
//! - **Access**: `Role`, `Scope`
//! - **Telemetry**: `PerformanceMetrics` and its pool/cache/latency parts
//! - **Reporting**: `ReportKind`, `ReportFormat`

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a single parking space, `{zone}_{n}`.
pub type SpaceId = String;
/// Identifier of a parking zone.
pub type ZoneId = String;
/// Identifier of a physical gate.
pub type GateId = String;
/// Identifier of a payment transaction, `TXN_...`.
pub type TransactionId = String;
/// Identifier of a registered user.
pub type UserId = String;
/// Money in minor currency units (cents).
pub type Amount = u64;

// =============================================================================
// CLUSTER A: PARKING
// =============================================================================

/// Vehicle classes a space can accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    Car,
    Motorcycle,
    Truck,
    Bus,
}

impl VehicleType {
    /// All vehicle types, in display order.
    pub const ALL: [VehicleType; 4] = [Self::Car, Self::Motorcycle, Self::Truck, Self::Bus];

    /// Upper-case code used in space numbers (`CAR12`).
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Car => "CAR",
            Self::Motorcycle => "MOTORCYCLE",
            Self::Truck => "TRUCK",
            Self::Bus => "BUS",
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Car => "car",
            Self::Motorcycle => "motorcycle",
            Self::Truck => "truck",
            Self::Bus => "bus",
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a parking space.
///
/// ```text
/// available ──assign──→ occupied ──payment──→ payment_pending
///    │  ↑                  │  ↑                     │
///    │  └─────release──────┘  └────payment failed───┘
///    │  ↑                                           │
///    │  └───────────────release─────────────────────┘
///    ├──reserve──→ reserved ──expire/cancel──→ available
///    │                 └──claim──→ occupied
///    └──(available|reserved)──→ maintenance ──clear──→ available
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpaceStatus {
    Available,
    Occupied,
    PaymentPending,
    Reserved,
    Maintenance,
}

impl SpaceStatus {
    /// Whether `self → next` is an edge of the space state machine.
    ///
    /// Self-loops are not edges; callers treat them as no-ops.
    #[must_use]
    pub fn can_transition_to(self, next: SpaceStatus) -> bool {
        use SpaceStatus::*;
        matches!(
            (self, next),
            (Available, Occupied)
                | (Available, Reserved)
                | (Available, Maintenance)
                | (Occupied, PaymentPending)
                | (Occupied, Available)
                | (PaymentPending, Occupied)
                | (PaymentPending, Available)
                | (Reserved, Available)
                | (Reserved, Occupied)
                | (Reserved, Maintenance)
                | (Maintenance, Available)
        )
    }

    /// A vehicle is physically in the space.
    #[must_use]
    pub fn is_vehicle_present(self) -> bool {
        matches!(self, Self::Occupied | Self::PaymentPending)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Occupied => "occupied",
            Self::PaymentPending => "payment_pending",
            Self::Reserved => "reserved",
            Self::Maintenance => "maintenance",
        }
    }
}

impl fmt::Display for SpaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The vehicle currently bound to a space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleInfo {
    pub plate: String,
    pub vehicle_type: VehicleType,
    pub entry_time: DateTime<Utc>,
    pub ticket_ref: Option<String>,
}

/// Physical position of a space inside the facility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceLocation {
    pub floor: i32,
    pub section: String,
    pub coordinates: Option<(f64, f64)>,
}

/// A single parking slot. Created at lot initialisation and never destroyed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParkingSpace {
    pub id: SpaceId,
    pub number: String,
    pub zone_id: ZoneId,
    pub vehicle_type: VehicleType,
    pub status: SpaceStatus,
    pub current_vehicle: Option<VehicleInfo>,
    pub location: Option<SpaceLocation>,
    pub gate_id: Option<GateId>,
    pub maintenance_reason: Option<String>,
    pub reserved_until: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Named grouping of same-type spaces. Occupancy is derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParkingZone {
    pub id: ZoneId,
    pub name: String,
    pub vehicle_type: VehicleType,
    pub capacity: usize,
    pub space_ids: Vec<SpaceId>,
}

/// Per-vehicle-type occupancy counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleTypeStats {
    pub total: usize,
    pub occupied: usize,
    pub available: usize,
}

/// Aggregate occupancy statistics.
///
/// Always recomputed from the full space table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParkingStats {
    pub total_spaces: usize,
    pub available: usize,
    pub occupied: usize,
    pub payment_pending: usize,
    pub reserved: usize,
    pub maintenance: usize,
    /// Percentage of spaces with a vehicle present.
    pub occupancy_rate: f64,
    pub by_vehicle_type: BTreeMap<VehicleType, VehicleTypeStats>,
}

impl ParkingStats {
    /// Full recount over every space.
    pub fn from_spaces<'a, I>(spaces: I) -> Self
    where
        I: IntoIterator<Item = &'a ParkingSpace>,
    {
        let mut stats = Self::default();
        for space in spaces {
            stats.total_spaces += 1;
            let per_type = stats.by_vehicle_type.entry(space.vehicle_type).or_default();
            per_type.total += 1;
            match space.status {
                SpaceStatus::Available => {
                    stats.available += 1;
                    per_type.available += 1;
                }
                SpaceStatus::Occupied => {
                    stats.occupied += 1;
                    per_type.occupied += 1;
                }
                SpaceStatus::PaymentPending => {
                    stats.payment_pending += 1;
                    per_type.occupied += 1;
                }
                SpaceStatus::Reserved => stats.reserved += 1,
                SpaceStatus::Maintenance => stats.maintenance += 1,
            }
        }
        if stats.total_spaces > 0 {
            let present = (stats.occupied + stats.payment_pending) as f64;
            stats.occupancy_rate = present / stats.total_spaces as f64 * 100.0;
        }
        stats
    }
}

// =============================================================================
// CLUSTER B: PAYMENT
// =============================================================================

/// Lifecycle of a payment transaction.
///
/// `pending` moves exactly once to `processing` while the charge runs, and
/// from there once to `completed` or `failed`. `refunded` is only ever set
/// on a new record linked to a completed original.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
}

impl TransactionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payment or refund record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub id: TransactionId,
    pub ticket_ref: String,
    /// Base amount before tax.
    pub amount: Amount,
    pub tax: Amount,
    /// Amount actually charged: `round(amount + tax)`.
    pub total: Amount,
    pub method_id: String,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub operator: String,
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub receipt: Option<PaymentReceipt>,
    pub error: Option<String>,
    /// Set on refund records.
    pub original_transaction_id: Option<TransactionId>,
}

/// Receipt issued on successful payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub transaction_id: TransactionId,
    pub ticket_ref: String,
    pub total: Amount,
    pub method_id: String,
    pub issued_at: DateTime<Utc>,
    pub operator: String,
    pub barcode: String,
    pub qr_code: String,
}

impl PaymentReceipt {
    /// Builds the receipt for a transaction that just completed.
    #[must_use]
    pub fn for_transaction(tx: &PaymentTransaction, issued_at: DateTime<Utc>) -> Self {
        Self {
            transaction_id: tx.id.clone(),
            ticket_ref: tx.ticket_ref.clone(),
            total: tx.total,
            method_id: tx.method_id.clone(),
            issued_at,
            operator: tx.operator.clone(),
            barcode: format!("BAR_{}", tx.id),
            qr_code: format!("QR_{}", tx.id),
        }
    }
}

// =============================================================================
// CLUSTER C: ACCESS
// =============================================================================

/// User role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Operator,
    Viewer,
}

/// The subsystem a session is valid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Payment,
    Parking,
    Reporting,
}

impl Scope {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Payment => "payment",
            Self::Parking => "parking",
            Self::Reporting => "reporting",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// CLUSTER D: TELEMETRY
// =============================================================================

/// Connection pool occupancy at snapshot time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    pub size: usize,
    pub in_use: usize,
    pub idle: usize,
}

/// TTL cache counters at snapshot time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub keys: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

/// Aggregates over the capped response-time sample window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseTimeStats {
    pub samples: usize,
    pub average_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

/// One entry of the metrics history ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub collected_at: DateTime<Utc>,
    /// Load-derived CPU utilisation, percent.
    pub cpu_usage: f64,
    pub memory_used_bytes: u64,
    pub memory_total_bytes: u64,
    pub pool: PoolStats,
    pub cache: CacheStats,
    pub response_times: ResponseTimeStats,
}

// =============================================================================
// CLUSTER E: REPORTING
// =============================================================================

/// Identifier of a stored report, `RPT_...`.
pub type ReportId = String;
/// Identifier of a report schedule, `SCH_...`.
pub type ScheduleId = String;

/// What a report template gathers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    DailySummary,
    PaymentReport,
    OccupancyReport,
    RevenueReport,
}

impl ReportKind {
    pub const ALL: [ReportKind; 4] = [
        Self::DailySummary,
        Self::PaymentReport,
        Self::OccupancyReport,
        Self::RevenueReport,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DailySummary => "daily_summary",
            Self::PaymentReport => "payment_report",
            Self::OccupancyReport => "occupancy_report",
            Self::RevenueReport => "revenue_report",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output encoding of a rendered report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    Pdf,
    Excel,
    Csv,
}

impl ReportFormat {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Excel => "excel",
            Self::Csv => "csv",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
