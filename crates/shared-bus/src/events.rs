//! # Parking Events
//!
//! Every event that flows through the shared bus. Each variant's payload is
//! statically typed; `name()` gives the external snake_case event name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::{
    GateId, ParkingSpace, ParkingStats, PaymentReceipt, PaymentTransaction, PerformanceMetrics,
    ReportFormat, ReportId, ReportKind, ScheduleId, Scope, SpaceId, SpaceStatus, TransactionId,
    UserId,
};

/// Subsystem identifiers used as event sources.
pub mod source {
    pub const RUNTIME: u8 = 0;
    pub const RESOURCE_MANAGER: u8 = 1;
    pub const TRANSACTION_PROCESSOR: u8 = 2;
    pub const ACCESS_CONTROLLER: u8 = 3;
    pub const TELEMETRY_CACHE: u8 = 4;
    pub const REPORT_AGGREGATOR: u8 = 5;
}

/// Everything a subsystem or the coordination layer can announce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ParkingEvent {
    // -- pk-02 transaction processor --
    /// A pending transaction is about to be charged.
    PaymentInitiated { transaction: PaymentTransaction },

    /// The charge step succeeded.
    PaymentCompleted {
        transaction: PaymentTransaction,
        receipt: PaymentReceipt,
    },

    /// The charge step failed; the transaction is now `failed`.
    PaymentFailed {
        transaction: PaymentTransaction,
        error: String,
    },

    /// A linked refund record was created and settled.
    RefundCompleted { refund: PaymentTransaction },

    /// The refund step failed; the original is untouched.
    RefundFailed {
        original_id: TransactionId,
        error: String,
    },

    // -- pk-01 resource manager --
    /// Zones and spaces were created.
    LotInitialized { zones: usize, spaces: usize },

    /// A vehicle was bound to a space.
    SpaceAssigned { space: ParkingSpace },

    /// A vehicle left and the space is available again.
    SpaceReleased { space: ParkingSpace, plate: String },

    /// A space was reserved until `until`.
    SpaceReserved {
        space: ParkingSpace,
        until: DateTime<Utc>,
    },

    /// An unconsumed reservation timed out.
    ReservationExpired { space_id: SpaceId },

    /// A space was taken out of service.
    SpaceMaintenance { space: ParkingSpace, reason: String },

    /// Any status change not covered by a more specific event.
    SpaceStatusUpdated {
        space_id: SpaceId,
        from: SpaceStatus,
        to: SpaceStatus,
    },

    GateOpened { gate_id: GateId },

    GateClosed { gate_id: GateId },

    /// Recomputed after every transition.
    StatsUpdated { stats: ParkingStats },

    // -- pk-03 access controller --
    AuthSuccess {
        user_id: UserId,
        username: String,
        scope: Scope,
    },

    AuthFailed {
        username: Option<String>,
        reason: String,
    },

    SessionExpired { user_id: UserId, scope: Scope },

    PermissionDenied { user_id: UserId, permission: String },

    UserDeactivated {
        user_id: UserId,
        sessions_revoked: usize,
    },

    // -- pk-04 telemetry cache --
    /// A new entry was appended to the metrics history.
    MetricsCollected { metrics: PerformanceMetrics },

    // -- pk-05 report aggregator --
    ReportGenerated {
        report_id: ReportId,
        template_id: String,
        format: ReportFormat,
    },

    ReportScheduled {
        schedule_id: ScheduleId,
        kind: ReportKind,
        recipients: Vec<String>,
    },

    /// Report generation or a snapshot refresh failed.
    ReportFailed { context: String, error: String },

    /// A scheduled report was produced for its recipients.
    ReportDelivered {
        report_id: ReportId,
        schedule_id: ScheduleId,
        recipients: Vec<String>,
    },

    /// The cross-domain view was refreshed.
    DataUpdated { refreshed_at: DateTime<Utc> },

    // -- coordination outcomes --
    /// Payment completed and the bound space has been released.
    PaymentSettled {
        transaction_id: TransactionId,
        space_id: SpaceId,
        gate_opened: bool,
    },

    /// Payment failed and the bound space is back to `occupied`.
    PaymentReverted {
        transaction_id: TransactionId,
        space_id: SpaceId,
        error: String,
    },
}

impl ParkingEvent {
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::PaymentInitiated { .. }
            | Self::PaymentCompleted { .. }
            | Self::PaymentFailed { .. }
            | Self::RefundCompleted { .. }
            | Self::RefundFailed { .. } => EventTopic::Payment,
            Self::LotInitialized { .. }
            | Self::SpaceAssigned { .. }
            | Self::SpaceReleased { .. }
            | Self::SpaceReserved { .. }
            | Self::ReservationExpired { .. }
            | Self::SpaceMaintenance { .. }
            | Self::SpaceStatusUpdated { .. }
            | Self::GateOpened { .. }
            | Self::GateClosed { .. }
            | Self::StatsUpdated { .. } => EventTopic::Parking,
            Self::AuthSuccess { .. }
            | Self::AuthFailed { .. }
            | Self::SessionExpired { .. }
            | Self::PermissionDenied { .. }
            | Self::UserDeactivated { .. } => EventTopic::Security,
            Self::MetricsCollected { .. } => EventTopic::Telemetry,
            Self::ReportGenerated { .. }
            | Self::ReportScheduled { .. }
            | Self::ReportFailed { .. }
            | Self::ReportDelivered { .. }
            | Self::DataUpdated { .. } => EventTopic::Reporting,
            Self::PaymentSettled { .. } | Self::PaymentReverted { .. } => EventTopic::Integration,
        }
    }

    /// Subsystem id from [`source`] that emits this event.
    #[must_use]
    pub fn source_subsystem(&self) -> u8 {
        match self.topic() {
            EventTopic::Parking => source::RESOURCE_MANAGER,
            EventTopic::Payment => source::TRANSACTION_PROCESSOR,
            EventTopic::Security => source::ACCESS_CONTROLLER,
            EventTopic::Telemetry => source::TELEMETRY_CACHE,
            EventTopic::Reporting => match self {
                // Snapshot refreshes are driven by the runtime.
                Self::DataUpdated { .. } => source::RUNTIME,
                Self::ReportFailed { context, .. } if context == CACHE_REFRESH_CONTEXT => {
                    source::RUNTIME
                }
                _ => source::REPORT_AGGREGATOR,
            },
            EventTopic::Integration | EventTopic::All => source::RUNTIME,
        }
    }

    /// External snake_case event name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::PaymentInitiated { .. } => "payment_initiated",
            Self::PaymentCompleted { .. } => "payment_completed",
            Self::PaymentFailed { .. } => "payment_failed",
            Self::RefundCompleted { .. } => "refund_completed",
            Self::RefundFailed { .. } => "refund_failed",
            Self::LotInitialized { .. } => "lot_initialized",
            Self::SpaceAssigned { .. } => "space_assigned",
            Self::SpaceReleased { .. } => "space_released",
            Self::SpaceReserved { .. } => "space_reserved",
            Self::ReservationExpired { .. } => "reservation_expired",
            Self::SpaceMaintenance { .. } => "space_maintenance",
            Self::SpaceStatusUpdated { .. } => "space_status_updated",
            Self::GateOpened { .. } => "gate_opened",
            Self::GateClosed { .. } => "gate_closed",
            Self::StatsUpdated { .. } => "stats_updated",
            Self::AuthSuccess { .. } => "auth_success",
            Self::AuthFailed { .. } => "auth_failed",
            Self::SessionExpired { .. } => "session_expired",
            Self::PermissionDenied { .. } => "permission_denied",
            Self::UserDeactivated { .. } => "user_deactivated",
            Self::MetricsCollected { .. } => "metrics_collected",
            Self::ReportGenerated { .. } => "report_generated",
            Self::ReportScheduled { .. } => "report_scheduled",
            Self::ReportFailed { .. } => "report_failed",
            Self::ReportDelivered { .. } => "report_delivered",
            Self::DataUpdated { .. } => "data_updated",
            Self::PaymentSettled { .. } => "payment_settled",
            Self::PaymentReverted { .. } => "payment_reverted",
        }
    }
}

/// `ReportFailed.context` used by the snapshot refresher.
pub const CACHE_REFRESH_CONTEXT: &str = "cache_refresh";

/// Coarse grouping used by [`EventFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Subsystem 1 events.
    Parking,
    /// Subsystem 2 events.
    Payment,
    /// Subsystem 3 events.
    Security,
    /// Subsystem 4 events.
    Telemetry,
    /// Subsystem 5 events and snapshot refreshes.
    Reporting,
    /// Outcomes of cross-subsystem coordination.
    Integration,
    /// Matches every event when used in a filter.
    All,
}

/// Receiving-side filter. Both lists are conjunctive; an empty list
/// places no restriction.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub topics: Vec<EventTopic>,
    pub source_subsystems: Vec<u8>,
}

impl EventFilter {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            source_subsystems: Vec::new(),
        }
    }

    #[must_use]
    pub fn from_subsystems(subsystems: Vec<u8>) -> Self {
        Self {
            topics: Vec::new(),
            source_subsystems: subsystems,
        }
    }

    #[must_use]
    pub fn matches(&self, event: &ParkingEvent) -> bool {
        let topic = event.topic();
        let by_topic = self.topics.is_empty()
            || self
                .topics
                .iter()
                .any(|t| *t == EventTopic::All || *t == topic);
        by_topic
            && (self.source_subsystems.is_empty()
                || self.source_subsystems.contains(&event.source_subsystem()))
    }
}
