//! Bus traffic to Prometheus counters.

use pk_telemetry::{
    BUS_EVENTS, LOGINS, PAYMENTS, PAYMENT_AMOUNT, REPORTS, SPACES_OCCUPIED, SPACE_TRANSITIONS,
};
use shared_bus::ParkingEvent;
use shared_types::SpaceStatus;

#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsObserver;

impl MetricsObserver {
    pub fn observe(&self, event: &ParkingEvent) {
        BUS_EVENTS.with_label_values(&[event.name()]).inc();

        match event {
            ParkingEvent::PaymentInitiated { .. } => {
                PAYMENTS.with_label_values(&["initiated"]).inc();
            }
            ParkingEvent::PaymentCompleted { transaction, .. } => {
                PAYMENTS.with_label_values(&["completed"]).inc();
                PAYMENT_AMOUNT
                    .with_label_values(&[transaction.method_id.as_str()])
                    .inc_by(transaction.total as f64);
            }
            ParkingEvent::PaymentFailed { .. } => {
                PAYMENTS.with_label_values(&["failed"]).inc();
            }
            ParkingEvent::RefundCompleted { .. } => {
                PAYMENTS.with_label_values(&["refunded"]).inc();
            }
            ParkingEvent::SpaceAssigned { .. } => transition(SpaceStatus::Occupied),
            ParkingEvent::SpaceReleased { .. } | ParkingEvent::ReservationExpired { .. } => {
                transition(SpaceStatus::Available);
            }
            ParkingEvent::SpaceReserved { .. } => transition(SpaceStatus::Reserved),
            ParkingEvent::SpaceMaintenance { .. } => transition(SpaceStatus::Maintenance),
            ParkingEvent::SpaceStatusUpdated { to, .. } => transition(*to),
            ParkingEvent::StatsUpdated { stats } => {
                SPACES_OCCUPIED.set((stats.occupied + stats.payment_pending) as f64);
            }
            ParkingEvent::AuthSuccess { .. } => {
                LOGINS.with_label_values(&["success"]).inc();
            }
            ParkingEvent::AuthFailed { .. } => {
                LOGINS.with_label_values(&["failed"]).inc();
            }
            ParkingEvent::ReportGenerated { .. } => {
                REPORTS.with_label_values(&["generated"]).inc();
            }
            ParkingEvent::ReportDelivered { .. } => {
                REPORTS.with_label_values(&["delivered"]).inc();
            }
            ParkingEvent::ReportFailed { .. } => {
                REPORTS.with_label_values(&["failed"]).inc();
            }
            _ => {}
        }
    }
}

fn transition(to: SpaceStatus) {
    SPACE_TRANSITIONS.with_label_values(&[to.as_str()]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::ParkingStats;

    #[test]
    fn test_counts_follow_events() {
        let observer = MetricsObserver;
        let maintenance = SPACE_TRANSITIONS.with_label_values(&["maintenance"]).get();
        let gate_events = BUS_EVENTS.with_label_values(&["gate_opened"]).get();

        observer.observe(&ParkingEvent::SpaceStatusUpdated {
            space_id: "A_1".into(),
            from: SpaceStatus::Available,
            to: SpaceStatus::Maintenance,
        });
        observer.observe(&ParkingEvent::GateOpened {
            gate_id: "G1".into(),
        });
        observer.observe(&ParkingEvent::StatsUpdated {
            stats: ParkingStats {
                total_spaces: 10,
                available: 6,
                occupied: 3,
                payment_pending: 1,
                ..ParkingStats::default()
            },
        });

        assert!(SPACE_TRANSITIONS.with_label_values(&["maintenance"]).get() > maintenance);
        assert!(BUS_EVENTS.with_label_values(&["gate_opened"]).get() > gate_events);
        assert_eq!(SPACES_OCCUPIED.get(), 4.0);
    }
}
