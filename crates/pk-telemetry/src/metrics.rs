//! Prometheus metrics for the parking coordination core.
//!
//! All metrics follow the naming convention: `pk_<area>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, Gauge, Histogram, HistogramOpts, IntCounterVec, Opts, Registry,
    TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // PARKING METRICS (Subsystem 1)
    // =========================================================================

    /// Space status transitions by target status
    pub static ref SPACE_TRANSITIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("pk_parking_space_transitions_total", "Space status transitions"),
        &["status"]
    ).expect("metric creation failed");

    /// Spaces with a vehicle present
    pub static ref SPACES_OCCUPIED: Gauge = Gauge::new(
        "pk_parking_spaces_occupied",
        "Spaces currently occupied or awaiting payment"
    ).expect("metric creation failed");

    // =========================================================================
    // PAYMENT METRICS (Subsystem 2)
    // =========================================================================

    /// Payments by outcome: initiated/completed/failed/refunded
    pub static ref PAYMENTS: IntCounterVec = IntCounterVec::new(
        Opts::new("pk_payments_total", "Payment lifecycle events"),
        &["outcome"]
    ).expect("metric creation failed");

    /// Settled amount in minor units
    pub static ref PAYMENT_AMOUNT: CounterVec = CounterVec::new(
        Opts::new("pk_payments_amount_minor_units_total", "Total of completed payments"),
        &["method"]
    ).expect("metric creation failed");

    // =========================================================================
    // SECURITY METRICS (Subsystem 3)
    // =========================================================================

    /// Logins by outcome: success/failed
    pub static ref LOGINS: IntCounterVec = IntCounterVec::new(
        Opts::new("pk_security_logins_total", "Login attempts"),
        &["outcome"]
    ).expect("metric creation failed");

    /// Rejected cross-subsystem calls by scope
    pub static ref ACCESS_DENIED: IntCounterVec = IntCounterVec::new(
        Opts::new("pk_security_access_denied_total", "Calls rejected by the security gate"),
        &["scope"]
    ).expect("metric creation failed");

    // =========================================================================
    // REPORT METRICS (Subsystem 5)
    // =========================================================================

    /// Reports by outcome: generated/delivered/failed
    pub static ref REPORTS: IntCounterVec = IntCounterVec::new(
        Opts::new("pk_reports_total", "Report generation outcomes"),
        &["outcome"]
    ).expect("metric creation failed");

    // =========================================================================
    // EVENT BUS METRICS
    // =========================================================================

    /// Events observed on the bus by name
    pub static ref BUS_EVENTS: IntCounterVec = IntCounterVec::new(
        Opts::new("pk_eventbus_events_total", "Events observed on the bus"),
        &["event"]
    ).expect("metric creation failed");

    /// Coordination handler duration
    pub static ref HANDLER_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "pk_eventbus_handler_duration_seconds",
            "Time spent in coordination handlers"
        ).buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0])
    ).expect("metric creation failed");

    /// Scheduler job failures by job name
    pub static ref JOB_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new("pk_scheduler_job_failures_total", "Periodic job failures"),
        &["job"]
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry. Safe to call twice.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Parking
        Box::new(SPACE_TRANSITIONS.clone()),
        Box::new(SPACES_OCCUPIED.clone()),
        // Payments
        Box::new(PAYMENTS.clone()),
        Box::new(PAYMENT_AMOUNT.clone()),
        // Security
        Box::new(LOGINS.clone()),
        Box::new(ACCESS_DENIED.clone()),
        // Reports
        Box::new(REPORTS.clone()),
        // Event Bus
        Box::new(BUS_EVENTS.clone()),
        Box::new(HANDLER_DURATION.clone()),
        Box::new(JOB_FAILURES.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn gather_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_idempotent() {
        register_metrics().unwrap();
        register_metrics().unwrap();
    }

    #[test]
    fn test_gather_contains_counters() {
        register_metrics().unwrap();
        PAYMENTS.with_label_values(&["completed"]).inc();
        let text = gather_metrics().unwrap();
        assert!(text.contains("pk_payments_total"));
    }

    #[test]
    fn test_gauge_set() {
        SPACES_OCCUPIED.set(7.0);
        assert_eq!(SPACES_OCCUPIED.get(), 7.0);
    }

    #[test]
    fn test_histogram_timer() {
        let before = HANDLER_DURATION.get_sample_count();
        drop(HistogramTimer::new(&HANDLER_DURATION));
        assert!(HANDLER_DURATION.get_sample_count() > before);
    }
}
