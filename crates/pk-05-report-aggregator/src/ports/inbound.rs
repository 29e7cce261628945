//! # Inbound Port - ReportAggregatorApi

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared_types::{ReportFormat, ReportKind};

use crate::domain::{DateRange, Report, ReportError, ReportSchedule, ReportTemplate};

/// Result of one scheduler tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleTick {
    /// `(schedule_id, report_id)` per delivered run.
    pub delivered: Vec<(String, String)>,
    /// `(schedule_id, error)` per failed run.
    pub failed: Vec<(String, ReportError)>,
}

/// Primary API for the Report Aggregator.
#[async_trait]
pub trait ReportAggregatorApi: Send + Sync {
    /// Adds a custom template. Ids are unique across built-ins and customs.
    fn register_template(&self, template: ReportTemplate) -> Result<(), ReportError>;

    fn templates(&self) -> Vec<ReportTemplate>;

    /// Gathers, renders and stores a report. Emits `ReportGenerated`, or
    /// `ReportFailed` before returning the error.
    async fn generate_report(
        &self,
        template_id: &str,
        range: DateRange,
        format: ReportFormat,
    ) -> Result<Report, ReportError>;

    /// Stores a schedule parsed from `"<frequency> <HH:mm>"` and emits
    /// `ReportScheduled`. Nothing is stored when validation fails, and
    /// `ReportFailed` is emitted instead.
    async fn schedule_report(
        &self,
        kind: ReportKind,
        schedule: &str,
        recipients: Vec<String>,
    ) -> Result<ReportSchedule, ReportError>;

    /// Deactivates a schedule. It stays listed with `active = false`.
    fn cancel_schedule(&self, schedule_id: &str) -> Result<(), ReportError>;

    /// Runs every schedule due at `now`. One failing schedule does not
    /// stop the others.
    async fn run_due_schedules(&self, now: DateTime<Utc>) -> ScheduleTick;

    fn report(&self, report_id: &str) -> Option<Report>;

    fn reports_by_kind(&self, kind: ReportKind) -> Vec<Report>;

    fn schedules(&self) -> Vec<ReportSchedule>;
}
