//! # Report Aggregator Service
//!
//! Template registry, generated-report store and schedule table. Each table
//! has its own lock; none is held across data loading or event publishing.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::json;
use shared_bus::{EventPublisher, ParkingEvent};
use shared_types::{prefixed_id, ReportFormat, ReportKind, ScheduleId, TimeSource};
use tracing::{debug, info, instrument, warn};

use crate::domain::{
    gather, DateRange, Report, ReportError, ReportHeader, ReportSchedule, ReportTemplate,
    ScheduleSpec,
};
use crate::ports::{ReportAggregatorApi, ReportDataSource, ReportRenderer, ScheduleTick};

/// Scheduled runs always render this format.
const SCHEDULED_FORMAT: ReportFormat = ReportFormat::Pdf;

/// The Report Aggregator.
pub struct ReportAggregatorService {
    templates: RwLock<BTreeMap<String, ReportTemplate>>,
    reports: RwLock<Vec<Report>>,
    schedules: RwLock<BTreeMap<ScheduleId, ReportSchedule>>,
    data_source: Arc<dyn ReportDataSource>,
    renderer: Arc<dyn ReportRenderer>,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn TimeSource>,
}

impl ReportAggregatorService {
    /// Creates the service with the built-in template for every report kind.
    pub fn new(
        data_source: Arc<dyn ReportDataSource>,
        renderer: Arc<dyn ReportRenderer>,
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        let templates = ReportTemplate::builtin()
            .into_iter()
            .map(|template| (template.id.clone(), template))
            .collect();
        Self {
            templates: RwLock::new(templates),
            reports: RwLock::new(Vec::new()),
            schedules: RwLock::new(BTreeMap::new()),
            data_source,
            renderer,
            publisher,
            clock,
        }
    }

    /// Gathers, renders and stores one report, then emits `ReportGenerated`.
    async fn produce(
        &self,
        template_id: &str,
        range: DateRange,
        format: ReportFormat,
        schedule_id: Option<&str>,
    ) -> Result<Report, ReportError> {
        let template = self
            .templates
            .read()
            .get(template_id)
            .cloned()
            .ok_or_else(|| ReportError::TemplateNotFound(template_id.to_string()))?;

        let snapshot = self.data_source.load(&range).await?;
        let body = gather(template.kind, &snapshot, &range);

        let id = prefixed_id("RPT");
        let generated_at = self.clock.now();
        let header = ReportHeader {
            id: &id,
            title: &template.name,
            range,
            generated_at,
        };
        let content = self.renderer.render(&header, &body, format)?;

        let mut metadata = serde_json::Map::new();
        metadata.insert("template_name".into(), json!(template.name));
        metadata.insert("parameters".into(), json!(template.parameters));
        metadata.insert("content_length".into(), json!(content.len()));
        if let Some(schedule_id) = schedule_id {
            metadata.insert("schedule_id".into(), json!(schedule_id));
        }

        let report = Report {
            id,
            template_id: template.id,
            kind: template.kind,
            format,
            range,
            generated_at,
            body,
            content,
            metadata,
        };
        self.reports.write().push(report.clone());

        info!(
            report_id = %report.id,
            template_id = %report.template_id,
            format = format.as_str(),
            bytes = report.content.len(),
            "[pk-05] Report generated"
        );
        self.publisher
            .publish(ParkingEvent::ReportGenerated {
                report_id: report.id.clone(),
                template_id: report.template_id.clone(),
                format,
            })
            .await;
        Ok(report)
    }

    async fn publish_failure(&self, context: &str, err: &ReportError) {
        warn!(context, error = %err, "[pk-05] Report failed");
        self.publisher
            .publish(ParkingEvent::ReportFailed {
                context: context.to_string(),
                error: err.to_string(),
            })
            .await;
    }
}

fn validate_schedule(
    schedule: &str,
    recipients: Vec<String>,
) -> Result<(ScheduleSpec, Vec<String>), ReportError> {
    let spec: ScheduleSpec = schedule.parse()?;
    let recipients: Vec<String> = recipients
        .into_iter()
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .collect();
    if recipients.is_empty() {
        return Err(ReportError::InvalidSchedule(
            "at least one recipient is required".into(),
        ));
    }
    Ok((spec, recipients))
}

#[async_trait]
impl ReportAggregatorApi for ReportAggregatorService {
    fn register_template(&self, template: ReportTemplate) -> Result<(), ReportError> {
        let mut templates = self.templates.write();
        if templates.contains_key(&template.id) {
            return Err(ReportError::DuplicateTemplate(template.id));
        }
        debug!(template_id = %template.id, kind = %template.kind, "[pk-05] Template registered");
        templates.insert(template.id.clone(), template);
        Ok(())
    }

    fn templates(&self) -> Vec<ReportTemplate> {
        self.templates.read().values().cloned().collect()
    }

    #[instrument(skip(self, range, format), fields(format = format.as_str()))]
    async fn generate_report(
        &self,
        template_id: &str,
        range: DateRange,
        format: ReportFormat,
    ) -> Result<Report, ReportError> {
        match self.produce(template_id, range, format, None).await {
            Ok(report) => Ok(report),
            Err(err) => {
                self.publish_failure(template_id, &err).await;
                Err(err)
            }
        }
    }

    async fn schedule_report(
        &self,
        kind: ReportKind,
        schedule: &str,
        recipients: Vec<String>,
    ) -> Result<ReportSchedule, ReportError> {
        let (spec, recipients) = match validate_schedule(schedule, recipients) {
            Ok(valid) => valid,
            Err(err) => {
                self.publish_failure(kind.as_str(), &err).await;
                return Err(err);
            }
        };

        let stored = ReportSchedule {
            id: prefixed_id("SCH"),
            kind,
            template_id: kind.as_str().to_string(),
            spec,
            recipients,
            active: true,
            created_at: self.clock.now(),
            last_run: None,
        };
        self.schedules
            .write()
            .insert(stored.id.clone(), stored.clone());

        info!(schedule_id = %stored.id, %kind, schedule = %spec, "[pk-05] Report scheduled");
        self.publisher
            .publish(ParkingEvent::ReportScheduled {
                schedule_id: stored.id.clone(),
                kind,
                recipients: stored.recipients.clone(),
            })
            .await;
        Ok(stored)
    }

    fn cancel_schedule(&self, schedule_id: &str) -> Result<(), ReportError> {
        let mut schedules = self.schedules.write();
        let schedule = schedules
            .get_mut(schedule_id)
            .ok_or_else(|| ReportError::ScheduleNotFound(schedule_id.to_string()))?;
        schedule.active = false;
        info!(schedule_id, "[pk-05] Schedule cancelled");
        Ok(())
    }

    async fn run_due_schedules(&self, now: DateTime<Utc>) -> ScheduleTick {
        // Marked before running so a slow or failing run is not repeated
        // within the same minute.
        let due: Vec<ReportSchedule> = {
            let mut schedules = self.schedules.write();
            schedules
                .values_mut()
                .filter(|schedule| schedule.is_due(now))
                .map(|schedule| {
                    schedule.mark_run(now);
                    schedule.clone()
                })
                .collect()
        };

        let mut tick = ScheduleTick::default();
        for schedule in due {
            let range = schedule.spec.frequency.lookback(now);
            match self
                .produce(&schedule.template_id, range, SCHEDULED_FORMAT, Some(&schedule.id))
                .await
            {
                Ok(report) => {
                    info!(
                        schedule_id = %schedule.id,
                        report_id = %report.id,
                        recipients = schedule.recipients.len(),
                        "[pk-05] Scheduled report delivered"
                    );
                    self.publisher
                        .publish(ParkingEvent::ReportDelivered {
                            report_id: report.id.clone(),
                            schedule_id: schedule.id.clone(),
                            recipients: schedule.recipients.clone(),
                        })
                        .await;
                    tick.delivered.push((schedule.id, report.id));
                }
                Err(err) => {
                    self.publish_failure(&schedule.id, &err).await;
                    tick.failed.push((schedule.id, err));
                }
            }
        }
        tick
    }

    fn report(&self, report_id: &str) -> Option<Report> {
        self.reports
            .read()
            .iter()
            .find(|report| report.id == report_id)
            .cloned()
    }

    fn reports_by_kind(&self, kind: ReportKind) -> Vec<Report> {
        self.reports
            .read()
            .iter()
            .filter(|report| report.kind == kind)
            .cloned()
            .collect()
    }

    fn schedules(&self) -> Vec<ReportSchedule> {
        self.schedules.read().values().cloned().collect()
    }
}
