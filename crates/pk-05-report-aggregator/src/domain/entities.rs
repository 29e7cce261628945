//! # Report Aggregator Entities
//!
//! Templates, generated reports and the date range they cover.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::{ReportFormat, ReportId, ReportKind};

use super::gather::ReportBody;

/// A named report definition. Built-in templates use `kind.as_str()` as id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTemplate {
    pub id: String,
    pub name: String,
    pub kind: ReportKind,
    /// Free-form parameter names, carried into report metadata.
    #[serde(default)]
    pub parameters: Vec<String>,
}

impl ReportTemplate {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: ReportKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            parameters: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_parameters(mut self, parameters: Vec<String>) -> Self {
        self.parameters = parameters;
        self
    }

    /// One template per report kind.
    pub fn builtin() -> Vec<ReportTemplate> {
        ReportKind::ALL
            .iter()
            .map(|&kind| {
                let name = match kind {
                    ReportKind::DailySummary => "Daily Summary",
                    ReportKind::PaymentReport => "Payment Report",
                    ReportKind::OccupancyReport => "Occupancy Report",
                    ReportKind::RevenueReport => "Revenue Report",
                };
                ReportTemplate::new(kind.as_str(), name, kind)
            })
            .collect()
    }
}

/// Inclusive start, exclusive end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }
}

/// An immutable generated report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: ReportId,
    pub template_id: String,
    pub kind: ReportKind,
    pub format: ReportFormat,
    pub range: DateRange,
    pub generated_at: DateTime<Utc>,
    pub body: ReportBody,
    /// Rendered bytes in `format`.
    pub content: Vec<u8>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Header passed to renderers alongside the body.
#[derive(Debug, Clone, Copy)]
pub struct ReportHeader<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub range: DateRange,
    pub generated_at: DateTime<Utc>,
}
