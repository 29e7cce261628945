//! Outbound (Driven) ports for the Report Aggregator.

use async_trait::async_trait;
use shared_types::{CrossDomainSnapshot, ReportFormat};

use crate::domain::{DateRange, ReportBody, ReportError, ReportHeader};

/// Supplies the cross-domain data a report is gathered from.
#[async_trait]
pub trait ReportDataSource: Send + Sync {
    async fn load(&self, range: &DateRange) -> Result<CrossDomainSnapshot, ReportError>;
}

/// Encodes a gathered report body.
pub trait ReportRenderer: Send + Sync {
    fn render(
        &self,
        header: &ReportHeader<'_>,
        body: &ReportBody,
        format: ReportFormat,
    ) -> Result<Vec<u8>, ReportError>;
}
