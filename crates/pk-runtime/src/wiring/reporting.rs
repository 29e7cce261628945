//! # Reporting Bridge
//!
//! Keeps the cross-domain view held by the Telemetry Cache current and
//! exposes it to the Report Aggregator.
//!
//! - Active refresh: pulls today's payments, parking stats and the latest
//!   metrics through a pooled connection on every interval.
//! - Passive refresh: payment outcomes, stats and metrics events update
//!   their part of the view as they arrive.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use pk_01_resource_manager::ResourceManagerApi;
use pk_02_transaction_processor::TransactionProcessorApi;
use pk_04_telemetry_cache::{TelemetryCacheApi, TelemetryCacheService};
use pk_05_report_aggregator::{DateRange, ReportDataSource, ReportError};
use shared_bus::{EventPublisher, ParkingEvent, CACHE_REFRESH_CONTEXT};
use shared_types::{CrossDomainSnapshot, PaymentsSnapshot, TimeSource, TransactionStatus};
use tracing::{debug, error, instrument};

use crate::errors::CoordinationError;

fn start_of_day(at: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&at.date_naive().and_time(NaiveTime::MIN))
}

pub struct ReportingBridge {
    payments: Arc<dyn TransactionProcessorApi>,
    resources: Arc<dyn ResourceManagerApi>,
    cache: Arc<TelemetryCacheService>,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn TimeSource>,
}

impl ReportingBridge {
    pub fn new(
        payments: Arc<dyn TransactionProcessorApi>,
        resources: Arc<dyn ResourceManagerApi>,
        cache: Arc<TelemetryCacheService>,
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            payments,
            resources,
            cache,
            publisher,
            clock,
        }
    }

    /// Replaces all three parts of the view and emits `DataUpdated`.
    ///
    /// On failure `ReportFailed { context: "cache_refresh" }` is emitted
    /// and the error returned; the view keeps its previous contents.
    #[instrument(skip(self), name = "snapshot_refresh")]
    pub async fn refresh_snapshot(&self) -> Result<(), CoordinationError> {
        let now = self.clock.now();
        let outcome = self
            .cache
            .pool()
            .with_connection(|_conn| async {
                let transactions = self.payments.transactions_since(start_of_day(now));
                let stats = self.resources.stats();
                let metrics = self.cache.current_metrics();
                (transactions, stats, metrics)
            })
            .await;

        match outcome {
            Ok((transactions, stats, metrics)) => {
                let view = self.cache.view();
                debug!(payments = transactions.len(), "[coord] Snapshot refreshed");
                view.update_payments(transactions, now);
                view.update_parking(stats, now);
                if let Some(metrics) = metrics {
                    view.update_performance(metrics, now);
                }
                self.publisher
                    .publish(ParkingEvent::DataUpdated { refreshed_at: now })
                    .await;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "[coord] Snapshot refresh failed");
                self.publisher
                    .publish(ParkingEvent::ReportFailed {
                        context: CACHE_REFRESH_CONTEXT.to_string(),
                        error: e.to_string(),
                    })
                    .await;
                Err(e.into())
            }
        }
    }

    pub async fn handle(&self, event: &ParkingEvent) {
        let now = self.clock.now();
        let view = self.cache.view();
        match event {
            ParkingEvent::PaymentCompleted { transaction, .. }
            | ParkingEvent::PaymentFailed { transaction, .. } => {
                view.record_payment(transaction.clone(), now);
            }
            ParkingEvent::RefundCompleted { refund } => {
                view.record_payment(refund.clone(), now);
            }
            ParkingEvent::StatsUpdated { stats } => {
                view.update_parking(stats.clone(), now);
            }
            ParkingEvent::MetricsCollected { metrics } => {
                view.update_performance(metrics.clone(), now);
            }
            _ => return,
        }
        self.publisher
            .publish(ParkingEvent::DataUpdated { refreshed_at: now })
            .await;
    }
}

/// Report data: payments are read live from the Transaction Processor for
/// the requested range; parking and performance come from the view.
pub struct ViewDataSource {
    payments: Arc<dyn TransactionProcessorApi>,
    cache: Arc<TelemetryCacheService>,
}

impl ViewDataSource {
    pub fn new(
        payments: Arc<dyn TransactionProcessorApi>,
        cache: Arc<TelemetryCacheService>,
    ) -> Self {
        Self { payments, cache }
    }
}

#[async_trait]
impl ReportDataSource for ViewDataSource {
    async fn load(&self, range: &DateRange) -> Result<CrossDomainSnapshot, ReportError> {
        let view = self.cache.view().snapshot();
        if view == CrossDomainSnapshot::default() {
            return Err(ReportError::DataSource(
                "cross-domain view has not been populated".into(),
            ));
        }

        let transactions: Vec<_> = self
            .payments
            .transactions_since(range.start)
            .into_iter()
            .filter(|tx| tx.created_at < range.end)
            .collect();
        let total_amount = transactions
            .iter()
            .filter(|tx| tx.status == TransactionStatus::Completed)
            .map(|tx| tx.total)
            .sum();
        let last_updated = view
            .payments
            .as_ref()
            .map_or(range.end, |p| p.last_updated);

        Ok(CrossDomainSnapshot {
            payments: Some(PaymentsSnapshot {
                transactions,
                total_amount,
                last_updated,
            }),
            parking: view.parking,
            performance: view.performance,
        })
    }
}
