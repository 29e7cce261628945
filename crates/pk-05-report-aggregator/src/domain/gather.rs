//! Data gathering, one summary shape per report kind.
//!
//! Everything is computed from a [`CrossDomainSnapshot`]. A missing part of
//! the snapshot reads as empty rather than failing the report.

use std::collections::BTreeMap;

use chrono::Timelike;
use serde::{Deserialize, Serialize};
use shared_types::{
    Amount, CrossDomainSnapshot, ParkingStats, PaymentTransaction, ReportKind, TransactionStatus,
    VehicleType, VehicleTypeStats,
};

use super::entities::DateRange;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportBody {
    DailySummary(DailySummary),
    PaymentReport(PaymentSummary),
    OccupancyReport(OccupancySummary),
    RevenueReport(RevenueSummary),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub total_transactions: usize,
    pub completed_transactions: usize,
    pub total_revenue: Amount,
    pub total_spaces: usize,
    pub occupied_spaces: usize,
    pub occupancy_rate: f64,
    pub avg_response_ms: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodTotals {
    pub count: usize,
    pub amount: Amount,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub total_payments: usize,
    pub completed: usize,
    pub failed: usize,
    pub pending: usize,
    pub refunds: usize,
    pub refunded_amount: Amount,
    /// Completed payments only.
    pub by_method: BTreeMap<String, MethodTotals>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OccupancySummary {
    pub total_spaces: usize,
    pub occupied: usize,
    pub available: usize,
    pub payment_pending: usize,
    pub reserved: usize,
    pub maintenance: usize,
    pub occupancy_rate: f64,
    pub by_vehicle_type: BTreeMap<VehicleType, VehicleTypeStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueSummary {
    pub gross_revenue: Amount,
    pub total_tax: Amount,
    pub refunded: Amount,
    /// `gross_revenue - refunded`, floored at zero.
    pub net_revenue: Amount,
    pub by_method: BTreeMap<String, Amount>,
    /// Completed totals keyed by UTC hour of creation.
    pub by_hour: BTreeMap<u32, Amount>,
}

/// Builds the body for `kind` from the transactions inside `range`.
pub fn gather(kind: ReportKind, snapshot: &CrossDomainSnapshot, range: &DateRange) -> ReportBody {
    let transactions: Vec<&PaymentTransaction> = snapshot
        .payments
        .iter()
        .flat_map(|p| p.transactions.iter())
        .filter(|tx| range.contains(tx.created_at))
        .collect();
    let stats = snapshot
        .parking
        .as_ref()
        .map(|p| p.stats.clone())
        .unwrap_or_default();

    match kind {
        ReportKind::DailySummary => {
            let completed: Vec<_> = completed(&transactions).collect();
            ReportBody::DailySummary(DailySummary {
                total_transactions: transactions.len(),
                completed_transactions: completed.len(),
                total_revenue: completed.iter().map(|tx| tx.total).sum(),
                total_spaces: stats.total_spaces,
                occupied_spaces: stats.occupied + stats.payment_pending,
                occupancy_rate: stats.occupancy_rate,
                avg_response_ms: snapshot
                    .performance
                    .as_ref()
                    .filter(|p| p.metrics.response_times.samples > 0)
                    .map(|p| p.metrics.response_times.average_ms),
            })
        }
        ReportKind::PaymentReport => ReportBody::PaymentReport(payment_summary(&transactions)),
        ReportKind::OccupancyReport => ReportBody::OccupancyReport(occupancy_summary(stats)),
        ReportKind::RevenueReport => ReportBody::RevenueReport(revenue_summary(&transactions)),
    }
}

fn completed<'a>(
    transactions: &'a [&'a PaymentTransaction],
) -> impl Iterator<Item = &'a PaymentTransaction> + 'a {
    transactions
        .iter()
        .copied()
        .filter(|tx| tx.status == TransactionStatus::Completed)
}

fn payment_summary(transactions: &[&PaymentTransaction]) -> PaymentSummary {
    let mut summary = PaymentSummary::default();
    for tx in transactions {
        match tx.status {
            TransactionStatus::Completed => {
                summary.total_payments += 1;
                summary.completed += 1;
                let totals = summary.by_method.entry(tx.method_id.clone()).or_default();
                totals.count += 1;
                totals.amount += tx.total;
            }
            TransactionStatus::Failed => {
                summary.total_payments += 1;
                summary.failed += 1;
            }
            TransactionStatus::Pending | TransactionStatus::Processing => {
                summary.total_payments += 1;
                summary.pending += 1;
            }
            TransactionStatus::Refunded => {
                summary.refunds += 1;
                summary.refunded_amount += tx.total;
            }
        }
    }
    summary
}

fn occupancy_summary(stats: ParkingStats) -> OccupancySummary {
    OccupancySummary {
        total_spaces: stats.total_spaces,
        occupied: stats.occupied,
        available: stats.available,
        payment_pending: stats.payment_pending,
        reserved: stats.reserved,
        maintenance: stats.maintenance,
        occupancy_rate: stats.occupancy_rate,
        by_vehicle_type: stats.by_vehicle_type,
    }
}

fn revenue_summary(transactions: &[&PaymentTransaction]) -> RevenueSummary {
    let mut summary = RevenueSummary::default();
    for tx in completed(transactions) {
        summary.gross_revenue += tx.total;
        summary.total_tax += tx.tax;
        *summary.by_method.entry(tx.method_id.clone()).or_default() += tx.total;
        *summary.by_hour.entry(tx.created_at.hour()).or_default() += tx.total;
    }
    summary.refunded = transactions
        .iter()
        .filter(|tx| tx.status == TransactionStatus::Refunded)
        .map(|tx| tx.total)
        .sum();
    summary.net_revenue = summary.gross_revenue.saturating_sub(summary.refunded);
    summary
}

impl ReportBody {
    pub fn kind(&self) -> ReportKind {
        match self {
            Self::DailySummary(_) => ReportKind::DailySummary,
            Self::PaymentReport(_) => ReportKind::PaymentReport,
            Self::OccupancyReport(_) => ReportKind::OccupancyReport,
            Self::RevenueReport(_) => ReportKind::RevenueReport,
        }
    }

    /// Flat `(metric, value)` rows for tabular renderers.
    pub fn rows(&self) -> Vec<(String, String)> {
        let mut rows = Vec::new();
        let mut push = |key: &str, value: String| rows.push((key.to_string(), value));
        match self {
            Self::DailySummary(s) => {
                push("total_transactions", s.total_transactions.to_string());
                push("completed_transactions", s.completed_transactions.to_string());
                push("total_revenue", s.total_revenue.to_string());
                push("total_spaces", s.total_spaces.to_string());
                push("occupied_spaces", s.occupied_spaces.to_string());
                push("occupancy_rate", format!("{:.2}", s.occupancy_rate));
                if let Some(avg) = s.avg_response_ms {
                    push("avg_response_ms", format!("{avg:.2}"));
                }
            }
            Self::PaymentReport(s) => {
                push("total_payments", s.total_payments.to_string());
                push("completed", s.completed.to_string());
                push("failed", s.failed.to_string());
                push("pending", s.pending.to_string());
                push("refunds", s.refunds.to_string());
                push("refunded_amount", s.refunded_amount.to_string());
                for (method, totals) in &s.by_method {
                    push(&format!("method.{method}.count"), totals.count.to_string());
                    push(&format!("method.{method}.amount"), totals.amount.to_string());
                }
            }
            Self::OccupancyReport(s) => {
                push("total_spaces", s.total_spaces.to_string());
                push("occupied", s.occupied.to_string());
                push("available", s.available.to_string());
                push("payment_pending", s.payment_pending.to_string());
                push("reserved", s.reserved.to_string());
                push("maintenance", s.maintenance.to_string());
                push("occupancy_rate", format!("{:.2}", s.occupancy_rate));
                for (vehicle_type, counts) in &s.by_vehicle_type {
                    let prefix = format!("vehicle.{}", vehicle_type.as_str());
                    push(&format!("{prefix}.total"), counts.total.to_string());
                    push(&format!("{prefix}.occupied"), counts.occupied.to_string());
                }
            }
            Self::RevenueReport(s) => {
                push("gross_revenue", s.gross_revenue.to_string());
                push("total_tax", s.total_tax.to_string());
                push("refunded", s.refunded.to_string());
                push("net_revenue", s.net_revenue.to_string());
                for (method, amount) in &s.by_method {
                    push(&format!("method.{method}"), amount.to_string());
                }
                for (hour, amount) in &s.by_hour {
                    push(&format!("hour.{hour:02}"), amount.to_string());
                }
            }
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use shared_types::{ParkingSnapshot, PaymentsSnapshot};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, hour, 15, 0).unwrap()
    }

    fn tx(id: &str, method: &str, status: TransactionStatus, total: u64, hour: u32) -> PaymentTransaction {
        PaymentTransaction {
            id: id.into(),
            ticket_ref: format!("T-{id}"),
            amount: total,
            tax: total / 11,
            total,
            method_id: method.into(),
            status,
            created_at: at(hour),
            completed_at: None,
            operator: "op".into(),
            metadata: serde_json::Map::new(),
            receipt: None,
            error: None,
            original_transaction_id: None,
        }
    }

    fn snapshot() -> CrossDomainSnapshot {
        let transactions = vec![
            tx("A", "cash", TransactionStatus::Completed, 1100, 9),
            tx("B", "card", TransactionStatus::Completed, 2200, 9),
            tx("C", "card", TransactionStatus::Failed, 500, 10),
            tx("R", "card", TransactionStatus::Refunded, 2200, 11),
            tx("OLD", "cash", TransactionStatus::Completed, 9999, 0),
        ];
        let mut stats = ParkingStats {
            total_spaces: 10,
            available: 6,
            occupied: 3,
            payment_pending: 1,
            occupancy_rate: 40.0,
            ..ParkingStats::default()
        };
        stats.by_vehicle_type.insert(
            VehicleType::Car,
            VehicleTypeStats {
                total: 10,
                occupied: 4,
                available: 6,
            },
        );
        CrossDomainSnapshot {
            payments: Some(PaymentsSnapshot {
                transactions,
                total_amount: 0,
                last_updated: at(12),
            }),
            parking: Some(ParkingSnapshot {
                stats,
                last_updated: at(12),
            }),
            performance: None,
        }
    }

    fn range() -> DateRange {
        DateRange::new(at(1), at(1) + Duration::hours(23))
    }

    #[test]
    fn test_daily_summary_filters_range() {
        let ReportBody::DailySummary(daily) = gather(ReportKind::DailySummary, &snapshot(), &range())
        else {
            panic!("wrong body");
        };
        assert_eq!(daily.total_transactions, 4);
        assert_eq!(daily.completed_transactions, 2);
        assert_eq!(daily.total_revenue, 3300);
        assert_eq!(daily.occupied_spaces, 4);
        assert!(daily.avg_response_ms.is_none());
    }

    #[test]
    fn test_payment_summary_splits_refunds() {
        let ReportBody::PaymentReport(payments) =
            gather(ReportKind::PaymentReport, &snapshot(), &range())
        else {
            panic!("wrong body");
        };
        assert_eq!(payments.total_payments, 3);
        assert_eq!(payments.failed, 1);
        assert_eq!(payments.refunds, 1);
        assert_eq!(payments.refunded_amount, 2200);
        assert_eq!(payments.by_method["card"], MethodTotals { count: 1, amount: 2200 });
    }

    #[test]
    fn test_revenue_by_hour_and_net() {
        let ReportBody::RevenueReport(revenue) =
            gather(ReportKind::RevenueReport, &snapshot(), &range())
        else {
            panic!("wrong body");
        };
        assert_eq!(revenue.gross_revenue, 3300);
        assert_eq!(revenue.net_revenue, 1100);
        assert_eq!(revenue.by_hour.get(&9), Some(&3300));
        assert!(!revenue.by_hour.contains_key(&0));
    }

    #[test]
    fn test_empty_snapshot_reads_as_zero() {
        let body = gather(
            ReportKind::OccupancyReport,
            &CrossDomainSnapshot::default(),
            &range(),
        );
        assert_eq!(body, ReportBody::OccupancyReport(OccupancySummary::default()));
        assert_eq!(body.kind(), ReportKind::OccupancyReport);
        assert!(body.rows().iter().any(|(k, v)| k == "total_spaces" && v == "0"));
    }
}
