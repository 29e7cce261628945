//! # Call Router
//!
//! The gated cross-subsystem surface. Each call validates the caller's
//! session for its scope before the target subsystem sees it.
//!
//! | Call | Scope | Permission |
//! |------|-------|------------|
//! | `initiate_payment` | payment | |
//! | `refund_payment` | payment | `payment:refund` |
//! | `assign_space`, `release_space`, `reserve_space`, `confirm_exit` | parking | |
//! | `generate_report`, `schedule_report` | reporting | |

use std::sync::Arc;
use std::time::Duration;

use pk_01_resource_manager::ResourceManagerApi;
use pk_02_transaction_processor::TransactionProcessorApi;
use pk_05_report_aggregator::{DateRange, Report, ReportAggregatorApi, ReportSchedule};
use shared_types::{
    Amount, GateId, ParkingSpace, PaymentTransaction, ReportFormat, ReportKind, Scope, VehicleType,
};
use tracing::info;

use crate::errors::CoordinationError;
use crate::wiring::payment_parking::PaymentParkingCoordinator;
use crate::wiring::security_gate::SecurityGate;

pub const REFUND_PERMISSION: &str = "payment:refund";

pub struct CallRouter {
    gate: SecurityGate,
    resources: Arc<dyn ResourceManagerApi>,
    payments: Arc<dyn TransactionProcessorApi>,
    reports: Arc<dyn ReportAggregatorApi>,
    coordinator: Arc<PaymentParkingCoordinator>,
}

impl CallRouter {
    pub fn new(
        gate: SecurityGate,
        resources: Arc<dyn ResourceManagerApi>,
        payments: Arc<dyn TransactionProcessorApi>,
        reports: Arc<dyn ReportAggregatorApi>,
        coordinator: Arc<PaymentParkingCoordinator>,
    ) -> Self {
        Self {
            gate,
            resources,
            payments,
            reports,
            coordinator,
        }
    }

    /// Charges for the vehicle in `space_id`. The session's username is
    /// recorded as the operator.
    pub async fn initiate_payment(
        &self,
        token: &str,
        space_id: &str,
        amount: Amount,
        method_id: &str,
    ) -> Result<PaymentTransaction, CoordinationError> {
        let session = self.gate.authorize(token, Scope::Payment).await?;
        info!(%space_id, amount, method_id, operator = %session.username, "[router] initiate_payment");
        self.coordinator
            .initiate_payment(space_id, amount, method_id, &session.username)
            .await
    }

    pub async fn refund_payment(
        &self,
        token: &str,
        tx_id: &str,
        reason: Option<String>,
    ) -> Result<PaymentTransaction, CoordinationError> {
        let session = self
            .gate
            .authorize_for(token, Scope::Payment, REFUND_PERMISSION)
            .await?;
        Ok(self
            .payments
            .refund_payment(tx_id, &session.username, reason)
            .await?)
    }

    pub async fn assign_space(
        &self,
        token: &str,
        plate: &str,
        vehicle_type: VehicleType,
        ticket_ref: Option<String>,
    ) -> Result<ParkingSpace, CoordinationError> {
        self.gate.authorize(token, Scope::Parking).await?;
        Ok(self
            .resources
            .assign_space(plate, vehicle_type, ticket_ref)
            .await?)
    }

    pub async fn release_space(
        &self,
        token: &str,
        plate: &str,
    ) -> Result<ParkingSpace, CoordinationError> {
        self.gate.authorize(token, Scope::Parking).await?;
        Ok(self.resources.release_space(plate).await?)
    }

    pub async fn reserve_space(
        &self,
        token: &str,
        space_id: &str,
        duration: Duration,
    ) -> Result<ParkingSpace, CoordinationError> {
        self.gate.authorize(token, Scope::Parking).await?;
        Ok(self.resources.reserve_space(space_id, duration).await?)
    }

    pub async fn confirm_exit(
        &self,
        token: &str,
        space_id: &str,
    ) -> Result<GateId, CoordinationError> {
        self.gate.authorize(token, Scope::Parking).await?;
        self.coordinator.confirm_exit(space_id).await
    }

    pub async fn generate_report(
        &self,
        token: &str,
        template_id: &str,
        range: DateRange,
        format: ReportFormat,
    ) -> Result<Report, CoordinationError> {
        self.gate.authorize(token, Scope::Reporting).await?;
        Ok(self
            .reports
            .generate_report(template_id, range, format)
            .await?)
    }

    pub async fn schedule_report(
        &self,
        token: &str,
        kind: ReportKind,
        schedule: &str,
        recipients: Vec<String>,
    ) -> Result<ReportSchedule, CoordinationError> {
        self.gate.authorize(token, Scope::Reporting).await?;
        Ok(self
            .reports
            .schedule_report(kind, schedule, recipients)
            .await?)
    }
}
