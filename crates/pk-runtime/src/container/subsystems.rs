//! # Subsystem Container
//!
//! Holds all subsystem instances and the shared infrastructure they were
//! built with.
//!
//! ## Initialization Order
//!
//! ```text
//! Phase 1: event bus, clock
//! Phase 2: Resource Manager (1), Access Controller (3)
//! Phase 3: Transaction Processor (2), Telemetry Cache (4)
//! Phase 4: Report Aggregator (5), reading through the cross-domain view
//! ```
//!
//! ## Thread Safety
//!
//! Every service guards its own tables and is shared through `Arc`. The
//! container itself is immutable after construction.

use std::sync::Arc;

use pk_01_resource_manager::ResourceManagerService;
use pk_02_transaction_processor::{PaymentGateway, SimulatedGateway, TransactionProcessorService};
use pk_03_access_controller::AccessControllerService;
use pk_04_telemetry_cache::{
    ConnectionPool, HostProbe, LoopbackConnection, LoopbackFactory, SystemProbe,
    TelemetryCacheService,
};
use pk_05_report_aggregator::{ReportAggregatorService, TextRenderer};
use shared_bus::{EventPublisher, InMemoryEventBus};
use shared_types::{SystemTimeSource, TimeSource};
use tracing::{info, instrument};

use crate::container::config::SystemConfig;
use crate::wiring::ViewDataSource;

/// Replaceable outer edges: clock, payment gateway and host probe.
#[derive(Clone)]
pub struct Infrastructure {
    pub clock: Arc<dyn TimeSource>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub probe: Arc<dyn SystemProbe>,
}

impl Infrastructure {
    /// System clock, simulated settlement latency, `/proc` readings.
    pub fn production() -> Self {
        Self {
            clock: Arc::new(SystemTimeSource),
            gateway: Arc::new(SimulatedGateway::new()),
            probe: Arc::new(HostProbe),
        }
    }
}

/// Central container holding all subsystem instances.
pub struct SubsystemContainer {
    /// Resource Manager (Subsystem 1)
    pub resources: Arc<ResourceManagerService>,

    /// Transaction Processor (Subsystem 2)
    pub payments: Arc<TransactionProcessorService>,

    /// Access Controller (Subsystem 3)
    pub access: Arc<AccessControllerService>,

    /// Telemetry Cache (Subsystem 4), owner of the cross-domain view.
    pub telemetry: Arc<TelemetryCacheService>,

    /// Report Aggregator (Subsystem 5)
    pub reports: Arc<ReportAggregatorService>,

    /// All subsystem events flow through this bus.
    pub event_bus: Arc<InMemoryEventBus>,

    pub clock: Arc<dyn TimeSource>,

    /// Immutable after initialization.
    pub config: SystemConfig,
}

impl SubsystemContainer {
    /// Container over production infrastructure.
    pub fn new(config: SystemConfig) -> Self {
        Self::with_infrastructure(config, Infrastructure::production())
    }

    #[instrument(name = "subsystem_init", skip_all)]
    pub fn with_infrastructure(config: SystemConfig, infra: Infrastructure) -> Self {
        info!("Initializing parking subsystem container");

        info!("Phase 1: Creating shared infrastructure");
        let event_bus = Arc::new(InMemoryEventBus::new());
        let publisher: Arc<dyn EventPublisher> = event_bus.clone();
        let clock = infra.clock;

        info!("Phase 2: Initializing independent subsystems");
        let resources = ResourceManagerService::in_memory(publisher.clone(), clock.clone());
        info!("  [pk-01] Resource Manager initialized");
        let access = Arc::new(AccessControllerService::new(
            config.security.access.clone(),
            publisher.clone(),
            clock.clone(),
        ));
        info!("  [pk-03] Access Controller initialized");

        info!("Phase 3: Initializing payment and telemetry subsystems");
        let payments = Arc::new(TransactionProcessorService::new(
            config.payment.clone(),
            infra.gateway,
            publisher.clone(),
            clock.clone(),
        ));
        info!(
            methods = config.payment.methods.len(),
            tax_rate_bps = config.payment.tax_rate_bps,
            "  [pk-02] Transaction Processor initialized"
        );
        let pool: ConnectionPool<LoopbackConnection> = ConnectionPool::new(
            &config.telemetry.pool,
            config.telemetry.sample_capacity,
            Arc::new(LoopbackFactory::default()),
        );
        let telemetry = Arc::new(TelemetryCacheService::new(
            config.telemetry.clone(),
            pool,
            infra.probe,
            publisher.clone(),
            clock.clone(),
        ));
        info!(
            pool_size = config.telemetry.pool.size,
            "  [pk-04] Telemetry Cache initialized"
        );

        info!("Phase 4: Initializing reporting");
        let data_source = Arc::new(ViewDataSource::new(payments.clone(), telemetry.clone()));
        let reports = Arc::new(ReportAggregatorService::new(
            data_source,
            Arc::new(TextRenderer),
            publisher,
            clock.clone(),
        ));
        info!("  [pk-05] Report Aggregator initialized");

        Self {
            resources,
            payments,
            access,
            telemetry,
            reports,
            event_bus,
            clock,
            config,
        }
    }
}
