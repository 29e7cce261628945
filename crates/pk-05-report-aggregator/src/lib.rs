//! # Report Aggregator Subsystem
//!
//! **Subsystem ID:** 5
//!
//! ## Purpose
//!
//! Turns the cross-domain snapshot (payments, occupancy, performance) into
//! rendered reports, on demand or on a schedule.
//!
//! ## Report Generation
//!
//! ```text
//! template_id ──► ReportTemplate ──► ReportDataSource::load(range)
//!                                            │
//!                                            ▼
//!                              gather(kind) ──► ReportBody
//!                                                  │
//!                                                  ▼
//!                              ReportRenderer::render(format) ──► Report
//!                                                                  │
//!                                        stored, ReportGenerated ◄─┘
//! ```
//!
//! Any failure along the way emits `ReportFailed` and is returned.
//!
//! ## Schedules
//!
//! | String | Due when (UTC) | Covers |
//! |--------|----------------|--------|
//! | `daily HH:mm`   | every day at HH:mm        | previous 24 hours |
//! | `weekly HH:mm`  | Sundays at HH:mm          | previous 7 days |
//! | `monthly HH:mm` | 1st of the month at HH:mm | previous month |
//!
//! A schedule runs at most once per matching minute. Scheduled reports are
//! rendered as PDF and announced with `ReportDelivered`.
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  adapters/text.rs   - TextRenderer (csv, excel, pdf)            │
//! │  adapters/memory.rs - InMemoryDataSource                        │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/inbound.rs  - ReportAggregatorApi trait                  │
//! │  ports/outbound.rs - ReportDataSource, ReportRenderer traits    │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  domain/gather.rs   - ReportBody per kind                       │
//! │  domain/schedule.rs - ScheduleSpec, ReportSchedule              │
//! │  domain/entities.rs - ReportTemplate, Report, DateRange         │
//! │  domain/errors.rs   - ReportError                               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![cfg_attr(not(test), warn(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::*;
pub use domain::*;
pub use ports::*;
pub use service::ReportAggregatorService;
