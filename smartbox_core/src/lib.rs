#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! SmartBox reorder-inference engine (collaborator-agnostic).
//!
//! Turns periodic fill-level telemetry from dispensing boxes into stock
//! state, predictive reorder decisions, offline/anomaly alerts, and
//! holiday-aware consumption estimates. Persistence, notification dispatch,
//! and tier lookup are external collaborators behind the `smartbox_traits`
//! traits; this crate is invoked in-process and defines no wire protocol.
//!
//! ## Architecture
//!
//! - **Ingest**: validated telemetry append + monotonic cache advance (`ingest`)
//! - **Estimation**: learning/steady-state consumption rates with holiday
//!   excision and refill segmentation (`estimator`, `holiday`)
//! - **Decisioning**: threshold and predictive reorder triggers (`decision`)
//! - **Detection**: offline transitions and reading anomalies (`detector`)
//! - **Ledger**: deduplicated alerts and shipment triggers with lifecycle
//!   transitions (`ledger`)
//! - **Sweep**: bounded worker pool over all active boxes (`sweep`)
//!
//! Per-box evaluation is serialized through an in-flight registry; boxes are
//! independent and evaluate in parallel.

pub mod config;
pub mod decision;
pub mod detector;
pub mod engine;
pub mod error;
pub mod estimator;
pub mod holiday;
pub mod ingest;
pub mod ledger;
mod locks;
pub mod mocks;
pub mod sweep;

pub use config::{DecisionCfg, DetectorCfg, EngineCfg, EstimatorCfg, SweepCfg};
pub use decision::{Evaluation, SkipReason};
pub use engine::{EngineBuilder, SmartBoxEngine};
pub use error::{BuildError, EngineError, Result};
pub use estimator::{Confidence, ConsumptionEstimate, EstimateMode};
pub use sweep::SweepReport;

// Re-export the boundary crate so hosts depend on one name.
pub use smartbox_traits::{Notifier, Store, TierLookup, clock, model};
