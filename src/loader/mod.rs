//! dbt → graph loader.
//!
//! ## Modules
//!
//! - [`schema`] — Graph reset and constraint/index installation
//! - [`materialize`] — Per-kind node materializers
//! - [`wiring`] — The five relationship wirers
//! - [`runner`] — `DbtGraphLoader`, the load orchestrator
//! - [`stats`] — Post-load statistics reporting

pub mod error;
pub mod materialize;
pub mod runner;
pub mod schema;
pub mod stats;
pub mod wiring;

pub use error::{LoadError, LoadPhase};
pub use runner::{DbtGraphLoader, LoadOptions, LoadSummary};
pub use wiring::{WireCount, Wirer};
