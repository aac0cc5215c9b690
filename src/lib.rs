//! # confkit
//!
//! A dependency-aware apply engine for declarative configuration sets.
//!
//! A configuration set is an ordered collection of units, each declaring an
//! intent toward the host: assert a predicate, inform by reading state, or
//! apply a desired state. Units may depend on each other by identifier.
//! This crate validates a set, orders it, and drives every unit through an
//! external per-unit processor while streaming progress events and
//! aggregating a final result.
//!
//! ## Processing model
//!
//! - **Preprocessing** validates identifiers (case-insensitively), resolves
//!   dependencies to unit indices, and rejects dependency cycles before any
//!   processor is created.
//! - **Processing** drains the units in the fixed phase order Assert,
//!   Inform, Apply. Within a phase, the first ready unit in author order
//!   runs next. A failed phase skips everything that comes after it.
//! - Failures are recorded per unit; the set-level result code latches on
//!   the first failure class and is never overwritten.
//!
//! The engine is single-threaded and synchronous. Only the external unit
//! processor calls may block, and cancellation is checked cooperatively
//! around them.
//!
//! ## Example
//!
//! ```ignore
//! use confkit::{
//!     apply_set_simple, ConfigSet, ConfigUnit, Intent, SetProcessor, UnitProcessor,
//! };
//!
//! struct HostProcessor;
//!
//! impl SetProcessor for HostProcessor {
//!     fn create_unit_processor(
//!         &self,
//!         unit: &ConfigUnit,
//!     ) -> anyhow::Result<Box<dyn UnitProcessor>> {
//!         // Look up the processor for unit.unit_type...
//!         todo!()
//!     }
//! }
//!
//! let set = ConfigSet::new("dev-box").with_units(vec![
//!     ConfigUnit::new("osversion", Intent::Assert).with_identifier("os"),
//!     ConfigUnit::new("package", Intent::Apply)
//!         .with_identifier("git")
//!         .with_dependencies(["os"]),
//! ]);
//!
//! let result = apply_set_simple(&set, &HostProcessor)?;
//! assert!(result.is_success());
//! ```
//!
//! ## Collaborator traits
//!
//! The engine depends on its environment only through traits:
//!
//! - [`SetProcessor`] / [`UnitProcessor`]: realize test/get/apply for units
//! - [`ProgressSink`]: receives state-change events and the final result
//! - [`TelemetrySink`]: receives unit-run records and processing summaries
//! - [`CancellationToken`]: cooperative cancellation
//!
//! This keeps the crate free of dependencies on specific resource
//! implementations, transports, or UI frameworks.

pub mod context;
pub mod error;
pub mod executor;
mod planner;
pub mod progress;
mod scheduler;
pub mod telemetry;
pub mod types;

// Re-export main types at crate root
pub use context::{CancellationToken, SetProcessor, UnitProcessor};
pub use error::{ApplyError, ErrorCode, ProcessorError, result_information_from_error};
pub use executor::{apply_set, apply_set_simple};
pub use progress::{ChangeEvent, NoProgress, ProgressSink};
pub use telemetry::{IntentSummary, NoTelemetry, TelemetrySink, TracingTelemetry, UnitAction};
pub use types::{
    ApplyOutcome, ApplySetResult, ApplyUnitResult, ConfigSet, ConfigUnit, GetOutcome, Intent,
    ResultInformation, ResultSource, SetState, TestOutcome, TestResult, UnitState,
};
