//! Collaborator traits for the apply engine
//!
//! These traits let the engine run against any realization of unit
//! processing without depending on specific resource implementations,
//! transports, or UI frameworks.

use crate::error::ApplyError;
use crate::types::{ApplyOutcome, ConfigUnit, GetOutcome, TestOutcome};
use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// External capability that realizes test/get/apply for one unit
///
/// Calls may block arbitrarily; the engine holds no locks across them.
/// Failures can be reported two ways: in-band through the outcome's
/// `ResultInformation`, or by returning an error (ideally carrying a
/// [`ProcessorError`] so the code and source survive extraction).
///
/// [`ProcessorError`]: crate::error::ProcessorError
pub trait UnitProcessor {
    /// Check whether the host already matches the unit's desired state
    fn test_settings(&mut self) -> Result<TestOutcome>;

    /// Retrieve the unit's current settings from the host
    fn get_settings(&mut self) -> Result<GetOutcome>;

    /// Drive the host to the unit's desired state
    fn apply_settings(&mut self) -> Result<ApplyOutcome>;
}

/// Factory that produces a [`UnitProcessor`] for each unit in a set
pub trait SetProcessor {
    /// Create the processor for one unit
    ///
    /// May fail, for example when the unit's type is unknown or its
    /// settings payload is malformed; the failure is recorded on that unit.
    fn create_unit_processor(&self, unit: &ConfigUnit) -> Result<Box<dyn UnitProcessor>>;
}

/// Cooperative cancellation flag shared between the caller and the engine
///
/// Cloning yields a handle to the same flag. The engine checks it at safe
/// points and unwinds with [`ApplyError::Cancelled`] once it is set.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; safe to call from another thread
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn bail_if_cancelled(&self) -> Result<(), ApplyError> {
        if self.is_cancelled() {
            Err(ApplyError::Cancelled)
        } else {
            Ok(())
        }
    }
}
