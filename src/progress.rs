//! Streaming progress events for set processing
//!
//! The engine reports state changes through a caller-supplied sink. Sink
//! failures are swallowed and logged; they never affect unit outcomes or
//! the aggregated result.

use crate::planner::UnitInfo;
use crate::types::{ApplySetResult, ConfigUnit, ResultInformation, SetState, UnitState};
use serde::{Deserialize, Serialize};

/// A state change observed while processing a set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChangeEvent {
    /// The set as a whole changed state
    Set { state: SetState },
    /// One unit changed state; `result` is a snapshot taken at emission
    Unit {
        state: UnitState,
        unit: ConfigUnit,
        result: ResultInformation,
    },
}

/// Receiver for progress events and the final result
pub trait ProgressSink {
    /// Observe one state change
    fn progress(&mut self, event: ChangeEvent) -> anyhow::Result<()>;

    /// Receive the aggregated result once processing completes normally
    fn result(&mut self, result: &ApplySetResult) -> anyhow::Result<()>;
}

/// No-op progress sink
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn progress(&mut self, _event: ChangeEvent) -> anyhow::Result<()> {
        Ok(())
    }

    fn result(&mut self, _result: &ApplySetResult) -> anyhow::Result<()> {
        Ok(())
    }
}

pub(crate) fn send_set_progress(sink: &mut dyn ProgressSink, state: SetState) {
    if let Err(error) = sink.progress(ChangeEvent::Set { state }) {
        tracing::warn!(?state, %error, "progress sink rejected set event");
    }
}

/// Record the new state on the unit, then emit the event.
///
/// The recorded state must match what observers saw, so the mutation comes
/// first and sink failures do not roll it back.
pub(crate) fn send_unit_progress(
    sink: &mut dyn ProgressSink,
    unit: &mut UnitInfo<'_>,
    state: UnitState,
) {
    unit.state = state;
    let event = ChangeEvent::Unit {
        state,
        unit: unit.unit.clone(),
        result: unit.result_information.clone(),
    };
    if let Err(error) = sink.progress(event) {
        tracing::warn!(?state, %error, "progress sink rejected unit event");
    }
}

pub(crate) fn send_unit_progress_if_not_complete(
    sink: &mut dyn ProgressSink,
    unit: &mut UnitInfo<'_>,
    state: UnitState,
) {
    if unit.state != UnitState::Completed {
        send_unit_progress(sink, unit, state);
    }
}

pub(crate) fn send_result(sink: &mut dyn ProgressSink, result: &ApplySetResult) {
    if let Err(error) = sink.result(result) {
        tracing::warn!(%error, "progress sink rejected final result");
    }
}
