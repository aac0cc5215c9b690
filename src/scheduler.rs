//! Intent-phase scheduling
//!
//! Units are drained in the fixed phase order Assert, Inform, Apply, all
//! phases sharing one worklist. Within a phase the first ready unit in
//! worklist order runs next, which preserves the author's ordering among
//! independent units.

use crate::error::{ApplyError, ErrorCode};
use crate::planner::UnitInfo;
use crate::types::Intent;

/// One scheduling phase and the codes it assigns when it halts the run
pub(crate) struct PhasePlan {
    pub intent: Intent,
    /// Assigned to remaining units of later intents when this phase halts
    pub error_for_other_intents: ErrorCode,
    /// Latched on the set when a driver in this phase reports failure
    pub error_for_failures: ErrorCode,
}

/// The fixed phase order for one processing pass.
///
/// The Apply phase's other-intent code is a generic fatal: no intents
/// remain after Apply, so that sweep cannot mark anything today.
pub(crate) fn intent_phases() -> [PhasePlan; 3] {
    [
        PhasePlan {
            intent: Intent::Assert,
            error_for_other_intents: ErrorCode::AssertionFailed,
            error_for_failures: ErrorCode::AssertionFailed,
        },
        PhasePlan {
            intent: Intent::Inform,
            error_for_other_intents: ErrorCode::DependencyUnsatisfied,
            error_for_failures: ErrorCode::DependencyUnsatisfied,
        },
        PhasePlan {
            intent: Intent::Apply,
            error_for_other_intents: ErrorCode::Unexpected,
            error_for_failures: ErrorCode::SetApplyFailed,
        },
    ]
}

/// Per-unit effects invoked by the scheduler
///
/// The real run drives units through their external processors and emits
/// progress; the preprocessing dry run only flips bookkeeping flags. Both
/// are exercised by the same scheduling loop.
pub(crate) trait PhaseDriver {
    /// Run one unit; `Ok(false)` reports a per-unit failure
    fn drive(&mut self, units: &mut [UnitInfo<'_>], index: usize) -> Result<bool, ApplyError>;

    /// Mark one unit as skipped with the given code
    fn skip(&mut self, units: &mut [UnitInfo<'_>], index: usize, code: ErrorCode);
}

/// How a full three-phase pass ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PhaseOutcome {
    /// Every unit was driven
    Drained,
    /// A phase halted the pass; `latch` is the set-level code to record
    Halted { latch: ErrorCode },
}

/// Run all three intent phases over one shared worklist.
pub(crate) fn drain_phases<'a>(
    units: &mut [UnitInfo<'a>],
    dependency_satisfied: fn(&UnitInfo<'a>) -> bool,
    driver: &mut dyn PhaseDriver,
) -> Result<PhaseOutcome, ApplyError> {
    let mut worklist: Vec<usize> = (0..units.len()).collect();

    for phase in intent_phases() {
        if let Some(latch) =
            run_phase(units, &mut worklist, &phase, dependency_satisfied, driver)?
        {
            return Ok(PhaseOutcome::Halted { latch });
        }
    }

    Ok(PhaseOutcome::Drained)
}

/// Run one phase. Returns the set-level code to latch when the phase halts
/// the pass, or `None` to fall through to the next intent.
fn run_phase<'a>(
    units: &mut [UnitInfo<'a>],
    worklist: &mut Vec<usize>,
    phase: &PhasePlan,
    dependency_satisfied: fn(&UnitInfo<'a>) -> bool,
    driver: &mut dyn PhaseDriver,
) -> Result<Option<ErrorCode>, ApplyError> {
    // Progress loop: always run the first ready unit in worklist order.
    let mut has_failure = false;
    loop {
        let ready = worklist
            .iter()
            .position(|&index| is_ready(units, index, phase.intent, dependency_satisfied));
        let Some(position) = ready else {
            break;
        };
        let index = worklist.remove(position);
        if !driver.drive(units, index)? {
            has_failure = true;
        }
    }

    // Whatever is left with this intent is blocked on an unsatisfied
    // dependency.
    let mut has_remaining_dependencies = false;
    for &index in worklist.iter() {
        if units[index].unit.intent == phase.intent {
            has_remaining_dependencies = true;
            driver.skip(units, index, ErrorCode::DependencyUnsatisfied);
        }
    }

    // A failure or a blocked unit halts the pass; everything of a later
    // intent goes down with it.
    if has_failure || has_remaining_dependencies {
        for &index in worklist.iter() {
            if units[index].unit.intent != phase.intent {
                driver.skip(units, index, phase.error_for_other_intents);
            }
        }

        let latch = if has_failure {
            phase.error_for_failures
        } else {
            ErrorCode::DependencyUnsatisfied
        };
        return Ok(Some(latch));
    }

    Ok(None)
}

fn is_ready<'a>(
    units: &[UnitInfo<'a>],
    index: usize,
    intent: Intent,
    dependency_satisfied: fn(&UnitInfo<'a>) -> bool,
) -> bool {
    let unit = &units[index];
    unit.unit.intent == intent
        && unit
            .dependency_indices
            .iter()
            .all(|&dependency| dependency_satisfied(&units[dependency]))
}
