//! Apply engine - validates a set, then drives it through the intent phases
//!
//! Processing runs in two passes. Preprocessing validates identifiers,
//! resolves dependencies, and proves the dependency graph schedulable. The
//! real pass then drains the units phase by phase, driving each one through
//! its external unit processor and reporting progress throughout. The whole
//! engine is single-threaded and synchronous; only the external processor
//! calls may block.

use crate::context::{CancellationToken, SetProcessor, UnitProcessor};
use crate::error::{ApplyError, ErrorCode, result_information_from_error};
use crate::planner::{self, UnitInfo};
use crate::progress::{self, NoProgress, ProgressSink};
use crate::scheduler::{self, PhaseDriver, PhaseOutcome};
use crate::telemetry::{self, NoTelemetry, TelemetrySink, UnitAction};
use crate::types::{
    ApplySetResult, ApplyUnitResult, ConfigSet, Intent, ResultInformation, ResultSource, SetState,
    TestResult, UnitState,
};

/// Apply a configuration set to the host.
///
/// The set is borrowed read-only; the factory produces one unit processor
/// per driven unit; the progress sink observes state changes and receives
/// the final result; the token allows cooperative cancellation.
///
/// A set whose validation or unit processing fails still completes
/// normally: the failure is recorded in the returned result. Only
/// cancellation unwinds with an error, after a telemetry summary is
/// recorded.
pub fn apply_set(
    set: &ConfigSet,
    factory: &dyn SetProcessor,
    progress: &mut dyn ProgressSink,
    telemetry: &dyn TelemetrySink,
    token: &CancellationToken,
) -> Result<ApplySetResult, ApplyError> {
    let mut units: Vec<UnitInfo<'_>> = set.units.iter().map(UnitInfo::new).collect();
    let mut latched: Option<ErrorCode> = None;

    match process(set, &mut units, &mut latched, factory, progress, telemetry, token) {
        Ok(()) => {
            let result = aggregate(latched, &units);
            telemetry.log_processing_summary_for_apply(set, &result, &telemetry::summarize_all(&units));
            progress::send_result(progress, &result);
            Ok(result)
        }
        Err(error) => {
            telemetry.log_processing_summary(
                set,
                &error,
                ResultSource::Internal,
                &telemetry::summarize_all(&units),
            );
            Err(error)
        }
    }
}

/// Apply a set without progress reporting or telemetry.
pub fn apply_set_simple(
    set: &ConfigSet,
    factory: &dyn SetProcessor,
) -> Result<ApplySetResult, ApplyError> {
    apply_set(
        set,
        factory,
        &mut NoProgress,
        &NoTelemetry,
        &CancellationToken::new(),
    )
}

fn process(
    set: &ConfigSet,
    units: &mut [UnitInfo<'_>],
    latched: &mut Option<ErrorCode>,
    factory: &dyn SetProcessor,
    progress: &mut dyn ProgressSink,
    telemetry: &dyn TelemetrySink,
    token: &CancellationToken,
) -> Result<(), ApplyError> {
    if let Some(code) = planner::preprocess(units, progress) {
        latch_result_code(latched, code);
    } else {
        // TODO: send Pending when blocked by another configuration run
        progress::send_set_progress(progress, SetState::InProgress);

        let mut driver = UnitDriver {
            set_instance: &set.instance_identifier,
            factory,
            progress,
            telemetry,
            token,
        };
        let outcome = scheduler::drain_phases(units, has_processed_successfully, &mut driver)?;
        if let PhaseOutcome::Halted { latch } = outcome {
            latch_result_code(latched, latch);
        }
    }

    progress::send_set_progress(progress, SetState::Completed);
    Ok(())
}

/// Dependency predicate for the real pass: the target must have run and
/// ended successfully. A failed or manually skipped dependency blocks its
/// dependents.
fn has_processed_successfully(unit: &UnitInfo<'_>) -> bool {
    unit.processed && unit.result_information.is_success()
}

/// Record the set-level code once; the first failure class wins.
fn latch_result_code(slot: &mut Option<ErrorCode>, code: ErrorCode) {
    if slot.is_none() {
        *slot = Some(code);
    }
}

fn aggregate(result_code: Option<ErrorCode>, units: &[UnitInfo<'_>]) -> ApplySetResult {
    ApplySetResult {
        result_code,
        unit_results: units
            .iter()
            .map(|info| ApplyUnitResult {
                unit: info.unit.clone(),
                state: info.state,
                result: info.result_information.clone(),
                previously_in_desired_state: info.previously_in_desired_state,
                reboot_required: info.reboot_required,
            })
            .collect(),
    }
}

/// The real per-unit driver
struct UnitDriver<'r> {
    set_instance: &'r str,
    factory: &'r dyn SetProcessor,
    progress: &'r mut dyn ProgressSink,
    telemetry: &'r dyn TelemetrySink,
    token: &'r CancellationToken,
}

impl PhaseDriver for UnitDriver<'_> {
    fn drive(&mut self, units: &mut [UnitInfo<'_>], index: usize) -> Result<bool, ApplyError> {
        self.token.bail_if_cancelled()?;

        let unit = &mut units[index];
        // From here on the unit counts as processed, so any failure below
        // is attributed to it.
        unit.processed = true;

        if !unit.unit.should_apply {
            // The failure code keeps dependents from running; the unit
            // itself still counts as processed successfully enough not to
            // halt its phase.
            unit.result_information = ResultInformation::failure(
                ErrorCode::ManuallySkipped,
                ResultSource::Precondition,
            );
            progress::send_unit_progress(self.progress, unit, UnitState::Skipped);
            return Ok(true);
        }

        progress::send_unit_progress(self.progress, unit, UnitState::InProgress);
        let outcome = self.run_unit(unit);
        // Terminal event on every exit path, the cancellation unwind
        // included.
        progress::send_unit_progress(self.progress, unit, UnitState::Completed);
        outcome
    }

    fn skip(&mut self, units: &mut [UnitInfo<'_>], index: usize, code: ErrorCode) {
        units[index].result_information =
            ResultInformation::failure(code, ResultSource::Precondition);
        progress::send_unit_progress(self.progress, &mut units[index], UnitState::Skipped);
    }
}

impl UnitDriver<'_> {
    fn run_unit(&mut self, unit: &mut UnitInfo<'_>) -> Result<bool, ApplyError> {
        let mut processor = match self.factory.create_unit_processor(unit.unit) {
            Ok(processor) => processor,
            Err(error) => {
                unit.result_information = result_information_from_error(&error);
                return Ok(false);
            }
        };

        // Creating the processor can take a while; check again before
        // calling into it.
        self.token.bail_if_cancelled()?;

        let mut action = UnitAction::Test;
        let succeeded = match unit.unit.intent {
            Intent::Assert => Self::assert_unit(unit, processor.as_mut()),
            Intent::Inform => {
                action = UnitAction::Get;
                Self::inform_unit(unit, processor.as_mut())
            }
            Intent::Apply => self.apply_unit(unit, processor.as_mut(), &mut action)?,
        };

        self.telemetry
            .log_unit_run(self.set_instance, unit.unit, action, &unit.result_information);
        Ok(succeeded)
    }

    fn assert_unit(unit: &mut UnitInfo<'_>, processor: &mut dyn UnitProcessor) -> bool {
        match processor.test_settings() {
            Ok(outcome) => match outcome.result {
                TestResult::Positive => true,
                TestResult::Negative => {
                    unit.result_information = ResultInformation::failure(
                        ErrorCode::AssertionFailed,
                        ResultSource::Precondition,
                    );
                    false
                }
                TestResult::Failed => {
                    unit.result_information = outcome.info;
                    false
                }
                TestResult::NotRun => {
                    unit.result_information = ResultInformation::failure(
                        ErrorCode::Unexpected,
                        ResultSource::Internal,
                    );
                    false
                }
            },
            Err(error) => {
                unit.result_information = result_information_from_error(&error);
                false
            }
        }
    }

    fn inform_unit(unit: &mut UnitInfo<'_>, processor: &mut dyn UnitProcessor) -> bool {
        // The retrieved settings are discarded; the call is made to force
        // materialization and surface errors.
        match processor.get_settings() {
            Ok(outcome) => {
                if outcome.info.is_success() {
                    true
                } else {
                    unit.result_information = outcome.info;
                    false
                }
            }
            Err(error) => {
                unit.result_information = result_information_from_error(&error);
                false
            }
        }
    }

    fn apply_unit(
        &self,
        unit: &mut UnitInfo<'_>,
        processor: &mut dyn UnitProcessor,
        action: &mut UnitAction,
    ) -> Result<bool, ApplyError> {
        match processor.test_settings() {
            Ok(outcome) => match outcome.result {
                TestResult::Positive => {
                    unit.previously_in_desired_state = true;
                    Ok(true)
                }
                TestResult::Negative => {
                    // Testing may have taken a while; check before moving
                    // on to the actual apply.
                    self.token.bail_if_cancelled()?;

                    *action = UnitAction::Apply;
                    match processor.apply_settings() {
                        Ok(applied) => {
                            if applied.info.is_success() {
                                unit.reboot_required = applied.reboot_required;
                                Ok(true)
                            } else {
                                unit.result_information = applied.info;
                                Ok(false)
                            }
                        }
                        Err(error) => {
                            unit.result_information = result_information_from_error(&error);
                            Ok(false)
                        }
                    }
                }
                TestResult::Failed => {
                    unit.result_information = outcome.info;
                    Ok(false)
                }
                TestResult::NotRun => {
                    unit.result_information = ResultInformation::failure(
                        ErrorCode::Unexpected,
                        ResultSource::Internal,
                    );
                    Ok(false)
                }
            },
            Err(error) => {
                unit.result_information = result_information_from_error(&error);
                Ok(false)
            }
        }
    }
}
