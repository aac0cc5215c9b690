//! Telemetry hooks for set processing
//!
//! The engine records one event per driven unit and a processing summary
//! per set, through a caller-supplied sink. [`TracingTelemetry`] forwards
//! everything to `tracing`; [`NoTelemetry`] discards it.

use crate::error::ApplyError;
use crate::planner::UnitInfo;
use crate::types::{ApplySetResult, ConfigSet, ConfigUnit, Intent, ResultInformation, ResultSource};
use serde::{Deserialize, Serialize};

/// Which processor call a unit run attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitAction {
    Test,
    Get,
    Apply,
}

impl UnitAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Get => "get",
            Self::Apply => "apply",
        }
    }
}

/// Processing counts for one intent within a set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentSummary {
    pub intent: Intent,
    /// Units declaring this intent
    pub count: usize,
    /// Units whose driver ran
    pub run: usize,
    /// Run units that ended in failure
    pub failed: usize,
}

pub(crate) fn summarize_intent(units: &[UnitInfo<'_>], intent: Intent) -> IntentSummary {
    let mut summary = IntentSummary {
        intent,
        count: 0,
        run: 0,
        failed: 0,
    };
    for unit in units {
        if unit.unit.intent != intent {
            continue;
        }
        summary.count += 1;
        if unit.processed {
            summary.run += 1;
            if !unit.result_information.is_success() {
                summary.failed += 1;
            }
        }
    }
    summary
}

pub(crate) fn summarize_all(units: &[UnitInfo<'_>]) -> [IntentSummary; 3] {
    [
        summarize_intent(units, Intent::Assert),
        summarize_intent(units, Intent::Inform),
        summarize_intent(units, Intent::Apply),
    ]
}

/// Receiver for processing telemetry
pub trait TelemetrySink {
    /// One unit was driven; `action` is the last processor call attempted
    fn log_unit_run(
        &self,
        set_instance: &str,
        unit: &ConfigUnit,
        action: UnitAction,
        info: &ResultInformation,
    );

    /// Processing completed normally (successfully or not)
    fn log_processing_summary_for_apply(
        &self,
        set: &ConfigSet,
        result: &ApplySetResult,
        summaries: &[IntentSummary; 3],
    );

    /// Processing unwound with a fatal error
    fn log_processing_summary(
        &self,
        set: &ConfigSet,
        error: &ApplyError,
        source: ResultSource,
        summaries: &[IntentSummary; 3],
    );
}

/// No-op telemetry sink
pub struct NoTelemetry;

impl TelemetrySink for NoTelemetry {
    fn log_unit_run(
        &self,
        _set_instance: &str,
        _unit: &ConfigUnit,
        _action: UnitAction,
        _info: &ResultInformation,
    ) {
    }

    fn log_processing_summary_for_apply(
        &self,
        _set: &ConfigSet,
        _result: &ApplySetResult,
        _summaries: &[IntentSummary; 3],
    ) {
    }

    fn log_processing_summary(
        &self,
        _set: &ConfigSet,
        _error: &ApplyError,
        _source: ResultSource,
        _summaries: &[IntentSummary; 3],
    ) {
    }
}

/// Telemetry sink that forwards everything to `tracing`
pub struct TracingTelemetry;

impl TelemetrySink for TracingTelemetry {
    fn log_unit_run(
        &self,
        set_instance: &str,
        unit: &ConfigUnit,
        action: UnitAction,
        info: &ResultInformation,
    ) {
        tracing::info!(
            set = %set_instance,
            unit_type = %unit.unit_type,
            identifier = %unit.identifier,
            intent = %unit.intent.as_str(),
            action = %action.as_str(),
            code = ?info.code,
            "configuration unit run"
        );
    }

    fn log_processing_summary_for_apply(
        &self,
        set: &ConfigSet,
        result: &ApplySetResult,
        summaries: &[IntentSummary; 3],
    ) {
        tracing::info!(
            set = %set.instance_identifier,
            from_history = set.from_history,
            result_code = ?result.result_code,
            assert_run = summaries[0].run,
            inform_run = summaries[1].run,
            apply_run = summaries[2].run,
            failed = result.failed_units(),
            "configuration set processed"
        );
    }

    fn log_processing_summary(
        &self,
        set: &ConfigSet,
        error: &ApplyError,
        source: ResultSource,
        summaries: &[IntentSummary; 3],
    ) {
        tracing::warn!(
            set = %set.instance_identifier,
            from_history = set.from_history,
            %error,
            ?source,
            assert_run = summaries[0].run,
            inform_run = summaries[1].run,
            apply_run = summaries[2].run,
            "configuration set processing aborted"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::types::ConfigUnit;

    #[test]
    fn summaries_count_per_intent() {
        let assert_unit = ConfigUnit::new("os", Intent::Assert);
        let apply_ok = ConfigUnit::new("file", Intent::Apply);
        let apply_failed = ConfigUnit::new("pkg", Intent::Apply);
        let apply_pending = ConfigUnit::new("svc", Intent::Apply);

        let mut units = vec![
            UnitInfo::new(&assert_unit),
            UnitInfo::new(&apply_ok),
            UnitInfo::new(&apply_failed),
            UnitInfo::new(&apply_pending),
        ];
        units[0].processed = true;
        units[1].processed = true;
        units[2].processed = true;
        units[2].result_information = ResultInformation::failure(
            ErrorCode::SetApplyFailed,
            ResultSource::UnitProcessing,
        );

        let apply = summarize_intent(&units, Intent::Apply);
        assert_eq!(apply.count, 3);
        assert_eq!(apply.run, 2);
        assert_eq!(apply.failed, 1);

        let inform = summarize_intent(&units, Intent::Inform);
        assert_eq!(inform.count, 0);
        assert_eq!(inform.run, 0);
    }
}
