//! Core types for configuration set processing

use crate::error::ErrorCode;
use serde::{Deserialize, Serialize};

/// What a configuration unit asks of the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intent {
    /// Check a predicate about host state without changing it
    Assert,
    /// Retrieve host state, surfacing any retrieval errors
    Inform,
    /// Drive the host toward the declared state
    Apply,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Assert => "assert",
            Self::Inform => "inform",
            Self::Apply => "apply",
        }
    }
}

/// Processing state of the whole set
///
/// `Pending` is reserved for a future orchestrator that can queue a set
/// behind another run; the engine never emits it today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetState {
    Pending,
    InProgress,
    Completed,
}

/// Processing state of a single unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitState {
    Pending,
    InProgress,
    Completed,
    Skipped,
}

impl UnitState {
    /// Whether the unit has reached a terminal state
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Skipped)
    }
}

/// Outcome of testing whether a unit is in its desired state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestResult {
    /// Host already matches the desired state
    Positive,
    /// Host differs from the desired state
    Negative,
    /// The test itself failed to run
    Failed,
    /// The test was not executed
    NotRun,
}

/// Which layer produced a unit's result information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResultSource {
    /// No failure recorded
    #[default]
    None,
    /// The engine itself
    Internal,
    /// Validation of the configuration set content
    ConfigurationSet,
    /// A precondition (assertion, dependency, manual skip)
    Precondition,
    /// The external unit processor
    UnitProcessing,
}

/// A single declaration in a configuration set
///
/// The `settings` payload is opaque to the engine; only the external unit
/// processor interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigUnit {
    /// Optional name other units can depend on; empty means this unit
    /// cannot be a dependency target. Compared case-insensitively.
    pub identifier: String,
    /// External resource kind realized by the unit processor
    pub unit_type: String,
    pub intent: Intent,
    /// Identifiers of units that must complete successfully first
    pub dependencies: Vec<String>,
    /// False when the user asked for this unit to be skipped
    pub should_apply: bool,
    pub settings: serde_json::Value,
}

impl ConfigUnit {
    pub fn new(unit_type: impl Into<String>, intent: Intent) -> Self {
        Self {
            identifier: String::new(),
            unit_type: unit_type.into(),
            intent,
            dependencies: Vec::new(),
            should_apply: true,
            settings: serde_json::Value::Null,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_should_apply(mut self, should_apply: bool) -> Self {
        self.should_apply = should_apply;
        self
    }

    pub fn with_settings(mut self, settings: serde_json::Value) -> Self {
        self.settings = settings;
        self
    }
}

/// An ordered collection of units applied as one unit of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSet {
    pub instance_identifier: String,
    /// True when the set was reloaded from a previous run's record
    pub from_history: bool,
    pub units: Vec<ConfigUnit>,
}

impl ConfigSet {
    pub fn new(instance_identifier: impl Into<String>) -> Self {
        Self {
            instance_identifier: instance_identifier.into(),
            from_history: false,
            units: Vec::new(),
        }
    }

    pub fn with_units(mut self, units: Vec<ConfigUnit>) -> Self {
        self.units = units;
        self
    }
}

/// How a unit's processing ended: an error code and where it came from
///
/// `code == None` means success.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultInformation {
    pub code: Option<ErrorCode>,
    pub source: ResultSource,
    /// Free-form diagnostic text
    pub details: String,
}

impl ResultInformation {
    pub fn success() -> Self {
        Self::default()
    }

    pub fn failure(code: ErrorCode, source: ResultSource) -> Self {
        Self {
            code: Some(code),
            source,
            details: String::new(),
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }

    pub fn is_success(&self) -> bool {
        self.code.is_none()
    }
}

/// Result of a unit processor's test call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub result: TestResult,
    pub info: ResultInformation,
}

impl TestOutcome {
    pub fn positive() -> Self {
        Self {
            result: TestResult::Positive,
            info: ResultInformation::success(),
        }
    }

    pub fn negative() -> Self {
        Self {
            result: TestResult::Negative,
            info: ResultInformation::success(),
        }
    }

    pub fn failed(info: ResultInformation) -> Self {
        Self {
            result: TestResult::Failed,
            info,
        }
    }
}

/// Result of a unit processor's get call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetOutcome {
    /// Settings as materialized by the processor; the engine discards them
    pub settings: serde_json::Value,
    pub info: ResultInformation,
}

impl GetOutcome {
    pub fn success(settings: serde_json::Value) -> Self {
        Self {
            settings,
            info: ResultInformation::success(),
        }
    }

    pub fn failed(info: ResultInformation) -> Self {
        Self {
            settings: serde_json::Value::Null,
            info,
        }
    }
}

/// Result of a unit processor's apply call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyOutcome {
    pub reboot_required: bool,
    pub info: ResultInformation,
}

impl ApplyOutcome {
    pub fn success() -> Self {
        Self {
            reboot_required: false,
            info: ResultInformation::success(),
        }
    }

    pub fn with_reboot_required(mut self, reboot_required: bool) -> Self {
        self.reboot_required = reboot_required;
        self
    }

    pub fn failed(info: ResultInformation) -> Self {
        Self {
            reboot_required: false,
            info,
        }
    }
}

/// Final record for one unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyUnitResult {
    pub unit: ConfigUnit,
    pub state: UnitState,
    pub result: ResultInformation,
    /// True when the host already matched the desired state and apply was
    /// skipped
    pub previously_in_desired_state: bool,
    pub reboot_required: bool,
}

/// Aggregated result for the whole set
///
/// Contains one entry per input unit in input order, regardless of how far
/// processing got.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplySetResult {
    /// First failure class latched during processing; `None` means success
    pub result_code: Option<ErrorCode>,
    pub unit_results: Vec<ApplyUnitResult>,
}

impl ApplySetResult {
    pub fn is_success(&self) -> bool {
        self.result_code.is_none()
    }

    /// Number of units whose own processing failed
    pub fn failed_units(&self) -> usize {
        self.unit_results
            .iter()
            .filter(|unit| !unit.result.is_success())
            .count()
    }
}
