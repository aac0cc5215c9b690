//! Error types for configuration set processing.
//!
//! Failures are split into three classes: structural set errors and per-unit
//! runtime errors are recorded as [`ErrorCode`] tags on the affected units
//! and on the set result, while fatal process-level errors ([`ApplyError`])
//! unwind the whole apply call.

use crate::types::{ResultInformation, ResultSource};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable numeric tags for unit and set failures.
///
/// The numeric values are part of the crate's contract; external systems may
/// persist or compare them. Codes produced by external unit processors travel
/// as [`ErrorCode::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Two units claim the same case-folded identifier
    DuplicateIdentifier,
    /// A dependency names an identifier no unit provides
    MissingDependency,
    /// The dependency graph contains a cycle
    DependencyCycle,
    /// An assert unit found the host out of the expected state
    AssertionFailed,
    /// A dependency did not complete successfully
    DependencyUnsatisfied,
    /// At least one apply unit failed
    SetApplyFailed,
    /// The user requested this unit be skipped
    ManuallySkipped,
    /// A failure with no more specific classification
    Unexpected,
    /// A code supplied by an external unit processor
    Other(u32),
}

impl ErrorCode {
    /// The stable numeric tag for this code.
    pub fn value(self) -> u32 {
        match self {
            Self::DuplicateIdentifier => 0x0101,
            Self::MissingDependency => 0x0102,
            Self::DependencyCycle => 0x0103,
            Self::AssertionFailed => 0x0201,
            Self::DependencyUnsatisfied => 0x0202,
            Self::SetApplyFailed => 0x0203,
            Self::ManuallySkipped => 0x0204,
            Self::Unexpected => 0x02FF,
            Self::Other(value) => value,
        }
    }

    /// Short description suitable for user-facing messages.
    pub fn description(self) -> &'static str {
        match self {
            Self::DuplicateIdentifier => "duplicate unit identifier",
            Self::MissingDependency => "missing dependency",
            Self::DependencyCycle => "dependency cycle in configuration set",
            Self::AssertionFailed => "assertion failed",
            Self::DependencyUnsatisfied => "dependency not satisfied",
            Self::SetApplyFailed => "configuration set apply failed",
            Self::ManuallySkipped => "skipped by user request",
            Self::Unexpected => "unexpected failure",
            Self::Other(_) => "unit processor failure",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:04X})", self.description(), self.value())
    }
}

/// Fatal, process-level failure that unwinds the apply call.
///
/// Per-unit failures never surface here; they are captured into the unit's
/// [`ResultInformation`] instead.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// Cancellation was requested through the [`CancellationToken`]
    ///
    /// [`CancellationToken`]: crate::context::CancellationToken
    #[error("configuration set processing was cancelled")]
    Cancelled,
}

/// A typed fault a unit processor or factory can return through `anyhow`.
///
/// When a collaborator call fails with an error chain containing a
/// `ProcessorError`, the engine preserves its code, source, and details on
/// the affected unit. Untyped errors are recorded as
/// [`ErrorCode::Unexpected`] from [`ResultSource::Internal`].
#[derive(Debug, Clone)]
pub struct ProcessorError {
    pub code: ErrorCode,
    pub source: ResultSource,
    pub details: String,
}

impl fmt::Display for ProcessorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.details)
    }
}

impl std::error::Error for ProcessorError {}

impl ProcessorError {
    pub fn new(code: ErrorCode, source: ResultSource, details: impl Into<String>) -> Self {
        Self {
            code,
            source,
            details: details.into(),
        }
    }
}

/// Convert a captured collaborator fault into per-unit result information.
pub fn result_information_from_error(error: &anyhow::Error) -> ResultInformation {
    if let Some(fault) = error.downcast_ref::<ProcessorError>() {
        ResultInformation {
            code: Some(fault.code),
            source: fault.source,
            details: fault.details.clone(),
        }
    } else {
        ResultInformation {
            code: Some(ErrorCode::Unexpected),
            source: ResultSource::Internal,
            details: format!("{error:#}"),
        }
    }
}
