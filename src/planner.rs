//! Set preprocessing: identifier table, dependency resolution, cycle check
//!
//! Preprocessing validates a set before any unit processor is created. It
//! runs three phases in order and stops at the first failing phase:
//! identifier uniqueness, dependency resolution, cycle detection. Every
//! violation found by a phase is annotated on the affected units before the
//! phase reports failure.

use crate::error::{ApplyError, ErrorCode};
use crate::progress::{self, ProgressSink};
use crate::scheduler::{self, PhaseDriver, PhaseOutcome};
use crate::types::{ConfigUnit, ResultInformation, ResultSource, UnitState};
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Per-unit bookkeeping for one processing pass
pub(crate) struct UnitInfo<'a> {
    pub unit: &'a ConfigUnit,
    /// Indices into the unit vector, resolved from declared dependencies
    pub dependency_indices: Vec<usize>,
    /// Set by the cycle-detection dry run
    pub preprocessed: bool,
    /// Set once the real driver begins work on the unit
    pub processed: bool,
    pub state: UnitState,
    pub result_information: ResultInformation,
    pub previously_in_desired_state: bool,
    pub reboot_required: bool,
}

impl<'a> UnitInfo<'a> {
    pub fn new(unit: &'a ConfigUnit) -> Self {
        Self {
            unit,
            dependency_indices: Vec::new(),
            preprocessed: false,
            processed: false,
            state: UnitState::Pending,
            result_information: ResultInformation::success(),
            previously_in_desired_state: false,
            reboot_required: false,
        }
    }
}

/// Case-fold an identifier for comparison. Both identifier claims and
/// dependency references go through the same fold.
pub(crate) fn normalize_identifier(identifier: &str) -> String {
    identifier.to_lowercase()
}

/// Validate the set. Returns the code to latch on the set when any phase
/// fails, annotating and reporting the implicated units along the way.
pub(crate) fn preprocess(
    units: &mut [UnitInfo<'_>],
    progress: &mut dyn ProgressSink,
) -> Option<ErrorCode> {
    let (table, unique) = build_identifier_table(units, progress);
    if !unique {
        return Some(ErrorCode::DuplicateIdentifier);
    }

    if !resolve_dependencies(units, &table, progress) {
        return Some(ErrorCode::MissingDependency);
    }

    if !detect_cycles(units) {
        return Some(ErrorCode::DependencyCycle);
    }

    None
}

/// Map each case-folded identifier to the first unit that claimed it.
///
/// Scanning continues past a collision so every duplicate in the set is
/// surfaced in one pass. Both the incumbent and the newcomer are marked;
/// the incumbent only gets a new event if it is not already completed.
fn build_identifier_table(
    units: &mut [UnitInfo<'_>],
    progress: &mut dyn ProgressSink,
) -> (HashMap<String, usize>, bool) {
    let mut table: HashMap<String, usize> = HashMap::new();
    let mut unique = true;

    for index in 0..units.len() {
        if units[index].unit.identifier.is_empty() {
            continue;
        }
        let folded = normalize_identifier(&units[index].unit.identifier);

        match table.entry(folded) {
            Entry::Occupied(entry) => {
                let incumbent = *entry.get();
                tracing::error!(
                    identifier = %units[index].unit.identifier,
                    "duplicate unit identifier"
                );
                units[incumbent].result_information = ResultInformation::failure(
                    ErrorCode::DuplicateIdentifier,
                    ResultSource::ConfigurationSet,
                );
                progress::send_unit_progress_if_not_complete(
                    progress,
                    &mut units[incumbent],
                    UnitState::Completed,
                );
                units[index].result_information = ResultInformation::failure(
                    ErrorCode::DuplicateIdentifier,
                    ResultSource::ConfigurationSet,
                );
                progress::send_unit_progress(progress, &mut units[index], UnitState::Completed);
                unique = false;
            }
            Entry::Vacant(slot) => {
                slot.insert(index);
            }
        }
    }

    (table, unique)
}

/// Translate declared dependencies into unit indices.
///
/// Only the first missing dependency per unit is recorded.
// TODO: collect all missing dependencies of a unit instead of the first
fn resolve_dependencies(
    units: &mut [UnitInfo<'_>],
    table: &HashMap<String, usize>,
    progress: &mut dyn ProgressSink,
) -> bool {
    let mut resolved = true;

    for index in 0..units.len() {
        let unit = units[index].unit;
        for dependency in &unit.dependencies {
            if dependency.is_empty() {
                continue;
            }
            match table.get(&normalize_identifier(dependency)) {
                Some(&target) => {
                    units[index].dependency_indices.push(target);
                }
                None => {
                    tracing::error!(%dependency, "missing dependency");
                    units[index].result_information = ResultInformation::failure(
                        ErrorCode::MissingDependency,
                        ResultSource::ConfigurationSet,
                    )
                    .with_details(dependency.clone());
                    progress::send_unit_progress(progress, &mut units[index], UnitState::Completed);
                    resolved = false;
                    break;
                }
            }
        }
    }

    resolved
}

/// Dry-run driver: pretends every unit run succeeds.
struct MarkPreprocessed;

impl PhaseDriver for MarkPreprocessed {
    fn drive(&mut self, units: &mut [UnitInfo<'_>], index: usize) -> Result<bool, ApplyError> {
        units[index].preprocessed = true;
        Ok(true)
    }

    fn skip(&mut self, units: &mut [UnitInfo<'_>], index: usize, code: ErrorCode) {
        units[index].result_information =
            ResultInformation::failure(code, ResultSource::Precondition);
    }
}

pub(crate) fn has_preprocessed(unit: &UnitInfo<'_>) -> bool {
    unit.preprocessed
}

/// Simulate scheduling as if every unit run succeeded. With identifiers
/// unique and every dependency resolved, the only way the simulation can
/// fail to drain is a cycle in the dependency graph.
fn detect_cycles(units: &mut [UnitInfo<'_>]) -> bool {
    matches!(
        scheduler::drain_phases(units, has_preprocessed, &mut MarkPreprocessed),
        Ok(PhaseOutcome::Drained)
    )
}
