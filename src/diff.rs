// 🧮 Aggregate Differ - diff a stored unit aggregate against a candidate
//
// Three tiers:
//   entity  → scalar display fields of the unit
//   version → stored latest version vs the candidate's version
//   history → candidate notes whose day the stored unit has not recorded yet

use crate::compare::{Comparable, Diff};
use crate::entities::{Unit, UnitChange, UnitVersion};
use crate::error::Result;
use serde::Serialize;
use std::collections::BTreeMap;

/// Nested diff of one aggregate.
///
/// `entity` is always present (possibly empty). `version` and `history` are
/// only populated when they hold at least one change.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateDiff {
    pub entity: Diff,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<Diff>,

    /// Keyed by the note's index in the candidate's change list
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub history: BTreeMap<usize, Diff>,
}

impl AggregateDiff {
    pub fn is_empty(&self) -> bool {
        self.entity.is_empty() && self.version.is_none() && self.history.is_empty()
    }

    /// Number of changed fields across all tiers.
    pub fn change_count(&self) -> usize {
        self.entity.len()
            + self.version.as_ref().map_or(0, |diff| diff.len())
            + self.history.values().map(|diff| diff.len()).sum::<usize>()
    }
}

/// Compute the diff between a stored aggregate and a candidate.
///
/// Stored versions are newest first, so only `stored.versions[0]` is compared.
/// A unit with no stored version is compared against an all-null version.
/// History matching is by day only: a candidate note on a day the stored log
/// already has is never reported, whatever its text.
pub fn diff_aggregate(stored: &Unit, candidate: &Unit) -> Result<AggregateDiff> {
    let mut result = AggregateDiff {
        entity: stored.diff(candidate)?,
        ..AggregateDiff::default()
    };

    if let Some(candidate_version) = candidate.latest_version() {
        let empty = UnitVersion::default();
        let stored_version = stored.latest_version().unwrap_or(&empty);
        let version_diff = stored_version.diff(candidate_version)?;
        if !version_diff.is_empty() {
            result.version = Some(version_diff);
        }
    }

    let known_days = stored.change_days();
    let blank = UnitChange::default();
    for (index, change) in candidate.changes.iter().enumerate() {
        if known_days.contains(&change.day) {
            continue;
        }
        let change_diff = blank.diff(change)?;
        if !change_diff.is_empty() {
            result.history.insert(index, change_diff);
        }
    }

    Ok(result)
}

// ============================================================================
// TESTS
// ============================================================================
