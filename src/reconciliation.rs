// ⚖️ Reconciliation Engine - decide insert / update / no-change for one unit
//
// Absent in the store    → Insert   (written only when inserts are allowed)
// Present, diff empty    → NoChange
// Present, diff nonempty → Update   (applied only when updates are allowed)
//
// Entity fields are updated in place. Version and history tiers are
// append-only: a changed version becomes a new row, new days become new rows.

use crate::db::{self, Event};
use crate::diff::{diff_aggregate, AggregateDiff};
use crate::entities::Unit;
use crate::error::Result;
use rusqlite::Connection;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::{debug, info};

// ============================================================================
// POLICY
// ============================================================================

/// Which writes the caller allows. Both off = report only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncPolicy {
    pub insert: bool,
    pub update: bool,
}

impl SyncPolicy {
    pub fn new(insert: bool, update: bool) -> Self {
        SyncPolicy { insert, update }
    }

    /// Report-only policy.
    pub fn dry_run() -> Self {
        SyncPolicy::default()
    }

    pub fn writes(&self) -> bool {
        self.insert || self.update
    }
}

// ============================================================================
// OUTCOME
// ============================================================================

/// Per-unit result of one reconciliation pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Insert,
    Update(AggregateDiff),
    NoChange,
}

impl Outcome {
    pub fn name(&self) -> &'static str {
        match self {
            Outcome::Insert => "insert",
            Outcome::Update(_) => "update",
            Outcome::NoChange => "nochange",
        }
    }

    pub fn is_change(&self) -> bool {
        !matches!(self, Outcome::NoChange)
    }
}

/// `{"insert": {}}`, `{"update": <diff>}` or `{"nochange": {}}`
impl Serialize for Outcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let empty = serde_json::Map::new();
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Outcome::Update(diff) => map.serialize_entry(self.name(), diff)?,
            _ => map.serialize_entry(self.name(), &empty)?,
        }
        map.end()
    }
}

// ============================================================================
// RECONCILE
// ============================================================================

/// Reconcile one candidate aggregate against the store behind `conn`.
///
/// `conn` is the caller's session (normally an open transaction); nothing
/// here commits. `source` is the snapshot digest recorded on audit events.
pub fn reconcile(
    conn: &Connection,
    candidate: &Unit,
    policy: SyncPolicy,
    actor: &str,
    source: &str,
) -> Result<Outcome> {
    let name = candidate.name.as_deref();

    let Some(stored) = db::find_unit(conn, name)? else {
        if policy.insert {
            let unit_id = db::insert_unit(conn, candidate, actor)?;
            record_event(
                conn,
                "unit_inserted",
                candidate,
                serde_json::json!({
                    "unit_id": unit_id,
                    "versions": candidate.versions.len(),
                    "changes": candidate.changes.len(),
                    "source": source,
                }),
                actor,
            )?;
            info!(unit = ?name, unit_id, "Inserted unit");
        }
        return Ok(Outcome::Insert);
    };

    let diff = diff_aggregate(&stored, candidate)?;
    if diff.is_empty() {
        debug!(unit = ?name, "No changes");
        return Ok(Outcome::NoChange);
    }

    debug!(unit = ?name, changes = diff.change_count(), "Unit differs from store");
    if policy.update {
        if let Some(unit_id) = stored.id {
            apply_update(conn, unit_id, candidate, &diff, actor)?;
            record_event(
                conn,
                "unit_updated",
                candidate,
                serde_json::json!({ "diff": serde_json::to_value(&diff)?, "source": source }),
                actor,
            )?;
            info!(unit = ?name, unit_id, "Updated unit");
        }
    }

    Ok(Outcome::Update(diff))
}

/// Write an update: entity fields in place, version and notes appended as copies.
fn apply_update(
    conn: &Connection,
    unit_id: i64,
    candidate: &Unit,
    diff: &AggregateDiff,
    actor: &str,
) -> Result<()> {
    db::update_unit_fields(conn, unit_id, &diff.entity, actor)?;

    if diff.version.is_some() {
        if let Some(version) = candidate.latest_version() {
            db::insert_version(conn, &version.reparented(unit_id), actor)?;
        }
    }

    for index in diff.history.keys() {
        if let Some(change) = candidate.changes.get(*index) {
            db::insert_change(conn, &change.reparented(unit_id), actor)?;
        }
    }

    Ok(())
}

fn record_event(
    conn: &Connection,
    event_type: &str,
    unit: &Unit,
    data: serde_json::Value,
    actor: &str,
) -> Result<()> {
    let entity_id = unit.name.as_deref().unwrap_or_default();
    db::insert_event(conn, &Event::new(event_type, "unit", entity_id, data, actor))
}

// ============================================================================
// TESTS
// ============================================================================
