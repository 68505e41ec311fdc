// 📦 Batch Runner - reconcile a whole snapshot inside one transaction
//
// All units share a single transaction. Any storage error rolls back the lot,
// so a half-applied snapshot is never visible. Commit happens once, at the
// end, and only when writes were requested and something actually changed.

use crate::error::{Result, SyncError};
use crate::parser::Snapshot;
use crate::reconciliation::{reconcile, Outcome, SyncPolicy};
use rusqlite::{Connection, Transaction};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{error, info, info_span, warn};

/// Result of one batch run.
///
/// Serializes as the plain `{key: outcome}` map, or `{"error": {"message": ...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BatchReport {
    Completed(BTreeMap<String, Outcome>),
    Failed { error: serde_json::Value },
}

impl BatchReport {
    fn failed(err: &SyncError) -> Self {
        BatchReport::Failed {
            error: err.payload(),
        }
    }

    pub fn outcomes(&self) -> Option<&BTreeMap<String, Outcome>> {
        match self {
            BatchReport::Completed(outcomes) => Some(outcomes),
            BatchReport::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, BatchReport::Failed { .. })
    }

    /// Number of units per outcome name.
    pub fn tally(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::from([("insert", 0), ("update", 0), ("nochange", 0)]);
        for outcome in self.outcomes().into_iter().flat_map(|outcomes| outcomes.values()) {
            *counts.entry(outcome.name()).or_default() += 1;
        }
        counts
    }
}

/// Reconcile every unit of `snapshot` against the store in one transaction.
pub fn run_batch(
    conn: &mut Connection,
    snapshot: &Snapshot,
    policy: SyncPolicy,
    actor: &str,
) -> BatchReport {
    let run_id = uuid::Uuid::new_v4();
    let span = info_span!("batch", %run_id, source = %snapshot.digest);
    let _guard = span.enter();

    let tx = match conn.transaction() {
        Ok(tx) => tx,
        Err(e) => {
            let err = SyncError::from(e);
            error!(error = %err, "Could not open session");
            return BatchReport::failed(&err);
        }
    };
    info!(units = snapshot.len(), ?policy, "Session: Opened");

    let report = match reconcile_all(&tx, snapshot, policy, actor) {
        Ok(outcomes) => finish(tx, outcomes, policy),
        Err(err) => {
            error!(error = %err, "DB error. Rolling back.");
            if let Err(rollback) = tx.rollback() {
                warn!(error = %rollback, "Rollback failed");
            }
            BatchReport::failed(&err)
        }
    };

    info!("Session: Closed");
    report
}

fn reconcile_all(
    tx: &Transaction<'_>,
    snapshot: &Snapshot,
    policy: SyncPolicy,
    actor: &str,
) -> Result<BTreeMap<String, Outcome>> {
    let mut outcomes = BTreeMap::new();
    for (key, unit) in &snapshot.units {
        let outcome = reconcile(tx, unit, policy, actor, &snapshot.digest)?;
        info!(unit = %key, outcome = outcome.name(), "Reconciled");
        outcomes.insert(key.clone(), outcome);
    }
    Ok(outcomes)
}

fn finish(tx: Transaction<'_>, outcomes: BTreeMap<String, Outcome>, policy: SyncPolicy) -> BatchReport {
    let changed = outcomes.values().any(Outcome::is_change);

    if policy.writes() && changed {
        if let Err(e) = tx.commit() {
            let err = SyncError::from(e);
            error!(error = %err, "Commit failed");
            return BatchReport::failed(&err);
        }
        info!("Session: Committed");
    } else if let Err(e) = tx.rollback() {
        warn!(error = %e, "Rollback of read-only session failed");
    }

    BatchReport::Completed(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{count_units, count_versions, setup_database};
    use crate::parser::parse_snapshot;

    const SNAPSHOT: &str = r#"{
        "unitA": {
            "name": "unitA",
            "links": {"image": "image A"},
            "stats": {"attack": 1, "health": 2},
            "change_history": {"2000-01-01": ["note1"]}
        },
        "unitB": {
            "name": "unitB",
            "costs": {"gold": 5}
        }
    }"#;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    #[test]
    fn test_insert_batch_commits() {
        let mut conn = test_conn();
        let snapshot = parse_snapshot(SNAPSHOT.as_bytes()).unwrap();

        let report = run_batch(&mut conn, &snapshot, SyncPolicy::new(true, false), "tester");

        let outcomes = report.outcomes().unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.values().all(|o| *o == Outcome::Insert));
        assert_eq!(count_units(&conn).unwrap(), 2);
        assert_eq!(count_versions(&conn).unwrap(), 2);
        assert_eq!(report.tally()["insert"], 2);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let mut conn = test_conn();
        let snapshot = parse_snapshot(SNAPSHOT.as_bytes()).unwrap();

        let report = run_batch(&mut conn, &snapshot, SyncPolicy::dry_run(), "tester");

        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({"unitA": {"insert": {}}, "unitB": {"insert": {}}})
        );
        assert_eq!(count_units(&conn).unwrap(), 0);
    }

    #[test]
    fn test_rerun_is_nochange() {
        let mut conn = test_conn();
        let snapshot = parse_snapshot(SNAPSHOT.as_bytes()).unwrap();
        run_batch(&mut conn, &snapshot, SyncPolicy::new(true, false), "tester");

        let report = run_batch(&mut conn, &snapshot, SyncPolicy::new(false, true), "tester");

        assert_eq!(report.tally()["nochange"], 2);
        assert_eq!(count_versions(&conn).unwrap(), 2);
    }

    #[test]
    fn test_storage_error_rolls_back_everything() {
        let mut conn = test_conn();
        let snapshot = parse_snapshot(SNAPSHOT.as_bytes()).unwrap();
        // unitA inserts fine, unitB is refused mid-batch
        conn.execute_batch(
            "CREATE TRIGGER reject_unit_b BEFORE INSERT ON units
             WHEN NEW.name = 'unitB'
             BEGIN SELECT RAISE(ABORT, 'unitB rejected'); END;",
        )
        .unwrap();

        let report = run_batch(&mut conn, &snapshot, SyncPolicy::new(true, true), "tester");

        assert!(report.is_failed());
        assert_eq!(count_units(&conn).unwrap(), 0);
        assert_eq!(count_versions(&conn).unwrap(), 0);
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["error"]["message"].as_str().unwrap().contains("unitB rejected"));
    }
}
