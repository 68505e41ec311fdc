// 🖥️ Command - the load → reconcile → report pipeline behind the CLI

use crate::batch::{run_batch, BatchReport};
use crate::parser::load_snapshot;
use crate::reconciliation::SyncPolicy;
use rusqlite::Connection;
use std::path::Path;
use tracing::info;

/// The three independent switches of the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandFlags {
    /// Report the computed outcomes only, never write
    pub diff: bool,
    pub insert: bool,
    pub update: bool,
}

impl CommandFlags {
    /// Diff mode wins over insert/update.
    pub fn policy(&self) -> SyncPolicy {
        if self.diff {
            SyncPolicy::dry_run()
        } else {
            SyncPolicy::new(self.insert, self.update)
        }
    }
}

/// Run one snapshot file against the store.
///
/// Never fails: load errors come back as `{"message": ...}`, storage errors as
/// `{"error": {...}}`. In diff mode the per-unit report is returned, otherwise
/// a status summary.
pub fn run_command(
    conn: &mut Connection,
    path: &Path,
    flags: CommandFlags,
    actor: &str,
) -> serde_json::Value {
    let snapshot = match load_snapshot(path) {
        Ok(snapshot) => snapshot,
        Err(err) => return err.payload(),
    };

    let report = run_batch(conn, &snapshot, flags.policy(), actor);
    info!(
        "Diff/Changes:\n{}",
        serde_json::to_string_pretty(&report).unwrap_or_default()
    );

    if flags.diff || report.is_failed() {
        return serde_json::to_value(&report).unwrap_or_default();
    }

    let tally = report.tally();
    serde_json::json!({
        "status": "Done",
        "insert": tally["insert"],
        "update": tally["update"],
        "nochange": tally["nochange"],
    })
}
