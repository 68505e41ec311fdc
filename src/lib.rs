// Unit Sync - Core Library
// Reconciles JSON unit snapshots against a SQLite store

pub mod error;
pub mod config;
pub mod entities;
pub mod compare;
pub mod diff;
pub mod db;
pub mod parser;
pub mod reconciliation;
pub mod batch;
pub mod command;

// Re-export commonly used types
pub use error::{Result, SyncError};
pub use config::Config;
pub use entities::{Audit, Unit, UnitChange, UnitVersion};
pub use compare::{compare, Comparable, Diff, FieldChange, FieldDescriptor, FieldValue, Record};
pub use diff::{diff_aggregate, AggregateDiff};
pub use db::{
    Event,
    setup_database, find_unit, insert_unit, latest_versions,
    count_units, count_versions, count_changes,
    insert_event, get_events_for_entity,
};
pub use parser::{load_snapshot, parse_snapshot, parse_unit, RawUnit, Snapshot};
pub use reconciliation::{reconcile, Outcome, SyncPolicy};
pub use batch::{run_batch, BatchReport};
pub use command::{run_command, CommandFlags};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
