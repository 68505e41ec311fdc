// Entity Models - one unit aggregate
//
// A Unit is the aggregate root, identified by its name. It owns:
// - UnitVersion records: immutable stat snapshots, newest first
// - UnitChange records: dated change-log notes, newest day first

pub mod audit;
pub mod unit;
pub mod unit_change;
pub mod unit_version;

pub use audit::Audit;
pub use unit::Unit;
pub use unit_change::UnitChange;
pub use unit_version::UnitVersion;
