use crate::compare::Diff;
use crate::entities::{Audit, Unit, UnitChange, UnitVersion};
use crate::error::Result;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use serde::{Deserialize, Serialize};

const UNIT_COLUMNS: &str = "id, name, wiki_path, image_url, panel_url, \
    created_by, created_at, modified_by, modified_at";

const VERSION_COLUMNS: &str = "id, unit_id, gold, green, blue, red, energy, attack, health, \
    supply, unit_spell, frontline, fragile, blocker, prompt, stamina, lifespan, build_time, \
    exhaust_turn, exhaust_ability, position, abilities, \
    created_by, created_at, modified_by, modified_at";

const CHANGE_COLUMNS: &str = "id, unit_id, day, description, \
    created_by, created_at, modified_by, modified_at";

/// Event for audit trail: one per aggregate the reconciler writes
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery (in-memory databases report "memory")
    let _mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    // ==========================================================================
    // Units (aggregate root, unique by name)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS units (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT UNIQUE,
            wiki_path TEXT,
            image_url TEXT,
            panel_url TEXT,
            created_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            modified_by TEXT NOT NULL,
            modified_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Unit versions (append-only stat snapshots)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS unit_versions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            unit_id INTEGER NOT NULL REFERENCES units(id),
            gold INTEGER,
            green INTEGER,
            blue INTEGER,
            red INTEGER,
            energy INTEGER,
            attack INTEGER,
            health INTEGER,
            supply INTEGER,
            unit_spell TEXT,
            frontline INTEGER,
            fragile INTEGER,
            blocker INTEGER,
            prompt INTEGER,
            stamina INTEGER,
            lifespan INTEGER,
            build_time INTEGER,
            exhaust_turn INTEGER,
            exhaust_ability INTEGER,
            position TEXT,
            abilities TEXT,
            created_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            modified_by TEXT NOT NULL,
            modified_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Unit changes (dated change log)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS unit_changes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            unit_id INTEGER NOT NULL REFERENCES units(id),
            day TEXT,
            description TEXT,
            created_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            modified_by TEXT NOT NULL,
            modified_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Events Table (audit trail)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Latest version per unit (read-optimized view)
    // ==========================================================================
    conn.execute(
        "CREATE VIEW IF NOT EXISTS latest_unit_version AS
         SELECT u.name AS unit_name, uv.*
         FROM units u
         JOIN unit_versions uv ON uv.unit_id = u.id
         WHERE uv.id = (
             SELECT MAX(uv1.id)
             FROM unit_versions uv1
             WHERE uv1.unit_id = u.id
         )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_unit_versions_unit ON unit_versions(unit_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_unit_changes_unit_day ON unit_changes(unit_id, day)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// ROW MAPPING
// ============================================================================

fn parse_timestamp(idx: usize, value: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    value
        .map(|text| {
            DateTime::parse_from_rfc3339(&text)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
        })
        .transpose()
}

fn parse_day(idx: usize, value: Option<String>) -> rusqlite::Result<Option<NaiveDate>> {
    value
        .map(|text| {
            NaiveDate::parse_from_str(&text, "%Y-%m-%d")
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
        })
        .transpose()
}

/// Audit columns always trail the record's own columns.
fn audit_from_row(row: &Row, first: usize) -> rusqlite::Result<Audit> {
    Ok(Audit {
        created_by: row.get(first)?,
        created_at: parse_timestamp(first + 1, row.get(first + 1)?)?,
        modified_by: row.get(first + 2)?,
        modified_at: parse_timestamp(first + 3, row.get(first + 3)?)?,
    })
}

fn unit_from_row(row: &Row) -> rusqlite::Result<Unit> {
    Ok(Unit {
        id: row.get(0)?,
        name: row.get(1)?,
        wiki_path: row.get(2)?,
        image_url: row.get(3)?,
        panel_url: row.get(4)?,
        audit: audit_from_row(row, 5)?,
        versions: Vec::new(),
        changes: Vec::new(),
    })
}

/// Reads VERSION_COLUMNS starting at `offset`.
fn version_from_row(row: &Row, offset: usize) -> rusqlite::Result<UnitVersion> {
    Ok(UnitVersion {
        id: row.get(offset)?,
        unit_id: row.get(offset + 1)?,
        gold: row.get(offset + 2)?,
        green: row.get(offset + 3)?,
        blue: row.get(offset + 4)?,
        red: row.get(offset + 5)?,
        energy: row.get(offset + 6)?,
        attack: row.get(offset + 7)?,
        health: row.get(offset + 8)?,
        supply: row.get(offset + 9)?,
        unit_spell: row.get(offset + 10)?,
        frontline: row.get(offset + 11)?,
        fragile: row.get(offset + 12)?,
        blocker: row.get(offset + 13)?,
        prompt: row.get(offset + 14)?,
        stamina: row.get(offset + 15)?,
        lifespan: row.get(offset + 16)?,
        build_time: row.get(offset + 17)?,
        exhaust_turn: row.get(offset + 18)?,
        exhaust_ability: row.get(offset + 19)?,
        position: row.get(offset + 20)?,
        abilities: row.get(offset + 21)?,
        audit: audit_from_row(row, offset + 22)?,
    })
}

fn change_from_row(row: &Row) -> rusqlite::Result<UnitChange> {
    Ok(UnitChange {
        id: row.get(0)?,
        unit_id: row.get(1)?,
        day: parse_day(2, row.get(2)?)?,
        description: row.get(3)?,
        audit: audit_from_row(row, 4)?,
    })
}

// ============================================================================
// READS
// ============================================================================

/// Load a stored aggregate by natural key.
///
/// Versions come back newest first (highest id), changes newest day first.
pub fn find_unit(conn: &Connection, name: Option<&str>) -> Result<Option<Unit>> {
    let found = conn
        .query_row(
            &format!("SELECT {UNIT_COLUMNS} FROM units WHERE name IS ?1 ORDER BY id LIMIT 1"),
            params![name],
            unit_from_row,
        )
        .optional()?;

    let Some(mut unit) = found else {
        return Ok(None);
    };

    if let Some(unit_id) = unit.id {
        unit.versions = get_versions(conn, unit_id)?;
        unit.changes = get_changes(conn, unit_id)?;
    }

    Ok(Some(unit))
}

pub fn get_versions(conn: &Connection, unit_id: i64) -> Result<Vec<UnitVersion>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {VERSION_COLUMNS} FROM unit_versions WHERE unit_id = ?1 ORDER BY id DESC"
    ))?;

    let versions = stmt
        .query_map([unit_id], |row| version_from_row(row, 0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(versions)
}

pub fn get_changes(conn: &Connection, unit_id: i64) -> Result<Vec<UnitChange>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CHANGE_COLUMNS} FROM unit_changes WHERE unit_id = ?1 ORDER BY day DESC, id DESC"
    ))?;

    let changes = stmt
        .query_map([unit_id], change_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(changes)
}

/// Every unit with its current version, read from the `latest_unit_version` view.
pub fn latest_versions(conn: &Connection) -> Result<Vec<(Option<String>, UnitVersion)>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT unit_name, {VERSION_COLUMNS} FROM latest_unit_version ORDER BY unit_name"
    ))?;

    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, Option<String>>(0)?, version_from_row(row, 1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

pub fn count_units(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM units", [], |row| row.get(0))?)
}

pub fn count_versions(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM unit_versions", [], |row| row.get(0))?)
}

pub fn count_changes(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM unit_changes", [], |row| row.get(0))?)
}

// ============================================================================
// WRITES
// ============================================================================

/// Persist a whole new aggregate. Returns the new unit id.
pub fn insert_unit(conn: &Connection, unit: &Unit, actor: &str) -> Result<i64> {
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO units (
            name, wiki_path, image_url, panel_url,
            created_by, created_at, modified_by, modified_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?5, ?6)",
        params![
            unit.name,
            unit.wiki_path,
            unit.image_url,
            unit.panel_url,
            actor,
            now,
        ],
    )?;
    let unit_id = conn.last_insert_rowid();

    // Stored newest first, so insert oldest first to keep id order meaningful
    for version in unit.versions.iter().rev() {
        insert_version(conn, &version.reparented(unit_id), actor)?;
    }
    for change in unit.changes.iter().rev() {
        insert_change(conn, &change.reparented(unit_id), actor)?;
    }

    Ok(unit_id)
}

/// Append a version row. `version.unit_id` must point at an existing unit.
pub fn insert_version(conn: &Connection, version: &UnitVersion, actor: &str) -> Result<i64> {
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO unit_versions (
            unit_id, gold, green, blue, red, energy, attack, health,
            supply, unit_spell, frontline, fragile, blocker, prompt, stamina, lifespan,
            build_time, exhaust_turn, exhaust_ability, position, abilities,
            created_by, created_at, modified_by, modified_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                  ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?22, ?23)",
        params![
            version.unit_id,
            version.gold,
            version.green,
            version.blue,
            version.red,
            version.energy,
            version.attack,
            version.health,
            version.supply,
            version.unit_spell,
            version.frontline,
            version.fragile,
            version.blocker,
            version.prompt,
            version.stamina,
            version.lifespan,
            version.build_time,
            version.exhaust_turn,
            version.exhaust_ability,
            version.position,
            version.abilities,
            actor,
            now,
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

/// Append a change-log row. `change.unit_id` must point at an existing unit.
pub fn insert_change(conn: &Connection, change: &UnitChange, actor: &str) -> Result<i64> {
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO unit_changes (
            unit_id, day, description,
            created_by, created_at, modified_by, modified_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?4, ?5)",
        params![
            change.unit_id,
            change.day.map(|day| day.format("%Y-%m-%d").to_string()),
            change.description,
            actor,
            now,
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

/// Write the `new` side of an entity diff onto a stored unit and stamp the
/// modification audit columns.
///
/// Column names come from the unit's field descriptors, never from input data.
pub fn update_unit_fields(conn: &Connection, unit_id: i64, diff: &Diff, actor: &str) -> Result<usize> {
    if diff.is_empty() {
        return Ok(0);
    }

    let assignments: Vec<String> = diff
        .keys()
        .enumerate()
        .map(|(index, column)| format!("{} = ?{}", column, index + 1))
        .collect();
    let next = diff.len() + 1;
    let sql = format!(
        "UPDATE units SET {}, modified_by = ?{}, modified_at = ?{} WHERE id = ?{}",
        assignments.join(", "),
        next,
        next + 1,
        next + 2,
    );

    let now = Utc::now().to_rfc3339();
    let mut values: Vec<&dyn ToSql> = diff.values().map(|change| &change.new as &dyn ToSql).collect();
    values.push(&actor);
    values.push(&now);
    values.push(&unit_id);

    Ok(conn.execute(&sql, values.as_slice())?)
}

// ============================================================================
// AUDIT TRAIL
// ============================================================================

/// Insert event into audit trail
pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

/// Get events for a specific entity, newest first
pub fn get_events_for_entity(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY timestamp DESC, id DESC",
    )?;

    let events = stmt
        .query_map(params![entity_type, entity_id], |row| {
            let data_json: String = row.get(5)?;

            Ok(Event {
                event_id: row.get(0)?,
                timestamp: parse_timestamp(1, row.get(1)?)?.unwrap_or_default(),
                event_type: row.get(2)?,
                entity_type: row.get(3)?,
                entity_id: row.get(4)?,
                data: serde_json::from_str(&data_json).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e))
                })?,
                actor: row.get(6)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(events)
}
