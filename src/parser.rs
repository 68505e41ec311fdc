// 🏗️ Snapshot Parser - JSON snapshot → candidate unit aggregates
//
// Document shape: { "<unit name>": { ...unit object... }, ... }
// Missing sections and keys become nulls; unknown keys are ignored.

use crate::entities::{Unit, UnitChange, UnitVersion};
use crate::error::{Result, SyncError};
use chrono::NaiveDate;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, error, info};

// ============================================================================
// RAW JSON SHAPE
// ============================================================================

/// One unit object exactly as it appears in the snapshot file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawUnit {
    pub name: Option<String>,
    pub position: Option<String>,
    pub unit_spell: Option<String>,
    pub abilities: Option<String>,
    pub attributes: Option<RawAttributes>,
    pub change_history: Option<BTreeMap<NaiveDate, Vec<String>>>,
    pub costs: Option<RawCosts>,
    pub links: Option<RawLinks>,
    pub stats: Option<RawStats>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawAttributes {
    pub blocker: Option<bool>,
    pub fragile: Option<bool>,
    pub frontline: Option<bool>,
    pub prompt: Option<bool>,
    pub build_time: Option<i64>,
    pub exhaust_ability: Option<i64>,
    pub exhaust_turn: Option<i64>,
    pub lifespan: Option<i64>,
    pub stamina: Option<i64>,
    pub supply: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawCosts {
    pub blue: Option<i64>,
    pub energy: Option<i64>,
    pub gold: Option<i64>,
    pub green: Option<i64>,
    pub red: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawLinks {
    pub image: Option<String>,
    pub panel: Option<String>,
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawStats {
    pub attack: Option<i64>,
    pub health: Option<i64>,
}

// ============================================================================
// SNAPSHOT
// ============================================================================

/// Parsed snapshot: candidate aggregates keyed by natural key.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// SHA-256 of the raw document, recorded on audit events
    pub digest: String,
    pub units: BTreeMap<String, Unit>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Read and parse a snapshot file.
///
/// A missing file is `FileNotFound`; unreadable bytes or bad JSON is `MalformedInput`.
pub fn load_snapshot(path: &Path) -> Result<Snapshot> {
    info!(path = %path.display(), "Loading units");

    if !path.is_file() {
        error!(path = %path.display(), "File doesn't exist");
        return Err(SyncError::FileNotFound(path.to_path_buf()));
    }

    let bytes = std::fs::read(path).map_err(|e| {
        error!(path = %path.display(), error = %e, "Invalid format");
        SyncError::MalformedInput(e.to_string())
    })?;

    parse_snapshot(&bytes).map_err(|e| {
        error!(error = %e, "Invalid format");
        e
    })
}

/// Parse snapshot bytes (UTF-8 JSON mapping of name → unit object).
pub fn parse_snapshot(bytes: &[u8]) -> Result<Snapshot> {
    let raw: BTreeMap<String, RawUnit> =
        serde_json::from_slice(bytes).map_err(|e| SyncError::MalformedInput(e.to_string()))?;

    let digest = format!("{:x}", Sha256::digest(bytes));
    let units = raw
        .into_iter()
        .map(|(key, raw_unit)| (key, parse_unit(raw_unit)))
        .collect();

    Ok(Snapshot { digest, units })
}

/// Build a candidate aggregate from one raw unit object.
///
/// Always yields exactly one version (all-null when the object is empty).
/// Change notes come out newest day first, file order within a day.
pub fn parse_unit(raw: RawUnit) -> Unit {
    debug!(name = ?raw.name, "Loading unit into model");

    let links = raw.links.unwrap_or_default();
    let stats = raw.stats.unwrap_or_default();
    let costs = raw.costs.unwrap_or_default();
    let attributes = raw.attributes.unwrap_or_default();

    let version = UnitVersion {
        attack: stats.attack,
        health: stats.health,
        gold: costs.gold,
        green: costs.green,
        blue: costs.blue,
        red: costs.red,
        energy: costs.energy,
        supply: attributes.supply,
        frontline: attributes.frontline,
        fragile: attributes.fragile,
        blocker: attributes.blocker,
        prompt: attributes.prompt,
        stamina: attributes.stamina,
        lifespan: attributes.lifespan,
        build_time: attributes.build_time,
        exhaust_turn: attributes.exhaust_turn,
        exhaust_ability: attributes.exhaust_ability,
        unit_spell: raw.unit_spell,
        position: raw.position,
        abilities: raw.abilities,
        ..UnitVersion::default()
    };

    let changes = raw
        .change_history
        .unwrap_or_default()
        .into_iter()
        .rev()
        .flat_map(|(day, notes)| notes.into_iter().map(move |note| UnitChange::new(day, note)))
        .collect();

    Unit {
        name: raw.name,
        wiki_path: links.path,
        image_url: links.image,
        panel_url: links.panel,
        versions: vec![version],
        changes,
        ..Unit::default()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const UNIT1: &str = r#"{
        "unit1": {
            "name": "unit1",
            "position": "Top",
            "type": 4,
            "unit_spell": "Unit",
            "abilities": "ability X",
            "attributes": {
                "blocker": false,
                "fragile": true,
                "frontline": false,
                "prompt": true,
                "build_time": 0,
                "exhaust_ability": 1,
                "exhaust_turn": 0,
                "lifespan": 1,
                "stamina": 0,
                "supply": 1
            },
            "change_history": {
                "2000-01-01": ["Change 1", "Change 2"],
                "2000-02-01": ["Change 3"]
            },
            "costs": {"blue": 3, "energy": 0, "gold": 13, "green": 0, "red": 0},
            "links": {"image": "image X", "panel": "panel X", "path": "path X"},
            "stats": {"attack": 1, "health": 1}
        }
    }"#;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_full_unit() {
        let snapshot = parse_snapshot(UNIT1.as_bytes()).unwrap();
        let unit = &snapshot.units["unit1"];

        assert_eq!(unit.name.as_deref(), Some("unit1"));
        assert_eq!(unit.wiki_path.as_deref(), Some("path X"));
        assert_eq!(unit.image_url.as_deref(), Some("image X"));
        assert_eq!(unit.panel_url.as_deref(), Some("panel X"));

        let version = &unit.versions[0];
        assert_eq!(unit.versions.len(), 1);
        assert_eq!(version.gold, Some(13));
        assert_eq!(version.blue, Some(3));
        assert_eq!(version.attack, Some(1));
        assert_eq!(version.fragile, Some(true));
        assert_eq!(version.blocker, Some(false));
        assert_eq!(version.exhaust_ability, Some(1));
        assert_eq!(version.unit_spell.as_deref(), Some("Unit"));
        assert_eq!(version.position.as_deref(), Some("Top"));
        assert_eq!(version.abilities.as_deref(), Some("ability X"));

        let changes: Vec<_> = unit
            .changes
            .iter()
            .map(|c| (c.day.unwrap(), c.description.clone().unwrap()))
            .collect();
        assert_eq!(
            changes,
            vec![
                (day(2000, 2, 1), "Change 3".to_string()),
                (day(2000, 1, 1), "Change 1".to_string()),
                (day(2000, 1, 1), "Change 2".to_string()),
            ]
        );
        assert_eq!(snapshot.digest.len(), 64);
    }

    #[test]
    fn test_parse_empty_unit_synthesizes_version() {
        let snapshot = parse_snapshot(br#"{"ghost": {}}"#).unwrap();
        let unit = &snapshot.units["ghost"];

        assert_eq!(unit.name, None);
        assert_eq!(unit.versions, vec![UnitVersion::default()]);
        assert!(unit.changes.is_empty());
    }

    #[test]
    fn test_null_sections_are_defaults() {
        let snapshot =
            parse_snapshot(br#"{"a": {"name": "a", "links": null, "stats": {"attack": 2}}}"#)
                .unwrap();
        let unit = &snapshot.units["a"];

        assert_eq!(unit.image_url, None);
        assert_eq!(unit.versions[0].attack, Some(2));
        assert_eq!(unit.versions[0].health, None);
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let err = parse_snapshot(b"{not json").unwrap_err();

        assert!(matches!(err, SyncError::MalformedInput(_)));
    }

    #[test]
    fn test_bad_day_is_malformed() {
        let err = parse_snapshot(br#"{"a": {"change_history": {"yesterday": ["x"]}}}"#).unwrap_err();

        assert!(matches!(err, SyncError::MalformedInput(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_snapshot(Path::new("/definitely/not/here.json")).unwrap_err();

        assert!(matches!(err, SyncError::FileNotFound(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(UNIT1.as_bytes()).unwrap();

        let snapshot = load_snapshot(file.path()).unwrap();

        assert_eq!(snapshot.len(), 1);
        assert!(!snapshot.is_empty());
    }
}
