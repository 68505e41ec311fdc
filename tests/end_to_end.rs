use chrono::NaiveDate;
use rusqlite::Connection;
use std::io::Write;
use unit_sync::{
    count_changes, count_units, count_versions, find_unit, latest_versions, run_command,
    setup_database, CommandFlags,
};

const SNAPSHOT: &str = r#"{
    "unitA": {
        "name": "unitA",
        "position": "Front",
        "unit_spell": "Unit",
        "links": {"path": "/wiki/unitA", "image": "a.png", "panel": "a-panel.png"},
        "costs": {"gold": 5, "blue": 1},
        "stats": {"attack": 2, "health": 3},
        "attributes": {"supply": 1, "frontline": true},
        "change_history": {"2000-01-01": ["note1"]}
    }
}"#;

fn snapshot_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn store() -> (tempfile::TempDir, Connection) {
    let dir = tempfile::tempdir().unwrap();
    let conn = Connection::open(dir.path().join("units.sqlite")).unwrap();
    setup_database(&conn).unwrap();
    (dir, conn)
}

fn diff_with(insert: bool, update: bool) -> CommandFlags {
    CommandFlags {
        diff: true,
        insert,
        update,
    }
}

fn write_with(insert: bool, update: bool) -> CommandFlags {
    CommandFlags {
        diff: false,
        insert,
        update,
    }
}

#[test]
fn insert_then_rerun_is_nochange() {
    let (_dir, mut conn) = store();
    let file = snapshot_file(SNAPSHOT);

    let first = run_command(&mut conn, file.path(), write_with(true, false), "tester");
    assert_eq!(first["insert"], 1);

    let unit = find_unit(&conn, Some("unitA")).unwrap().unwrap();
    assert_eq!(unit.versions.len(), 1);
    assert_eq!(unit.changes.len(), 1);
    assert_eq!(unit.changes[0].day, NaiveDate::from_ymd_opt(2000, 1, 1));
    assert_eq!(unit.changes[0].description.as_deref(), Some("note1"));

    let report = run_command(&mut conn, file.path(), diff_with(false, true), "tester");
    assert_eq!(report, serde_json::json!({"unitA": {"nochange": {}}}));

    let rerun = run_command(&mut conn, file.path(), write_with(false, true), "tester");
    assert_eq!(rerun["nochange"], 1);
    assert_eq!(count_units(&conn).unwrap(), 1);
    assert_eq!(count_versions(&conn).unwrap(), 1);
    assert_eq!(count_changes(&conn).unwrap(), 1);
}

#[test]
fn diff_mode_reports_insert_without_writing() {
    let (_dir, mut conn) = store();
    let file = snapshot_file(SNAPSHOT);

    let report = run_command(&mut conn, file.path(), diff_with(true, true), "tester");

    assert_eq!(report, serde_json::json!({"unitA": {"insert": {}}}));
    assert_eq!(count_units(&conn).unwrap(), 0);
}

#[test]
fn update_appends_version_and_new_days() {
    let (_dir, mut conn) = store();
    let file = snapshot_file(SNAPSHOT);
    run_command(&mut conn, file.path(), write_with(true, false), "tester");

    let changed = SNAPSHOT
        .replace(r#""attack": 2"#, r#""attack": 4"#)
        .replace(r#""image": "a.png""#, r#""image": "a2.png""#)
        .replace(
            r#""2000-01-01": ["note1"]"#,
            r#""2000-01-01": ["note1 edited"], "2000-02-01": ["note2"]"#,
        );
    let changed_file = snapshot_file(&changed);

    let report = run_command(&mut conn, changed_file.path(), diff_with(false, true), "tester");
    // diff mode: nothing written yet
    assert_eq!(count_versions(&conn).unwrap(), 1);
    let update = &report["unitA"]["update"];
    assert_eq!(
        update["entity"],
        serde_json::json!({"image_url": {"old": "a.png", "new": "a2.png"}})
    );
    assert_eq!(
        update["version"],
        serde_json::json!({"attack": {"old": 2, "new": 4}})
    );
    assert_eq!(
        update["history"],
        serde_json::json!({"0": {
            "day": {"old": null, "new": "2000-02-01"},
            "description": {"old": null, "new": "note2"}
        }})
    );

    let summary = run_command(&mut conn, changed_file.path(), write_with(false, true), "tester");
    assert_eq!(summary["update"], 1);

    let unit = find_unit(&conn, Some("unitA")).unwrap().unwrap();
    assert_eq!(unit.image_url.as_deref(), Some("a2.png"));
    assert_eq!(unit.versions.len(), 2);
    assert_eq!(unit.versions[0].attack, Some(4));
    assert_eq!(unit.versions[1].attack, Some(2));
    assert_eq!(unit.changes.len(), 2);
    assert_eq!(unit.changes[1].description.as_deref(), Some("note1"));

    let latest = latest_versions(&conn).unwrap();
    assert_eq!(latest[0].1.attack, Some(4));
}

#[test]
fn insert_only_leaves_existing_units_alone() {
    let (_dir, mut conn) = store();
    let file = snapshot_file(SNAPSHOT);
    run_command(&mut conn, file.path(), write_with(true, false), "tester");

    let changed_file = snapshot_file(&SNAPSHOT.replace(r#""gold": 5"#, r#""gold": 9"#));
    let summary = run_command(&mut conn, changed_file.path(), write_with(true, false), "tester");

    assert_eq!(summary["update"], 1);
    assert_eq!(count_versions(&conn).unwrap(), 1);
}
