use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn snapshot_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn unit_sync(db: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("unit-sync").unwrap();
    cmd.env("UNIT_SYNC_DB", db).env_remove("UNIT_SYNC_CONFIG");
    cmd
}

#[test]
fn missing_file_reports_message() {
    let dir = tempfile::tempdir().unwrap();

    unit_sync(&dir.path().join("db.sqlite"))
        .arg(dir.path().join("missing.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("File doesn't exist"));
}

#[test]
fn insert_then_diff() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("db.sqlite");
    let file = snapshot_file(r#"{"unitA": {"name": "unitA", "stats": {"attack": 1}}}"#);

    unit_sync(&db)
        .arg(file.path())
        .arg("--insert")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"Done\""));

    let output = unit_sync(&db).arg(file.path()).arg("-d").arg("-u").output().unwrap();
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();

    assert!(output.status.success());
    assert_eq!(report, serde_json::json!({"unitA": {"nochange": {}}}));
}
