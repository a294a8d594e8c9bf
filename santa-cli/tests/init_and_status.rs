use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;

use santa_core::{store, ActorId, Assignment, AttributeToken, ParticipantName, Registry};
use tempfile::TempDir;

fn santa_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("santa"));
    cmd.env("HOME", home).env("USERPROFILE", home);
    cmd
}

fn write_seed(dir: &Path) -> std::path::PathBuf {
    let seed = dir.join("office.yaml");
    fs::write(&seed, "roster: [Ann, Bob, Cara]\nattributes: [Red, Blue]\n").expect("seed");
    seed
}

#[test]
fn init_writes_registry_and_seed() {
    let home = TempDir::new().expect("home");
    let seed = write_seed(home.path());

    santa_cmd(home.path())
        .args(["init", "--seed"])
        .arg(&seed)
        .assert()
        .success()
        .stdout(contains("3 participants, 2 colours"));

    let snapshot = store::load_snapshot(&store::snapshot_path_at(home.path()))
        .expect("load")
        .expect("snapshot written");
    assert_eq!(snapshot.participants.len(), 3);
    assert!(store::seed_path_at(home.path()).exists());
}

#[test]
fn init_refuses_to_overwrite_without_force() {
    let home = TempDir::new().expect("home");
    let seed = write_seed(home.path());

    santa_cmd(home.path())
        .args(["init", "--seed"])
        .arg(&seed)
        .assert()
        .success();
    santa_cmd(home.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(contains("--force"));
    santa_cmd(home.path())
        .args(["init", "--force"])
        .assert()
        .success();
}

#[test]
fn init_without_seed_uses_builtin_roster() {
    let home = TempDir::new().expect("home");
    santa_cmd(home.path())
        .arg("init")
        .assert()
        .success()
        .stdout(contains("10 participants, 10 colours"));
}

#[test]
fn init_rejects_duplicate_roster_names() {
    let home = TempDir::new().expect("home");
    let seed = home.path().join("dup.yaml");
    fs::write(&seed, "roster: [Ann, Ann]\nattributes: [Red]\n").unwrap();

    santa_cmd(home.path())
        .args(["init", "--seed"])
        .arg(&seed)
        .assert()
        .failure();
    assert!(!store::snapshot_path_at(home.path()).exists());
}

#[test]
fn status_without_registry_points_at_init() {
    let home = TempDir::new().expect("home");
    santa_cmd(home.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(contains("santa init"));
}

#[test]
fn status_json_reports_claims_and_pool() {
    let home = TempDir::new().expect("home");
    let mut registry = Registry::from_seed(["Ann", "Bob", "Cara"], ["Red", "Blue"]).unwrap();
    let ann = ParticipantName::from("Ann");
    let bob = ParticipantName::from("Bob");
    let red = AttributeToken::from("Red");
    registry.commit_claim(&ann, ActorId(77)).unwrap();
    registry.assign_recipient(&bob, ann.clone(), red.clone()).unwrap();
    registry.assign_recipient(&ann, bob.clone(), red.clone()).unwrap();
    registry.remove_attribute(&red).unwrap();
    store::save_snapshot(&store::snapshot_path_at(home.path()), &registry.snapshot()).unwrap();

    let output = santa_cmd(home.path())
        .args(["status", "--json"])
        .output()
        .expect("run status");
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");

    assert_eq!(report["summary"]["participants"], 3);
    assert_eq!(report["summary"]["claimed"], 1);
    assert_eq!(report["summary"]["assigned"], 2);
    assert_eq!(report["remaining_colours"], serde_json::json!(["Blue"]));

    let rows = report["participants"].as_array().unwrap();
    assert_eq!(rows[0]["name"], "Ann");
    assert_eq!(rows[0]["claimed_by"], 77);
    assert_eq!(rows[0]["recipient"], "Bob");
    assert_eq!(rows[2]["claimed_by"], serde_json::Value::Null);

    let expected = Assignment {
        recipient: bob,
        attribute: red,
    };
    assert_eq!(registry.assignment_for(ActorId(77)), Some(&expected));
}

#[test]
fn status_table_lists_every_name() {
    let home = TempDir::new().expect("home");
    let seed = write_seed(home.path());
    santa_cmd(home.path())
        .args(["init", "--seed"])
        .arg(&seed)
        .assert()
        .success();

    santa_cmd(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(contains("Ann"))
        .stdout(contains("Cara"))
        .stdout(contains("Colours left: Blue, Red"));
}

#[test]
fn workflow_commands_need_a_running_daemon() {
    let home = TempDir::new().expect("home");
    santa_cmd(home.path())
        .args(["names", "--actor", "1"])
        .assert()
        .failure()
        .stderr(contains("santa serve"));
    santa_cmd(home.path())
        .arg("stop")
        .assert()
        .success()
        .stdout(contains("not running"));
}
