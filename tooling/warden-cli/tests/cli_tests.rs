use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn warden(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("warden").unwrap();
    cmd.current_dir(dir.path()).env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("warden").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: warden"));
}

#[test]
fn test_list_shows_catalog() {
    let dir = TempDir::new().unwrap();
    warden(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("force_inject"))
        .stdout(predicate::str::contains("transfer_from(from, to, approve_first, amount)"))
        .stdout(predicate::str::contains("solvency_balances_naive"));
}

#[test]
fn test_run_with_default_invariants_passes() {
    let dir = TempDir::new().unwrap();
    warden(&dir)
        .args(["run", "--runs", "4", "--depth", "16", "--seed", "42"])
        .assert()
        .success()
        .stdout(predicate::str::contains("All invariants held"));
}

#[test]
fn test_run_finds_forced_value_with_naive_invariant() {
    let dir = TempDir::new().unwrap();
    warden(&dir)
        .args([
            "run",
            "--seed",
            "1",
            "--target-action",
            "force_inject",
            "--invariant",
            "solvency_balances_naive",
        ])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Invariant broken: "))
        .stdout(predicate::str::contains("force_inject(amount=1)"));
}

#[test]
fn test_run_json_output() {
    let dir = TempDir::new().unwrap();
    let assert = warden(&dir)
        .args(["run", "--runs", "2", "--depth", "8", "--seed", "3", "--format", "json"])
        .assert()
        .success();

    // JSON starts with {
    assert.stdout(predicate::str::starts_with("{"));
}

#[test]
fn test_run_rejects_unknown_invariant() {
    let dir = TempDir::new().unwrap();
    warden(&dir)
        .args(["run", "--invariant", "no_such_thing"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown invariant 'no_such_thing'"));
}

#[test]
fn test_saved_failure_replays() {
    let dir = TempDir::new().unwrap();
    warden(&dir)
        .args([
            "run",
            "--seed",
            "9",
            "--target-action",
            "force_inject",
            "--invariant",
            "solvency_balances_naive",
            "--save-failures",
            "failures",
        ])
        .assert()
        .code(1);

    let saved = dir
        .path()
        .join("failures")
        .join("failure-0-solvency_balances_naive.json");
    assert!(saved.exists());

    warden(&dir)
        .arg("replay")
        .arg(&saved)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Reproduced: "));
}

#[test]
fn test_init_writes_config_and_run_uses_it() {
    let dir = TempDir::new().unwrap();
    warden(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration file created successfully!"));
    assert!(dir.path().join(".warden.toml").exists());

    warden(&dir).arg("init").assert().code(1);
    warden(&dir).args(["init", "--force"]).assert().success();

    let content = fs::read_to_string(dir.path().join(".warden.toml")).unwrap();
    let patched = content.replace("runs = 64", "runs = 2");
    fs::write(dir.path().join(".warden.toml"), patched).unwrap();
    warden(&dir)
        .args(["run", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"runs\": 2"));
}

#[test]
fn test_run_rejects_out_of_range_sender_pool() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".warden.toml"), "[handler]\nsender_pool = 0\n").unwrap();
    warden(&dir)
        .arg("run")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("sender pool must hold between 1 and"));
}
