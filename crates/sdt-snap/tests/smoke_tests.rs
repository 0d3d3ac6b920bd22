//! Smoke tests for the sdt-snap binary

#![allow(deprecated)]
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn sdt_snap(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("sdt-snap").expect("binary");
    cmd.current_dir(dir.path())
        .env_remove("SDT_SNAP_CONFIG")
        .env_remove("SDT_BASE_URL")
        .env_remove("ENABLE_BASELINE2")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_version() {
    let dir = TempDir::new().unwrap();
    sdt_snap(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.4.0"));
}

#[test]
fn test_help() {
    let dir = TempDir::new().unwrap();
    sdt_snap(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("capture"))
        .stdout(predicate::str::contains("compare"));
}

#[test]
fn test_no_args_fails() {
    let dir = TempDir::new().unwrap();
    sdt_snap(&dir).assert().failure();
}

#[test]
fn test_compare_help() {
    let dir = TempDir::new().unwrap();
    sdt_snap(&dir)
        .args(["compare", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--against"))
        .stdout(predicate::str::contains("--max-diff-pixel-ratio"));
}

#[test]
fn test_scenes_lists_bios() {
    let dir = TempDir::new().unwrap();
    sdt_snap(&dir)
        .arg("scenes")
        .assert()
        .success()
        .stdout(predicate::str::contains("bio-tammy"))
        .stdout(predicate::str::contains("menu-open"));
}

#[test]
fn test_scenes_for_desktop_hides_phone_menu() {
    let dir = TempDir::new().unwrap();
    sdt_snap(&dir)
        .args(["scenes", "--profile", "desktop"])
        .assert()
        .success()
        .stdout(predicate::str::contains("menu-open").not());
}

#[test]
fn test_profiles() {
    let dir = TempDir::new().unwrap();
    sdt_snap(&dir)
        .arg("profiles")
        .assert()
        .success()
        .stdout(predicate::str::contains("phone"))
        .stdout(predicate::str::contains("1400x900"));
}

#[test]
fn test_config_show_and_init() {
    let dir = TempDir::new().unwrap();
    sdt_snap(&dir)
        .args(["config", "--show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("http://localhost:9753"));

    sdt_snap(&dir).args(["config", "--init"]).assert().success();
    assert!(dir.path().join("sdt-snap.yaml").exists());

    sdt_snap(&dir)
        .args(["config", "--init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}

#[test]
fn test_simulated_capture_writes_snapshots() {
    let dir = TempDir::new().unwrap();
    sdt_snap(&dir)
        .args([
            "--color",
            "never",
            "capture",
            "--simulate",
            "--snapshot-dir",
            "snaps",
            "--profile",
            "desktop",
        ])
        .assert()
        .success();
    assert!(dir.path().join("snaps/desktop/baseline-hero.png").exists());
    assert!(!dir.path().join("snaps/desktop/baseline-menu-open.png").exists());
}

#[test]
fn test_simulated_compare_without_baseline_fails() {
    let dir = TempDir::new().unwrap();
    sdt_snap(&dir)
        .args([
            "--color",
            "never",
            "compare",
            "--simulate",
            "--snapshot-dir",
            "snaps",
            "--profile",
            "tablet",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("scene(s) failed"));
}

#[test]
fn test_baseline2_capture_refused_without_gate() {
    let dir = TempDir::new().unwrap();
    sdt_snap(&dir)
        .args([
            "capture",
            "--target",
            "baseline2",
            "--simulate",
            "--snapshot-dir",
            "snaps",
            "--profile",
            "desktop",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ENABLE_BASELINE2"));
    assert!(!dir.path().join("snaps/desktop/baseline2-hero.png").exists());
}

#[test]
fn test_run_without_gate_skips_baseline2() {
    let dir = TempDir::new().unwrap();
    sdt_snap(&dir)
        .args(["run", "--simulate", "--snapshot-dir", "snaps", "--profile", "desktop"])
        .assert()
        .success();
    assert!(dir.path().join("snaps/desktop/baseline-hero.png").exists());
    assert!(dir.path().join("snaps/desktop/current-hero.png").exists());
    assert!(!dir.path().join("snaps/desktop/baseline2-hero.png").exists());
}

#[test]
fn test_run_with_gate_runs_baseline2_suites() {
    let dir = TempDir::new().unwrap();
    sdt_snap(&dir)
        .env("ENABLE_BASELINE2", "1")
        .args([
            "run",
            "--simulate",
            "--snapshot-dir",
            "snaps",
            "--profile",
            "desktop",
            "--json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("baseline2-vs-baseline"))
        .stdout(predicate::str::contains("current-vs-baseline2"));
    assert!(dir.path().join("snaps/desktop/baseline2-hero.png").exists());
}
