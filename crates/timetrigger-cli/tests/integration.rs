#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Command with the host/env overrides cleared and a config file pointing
/// MAC discovery at an empty sysfs tree inside `dir`.
fn timetrigger(dir: &TempDir) -> Command {
    let sysfs = dir.path().join("net");
    std::fs::create_dir_all(&sysfs).unwrap();
    let config = dir.path().join("timetrigger.yaml");
    std::fs::write(
        &config,
        format!(
            "host:\n  sysfs_root: {}\n  route_file: {}\n",
            sysfs.display(),
            dir.path().join("route").display()
        ),
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("timetrigger").unwrap();
    for var in [
        "PORT",
        "BIND",
        "EXIT_CODE",
        "HOST_IFACE",
        "HOST_MAC",
        "DISPLAY_OFFSET",
        "TIMETRIGGER_CONFIG",
    ] {
        cmd.env_remove(var);
    }
    cmd.current_dir(dir.path()).arg("--config").arg(&config);
    cmd
}

fn add_iface(dir: &TempDir, name: &str, mac: &str) {
    let iface = dir.path().join("net").join(name);
    std::fs::create_dir_all(iface.join("device")).unwrap();
    std::fs::write(iface.join("address"), format!("{mac}\n")).unwrap();
}

// ---------------------------------------------------------------------------
// timetrigger --version / --help
// ---------------------------------------------------------------------------

#[test]
fn version_flag_succeeds() {
    Command::cargo_bin("timetrigger")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("timetrigger"));
}

// ---------------------------------------------------------------------------
// timetrigger info
// ---------------------------------------------------------------------------

#[test]
fn info_uses_fallback_mac_from_env() {
    let dir = TempDir::new().unwrap();
    timetrigger(&dir)
        .arg("info")
        .env("HOST_MAC", "de:ad:be:ef:00:01")
        .assert()
        .success()
        .stdout(predicate::str::contains("DE:AD:BE:EF:00:01"))
        .stdout(predicate::str::contains("fallback"));
}

#[test]
fn info_reads_interface_mac() {
    let dir = TempDir::new().unwrap();
    add_iface(&dir, "eth0", "00:16:3e:12:34:56");

    let output = timetrigger(&dir)
        .args(["info", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["mac"], "00:16:3E:12:34:56");
    assert_eq!(json["mac_source"]["kind"], "interface");
    assert_eq!(json["mac_source"]["iface"], "eth0");
}

#[test]
fn info_without_any_source_reports_zero_mac() {
    let dir = TempDir::new().unwrap();
    timetrigger(&dir)
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains("00:00:00:00:00:00"));
}

// ---------------------------------------------------------------------------
// timetrigger config
// ---------------------------------------------------------------------------

#[test]
fn config_applies_flag_overrides() {
    let dir = TempDir::new().unwrap();
    let output = timetrigger(&dir)
        .args(["config", "--json", "--port", "8088", "--exit-code", "42"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["config"]["server"]["port"], 8088);
    assert_eq!(json["config"]["exit"]["code"], 42);
    assert_eq!(json["config"]["scheduler"]["poll_interval_ms"], 100);
    assert!(json["warnings"].as_array().unwrap().is_empty());
}

#[test]
fn config_reads_env_overrides() {
    let dir = TempDir::new().unwrap();
    timetrigger(&dir)
        .arg("config")
        .env("PORT", "4321")
        .assert()
        .success()
        .stdout(predicate::str::contains("port: 4321"));
}

#[test]
fn config_rejects_invalid_offset() {
    let dir = TempDir::new().unwrap();
    timetrigger(&dir)
        .args(["config", "--display-offset", "Mars/Olympus"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("display_offset"));
}

#[test]
fn missing_config_file_fails() {
    let dir = TempDir::new().unwrap();
    Command::cargo_bin("timetrigger")
        .unwrap()
        .env_remove("TIMETRIGGER_CONFIG")
        .args(["--config"])
        .arg(dir.path().join("absent.yaml"))
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config"));
}

// ---------------------------------------------------------------------------
// timetrigger serve
// ---------------------------------------------------------------------------

#[test]
fn serve_refuses_invalid_scheduler_config() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("bad.yaml");
    std::fs::write(&config, "scheduler:\n  poll_interval_ms: 0\n").unwrap();

    Command::cargo_bin("timetrigger")
        .unwrap()
        .env_remove("TIMETRIGGER_CONFIG")
        .arg("--config")
        .arg(&config)
        .arg("serve")
        .assert()
        .failure()
        .stderr(predicate::str::contains("poll_interval_ms"));
}
