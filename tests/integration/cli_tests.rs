//! Binary smoke tests

use crate::common::zip_bytes;
use assert_cmd::{cargo::cargo_bin_cmd, Command};
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn appfetch(config: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("appfetch");
    cmd.env("APPFETCH_CONFIG", config);
    cmd
}

/// Config file pointing the work directory into `dir`
fn write_config(dir: &TempDir) -> std::path::PathBuf {
    let config = dir.path().join("config.toml");
    let work = dir.path().join("work");
    std::fs::write(
        &config,
        format!("[cache]\nwork_dir = {:?}\n", work.to_str().unwrap()),
    )
    .unwrap();
    config
}

#[test]
fn help_displays() {
    let dir = TempDir::new().unwrap();
    appfetch(&dir.path().join("config.toml"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("resolve application bundles"));
}

#[test]
fn version_displays() {
    let dir = TempDir::new().unwrap();
    appfetch(&dir.path().join("config.toml"))
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("appfetch"));
}

#[test]
fn config_path_follows_env() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("custom.toml");
    appfetch(&config)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("custom.toml"));
}

#[test]
fn config_init_then_show() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("nested").join("config.toml");

    appfetch(&config).args(["config", "init"]).assert().success();
    assert!(config.is_file());

    appfetch(&config)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[general]").and(predicate::str::contains("max_entries")));
}

#[test]
fn invalid_config_is_reported() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "[cache\n").unwrap();

    appfetch(&config)
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"));
}

#[test]
fn fetch_missing_path_fails() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);
    appfetch(&config)
        .args(["fetch", "/no/such/app.apk", "-e", ".apk"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"))
        .stderr(predicate::str::contains("Hint:"));
}

#[test]
fn fetch_requires_extensions() {
    let dir = TempDir::new().unwrap();
    appfetch(&dir.path().join("config.toml"))
        .args(["fetch", "/tmp/app.apk"])
        .assert()
        .failure();
}

#[test]
fn fetch_local_bundle_prints_path() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);
    let app = dir.path().join("app.apk");
    std::fs::write(&app, b"apk").unwrap();

    appfetch(&config)
        .args(["fetch", app.to_str().unwrap(), "--ext", "apk"])
        .assert()
        .success()
        .stdout(predicate::str::contains(app.to_str().unwrap()));
}

#[test]
fn fetch_with_sweep_removes_extracted_bundle() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);
    let archive = dir.path().join("build.zip");
    std::fs::write(&archive, zip_bytes(&[("app.apk", "apk")])).unwrap();

    let output = appfetch(&config)
        .args(["fetch", archive.to_str().unwrap(), "-e", ".apk", "--sweep"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let printed = String::from_utf8(output.stdout).unwrap();
    let bundle = Path::new(printed.trim());
    assert!(bundle.starts_with(dir.path().join("work").join("apps")));
    assert!(!bundle.exists());
    assert!(archive.is_file());
}
