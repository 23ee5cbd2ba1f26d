//! Smoke tests for the `mrd` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn mrd(config_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("mrd").unwrap();
    cmd.env("NO_COLOR", "1")
        .env("MORED_CONFIG", config_dir.join("config.toml"))
        .current_dir(config_dir);
    cmd
}

fn write_kit(root: &Path, dir: &str, descriptor: &str) {
    let path = root.join(dir);
    fs::create_dir_all(&path).unwrap();
    fs::write(path.join("Mored.yaml"), descriptor).unwrap();
    fs::write(path.join("kit.sh"), "#!/bin/sh\necho ok\n").unwrap();
}

#[test]
fn help_lists_subcommands() {
    let tmp = TempDir::new().unwrap();
    mrd(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("store"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("extract"));
}

#[test]
fn version_flag() {
    let tmp = TempDir::new().unwrap();
    mrd(tmp.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("mrd "));
}

#[test]
fn check_accepts_valid_tree() {
    let tmp = TempDir::new().unwrap();
    write_kit(tmp.path(), "tools", "name: tools\nversion: 1.0.0\n");

    mrd(tmp.path())
        .args(["check", "."])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 package(s) valid"));
}

#[test]
fn check_reports_every_violation() {
    let tmp = TempDir::new().unwrap();
    write_kit(tmp.path(), "bad", "name: 9bad\nversion: \"1.0\"\n");

    mrd(tmp.path())
        .args(["check", "."])
        .assert()
        .failure()
        .stderr(predicate::str::contains("name '9bad'"))
        .stderr(predicate::str::contains("version '1.0'"))
        .stderr(predicate::str::contains("failed validation"));
}

#[test]
fn check_without_packages_fails() {
    let tmp = TempDir::new().unwrap();
    mrd(tmp.path())
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No kits or suites found"));
}

#[test]
fn build_kit_writes_archive() {
    let tmp = TempDir::new().unwrap();
    write_kit(tmp.path(), "tools", "name: MyTools\nversion: 1.2.0\n");

    mrd(tmp.path())
        .args(["build", "kit", "--dist", "dist"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 built"));

    assert!(tmp.path().join("dist/kit/my_tools_1.2.0.tar.gz").is_file());
    assert!(!tmp.path().join("dist/index.yaml").exists());
}

#[test]
fn build_dry_run_touches_nothing() {
    let tmp = TempDir::new().unwrap();
    write_kit(tmp.path(), "tools", "name: tools\nversion: 1.0.0\n");

    mrd(tmp.path())
        .args(["--dry-run", "build", "kit"])
        .assert()
        .success()
        .stdout(predicate::str::contains("would build tools 1.0.0"));

    assert!(!tmp.path().join("dist").exists());
}

#[test]
fn push_without_store_config_fails() {
    let tmp = TempDir::new().unwrap();
    write_kit(tmp.path(), "tools", "name: tools\nversion: 1.0.0\n");

    mrd(tmp.path())
        .args(["build", "kit", "--push"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("store configuration is incomplete"));

    assert!(!tmp.path().join("dist").exists());
}

#[test]
fn store_saves_config_with_defaults() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("store.toml");

    mrd(tmp.path())
        .arg("--config")
        .arg(&path)
        .args([
            "store",
            "--endpoint",
            "oss-cn-hangzhou.aliyuncs.com",
            "--key",
            "AK",
            "--secret",
            "SK",
            "--bucket",
            "mored",
        ])
        .assert()
        .success();

    let saved = fs::read_to_string(&path).unwrap();
    assert!(saved.contains("[store]"));
    assert!(saved.contains("https://mored.oss-cn-hangzhou.aliyuncs.com"));
    assert!(saved.contains("prefix = \"repo\""));
}

#[test]
fn store_accepts_short_flags() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("store.toml");

    mrd(tmp.path())
        .arg("-c")
        .arg(&path)
        .args([
            "store",
            "-p",
            "oss-cn-hangzhou.aliyuncs.com",
            "-k",
            "AK",
            "-s",
            "SK",
            "-b",
            "mored",
            "-d",
            "https://cdn.example.com",
        ])
        .assert()
        .success();

    let saved = fs::read_to_string(&path).unwrap();
    assert!(saved.contains("endpoint = \"oss-cn-hangzhou.aliyuncs.com\""));
    assert!(saved.contains("bucket = \"mored\""));
    assert!(saved.contains("https://cdn.example.com"));
    assert!(!saved.contains("https://mored.oss-cn-hangzhou.aliyuncs.com"));
}

#[test]
fn build_with_skipped_kits_exits_zero() {
    let tmp = TempDir::new().unwrap();
    write_kit(tmp.path(), "good", "name: good\nversion: 1.0.0\n");
    write_kit(tmp.path(), "bad", "name: 9bad\nversion: 1.0.0\n");

    mrd(tmp.path())
        .args(["build", "kit", "--strict"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 built"));

    assert!(tmp.path().join("dist/kit/good_1.0.0.tar.gz").is_file());
}

#[test]
fn extract_unpacks_built_archive() {
    let tmp = TempDir::new().unwrap();
    write_kit(tmp.path(), "tools", "name: tools\nversion: 1.0.0\n");

    mrd(tmp.path()).args(["build", "kit"]).assert().success();

    mrd(tmp.path())
        .args(["extract", "dist/kit/tools_1.0.0.tar.gz", "--dest", "out"])
        .assert()
        .success();

    assert!(tmp.path().join("out/tools/kit.sh").is_file());
    assert!(tmp.path().join("out/tools/Mored.yaml").is_file());
}
