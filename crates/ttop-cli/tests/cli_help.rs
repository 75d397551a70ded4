use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_shows_all_commands() {
    cargo_bin_cmd!("ttop")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_run_help_shows_options() {
    cargo_bin_cmd!("ttop")
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--pid"))
        .stdout(predicate::str::contains("--interval-ms"))
        .stdout(predicate::str::contains("--log-file"));
}

#[test]
fn test_version_flag() {
    cargo_bin_cmd!("ttop")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1"));
}
