//! CLI smoke tests: exercises the compiled `rcalc` binary's `-e`/`-s` flags
//! as a subprocess, the way a user would invoke it.

use assert_cmd::Command;
use predicates::prelude::*;

fn rcalc() -> Command {
    Command::cargo_bin("rcalc").expect("binary built by this workspace")
}

#[test]
fn execute_flag_prints_the_result() {
    rcalc()
        .args(["-e", "1+2*3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("7"));
}

#[test]
fn execute_flag_reports_an_error_and_fails() {
    rcalc()
        .args(["-e", "1+"])
        .assert()
        .failure()
        .stderr(predicate::str::is_empty().not());
}

#[test]
fn script_flag_runs_a_calc_file() {
    let dir = tempfile_dir();
    let script_path = dir.join("add.calc");
    std::fs::write(&script_path, "a=1\na+41").unwrap();

    rcalc()
        .args(["-s", script_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("42"));
}

#[test]
fn script_flag_rejects_a_non_calc_extension() {
    let dir = tempfile_dir();
    let script_path = dir.join("add.txt");
    std::fs::write(&script_path, "1+1").unwrap();

    rcalc()
        .args(["-s", script_path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains(".calc"));
}

/// A directory under the target's tmp area that lives for the process
/// lifetime; good enough for these short-lived fixture files.
fn tempfile_dir() -> std::path::PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push(format!("rcalc-cli-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn repl_evaluates_one_line_per_program() {
    rcalc()
        .write_stdin("1+1\n2*3\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("2").and(predicate::str::contains("6")));
}
