//! Process-level CLI tests, grounded on
//! `bsharp_cli/tests/parse_cli.rs`'s `assert_cmd` style: run the real
//! `weave` binary and assert on its observable exit status/stderr rather
//! than calling internal functions directly.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn missing_input_module_fails_with_a_clear_message() {
    let mut cmd = Command::cargo_bin("weave").unwrap();
    cmd.arg("no-such-module.dll")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no-such-module.dll"));
}

#[test]
fn unreadable_config_file_fails_before_loading_the_module() {
    let mut cmd = Command::cargo_bin("weave").unwrap();
    cmd.args(["App.dll", "--config", "no-such-config.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file"));
}

#[test]
fn help_lists_every_documented_flag() {
    let mut cmd = Command::cargo_bin("weave").unwrap();
    let assert = cmd.arg("--help").assert().success();
    let out = String::from_utf8_lossy(&assert.get_output().stdout).to_string();

    for flag in [
        "--prefix",
        "--include",
        "--exclude",
        "--output",
        "--no-backup",
        "--backup-dir",
        "--instrument-compiler-generated",
        "--search-dir",
        "--config",
        "--dry-run",
        "--json",
    ] {
        assert!(out.contains(flag), "--help output missing {flag}:\n{out}");
    }
}
