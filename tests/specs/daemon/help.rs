// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon help and version specs
//!
//! Verify otad --help, --version, and related flags work without
//! acquiring the daemon lock (no startup attempt).

use crate::prelude::*;

#[yare::parameterized(
    long = { "--version" },
    short = { "-v" },
    capital = { "-V" },
)]
fn otad_version_shows_version(flag: &str) {
    let output = otad().arg(flag).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.starts_with("otad 0.1.0"),
        "expected version, got: {stdout}"
    );
}

#[yare::parameterized(
    long = { "--help" },
    short = { "-h" },
    word = { "help" },
)]
fn otad_help_shows_usage(flag: &str) {
    let output = otad().arg(flag).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("USAGE:"), "expected USAGE section, got: {stdout}");
    assert!(stdout.contains("OTA_CONFIG"), "expected environment section");
    assert!(stdout.contains("--version"), "expected --version in output");
}

#[test]
fn otad_rejects_unknown_argument() {
    let output = otad().arg("--bogus").output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unexpected argument '--bogus'"));
}
