//! Fixture builders shared by the integration tests.
//!
//! The program under test is `/bin/sh`: the checker passes each fixture's `.in`
//! file as the first argument, so the input doubles as a tiny shell script that
//! decides what the "simulator" prints and how it exits.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub const SHELL: &str = "/bin/sh";

/// Prints a fixed statistics line followed by the arguments it received.
pub const ECHO_ARGS: &str = "echo \"L1 miss rate: 0.25\"\necho \"args: $*\"\n";

/// Writes `<name>.command`, `<name>.in` and, if given, `<name>.out`.
pub fn write_fixture(dir: &Path, name: &str, command: &str, script: &str, expected: Option<&str>) {
    fs::write(dir.join(format!("{name}.command")), command).unwrap();
    fs::write(dir.join(format!("{name}.in")), script).unwrap();
    if let Some(expected) = expected {
        fs::write(dir.join(format!("{name}.out")), expected).unwrap();
    }
}

pub fn fixture_file(dir: &Path, name: &str, suffix: &str) -> PathBuf {
    dir.join(format!("{name}{suffix}"))
}

/// A battery with one fixture of every outcome.
pub fn write_mixed_battery(dir: &Path) {
    write_fixture(
        dir,
        "t1_pass",
        "./cacheSim example1_trace --mem-cyc 100 --bsize 3 --vic-cache 0",
        ECHO_ARGS,
        Some("L1 miss rate:   0.25\nargs:  --mem-cyc 100 --bsize 3\n"),
    );
    write_fixture(
        dir,
        "t2_mismatch",
        "--bsize 4",
        ECHO_ARGS,
        Some("L1 miss rate: 0.50\nargs: --bsize 4\n"),
    );
    write_fixture(dir, "t3_crash", "--bsize 4", "echo boom >&2\nexit 3\n", Some("x\n"));
    write_fixture(dir, "t4_empty", "--bsize 4", "exit 0\n", Some(""));
    write_fixture(
        dir,
        "t5_victim",
        "# desc ignore-this --bs 16 --vic-cache 1",
        ECHO_ARGS,
        Some("never compared\n"),
    );
}
