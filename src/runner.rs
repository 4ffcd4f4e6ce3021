//! Runs the fixture battery.
//!
//! The flow is strictly sequential: build once, discover, then for each fixture
//! derive arguments, launch the program with stdout and stderr redirected to
//! files, and classify the result. A fixture's failure is recorded in its
//! [`Outcome`] and never stops the loop; only the build step can abort a run.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use termcolor::WriteColor;

use crate::arguments::{plan_arguments, ArgumentPlan, ArgumentRules};
use crate::compare::{line_diff, outputs_match};
use crate::config::CheckerConfig;
use crate::diagnostics::{CheckerError, CheckerResult};
use crate::discovery::{Fixture, FixtureDiscoverer};
use crate::report::{Outcome, Reporter, Summary};
use crate::toolchain::Builder;

// =============================================================================
// PROCESS EXECUTION
// =============================================================================

/// One launch of the program under test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Executable to launch, already resolved by [`CheckerConfig::program_path`].
    pub program: PathBuf,
    /// Passed as the first positional argument.
    pub input: PathBuf,
    /// Cleaned arguments from the command file, after the input path.
    pub args: Vec<String>,
    /// File that receives the program's stdout (`X.YoursOut`).
    pub stdout: PathBuf,
    /// File that receives the program's stderr (`X.err`).
    pub stderr: PathBuf,
}

/// How the program exited. `code` is `None` when it was killed by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramExit {
    pub code: Option<i32>,
}

impl ProgramExit {
    /// True only for exit code 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Launches the program under test. The checker owns one runner for the whole
/// battery; tests substitute one that writes canned output.
pub trait ProgramRunner {
    /// Runs one invocation to completion. An `Err` means the program could not
    /// be launched at all; a non-zero exit is still `Ok`.
    fn run(&mut self, invocation: &Invocation) -> CheckerResult<ProgramExit>;
}

/// Launches a real child process and blocks until it exits.
#[derive(Debug, Default)]
pub struct ProcessRunner;

impl ProgramRunner for ProcessRunner {
    // TODO: accept an optional deadline and kill the child when it passes;
    // a program that never exits hangs the whole battery here.
    fn run(&mut self, invocation: &Invocation) -> CheckerResult<ProgramExit> {
        let stdout = File::create(&invocation.stdout)
            .map_err(|e| CheckerError::io(&invocation.stdout, e))?;
        let stderr = File::create(&invocation.stderr)
            .map_err(|e| CheckerError::io(&invocation.stderr, e))?;

        let status = Command::new(&invocation.program)
            .arg(&invocation.input)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .status()
            .map_err(|source| CheckerError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        Ok(ProgramExit {
            code: status.code(),
        })
    }
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// Classifies a single fixture. Never fails: every problem becomes an outcome.
pub fn evaluate_fixture(
    fixture: &Fixture,
    config: &CheckerConfig,
    rules: &ArgumentRules,
    runner: &mut dyn ProgramRunner,
) -> Outcome {
    if let Some(filter) = &config.filter {
        if !fixture.name.to_lowercase().contains(&filter.to_lowercase()) {
            return Outcome::Skip {
                reason: "Filtered".to_string(),
            };
        }
    }

    // The preamble is free-form and may be in any encoding; only the flags
    // after it need to be text.
    let command_bytes = match fs::read(&fixture.command) {
        Ok(bytes) => bytes,
        Err(err) => {
            return Outcome::Error {
                reason: format!("unreadable command file: {err}"),
            }
        }
    };
    let command_text = String::from_utf8_lossy(&command_bytes);

    let args = match plan_arguments(&command_text, rules) {
        ArgumentPlan::Skip => {
            return Outcome::Skip {
                reason: config.skip_label.clone(),
            }
        }
        ArgumentPlan::Run(args) => args,
    };

    let invocation = Invocation {
        program: config.program_path(),
        input: fixture.input.clone(),
        args,
        stdout: fixture.actual.clone(),
        stderr: fixture.error_log.clone(),
    };
    let exit = match runner.run(&invocation) {
        Ok(exit) => exit,
        Err(err) => {
            return Outcome::Error {
                reason: err.to_string(),
            }
        }
    };

    let outcome = classify(exit, &fixture.actual, &fixture.expected);
    if outcome == Outcome::Pass {
        remove_error_log(&fixture.error_log);
    }
    outcome
}

/// Exit code first, then empty output, then the diff.
fn classify(exit: ProgramExit, actual: &Path, expected: &Path) -> Outcome {
    if !exit.success() {
        return Outcome::Crash { code: exit.code };
    }

    let actual_bytes = match fs::read(actual) {
        Ok(bytes) => bytes,
        Err(_) => {
            return Outcome::Error {
                reason: "output file missing".to_string(),
            }
        }
    };
    if actual_bytes.is_empty() {
        return Outcome::EmptyOutput;
    }

    let Ok(expected_bytes) = fs::read(expected) else {
        return Outcome::Mismatch;
    };
    if outputs_match(&actual_bytes, &expected_bytes) {
        Outcome::Pass
    } else {
        Outcome::Mismatch
    }
}

/// Best-effort: a log that cannot be removed is left behind and the fixture
/// still passes.
fn remove_error_log(path: &Path) {
    if path.exists() {
        let _ = fs::remove_file(path);
    }
}

// =============================================================================
// BATTERY
// =============================================================================

/// How a run ended when it was not aborted by the build.
#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    /// The fixture directory held no command files.
    NoFixtures,
    Completed(Summary),
}

impl RunStatus {
    /// The checker's own exit code. Failing fixtures only matter in strict mode.
    pub fn exit_code(&self, strict: bool) -> i32 {
        match self {
            RunStatus::Completed(summary) if strict && summary.has_failures() => 1,
            _ => 0,
        }
    }
}

/// One end-to-end run of the battery.
pub struct CheckerRun<'a, W: WriteColor> {
    pub config: &'a CheckerConfig,
    pub builder: &'a dyn Builder,
    pub runner: &'a mut dyn ProgramRunner,
    pub reporter: &'a mut Reporter<W>,
}

impl<'a, W: WriteColor> CheckerRun<'a, W> {
    /// Builds, discovers and runs every fixture in name order. Only build,
    /// discovery and console failures are returned as errors.
    pub fn execute(&mut self) -> CheckerResult<RunStatus> {
        self.build()?;

        let fixtures = FixtureDiscoverer::discover(self.config)?;
        if fixtures.is_empty() {
            let dir = self.config.test_dir.display().to_string();
            self.reporter.no_fixtures(&dir).map_err(console)?;
            return Ok(RunStatus::NoFixtures);
        }

        let rules = ArgumentRules::from_config(self.config);
        let total = fixtures.len();
        let mut summary = Summary::default();
        for (index, fixture) in fixtures.iter().enumerate() {
            self.reporter
                .case_started(index + 1, total, &fixture.name)
                .map_err(console)?;
            let outcome = evaluate_fixture(fixture, self.config, &rules, &mut *self.runner);
            self.reporter.case_finished(&outcome).map_err(console)?;
            if self.config.verbose && outcome == Outcome::Mismatch {
                self.show_diff(fixture)?;
            }
            summary.record(&fixture.name, &outcome);
        }

        self.reporter.summary(&summary).map_err(console)?;
        Ok(RunStatus::Completed(summary))
    }

    fn build(&mut self) -> CheckerResult<()> {
        let compiles = self.builder.compiles();
        if compiles {
            self.reporter
                .compiling(&self.config.program_name())
                .map_err(console)?;
        }
        if let Err(err) = self.builder.build() {
            if compiles {
                self.reporter.build_failed().map_err(console)?;
            }
            return Err(err);
        }
        if compiles {
            self.reporter.compiled().map_err(console)?;
        }
        Ok(())
    }

    fn show_diff(&mut self, fixture: &Fixture) -> CheckerResult<()> {
        let expected = fs::read(&fixture.expected).unwrap_or_default();
        let actual = fs::read(&fixture.actual).unwrap_or_default();
        self.reporter
            .diff(&line_diff(&expected, &actual))
            .map_err(console)
    }
}

fn console(source: std::io::Error) -> CheckerError {
    CheckerError::Console { source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use termcolor::Buffer;

    /// Writes canned output and records every invocation instead of spawning.
    struct ScriptedRunner {
        stdout: String,
        stderr: String,
        code: Option<i32>,
        /// Fixture whose launch fails as if the program were missing.
        unlaunchable: Option<String>,
        calls: Vec<Invocation>,
    }

    impl ScriptedRunner {
        fn new(stdout: &str, code: Option<i32>) -> Self {
            Self {
                stdout: stdout.to_string(),
                stderr: "debug noise\n".to_string(),
                code,
                unlaunchable: None,
                calls: Vec::new(),
            }
        }
    }

    impl ProgramRunner for ScriptedRunner {
        fn run(&mut self, invocation: &Invocation) -> CheckerResult<ProgramExit> {
            self.calls.push(invocation.clone());
            let name = invocation.input.file_stem().unwrap().to_string_lossy();
            if self.unlaunchable.as_deref() == Some(name.as_ref()) {
                return Err(CheckerError::Spawn {
                    program: invocation.program.clone(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
                });
            }
            fs::write(&invocation.stdout, &self.stdout).unwrap();
            fs::write(&invocation.stderr, &self.stderr).unwrap();
            Ok(ProgramExit { code: self.code })
        }
    }

    struct FixedBuild(bool);

    impl Builder for FixedBuild {
        fn build(&self) -> CheckerResult<()> {
            if self.0 {
                Ok(())
            } else {
                Err(CheckerError::BuildFailed { code: Some(1) })
            }
        }
    }

    fn setup(fixtures: &[(&str, &str, &str)]) -> (tempfile::TempDir, CheckerConfig) {
        let dir = tempfile::tempdir().unwrap();
        for (name, command, expected) in fixtures {
            fs::write(dir.path().join(format!("{name}.command")), command).unwrap();
            fs::write(dir.path().join(format!("{name}.in")), "r 0x0\n").unwrap();
            fs::write(dir.path().join(format!("{name}.out")), expected).unwrap();
        }
        let config = CheckerConfig {
            test_dir: dir.path().to_path_buf(),
            ..CheckerConfig::default()
        };
        (dir, config)
    }

    fn evaluate(config: &CheckerConfig, name: &str, runner: &mut ScriptedRunner) -> Outcome {
        let fixture = Fixture::new(&config.test_dir, name, config);
        evaluate_fixture(&fixture, config, &ArgumentRules::from_config(config), runner)
    }

    #[test]
    fn matching_output_passes_and_removes_error_log() {
        let (dir, config) = setup(&[("t1", "sim t --bsize 3", "L1 0.5\n")]);
        let mut runner = ScriptedRunner::new("L1   0.5\n", Some(0));
        assert_eq!(evaluate(&config, "t1", &mut runner), Outcome::Pass);
        assert!(!dir.path().join("t1.err").exists());
        assert!(dir.path().join("t1.YoursOut").exists());
    }

    #[test]
    fn invocation_uses_input_then_cleaned_arguments() {
        let (dir, config) = setup(&[("t1", "--bs 16 --vic-cache 0", "x\n")]);
        let mut runner = ScriptedRunner::new("x\n", Some(0));
        evaluate(&config, "t1", &mut runner);
        let call = &runner.calls[0];
        assert_eq!(call.program, PathBuf::from("./cacheSim"));
        assert_eq!(call.input, dir.path().join("t1.in"));
        assert_eq!(call.args, ["--bs", "16"]);
        assert_eq!(call.stdout, dir.path().join("t1.YoursOut"));
        assert_eq!(call.stderr, dir.path().join("t1.err"));
    }

    #[test]
    fn skip_flag_prevents_launch() {
        let (_dir, config) = setup(&[("t1", "# desc ignore-this --bs 16 --vic-cache 1", "x\n")]);
        let mut runner = ScriptedRunner::new("x\n", Some(0));
        assert_eq!(
            evaluate(&config, "t1", &mut runner),
            Outcome::Skip {
                reason: "Victim Cache".to_string()
            }
        );
        assert!(runner.calls.is_empty());
    }

    #[test]
    fn non_zero_exit_is_crash_and_keeps_log() {
        let (dir, config) = setup(&[("t1", "--bsize 3", "x\n")]);
        let mut runner = ScriptedRunner::new("x\n", Some(139));
        assert_eq!(
            evaluate(&config, "t1", &mut runner),
            Outcome::Crash { code: Some(139) }
        );
        assert!(dir.path().join("t1.err").exists());
    }

    #[test]
    fn empty_output_fails_even_when_reference_is_empty() {
        let (dir, config) = setup(&[("t1", "--bsize 3", "")]);
        let mut runner = ScriptedRunner::new("", Some(0));
        assert_eq!(evaluate(&config, "t1", &mut runner), Outcome::EmptyOutput);
        assert!(dir.path().join("t1.err").exists());
    }

    #[test]
    fn different_output_is_mismatch() {
        let (_dir, config) = setup(&[("t1", "--bsize 3", "L1 0.5\n")]);
        let mut runner = ScriptedRunner::new("L1 0.6\n", Some(0));
        assert_eq!(evaluate(&config, "t1", &mut runner), Outcome::Mismatch);
    }

    #[test]
    fn missing_reference_is_mismatch() {
        let (dir, config) = setup(&[("t1", "--bsize 3", "x\n")]);
        fs::remove_file(dir.path().join("t1.out")).unwrap();
        let mut runner = ScriptedRunner::new("x\n", Some(0));
        assert_eq!(evaluate(&config, "t1", &mut runner), Outcome::Mismatch);
    }

    #[test]
    fn non_utf8_preamble_still_runs() {
        let (dir, config) = setup(&[("t1", "", "x\n")]);
        fs::write(dir.path().join("t1.command"), b"\xf9\xe1\xe5\xed --bsize 3").unwrap();
        let mut runner = ScriptedRunner::new("x\n", Some(0));
        assert_eq!(evaluate(&config, "t1", &mut runner), Outcome::Pass);
        assert_eq!(runner.calls[0].args, ["--bsize", "3"]);
    }

    #[test]
    fn unreadable_command_file_reports_io_error() {
        let (dir, config) = setup(&[("t1", "--bsize 3", "x\n")]);
        fs::remove_file(dir.path().join("t1.command")).unwrap();
        let mut runner = ScriptedRunner::new("x\n", Some(0));
        let Outcome::Error { reason } = evaluate(&config, "t1", &mut runner) else {
            panic!("expected an error outcome");
        };
        assert!(reason.starts_with("unreadable command file: "));
        assert!(reason.len() > "unreadable command file: ".len());
        assert!(runner.calls.is_empty());
    }

    #[test]
    fn invalid_output_bytes_are_compared_exactly() {
        let (dir, config) = setup(&[("t1", "--bsize 3", "")]);
        fs::write(dir.path().join("t1.out"), b"\xfe\n").unwrap();
        let fixture = Fixture::new(&config.test_dir, "t1", &config);
        fs::write(&fixture.actual, b"\xff\n").unwrap();
        let exit = ProgramExit { code: Some(0) };
        assert_eq!(
            classify(exit, &fixture.actual, &fixture.expected),
            Outcome::Mismatch
        );
        fs::write(&fixture.actual, b"\xfe  \n").unwrap();
        assert_eq!(
            classify(exit, &fixture.actual, &fixture.expected),
            Outcome::Pass
        );
    }

    #[test]
    fn filter_skips_non_matching_names() {
        let (_dir, mut config) = setup(&[("alpha", "--bsize 3", "x\n")]);
        config.filter = Some("BETA".to_string());
        let mut runner = ScriptedRunner::new("x\n", Some(0));
        assert_eq!(
            evaluate(&config, "alpha", &mut runner),
            Outcome::Skip {
                reason: "Filtered".to_string()
            }
        );
        config.filter = Some("ALP".to_string());
        assert_eq!(evaluate(&config, "alpha", &mut runner), Outcome::Pass);
    }

    #[test]
    fn full_run_tallies_every_fixture() {
        let (_dir, config) = setup(&[
            ("a", "--bsize 3", "ok\n"),
            ("b", "--bsize 3", "other\n"),
            ("c", "--vic-cache 1", "ok\n"),
        ]);
        let mut runner = ScriptedRunner::new("ok\n", Some(0));
        let mut reporter = Reporter::new(Buffer::no_color(), config.label_width);
        let status = CheckerRun {
            config: &config,
            builder: &FixedBuild(true),
            runner: &mut runner,
            reporter: &mut reporter,
        }
        .execute()
        .unwrap();

        let RunStatus::Completed(summary) = status else {
            panic!("expected a completed run");
        };
        assert_eq!((summary.passed, summary.failed, summary.skipped), (1, 1, 1));
        assert_eq!(summary.total(), 3);
        assert_eq!(runner.calls.len(), 2);

        let text = String::from_utf8(reporter.into_inner().into_inner()).unwrap();
        assert!(text.starts_with("[*] Compiling cacheSim...\n[OK] Compilation successful.\n"));
        assert!(text.contains("[ 33%] Running a              ... PASS\n"));
        assert!(text.contains("[ 66%] Running b              ... FAIL (Mismatch)\n"));
        assert!(text.contains("[100%] Running c              ... SKIP (Victim Cache)\n"));
        assert!(text.contains("50.00 % passed"));
        assert_eq!(RunStatus::Completed(summary.clone()).exit_code(false), 0);
        assert_eq!(RunStatus::Completed(summary).exit_code(true), 1);
    }

    #[test]
    fn launch_failure_is_isolated_to_its_fixture() {
        let (_dir, config) = setup(&[
            ("a", "--bsize 3", "ok\n"),
            ("b", "--bsize 3", "ok\n"),
            ("c", "--bsize 3", "ok\n"),
        ]);
        let mut runner = ScriptedRunner::new("ok\n", Some(0));
        runner.unlaunchable = Some("b".to_string());
        let mut reporter = Reporter::new(Buffer::no_color(), config.label_width);
        let status = CheckerRun {
            config: &config,
            builder: &FixedBuild(true),
            runner: &mut runner,
            reporter: &mut reporter,
        }
        .execute()
        .unwrap();

        let RunStatus::Completed(summary) = status else {
            panic!("expected a completed run");
        };
        assert_eq!((summary.passed, summary.failed, summary.skipped), (2, 1, 0));
        assert_eq!(summary.failed_names, ["b"]);
        assert_eq!(runner.calls.len(), 3);

        let text = String::from_utf8(reporter.into_inner().into_inner()).unwrap();
        assert!(text.contains("[ 66%] Running b              ... ERROR (failed to launch './cacheSim')\n"));
        assert!(text.contains("[100%] Running c              ... PASS\n"));
    }

    #[test]
    fn build_failure_aborts_before_discovery() {
        let (_dir, config) = setup(&[("a", "--bsize 3", "ok\n")]);
        let mut runner = ScriptedRunner::new("ok\n", Some(0));
        let mut reporter = Reporter::new(Buffer::no_color(), config.label_width);
        let result = CheckerRun {
            config: &config,
            builder: &FixedBuild(false),
            runner: &mut runner,
            reporter: &mut reporter,
        }
        .execute();

        assert!(matches!(result, Err(CheckerError::BuildFailed { .. })));
        assert!(runner.calls.is_empty());
        let text = String::from_utf8(reporter.into_inner().into_inner()).unwrap();
        assert!(text.ends_with("[!] Compilation failed!\n"));
        assert!(!text.contains("Running"));
    }

    #[test]
    fn empty_battery_reports_and_stops() {
        let (_dir, config) = setup(&[]);
        let mut runner = ScriptedRunner::new("ok\n", Some(0));
        let mut reporter = Reporter::new(Buffer::no_color(), config.label_width);
        let status = CheckerRun {
            config: &config,
            builder: &FixedBuild(true),
            runner: &mut runner,
            reporter: &mut reporter,
        }
        .execute()
        .unwrap();

        assert_eq!(status, RunStatus::NoFixtures);
        assert_eq!(status.exit_code(true), 0);
        let text = String::from_utf8(reporter.into_inner().into_inner()).unwrap();
        assert!(text.contains("[!] No tests found in folder:"));
        assert!(!text.contains("SUMMARY"));
    }

    #[test]
    fn verbose_mode_prints_diff_after_mismatch() {
        let (_dir, mut config) = setup(&[("a", "--bsize 3", "L1 0.5\nL2 0.1\n")]);
        config.verbose = true;
        let mut runner = ScriptedRunner::new("L1 0.5\nL2 0.2\n", Some(0));
        let mut reporter = Reporter::new(Buffer::no_color(), config.label_width);
        CheckerRun {
            config: &config,
            builder: &FixedBuild(true),
            runner: &mut runner,
            reporter: &mut reporter,
        }
        .execute()
        .unwrap();

        let text = String::from_utf8(reporter.into_inner().into_inner()).unwrap();
        assert!(text.contains("    L1 0.5\n"));
        assert!(text.contains("  - L2 0.1\n"));
        assert!(text.contains("  + L2 0.2\n"));
    }
}
