//! The `cachey` command line.
//!
//! Resolves the configuration (defaults, then a YAML file, then flags), wires
//! the real compiler and process runner into a [`CheckerRun`], and turns the
//! result into the process exit code.

use std::path::{Path, PathBuf};

use clap::Parser;
use miette::Report;
use termcolor::StandardStream;

use crate::config::{CheckerConfig, ColorMode};
use crate::diagnostics::{CheckerError, CheckerResult};
use crate::report::Reporter;
use crate::runner::{CheckerRun, ProcessRunner};
use crate::toolchain::builder_for;

#[derive(Debug, Parser)]
#[command(
    name = "cachey",
    version,
    about = "Builds the cache simulator and checks it against a directory of fixtures."
)]
pub struct CheckerArgs {
    /// YAML config file. Defaults to ./cachey.yaml when present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory containing the .command/.in/.out fixtures.
    #[arg(long)]
    pub test_dir: Option<PathBuf>,

    /// Program to build and run.
    #[arg(long)]
    pub program: Option<PathBuf>,

    /// C++ compiler used for the build step.
    #[arg(long)]
    pub compiler: Option<String>,

    /// Use the existing program instead of compiling it.
    #[arg(long)]
    pub no_build: bool,

    /// Only run fixtures whose name contains this text (case-insensitive).
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Print a line diff for every mismatching fixture.
    #[arg(short, long)]
    pub verbose: bool,

    /// Exit with status 1 when any fixture fails.
    #[arg(long)]
    pub strict: bool,

    /// When to colorize output.
    #[arg(long, value_enum)]
    pub color: Option<ColorMode>,
}

impl CheckerArgs {
    /// Overlays the flags that were given onto `config`. Flags win over
    /// whatever the config file said; boolean flags can only switch on.
    pub fn apply(&self, config: &mut CheckerConfig) {
        if let Some(dir) = &self.test_dir {
            config.test_dir = dir.clone();
        }
        if let Some(program) = &self.program {
            config.program = program.clone();
        }
        if let Some(compiler) = &self.compiler {
            config.compiler = compiler.clone();
        }
        if let Some(filter) = &self.filter {
            config.filter = Some(filter.clone());
        }
        if let Some(color) = self.color {
            config.color = color;
        }
        config.no_build |= self.no_build;
        config.verbose |= self.verbose;
        config.strict |= self.strict;
    }

    /// Loads the config relative to `cwd`, applies the flags and validates
    /// the result.
    pub fn resolve(&self, cwd: &Path) -> CheckerResult<CheckerConfig> {
        let mut config = CheckerConfig::load(self.config.as_deref(), cwd)?;
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }
}

/// Entry point used by the binary. Returns the process exit code.
pub fn run() -> i32 {
    let args = CheckerArgs::parse();
    match execute(&args) {
        Ok(code) => code,
        Err(err) => {
            if needs_report(&err) {
                eprintln!("{:?}", Report::new(err));
            }
            1
        }
    }
}

/// A failed compile is reported by the compiler itself; every other fatal
/// error gets a miette report on stderr.
fn needs_report(err: &CheckerError) -> bool {
    !matches!(err, CheckerError::BuildFailed { .. })
}

fn execute(args: &CheckerArgs) -> CheckerResult<i32> {
    let cwd = std::env::current_dir().map_err(|e| CheckerError::io(".", e))?;
    let config = args.resolve(&cwd)?;

    let builder = builder_for(&config);
    let mut runner = ProcessRunner;
    let stdout = StandardStream::stdout(config.color.color_choice());
    let mut reporter = Reporter::new(stdout, config.label_width);

    let status = CheckerRun {
        config: &config,
        builder: builder.as_ref(),
        runner: &mut runner,
        reporter: &mut reporter,
    }
    .execute()?;
    Ok(status.exit_code(config.strict))
}
