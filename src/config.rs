//! Checker configuration.
//!
//! Every constant the checker depends on lives in [`CheckerConfig`]. The defaults
//! reproduce the classic `cacheyCheckers` layout, so running with no config file
//! and no flags builds `cacheSim` with `g++` and checks every fixture there. A YAML file can
//! override any field; command-line flags are applied on top by [`crate::cli`].

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::Deserialize;
use termcolor::ColorChoice;

use crate::diagnostics::{CheckerError, CheckerResult};

/// File picked up from the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "cachey.yaml";

/// When to colorize console output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    /// Resolves the mode against the actual stdout.
    pub fn color_choice(self) -> ColorChoice {
        match self {
            ColorMode::Auto if atty::is(atty::Stream::Stdout) => ColorChoice::Auto,
            ColorMode::Auto => ColorChoice::Never,
            ColorMode::Always => ColorChoice::Always,
            ColorMode::Never => ColorChoice::Never,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckerConfig {
    /// Directory holding the fixtures. Scanned non-recursively.
    pub test_dir: PathBuf,
    pub command_suffix: String,
    pub input_suffix: String,
    pub expected_suffix: String,
    pub actual_suffix: String,
    pub error_suffix: String,

    pub compiler: String,
    pub compiler_flags: Vec<String>,
    pub sources: Vec<PathBuf>,
    /// Executable produced by the build and run for every fixture.
    pub program: PathBuf,
    /// Skip the build and use `program` as it is on disk.
    pub no_build: bool,

    /// Prefix marking the first real argument in a command file.
    pub flag_marker: String,
    /// Flag whose value decides whether a fixture is skipped.
    pub skip_flag: String,
    pub skip_value: String,
    pub skip_label: String,

    /// Case-insensitive substring a fixture name must contain to run.
    pub filter: Option<String>,
    pub verbose: bool,
    /// Exit non-zero when any fixture failed.
    pub strict: bool,
    pub color: ColorMode,
    pub label_width: usize,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            test_dir: PathBuf::from("cacheyCheckers"),
            command_suffix: ".command".to_string(),
            input_suffix: ".in".to_string(),
            expected_suffix: ".out".to_string(),
            actual_suffix: ".YoursOut".to_string(),
            error_suffix: ".err".to_string(),
            compiler: "g++".to_string(),
            compiler_flags: vec!["-std=c++11".into(), "-g".into(), "-Wall".into()],
            sources: vec![PathBuf::from("cacheSim.cpp"), PathBuf::from("cache.cpp")],
            program: PathBuf::from("cacheSim"),
            no_build: false,
            flag_marker: "--".to_string(),
            skip_flag: "--vic-cache".to_string(),
            skip_value: "1".to_string(),
            skip_label: "Victim Cache".to_string(),
            filter: None,
            verbose: false,
            strict: false,
            color: ColorMode::Auto,
            label_width: 15,
        }
    }
}

impl CheckerConfig {
    /// Parses a YAML document. Missing keys keep their defaults.
    pub fn from_yaml_str(source: &str, origin: &Path) -> CheckerResult<Self> {
        // An empty document deserializes to unit, not to a map.
        if source.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(source).map_err(|source| CheckerError::ConfigParse {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml_file(path: &Path) -> CheckerResult<Self> {
        let source = std::fs::read_to_string(path).map_err(|source| CheckerError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&source, path)
    }

    /// Loads `explicit` if given, else `cachey.yaml` from `dir` if it exists,
    /// else the defaults. Relative paths are resolved against `dir`.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> CheckerResult<Self> {
        if let Some(path) = explicit {
            return Self::from_yaml_file(&dir.join(path));
        }
        let implicit = dir.join(DEFAULT_CONFIG_FILE);
        if implicit.is_file() {
            return Self::from_yaml_file(&implicit);
        }
        Ok(Self::default())
    }

    pub fn validate(&self) -> CheckerResult<()> {
        let suffixes = [
            ("command_suffix", &self.command_suffix),
            ("input_suffix", &self.input_suffix),
            ("expected_suffix", &self.expected_suffix),
            ("actual_suffix", &self.actual_suffix),
            ("error_suffix", &self.error_suffix),
        ];
        for (key, value) in suffixes {
            if value.is_empty() {
                return Err(invalid(format!("{key} must not be empty")));
            }
        }
        if self.command_suffix == self.actual_suffix || self.command_suffix == self.error_suffix {
            return Err(invalid(
                "command_suffix must differ from the files the checker writes".to_string(),
            ));
        }
        if self.flag_marker.is_empty() {
            return Err(invalid("flag_marker must not be empty".to_string()));
        }
        if self.skip_flag.is_empty() {
            return Err(invalid("skip_flag must not be empty".to_string()));
        }
        if !self.no_build && self.sources.is_empty() {
            return Err(invalid(
                "sources must name at least one file unless no_build is set".to_string(),
            ));
        }
        Ok(())
    }

    /// Path used to launch the program. Bare relative names get a `./` prefix so
    /// they are not looked up on `PATH`.
    pub fn program_path(&self) -> PathBuf {
        if self.program.is_relative() && !self.program.starts_with(".") {
            Path::new(".").join(&self.program)
        } else {
            self.program.clone()
        }
    }

    /// Display name for the program in build messages.
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }
}

fn invalid(message: String) -> CheckerError {
    CheckerError::ConfigInvalid { message }
}
