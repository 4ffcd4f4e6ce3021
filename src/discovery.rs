use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::CheckerConfig;
use crate::diagnostics::{CheckerError, CheckerResult};

/// One fixture: every file it owns shares `base` and differs only by suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixture {
    pub name: String,
    pub command: PathBuf,
    pub input: PathBuf,
    pub expected: PathBuf,
    pub actual: PathBuf,
    pub error_log: PathBuf,
}

impl Fixture {
    /// Derives all paths from the fixture directory and its base name.
    pub fn new(dir: &Path, name: &str, config: &CheckerConfig) -> Self {
        let with_suffix = |suffix: &str| dir.join(format!("{name}{suffix}"));
        Self {
            name: name.to_string(),
            command: with_suffix(&config.command_suffix),
            input: with_suffix(&config.input_suffix),
            expected: with_suffix(&config.expected_suffix),
            actual: with_suffix(&config.actual_suffix),
            error_log: with_suffix(&config.error_suffix),
        }
    }
}

/// Finds fixtures by their command file.
#[derive(Debug)]
pub struct FixtureDiscoverer;

impl FixtureDiscoverer {
    /// Lists every command file directly inside `config.test_dir`.
    ///
    /// A missing directory is an empty battery, not an error. The result is
    /// sorted by path so runs are reproducible.
    pub fn discover(config: &CheckerConfig) -> CheckerResult<Vec<Fixture>> {
        let dir = config.test_dir.as_path();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|source| CheckerError::Walk { source })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy();
            if let Some(name) = Self::fixture_name(&file_name, &config.command_suffix) {
                names.push(name.to_string());
            }
        }
        names.sort();

        Ok(names
            .iter()
            .map(|name| Fixture::new(dir, name, config))
            .collect())
    }

    /// Strips the command suffix. Hidden files are ignored, as a shell glob
    /// would.
    fn fixture_name<'a>(file_name: &'a str, suffix: &str) -> Option<&'a str> {
        if file_name.starts_with('.') {
            return None;
        }
        file_name.strip_suffix(suffix).filter(|name| !name.is_empty())
    }
}
