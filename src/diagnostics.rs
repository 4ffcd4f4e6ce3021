//! Error types for the checker.
//!
//! Only fatal conditions are represented here: a broken configuration, a failed
//! build, or an I/O problem that happens before any fixture runs. Everything that
//! goes wrong inside a single fixture is folded into a [`crate::report::Outcome`]
//! instead, so one bad case never stops the battery.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type CheckerResult<T> = Result<T, CheckerError>;

#[derive(Error, Diagnostic, Debug)]
pub enum CheckerError {
    #[error("could not read config file '{}'", .path.display())]
    #[diagnostic(code(cachey::config::read))]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config file '{}'", .path.display())]
    #[diagnostic(
        code(cachey::config::parse),
        help("unknown keys are rejected; field names use snake_case")
    )]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {message}")]
    #[diagnostic(code(cachey::config::invalid))]
    ConfigInvalid { message: String },

    #[error("failed to launch compiler '{compiler}'")]
    #[diagnostic(
        code(cachey::build::spawn),
        help("is the compiler installed and on PATH?")
    )]
    BuildSpawn {
        compiler: String,
        #[source]
        source: std::io::Error,
    },

    #[error("compilation failed{}", exit_suffix(.code))]
    #[diagnostic(code(cachey::build::failed))]
    BuildFailed { code: Option<i32> },

    #[error("program '{}' does not exist", .path.display())]
    #[diagnostic(
        code(cachey::build::missing_program),
        help("drop --no-build to compile it first")
    )]
    MissingProgram { path: PathBuf },

    #[error("I/O error on '{}'", .path.display())]
    #[diagnostic(code(cachey::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write to the console")]
    #[diagnostic(code(cachey::console))]
    Console {
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk fixture directory")]
    #[diagnostic(code(cachey::discovery))]
    Walk {
        #[source]
        source: walkdir::Error,
    },

    #[error("failed to launch '{}'", .program.display())]
    #[diagnostic(code(cachey::spawn))]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CheckerError {
    /// Wraps an `io::Error` with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CheckerError::Io {
            path: path.into(),
            source,
        }
    }
}

fn exit_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" (exit code {code})"),
        None => " (terminated by signal)".to_string(),
    }
}
