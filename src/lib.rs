pub use crate::diagnostics::{CheckerError, CheckerResult};

pub mod arguments;
pub mod cli;
pub mod compare;
pub mod config;
pub mod diagnostics;
pub mod discovery;
pub mod report;
pub mod runner;
pub mod toolchain;
