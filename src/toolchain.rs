//! The build step that runs once before any fixture.

use std::path::PathBuf;
use std::process::Command;

use crate::config::CheckerConfig;
use crate::diagnostics::{CheckerError, CheckerResult};

/// Produces the program under test.
pub trait Builder {
    /// False for builders that only check an existing binary; the compile
    /// banner is not printed for them.
    fn compiles(&self) -> bool {
        true
    }

    fn build(&self) -> CheckerResult<()>;
}

/// Compiles the sources with the configured C++ compiler. Compiler output goes
/// straight to the terminal.
#[derive(Debug, Clone)]
pub struct CompilerBuild {
    pub compiler: String,
    pub flags: Vec<String>,
    pub sources: Vec<PathBuf>,
    pub output: PathBuf,
}

impl CompilerBuild {
    pub fn from_config(config: &CheckerConfig) -> Self {
        Self {
            compiler: config.compiler.clone(),
            flags: config.compiler_flags.clone(),
            sources: config.sources.clone(),
            output: config.program.clone(),
        }
    }

    /// `<compiler> <flags> -o <output> <sources>`
    pub fn command(&self) -> Command {
        let mut command = Command::new(&self.compiler);
        command
            .args(&self.flags)
            .arg("-o")
            .arg(&self.output)
            .args(&self.sources);
        command
    }
}

impl Builder for CompilerBuild {
    fn build(&self) -> CheckerResult<()> {
        let status = self
            .command()
            .status()
            .map_err(|source| CheckerError::BuildSpawn {
                compiler: self.compiler.clone(),
                source,
            })?;
        if !status.success() {
            return Err(CheckerError::BuildFailed {
                code: status.code(),
            });
        }
        Ok(())
    }
}

/// Uses a program that is already on disk.
#[derive(Debug, Clone)]
pub struct Prebuilt {
    pub program: PathBuf,
}

impl Builder for Prebuilt {
    fn compiles(&self) -> bool {
        false
    }

    fn build(&self) -> CheckerResult<()> {
        if !self.program.is_file() {
            return Err(CheckerError::MissingProgram {
                path: self.program.clone(),
            });
        }
        Ok(())
    }
}

/// Picks the builder the config asks for.
pub fn builder_for(config: &CheckerConfig) -> Box<dyn Builder> {
    if config.no_build {
        Box::new(Prebuilt {
            program: config.program_path(),
        })
    } else {
        Box::new(CompilerBuild::from_config(config))
    }
}
