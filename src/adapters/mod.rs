//! Invoker interfaces for external tools.
//!
//! Every stage is an external command. Invokers run a command to completion
//! and report its exit code; the orchestrator never sees the tool's output.

pub mod process;

use std::io;
use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::StageCommand;

// Re-export the process invoker
pub use process::ProcessInvoker;

/// Exit code for a program that could not be found (shell convention)
pub const EXIT_NOT_FOUND: i32 = 127;

/// Exit code for a program that exists but cannot be executed
pub const EXIT_NOT_EXECUTABLE: i32 = 126;

/// The tool itself could not be run
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("program '{program}' not found")]
    NotFound { program: String },

    #[error("program '{program}' is not executable")]
    NotExecutable { program: String },

    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to wait for '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl InvocationError {
    /// Classify a spawn error by its OS error kind
    pub fn from_spawn(program: String, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound { program },
            io::ErrorKind::PermissionDenied => Self::NotExecutable { program },
            _ => Self::Spawn { program, source },
        }
    }

    /// Exit code the pipeline reports for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } => EXIT_NOT_FOUND,
            Self::NotExecutable { .. } => EXIT_NOT_EXECUTABLE,
            Self::Spawn { .. } | Self::Wait { .. } => 1,
        }
    }

    /// Program that failed
    pub fn program(&self) -> &str {
        match self {
            Self::NotFound { program }
            | Self::NotExecutable { program }
            | Self::Spawn { program, .. }
            | Self::Wait { program, .. } => program,
        }
    }
}

/// Trait for anything that can run a stage command
#[async_trait]
pub trait Invoker: Send + Sync {
    /// Human-readable invoker name
    fn name(&self) -> &str;

    /// Run a command in `working_dir` and wait for it to exit.
    ///
    /// Returns the exit code; a non-zero code is not an error.
    async fn invoke(&self, command: &StageCommand, working_dir: &Path) -> Result<i32, InvocationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_error_classification() {
        let err = InvocationError::from_spawn(
            "coverage".to_string(),
            io::Error::from(io::ErrorKind::NotFound),
        );
        assert!(matches!(err, InvocationError::NotFound { .. }));
        assert_eq!(err.exit_code(), EXIT_NOT_FOUND);
        assert_eq!(err.program(), "coverage");

        let err = InvocationError::from_spawn(
            "./lint".to_string(),
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert_eq!(err.exit_code(), EXIT_NOT_EXECUTABLE);

        let err = InvocationError::from_spawn(
            "coverage".to_string(),
            io::Error::new(io::ErrorKind::Other, "boom"),
        );
        assert!(matches!(err, InvocationError::Spawn { .. }));
        assert_eq!(err.exit_code(), 1);
    }
}
