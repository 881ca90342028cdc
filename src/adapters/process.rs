//! Subprocess invoker.
//!
//! Spawns the stage command with the parent's stdin, stdout and stderr so the
//! tool's output reaches the caller unbuffered and untouched.

use std::path::Path;
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{InvocationError, Invoker};
use crate::domain::StageCommand;

/// Invoker that runs commands as child processes
#[derive(Debug, Clone, Default)]
pub struct ProcessInvoker;

impl ProcessInvoker {
    pub fn new() -> Self {
        Self
    }
}

/// Exit code of a finished process, following shell conventions for signals
pub fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}

#[async_trait]
impl Invoker for ProcessInvoker {
    fn name(&self) -> &str {
        "process"
    }

    async fn invoke(&self, command: &StageCommand, working_dir: &Path) -> Result<i32, InvocationError> {
        let program = command.program_name();
        debug!(%program, dir = %working_dir.display(), "Spawning stage process");

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .envs(command.env.iter().map(|(k, v)| (k, v)))
            .current_dir(working_dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| InvocationError::from_spawn(program.clone(), e))?;

        let status = child
            .wait()
            .await
            .map_err(|source| InvocationError::Wait { program, source })?;

        Ok(exit_code_of(status))
    }
}
