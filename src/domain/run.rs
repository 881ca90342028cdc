//! Run state: the per-run context, stage results and the final outcome.
//!
//! A run lives for one invocation of the pipeline. Nothing here is persisted.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::artifact::CoverageArtifact;
use super::stage::{FailureKind, PipelineStage};
use crate::core::InterruptFlag;

/// Exit status reported when the operator interrupts a run between stages
pub const EXIT_INTERRUPTED: i32 = 130;

/// Everything a single run needs to know about its caller
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Identifier used to correlate log lines
    pub id: Uuid,

    /// Optional filter forwarded verbatim to the test stage
    pub filter: Option<String>,

    /// Directory every stage runs in
    pub working_dir: PathBuf,

    /// Coverage data shared by the test and report stages
    pub coverage: CoverageArtifact,

    /// Set once the operator asks the run to stop
    pub interrupt: InterruptFlag,
}

impl RunContext {
    /// Create a context for a new run
    pub fn new(filter: Option<String>, working_dir: PathBuf, coverage: CoverageArtifact) -> Self {
        Self {
            id: Uuid::new_v4(),
            filter,
            working_dir,
            coverage,
            interrupt: InterruptFlag::new(),
        }
    }

    /// Use a specific interrupt flag (usually one wired to Ctrl+C)
    pub fn with_interrupt(mut self, interrupt: InterruptFlag) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Working directory for stage processes
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }
}

/// Result of invoking one stage
#[derive(Debug, Clone)]
pub struct StageResult {
    /// The stage that ran
    pub stage: PipelineStage,

    /// Exit code observed (shell conventions for signals and spawn errors)
    pub exit_code: i32,

    /// Wall time from spawn to exit
    pub elapsed: Duration,
}

impl StageResult {
    /// Whether the stage exited cleanly
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every stage exited 0
    Succeeded,

    /// A stage ran and exited non-zero
    Failed {
        stage: String,
        kind: FailureKind,
        exit_code: i32,
    },

    /// A stage's tool could not be started or waited on
    InvocationFailed {
        stage: String,
        error: String,
        exit_code: i32,
    },

    /// The operator interrupted the run; later stages were skipped
    Interrupted { stage: String, exit_code: i32 },
}

impl RunOutcome {
    /// Exit code the process should report
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Succeeded => 0,
            Self::Failed { exit_code, .. }
            | Self::InvocationFailed { exit_code, .. }
            | Self::Interrupted { exit_code, .. } => *exit_code,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Record of a finished run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Run identifier (matches the context)
    pub run_id: Uuid,

    /// When the first stage was started
    pub started_at: DateTime<Utc>,

    /// When the last stage finished
    pub finished_at: DateTime<Utc>,

    /// Results of invoked stages, in invocation order
    pub results: Vec<StageResult>,

    /// Final outcome
    pub outcome: RunOutcome,
}

impl RunReport {
    /// Exit code of the run (that of the last stage attempted)
    pub fn exit_code(&self) -> i32 {
        self.outcome.exit_code()
    }

    /// Names of invoked stages, in order
    pub fn invoked(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.stage.name.as_str()).collect()
    }

    /// Result for a stage, if it was invoked
    pub fn result_for(&self, stage: &str) -> Option<&StageResult> {
        self.results.iter().find(|r| r.stage.name == stage)
    }
}

/// Map an exit code onto the 8-bit status a process can return.
///
/// Truncates like a shell does, but never turns a failure into 0.
pub fn process_status(exit_code: i32) -> u8 {
    let low = (exit_code & 0xff) as u8;
    if exit_code != 0 && low == 0 {
        1
    } else {
        low
    }
}
