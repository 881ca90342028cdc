//! Domain types for the check pipeline.
//!
//! This module contains the core data structures:
//! - Stage: External commands and how they are gated
//! - Run: Per-run context, stage results and outcome
//! - Artifact: The coverage data handed from test to report

pub mod artifact;
pub mod run;
pub mod stage;

// Re-export commonly used types
pub use artifact::{CoverageArtifact, COVERAGE_FILE_ENV};
pub use run::{process_status, RunContext, RunOutcome, RunReport, StageResult, EXIT_INTERRUPTED};
pub use stage::{expand_pattern, FailureKind, PipelineStage, StageCommand, StageKind};
