//! checkrun - test, coverage and style gate for a project
//!
//! Runs three external tools in order, stopping at the first failure:
//! the test suite under branch coverage, the coverage report, and a style
//! checker over one source package. The exit status is that of the last
//! tool that ran.
//!
//! # Modules
//!
//! - `adapters`: How stage commands are executed (child processes)
//! - `core`: Orchestration logic (Pipeline, Orchestrator, Interrupt)
//! - `domain`: Data structures (PipelineStage, StageResult, RunContext)
//! - `config`: Layered YAML/env configuration
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Run everything
//! checkrun
//!
//! # Only tests matching a pattern
//! checkrun test_checksum
//!
//! # Show what would run
//! checkrun --dry-run
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use adapters::{InvocationError, Invoker, ProcessInvoker};
pub use core::{InterruptFlag, Orchestrator, Pipeline, PipelineError};
pub use domain::{PipelineStage, RunContext, RunOutcome, RunReport, StageCommand, StageKind, StageResult};
