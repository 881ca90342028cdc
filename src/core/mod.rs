//! Core orchestration logic.
//!
//! This module contains:
//! - Pipeline: Stage definitions, assembly and validation
//! - Orchestrator: Sequential, short-circuiting execution
//! - Interrupt: Ctrl+C handling between stages

pub mod interrupt;
pub mod orchestrator;
pub mod pipeline;

// Re-export commonly used types
pub use interrupt::InterruptFlag;
pub use orchestrator::Orchestrator;
pub use pipeline::{Pipeline, PipelineError};
