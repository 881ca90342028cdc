//! Main orchestrator for pipeline execution.
//!
//! Runs stages strictly in order. The first stage that exits non-zero (or
//! cannot be started) ends the run; its exit code becomes the run's.
//! Dependencies always point backwards, so no stage runs after a failed
//! dependency.
//!
//! Stage failures log at `info`; at the default level only the tools' own
//! output reaches the terminal.

use std::time::Instant;

use chrono::Utc;
use tracing::{error, info, instrument, warn};

use crate::adapters::{Invoker, ProcessInvoker};
use crate::domain::{PipelineStage, RunContext, RunOutcome, RunReport, StageResult, EXIT_INTERRUPTED};

use super::pipeline::{Pipeline, PipelineError};

/// Main pipeline orchestrator
pub struct Orchestrator<I = ProcessInvoker> {
    /// Invoker used for every stage
    invoker: I,
}

impl Default for Orchestrator<ProcessInvoker> {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator<ProcessInvoker> {
    /// Create an orchestrator that runs stages as child processes
    pub fn new() -> Self {
        Self::with_invoker(ProcessInvoker::new())
    }
}

impl<I: Invoker> Orchestrator<I> {
    /// Create an orchestrator around a specific invoker
    pub fn with_invoker(invoker: I) -> Self {
        Self { invoker }
    }

    /// Access the invoker
    pub fn invoker(&self) -> &I {
        &self.invoker
    }

    /// Execute a pipeline
    #[instrument(skip_all, fields(run_id = %ctx.id, pipeline = %pipeline.name))]
    pub async fn run(&self, pipeline: &Pipeline, ctx: &RunContext) -> Result<RunReport, PipelineError> {
        pipeline.validate()?;
        info!(stages = pipeline.stages.len(), filter = ?ctx.filter, "Starting pipeline");

        let started_at = Utc::now();
        let mut results: Vec<StageResult> = Vec::with_capacity(pipeline.stages.len());
        let mut outcome = RunOutcome::Succeeded;

        for stage in &pipeline.stages {
            if ctx.interrupt.is_set() {
                warn!(stage = %stage.name, "Interrupted before stage start");
                outcome = RunOutcome::Interrupted {
                    stage: stage.name.clone(),
                    exit_code: EXIT_INTERRUPTED,
                };
                break;
            }

            let (result, stage_outcome) = self.execute_stage(stage, ctx).await;
            results.push(result);

            if let Some(stage_outcome) = stage_outcome {
                outcome = stage_outcome;
                break;
            }
        }

        let report = RunReport {
            run_id: ctx.id,
            started_at,
            finished_at: Utc::now(),
            results,
            outcome,
        };

        match &report.outcome {
            RunOutcome::Succeeded => info!("Pipeline completed successfully"),
            other => info!(exit_code = other.exit_code(), "Pipeline stopped"),
        }

        Ok(report)
    }

    /// Run one stage; returns the terminal outcome when the run must stop
    async fn execute_stage(
        &self,
        stage: &PipelineStage,
        ctx: &RunContext,
    ) -> (StageResult, Option<RunOutcome>) {
        let command = stage.command.resolve(ctx.working_dir());
        info!(stage = %stage.name, %command, "Running stage");
        let stage_start = Instant::now();

        let invoked = self.invoker.invoke(&command, ctx.working_dir()).await;
        let elapsed = stage_start.elapsed();
        let elapsed_ms = elapsed.as_millis() as u64;

        let (exit_code, outcome) = match invoked {
            Ok(0) => {
                info!(stage = %stage.name, elapsed_ms, "Stage succeeded");
                (0, None)
            }
            Ok(code) => {
                let kind = stage.kind.failure_kind();
                info!(stage = %stage.name, exit_code = code, elapsed_ms, %kind, "Stage failed");
                let outcome = RunOutcome::Failed {
                    stage: stage.name.clone(),
                    kind,
                    exit_code: code,
                };
                (code, Some(outcome))
            }
            Err(e) => {
                let code = e.exit_code();
                error!(
                    stage = %stage.name,
                    program = %e.program(),
                    exit_code = code,
                    error = %e,
                    "Tool invocation failed"
                );
                let outcome = RunOutcome::InvocationFailed {
                    stage: stage.name.clone(),
                    error: e.to_string(),
                    exit_code: code,
                };
                (code, Some(outcome))
            }
        };

        // Whatever the stage did, an interrupt stops the run here
        let outcome = match outcome {
            None if ctx.interrupt.is_set() => {
                warn!(stage = %stage.name, "Interrupted, skipping remaining stages");
                Some(RunOutcome::Interrupted {
                    stage: stage.name.clone(),
                    exit_code: EXIT_INTERRUPTED,
                })
            }
            other => other,
        };

        let result = StageResult {
            stage: stage.clone(),
            exit_code,
            elapsed,
        };

        (result, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orchestrator_creation() {
        let orchestrator = Orchestrator::new();
        assert_eq!(orchestrator.invoker().name(), "process");
    }
}
