//! Command-line interface for checkrun.
//!
//! `checkrun [FILTER]` runs the tests under coverage, prints the coverage
//! report and checks style, stopping at the first stage that fails.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use crate::config::{self, ResolvedConfig};
use crate::core::{InterruptFlag, Orchestrator, Pipeline};
use crate::domain::{process_status, CoverageArtifact, RunContext};

/// checkrun - run tests under coverage, report coverage, check style
#[derive(Parser, Debug)]
#[command(name = "checkrun")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Narrow which tests run (forwarded verbatim to the test runner)
    pub filter: Option<String>,

    /// Config file (skips discovery); relative to the current directory, not --dir
    #[arg(short, long, env = "CHECKRUN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory to run in
    #[arg(short = 'C', long = "dir")]
    pub dir: Option<PathBuf>,

    /// Print the stage commands without running them
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Show resolved configuration and exit
    #[arg(long)]
    pub show_config: bool,

    /// Verbose logging (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Log filter used when RUST_LOG is not set
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }

    /// Execute the pipeline (or the requested inspection)
    pub async fn execute(self) -> Result<ExitCode> {
        let working_dir = match self.dir {
            Some(ref dir) => dir
                .canonicalize()
                .with_context(|| format!("Invalid working directory: {}", dir.display()))?,
            None => std::env::current_dir().context("Failed to determine current directory")?,
        };

        let cfg = config::load(self.config.as_deref(), &working_dir)?;
        debug!(config_file = ?cfg.config_file, "Configuration loaded");

        if self.show_config {
            show_config(&cfg, &working_dir);
            return Ok(ExitCode::SUCCESS);
        }

        let coverage = CoverageArtifact::resolve(&working_dir, &cfg.coverage.data_file);
        let ctx = RunContext::new(self.filter, working_dir, coverage);
        let pipeline = Pipeline::standard(&cfg, &ctx)?;

        if self.dry_run {
            for stage in &pipeline.stages {
                println!("{}: {}", stage.name, stage.command.resolve(ctx.working_dir()));
            }
            return Ok(ExitCode::SUCCESS);
        }

        let interrupt = InterruptFlag::new();
        let listener = interrupt.listen_for_ctrl_c();
        let ctx = ctx.with_interrupt(interrupt);

        let report = Orchestrator::new().run(&pipeline, &ctx).await?;
        listener.abort();

        Ok(ExitCode::from(process_status(report.exit_code())))
    }
}

/// Print the resolved configuration
fn show_config(cfg: &ResolvedConfig, working_dir: &std::path::Path) {
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!("Working directory: {}", working_dir.display());
    println!();
    println!("Tests:");
    println!("  Root:    {}", cfg.tests.root.display());
    println!("  Runner:  {}", cfg.tests.runner.join(" "));
    println!();
    println!("Coverage:");
    println!("  Program:      {}", cfg.coverage.program);
    println!("  Branch:       {}", cfg.coverage.branch);
    println!("  Include:      {}", cfg.coverage.include);
    println!("  Show missing: {}", cfg.coverage.show_missing);
    println!(
        "  Data file:    {}",
        CoverageArtifact::resolve(working_dir, &cfg.coverage.data_file)
            .data_file()
            .display()
    );
    println!();
    println!("Style:");
    println!("  Program: {}", cfg.style.program);
    println!("  Target:  {}", cfg.style.package.join(&cfg.style.pattern).display());
    if !cfg.style.args.is_empty() {
        println!("  Args:    {}", cfg.style.args.join(" "));
    }
}
