//! Pipeline definitions and assembly.
//!
//! A pipeline is an ordered list of stages. Each stage may name an earlier
//! stage it depends on; the standard pipeline chains test, coverage report
//! and style check in that order.

use thiserror::Error;

use crate::config::ResolvedConfig;
use crate::domain::{PipelineStage, RunContext, StageCommand, StageKind};

/// Pipeline construction and validation errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Pipeline '{0}' must have at least one stage")]
    Empty(String),

    #[error("Stage {0} has an empty name")]
    EmptyStageName(usize),

    #[error("Stage name '{0}' is used more than once")]
    DuplicateStage(String),

    #[error("Stage '{stage}' depends on non-existent stage '{depends_on}'")]
    UnknownDependency { stage: String, depends_on: String },

    #[error("Stage '{stage}' depends on later stage '{depends_on}' (forward references not allowed)")]
    ForwardDependency { stage: String, depends_on: String },
}

/// A complete pipeline definition
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Pipeline name (for logs)
    pub name: String,

    /// Ordered list of stages to execute
    pub stages: Vec<PipelineStage>,
}

impl Pipeline {
    /// Create a pipeline from stages
    pub fn new(name: impl Into<String>, stages: Vec<PipelineStage>) -> Self {
        Self {
            name: name.into(),
            stages,
        }
    }

    /// Assemble the test, coverage and style stages for a run
    pub fn standard(config: &ResolvedConfig, ctx: &RunContext) -> Result<Self, PipelineError> {
        let test = PipelineStage::new(StageKind::Test, test_command(config, ctx));
        let coverage = PipelineStage::new(StageKind::Coverage, coverage_command(config, ctx))
            .after(StageKind::Test.default_name());
        let style = PipelineStage::new(StageKind::Style, style_command(config))
            .after(StageKind::Coverage.default_name());

        let pipeline = Self::new("check", vec![test, coverage, style]);
        pipeline.validate()?;
        Ok(pipeline)
    }

    /// Validate the pipeline definition
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.stages.is_empty() {
            return Err(PipelineError::Empty(self.name.clone()));
        }

        for (i, stage) in self.stages.iter().enumerate() {
            if stage.name.is_empty() {
                return Err(PipelineError::EmptyStageName(i));
            }

            if self.stages[..i].iter().any(|s| s.name == stage.name) {
                return Err(PipelineError::DuplicateStage(stage.name.clone()));
            }

            if let Some(ref depends_on) = stage.depends_on {
                match self.stage_index(depends_on) {
                    Some(idx) if idx >= i => {
                        return Err(PipelineError::ForwardDependency {
                            stage: stage.name.clone(),
                            depends_on: depends_on.clone(),
                        });
                    }
                    None => {
                        return Err(PipelineError::UnknownDependency {
                            stage: stage.name.clone(),
                            depends_on: depends_on.clone(),
                        });
                    }
                    _ => {}
                }
            }
        }

        Ok(())
    }

    /// Get a stage by name
    pub fn get_stage(&self, name: &str) -> Option<&PipelineStage> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Get the index of a stage by name
    pub fn stage_index(&self, name: &str) -> Option<usize> {
        self.stages.iter().position(|s| s.name == name)
    }
}

/// `coverage run --branch -m unittest discover <root> [<filter>]`
fn test_command(config: &ResolvedConfig, ctx: &RunContext) -> StageCommand {
    let mut cmd = StageCommand::new(&config.coverage.program).arg("run");
    if config.coverage.branch {
        cmd = cmd.arg("--branch");
    }
    cmd = cmd
        .args(&config.tests.runner)
        .arg(config.tests.root.as_os_str());
    if let Some(ref filter) = ctx.filter {
        cmd = cmd.arg(filter);
    }
    ctx.coverage.bind(cmd)
}

/// `coverage report --include <scope> -m`
fn coverage_command(config: &ResolvedConfig, ctx: &RunContext) -> StageCommand {
    let mut cmd = StageCommand::new(&config.coverage.program)
        .arg("report")
        .arg("--include")
        .arg(&config.coverage.include);
    if config.coverage.show_missing {
        cmd = cmd.arg("-m");
    }
    ctx.coverage.bind(cmd)
}

/// `pycodestyle <package>/*.py`; the glob is expanded when the stage starts
fn style_command(config: &ResolvedConfig) -> StageCommand {
    let target = config.style.package.join(&config.style.pattern);
    StageCommand::new(&config.style.program)
        .args(&config.style.args)
        .pattern(target.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    use crate::domain::CoverageArtifact;
    use tempfile::TempDir;

    fn project() -> TempDir {
        let temp = TempDir::new().unwrap();
        let pkg = temp.path().join("romlib");
        std::fs::create_dir_all(&pkg).unwrap();
        std::fs::write(pkg.join("rommap.py"), "").unwrap();
        std::fs::write(pkg.join("field.py"), "").unwrap();
        std::fs::write(pkg.join("README"), "").unwrap();
        temp
    }

    fn context(dir: &Path, filter: Option<&str>) -> RunContext {
        let coverage = CoverageArtifact::resolve(dir, Path::new(".coverage"));
        RunContext::new(filter.map(str::to_string), dir.to_path_buf(), coverage)
    }

    fn config() -> ResolvedConfig {
        let mut config = ResolvedConfig::default();
        config.style.package = PathBuf::from("romlib");
        config
    }

    fn args(cmd: &StageCommand) -> Vec<String> {
        cmd.args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_standard_pipeline_layout() {
        let temp = project();
        let pipeline = Pipeline::standard(&config(), &context(temp.path(), None)).unwrap();

        let names: Vec<&str> = pipeline.stages.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["test", "coverage", "style"]);
        assert_eq!(pipeline.stages[0].depends_on, None);
        assert_eq!(pipeline.stages[1].depends_on.as_deref(), Some("test"));
        assert_eq!(pipeline.stages[2].depends_on.as_deref(), Some("coverage"));
    }

    #[test]
    fn test_test_command_without_filter() {
        let temp = project();
        let pipeline = Pipeline::standard(&config(), &context(temp.path(), None)).unwrap();
        let test = &pipeline.stages[0].command;

        assert_eq!(test.program, "coverage");
        assert_eq!(args(test), vec!["run", "--branch", "-m", "unittest", "discover", "tests"]);
    }

    #[test]
    fn test_filter_forwarded_verbatim() {
        let temp = project();
        let ctx = context(temp.path(), Some("test_checksum"));
        let pipeline = Pipeline::standard(&config(), &ctx).unwrap();

        let test_args = args(&pipeline.stages[0].command);
        assert_eq!(test_args.last().map(String::as_str), Some("test_checksum"));
        // The filter only narrows the test stage
        assert!(!args(&pipeline.stages[1].command).contains(&"test_checksum".to_string()));
    }

    #[test]
    fn test_coverage_stages_share_data_file() {
        let temp = project();
        let pipeline = Pipeline::standard(&config(), &context(temp.path(), None)).unwrap();
        assert_eq!(pipeline.stages[0].command.env, pipeline.stages[1].command.env);
        assert!(pipeline.stages[2].command.env.is_empty());
    }

    #[test]
    fn test_report_command() {
        let temp = project();
        let pipeline = Pipeline::standard(&config(), &context(temp.path(), None)).unwrap();
        assert_eq!(args(&pipeline.stages[1].command), vec!["report", "--include", "./*", "-m"]);
    }

    #[test]
    fn test_style_glob_is_deferred() {
        let temp = project();
        let pipeline = Pipeline::standard(&config(), &context(temp.path(), None)).unwrap();
        let style = &pipeline.stages[2].command;

        assert!(style.args.is_empty());
        assert_eq!(style.patterns, vec!["romlib/*.py".to_string()]);
        assert_eq!(
            args(&style.resolve(temp.path())),
            vec!["romlib/field.py", "romlib/rommap.py"]
        );
    }

    #[test]
    fn test_missing_style_package_still_builds() {
        let temp = TempDir::new().unwrap();
        let pipeline = Pipeline::standard(&config(), &context(temp.path(), None)).unwrap();
        assert_eq!(pipeline.stages.len(), 3);
        assert_eq!(
            args(&pipeline.stages[2].command.resolve(temp.path())),
            vec!["romlib/*.py"]
        );
    }

    #[test]
    fn test_forward_dependency_rejected() {
        let pipeline = Pipeline::new(
            "bad",
            vec![
                PipelineStage::new(StageKind::Test, StageCommand::new("true")).after("style"),
                PipelineStage::new(StageKind::Style, StageCommand::new("true")),
            ],
        );
        assert!(matches!(
            pipeline.validate(),
            Err(PipelineError::ForwardDependency { .. })
        ));
    }

    #[test]
    fn test_unknown_and_duplicate_stages_rejected() {
        let unknown = Pipeline::new(
            "bad",
            vec![PipelineStage::new(StageKind::Test, StageCommand::new("true")).after("nope")],
        );
        assert!(matches!(
            unknown.validate(),
            Err(PipelineError::UnknownDependency { .. })
        ));

        let duplicate = Pipeline::new(
            "bad",
            vec![
                PipelineStage::new(StageKind::Test, StageCommand::new("true")),
                PipelineStage::new(StageKind::Test, StageCommand::new("true")),
            ],
        );
        assert!(matches!(
            duplicate.validate(),
            Err(PipelineError::DuplicateStage(_))
        ));

        assert!(matches!(
            Pipeline::new("empty", Vec::new()).validate(),
            Err(PipelineError::Empty(_))
        ));
    }
}
