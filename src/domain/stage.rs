//! Stage definitions.
//!
//! A stage is an external command plus the name of the stage it depends on.
//! Stages are plain data; executing them is the job of an invoker.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Which part of the check a stage performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Runs the test suite under coverage instrumentation
    Test,

    /// Renders the coverage report from the instrumentation data
    Coverage,

    /// Runs the style checker over the source package
    Style,
}

impl StageKind {
    /// Default stage name for this kind
    pub fn default_name(self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Coverage => "coverage",
            Self::Style => "style",
        }
    }

    /// The failure class a non-zero exit from this kind of stage represents
    pub fn failure_kind(self) -> FailureKind {
        match self {
            Self::Test => FailureKind::TestFailure,
            Self::Coverage => FailureKind::ReportFailure,
            Self::Style => FailureKind::StyleViolation,
        }
    }
}

/// Classes of stage failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// One or more tests failed or errored
    TestFailure,

    /// The coverage report could not be produced
    ReportFailure,

    /// The style checker found violations
    StyleViolation,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TestFailure => "test failure",
            Self::ReportFailure => "coverage report failure",
            Self::StyleViolation => "style violation",
        };
        f.write_str(s)
    }
}

/// An external program with its arguments and extra environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageCommand {
    /// Program to execute (looked up on PATH when not a path)
    pub program: OsString,

    /// Arguments, passed verbatim
    pub args: Vec<OsString>,

    /// Environment variables set for this command only
    pub env: Vec<(OsString, OsString)>,

    /// Trailing glob arguments, expanded in the working directory at
    /// invocation time; a pattern with no matches is passed literally
    pub patterns: Vec<String>,
}

impl StageCommand {
    /// Create a command with no arguments
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            patterns: Vec::new(),
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the command
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Append a glob argument, expanded when the command is resolved
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    /// Expand glob arguments against `working_dir` into plain arguments
    pub fn resolve(&self, working_dir: &Path) -> StageCommand {
        let mut resolved = self.clone();
        resolved.patterns.clear();
        for pattern in &self.patterns {
            resolved.args.extend(expand_pattern(working_dir, pattern));
        }
        resolved
    }

    /// Program name as a lossy string (for logs and errors)
    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

impl fmt::Display for StageCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.env {
            write!(f, "{}={} ", key.to_string_lossy(), value.to_string_lossy())?;
        }
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{}'", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        for pattern in &self.patterns {
            write!(f, " {}", pattern)?;
        }
        Ok(())
    }
}

/// Expand a glob the way a shell would: matching paths relative to
/// `working_dir`, sorted; the pattern itself when nothing matches
pub fn expand_pattern(working_dir: &Path, pattern: &str) -> Vec<OsString> {
    let full = if Path::new(pattern).is_absolute() {
        pattern.to_string()
    } else {
        format!("{}/{}", glob::Pattern::escape(&working_dir.to_string_lossy()), pattern)
    };

    let mut files: Vec<PathBuf> = match glob::glob(&full) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .map(|p| match p.strip_prefix(working_dir) {
                Ok(rel) => rel.to_path_buf(),
                Err(_) => p,
            })
            .collect(),
        Err(_) => Vec::new(),
    };

    if files.is_empty() {
        return vec![OsString::from(pattern)];
    }

    files.sort();
    files.into_iter().map(PathBuf::into_os_string).collect()
}

/// A single stage in a pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineStage {
    /// Stage name (unique within pipeline)
    pub name: String,

    /// What this stage checks
    pub kind: StageKind,

    /// Command to invoke
    pub command: StageCommand,

    /// Stage that must succeed before this one runs
    pub depends_on: Option<String>,
}

impl PipelineStage {
    /// Create a stage named after its kind, with no dependency
    pub fn new(kind: StageKind, command: StageCommand) -> Self {
        Self {
            name: kind.default_name().to_string(),
            kind,
            command,
            depends_on: None,
        }
    }

    /// Override the stage name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Gate this stage on the success of another
    pub fn after(mut self, stage: impl Into<String>) -> Self {
        self.depends_on = Some(stage.into());
        self
    }
}
