//! Coverage instrumentation artifact.
//!
//! The test stage writes coverage data and the report stage reads it. The
//! data file is named explicitly and handed to both commands through the
//! environment, so the hand-off shows up in the stage definitions.

use std::path::{Path, PathBuf};

use crate::domain::StageCommand;

/// Environment variable the coverage tool reads its data file location from
pub const COVERAGE_FILE_ENV: &str = "COVERAGE_FILE";

/// Default data file name, relative to the working directory
pub const DEFAULT_DATA_FILE: &str = ".coverage";

/// Handle to the on-disk coverage data shared by the test and report stages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageArtifact {
    /// Absolute path of the data file
    data_file: PathBuf,
}

impl CoverageArtifact {
    /// Resolve a data file path against the run's working directory
    pub fn resolve(working_dir: &Path, data_file: &Path) -> Self {
        let data_file = if data_file.is_absolute() {
            data_file.to_path_buf()
        } else {
            working_dir.join(data_file)
        };
        Self { data_file }
    }

    /// Path of the data file
    pub fn data_file(&self) -> &Path {
        &self.data_file
    }

    /// Whether the test stage has left data behind
    pub fn exists(&self) -> bool {
        self.data_file.exists()
    }

    /// Point a command at this artifact
    pub fn bind(&self, command: StageCommand) -> StageCommand {
        command.env(COVERAGE_FILE_ENV, self.data_file.as_os_str())
    }
}
