//! Configuration for checkrun.
//!
//! Configuration sources (highest priority first):
//! 1. Command-line flags (--config)
//! 2. Environment variables (CHECKRUN_CONFIG, CHECKRUN_TEST_ROOT, ...)
//! 3. Project config file (.checkrun/config.yaml)
//! 4. User config file (<config dir>/checkrun/config.yaml)
//! 5. Defaults (unittest + coverage + pycodestyle)
//!
//! Config file discovery:
//! - Searches the working directory and its parents for .checkrun/config.yaml
//! - Falls back to the per-user config directory

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::artifact::DEFAULT_DATA_FILE;

/// Environment variable naming an explicit config file
pub const ENV_CONFIG: &str = "CHECKRUN_CONFIG";
pub const ENV_TEST_ROOT: &str = "CHECKRUN_TEST_ROOT";
pub const ENV_STYLE_PACKAGE: &str = "CHECKRUN_STYLE_PACKAGE";
pub const ENV_COVERAGE_BIN: &str = "CHECKRUN_COVERAGE_BIN";
pub const ENV_STYLE_BIN: &str = "CHECKRUN_STYLE_BIN";

const CONFIG_DIR: &str = ".checkrun";
const CONFIG_FILE: &str = "config.yaml";

/// Config file schema (matches YAML structure)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub tests: TestsConfig,
    #[serde(default)]
    pub coverage: CoverageConfig,
    #[serde(default)]
    pub style: StyleConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestsConfig {
    /// Directory test discovery starts from
    #[serde(default = "default_test_root")]
    pub root: PathBuf,
    /// Arguments that make the coverage tool run the test runner
    #[serde(default = "default_runner")]
    pub runner: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageConfig {
    #[serde(default = "default_coverage_program")]
    pub program: String,
    /// Measure branch coverage as well as line coverage
    #[serde(default = "default_true")]
    pub branch: bool,
    /// Files the report is restricted to
    #[serde(default = "default_include")]
    pub include: String,
    /// List missing lines and branches per file
    #[serde(default = "default_true")]
    pub show_missing: bool,
    /// Data file (relative to the working directory)
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleConfig {
    #[serde(default = "default_style_program")]
    pub program: String,
    /// Package directory whose modules are checked
    #[serde(default = "default_style_package")]
    pub package: PathBuf,
    /// File pattern inside the package
    #[serde(default = "default_style_pattern")]
    pub pattern: String,
    /// Extra arguments placed before the file list
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_version() -> String {
    "1".to_string()
}
fn default_test_root() -> PathBuf {
    PathBuf::from("tests")
}
fn default_runner() -> Vec<String> {
    vec!["-m".to_string(), "unittest".to_string(), "discover".to_string()]
}
fn default_coverage_program() -> String {
    "coverage".to_string()
}
fn default_true() -> bool {
    true
}
fn default_include() -> String {
    "./*".to_string()
}
fn default_data_file() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_FILE)
}
fn default_style_program() -> String {
    "pycodestyle".to_string()
}
fn default_style_package() -> PathBuf {
    PathBuf::from("src")
}
fn default_style_pattern() -> String {
    "*.py".to_string()
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            version: default_version(),
            tests: TestsConfig::default(),
            coverage: CoverageConfig::default(),
            style: StyleConfig::default(),
        }
    }
}

impl Default for TestsConfig {
    fn default() -> Self {
        Self {
            root: default_test_root(),
            runner: default_runner(),
        }
    }
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            program: default_coverage_program(),
            branch: true,
            include: default_include(),
            show_missing: true,
            data_file: default_data_file(),
        }
    }
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            program: default_style_program(),
            package: default_style_package(),
            pattern: default_style_pattern(),
            args: Vec::new(),
        }
    }
}

/// Resolved configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub tests: TestsConfig,
    pub coverage: CoverageConfig,
    pub style: StyleConfig,
    /// Path to config file (if one was used)
    pub config_file: Option<PathBuf>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self::from_file(ConfigFile::default(), None)
    }
}

impl ResolvedConfig {
    fn from_file(file: ConfigFile, config_file: Option<PathBuf>) -> Self {
        Self {
            tests: file.tests,
            coverage: file.coverage,
            style: file.style,
            config_file,
        }
    }

    /// Apply environment overrides using `lookup` to read variables
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup(ENV_TEST_ROOT) {
            self.tests.root = PathBuf::from(root);
        }
        if let Some(package) = lookup(ENV_STYLE_PACKAGE) {
            self.style.package = PathBuf::from(package);
        }
        if let Some(program) = lookup(ENV_COVERAGE_BIN) {
            self.coverage.program = program;
        }
        if let Some(program) = lookup(ENV_STYLE_BIN) {
            self.style.program = program;
        }
    }
}

/// Find a project config file by searching `start` and its parents
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_DIR).join(CONFIG_FILE);
        if config_path.is_file() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Per-user config file, if the platform has a config directory
pub fn user_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("checkrun").join(CONFIG_FILE))
}

/// Load and parse a config file
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content).with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse config YAML; an empty document yields the defaults
pub fn parse_config(content: &str) -> Result<ConfigFile> {
    if content.trim().is_empty() {
        return Ok(ConfigFile::default());
    }
    let file: ConfigFile = serde_yaml::from_str(content)?;
    if file.version != "1" {
        anyhow::bail!("Unsupported config version '{}'", file.version);
    }
    Ok(file)
}

/// Load configuration from all sources for a run in `working_dir`
///
/// A relative explicit config path is taken relative to the directory
/// checkrun was started from, not `working_dir`.
pub fn load(explicit: Option<&Path>, working_dir: &Path) -> Result<ResolvedConfig> {
    let invocation_dir = std::env::current_dir().context("Failed to determine current directory")?;
    load_with(explicit, &invocation_dir, working_dir, |key| std::env::var(key).ok())
}

/// Same as [`load`], with the invocation directory given and environment
/// variables read through `lookup`
pub fn load_with<F>(
    explicit: Option<&Path>,
    invocation_dir: &Path,
    working_dir: &Path,
    lookup: F,
) -> Result<ResolvedConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let config_path = explicit
        .map(Path::to_path_buf)
        .or_else(|| lookup(ENV_CONFIG).map(PathBuf::from))
        .map(|p| if p.is_absolute() { p } else { invocation_dir.join(p) });

    let config_path = match config_path {
        // An explicitly named file must exist
        Some(path) => Some(path),
        None => find_config_file(working_dir).or_else(|| user_config_file().filter(|p| p.is_file())),
    };

    let mut config = match config_path {
        Some(path) => {
            let file = load_config_file(&path)?;
            ResolvedConfig::from_file(file, Some(path))
        }
        None => ResolvedConfig::default(),
    };

    config.apply_overrides(lookup);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults() {
        let config = ResolvedConfig::default();
        assert_eq!(config.tests.root, PathBuf::from("tests"));
        assert!(config.coverage.branch);
        assert_eq!(config.coverage.include, "./*");
        assert!(config.coverage.show_missing);
        assert_eq!(config.style.pattern, "*.py");
        assert!(config.config_file.is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = parse_config("style:\n  package: romlib\n").unwrap();
        assert_eq!(file.style.package, PathBuf::from("romlib"));
        assert_eq!(file.style.program, "pycodestyle");
        assert_eq!(file.tests, TestsConfig::default());
    }

    #[test]
    fn test_empty_file_is_defaults() {
        assert_eq!(parse_config("  \n").unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_unknown_version_rejected() {
        assert!(parse_config("version: \"2\"\n").is_err());
    }

    #[test]
    fn test_config_file_discovery_walks_parents() {
        let temp = TempDir::new().unwrap();
        let config_dir = temp.path().join(CONFIG_DIR);
        std::fs::create_dir_all(&config_dir).unwrap();
        let config_path = config_dir.join(CONFIG_FILE);
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "coverage:\n  branch: false").unwrap();

        let nested = temp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_config_file(&nested), Some(config_path.clone()));

        let config = load_with(None, &nested, &nested, no_env).unwrap();
        assert!(!config.coverage.branch);
        assert_eq!(config.config_file, Some(config_path));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let result = load_with(Some(Path::new("nope.yaml")), temp.path(), temp.path(), no_env);
        assert!(result.is_err());
    }

    #[test]
    fn test_relative_explicit_path_uses_invocation_dir() {
        let temp = TempDir::new().unwrap();
        let sub = temp.path().join("sub");
        std::fs::create_dir_all(&sub).unwrap();
        let config_path = temp.path().join("ci.yaml");
        std::fs::write(&config_path, "tests:\n  root: unit\n").unwrap();

        let config = load_with(Some(Path::new("ci.yaml")), temp.path(), &sub, no_env).unwrap();
        assert_eq!(config.tests.root, PathBuf::from("unit"));
        assert_eq!(config.config_file, Some(config_path));

        // The same relative name is not looked up under the working directory
        assert!(load_with(Some(Path::new("ci.yaml")), &sub, &sub, no_env).is_err());
    }

    #[test]
    fn test_relative_env_path_uses_invocation_dir() {
        let temp = TempDir::new().unwrap();
        let sub = temp.path().join("sub");
        std::fs::create_dir_all(&sub).unwrap();
        std::fs::write(temp.path().join("ci.yaml"), "style:\n  package: romlib\n").unwrap();

        let env = |key: &str| (key == ENV_CONFIG).then(|| "ci.yaml".to_string());
        let config = load_with(None, temp.path(), &sub, env).unwrap();
        assert_eq!(config.style.package, PathBuf::from("romlib"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_TEST_ROOT, "unit"),
            (ENV_STYLE_PACKAGE, "romlib"),
            (ENV_COVERAGE_BIN, "python3-coverage"),
            (ENV_STYLE_BIN, "pep8"),
        ]
        .into_iter()
        .collect();

        let mut config = ResolvedConfig::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.tests.root, PathBuf::from("unit"));
        assert_eq!(config.style.package, PathBuf::from("romlib"));
        assert_eq!(config.coverage.program, "python3-coverage");
        assert_eq!(config.style.program, "pep8");
    }
}
