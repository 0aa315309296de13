//! `.phpimports.toml` settings and project-root discovery.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::ProjectError;

/// Config file name, looked up in the project root.
pub const CONFIG_FILE: &str = ".phpimports.toml";

/// Per-project settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportsConfig {
    /// Extra names that never get an import, e.g. classes aliased at runtime
    #[serde(default)]
    pub ignore: Vec<String>,

    /// Directories scanned for declarations when there is no classmap
    #[serde(default = "default_source_dirs")]
    pub source_dirs: Vec<PathBuf>,

    /// Read `vendor/composer/autoload_classmap.php` when present
    #[serde(default = "default_true")]
    pub classmap: bool,

    /// Treat PHP's built-in classes as already available
    #[serde(default = "default_true")]
    pub builtins: bool,
}

fn default_source_dirs() -> Vec<PathBuf> {
    ["src", "app", "lib"].into_iter().map(PathBuf::from).collect()
}

fn default_true() -> bool {
    true
}

impl Default for ImportsConfig {
    fn default() -> Self {
        Self {
            ignore: Vec::new(),
            source_dirs: default_source_dirs(),
            classmap: default_true(),
            builtins: default_true(),
        }
    }
}

impl ImportsConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ProjectError> {
        let content = fs::read_to_string(path).map_err(|e| ProjectError::io(path, e))?;
        toml::from_str(&content).map_err(|source| ProjectError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `<root>/.phpimports.toml`, or the defaults when it does not exist.
    pub fn load_from_project(project_root: &Path) -> Result<Self, ProjectError> {
        let config_path = project_root.join(CONFIG_FILE);
        if config_path.is_file() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// The nearest directory at or above `path` holding `composer.json` or a
/// config file.
pub fn find_project_root(path: &Path) -> Option<PathBuf> {
    let start = if path.is_file() { path.parent()? } else { path };
    start
        .ancestors()
        .find(|dir| dir.join("composer.json").is_file() || dir.join(CONFIG_FILE).is_file())
        .map(Path::to_path_buf)
}
