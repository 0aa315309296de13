//! Project metadata: where the project root is, how it is configured, and
//! which classes it declares.
//!
//! The symbol index comes from Composer's generated classmap when there is
//! one, and from scanning the configured source directories otherwise.

mod classmap;
mod config;
mod workspace_loader;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use classmap::{CLASSMAP_PATH, load_classmap, parse_classmap};
pub use config::{CONFIG_FILE, ImportsConfig, find_project_root};
pub use workspace_loader::{ProjectIndex, declared_classes, load_index, scan_workspace};

/// Errors from loading project metadata.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("no composer.json or .phpimports.toml above {}", .0.display())]
    MissingRoot(PathBuf),

    #[error("{}: {message}", .path.display())]
    Classmap { path: PathBuf, message: String },
}

impl ProjectError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ProjectError::Io {
            path: path.into(),
            source,
        }
    }
}
