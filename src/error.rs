//! Top-level error type.

use thiserror::Error;

use crate::hir::StructureError;
use crate::project::ProjectError;
use crate::syntax::ParseError;

/// Everything that can stop a fix run. Unresolved references are not
/// errors; they come back as diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Structure(#[from] StructureError),

    #[error(transparent)]
    Project(#[from] ProjectError),
}

impl Error {
    /// Process exit code for the CLI: 1 for problems in the PHP file,
    /// 2 for I/O and configuration problems.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Parse(_) | Error::Structure(_) => 1,
            Error::Project(_) => 2,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
