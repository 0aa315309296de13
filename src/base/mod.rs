//! Foundation types shared by every stage of the import fixer.
//!
//! - [`FileId`] - Handle for a declaring file in the symbol index
//! - [`TextRange`], [`TextSize`] - Byte positions in PHP source
//! - [`LineCol`], [`LineIndex`] - Line/column conversion
//! - [`QualifiedName`] - Hierarchical `Vendor\Lib\Thing` names
//!
//! This module has NO dependencies on other phpimports modules.

mod file_id;
mod name;
mod span;

pub use file_id::FileId;
pub use name::{NameKind, QualifiedName};
pub use span::{LineCol, LineIndex, TextRange, TextSize};
