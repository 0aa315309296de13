//! # phpimports
//!
//! Maintains the `use` header of PHP files: removes unused imports, imports
//! class references found in a project-wide symbol index, and sorts the
//! import block, leaving everything after the header byte-identical.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! fix      → Pipeline and header rewriter
//!   ↓
//! project  → Project root, config, classmap, workspace scan
//!   ↓
//! hir      → Name extraction, symbol index, resolution, structure checks
//!   ↓
//! syntax   → Lexer, parser, tree, printer, visitor
//!   ↓
//! base     → Primitives (FileId, spans, QualifiedName)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use phpimports::{ImportsConfig, fix_imports, load_index};
//!
//! let config = ImportsConfig::load_from_project(root)?;
//! let project = load_index(root, &config)?;
//! let outcome = fix_imports(&source, &project.symbols, &config)?;
//! ```

pub mod base;
pub mod error;
pub mod fix;
pub mod hir;
pub mod project;
pub mod syntax;

pub use base::{FileId, LineCol, LineIndex, QualifiedName, TextRange, TextSize};
pub use error::{Error, Result};
pub use fix::{FixOutcome, ImportRewriter, fix_imports, rewrite};
pub use hir::{Diagnostic, StructureError, SymbolIndex, resolve};
pub use project::{ImportsConfig, ProjectError, ProjectIndex, find_project_root, load_index};
pub use syntax::{ParseError, SourceFile, parse};
