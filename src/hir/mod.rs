//! Semantic layer: what a file references, what the project declares, and
//! whether a file's header can be rewritten.
//!
//! ## Design Principles
//!
//! 1. **Pure functions**: Take a tree and an index in, return data out
//! 2. **No I/O**: Indexes are built by [`crate::project`]
//! 3. **Deterministic**: Same inputs always give the same output

mod diagnostics;
mod extract;
mod input;
mod resolve;
mod structure;

pub use diagnostics::{Diagnostic, DiagnosticCollector, Severity, codes};
pub use extract::{Extraction, IgnoreSet, ImportEntry, Reference, ReferenceKind, extract_names};
pub use input::SourceRoot;
pub use resolve::{Resolver, SymbolEntry, SymbolIndex, resolve};
pub use structure::{
    HeaderRegion, StructureError, check_header_line, check_structure, header_region,
};
