//! Rewriting a file's import header.

mod pipeline;
mod rewrite;

pub use pipeline::{FixOutcome, fix_imports};
pub use rewrite::{ImportRewriter, rewrite};
