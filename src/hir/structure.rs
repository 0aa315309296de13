//! Structural invariants of a file's header, and where that header ends.
//!
//! The fixer only rewrites files whose header it can regenerate and splice
//! back: at most one namespace, declared first, with a single contiguous run
//! of imports, and nothing but a comment after the last header statement on
//! its line.

use smol_str::SmolStr;
use thiserror::Error;

use crate::base::{TextRange, TextSize};
use crate::syntax::{SourceFile, Stmt, StmtKind};

/// A violated header invariant. Lines are 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StructureError {
    #[error("line {line}: a file may declare at most one namespace")]
    MultipleNamespaces { line: u32 },

    #[error("line {line}: the namespace declaration must be the first statement")]
    NamespaceNotFirst { line: u32 },

    #[error("line {line}: import statements must form one contiguous block")]
    NonContiguousImports { line: u32 },

    #[error("line {line}: code follows the last header statement on the same line")]
    SharedHeaderLine { line: u32 },
}

impl StructureError {
    pub fn line(&self) -> u32 {
        match *self {
            StructureError::MultipleNamespaces { line }
            | StructureError::NamespaceNotFirst { line }
            | StructureError::NonContiguousImports { line }
            | StructureError::SharedHeaderLine { line } => line,
        }
    }
}

fn line_of(file: &SourceFile, range: Option<TextRange>) -> u32 {
    range.map_or(0, |range| file.start_line(range)) + 1
}

/// Check the namespace and import invariants.
pub fn check_structure(file: &SourceFile) -> Result<(), StructureError> {
    let mut namespaces = file
        .stmts
        .iter()
        .filter(|stmt| matches!(stmt.kind, StmtKind::Namespace(_)));

    if let Some(first) = namespaces.next() {
        if let Some(second) = namespaces.next() {
            return Err(StructureError::MultipleNamespaces {
                line: line_of(file, second.range),
            });
        }
        let preceded = file
            .stmts
            .iter()
            .take_while(|stmt| !matches!(stmt.kind, StmtKind::Namespace(_)))
            .any(|stmt| !matches!(stmt.kind, StmtKind::Declare(_)));
        if preceded {
            return Err(StructureError::NamespaceNotFirst {
                line: line_of(file, first.range),
            });
        }
    }

    let scope = file.import_scope();
    let uses: Vec<usize> = scope
        .iter()
        .enumerate()
        .filter(|(_, stmt)| stmt.is_use())
        .map(|(idx, _)| idx)
        .collect();
    if let Some(gap) = uses.windows(2).find(|pair| pair[1] != pair[0] + 1) {
        return Err(StructureError::NonContiguousImports {
            line: line_of(file, scope[gap[1]].range),
        });
    }
    Ok(())
}

// ============================================================================
// HEADER REGION
// ============================================================================

/// The end of a file's header: the last import, else the namespace
/// declaration, else the last leading `declare`, else the open tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRegion {
    /// 0-indexed line the header ends on.
    pub line: u32,
    /// Byte offset right after the anchor statement.
    pub end: TextSize,
    /// The comment the parser attached after the anchor on the same line.
    pub trailing: Option<SmolStr>,
}

impl HeaderRegion {
    fn after(file: &SourceFile, range: TextRange, trailing: Option<&SmolStr>) -> Self {
        Self {
            line: file.end_line(range),
            end: range.end(),
            trailing: trailing.cloned(),
        }
    }
}

/// Locate the header end. `None` for a file without an open tag.
pub fn header_region(file: &SourceFile) -> Option<HeaderRegion> {
    let open_tag = file.open_tag.as_ref()?;

    let last_use = file
        .import_scope()
        .iter()
        .rev()
        .find(|stmt| stmt.is_use() && stmt.range.is_some());
    if let Some(stmt) = last_use {
        return stmt_region(file, stmt);
    }

    if let Some(ns) = file.namespace() {
        return Some(HeaderRegion::after(file, ns.header, ns.header_comment.as_ref()));
    }

    let last_declare = file
        .stmts
        .iter()
        .take_while(|stmt| matches!(stmt.kind, StmtKind::Declare(_)))
        .last();
    if let Some(stmt) = last_declare {
        return stmt_region(file, stmt);
    }

    Some(HeaderRegion::after(file, open_tag.range, open_tag.comment.as_ref()))
}

fn stmt_region(file: &SourceFile, stmt: &Stmt) -> Option<HeaderRegion> {
    let range = stmt.range?;
    Some(HeaderRegion::after(file, range, stmt.trailing_comment.as_ref()))
}

/// Check that nothing but the attached comment follows the header on its
/// last line, so the lines after it can be reused verbatim.
pub fn check_header_line(
    file: &SourceFile,
    source: &str,
    region: &HeaderRegion,
) -> Result<(), StructureError> {
    let rest = file
        .line_index
        .line_range(region.line)
        .filter(|line| line.end() >= region.end)
        .and_then(|line| source.get(usize::from(region.end)..usize::from(line.end())))
        .unwrap_or_default()
        .trim();

    let shared = !rest.is_empty() && region.trailing.as_deref() != Some(rest);
    if shared {
        return Err(StructureError::SharedHeaderLine {
            line: region.line + 1,
        });
    }
    Ok(())
}
