//! One fix run: parse, check, extract, resolve, rewrite.

use smol_str::SmolStr;
use tracing::{debug, warn};

use crate::Result;
use crate::base::{LineCol, QualifiedName};
use crate::hir::{
    Diagnostic, DiagnosticCollector, IgnoreSet, SymbolIndex, check_structure, extract_names,
    resolve,
};
use crate::project::ImportsConfig;
use crate::syntax::parse;

use super::ImportRewriter;

/// The result of fixing one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixOutcome {
    /// The new source text; equal to the input when nothing changed.
    pub text: String,
    /// Imports added, in the order references first appeared.
    pub added: Vec<QualifiedName>,
    /// Unused imports removed, in source order.
    pub removed: Vec<QualifiedName>,
    /// Unresolved references, skipped imports and removals.
    pub diagnostics: Vec<Diagnostic>,
    pub changed: bool,
}

impl FixOutcome {
    fn unchanged(source: &str, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            text: source.to_string(),
            added: Vec::new(),
            removed: Vec::new(),
            diagnostics,
            changed: false,
        }
    }

    /// Warnings only: unresolved references and skipped imports.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_warning())
    }
}

/// Fix the import header of one PHP file.
///
/// Structural and parse errors abort the run before any edit. Unresolved
/// references are reported in [`FixOutcome::diagnostics`] and left alone.
pub fn fix_imports(source: &str, index: &SymbolIndex, config: &ImportsConfig) -> Result<FixOutcome> {
    let tree = parse(source)?;
    if !tree.has_code() {
        return Ok(FixOutcome::unchanged(source, Vec::new()));
    }
    check_structure(&tree)?;

    let extraction = extract_names(&tree);
    let namespace = tree
        .namespace()
        .and_then(|ns| ns.name.as_ref())
        .map(|name| name.name.clone());

    let mut ignore = if config.builtins {
        IgnoreSet::with_builtins()
    } else {
        IgnoreSet::new()
    };
    ignore.extend(&config.ignore);
    ignore.add_file_scope(&extraction, namespace.as_ref(), index);

    let references = extraction.references(&ignore);
    let resolved = resolve(references.iter().map(|r| &r.name), index);
    let position_of = |name: &QualifiedName| {
        references
            .iter()
            .find(|r| &r.name == name)
            .map(|r| r.position)
            .unwrap_or_default()
    };

    let mut diagnostics = DiagnosticCollector::new();
    for (reference, resolution) in &resolved {
        if resolution.is_none() {
            let position = position_of(reference);
            warn!(%reference, %position, "unresolved reference");
            diagnostics.unresolved_reference(position, reference);
        }
    }

    let unused: Vec<SmolStr> = extraction
        .unused_imports()
        .into_iter()
        .map(|entry| entry.alias.clone())
        .collect();

    let mut rewriter = ImportRewriter::new(tree, source)?;
    let removed = rewriter.remove_uses(&unused);
    for name in &removed {
        let position = extraction
            .imports
            .iter()
            .find(|entry| entry.name.segments() == name.segments())
            .map_or(LineCol::default(), |entry| entry.position);
        diagnostics.removed_import(position, name);
    }

    let mut added = Vec::new();
    for (reference, resolution) in &resolved {
        let Some(name) = resolution else {
            continue;
        };
        if rewriter.is_imported(name) {
            continue;
        }
        if rewriter.is_bound(name.last()) {
            diagnostics.import_skipped(position_of(reference), name, name.last());
            continue;
        }
        rewriter.add_use(name.clone());
        added.push(name.clone());
    }

    debug!(
        references = references.len(),
        added = added.len(),
        removed = removed.len(),
        "planned import changes"
    );
    if added.is_empty() && removed.is_empty() && rewriter.is_sorted() {
        return Ok(FixOutcome::unchanged(source, diagnostics.take()));
    }

    rewriter.sort_imports();
    let text = rewriter.finish()?;
    let changed = text != source;
    Ok(FixOutcome {
        text,
        added,
        removed,
        diagnostics: diagnostics.take(),
        changed,
    })
}
