//! Header rewriting: mutate the import block, reprint, splice the body back.
//!
//! The tree is edited and printed in canonical layout, but only the printed
//! lines up to the new header end are kept. Everything after the original
//! header end is copied from the original source, so the body survives
//! byte for byte however the printer lays things out.

use smol_str::SmolStr;
use tracing::debug;

use crate::base::QualifiedName;
use crate::hir::{HeaderRegion, check_header_line, check_structure, header_region};
use crate::syntax::{SourceFile, Stmt, StmtKind, UseKind, UseStmt, parse, print_file};
use crate::Result;

/// Applies import edits to one parsed file.
///
/// Edits only touch the in-memory tree; [`finish`](Self::finish) produces
/// the new text. The original source is never modified.
#[derive(Debug)]
pub struct ImportRewriter<'s> {
    tree: SourceFile,
    source: &'s str,
    /// Header end of the original source; `None` for a file without code.
    original: Option<HeaderRegion>,
    /// Scope index new imports are inserted at. This is the first existing
    /// import, or the top of the scope when there is none. New imports only
    /// end up at the block's top after [`sort_imports`](Self::sort_imports).
    insert_at: usize,
    inserted: usize,
    /// Statements of the import scope that precede the original imports.
    /// They stay part of the header when every import is removed.
    preceding: usize,
}

impl<'s> ImportRewriter<'s> {
    /// Start rewriting `tree`, which must have been parsed from `source`.
    pub fn new(tree: SourceFile, source: &'s str) -> Result<Self> {
        check_structure(&tree)?;
        let original = header_region(&tree);
        let first = first_use(tree.import_scope());
        let insert_at = first.unwrap_or_else(|| scope_top(&tree));
        Ok(Self {
            tree,
            source,
            original,
            insert_at,
            inserted: 0,
            preceding: first.unwrap_or(0),
        })
    }

    pub fn tree(&self) -> &SourceFile {
        &self.tree
    }

    /// Import statements of the import scope, in current order.
    pub fn imports(&self) -> impl Iterator<Item = &UseStmt> {
        self.tree.import_scope().iter().filter_map(Stmt::as_use)
    }

    /// Whether a class import of exactly `name` exists.
    pub fn is_imported(&self, name: &QualifiedName) -> bool {
        self.imports().any(|use_stmt| use_stmt.binds(name, UseKind::Class))
    }

    /// Whether a class import already binds the local name `alias`.
    pub fn is_bound(&self, alias: &str) -> bool {
        self.imports().any(|use_stmt| {
            use_stmt.items.iter().any(|item| {
                use_stmt.item_kind(item) == UseKind::Class
                    && item.alias().eq_ignore_ascii_case(alias)
            })
        })
    }

    /// Delete class import statements whose single bound alias is in
    /// `aliases`. Statements binding several names are left alone.
    ///
    /// Returns the full names of the removed imports.
    pub fn remove_uses(&mut self, aliases: &[SmolStr]) -> Vec<QualifiedName> {
        let mut removed = Vec::new();
        self.tree.import_scope_mut().retain(|stmt| {
            let Some(use_stmt) = stmt.as_use() else {
                return true;
            };
            let [item] = use_stmt.items.as_slice() else {
                return true;
            };
            let unused = use_stmt.item_kind(item) == UseKind::Class
                && aliases.iter().any(|alias| item.alias().eq_ignore_ascii_case(alias));
            if unused {
                removed.push(use_stmt.full_name(item));
            }
            !unused
        });
        debug!(count = removed.len(), "removed unused imports");
        removed
    }

    /// Insert `use name;` where the import block starts, unless `name` is
    /// already imported. Returns whether a statement was added.
    pub fn add_use(&mut self, name: QualifiedName) -> bool {
        if self.is_imported(&name) {
            return false;
        }
        debug!(%name, "adding import");
        let stmt = Stmt::synthesized(StmtKind::Use(UseStmt::single(name)));
        let scope = self.tree.import_scope_mut();
        let at = (self.insert_at + self.inserted).min(scope.len());
        scope.insert(at, stmt);
        self.inserted += 1;
        true
    }

    /// Whether the import block is already in sorted order.
    pub fn is_sorted(&self) -> bool {
        let keys: Vec<_> = self.imports().map(sort_key).collect();
        keys.windows(2).all(|pair| pair[0] <= pair[1])
    }

    /// Stable-sort the import block by segment count, then by full name,
    /// and put it back where the first import was.
    pub fn sort_imports(&mut self) {
        let scope = self.tree.import_scope_mut();
        let Some(first) = first_use(scope) else {
            return;
        };

        let mut uses = Vec::new();
        let mut rest = Vec::with_capacity(scope.len());
        for stmt in scope.drain(..) {
            if stmt.is_use() {
                uses.push(stmt);
            } else {
                rest.push(stmt);
            }
        }
        uses.sort_by_cached_key(|stmt| stmt.as_use().map(sort_key));

        let at = first.min(rest.len());
        rest.splice(at..at, uses);
        *scope = rest;
    }

    /// Print the edited tree and splice the original body back after the
    /// new header.
    pub fn finish(self) -> Result<String> {
        let Some(original) = self.original else {
            return Ok(self.source.to_string());
        };
        check_header_line(&self.tree, self.source, &original)?;

        let printed = print_file(&self.tree);
        let reparsed = parse(&printed)?;
        let anchor = header_region(&reparsed).map_or(0, |region| region.line);
        let new_end = self
            .preceding
            .checked_sub(1)
            .and_then(|idx| reparsed.import_scope().get(idx))
            .and_then(|stmt| stmt.range)
            .map_or(anchor, |range| reparsed.end_line(range).max(anchor));
        debug!(
            original_end = original.line,
            new_end, "splicing header into original body"
        );
        let eol = line_ending(self.source);
        Ok(splice(&printed, new_end, self.source, original.line, eol))
    }
}

/// Apply the three header edits in order and return the new text.
pub fn rewrite(
    tree: SourceFile,
    resolved: &[QualifiedName],
    unused_aliases: &[SmolStr],
    original_source: &str,
) -> Result<String> {
    let mut rewriter = ImportRewriter::new(tree, original_source)?;
    rewriter.remove_uses(unused_aliases);
    for name in resolved {
        rewriter.add_use(name.clone());
    }
    rewriter.sort_imports();
    rewriter.finish()
}

fn sort_key(use_stmt: &UseStmt) -> (usize, String) {
    use_stmt
        .first_name()
        .map_or((0, String::new()), |name| (name.len(), name.joined()))
}

fn first_use(scope: &[Stmt]) -> Option<usize> {
    scope.iter().position(Stmt::is_use)
}

/// Where imports go when a file has none: the top of the namespace body, or
/// after the leading `declare` statements of a file without a namespace.
fn scope_top(file: &SourceFile) -> usize {
    if file.namespace().is_some() {
        return 0;
    }
    file.stmts
        .iter()
        .take_while(|stmt| matches!(stmt.kind, StmtKind::Declare(_)))
        .count()
}

/// The terminator of the first line of `source`.
fn line_ending(source: &str) -> &'static str {
    match source.find('\n') {
        Some(idx) if source[..idx].ends_with('\r') => "\r\n",
        _ => "\n",
    }
}

/// Lines `0..=printed_end` of `printed`, a blank line, then the lines of
/// `original` after `original_end` without their leading blank lines.
///
/// Header lines are joined with `eol`; body lines keep their own endings.
fn splice(
    printed: &str,
    printed_end: u32,
    original: &str,
    original_end: u32,
    eol: &str,
) -> String {
    let header: Vec<&str> = printed
        .split('\n')
        .take(printed_end as usize + 1)
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();
    let body: Vec<&str> = original
        .split('\n')
        .skip(original_end as usize + 1)
        .skip_while(|line| line.trim().is_empty())
        .collect();

    let mut out = header.join(eol);
    out.push_str(eol);
    if !body.is_empty() {
        out.push_str(eol);
        out.push_str(&body.join("\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::hir::StructureError;

    fn name(text: &str) -> QualifiedName {
        QualifiedName::parse(text).unwrap()
    }

    fn rewriter(source: &str) -> ImportRewriter<'_> {
        ImportRewriter::new(parse(source).unwrap(), source).unwrap()
    }

    #[test]
    fn test_add_use_at_namespace_top() {
        let source = "<?php\n\nnamespace App;\n\nclass Bar\n{\n    public function make() { return new Foo(); }\n}\n";
        let mut rw = rewriter(source);
        assert!(rw.add_use(name("App\\Models\\Foo")));
        assert_eq!(
            rw.finish().unwrap(),
            "<?php\n\nnamespace App;\n\nuse App\\Models\\Foo;\n\nclass Bar\n{\n    public function make() { return new Foo(); }\n}\n"
        );
    }

    #[test]
    fn test_add_use_skips_existing_import() {
        let mut rw = rewriter("<?php\nnamespace App;\nuse Lib\\Foo;\n");
        assert!(!rw.add_use(name("Lib\\Foo")));
        assert!(rw.is_bound("foo"));
    }

    #[test]
    fn test_add_use_after_declare_without_namespace() {
        let source = "<?php\ndeclare(strict_types=1);\n\n$x = new Foo();\n";
        let mut rw = rewriter(source);
        rw.add_use(name("Lib\\Foo"));
        assert_eq!(
            rw.finish().unwrap(),
            "<?php\n\ndeclare(strict_types=1);\n\nuse Lib\\Foo;\n\n$x = new Foo();\n"
        );
    }

    #[test]
    fn test_remove_single_imports_only() {
        let source = "<?php\nnamespace App;\n\nuse App\\Old\\Bar;\nuse Lib\\{Baz, Qux};\nuse Lib\\Kept;\n\nnew Kept;\n";
        let mut rw = rewriter(source);
        let removed = rw.remove_uses(&["Bar".into(), "Baz".into()]);
        assert_eq!(removed, vec![name("App\\Old\\Bar")]);
        assert_eq!(
            rw.finish().unwrap(),
            "<?php\n\nnamespace App;\n\nuse Lib\\{Baz, Qux};\nuse Lib\\Kept;\n\nnew Kept;\n"
        );
    }

    #[test]
    fn test_remove_last_import_keeps_body() {
        let source = "<?php\nnamespace App;\n\nuse App\\Old\\Bar;\n\n\nclass C {}\n";
        let mut rw = rewriter(source);
        rw.remove_uses(&["Bar".into()]);
        assert_eq!(rw.finish().unwrap(), "<?php\n\nnamespace App;\n\nclass C {}\n");
    }

    #[test]
    fn test_sort_by_depth_then_name() {
        let source = "<?php\nnamespace App;\nuse A\\Y\\Z;\nuse B\\X;\nuse A\\C;\n\nnew X;\n";
        let mut rw = rewriter(source);
        assert!(!rw.is_sorted());
        rw.sort_imports();
        assert!(rw.is_sorted());
        assert_eq!(
            rw.finish().unwrap(),
            "<?php\n\nnamespace App;\n\nuse A\\C;\nuse B\\X;\nuse A\\Y\\Z;\n\nnew X;\n"
        );
    }

    #[test]
    fn test_sort_keeps_statement_before_imports() {
        let source = "<?php\nrequire 'vendor/autoload.php';\nuse B\\Y;\nuse A\\X;\n\nnew X(new Y);\n";
        let mut rw = rewriter(source);
        rw.sort_imports();
        assert_eq!(
            rw.finish().unwrap(),
            "<?php\n\nrequire 'vendor/autoload.php';\n\nuse A\\X;\nuse B\\Y;\n\nnew X(new Y);\n"
        );
    }

    #[test]
    fn test_braced_namespace_body_verbatim() {
        let source = "<?php\nnamespace App {\nuse B\\X;\n\nnew X;\nnew Y;\n}\n";
        let tree = parse(source).unwrap();
        let out = rewrite(tree, &[name("Lib\\Y")], &[], source).unwrap();
        assert_eq!(
            out,
            "<?php\n\nnamespace App {\n    use B\\X;\n    use Lib\\Y;\n\nnew X;\nnew Y;\n}\n"
        );
    }

    #[test]
    fn test_trailing_comments_survive() {
        let source = "<?php // entry\nnamespace App; // ns\n\nuse B\\X; // x\n\nnew X;\n";
        let mut rw = rewriter(source);
        rw.add_use(name("A\\Y"));
        rw.sort_imports();
        assert_eq!(
            rw.finish().unwrap(),
            "<?php // entry\n\nnamespace App; // ns\n\nuse A\\Y;\nuse B\\X; // x\n\nnew X;\n"
        );
    }

    #[test]
    fn test_shared_header_line_is_rejected() {
        let source = "<?php\nnamespace App;\nuse A\\X; new X;\n";
        let mut rw = rewriter(source);
        rw.add_use(name("A\\Y"));
        assert!(matches!(
            rw.finish(),
            Err(Error::Structure(StructureError::SharedHeaderLine { line: 3 }))
        ));
    }

    #[test]
    fn test_structure_checked_before_edits() {
        let source = "<?php\nnamespace A;\nnamespace B;\n";
        let err = ImportRewriter::new(parse(source).unwrap(), source).unwrap_err();
        assert!(matches!(
            err,
            Error::Structure(StructureError::MultipleNamespaces { line: 3 })
        ));
    }

    #[test]
    fn test_file_without_code_is_untouched() {
        let source = "<html></html>\n";
        let tree = parse(source).unwrap();
        assert_eq!(rewrite(tree, &[name("A\\B")], &[], source).unwrap(), source);
    }

    #[test]
    fn test_splice() {
        assert_eq!(splice("a\nb\nc\n", 1, "x\ny\n\n\nz\n", 1, "\n"), "a\nb\n\nz\n");
        assert_eq!(splice("a\nb\n", 1, "x\ny\n", 1, "\n"), "a\nb\n");
        assert_eq!(
            splice("a\nb\nc\n", 1, "x\r\ny\r\n\r\nz\r\n", 1, "\r\n"),
            "a\r\nb\r\n\r\nz\r\n"
        );
    }

    #[test]
    fn test_line_ending() {
        assert_eq!(line_ending("<?php\r\necho 1;\n"), "\r\n");
        assert_eq!(line_ending("<?php\necho 1;\r\n"), "\n");
        assert_eq!(line_ending("<?php"), "\n");
    }

    #[test]
    fn test_remove_last_import_keeps_preceding_statement() {
        let source = "<?php\nrequire 'x.php';\nuse A\\B;\n\necho 1;\n";
        let mut rw = rewriter(source);
        rw.remove_uses(&["B".into()]);
        assert_eq!(rw.finish().unwrap(), "<?php\n\nrequire 'x.php';\n\necho 1;\n");

        let source = "<?php\nnamespace App;\nconst X = 1;\nuse A\\B;\n\necho X;\n";
        let mut rw = rewriter(source);
        rw.remove_uses(&["B".into()]);
        assert_eq!(
            rw.finish().unwrap(),
            "<?php\n\nnamespace App;\n\nconst X = 1;\n\necho X;\n"
        );
    }

    #[test]
    fn test_braced_namespace_keeps_preceding_statement() {
        let source = "<?php\nnamespace App {\nconst X = 1;\nuse A\\B;\n\necho X;\n}\n";
        let mut rw = rewriter(source);
        rw.remove_uses(&["B".into()]);
        assert_eq!(
            rw.finish().unwrap(),
            "<?php\n\nnamespace App {\n    const X = 1;\n\necho X;\n}\n"
        );
    }

    #[test]
    fn test_crlf_header_matches_body() {
        let source = "<?php\r\nnamespace App;\r\n\r\nuse A\\B;\r\n\r\nnew Foo;\r\n";
        let out = rewrite(parse(source).unwrap(), &[name("L\\Foo")], &["B".into()], source).unwrap();
        assert_eq!(
            out,
            "<?php\r\n\r\nnamespace App;\r\n\r\nuse L\\Foo;\r\n\r\nnew Foo;\r\n"
        );
    }
}
