//! Name extraction: one traversal collecting imports and class references.
//!
//! Extraction keeps every candidate reference. Filtering against imports,
//! reserved names and the [`IgnoreSet`] happens afterwards in
//! [`Extraction::references`], because unused-import detection must see the
//! unfiltered list: a reference covered by an import is exactly what keeps
//! that import alive.

use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use super::resolve::SymbolIndex;
use crate::base::{LineCol, QualifiedName};
use crate::syntax::{Expr, Member, Name, NodeRef, SourceFile, TypeRole, UseKind, VisitControl, fold};

/// Where a class name was found.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    New,
    Extends,
    Implements,
    StaticAccess,
    ParamType,
    ReturnType,
    PropertyType,
    Instanceof,
    Catch,
    TraitUse,
    Attribute,
}

/// A class name in a position that may need an import.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reference {
    pub name: QualifiedName,
    pub kind: ReferenceKind,
    pub position: LineCol,
}

/// One name bound by a `use` statement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportEntry {
    /// Full imported name, including any group prefix.
    pub name: QualifiedName,
    /// Local name: the explicit alias or the last segment.
    pub alias: SmolStr,
    pub kind: UseKind,
    pub position: LineCol,
}

/// Everything one traversal learns about a file.
#[derive(Clone, Debug, Default)]
pub struct Extraction {
    /// Import entries in source order.
    pub imports: Vec<ImportEntry>,
    /// Class references in source order, before any filtering.
    pub candidates: Vec<Reference>,
    /// First segments used outside class positions: qualified function and
    /// constant names, and types named in doc comments.
    pub mentions: Vec<SmolStr>,
    /// Names of classes, interfaces, traits and enums declared in the file.
    pub declared: Vec<SmolStr>,
}

/// Collect imports, candidate references, mentions and declarations.
pub fn extract_names(file: &SourceFile) -> Extraction {
    let position = |name: &Name| file.line_index.line_col(name.range.start());

    let mut extraction = fold(file, Extraction::default(), |acc, node| {
        match node {
            NodeRef::Use(use_stmt) => {
                for item in &use_stmt.items {
                    acc.imports.push(ImportEntry {
                        name: use_stmt.full_name(item),
                        alias: item.alias().clone(),
                        kind: use_stmt.item_kind(item),
                        position: item
                            .range
                            .map(|range| file.line_index.line_col(range.start()))
                            .unwrap_or_default(),
                    });
                }
            }
            NodeRef::ClassLike(class) => {
                if let Some(name) = &class.name {
                    acc.declared.push(name.clone());
                }
                for name in &class.extends {
                    acc.push_candidate(name, ReferenceKind::Extends, position(name));
                }
                for name in &class.implements {
                    acc.push_candidate(name, ReferenceKind::Implements, position(name));
                }
            }
            NodeRef::Member(Member::TraitUse { traits, .. }) => {
                for name in traits {
                    acc.push_candidate(name, ReferenceKind::TraitUse, position(name));
                }
            }
            NodeRef::Type(role, ty) => {
                let kind = match role {
                    TypeRole::Param => ReferenceKind::ParamType,
                    TypeRole::Return => ReferenceKind::ReturnType,
                    TypeRole::Property => ReferenceKind::PropertyType,
                };
                for name in &ty.names {
                    acc.push_candidate(name, kind, position(name));
                }
            }
            NodeRef::Expr(expr) => match expr {
                Expr::New { class, .. } => {
                    acc.push_candidate(class, ReferenceKind::New, position(class));
                }
                Expr::StaticAccess(name) => {
                    acc.push_candidate(name, ReferenceKind::StaticAccess, position(name));
                }
                Expr::Instanceof(name) => {
                    acc.push_candidate(name, ReferenceKind::Instanceof, position(name));
                }
                Expr::Catch(names) => {
                    for name in names {
                        acc.push_candidate(name, ReferenceKind::Catch, position(name));
                    }
                }
                Expr::Attribute { name, .. } => {
                    acc.push_candidate(name, ReferenceKind::Attribute, position(name));
                }
                Expr::QualifiedUse(name) => acc.mentions.push(name.name.first().clone()),
                Expr::Closure(_) | Expr::Class(_) => {}
            },
            NodeRef::Stmt(_)
            | NodeRef::Member(_)
            | NodeRef::Function(_)
            | NodeRef::Param(_) => {}
        }
        VisitControl::Continue
    });

    for comment in &file.doc_comments {
        extraction.mentions.extend(doc_type_names(comment));
    }
    extraction
}

impl Extraction {
    fn push_candidate(&mut self, name: &Name, kind: ReferenceKind, position: LineCol) {
        if name.name.is_importable() {
            self.candidates.push(Reference {
                name: name.name.clone(),
                kind,
                position,
            });
        }
    }

    fn class_imports(&self) -> impl Iterator<Item = &ImportEntry> {
        self.imports.iter().filter(|entry| entry.kind == UseKind::Class)
    }

    /// Whether `segment` is the alias of a class import.
    pub fn is_imported_alias(&self, segment: &str) -> bool {
        self.class_imports()
            .any(|entry| entry.alias.eq_ignore_ascii_case(segment))
    }

    /// Candidate references that still need an import.
    ///
    /// Drops references whose first segment is an imported alias or a
    /// reserved self-reference, and those in the ignore set.
    pub fn references(&self, ignore: &IgnoreSet) -> Vec<&Reference> {
        self.candidates
            .iter()
            .filter(|r| !self.is_imported_alias(r.name.first()))
            .filter(|r| !is_reserved(&r.name))
            .filter(|r| !ignore.contains(&r.name))
            .collect()
    }

    /// Class imports whose alias is never the first segment of a candidate
    /// reference or a mention. Function and constant imports are never
    /// reported.
    pub fn unused_imports(&self) -> Vec<&ImportEntry> {
        let used: FxHashSet<String> = self
            .candidates
            .iter()
            .map(|r| r.name.first().to_ascii_lowercase())
            .chain(self.mentions.iter().map(|m| m.to_ascii_lowercase()))
            .collect();

        self.class_imports()
            .filter(|entry| !used.contains(&entry.alias.to_ascii_lowercase()))
            .collect()
    }
}

/// `self`, `parent` and `static` never need an import.
fn is_reserved(name: &QualifiedName) -> bool {
    name.len() == 1
        && ["self", "parent", "static"]
            .iter()
            .any(|kw| name.first().eq_ignore_ascii_case(kw))
}

// ============================================================================
// DOC COMMENTS
// ============================================================================

const DOC_TAGS: &[&str] = &[
    "@param",
    "@return",
    "@var",
    "@throws",
    "@property",
    "@property-read",
    "@property-write",
    "@method",
    "@mixin",
    "@see",
];

/// First segments of every relative type name in a doc comment's type tags.
fn doc_type_names(comment: &str) -> Vec<SmolStr> {
    let mut names = Vec::new();
    for line in comment.lines() {
        let line = line.trim_start_matches(|c: char| c.is_whitespace() || c == '*' || c == '/');
        let Some((tag, rest)) = line.split_once(char::is_whitespace) else {
            continue;
        };
        if !DOC_TAGS.contains(&tag) {
            continue;
        }
        let mut rest = rest.trim_start();
        if tag == "@method" {
            if let Some((word, after)) = rest.split_once(char::is_whitespace) {
                if word.eq_ignore_ascii_case("static") {
                    rest = after.trim_start();
                }
            }
        }

        for part in type_expression(rest).split(|c: char| "|&<>,()[]{}?".contains(c) || c.is_whitespace()) {
            let part = part.split("::").next().unwrap_or(part);
            if part.starts_with(|c: char| c.is_alphabetic() || c == '_') {
                if let Some(first) = part.split('\\').next() {
                    names.push(SmolStr::new(first));
                }
            }
        }
    }
    names
}

/// The leading type expression of a tag body, which may contain spaces
/// inside `<...>`, `(...)` or `{...}`.
fn type_expression(text: &str) -> &str {
    let mut depth = 0usize;
    for (idx, c) in text.char_indices() {
        match c {
            '<' | '(' | '{' | '[' => depth += 1,
            '>' | ')' | '}' | ']' => depth = depth.saturating_sub(1),
            c if c.is_whitespace() && depth == 0 => return &text[..idx],
            _ => {}
        }
    }
    text
}

// ============================================================================
// IGNORE SET
// ============================================================================

/// Classes and interfaces PHP provides without an import.
const BUILTIN_CLASSES: &[&str] = &[
    "ArgumentCountError",
    "ArithmeticError",
    "ArrayAccess",
    "ArrayIterator",
    "ArrayObject",
    "AssertionError",
    "Attribute",
    "BackedEnum",
    "BadFunctionCallException",
    "BadMethodCallException",
    "CachingIterator",
    "Closure",
    "Countable",
    "DateInterval",
    "DatePeriod",
    "DateTime",
    "DateTimeImmutable",
    "DateTimeInterface",
    "DateTimeZone",
    "DivisionByZeroError",
    "DomainException",
    "Error",
    "ErrorException",
    "Exception",
    "Fiber",
    "FilesystemIterator",
    "Generator",
    "InvalidArgumentException",
    "Iterator",
    "IteratorAggregate",
    "IteratorIterator",
    "JsonException",
    "JsonSerializable",
    "LengthException",
    "LogicException",
    "OutOfBoundsException",
    "OutOfRangeException",
    "OverflowException",
    "PDO",
    "PDOException",
    "PDOStatement",
    "RangeException",
    "RecursiveArrayIterator",
    "RecursiveDirectoryIterator",
    "RecursiveIteratorIterator",
    "ReflectionClass",
    "ReflectionException",
    "ReflectionMethod",
    "ReflectionProperty",
    "ReturnTypeWillChange",
    "RuntimeException",
    "SensitiveParameter",
    "Serializable",
    "SplFileInfo",
    "SplFileObject",
    "SplObjectStorage",
    "SplQueue",
    "SplStack",
    "Stringable",
    "Throwable",
    "Traversable",
    "TypeError",
    "UnderflowException",
    "UnexpectedValueException",
    "UnitEnum",
    "ValueError",
    "WeakMap",
    "WeakReference",
    "stdClass",
];

/// Names that never need an import, compared case-insensitively by their
/// full `\`-joined form.
#[derive(Clone, Debug, Default)]
pub struct IgnoreSet {
    names: FxHashSet<String>,
}

impl IgnoreSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// An ignore set seeded with PHP's built-in classes.
    pub fn with_builtins() -> Self {
        let mut set = Self::new();
        set.extend(BUILTIN_CLASSES.iter().copied());
        set
    }

    pub fn insert(&mut self, name: &str) {
        self.names.insert(name.to_ascii_lowercase());
    }

    pub fn extend<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.insert(name.as_ref());
        }
    }

    pub fn contains(&self, name: &QualifiedName) -> bool {
        self.names.contains(&name.joined().to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Ignore everything a file can already reach without an import:
    /// classes it declares and index symbols inside its own namespace,
    /// named relative to that namespace.
    pub fn add_file_scope(
        &mut self,
        extraction: &Extraction,
        namespace: Option<&QualifiedName>,
        index: &SymbolIndex,
    ) {
        self.extend(&extraction.declared);
        for name in index.relative_to(namespace) {
            self.insert(&name.joined());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::FileId;
    use crate::hir::SymbolEntry;
    use crate::syntax::parse;

    fn extract(source: &str) -> Extraction {
        extract_names(&parse(source).unwrap())
    }

    fn joined(refs: &[&Reference]) -> Vec<String> {
        refs.iter().map(|r| r.name.joined()).collect()
    }

    #[test]
    fn test_imports_in_source_order() {
        let extraction = extract(
            "<?php\nnamespace App;\nuse A\\B;\nuse C\\{D, E as F};\nuse function g\\h;\n",
        );
        let imports: Vec<_> = extraction
            .imports
            .iter()
            .map(|e| (e.name.joined(), e.alias.to_string(), e.kind))
            .collect();
        assert_eq!(
            imports,
            vec![
                ("A\\B".to_string(), "B".to_string(), UseKind::Class),
                ("C\\D".to_string(), "D".to_string(), UseKind::Class),
                ("C\\E".to_string(), "F".to_string(), UseKind::Class),
                ("g\\h".to_string(), "h".to_string(), UseKind::Function),
            ]
        );
        assert_eq!(extraction.imports[0].position, LineCol::new(2, 4));
    }

    #[test]
    fn test_candidate_positions() {
        let extraction = extract(
            "<?php\nclass A extends B implements C {\n    use T;\n    public D $d;\n    function f(E $e): F {\n        new G;\n        H::x();\n        $a instanceof I;\n        try {} catch (J $j) {}\n    }\n}\n#[K]\nfunction g() {}\n",
        );
        let kinds: Vec<_> = extraction
            .candidates
            .iter()
            .map(|r| (r.name.joined(), r.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("B".to_string(), ReferenceKind::Extends),
                ("C".to_string(), ReferenceKind::Implements),
                ("T".to_string(), ReferenceKind::TraitUse),
                ("D".to_string(), ReferenceKind::PropertyType),
                ("E".to_string(), ReferenceKind::ParamType),
                ("F".to_string(), ReferenceKind::ReturnType),
                ("G".to_string(), ReferenceKind::New),
                ("H".to_string(), ReferenceKind::StaticAccess),
                ("I".to_string(), ReferenceKind::Instanceof),
                ("J".to_string(), ReferenceKind::Catch),
                ("K".to_string(), ReferenceKind::Attribute),
            ]
        );
        assert_eq!(extraction.declared, vec![SmolStr::new("A")]);
        assert_eq!(extraction.candidates[6].position, LineCol::new(5, 12));
    }

    #[test]
    fn test_fully_qualified_names_are_not_candidates() {
        let extraction = extract("<?php\nnew \\App\\Foo;\nnew namespace\\Bar;\nnew Baz;\n");
        let names: Vec<_> = extraction.candidates.iter().map(|r| r.name.joined()).collect();
        assert_eq!(names, vec!["Baz"]);
    }

    #[test]
    fn test_references_filtering() {
        let extraction = extract(
            "<?php\nnamespace App;\nuse Lib\\Models;\nnew Models\\User;\nnew self;\nnew STATIC;\nnew Exception;\nnew Local;\nnew Missing;\nclass Local {}\n",
        );
        let mut ignore = IgnoreSet::with_builtins();
        ignore.add_file_scope(&extraction, None, &SymbolIndex::new());

        assert_eq!(joined(&extraction.references(&ignore)), vec!["Missing"]);
    }

    #[test]
    fn test_alias_match_is_case_insensitive() {
        let extraction = extract("<?php\nuse Lib\\Foo;\nnew foo;\n");
        assert!(extraction.references(&IgnoreSet::new()).is_empty());
        assert!(extraction.unused_imports().is_empty());
    }

    #[test]
    fn test_unused_uses_prefilter_references() {
        let extraction = extract(
            "<?php\nnamespace App;\nuse Lib\\Used;\nuse Lib\\Unused;\nuse Lib\\Sub;\nuse function Lib\\helper;\nnew Used;\nSub\\run();\n",
        );
        let unused: Vec<_> = extraction
            .unused_imports()
            .iter()
            .map(|e| e.alias.to_string())
            .collect();
        assert_eq!(unused, vec!["Unused"]);
    }

    #[test]
    fn test_doc_comment_types_keep_imports() {
        let extraction = extract(
            "<?php\nuse Lib\\Collection;\nuse Lib\\User;\nuse Lib\\Builder;\nuse Lib\\Gone;\n/**\n * @param Collection<int, User> $users\n * @mixin Builder\n */\nfunction f($users) {}\n",
        );
        assert_eq!(
            extraction
                .unused_imports()
                .iter()
                .map(|e| e.alias.as_str())
                .collect::<Vec<_>>(),
            vec!["Gone"]
        );
    }

    #[test]
    fn test_doc_type_names() {
        assert_eq!(
            doc_type_names("/** @return ?Foo\\Bar|array<Baz> */"),
            vec!["Foo", "array", "Baz"]
        );
        assert_eq!(doc_type_names("/** @method static Qux make() */"), vec!["Qux"]);
        assert_eq!(doc_type_names("/** @see Other::method() */"), vec!["Other"]);
        assert_eq!(
            doc_type_names("/** @var array<string, Item> $items */"),
            vec!["array", "string", "Item"]
        );
        assert!(doc_type_names("/** @throws \\RuntimeException */").is_empty());
        assert!(doc_type_names("/** plain text */").is_empty());
    }

    #[test]
    fn test_ignore_set_uses_namespace_relative_names() {
        let extraction = extract("<?php\nnamespace App;\nnew Sibling;\nnew Models\\User;\nnew Other;\n");
        let index: SymbolIndex = ["App\\Sibling", "App\\Models\\User", "Lib\\Other"]
            .into_iter()
            .map(|name| SymbolEntry::new(QualifiedName::parse(name).unwrap(), FileId::new(0)))
            .collect();
        let namespace = QualifiedName::parse("App").unwrap();

        let mut ignore = IgnoreSet::new();
        ignore.add_file_scope(&extraction, Some(&namespace), &index);

        assert_eq!(joined(&extraction.references(&ignore)), vec!["Other"]);
    }
}
