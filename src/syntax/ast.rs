//! Syntax tree for the parts of a PHP file the import fixer cares about.
//!
//! Statement-level structure (namespaces, imports, declarations) is modelled
//! exactly. Everything inside bodies is reduced to the [`Expr`] nodes that
//! mention class names; the rest of a statement survives only as its
//! verbatim source text.

use smol_str::SmolStr;

use crate::base::{LineIndex, QualifiedName, TextRange, TextSize};

/// A parsed PHP file.
#[derive(Clone, Debug)]
pub struct SourceFile {
    /// Text before the first `<?php` (shebang lines, HTML templates).
    pub leading_html: Option<String>,
    /// The first open tag; `None` if the file has no PHP code.
    pub open_tag: Option<OpenTag>,
    pub stmts: Vec<Stmt>,
    /// Every `/** ... */` comment in source order.
    pub doc_comments: Vec<SmolStr>,
    pub line_index: LineIndex,
}

impl SourceFile {
    pub fn has_code(&self) -> bool {
        self.open_tag.is_some()
    }

    /// The single namespace declaration, if any.
    pub fn namespace(&self) -> Option<&Namespace> {
        self.stmts.iter().find_map(|stmt| match &stmt.kind {
            StmtKind::Namespace(ns) => Some(ns),
            _ => None,
        })
    }

    /// Statements that share a scope with the file's imports: the namespace
    /// body when there is a namespace, otherwise the top level.
    pub fn import_scope(&self) -> &[Stmt] {
        for stmt in &self.stmts {
            if let StmtKind::Namespace(ns) = &stmt.kind {
                return &ns.stmts;
            }
        }
        &self.stmts
    }

    pub fn import_scope_mut(&mut self) -> &mut Vec<Stmt> {
        let position = self
            .stmts
            .iter()
            .position(|stmt| matches!(stmt.kind, StmtKind::Namespace(_)));
        match position {
            Some(idx) => match &mut self.stmts[idx].kind {
                StmtKind::Namespace(ns) => &mut ns.stmts,
                _ => unreachable!("position matched a namespace"),
            },
            None => &mut self.stmts,
        }
    }

    /// 0-indexed line of a byte range's start.
    pub fn start_line(&self, range: TextRange) -> u32 {
        self.line_index.line(range.start())
    }

    /// 0-indexed line of a byte range's last byte.
    pub fn end_line(&self, range: TextRange) -> u32 {
        if range.is_empty() {
            return self.line_index.line(range.start());
        }
        self.line_index.line(range.end() - TextSize::from(1))
    }
}

/// `<?php` or `<?=` with an optional comment on the same line.
#[derive(Clone, Debug)]
pub struct OpenTag {
    pub text: SmolStr,
    pub range: TextRange,
    pub comment: Option<SmolStr>,
}

/// One statement with its attached comments.
#[derive(Clone, Debug)]
pub struct Stmt {
    pub kind: StmtKind,
    /// Source range; `None` for statements synthesized by the rewriter.
    pub range: Option<TextRange>,
    /// Exact source text of the statement (empty when synthesized).
    pub text: String,
    /// Comments on the lines directly above the statement.
    pub comments: Vec<SmolStr>,
    /// A single-line comment following the statement on its last line.
    pub trailing_comment: Option<SmolStr>,
}

impl Stmt {
    pub fn synthesized(kind: StmtKind) -> Self {
        Self {
            kind,
            range: None,
            text: String::new(),
            comments: Vec::new(),
            trailing_comment: None,
        }
    }

    pub fn as_use(&self) -> Option<&UseStmt> {
        match &self.kind {
            StmtKind::Use(use_stmt) => Some(use_stmt),
            _ => None,
        }
    }

    pub fn is_use(&self) -> bool {
        matches!(self.kind, StmtKind::Use(_))
    }
}

#[derive(Clone, Debug)]
pub enum StmtKind {
    /// `declare(strict_types=1);`
    Declare(Block),
    Namespace(Namespace),
    Use(UseStmt),
    ClassLike(ClassLike),
    Function(FunctionLike),
    /// Any other statement, reduced to the class-name expressions inside it.
    Other(Block),
}

/// The class-name expressions found inside an opaque region.
#[derive(Clone, Debug, Default)]
pub struct Block {
    pub exprs: Vec<Expr>,
}

/// A name as it appears in source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Name {
    pub name: QualifiedName,
    pub range: TextRange,
}

#[derive(Clone, Debug)]
pub struct Namespace {
    /// `None` for the global `namespace { }` block.
    pub name: Option<Name>,
    /// `namespace Foo { ... }` rather than `namespace Foo;`.
    pub braced: bool,
    /// From the `namespace` keyword through the `;` or `{`.
    pub header: TextRange,
    /// A single-line comment after the header on the same line.
    pub header_comment: Option<SmolStr>,
    pub stmts: Vec<Stmt>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UseKind {
    Class,
    Function,
    Const,
}

impl UseKind {
    pub fn keyword(self) -> Option<&'static str> {
        match self {
            UseKind::Class => None,
            UseKind::Function => Some("function"),
            UseKind::Const => Some("const"),
        }
    }
}

/// `use A\B;`, `use A\B as C, D;`, `use function a\b;`, `use A\{B, C as D};`
#[derive(Clone, Debug)]
pub struct UseStmt {
    pub kind: UseKind,
    /// The `A` of a group import `use A\{...}`.
    pub group_prefix: Option<QualifiedName>,
    pub items: Vec<UseItem>,
}

impl UseStmt {
    /// A plain `use Name;` statement.
    pub fn single(name: QualifiedName) -> Self {
        Self {
            kind: UseKind::Class,
            group_prefix: None,
            items: vec![UseItem {
                name,
                alias: None,
                kind: None,
                range: None,
            }],
        }
    }

    /// Full imported name of an item, including any group prefix.
    pub fn full_name(&self, item: &UseItem) -> QualifiedName {
        match &self.group_prefix {
            Some(prefix) => prefix.join(&item.name),
            None => item.name.clone(),
        }
    }

    /// Import kind of an item, honouring per-item kinds in mixed groups.
    pub fn item_kind(&self, item: &UseItem) -> UseKind {
        item.kind.unwrap_or(self.kind)
    }

    /// Full name of the first bound item, used as the sort key.
    pub fn first_name(&self) -> Option<QualifiedName> {
        self.items.first().map(|item| self.full_name(item))
    }

    /// Whether this statement binds `name` (compared by full name and kind).
    pub fn binds(&self, name: &QualifiedName, kind: UseKind) -> bool {
        self.items.iter().any(|item| {
            self.item_kind(item) == kind && self.full_name(item).segments() == name.segments()
        })
    }
}

#[derive(Clone, Debug)]
pub struct UseItem {
    pub name: QualifiedName,
    /// Explicit `as` alias.
    pub alias: Option<SmolStr>,
    /// Per-item `function`/`const` inside a mixed group import.
    pub kind: Option<UseKind>,
    pub range: Option<TextRange>,
}

impl UseItem {
    /// The local name this item binds: the alias or the last segment.
    pub fn alias(&self) -> &SmolStr {
        self.alias.as_ref().unwrap_or_else(|| self.name.last())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    Interface,
    Trait,
    Enum,
}

/// A class, interface, trait or enum, named or anonymous.
#[derive(Clone, Debug)]
pub struct ClassLike {
    pub kind: ClassKind,
    pub name: Option<SmolStr>,
    pub attributes: Vec<Expr>,
    pub extends: Vec<Name>,
    pub implements: Vec<Name>,
    /// Constructor arguments of an anonymous class.
    pub arguments: Vec<Expr>,
    pub members: Vec<Member>,
}

#[derive(Clone, Debug)]
pub enum Member {
    Method(FunctionLike),
    /// `use SomeTrait, OtherTrait;` inside a class body.
    TraitUse { traits: Vec<Name>, adaptations: Vec<Expr> },
    Property {
        attributes: Vec<Expr>,
        ty: Option<TypeHint>,
        initializer: Vec<Expr>,
    },
    /// Constants, enum cases and anything else, reduced to expressions.
    Other(Vec<Expr>),
}

/// A named function, method, closure or arrow function.
#[derive(Clone, Debug, Default)]
pub struct FunctionLike {
    pub name: Option<SmolStr>,
    pub attributes: Vec<Expr>,
    pub params: Vec<Param>,
    pub return_type: Option<TypeHint>,
    pub body: Vec<Expr>,
}

#[derive(Clone, Debug)]
pub struct Param {
    pub name: SmolStr,
    pub attributes: Vec<Expr>,
    pub ty: Option<TypeHint>,
    pub default: Vec<Expr>,
}

/// A type declaration reduced to the class names it mentions.
///
/// Scalar and pseudo types (`int`, `?string`, `mixed`, ...) are dropped by
/// the parser; `self`, `static` and `parent` are kept.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TypeHint {
    pub names: Vec<Name>,
}

/// Expressions that mention class names.
#[derive(Clone, Debug)]
pub enum Expr {
    /// `new Foo(...)`
    New { class: Name, arguments: Vec<Expr> },
    /// `Foo::bar()`, `Foo::$baz`, `Foo::CONST`, `Foo::class`
    StaticAccess(Name),
    /// `$x instanceof Foo`
    Instanceof(Name),
    /// `catch (A | B $e)`
    Catch(Vec<Name>),
    /// `#[Foo(...)]`
    Attribute { name: Name, arguments: Vec<Expr> },
    /// A qualified function or constant name such as `Sub\helper()`. Not a
    /// class position, but its first segment may be an import alias.
    QualifiedUse(Name),
    /// Closures, arrow functions and functions declared inside blocks.
    Closure(Box<FunctionLike>),
    /// Anonymous classes and classes declared inside blocks.
    Class(Box<ClassLike>),
}
