//! Recursive descent parser for the import-relevant subset of PHP.
//!
//! Statement structure is parsed precisely. Bodies are scanned token by
//! token: the scanner keeps delimiters balanced and records the positions
//! where a class name may appear, but does not build expressions.

use smol_str::SmolStr;
use thiserror::Error;

use super::ast::*;
use super::lexer::{Token, TokenKind, tokenize};
use crate::base::{LineIndex, NameKind, QualifiedName, TextRange, TextSize};

/// A syntax error with location and message
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub range: TextRange,
}

impl ParseError {
    pub fn new(message: impl Into<String>, range: TextRange) -> Self {
        Self {
            message: message.into(),
            range,
        }
    }
}

pub type Result<T, E = ParseError> = std::result::Result<T, E>;

/// Parse PHP source text into a [`SourceFile`].
pub fn parse(input: &str) -> Result<SourceFile> {
    let tokens = tokenize(input);
    let mut parser = Parser::new(input, &tokens);
    parser.parse_source_file()
}

/// Type keywords that never name a class.
const SCALAR_TYPES: &[&str] = &[
    "array", "bool", "callable", "false", "float", "int", "iterable", "mixed", "never", "null",
    "object", "string", "true", "void",
];

const CONTROL_KEYWORDS: &[&str] = &[
    "if", "elseif", "else", "for", "foreach", "while", "switch", "try", "catch", "finally", "do",
    "declare",
];

const MEMBER_MODIFIERS: &[&str] = &[
    "public", "protected", "private", "static", "abstract", "final", "readonly", "var",
];

const CLASS_MODIFIERS: &[&str] = &["abstract", "final", "readonly"];

#[derive(Copy, Clone, PartialEq, Eq)]
enum Scope {
    File,
    Namespace,
    BracedNamespace,
}

struct Parser<'a> {
    source: &'a str,
    tokens: &'a [Token<'a>],
    pos: usize,
    /// End of the last significant token consumed.
    last_end: TextSize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, tokens: &'a [Token<'a>]) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            last_end: TextSize::from(0),
        }
    }

    // =========================================================================
    // Token inspection
    // =========================================================================

    fn significant_index(&self, from: usize) -> usize {
        let mut idx = from;
        while idx < self.tokens.len() && self.tokens[idx].kind.is_trivia() {
            idx += 1;
        }
        idx
    }

    fn current(&self) -> Option<Token<'a>> {
        self.tokens.get(self.significant_index(self.pos)).copied()
    }

    fn current_kind(&self) -> Option<TokenKind> {
        self.current().map(|t| t.kind)
    }

    /// The `n`th significant token ahead (0 is the current one).
    fn nth(&self, n: usize) -> Option<Token<'a>> {
        let mut idx = self.significant_index(self.pos);
        for _ in 0..n {
            idx = self.significant_index(idx + 1);
        }
        self.tokens.get(idx).copied()
    }

    fn nth_kind(&self, n: usize) -> Option<TokenKind> {
        self.nth(n).map(|t| t.kind)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current_kind() == Some(kind)
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        self.nth_is_keyword(0, keyword)
    }

    fn nth_is_keyword(&self, n: usize, keyword: &str) -> bool {
        self.nth(n)
            .is_some_and(|t| t.kind == TokenKind::Name && t.text.eq_ignore_ascii_case(keyword))
    }

    fn at_any_keyword(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|kw| self.at_keyword(kw))
    }

    fn current_range(&self) -> TextRange {
        match self.current() {
            Some(token) => token.range(),
            None => TextRange::empty(TextSize::of(self.source)),
        }
    }

    // =========================================================================
    // Token consumption
    // =========================================================================

    fn bump(&mut self) -> Option<Token<'a>> {
        let idx = self.significant_index(self.pos);
        let token = self.tokens.get(idx).copied()?;
        self.pos = idx + 1;
        self.last_end = token.end();
        Some(token)
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.at_keyword(keyword) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token<'a>> {
        if self.at(kind) {
            if let Some(token) = self.bump() {
                return Ok(token);
            }
        }
        Err(self.error(format!("expected {what}")))
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.current_range())
    }

    fn text(&self, range: TextRange) -> &'a str {
        &self.source[range]
    }

    /// Consume a name token. `None` if the current token is not a name.
    fn name(&mut self) -> Option<Name> {
        let token = self.current()?;
        if token.kind != TokenKind::Name {
            return None;
        }
        self.bump();
        Some(Name {
            name: QualifiedName::parse(token.text)?,
            range: token.range(),
        })
    }

    fn expect_name(&mut self, what: &str) -> Result<Name> {
        self.name()
            .ok_or_else(|| self.error(format!("expected {what}")))
    }

    // =========================================================================
    // Trivia
    // =========================================================================

    /// Consume trivia before the next statement, returning its comments.
    fn leading_comments(&mut self) -> Vec<SmolStr> {
        let mut comments = Vec::new();
        while let Some(token) = self.tokens.get(self.pos).copied() {
            if !token.kind.is_trivia() {
                break;
            }
            if token.kind.is_comment() {
                comments.push(SmolStr::new(token.text.trim_end()));
            }
            self.pos += 1;
        }
        comments
    }

    /// A single-line comment right after the last consumed token, with nothing
    /// but a line break after it.
    fn trailing_comment(&mut self) -> Option<SmolStr> {
        let mut idx = self.pos;
        if let Some(ws) = self.tokens.get(idx).copied() {
            if ws.kind == TokenKind::Whitespace {
                if ws.text.contains('\n') {
                    return None;
                }
                idx += 1;
            }
        }

        let comment = self.tokens.get(idx).copied()?;
        if !comment.kind.is_comment() || comment.text.trim_end().contains('\n') {
            return None;
        }
        let line_ends = comment.text.ends_with('\n')
            || self
                .tokens
                .get(idx + 1)
                .is_none_or(|next| next.kind == TokenKind::Whitespace && next.text.contains('\n'));
        if !line_ends {
            return None;
        }

        self.pos = idx + 1;
        Some(SmolStr::new(comment.text.trim_end()))
    }

    // =========================================================================
    // File and statements
    // =========================================================================

    fn parse_source_file(&mut self) -> Result<SourceFile> {
        let line_index = LineIndex::new(self.source);
        let doc_comments = self
            .tokens
            .iter()
            .filter(|t| t.kind == TokenKind::DocComment)
            .map(|t| SmolStr::new(t.text))
            .collect();

        let mut leading_html = None;
        if let Some(first) = self.tokens.first() {
            if first.kind == TokenKind::InlineHtml {
                leading_html = Some(first.text.to_string());
                self.pos = 1;
            }
        }

        let open_tag = match self.tokens.get(self.pos).copied() {
            Some(token) if token.kind == TokenKind::OpenTag => {
                self.bump();
                Some(OpenTag {
                    text: SmolStr::new(token.text),
                    range: token.range(),
                    comment: self.trailing_comment(),
                })
            }
            _ => None,
        };

        let stmts = match open_tag {
            Some(_) => self.parse_stmts(Scope::File)?,
            None => Vec::new(),
        };

        Ok(SourceFile {
            leading_html,
            open_tag,
            stmts,
            doc_comments,
            line_index,
        })
    }

    fn parse_stmts(&mut self, scope: Scope) -> Result<Vec<Stmt>> {
        let mut stmts = Vec::new();
        loop {
            let checkpoint = self.pos;
            let comments = self.leading_comments();

            match self.current_kind() {
                None if scope == Scope::BracedNamespace => {
                    return Err(self.error("unclosed namespace block"));
                }
                None => break,
                Some(TokenKind::RBrace) if scope == Scope::BracedNamespace => break,
                Some(TokenKind::RBrace) => return Err(self.error("unmatched `}`")),
                _ => {}
            }

            if self.at_namespace_declaration() {
                match scope {
                    Scope::Namespace => {
                        self.pos = checkpoint;
                        break;
                    }
                    Scope::BracedNamespace => {
                        return Err(self.error("namespace declarations cannot be nested"));
                    }
                    Scope::File => {}
                }
            }

            let mut stmt = self.parse_stmt()?;
            stmt.comments = comments;
            stmts.push(stmt);
        }
        Ok(stmts)
    }

    fn at_namespace_declaration(&self) -> bool {
        self.at_keyword("namespace")
            && matches!(
                self.nth_kind(1),
                Some(TokenKind::Name | TokenKind::LBrace)
            )
    }

    fn parse_stmt(&mut self) -> Result<Stmt> {
        let start = self.current_range().start();

        let kind = if self.at_namespace_declaration() {
            StmtKind::Namespace(self.parse_namespace()?)
        } else if self.at_keyword("use") {
            StmtKind::Use(self.parse_use()?)
        } else if self.at_keyword("declare") && self.nth_kind(1) == Some(TokenKind::LParen) {
            StmtKind::Declare(Block {
                exprs: self.scan_statement()?,
            })
        } else {
            let attributes = self.attributes()?;
            if self.at_class_start() {
                StmtKind::ClassLike(self.parse_class_like(attributes)?)
            } else if self.at_function_declaration() {
                StmtKind::Function(self.parse_function(attributes)?)
            } else {
                let mut exprs = attributes;
                exprs.extend(self.scan_statement()?);
                StmtKind::Other(Block { exprs })
            }
        };

        let range = TextRange::new(start, self.last_end.max(start));
        let trailing_comment = match kind {
            StmtKind::Declare(_) | StmtKind::Use(_) => self.trailing_comment(),
            _ => None,
        };

        Ok(Stmt {
            kind,
            range: Some(range),
            text: self.text(range).to_string(),
            comments: Vec::new(),
            trailing_comment,
        })
    }

    fn parse_namespace(&mut self) -> Result<Namespace> {
        let keyword = self.expect(TokenKind::Name, "`namespace`")?;
        let name = match self.current_kind() {
            Some(TokenKind::Name) => self.name(),
            _ => None,
        };

        if self.eat(TokenKind::LBrace) {
            let header = TextRange::new(keyword.offset, self.last_end);
            let header_comment = self.trailing_comment();
            let stmts = self.parse_stmts(Scope::BracedNamespace)?;
            self.expect(TokenKind::RBrace, "`}` closing the namespace")?;
            return Ok(Namespace {
                name,
                braced: true,
                header,
                header_comment,
                stmts,
            });
        }

        if name.is_none() {
            return Err(self.error("expected namespace name or `{`"));
        }
        self.expect(TokenKind::Semicolon, "`;` after namespace name")?;
        let header = TextRange::new(keyword.offset, self.last_end);
        let header_comment = self.trailing_comment();
        let stmts = self.parse_stmts(Scope::Namespace)?;

        Ok(Namespace {
            name,
            braced: false,
            header,
            header_comment,
            stmts,
        })
    }

    // =========================================================================
    // Imports
    // =========================================================================

    fn parse_use(&mut self) -> Result<UseStmt> {
        self.bump();
        let kind = self.use_kind().unwrap_or(UseKind::Class);
        let first = self.expect_name("imported name")?;

        if self.at(TokenKind::Backslash) && self.nth_kind(1) == Some(TokenKind::LBrace) {
            self.bump();
            self.bump();
            let mut items = Vec::new();
            while !self.eat(TokenKind::RBrace) {
                let item_kind = self.use_kind();
                let name = self.expect_name("imported name")?;
                items.push(self.use_item(name, item_kind));
                if !self.eat(TokenKind::Comma) {
                    self.expect(TokenKind::RBrace, "`}` closing the group import")?;
                    break;
                }
            }
            self.expect(TokenKind::Semicolon, "`;` after import")?;
            return Ok(UseStmt {
                kind,
                group_prefix: Some(import_name(first.name)),
                items,
            });
        }

        let mut items = vec![self.use_item(first, None)];
        while self.eat(TokenKind::Comma) {
            let name = self.expect_name("imported name")?;
            items.push(self.use_item(name, None));
        }
        self.expect(TokenKind::Semicolon, "`;` after import")?;

        Ok(UseStmt {
            kind,
            group_prefix: None,
            items,
        })
    }

    /// `function` or `const` directly before an imported name.
    fn use_kind(&mut self) -> Option<UseKind> {
        if self.nth_kind(1) != Some(TokenKind::Name) {
            return None;
        }
        let kind = if self.at_keyword("function") {
            UseKind::Function
        } else if self.at_keyword("const") {
            UseKind::Const
        } else {
            return None;
        };
        self.bump();
        Some(kind)
    }

    fn use_item(&mut self, name: Name, kind: Option<UseKind>) -> UseItem {
        let alias = if self.eat_keyword("as") {
            self.name().map(|alias| alias.name.last().clone())
        } else {
            None
        };
        UseItem {
            name: import_name(name.name),
            alias,
            kind,
            range: Some(TextRange::new(name.range.start(), self.last_end)),
        }
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    fn at_class_start(&self) -> bool {
        let mut n = 0;
        while CLASS_MODIFIERS.iter().any(|m| self.nth_is_keyword(n, m)) {
            n += 1;
        }
        ["class", "interface", "trait", "enum"]
            .iter()
            .any(|kw| self.nth_is_keyword(n, kw))
            && self.nth_kind(n + 1) == Some(TokenKind::Name)
    }

    fn at_function_declaration(&self) -> bool {
        self.at_keyword("function")
            && match self.nth_kind(1) {
                Some(TokenKind::Name) => true,
                Some(TokenKind::Amp) => self.nth_kind(2) == Some(TokenKind::Name),
                _ => false,
            }
    }

    fn parse_class_like(&mut self, attributes: Vec<Expr>) -> Result<ClassLike> {
        while self.at_any_keyword(CLASS_MODIFIERS) {
            self.bump();
        }
        let keyword = self.expect(TokenKind::Name, "class keyword")?;
        let kind = match keyword.text.to_ascii_lowercase().as_str() {
            "interface" => ClassKind::Interface,
            "trait" => ClassKind::Trait,
            "enum" => ClassKind::Enum,
            _ => ClassKind::Class,
        };
        let name = self.expect_name("class name")?;
        self.class_tail(kind, Some(name.name.last().clone()), attributes, Vec::new())
    }

    fn parse_anonymous_class(&mut self, attributes: Vec<Expr>) -> Result<ClassLike> {
        self.bump();
        let mut arguments = Vec::new();
        if self.at(TokenKind::LParen) {
            self.scan_group(&mut arguments)?;
        }
        self.class_tail(ClassKind::Class, None, attributes, arguments)
    }

    fn class_tail(
        &mut self,
        kind: ClassKind,
        name: Option<SmolStr>,
        attributes: Vec<Expr>,
        arguments: Vec<Expr>,
    ) -> Result<ClassLike> {
        if kind == ClassKind::Enum && self.eat(TokenKind::Colon) {
            self.name();
        }
        let extends = if self.eat_keyword("extends") {
            self.name_list()?
        } else {
            Vec::new()
        };
        let implements = if self.eat_keyword("implements") {
            self.name_list()?
        } else {
            Vec::new()
        };
        self.expect(TokenKind::LBrace, "`{` opening the class body")?;
        let members = self.parse_members()?;

        Ok(ClassLike {
            kind,
            name,
            attributes,
            extends,
            implements,
            arguments,
            members,
        })
    }

    fn name_list(&mut self) -> Result<Vec<Name>> {
        let mut names = vec![self.expect_name("class name")?];
        while self.eat(TokenKind::Comma) {
            names.push(self.expect_name("class name")?);
        }
        Ok(names)
    }

    fn parse_members(&mut self) -> Result<Vec<Member>> {
        let mut members = Vec::new();
        loop {
            let attributes = self.attributes()?;
            match self.current_kind() {
                None => return Err(self.error("unclosed class body")),
                Some(TokenKind::RBrace) => {
                    self.bump();
                    return Ok(members);
                }
                Some(TokenKind::Semicolon) => {
                    self.bump();
                    continue;
                }
                _ => {}
            }

            if self.eat_keyword("use") {
                let traits = self.name_list()?;
                let mut adaptations = Vec::new();
                if self.at(TokenKind::LBrace) {
                    self.scan_group(&mut adaptations)?;
                } else {
                    self.expect(TokenKind::Semicolon, "`;` after trait use")?;
                }
                members.push(Member::TraitUse {
                    traits,
                    adaptations,
                });
                continue;
            }

            self.modifiers(MEMBER_MODIFIERS)?;

            let member = if self.at_keyword("function") {
                Member::Method(self.parse_function(attributes)?)
            } else if self.at_keyword("const") || self.at_keyword("case") {
                let mut exprs = attributes;
                self.scan_member_tail(&mut exprs)?;
                Member::Other(exprs)
            } else {
                let ty = self.parse_type()?;
                let mut initializer = Vec::new();
                self.scan_member_tail(&mut initializer)?;
                Member::Property {
                    attributes,
                    ty,
                    initializer,
                }
            };
            members.push(member);
        }
    }

    /// Visibility and similar keywords, including `private(set)`.
    fn modifiers(&mut self, modifiers: &[&str]) -> Result<()> {
        while self.at_any_keyword(modifiers) {
            self.bump();
            if self.at(TokenKind::LParen) {
                self.scan_group(&mut Vec::new())?;
            }
        }
        Ok(())
    }

    /// The rest of a constant, case or property declaration.
    fn scan_member_tail(&mut self, exprs: &mut Vec<Expr>) -> Result<()> {
        loop {
            match self.current_kind() {
                None => return Err(self.error("unclosed class body")),
                Some(TokenKind::Semicolon) => {
                    self.bump();
                    return Ok(());
                }
                Some(TokenKind::RBrace) => return Ok(()),
                Some(TokenKind::LBrace) => return self.scan_group(exprs),
                _ => self.scan_one(exprs)?,
            }
        }
    }

    /// A named function or method declaration.
    fn parse_function(&mut self, attributes: Vec<Expr>) -> Result<FunctionLike> {
        self.bump();
        self.eat(TokenKind::Amp);
        let name = self.expect_name("function name")?;
        let params = self.params()?;
        let return_type = self.return_type()?;

        let mut body = Vec::new();
        if self.at(TokenKind::LBrace) {
            self.scan_group(&mut body)?;
        } else {
            self.expect(TokenKind::Semicolon, "function body or `;`")?;
        }

        Ok(FunctionLike {
            name: Some(name.name.last().clone()),
            attributes,
            params,
            return_type,
            body,
        })
    }

    fn params(&mut self) -> Result<Vec<Param>> {
        self.expect(TokenKind::LParen, "`(` opening the parameter list")?;
        let mut params = Vec::new();
        loop {
            match self.current_kind() {
                None => return Err(self.error("unclosed parameter list")),
                Some(TokenKind::RParen) => {
                    self.bump();
                    return Ok(params);
                }
                Some(TokenKind::Comma) => {
                    self.bump();
                    continue;
                }
                _ => {}
            }

            let attributes = self.attributes()?;
            self.modifiers(&["public", "protected", "private", "readonly"])?;
            let ty = self.parse_type()?;
            self.eat(TokenKind::Amp);
            self.eat(TokenKind::Ellipsis);
            let name = match self.current() {
                Some(token) if token.kind == TokenKind::Variable => {
                    self.bump();
                    SmolStr::new(&token.text[1..])
                }
                _ => SmolStr::default(),
            };

            let mut default = Vec::new();
            loop {
                match self.current_kind() {
                    None | Some(TokenKind::Comma | TokenKind::RParen) => break,
                    _ => self.scan_one(&mut default)?,
                }
            }

            params.push(Param {
                name,
                attributes,
                ty,
                default,
            });
        }
    }

    fn return_type(&mut self) -> Result<Option<TypeHint>> {
        if self.eat(TokenKind::Colon) {
            self.parse_type()
        } else {
            Ok(None)
        }
    }

    /// A type declaration: nullable, union, intersection or DNF.
    fn parse_type(&mut self) -> Result<Option<TypeHint>> {
        let mut names = Vec::new();
        let mut seen = false;
        loop {
            let nullable = self.eat(TokenKind::Question);
            if self.eat(TokenKind::LParen) {
                loop {
                    match self.current_kind() {
                        Some(TokenKind::Name) => self.type_name(&mut names),
                        Some(TokenKind::Amp) => {
                            self.bump();
                        }
                        Some(TokenKind::RParen) => {
                            self.bump();
                            break;
                        }
                        _ => return Err(self.error("malformed type")),
                    }
                }
            } else if self.at(TokenKind::Name) {
                self.type_name(&mut names);
            } else if nullable {
                return Err(self.error("expected type after `?`"));
            } else {
                break;
            }
            seen = true;

            if self.eat(TokenKind::Pipe) {
                continue;
            }
            let intersection = self.at(TokenKind::Amp)
                && !matches!(
                    self.nth_kind(1),
                    Some(TokenKind::Variable | TokenKind::Ellipsis | TokenKind::Amp)
                );
            if intersection {
                self.bump();
                continue;
            }
            break;
        }
        Ok(seen.then_some(TypeHint { names }))
    }

    fn type_name(&mut self, names: &mut Vec<Name>) {
        if let Some(name) = self.name() {
            let scalar = name.name.kind() == NameKind::Unqualified
                && SCALAR_TYPES
                    .iter()
                    .any(|s| name.name.first().eq_ignore_ascii_case(s));
            if !scalar {
                names.push(name);
            }
        }
    }

    fn attributes(&mut self) -> Result<Vec<Expr>> {
        let mut exprs = Vec::new();
        while self.eat(TokenKind::AttributeOpen) {
            loop {
                match self.current_kind() {
                    None => return Err(self.error("unclosed attribute")),
                    Some(TokenKind::RBracket) => {
                        self.bump();
                        break;
                    }
                    Some(TokenKind::Comma) => {
                        self.bump();
                    }
                    Some(TokenKind::Name) => {
                        let name = self.expect_name("attribute name")?;
                        let mut arguments = Vec::new();
                        if self.at(TokenKind::LParen) {
                            self.scan_group(&mut arguments)?;
                        }
                        exprs.push(Expr::Attribute { name, arguments });
                    }
                    _ => self.scan_one(&mut exprs)?,
                }
            }
        }
        Ok(exprs)
    }

    // =========================================================================
    // Body scanning
    // =========================================================================

    /// Scan one statement through its terminator, collecting class-name
    /// expressions.
    fn scan_statement(&mut self) -> Result<Vec<Expr>> {
        let mut exprs = Vec::new();
        if self.eat(TokenKind::CloseTag) {
            self.eat(TokenKind::OpenTag);
            return Ok(exprs);
        }

        let keyword = self
            .current()
            .filter(|t| t.kind == TokenKind::Name)
            .map(|t| t.text.to_ascii_lowercase());
        let control = keyword
            .as_deref()
            .is_some_and(|kw| CONTROL_KEYWORDS.contains(&kw));
        let bare_block = self.at(TokenKind::LBrace);

        loop {
            match self.current_kind() {
                None | Some(TokenKind::CloseTag | TokenKind::RBrace) => break,
                Some(TokenKind::Semicolon) => {
                    self.bump();
                    break;
                }
                Some(TokenKind::LBrace) => {
                    self.scan_group(&mut exprs)?;
                    if bare_block || (control && !self.continues_control(keyword.as_deref())) {
                        break;
                    }
                }
                _ => self.scan_one(&mut exprs)?,
            }
        }
        Ok(exprs)
    }

    /// Whether a control statement goes on after one of its blocks.
    fn continues_control(&self, keyword: Option<&str>) -> bool {
        ["else", "elseif", "catch", "finally"]
            .iter()
            .any(|kw| self.at_keyword(kw))
            || (keyword == Some("do") && self.at_keyword("while"))
    }

    /// Scan a balanced `(...)`, `[...]` or `{...}` group.
    fn scan_group(&mut self, exprs: &mut Vec<Expr>) -> Result<()> {
        let open = self.current_range();
        let close = match self.bump().map(|t| t.kind) {
            Some(TokenKind::LParen) => TokenKind::RParen,
            Some(TokenKind::LBracket) => TokenKind::RBracket,
            _ => TokenKind::RBrace,
        };
        loop {
            match self.current_kind() {
                None => {
                    return Err(ParseError::new(
                        format!("unclosed `{}`", self.text(open)),
                        open,
                    ));
                }
                Some(kind) if kind == close => {
                    self.bump();
                    return Ok(());
                }
                _ => self.scan_one(exprs)?,
            }
        }
    }

    /// Scan one token or balanced group.
    fn scan_one(&mut self, exprs: &mut Vec<Expr>) -> Result<()> {
        let Some(token) = self.current() else {
            return Ok(());
        };
        match token.kind {
            TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => self.scan_group(exprs),
            TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                Err(self.error(format!("unmatched `{}`", token.text)))
            }
            TokenKind::AttributeOpen => {
                let attributes = self.attributes()?;
                exprs.extend(attributes);
                Ok(())
            }
            TokenKind::Arrow | TokenKind::NullsafeArrow => {
                // Member names after `->` are never class names.
                self.bump();
                self.eat(TokenKind::Name);
                Ok(())
            }
            TokenKind::Name => self.scan_name(exprs, token),
            _ => {
                self.bump();
                Ok(())
            }
        }
    }

    fn scan_name(&mut self, exprs: &mut Vec<Expr>, token: Token<'a>) -> Result<()> {
        let keyword = token.text.to_ascii_lowercase();
        match keyword.as_str() {
            "new" => return self.scan_new(exprs),
            "instanceof" => {
                self.bump();
                if let Some(name) = self.name() {
                    exprs.push(Expr::Instanceof(name));
                }
                return Ok(());
            }
            "catch" if self.nth_kind(1) == Some(TokenKind::LParen) => {
                self.bump();
                let types = self.catch_types()?;
                exprs.push(Expr::Catch(types));
                return Ok(());
            }
            "function" | "fn"
                if matches!(
                    self.nth_kind(1),
                    Some(TokenKind::LParen | TokenKind::Amp)
                ) || (keyword == "function" && self.nth_kind(1) == Some(TokenKind::Name)) =>
            {
                let closure = self.scan_closure()?;
                exprs.push(Expr::Closure(Box::new(closure)));
                return Ok(());
            }
            _ => {}
        }

        if self.at_class_start() {
            let class = self.parse_class_like(Vec::new())?;
            exprs.push(Expr::Class(Box::new(class)));
            return Ok(());
        }

        let Some(name) = self.name() else {
            return Ok(());
        };
        if self.eat(TokenKind::ColonColon) {
            if matches!(
                self.current_kind(),
                Some(TokenKind::Name | TokenKind::Variable)
            ) {
                self.bump();
            }
            exprs.push(Expr::StaticAccess(name));
        } else if name.name.kind() == NameKind::Qualified {
            exprs.push(Expr::QualifiedUse(name));
        }
        Ok(())
    }

    fn scan_new(&mut self, exprs: &mut Vec<Expr>) -> Result<()> {
        self.bump();
        let attributes = self.attributes()?;
        if self.at_keyword("readonly") && self.nth_is_keyword(1, "class") {
            self.bump();
        }
        if self.at_keyword("class") {
            let class = self.parse_anonymous_class(attributes)?;
            exprs.push(Expr::Class(Box::new(class)));
            return Ok(());
        }
        exprs.extend(attributes);

        if let Some(class) = self.name() {
            let mut arguments = Vec::new();
            if self.at(TokenKind::LParen) {
                self.scan_group(&mut arguments)?;
            }
            exprs.push(Expr::New { class, arguments });
        }
        Ok(())
    }

    fn catch_types(&mut self) -> Result<Vec<Name>> {
        let mut types = Vec::new();
        self.expect(TokenKind::LParen, "`(` after catch")?;
        loop {
            match self.current_kind() {
                None => return Err(self.error("unclosed catch clause")),
                Some(TokenKind::RParen) => {
                    self.bump();
                    return Ok(types);
                }
                Some(TokenKind::Name) => {
                    if let Some(name) = self.name() {
                        types.push(name);
                    }
                }
                _ => self.scan_one(&mut Vec::new())?,
            }
        }
    }

    /// Closures, arrow functions and named functions nested in a body.
    ///
    /// An arrow function's body is an expression; it is left to the
    /// enclosing scan.
    fn scan_closure(&mut self) -> Result<FunctionLike> {
        let arrow = self.at_keyword("fn");
        self.bump();
        self.eat(TokenKind::Amp);
        let name = match self.current_kind() {
            Some(TokenKind::Name) => self.name().map(|n| n.name.last().clone()),
            _ => None,
        };
        let params = self.params()?;

        let mut body = Vec::new();
        if self.eat_keyword("use") && self.at(TokenKind::LParen) {
            self.scan_group(&mut body)?;
        }
        let return_type = self.return_type()?;
        if !arrow && self.at(TokenKind::LBrace) {
            self.scan_group(&mut body)?;
        }

        Ok(FunctionLike {
            name,
            attributes: Vec::new(),
            params,
            return_type,
            body,
        })
    }
}

/// Imported names are always absolute; a leading `\` is redundant.
fn import_name(name: QualifiedName) -> QualifiedName {
    QualifiedName::from_segments(name.segments().iter().cloned()).unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(names: &[Name]) -> Vec<String> {
        names.iter().map(|n| n.name.to_string()).collect()
    }

    fn uses(file: &SourceFile) -> Vec<&UseStmt> {
        file.import_scope().iter().filter_map(Stmt::as_use).collect()
    }

    #[test]
    fn test_parse_namespaced_file() {
        let source = "<?php\n\ndeclare(strict_types=1);\n\nnamespace App\\Http;\n\nuse App\\Models\\User;\nuse Psr\\Log\\LoggerInterface as Logger;\n\nfinal class Controller extends Base implements Countable {}\n";
        let file = parse(source).unwrap();

        assert!(file.leading_html.is_none());
        assert_eq!(file.open_tag.as_ref().unwrap().text, "<?php");
        assert_eq!(file.stmts.len(), 2);
        assert!(matches!(file.stmts[0].kind, StmtKind::Declare(_)));
        assert_eq!(file.stmts[0].text, "declare(strict_types=1);");

        let ns = file.namespace().unwrap();
        assert_eq!(ns.name.as_ref().unwrap().name.joined(), "App\\Http");
        assert!(!ns.braced);
        assert_eq!(ns.stmts.len(), 3);

        let imports = uses(&file);
        assert_eq!(imports.len(), 2);
        assert_eq!(imports[0].items[0].name.joined(), "App\\Models\\User");
        assert_eq!(imports[1].items[0].alias(), "Logger");

        let StmtKind::ClassLike(class) = &ns.stmts[2].kind else {
            panic!("expected a class");
        };
        assert_eq!(class.name.as_deref(), Some("Controller"));
        assert_eq!(names(&class.extends), vec!["Base"]);
        assert_eq!(names(&class.implements), vec!["Countable"]);
    }

    #[test]
    fn test_parse_group_and_function_imports() {
        let file = parse(
            "<?php\nuse App\\{Models\\User, Http\\Request as Req,};\nuse function App\\helper;\nuse const App\\VERSION;\n",
        )
        .unwrap();
        let imports = uses(&file);

        let group = imports[0];
        assert_eq!(group.group_prefix.as_ref().unwrap().joined(), "App");
        let full: Vec<_> = group
            .items
            .iter()
            .map(|item| group.full_name(item).joined())
            .collect();
        assert_eq!(full, vec!["App\\Models\\User", "App\\Http\\Request"]);
        assert_eq!(group.items[1].alias(), "Req");

        assert_eq!(imports[1].kind, UseKind::Function);
        assert_eq!(imports[2].kind, UseKind::Const);
        assert_eq!(imports[2].items[0].alias(), "VERSION");
    }

    #[test]
    fn test_leading_backslash_dropped_from_imports() {
        let file = parse("<?php\nuse \\Foo\\Bar;").unwrap();
        let name = &uses(&file)[0].items[0].name;
        assert!(!name.is_fully_qualified());
        assert_eq!(name.joined(), "Foo\\Bar");
    }

    #[test]
    fn test_comments_attach_to_statements() {
        let source = "<?php // tag note\nnamespace App; // ns note\n\n// about the import\nuse Foo; // trailing\nuse Bar; /* spans\n lines */\n";
        let file = parse(source).unwrap();

        assert_eq!(
            file.open_tag.as_ref().unwrap().comment.as_deref(),
            Some("// tag note")
        );
        let ns = file.namespace().unwrap();
        assert_eq!(ns.header_comment.as_deref(), Some("// ns note"));
        assert_eq!(ns.stmts[0].comments, vec![SmolStr::new("// about the import")]);
        assert_eq!(ns.stmts[0].trailing_comment.as_deref(), Some("// trailing"));
        assert!(ns.stmts[1].trailing_comment.is_none());
    }

    #[test]
    fn test_braced_namespaces_are_siblings() {
        let file = parse("<?php\nnamespace A { class X {} }\nnamespace B { class Y {} }\n").unwrap();
        assert_eq!(file.stmts.len(), 2);
        assert!(file.stmts.iter().all(|s| matches!(
            &s.kind,
            StmtKind::Namespace(ns) if ns.braced && ns.stmts.len() == 1
        )));
    }

    #[test]
    fn test_semicolon_namespaces_are_siblings() {
        let file = parse("<?php\nnamespace A;\nclass X {}\nnamespace B;\nclass Y {}\n").unwrap();
        assert_eq!(file.stmts.len(), 2);
    }

    #[test]
    fn test_body_expressions() {
        let source = r#"<?php
namespace App;

class Service
{
    use Loggable;

    private ?Cache $cache = null;

    public function __construct(private Repo $repo, int $limit = Config::LIMIT) {}

    #[Route('/x')]
    public function run(Request|Input $in): Response
    {
        try {
            $x = new Thing($in);
            if ($x instanceof Marker) {
                return Factory::make(fn (Item $i): Out => $i->new);
            }
        } catch (FirstError | SecondError $e) {
            $this->class = 1;
        }
        return $x->build();
    }
}
"#;
        let file = parse(source).unwrap();
        let StmtKind::ClassLike(class) = &file.import_scope()[0].kind else {
            panic!("expected a class");
        };

        let Member::TraitUse { traits, .. } = &class.members[0] else {
            panic!("expected a trait use");
        };
        assert_eq!(names(traits), vec!["Loggable"]);

        let Member::Property { ty, .. } = &class.members[1] else {
            panic!("expected a property");
        };
        assert_eq!(names(&ty.as_ref().unwrap().names), vec!["Cache"]);

        let Member::Method(ctor) = &class.members[2] else {
            panic!("expected a method");
        };
        assert_eq!(names(&ctor.params[0].ty.as_ref().unwrap().names), vec!["Repo"]);
        assert_eq!(ctor.params[1].ty, Some(TypeHint::default()));
        assert!(matches!(&ctor.params[1].default[..], [Expr::StaticAccess(n)] if n.name.joined() == "Config"));

        let Member::Method(run) = &class.members[3] else {
            panic!("expected a method");
        };
        assert!(matches!(&run.attributes[..], [Expr::Attribute { name, .. }] if name.name.joined() == "Route"));
        assert_eq!(
            names(&run.params[0].ty.as_ref().unwrap().names),
            vec!["Request", "Input"]
        );
        assert_eq!(names(&run.return_type.as_ref().unwrap().names), vec!["Response"]);

        let kinds: Vec<&str> = run
            .body
            .iter()
            .map(|e| match e {
                Expr::New { .. } => "new",
                Expr::StaticAccess(_) => "static",
                Expr::Instanceof(_) => "instanceof",
                Expr::Catch(_) => "catch",
                Expr::Attribute { .. } => "attribute",
                Expr::QualifiedUse(_) => "qualified",
                Expr::Closure(_) => "closure",
                Expr::Class(_) => "class",
            })
            .collect();
        assert_eq!(kinds, vec!["new", "instanceof", "static", "closure", "catch"]);
    }

    #[test]
    fn test_anonymous_class() {
        let file = parse("<?php\n$x = new class(new Dep) extends Base implements Iface {};\n").unwrap();
        let StmtKind::Other(block) = &file.stmts[0].kind else {
            panic!("expected a statement");
        };
        let [Expr::Class(class)] = &block.exprs[..] else {
            panic!("expected an anonymous class");
        };
        assert!(class.name.is_none());
        assert_eq!(names(&class.extends), vec!["Base"]);
        assert!(matches!(&class.arguments[..], [Expr::New { .. }]));
    }

    #[test]
    fn test_control_statement_boundaries() {
        let file = parse(
            "<?php\nif ($a) { new A; } elseif ($b) { new B; } else { new C; }\ndo { } while ($x);\nfoo();\n",
        )
        .unwrap();
        assert_eq!(file.stmts.len(), 3);
        assert_eq!(file.stmts[1].text, "do { } while ($x);");
    }

    #[test]
    fn test_scalar_and_reserved_types() {
        let file = parse("<?php\nfunction f(?int $a, self $b, (A&B)|null $c, string &...$d): static {}\n").unwrap();
        let StmtKind::Function(function) = &file.stmts[0].kind else {
            panic!("expected a function");
        };
        let types: Vec<Vec<String>> = function
            .params
            .iter()
            .map(|p| names(&p.ty.as_ref().unwrap().names))
            .collect();
        assert_eq!(
            types,
            vec![
                vec![],
                vec!["self".to_string()],
                vec!["A".to_string(), "B".to_string()],
                vec![],
            ]
        );
        assert_eq!(function.params[3].name, "d");
    }

    #[test]
    fn test_leading_html_and_no_code() {
        let file = parse("<html></html>").unwrap();
        assert!(!file.has_code());
        assert_eq!(file.leading_html.as_deref(), Some("<html></html>"));

        let file = parse("#!/usr/bin/env php\n<?php\nnew A;\n").unwrap();
        assert_eq!(file.leading_html.as_deref(), Some("#!/usr/bin/env php\n"));
        assert_eq!(file.stmts.len(), 1);
    }

    #[test]
    fn test_close_tag_statement() {
        let file = parse("<?php\nnew A();\n?>\n<p></p>\n<?php new B();").unwrap();
        assert_eq!(file.stmts.len(), 3);
        assert_eq!(file.stmts[1].text, "?>\n<p></p>\n<?php");
    }

    #[test]
    fn test_errors() {
        let err = parse("<?php\nfunction f() {\n").unwrap_err();
        assert_eq!(err.message, "unclosed `{`");
        assert_eq!(err.range, TextRange::at(TextSize::from(19), TextSize::from(1)));

        assert_eq!(parse("<?php\n}").unwrap_err().message, "unmatched `}`");
        assert_eq!(
            parse("<?php\nuse Foo").unwrap_err().message,
            "expected `;` after import"
        );
        assert_eq!(
            parse("<?php\nnamespace A { namespace B; }").unwrap_err().message,
            "namespace declarations cannot be nested"
        );
    }
}
