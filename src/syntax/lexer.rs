//! Logos-based lexer for PHP source.
//!
//! Produces every byte of the input as some token (trivia included) so the
//! parser can attach comments and compute exact ranges. Text before the first
//! `<?php` is a single [`TokenKind::InlineHtml`] token.

use logos::Logos;
use text_size::{TextRange, TextSize};

/// A token with its kind, text, and position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub offset: TextSize,
}

impl Token<'_> {
    pub fn range(&self) -> TextRange {
        TextRange::at(self.offset, TextSize::of(self.text))
    }

    pub fn end(&self) -> TextSize {
        self.offset + TextSize::of(self.text)
    }
}

/// Lexer wrapping the logos-generated tokenizer
pub struct Lexer<'a> {
    html: Option<&'a str>,
    inner: logos::Lexer<'a, TokenKind>,
    offset: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        let split = find_open_tag(input).unwrap_or(input.len());
        let (html, code) = input.split_at(split);
        Self {
            html: (!html.is_empty()).then_some(html),
            inner: TokenKind::lexer(code),
            offset: 0,
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(html) = self.html.take() {
            let offset = TextSize::new(self.offset);
            self.offset += html.len() as u32;
            return Some(Token {
                kind: TokenKind::InlineHtml,
                text: html,
                offset,
            });
        }

        let result = self.inner.next()?;
        let text = self.inner.slice();
        let offset = TextSize::new(self.offset);
        self.offset += text.len() as u32;

        let kind = result.unwrap_or(TokenKind::Error);
        Some(Token { kind, text, offset })
    }
}

/// Tokenize an entire string into a Vec
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    Lexer::new(input).collect()
}

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(subpattern ident = r"[a-zA-Z_\u{80}-\u{10FFFF}][a-zA-Z0-9_\u{80}-\u{10FFFF}]*")]
pub enum TokenKind {
    // =========================================================================
    // TRIVIA
    // =========================================================================
    #[regex(r"[ \t\r\n]+")]
    Whitespace,

    #[regex(r"//[^\n]*")]
    #[regex(r"#([^\[\n][^\n]*)?")]
    LineComment,

    #[token("/*", block_comment)]
    BlockComment,

    #[token("/**", doc_comment)]
    DocComment,

    // =========================================================================
    // NAMES AND LITERALS
    // =========================================================================
    /// `Foo`, `Foo\Bar`, `\Foo\Bar` and `namespace\Foo` all lex as one name.
    #[regex(r"\\?(?&ident)(\\(?&ident))*")]
    Name,

    #[regex(r"\$(?&ident)")]
    Variable,

    #[regex(r"[0-9][0-9a-zA-Z_]*(\.[0-9][0-9_]*)?")]
    #[regex(r"\.[0-9][0-9_]*")]
    Number,

    #[regex(r"'([^'\\]|\\(.|\n))*'")]
    #[regex(r#""([^"\\]|\\(.|\n))*""#)]
    #[regex(r"`([^`\\]|\\(.|\n))*`")]
    String,

    #[regex(r"<<<[ \t]*", heredoc)]
    Heredoc,

    // =========================================================================
    // TAGS
    // =========================================================================
    #[regex(r"<\?[pP][hH][pP]")]
    #[token("<?=")]
    OpenTag,

    /// `?>` together with any inline HTML up to the next open tag.
    #[token("?>", close_tag)]
    CloseTag,

    /// Produced by [`Lexer`] for text before the first open tag.
    InlineHtml,

    // =========================================================================
    // PUNCTUATION
    // =========================================================================
    #[token("#[")]
    AttributeOpen,
    #[token("::")]
    ColonColon,
    #[token("->")]
    Arrow,
    #[token("?->")]
    NullsafeArrow,
    #[token("=>")]
    FatArrow,
    #[token("...")]
    Ellipsis,
    #[token("??")]
    QuestionQuestion,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token("?")]
    Question,
    #[token("|")]
    Pipe,
    #[token("&")]
    Amp,
    #[token("=")]
    Eq,
    #[token(":")]
    Colon,
    #[token("$")]
    Dollar,
    #[token("\\")]
    Backslash,
    #[regex(r"[-+*/%.<>!~^@]")]
    Operator,

    /// Anything logos could not match (e.g. an unterminated string).
    Error,
}

impl TokenKind {
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace
                | TokenKind::LineComment
                | TokenKind::BlockComment
                | TokenKind::DocComment
        )
    }

    pub fn is_comment(self) -> bool {
        matches!(
            self,
            TokenKind::LineComment | TokenKind::BlockComment | TokenKind::DocComment
        )
    }
}

fn block_comment(lex: &mut logos::Lexer<'_, TokenKind>) -> bool {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            true
        }
        None => false,
    }
}

fn doc_comment(lex: &mut logos::Lexer<'_, TokenKind>) -> bool {
    // `/**/` is an empty block comment, already closed.
    if lex.remainder().starts_with('/') {
        lex.bump(1);
        return true;
    }
    block_comment(lex)
}

fn close_tag(lex: &mut logos::Lexer<'_, TokenKind>) {
    let rest = lex.remainder();
    lex.bump(find_open_tag(rest).unwrap_or(rest.len()));
}

/// Heredoc and nowdoc bodies, from the label through the closing label.
fn heredoc(lex: &mut logos::Lexer<'_, TokenKind>) -> bool {
    let rest = lex.remainder();
    let bytes = rest.as_bytes();

    let mut i = 0;
    let quote = match bytes.first() {
        Some(&q @ (b'\'' | b'"')) => {
            i += 1;
            Some(q)
        }
        _ => None,
    };

    let label_start = i;
    while i < bytes.len() && is_ident_byte(bytes[i]) {
        i += 1;
    }
    if i == label_start {
        return false;
    }
    let label = &rest[label_start..i];

    if let Some(q) = quote {
        if bytes.get(i) != Some(&q) {
            return false;
        }
        i += 1;
    }

    let Some(newline) = rest[i..].find('\n') else {
        return false;
    };
    let mut pos = i + newline + 1;

    loop {
        let line_end = rest[pos..].find('\n').map_or(rest.len(), |n| pos + n);
        let line = &rest[pos..line_end];
        let trimmed = line.trim_start_matches([' ', '\t']);
        if let Some(after) = trimmed.strip_prefix(label) {
            if !after.bytes().next().is_some_and(is_ident_byte) {
                lex.bump(line_end - after.len());
                return true;
            }
        }
        if line_end >= rest.len() {
            return false;
        }
        pos = line_end + 1;
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}

/// Byte offset of the next `<?php` (any case) or `<?=` in `text`.
pub(crate) fn find_open_tag(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut from = 0;
    while let Some(found) = text[from..].find("<?") {
        let at = from + found;
        let tail = &bytes[at + 2..];
        if tail.first() == Some(&b'=') || (tail.len() >= 3 && tail[..3].eq_ignore_ascii_case(b"php"))
        {
            return Some(at);
        }
        from = at + 2;
    }
    None
}
