//! Composer's generated `autoload_classmap.php`.
//!
//! The file is plain PHP returning an array literal:
//!
//! ```text
//! return array(
//!     'App\\Models\\User' => $baseDir . '/app/Models/User.php',
//! );
//! ```
//!
//! It is read with the crate's own lexer rather than evaluated.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::ProjectError;
use crate::base::QualifiedName;
use crate::syntax::lexer::{Token, TokenKind, tokenize};

/// Location of the classmap relative to the project root.
pub const CLASSMAP_PATH: &str = "vendor/composer/autoload_classmap.php";

/// Read `<root>/vendor/composer/autoload_classmap.php`.
///
/// Returns `Ok(None)` when the project has no classmap.
pub fn load_classmap(root: &Path) -> Result<Option<Vec<(QualifiedName, PathBuf)>>, ProjectError> {
    let path = root.join(CLASSMAP_PATH);
    if !path.is_file() {
        return Ok(None);
    }
    let source = fs::read_to_string(&path).map_err(|e| ProjectError::io(&path, e))?;
    let entries = parse_classmap(&source, root).map_err(|message| ProjectError::Classmap {
        path: path.clone(),
        message,
    })?;
    debug!(entries = entries.len(), path = %path.display(), "loaded classmap");
    Ok(Some(entries))
}

/// Parse classmap source. `$baseDir` is `root` and `$vendorDir` is
/// `root/vendor`.
pub fn parse_classmap(source: &str, root: &Path) -> Result<Vec<(QualifiedName, PathBuf)>, String> {
    let tokens: Vec<Token<'_>> = tokenize(source)
        .into_iter()
        .filter(|t| !t.kind.is_trivia())
        .collect();

    let start = tokens
        .iter()
        .position(|t| t.kind == TokenKind::Name && t.text.eq_ignore_ascii_case("return"))
        .ok_or("missing `return` statement")?;

    let mut entries = Vec::new();
    let mut rest = &tokens[start + 1..];
    while let Some(pos) = rest.iter().position(|t| t.kind == TokenKind::FatArrow) {
        let key = pos
            .checked_sub(1)
            .and_then(|idx| rest.get(idx))
            .filter(|t| t.kind == TokenKind::String)
            .ok_or("expected a quoted class name before `=>`")?;
        let name = QualifiedName::parse(&unquote(key.text))
            .ok_or_else(|| format!("invalid class name {}", key.text))?;

        let value_end = rest[pos + 1..]
            .iter()
            .position(|t| matches!(t.kind, TokenKind::Comma | TokenKind::RParen | TokenKind::RBracket))
            .map_or(rest.len(), |n| pos + 1 + n);
        entries.push((name, value_path(&rest[pos + 1..value_end], root)?));
        rest = &rest[value_end..];
    }
    Ok(entries)
}

/// `$baseDir . '/x.php'`, `$vendorDir . '/y.php'` or a plain string.
fn value_path(tokens: &[Token<'_>], root: &Path) -> Result<PathBuf, String> {
    let mut path = PathBuf::new();
    for token in tokens {
        match token.kind {
            TokenKind::Variable => match token.text {
                "$baseDir" => path = root.to_path_buf(),
                "$vendorDir" => path = root.join("vendor"),
                other => return Err(format!("unknown variable {other}")),
            },
            TokenKind::String => {
                let text = unquote(token.text);
                let relative = text.trim_start_matches('/');
                if path.as_os_str().is_empty() {
                    path = PathBuf::from(text.as_str());
                } else {
                    path.push(relative);
                }
            }
            TokenKind::Operator if token.text == "." => {}
            _ => return Err(format!("unexpected `{}` in classmap value", token.text)),
        }
    }
    if path.as_os_str().is_empty() {
        return Err("empty classmap value".to_string());
    }
    Ok(path)
}

/// Strip quotes from a single-quoted PHP string and undo its escapes.
fn unquote(text: &str) -> String {
    let inner = text
        .strip_prefix(['\'', '"'])
        .and_then(|t| t.strip_suffix(['\'', '"']))
        .unwrap_or(text);

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next @ ('\\' | '\'')) => out.push(next),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}
