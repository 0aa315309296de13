//! Canonical printer for [`SourceFile`].
//!
//! Header statements (open tag, `declare`, `namespace`, `use`) are printed
//! in a fixed layout. All other statements are emitted from their verbatim
//! source text, separated by blank lines.

use super::ast::{Namespace, SourceFile, Stmt, StmtKind, UseStmt};

const INDENT: &str = "    ";

/// Print a file in canonical layout.
pub fn print_file(file: &SourceFile) -> String {
    let mut out = String::new();
    if let Some(html) = &file.leading_html {
        out.push_str(html);
    }
    let Some(open_tag) = &file.open_tag else {
        return out;
    };

    out.push_str(&open_tag.text);
    if let Some(comment) = &open_tag.comment {
        out.push(' ');
        out.push_str(comment);
    }
    out.push('\n');

    if !file.stmts.is_empty() {
        out.push('\n');
        print_stmts(&file.stmts, "", &mut out);
        out.push('\n');
    }
    out
}

fn print_stmts(stmts: &[Stmt], indent: &str, out: &mut String) {
    for (idx, stmt) in stmts.iter().enumerate() {
        if idx > 0 {
            let consecutive_uses = stmt.is_use() && stmts[idx - 1].is_use();
            out.push_str(if consecutive_uses { "\n" } else { "\n\n" });
        }
        print_stmt(stmt, indent, out);
    }
}

fn print_stmt(stmt: &Stmt, indent: &str, out: &mut String) {
    for comment in &stmt.comments {
        out.push_str(indent);
        out.push_str(comment);
        out.push('\n');
    }
    out.push_str(indent);

    match &stmt.kind {
        StmtKind::Namespace(ns) => print_namespace(ns, out),
        StmtKind::Use(use_stmt) => out.push_str(&format_use(use_stmt)),
        StmtKind::Declare(_)
        | StmtKind::ClassLike(_)
        | StmtKind::Function(_)
        | StmtKind::Other(_) => out.push_str(&stmt.text),
    }

    if let Some(comment) = &stmt.trailing_comment {
        out.push(' ');
        out.push_str(comment);
    }
}

fn print_namespace(ns: &Namespace, out: &mut String) {
    out.push_str("namespace");
    if let Some(name) = &ns.name {
        out.push(' ');
        out.push_str(&name.name.joined());
    }
    out.push_str(if ns.braced { " {" } else { ";" });
    if let Some(comment) = &ns.header_comment {
        out.push(' ');
        out.push_str(comment);
    }

    if ns.braced {
        out.push('\n');
        if !ns.stmts.is_empty() {
            print_stmts(&ns.stmts, INDENT, out);
            out.push('\n');
        }
        out.push('}');
    } else if !ns.stmts.is_empty() {
        out.push_str("\n\n");
        print_stmts(&ns.stmts, "", out);
    }
}

/// `use [function |const ]Name[ as Alias];` or the group form.
pub fn format_use(use_stmt: &UseStmt) -> String {
    let mut out = String::from("use ");
    if let Some(keyword) = use_stmt.kind.keyword() {
        out.push_str(keyword);
        out.push(' ');
    }

    let items: Vec<String> = use_stmt
        .items
        .iter()
        .map(|item| {
            let mut text = String::new();
            if let Some(keyword) = item.kind.and_then(|kind| kind.keyword()) {
                text.push_str(keyword);
                text.push(' ');
            }
            text.push_str(&item.name.joined());
            if let Some(alias) = &item.alias {
                text.push_str(" as ");
                text.push_str(alias);
            }
            text
        })
        .collect();

    match &use_stmt.group_prefix {
        Some(prefix) => {
            out.push_str(&prefix.joined());
            out.push_str("\\{");
            out.push_str(&items.join(", "));
            out.push('}');
        }
        None => out.push_str(&items.join(", ")),
    }
    out.push(';');
    out
}
