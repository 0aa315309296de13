//! PHP syntax: lexer, parser, tree, printer and traversal.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod visit;

pub use ast::{
    Block, ClassKind, ClassLike, Expr, FunctionLike, Member, Name, Namespace, OpenTag, Param,
    SourceFile, Stmt, StmtKind, TypeHint, UseItem, UseKind, UseStmt,
};
pub use parser::{ParseError, parse};
pub use printer::{format_use, print_file};
pub use visit::{NodeRef, TypeRole, VisitControl, Visitor, fold, walk};
