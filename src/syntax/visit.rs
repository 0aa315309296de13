//! Depth-first traversal over [`SourceFile`].
//!
//! A [`Visitor`] sees every node before its children and decides through
//! [`VisitControl`] whether the walk descends, skips the subtree, or stops.
//! [`fold`] threads an accumulator through the same walk.

use std::ops::ControlFlow;

use super::ast::*;

/// Result of visiting a node; controls how the walk proceeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VisitControl {
    /// Descend into children.
    #[default]
    Continue,
    /// Skip children, continue with siblings.
    SkipChildren,
    /// Stop the walk entirely.
    Abort,
}

/// Where a type declaration appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeRole {
    Param,
    Return,
    Property,
}

/// A borrowed view of any node in the tree.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Stmt(&'a Stmt),
    Use(&'a UseStmt),
    ClassLike(&'a ClassLike),
    Member(&'a Member),
    Function(&'a FunctionLike),
    Param(&'a Param),
    Type(TypeRole, &'a TypeHint),
    Expr(&'a Expr),
}

pub trait Visitor<'a> {
    fn visit(&mut self, node: NodeRef<'a>) -> VisitControl;
}

impl<'a, F> Visitor<'a> for F
where
    F: FnMut(NodeRef<'a>) -> VisitControl,
{
    fn visit(&mut self, node: NodeRef<'a>) -> VisitControl {
        self(node)
    }
}

/// Walk every statement of `file` in source order.
///
/// Returns `ControlFlow::Break` if the visitor aborted.
pub fn walk<'a, V: Visitor<'a>>(file: &'a SourceFile, visitor: &mut V) -> ControlFlow<()> {
    for stmt in &file.stmts {
        walk_node(NodeRef::Stmt(stmt), visitor)?;
    }
    ControlFlow::Continue(())
}

/// Walk `file`, threading `init` through `f` and returning the final value.
pub fn fold<'a, A, F>(file: &'a SourceFile, init: A, mut f: F) -> A
where
    F: FnMut(&mut A, NodeRef<'a>) -> VisitControl,
{
    let mut acc = init;
    let _ = walk(file, &mut |node: NodeRef<'a>| f(&mut acc, node));
    acc
}

fn walk_node<'a, V: Visitor<'a>>(node: NodeRef<'a>, visitor: &mut V) -> ControlFlow<()> {
    match visitor.visit(node) {
        VisitControl::Continue => walk_children(node, visitor),
        VisitControl::SkipChildren => ControlFlow::Continue(()),
        VisitControl::Abort => ControlFlow::Break(()),
    }
}

fn walk_children<'a, V: Visitor<'a>>(node: NodeRef<'a>, visitor: &mut V) -> ControlFlow<()> {
    match node {
        NodeRef::Stmt(stmt) => match &stmt.kind {
            StmtKind::Declare(block) | StmtKind::Other(block) => walk_exprs(&block.exprs, visitor),
            StmtKind::Namespace(ns) => {
                for stmt in &ns.stmts {
                    walk_node(NodeRef::Stmt(stmt), visitor)?;
                }
                ControlFlow::Continue(())
            }
            StmtKind::Use(use_stmt) => walk_node(NodeRef::Use(use_stmt), visitor),
            StmtKind::ClassLike(class) => walk_node(NodeRef::ClassLike(class), visitor),
            StmtKind::Function(function) => walk_node(NodeRef::Function(function), visitor),
        },
        NodeRef::Use(_) => ControlFlow::Continue(()),
        NodeRef::ClassLike(class) => {
            walk_exprs(&class.attributes, visitor)?;
            walk_exprs(&class.arguments, visitor)?;
            for member in &class.members {
                walk_node(NodeRef::Member(member), visitor)?;
            }
            ControlFlow::Continue(())
        }
        NodeRef::Member(member) => match member {
            Member::Method(function) => walk_node(NodeRef::Function(function), visitor),
            Member::TraitUse { adaptations, .. } => walk_exprs(adaptations, visitor),
            Member::Property {
                attributes,
                ty,
                initializer,
            } => {
                walk_exprs(attributes, visitor)?;
                if let Some(ty) = ty {
                    walk_node(NodeRef::Type(TypeRole::Property, ty), visitor)?;
                }
                walk_exprs(initializer, visitor)
            }
            Member::Other(exprs) => walk_exprs(exprs, visitor),
        },
        NodeRef::Function(function) => {
            walk_exprs(&function.attributes, visitor)?;
            for param in &function.params {
                walk_node(NodeRef::Param(param), visitor)?;
            }
            if let Some(ty) = &function.return_type {
                walk_node(NodeRef::Type(TypeRole::Return, ty), visitor)?;
            }
            walk_exprs(&function.body, visitor)
        }
        NodeRef::Param(param) => {
            walk_exprs(&param.attributes, visitor)?;
            if let Some(ty) = &param.ty {
                walk_node(NodeRef::Type(TypeRole::Param, ty), visitor)?;
            }
            walk_exprs(&param.default, visitor)
        }
        NodeRef::Type(..) => ControlFlow::Continue(()),
        NodeRef::Expr(expr) => match expr {
            Expr::New { arguments, .. } | Expr::Attribute { arguments, .. } => {
                walk_exprs(arguments, visitor)
            }
            Expr::StaticAccess(_)
            | Expr::Instanceof(_)
            | Expr::Catch(_)
            | Expr::QualifiedUse(_) => {
                ControlFlow::Continue(())
            }
            Expr::Closure(function) => walk_node(NodeRef::Function(function), visitor),
            Expr::Class(class) => walk_node(NodeRef::ClassLike(class), visitor),
        },
    }
}

fn walk_exprs<'a, V: Visitor<'a>>(exprs: &'a [Expr], visitor: &mut V) -> ControlFlow<()> {
    for expr in exprs {
        walk_node(NodeRef::Expr(expr), visitor)?;
    }
    ControlFlow::Continue(())
}
