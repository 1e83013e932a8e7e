//! Mutable traversal over the statement tree.
//!
//! Every `visit_*` method defaults to the matching `walk_*` function, which
//! visits the node's children in the order they appear in rendered text.
//! Implementors override only the nodes they rewrite and call back into
//! `walk_*` to keep recursing.

use super::expr::{Expr, FunctionArgs, Parameter};
use super::stmt::{Assignment, Delete, FromItem, Join, OrderItem, Select, SelectItem, Statement, Update};
use crate::error::CompileResult;

pub trait VisitorMut {
    fn visit_statement(&mut self, stmt: &mut Statement) -> CompileResult<()> {
        walk_statement(self, stmt)
    }

    fn visit_select(&mut self, select: &mut Select) -> CompileResult<()> {
        walk_select(self, select)
    }

    fn visit_update(&mut self, update: &mut Update) -> CompileResult<()> {
        walk_update(self, update)
    }

    fn visit_delete(&mut self, delete: &mut Delete) -> CompileResult<()> {
        walk_delete(self, delete)
    }

    fn visit_select_item(&mut self, item: &mut SelectItem) -> CompileResult<()> {
        self.visit_expr(&mut item.expr)
    }

    fn visit_from_item(&mut self, item: &mut FromItem) -> CompileResult<()> {
        walk_from_item(self, item)
    }

    fn visit_join(&mut self, join: &mut Join) -> CompileResult<()> {
        match &mut join.on {
            Some(on) => self.visit_expr(on),
            None => Ok(()),
        }
    }

    fn visit_order_item(&mut self, item: &mut OrderItem) -> CompileResult<()> {
        self.visit_expr(&mut item.expr)
    }

    fn visit_assignment(&mut self, assignment: &mut Assignment) -> CompileResult<()> {
        self.visit_expr(&mut assignment.value)
    }

    fn visit_expr(&mut self, expr: &mut Expr) -> CompileResult<()> {
        walk_expr(self, expr)
    }

    fn visit_parameter(&mut self, _param: &mut Parameter) -> CompileResult<()> {
        Ok(())
    }
}

pub fn walk_statement<V: VisitorMut + ?Sized>(visitor: &mut V, stmt: &mut Statement) -> CompileResult<()> {
    match stmt {
        Statement::Select(select) => visitor.visit_select(select),
        Statement::Update(update) => visitor.visit_update(update),
        Statement::Delete(delete) => visitor.visit_delete(delete),
        Statement::Insert(_) => Ok(()),
    }
}

pub fn walk_select<V: VisitorMut + ?Sized>(visitor: &mut V, select: &mut Select) -> CompileResult<()> {
    for item in &mut select.projection {
        visitor.visit_select_item(item)?;
    }
    for item in &mut select.from {
        visitor.visit_from_item(item)?;
    }
    if let Some(selection) = &mut select.selection {
        visitor.visit_expr(selection)?;
    }
    for expr in &mut select.group_by {
        visitor.visit_expr(expr)?;
    }
    if let Some(having) = &mut select.having {
        visitor.visit_expr(having)?;
    }
    for item in &mut select.order_by {
        visitor.visit_order_item(item)?;
    }
    if let Some(limit) = &mut select.limit {
        visitor.visit_expr(limit)?;
    }
    if let Some(offset) = &mut select.offset {
        visitor.visit_expr(offset)?;
    }
    Ok(())
}

pub fn walk_from_item<V: VisitorMut + ?Sized>(visitor: &mut V, item: &mut FromItem) -> CompileResult<()> {
    for join in &mut item.joins {
        visitor.visit_join(join)?;
    }
    Ok(())
}

pub fn walk_update<V: VisitorMut + ?Sized>(visitor: &mut V, update: &mut Update) -> CompileResult<()> {
    for assignment in &mut update.assignments {
        visitor.visit_assignment(assignment)?;
    }
    if let Some(selection) = &mut update.selection {
        visitor.visit_expr(selection)?;
    }
    Ok(())
}

pub fn walk_delete<V: VisitorMut + ?Sized>(visitor: &mut V, delete: &mut Delete) -> CompileResult<()> {
    match &mut delete.selection {
        Some(selection) => visitor.visit_expr(selection),
        None => Ok(()),
    }
}

pub fn walk_expr<V: VisitorMut + ?Sized>(visitor: &mut V, expr: &mut Expr) -> CompileResult<()> {
    match expr {
        Expr::Path(_) | Expr::Column(_) | Expr::Literal(_) | Expr::Label(_) => Ok(()),
        Expr::Parameter(param) => visitor.visit_parameter(param),
        Expr::Binary { left, right, .. } => {
            visitor.visit_expr(left)?;
            visitor.visit_expr(right)
        }
        Expr::Unary { expr, .. } | Expr::Nested(expr) | Expr::IsNull { expr, .. } => visitor.visit_expr(expr),
        Expr::Between { expr, low, high, .. } => {
            visitor.visit_expr(expr)?;
            visitor.visit_expr(low)?;
            visitor.visit_expr(high)
        }
        Expr::InList { expr, list, .. } => {
            visitor.visit_expr(expr)?;
            for item in list {
                visitor.visit_expr(item)?;
            }
            Ok(())
        }
        Expr::InSubquery { expr, subquery, .. } => {
            visitor.visit_expr(expr)?;
            visitor.visit_select(subquery)
        }
        Expr::Like { expr, pattern, .. } => {
            visitor.visit_expr(expr)?;
            visitor.visit_expr(pattern)
        }
        Expr::Function { args, .. } => match args {
            FunctionArgs::None | FunctionArgs::Star => Ok(()),
            FunctionArgs::List { args, .. } => {
                for arg in args {
                    visitor.visit_expr(arg)?;
                }
                Ok(())
            }
        },
        Expr::Case {
            operand,
            branches,
            else_result,
        } => {
            if let Some(operand) = operand {
                visitor.visit_expr(operand)?;
            }
            for branch in branches {
                visitor.visit_expr(&mut branch.condition)?;
                visitor.visit_expr(&mut branch.result)?;
            }
            match else_result {
                Some(e) => visitor.visit_expr(e),
                None => Ok(()),
            }
        }
        Expr::Subquery(select) | Expr::Exists { subquery: select, .. } => visitor.visit_select(select),
        Expr::Tuple(items) => {
            for item in items {
                visitor.visit_expr(item)?;
            }
            Ok(())
        }
    }
}
