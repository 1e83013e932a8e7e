//! Expression rewriting.
//!
//! Replaces entity paths with physical columns, binds placeholders to
//! parameter slots with types inferred from the column they are compared
//! against, expands composite comparisons into row values, and hands
//! subqueries to the SELECT pattern in a nested scope.

use super::columns::class_of;
use super::context::CompilationContext;
use super::joins;
use super::params::CompositeLeaf;
use super::paths::{Resolved, resolve_path};
use super::patterns::select::rewrite_subquery;
use super::registry::InfoId;
use crate::ast::visit::{VisitorMut, walk_expr};
use crate::ast::{Expr, Parameter, Select};
use crate::error::{CompileError, CompileResult};
use crate::metadata::{EntityMetadata, FieldMetadata, OBJECT_TYPE};
use std::collections::HashMap;

/// Composite value spanning several columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Composite {
    pub class: String,
    pub leaves: Vec<CompositeLeaf>,
}

/// What is known about the type of a rewritten operand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Typing {
    pub value_type: Option<String>,
    pub composite: Option<Composite>,
}

impl Typing {
    pub fn scalar(value_type: impl Into<String>) -> Self {
        Self {
            value_type: Some(value_type.into()),
            composite: None,
        }
    }

    fn unknown_class(class: String) -> Self {
        if class == OBJECT_TYPE {
            Self::default()
        } else {
            Self::scalar(class)
        }
    }
}

fn relative_leaves(field: &FieldMetadata) -> Vec<CompositeLeaf> {
    field
        .leaves()
        .into_iter()
        .map(|(path, leaf)| CompositeLeaf {
            path: path
                .split_once('.')
                .map(|(_, rest)| rest.to_string())
                .unwrap_or(path),
            value_type: leaf.value_type().to_string(),
        })
        .collect()
}

/// Identifier of an entity as an operand.
fn id_operand(ctx: &mut CompilationContext<'_>, info: InfoId) -> (Expr, Typing) {
    let (metadata, alias) = {
        let entry = ctx.registry.get(info);
        (entry.metadata.clone(), entry.table_alias.clone())
    };
    let columns = metadata.id_columns();
    for (_, field) in &columns {
        ctx.note_column(info, &field.column);
    }
    if let [(_, field)] = columns.as_slice() {
        return (Expr::column(&alias, &field.column), Typing::scalar(field.value_type()));
    }

    let exprs = columns.iter().map(|(_, f)| Expr::column(&alias, &f.column)).collect();
    (Expr::Tuple(exprs), Typing {
        value_type: None,
        composite: Some(id_composite(&metadata)),
    })
}

/// Composite description of a multi-column identifier: the embedded id
/// class when there is one, the entity itself otherwise.
fn id_composite(metadata: &EntityMetadata) -> Composite {
    let ids: Vec<&FieldMetadata> = metadata.id_fields().collect();
    match ids.as_slice() {
        [single] if single.is_embedded() => Composite {
            class: single.value_type().to_string(),
            leaves: relative_leaves(single),
        },
        _ => Composite {
            class: metadata.name.clone(),
            leaves: metadata
                .id_columns()
                .into_iter()
                .map(|(path, f)| CompositeLeaf {
                    path,
                    value_type: f.value_type().to_string(),
                })
                .collect(),
        },
    }
}

/// Foreign-key column of an owning to-one, when the target key is a single column.
fn foreign_key(ctx: &CompilationContext<'_>, field: &FieldMetadata) -> CompileResult<Option<(String, Typing)>> {
    if field.mapped_by.is_some() {
        return Ok(None);
    }
    let target = ctx.entity(field.value_type())?;
    let id = target.single_id_column().ok_or_else(|| CompileError::CompositeKeyJoin {
        entity: target.name.clone(),
        field: field.name.clone(),
    })?;
    Ok(Some((field.column.clone(), Typing::scalar(id.value_type()))))
}

/// Turn a resolved path into a value expression.
pub(crate) fn value_of(ctx: &mut CompilationContext<'_>, resolved: Resolved, path: &str) -> CompileResult<(Expr, Typing)> {
    match resolved {
        Resolved::Column { info, field } => {
            ctx.note_column(info, &field.column);
            let alias = ctx.registry.get(info).table_alias.clone();
            Ok((Expr::column(alias, &field.column), Typing::scalar(field.value_type())))
        }
        Resolved::Entity(info) => Ok(id_operand(ctx, info)),
        Resolved::ToOne { info, field } => match foreign_key(ctx, &field)? {
            Some((column, typing)) => {
                ctx.note_column(info, &column);
                let alias = ctx.registry.get(info).table_alias.clone();
                Ok((Expr::column(alias, column), typing))
            }
            None => {
                let target = joins::navigate(ctx, info, &field, None)?;
                Ok(id_operand(ctx, target))
            }
        },
        Resolved::Embedded { info, field } => {
            let alias = ctx.registry.get(info).table_alias.clone();
            let leaves = field.leaves();
            let mut exprs = Vec::with_capacity(leaves.len());
            for (_, leaf) in &leaves {
                ctx.note_column(info, &leaf.column);
                exprs.push(Expr::column(&alias, &leaf.column));
            }
            let composite = Composite {
                class: field.value_type().to_string(),
                leaves: relative_leaves(&field),
            };
            Ok((Expr::Tuple(exprs), Typing {
                value_type: None,
                composite: Some(composite),
            }))
        }
        Resolved::Collection => Err(CompileError::CollectionPath(path.to_string())),
    }
}

/// Rewrites expressions in place against the compilation context.
pub(crate) struct ExprRewriter<'c, 'a> {
    ctx: &'c mut CompilationContext<'a>,
    /// Select-item aliases visible to ORDER BY, GROUP BY and HAVING.
    labels: Option<&'c HashMap<String, String>>,
}

impl<'c, 'a> ExprRewriter<'c, 'a> {
    pub fn new(ctx: &'c mut CompilationContext<'a>) -> Self {
        Self { ctx, labels: None }
    }

    pub fn with_labels(ctx: &'c mut CompilationContext<'a>, labels: &'c HashMap<String, String>) -> Self {
        Self {
            ctx,
            labels: Some(labels),
        }
    }

    fn label(&self, segments: &[String]) -> CompileResult<Option<String>> {
        let (Some(labels), [name]) = (self.labels, segments) else {
            return Ok(None);
        };
        if self.ctx.registry.resolve_by_alias(name)?.is_some() {
            return Ok(None);
        }
        Ok(labels.get(name).cloned())
    }

    /// Resolve a path operand. An owning to-one followed by its target's
    /// id field reads the foreign key instead of joining.
    fn resolve_operand(&mut self, segments: &[String]) -> CompileResult<(Expr, Typing)> {
        let path = segments.join(".");
        if let Some(label) = self.label(segments)? {
            return Ok((Expr::Label(label), Typing::default()));
        }

        if let [prefix @ .., last] = segments
            && !prefix.is_empty()
            && let Resolved::ToOne { info, field } = resolve_path(self.ctx, prefix)?
            && field.mapped_by.is_none()
        {
            let target = self.ctx.entity(field.value_type())?;
            if target.single_id_column().is_some_and(|id| id.name == *last) {
                return value_of(self.ctx, Resolved::ToOne { info, field }, &path);
            }
        }

        let resolved = resolve_path(self.ctx, segments)?;
        value_of(self.ctx, resolved, &path)
    }

    /// Rewrite `expr` and report its type. Placeholders are left unbound.
    fn operand(&mut self, expr: &mut Expr) -> CompileResult<Typing> {
        match expr {
            Expr::Parameter(_) => Ok(Typing::default()),
            Expr::Path(segments) => {
                let segments = std::mem::take(segments);
                let (rewritten, typing) = self.resolve_operand(&segments)?;
                *expr = rewritten;
                Ok(typing)
            }
            _ => {
                self.visit_expr(expr)?;
                Ok(Typing::unknown_class(class_of(self.ctx, expr)))
            }
        }
    }

    /// Bind a placeholder operand with the type of its counterpart; other
    /// operands are rewritten normally.
    fn bind(&mut self, expr: &mut Expr, typing: &Typing) -> CompileResult<()> {
        let Expr::Parameter(param) = expr else {
            return self.visit_expr(expr);
        };
        if matches!(param, Parameter::Bound(_)) {
            return Ok(());
        }
        match &typing.composite {
            Some(composite) => {
                let slots = self.ctx.params.bind_composite(param, &composite.class, &composite.leaves)?;
                *expr = Expr::Tuple(
                    slots
                        .into_iter()
                        .map(|slot| Expr::Parameter(Parameter::Bound(slot)))
                        .collect(),
                );
            }
            None => {
                let slot = self.ctx.params.bind(param, typing.value_type.as_deref())?;
                *param = Parameter::Bound(slot);
            }
        }
        Ok(())
    }

    /// Rewrite the tested side of a predicate. A placeholder there is
    /// bound untyped.
    fn subject(&mut self, expr: &mut Expr) -> CompileResult<Typing> {
        let typing = self.operand(expr)?;
        if expr.is_parameter() {
            self.bind(expr, &Typing::default())?;
        }
        Ok(typing)
    }

    /// Binary comparison: resolve the non-placeholder side first so the
    /// placeholder takes its type.
    fn comparison(&mut self, left: &mut Expr, right: &mut Expr) -> CompileResult<()> {
        if left.is_parameter() && !right.is_parameter() {
            let typing = self.operand(right)?;
            return self.bind(left, &typing);
        }
        let typing = self.subject(left)?;
        self.bind(right, &typing)
    }

    fn subquery(&mut self, select: &mut Select) -> CompileResult<()> {
        rewrite_subquery(self.ctx, select)
    }
}

impl VisitorMut for ExprRewriter<'_, '_> {
    fn visit_select(&mut self, select: &mut Select) -> CompileResult<()> {
        self.subquery(select)
    }

    fn visit_parameter(&mut self, param: &mut Parameter) -> CompileResult<()> {
        if !matches!(param, Parameter::Bound(_)) {
            let slot = self.ctx.params.bind(param, None)?;
            *param = Parameter::Bound(slot);
        }
        Ok(())
    }

    fn visit_expr(&mut self, expr: &mut Expr) -> CompileResult<()> {
        match expr {
            Expr::Path(_) => {
                self.operand(expr)?;
                Ok(())
            }
            Expr::Binary { left, op, right } if op.is_comparison() => self.comparison(left, right),
            Expr::Between { expr, low, high, .. } => {
                let typing = self.subject(expr)?;
                self.bind(low, &typing)?;
                self.bind(high, &typing)
            }
            Expr::InList { expr, list, .. } => {
                let typing = self.subject(expr)?;
                for item in list {
                    self.bind(item, &typing)?;
                }
                Ok(())
            }
            Expr::Like { expr, pattern, .. } => {
                self.subject(expr)?;
                self.bind(pattern, &Typing::scalar("String"))
            }
            Expr::InSubquery { expr, subquery, .. } => {
                self.subject(expr)?;
                self.subquery(subquery)
            }
            _ => walk_expr(self, expr),
        }
    }
}

/// Type of the value written by an assignment to `field`.
pub(crate) fn assignment_typing(ctx: &CompilationContext<'_>, field: &FieldMetadata) -> CompileResult<Typing> {
    if field.mapping.is_to_one() {
        return Ok(foreign_key(ctx, field)?.map(|(_, t)| t).unwrap_or_default());
    }
    Ok(Typing::scalar(field.value_type()))
}

/// Rewrite one standalone expression.
pub(crate) fn rewrite_expr(ctx: &mut CompilationContext<'_>, expr: &mut Expr) -> CompileResult<()> {
    ExprRewriter::new(ctx).visit_expr(expr)
}

/// Rewrite an expression whose placeholder must carry `typing`.
pub(crate) fn rewrite_typed(ctx: &mut CompilationContext<'_>, expr: &mut Expr, typing: &Typing) -> CompileResult<()> {
    ExprRewriter::new(ctx).bind(expr, typing)
}
