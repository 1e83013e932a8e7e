//! SELECT pattern implementation

use std::collections::{HashMap, HashSet};

use super::StatementPattern;
use crate::ast::visit::VisitorMut;
use crate::ast::{Expr, FromItem, Join, Literal, Select, SelectItem, Statement, TableRef};
use crate::compiled::{ResultMapping, ReturnType, StatementKind};
use crate::error::{CompileError, CompileResult};
use crate::metadata::is_array_type;
use crate::transpiler::columns::{self, ExpansionGuard, class_of};
use crate::transpiler::context::CompilationContext;
use crate::transpiler::joins;
use crate::transpiler::paths::{Resolved, resolve_path};
use crate::transpiler::registry::{InfoId, JoinInfo, Origin};
use crate::transpiler::rewrite::{ExprRewriter, Typing, rewrite_expr, rewrite_typed, value_of};

/// SELECT query pattern
pub struct SelectPattern;

impl StatementPattern for SelectPattern {
    fn id(&self) -> &'static str {
        "select"
    }

    fn kind(&self) -> StatementKind {
        StatementKind::Select
    }

    fn matches(&self, stmt: &Statement) -> bool {
        matches!(stmt, Statement::Select(_))
    }

    fn rewrite(&self, stmt: &mut Statement, ctx: &mut CompilationContext<'_>) -> CompileResult<()> {
        let Statement::Select(select) = stmt else {
            return Err(CompileError::unsupported("expected SELECT"));
        };
        rewrite_select(ctx, select, true)
    }
}

/// Rewrite a subquery in its own alias scope.
pub(crate) fn rewrite_subquery(ctx: &mut CompilationContext<'_>, select: &mut Select) -> CompileResult<()> {
    ctx.registry.push_scope();
    let result = rewrite_select(ctx, select, false);
    ctx.registry.pop_scope();
    result
}

fn rewrite_select(ctx: &mut CompilationContext<'_>, select: &mut Select, top_level: bool) -> CompileResult<()> {
    let scope = ctx.registry.current_scope();
    register_from(ctx, &select.from, top_level)?;

    let mut labels = HashMap::new();
    if top_level {
        let items = std::mem::take(&mut select.projection);
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            let label = ctx.select_label(i + 1);
            if let Some(alias) = item.alias {
                labels.insert(alias, label.clone());
            }
            project(ctx, item.expr, &label, &mut out)?;
        }
        select.projection = out;
    } else {
        // Entities in a subquery select list stand for their identifiers.
        for item in &mut select.projection {
            rewrite_expr(ctx, &mut item.expr)?;
            item.alias = None;
        }
    }

    if let Some(selection) = &mut select.selection {
        if top_level {
            ctx.keys.start();
        }
        rewrite_expr(ctx, selection)?;
        if top_level {
            ctx.keys.stop();
        }
    }

    {
        let mut rewriter = ExprRewriter::with_labels(ctx, &labels);
        for expr in &mut select.group_by {
            rewriter.visit_expr(expr)?;
        }
        if let Some(having) = &mut select.having {
            rewriter.visit_expr(having)?;
        }
        for item in &mut select.order_by {
            rewriter.visit_expr(&mut item.expr)?;
        }
    }

    let count = Typing::scalar("i64");
    if let Some(limit) = &mut select.limit {
        rewrite_typed(ctx, limit, &count)?;
    }
    if let Some(offset) = &mut select.offset {
        rewrite_typed(ctx, offset, &count)?;
    }

    select.from = build_from(ctx, scope);
    Ok(())
}

fn register_from(ctx: &mut CompilationContext<'_>, from: &[FromItem], top_level: bool) -> CompileResult<()> {
    for (group, item) in from.iter().enumerate() {
        let relation = &item.relation;
        let [name] = relation.name.as_slice() else {
            return Err(CompileError::invalid_path(relation.dotted_name(), "FROM requires an entity name"));
        };
        let metadata = ctx.entity(name)?;
        let alias = relation
            .alias
            .clone()
            .ok_or_else(|| CompileError::MissingAlias { entity: name.clone() })?;
        let id = ctx.registry.register(alias, metadata, group, Origin::Root)?;
        if top_level && ctx.root.is_none() {
            ctx.root = Some(id);
        }
        for join in &item.joins {
            register_join(ctx, join, group)?;
        }
    }
    Ok(())
}

/// Rewrite an explicit ON condition and attach it to join `id`, replacing
/// the synthesized condition or conjoined with it.
fn attach_on(ctx: &mut CompilationContext<'_>, id: InfoId, mut on: Expr, replace: bool) -> CompileResult<()> {
    let before = ctx.registry.len();
    rewrite_expr(ctx, &mut on)?;
    let registered = before..ctx.registry.len();
    if let Origin::Join(join) = &mut ctx.registry.get_mut(id).origin {
        join.condition = if replace {
            on
        } else {
            let current = std::mem::replace(&mut join.condition, Expr::Literal(Literal::Null));
            Expr::and(current, on)
        };
        join.depends_on.extend(registered);
    }
    Ok(())
}

fn register_join(ctx: &mut CompilationContext<'_>, join: &Join, group: usize) -> CompileResult<()> {
    let relation = &join.relation;
    match relation.name.as_slice() {
        [entity] => {
            let metadata = ctx.entity(entity)?;
            let alias = relation
                .alias
                .clone()
                .ok_or_else(|| CompileError::MissingAlias { entity: entity.clone() })?;
            let Some(on) = join.on.clone() else {
                return Err(CompileError::unsupported(format!("JOIN {} without ON", entity)));
            };
            let origin = Origin::Join(JoinInfo {
                parent: None,
                field: None,
                inverse_field: None,
                kind: join.kind,
                condition: Expr::Literal(Literal::Boolean(true)),
                link: None,
                depends_on: Vec::new(),
            });
            let id = ctx.registry.register(alias, metadata, group, origin)?;
            attach_on(ctx, id, on, true)?;
        }
        [prefix @ .., field_name] if !prefix.is_empty() => {
            let path = relation.dotted_name();
            let source = match resolve_path(ctx, prefix)? {
                Resolved::Entity(info) => info,
                Resolved::ToOne { info, field } => joins::navigate(ctx, info, &field, None)?,
                Resolved::Collection => return Err(CompileError::CollectionPath(path)),
                Resolved::Column { .. } | Resolved::Embedded { .. } => {
                    return Err(CompileError::invalid_path(path, "join source is not an entity"));
                }
            };
            let metadata = ctx.registry.get(source).metadata.clone();
            let field = metadata
                .find_field(field_name)
                .ok_or_else(|| CompileError::unknown_field(&metadata.name, field_name))?;
            if !field.mapping.is_relationship() {
                return Err(CompileError::invalid_path(path, "not a relationship"));
            }
            let id = joins::navigate(ctx, source, field, Some(join.kind))?;
            if let Some(alias) = &relation.alias {
                ctx.registry.add_alias(id, alias.clone())?;
            }
            if let Some(on) = join.on.clone() {
                attach_on(ctx, id, on, false)?;
            }
        }
        _ => return Err(CompileError::invalid_path(relation.dotted_name(), "empty join path")),
    }
    Ok(())
}

fn project_entity(
    ctx: &mut CompilationContext<'_>,
    info: InfoId,
    label: &str,
    out: &mut Vec<SelectItem>,
) -> CompileResult<()> {
    let mapping = columns::expand_entity(ctx, info, label, out, &mut ExpansionGuard::default())?;
    ctx.return_types.push(ReturnType {
        label: label.to_string(),
        class: mapping.entity.clone(),
        array: false,
    });
    ctx.mappings.push(ResultMapping::Entity(mapping));
    Ok(())
}

/// Expand one top-level select item.
fn project(ctx: &mut CompilationContext<'_>, expr: Expr, label: &str, out: &mut Vec<SelectItem>) -> CompileResult<()> {
    let expr = match expr {
        Expr::Path(segments) => {
            let path = segments.join(".");
            match resolve_path(ctx, &segments)? {
                Resolved::Entity(info) => return project_entity(ctx, info, label, out),
                Resolved::ToOne { info, field } => {
                    let target = joins::navigate(ctx, info, &field, None)?;
                    return project_entity(ctx, target, label, out);
                }
                Resolved::Embedded { info, field } => {
                    let table_alias = ctx.registry.get(info).table_alias.clone();
                    let slots = columns::expand_embedded(&table_alias, &field, label, out);
                    let class = field.value_type().to_string();
                    ctx.return_types.push(ReturnType {
                        label: label.to_string(),
                        class: class.clone(),
                        array: false,
                    });
                    ctx.mappings.push(ResultMapping::Embedded { class, slots });
                    return Ok(());
                }
                Resolved::Collection => return Err(CompileError::CollectionPath(path)),
                column @ Resolved::Column { .. } => value_of(ctx, column, &path)?.0,
            }
        }
        mut other => {
            rewrite_expr(ctx, &mut other)?;
            other
        }
    };

    let class = class_of(ctx, &expr);
    ctx.return_types.push(ReturnType {
        label: label.to_string(),
        array: is_array_type(&class),
        class,
    });
    ctx.mappings.push(ResultMapping::Scalar {
        label: label.to_string(),
    });
    out.push(SelectItem {
        expr,
        alias: Some(label.to_string()),
    });
    Ok(())
}

fn descends_from(ctx: &CompilationContext<'_>, mut id: InfoId, ancestor: InfoId) -> bool {
    while let Some(parent) = ctx.registry.get(id).join().and_then(|join| join.parent) {
        if parent == ancestor {
            return true;
        }
        id = parent;
    }
    false
}

/// Push `id` after its parent and after the joins its ON condition reads.
fn push_in_join_order(
    ctx: &CompilationContext<'_>,
    scope: usize,
    id: InfoId,
    seen: &mut HashSet<InfoId>,
    order: &mut Vec<InfoId>,
) {
    if !seen.insert(id) {
        return;
    }
    let entry = ctx.registry.get(id);
    if entry.scope != scope {
        return;
    }
    if let Some(join) = entry.join() {
        if let Some(parent) = join.parent {
            push_in_join_order(ctx, scope, parent, seen, order);
        }
        for dep in &join.depends_on {
            if !descends_from(ctx, *dep, id) {
                push_in_join_order(ctx, scope, *dep, seen, order);
            }
        }
    }
    order.push(id);
}

/// FROM clause of one scope: roots in declaration order, each followed by
/// the joins registered against it. A join renders after every join its
/// condition refers to.
fn build_from(ctx: &CompilationContext<'_>, scope: usize) -> Vec<FromItem> {
    let mut items: Vec<(usize, FromItem)> = ctx
        .registry
        .in_scope(scope)
        .filter(|(_, entry)| entry.is_root())
        .map(|(_, entry)| {
            let relation = TableRef::new(&entry.metadata.table, Some(entry.table_alias.clone()));
            (entry.group, FromItem {
                relation,
                joins: Vec::new(),
            })
        })
        .collect();

    let mut seen = HashSet::new();
    let mut order = Vec::new();
    for (id, _) in ctx.registry.in_scope(scope) {
        push_in_join_order(ctx, scope, id, &mut seen, &mut order);
    }

    for id in order {
        let entry = ctx.registry.get(id);
        let Some(join) = entry.join() else {
            continue;
        };
        let Some((_, item)) = items.iter_mut().find(|(group, _)| *group == entry.group) else {
            continue;
        };
        if let Some(link) = &join.link {
            item.joins.push(Join {
                kind: join.kind,
                relation: TableRef::new(&link.table, Some(link.alias.clone())),
                on: Some(link.condition.clone()),
            });
        }
        item.joins.push(Join {
            kind: join.kind,
            relation: TableRef::new(&entry.metadata.table, Some(entry.table_alias.clone())),
            on: Some(join.condition.clone()),
        });
    }

    items.into_iter().map(|(_, item)| item).collect()
}
