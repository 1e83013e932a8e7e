//! Column expansion for entity-valued select items.
//!
//! An entity in the select list becomes one labelled column per loaded
//! field. Labels are hierarchical: `c1-4-2` is the second field of the
//! entity reached through the fourth field of select item 1.

use super::context::CompilationContext;
use super::joins;
use super::registry::InfoId;
use crate::ast::{BinaryOp, Expr, FunctionArgs, Parameter, SelectItem, UnaryOp};
use crate::compiled::{EntityMapping, Slot};
use crate::error::CompileResult;
use crate::metadata::{FetchPolicy, FieldMetadata, MappingKind, OBJECT_TYPE};

/// Entries and entity types currently being expanded.
#[derive(Debug, Default)]
pub(crate) struct ExpansionGuard {
    infos: Vec<InfoId>,
    types: Vec<String>,
}

impl ExpansionGuard {
    fn enter(&mut self, info: InfoId, entity: &str) {
        self.infos.push(info);
        self.types.push(entity.to_string());
    }

    fn leave(&mut self) {
        self.infos.pop();
        self.types.pop();
    }

    fn expanding(&self, info: InfoId) -> bool {
        self.infos.contains(&info)
    }

    fn expanding_type(&self, entity: &str) -> bool {
        self.types.iter().any(|t| t == entity)
    }
}

fn push_column(out: &mut Vec<SelectItem>, table_alias: &str, column: &str, label: String) {
    out.push(SelectItem {
        expr: Expr::column(table_alias, column),
        alias: Some(label),
    });
}

/// Inline the leaves of an embedded value under the owner's alias.
pub(crate) fn expand_embedded(
    table_alias: &str,
    field: &FieldMetadata,
    label: &str,
    out: &mut Vec<SelectItem>,
) -> Vec<Slot> {
    field
        .fields
        .iter()
        .enumerate()
        .map(|(i, component)| {
            let label = format!("{}-{}", label, i + 1);
            if component.is_embedded() {
                Slot::Embedded {
                    field: component.name.clone(),
                    slots: expand_embedded(table_alias, component, &label, out),
                }
            } else {
                push_column(out, table_alias, &component.column, label.clone());
                Slot::Column {
                    field: component.name.clone(),
                    label,
                }
            }
        })
        .collect()
}

/// Entry a to-one field should be inlined through, if any.
fn to_one_target(
    ctx: &mut CompilationContext<'_>,
    info: InfoId,
    field: &FieldMetadata,
    guard: &ExpansionGuard,
) -> CompileResult<Option<InfoId>> {
    if let Some(parent) = joins::inverse_parent(ctx, info, field) {
        return Ok(Some(parent));
    }
    let path = format!("{}.{}", ctx.registry.get(info).canonical_alias(), field.name);
    if let Some(existing) = ctx.registry.find_path(&path) {
        return Ok(Some(existing));
    }

    let policy = ctx.hints.effective(field.mapping, field.fetch_policy());
    let target = field.value_type();
    if policy == FetchPolicy::Lazy || guard.expanding_type(target) {
        return Ok(None);
    }
    // Joins need single-column keys on both sides; such fields stay unloaded.
    let target_meta = ctx.entity(target)?;
    if target_meta.has_composite_key() || ctx.registry.get(info).metadata.has_composite_key() {
        return Ok(None);
    }
    joins::navigate(ctx, info, field, None).map(Some)
}

/// Expand every loaded field of `info` into labelled select items.
pub(crate) fn expand_entity(
    ctx: &mut CompilationContext<'_>,
    info: InfoId,
    label: &str,
    out: &mut Vec<SelectItem>,
    guard: &mut ExpansionGuard,
) -> CompileResult<EntityMapping> {
    let (metadata, table_alias) = {
        let entry = ctx.registry.get(info);
        (entry.metadata.clone(), entry.table_alias.clone())
    };
    guard.enter(info, &metadata.name);

    let mut slots = Vec::with_capacity(metadata.fields.len());
    for (i, field) in metadata.fields.iter().enumerate() {
        let label = format!("{}-{}", label, i + 1);
        match field.mapping {
            MappingKind::Column => {
                let policy = ctx.hints.effective(field.mapping, field.fetch_policy());
                if policy == FetchPolicy::Lazy && !field.id {
                    continue;
                }
                push_column(out, &table_alias, &field.column, label.clone());
                slots.push(Slot::Column {
                    field: field.name.clone(),
                    label,
                });
            }
            MappingKind::Embedded => slots.push(Slot::Embedded {
                field: field.name.clone(),
                slots: expand_embedded(&table_alias, field, &label, out),
            }),
            MappingKind::OneToOne | MappingKind::ManyToOne => match to_one_target(ctx, info, field, guard)? {
                Some(target) if !guard.expanding(target) => {
                    let mapping = expand_entity(ctx, target, &label, out, guard)?;
                    slots.push(Slot::Joined {
                        field: field.name.clone(),
                        mapping,
                    });
                }
                _ => slots.push(Slot::Lazy {
                    field: field.name.clone(),
                }),
            },
            MappingKind::OneToMany | MappingKind::ManyToMany => slots.push(Slot::Collection {
                field: field.name.clone(),
            }),
        }
    }

    guard.leave();
    Ok(EntityMapping {
        entity: metadata.name.clone(),
        table_alias,
        slots,
    })
}

/// Declared class of a rewritten scalar expression.
pub(crate) fn class_of(ctx: &CompilationContext<'_>, expr: &Expr) -> String {
    match expr {
        Expr::Column(col) => col
            .qualifier
            .as_deref()
            .and_then(|q| ctx.registry.resolve_by_table_alias(q))
            .and_then(|id| {
                ctx.registry
                    .get(id)
                    .metadata
                    .find_column(&col.column)
                    .map(|f| f.value_type().to_string())
            })
            .unwrap_or_else(|| OBJECT_TYPE.to_string()),
        Expr::Literal(lit) => lit.class().to_string(),
        Expr::Parameter(Parameter::Bound(slot)) => ctx
            .params
            .slot(*slot)
            .map(|s| s.value_type.clone())
            .unwrap_or_else(|| OBJECT_TYPE.to_string()),
        Expr::Binary { op, .. } if op.is_comparison() || op.is_logical() => "bool".to_string(),
        Expr::Binary {
            op: BinaryOp::Concat, ..
        } => "String".to_string(),
        Expr::Binary { left, .. } => class_of(ctx, left),
        Expr::Unary { op: UnaryOp::Not, .. } => "bool".to_string(),
        Expr::Unary { expr, .. } | Expr::Nested(expr) => class_of(ctx, expr),
        Expr::IsNull { .. }
        | Expr::Between { .. }
        | Expr::InList { .. }
        | Expr::InSubquery { .. }
        | Expr::Like { .. }
        | Expr::Exists { .. } => "bool".to_string(),
        Expr::Function { name, args } => match name.to_ascii_uppercase().as_str() {
            "COUNT" => "i64".to_string(),
            "AVG" => "f64".to_string(),
            "SUM" | "MIN" | "MAX" => match args {
                FunctionArgs::List { args, .. } => args
                    .first()
                    .map(|a| class_of(ctx, a))
                    .unwrap_or_else(|| OBJECT_TYPE.to_string()),
                FunctionArgs::None | FunctionArgs::Star => OBJECT_TYPE.to_string(),
            },
            _ => OBJECT_TYPE.to_string(),
        },
        Expr::Case { branches, .. } => branches
            .first()
            .map(|b| class_of(ctx, &b.result))
            .unwrap_or_else(|| OBJECT_TYPE.to_string()),
        Expr::Path(_)
        | Expr::Parameter(_)
        | Expr::Label(_)
        | Expr::Subquery(_)
        | Expr::Tuple(_) => OBJECT_TYPE.to_string(),
    }
}
