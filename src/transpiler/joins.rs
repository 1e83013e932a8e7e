//! Join synthesis for relationship navigation.

use super::context::CompilationContext;
use super::registry::{InfoId, JoinInfo, LinkJoin, Origin};
use crate::ast::{Expr, JoinKind};
use crate::error::{CompileError, CompileResult};
use crate::metadata::{EntityMetadata, FieldMetadata, MappingKind};

fn id_column<'m>(entity: &'m EntityMetadata, field: &FieldMetadata) -> CompileResult<&'m str> {
    entity
        .single_id_column()
        .map(|f| f.column.as_str())
        .ok_or_else(|| CompileError::CompositeKeyJoin {
            entity: entity.name.clone(),
            field: field.name.clone(),
        })
}

fn owning_field<'m>(target: &'m EntityMetadata, mapped_by: &str, field: &FieldMetadata) -> CompileResult<&'m FieldMetadata> {
    target.find_field(mapped_by).ok_or_else(|| CompileError::InvalidPath {
        path: format!("{}.{}", target.name, mapped_by),
        reason: format!("mapped_by of '{}' does not exist", field.name),
    })
}

/// Parent entry reachable through the inverse of the join that produced
/// `source`, when `field` is the owning side of that relationship.
pub(crate) fn inverse_parent(ctx: &CompilationContext<'_>, source: InfoId, field: &FieldMetadata) -> Option<InfoId> {
    if !field.mapping.is_to_one() || field.mapped_by.is_some() {
        return None;
    }
    let target = field.target.as_deref()?;
    let join = ctx.registry.get(source).join()?;
    let parent = join.parent?;
    if join.inverse_field.as_deref() != Some(field.name.as_str()) {
        return None;
    }
    ctx.registry.resolve_by_entity_type(target).find(|id| *id == parent)
}

/// Resolve navigation from `source` across the relationship `field`,
/// synthesizing and registering a join when none exists yet.
///
/// `explicit` carries the join type written in the query, which overrides
/// the nullability-based default.
pub(crate) fn navigate(
    ctx: &mut CompilationContext<'_>,
    source: InfoId,
    field: &FieldMetadata,
    explicit: Option<JoinKind>,
) -> CompileResult<InfoId> {
    let (path, source_meta, source_alias, source_scope, group) = {
        let info = ctx.registry.get(source);
        (
            format!("{}.{}", info.canonical_alias(), field.name),
            info.metadata.clone(),
            info.table_alias.clone(),
            info.scope,
            info.group,
        )
    };

    if let Some(existing) = ctx.registry.find_path(&path) {
        return Ok(existing);
    }
    if explicit.is_none() {
        if let Some(parent) = inverse_parent(ctx, source, field) {
            tracing::trace!("Reusing inverse join for {}", path);
            return Ok(parent);
        }
    }

    if let Some(statement) = ctx.join_restriction() {
        return Err(CompileError::JoinNotAllowed(path, statement));
    }
    if source_scope != ctx.registry.current_scope() {
        return Err(CompileError::JoinNotAllowed(path, "a correlated subquery"));
    }

    let target_name = field
        .target
        .as_deref()
        .ok_or_else(|| CompileError::invalid_path(&path, "not a relationship"))?;
    let target = ctx.entity(target_name)?;

    if source_meta.has_composite_key() || target.has_composite_key() {
        return Err(CompileError::CompositeKeyJoin {
            entity: source_meta.name.clone(),
            field: field.name.clone(),
        });
    }
    let source_id = id_column(&source_meta, field)?;
    let target_id = id_column(&target, field)?;

    let mut link = None;
    let mut inverse_field = None;
    let (table_alias, condition, default_kind) = match field.mapping {
        MappingKind::ManyToOne | MappingKind::OneToOne if field.mapped_by.is_none() => {
            let alias = ctx.registry.next_table_alias();
            let condition = Expr::eq(Expr::column(&source_alias, &field.column), Expr::column(&alias, target_id));
            let kind = if field.nullable { JoinKind::Left } else { JoinKind::Inner };
            (alias, condition, kind)
        }
        MappingKind::OneToOne | MappingKind::OneToMany if field.mapped_by.is_some() => {
            let mapped_by = field.mapped_by.as_deref().unwrap_or_default();
            let owner = owning_field(&target, mapped_by, field)?;
            inverse_field = Some(owner.name.clone());
            let alias = ctx.registry.next_table_alias();
            let condition = Expr::eq(Expr::column(&source_alias, source_id), Expr::column(&alias, &owner.column));
            (alias, condition, JoinKind::Left)
        }
        MappingKind::OneToMany => {
            let alias = ctx.registry.next_table_alias();
            let condition = Expr::eq(Expr::column(&source_alias, source_id), Expr::column(&alias, &field.column));
            (alias, condition, JoinKind::Left)
        }
        MappingKind::ManyToMany => {
            let (table, source_column, target_column) = match &field.mapped_by {
                None => {
                    let jt = field
                        .join_table
                        .as_ref()
                        .ok_or_else(|| CompileError::invalid_path(&path, "many-to-many without join table"))?;
                    (jt.table.clone(), jt.join_column.clone(), jt.inverse_join_column.clone())
                }
                Some(mapped_by) => {
                    let owner = owning_field(&target, mapped_by, field)?;
                    let jt = owner
                        .join_table
                        .as_ref()
                        .ok_or_else(|| CompileError::invalid_path(&path, "owning side declares no join table"))?;
                    inverse_field = Some(owner.name.clone());
                    (jt.table.clone(), jt.inverse_join_column.clone(), jt.join_column.clone())
                }
            };
            let link_alias = ctx.registry.next_table_alias();
            let alias = ctx.registry.next_table_alias();
            link = Some(LinkJoin {
                table,
                alias: link_alias.clone(),
                condition: Expr::eq(Expr::column(&link_alias, source_column), Expr::column(&source_alias, source_id)),
            });
            let condition = Expr::eq(Expr::column(&alias, target_id), Expr::column(&link_alias, target_column));
            (alias, condition, JoinKind::Left)
        }
        MappingKind::Column | MappingKind::Embedded => {
            return Err(CompileError::invalid_path(path, "not a relationship"));
        }
        MappingKind::ManyToOne | MappingKind::OneToOne => {
            return Err(CompileError::invalid_path(path, "inverse to-one without mapped_by"));
        }
    };

    let kind = explicit.unwrap_or(default_kind);
    tracing::trace!("Join {} {} AS {} for {}", kind, target.table, table_alias, path);

    let origin = Origin::Join(JoinInfo {
        parent: Some(source),
        field: Some(field.name.clone()),
        inverse_field,
        kind,
        condition,
        link,
        depends_on: Vec::new(),
    });
    ctx.registry
        .register_with_table_alias(path, target, table_alias, group, origin)
}
