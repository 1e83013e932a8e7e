//! Path resolution.
//!
//! A dotted path is resolved against the registry by its longest registered
//! alias prefix, then navigated field by field through entity metadata. A
//! path whose first segment is not an alias falls back to the declared
//! entity in the nearest scope that has a field of that name; more than one
//! such entity is an ambiguity.

use super::context::CompilationContext;
use super::joins;
use super::registry::InfoId;
use crate::error::{CompileError, CompileResult};
use crate::metadata::{FieldMetadata, MappingKind};

/// What a path denotes.
#[derive(Debug, Clone)]
pub(crate) enum Resolved {
    /// Leaf column on an entry.
    Column { info: InfoId, field: FieldMetadata },
    /// Whole entity (alias or navigated join).
    Entity(InfoId),
    /// To-one relationship named as the last segment, not yet joined.
    ToOne { info: InfoId, field: FieldMetadata },
    /// Embedded value flattened into `info`'s row.
    Embedded { info: InfoId, field: FieldMetadata },
    /// Collection-valued relationship named as the last segment.
    Collection,
}

/// Starting entry of a path plus the number of segments it consumed.
fn resolve_start(ctx: &CompilationContext<'_>, segments: &[String]) -> CompileResult<(InfoId, usize)> {
    for len in (1..=segments.len()).rev() {
        let prefix = segments[..len].join(".");
        if let Some(id) = ctx.registry.resolve_by_alias(&prefix)? {
            return Ok((id, len));
        }
    }

    let first = segments.first().map(String::as_str).unwrap_or_default();
    match ctx.registry.declared_with_field(first).as_slice() {
        [] => Err(CompileError::UnknownIdentifier(segments.join("."))),
        [id] => Ok((*id, 0)),
        many => Err(CompileError::Ambiguous {
            expr: segments.join("."),
            candidates: many.len(),
        }),
    }
}

/// Resolve a dotted path, synthesizing joins for intermediate to-one
/// segments.
pub(crate) fn resolve_path(ctx: &mut CompilationContext<'_>, segments: &[String]) -> CompileResult<Resolved> {
    let (start, consumed) = resolve_start(ctx, segments)?;
    let full = segments.join(".");
    let mut current = Resolved::Entity(start);
    let rest = &segments[consumed..];

    for (i, segment) in rest.iter().enumerate() {
        let last = i + 1 == rest.len();
        current = match current {
            Resolved::Entity(info) => {
                let metadata = ctx.registry.get(info).metadata.clone();
                let field = metadata
                    .find_field(segment)
                    .ok_or_else(|| CompileError::unknown_field(&metadata.name, segment))?
                    .clone();
                match field.mapping {
                    MappingKind::Column => Resolved::Column { info, field },
                    MappingKind::Embedded => Resolved::Embedded { info, field },
                    MappingKind::OneToOne | MappingKind::ManyToOne if last => Resolved::ToOne { info, field },
                    MappingKind::OneToOne | MappingKind::ManyToOne => {
                        Resolved::Entity(joins::navigate(ctx, info, &field, None)?)
                    }
                    MappingKind::OneToMany | MappingKind::ManyToMany if last => Resolved::Collection,
                    MappingKind::OneToMany | MappingKind::ManyToMany => {
                        return Err(CompileError::CollectionPath(full));
                    }
                }
            }
            Resolved::Embedded { info, field } => {
                let component = field
                    .component(segment)
                    .ok_or_else(|| CompileError::unknown_field(field.value_type(), segment))?
                    .clone();
                if component.is_embedded() {
                    Resolved::Embedded { info, field: component }
                } else {
                    Resolved::Column { info, field: component }
                }
            }
            Resolved::ToOne { info, field } => {
                // Only reachable when more segments follow, which `last` rules out.
                Resolved::Entity(joins::navigate(ctx, info, &field, None)?)
            }
            Resolved::Column { .. } => {
                return Err(CompileError::invalid_path(full, "cannot navigate past a basic field"));
            }
            Resolved::Collection => {
                return Err(CompileError::CollectionPath(full));
            }
        };
    }

    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiled::StatementKind;
    use crate::config::LabelSettings;
    use crate::hints::QueryHints;
    use crate::metadata::{EntityCatalog, EntityMetadata};
    use crate::transpiler::registry::Origin;

    fn catalog() -> EntityCatalog {
        EntityCatalog::new()
            .with(
                EntityMetadata::new("Employee", "employee")
                    .field(FieldMetadata::id("id", "id", "i64"))
                    .field(FieldMetadata::basic("name", "name", "String"))
                    .field(FieldMetadata::embedded(
                        "address",
                        "Address",
                        vec![FieldMetadata::basic("city", "city", "String")],
                    ))
                    .field(FieldMetadata::many_to_one("department", "dept_id", "Department")),
            )
            .with(
                EntityMetadata::new("Department", "department")
                    .field(FieldMetadata::id("id", "id", "i64"))
                    .field(FieldMetadata::basic("name", "name", "String"))
                    .field(FieldMetadata::one_to_many("employees", "Employee", "department")),
            )
    }

    fn path(s: &str) -> Vec<String> {
        s.split('.').map(String::from).collect()
    }

    #[test]
    fn test_resolve_navigation() {
        let catalog = catalog();
        let labels = LabelSettings::default();
        let mut ctx = CompilationContext::new(&catalog, QueryHints::default(), &labels, StatementKind::Select);
        let meta = ctx.entity("Employee").unwrap();
        let e = ctx.registry.register("e", meta, 0, Origin::Root).unwrap();

        assert!(matches!(resolve_path(&mut ctx, &path("e")).unwrap(), Resolved::Entity(id) if id == e));
        assert!(matches!(
            resolve_path(&mut ctx, &path("e.address.city")).unwrap(),
            Resolved::Column { info, ref field } if info == e && field.column == "city"
        ));
        assert!(matches!(
            resolve_path(&mut ctx, &path("e.department")).unwrap(),
            Resolved::ToOne { .. }
        ));
        assert_eq!(ctx.registry.len(), 1);

        let Resolved::Column { info, .. } = resolve_path(&mut ctx, &path("e.department.name")).unwrap() else {
            panic!("expected column");
        };
        assert_eq!(ctx.registry.get(info).table_alias, "t2");
        // second navigation reuses the join
        resolve_path(&mut ctx, &path("e.department.name")).unwrap();
        assert_eq!(ctx.registry.len(), 2);
    }

    #[test]
    fn test_unqualified_resolution() {
        let catalog = catalog();
        let labels = LabelSettings::default();
        let mut ctx = CompilationContext::new(&catalog, QueryHints::default(), &labels, StatementKind::Select);
        let meta = ctx.entity("Employee").unwrap();
        let e = ctx.registry.register("e", meta, 0, Origin::Root).unwrap();
        assert!(matches!(
            resolve_path(&mut ctx, &path("name")).unwrap(),
            Resolved::Column { info, .. } if info == e
        ));

        let dept = ctx.entity("Department").unwrap();
        ctx.registry.register("d", dept, 1, Origin::Root).unwrap();
        let err = resolve_path(&mut ctx, &path("name")).unwrap_err();
        assert!(matches!(err, CompileError::Ambiguous { candidates: 2, .. }));

        let err = resolve_path(&mut ctx, &path("salary")).unwrap_err();
        assert!(matches!(err, CompileError::UnknownIdentifier(_)));
    }

    #[test]
    fn test_collection_paths() {
        let catalog = catalog();
        let labels = LabelSettings::default();
        let mut ctx = CompilationContext::new(&catalog, QueryHints::default(), &labels, StatementKind::Select);
        let meta = ctx.entity("Department").unwrap();
        ctx.registry.register("d", meta, 0, Origin::Root).unwrap();
        assert!(matches!(
            resolve_path(&mut ctx, &path("d.employees")).unwrap(),
            Resolved::Collection
        ));
        let err = resolve_path(&mut ctx, &path("d.employees.name")).unwrap_err();
        assert!(matches!(err, CompileError::CollectionPath(_)));
    }

    #[test]
    fn test_unknown_field() {
        let catalog = catalog();
        let labels = LabelSettings::default();
        let mut ctx = CompilationContext::new(&catalog, QueryHints::default(), &labels, StatementKind::Select);
        let meta = ctx.entity("Employee").unwrap();
        ctx.registry.register("e", meta, 0, Origin::Root).unwrap();
        let err = resolve_path(&mut ctx, &path("e.salray")).unwrap_err();
        assert_eq!(err.to_string(), "Unknown field 'salray' on entity 'Employee'");
    }
}
