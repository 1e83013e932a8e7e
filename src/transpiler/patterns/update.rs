//! UPDATE pattern implementation

use super::{StatementPattern, register_target, table_ref};
use crate::ast::Statement;
use crate::compiled::StatementKind;
use crate::error::{CompileError, CompileResult};
use crate::transpiler::context::CompilationContext;
use crate::transpiler::paths::{Resolved, resolve_path};
use crate::transpiler::rewrite::{assignment_typing, rewrite_expr, rewrite_typed};

/// UPDATE statement pattern
pub struct UpdatePattern;

impl StatementPattern for UpdatePattern {
    fn id(&self) -> &'static str {
        "update"
    }

    fn kind(&self) -> StatementKind {
        StatementKind::Update
    }

    fn matches(&self, stmt: &Statement) -> bool {
        matches!(stmt, Statement::Update(_))
    }

    fn rewrite(&self, stmt: &mut Statement, ctx: &mut CompilationContext<'_>) -> CompileResult<()> {
        let Statement::Update(update) = stmt else {
            return Err(CompileError::unsupported("expected UPDATE"));
        };
        let root = register_target(ctx, &update.target)?;
        update.target = table_ref(ctx, root);

        for assignment in &mut update.assignments {
            let path = assignment.target.join(".");
            let field = match resolve_path(ctx, &assignment.target)? {
                Resolved::Column { info, field } if info == root => field,
                Resolved::ToOne { info, field } if info == root && field.mapped_by.is_none() => field,
                Resolved::Embedded { .. } => return Err(CompileError::EmbeddedAssignment(path)),
                Resolved::ToOne { .. } => {
                    return Err(CompileError::invalid_path(path, "inverse side of a relationship"));
                }
                Resolved::Collection => {
                    return Err(CompileError::invalid_path(path, "collection-valued field"));
                }
                Resolved::Column { .. } | Resolved::Entity(_) => {
                    return Err(CompileError::invalid_path(path, "not a field of the updated entity"));
                }
            };
            let typing = assignment_typing(ctx, &field)?;
            assignment.target = vec![field.column.clone()];
            rewrite_typed(ctx, &mut assignment.value, &typing)?;
        }

        if let Some(selection) = &mut update.selection {
            rewrite_expr(ctx, selection)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LabelSettings;
    use crate::hints::QueryHints;
    use crate::metadata::{EntityCatalog, EntityMetadata, FieldMetadata};
    use crate::parser::parse_statement;

    fn catalog() -> EntityCatalog {
        EntityCatalog::new()
            .with(
                EntityMetadata::new("Employee", "employee")
                    .field(FieldMetadata::id("id", "id", "i64"))
                    .field(FieldMetadata::basic("salary", "salary", "f64"))
                    .field(FieldMetadata::embedded(
                        "address",
                        "Address",
                        vec![FieldMetadata::basic("city", "city", "String")],
                    ))
                    .field(FieldMetadata::many_to_one("department", "dept_id", "Department")),
            )
            .with(EntityMetadata::new("Department", "department").field(FieldMetadata::id("id", "id", "i64")))
    }

    fn compile(ctx: &mut CompilationContext<'_>, text: &str) -> CompileResult<String> {
        let mut stmt = parse_statement(text)?;
        UpdatePattern.rewrite(&mut stmt, ctx)?;
        Ok(stmt.to_string())
    }

    #[test]
    fn test_update_default_alias() {
        let catalog = catalog();
        let labels = LabelSettings::default();
        let mut ctx = CompilationContext::new(&catalog, QueryHints::default(), &labels, StatementKind::Update);
        let sql = compile(
            &mut ctx,
            "update Employee set salary = salary * 2, department = :d where Employee.id = :id",
        )
        .unwrap();
        assert_eq!(
            sql,
            "UPDATE employee AS t1 SET salary = t1.salary * 2, dept_id = ? WHERE t1.id = ?"
        );
        assert_eq!(ctx.params.slot(0).unwrap().value_type, "i64");
    }

    #[test]
    fn test_update_rejections() {
        let catalog = catalog();
        let labels = LabelSettings::default();
        let mut ctx = CompilationContext::new(&catalog, QueryHints::default(), &labels, StatementKind::Update);
        let err = compile(&mut ctx, "update Employee e set e.address = :a").unwrap_err();
        assert!(matches!(err, CompileError::EmbeddedAssignment(p) if p == "e.address"));

        let mut ctx = CompilationContext::new(&catalog, QueryHints::default(), &labels, StatementKind::Update);
        let err = compile(
            &mut ctx,
            "update Employee e set e.salary = 1 where e.department.id > 0 and e.department.name = 'x'",
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::JoinNotAllowed(_, "UPDATE")));
    }

    #[test]
    fn test_update_embedded_component() {
        let catalog = catalog();
        let labels = LabelSettings::default();
        let mut ctx = CompilationContext::new(&catalog, QueryHints::default(), &labels, StatementKind::Update);
        let sql = compile(&mut ctx, "update Employee e set e.address.city = ?1").unwrap();
        assert_eq!(sql, "UPDATE employee AS t1 SET city = ?");
        assert_eq!(ctx.params.slot(0).unwrap().value_type, "String");
    }
}
