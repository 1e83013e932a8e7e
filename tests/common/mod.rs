//! Shared fixture catalog for the integration tests.

#![allow(dead_code)]

use objql::metadata::JoinTable;
use objql::prelude::*;
use std::sync::Arc;

/// Employee and Department only, exactly the fields of the canonical
/// end-to-end example.
pub fn basic_catalog() -> EntityCatalog {
    EntityCatalog::new()
        .with(
            EntityMetadata::new("Employee", "employee")
                .field(FieldMetadata::id("id", "id", "i64"))
                .field(FieldMetadata::basic("name", "name", "String"))
                .field(FieldMetadata::basic("salary", "salary", "f64"))
                .field(FieldMetadata::many_to_one("department", "dept_id", "Department").required()),
        )
        .with(
            EntityMetadata::new("Department", "department")
                .field(FieldMetadata::id("id", "id", "i64"))
                .field(FieldMetadata::basic("name", "name", "String"))
                .field(FieldMetadata::one_to_many("employees", "Employee", "department")),
        )
}

/// The full model: embedded values, a self reference, many-to-many links
/// and a composite key.
pub fn catalog() -> EntityCatalog {
    EntityCatalog::new()
        .with(
            EntityMetadata::new("Employee", "employee")
                .field(FieldMetadata::id("id", "id", "i64"))
                .field(FieldMetadata::basic("name", "name", "String"))
                .field(FieldMetadata::basic("salary", "salary", "f64"))
                .field(FieldMetadata::many_to_one("department", "dept_id", "Department").required())
                .field(FieldMetadata::embedded(
                    "address",
                    "Address",
                    vec![
                        FieldMetadata::basic("street", "street", "String"),
                        FieldMetadata::basic("city", "city", "String"),
                    ],
                ))
                .field(FieldMetadata::many_to_one("manager", "manager_id", "Employee"))
                .field(FieldMetadata::many_to_many(
                    "projects",
                    "Project",
                    JoinTable::new("employee_project", "employee_id", "project_id"),
                )),
        )
        .with(
            EntityMetadata::new("Department", "department")
                .field(FieldMetadata::id("id", "id", "i64"))
                .field(FieldMetadata::basic("name", "name", "String"))
                .field(FieldMetadata::one_to_many("employees", "Employee", "department")),
        )
        .with(
            EntityMetadata::new("Project", "project")
                .field(FieldMetadata::id("id", "id", "i64"))
                .field(FieldMetadata::basic("title", "title", "String"))
                .field(FieldMetadata::many_to_many_inverse("members", "Employee", "projects")),
        )
        .with(
            EntityMetadata::new("OrderLine", "order_line")
                .field(FieldMetadata::embedded_id(
                    "id",
                    "OrderLineKey",
                    vec![
                        FieldMetadata::basic("orderId", "order_id", "i64"),
                        FieldMetadata::basic("lineNo", "line_no", "i32"),
                    ],
                ))
                .field(FieldMetadata::basic("quantity", "quantity", "i32"))
                .field(FieldMetadata::many_to_one("product", "product_id", "Project")),
        )
}

/// One-to-one pairs and a unidirectional collection.
pub fn people_catalog() -> EntityCatalog {
    EntityCatalog::new()
        .with(
            EntityMetadata::new("Person", "person")
                .field(FieldMetadata::id("id", "id", "i64"))
                .field(FieldMetadata::basic("name", "name", "String"))
                .field(FieldMetadata::one_to_one_inverse("passport", "Passport", "owner"))
                .field(FieldMetadata::one_to_many_joined("notes", "Note", "person_id")),
        )
        .with(
            EntityMetadata::new("Passport", "passport")
                .field(FieldMetadata::id("id", "id", "i64"))
                .field(FieldMetadata::basic("doc_number", "doc_number", "String"))
                .field(FieldMetadata::one_to_one("owner", "owner_id", "Person").required()),
        )
        .with(
            EntityMetadata::new("Note", "note")
                .field(FieldMetadata::id("id", "id", "i64"))
                .field(FieldMetadata::basic("body", "body", "String")),
        )
}

pub fn compiler() -> QueryCompiler {
    QueryCompiler::new(Arc::new(catalog()), CompilerConfig::default())
}

pub fn basic_compiler() -> QueryCompiler {
    QueryCompiler::new(Arc::new(basic_catalog()), CompilerConfig::default())
}

/// Compile an object query against the full model with default hints.
pub fn compile(text: &str) -> CompileResult<Arc<CompiledQuery>> {
    compiler().compile(text, QueryLanguage::Object, &QueryHints::default())
}

pub fn compile_with(text: &str, hints: QueryHints) -> CompileResult<Arc<CompiledQuery>> {
    compiler().compile(text, QueryLanguage::Object, &hints)
}

/// Compiled SQL text against the people model.
pub fn people_sql(text: &str) -> String {
    let compiler = QueryCompiler::new(Arc::new(people_catalog()), CompilerConfig::default());
    match compiler.compile(text, QueryLanguage::Object, &QueryHints::default()) {
        Ok(compiled) => compiled.sql.clone(),
        Err(e) => panic!("{} failed to compile: {}", text, e),
    }
}

/// Compiled SQL text, panicking on rejection.
pub fn sql(text: &str) -> String {
    match compile(text) {
        Ok(compiled) => compiled.sql.clone(),
        Err(e) => panic!("{} failed to compile: {}", text, e),
    }
}
