//! SELECT compilation against the fixture model.

mod common;

use common::{basic_compiler, compile, compile_with, people_sql, sql};
use objql::compiled::{ResultMapping, ReturnType, Slot};
use objql::prelude::*;
use pretty_assertions::assert_eq;

#[test]
fn test_entity_select_by_id() {
    let compiled = basic_compiler()
        .compile(
            "select e from Employee e where e.id = :id",
            QueryLanguage::Object,
            &QueryHints::default(),
        )
        .unwrap();

    assert_eq!(
        compiled.sql,
        "SELECT t1.id AS \"c1-1\", t1.name AS \"c1-2\", t1.salary AS \"c1-3\", t2.id AS \"c1-4-1\", t2.name AS \"c1-4-2\" \
         FROM employee AS t1 INNER JOIN department AS t2 ON t1.dept_id = t2.id WHERE t1.id = ?"
    );
    assert_eq!(compiled.kind, StatementKind::Select);
    assert!(compiled.primary_key_lookup);
    assert_eq!(compiled.parameter_count(), 1);
    assert_eq!(compiled.parameters[0].name.as_deref(), Some("id"));
    assert_eq!(compiled.parameters[0].value_type, "i64");
    assert_eq!(
        compiled.return_types,
        vec![ReturnType {
            label: "c1".to_string(),
            class: "Employee".to_string(),
            array: false,
        }]
    );
    assert_eq!(compiled.root_entity.as_deref(), Some("Employee"));

    let ResultMapping::Entity(mapping) = &compiled.result_mappings[0] else {
        panic!("expected an entity mapping");
    };
    assert_eq!(mapping.table_alias, "t1");
    assert_eq!(mapping.labels(), vec!["c1-1", "c1-2", "c1-3", "c1-4-1", "c1-4-2"]);
    let Slot::Joined { field, mapping: department } = &mapping.slots[3] else {
        panic!("expected the department to be joined");
    };
    assert_eq!(field, "department");
    assert_eq!(department.entity, "Department");
    assert_eq!(department.slots[2], Slot::Collection {
        field: "employees".to_string()
    });
}

#[test]
fn test_key_lookup_needs_an_id_reference() {
    let hints = QueryHints::default();
    let compiler = basic_compiler();
    let tautology = compiler
        .compile("select e.name from Employee e where 1 = 1", QueryLanguage::Object, &hints)
        .unwrap();
    assert!(!tautology.primary_key_lookup);

    let by_id = compiler
        .compile("select e.name from Employee e where e.id = ?1 and 1 = 1", QueryLanguage::Object, &hints)
        .unwrap();
    assert!(by_id.primary_key_lookup);
}

#[test]
fn test_full_entity_expansion() {
    let compiled = compile("select e from Employee e").unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT t1.id AS \"c1-1\", t1.name AS \"c1-2\", t1.salary AS \"c1-3\", t2.id AS \"c1-4-1\", t2.name AS \"c1-4-2\", \
         t1.street AS \"c1-5-1\", t1.city AS \"c1-5-2\" FROM employee AS t1 INNER JOIN department AS t2 ON t1.dept_id = t2.id"
    );
    assert!(!compiled.primary_key_lookup);

    let ResultMapping::Entity(mapping) = &compiled.result_mappings[0] else {
        panic!("expected an entity mapping");
    };
    // Self reference is not expanded again.
    assert_eq!(mapping.slots[5], Slot::Lazy {
        field: "manager".to_string()
    });
    assert_eq!(mapping.slots[6], Slot::Collection {
        field: "projects".to_string()
    });
}

#[test]
fn test_fetch_hints() {
    let lazy = compile_with("select e from Employee e", QueryHints::new().relationships(FetchPolicy::Lazy)).unwrap();
    assert_eq!(
        lazy.sql,
        "SELECT t1.id AS \"c1-1\", t1.name AS \"c1-2\", t1.salary AS \"c1-3\", t1.street AS \"c1-5-1\", t1.city AS \"c1-5-2\" \
         FROM employee AS t1"
    );

    let ids_only = compile_with("select e from Employee e", QueryHints::new().columns(FetchPolicy::Lazy)).unwrap();
    assert_eq!(
        ids_only.sql,
        "SELECT t1.id AS \"c1-1\", t2.id AS \"c1-4-1\", t1.street AS \"c1-5-1\", t1.city AS \"c1-5-2\" \
         FROM employee AS t1 INNER JOIN department AS t2 ON t1.dept_id = t2.id"
    );
}

#[test]
fn test_expansion_reuses_explicit_join() {
    let compiled = compile("select e from Employee e join e.department d where d.name = :name").unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT t1.id AS \"c1-1\", t1.name AS \"c1-2\", t1.salary AS \"c1-3\", t2.id AS \"c1-4-1\", t2.name AS \"c1-4-2\", \
         t1.street AS \"c1-5-1\", t1.city AS \"c1-5-2\" FROM employee AS t1 INNER JOIN department AS t2 ON t1.dept_id = t2.id \
         WHERE t2.name = ?"
    );
    assert_eq!(compiled.parameters[0].value_type, "String");
    assert!(!compiled.primary_key_lookup);
}

#[test]
fn test_expansion_through_inverse_join() {
    let compiled = compile("select e from Department d join d.employees e").unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT t2.id AS \"c1-1\", t2.name AS \"c1-2\", t2.salary AS \"c1-3\", t1.id AS \"c1-4-1\", t1.name AS \"c1-4-2\", \
         t2.street AS \"c1-5-1\", t2.city AS \"c1-5-2\" FROM department AS t1 INNER JOIN employee AS t2 ON t1.id = t2.dept_id"
    );
}

#[test]
fn test_scalar_projection_and_aggregates() {
    let compiled = compile(
        "select d.name, count(e), avg(e.salary) from Employee e join e.department d \
         group by d.name having count(e) > :min order by d.name",
    )
    .unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT t2.name AS \"c1\", COUNT(t1.id) AS \"c2\", AVG(t1.salary) AS \"c3\" \
         FROM employee AS t1 INNER JOIN department AS t2 ON t1.dept_id = t2.id \
         GROUP BY t2.name HAVING COUNT(t1.id) > ? ORDER BY t2.name"
    );
    let classes: Vec<&str> = compiled.return_types.iter().map(|r| r.class.as_str()).collect();
    assert_eq!(classes, vec!["String", "i64", "f64"]);
    assert_eq!(compiled.parameters[0].value_type, "i64");
    assert!(
        compiled
            .result_mappings
            .iter()
            .all(|m| matches!(m, ResultMapping::Scalar { .. }))
    );
}

#[test]
fn test_order_by_select_alias() {
    assert_eq!(
        sql("select e.name as n from Employee e order by n desc"),
        "SELECT t1.name AS \"c1\" FROM employee AS t1 ORDER BY \"c1\" DESC"
    );
}

#[test]
fn test_implicit_navigation_joins() {
    // Optional relationship: LEFT JOIN.
    assert_eq!(
        sql("select e.name from Employee e where e.manager.name = :boss"),
        "SELECT t1.name AS \"c1\" FROM employee AS t1 LEFT JOIN employee AS t2 ON t1.manager_id = t2.id WHERE t2.name = ?"
    );
    // Required relationship: INNER JOIN, created once.
    assert_eq!(
        sql("select e.department.name from Employee e where e.department.name <> 'x'"),
        "SELECT t2.name AS \"c1\" FROM employee AS t1 INNER JOIN department AS t2 ON t1.dept_id = t2.id WHERE t2.name <> 'x'"
    );
}

#[test]
fn test_foreign_key_shortcut_avoids_join() {
    assert_eq!(
        sql("select e.name from Employee e where e.department.id = ?1"),
        "SELECT t1.name AS \"c1\" FROM employee AS t1 WHERE t1.dept_id = ?"
    );
}

#[test]
fn test_many_to_many_joins() {
    assert_eq!(
        sql("select p.title from Employee e join e.projects p where e.id = ?1"),
        "SELECT t3.title AS \"c1\" FROM employee AS t1 INNER JOIN employee_project AS t2 ON t2.employee_id = t1.id \
         INNER JOIN project AS t3 ON t3.id = t2.project_id WHERE t1.id = ?"
    );
    assert_eq!(
        sql("select e.name from Project p join p.members e"),
        "SELECT t3.name AS \"c1\" FROM project AS t1 INNER JOIN employee_project AS t2 ON t2.project_id = t1.id \
         INNER JOIN employee AS t3 ON t3.id = t2.employee_id"
    );
}

#[test]
fn test_entity_join_with_on() {
    assert_eq!(
        sql("select e.name, d.name from Employee e join Department d on e.department = d where d.name like :p"),
        "SELECT t1.name AS \"c1\", t2.name AS \"c2\" FROM employee AS t1 INNER JOIN department AS t2 ON t1.dept_id = t2.id \
         WHERE t2.name LIKE ?"
    );
}

#[test]
fn test_join_on_navigation_renders_first() {
    // The ON condition of `d` reads the manager join, which must precede it.
    assert_eq!(
        sql("select e.id from Employee e join Department d on d.name = e.manager.name"),
        "SELECT t1.id AS \"c1\" FROM employee AS t1 LEFT JOIN employee AS t3 ON t1.manager_id = t3.id \
         INNER JOIN department AS t2 ON t2.name = t3.name"
    );
    assert_eq!(
        sql("select d.name from Employee e join e.department d on d.name = e.manager.name"),
        "SELECT t2.name AS \"c1\" FROM employee AS t1 LEFT JOIN employee AS t3 ON t1.manager_id = t3.id \
         INNER JOIN department AS t2 ON t1.dept_id = t2.id AND t2.name = t3.name"
    );
}

#[test]
fn test_one_to_one_joins() {
    // Owning side: the foreign key lives on the source table.
    assert_eq!(
        people_sql("select p.doc_number from Passport p where p.owner.name = :name"),
        "SELECT t1.doc_number AS \"c1\" FROM passport AS t1 INNER JOIN person AS t2 ON t1.owner_id = t2.id WHERE t2.name = ?"
    );
    // Inverse side: the foreign key lives on the target table.
    assert_eq!(
        people_sql("select p.name from Person p where p.passport.doc_number = :doc"),
        "SELECT t1.name AS \"c1\" FROM person AS t1 LEFT JOIN passport AS t2 ON t1.id = t2.owner_id WHERE t2.doc_number = ?"
    );
}

#[test]
fn test_unidirectional_collection_join() {
    assert_eq!(
        people_sql("select n.body from Person p join p.notes n where p.id = ?1"),
        "SELECT t2.body AS \"c1\" FROM person AS t1 INNER JOIN note AS t2 ON t1.id = t2.person_id WHERE t1.id = ?"
    );
    assert_eq!(
        people_sql("select p.name from Person p left join p.notes n where n.body like :q"),
        "SELECT t1.name AS \"c1\" FROM person AS t1 LEFT JOIN note AS t2 ON t1.id = t2.person_id WHERE t2.body LIKE ?"
    );
}

#[test]
fn test_to_one_projection() {
    let compiled = compile("select e.department from Employee e").unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT t2.id AS \"c1-1\", t2.name AS \"c1-2\" FROM employee AS t1 INNER JOIN department AS t2 ON t1.dept_id = t2.id"
    );
    assert_eq!(compiled.return_types[0].class, "Department");
}

#[test]
fn test_embedded_projection() {
    let compiled = compile("select e.address from Employee e").unwrap();
    assert_eq!(compiled.sql, "SELECT t1.street AS \"c1-1\", t1.city AS \"c1-2\" FROM employee AS t1");
    assert_eq!(compiled.return_types[0].class, "Address");
    let ResultMapping::Embedded { class, slots } = &compiled.result_mappings[0] else {
        panic!("expected an embedded mapping");
    };
    assert_eq!(class, "Address");
    assert_eq!(slots.len(), 2);

    assert_eq!(
        sql("select e.address.city from Employee e where e.address.city = ?"),
        "SELECT t1.city AS \"c1\" FROM employee AS t1 WHERE t1.city = ?"
    );
}

#[test]
fn test_composite_key_entity() {
    let compiled = compile("select o from OrderLine o where o.id = :key").unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT t1.order_id AS \"c1-1-1\", t1.line_no AS \"c1-1-2\", t1.quantity AS \"c1-2\" \
         FROM order_line AS t1 WHERE (t1.order_id, t1.line_no) = (?, ?)"
    );
    assert!(compiled.primary_key_lookup);

    let ResultMapping::Entity(mapping) = &compiled.result_mappings[0] else {
        panic!("expected an entity mapping");
    };
    // No join is synthesized from a composite-key entity.
    assert_eq!(mapping.slots[2], Slot::Lazy {
        field: "product".to_string()
    });
}

#[test]
fn test_subqueries() {
    assert_eq!(
        sql("select e.name from Employee e where e.salary > (select avg(x.salary) from Employee x)"),
        "SELECT t1.name AS \"c1\" FROM employee AS t1 WHERE t1.salary > (SELECT AVG(t2.salary) FROM employee AS t2)"
    );
    assert_eq!(
        sql("select e.name from Employee e where e.department in (select d from Department d where d.name = :n)"),
        "SELECT t1.name AS \"c1\" FROM employee AS t1 WHERE t1.dept_id IN (SELECT t2.id FROM department AS t2 WHERE t2.name = ?)"
    );
}

#[test]
fn test_unqualified_names() {
    assert_eq!(
        sql("select name from Employee e where salary > 10"),
        "SELECT t1.name AS \"c1\" FROM employee AS t1 WHERE t1.salary > 10"
    );
}

#[test]
fn test_distinct_limit_offset() {
    let compiled = compile("select distinct e.name from Employee e order by e.name limit :max offset :skip").unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT DISTINCT t1.name AS \"c1\" FROM employee AS t1 ORDER BY t1.name LIMIT ? OFFSET ?"
    );
    let types: Vec<&str> = compiled.parameters.iter().map(|p| p.value_type.as_str()).collect();
    assert_eq!(types, vec!["i64", "i64"]);
}

#[test]
fn test_table_aliases_unique() {
    let compiled = compile("select e, m from Employee e join e.manager m where e.department.name = 'x'").unwrap();
    let mut aliases = Vec::new();
    for mapping in &compiled.result_mappings {
        if let ResultMapping::Entity(m) = mapping {
            aliases.push(m.table_alias.clone());
        }
    }
    assert_eq!(aliases, vec!["t1", "t2"]);
    for alias in ["t1", "t2", "t3"] {
        assert!(compiled.sql.contains(&format!(" AS {}", alias)), "{}", compiled.sql);
    }
    assert!(!compiled.sql.contains(" AS t5"));
}
