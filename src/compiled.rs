//! The compiled artifact handed to the execution layer.

use serde::Serialize;

/// Kind of compiled statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatementKind {
    Select,
    Update,
    Delete,
    Other,
}

impl std::fmt::Display for StatementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatementKind::Select => write!(f, "SELECT"),
            StatementKind::Update => write!(f, "UPDATE"),
            StatementKind::Delete => write!(f, "DELETE"),
            StatementKind::Other => write!(f, "OTHER"),
        }
    }
}

/// Language of the query text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryLanguage {
    /// Entity-model queries, fully rewritten.
    Object,
    /// Native SQL; only placeholders are normalized.
    Native,
}

/// Leaf of an expanded composite parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterComponent {
    /// Composite type the caller binds as one value.
    pub class: String,
    /// Dotted field path of this leaf within the composite.
    pub path: String,
}

/// Unbound parameter template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryParameter {
    /// 1-based position of the `?` in the statement text.
    pub position: usize,
    /// Name of a `:name` parameter.
    pub name: Option<String>,
    /// Declared index of a `?N` / `$N` parameter.
    pub index: Option<u32>,
    pub value_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<ParameterComponent>,
}

/// Declared class of one top-level select item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReturnType {
    pub label: String,
    pub class: String,
    /// Array and byte-array values are returned whole.
    pub array: bool,
}

/// How a select item's labelled columns map back onto fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultMapping {
    Scalar { label: String },
    Embedded { class: String, slots: Vec<Slot> },
    Entity(EntityMapping),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityMapping {
    pub entity: String,
    pub table_alias: String,
    pub slots: Vec<Slot>,
}

impl EntityMapping {
    /// Every label read by this mapping, depth first.
    pub fn labels(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for slot in &self.slots {
            slot.collect_labels(&mut out);
        }
        out
    }
}

/// One field of an expanded entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Slot {
    Column { field: String, label: String },
    Embedded { field: String, slots: Vec<Slot> },
    Joined { field: String, mapping: EntityMapping },
    /// To-one relationship left unloaded.
    Lazy { field: String },
    /// To-many relationship, always fetched separately.
    Collection { field: String },
}

impl Slot {
    pub fn field(&self) -> &str {
        match self {
            Slot::Column { field, .. }
            | Slot::Embedded { field, .. }
            | Slot::Joined { field, .. }
            | Slot::Lazy { field }
            | Slot::Collection { field } => field,
        }
    }

    fn collect_labels<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Slot::Column { label, .. } => out.push(label),
            Slot::Embedded { slots, .. } => {
                for slot in slots {
                    slot.collect_labels(out);
                }
            }
            Slot::Joined { mapping, .. } => {
                for slot in &mapping.slots {
                    slot.collect_labels(out);
                }
            }
            Slot::Lazy { .. } | Slot::Collection { .. } => {}
        }
    }
}

/// Immutable result of compiling one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledQuery {
    pub sql: String,
    pub kind: StatementKind,
    pub language: QueryLanguage,
    pub parameters: Vec<QueryParameter>,
    pub return_types: Vec<ReturnType>,
    pub result_mappings: Vec<ResultMapping>,
    /// WHERE constrains only the root entity's identifier.
    pub primary_key_lookup: bool,
    pub root_entity: Option<String>,
}

impl CompiledQuery {
    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    /// Parameters are `:name` style.
    pub fn uses_named_parameters(&self) -> bool {
        self.parameters.first().is_some_and(|p| p.name.is_some())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_labels() {
        let mapping = EntityMapping {
            entity: "Employee".into(),
            table_alias: "t1".into(),
            slots: vec![
                Slot::Column {
                    field: "id".into(),
                    label: "c1-1".into(),
                },
                Slot::Joined {
                    field: "department".into(),
                    mapping: EntityMapping {
                        entity: "Department".into(),
                        table_alias: "t2".into(),
                        slots: vec![Slot::Column {
                            field: "id".into(),
                            label: "c1-2-1".into(),
                        }],
                    },
                },
                Slot::Collection { field: "projects".into() },
            ],
        };
        assert_eq!(mapping.labels(), vec!["c1-1", "c1-2-1"]);
        assert_eq!(mapping.slots[2].field(), "projects");
    }

    #[test]
    fn test_kind_json() {
        let json = serde_json::to_string(&StatementKind::Select).unwrap();
        assert_eq!(json, "\"SELECT\"");
    }
}
