//! Entity metadata model.
//!
//! The compiler never inspects entity instances; everything it needs to
//! lower an object query comes from these descriptors, looked up through a
//! [`MetadataRegistry`].

mod catalog;

pub use catalog::EntityCatalog;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Value type reported when nothing more specific is known.
pub const OBJECT_TYPE: &str = "object";

/// Source of entity metadata, keyed by entity name.
pub trait MetadataRegistry: Send + Sync {
    /// Look up an entity by name.
    fn entity(&self, name: &str) -> Option<Arc<EntityMetadata>>;
}

/// When a field is loaded relative to its owning row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchPolicy {
    Eager,
    Lazy,
}

impl FromStr for FetchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eager" => Ok(Self::Eager),
            "lazy" => Ok(Self::Lazy),
            other => Err(format!("unknown fetch policy '{}'", other)),
        }
    }
}

impl fmt::Display for FetchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eager => write!(f, "eager"),
            Self::Lazy => write!(f, "lazy"),
        }
    }
}

/// How a field relates to storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MappingKind {
    #[default]
    Column,
    Embedded,
    OneToOne,
    ManyToOne,
    OneToMany,
    ManyToMany,
}

impl MappingKind {
    pub fn is_relationship(self) -> bool {
        !matches!(self, Self::Column | Self::Embedded)
    }

    pub fn is_to_one(self) -> bool {
        matches!(self, Self::OneToOne | Self::ManyToOne)
    }

    pub fn is_to_many(self) -> bool {
        matches!(self, Self::OneToMany | Self::ManyToMany)
    }

    /// Fetch policy applied when the mapping does not declare one.
    pub fn default_fetch(self) -> FetchPolicy {
        if self.is_to_many() {
            FetchPolicy::Lazy
        } else {
            FetchPolicy::Eager
        }
    }
}

/// Link table of a many-to-many relationship, described from the owning side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinTable {
    pub table: String,
    /// Column referencing the owning entity's id.
    pub join_column: String,
    /// Column referencing the target entity's id.
    pub inverse_join_column: String,
}

impl JoinTable {
    pub fn new(
        table: impl Into<String>,
        join_column: impl Into<String>,
        inverse_join_column: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            join_column: join_column.into(),
            inverse_join_column: inverse_join_column.into(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// A single mapped field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMetadata {
    pub name: String,
    /// Physical column. For owning to-one fields this is the foreign key;
    /// for unidirectional one-to-many fields, the foreign key on the target.
    #[serde(default)]
    pub column: String,
    #[serde(default)]
    pub mapping: MappingKind,
    #[serde(default)]
    pub fetch: Option<FetchPolicy>,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default)]
    pub id: bool,
    #[serde(default)]
    pub version: bool,
    /// Target entity of a relationship.
    #[serde(default)]
    pub target: Option<String>,
    /// Field on the target that owns a bidirectional relationship.
    #[serde(default)]
    pub mapped_by: Option<String>,
    #[serde(default, rename = "type")]
    pub value_type: Option<String>,
    #[serde(default)]
    pub join_table: Option<JoinTable>,
    /// Components of an embedded value.
    #[serde(default)]
    pub fields: Vec<FieldMetadata>,
}

impl FieldMetadata {
    fn new(name: impl Into<String>, mapping: MappingKind) -> Self {
        Self {
            name: name.into(),
            column: String::new(),
            mapping,
            fetch: None,
            nullable: true,
            id: false,
            version: false,
            target: None,
            mapped_by: None,
            value_type: None,
            join_table: None,
            fields: Vec::new(),
        }
    }

    /// A plain column.
    pub fn basic(name: impl Into<String>, column: impl Into<String>, value_type: impl Into<String>) -> Self {
        let mut field = Self::new(name, MappingKind::Column);
        field.column = column.into();
        field.value_type = Some(value_type.into());
        field
    }

    /// A single-column identifier.
    pub fn id(name: impl Into<String>, column: impl Into<String>, value_type: impl Into<String>) -> Self {
        let mut field = Self::basic(name, column, value_type);
        field.id = true;
        field.nullable = false;
        field
    }

    /// An embedded value flattened into the owner's row.
    pub fn embedded(name: impl Into<String>, value_type: impl Into<String>, fields: Vec<FieldMetadata>) -> Self {
        let mut field = Self::new(name, MappingKind::Embedded);
        field.value_type = Some(value_type.into());
        field.fields = fields;
        field
    }

    /// An embedded composite identifier.
    pub fn embedded_id(name: impl Into<String>, value_type: impl Into<String>, fields: Vec<FieldMetadata>) -> Self {
        let mut field = Self::embedded(name, value_type, fields);
        field.id = true;
        field.nullable = false;
        field
    }

    pub fn many_to_one(name: impl Into<String>, column: impl Into<String>, target: impl Into<String>) -> Self {
        let mut field = Self::new(name, MappingKind::ManyToOne);
        field.column = column.into();
        field.target = Some(target.into());
        field
    }

    pub fn one_to_one(name: impl Into<String>, column: impl Into<String>, target: impl Into<String>) -> Self {
        let mut field = Self::new(name, MappingKind::OneToOne);
        field.column = column.into();
        field.target = Some(target.into());
        field
    }

    /// Inverse one-to-one, owned by `mapped_by` on the target.
    pub fn one_to_one_inverse(name: impl Into<String>, target: impl Into<String>, mapped_by: impl Into<String>) -> Self {
        let mut field = Self::new(name, MappingKind::OneToOne);
        field.target = Some(target.into());
        field.mapped_by = Some(mapped_by.into());
        field
    }

    /// Bidirectional one-to-many, owned by `mapped_by` on the target.
    pub fn one_to_many(name: impl Into<String>, target: impl Into<String>, mapped_by: impl Into<String>) -> Self {
        let mut field = Self::new(name, MappingKind::OneToMany);
        field.target = Some(target.into());
        field.mapped_by = Some(mapped_by.into());
        field
    }

    /// Unidirectional one-to-many with the foreign key `column` on the target table.
    pub fn one_to_many_joined(name: impl Into<String>, target: impl Into<String>, column: impl Into<String>) -> Self {
        let mut field = Self::new(name, MappingKind::OneToMany);
        field.target = Some(target.into());
        field.column = column.into();
        field
    }

    pub fn many_to_many(name: impl Into<String>, target: impl Into<String>, join_table: JoinTable) -> Self {
        let mut field = Self::new(name, MappingKind::ManyToMany);
        field.target = Some(target.into());
        field.join_table = Some(join_table);
        field
    }

    pub fn many_to_many_inverse(name: impl Into<String>, target: impl Into<String>, mapped_by: impl Into<String>) -> Self {
        let mut field = Self::new(name, MappingKind::ManyToMany);
        field.target = Some(target.into());
        field.mapped_by = Some(mapped_by.into());
        field
    }

    pub fn lazy(mut self) -> Self {
        self.fetch = Some(FetchPolicy::Lazy);
        self
    }

    pub fn eager(mut self) -> Self {
        self.fetch = Some(FetchPolicy::Eager);
        self
    }

    /// Mark the column (or foreign key) as non-nullable.
    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn versioned(mut self) -> Self {
        self.version = true;
        self
    }

    /// Effective declared fetch policy.
    pub fn fetch_policy(&self) -> FetchPolicy {
        self.fetch.unwrap_or_else(|| self.mapping.default_fetch())
    }

    /// Declared value type; relationships report their target entity.
    pub fn value_type(&self) -> &str {
        if let Some(ty) = &self.value_type {
            return ty;
        }
        self.target.as_deref().unwrap_or(OBJECT_TYPE)
    }

    /// Array-like values are returned whole instead of as a multi-column row.
    pub fn is_array_type(&self) -> bool {
        is_array_type(self.value_type())
    }

    pub fn is_embedded(&self) -> bool {
        self.mapping == MappingKind::Embedded
    }

    /// Leaf columns of this field, paired with their dotted path relative to it.
    ///
    /// Plain fields yield themselves; embedded values yield every nested leaf.
    pub fn leaves(&self) -> Vec<(String, &FieldMetadata)> {
        let mut out = Vec::new();
        self.collect_leaves(None, &mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, prefix: Option<&str>, out: &mut Vec<(String, &'a FieldMetadata)>) {
        let path = match prefix {
            Some(p) => format!("{}.{}", p, self.name),
            None => self.name.clone(),
        };
        if self.is_embedded() {
            for field in &self.fields {
                field.collect_leaves(Some(&path), out);
            }
        } else {
            out.push((path, self));
        }
    }

    /// Component field of an embedded value.
    pub fn component(&self, name: &str) -> Option<&FieldMetadata> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn normalize(&mut self) {
        if self.column.is_empty() {
            match self.mapping {
                MappingKind::Column => self.column = self.name.clone(),
                MappingKind::ManyToOne | MappingKind::OneToOne if self.mapped_by.is_none() => {
                    self.column = format!("{}_id", self.name);
                }
                _ => {}
            }
        }
        for field in &mut self.fields {
            field.normalize();
        }
    }
}

/// Whether a declared value type denotes an array (including byte arrays).
pub fn is_array_type(value_type: &str) -> bool {
    let ty = value_type.trim();
    ty.ends_with("[]") || ty.starts_with('[') || matches!(ty, "Vec<u8>" | "bytes" | "blob")
}

/// A mapped entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMetadata {
    pub name: String,
    pub table: String,
    #[serde(default)]
    pub fields: Vec<FieldMetadata>,
}

impl EntityMetadata {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldMetadata) -> Self {
        self.fields.push(field);
        self
    }

    pub fn find_field(&self, name: &str) -> Option<&FieldMetadata> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Field (or embedded leaf) mapped to a physical column.
    pub fn find_column(&self, column: &str) -> Option<&FieldMetadata> {
        self.fields
            .iter()
            .flat_map(|f| f.leaves())
            .map(|(_, leaf)| leaf)
            .find(|leaf| leaf.column == column && !leaf.mapping.is_to_many())
    }

    pub fn id_fields(&self) -> impl Iterator<Item = &FieldMetadata> {
        self.fields.iter().filter(|f| f.id)
    }

    /// Optimistic-lock version column, if declared.
    pub fn version_field(&self) -> Option<&FieldMetadata> {
        self.fields.iter().find(|f| f.version)
    }

    /// Leaf columns of the identifier, in declaration order.
    pub fn id_columns(&self) -> Vec<(String, &FieldMetadata)> {
        self.id_fields().flat_map(|f| f.leaves()).collect()
    }

    /// The single id column, if the key is not composite.
    pub fn single_id_column(&self) -> Option<&FieldMetadata> {
        let columns = self.id_columns();
        match columns.as_slice() {
            [(_, field)] => Some(*field),
            _ => None,
        }
    }

    /// Identifier spans more than one column.
    pub fn has_composite_key(&self) -> bool {
        self.id_columns().len() > 1
    }

    pub(crate) fn normalize(&mut self) {
        for field in &mut self.fields {
            field.normalize();
        }
    }
}
