//! In-memory entity catalog
//!
//! Loads entity descriptors from TOML and validates them before they are
//! handed to the compiler.

use super::{EntityMetadata, FieldMetadata, MappingKind, MetadataRegistry};
use crate::error::CatalogError;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Catalog file layout.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    entities: Vec<EntityMetadata>,
}

/// Entity metadata keyed by entity name.
#[derive(Debug, Default, Clone)]
pub struct EntityCatalog {
    entities: HashMap<String, Arc<EntityMetadata>>,
}

impl EntityCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML catalog.
    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(content)?;
        let mut catalog = Self::new();
        for entity in file.entities {
            tracing::debug!("Loaded entity: {} -> {}", entity.name, entity.table);
            catalog.add(entity);
        }
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load and validate a TOML catalog from disk.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let catalog = Self::from_toml_str(&content)?;
        tracing::info!("Loaded {} entities from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// Add an entity, filling in default column names. Replaces any entity
    /// with the same name.
    pub fn add(&mut self, mut entity: EntityMetadata) {
        entity.normalize();
        self.entities.insert(entity.name.clone(), Arc::new(entity));
    }

    /// Builder form of [`EntityCatalog::add`].
    pub fn with(mut self, entity: EntityMetadata) -> Self {
        self.add(entity);
        self
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entity names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entities.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Check cross-entity consistency.
    pub fn validate(&self) -> Result<(), CatalogError> {
        for name in self.names() {
            let Some(entity) = self.entities.get(name) else {
                continue;
            };
            if entity.id_fields().next().is_none() {
                return Err(CatalogError::invalid(name, "no identifier field"));
            }
            let mut versions = entity.fields.iter().filter(|f| f.version);
            if let Some(version) = versions.next() {
                if version.mapping != MappingKind::Column || version.id {
                    return Err(CatalogError::invalid(
                        name,
                        format!("version field '{}' must be a plain column", version.name),
                    ));
                }
                if versions.next().is_some() {
                    return Err(CatalogError::invalid(name, "more than one version field"));
                }
            }
            for field in &entity.fields {
                self.validate_field(entity, field)?;
            }
        }
        Ok(())
    }

    fn validate_field(&self, entity: &EntityMetadata, field: &FieldMetadata) -> Result<(), CatalogError> {
        let invalid = |message: String| CatalogError::invalid(&entity.name, message);

        if field.is_embedded() {
            if field.fields.is_empty() {
                return Err(invalid(format!("embedded field '{}' has no components", field.name)));
            }
            for component in &field.fields {
                if component.mapping.is_relationship() {
                    return Err(invalid(format!(
                        "embedded field '{}' cannot contain relationship '{}'",
                        field.name, component.name
                    )));
                }
                self.validate_field(entity, component)?;
            }
            return Ok(());
        }

        if !field.mapping.is_relationship() {
            return Ok(());
        }

        let target_name = field
            .target
            .as_deref()
            .ok_or_else(|| invalid(format!("relationship '{}' has no target", field.name)))?;
        let target = self
            .entities
            .get(target_name)
            .ok_or_else(|| invalid(format!("relationship '{}' targets unknown entity '{}'", field.name, target_name)))?;

        if let Some(mapped_by) = &field.mapped_by {
            let owner = target.find_field(mapped_by).ok_or_else(|| {
                invalid(format!(
                    "'{}' is mapped by unknown field '{}.{}'",
                    field.name, target_name, mapped_by
                ))
            })?;
            let compatible = match field.mapping {
                MappingKind::OneToMany | MappingKind::OneToOne => owner.mapping.is_to_one() && owner.mapped_by.is_none(),
                MappingKind::ManyToMany => owner.mapping == MappingKind::ManyToMany && owner.join_table.is_some(),
                _ => false,
            };
            if !compatible {
                return Err(invalid(format!(
                    "'{}' cannot be mapped by '{}.{}'",
                    field.name, target_name, mapped_by
                )));
            }
        } else if field.mapping == MappingKind::ManyToMany && field.join_table.is_none() {
            return Err(invalid(format!("many-to-many '{}' declares no join table", field.name)));
        } else if field.mapping == MappingKind::OneToMany && field.column.is_empty() {
            return Err(invalid(format!(
                "one-to-many '{}' needs either mapped_by or a foreign key column",
                field.name
            )));
        }

        Ok(())
    }
}

impl MetadataRegistry for EntityCatalog {
    fn entity(&self, name: &str) -> Option<Arc<EntityMetadata>> {
        self.entities.get(name).cloned()
    }
}
