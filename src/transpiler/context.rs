//! Per-compilation state threaded through every rewriting step.

use super::params::ParameterTracker;
use super::registry::{AliasRegistry, InfoId};
use crate::compiled::{ResultMapping, ReturnType, StatementKind};
use crate::config::LabelSettings;
use crate::error::{CompileError, CompileResult};
use crate::hints::QueryHints;
use crate::metadata::{EntityMetadata, MetadataRegistry};
use std::sync::Arc;

/// Primary-key-only tracking for the root WHERE clause.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyTracker {
    active: bool,
    seen_id: bool,
    other: bool,
}

impl KeyTracker {
    pub fn start(&mut self) {
        self.active = true;
    }

    pub fn stop(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn note(&mut self, is_root_id: bool) {
        if !self.active {
            return;
        }
        if is_root_id {
            self.seen_id = true;
        } else {
            self.other = true;
        }
    }

    /// Only root id columns were referenced, and at least one was.
    ///
    /// A filter alone does not set the flag: `where 1 = 1` reads no id
    /// column, so it is not a key lookup.
    pub fn is_key_lookup(&self) -> bool {
        self.seen_id && !self.other
    }
}

pub struct CompilationContext<'a> {
    metadata: &'a dyn MetadataRegistry,
    pub hints: QueryHints,
    pub labels: &'a LabelSettings,
    pub statement: StatementKind,
    pub registry: AliasRegistry,
    pub params: ParameterTracker,
    pub keys: KeyTracker,
    pub return_types: Vec<ReturnType>,
    pub mappings: Vec<ResultMapping>,
    /// Entry receiving `t1`.
    pub root: Option<InfoId>,
}

impl<'a> CompilationContext<'a> {
    pub fn new(
        metadata: &'a dyn MetadataRegistry,
        hints: QueryHints,
        labels: &'a LabelSettings,
        statement: StatementKind,
    ) -> Self {
        Self {
            metadata,
            hints,
            labels,
            statement,
            registry: AliasRegistry::new(labels.table_alias_prefix.clone()),
            params: ParameterTracker::default(),
            keys: KeyTracker::default(),
            return_types: Vec::new(),
            mappings: Vec::new(),
            root: None,
        }
    }

    /// Look up entity metadata by name.
    pub fn entity(&self, name: &str) -> CompileResult<Arc<EntityMetadata>> {
        self.metadata
            .entity(name)
            .ok_or_else(|| CompileError::UnknownEntity(name.to_string()))
    }

    /// Label of the `n`th (1-based) select item.
    pub fn select_label(&self, n: usize) -> String {
        format!("{}{}", self.labels.prefix, n)
    }

    /// Joins may only be synthesized for SELECT, and inside subqueries of
    /// any statement.
    pub fn join_restriction(&self) -> Option<&'static str> {
        if self.registry.current_scope() != 0 {
            return None;
        }
        match self.statement {
            StatementKind::Update => Some("UPDATE"),
            StatementKind::Delete => Some("DELETE"),
            StatementKind::Select | StatementKind::Other => None,
        }
    }

    /// Record a column reference for primary-key-only detection.
    pub fn note_column(&mut self, info: InfoId, column: &str) {
        if !self.keys.is_active() {
            return;
        }
        let is_root_id = Some(info) == self.root
            && self
                .registry
                .get(info)
                .metadata
                .id_columns()
                .iter()
                .any(|(_, f)| f.column == column);
        self.keys.note(is_root_id);
    }
}
