//! Alias/entity registry
//!
//! One entry per table reference introduced while compiling a query: FROM
//! roots, explicit joins, and joins synthesized by path navigation. Entries
//! are never removed; scopes only control which entries are visible.

use crate::ast::{Expr, JoinKind};
use crate::error::{CompileError, CompileResult};
use crate::metadata::EntityMetadata;
use std::sync::Arc;

/// Index of an entry in the registry.
pub type InfoId = usize;

/// Link table of a many-to-many join, rendered before the target join.
#[derive(Debug, Clone)]
pub struct LinkJoin {
    pub table: String,
    pub alias: String,
    pub condition: Expr,
}

#[derive(Debug, Clone)]
pub struct JoinInfo {
    /// Entry this join navigates from; `None` for explicit entity joins.
    pub parent: Option<InfoId>,
    /// Relationship field on the parent.
    pub field: Option<String>,
    /// Owning field on this entry's entity that maps the relationship back
    /// to the parent (the `mapped_by` of the navigated field).
    pub inverse_field: Option<String>,
    pub kind: JoinKind,
    pub condition: Expr,
    pub link: Option<LinkJoin>,
    /// Entries registered while rewriting an explicit ON condition. The
    /// ones that do not navigate from this join render before it.
    pub depends_on: Vec<InfoId>,
}

#[derive(Debug, Clone)]
pub enum Origin {
    Root,
    Join(JoinInfo),
}

#[derive(Debug, Clone)]
pub struct EntityInfo {
    /// Equivalent aliases. The first one is canonical: the declared alias
    /// for roots, the dotted navigation path for synthesized joins.
    pub aliases: Vec<String>,
    pub metadata: Arc<EntityMetadata>,
    pub table_alias: String,
    pub scope: usize,
    /// FROM item this entry renders under.
    pub group: usize,
    pub origin: Origin,
}

impl EntityInfo {
    pub fn canonical_alias(&self) -> &str {
        self.aliases.first().map(String::as_str).unwrap_or_default()
    }

    pub fn is_root(&self) -> bool {
        matches!(self.origin, Origin::Root)
    }

    /// Declared in FROM by the query author, as opposed to synthesized.
    pub fn is_declared(&self) -> bool {
        match &self.origin {
            Origin::Root => true,
            Origin::Join(join) => join.parent.is_none() || self.aliases.iter().any(|a| !a.contains('.')),
        }
    }

    pub fn join(&self) -> Option<&JoinInfo> {
        match &self.origin {
            Origin::Root => None,
            Origin::Join(join) => Some(join),
        }
    }
}

#[derive(Debug)]
pub struct AliasRegistry {
    entries: Vec<EntityInfo>,
    /// Active scope ids, innermost last.
    active: Vec<usize>,
    next_scope: usize,
    counter: usize,
    prefix: String,
}

impl AliasRegistry {
    pub fn new(table_alias_prefix: impl Into<String>) -> Self {
        Self {
            entries: Vec::new(),
            active: vec![0],
            next_scope: 1,
            counter: 0,
            prefix: table_alias_prefix.into(),
        }
    }

    /// Open a nested scope for a subquery.
    pub fn push_scope(&mut self) -> usize {
        let id = self.next_scope;
        self.next_scope += 1;
        self.active.push(id);
        id
    }

    pub fn pop_scope(&mut self) {
        if self.active.len() > 1 {
            self.active.pop();
        }
    }

    pub fn current_scope(&self) -> usize {
        self.active.last().copied().unwrap_or(0)
    }

    pub fn is_visible(&self, id: InfoId) -> bool {
        self.entries.get(id).is_some_and(|e| self.active.contains(&e.scope))
    }

    /// Allocate the next synthesized table alias.
    pub fn next_table_alias(&mut self) -> String {
        self.counter += 1;
        format!("{}{}", self.prefix, self.counter)
    }

    fn find_in_scope(&self, scope: usize, alias: &str) -> Option<InfoId> {
        self.entries
            .iter()
            .position(|e| e.scope == scope && e.aliases.iter().any(|a| a == alias))
    }

    /// Register a table reference in the current scope.
    pub fn register(
        &mut self,
        alias: impl Into<String>,
        metadata: Arc<EntityMetadata>,
        group: usize,
        origin: Origin,
    ) -> CompileResult<InfoId> {
        let table_alias = self.next_table_alias();
        self.register_with_table_alias(alias, metadata, table_alias, group, origin)
    }

    /// Register with an alias allocated by the caller (many-to-many joins
    /// allocate the link alias first).
    pub fn register_with_table_alias(
        &mut self,
        alias: impl Into<String>,
        metadata: Arc<EntityMetadata>,
        table_alias: String,
        group: usize,
        origin: Origin,
    ) -> CompileResult<InfoId> {
        let alias = alias.into();
        let scope = self.current_scope();
        if self.find_in_scope(scope, &alias).is_some() {
            return Err(CompileError::DuplicateAlias(alias));
        }
        self.entries.push(EntityInfo {
            aliases: vec![alias],
            metadata,
            table_alias,
            scope,
            group,
            origin,
        });
        Ok(self.entries.len() - 1)
    }

    /// Attach an equivalent alias to an existing entry.
    pub fn add_alias(&mut self, id: InfoId, alias: impl Into<String>) -> CompileResult<()> {
        let alias = alias.into();
        let Some(scope) = self.entries.get(id).map(|e| e.scope) else {
            return Err(CompileError::UnknownIdentifier(alias));
        };
        match self.find_in_scope(scope, &alias) {
            Some(existing) if existing == id => Ok(()),
            Some(_) => Err(CompileError::DuplicateAlias(alias)),
            None => {
                self.entries[id].aliases.push(alias);
                Ok(())
            }
        }
    }

    /// Exact match in the current scope only.
    pub fn find_path(&self, alias: &str) -> Option<InfoId> {
        self.find_in_scope(self.current_scope(), alias)
    }

    /// Look up an alias, innermost scope first. An exact match wins; otherwise
    /// a unique case-insensitive match in the nearest scope that has one.
    pub fn resolve_by_alias(&self, alias: &str) -> CompileResult<Option<InfoId>> {
        for scope in self.active.iter().rev() {
            if let Some(id) = self.find_in_scope(*scope, alias) {
                return Ok(Some(id));
            }
        }
        for scope in self.active.iter().rev() {
            let matches: Vec<InfoId> = self
                .entries
                .iter()
                .enumerate()
                .filter(|(_, e)| e.scope == *scope && e.aliases.iter().any(|a| a.eq_ignore_ascii_case(alias)))
                .map(|(id, _)| id)
                .collect();
            match matches.as_slice() {
                [] => continue,
                [id] => return Ok(Some(*id)),
                many => {
                    return Err(CompileError::Ambiguous {
                        expr: alias.to_string(),
                        candidates: many.len(),
                    });
                }
            }
        }
        Ok(None)
    }

    /// Visible entries of the given entity type.
    pub fn resolve_by_entity_type<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = InfoId> + 'a {
        self.entries
            .iter()
            .enumerate()
            .filter(move |(_, e)| e.metadata.name == entity && self.active.contains(&e.scope))
            .map(|(id, _)| id)
    }

    pub fn resolve_by_table_alias(&self, table_alias: &str) -> Option<InfoId> {
        self.entries.iter().position(|e| e.table_alias == table_alias)
    }

    pub fn get(&self, id: InfoId) -> &EntityInfo {
        &self.entries[id]
    }

    pub fn get_mut(&mut self, id: InfoId) -> &mut EntityInfo {
        &mut self.entries[id]
    }

    /// Entries of one scope in registration order.
    pub fn in_scope(&self, scope: usize) -> impl Iterator<Item = (InfoId, &EntityInfo)> {
        self.entries.iter().enumerate().filter(move |(_, e)| e.scope == scope)
    }

    /// Declared entries of the nearest scope (innermost first) that declares
    /// any entity having `field`.
    pub fn declared_with_field(&self, field: &str) -> Vec<InfoId> {
        for scope in self.active.iter().rev() {
            let found: Vec<InfoId> = self
                .in_scope(*scope)
                .filter(|(_, e)| e.is_declared() && e.metadata.find_field(field).is_some())
                .map(|(id, _)| id)
                .collect();
            if !found.is_empty() {
                return found;
            }
        }
        Vec::new()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
