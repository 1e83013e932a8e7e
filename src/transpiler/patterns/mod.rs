//! Statement patterns.
//!
//! Each pattern recognizes one statement shape and rewrites it in place
//! against the compilation context. The registry dispatches to the first
//! pattern that matches.

pub mod delete;
pub mod insert;
pub mod select;
pub mod update;

pub use delete::DeletePattern;
pub use insert::InsertPattern;
pub use select::SelectPattern;
pub use update::UpdatePattern;

use super::context::CompilationContext;
use super::registry::{InfoId, Origin};
use crate::ast::{Statement, TableRef};
use crate::compiled::StatementKind;
use crate::error::{CompileError, CompileResult};

/// A statement shape the compiler knows how to rewrite.
pub trait StatementPattern: Send + Sync {
    fn id(&self) -> &'static str;

    fn kind(&self) -> StatementKind;

    fn matches(&self, stmt: &Statement) -> bool;

    /// Rewrite `stmt` into its physical form.
    fn rewrite(&self, stmt: &mut Statement, ctx: &mut CompilationContext<'_>) -> CompileResult<()>;
}

/// Registry of statement patterns, consulted in registration order.
pub struct PatternRegistry {
    patterns: Vec<Box<dyn StatementPattern>>,
}

impl Default for PatternRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternRegistry {
    /// Create a registry with the built-in patterns.
    pub fn new() -> Self {
        let mut registry = Self { patterns: Vec::new() };
        registry.register(Box::new(SelectPattern));
        registry.register(Box::new(UpdatePattern));
        registry.register(Box::new(DeletePattern));
        registry.register(Box::new(InsertPattern));
        registry
    }

    pub fn register(&mut self, pattern: Box<dyn StatementPattern>) {
        self.patterns.push(pattern);
    }

    pub fn find_pattern(&self, stmt: &Statement) -> Option<&dyn StatementPattern> {
        self.patterns.iter().find(|p| p.matches(stmt)).map(|p| p.as_ref())
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Register the target entity of an UPDATE or DELETE as the root. The
/// alias defaults to the entity name.
pub(crate) fn register_target(ctx: &mut CompilationContext<'_>, target: &TableRef) -> CompileResult<InfoId> {
    let [name] = target.name.as_slice() else {
        return Err(CompileError::invalid_path(target.dotted_name(), "expected an entity name"));
    };
    let metadata = ctx.entity(name)?;
    let alias = target.alias.clone().unwrap_or_else(|| name.clone());
    let id = ctx.registry.register(alias, metadata, 0, Origin::Root)?;
    ctx.root = Some(id);
    Ok(id)
}

/// Physical table reference of a registered entry.
pub(crate) fn table_ref(ctx: &CompilationContext<'_>, id: InfoId) -> TableRef {
    let entry = ctx.registry.get(id);
    TableRef::new(&entry.metadata.table, Some(entry.table_alias.clone()))
}
