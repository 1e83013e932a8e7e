//! Object query transpiler.
//!
//! Rewrites a parsed statement into its physical form in a single pass:
//! a [`patterns::StatementPattern`] drives the walk, threading one
//! [`CompilationContext`] through alias registration, join synthesis,
//! column expansion and parameter binding. Placeholders are numbered once
//! the tree is final, then the tree is rendered back to SQL.

pub mod columns;
pub mod context;
pub mod joins;
pub mod native;
pub mod params;
pub mod paths;
pub mod patterns;
pub mod registry;
pub mod rewrite;

pub use context::CompilationContext;
pub use native::transpile_native;
pub use patterns::{PatternRegistry, StatementPattern};

use crate::ast::Statement;
use crate::compiled::{CompiledQuery, QueryLanguage};
use crate::config::LabelSettings;
use crate::error::{CompileError, CompileResult};
use crate::hints::QueryHints;
use crate::metadata::MetadataRegistry;
use crate::parser::parse_statement;

/// Everything a compilation reads but does not own.
#[derive(Clone, Copy)]
pub struct Environment<'a> {
    pub metadata: &'a dyn MetadataRegistry,
    pub labels: &'a LabelSettings,
    pub patterns: &'a PatternRegistry,
}

/// Parse and rewrite object-query text.
pub fn transpile(text: &str, env: Environment<'_>, hints: QueryHints) -> CompileResult<CompiledQuery> {
    let mut stmt = parse_statement(text)?;
    transpile_statement(&mut stmt, env, hints)
}

/// Rewrite an already parsed statement in place and render it.
pub fn transpile_statement(
    stmt: &mut Statement,
    env: Environment<'_>,
    hints: QueryHints,
) -> CompileResult<CompiledQuery> {
    let pattern = env
        .patterns
        .find_pattern(stmt)
        .ok_or_else(|| CompileError::unsupported("statement"))?;
    let kind = pattern.kind();
    tracing::trace!("Rewriting with pattern '{}'", pattern.id());

    let mut ctx = CompilationContext::new(env.metadata, hints, env.labels, kind);
    pattern.rewrite(stmt, &mut ctx)?;

    let order = params::collect_slots(stmt)?;
    let parameters = ctx.params.finish(&order);
    let root_entity = ctx.root.map(|id| ctx.registry.get(id).metadata.name.clone());
    let primary_key_lookup = kind == crate::compiled::StatementKind::Select && ctx.keys.is_key_lookup();

    Ok(CompiledQuery {
        sql: stmt.to_string(),
        kind,
        language: QueryLanguage::Object,
        parameters,
        return_types: ctx.return_types,
        result_mappings: ctx.mappings,
        primary_key_lookup,
        root_entity,
    })
}
