//! # objql
//!
//! > **Write queries against entities. Ship plain SQL.**
//!
//! objql compiles object queries, written against an entity model with
//! aliases, dotted navigation and whole-entity selection, into native SQL
//! plus the metadata an execution layer needs to bind parameters and
//! rebuild objects from the flat result rows.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use objql::prelude::*;
//! use std::sync::Arc;
//!
//! let catalog = EntityCatalog::load_from_file("entities.toml")?;
//! let compiler = QueryCompiler::new(Arc::new(catalog), CompilerConfig::default());
//!
//! let query = compiler.compile(
//!     "select e from Employee e where e.id = :id",
//!     QueryLanguage::Object,
//!     &QueryHints::default(),
//! )?;
//! // => SELECT t1.id AS "c1-1", t1.name AS "c1-2", ... FROM employee AS t1
//! //    INNER JOIN department AS t2 ON t1.dept_id = t2.id WHERE t1.id = ?
//! assert!(query.primary_key_lookup);
//! ```
//!
//! ## Pipeline
//!
//! | Stage      | Module                 | Output                        |
//! |------------|------------------------|-------------------------------|
//! | Parse      | [`parser`]             | closed statement tree         |
//! | Rewrite    | [`transpiler`]         | physical tree + context       |
//! | Render     | [`ast`]                | SQL text                      |
//! | Memoize    | [`cache`]              | shared [`CompiledQuery`]      |

pub mod ast;
pub mod cache;
pub mod compiled;
pub mod compiler;
pub mod config;
pub mod error;
pub mod hints;
pub mod metadata;
pub mod parser;
pub mod transpiler;

pub use compiled::{CompiledQuery, QueryLanguage, StatementKind};
pub use compiler::QueryCompiler;
pub use error::{CompileError, CompileResult, RejectionKind};

pub mod prelude {
    pub use crate::cache::{CacheKey, CacheStats, MemoryQueryCache, NoopQueryCache, QueryCache};
    pub use crate::compiled::*;
    pub use crate::compiler::QueryCompiler;
    pub use crate::config::{CompilerConfig, LabelSettings};
    pub use crate::error::*;
    pub use crate::hints::QueryHints;
    pub use crate::metadata::{EntityCatalog, EntityMetadata, FetchPolicy, FieldMetadata, MetadataRegistry};
}

/// Parse object-query text into a statement tree without rewriting it.
///
/// # Example
///
/// ```
/// use objql::parse;
///
/// let stmt = parse("select e from Employee e where e.id = ?1").unwrap();
/// assert!(matches!(stmt, objql::ast::Statement::Select(_)));
/// ```
pub fn parse(input: &str) -> CompileResult<ast::Statement> {
    parser::parse_statement(input)
}
