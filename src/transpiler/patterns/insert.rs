//! INSERT pattern implementation

use super::StatementPattern;
use crate::ast::Statement;
use crate::compiled::StatementKind;
use crate::error::{CompileError, CompileResult};
use crate::transpiler::context::CompilationContext;

/// INSERT has no object-query form; matching it only produces a precise
/// rejection.
pub struct InsertPattern;

impl StatementPattern for InsertPattern {
    fn id(&self) -> &'static str {
        "insert"
    }

    fn kind(&self) -> StatementKind {
        StatementKind::Other
    }

    fn matches(&self, stmt: &Statement) -> bool {
        matches!(stmt, Statement::Insert(_))
    }

    fn rewrite(&self, stmt: &mut Statement, _ctx: &mut CompilationContext<'_>) -> CompileResult<()> {
        if let Statement::Insert(insert) = stmt {
            tracing::debug!("Rejecting INSERT into {}", insert.table);
        }
        Err(CompileError::InsertNotSupported)
    }
}
