//! DELETE pattern implementation

use super::{StatementPattern, register_target, table_ref};
use crate::ast::Statement;
use crate::compiled::StatementKind;
use crate::error::{CompileError, CompileResult};
use crate::transpiler::context::CompilationContext;
use crate::transpiler::rewrite::rewrite_expr;

/// DELETE statement pattern
pub struct DeletePattern;

impl StatementPattern for DeletePattern {
    fn id(&self) -> &'static str {
        "delete"
    }

    fn kind(&self) -> StatementKind {
        StatementKind::Delete
    }

    fn matches(&self, stmt: &Statement) -> bool {
        matches!(stmt, Statement::Delete(_))
    }

    fn rewrite(&self, stmt: &mut Statement, ctx: &mut CompilationContext<'_>) -> CompileResult<()> {
        let Statement::Delete(delete) = stmt else {
            return Err(CompileError::unsupported("expected DELETE"));
        };
        let root = register_target(ctx, &delete.target)?;
        delete.target = table_ref(ctx, root);
        if let Some(selection) = &mut delete.selection {
            rewrite_expr(ctx, selection)?;
        }
        Ok(())
    }
}
