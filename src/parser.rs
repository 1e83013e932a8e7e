//! Object query parser.
//!
//! Parses query text with `sqlparser` and lowers the result into the closed
//! statement tree in [`crate::ast`]. Lowering is where SQL-only constructs
//! are rejected: anything without an object-query meaning fails with
//! [`CompileError::Unsupported`] naming the construct.

use sqlparser::ast as sql;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use crate::ast::*;
use crate::error::{CompileError, CompileResult};

/// Parse a single object query statement.
pub fn parse_statement(text: &str) -> CompileResult<Statement> {
    let dialect = GenericDialect {};
    let mut statements = Parser::parse_sql(&dialect, text)?;
    match statements.len() {
        0 => Err(CompileError::EmptyStatement),
        1 => lower_statement(statements.remove(0)),
        n => Err(CompileError::MultipleStatements(n)),
    }
}

/// Name of an enum variant from its `Debug` output.
fn variant_name<T: std::fmt::Debug>(value: &T) -> String {
    let debug = format!("{:?}", value);
    debug
        .split(['(', ' ', '{'])
        .next()
        .unwrap_or_default()
        .to_string()
}

fn unsupported<T>(construct: impl Into<String>) -> CompileResult<T> {
    Err(CompileError::unsupported(construct))
}

fn lower_statement(stmt: sql::Statement) -> CompileResult<Statement> {
    match stmt {
        sql::Statement::Query(query) => Ok(Statement::Select(lower_query(*query)?)),
        sql::Statement::Update(update) => lower_update(update).map(Statement::Update),
        sql::Statement::Delete(delete) => lower_delete(delete).map(Statement::Delete),
        sql::Statement::Insert(insert) => Ok(Statement::Insert(Insert {
            table: insert.table.to_string(),
        })),
        other => unsupported(format!("{} statement", variant_name(&other))),
    }
}

fn lower_query(query: sql::Query) -> CompileResult<Select> {
    if query.with.is_some() {
        return unsupported("WITH");
    }
    if query.fetch.is_some() {
        return unsupported("FETCH");
    }
    if !query.locks.is_empty() {
        return unsupported("locking clause");
    }
    if query.for_clause.is_some() {
        return unsupported("FOR clause");
    }

    let mut select = match *query.body {
        sql::SetExpr::Select(select) => lower_select(*select)?,
        sql::SetExpr::SetOperation { op, .. } => return unsupported(op.to_string()),
        sql::SetExpr::Query(_) => return unsupported("parenthesized query"),
        other => return unsupported(variant_name(&other)),
    };

    if let Some(order_by) = query.order_by {
        if order_by.interpolate.is_some() {
            return unsupported("INTERPOLATE");
        }
        match order_by.kind {
            sql::OrderByKind::Expressions(exprs) => {
                select.order_by = exprs.into_iter().map(lower_order_item).collect::<CompileResult<_>>()?;
            }
            sql::OrderByKind::All(_) => return unsupported("ORDER BY ALL"),
        }
    }

    match query.limit_clause {
        None => {}
        Some(sql::LimitClause::LimitOffset {
            limit,
            offset,
            limit_by,
        }) => {
            if !limit_by.is_empty() {
                return unsupported("LIMIT BY");
            }
            select.limit = limit.map(lower_expr).transpose()?;
            select.offset = offset.map(|o| lower_expr(o.value)).transpose()?;
        }
        Some(sql::LimitClause::OffsetCommaLimit { offset, limit }) => {
            select.limit = Some(lower_expr(limit)?);
            select.offset = Some(lower_expr(offset)?);
        }
    }

    Ok(select)
}

fn lower_order_item(item: sql::OrderByExpr) -> CompileResult<OrderItem> {
    if item.with_fill.is_some() {
        return unsupported("WITH FILL");
    }
    Ok(OrderItem {
        expr: lower_expr(item.expr)?,
        asc: item.options.asc,
        nulls_first: item.options.nulls_first,
    })
}

fn lower_select(select: sql::Select) -> CompileResult<Select> {
    if select.top.is_some() {
        return unsupported("TOP");
    }
    if select.into.is_some() {
        return unsupported("SELECT INTO");
    }
    if !select.lateral_views.is_empty() {
        return unsupported("LATERAL VIEW");
    }
    if select.prewhere.is_some() {
        return unsupported("PREWHERE");
    }
    if select.connect_by.iter().next().is_some() {
        return unsupported("CONNECT BY");
    }
    if !select.named_window.is_empty() {
        return unsupported("WINDOW");
    }
    if select.qualify.is_some() {
        return unsupported("QUALIFY");
    }
    if !select.cluster_by.is_empty() || !select.distribute_by.is_empty() || !select.sort_by.is_empty() {
        return unsupported("CLUSTER/DISTRIBUTE/SORT BY");
    }

    let distinct = match select.distinct {
        None => false,
        Some(sql::Distinct::Distinct) => true,
        Some(sql::Distinct::On(_)) => return unsupported("DISTINCT ON"),
        #[allow(unreachable_patterns)]
        Some(_) => false,
    };

    let projection = select
        .projection
        .into_iter()
        .map(lower_select_item)
        .collect::<CompileResult<Vec<_>>>()?;

    let from = select
        .from
        .into_iter()
        .map(lower_from_item)
        .collect::<CompileResult<Vec<_>>>()?;

    let group_by = match select.group_by {
        sql::GroupByExpr::All(_) => return unsupported("GROUP BY ALL"),
        sql::GroupByExpr::Expressions(exprs, modifiers) => {
            if !modifiers.is_empty() {
                return unsupported("GROUP BY modifier");
            }
            exprs.into_iter().map(lower_expr).collect::<CompileResult<Vec<_>>>()?
        }
    };

    Ok(Select {
        distinct,
        projection,
        from,
        selection: select.selection.map(lower_expr).transpose()?,
        group_by,
        having: select.having.map(lower_expr).transpose()?,
        order_by: Vec::new(),
        limit: None,
        offset: None,
    })
}

fn lower_select_item(item: sql::SelectItem) -> CompileResult<SelectItem> {
    match item {
        sql::SelectItem::UnnamedExpr(expr) => Ok(SelectItem {
            expr: lower_expr(expr)?,
            alias: None,
        }),
        sql::SelectItem::ExprWithAlias { expr, alias } => Ok(SelectItem {
            expr: lower_expr(expr)?,
            alias: Some(alias.value),
        }),
        sql::SelectItem::Wildcard(_) | sql::SelectItem::QualifiedWildcard(..) => unsupported("SELECT *"),
    }
}

fn lower_object_name(name: sql::ObjectName) -> CompileResult<Vec<String>> {
    name.0
        .into_iter()
        .map(|part| match part {
            sql::ObjectNamePart::Identifier(ident) => Ok(ident.value),
            #[allow(unreachable_patterns)]
            other => unsupported(other.to_string()),
        })
        .collect()
}

fn lower_table_factor(factor: sql::TableFactor) -> CompileResult<TableRef> {
    match factor {
        sql::TableFactor::Table { name, alias, args, .. } => {
            if args.is_some() {
                return unsupported("table-valued function");
            }
            let alias = match alias {
                Some(alias) if !alias.columns.is_empty() => return unsupported("column alias list"),
                Some(alias) => Some(alias.name.value),
                None => None,
            };
            Ok(TableRef {
                name: lower_object_name(name)?,
                alias,
            })
        }
        sql::TableFactor::Derived { .. } => unsupported("derived table"),
        sql::TableFactor::Function { .. } | sql::TableFactor::TableFunction { .. } => {
            unsupported("table-valued function")
        }
        other => unsupported(variant_name(&other)),
    }
}

fn lower_from_item(item: sql::TableWithJoins) -> CompileResult<FromItem> {
    Ok(FromItem {
        relation: lower_table_factor(item.relation)?,
        joins: item.joins.into_iter().map(lower_join).collect::<CompileResult<_>>()?,
    })
}

fn lower_join(join: sql::Join) -> CompileResult<Join> {
    let (kind, constraint) = match join.join_operator {
        sql::JoinOperator::Join(c) | sql::JoinOperator::Inner(c) => (JoinKind::Inner, c),
        sql::JoinOperator::Left(c) | sql::JoinOperator::LeftOuter(c) => (JoinKind::Left, c),
        other => return unsupported(format!("{} join", variant_name(&other))),
    };
    let on = match constraint {
        sql::JoinConstraint::On(expr) => Some(lower_expr(expr)?),
        sql::JoinConstraint::None => None,
        sql::JoinConstraint::Using(_) => return unsupported("JOIN USING"),
        sql::JoinConstraint::Natural => return unsupported("NATURAL join"),
    };
    Ok(Join {
        kind,
        relation: lower_table_factor(join.relation)?,
        on,
    })
}

fn lower_update(update: sql::Update) -> CompileResult<Update> {
    if update.from.is_some() {
        return unsupported("UPDATE ... FROM");
    }
    if update.returning.is_some() {
        return unsupported("RETURNING");
    }
    if !update.table.joins.is_empty() {
        return Err(CompileError::JoinNotAllowed(update.table.to_string(), "UPDATE"));
    }

    let assignments = update
        .assignments
        .into_iter()
        .map(|a| {
            let target = match a.target {
                sql::AssignmentTarget::ColumnName(name) => lower_object_name(name)?,
                sql::AssignmentTarget::Tuple(_) => return unsupported("tuple assignment"),
            };
            Ok(Assignment {
                target,
                value: lower_expr(a.value)?,
            })
        })
        .collect::<CompileResult<Vec<_>>>()?;

    Ok(Update {
        target: lower_table_factor(update.table.relation)?,
        assignments,
        selection: update.selection.map(lower_expr).transpose()?,
    })
}

fn lower_delete(delete: sql::Delete) -> CompileResult<Delete> {
    if !delete.tables.is_empty() || delete.using.is_some() {
        return unsupported("multi-table DELETE");
    }
    if delete.returning.is_some() {
        return unsupported("RETURNING");
    }
    if !delete.order_by.is_empty() || delete.limit.is_some() {
        return unsupported("DELETE with ORDER BY/LIMIT");
    }

    let mut tables = match delete.from {
        sql::FromTable::WithFromKeyword(tables) | sql::FromTable::WithoutKeyword(tables) => tables,
    };
    if tables.len() != 1 {
        return unsupported("multi-table DELETE");
    }
    let table = tables.remove(0);
    if !table.joins.is_empty() {
        return Err(CompileError::JoinNotAllowed(table.to_string(), "DELETE"));
    }

    Ok(Delete {
        target: lower_table_factor(table.relation)?,
        selection: delete.selection.map(lower_expr).transpose()?,
    })
}

fn lower_binary_op(op: sql::BinaryOperator) -> CompileResult<BinaryOp> {
    Ok(match op {
        sql::BinaryOperator::Plus => BinaryOp::Plus,
        sql::BinaryOperator::Minus => BinaryOp::Minus,
        sql::BinaryOperator::Multiply => BinaryOp::Multiply,
        sql::BinaryOperator::Divide => BinaryOp::Divide,
        sql::BinaryOperator::Modulo => BinaryOp::Modulo,
        sql::BinaryOperator::StringConcat => BinaryOp::Concat,
        sql::BinaryOperator::Eq => BinaryOp::Eq,
        sql::BinaryOperator::NotEq => BinaryOp::NotEq,
        sql::BinaryOperator::Lt => BinaryOp::Lt,
        sql::BinaryOperator::LtEq => BinaryOp::LtEq,
        sql::BinaryOperator::Gt => BinaryOp::Gt,
        sql::BinaryOperator::GtEq => BinaryOp::GtEq,
        sql::BinaryOperator::And => BinaryOp::And,
        sql::BinaryOperator::Or => BinaryOp::Or,
        other => return unsupported(format!("operator {}", other)),
    })
}

/// Classify a placeholder token (`?`, `?1`, `$1`, `:name`).
pub(crate) fn parse_placeholder(token: &str) -> CompileResult<Parameter> {
    let invalid = || CompileError::unsupported(format!("placeholder {}", token));
    if let Some(rest) = token.strip_prefix('?').or_else(|| token.strip_prefix('$')) {
        if rest.is_empty() && token.starts_with('?') {
            return Ok(Parameter::Positional(None));
        }
        return rest
            .parse::<u32>()
            .map(|n| Parameter::Positional(Some(n)))
            .map_err(|_| invalid());
    }
    if let Some(name) = token.strip_prefix(':') {
        if !name.is_empty() {
            return Ok(Parameter::Named(name.to_string()));
        }
    }
    Err(invalid())
}

fn lower_value(value: sql::Value) -> CompileResult<Expr> {
    Ok(match value {
        sql::Value::Number(n, _) => Expr::Literal(Literal::Number(n.to_string())),
        sql::Value::SingleQuotedString(s) => Expr::Literal(Literal::String(s)),
        sql::Value::Boolean(b) => Expr::Literal(Literal::Boolean(b)),
        sql::Value::Null => Expr::Literal(Literal::Null),
        sql::Value::Placeholder(p) => Expr::Parameter(parse_placeholder(&p)?),
        other => return unsupported(format!("literal {}", other)),
    })
}

fn lower_function(func: sql::Function) -> CompileResult<Expr> {
    if func.over.is_some() {
        return unsupported("window function (OVER)");
    }
    if func.filter.is_some() {
        return unsupported("FILTER");
    }
    if !func.within_group.is_empty() {
        return unsupported("WITHIN GROUP");
    }
    if func.null_treatment.is_some() {
        return unsupported("IGNORE/RESPECT NULLS");
    }
    if !matches!(func.parameters, sql::FunctionArguments::None) {
        return unsupported("parametric function");
    }

    let name = lower_object_name(func.name)?.join(".").to_uppercase();
    let args = match func.args {
        sql::FunctionArguments::None => FunctionArgs::None,
        sql::FunctionArguments::Subquery(_) => return unsupported("subquery function argument"),
        sql::FunctionArguments::List(list) => {
            if !list.clauses.is_empty() {
                return unsupported("function argument clause");
            }
            let distinct = matches!(list.duplicate_treatment, Some(sql::DuplicateTreatment::Distinct));
            let mut args = Vec::with_capacity(list.args.len());
            let count = list.args.len();
            for arg in list.args {
                match arg {
                    sql::FunctionArg::Unnamed(sql::FunctionArgExpr::Expr(expr)) => args.push(lower_expr(expr)?),
                    sql::FunctionArg::Unnamed(sql::FunctionArgExpr::Wildcard) if count == 1 && !distinct => {
                        return Ok(Expr::Function {
                            name,
                            args: FunctionArgs::Star,
                        });
                    }
                    sql::FunctionArg::Unnamed(_) => return unsupported("wildcard function argument"),
                    _ => return unsupported("named function argument"),
                }
            }
            FunctionArgs::List { distinct, args }
        }
    };
    Ok(Expr::Function { name, args })
}

fn boxed(expr: sql::Expr) -> CompileResult<Box<Expr>> {
    lower_expr(expr).map(Box::new)
}

fn lower_subquery(query: sql::Query) -> CompileResult<Box<Select>> {
    lower_query(query).map(Box::new)
}

/// Lower an expression, rejecting SQL-only forms.
pub(crate) fn lower_expr(expr: sql::Expr) -> CompileResult<Expr> {
    Ok(match expr {
        sql::Expr::Identifier(ident) => Expr::Path(vec![ident.value]),
        sql::Expr::CompoundIdentifier(parts) => Expr::Path(parts.into_iter().map(|i| i.value).collect()),
        sql::Expr::Value(v) => lower_value(v.value)?,
        sql::Expr::BinaryOp { left, op, right } => Expr::Binary {
            left: boxed(*left)?,
            op: lower_binary_op(op)?,
            right: boxed(*right)?,
        },
        sql::Expr::UnaryOp { op, expr } => {
            let op = match op {
                sql::UnaryOperator::Not => UnaryOp::Not,
                sql::UnaryOperator::Plus => UnaryOp::Plus,
                sql::UnaryOperator::Minus => UnaryOp::Minus,
                other => return unsupported(format!("operator {}", other)),
            };
            Expr::Unary {
                op,
                expr: boxed(*expr)?,
            }
        }
        sql::Expr::Nested(inner) => Expr::Nested(boxed(*inner)?),
        sql::Expr::IsNull(inner) => Expr::IsNull {
            expr: boxed(*inner)?,
            negated: false,
        },
        sql::Expr::IsNotNull(inner) => Expr::IsNull {
            expr: boxed(*inner)?,
            negated: true,
        },
        sql::Expr::Between {
            expr,
            negated,
            low,
            high,
        } => Expr::Between {
            expr: boxed(*expr)?,
            low: boxed(*low)?,
            high: boxed(*high)?,
            negated,
        },
        sql::Expr::InList { expr, list, negated } => Expr::InList {
            expr: boxed(*expr)?,
            list: list.into_iter().map(lower_expr).collect::<CompileResult<_>>()?,
            negated,
        },
        sql::Expr::InSubquery {
            expr,
            subquery,
            negated,
        } => Expr::InSubquery {
            expr: boxed(*expr)?,
            subquery: lower_subquery(*subquery)?,
            negated,
        },
        sql::Expr::Like {
            negated,
            any,
            expr,
            pattern,
            escape_char,
            ..
        } => {
            if any || escape_char.is_some() {
                return unsupported("LIKE ANY/ESCAPE");
            }
            Expr::Like {
                expr: boxed(*expr)?,
                pattern: boxed(*pattern)?,
                negated,
            }
        }
        sql::Expr::Function(func) => lower_function(func)?,
        sql::Expr::Case {
            operand,
            conditions,
            else_result,
            ..
        } => Expr::Case {
            operand: operand.map(|o| boxed(*o)).transpose()?,
            branches: conditions
                .into_iter()
                .map(|w| {
                    Ok(CaseBranch {
                        condition: lower_expr(w.condition)?,
                        result: lower_expr(w.result)?,
                    })
                })
                .collect::<CompileResult<_>>()?,
            else_result: else_result.map(|e| boxed(*e)).transpose()?,
        },
        sql::Expr::Subquery(query) => Expr::Subquery(lower_subquery(*query)?),
        sql::Expr::Exists { subquery, negated } => Expr::Exists {
            subquery: lower_subquery(*subquery)?,
            negated,
        },
        sql::Expr::Tuple(items) => Expr::Tuple(items.into_iter().map(lower_expr).collect::<CompileResult<_>>()?),
        sql::Expr::Substring {
            expr,
            substring_from,
            substring_for,
            ..
        } => {
            let mut args = vec![lower_expr(*expr)?];
            if let Some(from) = substring_from {
                args.push(lower_expr(*from)?);
            }
            if let Some(len) = substring_for {
                args.push(lower_expr(*len)?);
            }
            Expr::Function {
                name: "SUBSTRING".to_string(),
                args: FunctionArgs::List { distinct: false, args },
            }
        }
        sql::Expr::Trim {
            expr,
            trim_where,
            trim_what,
            ..
        } => {
            if trim_where.is_some() || trim_what.is_some() {
                return unsupported("TRIM with qualifiers");
            }
            Expr::Function {
                name: "TRIM".to_string(),
                args: FunctionArgs::List {
                    distinct: false,
                    args: vec![lower_expr(*expr)?],
                },
            }
        }
        other => return unsupported(variant_name(&other)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select(text: &str) -> Select {
        match parse_statement(text).unwrap() {
            Statement::Select(s) => s,
            other => panic!("expected select, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_entity_select() {
        let s = select("select e from Employee e where e.id = ?1");
        assert_eq!(s.projection[0].expr, Expr::path(["e"]));
        assert_eq!(s.from[0].relation.name, vec!["Employee"]);
        assert_eq!(s.from[0].relation.alias.as_deref(), Some("e"));
        assert_eq!(
            s.selection,
            Some(Expr::eq(
                Expr::path(["e", "id"]),
                Expr::Parameter(Parameter::Positional(Some(1)))
            ))
        );
    }

    #[test]
    fn test_parse_navigation_join() {
        let s = select("select d from Employee e left join e.department d order by e.name desc");
        let join = &s.from[0].joins[0];
        assert_eq!(join.kind, JoinKind::Left);
        assert_eq!(join.relation.name, vec!["e", "department"]);
        assert_eq!(join.relation.alias.as_deref(), Some("d"));
        assert_eq!(s.order_by[0].asc, Some(false));
    }

    #[test]
    fn test_parse_named_parameter() {
        let s = select("select e from Employee e where e.name = :name");
        let Some(Expr::Binary { right, .. }) = s.selection else {
            panic!("expected comparison");
        };
        assert_eq!(*right, Expr::Parameter(Parameter::Named("name".into())));
    }

    #[test]
    fn test_parse_placeholder() {
        assert_eq!(parse_placeholder("?").unwrap(), Parameter::Positional(None));
        assert_eq!(parse_placeholder("?3").unwrap(), Parameter::Positional(Some(3)));
        assert_eq!(parse_placeholder("$2").unwrap(), Parameter::Positional(Some(2)));
        assert_eq!(parse_placeholder(":id").unwrap(), Parameter::Named("id".into()));
        assert!(parse_placeholder("$").is_err());
    }

    #[test]
    fn test_insert_is_recognized() {
        let stmt = parse_statement("insert into Employee (name) values ('x')").unwrap();
        assert!(matches!(stmt, Statement::Insert(_)));
    }

    #[test]
    fn test_rejects_sql_only_constructs() {
        let cases = [
            "select * from Employee e",
            "select e from Employee e union select e from Employee e",
            "select row_number() over () from Employee e",
            "with x as (select e from Employee e) select x from x",
            "select e from Employee e cross join Department d",
            "select e from Employee e natural join Department d",
            "select e from (select e from Employee e) e",
        ];
        for text in cases {
            let err = parse_statement(text).unwrap_err();
            assert!(matches!(err, CompileError::Unsupported(_)), "{}: {:?}", text, err);
        }
    }

    #[test]
    fn test_rejects_ddl() {
        let err = parse_statement("create table t (id int)").unwrap_err();
        assert!(matches!(err, CompileError::Unsupported(_)));
    }

    #[test]
    fn test_syntax_error() {
        let err = parse_statement("select e from").unwrap_err();
        assert_eq!(err.kind(), crate::error::RejectionKind::Syntax);
        assert!(matches!(parse_statement("").unwrap_err(), CompileError::EmptyStatement));
        assert!(matches!(
            parse_statement("select 1; select 2").unwrap_err(),
            CompileError::MultipleStatements(2)
        ));
    }
}
