use super::expr::Expr;
use super::fmt::{escape_identifier, quote_identifier};
use super::operators::JoinKind;

/// A statement of the object query language.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(Select),
    Update(Update),
    Delete(Delete),
    /// Recognized only so it can be rejected with a precise error.
    Insert(Insert),
}

/// Table or entity reference with an optional alias.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    /// Entity name, or a navigation path for joins (`e.department`).
    pub name: Vec<String>,
    pub alias: Option<String>,
}

impl TableRef {
    pub fn new(name: impl Into<String>, alias: Option<String>) -> Self {
        Self {
            name: vec![name.into()],
            alias,
        }
    }

    pub fn dotted_name(&self) -> String {
        self.name.join(".")
    }
}

impl std::fmt::Display for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", escape_identifier(&self.dotted_name()))?;
        if let Some(alias) = &self.alias {
            write!(f, " AS {}", escape_identifier(alias))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub relation: TableRef,
    pub on: Option<Expr>,
}

impl std::fmt::Display for Join {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.relation)?;
        if let Some(on) = &self.on {
            write!(f, " ON {}", on)?;
        }
        Ok(())
    }
}

/// One comma-separated FROM entry and its joins.
#[derive(Debug, Clone, PartialEq)]
pub struct FromItem {
    pub relation: TableRef,
    pub joins: Vec<Join>,
}

impl std::fmt::Display for FromItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.relation)?;
        for join in &self.joins {
            write!(f, " {}", join)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expr: Expr,
    pub alias: Option<String>,
}

impl std::fmt::Display for SelectItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.expr)?;
        if let Some(alias) = &self.alias {
            write!(f, " AS {}", quote_identifier(alias))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub expr: Expr,
    pub asc: Option<bool>,
    pub nulls_first: Option<bool>,
}

impl std::fmt::Display for OrderItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.expr)?;
        match self.asc {
            Some(true) => write!(f, " ASC")?,
            Some(false) => write!(f, " DESC")?,
            None => {}
        }
        match self.nulls_first {
            Some(true) => write!(f, " NULLS FIRST")?,
            Some(false) => write!(f, " NULLS LAST")?,
            None => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Select {
    pub distinct: bool,
    pub projection: Vec<SelectItem>,
    pub from: Vec<FromItem>,
    pub selection: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub order_by: Vec<OrderItem>,
    pub limit: Option<Expr>,
    pub offset: Option<Expr>,
}

fn join_display<T: std::fmt::Display>(items: &[T]) -> String {
    items.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

impl std::fmt::Display for Select {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SELECT ")?;
        if self.distinct {
            write!(f, "DISTINCT ")?;
        }
        write!(f, "{}", join_display(&self.projection))?;
        if !self.from.is_empty() {
            write!(f, " FROM {}", join_display(&self.from))?;
        }
        if let Some(selection) = &self.selection {
            write!(f, " WHERE {}", selection)?;
        }
        if !self.group_by.is_empty() {
            write!(f, " GROUP BY {}", join_display(&self.group_by))?;
        }
        if let Some(having) = &self.having {
            write!(f, " HAVING {}", having)?;
        }
        if !self.order_by.is_empty() {
            write!(f, " ORDER BY {}", join_display(&self.order_by))?;
        }
        if let Some(limit) = &self.limit {
            write!(f, " LIMIT {}", limit)?;
        }
        if let Some(offset) = &self.offset {
            write!(f, " OFFSET {}", offset)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Field path as written, a single physical column once rewritten.
    pub target: Vec<String>,
    pub value: Expr,
}

impl std::fmt::Display for Assignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} = {}", escape_identifier(&self.target.join(".")), self.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub target: TableRef,
    pub assignments: Vec<Assignment>,
    pub selection: Option<Expr>,
}

impl std::fmt::Display for Update {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UPDATE {} SET {}", self.target, join_display(&self.assignments))?;
        if let Some(selection) = &self.selection {
            write!(f, " WHERE {}", selection)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub target: TableRef,
    pub selection: Option<Expr>,
}

impl std::fmt::Display for Delete {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DELETE FROM {}", self.target)?;
        if let Some(selection) = &self.selection {
            write!(f, " WHERE {}", selection)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub table: String,
}

impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Statement::Select(s) => write!(f, "{}", s),
            Statement::Update(u) => write!(f, "{}", u),
            Statement::Delete(d) => write!(f, "{}", d),
            Statement::Insert(i) => write!(f, "INSERT INTO {}", i.table),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, Parameter};

    #[test]
    fn test_select_display() {
        let select = Select {
            projection: vec![SelectItem {
                expr: Expr::column("t1", "id"),
                alias: Some("c1-1".into()),
            }],
            from: vec![FromItem {
                relation: TableRef::new("employee", Some("t1".into())),
                joins: vec![Join {
                    kind: JoinKind::Inner,
                    relation: TableRef::new("department", Some("t2".into())),
                    on: Some(Expr::eq(Expr::column("t1", "dept_id"), Expr::column("t2", "id"))),
                }],
            }],
            selection: Some(Expr::binary(
                Expr::column("t1", "id"),
                BinaryOp::Eq,
                Expr::Parameter(Parameter::Bound(0)),
            )),
            limit: Some(Expr::Literal(crate::ast::Literal::Number("10".into()))),
            ..Default::default()
        };
        assert_eq!(
            select.to_string(),
            "SELECT t1.id AS \"c1-1\" FROM employee AS t1 INNER JOIN department AS t2 ON t1.dept_id = t2.id WHERE t1.id = ? LIMIT 10"
        );
    }

    #[test]
    fn test_update_display() {
        let update = Update {
            target: TableRef::new("employee", Some("t1".into())),
            assignments: vec![Assignment {
                target: vec!["salary".into()],
                value: Expr::Parameter(Parameter::Bound(0)),
            }],
            selection: None,
        };
        assert_eq!(update.to_string(), "UPDATE employee AS t1 SET salary = ?");
    }
}
