use super::fmt::{escape_identifier, quote_identifier, quote_string};
use super::operators::{BinaryOp, UnaryOp};
use super::stmt::Select;

/// Physical column reference produced by path resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    /// Synthesized table alias (`t1`), absent in UPDATE/DELETE assignments.
    pub qualifier: Option<String>,
    pub column: String,
}

impl ColumnRef {
    pub fn new(qualifier: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            qualifier: Some(qualifier.into()),
            column: column.into(),
        }
    }

    pub fn bare(column: impl Into<String>) -> Self {
        Self {
            qualifier: None,
            column: column.into(),
        }
    }
}

impl std::fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{}.{}", escape_identifier(q), escape_identifier(&self.column)),
            None => write!(f, "{}", escape_identifier(&self.column)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Numeric literal, kept as written.
    Number(String),
    String(String),
    Boolean(bool),
    Null,
}

impl Literal {
    /// Declared class of the literal.
    pub fn class(&self) -> &'static str {
        match self {
            Literal::Number(n) if n.contains(['.', 'e', 'E']) => "f64",
            Literal::Number(_) => "i64",
            Literal::String(_) => "String",
            Literal::Boolean(_) => "bool",
            Literal::Null => crate::metadata::OBJECT_TYPE,
        }
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Number(n) => write!(f, "{}", n),
            Literal::String(s) => write!(f, "{}", quote_string(s)),
            Literal::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Literal::Null => write!(f, "NULL"),
        }
    }
}

/// Query parameter placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parameter {
    /// `?`, `?N` or `$N`.
    Positional(Option<u32>),
    /// `:name`
    Named(String),
    /// Placeholder registered with the compilation context.
    Bound(usize),
}

impl std::fmt::Display for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Parameter::Positional(Some(n)) => write!(f, "?{}", n),
            Parameter::Positional(None) | Parameter::Bound(_) => write!(f, "?"),
            Parameter::Named(name) => write!(f, ":{}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionArgs {
    /// `CURRENT_DATE`
    None,
    /// `COUNT(*)`
    Star,
    List { distinct: bool, args: Vec<Expr> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseBranch {
    pub condition: Expr,
    pub result: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Unresolved dotted path (`e.department.name`).
    Path(Vec<String>),
    Column(ColumnRef),
    Literal(Literal),
    Parameter(Parameter),
    /// Reference to a select label.
    Label(String),
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    /// Parenthesized expression.
    Nested(Box<Expr>),
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    InSubquery {
        expr: Box<Expr>,
        subquery: Box<Select>,
        negated: bool,
    },
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        negated: bool,
    },
    Function {
        name: String,
        args: FunctionArgs,
    },
    Case {
        operand: Option<Box<Expr>>,
        branches: Vec<CaseBranch>,
        else_result: Option<Box<Expr>>,
    },
    Subquery(Box<Select>),
    Exists {
        subquery: Box<Select>,
        negated: bool,
    },
    Tuple(Vec<Expr>),
}

impl Expr {
    pub fn path<S: Into<String>>(segments: impl IntoIterator<Item = S>) -> Self {
        Expr::Path(segments.into_iter().map(Into::into).collect())
    }

    pub fn column(qualifier: impl Into<String>, column: impl Into<String>) -> Self {
        Expr::Column(ColumnRef::new(qualifier, column))
    }

    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// `left = right`
    pub fn eq(left: Expr, right: Expr) -> Self {
        Self::binary(left, BinaryOp::Eq, right)
    }

    /// Conjunction, parenthesizing OR operands so precedence survives.
    pub fn and(left: Expr, right: Expr) -> Self {
        Self::binary(left.parenthesize_or(), BinaryOp::And, right.parenthesize_or())
    }

    fn parenthesize_or(self) -> Self {
        match self {
            Expr::Binary { op: BinaryOp::Or, .. } => Expr::Nested(Box::new(self)),
            other => other,
        }
    }

    pub fn is_parameter(&self) -> bool {
        matches!(self, Expr::Parameter(_))
    }
}

fn write_list(f: &mut std::fmt::Formatter<'_>, items: &[Expr]) -> std::fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Path(segments) => write!(f, "{}", segments.join(".")),
            Expr::Column(col) => write!(f, "{}", col),
            Expr::Literal(lit) => write!(f, "{}", lit),
            Expr::Parameter(p) => write!(f, "{}", p),
            Expr::Label(label) => write!(f, "{}", quote_identifier(label)),
            Expr::Binary { left, op, right } => write!(f, "{} {} {}", left, op, right),
            Expr::Unary { op, expr } => write!(f, "{}{}", op, expr),
            Expr::Nested(expr) => write!(f, "({})", expr),
            Expr::IsNull { expr, negated } => {
                write!(f, "{} IS {}NULL", expr, if *negated { "NOT " } else { "" })
            }
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => write!(
                f,
                "{} {}BETWEEN {} AND {}",
                expr,
                if *negated { "NOT " } else { "" },
                low,
                high
            ),
            Expr::InList { expr, list, negated } => {
                write!(f, "{} {}IN (", expr, if *negated { "NOT " } else { "" })?;
                write_list(f, list)?;
                write!(f, ")")
            }
            Expr::InSubquery {
                expr,
                subquery,
                negated,
            } => write!(f, "{} {}IN ({})", expr, if *negated { "NOT " } else { "" }, subquery),
            Expr::Like { expr, pattern, negated } => {
                write!(f, "{} {}LIKE {}", expr, if *negated { "NOT " } else { "" }, pattern)
            }
            Expr::Function { name, args } => match args {
                FunctionArgs::None => write!(f, "{}", name),
                FunctionArgs::Star => write!(f, "{}(*)", name),
                FunctionArgs::List { distinct, args } => {
                    write!(f, "{}({}", name, if *distinct { "DISTINCT " } else { "" })?;
                    write_list(f, args)?;
                    write!(f, ")")
                }
            },
            Expr::Case {
                operand,
                branches,
                else_result,
            } => {
                write!(f, "CASE")?;
                if let Some(op) = operand {
                    write!(f, " {}", op)?;
                }
                for branch in branches {
                    write!(f, " WHEN {} THEN {}", branch.condition, branch.result)?;
                }
                if let Some(e) = else_result {
                    write!(f, " ELSE {}", e)?;
                }
                write!(f, " END")
            }
            Expr::Subquery(select) => write!(f, "({})", select),
            Expr::Exists { subquery, negated } => {
                write!(f, "{}EXISTS ({})", if *negated { "NOT " } else { "" }, subquery)
            }
            Expr::Tuple(items) => {
                write!(f, "(")?;
                write_list(f, items)?;
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expr_display() {
        let expr = Expr::and(
            Expr::eq(Expr::column("t1", "id"), Expr::Parameter(Parameter::Bound(0))),
            Expr::binary(
                Expr::column("t1", "name"),
                BinaryOp::Or,
                Expr::Literal(Literal::String("O'Neil".into())),
            ),
        );
        assert_eq!(expr.to_string(), "t1.id = ? AND (t1.name OR 'O''Neil')");
    }

    #[test]
    fn test_column_escaping() {
        assert_eq!(Expr::column("t1", "order").to_string(), "t1.\"order\"");
        assert_eq!(Expr::Label("c1-2".into()).to_string(), "\"c1-2\"");
    }

    #[test]
    fn test_literal_class() {
        assert_eq!(Literal::Number("42".into()).class(), "i64");
        assert_eq!(Literal::Number("4.2".into()).class(), "f64");
        assert_eq!(Literal::String("x".into()).class(), "String");
    }
}
