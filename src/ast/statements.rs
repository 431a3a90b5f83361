use crate::ast::Expr;
use std::fmt;

/// A single `SELECT` statement.
///
/// # Example
/// ```text
/// SELECT mean(value) FROM db0..cpu
///   WHERE host = 'server01' AND time >= now() - 1h
///   GROUP BY time(10m), host fill(none)
///   ORDER BY time DESC LIMIT 10
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectStatement {
    pub fields: Vec<Field>,
    pub sources: Vec<Source>,
    pub condition: Option<Expr>,
    pub dimensions: Vec<Dimension>,
    pub fill: Fill,
    /// `None` when the statement has no `ORDER BY` clause.
    pub order: Option<SortOrder>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub slimit: Option<i64>,
    pub soffset: Option<i64>,
    /// Argument of `tz('...')`.
    pub location: Option<String>,
}

/// One entry of the field list, with its optional `AS` alias.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub expr: Expr,
    pub alias: Option<String>,
}

impl Field {
    pub fn new(expr: Expr) -> Self {
        Field { expr, alias: None }
    }
}

/// One entry of the `GROUP BY` list.
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    pub expr: Expr,
}

/// Data source of a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// `[database.[retention_policy].]measurement`
    Measurement(Measurement),

    /// Parenthesised nested statement
    ///
    /// # Example
    /// ```text
    /// SELECT max(mean) FROM (SELECT mean(value) FROM cpu GROUP BY host)
    /// ```
    Subquery(Box<SelectStatement>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub database: Option<String>,
    pub retention_policy: Option<String>,
    pub name: MeasurementName,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MeasurementName {
    Name(String),
    Regex(String),
}

/// Value used for windows without points.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Fill {
    #[default]
    Null,
    None,
    Previous,
    Linear,
    Integer(i64),
    Number(f64),
}

impl fmt::Display for Fill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fill::Null => f.write_str("null"),
            Fill::None => f.write_str("none"),
            Fill::Previous => f.write_str("previous"),
            Fill::Linear => f.write_str("linear"),
            Fill::Integer(n) => write!(f, "{}", n),
            Fill::Number(n) => write!(f, "{}", n),
        }
    }
}

/// Direction of `ORDER BY time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}
