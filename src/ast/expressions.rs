use crate::ast::{BinOp, Token};
use crate::duration::Duration;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;

/// Type hint attached to a field reference with `::`.
///
/// # Example
/// ```text
/// value::field
/// host::tag
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Float,
    Integer,
    String,
    Boolean,
    Field,
    Tag,
}

impl DataType {
    pub fn from_name(name: &str) -> Option<Self> {
        let data_type = match name.to_ascii_lowercase().as_str() {
            "float" => DataType::Float,
            "integer" => DataType::Integer,
            "string" => DataType::String,
            "boolean" => DataType::Boolean,
            "field" => DataType::Field,
            "tag" => DataType::Tag,
            _ => return None,
        };
        Some(data_type)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Float => "float",
            DataType::Integer => "integer",
            DataType::String => "string",
            DataType::Boolean => "boolean",
            DataType::Field => "field",
            DataType::Tag => "tag",
        };
        f.write_str(name)
    }
}

/// Abstract Syntax Tree node representing a parsed expression.
///
/// Expressions appear in the field list, the `WHERE` condition and the
/// `GROUP BY` dimension list.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    // References
    /// Field or tag reference, optionally with a type hint
    ///
    /// # Examples
    /// ```text
    /// value
    /// "cpu total"
    /// host::tag
    /// ```
    VarRef {
        name: String,
        data_type: Option<DataType>,
    },

    /// All fields (`*`)
    Wildcard,

    /// Function call
    ///
    /// Function names are stored lower-cased.
    ///
    /// # Examples
    /// ```text
    /// mean(value)
    /// derivative(mean(value), 1s)
    /// now()
    /// ```
    Call { name: String, args: Vec<Expr> },

    /// Keyword form of `distinct(field)`
    ///
    /// # Example
    /// ```text
    /// SELECT DISTINCT value FROM cpu
    /// ```
    Distinct(String),

    // Operators
    /// Binary operation
    ///
    /// # Examples
    /// ```text
    /// a + b
    /// host = 'server01'
    /// time >= now() - 10m
    /// ```
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    /// Parenthesised expression, kept so output column names and error
    /// renderings match the source
    Paren(Box<Expr>),

    // Literals
    /// Integer literal
    Integer(i64),

    /// Floating point literal
    Number(f64),

    /// Single-quoted string literal
    String(String),

    /// Boolean literal
    Boolean(bool),

    /// Duration literal
    Duration(Duration),

    /// Absolute instant, produced by reduction (`now()`, time-like strings)
    Time(DateTime<Utc>),

    /// Regular expression literal
    ///
    /// # Example
    /// ```text
    /// /^server\d+$/
    /// ```
    Regex(String),

    /// Result of evaluating a math function on an unusable literal
    Nil,
}

impl Expr {
    pub fn var(name: impl Into<String>) -> Self {
        Expr::VarRef {
            name: name.into(),
            data_type: None,
        }
    }

    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            name: name.into(),
            args,
        }
    }

    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Literal nodes, including regexes and the nil literal.
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Expr::Integer(_)
                | Expr::Number(_)
                | Expr::String(_)
                | Expr::Boolean(_)
                | Expr::Duration(_)
                | Expr::Time(_)
                | Expr::Regex(_)
                | Expr::Nil
        )
    }

    /// True for a reference to the `time` column in any letter case.
    pub fn is_time_ref(&self) -> bool {
        matches!(self, Expr::VarRef { name, .. } if name.eq_ignore_ascii_case("time"))
    }

    /// View `distinct x` and `f(args)` uniformly as a call.
    pub fn as_call(&self) -> Option<(&str, Vec<Expr>)> {
        match self {
            Expr::Call { name, args } => Some((name.as_str(), args.clone())),
            Expr::Distinct(field) => Some(("distinct", vec![Expr::var(field.clone())])),
            _ => None,
        }
    }

    /// Every field or tag reference in the tree, in source order, without
    /// descending into `distinct`.
    pub fn var_refs(&self) -> Vec<&Expr> {
        let mut refs = Vec::new();
        self.collect_var_refs(&mut refs);
        refs
    }

    fn collect_var_refs<'a>(&'a self, refs: &mut Vec<&'a Expr>) {
        match self {
            Expr::VarRef { .. } => refs.push(self),
            Expr::Call { args, .. } => args.iter().for_each(|arg| arg.collect_var_refs(refs)),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_var_refs(refs);
                rhs.collect_var_refs(refs);
            }
            Expr::Paren(inner) => inner.collect_var_refs(refs),
            _ => {}
        }
    }

    /// Node type name used by the legacy error messages
    /// (`got *influxql.IntegerLiteral`).
    pub fn node_name(&self) -> &'static str {
        match self {
            Expr::VarRef { .. } => "VarRef",
            Expr::Wildcard => "Wildcard",
            Expr::Call { .. } => "Call",
            Expr::Distinct(_) => "Distinct",
            Expr::Binary { .. } => "BinaryExpr",
            Expr::Paren(_) => "ParenExpr",
            Expr::Integer(_) => "IntegerLiteral",
            Expr::Number(_) => "NumberLiteral",
            Expr::String(_) => "StringLiteral",
            Expr::Boolean(_) => "BooleanLiteral",
            Expr::Duration(_) => "DurationLiteral",
            Expr::Time(_) => "TimeLiteral",
            Expr::Regex(_) => "RegexLiteral",
            Expr::Nil => "NilLiteral",
        }
    }
}

/// Quote an identifier when it is not a plain word or collides with a keyword.
pub fn quote_ident(name: &str) -> String {
    let mut chars = name.chars();
    let bare = match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|c| c.is_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if bare && Token::keyword(name).is_none() {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n"))
    }
}

/// Render a string literal with single quotes and escapes.
pub fn quote_string(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'").replace('\n', "\\n"))
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::VarRef { name, data_type } => {
                write!(f, "{}", quote_ident(name))?;
                if let Some(data_type) = data_type {
                    write!(f, "::{}", data_type)?;
                }
                Ok(())
            }
            Expr::Wildcard => f.write_str("*"),
            Expr::Call { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
            Expr::Distinct(field) => write!(f, "DISTINCT {}", quote_ident(field)),
            Expr::Binary { op, lhs, rhs } => write!(f, "{} {} {}", lhs, op, rhs),
            Expr::Paren(inner) => write!(f, "({})", inner),
            Expr::Integer(n) => write!(f, "{}", n),
            Expr::Number(n) => write!(f, "{:.3}", n),
            Expr::String(s) => f.write_str(&quote_string(s)),
            Expr::Boolean(b) => write!(f, "{}", b),
            Expr::Duration(d) => write!(f, "{}", d),
            Expr::Time(t) => write!(f, "'{}'", t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Expr::Regex(re) => write!(f, "/{}/", re.replace('/', "\\/")),
            Expr::Nil => f.write_str("<nil>"),
        }
    }
}
