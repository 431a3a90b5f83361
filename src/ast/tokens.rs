use crate::duration::Duration;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    /// Floating-point number
    ///
    /// # Examples
    /// ```text
    /// 3.14
    /// 75.0
    /// ```
    Float(f64),

    /// Integer
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 10
    /// ```
    Integer(i64),

    /// String literal enclosed in single quotes
    ///
    /// # Examples
    /// ```text
    /// 'server01'
    /// '2000-01-01T00:00:00Z'
    /// ```
    String(String),

    /// Boolean values
    Boolean(bool),

    /// Duration literal, an integer immediately followed by a unit
    ///
    /// # Examples
    /// ```text
    /// 10m
    /// 1h30m
    /// 500ms
    /// ```
    Duration(Duration),

    /// Bare or double-quoted identifier
    ///
    /// Quoting turns keywords into plain identifiers.
    ///
    /// # Examples
    /// ```text
    /// cpu
    /// "select"
    /// "my measurement"
    /// ```
    Identifier(String),

    // Keywords
    Select,
    From,
    Where,
    Group,
    By,
    Order,
    Asc,
    Desc,
    Limit,
    Offset,
    SLimit,
    SOffset,
    As,
    And,
    Or,

    // Comparison
    /// `=`
    Eq,
    /// `!=` or `<>`
    NotEq,
    /// `=~`
    EqRegex,
    /// `!~`
    NotEqRegex,
    Lt,
    LtEq,
    Gt,
    GtEq,

    // Arithmetic
    Plus,
    Minus,
    /// Multiplication, or the wildcard in operand position
    Star,
    /// Division, or the opening delimiter of a regex in operand position
    Slash,
    Percent,

    // Delimiters
    LParen,
    RParen,
    Comma,
    /// Separates database, retention policy and measurement
    Dot,
    /// Type hint separator (`value::field`)
    DoubleColon,
    Semicolon,

    /// End of input
    Eof,
}

impl Token {
    /// Map an unquoted word to its keyword token, case-insensitively.
    pub fn keyword(word: &str) -> Option<Token> {
        let token = match word.to_ascii_lowercase().as_str() {
            "select" => Token::Select,
            "from" => Token::From,
            "where" => Token::Where,
            "group" => Token::Group,
            "by" => Token::By,
            "order" => Token::Order,
            "asc" => Token::Asc,
            "desc" => Token::Desc,
            "limit" => Token::Limit,
            "offset" => Token::Offset,
            "slimit" => Token::SLimit,
            "soffset" => Token::SOffset,
            "as" => Token::As,
            "and" => Token::And,
            "or" => Token::Or,
            "true" => Token::Boolean(true),
            "false" => Token::Boolean(false),
            _ => return None,
        };
        Some(token)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Float(n) => write!(f, "{}", n),
            Token::Integer(n) => write!(f, "{}", n),
            Token::String(s) => write!(f, "'{}'", s),
            Token::Boolean(b) => write!(f, "{}", b),
            Token::Duration(d) => write!(f, "{}", d),
            Token::Identifier(name) => write!(f, "{}", name),
            Token::Select => f.write_str("SELECT"),
            Token::From => f.write_str("FROM"),
            Token::Where => f.write_str("WHERE"),
            Token::Group => f.write_str("GROUP"),
            Token::By => f.write_str("BY"),
            Token::Order => f.write_str("ORDER"),
            Token::Asc => f.write_str("ASC"),
            Token::Desc => f.write_str("DESC"),
            Token::Limit => f.write_str("LIMIT"),
            Token::Offset => f.write_str("OFFSET"),
            Token::SLimit => f.write_str("SLIMIT"),
            Token::SOffset => f.write_str("SOFFSET"),
            Token::As => f.write_str("AS"),
            Token::And => f.write_str("AND"),
            Token::Or => f.write_str("OR"),
            Token::Eq => f.write_str("="),
            Token::NotEq => f.write_str("!="),
            Token::EqRegex => f.write_str("=~"),
            Token::NotEqRegex => f.write_str("!~"),
            Token::Lt => f.write_str("<"),
            Token::LtEq => f.write_str("<="),
            Token::Gt => f.write_str(">"),
            Token::GtEq => f.write_str(">="),
            Token::Plus => f.write_str("+"),
            Token::Minus => f.write_str("-"),
            Token::Star => f.write_str("*"),
            Token::Slash => f.write_str("/"),
            Token::Percent => f.write_str("%"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::Comma => f.write_str(","),
            Token::Dot => f.write_str("."),
            Token::DoubleColon => f.write_str("::"),
            Token::Semicolon => f.write_str(";"),
            Token::Eof => f.write_str("EOF"),
        }
    }
}
