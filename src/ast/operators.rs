use std::fmt;

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Arithmetic
    /// Addition (`+`)
    Add,
    /// Subtraction (`-`)
    Subtract,
    /// Multiplication (`*`)
    Multiply,
    /// Division (`/`)
    Divide,
    /// Modulo (`%`)
    Modulo,

    // Comparison
    /// Equal (`=`)
    Equal,
    /// Not equal (`!=`)
    NotEqual,
    /// Regex match (`=~`)
    RegexMatch,
    /// Regex mismatch (`!~`)
    RegexNotMatch,
    /// Less than (`<`)
    LessThan,
    /// Less than or equal (`<=`)
    LessEqual,
    /// Greater than (`>`)
    GreaterThan,
    /// Greater than or equal (`>=`)
    GreaterEqual,

    // Logical
    /// Logical AND (`AND`)
    And,
    /// Logical OR (`OR`)
    Or,
}

impl BinOp {
    /// Binding strength; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Or => 1,
            BinOp::And => 2,
            BinOp::Equal
            | BinOp::NotEqual
            | BinOp::RegexMatch
            | BinOp::RegexNotMatch
            | BinOp::LessThan
            | BinOp::LessEqual
            | BinOp::GreaterThan
            | BinOp::GreaterEqual => 4,
            BinOp::Add | BinOp::Subtract => 5,
            BinOp::Multiply | BinOp::Divide | BinOp::Modulo => 6,
        }
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }

    /// Ordered and equality comparisons; the operators a `time` bound may use.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Equal
                | BinOp::NotEqual
                | BinOp::LessThan
                | BinOp::LessEqual
                | BinOp::GreaterThan
                | BinOp::GreaterEqual
        )
    }

    pub fn is_regex(self) -> bool {
        matches!(self, BinOp::RegexMatch | BinOp::RegexNotMatch)
    }

    /// The operator with its operands exchanged (`a < b` ⇔ `b > a`).
    pub fn mirrored(self) -> BinOp {
        match self {
            BinOp::LessThan => BinOp::GreaterThan,
            BinOp::LessEqual => BinOp::GreaterEqual,
            BinOp::GreaterThan => BinOp::LessThan,
            BinOp::GreaterEqual => BinOp::LessEqual,
            other => other,
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinOp::Add => "+",
            BinOp::Subtract => "-",
            BinOp::Multiply => "*",
            BinOp::Divide => "/",
            BinOp::Modulo => "%",
            BinOp::Equal => "=",
            BinOp::NotEqual => "!=",
            BinOp::RegexMatch => "=~",
            BinOp::RegexNotMatch => "!~",
            BinOp::LessThan => "<",
            BinOp::LessEqual => "<=",
            BinOp::GreaterThan => ">",
            BinOp::GreaterEqual => ">=",
            BinOp::And => "AND",
            BinOp::Or => "OR",
        };
        f.write_str(symbol)
    }
}
