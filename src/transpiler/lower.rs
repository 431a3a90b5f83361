//! Lowering of InfluxQL expressions into lambda bodies.
//!
//! Field expressions resolve every reference through the cursor's symbol
//! table. Conditions additionally treat unknown references as tag columns.

use crate::ast::{BinOp, Expr};
use crate::error::{ArityError, Result, SyntaxError, TranspileError};
use crate::semantic::{Expression, LogicalOperator, Operator, Property};
use crate::transpiler::catalog::MathFunction;
use crate::transpiler::cursor::{Cursor, symbol_key};
use crate::transpiler::time_range::parse_time_string;

/// Parameter name of row lambdas.
pub const ROW: &str = "r";

/// Lower a field expression. Every reference must be bound in `cursor`.
pub fn lower_field(expr: &Expr, cursor: &Cursor) -> Result<Expression> {
    Lowering {
        cursor,
        tags: false,
    }
    .lower(expr)
}

/// Lower a `WHERE` condition. Unbound references read the tag column of the
/// same name.
pub fn lower_condition(expr: &Expr, cursor: &Cursor) -> Result<Expression> {
    Lowering { cursor, tags: true }.lower(expr)
}

struct Lowering<'c> {
    cursor: &'c Cursor,
    tags: bool,
}

impl Lowering<'_> {
    fn lower(&self, expr: &Expr) -> Result<Expression> {
        match expr {
            Expr::VarRef { name, .. } => match self.cursor.column(name) {
                Some(column) => Ok(Expression::member(ROW, column)),
                None if self.tags => Ok(Expression::member(ROW, name.clone())),
                None => Err(SyntaxError::MissingSymbol(expr.clone()).into()),
            },
            Expr::Call { name, args } => {
                if let Some(column) = self.cursor.column(&symbol_key(expr)) {
                    return Ok(Expression::member(ROW, column));
                }
                match MathFunction::from_name(name) {
                    Some(math) => self.lower_math(math, args),
                    None => Err(SyntaxError::MissingSymbol(expr.clone()).into()),
                }
            }
            Expr::Regex(value) if self.tags => Ok(Expression::RegexpLiteral {
                value: value.clone(),
            }),
            Expr::Wildcard | Expr::Regex(_) | Expr::Distinct(_) => {
                match self.cursor.column(&symbol_key(expr)) {
                    Some(column) => Ok(Expression::member(ROW, column)),
                    None => Err(SyntaxError::MissingSymbol(expr.clone()).into()),
                }
            }
            Expr::Binary { op, lhs, rhs } => self.lower_binary(*op, lhs, rhs),
            Expr::Paren(inner) => self.lower(inner),
            Expr::Integer(value) => Ok(Expression::IntegerLiteral { value: *value }),
            Expr::Number(value) => Ok(Expression::FloatLiteral { value: *value }),
            Expr::String(value) => match parse_time_string(value) {
                Some(value) => Ok(Expression::DateTimeLiteral { value }),
                None => Ok(Expression::string(value.clone())),
            },
            Expr::Boolean(value) => Ok(Expression::BooleanLiteral { value: *value }),
            Expr::Duration(value) => Ok(Expression::DurationLiteral { value: *value }),
            Expr::Time(value) => Ok(Expression::DateTimeLiteral { value: *value }),
            Expr::Nil => Err(TranspileError::unimplemented("nil literal")),
        }
    }

    fn lower_binary(&self, op: BinOp, lhs: &Expr, rhs: &Expr) -> Result<Expression> {
        if op == BinOp::Multiply && is_minus_one(lhs) {
            return Ok(Expression::negate(self.lower(rhs)?));
        }
        let left = self.lower(lhs)?;
        let right = self.lower(rhs)?;
        let expression = match operator(op) {
            Some(operator) => Expression::binary(operator, left, right),
            None if op == BinOp::And => Expression::logical(LogicalOperator::And, left, right),
            None => Expression::logical(LogicalOperator::Or, left, right),
        };
        Ok(expression)
    }

    fn lower_math(&self, math: MathFunction, args: &[Expr]) -> Result<Expression> {
        if args.len() != math.arity() {
            return Err(ArityError::Exact {
                name: math.name().to_string(),
                expected: math.arity(),
                got: args.len(),
            }
            .into());
        }
        let call = |function: &str, names: &[&str]| -> Result<Expression> {
            let arguments = names
                .iter()
                .zip(args)
                .map(|(name, arg)| -> Result<Property> {
                    Ok(Property::new(*name, self.lower(arg)?))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Expression::call("math", function, arguments))
        };
        match math {
            MathFunction::Ln => call("log", &["x"]),
            MathFunction::Log => {
                let log = |arg: &Expr| -> Result<Expression> {
                    let x = Property::new("x", self.lower(arg)?);
                    Ok(Expression::call("math", "log", vec![x]))
                };
                let (value, base) = (log(&args[0])?, log(&args[1])?);
                Ok(Expression::binary(Operator::Division, value, base))
            }
            MathFunction::Atan2 => call("atan2", &["y", "x"]),
            MathFunction::Pow => call("pow", &["x", "y"]),
            other => call(other.name(), &["x"]),
        }
    }
}

fn is_minus_one(expr: &Expr) -> bool {
    match expr {
        Expr::Integer(n) => *n == -1,
        Expr::Number(n) => *n == -1.0,
        _ => false,
    }
}

/// Operator of a non-logical binary expression.
fn operator(op: BinOp) -> Option<Operator> {
    let operator = match op {
        BinOp::Add => Operator::Addition,
        BinOp::Subtract => Operator::Subtraction,
        BinOp::Multiply => Operator::Multiplication,
        BinOp::Divide => Operator::Division,
        BinOp::Modulo => Operator::Modulo,
        BinOp::Equal => Operator::Equal,
        BinOp::NotEqual => Operator::NotEqual,
        BinOp::LessThan => Operator::LessThan,
        BinOp::LessEqual => Operator::LessThanEqual,
        BinOp::GreaterThan => Operator::GreaterThan,
        BinOp::GreaterEqual => Operator::GreaterThanEqual,
        BinOp::RegexMatch => Operator::RegexpMatch,
        BinOp::RegexNotMatch => Operator::NotRegexpMatch,
        BinOp::And | BinOp::Or => return None,
    };
    Some(operator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::lexer::Lexer;
    use serde_json::{Value, json};

    fn expr(text: &str) -> Expr {
        Parser::new(Lexer::new(text)).unwrap().parse_expression().unwrap()
    }

    fn cursor() -> Cursor {
        Cursor::new("join0".into())
            .with_symbol("a", "val0")
            .with_symbol("b", "val1")
            .with_symbol("mean(value)", "_value")
    }

    fn lowered(text: &str) -> Value {
        serde_json::to_value(lower_field(&expr(text), &cursor()).unwrap()).unwrap()
    }

    fn member(property: &str) -> Value {
        json!({
            "type": "MemberExpression",
            "object": {"type": "IdentifierExpression", "name": "r"},
            "property": property
        })
    }

    #[test]
    fn resolves_symbols() {
        assert_eq!(
            lowered("a + b"),
            json!({
                "type": "BinaryExpression",
                "operator": "+",
                "left": member("val0"),
                "right": member("val1")
            })
        );
        assert_eq!(lowered("mean(value)"), member("_value"));
    }

    #[test]
    fn negation_and_math() {
        assert_eq!(
            lowered("-a"),
            json!({"type": "UnaryExpression", "operator": "-", "argument": member("val0")})
        );
        let log = lowered("log(a, 2)");
        assert_eq!(log["operator"], "/");
        assert_eq!(log["left"]["callee"]["property"], "log");
        assert_eq!(log["right"]["arguments"]["properties"][0]["value"]["value"], 2);
        let atan2 = lowered("atan2(a, b)");
        assert_eq!(atan2["arguments"]["properties"][0]["key"]["name"], "y");
    }

    #[test]
    fn unbound_references() {
        let err = lower_field(&expr("c"), &cursor()).unwrap_err();
        assert_eq!(err.to_string(), "missing symbol for c");

        let condition = lower_condition(&expr("host = 'a' AND a > 1"), &cursor()).unwrap();
        let value = serde_json::to_value(condition).unwrap();
        assert_eq!(value["type"], "LogicalExpression");
        assert_eq!(value["left"]["left"], member("host"));
        assert_eq!(value["right"]["left"], member("val0"));
    }

    #[test]
    fn time_strings_become_date_times() {
        let condition = lower_condition(&expr("t = '2010-09-15T09:00:00Z'"), &cursor()).unwrap();
        let value = serde_json::to_value(condition).unwrap();
        assert_eq!(value["right"], json!({"type": "DateTimeLiteral", "value": "2010-09-15T09:00:00Z"}));
    }
}
