//! Functional expression tree carried by `filter`, `map` and `join` operators.
//!
//! Every lambda takes exactly one parameter: the input record (`r`) for
//! filter and map, the set of joined tables (`tables`) for join. Nodes
//! serialize with a `type` tag naming the node kind.
//!
//! ```text
//! r => r._measurement == "cpu" and r._field == "value"
//! r => {_time: r._time, mean: r._value}
//! tables => {val0: tables.t0, val1: tables.t1}
//! ```

use crate::duration::Duration;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Operator {
    #[serde(rename = "+")]
    Addition,
    #[serde(rename = "-")]
    Subtraction,
    #[serde(rename = "*")]
    Multiplication,
    #[serde(rename = "/")]
    Division,
    #[serde(rename = "%")]
    Modulo,
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessThanEqual,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = ">=")]
    GreaterThanEqual,
    #[serde(rename = "=~")]
    RegexpMatch,
    #[serde(rename = "!~")]
    NotRegexpMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogicalOperator {
    #[serde(rename = "and")]
    And,
    #[serde(rename = "or")]
    Or,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub struct Identifier {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub struct FunctionParam {
    pub key: Identifier,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub struct Property {
    pub key: Identifier,
    pub value: Expression,
}

impl Property {
    pub fn new(key: impl Into<String>, value: Expression) -> Self {
        Property {
            key: Identifier { name: key.into() },
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Expression {
    FunctionExpression {
        params: Vec<FunctionParam>,
        body: Box<Expression>,
    },
    ObjectExpression {
        properties: Vec<Property>,
    },
    MemberExpression {
        object: Box<Expression>,
        property: String,
    },
    IdentifierExpression {
        name: String,
    },
    UnaryExpression {
        operator: Operator,
        argument: Box<Expression>,
    },
    BinaryExpression {
        operator: Operator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    LogicalExpression {
        operator: LogicalOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// Call with named arguments, `math.pow(x: r._value, y: 2)`.
    CallExpression {
        callee: Box<Expression>,
        arguments: Box<Expression>,
    },
    StringLiteral {
        value: String,
    },
    IntegerLiteral {
        value: i64,
    },
    FloatLiteral {
        value: f64,
    },
    BooleanLiteral {
        value: bool,
    },
    DurationLiteral {
        value: Duration,
    },
    DateTimeLiteral {
        #[serde(serialize_with = "serialize_time")]
        value: DateTime<Utc>,
    },
    RegexpLiteral {
        value: String,
    },
}

impl Expression {
    /// Single-parameter lambda.
    pub fn function(param: &str, body: Expression) -> Self {
        Expression::FunctionExpression {
            params: vec![FunctionParam {
                key: Identifier {
                    name: param.to_string(),
                },
            }],
            body: Box::new(body),
        }
    }

    pub fn object(properties: Vec<Property>) -> Self {
        Expression::ObjectExpression { properties }
    }

    pub fn identifier(name: &str) -> Self {
        Expression::IdentifierExpression {
            name: name.to_string(),
        }
    }

    /// `object.property` where the object is a plain identifier.
    pub fn member(object: &str, property: impl Into<String>) -> Self {
        Expression::MemberExpression {
            object: Box::new(Expression::identifier(object)),
            property: property.into(),
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expression::StringLiteral {
            value: value.into(),
        }
    }

    pub fn binary(operator: Operator, left: Expression, right: Expression) -> Self {
        Expression::BinaryExpression {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn logical(operator: LogicalOperator, left: Expression, right: Expression) -> Self {
        Expression::LogicalExpression {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn negate(argument: Expression) -> Self {
        Expression::UnaryExpression {
            operator: Operator::Subtraction,
            argument: Box::new(argument),
        }
    }

    /// `package.function(name: value, ...)`.
    pub fn call(package: &str, function: &str, arguments: Vec<Property>) -> Self {
        Expression::CallExpression {
            callee: Box::new(Expression::member(package, function)),
            arguments: Box::new(Expression::object(arguments)),
        }
    }
}

/// RFC 3339 with as many fractional digits as the instant needs.
pub fn serialize_time<S: Serializer>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&time.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}
