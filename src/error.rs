//! Error taxonomy for query compilation.
//!
//! Each variant formats to the message InfluxQL users already know; those
//! strings are compared verbatim by clients, so wording changes are breaking
//! changes.

use crate::ast::{Expr, Fill};
use crate::duration::Duration;
use crate::parser::ParseError;
use std::fmt;
use thiserror::Error;

/// Broad category of a [`TranspileError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    Syntax,
    Arity,
    ArgumentType,
    ArgumentValue,
    Combination,
    Unsupported,
    Configuration,
    Spec,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Parse => "parse",
            ErrorKind::Syntax => "syntax",
            ErrorKind::Arity => "arity",
            ErrorKind::ArgumentType => "argument type",
            ErrorKind::ArgumentValue => "argument value",
            ErrorKind::Combination => "combination",
            ErrorKind::Unsupported => "unsupported",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Spec => "spec",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TranspileError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Arity(#[from] ArityError),

    #[error(transparent)]
    ArgumentType(#[from] ArgumentTypeError),

    #[error(transparent)]
    ArgumentValue(#[from] ArgumentValueError),

    #[error(transparent)]
    Combination(#[from] CombinationError),

    #[error(transparent)]
    Unsupported(#[from] UnsupportedError),

    #[error("database name required")]
    DatabaseRequired,

    #[error(transparent)]
    Spec(#[from] SpecError),
}

impl TranspileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TranspileError::Parse(_) => ErrorKind::Parse,
            TranspileError::Syntax(_) => ErrorKind::Syntax,
            TranspileError::Arity(_) => ErrorKind::Arity,
            TranspileError::ArgumentType(_) => ErrorKind::ArgumentType,
            TranspileError::ArgumentValue(_) => ErrorKind::ArgumentValue,
            TranspileError::Combination(_) => ErrorKind::Combination,
            TranspileError::Unsupported(_) => ErrorKind::Unsupported,
            TranspileError::DatabaseRequired => ErrorKind::Configuration,
            TranspileError::Spec(_) => ErrorKind::Spec,
        }
    }

    /// Known constructs this compiler cannot lower yet. Callers may treat
    /// these as a skip rather than a failure.
    pub fn is_unimplemented(&self) -> bool {
        matches!(
            self,
            TranspileError::Unsupported(UnsupportedError::Unimplemented(_))
        )
    }

    pub(crate) fn unimplemented(what: impl Into<String>) -> Self {
        TranspileError::Unsupported(UnsupportedError::Unimplemented(what.into()))
    }
}

/// Malformed conditions, dimensions, fill options and field lists.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyntaxError {
    #[error("query contains no statements")]
    EmptyQuery,

    #[error("invalid condition expression: {0}")]
    InvalidCondition(Expr),

    #[error("invalid operation: time and *influxql.{0} are not compatible")]
    IncompatibleTime(&'static str),

    #[error("invalid time comparison operator: {0}")]
    InvalidTimeComparison(crate::ast::BinOp),

    #[error("time {0} overflows time literal")]
    TimeOverflow(String),

    #[error("time {0} underflows time literal")]
    TimeUnderflow(String),

    #[error("unable to parse time literal {0}")]
    InvalidTimeLiteral(String),

    #[error("invalid function call in condition: {0}")]
    InvalidConditionCall(Expr),

    #[error("time() is a function and expects at least one argument")]
    TimeWithoutCall,

    #[error("only time() calls allowed in dimensions")]
    OnlyTimeCalls,

    #[error("time dimension expected 1 or 2 arguments")]
    TimeDimensionArity,

    #[error("time dimension must have duration argument")]
    TimeDimensionDuration,

    #[error("multiple time dimensions not allowed")]
    MultipleTimeDimensions,

    #[error("time dimension offset function must be now()")]
    OffsetFunction,

    #[error("time dimension offset now() function requires no arguments")]
    OffsetNowArguments,

    #[error("time dimension offset must be duration or now()")]
    OffsetType,

    #[error("only time and tag dimensions allowed")]
    InvalidDimension,

    #[error("at least 1 non-time field must be queried")]
    NoFields,

    #[error("field must contain at least one variable")]
    FieldWithoutVariable,

    #[error("unable to use wildcard in a binary expression")]
    WildcardInBinary,

    #[error("unable to use regex in a binary expression")]
    RegexInBinary,

    #[error("fill({0}) must be used with a function")]
    FillWithoutFunction(Fill),

    #[error("GROUP BY requires at least one aggregate function")]
    GroupByWithoutAggregate,

    #[error("subqueries must be ordered in the same direction as the query itself")]
    SubqueryOrder,

    #[error("missing symbol for {0}")]
    MissingSymbol(Expr),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArityError {
    #[error("invalid number of arguments for {name}, expected {expected}, got {got}")]
    Exact {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("invalid number of arguments for {name}, expected at least {min}, got {got}")]
    AtLeast { name: String, min: usize, got: usize },

    #[error(
        "invalid number of arguments for {name}, expected at least {min} but no more than {max}, got {got}"
    )]
    Between {
        name: String,
        min: usize,
        max: usize,
        got: usize,
    },

    #[error("distinct function requires at least one argument")]
    DistinctMissing,

    #[error("distinct function can only have one argument")]
    DistinctTooMany,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArgumentTypeError {
    #[error("expected field argument in {0}()")]
    ExpectedField(String),

    #[error("expected first argument to be a field in {name}(), found {found}")]
    SelectorField { name: String, found: Expr },

    #[error("only fields or tags are allowed in {name}(), found {found}")]
    SelectorTag { name: String, found: Expr },

    #[error("expected integer as last argument in {name}(), found {found}")]
    SelectorLimit { name: String, found: Expr },

    #[error("second argument to {name} must be a duration, got *influxql.{node}")]
    Duration { name: String, node: &'static str },

    #[error("second argument must be a duration")]
    IntegralDuration,

    #[error("expected integer argument in sample()")]
    SampleInteger,

    #[error("expected float argument in percentile()")]
    PercentileNumber,

    #[error("second argument for moving_average must be an integer, got *influxql.{0}")]
    MovingAverageInteger(&'static str),

    #[error("expected integer argument as second arg in {0}")]
    HoltWintersPeriods(String),

    #[error("expected integer argument as third arg in {0}")]
    HoltWintersSeasonal(String),

    #[error("aggregate function required inside the call to {0}")]
    AggregateRequired(String),

    #[error("must use aggregate function with {0}")]
    MustUseAggregate(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArgumentValueError {
    #[error("duration argument must be positive, got {0}")]
    NonPositiveDuration(Duration),

    #[error("limit ({limit}) in {name} function must be at least 1")]
    SelectorLimitTooSmall { name: String, limit: i64 },

    #[error(
        "limit ({limit}) in {name} function can not be larger than the LIMIT ({statement_limit}) in the select statement"
    )]
    SelectorLimitTooLarge {
        name: String,
        limit: i64,
        statement_limit: i64,
    },

    #[error("sample window must be greater than 1, got {0}")]
    SampleWindow(i64),

    #[error("moving_average window must be greater than 1, got {0}")]
    MovingAverageWindow(i64),

    #[error("second arg to {name} must be greater than 0, got {value}")]
    HoltWintersPeriods { name: String, value: i64 },

    #[error("third arg to {name} cannot be negative, got {value}")]
    HoltWintersSeasonal { name: String, value: i64 },

    #[error("{0} aggregate requires a GROUP BY interval")]
    IntervalRequired(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CombinationError {
    #[error("mixing aggregate and non-aggregate queries is not supported")]
    MixedAggregate,

    #[error("mixing multiple selector functions with tags or fields is not supported")]
    MultipleSelectors,

    #[error("selector function {0}() cannot be combined with other functions")]
    SelectorCombined(String),

    #[error("aggregate function distinct() cannot be combined with other functions or fields")]
    DistinctCombined,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum UnsupportedError {
    #[error("undefined function {0}()")]
    UndefinedFunction(String),

    #[error("unimplemented: {0}")]
    Unimplemented(String),
}

/// Structural problems in an assembled spec.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpecError {
    #[error("found duplicate operation ID {0:?}")]
    DuplicateId(String),

    #[error("edge references unknown operation {0:?}")]
    UnknownOperation(String),

    #[error("operation {0:?} has no parent")]
    Orphan(String),

    #[error("operation {0:?} has no children")]
    Dangling(String),

    #[error("yield {0:?} must not have children")]
    YieldWithChildren(String),

    #[error("found duplicate yield name {0:?}")]
    DuplicateYield(String),

    #[error("found cycle in query")]
    Cycle,
}

pub type Result<T, E = TranspileError> = std::result::Result<T, E>;
