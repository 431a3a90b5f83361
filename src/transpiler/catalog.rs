//! Known InfluxQL functions.
//!
//! Two closed sets: [`Function`] for the aggregates, selectors and
//! transformations that shape the operator graph, and [`MathFunction`] for
//! the scalar functions evaluated row by row inside a lambda.

/// Functions that become operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    // Aggregates
    Count,
    Sum,
    Mean,
    Median,
    Mode,
    Stddev,
    Spread,
    Integral,

    // Selectors
    First,
    Last,
    Min,
    Max,
    Percentile,
    Sample,
    Top,
    Bottom,
    Distinct,

    // Transformations
    Derivative,
    NonNegativeDerivative,
    Difference,
    NonNegativeDifference,
    CumulativeSum,
    MovingAverage,
    Elapsed,
    HoltWinters,
    HoltWintersWithFit,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        let function = match name {
            "count" => Function::Count,
            "sum" => Function::Sum,
            "mean" => Function::Mean,
            "median" => Function::Median,
            "mode" => Function::Mode,
            "stddev" => Function::Stddev,
            "spread" => Function::Spread,
            "integral" => Function::Integral,
            "first" => Function::First,
            "last" => Function::Last,
            "min" => Function::Min,
            "max" => Function::Max,
            "percentile" => Function::Percentile,
            "sample" => Function::Sample,
            "top" => Function::Top,
            "bottom" => Function::Bottom,
            "distinct" => Function::Distinct,
            "derivative" => Function::Derivative,
            "non_negative_derivative" => Function::NonNegativeDerivative,
            "difference" => Function::Difference,
            "non_negative_difference" => Function::NonNegativeDifference,
            "cumulative_sum" => Function::CumulativeSum,
            "moving_average" => Function::MovingAverage,
            "elapsed" => Function::Elapsed,
            "holt_winters" => Function::HoltWinters,
            "holt_winters_with_fit" => Function::HoltWintersWithFit,
            _ => return None,
        };
        Some(function)
    }

    pub fn name(self) -> &'static str {
        match self {
            Function::Count => "count",
            Function::Sum => "sum",
            Function::Mean => "mean",
            Function::Median => "median",
            Function::Mode => "mode",
            Function::Stddev => "stddev",
            Function::Spread => "spread",
            Function::Integral => "integral",
            Function::First => "first",
            Function::Last => "last",
            Function::Min => "min",
            Function::Max => "max",
            Function::Percentile => "percentile",
            Function::Sample => "sample",
            Function::Top => "top",
            Function::Bottom => "bottom",
            Function::Distinct => "distinct",
            Function::Derivative => "derivative",
            Function::NonNegativeDerivative => "non_negative_derivative",
            Function::Difference => "difference",
            Function::NonNegativeDifference => "non_negative_difference",
            Function::CumulativeSum => "cumulative_sum",
            Function::MovingAverage => "moving_average",
            Function::Elapsed => "elapsed",
            Function::HoltWinters => "holt_winters",
            Function::HoltWintersWithFit => "holt_winters_with_fit",
        }
    }

    /// Functions that return existing points rather than computed values.
    /// Only these may share a field list with plain tags and fields.
    pub fn is_selector(self) -> bool {
        matches!(
            self,
            Function::First
                | Function::Last
                | Function::Min
                | Function::Max
                | Function::Percentile
                | Function::Sample
                | Function::Top
                | Function::Bottom
        )
    }

    /// Functions applied to the output of another function, or to raw
    /// points when the statement has no `GROUP BY` interval.
    pub fn is_transformation(self) -> bool {
        matches!(
            self,
            Function::Derivative
                | Function::NonNegativeDerivative
                | Function::Difference
                | Function::NonNegativeDifference
                | Function::CumulativeSum
                | Function::MovingAverage
                | Function::Elapsed
                | Function::HoltWinters
                | Function::HoltWintersWithFit
        )
    }
}

/// Scalar math functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MathFunction {
    Abs,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Atan2,
    Exp,
    Ln,
    Log,
    Log2,
    Log10,
    Sqrt,
    Pow,
    Floor,
    Ceil,
    Round,
}

impl MathFunction {
    pub fn from_name(name: &str) -> Option<Self> {
        let function = match name {
            "abs" => MathFunction::Abs,
            "sin" => MathFunction::Sin,
            "cos" => MathFunction::Cos,
            "tan" => MathFunction::Tan,
            "asin" => MathFunction::Asin,
            "acos" => MathFunction::Acos,
            "atan" => MathFunction::Atan,
            "atan2" => MathFunction::Atan2,
            "exp" => MathFunction::Exp,
            "ln" => MathFunction::Ln,
            "log" => MathFunction::Log,
            "log2" => MathFunction::Log2,
            "log10" => MathFunction::Log10,
            "sqrt" => MathFunction::Sqrt,
            "pow" => MathFunction::Pow,
            "floor" => MathFunction::Floor,
            "ceil" => MathFunction::Ceil,
            "round" => MathFunction::Round,
            _ => return None,
        };
        Some(function)
    }

    pub fn name(self) -> &'static str {
        match self {
            MathFunction::Abs => "abs",
            MathFunction::Sin => "sin",
            MathFunction::Cos => "cos",
            MathFunction::Tan => "tan",
            MathFunction::Asin => "asin",
            MathFunction::Acos => "acos",
            MathFunction::Atan => "atan",
            MathFunction::Atan2 => "atan2",
            MathFunction::Exp => "exp",
            MathFunction::Ln => "ln",
            MathFunction::Log => "log",
            MathFunction::Log2 => "log2",
            MathFunction::Log10 => "log10",
            MathFunction::Sqrt => "sqrt",
            MathFunction::Pow => "pow",
            MathFunction::Floor => "floor",
            MathFunction::Ceil => "ceil",
            MathFunction::Round => "round",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            MathFunction::Atan2 | MathFunction::Log | MathFunction::Pow => 2,
            _ => 1,
        }
    }

    /// Evaluate on constant arguments. The caller checks the arity.
    pub fn eval(self, args: &[f64]) -> Option<f64> {
        let x = *args.first()?;
        let value = match self {
            MathFunction::Abs => x.abs(),
            MathFunction::Sin => x.sin(),
            MathFunction::Cos => x.cos(),
            MathFunction::Tan => x.tan(),
            MathFunction::Asin => x.asin(),
            MathFunction::Acos => x.acos(),
            MathFunction::Atan => x.atan(),
            MathFunction::Atan2 => x.atan2(*args.get(1)?),
            MathFunction::Exp => x.exp(),
            MathFunction::Ln => x.ln(),
            MathFunction::Log => x.log(*args.get(1)?),
            MathFunction::Log2 => x.log2(),
            MathFunction::Log10 => x.log10(),
            MathFunction::Sqrt => x.sqrt(),
            MathFunction::Pow => x.powf(*args.get(1)?),
            MathFunction::Floor => x.floor(),
            MathFunction::Ceil => x.ceil(),
            MathFunction::Round => x.round(),
        };
        Some(value)
    }
}
