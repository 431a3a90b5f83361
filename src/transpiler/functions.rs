//! Operators emitted for each InfluxQL function.

use crate::ast::Expr;
use crate::duration::{Duration, NANOSECOND, SECOND};
use crate::error::{ArgumentTypeError, Result, TranspileError, UnsupportedError};
use crate::spec::{
    AggregateConfig, ColumnsOpSpec, DEFAULT_TIME_COLUMN, DEFAULT_VALUE_COLUMN, DerivativeOpSpec,
    DifferenceOpSpec, DistinctOpSpec, ElapsedOpSpec, IntegralOpSpec, MovingAverageOpSpec,
    OperationSpec, PercentileOpSpec, SampleOpSpec, SelectorConfig, TopBottomOpSpec,
};
use crate::transpiler::catalog::Function;
use crate::transpiler::time_range::Interval;

/// Operators for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct CallPlan {
    /// Per-window reductions, applied inside the `GROUP BY` windows.
    pub reduce: Vec<OperationSpec>,
    /// Applied after the windows are merged back together.
    pub transform: Vec<OperationSpec>,
    /// Column holding the result.
    pub column: String,
}

impl CallPlan {
    fn over(column: &str) -> Self {
        CallPlan {
            reduce: Vec::new(),
            transform: Vec::new(),
            column: column.to_string(),
        }
    }

    fn reduce(mut self, spec: OperationSpec) -> Self {
        self.reduce.push(spec);
        self
    }

    fn transform(mut self, spec: OperationSpec) -> Self {
        self.transform.push(spec);
        self
    }
}

/// Plan `call`, whose innermost field is read from `column`.
pub fn plan_call(call: &Expr, column: &str, interval: Option<Interval>) -> Result<CallPlan> {
    let Some((name, args)) = call.as_call() else {
        return Ok(CallPlan::over(column));
    };
    let function = Function::from_name(name)
        .ok_or_else(|| UnsupportedError::UndefinedFunction(name.to_string()))?;

    let aggregate = || AggregateConfig::on(column);
    let selector = || SelectorConfig {
        column: column.to_string(),
    };
    let columns = |plan: &CallPlan| vec![plan.column.clone()];

    let plan = match function {
        Function::Count => match args.first() {
            Some(inner) if inner.as_call().is_some_and(|(name, _)| name == "distinct") => {
                CallPlan::over(DEFAULT_VALUE_COLUMN)
                    .reduce(OperationSpec::Distinct(DistinctOpSpec {
                        column: column.to_string(),
                    }))
                    .reduce(OperationSpec::Count(AggregateConfig::on(DEFAULT_VALUE_COLUMN)))
            }
            _ => CallPlan::over(column).reduce(OperationSpec::Count(aggregate())),
        },
        Function::Sum => CallPlan::over(column).reduce(OperationSpec::Sum(aggregate())),
        Function::Mean => CallPlan::over(column).reduce(OperationSpec::Mean(aggregate())),
        Function::Stddev => CallPlan::over(column).reduce(OperationSpec::Stddev(aggregate())),
        Function::Spread => CallPlan::over(column).reduce(OperationSpec::Spread(aggregate())),
        Function::Median => CallPlan::over(column).reduce(OperationSpec::Percentile(
            PercentileOpSpec {
                percentile: 0.5,
                method: "exact_mean".to_string(),
                aggregate: aggregate(),
            },
        )),
        Function::Percentile => {
            let percentile = match args.get(1) {
                Some(Expr::Integer(n)) => *n as f64,
                Some(Expr::Number(n)) => *n,
                _ => return Err(ArgumentTypeError::PercentileNumber.into()),
            };
            CallPlan::over(column).reduce(OperationSpec::Percentile(PercentileOpSpec {
                percentile: percentile / 100.0,
                method: "exact_selector".to_string(),
                aggregate: aggregate(),
            }))
        }
        Function::Integral => {
            let unit = duration_arg(&args, Duration::from_nanos(SECOND));
            CallPlan::over(column).reduce(OperationSpec::Integral(IntegralOpSpec {
                unit,
                aggregate: aggregate(),
            }))
        }
        Function::First => CallPlan::over(column).reduce(OperationSpec::First(selector())),
        Function::Last => CallPlan::over(column).reduce(OperationSpec::Last(selector())),
        Function::Min => CallPlan::over(column).reduce(OperationSpec::Min(selector())),
        Function::Max => CallPlan::over(column).reduce(OperationSpec::Max(selector())),
        Function::Sample => {
            let Some(Expr::Integer(n)) = args.get(1) else {
                return Err(ArgumentTypeError::SampleInteger.into());
            };
            CallPlan::over(column).reduce(OperationSpec::Sample(SampleOpSpec {
                n: *n,
                pos: -1,
                column: column.to_string(),
            }))
        }
        Function::Top | Function::Bottom => {
            let n = match args.last() {
                Some(Expr::Integer(n)) => *n,
                found => {
                    return Err(ArgumentTypeError::SelectorLimit {
                        name: name.to_string(),
                        found: found.cloned().unwrap_or(Expr::Nil),
                    }
                    .into());
                }
            };
            let spec = TopBottomOpSpec {
                n,
                columns: vec![column.to_string()],
            };
            let spec = match function {
                Function::Top => OperationSpec::Top(spec),
                _ => OperationSpec::Bottom(spec),
            };
            CallPlan::over(column).reduce(spec)
        }
        Function::Distinct => {
            CallPlan::over(DEFAULT_VALUE_COLUMN).reduce(OperationSpec::Distinct(DistinctOpSpec {
                column: column.to_string(),
            }))
        }
        Function::Derivative | Function::NonNegativeDerivative => {
            let inner = inner_plan(&args, column, interval)?;
            let fallback = interval
                .map(|interval| interval.every)
                .unwrap_or(Duration::from_nanos(SECOND));
            let spec = DerivativeOpSpec {
                unit: duration_arg(&args, fallback),
                non_negative: function == Function::NonNegativeDerivative,
                columns: columns(&inner),
                time_col: DEFAULT_TIME_COLUMN.to_string(),
            };
            inner.transform(OperationSpec::Derivative(spec))
        }
        Function::Difference | Function::NonNegativeDifference => {
            let inner = inner_plan(&args, column, interval)?;
            let spec = DifferenceOpSpec {
                non_negative: function == Function::NonNegativeDifference,
                columns: columns(&inner),
            };
            inner.transform(OperationSpec::Difference(spec))
        }
        Function::CumulativeSum => {
            let inner = inner_plan(&args, column, interval)?;
            let spec = ColumnsOpSpec {
                columns: columns(&inner),
            };
            inner.transform(OperationSpec::CumulativeSum(spec))
        }
        Function::MovingAverage => {
            let Some(Expr::Integer(n)) = args.get(1) else {
                return Err(ArgumentTypeError::MovingAverageInteger(
                    args.get(1).map_or("NilLiteral", Expr::node_name),
                )
                .into());
            };
            let inner = inner_plan(&args, column, interval)?;
            let spec = MovingAverageOpSpec {
                n: *n,
                columns: columns(&inner),
            };
            inner.transform(OperationSpec::MovingAverage(spec))
        }
        Function::Elapsed => {
            let mut inner = inner_plan(&args, column, interval)?;
            inner.column = "elapsed".to_string();
            inner.transform(OperationSpec::Elapsed(ElapsedOpSpec {
                unit: duration_arg(&args, Duration::from_nanos(NANOSECOND)),
                time_col: DEFAULT_TIME_COLUMN.to_string(),
                column_name: "elapsed".to_string(),
            }))
        }
        Function::Mode | Function::HoltWinters | Function::HoltWintersWithFit => {
            return Err(TranspileError::unimplemented(function.name()));
        }
    };
    Ok(plan)
}

/// Plan of a transformation's first argument: a nested call, or the field
/// itself.
fn inner_plan(args: &[Expr], column: &str, interval: Option<Interval>) -> Result<CallPlan> {
    match args.first() {
        Some(inner) if inner.as_call().is_some() => plan_call(inner, column, interval),
        _ => Ok(CallPlan::over(column)),
    }
}

fn duration_arg(args: &[Expr], default: Duration) -> Duration {
    match args.get(1) {
        Some(Expr::Duration(unit)) => *unit,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: Vec<Expr>) -> Expr {
        Expr::call(name, args)
    }

    fn kinds(specs: &[OperationSpec]) -> Vec<&'static str> {
        specs.iter().map(OperationSpec::kind).collect()
    }

    #[test]
    fn aggregates_reduce_in_place() {
        let plan = plan_call(&call("mean", vec![Expr::var("value")]), "_value", None).unwrap();
        assert_eq!(plan.reduce, vec![OperationSpec::Mean(AggregateConfig::on("_value"))]);
        assert!(plan.transform.is_empty());
        assert_eq!(plan.column, "_value");
    }

    #[test]
    fn count_distinct_counts_the_distinct_column() {
        let count = call("count", vec![call("distinct", vec![Expr::var("host")])]);
        let plan = plan_call(&count, "host", None).unwrap();
        assert_eq!(kinds(&plan.reduce), ["distinct", "count"]);
        assert_eq!(plan.reduce[1], OperationSpec::Count(AggregateConfig::on("_value")));
    }

    #[test]
    fn derivative_defaults_to_the_interval() {
        let interval = Interval {
            every: Duration::minutes(1),
            offset: Duration::ZERO,
        };
        let derivative = call("derivative", vec![call("mean", vec![Expr::var("value")])]);
        let plan = plan_call(&derivative, "_value", Some(interval)).unwrap();
        assert_eq!(kinds(&plan.reduce), ["mean"]);
        let OperationSpec::Derivative(spec) = &plan.transform[0] else {
            panic!("expected a derivative");
        };
        assert_eq!(spec.unit, Duration::minutes(1));
        assert!(!spec.non_negative);

        let raw = call("non_negative_derivative", vec![Expr::var("value")]);
        let plan = plan_call(&raw, "_value", None).unwrap();
        assert!(plan.reduce.is_empty());
        let OperationSpec::Derivative(spec) = &plan.transform[0] else {
            panic!("expected a derivative");
        };
        assert_eq!(spec.unit, Duration::seconds(1));
        assert!(spec.non_negative);
    }

    #[test]
    fn percentile_and_median() {
        let p = call("percentile", vec![Expr::var("value"), Expr::Integer(90)]);
        let OperationSpec::Percentile(spec) = &plan_call(&p, "_value", None).unwrap().reduce[0]
        else {
            panic!("expected a percentile");
        };
        assert_eq!(spec.percentile, 0.9);
        assert_eq!(spec.method, "exact_selector");

        let median = call("median", vec![Expr::var("value")]);
        let OperationSpec::Percentile(spec) = &plan_call(&median, "_value", None).unwrap().reduce[0]
        else {
            panic!("expected a percentile");
        };
        assert_eq!(spec.percentile, 0.5);
        assert_eq!(spec.method, "exact_mean");
    }

    #[test]
    fn elapsed_writes_its_own_column() {
        let elapsed = call("elapsed", vec![Expr::var("value")]);
        let plan = plan_call(&elapsed, "_value", None).unwrap();
        assert_eq!(plan.column, "elapsed");
        assert_eq!(kinds(&plan.transform), ["elapsed"]);
    }

    #[test]
    fn unimplemented_functions() {
        let err = plan_call(&call("mode", vec![Expr::var("value")]), "_value", None).unwrap_err();
        assert!(err.is_unimplemented());
        assert_eq!(err.to_string(), "unimplemented: mode");
    }
}
