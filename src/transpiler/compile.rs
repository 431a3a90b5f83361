//! Semantic validation of a `SELECT` statement.
//!
//! Compiling a statement splits the `time` bounds out of `WHERE`, resolves
//! `GROUP BY`, reduces and checks every field, and recurses into subqueries.
//! The result is everything the graph builder needs and nothing it has to
//! check again.

use crate::ast::{Expr, Fill, Measurement, SelectStatement, SortOrder, Source};
use crate::duration::Duration;
use crate::error::{
    ArgumentTypeError, ArgumentValueError, ArityError, CombinationError, Result, SyntaxError,
    TranspileError, UnsupportedError,
};
use crate::transpiler::catalog::{Function, MathFunction};
use crate::transpiler::columns::column_names;
use crate::transpiler::reduce::reduce;
use crate::transpiler::time_range::{
    Interval, TimeRange, comparison_range, is_time_string, parse_time_string, to_nanos,
};
use chrono::{DateTime, Utc};
use tracing::trace;

/// A validated statement.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStatement {
    /// Non-time fields after constant reduction, with `top`/`bottom` tag
    /// arguments appended as their own fields.
    pub fields: Vec<CompiledField>,
    /// Alias given to a selected `time` field.
    pub time_alias: Option<String>,
    /// Top-level function calls, in field order.
    pub calls: Vec<Expr>,
    /// `WHERE` without its `time` comparisons.
    pub condition: Option<Expr>,
    pub range: TimeRange,
    pub interval: Option<Interval>,
    /// The interval came from an enclosing statement.
    pub interval_inherited: bool,
    /// Tag keys of `GROUP BY`, in order and without duplicates.
    pub tags: Vec<String>,
    pub group_by_wildcard: bool,
    pub group_by_regex: bool,
    pub fill: Fill,
    pub ascending: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub slimit: Option<i64>,
    pub soffset: Option<i64>,
    pub location: Option<String>,
    pub sources: Vec<CompiledSource>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledField {
    pub expr: Expr,
    /// Output column name, unique within the statement.
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompiledSource {
    Measurement(Measurement),
    Subquery(Box<CompiledStatement>),
}

/// What a subquery inherits from the statement around it.
#[derive(Debug, Clone, Copy)]
struct Enclosing {
    range: TimeRange,
    interval: Option<Interval>,
    ascending: bool,
}

pub fn compile(stmt: &SelectStatement, now: DateTime<Utc>) -> Result<CompiledStatement> {
    Compiler::new(stmt, now).compile(None)
}

struct Compiler<'a> {
    stmt: &'a SelectStatement,
    now: DateTime<Utc>,

    calls: Vec<Expr>,
    has_aux: bool,
    only_selectors: bool,
    has_distinct: bool,
    top_bottom: Option<String>,

    range: TimeRange,
    condition: Option<Expr>,
    interval: Option<Interval>,
    interval_inherited: bool,
    tags: Vec<String>,
    group_by_wildcard: bool,
    group_by_regex: bool,
}

impl<'a> Compiler<'a> {
    fn new(stmt: &'a SelectStatement, now: DateTime<Utc>) -> Self {
        Compiler {
            stmt,
            now,
            calls: Vec::new(),
            has_aux: false,
            only_selectors: true,
            has_distinct: false,
            top_bottom: None,
            range: TimeRange::default(),
            condition: None,
            interval: None,
            interval_inherited: false,
            tags: Vec::new(),
            group_by_wildcard: false,
            group_by_regex: false,
        }
    }

    fn ascending(&self) -> bool {
        self.stmt.order != Some(SortOrder::Descending)
    }

    fn compile(mut self, enclosing: Option<Enclosing>) -> Result<CompiledStatement> {
        self.preprocess()?;
        if let Some(outer) = enclosing {
            if self.stmt.order.is_some() && self.ascending() != outer.ascending {
                return Err(SyntaxError::SubqueryOrder.into());
            }
            self.range = self.range.intersect(outer.range);
            if self.interval.is_none() && outer.interval.is_some() {
                self.interval = outer.interval;
                self.interval_inherited = true;
            }
        }

        let (time_alias, fields) = self.compile_fields()?;
        self.validate_fields(&fields)?;

        let names = column_names(time_alias.as_deref(), &fields);
        let fields: Vec<CompiledField> = fields
            .into_iter()
            .zip(names)
            .map(|((expr, _), name)| CompiledField { expr, name })
            .collect();

        let ascending = self.ascending();
        let nested = Enclosing {
            range: self.range,
            interval: self.interval,
            ascending,
        };
        let mut sources = Vec::with_capacity(self.stmt.sources.len());
        for source in &self.stmt.sources {
            sources.push(match source {
                Source::Measurement(m) => CompiledSource::Measurement(m.clone()),
                Source::Subquery(inner) => {
                    let inner = Compiler::new(inner, self.now).compile(Some(nested))?;
                    CompiledSource::Subquery(Box::new(inner))
                }
            });
        }

        trace!(
            fields = fields.len(),
            calls = self.calls.len(),
            interval = ?self.interval,
            "compiled statement"
        );

        Ok(CompiledStatement {
            fields,
            time_alias,
            calls: self.calls,
            condition: self.condition,
            range: self.range,
            interval: self.interval,
            interval_inherited: self.interval_inherited,
            tags: self.tags,
            group_by_wildcard: self.group_by_wildcard,
            group_by_regex: self.group_by_regex,
            fill: self.stmt.fill.clone(),
            ascending,
            limit: self.stmt.limit,
            offset: self.stmt.offset,
            slimit: self.stmt.slimit,
            soffset: self.stmt.soffset,
            location: self.stmt.location.clone(),
            sources,
        })
    }

    // ---------------------------------------------------------------
    // Condition and dimensions
    // ---------------------------------------------------------------

    fn preprocess(&mut self) -> Result<()> {
        if let Some(condition) = &self.stmt.condition {
            let reduced = reduce(condition, self.now);
            let (range, rest) = split_condition(&reduced)?;
            if let Some(rest) = &rest {
                validate_condition(rest)?;
            }
            self.range = range;
            self.condition = rest;
        }
        self.compile_dimensions()
    }

    fn compile_dimensions(&mut self) -> Result<()> {
        for dimension in &self.stmt.dimensions {
            match &dimension.expr {
                Expr::VarRef { name, .. } => {
                    if dimension.expr.is_time_ref() {
                        return Err(SyntaxError::TimeWithoutCall.into());
                    }
                    if !self.tags.contains(name) {
                        self.tags.push(name.clone());
                    }
                }
                Expr::Call { name, args } => {
                    if name != "time" {
                        return Err(SyntaxError::OnlyTimeCalls.into());
                    }
                    if args.is_empty() || args.len() > 2 {
                        return Err(SyntaxError::TimeDimensionArity.into());
                    }
                    let every = match reduce(&args[0], self.now) {
                        Expr::Duration(d) if d.is_positive() => d,
                        _ => return Err(SyntaxError::TimeDimensionDuration.into()),
                    };
                    if self.interval.is_some() {
                        return Err(SyntaxError::MultipleTimeDimensions.into());
                    }
                    let offset = match args.get(1) {
                        Some(arg) => self.dimension_offset(arg, every)?,
                        None => Duration::ZERO,
                    };
                    self.interval = Some(Interval { every, offset });
                }
                Expr::Wildcard => self.group_by_wildcard = true,
                Expr::Regex(_) => self.group_by_regex = true,
                _ => return Err(SyntaxError::InvalidDimension.into()),
            }
        }
        Ok(())
    }

    fn dimension_offset(&self, arg: &Expr, every: Duration) -> Result<Duration> {
        let instant = |time: DateTime<Utc>| {
            to_nanos(time)
                .map(|nanos| Duration::from_nanos(nanos).rem_euclid(every))
                .ok_or(SyntaxError::OffsetType)
        };
        let offset = match reduce(arg, self.now) {
            Expr::Duration(d) => d.rem_euclid(every),
            Expr::Time(time) => instant(time)?,
            Expr::String(s) if is_time_string(&s) => {
                let time = parse_time_string(&s).ok_or(SyntaxError::InvalidTimeLiteral(s))?;
                instant(time)?
            }
            Expr::Call { name, .. } if name == "now" => {
                return Err(SyntaxError::OffsetNowArguments.into());
            }
            Expr::Call { .. } => return Err(SyntaxError::OffsetFunction.into()),
            _ => return Err(SyntaxError::OffsetType.into()),
        };
        Ok(offset)
    }

    // ---------------------------------------------------------------
    // Fields
    // ---------------------------------------------------------------

    /// Reduce and check each field. Returns the `time` alias and the
    /// remaining fields with their aliases.
    #[allow(clippy::type_complexity)]
    fn compile_fields(&mut self) -> Result<(Option<String>, Vec<(Expr, Option<String>)>)> {
        let mut time_alias = None;
        let mut fields = Vec::new();
        for field in &self.stmt.fields {
            if matches!(&field.expr, Expr::VarRef { name, .. } if name == "time") {
                time_alias = field.alias.clone();
                continue;
            }
            let expr = reduce(&field.expr, self.now);
            self.compile_expr(&expr)?;

            let tag_args = selector_tags(&expr);
            fields.push((expr, field.alias.clone()));
            fields.extend(tag_args.into_iter().map(|tag| (tag, None)));
        }
        Ok((time_alias, fields))
    }

    fn compile_expr(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::VarRef { .. } | Expr::Wildcard | Expr::Regex(_) => {
                self.has_aux = true;
                Ok(())
            }
            Expr::Call { name, args } => {
                if let Some(math) = MathFunction::from_name(name) {
                    return self.compile_math(math, args);
                }
                self.calls.push(expr.clone());
                self.compile_function(name, args)
            }
            Expr::Distinct(field) => {
                self.calls.push(expr.clone());
                self.compile_distinct(&[Expr::var(field.clone())], false)
            }
            Expr::Binary { lhs, rhs, .. } => {
                for side in [lhs, rhs] {
                    match side.as_ref() {
                        Expr::Wildcard => return Err(SyntaxError::WildcardInBinary.into()),
                        Expr::Regex(_) => return Err(SyntaxError::RegexInBinary.into()),
                        side if side.is_literal() => {}
                        side => self.compile_expr(side)?,
                    }
                }
                Ok(())
            }
            Expr::Paren(inner) => self.compile_expr(inner),
            _ => Err(SyntaxError::FieldWithoutVariable.into()),
        }
    }

    fn compile_math(&mut self, math: MathFunction, args: &[Expr]) -> Result<()> {
        exact_arity(math.name(), math.arity(), args)?;
        for arg in args.iter().filter(|arg| !arg.is_literal()) {
            self.compile_expr(arg)?;
        }
        Ok(())
    }

    fn compile_function(&mut self, name: &str, args: &[Expr]) -> Result<()> {
        let function = Function::from_name(name)
            .ok_or_else(|| UnsupportedError::UndefinedFunction(name.to_string()))?;
        match function {
            Function::Max | Function::Min | Function::First | Function::Last => {
                exact_arity(name, 1, args)?;
                // Over several fields there is no single row to select.
                if matches!(args[0], Expr::Wildcard | Expr::Regex(_)) {
                    self.only_selectors = false;
                }
                compile_symbol(name, &args[0])
            }
            Function::Count => {
                self.only_selectors = false;
                exact_arity(name, 1, args)?;
                match &args[0] {
                    Expr::Call { name, args } if name == "distinct" => {
                        self.compile_distinct(args, true)
                    }
                    Expr::Distinct(field) => {
                        self.compile_distinct(&[Expr::var(field.clone())], true)
                    }
                    arg => compile_symbol(name, arg),
                }
            }
            Function::Sum
            | Function::Mean
            | Function::Median
            | Function::Mode
            | Function::Stddev
            | Function::Spread => {
                self.only_selectors = false;
                exact_arity(name, 1, args)?;
                compile_symbol(name, &args[0])
            }
            Function::Percentile => {
                exact_arity(name, 2, args)?;
                if !matches!(args[1], Expr::Integer(_) | Expr::Number(_)) {
                    return Err(ArgumentTypeError::PercentileNumber.into());
                }
                compile_symbol(name, &args[0])
            }
            Function::Sample => {
                exact_arity(name, 2, args)?;
                let Expr::Integer(n) = args[1] else {
                    return Err(ArgumentTypeError::SampleInteger.into());
                };
                if n <= 1 {
                    return Err(ArgumentValueError::SampleWindow(n).into());
                }
                compile_symbol(name, &args[0])
            }
            Function::Distinct => self.compile_distinct(args, false),
            Function::Top | Function::Bottom => self.compile_top_bottom(name, args),
            Function::Derivative | Function::NonNegativeDerivative | Function::Elapsed => {
                between_arity(name, 1, 2, args)?;
                if let Some(unit) = args.get(1) {
                    positive_duration(name, unit)?;
                }
                self.only_selectors = false;
                self.compile_transformation(name, &args[0])
            }
            Function::Difference | Function::NonNegativeDifference | Function::CumulativeSum => {
                exact_arity(name, 1, args)?;
                self.only_selectors = false;
                self.compile_transformation(name, &args[0])
            }
            Function::MovingAverage => {
                exact_arity(name, 2, args)?;
                let n = match &args[1] {
                    Expr::Integer(n) => *n,
                    other => {
                        return Err(ArgumentTypeError::MovingAverageInteger(other.node_name()).into());
                    }
                };
                if n <= 1 {
                    return Err(ArgumentValueError::MovingAverageWindow(n).into());
                }
                self.only_selectors = false;
                self.compile_transformation(name, &args[0])
            }
            Function::Integral => {
                between_arity(name, 1, 2, args)?;
                if let Some(unit) = args.get(1) {
                    let Expr::Duration(d) = unit else {
                        return Err(ArgumentTypeError::IntegralDuration.into());
                    };
                    if !d.is_positive() {
                        return Err(ArgumentValueError::NonPositiveDuration(*d).into());
                    }
                }
                self.only_selectors = false;
                compile_symbol(name, &args[0])
            }
            Function::HoltWinters | Function::HoltWintersWithFit => {
                exact_arity(name, 3, args)?;
                let Expr::Integer(periods) = args[1] else {
                    return Err(ArgumentTypeError::HoltWintersPeriods(name.to_string()).into());
                };
                if periods <= 0 {
                    return Err(ArgumentValueError::HoltWintersPeriods {
                        name: name.to_string(),
                        value: periods,
                    }
                    .into());
                }
                let Expr::Integer(seasonal) = args[2] else {
                    return Err(ArgumentTypeError::HoltWintersSeasonal(name.to_string()).into());
                };
                if seasonal < 0 {
                    return Err(ArgumentValueError::HoltWintersSeasonal {
                        name: name.to_string(),
                        value: seasonal,
                    }
                    .into());
                }
                self.only_selectors = false;
                if args[0].as_call().is_none() {
                    return Err(ArgumentTypeError::MustUseAggregate(name.to_string()).into());
                }
                if self.interval.is_none() {
                    return Err(ArgumentValueError::IntervalRequired(name.to_string()).into());
                }
                self.compile_nested(&args[0])
            }
        }
    }

    /// The first argument of a transformation: a nested aggregate when the
    /// statement is windowed, a plain field otherwise.
    fn compile_transformation(&mut self, name: &str, arg: &Expr) -> Result<()> {
        if arg.as_call().is_some() {
            if self.interval.is_none() {
                return Err(ArgumentValueError::IntervalRequired(name.to_string()).into());
            }
            return self.compile_nested(arg);
        }
        if self.interval.is_some() {
            return Err(ArgumentTypeError::AggregateRequired(name.to_string()).into());
        }
        compile_symbol(name, arg)
    }

    fn compile_nested(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Call { name, args } if name == "distinct" => self.compile_distinct(args, true),
            Expr::Distinct(field) => self.compile_distinct(&[Expr::var(field.clone())], true),
            Expr::Call { name, args } => self.compile_function(name, args),
            other => self.compile_expr(other),
        }
    }

    fn compile_distinct(&mut self, args: &[Expr], nested: bool) -> Result<()> {
        match args {
            [] => return Err(ArityError::DistinctMissing.into()),
            [Expr::VarRef { .. }] => {}
            [_] => return Err(ArgumentTypeError::ExpectedField("distinct".into()).into()),
            _ => return Err(ArityError::DistinctTooMany.into()),
        }
        if !nested {
            self.has_distinct = true;
        }
        self.only_selectors = false;
        Ok(())
    }

    fn compile_top_bottom(&mut self, name: &str, args: &[Expr]) -> Result<()> {
        if let Some(prior) = &self.top_bottom {
            return Err(CombinationError::SelectorCombined(prior.clone()).into());
        }
        if args.len() < 2 {
            return Err(ArityError::AtLeast {
                name: name.to_string(),
                min: 2,
                got: args.len(),
            }
            .into());
        }

        let last = &args[args.len() - 1];
        let Expr::Integer(limit) = *last else {
            return Err(ArgumentTypeError::SelectorLimit {
                name: name.to_string(),
                found: last.clone(),
            }
            .into());
        };
        if limit <= 0 {
            return Err(ArgumentValueError::SelectorLimitTooSmall {
                name: name.to_string(),
                limit,
            }
            .into());
        }
        if let Some(statement_limit) = self.stmt.limit.filter(|n| *n > 0) {
            if limit > statement_limit {
                return Err(ArgumentValueError::SelectorLimitTooLarge {
                    name: name.to_string(),
                    limit,
                    statement_limit,
                }
                .into());
            }
        }

        if !matches!(args[0], Expr::VarRef { .. }) {
            return Err(ArgumentTypeError::SelectorField {
                name: name.to_string(),
                found: args[0].clone(),
            }
            .into());
        }
        if let Some(found) = args[1..args.len() - 1]
            .iter()
            .find(|arg| !matches!(arg, Expr::VarRef { .. }))
        {
            return Err(ArgumentTypeError::SelectorTag {
                name: name.to_string(),
                found: found.clone(),
            }
            .into());
        }

        self.top_bottom = Some(name.to_string());
        Ok(())
    }

    fn validate_fields(&self, fields: &[(Expr, Option<String>)]) -> Result<()> {
        if fields.is_empty() {
            return Err(SyntaxError::NoFields.into());
        }
        if self.calls.len() > 1 {
            if let Some(name) = &self.top_bottom {
                return Err(CombinationError::SelectorCombined(name.clone()).into());
            }
        }
        if self.calls.is_empty() {
            if matches!(self.stmt.fill, Fill::None | Fill::Linear) {
                return Err(SyntaxError::FillWithoutFunction(self.stmt.fill.clone()).into());
            }
            if self.interval.is_some() && !self.interval_inherited {
                return Err(SyntaxError::GroupByWithoutAggregate.into());
            }
        }
        if self.has_distinct && (self.calls.len() != 1 || self.has_aux) {
            return Err(CombinationError::DistinctCombined.into());
        }
        if self.has_aux {
            if !self.only_selectors {
                return Err(CombinationError::MixedAggregate.into());
            }
            if self.calls.len() > 1 {
                return Err(CombinationError::MultipleSelectors.into());
            }
        }
        Ok(())
    }
}

/// `time` comparisons become a range; everything else stays a condition.
fn split_condition(expr: &Expr) -> Result<(TimeRange, Option<Expr>)> {
    match expr {
        Expr::Binary { op, lhs, rhs } if op.is_logical() => {
            let (lhs_range, lhs) = split_condition(lhs)?;
            let (rhs_range, rhs) = split_condition(rhs)?;
            let rest = match (lhs, rhs) {
                (Some(lhs), Some(rhs)) => Some(Expr::binary(*op, lhs, rhs)),
                (lhs, rhs) => lhs.or(rhs),
            };
            Ok((lhs_range.intersect(rhs_range), rest))
        }
        Expr::Binary { op, lhs, rhs } if op.is_comparison() => {
            if lhs.is_time_ref() {
                Ok((comparison_range(*op, rhs)?, None))
            } else if rhs.is_time_ref() {
                Ok((comparison_range(op.mirrored(), lhs)?, None))
            } else {
                Ok((TimeRange::default(), Some(expr.clone())))
            }
        }
        Expr::Binary { op, .. } if op.is_regex() => Ok((TimeRange::default(), Some(expr.clone()))),
        Expr::Paren(inner) => {
            let (range, rest) = split_condition(inner)?;
            Ok((range, rest.map(|rest| Expr::Paren(Box::new(rest)))))
        }
        Expr::Boolean(_) => Ok((TimeRange::default(), Some(expr.clone()))),
        other => Err(SyntaxError::InvalidCondition(other.clone()).into()),
    }
}

/// Only math functions may be called inside a condition.
fn validate_condition(expr: &Expr) -> Result<()> {
    match expr {
        Expr::Binary { lhs, rhs, .. } => {
            validate_condition(lhs)?;
            validate_condition(rhs)
        }
        Expr::Paren(inner) => validate_condition(inner),
        Expr::Call { name, args } => {
            let Some(math) = MathFunction::from_name(name) else {
                return Err(SyntaxError::InvalidConditionCall(expr.clone()).into());
            };
            exact_arity(name, math.arity(), args)?;
            args.iter().try_for_each(validate_condition)
        }
        Expr::Distinct(_) => Err(SyntaxError::InvalidConditionCall(expr.clone()).into()),
        _ => Ok(()),
    }
}

fn compile_symbol(name: &str, arg: &Expr) -> Result<()> {
    match arg {
        Expr::VarRef { .. } | Expr::Wildcard | Expr::Regex(_) => Ok(()),
        _ => Err(ArgumentTypeError::ExpectedField(name.to_string()).into()),
    }
}

fn exact_arity(name: &str, expected: usize, args: &[Expr]) -> Result<()> {
    if args.len() != expected {
        return Err(ArityError::Exact {
            name: name.to_string(),
            expected,
            got: args.len(),
        }
        .into());
    }
    Ok(())
}

fn between_arity(name: &str, min: usize, max: usize, args: &[Expr]) -> Result<()> {
    if args.len() < min || args.len() > max {
        return Err(ArityError::Between {
            name: name.to_string(),
            min,
            max,
            got: args.len(),
        }
        .into());
    }
    Ok(())
}

fn positive_duration(name: &str, arg: &Expr) -> Result<()> {
    match arg {
        Expr::Duration(d) if d.is_positive() => Ok(()),
        Expr::Duration(d) => Err(ArgumentValueError::NonPositiveDuration(*d).into()),
        other => Err(TranspileError::from(ArgumentTypeError::Duration {
            name: name.to_string(),
            node: other.node_name(),
        })),
    }
}

/// Tag arguments of `top(field, tag..., n)` and `bottom(...)`, which become
/// output columns of their own.
fn selector_tags(expr: &Expr) -> Vec<Expr> {
    match expr {
        Expr::Call { name, args } if (name == "top" || name == "bottom") && args.len() > 2 => {
            args[1..args.len() - 1].to_vec()
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinOp;
    use crate::parser::parse_query;

    fn now() -> DateTime<Utc> {
        "2010-09-15T09:00:00Z".parse().unwrap()
    }

    fn compiled(text: &str) -> Result<CompiledStatement> {
        let query = parse_query(text).unwrap();
        compile(&query.statements[0], now())
    }

    #[test]
    fn splits_time_out_of_the_condition() {
        let stmt =
            compiled("SELECT value FROM cpu WHERE time >= now() - 10m AND host = 'a'").unwrap();
        assert_eq!(
            stmt.range.min,
            Some("2010-09-15T08:50:00Z".parse().unwrap())
        );
        assert_eq!(stmt.range.max, None);
        assert_eq!(
            stmt.condition,
            Some(Expr::binary(
                BinOp::Equal,
                Expr::var("host"),
                Expr::String("a".into())
            ))
        );
    }

    #[test]
    fn time_on_the_right_is_mirrored() {
        let stmt = compiled("SELECT value FROM cpu WHERE now() - 1h < time").unwrap();
        assert_eq!(stmt.range.min, Some("2010-09-15T08:00:00.000000001Z".parse().unwrap()));
        assert_eq!(stmt.condition, None);
    }

    #[test]
    fn resolves_interval_and_offset() {
        let stmt = compiled("SELECT max(value) FROM cpu GROUP BY time(10s, 25s), host, host").unwrap();
        assert_eq!(
            stmt.interval,
            Some(Interval {
                every: Duration::seconds(10),
                offset: Duration::seconds(5),
            })
        );
        assert_eq!(stmt.tags, vec!["host".to_string()]);
    }

    #[test]
    fn subquery_inherits_interval_and_range() {
        let stmt = compiled(
            "SELECT max(value) FROM (SELECT value + total FROM cpu) WHERE time >= now() - 1m GROUP BY time(10s)",
        )
        .unwrap();
        let CompiledSource::Subquery(inner) = &stmt.sources[0] else {
            panic!("expected a subquery");
        };
        assert!(inner.interval_inherited);
        assert_eq!(inner.range, stmt.range);
        assert_eq!(inner.fields[0].name, "value_total");
    }

    #[test]
    fn top_tags_become_fields() {
        let stmt = compiled("SELECT top(value, host, 1) FROM cpu").unwrap();
        let names: Vec<_> = stmt.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["top", "host"]);
        assert_eq!(stmt.calls.len(), 1);
    }

    #[test]
    fn time_field_alias_is_kept() {
        let stmt = compiled("SELECT time AS t, value FROM cpu").unwrap();
        assert_eq!(stmt.time_alias.as_deref(), Some("t"));
        assert_eq!(stmt.fields.len(), 1);
    }

    #[test]
    fn reports_first_failure() {
        let err = compiled("SELECT value FROM cpu WHERE time != now()").unwrap_err();
        assert_eq!(err.to_string(), "invalid time comparison operator: !=");
        let err = compiled("SELECT value FROM cpu WHERE mean(value) > 1").unwrap_err();
        assert_eq!(err.to_string(), "invalid function call in condition: mean(value)");
    }

    #[test]
    fn wildcard_selectors_do_not_mix_with_tags() {
        assert!(compiled("SELECT max(value), host FROM cpu").is_ok());
        assert!(compiled("SELECT max(*) FROM cpu").is_ok());
        let err = compiled("SELECT max(*), host FROM cpu").unwrap_err();
        assert_eq!(err, TranspileError::Combination(CombinationError::MixedAggregate));
    }
}
