//! Operator graph construction for compiled statements.
//!
//! Every field reference gets its own `from → range → filter` branch. The
//! branches of one call are joined, filtered by the remaining condition and
//! grouped, then the call's operators are appended. Separate calls are
//! joined once more before the final projection.

use crate::ast::{DataType, Expr, Fill, MeasurementName};
use crate::config::Config;
use crate::duration::Duration;
use crate::error::{CombinationError, Result, SyntaxError, TranspileError};
use crate::semantic::{Expression, LogicalOperator, Operator, Property};
use crate::spec::{
    DEFAULT_TIME_COLUMN, DEFAULT_VALUE_COLUMN, Edge, FillOpSpec, FillValue, FilterOpSpec,
    FromOpSpec, GroupOpSpec, JoinOpSpec, LimitOpSpec, MapOpSpec, Operation, OperationId,
    OperationSpec, RangeOpSpec, SortOpSpec, Spec, WindowOpSpec, YieldOpSpec,
};
use crate::transpiler::catalog::{Function, MathFunction};
use crate::transpiler::compile::{CompiledSource, CompiledStatement};
use crate::transpiler::cursor::{Cursor, symbol_key};
use crate::transpiler::functions::plan_call;
use crate::transpiler::lower::{ROW, lower_condition, lower_field};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, debug_span, trace};

/// Parameter name of the join lambda.
const TABLES: &str = "tables";

/// Hands out `<kind><n>` IDs, counting per kind across the whole spec.
#[derive(Debug, Default)]
struct IdAllocator {
    counters: HashMap<&'static str, usize>,
}

impl IdAllocator {
    fn next(&mut self, kind: &'static str) -> OperationId {
        let counter = self.counters.entry(kind).or_default();
        let id = OperationId::new(format!("{kind}{counter}"));
        *counter += 1;
        id
    }
}

/// Accumulates the operations and edges of one query.
pub struct SpecBuilder<'c> {
    config: &'c Config,
    now: DateTime<Utc>,
    ids: IdAllocator,
    spec: Spec,
}

impl<'c> SpecBuilder<'c> {
    pub fn new(config: &'c Config, now: DateTime<Utc>) -> Self {
        SpecBuilder {
            config,
            now,
            ids: IdAllocator::default(),
            spec: Spec::default(),
        }
    }

    /// Append an operation fed by `parents`, in order.
    pub fn add(&mut self, spec: OperationSpec, parents: &[OperationId]) -> OperationId {
        let id = self.ids.next(spec.kind());
        trace!(id = %id, kind = spec.kind(), parents = parents.len(), "add operation");
        for parent in parents {
            self.spec.edges.push(Edge {
                parent: parent.clone(),
                child: id.clone(),
            });
        }
        self.spec.operations.push(Operation {
            id: id.clone(),
            spec,
        });
        id
    }

    fn then(&mut self, parent: &OperationId, spec: OperationSpec) -> OperationId {
        self.add(spec, std::slice::from_ref(parent))
    }

    /// Build one top-level statement and yield its result under `name`.
    pub fn statement(&mut self, stmt: &CompiledStatement, name: String) -> Result<()> {
        let _span = debug_span!("statement", name = %name).entered();
        let last = StatementBuilder::new(self, stmt, 0).build()?;
        self.then(&last, OperationSpec::Yield(YieldOpSpec { name }));
        Ok(())
    }

    pub fn finish(self) -> Spec {
        self.spec
    }
}

/// Fields that share one pipeline: a call with the plain references selected
/// next to it, or the plain references of a raw query.
#[derive(Debug)]
struct Group<'s> {
    call: Option<&'s Expr>,
    refs: Vec<&'s Expr>,
}

/// Builds one statement. Subqueries get a builder of their own, one level
/// deeper, the first time the enclosing statement reads from them.
struct StatementBuilder<'b, 'c, 's> {
    spec: &'b mut SpecBuilder<'c>,
    stmt: &'s CompiledStatement,
    depth: usize,
    subquery: Option<OperationId>,
}

impl<'b, 'c, 's> StatementBuilder<'b, 'c, 's> {
    fn new(spec: &'b mut SpecBuilder<'c>, stmt: &'s CompiledStatement, depth: usize) -> Self {
        StatementBuilder {
            spec,
            stmt,
            depth,
            subquery: None,
        }
    }

    /// Emit the statement and return the ID of its last operation.
    fn build(mut self) -> Result<OperationId> {
        self.check_supported()?;

        let groups = self.groups()?;
        debug!(depth = self.depth, groups = groups.len(), "building statement");

        let mut cursors = Vec::with_capacity(groups.len());
        for group in &groups {
            cursors.push(self.group_cursor(group)?);
        }
        let cursor = if cursors.len() > 1 {
            self.join(cursors)?
        } else {
            cursors.pop().ok_or(SyntaxError::NoFields)?
        };

        let mut last = self.project(&cursor)?;
        let time_key = self.time_key();
        if !self.stmt.ascending {
            last = self.spec.then(
                &last,
                OperationSpec::Sort(SortOpSpec {
                    columns: vec![time_key.to_string()],
                    desc: true,
                }),
            );
        }
        let limit = self.stmt.limit.filter(|n| *n > 0);
        let offset = self.stmt.offset.filter(|n| *n > 0);
        if limit.is_some() || offset.is_some() {
            last = self.spec.then(
                &last,
                OperationSpec::Limit(LimitOpSpec {
                    n: limit.unwrap_or(i64::MAX),
                    offset: offset.unwrap_or(0),
                }),
            );
        }
        Ok(last)
    }

    fn check_supported(&self) -> Result<()> {
        let stmt = self.stmt;
        if stmt.sources.len() != 1 {
            return Err(TranspileError::unimplemented("multiple sources"));
        }
        if let CompiledSource::Measurement(measurement) = &stmt.sources[0] {
            if let MeasurementName::Regex(_) = measurement.name {
                return Err(TranspileError::unimplemented("regex measurements"));
            }
        }
        if stmt.group_by_wildcard {
            return Err(TranspileError::unimplemented("dimension wildcards"));
        }
        if stmt.group_by_regex {
            return Err(TranspileError::unimplemented("dimension regex wildcards"));
        }
        if stmt.fill == Fill::Linear {
            return Err(TranspileError::unimplemented("fill(linear)"));
        }
        if stmt.slimit.is_some() {
            return Err(TranspileError::unimplemented("SLIMIT"));
        }
        if stmt.soffset.is_some() {
            return Err(TranspileError::unimplemented("SOFFSET"));
        }
        if let Some(zone) = &stmt.location {
            if !matches!(zone.as_str(), "UTC" | "Etc/UTC") {
                return Err(TranspileError::unimplemented(format!("time zone {zone}")));
            }
        }
        Ok(())
    }

    fn time_key(&self) -> &'s str {
        let stmt: &'s CompiledStatement = self.stmt;
        stmt.time_alias.as_deref().unwrap_or(DEFAULT_TIME_COLUMN)
    }

    // ---------------------------------------------------------------
    // Grouping
    // ---------------------------------------------------------------

    fn groups(&self) -> Result<Vec<Group<'s>>> {
        let stmt: &'s CompiledStatement = self.stmt;
        let mut calls = Vec::new();
        let mut refs = Vec::new();
        for field in &stmt.fields {
            collect(&field.expr, &mut calls, &mut refs);
        }

        if refs.is_empty() {
            return Ok(calls
                .into_iter()
                .map(|call| Group {
                    call: Some(call),
                    refs: Vec::new(),
                })
                .collect());
        }
        let call = match calls.as_slice() {
            [] => None,
            [call] => {
                let selector = call
                    .as_call()
                    .and_then(|(name, _)| Function::from_name(name))
                    .is_some_and(Function::is_selector);
                if !selector {
                    return Err(CombinationError::MixedAggregate.into());
                }
                Some(*call)
            }
            _ => return Err(CombinationError::MultipleSelectors.into()),
        };
        Ok(vec![Group { call, refs }])
    }

    fn group_cursor(&mut self, group: &Group<'s>) -> Result<Cursor> {
        let Some(call) = group.call else {
            if group.refs.len() > 1 && group.refs.iter().any(|r| is_field_set(r)) {
                return Err(TranspileError::unimplemented(
                    "mixing wildcards with named fields",
                ));
            }
            let mut cursors = Vec::with_capacity(group.refs.len());
            for field in &group.refs {
                cursors.push(self.field_cursor(field)?);
            }
            return self.pipeline(cursors);
        };
        if group.refs.iter().any(|r| is_field_set(r)) {
            return Err(TranspileError::unimplemented(
                "wildcards alongside a selector",
            ));
        }

        let field = call_field(call).ok_or_else(|| SyntaxError::MissingSymbol(call.clone()))?;
        let field_key = symbol_key(&field);
        let source = self.field_cursor(&field)?;
        let input = self.pipeline(vec![source])?;
        let column = input.column(&field_key).unwrap_or(DEFAULT_VALUE_COLUMN);

        let interval = self.stmt.interval;
        let plan = plan_call(call, column, interval)?;
        let windowed = interval.filter(|_| !plan.reduce.is_empty());

        let mut id = input.id.clone();
        if let Some(interval) = windowed {
            let mut window = WindowOpSpec::every(interval.every);
            window.start = interval.start();
            id = self.spec.then(&id, OperationSpec::Window(window));
        }
        for spec in plan.reduce {
            id = self.spec.then(&id, spec);
        }
        if windowed.is_some() {
            if let Some(fill) = fill_spec(&self.stmt.fill, &plan.column) {
                id = self.spec.then(&id, OperationSpec::Fill(fill));
            }
            id = self.spec.then(&id, OperationSpec::Window(WindowOpSpec::every(Duration::MAX)));
        }
        for spec in plan.transform {
            id = self.spec.then(&id, spec);
        }

        let mut cursor = Cursor::new(id).with_symbol(symbol_key(call), plan.column.clone());
        cursor.field_set = input.field_set.clone();
        for field_ref in &group.refs {
            let key = symbol_key(field_ref);
            let column = if key == field_key {
                plan.column.clone()
            } else {
                key.clone()
            };
            cursor.bind(key, column);
        }
        Ok(cursor)
    }

    /// Join field branches, then apply the condition and the grouping key.
    fn pipeline(&mut self, mut cursors: Vec<Cursor>) -> Result<Cursor> {
        let stmt: &'s CompiledStatement = self.stmt;
        if let Some(condition) = &stmt.condition {
            for reference in condition.var_refs() {
                let Expr::VarRef { name, data_type } = reference else {
                    continue;
                };
                let bound = cursors.iter().any(|cursor| cursor.column(name).is_some());
                if !bound && *data_type == Some(DataType::Field) {
                    cursors.push(self.field_cursor(reference)?);
                }
            }
        }

        let mut merged: Vec<Cursor> = Vec::with_capacity(cursors.len());
        for cursor in cursors {
            match merged.iter_mut().find(|existing| existing.id == cursor.id) {
                Some(existing) => existing.merge(cursor),
                None => merged.push(cursor),
            }
        }
        let mut cursor = if merged.len() > 1 {
            self.join(merged)?
        } else {
            merged.pop().ok_or(SyntaxError::NoFields)?
        };

        if let Some(condition) = &stmt.condition {
            let function = Expression::function(ROW, lower_condition(condition, &cursor)?);
            cursor.id = self
                .spec
                .then(&cursor.id, OperationSpec::Filter(FilterOpSpec { function }));
        }
        let by = self.group_keys(cursor.field_set.is_some());
        cursor.id = self
            .spec
            .then(&cursor.id, OperationSpec::Group(GroupOpSpec { by }));
        Ok(cursor)
    }

    fn group_keys(&self, field_set: bool) -> Vec<String> {
        let mut keys = vec!["_measurement".to_string()];
        for tag in &self.stmt.tags {
            if !keys.contains(tag) {
                keys.push(tag.clone());
            }
        }
        if field_set {
            keys.push("_field".to_string());
        }
        keys
    }

    /// Join cursors on the grouping key. Symbols of the `i`th cursor read
    /// `val<i>` afterwards.
    fn join(&mut self, cursors: Vec<Cursor>) -> Result<Cursor> {
        let field_set = match cursors.split_first() {
            Some((first, rest)) if rest.iter().all(|c| c.field_set == first.field_set) => {
                first.field_set.clone()
            }
            _ => None,
        };

        let mut properties = Vec::with_capacity(cursors.len());
        let mut table_names = BTreeMap::new();
        let mut symbols = Vec::new();
        for (i, cursor) in cursors.iter().enumerate() {
            let table = format!("t{i}");
            let value = format!("val{i}");
            table_names.insert(cursor.id.clone(), table.clone());
            properties.push(Property::new(value.clone(), Expression::member(TABLES, table)));
            for (key, _) in cursor.symbols() {
                symbols.push((key.to_string(), value.clone()));
            }
        }

        let parents: Vec<OperationId> = cursors.into_iter().map(|c| c.id).collect();
        let spec = JoinOpSpec {
            on: self.group_keys(field_set.is_some()),
            function: Expression::function(TABLES, Expression::object(properties)),
            table_names,
        };
        let id = self.spec.add(OperationSpec::Join(spec), &parents);

        let mut joined = Cursor::new(id);
        joined.field_set = field_set;
        for (key, column) in symbols {
            joined.bind(key, column);
        }
        Ok(joined)
    }

    // ---------------------------------------------------------------
    // Sources
    // ---------------------------------------------------------------

    /// A cursor reading a single field reference from the statement source.
    fn field_cursor(&mut self, field: &Expr) -> Result<Cursor> {
        let stmt: &'s CompiledStatement = self.stmt;
        let measurement = match &stmt.sources[..] {
            [CompiledSource::Measurement(measurement)] => measurement,
            [CompiledSource::Subquery(inner)] => {
                let Expr::VarRef { name, .. } = field else {
                    return Err(TranspileError::unimplemented("wildcards over subqueries"));
                };
                let id = self.subquery(inner)?;
                return Ok(Cursor::new(id).with_symbol(name.clone(), name.clone()));
            }
            _ => return Err(TranspileError::unimplemented("multiple sources")),
        };
        let MeasurementName::Name(name) = &measurement.name else {
            return Err(TranspileError::unimplemented("regex measurements"));
        };

        let database = measurement
            .database
            .as_deref()
            .filter(|database| !database.is_empty())
            .or(self.spec.config.default_database.as_deref())
            .ok_or(TranspileError::DatabaseRequired)?;
        let retention_policy = measurement
            .retention_policy
            .as_deref()
            .filter(|rp| !rp.is_empty())
            .unwrap_or(self.spec.config.retention_policy());
        let bucket = format!("{database}/{retention_policy}");

        let from = self.spec.add(OperationSpec::From(FromOpSpec { bucket }), &[]);
        let range = RangeOpSpec {
            start: stmt.range.start(),
            stop: stmt.range.stop(stmt.interval.is_some(), self.spec.now),
        };
        let range = self.spec.then(&from, OperationSpec::Range(range));

        let in_measurement = Expression::binary(
            Operator::Equal,
            Expression::member(ROW, "_measurement"),
            Expression::string(name.clone()),
        );
        let (predicate, field_set) = match field {
            Expr::VarRef { name, .. } => {
                let is_field = Expression::binary(
                    Operator::Equal,
                    Expression::member(ROW, "_field"),
                    Expression::string(name.clone()),
                );
                let predicate =
                    Expression::logical(LogicalOperator::And, in_measurement, is_field);
                (predicate, None)
            }
            Expr::Wildcard => (in_measurement, Some(field.to_string())),
            Expr::Regex(pattern) => {
                let matches_field = Expression::binary(
                    Operator::RegexpMatch,
                    Expression::member(ROW, "_field"),
                    Expression::RegexpLiteral {
                        value: pattern.clone(),
                    },
                );
                let predicate =
                    Expression::logical(LogicalOperator::And, in_measurement, matches_field);
                (predicate, Some(field.to_string()))
            }
            other => return Err(SyntaxError::MissingSymbol(other.clone()).into()),
        };
        let function = Expression::function(ROW, predicate);
        let filter = self
            .spec
            .then(&range, OperationSpec::Filter(FilterOpSpec { function }));

        let mut cursor = Cursor::new(filter).with_symbol(symbol_key(field), DEFAULT_VALUE_COLUMN);
        cursor.field_set = field_set;
        Ok(cursor)
    }

    /// Build the subquery on first use and return its last operation.
    fn subquery(&mut self, inner: &'s CompiledStatement) -> Result<OperationId> {
        if let Some(id) = &self.subquery {
            return Ok(id.clone());
        }
        let depth = self.depth + 1;
        let _span = debug_span!("subquery", depth).entered();
        let id = StatementBuilder::new(&mut *self.spec, inner, depth).build()?;
        self.subquery = Some(id.clone());
        Ok(id)
    }

    // ---------------------------------------------------------------
    // Projection
    // ---------------------------------------------------------------

    fn project(&mut self, cursor: &Cursor) -> Result<OperationId> {
        let stmt: &'s CompiledStatement = self.stmt;
        let mut properties = vec![Property::new(
            self.time_key(),
            Expression::member(ROW, DEFAULT_TIME_COLUMN),
        )];
        for field in &stmt.fields {
            let key = if is_field_set(&field.expr) {
                DEFAULT_VALUE_COLUMN
            } else {
                field.name.as_str()
            };
            properties.push(Property::new(key, lower_field(&field.expr, cursor)?));
        }
        let function = Expression::function(ROW, Expression::object(properties));
        Ok(self.spec.then(
            &cursor.id,
            OperationSpec::Map(MapOpSpec {
                function,
                merge_key: true,
            }),
        ))
    }
}

fn is_field_set(expr: &Expr) -> bool {
    matches!(expr, Expr::Wildcard | Expr::Regex(_))
}

/// Top-level calls and plain references of a field, without duplicates.
/// Math functions are looked through.
fn collect<'s>(expr: &'s Expr, calls: &mut Vec<&'s Expr>, refs: &mut Vec<&'s Expr>) {
    match expr {
        Expr::Call { name, args } if MathFunction::from_name(name).is_some() => {
            for arg in args {
                collect(arg, calls, refs);
            }
        }
        Expr::Call { .. } | Expr::Distinct(_) => {
            if !calls.contains(&expr) {
                calls.push(expr);
            }
        }
        Expr::VarRef { .. } | Expr::Wildcard | Expr::Regex(_) => {
            let key = symbol_key(expr);
            if !refs.iter().any(|r| symbol_key(r) == key) {
                refs.push(expr);
            }
        }
        Expr::Binary { lhs, rhs, .. } => {
            collect(lhs, calls, refs);
            collect(rhs, calls, refs);
        }
        Expr::Paren(inner) => collect(inner, calls, refs),
        _ => {}
    }
}

/// The field a call reads, found through nested calls:
/// `derivative(mean(value))` reads `value`.
fn call_field(call: &Expr) -> Option<Expr> {
    let (_, args) = call.as_call()?;
    match args.into_iter().next()? {
        field @ (Expr::VarRef { .. } | Expr::Wildcard | Expr::Regex(_)) => Some(field),
        nested @ (Expr::Call { .. } | Expr::Distinct(_)) => call_field(&nested),
        _ => None,
    }
}

fn fill_spec(fill: &Fill, column: &str) -> Option<FillOpSpec> {
    let (value, use_previous) = match fill {
        Fill::Previous => (None, true),
        Fill::Integer(n) => (Some(FillValue::Integer(*n)), false),
        Fill::Number(n) => (Some(FillValue::Float(*n)), false),
        Fill::Null | Fill::None | Fill::Linear => return None,
    };
    Some(FillOpSpec {
        column: column.to_string(),
        value,
        use_previous,
    })
}
