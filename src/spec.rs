//! The operator graph produced by the transpiler.
//!
//! A [`Spec`] is an ordered list of operations plus the parent/child edges
//! between them. Operation IDs are `<kind><n>` with one counter per kind
//! across the whole spec.

use crate::duration::Duration;
use crate::error::SpecError;
use crate::semantic::{Expression, serialize_time};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;

pub const DEFAULT_START_COLUMN: &str = "_start";
pub const DEFAULT_STOP_COLUMN: &str = "_stop";
pub const DEFAULT_TIME_COLUMN: &str = "_time";
pub const DEFAULT_VALUE_COLUMN: &str = "_value";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct OperationId(String);

impl OperationId {
    pub fn new(id: impl Into<String>) -> Self {
        OperationId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OperationId {
    fn from(id: &str) -> Self {
        OperationId(id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operation {
    pub id: OperationId,
    #[serde(flatten)]
    pub spec: OperationSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub parent: OperationId,
    pub child: OperationId,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Spec {
    pub operations: Vec<Operation>,
    pub edges: Vec<Edge>,
}

/// Kind-specific configuration of an operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "spec", rename_all = "camelCase")]
pub enum OperationSpec {
    From(FromOpSpec),
    Range(RangeOpSpec),
    Filter(FilterOpSpec),
    Group(GroupOpSpec),
    Window(WindowOpSpec),

    // Aggregates
    Count(AggregateConfig),
    Sum(AggregateConfig),
    Mean(AggregateConfig),
    Stddev(AggregateConfig),
    Spread(AggregateConfig),
    Percentile(PercentileOpSpec),
    Integral(IntegralOpSpec),

    // Selectors
    First(SelectorConfig),
    Last(SelectorConfig),
    Min(SelectorConfig),
    Max(SelectorConfig),
    Sample(SampleOpSpec),
    Top(TopBottomOpSpec),
    Bottom(TopBottomOpSpec),
    Distinct(DistinctOpSpec),

    // Transformations
    Derivative(DerivativeOpSpec),
    Difference(DifferenceOpSpec),
    CumulativeSum(ColumnsOpSpec),
    MovingAverage(MovingAverageOpSpec),
    Elapsed(ElapsedOpSpec),
    Fill(FillOpSpec),

    Join(JoinOpSpec),
    Map(MapOpSpec),
    Sort(SortOpSpec),
    Limit(LimitOpSpec),
    Yield(YieldOpSpec),
}

impl OperationSpec {
    /// Kind name, also the prefix of the operation ID.
    pub fn kind(&self) -> &'static str {
        match self {
            OperationSpec::From(_) => "from",
            OperationSpec::Range(_) => "range",
            OperationSpec::Filter(_) => "filter",
            OperationSpec::Group(_) => "group",
            OperationSpec::Window(_) => "window",
            OperationSpec::Count(_) => "count",
            OperationSpec::Sum(_) => "sum",
            OperationSpec::Mean(_) => "mean",
            OperationSpec::Stddev(_) => "stddev",
            OperationSpec::Spread(_) => "spread",
            OperationSpec::Percentile(_) => "percentile",
            OperationSpec::Integral(_) => "integral",
            OperationSpec::First(_) => "first",
            OperationSpec::Last(_) => "last",
            OperationSpec::Min(_) => "min",
            OperationSpec::Max(_) => "max",
            OperationSpec::Sample(_) => "sample",
            OperationSpec::Top(_) => "top",
            OperationSpec::Bottom(_) => "bottom",
            OperationSpec::Distinct(_) => "distinct",
            OperationSpec::Derivative(_) => "derivative",
            OperationSpec::Difference(_) => "difference",
            OperationSpec::CumulativeSum(_) => "cumulativeSum",
            OperationSpec::MovingAverage(_) => "movingAverage",
            OperationSpec::Elapsed(_) => "elapsed",
            OperationSpec::Fill(_) => "fill",
            OperationSpec::Join(_) => "join",
            OperationSpec::Map(_) => "map",
            OperationSpec::Sort(_) => "sort",
            OperationSpec::Limit(_) => "limit",
            OperationSpec::Yield(_) => "yield",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FromOpSpec {
    /// `<database>/<retention policy>`
    pub bucket: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeOpSpec {
    #[serde(serialize_with = "serialize_time")]
    pub start: DateTime<Utc>,
    #[serde(serialize_with = "serialize_time")]
    pub stop: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterOpSpec {
    #[serde(rename = "fn")]
    pub function: Expression,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupOpSpec {
    pub by: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowOpSpec {
    pub every: Duration,
    pub period: Duration,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_optional_time"
    )]
    pub start: Option<DateTime<Utc>>,
    pub ignore_global_bounds: bool,
    pub time_col: String,
    pub start_col_label: String,
    pub stop_col_label: String,
}

impl WindowOpSpec {
    /// Fixed-width windows over `_time`.
    pub fn every(every: Duration) -> Self {
        WindowOpSpec {
            every,
            period: every,
            start: None,
            ignore_global_bounds: true,
            time_col: DEFAULT_TIME_COLUMN.to_string(),
            start_col_label: DEFAULT_START_COLUMN.to_string(),
            stop_col_label: DEFAULT_STOP_COLUMN.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateConfig {
    pub time_src: String,
    pub time_dst: String,
    pub columns: Vec<String>,
}

impl AggregateConfig {
    /// Aggregate `column`, stamping each result with its window start.
    pub fn on(column: &str) -> Self {
        AggregateConfig {
            time_src: DEFAULT_START_COLUMN.to_string(),
            time_dst: DEFAULT_TIME_COLUMN.to_string(),
            columns: vec![column.to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectorConfig {
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PercentileOpSpec {
    pub percentile: f64,
    pub method: String,
    #[serde(flatten)]
    pub aggregate: AggregateConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntegralOpSpec {
    pub unit: Duration,
    #[serde(flatten)]
    pub aggregate: AggregateConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleOpSpec {
    pub n: i64,
    pub pos: i64,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopBottomOpSpec {
    pub n: i64,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistinctOpSpec {
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivativeOpSpec {
    pub unit: Duration,
    pub non_negative: bool,
    pub columns: Vec<String>,
    pub time_col: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DifferenceOpSpec {
    pub non_negative: bool,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnsOpSpec {
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovingAverageOpSpec {
    pub n: i64,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElapsedOpSpec {
    pub unit: Duration,
    pub time_col: String,
    pub column_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FillValue {
    Integer(i64),
    Float(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FillOpSpec {
    pub column: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<FillValue>,
    pub use_previous: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinOpSpec {
    pub on: Vec<String>,
    #[serde(rename = "fn")]
    pub function: Expression,
    pub table_names: BTreeMap<OperationId, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapOpSpec {
    #[serde(rename = "fn")]
    pub function: Expression,
    pub merge_key: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SortOpSpec {
    pub columns: Vec<String>,
    pub desc: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LimitOpSpec {
    pub n: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YieldOpSpec {
    pub name: String,
}

fn serialize_optional_time<S: Serializer>(
    time: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match time {
        Some(time) => serialize_time(time, serializer),
        None => serializer.serialize_none(),
    }
}

impl Spec {
    pub fn operation(&self, id: &str) -> Option<&Operation> {
        self.operations.iter().find(|op| op.id.as_str() == id)
    }

    /// IDs of the operations feeding `id`, in edge order.
    pub fn parents(&self, id: &str) -> Vec<&OperationId> {
        self.edges
            .iter()
            .filter(|edge| edge.child.as_str() == id)
            .map(|edge| &edge.parent)
            .collect()
    }

    pub fn children(&self, id: &str) -> Vec<&OperationId> {
        self.edges
            .iter()
            .filter(|edge| edge.parent.as_str() == id)
            .map(|edge| &edge.child)
            .collect()
    }

    /// Check the graph invariants: unique IDs, edges between known
    /// operations, a parent for everything except `from`, children for
    /// everything except `yield`, unique yield names and no cycles.
    pub fn validate(&self) -> Result<(), SpecError> {
        let mut ids = HashSet::new();
        for op in &self.operations {
            if !ids.insert(op.id.as_str()) {
                return Err(SpecError::DuplicateId(op.id.to_string()));
            }
        }

        let mut indegree: HashMap<&str, usize> = ids.iter().map(|id| (*id, 0)).collect();
        let mut outgoing: HashMap<&str, Vec<&str>> = HashMap::new();
        for edge in &self.edges {
            for end in [&edge.parent, &edge.child] {
                if !ids.contains(end.as_str()) {
                    return Err(SpecError::UnknownOperation(end.to_string()));
                }
            }
            if let Some(count) = indegree.get_mut(edge.child.as_str()) {
                *count += 1;
            }
            outgoing
                .entry(edge.parent.as_str())
                .or_default()
                .push(edge.child.as_str());
        }

        let mut yields = HashSet::new();
        for op in &self.operations {
            let id = op.id.as_str();
            let has_parent = indegree.get(id).is_some_and(|count| *count > 0);
            let has_children = outgoing.contains_key(id);
            match &op.spec {
                OperationSpec::From(_) => {}
                _ if !has_parent => return Err(SpecError::Orphan(id.to_string())),
                _ => {}
            }
            match &op.spec {
                OperationSpec::Yield(spec) => {
                    if has_children {
                        return Err(SpecError::YieldWithChildren(spec.name.clone()));
                    }
                    if !yields.insert(spec.name.as_str()) {
                        return Err(SpecError::DuplicateYield(spec.name.clone()));
                    }
                }
                _ if !has_children => return Err(SpecError::Dangling(id.to_string())),
                _ => {}
            }
        }

        // Kahn's algorithm; anything left unvisited sits on a cycle.
        let mut queue: VecDeque<&str> = indegree
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut visited = 0;
        while let Some(id) = queue.pop_front() {
            visited += 1;
            for child in outgoing.get(id).into_iter().flatten() {
                if let Some(count) = indegree.get_mut(child) {
                    *count -= 1;
                    if *count == 0 {
                        queue.push_back(child);
                    }
                }
            }
        }
        if visited != ids.len() {
            return Err(SpecError::Cycle);
        }
        Ok(())
    }
}
