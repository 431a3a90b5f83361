// tests/transpiler_tests.rs

use chrono::{DateTime, Utc};
use influxql_transpiler::duration::Duration;
use influxql_transpiler::semantic::{Expression, LogicalOperator, Operator, Property};
use influxql_transpiler::spec::{
    AggregateConfig, Edge, FillOpSpec, FillValue, FilterOpSpec, FromOpSpec, GroupOpSpec,
    JoinOpSpec, LimitOpSpec, MapOpSpec, Operation, OperationSpec, RangeOpSpec, SelectorConfig,
    SortOpSpec, Spec, WindowOpSpec, YieldOpSpec,
};
use influxql_transpiler::transpiler::time_range::{max_time, min_time};
use influxql_transpiler::{Config, Transpiler, to_json};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::BTreeMap;

fn time(text: &str) -> DateTime<Utc> {
    text.parse().unwrap()
}

fn transpile(query: &str) -> Spec {
    transpile_at(query, time("2010-09-15T09:00:00Z"))
}

fn transpile_at(query: &str, now: DateTime<Utc>) -> Spec {
    let config = Config::new().with_now(now);
    let spec = Transpiler::with_config(config).transpile(query).unwrap();
    spec.validate().unwrap();
    spec
}

// ============================================================================
// Expected spec builders
// ============================================================================

fn op(id: &str, spec: OperationSpec) -> Operation {
    Operation {
        id: id.into(),
        spec,
    }
}

fn edges(pairs: &[(&str, &str)]) -> Vec<Edge> {
    pairs
        .iter()
        .map(|(parent, child)| Edge {
            parent: (*parent).into(),
            child: (*child).into(),
        })
        .collect()
}

fn from(bucket: &str) -> OperationSpec {
    OperationSpec::From(FromOpSpec {
        bucket: bucket.into(),
    })
}

fn unbounded() -> OperationSpec {
    OperationSpec::Range(RangeOpSpec {
        start: min_time(),
        stop: max_time(),
    })
}

fn row(property: &str) -> Expression {
    Expression::member("r", property)
}

fn equals(property: &str, value: &str) -> Expression {
    Expression::binary(Operator::Equal, row(property), Expression::string(value))
}

fn field_filter(measurement: &str, field: &str) -> OperationSpec {
    OperationSpec::Filter(FilterOpSpec {
        function: Expression::function(
            "r",
            Expression::logical(
                LogicalOperator::And,
                equals("_measurement", measurement),
                equals("_field", field),
            ),
        ),
    })
}

fn group(by: &[&str]) -> OperationSpec {
    OperationSpec::Group(GroupOpSpec {
        by: by.iter().map(|key| key.to_string()).collect(),
    })
}

fn mean() -> OperationSpec {
    OperationSpec::Mean(AggregateConfig::on("_value"))
}

fn max() -> OperationSpec {
    OperationSpec::Max(SelectorConfig {
        column: "_value".into(),
    })
}

fn join(tables: &[&str]) -> OperationSpec {
    let properties = (0..tables.len())
        .map(|i| Property::new(format!("val{i}"), Expression::member("tables", format!("t{i}"))))
        .collect();
    let table_names: BTreeMap<_, _> = tables
        .iter()
        .enumerate()
        .map(|(i, id)| ((*id).into(), format!("t{i}")))
        .collect();
    OperationSpec::Join(JoinOpSpec {
        on: vec!["_measurement".into()],
        function: Expression::function("tables", Expression::object(properties)),
        table_names,
    })
}

fn map(columns: Vec<(&str, Expression)>) -> OperationSpec {
    let mut properties = vec![Property::new("_time", row("_time"))];
    properties.extend(
        columns
            .into_iter()
            .map(|(key, value)| Property::new(key, value)),
    );
    OperationSpec::Map(MapOpSpec {
        function: Expression::function("r", Expression::object(properties)),
        merge_key: true,
    })
}

fn bounded(start: &str, stop: &str) -> OperationSpec {
    OperationSpec::Range(RangeOpSpec {
        start: time(start),
        stop: time(stop),
    })
}

fn window(every: Duration, start: Option<&str>) -> OperationSpec {
    let mut window = WindowOpSpec::every(every);
    window.start = start.map(time);
    OperationSpec::Window(window)
}

fn yield_named(name: &str) -> OperationSpec {
    OperationSpec::Yield(YieldOpSpec { name: name.into() })
}

// ============================================================================
// Single pipelines
// ============================================================================

#[test]
fn test_mean() {
    assert_eq!(
        transpile("SELECT mean(value) FROM db0..cpu"),
        Spec {
            operations: vec![
                op("from0", from("db0/autogen")),
                op("range0", unbounded()),
                op("filter0", field_filter("cpu", "value")),
                op("group0", group(&["_measurement"])),
                op("mean0", mean()),
                op("map0", map(vec![("mean", row("_value"))])),
                op("yield0", yield_named("0")),
            ],
            edges: edges(&[
                ("from0", "range0"),
                ("range0", "filter0"),
                ("filter0", "group0"),
                ("group0", "mean0"),
                ("mean0", "map0"),
                ("map0", "yield0"),
            ]),
        }
    );
}

#[test]
fn test_raw_field() {
    assert_eq!(
        transpile("SELECT value FROM db0..cpu"),
        Spec {
            operations: vec![
                op("from0", from("db0/autogen")),
                op("range0", unbounded()),
                op("filter0", field_filter("cpu", "value")),
                op("group0", group(&["_measurement"])),
                op("map0", map(vec![("value", row("_value"))])),
                op("yield0", yield_named("0")),
            ],
            edges: edges(&[
                ("from0", "range0"),
                ("range0", "filter0"),
                ("filter0", "group0"),
                ("group0", "map0"),
                ("map0", "yield0"),
            ]),
        }
    );
}

#[test]
fn test_tag_condition() {
    let host_filter = OperationSpec::Filter(FilterOpSpec {
        function: Expression::function("r", equals("host", "server01")),
    });
    assert_eq!(
        transpile("SELECT mean(value) FROM db0..cpu WHERE host = 'server01'"),
        Spec {
            operations: vec![
                op("from0", from("db0/autogen")),
                op("range0", unbounded()),
                op("filter0", field_filter("cpu", "value")),
                op("filter1", host_filter),
                op("group0", group(&["_measurement"])),
                op("mean0", mean()),
                op("map0", map(vec![("mean", row("_value"))])),
                op("yield0", yield_named("0")),
            ],
            edges: edges(&[
                ("from0", "range0"),
                ("range0", "filter0"),
                ("filter0", "filter1"),
                ("filter1", "group0"),
                ("group0", "mean0"),
                ("mean0", "map0"),
                ("map0", "yield0"),
            ]),
        }
    );
}

#[test]
fn test_retention_policy() {
    let spec = transpile("SELECT value FROM db0.alternate.cpu");
    assert_eq!(spec.operations[0], op("from0", from("db0/alternate")));
    assert_eq!(spec.operations.len(), 6);
}

#[test]
fn test_group_by_tag() {
    let spec = transpile("SELECT mean(value) FROM db0..cpu GROUP BY host");
    assert_eq!(
        spec.operation("group0").unwrap().spec,
        group(&["_measurement", "host"])
    );
    assert_eq!(
        spec.operation("map0").unwrap().spec,
        map(vec![("mean", row("_value"))])
    );
    assert_eq!(spec.edges.len(), 6);
}

#[test]
fn test_windowed_mean() {
    assert_eq!(
        transpile("SELECT mean(value) FROM db0..cpu WHERE time >= now() - 10m GROUP BY time(1m)"),
        Spec {
            operations: vec![
                op("from0", from("db0/autogen")),
                op(
                    "range0",
                    OperationSpec::Range(RangeOpSpec {
                        start: time("2010-09-15T08:50:00Z"),
                        stop: time("2010-09-15T09:00:00Z"),
                    })
                ),
                op("filter0", field_filter("cpu", "value")),
                op("group0", group(&["_measurement"])),
                op(
                    "window0",
                    OperationSpec::Window(WindowOpSpec::every(Duration::minutes(1)))
                ),
                op("mean0", mean()),
                op("window1", OperationSpec::Window(WindowOpSpec::every(Duration::MAX))),
                op("map0", map(vec![("mean", row("_value"))])),
                op("yield0", yield_named("0")),
            ],
            edges: edges(&[
                ("from0", "range0"),
                ("range0", "filter0"),
                ("filter0", "group0"),
                ("group0", "window0"),
                ("window0", "mean0"),
                ("mean0", "window1"),
                ("window1", "map0"),
                ("map0", "yield0"),
            ]),
        }
    );
}

#[test]
fn test_window_offsets() {
    let spec = transpile(
        "SELECT max(value) FROM db0..cpu WHERE time >= now() - 1m GROUP BY time(10s, 5s)",
    );
    assert_eq!(
        spec.operation("window0").unwrap().spec,
        window(Duration::seconds(10), Some("1970-01-01T00:00:05Z"))
    );
    assert_eq!(
        spec.operation("window1").unwrap().spec,
        window(Duration::MAX, None)
    );

    let spec = transpile_at(
        "SELECT max(value) FROM db0..cpu WHERE time >= now() - 1m GROUP BY time(10s, now())",
        time("2010-09-15T09:00:07Z"),
    );
    assert_eq!(
        spec.operation("range0").unwrap().spec,
        bounded("2010-09-15T08:59:07Z", "2010-09-15T09:00:07Z")
    );
    assert_eq!(
        spec.operation("window0").unwrap().spec,
        window(Duration::seconds(10), Some("1970-01-01T00:00:07Z"))
    );

    // An offset that is a whole number of intervals aligns with the epoch.
    let spec = transpile(
        "SELECT max(value) FROM db0..cpu WHERE time >= now() - 1m GROUP BY time(10s, now())",
    );
    assert_eq!(
        spec.operation("window0").unwrap().spec,
        window(Duration::seconds(10), None)
    );
}

#[test]
fn test_fill_previous() {
    assert_eq!(
        transpile(
            "SELECT mean(value) FROM db0..cpu WHERE time >= now() - 10m \
             GROUP BY time(1m) fill(previous)"
        ),
        Spec {
            operations: vec![
                op("from0", from("db0/autogen")),
                op("range0", bounded("2010-09-15T08:50:00Z", "2010-09-15T09:00:00Z")),
                op("filter0", field_filter("cpu", "value")),
                op("group0", group(&["_measurement"])),
                op("window0", window(Duration::minutes(1), None)),
                op("mean0", mean()),
                op(
                    "fill0",
                    OperationSpec::Fill(FillOpSpec {
                        column: "_value".into(),
                        value: None,
                        use_previous: true,
                    })
                ),
                op("window1", window(Duration::MAX, None)),
                op("map0", map(vec![("mean", row("_value"))])),
                op("yield0", yield_named("0")),
            ],
            edges: edges(&[
                ("from0", "range0"),
                ("range0", "filter0"),
                ("filter0", "group0"),
                ("group0", "window0"),
                ("window0", "mean0"),
                ("mean0", "fill0"),
                ("fill0", "window1"),
                ("window1", "map0"),
                ("map0", "yield0"),
            ]),
        }
    );
}

#[test]
fn test_fill_values() {
    let test_cases = vec![
        ("fill(0)", Some(FillValue::Integer(0))),
        ("fill(-1)", Some(FillValue::Integer(-1))),
        ("fill(2.5)", Some(FillValue::Float(2.5))),
    ];

    for (clause, value) in test_cases {
        let spec = transpile(&format!(
            "SELECT mean(value) FROM db0..cpu WHERE time >= now() - 10m GROUP BY time(1m) {}",
            clause
        ));
        assert_eq!(
            spec.operation("fill0").unwrap().spec,
            OperationSpec::Fill(FillOpSpec {
                column: "_value".into(),
                value,
                use_previous: false,
            }),
            "Failed for clause: {}",
            clause
        );
    }

    // fill(null) is the default and emits nothing.
    let spec = transpile(
        "SELECT mean(value) FROM db0..cpu WHERE time >= now() - 10m GROUP BY time(1m) fill(null)",
    );
    assert!(spec.operations.iter().all(|op| op.spec.kind() != "fill"));
}

#[test]
fn test_descending_order_with_limit() {
    assert_eq!(
        transpile("SELECT value FROM db0..cpu ORDER BY time DESC LIMIT 10 OFFSET 5"),
        Spec {
            operations: vec![
                op("from0", from("db0/autogen")),
                op("range0", unbounded()),
                op("filter0", field_filter("cpu", "value")),
                op("group0", group(&["_measurement"])),
                op("map0", map(vec![("value", row("_value"))])),
                op(
                    "sort0",
                    OperationSpec::Sort(SortOpSpec {
                        columns: vec!["_time".into()],
                        desc: true,
                    })
                ),
                op("limit0", OperationSpec::Limit(LimitOpSpec { n: 10, offset: 5 })),
                op("yield0", yield_named("0")),
            ],
            edges: edges(&[
                ("from0", "range0"),
                ("range0", "filter0"),
                ("filter0", "group0"),
                ("group0", "map0"),
                ("map0", "sort0"),
                ("sort0", "limit0"),
                ("limit0", "yield0"),
            ]),
        }
    );
}

#[test]
fn test_limit_payloads() {
    let test_cases = vec![
        ("LIMIT 3", Some(LimitOpSpec { n: 3, offset: 0 })),
        ("OFFSET 2", Some(LimitOpSpec { n: i64::MAX, offset: 2 })),
        ("LIMIT 0", None),
    ];

    for (clause, expected) in test_cases {
        let spec = transpile(&format!("SELECT value FROM db0..cpu {}", clause));
        let limit = spec.operation("limit0").map(|op| op.spec.clone());
        assert_eq!(limit, expected.map(OperationSpec::Limit), "Failed for clause: {}", clause);
        assert!(spec.operation("sort0").is_none(), "Failed for clause: {}", clause);
    }
}

// ============================================================================
// Subqueries
// ============================================================================

#[test]
fn test_subquery() {
    assert_eq!(
        transpile(
            "SELECT max(mean) FROM (SELECT mean(value) FROM db0..cpu GROUP BY host) \
             WHERE time >= now() - 1h AND time <= now()"
        ),
        Spec {
            operations: vec![
                op("from0", from("db0/autogen")),
                op("range0", bounded("2010-09-15T08:00:00Z", "2010-09-15T09:00:00Z")),
                op("filter0", field_filter("cpu", "value")),
                op("group0", group(&["_measurement", "host"])),
                op("mean0", mean()),
                op("map0", map(vec![("mean", row("_value"))])),
                op("group1", group(&["_measurement"])),
                op(
                    "max0",
                    OperationSpec::Max(SelectorConfig {
                        column: "mean".into(),
                    })
                ),
                op("map1", map(vec![("max", row("mean"))])),
                op("yield0", yield_named("0")),
            ],
            edges: edges(&[
                ("from0", "range0"),
                ("range0", "filter0"),
                ("filter0", "group0"),
                ("group0", "mean0"),
                ("mean0", "map0"),
                ("map0", "group1"),
                ("group1", "max0"),
                ("max0", "map1"),
                ("map1", "yield0"),
            ]),
        }
    );
}

#[test]
fn test_subquery_range_is_intersected() {
    let spec = transpile(
        "SELECT max(mean) FROM (SELECT mean(value) FROM db0..cpu WHERE time >= now() - 2h) \
         WHERE time >= now() - 1h AND time <= now()",
    );
    assert_eq!(
        spec.operation("range0").unwrap().spec,
        bounded("2010-09-15T08:00:00Z", "2010-09-15T09:00:00Z")
    );
    let yields = spec
        .operations
        .iter()
        .filter(|op| op.spec.kind() == "yield")
        .count();
    assert_eq!(yields, 1);
}

// ============================================================================
// Joins
// ============================================================================

#[test]
fn test_two_aggregates() {
    assert_eq!(
        transpile("SELECT mean(value), max(value) FROM db0..cpu"),
        Spec {
            operations: vec![
                op("from0", from("db0/autogen")),
                op("range0", unbounded()),
                op("filter0", field_filter("cpu", "value")),
                op("group0", group(&["_measurement"])),
                op("mean0", mean()),
                op("from1", from("db0/autogen")),
                op("range1", unbounded()),
                op("filter1", field_filter("cpu", "value")),
                op("group1", group(&["_measurement"])),
                op("max0", max()),
                op("join0", join(&["mean0", "max0"])),
                op(
                    "map0",
                    map(vec![("mean", row("val0")), ("max", row("val1"))])
                ),
                op("yield0", yield_named("0")),
            ],
            edges: edges(&[
                ("from0", "range0"),
                ("range0", "filter0"),
                ("filter0", "group0"),
                ("group0", "mean0"),
                ("from1", "range1"),
                ("range1", "filter1"),
                ("filter1", "group1"),
                ("group1", "max0"),
                ("mean0", "join0"),
                ("max0", "join0"),
                ("join0", "map0"),
                ("map0", "yield0"),
            ]),
        }
    );
}

#[test]
fn test_field_arithmetic() {
    assert_eq!(
        transpile("SELECT a + b FROM db0..cpu"),
        Spec {
            operations: vec![
                op("from0", from("db0/autogen")),
                op("range0", unbounded()),
                op("filter0", field_filter("cpu", "a")),
                op("from1", from("db0/autogen")),
                op("range1", unbounded()),
                op("filter1", field_filter("cpu", "b")),
                op("join0", join(&["filter0", "filter1"])),
                op("group0", group(&["_measurement"])),
                op(
                    "map0",
                    map(vec![(
                        "a_b",
                        Expression::binary(Operator::Addition, row("val0"), row("val1"))
                    )])
                ),
                op("yield0", yield_named("0")),
            ],
            edges: edges(&[
                ("from0", "range0"),
                ("range0", "filter0"),
                ("from1", "range1"),
                ("range1", "filter1"),
                ("filter0", "join0"),
                ("filter1", "join0"),
                ("join0", "group0"),
                ("group0", "map0"),
                ("map0", "yield0"),
            ]),
        }
    );
}

// ============================================================================
// Multiple statements
// ============================================================================

#[test]
fn test_multiple_statements() {
    let spec = transpile("SELECT mean(value) FROM db0..cpu; SELECT max(value) FROM db0..cpu");
    let ids: Vec<_> = spec.operations.iter().map(|op| op.id.as_str()).collect();
    assert_eq!(
        ids,
        [
            "from0", "range0", "filter0", "group0", "mean0", "map0", "yield0", "from1", "range1",
            "filter1", "group1", "max0", "map1", "yield1",
        ]
    );
    assert_eq!(spec.operation("yield1").unwrap().spec, yield_named("1"));
    assert_eq!(
        spec.operation("map1").unwrap().spec,
        map(vec![("max", row("_value"))])
    );
    assert_eq!(
        spec.edges[6..],
        edges(&[
            ("from1", "range1"),
            ("range1", "filter1"),
            ("filter1", "group1"),
            ("group1", "max0"),
            ("max0", "map1"),
            ("map1", "yield1"),
        ])[..]
    );
}

// ============================================================================
// Wire format
// ============================================================================

#[test]
fn test_windowed_json() {
    let spec =
        transpile("SELECT mean(value) FROM db0..cpu WHERE time >= now() - 10m GROUP BY time(1m)");
    let value: serde_json::Value = serde_json::from_str(&to_json(&spec).unwrap()).unwrap();

    assert_eq!(
        value["operations"][1],
        json!({
            "id": "range0",
            "kind": "range",
            "spec": {"start": "2010-09-15T08:50:00Z", "stop": "2010-09-15T09:00:00Z"}
        })
    );
    assert_eq!(
        value["operations"][4]["spec"],
        json!({
            "every": "1m",
            "period": "1m",
            "ignoreGlobalBounds": true,
            "timeCol": "_time",
            "startColLabel": "_start",
            "stopColLabel": "_stop"
        })
    );
    assert_eq!(
        value["operations"][5],
        json!({
            "id": "mean0",
            "kind": "mean",
            "spec": {"timeSrc": "_start", "timeDst": "_time", "columns": ["_value"]}
        })
    );
    assert_eq!(value["operations"][6]["spec"]["every"], "9223372036854775807ns");
}

#[test]
fn test_unbounded_range_json() {
    let spec = transpile("SELECT value FROM db0..cpu");
    let value = serde_json::to_value(&spec).unwrap();
    assert_eq!(
        value["operations"][1]["spec"],
        json!({
            "start": "1677-09-21T00:12:43.145224194Z",
            "stop": "2262-04-11T23:47:16.854775806Z"
        })
    );
    assert_eq!(
        value["operations"][2]["spec"]["fn"]["body"]["type"],
        "LogicalExpression"
    );
    assert_eq!(value["operations"][2]["spec"]["fn"]["body"]["operator"], "and");
    assert_eq!(value["edges"][0], json!({"parent": "from0", "child": "range0"}));
}

#[test]
fn test_join_json() {
    let spec = transpile("SELECT mean(value), max(value) FROM db0..cpu");
    let value = serde_json::to_value(&spec).unwrap();
    let join = &value["operations"][10];
    assert_eq!(join["kind"], "join");
    assert_eq!(join["spec"]["on"], json!(["_measurement"]));
    assert_eq!(join["spec"]["tableNames"], json!({"max0": "t1", "mean0": "t0"}));
    assert_eq!(
        value["operations"][11]["spec"]["mergeKey"],
        json!(true)
    );
}
