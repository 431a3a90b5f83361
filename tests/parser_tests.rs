// tests/parser_tests.rs

use influxql_transpiler::ast::{
    BinOp, DataType, Expr, Fill, Measurement, MeasurementName, SelectStatement, SortOrder, Source,
};
use influxql_transpiler::duration::Duration;
use influxql_transpiler::lexer::{LexError, Lexer};
use influxql_transpiler::parser::{ParseError, Parser, parse_query};

fn parse_expr(input: &str) -> Expr {
    let mut parser = Parser::new(Lexer::new(input)).unwrap();
    parser.parse_expression().unwrap()
}

fn parse_one(input: &str) -> SelectStatement {
    let mut query = parse_query(input).unwrap();
    assert_eq!(query.statements.len(), 1, "Expected one statement in: {}", input);
    query.statements.remove(0)
}

fn measurement(stmt: &SelectStatement) -> &Measurement {
    match &stmt.sources[0] {
        Source::Measurement(m) => m,
        Source::Subquery(_) => panic!("Expected a measurement source"),
    }
}

// ============================================================================
// Expressions
// ============================================================================

#[test]
fn test_comparison() {
    assert!(matches!(
        parse_expr("value > 100"),
        Expr::Binary {
            op: BinOp::GreaterThan,
            ..
        }
    ));
}

#[test]
fn test_arithmetic_precedence() {
    // Should be: Add(a, Multiply(b, 2))
    match parse_expr("a + b * 2") {
        Expr::Binary {
            op: BinOp::Add,
            lhs,
            rhs,
        } => {
            assert_eq!(*lhs, Expr::var("a"));
            assert!(matches!(*rhs, Expr::Binary { op: BinOp::Multiply, .. }));
        }
        other => panic!("Expected addition, got {:?}", other),
    }
}

#[test]
fn test_parentheses_are_kept() {
    match parse_expr("(a + b) * 2") {
        Expr::Binary {
            op: BinOp::Multiply,
            lhs,
            ..
        } => assert!(matches!(*lhs, Expr::Paren(_))),
        other => panic!("Expected multiplication, got {:?}", other),
    }
}

#[test]
fn test_logical_precedence() {
    // AND binds tighter than OR
    match parse_expr("host = 'a' OR host = 'b' AND region = 'c'") {
        Expr::Binary {
            op: BinOp::Or,
            rhs,
            ..
        } => assert!(matches!(*rhs, Expr::Binary { op: BinOp::And, .. })),
        other => panic!("Expected OR at the root, got {:?}", other),
    }
}

#[test]
fn test_unary_minus() {
    let test_cases = vec![
        ("-1", Expr::Integer(-1)),
        ("-2.5", Expr::Number(-2.5)),
        ("-10m", Expr::Duration(Duration::minutes(-10))),
        ("-1h30m", Expr::Duration(Duration::minutes(-90))),
        ("- 5", Expr::Integer(-5)),
        ("-.5", Expr::Number(-0.5)),
        ("-9223372036854775808", Expr::Integer(i64::MIN)),
        (
            "-value",
            Expr::binary(BinOp::Multiply, Expr::Integer(-1), Expr::var("value")),
        ),
    ];

    for (input, expected) in test_cases {
        assert_eq!(parse_expr(input), expected, "Failed for input: {}", input);
    }
}

#[test]
fn test_minus_between_operands() {
    assert_eq!(
        parse_expr("now() - -1h"),
        Expr::binary(
            BinOp::Subtract,
            Expr::call("now", vec![]),
            Expr::Duration(Duration::minutes(-60))
        )
    );
}

#[test]
fn test_integer_out_of_range() {
    // Only the negated form fits an i64.
    assert!(matches!(
        parse_query("SELECT value FROM cpu WHERE time > 9223372036854775808"),
        Err(ParseError::Lex(LexError::InvalidNumber { .. }))
    ));
    assert!(parse_query("SELECT value FROM cpu WHERE time > -9223372036854775808").is_ok());
}

#[test]
fn test_function_calls() {
    assert_eq!(
        parse_expr("DERIVATIVE(mean(value), 1s)"),
        Expr::call(
            "derivative",
            vec![
                Expr::call("mean", vec![Expr::var("value")]),
                Expr::Duration(Duration::seconds(1)),
            ]
        )
    );
    assert_eq!(parse_expr("now()"), Expr::call("now", vec![]));
}

#[test]
fn test_regex_operand() {
    assert_eq!(
        parse_expr(r"host =~ /^server\d+$/"),
        Expr::binary(
            BinOp::RegexMatch,
            Expr::var("host"),
            Expr::Regex(r"^server\d+$".into())
        )
    );
}

#[test]
fn test_type_hints() {
    assert_eq!(
        parse_expr("host::tag"),
        Expr::VarRef {
            name: "host".into(),
            data_type: Some(DataType::Tag),
        }
    );
}

#[test]
fn test_distinct_keyword() {
    assert_eq!(parse_expr("DISTINCT value"), Expr::Distinct("value".into()));
    assert_eq!(
        parse_expr("distinct(value)"),
        Expr::call("distinct", vec![Expr::var("value")])
    );
}

// ============================================================================
// Rendering
// ============================================================================

#[test]
fn test_expression_rendering() {
    let test_cases = vec![
        ("top(value, 2.5)", "top(value, 2.500)"),
        ("'unexpected'", "'unexpected'"),
        ("-2h", "-2h"),
        ("max(foo)", "max(foo)"),
        (r#""my field""#, r#""my field""#),
        ("(a + b) * 2", "(a + b) * 2"),
    ];

    for (input, expected) in test_cases {
        assert_eq!(parse_expr(input).to_string(), expected, "Failed for input: {}", input);
    }
}

// ============================================================================
// Statements
// ============================================================================

#[test]
fn test_simple_select() {
    let stmt = parse_one("SELECT mean(value) AS avg, max FROM cpu");
    assert_eq!(stmt.fields.len(), 2);
    assert_eq!(stmt.fields[0].alias.as_deref(), Some("avg"));
    assert_eq!(stmt.fields[1].expr, Expr::var("max"));
    assert_eq!(
        *measurement(&stmt),
        Measurement {
            database: None,
            retention_policy: None,
            name: MeasurementName::Name("cpu".into()),
        }
    );
    assert_eq!(stmt.condition, None);
    assert_eq!(stmt.fill, Fill::Null);
    assert_eq!(stmt.order, None);
}

#[test]
fn test_qualified_sources() {
    let test_cases = vec![
        ("SELECT value FROM cpu", None, None),
        ("SELECT value FROM db0..cpu", Some("db0"), None),
        ("SELECT value FROM db0.alternate.cpu", Some("db0"), Some("alternate")),
        ("SELECT value FROM alternate.cpu", None, Some("alternate")),
    ];

    for (input, database, retention_policy) in test_cases {
        let stmt = parse_one(input);
        let m = measurement(&stmt);
        assert_eq!(m.database.as_deref(), database, "Failed for input: {}", input);
        assert_eq!(m.retention_policy.as_deref(), retention_policy, "Failed for input: {}", input);
        assert_eq!(m.name, MeasurementName::Name("cpu".into()));
    }
}

#[test]
fn test_regex_source() {
    let stmt = parse_one("SELECT value FROM /^cpu/");
    assert_eq!(measurement(&stmt).name, MeasurementName::Regex("^cpu".into()));
}

#[test]
fn test_subquery_source() {
    let stmt = parse_one("SELECT max(mean) FROM (SELECT mean(value) FROM cpu GROUP BY host)");
    match &stmt.sources[0] {
        Source::Subquery(inner) => {
            assert_eq!(inner.dimensions.len(), 1);
            assert_eq!(inner.dimensions[0].expr, Expr::var("host"));
        }
        Source::Measurement(_) => panic!("Expected a subquery source"),
    }
}

#[test]
fn test_full_clause_set() {
    let stmt = parse_one(
        "SELECT mean(value) FROM cpu WHERE host = 'server01' AND time >= now() - 1h \
         GROUP BY time(10m), host fill(none) ORDER BY time DESC \
         LIMIT 10 OFFSET 2 SLIMIT 3 SOFFSET 4 tz('UTC')",
    );
    assert!(matches!(
        stmt.condition,
        Some(Expr::Binary { op: BinOp::And, .. })
    ));
    assert_eq!(stmt.dimensions.len(), 2);
    assert_eq!(
        stmt.dimensions[0].expr,
        Expr::call("time", vec![Expr::Duration(Duration::minutes(10))])
    );
    assert_eq!(stmt.fill, Fill::None);
    assert_eq!(stmt.order, Some(SortOrder::Descending));
    assert_eq!(stmt.limit, Some(10));
    assert_eq!(stmt.offset, Some(2));
    assert_eq!(stmt.slimit, Some(3));
    assert_eq!(stmt.soffset, Some(4));
    assert_eq!(stmt.location.as_deref(), Some("UTC"));
}

#[test]
fn test_fill_options() {
    let test_cases = vec![
        ("fill(null)", Fill::Null),
        ("fill(none)", Fill::None),
        ("fill(previous)", Fill::Previous),
        ("fill(linear)", Fill::Linear),
        ("fill(0)", Fill::Integer(0)),
        ("fill(-1)", Fill::Integer(-1)),
        ("fill(-9223372036854775808)", Fill::Integer(i64::MIN)),
        ("fill(-0.5)", Fill::Number(-0.5)),
        ("fill(2.5)", Fill::Number(2.5)),
    ];

    for (clause, expected) in test_cases {
        let stmt = parse_one(&format!("SELECT mean(value) FROM cpu GROUP BY time(1m) {}", clause));
        assert_eq!(stmt.fill, expected, "Failed for clause: {}", clause);
    }
}

#[test]
fn test_order_by() {
    let test_cases = vec![
        ("ORDER BY time", SortOrder::Ascending),
        ("ORDER BY time ASC", SortOrder::Ascending),
        ("ORDER BY time DESC", SortOrder::Descending),
        ("ORDER BY DESC", SortOrder::Descending),
    ];

    for (clause, expected) in test_cases {
        let stmt = parse_one(&format!("SELECT value FROM cpu {}", clause));
        assert_eq!(stmt.order, Some(expected), "Failed for clause: {}", clause);
    }
}

#[test]
fn test_multiple_statements() {
    let query = parse_query("SELECT mean(value) FROM cpu; SELECT max(value) FROM cpu;").unwrap();
    assert_eq!(query.statements.len(), 2);
    assert_eq!(
        query.statements[1].fields[0].expr,
        Expr::call("max", vec![Expr::var("value")])
    );
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_missing_from() {
    assert!(matches!(
        parse_query("SELECT value"),
        Err(ParseError::Unexpected { .. })
    ));
}

#[test]
fn test_order_by_field_is_rejected() {
    let err = parse_query("SELECT value FROM cpu ORDER BY value").unwrap_err();
    assert!(
        err.to_string().starts_with("only ORDER BY time supported at this time"),
        "Unexpected message: {}",
        err
    );
}

#[test]
fn test_lex_errors_surface() {
    assert!(matches!(
        parse_query("SELECT value FROM cpu WHERE host = 'abc"),
        Err(ParseError::Lex(_))
    ));
}

#[test]
fn test_fill_rejects_negated_option() {
    assert!(matches!(
        parse_query("SELECT mean(value) FROM cpu GROUP BY time(1m) fill(-none)"),
        Err(ParseError::Unexpected { .. })
    ));
}

#[test]
fn test_trailing_garbage() {
    assert!(parse_query("SELECT value FROM cpu value").is_err());
}
