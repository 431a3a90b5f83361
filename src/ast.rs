//! # InfluxQL - Abstract Syntax Tree
//!
//! This module defines the syntax tree produced by the [`Parser`](crate::parser::Parser)
//! for the subset of InfluxQL the transpiler understands: `SELECT` statements,
//! optionally nested as subqueries, separated by semicolons.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[expressions]** - Expression nodes (references, calls, literals, operators)
//! - **[operators]** - Binary operators and their precedence
//! - **[statements]** - `SELECT` statements, sources, dimensions and fill options
//! - **[query]** - A complete, possibly multi-statement, query
//!
//! ## Quick Start
//!
//! ```text
//! SELECT mean(value) FROM db0..cpu WHERE time >= now() - 10m GROUP BY time(1m), host
//! ```
//!
//! ## Rendering
//!
//! Every expression renders back to canonical InfluxQL through `Display`. The
//! rendering is part of the error contract: messages such as
//! `expected integer as last argument in top(), found 2.500` embed it verbatim.
//!
//! | Node            | Renders as          |
//! |-----------------|---------------------|
//! | number literal  | `2.500`             |
//! | string literal  | `'unexpected'`      |
//! | duration        | `-2h`               |
//! | call            | `max(foo)`          |
//! | field reference | `value`, `"my field"` |
pub mod expressions;
pub mod operators;
pub mod query;
pub mod statements;
pub mod tokens;

pub use expressions::{DataType, Expr};
pub use operators::BinOp;
pub use query::Query;
pub use statements::{
    Dimension, Field, Fill, Measurement, MeasurementName, SelectStatement, SortOrder, Source,
};
pub use tokens::Token;
