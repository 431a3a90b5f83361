//! InfluxQL to dataflow spec compiler.
//!
//! Parses InfluxQL `SELECT` statements and compiles them into a [`Spec`], a
//! directed acyclic graph of typed operations ready for a dataflow engine.
//!
//! ```
//! use influxql_transpiler::{Config, transpile};
//!
//! let config = Config::new().with_default_database("telegraf");
//! let spec = transpile("SELECT max(usage) FROM cpu GROUP BY host", &config).unwrap();
//! let kinds: Vec<_> = spec.operations.iter().map(|op| op.spec.kind()).collect();
//! assert_eq!(kinds, ["from", "range", "filter", "group", "max", "map", "yield"]);
//! ```

pub mod ast;
pub mod config;
pub mod duration;
pub mod error;
pub mod lexer;
pub mod output;
pub mod parser;
pub mod semantic;
pub mod spec;
pub mod transpiler;

#[cfg(feature = "cli")]
pub mod cli;

pub use ast::{BinOp, Expr, Query, SelectStatement, Token};
pub use config::Config;
pub use duration::Duration;
pub use error::{ErrorKind, Result, SpecError, TranspileError};
pub use lexer::{LexError, Lexer, Position};
pub use output::{to_json, to_json_pretty};
pub use parser::{ParseError, Parser, parse_query};
pub use spec::{Edge, Operation, OperationId, OperationSpec, Spec};
pub use transpiler::{Transpiler, transpile};
