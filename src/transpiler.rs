//! # InfluxQL to operator graph
//!
//! The transpiler turns parsed InfluxQL into a [`Spec`]: a DAG of typed
//! operations (`from`, `range`, `filter`, `group`, `window`, aggregates,
//! `join`, `map`, `yield`, ...) for a dataflow engine.
//!
//! ## Pipeline
//!
//! - **[compile]** - validates each statement and splits out its time range
//! - **[builder]** - emits operations and edges for the compiled statement
//! - **[lower]** - rewrites field and condition expressions as lambdas
//!
//! Supporting modules: [catalog] (known functions), [reduce] (constant
//! folding), [time_range] (time bounds and windows), [columns] (output
//! names), [functions] (per-function operators) and [cursor] (symbol
//! bindings while building).
//!
//! ## Example
//!
//! ```
//! use influxql_transpiler::{Config, Transpiler};
//!
//! let transpiler = Transpiler::with_config(Config::new().with_default_database("db0"));
//! let spec = transpiler.transpile("SELECT mean(value) FROM cpu").unwrap();
//! assert_eq!(spec.operations.last().unwrap().spec.kind(), "yield");
//! ```

pub mod builder;
pub mod catalog;
pub mod columns;
pub mod compile;
pub mod cursor;
pub mod functions;
pub mod lower;
pub mod reduce;
pub mod time_range;

use crate::ast::Query;
use crate::config::Config;
use crate::error::{Result, SyntaxError};
use crate::parser::parse_query;
use crate::spec::Spec;
use builder::SpecBuilder;
use tracing::debug;

/// Compiles InfluxQL text into operator graphs.
#[derive(Debug, Clone, Default)]
pub struct Transpiler {
    config: Config,
}

impl Transpiler {
    pub fn new() -> Self {
        Transpiler::default()
    }

    pub fn with_config(config: Config) -> Self {
        Transpiler { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Parse and transpile `text`.
    pub fn transpile(&self, text: &str) -> Result<Spec> {
        let query = parse_query(text)?;
        self.transpile_query(&query)
    }

    /// Transpile an already parsed query.
    ///
    /// Statements are compiled in order and each yields under its index
    /// (`"0"`, `"1"`, ...). The first error aborts the whole query.
    pub fn transpile_query(&self, query: &Query) -> Result<Spec> {
        if query.statements.is_empty() {
            return Err(SyntaxError::EmptyQuery.into());
        }
        let now = self.config.now();
        let mut builder = SpecBuilder::new(&self.config, now);
        for (index, statement) in query.statements.iter().enumerate() {
            let compiled = compile::compile(statement, now)?;
            debug!(statement = index, fields = compiled.fields.len(), "compiled statement");
            builder.statement(&compiled, index.to_string())?;
        }

        let spec = builder.finish();
        spec.validate()?;
        debug!(
            statements = query.statements.len(),
            operations = spec.operations.len(),
            edges = spec.edges.len(),
            "assembled spec"
        );
        Ok(spec)
    }
}

/// Transpile `text` with `config`.
pub fn transpile(text: &str, config: &Config) -> Result<Spec> {
    Transpiler::with_config(config.clone()).transpile(text)
}
