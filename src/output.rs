//! JSON output for transpiled specs.
//!
//! A [`Spec`] serializes as
//!
//! ```text
//! {"operations": [{"id": "from0", "kind": "from", "spec": {...}}, ...],
//!  "edges": [{"parent": "from0", "child": "range0"}, ...]}
//! ```
//!
//! Operation and edge order is the order the builder emitted them, so the
//! output is byte-stable for a fixed query and `now`.
//!
//! # Examples
//!
//! ```
//! use influxql_transpiler::Config;
//! use influxql_transpiler::output::to_json;
//!
//! let config = Config::new().with_default_database("db0");
//! let spec = influxql_transpiler::transpile("SELECT value FROM cpu", &config).unwrap();
//! let json = to_json(&spec).unwrap();
//! assert!(json.starts_with(r#"{"operations":[{"id":"from0","kind":"from""#));
//! ```

use crate::spec::Spec;

pub struct JsonPrinter {
    pretty: bool,
}

impl JsonPrinter {
    pub fn new(pretty: bool) -> Self {
        JsonPrinter { pretty }
    }

    pub fn print(&self, spec: &Spec) -> serde_json::Result<String> {
        if self.pretty {
            serde_json::to_string_pretty(spec)
        } else {
            serde_json::to_string(spec)
        }
    }
}

/// Compact JSON, one line.
pub fn to_json(spec: &Spec) -> serde_json::Result<String> {
    JsonPrinter::new(false).print(spec)
}

/// JSON with 2-space indentation.
pub fn to_json_pretty(spec: &Spec) -> serde_json::Result<String> {
    JsonPrinter::new(true).print(spec)
}
