//! Transpile a query and render its spec

use super::{CliError, ConfigOptions};
use crate::output::JsonPrinter;
use crate::transpiler::Transpiler;

/// Options for the transpile command
#[derive(Debug, Clone, Default)]
pub struct TranspileOptions {
    /// The InfluxQL query
    pub query: String,
    pub config: ConfigOptions,
    /// Pretty-print the output
    pub pretty: bool,
}

/// Transpile `options.query` and return the spec as JSON.
pub fn execute_transpile(options: &TranspileOptions) -> Result<String, CliError> {
    let transpiler = Transpiler::with_config(options.config.to_config()?);
    let spec = transpiler.transpile(&options.query)?;
    Ok(JsonPrinter::new(options.pretty).print(&spec)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(query: &str) -> TranspileOptions {
        TranspileOptions {
            query: query.to_string(),
            config: ConfigOptions {
                database: Some("db0".into()),
                retention_policy: Some("weekly".into()),
                now: Some("2010-09-15T09:00:00Z".into()),
            },
            pretty: false,
        }
    }

    #[test]
    fn renders_the_spec() {
        let json = execute_transpile(&options("SELECT value FROM cpu")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["operations"][0]["spec"]["bucket"], "db0/weekly");
    }

    #[test]
    fn reports_query_errors() {
        let err = execute_transpile(&options("SELECT value FROM cpu SLIMIT 1")).unwrap_err();
        assert_eq!(err.to_string(), "unimplemented: SLIMIT");
        assert_eq!(err.exit_code(), 2);
    }
}
