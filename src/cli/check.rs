//! Validate queries without printing their spec

use super::{CliError, ConfigOptions};
use crate::parser::parse_query;
use crate::transpiler::Transpiler;

/// Options for the check command
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// The InfluxQL query
    pub query: String,
    pub config: ConfigOptions,
    /// Only validate syntax, don't compile
    pub syntax_only: bool,
}

/// Result of a check operation
#[derive(Debug, PartialEq, Eq)]
pub enum CheckResult {
    /// The query parses
    SyntaxValid { statements: usize },
    /// The query compiles into a valid spec
    Valid { statements: usize, operations: usize },
}

/// Execute a check operation
pub fn execute_check(options: &CheckOptions) -> Result<CheckResult, CliError> {
    let query = parse_query(&options.query).map_err(crate::error::TranspileError::from)?;
    if options.syntax_only {
        return Ok(CheckResult::SyntaxValid {
            statements: query.statements.len(),
        });
    }

    let transpiler = Transpiler::with_config(options.config.to_config()?);
    let spec = transpiler.transpile_query(&query)?;
    Ok(CheckResult::Valid {
        statements: query.statements.len(),
        operations: spec.operations.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(query: &str, syntax_only: bool) -> Result<CheckResult, CliError> {
        execute_check(&CheckOptions {
            query: query.to_string(),
            config: ConfigOptions {
                database: Some("db0".into()),
                ..ConfigOptions::default()
            },
            syntax_only,
        })
    }

    #[test]
    fn syntax_only_skips_compilation() {
        let result = check("SELECT value FROM cpu GROUP BY time(1m)", true).unwrap();
        assert_eq!(result, CheckResult::SyntaxValid { statements: 1 });
        let err = check("SELECT value FROM cpu GROUP BY time(1m)", false).unwrap_err();
        assert_eq!(err.to_string(), "GROUP BY requires at least one aggregate function");
    }

    #[test]
    fn counts_operations() {
        let result = check("SELECT mean(value) FROM cpu; SELECT max(value) FROM cpu", false).unwrap();
        assert_eq!(
            result,
            CheckResult::Valid {
                statements: 2,
                operations: 14,
            }
        );
    }
}
