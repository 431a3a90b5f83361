//! CLI support for influxql-transpiler
//!
//! Provides programmatic access to the `influxql-transpile` commands for
//! embedding in other tools.

mod check;
mod transpile;

pub use check::{CheckOptions, CheckResult, execute_check};
pub use transpile::{TranspileOptions, execute_transpile};

use crate::config::Config;
use crate::error::TranspileError;
use crate::transpiler::time_range::parse_time_string;
use std::io;
use thiserror::Error;

/// Errors that can occur during CLI operations
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Transpile(#[from] TranspileError),

    #[error("Invalid JSON output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("No query provided. Pass it as an argument or pipe it to stdin.")]
    NoInput,

    #[error("Invalid --now value '{0}': expected an RFC 3339 timestamp")]
    InvalidNow(String),
}

impl CliError {
    /// Process exit code: 2 for constructs that are not supported yet, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Transpile(err) if err.is_unimplemented() => 2,
            _ => 1,
        }
    }
}

/// Query settings shared by every command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ConfigOptions {
    /// Database for measurements that do not name one
    #[arg(short, long)]
    pub database: Option<String>,

    /// Retention policy for measurements that do not name one
    #[arg(short, long)]
    pub retention_policy: Option<String>,

    /// Fixed instant for now() (RFC 3339); defaults to the current time
    #[arg(long)]
    pub now: Option<String>,
}

impl ConfigOptions {
    pub fn to_config(&self) -> Result<Config, CliError> {
        let mut config = Config::new();
        if let Some(database) = &self.database {
            config = config.with_default_database(database.clone());
        }
        if let Some(retention_policy) = &self.retention_policy {
            config = config.with_default_retention_policy(retention_policy.clone());
        }
        if let Some(now) = &self.now {
            let now = parse_time_string(now).ok_or_else(|| CliError::InvalidNow(now.clone()))?;
            config = config.with_now(now);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_config_from_flags() {
        let options = ConfigOptions {
            database: Some("db0".into()),
            retention_policy: None,
            now: Some("2010-09-15T09:00:00Z".into()),
        };
        let config = options.to_config().unwrap();
        assert_eq!(config.default_database.as_deref(), Some("db0"));
        assert_eq!(config.retention_policy(), "autogen");
        assert_eq!(config.now().to_rfc3339(), "2010-09-15T09:00:00+00:00");
    }

    #[test]
    fn rejects_bad_now() {
        let options = ConfigOptions {
            now: Some("yesterday".into()),
            ..ConfigOptions::default()
        };
        let err = options.to_config().unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("yesterday"));
    }

    #[test]
    fn unimplemented_exits_with_two() {
        let err = CliError::from(TranspileError::unimplemented("SLIMIT"));
        assert_eq!(err.exit_code(), 2);
    }
}
