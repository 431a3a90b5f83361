use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

/// Retention policy used when neither the statement nor the configuration names one.
pub const DEFAULT_RETENTION_POLICY: &str = "autogen";

pub type NowFn = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Inputs that are not part of the query text.
///
/// The clock is read once per transpile call so every statement of a query
/// resolves `now()` to the same instant.
#[derive(Clone)]
pub struct Config {
    pub now_fn: NowFn,
    pub default_database: Option<String>,
    pub default_retention_policy: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Config::default()
    }

    pub fn with_now_fn<F>(mut self, now_fn: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.now_fn = Arc::new(now_fn);
        self
    }

    /// Pin `now()` to a fixed instant.
    pub fn with_now(self, now: DateTime<Utc>) -> Self {
        self.with_now_fn(move || now)
    }

    pub fn with_default_database(mut self, database: impl Into<String>) -> Self {
        self.default_database = Some(database.into());
        self
    }

    pub fn with_default_retention_policy(mut self, retention_policy: impl Into<String>) -> Self {
        self.default_retention_policy = Some(retention_policy.into());
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.now_fn)()
    }

    pub fn retention_policy(&self) -> &str {
        self.default_retention_policy
            .as_deref()
            .unwrap_or(DEFAULT_RETENTION_POLICY)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            now_fn: Arc::new(Utc::now),
            default_database: None,
            default_retention_policy: None,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("default_database", &self.default_database)
            .field("default_retention_policy", &self.default_retention_policy)
            .finish_non_exhaustive()
    }
}
