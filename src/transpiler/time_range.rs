//! Time bounds: the `time` predicates of a `WHERE` clause and the
//! `GROUP BY time(...)` bucketing, resolved against a fixed `now`.

use crate::ast::{BinOp, Expr};
use crate::duration::Duration;
use crate::error::{Result, SyntaxError};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use regex::Regex;
use std::sync::LazyLock;

/// Smallest instant a time literal may hold (`1677-09-21T00:12:43.145224194Z`).
pub const MIN_TIME_NANOS: i64 = i64::MIN + 2;

/// Largest instant a time literal may hold (`2262-04-11T23:47:16.854775806Z`).
pub const MAX_TIME_NANOS: i64 = i64::MAX - 1;

static DATE_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})$")
        .expect("static date-time pattern")
});

static DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("static date pattern"));

pub fn min_time() -> DateTime<Utc> {
    DateTime::from_timestamp_nanos(MIN_TIME_NANOS)
}

pub fn max_time() -> DateTime<Utc> {
    DateTime::from_timestamp_nanos(MAX_TIME_NANOS)
}

/// Whether a string literal reads as an absolute instant.
pub fn is_time_string(value: &str) -> bool {
    DATE_TIME.is_match(value) || DATE.is_match(value)
}

/// Parse an RFC 3339 instant or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_time_string(value: &str) -> Option<DateTime<Utc>> {
    if DATE_TIME.is_match(value) {
        return DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|t| t.with_timezone(&Utc));
    }
    if DATE.is_match(value) {
        return NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc());
    }
    None
}

pub fn to_nanos(time: DateTime<Utc>) -> Option<i64> {
    time.timestamp_nanos_opt()
}

fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Inclusive bounds of a statement. `None` means unbounded on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeRange {
    pub min: Option<DateTime<Utc>>,
    pub max: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn intersect(self, other: TimeRange) -> TimeRange {
        TimeRange {
            min: match (self.min, other.min) {
                (Some(a), Some(b)) => Some(a.max(b)),
                (a, b) => a.or(b),
            },
            max: match (self.max, other.max) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            },
        }
    }

    /// Lower bound, defaulting to the earliest representable instant.
    pub fn start(&self) -> DateTime<Utc> {
        self.min.unwrap_or_else(min_time)
    }

    /// Upper bound. Windowed statements stop at `now` when no bound is given.
    pub fn stop(&self, windowed: bool, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.max {
            Some(max) => max,
            None if windowed => now,
            None => max_time(),
        }
    }
}

/// `GROUP BY time(every, offset)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub every: Duration,
    /// Always within `[0, every)`.
    pub offset: Duration,
}

impl Interval {
    /// Window alignment, when it differs from the epoch.
    pub fn start(&self) -> Option<DateTime<Utc>> {
        if self.offset.is_zero() {
            None
        } else {
            Some(DateTime::from_timestamp_nanos(self.offset.nanos()))
        }
    }
}

/// Range implied by `time <op> value`, with `time` on the left.
pub fn comparison_range(op: BinOp, value: &Expr) -> Result<TimeRange> {
    let nanos = match value {
        Expr::Time(time) => checked_literal(*time)?,
        Expr::String(s) if is_time_string(s) => {
            let time =
                parse_time_string(s).ok_or_else(|| SyntaxError::InvalidTimeLiteral(s.clone()))?;
            checked_literal(time)?
        }
        Expr::Duration(d) => checked_nanos(d.nanos())?,
        Expr::Integer(n) => checked_nanos(*n)?,
        Expr::Number(n) => checked_nanos(*n as i64)?,
        other => return Err(SyntaxError::IncompatibleTime(other.node_name()).into()),
    };

    let range = match op {
        BinOp::GreaterThan => TimeRange {
            min: Some(shifted(nanos, 1)?),
            max: None,
        },
        BinOp::GreaterEqual => TimeRange {
            min: Some(at(nanos)),
            max: None,
        },
        BinOp::LessThan => TimeRange {
            min: None,
            max: Some(shifted(nanos, -1)?),
        },
        BinOp::LessEqual => TimeRange {
            min: None,
            max: Some(at(nanos)),
        },
        BinOp::Equal => TimeRange {
            min: Some(at(nanos)),
            max: Some(at(nanos)),
        },
        other => return Err(SyntaxError::InvalidTimeComparison(other).into()),
    };
    Ok(range)
}

fn at(nanos: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_nanos(nanos)
}

/// Epoch nanoseconds written directly in a condition.
fn checked_nanos(nanos: i64) -> Result<i64> {
    checked_literal(at(nanos))
}

/// An exclusive bound moved onto the nearest included instant, which must
/// still lie within `[MIN_TIME_NANOS, MAX_TIME_NANOS]`.
fn shifted(nanos: i64, by: i64) -> Result<DateTime<Utc>> {
    let shifted = nanos.saturating_add(by);
    if shifted > MAX_TIME_NANOS {
        return Err(SyntaxError::TimeOverflow(format_time(at(shifted))).into());
    }
    if shifted < MIN_TIME_NANOS {
        return Err(SyntaxError::TimeUnderflow(format_time(at(shifted))).into());
    }
    Ok(at(shifted))
}

fn checked_literal(time: DateTime<Utc>) -> Result<i64> {
    match to_nanos(time) {
        Some(nanos) if nanos > MAX_TIME_NANOS => {
            Err(SyntaxError::TimeOverflow(format_time(time)).into())
        }
        Some(nanos) if nanos < MIN_TIME_NANOS + 1 => {
            Err(SyntaxError::TimeUnderflow(format_time(time)).into())
        }
        Some(nanos) => Ok(nanos),
        None if time > DateTime::UNIX_EPOCH => {
            Err(SyntaxError::TimeOverflow(format_time(time)).into())
        }
        None => Err(SyntaxError::TimeUnderflow(format_time(time)).into()),
    }
}
