//! Nanosecond durations rendered the way InfluxQL prints them.
//!
//! InfluxQL writes a duration using the single largest unit that divides it
//! evenly, so `60s` prints as `1m` and `90s` prints as `90s`. The same form is
//! used inside error messages (`duration argument must be positive, got -2h`)
//! and in serialized window operators.

use serde::{Serialize, Serializer};
use std::fmt;

pub const NANOSECOND: i64 = 1;
pub const MICROSECOND: i64 = 1_000 * NANOSECOND;
pub const MILLISECOND: i64 = 1_000 * MICROSECOND;
pub const SECOND: i64 = 1_000 * MILLISECOND;
pub const MINUTE: i64 = 60 * SECOND;
pub const HOUR: i64 = 60 * MINUTE;
pub const DAY: i64 = 24 * HOUR;
pub const WEEK: i64 = 7 * DAY;

/// A signed span of time with nanosecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(i64);

impl Duration {
    pub const ZERO: Duration = Duration(0);

    /// The widest representable duration, used to collapse windows back into
    /// a single table after a windowed aggregate.
    pub const MAX: Duration = Duration(i64::MAX);

    pub const fn from_nanos(nanos: i64) -> Self {
        Duration(nanos)
    }

    pub const fn seconds(seconds: i64) -> Self {
        Duration(seconds * SECOND)
    }

    pub const fn minutes(minutes: i64) -> Self {
        Duration(minutes * MINUTE)
    }

    pub const fn nanos(self) -> i64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Scale a count by a unit suffix (`ns`, `u`, `µ`, `ms`, `s`, `m`, `h`, `d`, `w`).
    ///
    /// Returns `None` for an unknown unit or on overflow.
    pub fn from_unit(value: i64, unit: &str) -> Option<Self> {
        let scale = match unit {
            "ns" => NANOSECOND,
            "u" | "µ" | "us" => MICROSECOND,
            "ms" => MILLISECOND,
            "s" => SECOND,
            "m" => MINUTE,
            "h" => HOUR,
            "d" => DAY,
            "w" => WEEK,
            _ => return None,
        };
        value.checked_mul(scale).map(Duration)
    }

    pub fn checked_add(self, other: Duration) -> Option<Duration> {
        self.0.checked_add(other.0).map(Duration)
    }

    pub fn checked_sub(self, other: Duration) -> Option<Duration> {
        self.0.checked_sub(other.0).map(Duration)
    }

    pub fn checked_mul(self, factor: i64) -> Option<Duration> {
        self.0.checked_mul(factor).map(Duration)
    }

    pub fn checked_div(self, divisor: i64) -> Option<Duration> {
        self.0.checked_div(divisor).map(Duration)
    }

    pub fn checked_neg(self) -> Option<Duration> {
        self.0.checked_neg().map(Duration)
    }

    /// Remainder of `self` divided by `every`, always in `[0, every)`.
    pub fn rem_euclid(self, every: Duration) -> Duration {
        if every.0 == 0 {
            return Duration::ZERO;
        }
        Duration(self.0.rem_euclid(every.0))
    }

    pub fn to_time_delta(self) -> chrono::TimeDelta {
        chrono::TimeDelta::nanoseconds(self.0)
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = self.0;
        let units: [(i64, &str); 7] = [
            (WEEK, "w"),
            (DAY, "d"),
            (HOUR, "h"),
            (MINUTE, "m"),
            (SECOND, "s"),
            (MILLISECOND, "ms"),
            (MICROSECOND, "u"),
        ];
        if d == 0 {
            return write!(f, "0s");
        }
        for (scale, suffix) in units {
            if d % scale == 0 {
                return write!(f, "{}{}", d / scale, suffix);
            }
        }
        write!(f, "{}ns", d)
    }
}

impl Serialize for Duration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
