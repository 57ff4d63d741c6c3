//! Duration parsing and formatting for CLI arguments and reports.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::{StackscopeError, StackscopeResult};

/// Parses a duration written as an integer with a unit suffix, e.g. `125ms`,
/// `2s`, `1m`.
pub fn parse_duration(s: &str) -> StackscopeResult<Duration> {
    let s = s.trim();
    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| invalid(s, "missing unit suffix (ns, us, ms, s, m, h)"))?;
    let (value, unit) = s.split_at(split);
    if value.is_empty() {
        return Err(invalid(s, "missing numeric value"));
    }
    let value: u64 = value
        .parse()
        .map_err(|_| invalid(s, "numeric value out of range"))?;
    let nanos = match unit {
        "ns" => value,
        "us" => value.saturating_mul(1_000),
        "ms" => value.saturating_mul(1_000_000),
        "s" => value.saturating_mul(1_000_000_000),
        "m" => value.saturating_mul(60_000_000_000),
        "h" => value.saturating_mul(3_600_000_000_000),
        other => return Err(invalid(s, &format!("unknown unit {other:?}"))),
    };
    Ok(Duration::from_nanos(nanos))
}

fn invalid(input: &str, reason: &str) -> StackscopeError {
    StackscopeError::InvalidArgument(format!("invalid duration {input:?}: {reason}"))
}

/// A `std::time::Duration` that round-trips through the `125ms` string form,
/// for clap arguments and config fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeDuration(pub Duration);

impl FromStr for ScopeDuration {
    type Err = StackscopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_duration(s).map(Self)
    }
}

impl fmt::Display for ScopeDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_duration_ns(self.0.as_nanos() as u64))
    }
}

impl Serialize for ScopeDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ScopeDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Renders a nanosecond count in a compact human form: `780ns`, `250us`,
/// `50ms`, `1.25s`, `2m30s`.
pub fn format_duration_ns(ns: u64) -> String {
    if ns < 1_000 {
        return format!("{ns}ns");
    }
    if ns < 1_000_000 {
        return format!("{}us", ns / 1_000);
    }
    if ns < 1_000_000_000 {
        let ms = ns as f64 / 1_000_000.0;
        return trim_zeros(format!("{ms:.2}"), "ms");
    }
    let total_secs = ns / 1_000_000_000;
    if total_secs < 60 {
        let s = ns as f64 / 1_000_000_000.0;
        return trim_zeros(format!("{s:.2}"), "s");
    }
    let mins = total_secs / 60;
    let secs = total_secs % 60;
    if secs == 0 {
        format!("{mins}m")
    } else {
        format!("{mins}m{secs}s")
    }
}

fn trim_zeros(mut num: String, unit: &str) -> String {
    if num.contains('.') {
        while num.ends_with('0') {
            num.pop();
        }
        if num.ends_with('.') {
            num.pop();
        }
    }
    format!("{num}{unit}")
}
