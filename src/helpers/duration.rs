//! Relative durations such as `240h`, `1.5h` or `-1h30m`, used for `end_date_relative`.
//!
//! The grammar is a possibly signed sequence of decimal numbers, each with an
//! optional fraction and a unit suffix. Valid units are `ns`, `us` (or `µs`),
//! `ms`, `s`, `m` and `h`. A bare `0` is also accepted.

use crate::error::{ValidationError, ValidationResult};
use chrono::Duration;

const NANOS_PER_MICROSECOND: u64 = 1_000;
const NANOS_PER_MILLISECOND: u64 = 1_000_000;
const NANOS_PER_SECOND: u64 = 1_000_000_000;
const NANOS_PER_MINUTE: u64 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: u64 = 60 * NANOS_PER_MINUTE;

/// Magnitude of the most negative representable duration.
const MAX_MAGNITUDE: u64 = 1 << 63;

/// Fraction digits beyond this are below nanosecond precision for every unit.
const MAX_FRACTION_DIGITS: usize = 18;

fn unit_nanos(unit: &str) -> Option<u64> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(NANOS_PER_MICROSECOND),
        "ms" => Some(NANOS_PER_MILLISECOND),
        "s" => Some(NANOS_PER_SECOND),
        "m" => Some(NANOS_PER_MINUTE),
        "h" => Some(NANOS_PER_HOUR),
        _ => None,
    }
}

fn split_digits(s: &str) -> (&str, &str) {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(end)
}

/// Parse a duration string such as `300ms`, `-1.5h` or `2h45m`.
pub fn parse_duration(attribute: &str, value: &str) -> ValidationResult<Duration> {
    let invalid = || ValidationError::InvalidDuration {
        attribute: attribute.to_string(),
        value: value.to_string(),
    };

    let (negative, mut rest) = if let Some(rest) = value.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = value.strip_prefix('+') {
        (false, rest)
    } else {
        (false, value)
    };

    if rest == "0" {
        return Ok(Duration::zero());
    }
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total: u64 = 0;
    while !rest.is_empty() {
        let (whole, after) = split_digits(rest);
        let (fraction, after) = match after.strip_prefix('.') {
            Some(after) => split_digits(after),
            None => ("", after),
        };
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }

        let unit_end = after
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(after.len());
        let (unit, after) = after.split_at(unit_end);
        let unit = unit_nanos(unit).ok_or_else(invalid)?;

        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let mut part = whole.checked_mul(unit).ok_or_else(invalid)?;

        if !fraction.is_empty() {
            let digits = &fraction[..fraction.len().min(MAX_FRACTION_DIGITS)];
            let numerator: u64 = digits.parse().map_err(|_| invalid())?;
            let scale = 10u128.pow(digits.len() as u32);
            let nanos = u128::from(numerator) * u128::from(unit) / scale;
            let nanos = u64::try_from(nanos).map_err(|_| invalid())?;
            part = part.checked_add(nanos).ok_or_else(invalid)?;
        }

        total = total.checked_add(part).ok_or_else(invalid)?;
        if total > MAX_MAGNITUDE {
            return Err(invalid());
        }
        rest = after;
    }

    let nanos = if negative {
        i64::try_from(-i128::from(total)).map_err(|_| invalid())?
    } else {
        i64::try_from(total).map_err(|_| invalid())?
    };
    Ok(Duration::nanoseconds(nanos))
}
