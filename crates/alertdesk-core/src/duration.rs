//! Compact duration strings such as `30m`, `2h` or `1h30m`.
//!
//! Supported units: `ms`, `s`, `m`, `h`, `d`, `w`. Components may be repeated
//! and combined; the result must be positive.

use std::time::Duration;

use crate::error::{CoreError, Result};

const UNITS: [(&str, u64); 6] = [
    ("ms", 1),
    ("s", 1_000),
    ("m", 60_000),
    ("h", 3_600_000),
    ("d", 86_400_000),
    ("w", 604_800_000),
];

/// Parses a duration string.
///
/// # Errors
///
/// Returns `CoreError::InvalidDuration` for empty, malformed, zero or
/// overflowing input.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let invalid = || CoreError::InvalidDuration {
        input: input.to_string(),
    };

    let mut rest = input.trim();
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total_ms: u64 = 0;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            return Err(invalid());
        }
        let amount: u64 = rest[..digits].parse().map_err(|_| invalid())?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        let (_, factor) = UNITS.iter().find(|(u, _)| *u == unit).ok_or_else(invalid)?;
        rest = &rest[unit_len..];

        let part = amount.checked_mul(*factor).ok_or_else(invalid)?;
        total_ms = total_ms.checked_add(part).ok_or_else(invalid)?;
    }

    if total_ms == 0 {
        return Err(invalid());
    }
    Ok(Duration::from_millis(total_ms))
}

/// Formats a duration with the largest units first, e.g. `1d2h`.
///
/// Sub-millisecond precision is dropped; a zero duration renders as `0s`.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let mut remaining = duration.as_millis() as u64;
    if remaining == 0 {
        return "0s".to_string();
    }

    let mut out = String::new();
    for (unit, factor) in UNITS.iter().rev() {
        let count = remaining / factor;
        if count > 0 {
            out.push_str(&count.to_string());
            out.push_str(unit);
            remaining -= count * factor;
        }
    }
    out
}
