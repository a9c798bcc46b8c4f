//! Duration strings (`7d`, `36h`, `90s`).

use crate::{Error, Result};
use chrono::TimeDelta;

/// Parses a duration string such as `5d`, `12h`, `30m`, `90s`, `250ms` or `2w`.
///
/// A bare number is read as days. Units are case-insensitive, and `us` and
/// `ns` cover sub-millisecond precision.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for empty input, a missing or signed
/// number, an unknown unit, or a value too large to represent.
///
/// # Examples
///
/// ```
/// use cellgc::parse_duration;
/// use chrono::TimeDelta;
///
/// assert_eq!(parse_duration("5d")?, TimeDelta::days(5));
/// assert_eq!(parse_duration("90s")?, TimeDelta::seconds(90));
/// # Ok::<(), cellgc::Error>(())
/// ```
pub fn parse_duration(input: &str) -> Result<TimeDelta> {
    let duration = input.trim().to_lowercase();
    let invalid = |reason: &str| Error::InvalidInput(format!("invalid duration '{input}': {reason}"));

    let split = duration
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(duration.len());
    let (num_str, unit) = duration.split_at(split);

    if num_str.is_empty() {
        return Err(invalid("expected a number"));
    }
    let num: i64 = num_str.parse().map_err(|_| invalid("number out of range"))?;

    let delta = match unit.trim() {
        "ns" => Some(TimeDelta::nanoseconds(num)),
        "us" => Some(TimeDelta::microseconds(num)),
        "ms" => TimeDelta::try_milliseconds(num),
        "s" => TimeDelta::try_seconds(num),
        "m" => TimeDelta::try_minutes(num),
        "h" => TimeDelta::try_hours(num),
        // Default to days for "d" and no unit
        "d" | "" => TimeDelta::try_days(num),
        "w" => TimeDelta::try_weeks(num),
        other => return Err(invalid(&format!("unknown unit '{other}'"))),
    };

    delta.ok_or_else(|| invalid("value out of range"))
}

/// Formats a duration in the largest unit that represents it exactly.
///
/// Sub-millisecond durations are written in `us` or `ns`.
#[must_use]
pub fn format_duration(duration: TimeDelta) -> String {
    const UNITS: [(i128, &str); 6] = [
        (86_400_000_000_000, "d"),
        (3_600_000_000_000, "h"),
        (60_000_000_000, "m"),
        (1_000_000_000, "s"),
        (1_000_000, "ms"),
        (1_000, "us"),
    ];

    let nanos = i128::from(duration.num_seconds()) * 1_000_000_000
        + i128::from(duration.subsec_nanos());
    if nanos == 0 {
        return "0s".to_string();
    }
    for (size, unit) in UNITS {
        if nanos % size == 0 {
            return format!("{}{unit}", nanos / size);
        }
    }
    format!("{nanos}ns")
}
