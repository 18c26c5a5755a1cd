//! Temporal sublanguage for AX/AS queries.
//!
//! Accepts a single expression and produces either an instant or a range,
//! in priority order: literals (`now`, `today`, `yesterday`, `last week`),
//! relative forms (`3 days ago`, `in 2 weeks`), named days (`last friday`,
//! `this mon`), then a fixed ladder of absolute date formats.
//!
//! All arithmetic is UTC. Relative months are approximated as 30 days and
//! years as 365 days. `over N<unit>` is not a date; it is parsed by
//! [`crate::attestation::OverComparison`] and recorded on the filter.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc, Weekday};
use thiserror::Error;

/// Milliseconds in one day.
pub const DAY_MS: i64 = 86_400_000;

/// A resolved temporal expression: a single instant or a half-open range
/// expressed with inclusive millisecond bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSpec {
    Instant(i64),
    Range { start: i64, end: i64 },
}

impl TimeSpec {
    /// The representative instant: the instant itself, or the range start.
    pub fn instant(self) -> i64 {
        match self {
            TimeSpec::Instant(ms) => ms,
            TimeSpec::Range { start, .. } => start,
        }
    }

    /// Promote to the enclosing day: `[startOfDay, startOfDay + 24h)`,
    /// expressed with an inclusive end bound.
    pub fn into_day_range(self) -> TimeSpec {
        let start = start_of_day_ms(self.instant());
        TimeSpec::Range {
            start,
            end: start + DAY_MS - 1,
        }
    }
}

/// Failure to interpret a temporal expression.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("cannot interpret '{input}' as a date or time")]
pub struct TemporalError {
    pub input: String,
}

impl TemporalError {
    /// The fixed suggestion catalogue surfaced with temporal diagnostics.
    pub fn suggestions() -> Vec<String> {
        vec![
            "ISO date: 2024-01-15 or 2024-01-15T09:30:00Z".to_string(),
            "relative: 3 days ago, in 2 weeks, yesterday".to_string(),
            "named day: last friday, next mon, this tuesday".to_string(),
        ]
    }
}

/// Parse a temporal expression relative to `now`.
pub fn parse_when(expr: &str, now: DateTime<Utc>) -> Result<TimeSpec, TemporalError> {
    let trimmed = expr.trim();
    if trimmed.is_empty() {
        return Err(TemporalError {
            input: expr.to_string(),
        });
    }
    let lower = trimmed.to_lowercase();

    if let Some(spec) = parse_literal(&lower, now) {
        return Ok(spec);
    }
    if let Some(spec) = parse_relative(&lower, now) {
        return Ok(spec);
    }
    if let Some(spec) = parse_named_day(&lower, now) {
        return Ok(spec);
    }
    if let Some(spec) = parse_absolute(trimmed) {
        return Ok(spec);
    }

    Err(TemporalError {
        input: expr.to_string(),
    })
}

fn parse_literal(lower: &str, now: DateTime<Utc>) -> Option<TimeSpec> {
    let ms = now.timestamp_millis();
    match lower {
        "now" | "today" => Some(TimeSpec::Instant(ms)),
        "yesterday" => Some(TimeSpec::Instant(ms - DAY_MS)),
        "tomorrow" => Some(TimeSpec::Instant(ms + DAY_MS)),
        "last week" => Some(TimeSpec::Instant(ms - 7 * DAY_MS)),
        "next week" => Some(TimeSpec::Instant(ms + 7 * DAY_MS)),
        "last month" => Some(TimeSpec::Instant(ms - 30 * DAY_MS)),
        "next month" => Some(TimeSpec::Instant(ms + 30 * DAY_MS)),
        "last year" => Some(TimeSpec::Instant(ms - 365 * DAY_MS)),
        "next year" => Some(TimeSpec::Instant(ms + 365 * DAY_MS)),
        _ => None,
    }
}

/// `<N> <unit> ago` and `in <N> <unit>`. N must be a non-negative integer.
fn parse_relative(lower: &str, now: DateTime<Utc>) -> Option<TimeSpec> {
    let words: Vec<&str> = lower.split_whitespace().collect();

    let (n, unit, backwards) = match words.as_slice() {
        [n, unit, "ago"] => (*n, *unit, true),
        ["in", n, unit] => (*n, *unit, false),
        _ => return None,
    };

    let n: i64 = n.parse().ok().filter(|v| *v >= 0)?;
    let unit_ms = unit_millis(unit)?;

    let ms = now.timestamp_millis();
    let delta = n.checked_mul(unit_ms)?;
    Some(TimeSpec::Instant(if backwards {
        ms - delta
    } else {
        ms + delta
    }))
}

fn unit_millis(unit: &str) -> Option<i64> {
    match unit {
        "second" | "seconds" | "sec" | "secs" => Some(1_000),
        "minute" | "minutes" | "min" | "mins" => Some(60_000),
        "hour" | "hours" | "hr" | "hrs" => Some(3_600_000),
        "day" | "days" => Some(DAY_MS),
        "week" | "weeks" => Some(7 * DAY_MS),
        "month" | "months" => Some(30 * DAY_MS),
        "year" | "years" => Some(365 * DAY_MS),
        _ => None,
    }
}

/// `last|next|this <weekday>`; weekday full or 3-letter short.
///
/// "last X" yields the most recent strictly-past X: when today is X, the
/// result is seven days ago. "next X" is strictly future. "this X" resolves
/// within the current Monday-based week, which can land in the past.
fn parse_named_day(lower: &str, now: DateTime<Utc>) -> Option<TimeSpec> {
    let words: Vec<&str> = lower.split_whitespace().collect();
    let (qualifier, day_word) = match words.as_slice() {
        [q @ ("last" | "next" | "this"), d] => (*q, *d),
        _ => return None,
    };
    let target = parse_weekday(day_word)?;

    let today = now.date_naive();
    let today_offset = today.weekday().num_days_from_monday() as i64;
    let target_offset = target.num_days_from_monday() as i64;

    let date = match qualifier {
        "last" => {
            let mut back = (today_offset - target_offset).rem_euclid(7);
            if back == 0 {
                back = 7;
            }
            today - Duration::days(back)
        }
        "next" => {
            let mut ahead = (target_offset - today_offset).rem_euclid(7);
            if ahead == 0 {
                ahead = 7;
            }
            today + Duration::days(ahead)
        }
        _ => today - Duration::days(today_offset) + Duration::days(target_offset),
    };

    Some(TimeSpec::Instant(midnight_ms(date)))
}

fn parse_weekday(word: &str) -> Option<Weekday> {
    match word {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Absolute formats, most specific first. Naive forms are taken as UTC.
fn parse_absolute(text: &str) -> Option<TimeSpec> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(TimeSpec::Instant(dt.timestamp_millis()));
    }

    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%SZ",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%MZ",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(TimeSpec::Instant(naive.and_utc().timestamp_millis()));
        }
    }

    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%m-%d-%Y", "%Y/%m/%d"];
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(TimeSpec::Instant(midnight_ms(date)));
        }
    }

    None
}

fn midnight_ms(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc().timestamp_millis())
        .unwrap_or(0)
}

/// Truncate an instant to the start of its UTC day.
pub fn start_of_day_ms(ms: i64) -> i64 {
    match Utc.timestamp_millis_opt(ms).single() {
        Some(dt) => midnight_ms(dt.date_naive()),
        None => ms - ms.rem_euclid(DAY_MS),
    }
}
