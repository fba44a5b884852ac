//! Duration parsing and formatting.
//!
//! Two text forms are used: a compact display form (`MM:SS.mmm`, or
//! `H:MM:SS.mmm` past the hour) and the persisted form stored in run files
//! (`HH:MM:SS.fffffff`, ten-millionths of a second).

use std::time::Duration;

const NANOS_PER_MILLI: u128 = 1_000_000;

/// Parse `H:MM:SS.fff` or `MM:SS.fff`. Empty or unparsable input yields zero.
pub fn parse(text: &str) -> Duration {
    try_parse(text).unwrap_or(Duration::ZERO)
}

/// Parse like [`parse`], returning `None` for empty or malformed input.
pub fn try_parse(text: &str) -> Option<Duration> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let parts: Vec<&str> = text.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (parse_whole(h)?, parse_whole(m)?, *s),
        [m, s] => (0, parse_whole(m)?, *s),
        _ => return None,
    };

    let (whole_secs, sub_nanos) = parse_seconds(seconds)?;
    let total_secs = hours
        .checked_mul(3600)?
        .checked_add(minutes.checked_mul(60)?)?
        .checked_add(whole_secs)?;
    Some(Duration::new(total_secs, sub_nanos))
}

fn parse_whole(field: &str) -> Option<u64> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

/// Split `SS.fff…` into whole seconds and a nanosecond remainder.
/// Digits past nanosecond precision are truncated.
fn parse_seconds(field: &str) -> Option<(u64, u32)> {
    let (whole, fraction) = match field.split_once('.') {
        Some((w, f)) => (w, f),
        None => (field, ""),
    };
    let whole = parse_whole(whole)?;
    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let mut nanos: u32 = 0;
    for (i, digit) in fraction.bytes().take(9).enumerate() {
        nanos += u32::from(digit - b'0') * 10u32.pow(8 - i as u32);
    }
    Some((whole, nanos))
}

/// Round to the nearest millisecond, half away from zero.
fn round_millis(d: Duration) -> u128 {
    (d.as_nanos() + NANOS_PER_MILLI / 2) / NANOS_PER_MILLI
}

fn split_millis(total_ms: u128) -> (u128, u128, u128, u128) {
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    (total_secs / 3600, (total_secs / 60) % 60, total_secs % 60, ms)
}

/// Compact form for on-screen times.
pub fn format_display(d: Duration) -> String {
    let (h, m, s, ms) = split_millis(round_millis(d));
    if h > 0 {
        format!("{}:{:02}:{:02}.{:03}", h, m, s, ms)
    } else {
        format!("{:02}:{:02}.{:03}", m, s, ms)
    }
}

/// Fixed-precision form written to run files.
pub fn format_persisted(d: Duration) -> String {
    let (h, m, s, ms) = split_millis(round_millis(d));
    format!("{:02}:{:02}:{:02}.{:07}", h, m, s, ms * 10_000)
}

/// Signed comparison, e.g. `-00:01.250` when ahead of the baseline.
pub fn format_delta(delta: time::Duration) -> String {
    let sign = if delta.is_negative() { '-' } else { '+' };
    let nanos = delta.abs().whole_nanoseconds().min(u64::MAX as i128) as u64;
    format!("{}{}", sign, format_display(Duration::from_nanos(nanos)))
}

/// Signed difference `a - b`.
pub fn signed_diff(a: Duration, b: Duration) -> time::Duration {
    let nanos = a.as_nanos() as i128 - b.as_nanos() as i128;
    time::Duration::nanoseconds(nanos.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minutes_and_hours_forms() {
        assert_eq!(parse("01:02.500"), Duration::from_millis(62_500));
        assert_eq!(parse("1:01:02.500"), Duration::from_millis(3_662_500));
        assert_eq!(parse("00:00:10.0000000"), Duration::from_secs(10));
        assert_eq!(parse("00:00:00.1234567"), Duration::from_nanos(123_456_700));
    }

    #[test]
    fn empty_and_malformed_fall_back_to_zero() {
        assert_eq!(parse(""), Duration::ZERO);
        assert_eq!(parse("garbage"), Duration::ZERO);
        assert_eq!(parse("1:2:3:4"), Duration::ZERO);
        assert_eq!(parse("-00:00:01"), Duration::ZERO);
        assert_eq!(try_parse(""), None);
        assert_eq!(try_parse("ab:cd"), None);
        assert_eq!(try_parse("00:00"), Some(Duration::ZERO));
    }

    #[test]
    fn display_switches_format_past_the_hour() {
        assert_eq!(format_display(Duration::from_millis(62_500)), "01:02.500");
        assert_eq!(format_display(Duration::from_millis(3_662_500)), "1:01:02.500");
        assert_eq!(format_display(Duration::from_micros(1_999_600)), "00:02.000");
    }

    #[test]
    fn persisted_form_has_seven_fraction_digits() {
        assert_eq!(
            format_persisted(Duration::from_millis(25_000)),
            "00:00:25.0000000"
        );
        assert_eq!(
            format_persisted(Duration::from_millis(3_723_456)),
            "01:02:03.4560000"
        );
    }

    #[test]
    fn persisted_form_round_trips_at_millisecond_resolution() {
        for ms in [0u64, 1, 999, 1_000, 59_999, 60_000, 3_599_999, 3_600_000, 86_400_123] {
            let d = Duration::from_millis(ms);
            assert_eq!(parse(&format_persisted(d)), d, "{ms} ms");
        }
    }

    #[test]
    fn delta_carries_sign() {
        let ahead = signed_diff(Duration::from_secs(9), Duration::from_millis(10_250));
        assert_eq!(format_delta(ahead), "-00:01.250");
        let behind = signed_diff(Duration::from_secs(12), Duration::from_secs(10));
        assert_eq!(format_delta(behind), "+00:02.000");
    }
}
