//! Safe timestamp parsing and comparison for merge decisions.

use chrono::{DateTime, NaiveDate, Utc};

/// Gap above which two timestamps are treated as genuinely different,
/// switching from field-level blending to whole-record replacement.
/// Applied at both snapshot and per-task granularity.
pub const SIGNIFICANT_DIFF_MS: i64 = 1_000;

/// Parse an ISO-8601 timestamp, falling back to the Unix epoch for
/// missing, empty, or unparseable input. Total: never fails.
pub fn parse(value: Option<&str>) -> DateTime<Utc> {
    value.and_then(parse_opt).unwrap_or_else(epoch)
}

/// Strict variant: `None` when the input doesn't parse. Accepts RFC 3339
/// and bare dates, which show up in hand-edited documents.
pub fn parse_opt(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    None
}

pub fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

pub fn or_epoch(value: Option<DateTime<Utc>>) -> DateTime<Utc> {
    value.unwrap_or_else(epoch)
}

/// Absolute difference between two instants in milliseconds.
pub fn diff_ms(a: DateTime<Utc>, b: DateTime<Utc>) -> i64 {
    (a - b).num_milliseconds().abs()
}

/// Strictly greater than [`SIGNIFICANT_DIFF_MS`].
pub fn is_significant(diff_ms: i64) -> bool {
    diff_ms > SIGNIFICANT_DIFF_MS
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    #[test]
    fn parse_none_is_epoch() {
        assert_eq!(parse(None), epoch());
    }

    #[test]
    fn parse_garbage_is_epoch() {
        assert_eq!(parse(Some("not a date")), epoch());
        assert_eq!(parse(Some("")), epoch());
        assert_eq!(parse(Some("2024-13-99T99:99:99Z")), epoch());
    }

    #[test]
    fn parse_rfc3339() {
        let ts = parse(Some("2024-05-01T12:00:00Z"));
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn parse_offset_normalized_to_utc() {
        let ts = parse(Some("2024-05-01T14:00:00+02:00"));
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn parse_bare_date() {
        let ts = parse(Some("2024-05-01"));
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn diff_is_absolute() {
        let a = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let b = a + chrono::Duration::milliseconds(1500);
        assert_eq!(diff_ms(a, b), 1500);
        assert_eq!(diff_ms(b, a), 1500);
    }

    #[test]
    fn significance_boundary() {
        assert!(!is_significant(0));
        assert!(!is_significant(1_000));
        assert!(is_significant(1_001));
    }

    proptest! {
        #[test]
        fn parse_is_total(input in ".*") {
            // Any string yields a defined instant, never a panic.
            let _ = parse(Some(&input));
        }
    }
}
