//! Wire-safe JSON representations for extended value types.
//!
//! Payloads travel as plain JSON, so datetimes, durations, uuids and
//! decimals must be rendered to strings before they enter a payload map.
//! The formats here are load-bearing: the worker side parses them back,
//! so the rules (millisecond truncation, `Z` suffix, ISO-8601 durations,
//! hyphenless uuids) must not drift.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Timelike};
use serde_json::Value;
use std::fmt;

/// Render a datetime as ISO-8601. Sub-second precision is truncated to
/// milliseconds when present; a UTC offset is written as `Z`.
pub fn datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> Value
where
    Tz::Offset: fmt::Display,
{
    let fmt_str = if dt.timestamp_subsec_micros() > 0 {
        "%Y-%m-%dT%H:%M:%S%.3f%:z"
    } else {
        "%Y-%m-%dT%H:%M:%S%:z"
    };
    let mut s = dt.format(fmt_str).to_string();
    if let Some(stripped) = s.strip_suffix("+00:00") {
        s = format!("{stripped}Z");
    }
    Value::String(s)
}

/// Render a date as ISO-8601 (`YYYY-MM-DD`).
pub fn date(d: &NaiveDate) -> Value {
    Value::String(d.format("%Y-%m-%d").to_string())
}

/// Render a wall-clock time as ISO-8601, truncated to milliseconds when
/// sub-second precision is present. Offset-carrying times cannot be
/// expressed in payload JSON; `NaiveTime` rules them out by type.
pub fn time(t: &NaiveTime) -> Value {
    let fmt_str = if t.nanosecond() / 1_000 > 0 {
        "%H:%M:%S%.3f"
    } else {
        "%H:%M:%S"
    };
    Value::String(t.format(fmt_str).to_string())
}

/// Render a duration as an ISO-8601 duration string.
pub fn duration(d: &Duration) -> Value {
    Value::String(duration_iso_string(d))
}

/// `[-]P{days}DT{hh}H{mm}M{ss}[.{micro:06}]S`, with the microsecond
/// suffix only when non-zero. The exact shape is relied on by worker-side
/// parsing; keep it stable.
pub fn duration_iso_string(d: &Duration) -> String {
    let (sign, d) = if *d < Duration::zero() {
        ("-", -*d)
    } else {
        ("", *d)
    };

    let secs = d.num_seconds();
    let micros = (d - Duration::seconds(secs)).num_microseconds().unwrap_or(0);

    let days = secs / 86_400;
    let rem = secs % 86_400;
    let hours = rem / 3_600;
    let minutes = (rem % 3_600) / 60;
    let seconds = rem % 60;

    let ms = if micros != 0 {
        format!(".{micros:06}")
    } else {
        String::new()
    };
    format!("{sign}P{days}DT{hours:02}H{minutes:02}M{seconds:02}{ms}S")
}

/// Render a uuid as 32 lowercase hex characters, no hyphens.
pub fn uuid(u: &uuid::Uuid) -> Value {
    Value::String(u.simple().to_string())
}

/// Render a decimal (or any exact-precision numeric) via its string
/// form, sidestepping float rounding on the wire.
pub fn decimal<D: fmt::Display>(d: D) -> Value {
    Value::String(d.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn datetime_truncates_to_millis_and_uses_z() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 5, 12, 30, 45).unwrap()
            + Duration::microseconds(123_456);
        assert_eq!(
            datetime(&dt),
            Value::String("2024-03-05T12:30:45.123Z".into())
        );
    }

    #[test]
    fn datetime_whole_seconds_has_no_fraction() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 5, 12, 30, 45).unwrap();
        assert_eq!(datetime(&dt), Value::String("2024-03-05T12:30:45Z".into()));
    }

    #[test]
    fn date_and_time_iso() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(date(&d), Value::String("2024-01-31".into()));

        let t = NaiveTime::from_hms_micro_opt(9, 5, 1, 250_000).unwrap();
        assert_eq!(time(&t), Value::String("09:05:01.250".into()));

        let whole = NaiveTime::from_hms_opt(9, 5, 1).unwrap();
        assert_eq!(time(&whole), Value::String("09:05:01".into()));
    }

    #[test]
    fn duration_format_exact() {
        let d = Duration::days(2) + Duration::hours(3) + Duration::minutes(4) + Duration::seconds(5);
        assert_eq!(duration_iso_string(&d), "P2DT03H04M05S");
    }

    #[test]
    fn duration_with_micros() {
        let d = Duration::seconds(1) + Duration::microseconds(42);
        assert_eq!(duration_iso_string(&d), "P0DT00H00M01.000042S");
    }

    #[test]
    fn negative_duration_gets_sign() {
        let d = -(Duration::hours(1) + Duration::seconds(30));
        assert_eq!(duration_iso_string(&d), "-P0DT01H00M30S");
    }

    #[test]
    fn uuid_is_hyphenless_hex() {
        let u = uuid::Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        assert_eq!(
            uuid(&u),
            Value::String("67e5504410b1426f9247bb680e5fe0c8".into())
        );
    }

    #[test]
    fn decimal_is_stringly() {
        assert_eq!(decimal("19.99"), Value::String("19.99".into()));
    }
}
