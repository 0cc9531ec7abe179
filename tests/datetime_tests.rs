use channel_post_bot::utils::datetime::{format_datetime, is_immediate, resolve};
use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;

fn moscow() -> Tz {
    chrono_tz::Europe::Moscow
}

fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    moscow()
        .with_ymd_and_hms(y, mo, d, h, mi, 0)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap()
}

#[test]
fn test_immediate_keywords_return_now() {
    let now = at(2025, 6, 10, 14, 0);
    for input in ["сейчас", "now", "немедленно", "  СЕЙЧАС  "] {
        assert_eq!(resolve(input, now, moscow()).unwrap(), now, "input: {input}");
        assert!(is_immediate(input));
    }
}

#[test]
fn test_resolution_is_idempotent() {
    let now = at(2025, 6, 10, 14, 0);
    let first = resolve("завтра 08:15", now, moscow()).unwrap();
    let second = resolve("завтра 08:15", now, moscow()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_bare_time_before_and_after() {
    // 15:30 requested at 14:00 -> today
    let before = at(2025, 6, 10, 14, 0);
    assert_eq!(
        resolve("15:30", before, moscow()).unwrap(),
        at(2025, 6, 10, 15, 30)
    );

    // 15:30 requested at 16:00 -> rolled forward exactly one day
    let after = at(2025, 6, 10, 16, 0);
    assert_eq!(
        resolve("15:30", after, moscow()).unwrap(),
        at(2025, 6, 11, 15, 30)
    );
}

#[test]
fn test_day_prefixes() {
    let now = at(2025, 6, 10, 14, 0);
    assert_eq!(
        resolve("сегодня 18:00", now, moscow()).unwrap(),
        at(2025, 6, 10, 18, 0)
    );
    assert_eq!(
        resolve("завтра 15:30", now, moscow()).unwrap(),
        at(2025, 6, 11, 15, 30)
    );
    assert_eq!(
        resolve("послезавтра 07:45", now, moscow()).unwrap(),
        at(2025, 6, 12, 7, 45)
    );
}

#[test]
fn test_explicit_date_has_no_rollover() {
    // Jan 25 is in the past relative to June 10, still resolves to Jan 25
    // of the current year
    let now = at(2025, 6, 10, 14, 0);
    assert_eq!(
        resolve("25.01 15:30", now, moscow()).unwrap(),
        at(2025, 1, 25, 15, 30)
    );
    assert_eq!(
        resolve("25/01 15:30", now, moscow()).unwrap(),
        at(2025, 1, 25, 15, 30)
    );
    assert_eq!(
        resolve("31.12.2026 23:59", now, moscow()).unwrap(),
        at(2026, 12, 31, 23, 59)
    );
}

#[test]
fn test_fallback_formats() {
    let now = at(2025, 6, 10, 14, 0);
    assert_eq!(
        resolve("2025-07-01 12:00", now, moscow()).unwrap(),
        at(2025, 7, 1, 12, 0)
    );
}

#[test]
fn test_parse_failures_are_errors_not_panics() {
    let now = at(2025, 6, 10, 14, 0);
    for input in [
        "",
        "   ",
        "abc",
        "25:70",
        "99.99 10:00",
        "31.02 10:00",
        "10:xx",
        "завтра в обед",
    ] {
        let result = resolve(input, now, moscow());
        assert!(result.is_err(), "input should fail: {input}");
        // The error renders a user-facing hint
        assert!(result.unwrap_err().user_hint().contains("15:30"));
    }
}

#[test]
fn test_timezone_is_respected() {
    // 12:00 Moscow is 09:00 UTC
    let now = at(2025, 6, 10, 10, 0);
    let resolved = resolve("12:00", now, moscow()).unwrap();
    assert_eq!(resolved, Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap());
}

#[test]
fn test_format_datetime_relative() {
    let now = at(2025, 6, 10, 14, 0);
    assert_eq!(format_datetime(at(2025, 6, 10, 15, 30), now, moscow()), "сегодня в 15:30");
    assert_eq!(format_datetime(at(2025, 6, 11, 9, 0), now, moscow()), "завтра в 09:00");
    assert_eq!(format_datetime(at(2025, 12, 31, 23, 59), now, moscow()), "31.12.2025 в 23:59");
}
