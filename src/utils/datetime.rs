use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

/// Schedule input could not be parsed. The user-facing rendering carries
/// an example-based hint.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("could not parse schedule input '{input}'")]
pub struct ScheduleParseError {
    pub input: String,
}

impl ScheduleParseError {
    pub fn user_hint(&self) -> String {
        "❌ Не удалось распознать дату/время.\n\n\
         Используйте формат:\n\
         • <code>15:30</code> — сегодня\n\
         • <code>завтра 15:30</code>\n\
         • <code>25.01 15:30</code>\n\
         • <code>сейчас</code> — опубликовать немедленно"
            .to_string()
    }
}

const IMMEDIATE_KEYWORDS: &[&str] = &["now", "сейчас", "немедленно"];

const DAY_PREFIXES: &[(&str, i64)] = &[("сегодня", 0), ("завтра", 1), ("послезавтра", 2)];

/// Formats tried by the free-form fallback, day before month.
const FALLBACK_FORMATS: &[&str] = &[
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d/%m/%Y %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Whether the input is one of the immediate-publication keywords.
pub fn is_immediate(text: &str) -> bool {
    IMMEDIATE_KEYWORDS.contains(&text.trim().to_lowercase().as_str())
}

/// Parse free-text schedule input into an absolute instant.
///
/// Recognized inputs, in priority order:
/// 1. `now` / `сейчас` / `немедленно` — publish immediately
/// 2. `сегодня` / `завтра` / `послезавтра`, optionally followed by `HH:MM`
/// 3. bare `HH:MM` — today, rolled forward one day if already past
/// 4. `DD.MM HH:MM` or `DD.MM.YYYY HH:MM` — absolute, no rollover
/// 5. a day-first format battery as fallback
///
/// Stateless and idempotent for identical `text` and `now`.
pub fn resolve(text: &str, now: DateTime<Utc>, tz: Tz) -> Result<DateTime<Utc>, ScheduleParseError> {
    let input = text.trim().to_lowercase();
    let parse_error = || ScheduleParseError {
        input: text.trim().to_string(),
    };

    if input.is_empty() {
        return Err(parse_error());
    }

    if IMMEDIATE_KEYWORDS.contains(&input.as_str()) {
        return Ok(now);
    }

    let local_now = now.with_timezone(&tz);
    let mut target_date = local_now.date_naive();
    let mut has_day_prefix = false;
    let mut time_part = input.as_str();

    for (name, offset) in DAY_PREFIXES {
        if let Some(rest) = input.strip_prefix(name) {
            target_date = local_now.date_naive() + Duration::days(*offset);
            has_day_prefix = true;
            time_part = rest.trim_start();
            break;
        }
    }

    // Day prefix without a time resolves to the current time of day
    if has_day_prefix && time_part.is_empty() {
        return localize(target_date.and_time(local_now.time()), tz).ok_or_else(parse_error);
    }

    // Bare HH:MM (with optional day prefix)
    if !time_part.contains(char::is_whitespace) && time_part.contains(':') {
        if let Some(time) = parse_hhmm(time_part) {
            let resolved = localize(target_date.and_time(time), tz).ok_or_else(parse_error)?;
            // If the time has passed today and no date was given, schedule
            // for tomorrow
            if !has_day_prefix && resolved <= now {
                let tomorrow = target_date + Duration::days(1);
                return localize(tomorrow.and_time(time), tz).ok_or_else(parse_error);
            }
            return Ok(resolved);
        }
        // Not a clean HH:MM, let the fallback battery have a go
    }

    // DD.MM[.YYYY] HH:MM — absolute instant, no rollover
    let tokens: Vec<&str> = time_part.split_whitespace().collect();
    if tokens.len() == 2 {
        if let (Some(date), Some(time)) = (
            parse_date_token(tokens[0], local_now.year()),
            parse_hhmm(tokens[1]),
        ) {
            return localize(date.and_time(time), tz).ok_or_else(parse_error);
        }
    }

    // Fallback format battery
    for format in FALLBACK_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(time_part, format) {
            return localize(naive, tz).ok_or_else(parse_error);
        }
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(time_part) {
        return Ok(parsed.with_timezone(&Utc));
    }

    Err(parse_error())
}

/// Format an instant for display, relative to `now`.
pub fn format_datetime(dt: DateTime<Utc>, now: DateTime<Utc>, tz: Tz) -> String {
    let local = dt.with_timezone(&tz);
    let local_now = now.with_timezone(&tz);

    if local.date_naive() == local_now.date_naive() {
        format!("сегодня в {}", local.format("%H:%M"))
    } else if local.date_naive() == local_now.date_naive() + Duration::days(1) {
        format!("завтра в {}", local.format("%H:%M"))
    } else {
        local.format("%d.%m.%Y в %H:%M").to_string()
    }
}

fn parse_hhmm(s: &str) -> Option<NaiveTime> {
    let (hours, minutes) = s.split_once(':')?;
    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    NaiveTime::from_hms_opt(hours, minutes, 0)
}

fn parse_date_token(s: &str, default_year: i32) -> Option<NaiveDate> {
    let normalized = s.replace('/', ".");
    let segments: Vec<&str> = normalized.split('.').filter(|p| !p.is_empty()).collect();
    if segments.len() < 2 || segments.len() > 3 {
        return None;
    }
    let day: u32 = segments[0].parse().ok()?;
    let month: u32 = segments[1].parse().ok()?;
    let year: i32 = match segments.get(2) {
        Some(raw) => raw.parse().ok()?,
        None => default_year,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

fn localize(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Utc>> {
    // DST gaps yield no local representation; ambiguous times take the
    // earlier offset
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}
