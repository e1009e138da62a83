use std::fmt::Display;

use chrono::{DateTime, Duration, Local, Locale, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::models::{Language, Timestamp};

fn locale(language: Language) -> Locale {
    match language {
        Language::En => Locale::en_US,
        Language::Id => Locale::id_ID,
    }
}

/// Compact elapsed time: `2d 3h`, `1h 5m`, `12m`, `40s`. Negative spans read `0m`.
pub fn format_duration(duration: Duration) -> String {
    let ms = duration.num_milliseconds();
    if ms < 0 {
        return "0m".to_string();
    }
    let seconds = ms / 1000;
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{days}d {}h", hours % 24)
    } else if hours > 0 {
        format!("{hours}h {}m", minutes % 60)
    } else if minutes > 0 {
        format!("{minutes}m")
    } else {
        format!("{seconds}s")
    }
}

/// `Xh Ym` (hours omitted when zero); `None` for spans under a minute.
pub fn format_hours_minutes(duration: Duration) -> Option<String> {
    let hours = duration.num_hours();
    let minutes = duration.num_minutes() % 60;
    if hours <= 0 && minutes <= 0 {
        return None;
    }
    if hours > 0 {
        Some(format!("{hours}h {minutes}m"))
    } else {
        Some(format!("{minutes}m"))
    }
}

/// `Monday, January 1, 2024` / `Senin, 1 Januari 2024`.
pub fn format_long_date<Tz: TimeZone>(at: &DateTime<Tz>, language: Language) -> String
where
    Tz::Offset: Display,
{
    let pattern = match language {
        Language::En => "%A, %B %-d, %Y",
        Language::Id => "%A, %-d %B %Y",
    };
    at.format_localized(pattern, locale(language)).to_string()
}

/// `January 1, 2024` / `1 Januari 2024`.
pub fn format_date<Tz: TimeZone>(at: &DateTime<Tz>, language: Language) -> String
where
    Tz::Offset: Display,
{
    let pattern = match language {
        Language::En => "%B %-d, %Y",
        Language::Id => "%-d %B %Y",
    };
    at.format_localized(pattern, locale(language)).to_string()
}

pub fn format_date_time<Tz: TimeZone>(at: &DateTime<Tz>, language: Language) -> String
where
    Tz::Offset: Display,
{
    format!("{} {}", format_date(at, language), at.format("%H:%M"))
}

/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM[:SS]` (local time) and `YYYY-MM-DD`
/// (UTC midnight).
pub fn parse_due_date(value: &str) -> Option<Timestamp> {
    let value = value.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Some(at.with_timezone(&Utc));
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, pattern) {
            return Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|at| at.with_timezone(&Utc));
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

pub fn is_overdue(due: Timestamp, now: Timestamp) -> bool {
    due < now
}

pub fn is_due_soon(due: Timestamp, now: Timestamp, hours_threshold: i64) -> bool {
    let diff = due - now;
    diff > Duration::zero() && diff < Duration::hours(hours_threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_buckets() {
        assert_eq!(format_duration(Duration::milliseconds(-5)), "0m");
        assert_eq!(format_duration(Duration::seconds(42)), "42s");
        assert_eq!(format_duration(Duration::minutes(12)), "12m");
        assert_eq!(format_duration(Duration::minutes(65)), "1h 5m");
        assert_eq!(format_duration(Duration::hours(51)), "2d 3h");
    }

    #[test]
    fn hours_minutes_skips_short_spans() {
        assert_eq!(format_hours_minutes(Duration::seconds(59)), None);
        assert_eq!(format_hours_minutes(Duration::minutes(45)).as_deref(), Some("45m"));
        assert_eq!(
            format_hours_minutes(Duration::minutes(125)).as_deref(),
            Some("2h 5m")
        );
        assert_eq!(format_hours_minutes(Duration::hours(3)).as_deref(), Some("3h 0m"));
    }

    #[test]
    fn long_date_is_localized_in_the_given_zone() {
        let utc = Utc.with_ymd_and_hms(2024, 1, 1, 20, 0, 0).unwrap();
        let jakarta = utc.with_timezone(&chrono_tz::Asia::Jakarta);
        assert_eq!(
            format_long_date(&jakarta, Language::En),
            "Tuesday, January 2, 2024"
        );
        let id = format_long_date(&jakarta, Language::Id);
        assert!(id.contains("Januari"), "{id}");
        assert!(id.ends_with("2 Januari 2024"), "{id}");

        let new_york = utc.with_timezone(&chrono_tz::America::New_York);
        assert_eq!(format_date(&new_york, Language::En), "January 1, 2024");
        assert_eq!(format_date_time(&new_york, Language::En), "January 1, 2024 15:00");
    }

    #[test]
    fn due_date_parsing() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_due_date("2024-05-01"), Some(expected));
        assert_eq!(parse_due_date("2024-05-01T00:00:00Z"), Some(expected));
        assert_eq!(parse_due_date("2024-05-01T07:00:00+07:00"), Some(expected));
        assert!(parse_due_date("2024-05-01T09:30").is_some());
        assert_eq!(parse_due_date("next week"), None);
    }

    #[test]
    fn overdue_and_due_soon() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert!(is_overdue(now - Duration::minutes(1), now));
        assert!(!is_overdue(now + Duration::minutes(1), now));
        assert!(is_due_soon(now + Duration::hours(2), now, 24));
        assert!(!is_due_soon(now + Duration::hours(30), now, 24));
        assert!(!is_due_soon(now - Duration::hours(2), now, 24));
    }
}
