use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;

pub(crate) fn parse_serving(s: &str) -> Result<f64> {
    let trimmed = s.trim_end_matches('g').trim();
    let value: f64 = trimmed.parse().with_context(|| {
        format!("Invalid quantity: '{s}'. Use a number like '200' or '200g'")
    })?;
    if value <= 0.0 {
        bail!("Quantity must be greater than 0");
    }
    Ok(value)
}

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(Local::now().date_naive()),
        Some(s) => match s.as_str() {
            "today" => Ok(Local::now().date_naive()),
            "yesterday" => Ok(Local::now().date_naive() - chrono::Duration::days(1)),
            "tomorrow" => Ok(Local::now().date_naive() + chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d").with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
            }),
        },
    }
}

/// Combine a date with an optional `HH:MM` time. Without a time, today's
/// entries use the current clock and other days use noon.
pub(crate) fn consumed_at(date: NaiveDate, time: Option<&str>) -> Result<NaiveDateTime> {
    let time = match time {
        Some(t) => NaiveTime::parse_from_str(t.trim(), "%H:%M")
            .with_context(|| format!("Invalid time '{t}'. Use HH:MM"))?,
        None if date == Local::now().date_naive() => Local::now().time(),
        None => NaiveTime::from_hms_opt(12, 0, 0).context("invalid default time")?,
    };
    Ok(date.and_time(time.with_nanosecond(0).unwrap_or(time)))
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn no_neg_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serving() {
        assert!((parse_serving("200").unwrap() - 200.0).abs() < f64::EPSILON);
        assert!((parse_serving("200g").unwrap() - 200.0).abs() < f64::EPSILON);
        assert!((parse_serving("200.5g").unwrap() - 200.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_serving_rejects_non_positive() {
        assert!(parse_serving("0").is_err());
        assert!(parse_serving("-50g").is_err());
        assert!(parse_serving("abc").is_err());
    }

    #[test]
    fn test_parse_date_keywords() {
        let today = Local::now().date_naive();
        assert_eq!(parse_date(None).unwrap(), today);
        assert_eq!(parse_date(Some("today".to_string())).unwrap(), today);
        assert_eq!(
            parse_date(Some("yesterday".to_string())).unwrap(),
            today - chrono::Duration::days(1)
        );
    }

    #[test]
    fn test_parse_date_iso() {
        let date = parse_date(Some("2024-01-15".to_string())).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert!(parse_date(Some("nope".to_string())).is_err());
    }

    #[test]
    fn test_consumed_at() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let at = consumed_at(date, Some("07:45")).unwrap();
        assert_eq!(at.to_string(), "2024-01-15 07:45:00");
        let at = consumed_at(date, None).unwrap();
        assert_eq!(at.to_string(), "2024-01-15 12:00:00");
        assert!(consumed_at(date, Some("7pm")).is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world this is long", 10), "hello w...");
        assert_eq!(truncate("Crème fraîche", 10), "Crème f...");
    }

    #[test]
    fn test_no_neg_zero() {
        assert_eq!(no_neg_zero(-0.0).to_bits(), 0.0_f64.to_bits());
        assert!((no_neg_zero(5.0) - 5.0).abs() < f64::EPSILON);
    }
}
