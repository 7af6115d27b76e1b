use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use serde::Serialize;

use nutritrack_core::models::UserProfile;
use nutritrack_core::service::TrackerService;
use nutritrack_core::session::Session;

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

/// Accepts "HH:MM" in 24-hour time.
pub(crate) fn parse_reminder(s: &str) -> Result<String> {
    chrono::NaiveTime::parse_from_str(s, "%H:%M")
        .with_context(|| format!("Invalid time '{s}'. Use HH:MM (24-hour)"))?;
    Ok(s.to_string())
}

/// The profile the session is logged in as.
pub(crate) fn active_profile(svc: &TrackerService, session: &Session) -> Result<UserProfile> {
    if session.current_user_id.is_none() {
        bail!("No active profile. Use `nutritrack profile switch <id>` or `nutritrack profile create`");
    }
    svc.resume_session(session)?
        .context("Active profile no longer exists. Use `nutritrack profile switch <id>`")
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
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

/// First eight characters of a uuid, enough to pick out a row.
pub(crate) fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

/// Match a full id or a unique prefix of one (as printed by [`short_id`]).
pub(crate) fn resolve_id<'a>(ids: impl IntoIterator<Item = &'a str>, wanted: &str) -> Result<String> {
    let matches: Vec<&str> = ids.into_iter().filter(|id| id.starts_with(wanted)).collect();
    if let Some(exact) = matches.iter().find(|id| **id == wanted) {
        return Ok((*exact).to_string());
    }
    match matches.as_slice() {
        [] => bail!("No entry with id '{wanted}'"),
        [one] => Ok((*one).to_string()),
        _ => bail!("Id '{wanted}' is ambiguous ({} matches)", matches.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_id() {
        let ids = ["abc123", "abd456", "x"];
        assert_eq!(resolve_id(ids, "abc").unwrap(), "abc123");
        assert_eq!(resolve_id(ids, "x").unwrap(), "x");
        assert!(resolve_id(ids, "ab").is_err());
        assert!(resolve_id(ids, "zzz").is_err());
    }

    #[test]
    fn test_parse_date_none() {
        let today = Local::now().date_naive();
        assert_eq!(parse_date(None).unwrap(), today);
    }

    #[test]
    fn test_parse_date_keywords() {
        let today = Local::now().date_naive();
        assert_eq!(parse_date(Some("today".to_string())).unwrap(), today);
        assert_eq!(
            parse_date(Some("yesterday".to_string())).unwrap(),
            today - chrono::Duration::days(1)
        );
        assert_eq!(
            parse_date(Some("tomorrow".to_string())).unwrap(),
            today + chrono::Duration::days(1)
        );
    }

    #[test]
    fn test_parse_date_iso() {
        let date = parse_date(Some("2024-01-15".to_string())).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn test_parse_date_invalid() {
        assert!(parse_date(Some("nope".to_string())).is_err());
    }

    #[test]
    fn test_parse_reminder() {
        assert_eq!(parse_reminder("07:30").unwrap(), "07:30");
        assert!(parse_reminder("25:00").is_err());
        assert!(parse_reminder("noon").is_err());
    }

    #[test]
    fn test_active_profile_requires_session() {
        let svc = TrackerService::new_in_memory().unwrap();
        assert!(active_profile(&svc, &Session::default()).is_err());

        let session = Session {
            current_user_id: Some("gone".to_string()),
            ..Session::default()
        };
        assert!(active_profile(&svc, &session).is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world this is long", 10), "hello w...");
    }

    #[test]
    fn test_truncate_utf8() {
        assert_eq!(truncate("Crème fraîche", 10), "Crème f...");
        assert_eq!(truncate("日清カップヌードル", 8), "日清カップ...");
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0f8fad5b-d9cb-469f-a165-70867728950e"), "0f8fad5b");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn test_no_neg_zero() {
        assert_eq!(no_neg_zero(-0.0).to_bits(), 0.0_f64.to_bits());
        assert_eq!(no_neg_zero(5.0), 5.0);
    }
}
