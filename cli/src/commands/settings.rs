use anyhow::Result;

use nutritrack_core::session::{Session, SessionFile};

use super::helpers::{parse_reminder, print_json};

#[derive(Default)]
pub(crate) struct SettingsChange {
    pub theme: Option<String>,
    pub dark_mode: Option<bool>,
    pub system_theme: bool,
    pub notifications: Option<bool>,
    pub lunch: Option<String>,
    pub dinner: Option<String>,
}

pub(crate) fn cmd_settings_show(session_file: &SessionFile, json: bool) -> Result<()> {
    let session = session_file.load();
    if json {
        return print_json(&session);
    }
    print_settings(&session);
    Ok(())
}

pub(crate) fn cmd_settings_set(
    session_file: &SessionFile,
    change: SettingsChange,
    json: bool,
) -> Result<()> {
    let mut session = session_file.load();
    apply_change(&mut session, change)?;
    session_file.save(&session)?;

    if json {
        return print_json(&session);
    }
    print_settings(&session);
    Ok(())
}

fn apply_change(session: &mut Session, change: SettingsChange) -> Result<()> {
    if let Some(theme) = change.theme {
        session.theme = Some(theme);
    }
    if change.system_theme {
        session.dark_mode = None;
    } else if let Some(dark) = change.dark_mode {
        session.dark_mode = Some(dark);
    }
    if let Some(enabled) = change.notifications {
        session.notifications_enabled = enabled;
    }
    if let Some(t) = change.lunch {
        session.lunch_reminder = parse_reminder(&t)?;
    }
    if let Some(t) = change.dinner {
        session.dinner_reminder = parse_reminder(&t)?;
    }
    Ok(())
}

fn print_settings(session: &Session) {
    let mode = match session.dark_mode {
        Some(true) => "dark",
        Some(false) => "light",
        None => "system",
    };
    println!("  Theme:         {}", session.theme.as_deref().unwrap_or("default"));
    println!("  Mode:          {mode}");
    println!(
        "  Notifications: {}",
        if session.notifications_enabled { "on" } else { "off" }
    );
    println!("  Lunch:         {}", session.lunch_reminder);
    println!("  Dinner:        {}", session.dinner_reminder);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_change() {
        let mut session = Session::default();
        apply_change(
            &mut session,
            SettingsChange {
                theme: Some("ocean".to_string()),
                dark_mode: Some(true),
                notifications: Some(true),
                lunch: Some("12:30".to_string()),
                ..SettingsChange::default()
            },
        )
        .unwrap();
        assert_eq!(session.theme.as_deref(), Some("ocean"));
        assert_eq!(session.dark_mode, Some(true));
        assert!(session.notifications_enabled);
        assert_eq!(session.lunch_reminder, "12:30");
        assert_eq!(session.dinner_reminder, "19:00");

        apply_change(
            &mut session,
            SettingsChange {
                system_theme: true,
                ..SettingsChange::default()
            },
        )
        .unwrap();
        assert_eq!(session.dark_mode, None);
    }

    #[test]
    fn test_apply_change_rejects_bad_time() {
        let mut session = Session::default();
        let change = SettingsChange {
            dinner: Some("7pm".to_string()),
            ..SettingsChange::default()
        };
        assert!(apply_change(&mut session, change).is_err());
    }

    #[test]
    fn test_settings_persist() {
        let dir = tempfile::tempdir().unwrap();
        let file = SessionFile::new(dir.path().join("session.json"));
        cmd_settings_set(
            &file,
            SettingsChange {
                notifications: Some(true),
                ..SettingsChange::default()
            },
            true,
        )
        .unwrap();
        assert!(file.load().notifications_enabled);
    }
}
