use anyhow::{Context, Result};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use nutritrack_core::collections::new_id;
use nutritrack_core::models::{ActivityLevel, Gender, Goal, UserProfile};
use nutritrack_core::service::TrackerService;
use nutritrack_core::session::{Session, SessionFile};

use super::helpers::{active_profile, print_json, resolve_id, short_id};

pub(crate) struct ProfileInput {
    pub name: String,
    pub height: f64,
    pub weight: f64,
    pub age: u32,
    pub gender: String,
    pub activity: String,
    pub goal: String,
}

pub(crate) fn cmd_profile_create(
    svc: &TrackerService,
    session_file: &SessionFile,
    input: ProfileInput,
    json: bool,
) -> Result<()> {
    let profile = UserProfile {
        id: new_id(),
        name: input.name,
        avatar: None,
        height: input.height,
        weight: input.weight,
        age: input.age,
        gender: input.gender.parse::<Gender>()?,
        activity_level: input.activity.parse::<ActivityLevel>()?,
        goal: input.goal.parse::<Goal>()?,
        tdee: 0,
        target_calories: 0,
    };
    let saved = svc.save_profile(profile)?;

    let mut session = session_file.load();
    session.current_user_id = Some(saved.id.clone());
    session_file.save(&session)?;

    if json {
        print_json(&saved)?;
    } else {
        println!("Created profile '{}' ({})", saved.name, short_id(&saved.id));
        print_targets(&saved);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_profile_update(
    svc: &TrackerService,
    session: &Session,
    height: Option<f64>,
    weight: Option<f64>,
    age: Option<u32>,
    activity: Option<String>,
    goal: Option<String>,
    json: bool,
) -> Result<()> {
    let mut profile = active_profile(svc, session)?;
    if let Some(h) = height {
        profile.height = h;
    }
    if let Some(w) = weight {
        profile.weight = w;
    }
    if let Some(a) = age {
        profile.age = a;
    }
    if let Some(level) = activity {
        profile.activity_level = level.parse()?;
    }
    if let Some(g) = goal {
        profile.goal = g.parse()?;
    }
    let saved = svc.save_profile(profile)?;

    if json {
        print_json(&saved)?;
    } else {
        println!("Updated profile '{}'", saved.name);
        print_targets(&saved);
    }
    Ok(())
}

pub(crate) fn cmd_profile_show(svc: &TrackerService, session: &Session, json: bool) -> Result<()> {
    let profile = active_profile(svc, session)?;

    if json {
        return print_json(&profile);
    }

    println!("{} ({})", profile.name, short_id(&profile.id));
    println!("  Height:   {:.1} cm", profile.height);
    println!("  Weight:   {:.1} kg", profile.weight);
    println!("  Age:      {}", profile.age);
    println!("  Gender:   {}", profile.gender);
    println!("  Activity: {}", profile.activity_level);
    println!("  Goal:     {}", profile.goal);
    print_targets(&profile);
    Ok(())
}

pub(crate) fn cmd_profile_list(svc: &TrackerService, session: &Session, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct ProfileRow {
        #[tabled(rename = "")]
        active: &'static str,
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Weight (kg)")]
        weight: String,
        #[tabled(rename = "Goal")]
        goal: String,
        #[tabled(rename = "Target")]
        target: i64,
    }

    let profiles = svc.list_profiles()?;
    if json {
        return print_json(&profiles);
    }
    if profiles.is_empty() {
        eprintln!("No profiles yet. Use `nutritrack profile create` to add one.");
        return Ok(());
    }

    let current = session.current_user_id.as_deref();
    let rows: Vec<ProfileRow> = profiles
        .iter()
        .map(|p| ProfileRow {
            active: if current == Some(p.id.as_str()) { "*" } else { "" },
            id: short_id(&p.id),
            name: p.name.clone(),
            weight: format!("{:.1}", p.weight),
            goal: p.goal.to_string(),
            target: p.target_calories,
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..4)).with(Alignment::right()))
        .with(Modify::new(Columns::new(5..6)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_profile_switch(
    svc: &TrackerService,
    session_file: &SessionFile,
    id: &str,
    json: bool,
) -> Result<()> {
    let profiles = svc.list_profiles()?;
    let id = resolve_id(profiles.iter().map(|p| p.id.as_str()), id)?;
    let profile = svc
        .get_profile(&id)?
        .with_context(|| format!("Profile not found: {id}"))?;

    let mut session = session_file.load();
    session.current_user_id = Some(profile.id.clone());
    session_file.save(&session)?;

    if json {
        print_json(&profile)?;
    } else {
        println!("Switched to '{}'", profile.name);
    }
    Ok(())
}

pub(crate) fn cmd_profile_logout(session_file: &SessionFile, json: bool) -> Result<()> {
    let mut session = session_file.load();
    session.current_user_id = None;
    session_file.save(&session)?;

    if json {
        println!("{}", serde_json::json!({ "loggedOut": true }));
    } else {
        println!("Logged out");
    }
    Ok(())
}

/// Deletes the profile record only; its logs stay in the store.
pub(crate) fn cmd_profile_delete(
    svc: &TrackerService,
    session_file: &SessionFile,
    id: &str,
    json: bool,
) -> Result<()> {
    let profiles = svc.list_profiles()?;
    let id = resolve_id(profiles.iter().map(|p| p.id.as_str()), id)?;
    svc.delete_profile(&id)?;

    let mut session = session_file.load();
    if session.current_user_id.as_deref() == Some(id.as_str()) {
        session.current_user_id = None;
        session_file.save(&session)?;
    }

    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted profile {}", short_id(&id));
    }
    Ok(())
}

fn print_targets(profile: &UserProfile) {
    println!(
        "  TDEE: {} kcal | Target: {} kcal/day",
        profile.tdee, profile.target_calories
    );
}
