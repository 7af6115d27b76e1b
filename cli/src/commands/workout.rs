use anyhow::{Result, bail};
use chrono::Utc;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use nutritrack_core::collections::new_id;
use nutritrack_core::models::WorkoutLogItem;
use nutritrack_core::service::TrackerService;
use nutritrack_core::session::Session;

use super::helpers::{active_profile, parse_date, print_json, resolve_id, short_id, truncate};

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_workout_add(
    svc: &TrackerService,
    session: &Session,
    exercise: String,
    sets: u32,
    reps: u32,
    weight: f64,
    tags: Vec<String>,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    if exercise.trim().is_empty() {
        bail!("Exercise name must not be empty");
    }
    if weight < 0.0 {
        bail!("Weight must not be negative");
    }
    let user = active_profile(svc, session)?;
    let item = WorkoutLogItem {
        id: new_id(),
        exercise,
        sets,
        reps,
        weight,
        date: parse_date(date)?,
        tags,
        timestamp: Utc::now().timestamp_millis(),
    };
    svc.collections().add_workout(&user.id, &item)?;

    if json {
        print_json(&item)?;
    } else {
        println!(
            "Logged {} {}x{} @ {:.1} kg for {} [{}]",
            item.exercise,
            item.sets,
            item.reps,
            item.weight,
            item.date.format("%Y-%m-%d"),
            short_id(&item.id)
        );
    }
    Ok(())
}

pub(crate) fn cmd_workout_list(
    svc: &TrackerService,
    session: &Session,
    date: Option<String>,
    all: bool,
    json: bool,
) -> Result<()> {
    let user = active_profile(svc, session)?;
    let api = svc.collections();
    let workouts = if all {
        api.list_workouts(&user.id)?
    } else {
        api.list_workouts_for_date(&user.id, parse_date(date)?)?
    };

    if json {
        return print_json(&workouts);
    }
    if workouts.is_empty() {
        eprintln!("No workouts found. Use `nutritrack workout add` to log one.");
        return Ok(());
    }
    print_workouts(&workouts);
    Ok(())
}

pub(crate) fn cmd_workout_delete(
    svc: &TrackerService,
    session: &Session,
    id: &str,
    json: bool,
) -> Result<()> {
    let user = active_profile(svc, session)?;
    let api = svc.collections();
    let workouts = api.list_workouts(&user.id)?;
    let id = resolve_id(workouts.iter().map(|w| w.id.as_str()), id)?;
    api.delete_workout(&user.id, &id)?;

    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted workout {}", short_id(&id));
    }
    Ok(())
}

pub(crate) fn print_workouts(workouts: &[WorkoutLogItem]) {
    #[derive(Tabled)]
    struct WorkoutRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Exercise")]
        exercise: String,
        #[tabled(rename = "Sets")]
        sets: u32,
        #[tabled(rename = "Reps")]
        reps: u32,
        #[tabled(rename = "Weight (kg)")]
        weight: String,
        #[tabled(rename = "Tags")]
        tags: String,
    }

    let rows: Vec<WorkoutRow> = workouts
        .iter()
        .map(|w| WorkoutRow {
            id: short_id(&w.id),
            date: w.date.format("%Y-%m-%d").to_string(),
            exercise: truncate(&w.exercise, 30),
            sets: w.sets,
            reps: w.reps,
            weight: format!("{:.1}", w.weight),
            tags: w.tags.join(", "),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..6)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}
