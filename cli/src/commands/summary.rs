use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDate};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use nutritrack_core::service::TrackerService;
use nutritrack_core::session::Session;

use super::food::print_food_logs;
use super::helpers::{active_profile, no_neg_zero, parse_date, print_json};
use super::workout::print_workouts;

pub(crate) fn cmd_summary(
    svc: &TrackerService,
    session: &Session,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let user = active_profile(svc, session)?;
    let date = parse_date(date)?;
    let summary = svc.daily_summary(&user.id, date)?;

    if json {
        return print_json(&summary);
    }

    println!("=== {} · {} ===\n", summary.date, user.name);

    if summary.food_logs.is_empty() {
        println!("  No food logged.");
    } else {
        print_food_logs(&summary.food_logs);
    }
    if !summary.workouts.is_empty() {
        println!();
        print_workouts(&summary.workouts);
    }
    println!();

    let c = &summary.consumed;
    println!(
        "  CONSUMED: {:.0} kcal | P:{:.0}g C:{:.0}g F:{:.0}g",
        no_neg_zero(c.calories),
        no_neg_zero(c.protein),
        no_neg_zero(c.carbs),
        no_neg_zero(c.fat)
    );
    println!("  TARGET: {} kcal", summary.target_calories);
    println!(
        "  REMAINING: {:.0} kcal",
        no_neg_zero(summary.remaining_calories)
    );
    if let Some(w) = summary.stats.as_ref().and_then(|s| s.weight) {
        println!("  WEIGHT: {w:.1} kg");
    }
    Ok(())
}

/// `today` and the `days - 1` days before it, newest first.
fn history_dates(today: NaiveDate, days: u32) -> Result<Vec<NaiveDate>> {
    let Some(span) = days.checked_sub(1) else {
        return Ok(Vec::new());
    };
    today
        .checked_sub_signed(Duration::days(i64::from(span)))
        .with_context(|| format!("--days {days} reaches past the supported date range"))?;
    (0..days)
        .map(|i| {
            today
                .checked_sub_signed(Duration::days(i64::from(i)))
                .context("date out of range")
        })
        .collect()
}

pub(crate) fn cmd_history(
    svc: &TrackerService,
    session: &Session,
    days: u32,
    json: bool,
) -> Result<()> {
    #[derive(Tabled)]
    struct HistoryRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Calories")]
        calories: String,
        #[tabled(rename = "Target")]
        target: i64,
        #[tabled(rename = "Protein")]
        protein: String,
        #[tabled(rename = "Carbs")]
        carbs: String,
        #[tabled(rename = "Fat")]
        fat: String,
        #[tabled(rename = "Workouts")]
        workouts: usize,
        #[tabled(rename = "Weight")]
        weight: String,
    }

    let user = active_profile(svc, session)?;
    let today = Local::now().date_naive();
    let summaries = history_dates(today, days)?
        .into_iter()
        .map(|date| svc.daily_summary(&user.id, date))
        .collect::<Result<Vec<_>>>()?;

    if json {
        return print_json(&summaries);
    }

    let rows: Vec<HistoryRow> = summaries
        .iter()
        .map(|s| HistoryRow {
            date: s.date.to_string(),
            calories: format!("{:.0}", no_neg_zero(s.consumed.calories)),
            target: s.target_calories,
            protein: format!("{:.0}g", no_neg_zero(s.consumed.protein)),
            carbs: format!("{:.0}g", no_neg_zero(s.consumed.carbs)),
            fat: format!("{:.0}g", no_neg_zero(s.consumed.fat)),
            workouts: s.workouts.len(),
            weight: s
                .stats
                .as_ref()
                .and_then(|st| st.weight)
                .map_or("-".into(), |w| format!("{w:.1}")),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..8)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}
