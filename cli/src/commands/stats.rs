use anyhow::{Result, bail};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use nutritrack_core::energy::{Recalculation, SkipReason};
use nutritrack_core::models::DailyStats;
use nutritrack_core::service::TrackerService;
use nutritrack_core::session::Session;

use super::helpers::{active_profile, no_neg_zero, parse_date, print_json};

const KG_PER_LB: f64 = 0.453_592;

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_stats_set(
    svc: &TrackerService,
    session: &Session,
    weight: Option<f64>,
    unit: &str,
    body_fat: Option<f64>,
    note: Option<String>,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let weight = match weight {
        None => None,
        Some(v) if !v.is_finite() || v <= 0.0 => bail!("Weight must be greater than 0"),
        Some(v) => Some(match unit.to_lowercase().as_str() {
            "kg" => v,
            "lbs" | "lb" => {
                let kg = no_neg_zero(v * KG_PER_LB);
                eprintln!("Converting {v:.1} lbs → {kg:.2} kg");
                kg
            }
            _ => bail!("Invalid unit '{unit}'. Use 'kg' or 'lbs'"),
        }),
    };
    if body_fat.is_some_and(|bf| !(0.0..=100.0).contains(&bf)) {
        bail!("Body fat must be a percentage between 0 and 100");
    }

    let user = active_profile(svc, session)?;
    let date = parse_date(date)?;
    // Merge into any existing record for the day.
    let existing = svc.collections().get_daily_stats(&user.id, date)?;
    let stats = match existing {
        Some(prev) => DailyStats {
            weight: weight.or(prev.weight),
            body_fat: body_fat.or(prev.body_fat),
            note: note.or(prev.note),
            ..prev
        },
        None => DailyStats {
            id: String::new(),
            date,
            weight,
            body_fat,
            note,
        },
    };

    let (stored, outcome) = svc.save_daily_stats_today(&user.id, &stats)?;

    if json {
        print_json(&serde_json::json!({
            "stats": stored,
            "profile": outcome.profile(),
        }))?;
        return Ok(());
    }

    println!("Saved stats for {}", stored.date.format("%Y-%m-%d"));
    match outcome {
        Recalculation::Updated(profile) => println!(
            "  Weight changed: TDEE {} kcal | Target {} kcal/day",
            profile.tdee, profile.target_calories
        ),
        Recalculation::Skipped(SkipReason::NotToday) if stored.weight.is_some() => {
            println!("  Past date: recorded as history, targets unchanged");
        }
        Recalculation::Skipped(_) => {}
    }
    Ok(())
}

pub(crate) fn cmd_stats_show(
    svc: &TrackerService,
    session: &Session,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let user = active_profile(svc, session)?;
    let date = parse_date(date)?;
    let stats = svc.collections().get_daily_stats(&user.id, date)?;

    if let Some(s) = stats {
        if json {
            print_json(&s)?;
        } else {
            println!("{}", s.date.format("%Y-%m-%d"));
            if let Some(w) = s.weight {
                println!("  Weight:   {w:.1} kg");
            }
            if let Some(bf) = s.body_fat {
                println!("  Body fat: {bf:.1}%");
            }
            if let Some(ref n) = s.note {
                println!("  Note:     {n}");
            }
        }
    } else {
        let date_str = date.format("%Y-%m-%d");
        if json {
            println!(
                "{}",
                serde_json::json!({ "error": format!("No stats for {date_str}") })
            );
        } else {
            eprintln!("No stats for {date_str}");
        }
    }
    Ok(())
}

pub(crate) fn cmd_stats_list(svc: &TrackerService, session: &Session, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct StatsRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Weight (kg)")]
        weight: String,
        #[tabled(rename = "Body fat")]
        body_fat: String,
        #[tabled(rename = "Note")]
        note: String,
    }

    let user = active_profile(svc, session)?;
    let mut stats = svc.collections().list_daily_stats(&user.id)?;
    stats.sort_by_key(|s| s.date);

    if json {
        return print_json(&stats);
    }
    if stats.is_empty() {
        eprintln!("No stats recorded. Use `nutritrack stats set` to log your weight.");
        return Ok(());
    }

    let rows: Vec<StatsRow> = stats
        .iter()
        .map(|s| StatsRow {
            date: s.date.format("%Y-%m-%d").to_string(),
            weight: s.weight.map_or("-".into(), |w| format!("{w:.1}")),
            body_fat: s.body_fat.map_or("-".into(), |bf| format!("{bf:.1}%")),
            note: s.note.clone().unwrap_or_default(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..3)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_stats_delete(
    svc: &TrackerService,
    session: &Session,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let user = active_profile(svc, session)?;
    let date = parse_date(date)?;
    svc.collections().delete_daily_stats(&user.id, date)?;

    let date_str = date.format("%Y-%m-%d").to_string();
    if json {
        println!("{}", serde_json::json!({ "deleted": date_str }));
    } else {
        println!("Deleted stats for {date_str}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nutritrack_core::models::{ActivityLevel, Gender, Goal, UserProfile};

    fn setup() -> (TrackerService, Session) {
        let svc = TrackerService::new_in_memory().unwrap();
        svc.save_profile(UserProfile {
            id: "u1".to_string(),
            name: "Sam".to_string(),
            avatar: None,
            height: 180.0,
            weight: 80.0,
            age: 25,
            gender: Gender::Male,
            activity_level: ActivityLevel::Sedentary,
            goal: Goal::Maintain,
            tdee: 0,
            target_calories: 0,
        })
        .unwrap();
        let session = Session {
            current_user_id: Some("u1".to_string()),
            ..Session::default()
        };
        (svc, session)
    }

    #[test]
    fn test_stats_set_rejects_non_finite_weight() {
        let (svc, session) = setup();
        for weight in [f64::NAN, f64::INFINITY, -5.0] {
            let result = cmd_stats_set(&svc, &session, Some(weight), "kg", None, None, None, true);
            assert!(result.is_err(), "weight {weight}");
        }
        assert!(
            cmd_stats_set(&svc, &session, None, "kg", Some(f64::NAN), None, None, true).is_err()
        );
        assert!(svc.collections().list_daily_stats("u1").unwrap().is_empty());
        assert!((svc.get_profile("u1").unwrap().unwrap().weight - 80.0).abs() < f64::EPSILON);
    }
}
