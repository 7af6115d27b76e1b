use anyhow::{Result, bail};
use chrono::Utc;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use nutritrack_core::collections::new_id;
use nutritrack_core::models::{FoodLogItem, Macros, NewSavedFood};
use nutritrack_core::service::TrackerService;
use nutritrack_core::session::Session;

use super::helpers::{
    active_profile, no_neg_zero, parse_date, print_json, resolve_id, short_id, truncate,
};

pub(crate) struct FoodInput {
    pub name: Option<String>,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub date: Option<String>,
}

/// Log a food entry, either from explicit macros or from a saved food.
/// `remember` also records it in the saved-food list.
pub(crate) fn cmd_food_log(
    svc: &TrackerService,
    session: &Session,
    input: FoodInput,
    from_saved: Option<&str>,
    remember: bool,
    json: bool,
) -> Result<()> {
    let user = active_profile(svc, session)?;
    let api = svc.collections();
    let date = parse_date(input.date)?;

    let (name, macros) = if let Some(wanted) = from_saved {
        let saved = api.list_saved_foods(&user.id)?;
        let id = resolve_id(saved.iter().map(|f| f.id.as_str()), wanted)?;
        let Some(food) = saved.into_iter().find(|f| f.id == id) else {
            bail!("Saved food not found: {wanted}");
        };
        (food.name, food.macros)
    } else {
        let Some(name) = input.name else {
            bail!("Provide a food name or --from-saved <id>");
        };
        let Some(calories) = input.calories else {
            bail!("--calories is required when logging a new food");
        };
        let macros = Macros {
            calories,
            protein: input.protein.unwrap_or(0.0),
            carbs: input.carbs.unwrap_or(0.0),
            fat: input.fat.unwrap_or(0.0),
        };
        (name, macros)
    };

    let item = FoodLogItem {
        id: new_id(),
        name,
        macros,
        timestamp: Utc::now().timestamp_millis(),
        date,
        image: None,
        ingredients: None,
    };
    svc.log_food(&user.id, &item)?;

    if remember || from_saved.is_some() {
        api.save_food(
            &user.id,
            &NewSavedFood {
                name: item.name.clone(),
                macros: item.macros,
            },
        )?;
    }

    if json {
        print_json(&item)?;
    } else {
        let m = &item.macros;
        println!(
            "Logged {} for {}: {:.0} kcal | P:{:.0}g C:{:.0}g F:{:.0}g [{}]",
            item.name,
            item.date.format("%Y-%m-%d"),
            m.calories,
            m.protein,
            m.carbs,
            m.fat,
            short_id(&item.id)
        );
    }
    Ok(())
}

pub(crate) fn cmd_food_list(
    svc: &TrackerService,
    session: &Session,
    date: Option<String>,
    all: bool,
    json: bool,
) -> Result<()> {
    let user = active_profile(svc, session)?;
    let api = svc.collections();
    let logs = if all {
        api.list_food_logs(&user.id)?
    } else {
        api.list_food_logs_for_date(&user.id, parse_date(date)?)?
    };

    if json {
        return print_json(&logs);
    }
    if logs.is_empty() {
        eprintln!("No food entries found. Use `nutritrack food log` to add one.");
        return Ok(());
    }
    print_food_logs(&logs);
    Ok(())
}

pub(crate) fn cmd_food_edit(
    svc: &TrackerService,
    session: &Session,
    id: &str,
    input: FoodInput,
    json: bool,
) -> Result<()> {
    let user = active_profile(svc, session)?;
    let logs = svc.collections().list_food_logs(&user.id)?;
    let id = resolve_id(logs.iter().map(|l| l.id.as_str()), id)?;
    let Some(mut item) = logs.into_iter().find(|l| l.id == id) else {
        bail!("Food entry not found: {id}");
    };

    if let Some(name) = input.name {
        item.name = name;
    }
    if let Some(v) = input.calories {
        item.macros.calories = v;
    }
    if let Some(v) = input.protein {
        item.macros.protein = v;
    }
    if let Some(v) = input.carbs {
        item.macros.carbs = v;
    }
    if let Some(v) = input.fat {
        item.macros.fat = v;
    }
    if input.date.is_some() {
        item.date = parse_date(input.date)?;
    }
    // Hand-edited totals replace any estimator breakdown.
    item.ingredients = None;
    svc.update_food_log(&user.id, &item)?;

    if json {
        print_json(&item)?;
    } else {
        println!("Updated {} [{}]", item.name, short_id(&item.id));
    }
    Ok(())
}

pub(crate) fn cmd_food_delete(
    svc: &TrackerService,
    session: &Session,
    id: &str,
    json: bool,
) -> Result<()> {
    let user = active_profile(svc, session)?;
    let api = svc.collections();
    let logs = api.list_food_logs(&user.id)?;
    let id = resolve_id(logs.iter().map(|l| l.id.as_str()), id)?;
    api.delete_food_log(&user.id, &id)?;

    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted food entry {}", short_id(&id));
    }
    Ok(())
}

pub(crate) fn print_food_logs(logs: &[FoodLogItem]) {
    #[derive(Tabled)]
    struct FoodRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Calories")]
        calories: String,
        #[tabled(rename = "Protein")]
        protein: String,
        #[tabled(rename = "Carbs")]
        carbs: String,
        #[tabled(rename = "Fat")]
        fat: String,
    }

    let rows: Vec<FoodRow> = logs
        .iter()
        .map(|l| FoodRow {
            id: short_id(&l.id),
            date: l.date.format("%Y-%m-%d").to_string(),
            name: truncate(&l.name, 35),
            calories: format!("{:.0}", no_neg_zero(l.macros.calories)),
            protein: format!("{:.1}g", no_neg_zero(l.macros.protein)),
            carbs: format!("{:.1}g", no_neg_zero(l.macros.carbs)),
            fat: format!("{:.1}g", no_neg_zero(l.macros.fat)),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..7)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}
