use anyhow::{Result, bail};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use nutritrack_core::models::{Macros, NewSavedFood};
use nutritrack_core::service::TrackerService;
use nutritrack_core::session::Session;

use super::helpers::{active_profile, print_json, resolve_id, short_id, truncate};

pub(crate) fn cmd_saved_list(svc: &TrackerService, session: &Session, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct SavedRow {
        #[tabled(rename = "ID")]
        id: String,
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
        #[tabled(rename = "Used")]
        used: u32,
    }

    let user = active_profile(svc, session)?;
    let foods = svc.collections().list_saved_foods(&user.id)?;

    if json {
        return print_json(&foods);
    }
    if foods.is_empty() {
        eprintln!("No saved foods. Use `nutritrack saved add` or `nutritrack food log --save`.");
        return Ok(());
    }

    let rows: Vec<SavedRow> = foods
        .iter()
        .map(|f| SavedRow {
            id: short_id(&f.id),
            name: truncate(&f.name, 35),
            calories: format!("{:.0}", f.macros.calories),
            protein: format!("{:.1}g", f.macros.protein),
            carbs: format!("{:.1}g", f.macros.carbs),
            fat: format!("{:.1}g", f.macros.fat),
            used: f.times_used,
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..7)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_saved_add(
    svc: &TrackerService,
    session: &Session,
    name: String,
    macros: Macros,
    json: bool,
) -> Result<()> {
    if name.trim().is_empty() {
        bail!("Food name must not be empty");
    }
    if macros.calories < 0.0 || macros.protein < 0.0 || macros.carbs < 0.0 || macros.fat < 0.0 {
        bail!("Macro values must be non-negative");
    }
    let user = active_profile(svc, session)?;
    let saved = svc
        .collections()
        .save_food(&user.id, &NewSavedFood { name, macros })?;

    if json {
        print_json(&saved)?;
    } else {
        println!(
            "Saved {} ({} uses) [{}]",
            saved.name,
            saved.times_used,
            short_id(&saved.id)
        );
    }
    Ok(())
}

pub(crate) fn cmd_saved_delete(
    svc: &TrackerService,
    session: &Session,
    id: &str,
    json: bool,
) -> Result<()> {
    let user = active_profile(svc, session)?;
    let api = svc.collections();
    let foods = api.list_saved_foods(&user.id)?;
    let id = resolve_id(foods.iter().map(|f| f.id.as_str()), id)?;
    api.delete_saved_food(&user.id, &id)?;

    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted saved food {}", short_id(&id));
    }
    Ok(())
}
