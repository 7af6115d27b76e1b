use anyhow::{Result, bail};
use chrono::Utc;
use tabled::{Table, Tabled, settings::Style};

use nutritrack_core::collections::new_id;
use nutritrack_core::models::BodyCheckItem;
use nutritrack_core::service::TrackerService;
use nutritrack_core::session::Session;

use super::helpers::{active_profile, parse_date, print_json, resolve_id, short_id, truncate};

pub(crate) fn cmd_body_add(
    svc: &TrackerService,
    session: &Session,
    image: String,
    note: Option<String>,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    if image.trim().is_empty() {
        bail!("Image must not be empty");
    }
    let user = active_profile(svc, session)?;
    let item = BodyCheckItem {
        id: new_id(),
        date: parse_date(date)?,
        image,
        note,
        timestamp: Utc::now().timestamp_millis(),
    };
    svc.collections().add_body_check(&user.id, &item)?;

    if json {
        print_json(&item)?;
    } else {
        println!(
            "Saved body check for {} [{}]",
            item.date.format("%Y-%m-%d"),
            short_id(&item.id)
        );
    }
    Ok(())
}

pub(crate) fn cmd_body_list(svc: &TrackerService, session: &Session, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct BodyRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Image")]
        image: String,
        #[tabled(rename = "Note")]
        note: String,
    }

    let user = active_profile(svc, session)?;
    let checks = svc.collections().list_body_checks(&user.id)?;

    if json {
        return print_json(&checks);
    }
    if checks.is_empty() {
        eprintln!("No body checks yet. Use `nutritrack body add` to record one.");
        return Ok(());
    }

    let rows: Vec<BodyRow> = checks
        .iter()
        .map(|c| BodyRow {
            id: short_id(&c.id),
            date: c.date.format("%Y-%m-%d").to_string(),
            image: truncate(&c.image, 30),
            note: c.note.clone().unwrap_or_default(),
        })
        .collect();

    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_body_delete(
    svc: &TrackerService,
    session: &Session,
    id: &str,
    json: bool,
) -> Result<()> {
    let user = active_profile(svc, session)?;
    let api = svc.collections();
    let checks = api.list_body_checks(&user.id)?;
    let id = resolve_id(checks.iter().map(|c| c.id.as_str()), id)?;
    api.delete_body_check(&user.id, &id)?;

    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted body check {}", short_id(&id));
    }
    Ok(())
}
