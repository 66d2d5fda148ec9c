//! Next command: the soonest staffed occurrence and its confirmation window.

use std::io::Write;

use anyhow::Result;
use chrono::{Duration, Local, NaiveDateTime};

use rota_core::reconcile::reconcile;
use rota_core::schedule::{MAX_GENERATION_DAYS, generate_occurrences};
use rota_core::upcoming::{CLOSES_AFTER, ConfirmationWindow, OPENS_BEFORE, resolve_next};
use rota_db::Database;

use crate::Config;

pub fn run<W: Write>(writer: &mut W, db: &Database, config: &Config, json: bool) -> Result<()> {
    run_at(writer, db, config, json, Local::now().naive_local())
}

fn run_at<W: Write>(
    writer: &mut W,
    db: &Database,
    config: &Config,
    json: bool,
    now: NaiveDateTime,
) -> Result<()> {
    let ministry_id = config.ministry_id()?;
    let start = now.date();
    let end = start + Duration::days(MAX_GENERATION_DAYS - 1);

    let rules = db.active_rules(&ministry_id)?;
    let occurrences = generate_occurrences(&rules, start, end)?;
    let records = db.assignments_in_range(&ministry_id, start, end)?;
    let roles = config.role_list()?;
    let table = reconcile(&occurrences, &roles, &records);

    let Some(next) = resolve_next(&occurrences, &roles, &table, now) else {
        writeln!(writer, "No staffed occurrence coming up.")?;
        return Ok(());
    };

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&next)?)?;
        return Ok(());
    }

    let event = next.occurrence.timestamp();
    writeln!(
        writer,
        "{}  {}  {}",
        next.occurrence.title,
        event.format("%Y-%m-%d %H:%M"),
        next.occurrence.id,
    )?;
    match next.window {
        ConfirmationWindow::Early => writeln!(
            writer,
            "Confirmation opens at {}.",
            (event - OPENS_BEFORE).format("%Y-%m-%d %H:%M"),
        )?,
        ConfirmationWindow::Open => writeln!(
            writer,
            "Confirmation open until {}.",
            (event + CLOSES_AFTER).format("%Y-%m-%d %H:%M"),
        )?,
        ConfirmationWindow::Closed => writeln!(
            writer,
            "Confirmation closed at {}.",
            (event + CLOSES_AFTER).format("%Y-%m-%d %H:%M"),
        )?,
    }
    for entry in &next.roster {
        let mark = if entry.confirmed { " [confirmed]" } else { "" };
        writeln!(writer, "  {}: {}{mark}", entry.role, entry.member)?;
    }
    Ok(())
}
