//! Roster command: the reconciled occurrence/role grid.

use std::io::Write;

use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;

use rota_core::reconcile::reconcile;
use rota_core::schedule::{Occurrence, generate_occurrences};
use rota_core::upcoming::RosterEntry;
use rota_db::Database;

use crate::Config;

#[derive(Debug, Serialize)]
struct OccurrenceRoster {
    occurrence: Occurrence,
    entries: Vec<RosterEntry>,
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    config: &Config,
    start: NaiveDate,
    end: NaiveDate,
    json: bool,
) -> Result<()> {
    let ministry_id = config.ministry_id()?;
    let rules = db.active_rules(&ministry_id)?;
    let occurrences = generate_occurrences(&rules, start, end)?;
    let records = db.assignments_in_range(&ministry_id, start, end)?;
    let roles = config.role_list()?;
    let table = reconcile(&occurrences, &roles, &records);

    if json {
        let rosters: Vec<OccurrenceRoster> = occurrences
            .into_iter()
            .map(|occurrence| {
                let entries = roles
                    .iter()
                    .filter_map(|role| {
                        table.get(&occurrence.id, role).map(|cell| RosterEntry {
                            role: role.clone(),
                            member: cell.member.clone(),
                            confirmed: cell.confirmed,
                        })
                    })
                    .collect();
                OccurrenceRoster { occurrence, entries }
            })
            .collect();
        writeln!(writer, "{}", serde_json::to_string_pretty(&rosters)?)?;
        return Ok(());
    }

    if occurrences.is_empty() {
        writeln!(writer, "No occurrences between {start} and {end}.")?;
        return Ok(());
    }

    writeln!(writer, "Roster {start} to {end} ({ministry_id})")?;
    for occurrence in &occurrences {
        writeln!(writer)?;
        writeln!(
            writer,
            "{}  {} {}  {}",
            occurrence.id,
            occurrence.weekday,
            occurrence.timestamp().format("%Y-%m-%d %H:%M"),
            occurrence.title,
        )?;
        for role in &roles {
            match table.get(&occurrence.id, role) {
                Some(cell) => {
                    let mark = if cell.confirmed { " [confirmed]" } else { "" };
                    writeln!(writer, "  {role}: {}{mark}", cell.member)?;
                }
                None => writeln!(writer, "  {role}: -")?,
            }
        }
    }
    Ok(())
}
