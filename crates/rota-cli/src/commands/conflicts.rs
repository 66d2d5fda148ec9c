//! Conflicts command: cross-ministry double bookings.

use std::collections::{HashMap, HashSet};
use std::io::Write;

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};

use rota_core::conflict::{ConflictIndex, busy_slots, normalize_member_name};
use rota_core::schedule::generate_occurrences;
use rota_core::types::MinistryId;
use rota_db::Database;

use crate::Config;

pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    config: &Config,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<()> {
    let organization_id = config.organization_id()?;
    let org_rules = db.organization_rules(&organization_id)?;
    let occurrences = generate_occurrences(&org_rules, start, end)?;
    let timestamps: HashMap<String, NaiveDateTime> = occurrences
        .iter()
        .map(|occ| (occ.id.clone(), occ.timestamp()))
        .collect();

    let records = db.organization_assignments_in_range(&organization_id, start, end)?;
    let slots = busy_slots(&records, &timestamps);
    let index = ConflictIndex::build(slots.clone());

    let mut seen: HashSet<(String, NaiveDateTime)> = HashSet::new();
    let mut lines = Vec::new();
    for slot in &slots {
        if !seen.insert((normalize_member_name(&slot.member_name), slot.timestamp)) {
            continue;
        }
        let ministries = index.ministries_at(&slot.member_name, slot.timestamp);
        if ministries.len() < 2 {
            continue;
        }
        let mut names: Vec<&str> = ministries.iter().map(MinistryId::as_str).collect();
        names.sort_unstable();
        lines.push(format!(
            "{}  {}  {}",
            slot.timestamp.format("%Y-%m-%d %H:%M"),
            slot.member_name,
            names.join(", "),
        ));
    }
    // Timestamp-first lines sort chronologically as strings.
    lines.sort();

    if lines.is_empty() {
        writeln!(writer, "No conflicts between {start} and {end}.")?;
        return Ok(());
    }
    writeln!(writer, "{} conflict(s) between {start} and {end}:", lines.len())?;
    for line in lines {
        writeln!(writer, "{line}")?;
    }
    Ok(())
}
