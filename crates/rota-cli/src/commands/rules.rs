//! Rule management commands.

use std::io::Write;

use anyhow::{Result, bail};
use chrono::NaiveDate;

use rota_core::rule::{Cadence, RecurrenceRule};
use rota_core::types::RuleId;
use rota_db::Database;

use crate::Config;
use crate::commands::util;

/// Adds a rule, or updates the existing rule with the same id.
pub fn add(
    db: &mut Database,
    config: &Config,
    id: &str,
    title: &str,
    weekday: Option<i64>,
    date: Option<NaiveDate>,
    time: &str,
) -> Result<()> {
    let ministry_id = config.ministry_id()?;
    let organization_id = config.organization_id()?;
    let kind = match (weekday, date) {
        (Some(_), None) => "weekly",
        (None, Some(_)) => "single",
        _ => bail!("pass exactly one of --weekday or --date"),
    };
    let rule = RecurrenceRule::from_parts(
        RuleId::new(id)?,
        ministry_id,
        organization_id,
        title.to_string(),
        kind,
        weekday,
        date,
        util::parse_time(time)?,
        true,
    )?;
    db.upsert_rule(&rule)?;
    tracing::info!(rule_id = id, kind, "rule saved");
    Ok(())
}

/// Lists this ministry's rules.
pub fn list<W: Write>(writer: &mut W, db: &Database, config: &Config, json: bool) -> Result<()> {
    let rules = db.list_rules(&config.ministry_id()?)?;

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&rules)?)?;
        return Ok(());
    }

    if rules.is_empty() {
        writeln!(writer, "No rules. Add one with `rota rule add`.")?;
        return Ok(());
    }

    for rule in rules {
        let when = match rule.cadence {
            Cadence::Weekly { weekday } => format!("every {weekday}"),
            Cadence::Single { date } => format!("on {date}"),
        };
        let state = if rule.active { "" } else { " [disabled]" };
        writeln!(
            writer,
            "{}  {} at {}  {}{}",
            rule.id,
            when,
            rule.time_of_day.format("%H:%M"),
            rule.title,
            state,
        )?;
    }
    Ok(())
}

/// Activates or deactivates a rule.
pub fn set_active(db: &mut Database, config: &Config, id: &str, active: bool) -> Result<()> {
    db.set_rule_active(&config.ministry_id()?, &RuleId::new(id)?, active)?;
    tracing::info!(rule_id = id, active, "rule updated");
    Ok(())
}
