//! Shared helpers for subcommands.

use anyhow::{Context, Result, bail};
use chrono::{Datelike, NaiveTime};

use rota_core::rule::RecurrenceRule;
use rota_core::schedule::{Occurrence, parse_occurrence_id};

/// Parses an event time, accepting `HH:MM` or `HH:MM:SS`.
pub fn parse_time(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .with_context(|| format!("invalid time {raw:?}, expected HH:MM or HH:MM:SS"))
}

/// Resolves a user-supplied occurrence id against the active rules.
///
/// The id must parse, reference a known rule, and fall on a date that rule
/// actually produces; otherwise assignments would silently attach to events
/// that never render on any roster.
pub fn find_occurrence(rules: &[RecurrenceRule], id: &str) -> Result<Occurrence> {
    let (rule_id, date) = parse_occurrence_id(id)
        .with_context(|| format!("malformed occurrence id {id:?}, expected ruleId_YYYY-MM-DD"))?;
    let Some(rule) = rules.iter().find(|rule| rule.id == rule_id) else {
        bail!("no active rule {rule_id}");
    };
    if !rule.matches(date) {
        bail!("rule {rule_id} has no occurrence on {date}");
    }
    Ok(Occurrence {
        id: id.to_string(),
        rule_id,
        title: rule.title.clone(),
        date,
        time_of_day: rule.time_of_day,
        weekday: date.weekday(),
    })
}
