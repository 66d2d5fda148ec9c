//! Occurrence generation.
//!
//! Expands a set of recurrence rules into concrete dated occurrences for an
//! inclusive calendar-date range. All arithmetic is on local-date components
//! (`NaiveDate`/`NaiveTime`), never on timezone-aware instants, so month
//! boundaries can't shift a day under a timezone offset.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rule::RecurrenceRule;
use crate::types::RuleId;

/// Hard bound on the number of days a single generation run may cover.
///
/// A range beyond this is malformed input (taxonomy: runaway input) and is
/// rejected up front rather than truncated.
pub const MAX_GENERATION_DAYS: i64 = 400;

/// Errors from occurrence generation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// The requested range covers more days than the generator will iterate.
    #[error("date range spans {days} days, more than the {MAX_GENERATION_DAYS}-day limit")]
    RangeTooLarge { days: i64 },
}

/// One concrete dated instance of a recurrence rule.
///
/// Never persisted; recomputed whenever the range or rule set changes. The
/// id is deterministic for a (rule, date) pair, so regeneration never
/// invalidates ids already referenced by assignment rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    /// `"{rule_id}_{date}"` with the date as `%Y-%m-%d`.
    pub id: String,
    pub rule_id: RuleId,
    pub title: String,
    pub date: NaiveDate,
    pub time_of_day: NaiveTime,
    pub weekday: Weekday,
}

impl Occurrence {
    /// The occurrence's local timestamp (`date` + `time_of_day`).
    pub const fn timestamp(&self) -> NaiveDateTime {
        self.date.and_time(self.time_of_day)
    }
}

/// The canonical occurrence id for a rule on a date.
///
/// Assignment rows that carry a rule reference resolve to exactly this
/// string, so the format is load-bearing: changing it orphans stored rows.
pub fn occurrence_id(rule_id: &RuleId, date: NaiveDate) -> String {
    format!("{rule_id}_{}", date.format("%Y-%m-%d"))
}

/// Splits a canonical occurrence id back into its rule id and date.
///
/// Rule ids may contain underscores, so the split is positional: the date is
/// always the final 10 characters, preceded by one `_`. Returns `None` for
/// anything that doesn't fit the shape.
pub fn parse_occurrence_id(id: &str) -> Option<(RuleId, NaiveDate)> {
    const DATE_LEN: usize = 10;
    if id.len() < DATE_LEN + 2 || !id.is_char_boundary(id.len() - DATE_LEN) {
        return None;
    }
    let (head, date) = id.split_at(id.len() - DATE_LEN);
    let rule = head.strip_suffix('_')?;
    let date: NaiveDate = date.parse().ok()?;
    let rule_id = RuleId::new(rule).ok()?;
    Some((rule_id, date))
}

/// Expands `rules` into occurrences for the inclusive range `start..=end`.
///
/// Inactive rules are skipped entirely. Output is sorted by timestamp
/// ascending; occurrences sharing a timestamp keep the input order of their
/// rules. An empty range (`start > end`) yields an empty vec.
pub fn generate_occurrences(
    rules: &[RecurrenceRule],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<Occurrence>, ScheduleError> {
    if start > end {
        return Ok(Vec::new());
    }
    let days = (end - start).num_days() + 1;
    if days > MAX_GENERATION_DAYS {
        return Err(ScheduleError::RangeTooLarge { days });
    }

    let active: Vec<&RecurrenceRule> = rules.iter().filter(|rule| rule.active).collect();

    let mut occurrences = Vec::new();
    let mut day = start;
    while day <= end {
        for rule in &active {
            if rule.matches(day) {
                occurrences.push(Occurrence {
                    id: occurrence_id(&rule.id, day),
                    rule_id: rule.id.clone(),
                    title: rule.title.clone(),
                    date: day,
                    time_of_day: rule.time_of_day,
                    weekday: day.weekday(),
                });
            }
        }
        let Some(next) = day.succ_opt() else {
            break; // end of the calendar, nothing further can match
        };
        day = next;
    }

    // Stable sort: same-timestamp occurrences keep rule input order.
    occurrences.sort_by_key(Occurrence::timestamp);
    Ok(occurrences)
}
