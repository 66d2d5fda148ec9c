//! Recurrence rules describing when a ministry's events happen.

use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::types::{MinistryId, OrganizationId, RuleId, ValidationError};

/// How a rule recurs.
///
/// Modeled as an enum so a rule physically cannot be "weekly without a
/// weekday": storage rows that arrive in that state fail conversion in
/// [`RecurrenceRule::from_parts`] and get skipped by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Cadence {
    /// Repeats every week on the given weekday.
    Weekly { weekday: Weekday },
    /// Happens once, on the given calendar date.
    Single { date: NaiveDate },
}

/// A recurrence rule for one ministry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub id: RuleId,
    pub ministry_id: MinistryId,
    pub organization_id: OrganizationId,
    pub title: String,
    #[serde(flatten)]
    pub cadence: Cadence,
    pub time_of_day: NaiveTime,
    pub active: bool,
}

impl RecurrenceRule {
    /// Builds a typed rule from raw storage parts.
    ///
    /// `kind` is `"weekly"` or `"single"`; `weekday` is the 0-6 index with
    /// 0 = Sunday (the convention assignment rows were written under).
    /// A kind missing its required field is a [`ValidationError`], which the
    /// row loader turns into a skip rather than a crash.
    #[expect(clippy::too_many_arguments, reason = "mirrors the storage row")]
    pub fn from_parts(
        id: RuleId,
        ministry_id: MinistryId,
        organization_id: OrganizationId,
        title: String,
        kind: &str,
        weekday: Option<i64>,
        date: Option<NaiveDate>,
        time_of_day: NaiveTime,
        active: bool,
    ) -> Result<Self, ValidationError> {
        let cadence = match kind {
            "weekly" => {
                let index = weekday.ok_or_else(|| ValidationError::MissingWeekday {
                    rule_id: id.to_string(),
                })?;
                Cadence::Weekly {
                    weekday: weekday_from_index(index)?,
                }
            }
            "single" => {
                let date = date.ok_or_else(|| ValidationError::MissingDate {
                    rule_id: id.to_string(),
                })?;
                Cadence::Single { date }
            }
            other => {
                return Err(ValidationError::UnknownKind {
                    value: other.to_string(),
                });
            }
        };
        Ok(Self {
            id,
            ministry_id,
            organization_id,
            title,
            cadence,
            time_of_day,
            active,
        })
    }

    /// Returns true when this rule produces an event on `date`.
    pub fn matches(&self, date: NaiveDate) -> bool {
        use chrono::Datelike;
        match self.cadence {
            Cadence::Weekly { weekday } => date.weekday() == weekday,
            Cadence::Single { date: single } => date == single,
        }
    }
}

/// Maps a 0-6 weekday index (0 = Sunday) to a chrono [`Weekday`].
pub fn weekday_from_index(index: i64) -> Result<Weekday, ValidationError> {
    match index {
        0 => Ok(Weekday::Sun),
        1 => Ok(Weekday::Mon),
        2 => Ok(Weekday::Tue),
        3 => Ok(Weekday::Wed),
        4 => Ok(Weekday::Thu),
        5 => Ok(Weekday::Fri),
        6 => Ok(Weekday::Sat),
        value => Err(ValidationError::WeekdayOutOfRange { value }),
    }
}

/// Maps a chrono [`Weekday`] back to the stored 0-6 index (0 = Sunday).
pub const fn weekday_to_index(weekday: Weekday) -> i64 {
    weekday.num_days_from_sunday() as i64
}
