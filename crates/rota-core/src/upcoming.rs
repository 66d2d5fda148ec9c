//! Next-occurrence resolution and the confirmation window.
//!
//! Finds the soonest occurrence at or after today that has at least one
//! assignment, and classifies how "now" relates to its timestamp. The
//! window state is a pure function of wall-clock time; there is no persisted
//! state machine, callers just re-evaluate on their own polling cadence.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::reconcile::RosterTable;
use crate::schedule::Occurrence;
use crate::types::{MemberId, Role};

/// Confirmation opens this long before the occurrence timestamp.
pub const OPENS_BEFORE: Duration = Duration::minutes(60);

/// Confirmation stays open this long after the occurrence timestamp.
pub const CLOSES_AFTER: Duration = Duration::minutes(150);

/// Where "now" falls relative to an occurrence's confirmation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationWindow {
    /// More than 60 minutes before the occurrence: confirmation disabled,
    /// UI shows a countdown.
    Early,
    /// From 60 minutes before to 150 minutes after: confirmation enabled.
    Open,
    /// More than 150 minutes after: window closed.
    Closed,
}

impl ConfirmationWindow {
    /// Classifies `now` against the occurrence timestamp.
    pub fn classify(now: NaiveDateTime, occurrence_ts: NaiveDateTime) -> Self {
        if now < occurrence_ts - OPENS_BEFORE {
            Self::Early
        } else if now <= occurrence_ts + CLOSES_AFTER {
            Self::Open
        } else {
            Self::Closed
        }
    }

    /// Whether confirmation is currently accepted.
    pub const fn accepts_confirmation(self) -> bool {
        matches!(self, Self::Open)
    }
}

/// One roster line of the next occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub role: Role,
    pub member: MemberId,
    pub confirmed: bool,
}

/// The resolved next occurrence with its roster and window state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextOccurrence {
    pub occurrence: Occurrence,
    pub roster: Vec<RosterEntry>,
    pub window: ConfirmationWindow,
}

/// Finds the soonest occurrence dated today or later that has at least one
/// assignment, with its role roster in `roles` order.
///
/// `occurrences` must be sorted by timestamp ascending, which is what the
/// generator produces. Returns `None` when nothing upcoming is staffed.
pub fn resolve_next(
    occurrences: &[Occurrence],
    roles: &[Role],
    table: &RosterTable,
    now: NaiveDateTime,
) -> Option<NextOccurrence> {
    let occurrence = occurrences
        .iter()
        .filter(|occ| occ.date >= now.date())
        .find(|occ| table.has_assignments(&occ.id))?;

    let roster = roles
        .iter()
        .filter_map(|role| {
            table.get(&occurrence.id, role).map(|cell| RosterEntry {
                role: role.clone(),
                member: cell.member.clone(),
                confirmed: cell.confirmed,
            })
        })
        .collect();

    Some(NextOccurrence {
        occurrence: occurrence.clone(),
        roster,
        window: ConfirmationWindow::classify(now, occurrence.timestamp()),
    })
}
