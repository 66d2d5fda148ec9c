//! Core domain logic for the rota scheduler.
//!
//! This crate contains the fundamental types and logic for:
//! - Schedule generation: expanding recurrence rules into dated occurrences
//! - Availability: matching member date tokens against event times
//! - Reconciliation: resolving stored assignments onto the occurrence grid
//! - Conflicts: detecting cross-ministry double bookings
//! - Confirmation: classifying the window around the next occurrence

pub mod autofill;
pub mod availability;
pub mod conflict;
pub mod reconcile;
pub mod rule;
pub mod schedule;
pub mod types;
pub mod upcoming;

pub use autofill::{AutofillOutcome, merge_suggestions};
pub use availability::{AvailabilityToken, DayHalf, MONTH_BLOCKED, is_available};
pub use conflict::{BusySlot, ConflictIndex, busy_slots, normalize_member_name};
pub use reconcile::{AssignmentRecord, RosterCache, RosterCell, RosterTable, reconcile};
pub use rule::{Cadence, RecurrenceRule};
pub use schedule::{
    MAX_GENERATION_DAYS, Occurrence, ScheduleError, generate_occurrences, occurrence_id,
    parse_occurrence_id,
};
pub use types::{MemberId, MinistryId, OrganizationId, Role, RuleId, ValidationError};
pub use upcoming::{ConfirmationWindow, NextOccurrence, RosterEntry, resolve_next};
