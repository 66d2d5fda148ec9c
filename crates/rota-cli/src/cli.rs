//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Volunteer scheduler for ministry teams.
///
/// Expands recurrence rules into dated occurrences, matches member
/// availability, and keeps role assignments consistent across ministries.
#[derive(Debug, Parser)]
#[command(name = "rota", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage recurrence rules.
    Rule {
        #[command(subcommand)]
        action: RuleAction,
    },

    /// Expand active rules into dated occurrences for a date range.
    Schedule {
        /// First date of the range (YYYY-MM-DD).
        start: NaiveDate,

        /// Last date of the range, inclusive.
        end: NaiveDate,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Assign a member to a role at an occurrence.
    Assign {
        /// Occurrence id, e.g. sun_2024-03-10.
        occurrence: String,

        /// Role key, e.g. Camera or Vocal_2.
        role: String,

        /// Member name.
        member: String,
    },

    /// Clear a role at an occurrence.
    Unassign {
        /// Occurrence id.
        occurrence: String,

        /// Role key.
        role: String,
    },

    /// Confirm an assignment inside its confirmation window.
    Confirm {
        /// Occurrence id.
        occurrence: String,

        /// Role key.
        role: String,

        /// Retract a confirmation instead.
        #[arg(long)]
        undo: bool,
    },

    /// Show the reconciled roster for a date range.
    Roster {
        /// First date of the range (YYYY-MM-DD).
        start: NaiveDate,

        /// Last date of the range, inclusive.
        end: NaiveDate,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Manage member availability.
    Availability {
        #[command(subcommand)]
        action: AvailabilityAction,
    },

    /// Report cross-ministry double bookings in a date range.
    Conflicts {
        /// First date of the range (YYYY-MM-DD).
        start: NaiveDate,

        /// Last date of the range, inclusive.
        end: NaiveDate,
    },

    /// Show the next staffed occurrence and its confirmation window.
    Next {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Validate and apply bulk fill suggestions.
    ///
    /// Reads a JSON object mapping "occurrenceId_roleKey" to member names
    /// from stdin (or --file). Keys that don't resolve to a known occurrence
    /// and role are reported and skipped.
    Autofill {
        /// First date of the range the suggestions target.
        start: NaiveDate,

        /// Last date of the range, inclusive.
        end: NaiveDate,

        /// Read suggestions from a file instead of stdin.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Validate only, don't write anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Show configuration and database status.
    Status,
}

/// Rule management actions.
#[derive(Debug, Subcommand)]
pub enum RuleAction {
    /// Add a rule, or update an existing one with the same id.
    Add {
        /// Stable rule id. Never reuse an id for a different event.
        id: String,

        /// Event title.
        #[arg(long)]
        title: String,

        /// Weekday index for a weekly rule (0 = Sunday .. 6 = Saturday).
        #[arg(long, conflicts_with = "date")]
        weekday: Option<i64>,

        /// Calendar date for a one-off rule.
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Event start time (HH:MM or HH:MM:SS).
        #[arg(long)]
        time: String,
    },

    /// List this ministry's rules.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Re-activate a rule.
    Enable {
        /// Rule id.
        id: String,
    },

    /// Deactivate a rule. Its stored assignments are kept.
    Disable {
        /// Rule id.
        id: String,
    },
}

/// Availability actions.
#[derive(Debug, Subcommand)]
pub enum AvailabilityAction {
    /// Replace a member's availability tokens for one month.
    Set {
        /// Member name.
        member: String,

        /// Date tokens: YYYY-MM-DD, YYYY-MM-DD_morning, YYYY-MM-DD_night,
        /// or month_blocked. Pass none to clear the month.
        tokens: Vec<String>,

        /// Month the tokens belong to (YYYY-MM).
        #[arg(long)]
        month: String,

        /// Free-form note shown alongside the tokens.
        #[arg(long)]
        note: Option<String>,
    },

    /// Show declared availability for a month.
    Show {
        /// Month to show (YYYY-MM).
        #[arg(long)]
        month: String,

        /// Limit output to one member.
        #[arg(long)]
        member: Option<String>,
    },
}
