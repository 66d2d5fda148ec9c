//! CLI subcommand implementations.

pub mod assign;
pub mod autofill;
pub mod availability;
pub mod conflicts;
pub mod next;
pub mod roster;
pub mod rules;
pub mod schedule;
pub mod status;
mod util;
