//! Rota scheduler CLI library.
//!
//! This crate provides the CLI interface for the rota scheduler.

mod cli;
pub mod commands;
mod config;

pub use cli::{AvailabilityAction, Cli, Commands, RuleAction};
pub use config::Config;
