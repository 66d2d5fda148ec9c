use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use rota_cli::commands::{
    assign, autofill, availability, conflicts, next, roster, rules, schedule, status,
};
use rota_cli::{AvailabilityAction, Cli, Commands, Config, RuleAction};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(rota_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = rota_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config))
}

#[expect(
    clippy::too_many_lines,
    reason = "CLI command dispatch is inherently verbose"
)]
fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let mut stdout = std::io::stdout();

    match &cli.command {
        Some(Commands::Rule { action }) => {
            let (mut db, config) = open_database(cli.config.as_deref())?;
            match action {
                RuleAction::Add {
                    id,
                    title,
                    weekday,
                    date,
                    time,
                } => rules::add(&mut db, &config, id, title, *weekday, *date, time)?,
                RuleAction::List { json } => rules::list(&mut stdout, &db, &config, *json)?,
                RuleAction::Enable { id } => rules::set_active(&mut db, &config, id, true)?,
                RuleAction::Disable { id } => rules::set_active(&mut db, &config, id, false)?,
            }
        }
        Some(Commands::Schedule { start, end, json }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            schedule::run(&mut stdout, &db, &config, *start, *end, *json)?;
        }
        Some(Commands::Assign {
            occurrence,
            role,
            member,
        }) => {
            let (mut db, config) = open_database(cli.config.as_deref())?;
            assign::assign(&mut stdout, &mut db, &config, occurrence, role, member)?;
        }
        Some(Commands::Unassign { occurrence, role }) => {
            let (mut db, config) = open_database(cli.config.as_deref())?;
            assign::unassign(&mut stdout, &mut db, &config, occurrence, role)?;
        }
        Some(Commands::Confirm {
            occurrence,
            role,
            undo,
        }) => {
            let (mut db, config) = open_database(cli.config.as_deref())?;
            assign::confirm(&mut stdout, &mut db, &config, occurrence, role, *undo)?;
        }
        Some(Commands::Roster { start, end, json }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            roster::run(&mut stdout, &db, &config, *start, *end, *json)?;
        }
        Some(Commands::Availability { action }) => {
            let (mut db, config) = open_database(cli.config.as_deref())?;
            match action {
                AvailabilityAction::Set {
                    member,
                    tokens,
                    month,
                    note,
                } => availability::set(
                    &mut stdout,
                    &mut db,
                    &config,
                    member,
                    month,
                    tokens,
                    note.as_deref(),
                )?,
                AvailabilityAction::Show { month, member } => {
                    availability::show(&mut stdout, &db, &config, month, member.as_deref())?;
                }
            }
        }
        Some(Commands::Conflicts { start, end }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            conflicts::run(&mut stdout, &db, &config, *start, *end)?;
        }
        Some(Commands::Next { json }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            next::run(&mut stdout, &db, &config, *json)?;
        }
        Some(Commands::Autofill {
            start,
            end,
            file,
            dry_run,
        }) => {
            let (mut db, config) = open_database(cli.config.as_deref())?;
            autofill::run(
                &mut stdout,
                &mut db,
                &config,
                *start,
                *end,
                file.as_deref(),
                *dry_run,
            )?;
        }
        Some(Commands::Status) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            status::run(&mut stdout, &db, &config)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
