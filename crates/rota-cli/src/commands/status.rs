//! Status command: configuration and database overview.

use std::io::Write;

use anyhow::Result;

use rota_db::Database;

use crate::Config;

pub fn run<W: Write>(writer: &mut W, db: &Database, config: &Config) -> Result<()> {
    writeln!(writer, "Database: {}", config.database_path.display())?;
    let ministry = if config.ministry.is_empty() {
        "(not set)"
    } else {
        config.ministry.as_str()
    };
    let organization = if config.organization.is_empty() {
        "(not set)"
    } else {
        config.organization.as_str()
    };
    writeln!(writer, "Ministry: {ministry}")?;
    writeln!(writer, "Organization: {organization}")?;
    writeln!(writer, "Roles: {}", config.roles.join(", "))?;

    if config.ministry.is_empty() {
        return Ok(());
    }
    let rules = db.list_rules(&config.ministry_id()?)?;
    let active = rules.iter().filter(|rule| rule.active).count();
    writeln!(writer, "Rules: {} ({active} active)", rules.len())?;
    Ok(())
}
