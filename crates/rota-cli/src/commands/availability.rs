//! Availability commands.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use rota_core::availability::AvailabilityToken;
use rota_core::types::MemberId;
use rota_db::Database;

use crate::Config;

/// Replaces a member's declared availability for one month.
///
/// Unrecognized tokens are stored as given (the matcher skips them) but
/// flagged so typos surface at entry time rather than as silent
/// unavailability.
pub fn set<W: Write>(
    writer: &mut W,
    db: &mut Database,
    config: &Config,
    member: &str,
    month: &str,
    tokens: &[String],
    note: Option<&str>,
) -> Result<()> {
    let ministry_id = config.ministry_id()?;
    let member = MemberId::new(member.to_string())?;
    validate_month(month)?;

    for token in tokens {
        if AvailabilityToken::parse(token).is_none() {
            writeln!(writer, "warning: unrecognized token {token:?}")?;
        }
    }

    db.replace_availability(&ministry_id, &member, month, tokens, note)?;
    writeln!(
        writer,
        "Saved {} token(s) for {member} in {month}.",
        tokens.len(),
    )?;
    Ok(())
}

/// Shows declared availability for a month.
pub fn show<W: Write>(
    writer: &mut W,
    db: &Database,
    config: &Config,
    month: &str,
    member: Option<&str>,
) -> Result<()> {
    let ministry_id = config.ministry_id()?;
    validate_month(month)?;

    if let Some(member) = member {
        let member = MemberId::new(member.to_string())?;
        let tokens = db.availability_for(&ministry_id, &member, month)?;
        if tokens.is_empty() {
            writeln!(writer, "{member}: no tokens declared (treated as available)")?;
        } else {
            writeln!(writer, "{member}: {}", tokens.join(" "))?;
        }
        if let Some(note) = db.availability_note(&ministry_id, &member, month)? {
            writeln!(writer, "  note: {note}")?;
        }
        return Ok(());
    }

    let entries = db.month_availability(&ministry_id, month)?;
    if entries.is_empty() {
        writeln!(writer, "No availability declared for {month}.")?;
        return Ok(());
    }
    for entry in entries {
        writeln!(writer, "{}: {}", entry.member, entry.tokens.join(" "))?;
        if let Some(note) = entry.note {
            writeln!(writer, "  note: {note}")?;
        }
    }
    Ok(())
}

fn validate_month(month: &str) -> Result<()> {
    format!("{month}-01")
        .parse::<NaiveDate>()
        .with_context(|| format!("invalid month {month:?}, expected YYYY-MM"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn test_config(dir: &Path) -> Config {
        Config {
            database_path: dir.join("rota.db"),
            ministry: "worship".to_string(),
            organization: "org-1".to_string(),
            roles: vec!["Camera".to_string()],
        }
    }

    #[test]
    fn set_then_show_round_trips() {
        let temp = tempfile::tempdir().unwrap();
        let config = test_config(temp.path());
        let mut db = Database::open(&config.database_path).unwrap();

        let mut output = Vec::new();
        set(
            &mut output,
            &mut db,
            &config,
            "Ana",
            "2024-03",
            &["2024-03-10".to_string(), "2024-03-17_morning".to_string()],
            Some("prefers mornings"),
        )
        .unwrap();

        let mut output = Vec::new();
        show(&mut output, &db, &config, "2024-03", None).unwrap();
        let output = String::from_utf8(output).unwrap();

        insta::assert_snapshot!(output, @r"
        Ana: 2024-03-10 2024-03-17_morning
          note: prefers mornings
        ");
    }

    #[test]
    fn set_warns_on_unrecognized_tokens() {
        let temp = tempfile::tempdir().unwrap();
        let config = test_config(temp.path());
        let mut db = Database::open(&config.database_path).unwrap();

        let mut output = Vec::new();
        set(
            &mut output,
            &mut db,
            &config,
            "Ana",
            "2024-03",
            &["2024-03-10_brunch".to_string()],
            None,
        )
        .unwrap();
        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("unrecognized token"));
        assert!(output.contains("Saved 1 token(s)"));
    }

    #[test]
    fn show_for_undeclared_member_reports_default() {
        let temp = tempfile::tempdir().unwrap();
        let config = test_config(temp.path());
        let db = Database::open(&config.database_path).unwrap();

        let mut output = Vec::new();
        show(&mut output, &db, &config, "2024-03", Some("Ana")).unwrap();
        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("treated as available"));
    }

    #[test]
    fn bad_month_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let config = test_config(temp.path());
        let mut db = Database::open(&config.database_path).unwrap();

        let mut output = Vec::new();
        let result = set(&mut output, &mut db, &config, "Ana", "March", &[], None);
        assert!(result.is_err());
    }
}
