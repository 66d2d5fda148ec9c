//! Autofill command: merge externally produced roster suggestions.
//!
//! The input is a flat JSON object of `"{occurrence_id}_{role_key}": "name"`
//! pairs, read from a file or stdin. Keys that do not resolve to a known
//! occurrence and role are reported and skipped, never written.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use rota_core::autofill::merge_suggestions;
use rota_core::reconcile::AssignmentRecord;
use rota_core::schedule::{generate_occurrences, parse_occurrence_id};
use rota_db::Database;

use crate::Config;

pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    config: &Config,
    start: NaiveDate,
    end: NaiveDate,
    file: Option<&Path>,
    dry_run: bool,
) -> Result<()> {
    let suggestions = read_suggestions(file)?;
    apply(writer, db, config, start, end, &suggestions, dry_run)
}

fn read_suggestions(file: Option<&Path>) -> Result<BTreeMap<String, String>> {
    let raw = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read suggestions from stdin")?;
            buffer
        }
    };
    serde_json::from_str(&raw).context("suggestions must be a JSON object of key -> member name")
}

fn apply<W: Write>(
    writer: &mut W,
    db: &mut Database,
    config: &Config,
    start: NaiveDate,
    end: NaiveDate,
    suggestions: &BTreeMap<String, String>,
    dry_run: bool,
) -> Result<()> {
    let ministry_id = config.ministry_id()?;
    let organization_id = config.organization_id()?;
    let rules = db.active_rules(&ministry_id)?;
    let occurrences = generate_occurrences(&rules, start, end)?;
    let roles = config.role_list()?;

    let outcome = merge_suggestions(&occurrences, &roles, suggestions);

    for key in &outcome.discarded {
        writeln!(writer, "skipped unknown key {key:?}")?;
    }

    if dry_run {
        writeln!(
            writer,
            "Dry run: {} suggestion(s) would be applied, {} skipped.",
            outcome.accepted.len(),
            outcome.discarded.len(),
        )?;
        return Ok(());
    }

    for (occurrence_id, role, member) in &outcome.accepted {
        let (rule_id, event_date) = parse_occurrence_id(occurrence_id)
            .with_context(|| format!("unparseable occurrence id {occurrence_id:?}"))?;
        db.upsert_assignment(&AssignmentRecord {
            ministry_id: ministry_id.clone(),
            organization_id: organization_id.clone(),
            rule_reference: Some(rule_id),
            event_date,
            role: role.clone(),
            member: member.clone(),
            confirmed: false,
        })?;
        writeln!(writer, "{occurrence_id}  {role}: {member}")?;
    }
    writeln!(
        writer,
        "Applied {} suggestion(s), skipped {}.",
        outcome.accepted.len(),
        outcome.discarded.len(),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use crate::commands::{roster, rules};

    fn test_config(dir: &Path) -> Config {
        Config {
            database_path: dir.join("rota.db"),
            ministry: "worship".to_string(),
            organization: "org-1".to_string(),
            roles: vec!["Camera".to_string(), "Vocal:2".to_string()],
        }
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn suggestions(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn accepted_suggestions_are_persisted() {
        let temp = tempfile::tempdir().unwrap();
        let config = test_config(temp.path());
        let mut db = Database::open(&config.database_path).unwrap();
        rules::add(&mut db, &config, "sun", "Sunday Service", Some(0), None, "09:00").unwrap();

        let mut output = Vec::new();
        apply(
            &mut output,
            &mut db,
            &config,
            date("2024-03-01"),
            date("2024-03-31"),
            &suggestions(&[
                ("sun_2024-03-10_Camera", "Ana"),
                ("sun_2024-03-10_Vocal_1", "Bruno"),
                ("sun_2024-03-10_Drums", "Carla"),
            ]),
            false,
        )
        .unwrap();
        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("skipped unknown key \"sun_2024-03-10_Drums\""));
        assert!(output.contains("Applied 2 suggestion(s), skipped 1."));

        let mut grid = Vec::new();
        roster::run(&mut grid, &db, &config, date("2024-03-10"), date("2024-03-10"), false)
            .unwrap();
        let grid = String::from_utf8(grid).unwrap();
        assert!(grid.contains("Camera: Ana"));
        assert!(grid.contains("Vocal 1: Bruno"));
    }

    #[test]
    fn dry_run_writes_nothing() {
        let temp = tempfile::tempdir().unwrap();
        let config = test_config(temp.path());
        let mut db = Database::open(&config.database_path).unwrap();
        rules::add(&mut db, &config, "sun", "Sunday Service", Some(0), None, "09:00").unwrap();

        let mut output = Vec::new();
        apply(
            &mut output,
            &mut db,
            &config,
            date("2024-03-01"),
            date("2024-03-31"),
            &suggestions(&[("sun_2024-03-10_Camera", "Ana")]),
            true,
        )
        .unwrap();
        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("Dry run: 1 suggestion(s) would be applied"));

        let records = db
            .assignments_in_range(
                &config.ministry_id().unwrap(),
                date("2024-03-01"),
                date("2024-03-31"),
            )
            .unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn suggestions_file_is_parsed() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("fill.json");
        std::fs::write(&path, r#"{"sun_2024-03-10_Camera": "Ana"}"#).unwrap();

        let parsed = read_suggestions(Some(&path)).unwrap();
        assert_eq!(parsed.get("sun_2024-03-10_Camera").map(String::as_str), Some("Ana"));
    }

    #[test]
    fn malformed_suggestions_file_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("fill.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(read_suggestions(Some(&path)).is_err());
    }
}
