//! Schedule command: expand active rules into dated occurrences.

use std::io::Write;

use anyhow::Result;
use chrono::NaiveDate;

use rota_core::schedule::generate_occurrences;
use rota_db::Database;

use crate::Config;

pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    config: &Config,
    start: NaiveDate,
    end: NaiveDate,
    json: bool,
) -> Result<()> {
    let rules = db.active_rules(&config.ministry_id()?)?;
    let occurrences = generate_occurrences(&rules, start, end)?;

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&occurrences)?)?;
        return Ok(());
    }

    if occurrences.is_empty() {
        writeln!(writer, "No occurrences between {start} and {end}.")?;
        return Ok(());
    }

    for occ in occurrences {
        writeln!(
            writer,
            "{}  {} {}  {}",
            occ.id,
            occ.weekday,
            occ.timestamp().format("%Y-%m-%d %H:%M"),
            occ.title,
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use crate::commands::rules;

    fn test_config(dir: &Path) -> Config {
        Config {
            database_path: dir.join("rota.db"),
            ministry: "worship".to_string(),
            organization: "org-1".to_string(),
            roles: vec!["Camera".to_string()],
        }
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn schedule_lists_march_sundays() {
        let temp = tempfile::tempdir().unwrap();
        let config = test_config(temp.path());
        let mut db = Database::open(&config.database_path).unwrap();
        rules::add(&mut db, &config, "sun", "Sunday Service", Some(0), None, "09:00").unwrap();

        let mut output = Vec::new();
        run(&mut output, &db, &config, date("2024-03-01"), date("2024-03-31"), false).unwrap();
        let output = String::from_utf8(output).unwrap();

        insta::assert_snapshot!(output, @r"
        sun_2024-03-03  Sun 2024-03-03 09:00  Sunday Service
        sun_2024-03-10  Sun 2024-03-10 09:00  Sunday Service
        sun_2024-03-17  Sun 2024-03-17 09:00  Sunday Service
        sun_2024-03-24  Sun 2024-03-24 09:00  Sunday Service
        sun_2024-03-31  Sun 2024-03-31 09:00  Sunday Service
        ");
    }

    #[test]
    fn empty_range_prints_notice() {
        let temp = tempfile::tempdir().unwrap();
        let config = test_config(temp.path());
        let db = Database::open(&config.database_path).unwrap();

        let mut output = Vec::new();
        run(&mut output, &db, &config, date("2024-03-01"), date("2024-03-31"), false).unwrap();
        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("No occurrences"));
    }

    #[test]
    fn runaway_range_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let config = test_config(temp.path());
        let mut db = Database::open(&config.database_path).unwrap();
        rules::add(&mut db, &config, "sun", "Sunday Service", Some(0), None, "09:00").unwrap();

        let mut output = Vec::new();
        let result = run(&mut output, &db, &config, date("2024-01-01"), date("2026-01-01"), false);
        assert!(result.is_err());
    }

    #[test]
    fn json_output_is_machine_readable() {
        let temp = tempfile::tempdir().unwrap();
        let config = test_config(temp.path());
        let mut db = Database::open(&config.database_path).unwrap();
        rules::add(&mut db, &config, "sun", "Sunday Service", Some(0), None, "09:00").unwrap();

        let mut output = Vec::new();
        run(&mut output, &db, &config, date("2024-03-01"), date("2024-03-31"), true).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 5);
        assert_eq!(parsed[0]["id"], "sun_2024-03-03");
    }
}
