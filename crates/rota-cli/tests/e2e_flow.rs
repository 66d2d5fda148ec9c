//! End-to-end integration tests for the complete scheduling flow.
//!
//! Drives the binary: rule add → schedule → assign → roster → availability
//! → autofill → status.

use std::io::Write as _;
use std::path::Path;
use std::process::{Command, Stdio};

use tempfile::TempDir;

fn rota_binary() -> String {
    env!("CARGO_BIN_EXE_rota").to_string()
}

/// Write a config file pointing at a database inside the temp directory.
fn write_config(temp: &Path) -> std::path::PathBuf {
    let config_path = temp.join("config.toml");
    let db_path = temp.join("rota.db");
    std::fs::write(
        &config_path,
        format!(
            r#"database_path = "{}"
ministry = "worship"
organization = "org-1"
roles = ["Camera", "Vocal:2"]
"#,
            db_path.display()
        ),
    )
    .unwrap();
    config_path
}

fn rota(config: &Path, args: &[&str]) -> std::process::Output {
    Command::new(rota_binary())
        .arg("--config")
        .arg(config)
        .args(args)
        .output()
        .expect("failed to run rota")
}

fn rota_ok(config: &Path, args: &[&str]) -> String {
    let output = rota(config, args);
    assert!(
        output.status.success(),
        "rota {args:?} should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_rule_schedule_assign_roster_flow() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    rota_ok(
        &config,
        &[
            "rule", "add", "sun", "--title", "Sunday Service", "--weekday", "0", "--time",
            "09:00",
        ],
    );

    let listing = rota_ok(&config, &["rule", "list"]);
    assert!(listing.contains("sun  every Sun at 09:00  Sunday Service"));

    let schedule = rota_ok(&config, &["schedule", "2024-03-01", "2024-03-31"]);
    assert_eq!(schedule.lines().count(), 5, "five Sundays in March 2024");
    assert!(schedule.contains("sun_2024-03-10"));

    rota_ok(&config, &["assign", "sun_2024-03-10", "Camera", "Ana"]);
    rota_ok(&config, &["assign", "sun_2024-03-10", "Vocal_1", "Bruno"]);

    let roster = rota_ok(&config, &["roster", "2024-03-10", "2024-03-10"]);
    assert!(roster.contains("Camera: Ana"));
    assert!(roster.contains("Vocal 1: Bruno"));
    assert!(roster.contains("Vocal 2: -"));

    rota_ok(&config, &["unassign", "sun_2024-03-10", "Vocal_1"]);
    let roster = rota_ok(&config, &["roster", "2024-03-10", "2024-03-10"]);
    assert!(roster.contains("Vocal 1: -"));
}

#[test]
fn test_availability_warning_on_assign() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    rota_ok(
        &config,
        &[
            "rule", "add", "sun", "--title", "Sunday Service", "--weekday", "0", "--time",
            "09:00",
        ],
    );
    // Ana declared the 17th, not the 10th.
    rota_ok(
        &config,
        &["availability", "set", "Ana", "2024-03-17", "--month", "2024-03"],
    );

    let output = rota_ok(&config, &["assign", "sun_2024-03-10", "Camera", "Ana"]);
    assert!(output.contains("warning: Ana is not marked available"));
    assert!(output.contains("Assigned Ana to Camera"));

    let shown = rota_ok(&config, &["availability", "show", "--month", "2024-03"]);
    assert!(shown.contains("Ana: 2024-03-17"));
}

#[test]
fn test_autofill_from_stdin() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    rota_ok(
        &config,
        &[
            "rule", "add", "sun", "--title", "Sunday Service", "--weekday", "0", "--time",
            "09:00",
        ],
    );

    let mut child = Command::new(rota_binary())
        .arg("--config")
        .arg(&config)
        .args(["autofill", "2024-03-01", "2024-03-31"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .as_mut()
        .unwrap()
        .write_all(
            br#"{"sun_2024-03-10_Camera": "Ana", "sun_2024-03-10_Drums": "Carla"}"#,
        )
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("skipped unknown key"));
    assert!(stdout.contains("Applied 1 suggestion(s), skipped 1."));

    let roster = rota_ok(&config, &["roster", "2024-03-10", "2024-03-10"]);
    assert!(roster.contains("Camera: Ana"));
}

#[test]
fn test_status_reports_configuration() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    rota_ok(
        &config,
        &[
            "rule", "add", "sun", "--title", "Sunday Service", "--weekday", "0", "--time",
            "09:00",
        ],
    );
    rota_ok(&config, &["rule", "disable", "sun"]);

    let status = rota_ok(&config, &["status"]);
    assert!(status.contains("Ministry: worship"));
    assert!(status.contains("Rules: 1 (0 active)"));

    // Disabled rules produce no occurrences.
    let schedule = rota_ok(&config, &["schedule", "2024-03-01", "2024-03-31"]);
    assert!(schedule.contains("No occurrences"));
}

#[test]
fn test_runaway_range_fails_cleanly() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    rota_ok(
        &config,
        &[
            "rule", "add", "sun", "--title", "Sunday Service", "--weekday", "0", "--time",
            "09:00",
        ],
    );

    let output = rota(&config, &["schedule", "2024-01-01", "2026-01-01"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("400-day limit"));
}
