//! Storage layer for the rota scheduler.
//!
//! Provides persistence for recurrence rules, assignments and availability
//! using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! This means a `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization.
//!
//! # Schema
//!
//! ## Date and time format
//!
//! Dates are stored as TEXT in `YYYY-MM-DD` form, times as `HH:MM:SS`, and
//! availability months as `YYYY-MM`. Lexicographic ordering of these strings
//! matches chronological ordering, so range queries work directly on TEXT.
//!
//! ## Legacy assignment rows
//!
//! The `assignments` table predates the canonical occurrence-id scheme. Its
//! primary key includes `rule_reference`, stored as the empty string when the
//! row was written without one. Loading maps `''` back to `None` so the
//! reconciler can route those rows through its date-based fallback.

use std::collections::HashMap;
use std::path::Path;

use chrono::{NaiveDate, NaiveTime};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

use rota_core::reconcile::AssignmentRecord;
use rota_core::rule::{Cadence, RecurrenceRule, weekday_to_index};
use rota_core::types::{MemberId, MinistryId, OrganizationId, Role, RuleId};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A rule targeted by an update does not exist.
    #[error("rule {rule_id} not found")]
    RuleNotFound { rule_id: String },
    /// An assignment targeted by an update does not exist.
    #[error("no assignment for {role} on {event_date}")]
    AssignmentNotFound {
        event_date: NaiveDate,
        role: String,
    },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// One member's declared availability for a month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityEntry {
    pub member: MemberId,
    pub tokens: Vec<String>,
    pub note: Option<String>,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS rules (
                id TEXT NOT NULL,
                ministry_id TEXT NOT NULL,
                organization_id TEXT NOT NULL,
                title TEXT NOT NULL,
                kind TEXT NOT NULL,
                weekday INTEGER,
                event_date TEXT,
                time_of_day TEXT NOT NULL,
                active INTEGER NOT NULL DEFAULT 1,
                PRIMARY KEY (ministry_id, id)
            );

            CREATE INDEX IF NOT EXISTS idx_rules_organization ON rules(organization_id);

            -- Assignments: rule_reference is '' for rows written before the
            -- canonical occurrence-id scheme; those resolve by date and role.
            CREATE TABLE IF NOT EXISTS assignments (
                ministry_id TEXT NOT NULL,
                organization_id TEXT NOT NULL,
                rule_reference TEXT NOT NULL DEFAULT '',
                event_date TEXT NOT NULL,
                role TEXT NOT NULL,
                member TEXT NOT NULL,
                confirmed INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (ministry_id, rule_reference, event_date, role)
            );

            CREATE INDEX IF NOT EXISTS idx_assignments_org_date
                ON assignments(organization_id, event_date);

            CREATE TABLE IF NOT EXISTS availability (
                ministry_id TEXT NOT NULL,
                member TEXT NOT NULL,
                month TEXT NOT NULL,
                token TEXT NOT NULL,
                PRIMARY KEY (ministry_id, member, month, token)
            );

            CREATE TABLE IF NOT EXISTS availability_notes (
                ministry_id TEXT NOT NULL,
                member TEXT NOT NULL,
                month TEXT NOT NULL,
                note TEXT NOT NULL,
                PRIMARY KEY (ministry_id, member, month)
            );
            ",
        )?;
        Ok(())
    }

    /// Inserts or updates a recurrence rule.
    pub fn upsert_rule(&mut self, rule: &RecurrenceRule) -> Result<(), DbError> {
        let (kind, weekday, event_date) = match rule.cadence {
            Cadence::Weekly { weekday } => ("weekly", Some(weekday_to_index(weekday)), None),
            Cadence::Single { date } => ("single", None, Some(format_date(date))),
        };
        self.conn.execute(
            "
            INSERT INTO rules (id, ministry_id, organization_id, title, kind, weekday, event_date, time_of_day, active)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(ministry_id, id) DO UPDATE SET
                organization_id = excluded.organization_id,
                title = excluded.title,
                kind = excluded.kind,
                weekday = excluded.weekday,
                event_date = excluded.event_date,
                time_of_day = excluded.time_of_day,
                active = excluded.active
            ",
            params![
                rule.id.as_str(),
                rule.ministry_id.as_str(),
                rule.organization_id.as_str(),
                rule.title,
                kind,
                weekday,
                event_date,
                format_time(rule.time_of_day),
                rule.active,
            ],
        )?;
        Ok(())
    }

    /// Lists all of a ministry's rules, active or not, ordered by ID.
    ///
    /// Rows that fail typed conversion are logged and skipped so one
    /// corrupted row never takes the whole schedule down.
    pub fn list_rules(&self, ministry_id: &MinistryId) -> Result<Vec<RecurrenceRule>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, ministry_id, organization_id, title, kind, weekday, event_date, time_of_day, active
            FROM rules
            WHERE ministry_id = ?
            ORDER BY id ASC
            ",
        )?;
        let rows = stmt.query_map([ministry_id.as_str()], |row| {
            Ok(RuleRow {
                id: row.get(0)?,
                ministry_id: row.get(1)?,
                organization_id: row.get(2)?,
                title: row.get(3)?,
                kind: row.get(4)?,
                weekday: row.get(5)?,
                event_date: row.get(6)?,
                time_of_day: row.get(7)?,
                active: row.get(8)?,
            })
        })?;
        let mut rules = Vec::new();
        for row in rows {
            if let Some(rule) = rule_from_row(row?) {
                rules.push(rule);
            }
        }
        Ok(rules)
    }

    /// Lists every ministry's rules across an organization.
    ///
    /// Conflict detection needs the whole organization's schedule to compute
    /// timestamps for other ministries' assignments.
    pub fn organization_rules(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<RecurrenceRule>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, ministry_id, organization_id, title, kind, weekday, event_date, time_of_day, active
            FROM rules
            WHERE organization_id = ?
            ORDER BY ministry_id ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([organization_id.as_str()], |row| {
            Ok(RuleRow {
                id: row.get(0)?,
                ministry_id: row.get(1)?,
                organization_id: row.get(2)?,
                title: row.get(3)?,
                kind: row.get(4)?,
                weekday: row.get(5)?,
                event_date: row.get(6)?,
                time_of_day: row.get(7)?,
                active: row.get(8)?,
            })
        })?;
        let mut rules = Vec::new();
        for row in rows {
            if let Some(rule) = rule_from_row(row?) {
                rules.push(rule);
            }
        }
        Ok(rules)
    }

    /// Lists a ministry's active rules, ordered by ID.
    pub fn active_rules(&self, ministry_id: &MinistryId) -> Result<Vec<RecurrenceRule>, DbError> {
        Ok(self
            .list_rules(ministry_id)?
            .into_iter()
            .filter(|rule| rule.active)
            .collect())
    }

    /// Activates or deactivates a rule.
    pub fn set_rule_active(
        &mut self,
        ministry_id: &MinistryId,
        rule_id: &RuleId,
        active: bool,
    ) -> Result<(), DbError> {
        let updated = self.conn.execute(
            "UPDATE rules SET active = ? WHERE ministry_id = ? AND id = ?",
            params![active, ministry_id.as_str(), rule_id.as_str()],
        )?;
        if updated == 0 {
            return Err(DbError::RuleNotFound {
                rule_id: rule_id.to_string(),
            });
        }
        Ok(())
    }

    /// Inserts or overwrites one assignment cell.
    pub fn upsert_assignment(&mut self, record: &AssignmentRecord) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO assignments (ministry_id, organization_id, rule_reference, event_date, role, member, confirmed)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(ministry_id, rule_reference, event_date, role) DO UPDATE SET
                organization_id = excluded.organization_id,
                member = excluded.member,
                confirmed = excluded.confirmed
            ",
            params![
                record.ministry_id.as_str(),
                record.organization_id.as_str(),
                rule_reference_key(record.rule_reference.as_ref()),
                format_date(record.event_date),
                record.role.storage_key(),
                record.member.as_str(),
                record.confirmed,
            ],
        )?;
        Ok(())
    }

    /// Deletes one assignment cell. Deleting a missing cell is a no-op.
    pub fn delete_assignment(
        &mut self,
        ministry_id: &MinistryId,
        rule_reference: Option<&RuleId>,
        event_date: NaiveDate,
        role: &Role,
    ) -> Result<(), DbError> {
        self.conn.execute(
            "
            DELETE FROM assignments
            WHERE ministry_id = ? AND rule_reference = ? AND event_date = ? AND role = ?
            ",
            params![
                ministry_id.as_str(),
                rule_reference_key(rule_reference),
                format_date(event_date),
                role.storage_key(),
            ],
        )?;
        Ok(())
    }

    /// Marks one assignment confirmed or unconfirmed.
    pub fn set_confirmed(
        &mut self,
        ministry_id: &MinistryId,
        rule_reference: Option<&RuleId>,
        event_date: NaiveDate,
        role: &Role,
        confirmed: bool,
    ) -> Result<(), DbError> {
        let updated = self.conn.execute(
            "
            UPDATE assignments SET confirmed = ?
            WHERE ministry_id = ? AND rule_reference = ? AND event_date = ? AND role = ?
            ",
            params![
                confirmed,
                ministry_id.as_str(),
                rule_reference_key(rule_reference),
                format_date(event_date),
                role.storage_key(),
            ],
        )?;
        if updated == 0 {
            return Err(DbError::AssignmentNotFound {
                event_date,
                role: role.storage_key(),
            });
        }
        Ok(())
    }

    /// Lists one ministry's assignments with event dates in `[start, end]`.
    pub fn assignments_in_range(
        &self,
        ministry_id: &MinistryId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AssignmentRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT ministry_id, organization_id, rule_reference, event_date, role, member, confirmed
            FROM assignments
            WHERE ministry_id = ? AND event_date >= ? AND event_date <= ?
            ORDER BY event_date ASC, role ASC
            ",
        )?;
        let rows = stmt.query_map(
            params![ministry_id.as_str(), format_date(start), format_date(end)],
            assignment_row,
        )?;
        collect_assignments(rows)
    }

    /// Lists every ministry's assignments across an organization with event
    /// dates in `[start, end]`. Feeds cross-ministry conflict detection.
    pub fn organization_assignments_in_range(
        &self,
        organization_id: &OrganizationId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AssignmentRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT ministry_id, organization_id, rule_reference, event_date, role, member, confirmed
            FROM assignments
            WHERE organization_id = ? AND event_date >= ? AND event_date <= ?
            ORDER BY event_date ASC, ministry_id ASC, role ASC
            ",
        )?;
        let rows = stmt.query_map(
            params![
                organization_id.as_str(),
                format_date(start),
                format_date(end)
            ],
            assignment_row,
        )?;
        collect_assignments(rows)
    }

    /// Replaces a member's availability tokens (and optional note) for one
    /// month. The swap is transactional: readers never see a half-replaced
    /// token set.
    pub fn replace_availability(
        &mut self,
        ministry_id: &MinistryId,
        member: &MemberId,
        month: &str,
        tokens: &[String],
        note: Option<&str>,
    ) -> Result<(), DbError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM availability WHERE ministry_id = ? AND member = ? AND month = ?",
            params![ministry_id.as_str(), member.as_str(), month],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO availability (ministry_id, member, month, token) VALUES (?, ?, ?, ?)",
            )?;
            for token in tokens {
                stmt.execute(params![
                    ministry_id.as_str(),
                    member.as_str(),
                    month,
                    token
                ])?;
            }
        }
        tx.execute(
            "DELETE FROM availability_notes WHERE ministry_id = ? AND member = ? AND month = ?",
            params![ministry_id.as_str(), member.as_str(), month],
        )?;
        if let Some(note) = note {
            tx.execute(
                "INSERT INTO availability_notes (ministry_id, member, month, note) VALUES (?, ?, ?, ?)",
                params![ministry_id.as_str(), member.as_str(), month, note],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// One member's availability tokens for a month, ordered.
    pub fn availability_for(
        &self,
        ministry_id: &MinistryId,
        member: &MemberId,
        month: &str,
    ) -> Result<Vec<String>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT token FROM availability
            WHERE ministry_id = ? AND member = ? AND month = ?
            ORDER BY token ASC
            ",
        )?;
        let rows = stmt.query_map(
            params![ministry_id.as_str(), member.as_str(), month],
            |row| row.get::<_, String>(0),
        )?;
        let mut tokens = Vec::new();
        for row in rows {
            tokens.push(row?);
        }
        Ok(tokens)
    }

    /// One member's availability note for a month, if any.
    pub fn availability_note(
        &self,
        ministry_id: &MinistryId,
        member: &MemberId,
        month: &str,
    ) -> Result<Option<String>, DbError> {
        let note = self
            .conn
            .query_row(
                "SELECT note FROM availability_notes WHERE ministry_id = ? AND member = ? AND month = ?",
                params![ministry_id.as_str(), member.as_str(), month],
                |row| row.get(0),
            )
            .optional()?;
        Ok(note)
    }

    /// Every member's availability for one month, keyed by member.
    pub fn month_availability(
        &self,
        ministry_id: &MinistryId,
        month: &str,
    ) -> Result<Vec<AvailabilityEntry>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT member, token FROM availability
            WHERE ministry_id = ? AND month = ?
            ORDER BY member ASC, token ASC
            ",
        )?;
        let rows = stmt.query_map(params![ministry_id.as_str(), month], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut tokens_by_member: Vec<(String, Vec<String>)> = Vec::new();
        for row in rows {
            let (member, token) = row?;
            match tokens_by_member.last_mut() {
                Some((last, tokens)) if *last == member => tokens.push(token),
                _ => tokens_by_member.push((member, vec![token])),
            }
        }

        let mut notes: HashMap<String, String> = HashMap::new();
        let mut stmt = self.conn.prepare(
            "SELECT member, note FROM availability_notes WHERE ministry_id = ? AND month = ?",
        )?;
        let rows = stmt.query_map(params![ministry_id.as_str(), month], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (member, note) = row?;
            notes.insert(member, note);
        }

        let mut entries = Vec::new();
        for (member, tokens) in tokens_by_member {
            let Ok(member_id) = MemberId::new(member.clone()) else {
                tracing::warn!(member, "skipping availability row with empty member");
                continue;
            };
            let note = notes.remove(&member);
            entries.push(AvailabilityEntry {
                member: member_id,
                tokens,
                note,
            });
        }
        Ok(entries)
    }
}

#[derive(Debug)]
struct RuleRow {
    id: String,
    ministry_id: String,
    organization_id: String,
    title: String,
    kind: String,
    weekday: Option<i64>,
    event_date: Option<String>,
    time_of_day: String,
    active: bool,
}

#[derive(Debug)]
struct AssignmentRow {
    ministry_id: String,
    organization_id: String,
    rule_reference: String,
    event_date: String,
    role: String,
    member: String,
    confirmed: bool,
}

fn assignment_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AssignmentRow> {
    Ok(AssignmentRow {
        ministry_id: row.get(0)?,
        organization_id: row.get(1)?,
        rule_reference: row.get(2)?,
        event_date: row.get(3)?,
        role: row.get(4)?,
        member: row.get(5)?,
        confirmed: row.get(6)?,
    })
}

fn collect_assignments(
    rows: impl Iterator<Item = rusqlite::Result<AssignmentRow>>,
) -> Result<Vec<AssignmentRecord>, DbError> {
    let mut records = Vec::new();
    for row in rows {
        if let Some(record) = assignment_from_row(row?) {
            records.push(record);
        }
    }
    Ok(records)
}

fn rule_from_row(row: RuleRow) -> Option<RecurrenceRule> {
    let result = (|| {
        let id = RuleId::new(row.id.clone()).map_err(|err| err.to_string())?;
        let ministry_id =
            MinistryId::new(row.ministry_id.clone()).map_err(|err| err.to_string())?;
        let organization_id =
            OrganizationId::new(row.organization_id.clone()).map_err(|err| err.to_string())?;
        let event_date = match &row.event_date {
            Some(raw) => Some(parse_date(raw)?),
            None => None,
        };
        let time_of_day = parse_time(&row.time_of_day)?;
        RecurrenceRule::from_parts(
            id,
            ministry_id,
            organization_id,
            row.title.clone(),
            &row.kind,
            row.weekday,
            event_date,
            time_of_day,
            row.active,
        )
        .map_err(|err| err.to_string())
    })();
    match result {
        Ok(rule) => Some(rule),
        Err(reason) => {
            tracing::warn!(rule_id = row.id, reason, "skipping malformed rule row");
            None
        }
    }
}

fn assignment_from_row(row: AssignmentRow) -> Option<AssignmentRecord> {
    let result = (|| {
        let ministry_id =
            MinistryId::new(row.ministry_id.clone()).map_err(|err| err.to_string())?;
        let organization_id =
            OrganizationId::new(row.organization_id.clone()).map_err(|err| err.to_string())?;
        let rule_reference = if row.rule_reference.is_empty() {
            None
        } else {
            Some(RuleId::new(row.rule_reference.clone()).map_err(|err| err.to_string())?)
        };
        let event_date = parse_date(&row.event_date)?;
        let role = Role::parse_key(&row.role).map_err(|err| err.to_string())?;
        let member = MemberId::new(row.member.clone()).map_err(|err| err.to_string())?;
        Ok::<_, String>(AssignmentRecord {
            ministry_id,
            organization_id,
            rule_reference,
            event_date,
            role,
            member,
            confirmed: row.confirmed,
        })
    })();
    match result {
        Ok(record) => Some(record),
        Err(reason) => {
            tracing::warn!(
                event_date = row.event_date,
                role = row.role,
                reason,
                "skipping malformed assignment row"
            );
            None
        }
    }
}

fn rule_reference_key(rule_reference: Option<&RuleId>) -> &str {
    rule_reference.map_or("", RuleId::as_str)
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M:%S").to_string()
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    raw.parse().map_err(|_| format!("bad date: {raw}"))
}

fn parse_time(raw: &str) -> Result<NaiveTime, String> {
    raw.parse().map_err(|_| format!("bad time: {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ministry() -> MinistryId {
        MinistryId::new("worship").unwrap()
    }

    fn org() -> OrganizationId {
        OrganizationId::new("org-1").unwrap()
    }

    fn weekly_rule(id: &str, weekday: i64) -> RecurrenceRule {
        RecurrenceRule::from_parts(
            RuleId::new(id).unwrap(),
            ministry(),
            org(),
            "Sunday Service".to_string(),
            "weekly",
            Some(weekday),
            None,
            "09:00:00".parse().unwrap(),
            true,
        )
        .unwrap()
    }

    fn record(rule_ref: Option<&str>, date: &str, role_key: &str, who: &str) -> AssignmentRecord {
        AssignmentRecord {
            ministry_id: ministry(),
            organization_id: org(),
            rule_reference: rule_ref.map(|r| RuleId::new(r).unwrap()),
            event_date: date.parse().unwrap(),
            role: Role::parse_key(role_key).unwrap(),
            member: MemberId::new(who).unwrap(),
            confirmed: false,
        }
    }

    #[test]
    fn open_in_memory_database() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn schema_matches_data_model() {
        let db = Database::open_in_memory().expect("open in-memory db");

        let rules_columns = table_columns(&db.conn, "rules");
        assert_eq!(
            rules_columns,
            vec![
                "id",
                "ministry_id",
                "organization_id",
                "title",
                "kind",
                "weekday",
                "event_date",
                "time_of_day",
                "active",
            ]
        );

        let assignments_columns = table_columns(&db.conn, "assignments");
        assert_eq!(
            assignments_columns,
            vec![
                "ministry_id",
                "organization_id",
                "rule_reference",
                "event_date",
                "role",
                "member",
                "confirmed",
            ]
        );

        let availability_columns = table_columns(&db.conn, "availability");
        assert_eq!(
            availability_columns,
            vec!["ministry_id", "member", "month", "token"]
        );
    }

    fn table_columns(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .expect("prepare table_info");
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .expect("query table_info");
        rows.map(|row| row.expect("table_info row")).collect()
    }

    #[test]
    fn open_at_path_persists_across_reopen() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("rota.db");

        {
            let mut db = Database::open(&path).expect("open db");
            db.upsert_rule(&weekly_rule("sun", 0)).unwrap();
        }

        let db = Database::open(&path).expect("reopen db");
        let rules = db.list_rules(&ministry()).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].id.as_str(), "sun");
    }

    #[test]
    fn upsert_rule_round_trips_typed() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let rule = weekly_rule("sun", 0);
        db.upsert_rule(&rule).unwrap();

        let single = RecurrenceRule::from_parts(
            RuleId::new("xmas").unwrap(),
            ministry(),
            org(),
            "Christmas Eve".to_string(),
            "single",
            None,
            Some("2024-12-24".parse().unwrap()),
            "20:00:00".parse().unwrap(),
            true,
        )
        .unwrap();
        db.upsert_rule(&single).unwrap();

        let rules = db.list_rules(&ministry()).unwrap();
        assert_eq!(rules, vec![rule, single]);
    }

    #[test]
    fn upsert_rule_overwrites_existing() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        db.upsert_rule(&weekly_rule("sun", 0)).unwrap();
        db.upsert_rule(&weekly_rule("sun", 3)).unwrap();

        let rules = db.list_rules(&ministry()).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(
            rules[0].cadence,
            Cadence::Weekly {
                weekday: chrono::Weekday::Wed
            }
        );
    }

    #[test]
    fn malformed_rule_rows_are_skipped() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        db.upsert_rule(&weekly_rule("sun", 0)).unwrap();
        // Weekly rule with its weekday nulled out: unloadable.
        db.conn
            .execute(
                "INSERT INTO rules (id, ministry_id, organization_id, title, kind, weekday, event_date, time_of_day, active)
                 VALUES ('broken', 'worship', 'org-1', 'Broken', 'weekly', NULL, NULL, '09:00:00', 1)",
                [],
            )
            .unwrap();

        let rules = db.list_rules(&ministry()).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].id.as_str(), "sun");
    }

    #[test]
    fn organization_rules_span_ministries() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        db.upsert_rule(&weekly_rule("sun", 0)).unwrap();

        let mut media_rule = weekly_rule("svc", 0);
        media_rule.ministry_id = MinistryId::new("media").unwrap();
        db.upsert_rule(&media_rule).unwrap();

        let rules = db.organization_rules(&org()).unwrap();
        let ministries: Vec<&str> = rules.iter().map(|r| r.ministry_id.as_str()).collect();
        assert_eq!(ministries, vec!["media", "worship"]);
    }

    #[test]
    fn active_rules_excludes_deactivated() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        db.upsert_rule(&weekly_rule("sun", 0)).unwrap();
        db.upsert_rule(&weekly_rule("wed", 3)).unwrap();
        db.set_rule_active(&ministry(), &RuleId::new("wed").unwrap(), false)
            .unwrap();

        let rules = db.active_rules(&ministry()).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].id.as_str(), "sun");
    }

    #[test]
    fn set_rule_active_errors_on_missing_rule() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let result = db.set_rule_active(&ministry(), &RuleId::new("ghost").unwrap(), false);
        assert!(matches!(result, Err(DbError::RuleNotFound { .. })));
    }

    #[test]
    fn upsert_assignment_overwrites_same_cell() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        db.upsert_assignment(&record(Some("sun"), "2024-03-10", "Camera", "Ana"))
            .unwrap();
        db.upsert_assignment(&record(Some("sun"), "2024-03-10", "Camera", "Bruno"))
            .unwrap();

        let records = db
            .assignments_in_range(&ministry(), "2024-03-01".parse().unwrap(), "2024-03-31".parse().unwrap())
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].member.as_str(), "Bruno");
    }

    #[test]
    fn legacy_rule_reference_round_trips_as_none() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        db.upsert_assignment(&record(None, "2024-03-10", "Camera", "Ana"))
            .unwrap();

        let records = db
            .assignments_in_range(&ministry(), "2024-03-01".parse().unwrap(), "2024-03-31".parse().unwrap())
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].rule_reference, None);

        let stored: String = db
            .conn
            .query_row("SELECT rule_reference FROM assignments", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(stored, "");
    }

    #[test]
    fn legacy_and_canonical_rows_for_same_cell_coexist() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        db.upsert_assignment(&record(None, "2024-03-10", "Camera", "Legacy"))
            .unwrap();
        db.upsert_assignment(&record(Some("sun"), "2024-03-10", "Camera", "Canonical"))
            .unwrap();

        let records = db
            .assignments_in_range(&ministry(), "2024-03-01".parse().unwrap(), "2024-03-31".parse().unwrap())
            .unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn assignments_in_range_is_inclusive_and_scoped_to_ministry() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        db.upsert_assignment(&record(Some("sun"), "2024-03-01", "Camera", "Ana"))
            .unwrap();
        db.upsert_assignment(&record(Some("sun"), "2024-03-31", "Camera", "Bruno"))
            .unwrap();
        db.upsert_assignment(&record(Some("sun"), "2024-04-01", "Camera", "Clara"))
            .unwrap();

        let mut other = record(Some("sun"), "2024-03-10", "Camera", "Dana");
        other.ministry_id = MinistryId::new("media").unwrap();
        db.upsert_assignment(&other).unwrap();

        let records = db
            .assignments_in_range(&ministry(), "2024-03-01".parse().unwrap(), "2024-03-31".parse().unwrap())
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].member.as_str(), "Ana");
        assert_eq!(records[1].member.as_str(), "Bruno");
    }

    #[test]
    fn organization_range_spans_ministries() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        db.upsert_assignment(&record(Some("sun"), "2024-03-10", "Camera", "Ana"))
            .unwrap();
        let mut other = record(Some("svc"), "2024-03-10", "Sound", "Ana");
        other.ministry_id = MinistryId::new("media").unwrap();
        db.upsert_assignment(&other).unwrap();

        let records = db
            .organization_assignments_in_range(
                &org(),
                "2024-03-01".parse().unwrap(),
                "2024-03-31".parse().unwrap(),
            )
            .unwrap();
        assert_eq!(records.len(), 2);
        let ministries: Vec<&str> = records.iter().map(|r| r.ministry_id.as_str()).collect();
        assert_eq!(ministries, vec!["media", "worship"]);
    }

    #[test]
    fn delete_assignment_targets_one_cell() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        db.upsert_assignment(&record(Some("sun"), "2024-03-10", "Vocal_1", "Ana"))
            .unwrap();
        db.upsert_assignment(&record(Some("sun"), "2024-03-10", "Vocal_2", "Bruno"))
            .unwrap();

        db.delete_assignment(
            &ministry(),
            Some(&RuleId::new("sun").unwrap()),
            "2024-03-10".parse().unwrap(),
            &Role::parse_key("Vocal_1").unwrap(),
        )
        .unwrap();

        let records = db
            .assignments_in_range(&ministry(), "2024-03-01".parse().unwrap(), "2024-03-31".parse().unwrap())
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].role.storage_key(), "Vocal_2");
    }

    #[test]
    fn set_confirmed_flips_flag_and_errors_on_missing() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        db.upsert_assignment(&record(Some("sun"), "2024-03-10", "Camera", "Ana"))
            .unwrap();

        let rule_id = RuleId::new("sun").unwrap();
        let camera = Role::parse_key("Camera").unwrap();
        db.set_confirmed(
            &ministry(),
            Some(&rule_id),
            "2024-03-10".parse().unwrap(),
            &camera,
            true,
        )
        .unwrap();

        let records = db
            .assignments_in_range(&ministry(), "2024-03-01".parse().unwrap(), "2024-03-31".parse().unwrap())
            .unwrap();
        assert!(records[0].confirmed);

        let missing = db.set_confirmed(
            &ministry(),
            Some(&rule_id),
            "2024-03-17".parse().unwrap(),
            &camera,
            true,
        );
        assert!(matches!(missing, Err(DbError::AssignmentNotFound { .. })));
    }

    #[test]
    fn replace_availability_swaps_tokens_and_note() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let ana = MemberId::new("Ana").unwrap();

        db.replace_availability(
            &ministry(),
            &ana,
            "2024-03",
            &["2024-03-10".to_string(), "2024-03-17_morning".to_string()],
            Some("traveling late March"),
        )
        .unwrap();
        db.replace_availability(
            &ministry(),
            &ana,
            "2024-03",
            &["month_blocked".to_string()],
            None,
        )
        .unwrap();

        let tokens = db.availability_for(&ministry(), &ana, "2024-03").unwrap();
        assert_eq!(tokens, vec!["month_blocked".to_string()]);
        assert_eq!(db.availability_note(&ministry(), &ana, "2024-03").unwrap(), None);
    }

    #[test]
    fn availability_months_are_independent() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let ana = MemberId::new("Ana").unwrap();

        db.replace_availability(&ministry(), &ana, "2024-03", &["2024-03-10".to_string()], None)
            .unwrap();
        db.replace_availability(&ministry(), &ana, "2024-04", &["2024-04-07".to_string()], None)
            .unwrap();

        assert_eq!(
            db.availability_for(&ministry(), &ana, "2024-03").unwrap(),
            vec!["2024-03-10".to_string()]
        );
        assert_eq!(
            db.availability_for(&ministry(), &ana, "2024-04").unwrap(),
            vec!["2024-04-07".to_string()]
        );
    }

    #[test]
    fn month_availability_groups_by_member() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let ana = MemberId::new("Ana").unwrap();
        let bruno = MemberId::new("Bruno").unwrap();

        db.replace_availability(
            &ministry(),
            &ana,
            "2024-03",
            &["2024-03-10".to_string(), "2024-03-17".to_string()],
            Some("prefers mornings"),
        )
        .unwrap();
        db.replace_availability(&ministry(), &bruno, "2024-03", &["month_blocked".to_string()], None)
            .unwrap();

        let entries = db.month_availability(&ministry(), "2024-03").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].member, ana);
        assert_eq!(entries[0].tokens.len(), 2);
        assert_eq!(entries[0].note.as_deref(), Some("prefers mornings"));
        assert_eq!(entries[1].member, bruno);
        assert_eq!(entries[1].note, None);
    }
}
