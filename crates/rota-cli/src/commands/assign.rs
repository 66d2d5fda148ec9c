//! Assignment commands: assign, unassign, confirm.
//!
//! Availability and conflict findings are warnings, never blocks: an editor
//! may knowingly schedule someone who hasn't declared the date, or who also
//! serves elsewhere that day. Confirmation, by contrast, is hard-gated to
//! its time window.

use std::collections::HashMap;
use std::io::Write;

use anyhow::{Result, bail};
use chrono::{Local, NaiveDateTime};

use rota_core::conflict::{ConflictIndex, busy_slots};
use rota_core::reconcile::{AssignmentRecord, reconcile};
use rota_core::schedule::{Occurrence, generate_occurrences};
use rota_core::availability;
use rota_core::types::{MemberId, MinistryId, OrganizationId, Role};
use rota_core::upcoming::{CLOSES_AFTER, ConfirmationWindow, OPENS_BEFORE};
use rota_db::{Database, DbError};

use crate::Config;
use crate::commands::util;

/// Assigns a member to a role at an occurrence.
pub fn assign<W: Write>(
    writer: &mut W,
    db: &mut Database,
    config: &Config,
    occurrence_id: &str,
    role_key: &str,
    member_name: &str,
) -> Result<()> {
    let ministry_id = config.ministry_id()?;
    let organization_id = config.organization_id()?;
    let rules = db.active_rules(&ministry_id)?;
    let occurrence = util::find_occurrence(&rules, occurrence_id)?;
    let role = resolve_role(config, role_key)?;
    let member = MemberId::new(member_name.to_string())?;

    let month = occurrence.date.format("%Y-%m").to_string();
    let tokens = db.availability_for(&ministry_id, &member, &month)?;
    if !availability::is_available(&tokens, occurrence.timestamp()) {
        writeln!(
            writer,
            "warning: {member} is not marked available on {} at {}",
            occurrence.date,
            occurrence.time_of_day.format("%H:%M"),
        )?;
    }

    let elsewhere = conflicting_ministries(db, &organization_id, &ministry_id, &member, &occurrence)?;
    if !elsewhere.is_empty() {
        let names: Vec<&str> = elsewhere.iter().map(MinistryId::as_str).collect();
        writeln!(
            writer,
            "warning: {member} is already serving at the same time in: {}",
            names.join(", "),
        )?;
    }

    let records = db.assignments_in_range(&ministry_id, occurrence.date, occurrence.date)?;
    let roles = config.role_list()?;
    let mut table = reconcile(&[occurrence.clone()], &roles, &records);

    let record = AssignmentRecord {
        ministry_id,
        organization_id,
        rule_reference: Some(occurrence.rule_id.clone()),
        event_date: occurrence.date,
        role: role.clone(),
        member: member.clone(),
        confirmed: false,
    };
    table.apply_assignment(&occurrence.id, &role, member.clone(), || {
        db.upsert_assignment(&record)
    })?;

    writeln!(writer, "Assigned {member} to {role} at {}.", occurrence.id)?;
    Ok(())
}

/// Clears a role at an occurrence.
pub fn unassign<W: Write>(
    writer: &mut W,
    db: &mut Database,
    config: &Config,
    occurrence_id: &str,
    role_key: &str,
) -> Result<()> {
    let ministry_id = config.ministry_id()?;
    let rules = db.active_rules(&ministry_id)?;
    let occurrence = util::find_occurrence(&rules, occurrence_id)?;
    let role = resolve_role(config, role_key)?;

    let records = db.assignments_in_range(&ministry_id, occurrence.date, occurrence.date)?;
    let roles = config.role_list()?;
    let mut table = reconcile(&[occurrence.clone()], &roles, &records);
    if table.get(&occurrence.id, &role).is_none() {
        bail!("no assignment for {role} at {}", occurrence.id);
    }

    // Delete both key forms: the canonical row and any legacy row that
    // would otherwise resurface through the date fallback.
    table.apply_removal(&occurrence.id, &role, || {
        db.delete_assignment(
            &ministry_id,
            Some(&occurrence.rule_id),
            occurrence.date,
            &role,
        )?;
        db.delete_assignment(&ministry_id, None, occurrence.date, &role)
    })?;

    writeln!(writer, "Cleared {role} at {}.", occurrence.id)?;
    Ok(())
}

/// Confirms (or retracts) an assignment, gated to the confirmation window.
pub fn confirm<W: Write>(
    writer: &mut W,
    db: &mut Database,
    config: &Config,
    occurrence_id: &str,
    role_key: &str,
    undo: bool,
) -> Result<()> {
    confirm_at(writer, db, config, occurrence_id, role_key, undo, Local::now().naive_local())
}

fn confirm_at<W: Write>(
    writer: &mut W,
    db: &mut Database,
    config: &Config,
    occurrence_id: &str,
    role_key: &str,
    undo: bool,
    now: NaiveDateTime,
) -> Result<()> {
    let ministry_id = config.ministry_id()?;
    let rules = db.active_rules(&ministry_id)?;
    let occurrence = util::find_occurrence(&rules, occurrence_id)?;
    let role = resolve_role(config, role_key)?;

    let event = occurrence.timestamp();
    match ConfirmationWindow::classify(now, event) {
        ConfirmationWindow::Open => {}
        ConfirmationWindow::Early => bail!(
            "confirmation for {} opens at {}",
            occurrence.id,
            (event - OPENS_BEFORE).format("%Y-%m-%d %H:%M"),
        ),
        ConfirmationWindow::Closed => bail!(
            "confirmation for {} closed at {}",
            occurrence.id,
            (event + CLOSES_AFTER).format("%Y-%m-%d %H:%M"),
        ),
    }

    // Try the canonical key first, then the legacy key the row may have
    // been written under.
    let confirmed = !undo;
    match db.set_confirmed(
        &ministry_id,
        Some(&occurrence.rule_id),
        occurrence.date,
        &role,
        confirmed,
    ) {
        Err(DbError::AssignmentNotFound { .. }) => {
            db.set_confirmed(&ministry_id, None, occurrence.date, &role, confirmed)?;
        }
        other => other?,
    }

    let verb = if undo { "Unconfirmed" } else { "Confirmed" };
    writeln!(writer, "{verb} {role} at {}.", occurrence.id)?;
    Ok(())
}

fn resolve_role(config: &Config, role_key: &str) -> Result<Role> {
    let role = Role::parse_key(role_key)?;
    let roles = config.role_list()?;
    if !roles.contains(&role) {
        let keys: Vec<String> = roles.iter().map(Role::storage_key).collect();
        bail!(
            "role {role_key:?} is not in the configured role list ({})",
            keys.join(", "),
        );
    }
    Ok(role)
}

/// Other ministries where `member` is already assigned at the occurrence's
/// exact timestamp.
fn conflicting_ministries(
    db: &Database,
    organization_id: &OrganizationId,
    ministry_id: &MinistryId,
    member: &MemberId,
    occurrence: &Occurrence,
) -> Result<Vec<MinistryId>> {
    let org_rules = db.organization_rules(organization_id)?;
    let org_occurrences = generate_occurrences(&org_rules, occurrence.date, occurrence.date)?;
    let timestamps: HashMap<String, NaiveDateTime> = org_occurrences
        .iter()
        .map(|occ| (occ.id.clone(), occ.timestamp()))
        .collect();
    let records =
        db.organization_assignments_in_range(organization_id, occurrence.date, occurrence.date)?;
    let index = ConflictIndex::build(busy_slots(&records, &timestamps));
    Ok(index.conflicts_for(member.as_str(), occurrence.timestamp(), ministry_id))
}
