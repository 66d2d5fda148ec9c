//! Assignment reconciliation.
//!
//! Persisted assignment rows were written under inconsistent key schemes:
//! current rows carry a rule reference and resolve to a canonical occurrence
//! id directly; historical rows predate the id scheme and carry only an
//! event date and a role. Reconciliation merges both kinds with a set of
//! freshly generated occurrences into one canonical
//! `(occurrence id, role) -> member` table.
//!
//! The primary and fallback indices are deliberately separate structures,
//! never merged, so the precedence rule stays auditable: an exact match on
//! the canonical id always wins, and a fallback hit can never overwrite it.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::schedule::Occurrence;
use crate::types::{MemberId, MinistryId, OrganizationId, Role, RuleId};

/// One persisted assignment row, as stored.
///
/// `rule_reference` is `None` for legacy rows written before the canonical
/// occurrence-id scheme existed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub ministry_id: MinistryId,
    pub organization_id: OrganizationId,
    pub rule_reference: Option<RuleId>,
    pub event_date: NaiveDate,
    pub role: Role,
    pub member: MemberId,
    pub confirmed: bool,
}

/// One resolved roster cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterCell {
    pub member: MemberId,
    pub confirmed: bool,
}

/// Snapshot of a roster table taken before an optimistic mutation.
#[derive(Debug, Clone)]
pub struct RosterSnapshot {
    cells: HashMap<(String, String), RosterCell>,
}

/// The canonical `(occurrence id, role key) -> member` mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterTable {
    cells: HashMap<(String, String), RosterCell>,
}

impl RosterTable {
    /// Looks up the member filling `role` at the occurrence.
    pub fn get(&self, occurrence_id: &str, role: &Role) -> Option<&RosterCell> {
        self.cells
            .get(&(occurrence_id.to_string(), role.storage_key()))
    }

    /// True when the occurrence has at least one filled role.
    pub fn has_assignments(&self, occurrence_id: &str) -> bool {
        self.cells.keys().any(|(occ, _)| occ == occurrence_id)
    }

    /// Number of filled cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Writes a cell directly (no persistence involved).
    pub fn assign(&mut self, occurrence_id: &str, role: &Role, member: MemberId) {
        self.cells.insert(
            (occurrence_id.to_string(), role.storage_key()),
            RosterCell {
                member,
                confirmed: false,
            },
        );
    }

    /// Clears a cell directly.
    pub fn remove(&mut self, occurrence_id: &str, role: &Role) -> Option<RosterCell> {
        self.cells
            .remove(&(occurrence_id.to_string(), role.storage_key()))
    }

    /// Marks a cell confirmed or unconfirmed. No-op for an empty cell.
    pub fn set_confirmed(&mut self, occurrence_id: &str, role: &Role, confirmed: bool) {
        if let Some(cell) = self
            .cells
            .get_mut(&(occurrence_id.to_string(), role.storage_key()))
        {
            cell.confirmed = confirmed;
        }
    }

    /// Captures the current state for rollback.
    pub fn snapshot(&self) -> RosterSnapshot {
        RosterSnapshot {
            cells: self.cells.clone(),
        }
    }

    /// Restores a previously captured state.
    pub fn restore(&mut self, snapshot: RosterSnapshot) {
        self.cells = snapshot.cells;
    }

    /// Optimistically assigns a member, then runs the persistence call.
    ///
    /// The in-memory table updates before `persist` runs; if `persist`
    /// fails, the pre-update snapshot is restored and the error propagated,
    /// so the table never stays consistent with a write that didn't happen.
    pub fn apply_assignment<E>(
        &mut self,
        occurrence_id: &str,
        role: &Role,
        member: MemberId,
        persist: impl FnOnce() -> Result<(), E>,
    ) -> Result<(), E> {
        let snapshot = self.snapshot();
        self.assign(occurrence_id, role, member);
        if let Err(err) = persist() {
            self.restore(snapshot);
            return Err(err);
        }
        Ok(())
    }

    /// Optimistically clears a cell, then runs the persistence call.
    /// Rolls back on failure, like [`Self::apply_assignment`].
    pub fn apply_removal<E>(
        &mut self,
        occurrence_id: &str,
        role: &Role,
        persist: impl FnOnce() -> Result<(), E>,
    ) -> Result<(), E> {
        let snapshot = self.snapshot();
        self.remove(occurrence_id, role);
        if let Err(err) = persist() {
            self.restore(snapshot);
            return Err(err);
        }
        Ok(())
    }
}

/// Builds the canonical roster table for a set of occurrences and roles.
///
/// Resolution order per (occurrence, role):
/// 1. exact match on the canonical occurrence id and full role key;
/// 2. fallback: a legacy record (no rule reference) with the same event
///    date and full role key;
/// 3. fallback for slotted roles only: a legacy record with the same event
///    date and the bare base role (pre-expansion data);
/// 4. otherwise the cell is empty.
pub fn reconcile(
    occurrences: &[Occurrence],
    roles: &[Role],
    records: &[AssignmentRecord],
) -> RosterTable {
    // Primary index: records that carry a rule reference, keyed by the
    // canonical occurrence id they resolve to.
    let mut primary: HashMap<(String, String), &AssignmentRecord> = HashMap::new();
    // Fallback index: legacy records without a rule reference, keyed by
    // (event date, role key) only. Kept separate from the primary index.
    let mut fallback: HashMap<(NaiveDate, String), &AssignmentRecord> = HashMap::new();

    for record in records {
        let role_key = record.role.storage_key();
        match &record.rule_reference {
            Some(rule_ref) => {
                let occ_id = crate::schedule::occurrence_id(rule_ref, record.event_date);
                primary.insert((occ_id, role_key), record);
            }
            None => {
                fallback.insert((record.event_date, role_key), record);
            }
        }
    }

    let mut table = RosterTable::default();
    for occurrence in occurrences {
        for role in roles {
            let role_key = role.storage_key();
            let resolved = primary
                .get(&(occurrence.id.clone(), role_key.clone()))
                .or_else(|| fallback.get(&(occurrence.date, role_key.clone())))
                .or_else(|| {
                    // Bare base-role fallback applies only to slotted roles;
                    // an unslotted role already tried its own key above.
                    role.slot().and_then(|_| {
                        fallback.get(&(occurrence.date, role.base().to_string()))
                    })
                });
            if let Some(record) = resolved {
                table.cells.insert(
                    (occurrence.id.clone(), role_key),
                    RosterCell {
                        member: record.member.clone(),
                        confirmed: record.confirmed,
                    },
                );
            }
        }
    }
    table
}

/// Cached reconciled roster with recompute-on-read invalidation.
///
/// The external change-notification channel only tells us "something
/// changed"; the whole obligation here is to drop the cached table and
/// rebuild it on the next read. Recomputation is bounded by
/// occurrences-in-range x roles, cheap enough that incremental patching
/// isn't worth the complexity.
#[derive(Debug, Default)]
pub struct RosterCache {
    table: Option<RosterTable>,
}

impl RosterCache {
    /// Drops the cached table; the next read recomputes.
    pub fn invalidate(&mut self) {
        self.table = None;
    }

    /// Returns the cached table, rebuilding it with `rebuild` if invalidated.
    pub fn get_or_rebuild(&mut self, rebuild: impl FnOnce() -> RosterTable) -> &mut RosterTable {
        self.table.get_or_insert_with(rebuild)
    }
}
