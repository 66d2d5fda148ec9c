//! Cross-ministry conflict detection.
//!
//! Scheduling happens independently per ministry, so the only cross-cutting
//! safety net is a derived index of who is busy when, rebuilt per query
//! window from every ministry's assignments. The result is informational
//! (a warning badge) and never blocks a save: a member may legitimately
//! decline one commitment in favor of another.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::reconcile::AssignmentRecord;
use crate::types::MinistryId;

/// Normalizes a member name for cross-ministry comparison:
/// trimmed, diacritics stripped (NFD + combining marks removed), lowercased.
///
/// "  João " and "joao" refer to the same person.
pub fn normalize_member_name(name: &str) -> String {
    name.trim()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// One derived busy slot. Never stored; recomputed per query window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusySlot {
    pub member_name: String,
    pub timestamp: NaiveDateTime,
    pub ministry_id: MinistryId,
}

/// Derives busy slots from assignment records.
///
/// `occurrence_timestamps` maps canonical occurrence ids to their event
/// timestamps. Records without a rule reference, or whose occurrence id is
/// not in the map, have no known timestamp and contribute nothing — the
/// index degrades to "no conflict" rather than guessing.
pub fn busy_slots(
    records: &[AssignmentRecord],
    occurrence_timestamps: &HashMap<String, NaiveDateTime>,
) -> Vec<BusySlot> {
    records
        .iter()
        .filter_map(|record| {
            let rule_ref = record.rule_reference.as_ref()?;
            let occ_id = crate::schedule::occurrence_id(rule_ref, record.event_date);
            let timestamp = occurrence_timestamps.get(&occ_id)?;
            Some(BusySlot {
                member_name: record.member.to_string(),
                timestamp: *timestamp,
                ministry_id: record.ministry_id.clone(),
            })
        })
        .collect()
}

/// Member -> busy-timestamp lookup across an organization's ministries.
#[derive(Debug, Default)]
pub struct ConflictIndex {
    slots: HashMap<(String, NaiveDateTime), Vec<MinistryId>>,
}

impl ConflictIndex {
    /// Builds the index from derived busy slots.
    pub fn build(slots: impl IntoIterator<Item = BusySlot>) -> Self {
        let mut index: HashMap<(String, NaiveDateTime), Vec<MinistryId>> = HashMap::new();
        for slot in slots {
            let key = (normalize_member_name(&slot.member_name), slot.timestamp);
            let ministries = index.entry(key).or_default();
            if !ministries.contains(&slot.ministry_id) {
                ministries.push(slot.ministry_id);
            }
        }
        Self { slots: index }
    }

    /// Ministries other than `current` where `member_name` is already
    /// assigned at exactly `timestamp`. Sorted for stable output.
    pub fn conflicts_for(
        &self,
        member_name: &str,
        timestamp: NaiveDateTime,
        current: &MinistryId,
    ) -> Vec<MinistryId> {
        let key = (normalize_member_name(member_name), timestamp);
        let mut out: Vec<MinistryId> = self
            .slots
            .get(&key)
            .map(|ministries| {
                ministries
                    .iter()
                    .filter(|m| *m != current)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        out.sort();
        out
    }

    /// All busy entries for a member at a timestamp, regardless of ministry.
    pub fn ministries_at(&self, member_name: &str, timestamp: NaiveDateTime) -> &[MinistryId] {
        let key = (normalize_member_name(member_name), timestamp);
        self.slots.get(&key).map_or(&[], Vec::as_slice)
    }
}
