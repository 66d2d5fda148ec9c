//! Validation and merge of auto-fill suggestions.
//!
//! An external producer (AI-assisted fill) returns a flat map of
//! `"{occurrence_id}_{role_key}" -> member name`. Before anything is merged
//! into the assignment set, every key must resolve to a currently-known
//! occurrence id and a known role; everything else is discarded and
//! reported, never applied.

use std::collections::{BTreeMap, HashSet};

use crate::schedule::Occurrence;
use crate::types::{MemberId, Role};

/// The outcome of validating a suggestion map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutofillOutcome {
    /// Validated entries, ready to upsert: (occurrence id, role, member).
    pub accepted: Vec<(String, Role, MemberId)>,
    /// Keys that did not resolve to a known occurrence and role, or whose
    /// member value was empty.
    pub discarded: Vec<String>,
}

/// Validates `suggestions` against the known occurrences and roles.
///
/// Occurrence ids themselves contain underscores, so keys are parsed by
/// matching known occurrence-id prefixes rather than splitting on `_`.
/// Entries are returned in key order for deterministic application.
pub fn merge_suggestions(
    occurrences: &[Occurrence],
    roles: &[Role],
    suggestions: &BTreeMap<String, String>,
) -> AutofillOutcome {
    let known_roles: HashSet<String> = roles.iter().map(Role::storage_key).collect();

    let mut outcome = AutofillOutcome::default();
    'keys: for (key, member_name) in suggestions {
        for occurrence in occurrences {
            let Some(role_key) = key
                .strip_prefix(occurrence.id.as_str())
                .and_then(|rest| rest.strip_prefix('_'))
            else {
                continue;
            };
            if !known_roles.contains(role_key) {
                continue;
            }
            let (Ok(role), Ok(member)) = (
                Role::parse_key(role_key),
                MemberId::new(member_name.clone()),
            ) else {
                break; // known key shape but unusable payload
            };
            outcome.accepted.push((occurrence.id.clone(), role, member));
            continue 'keys;
        }
        outcome.discarded.push(key.clone());
    }
    outcome
}
