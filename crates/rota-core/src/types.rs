//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// A weekly rule is missing its weekday.
    #[error("weekly rule {rule_id} has no weekday")]
    MissingWeekday { rule_id: String },

    /// A single-date rule is missing its date.
    #[error("single rule {rule_id} has no date")]
    MissingDate { rule_id: String },

    /// Unknown recurrence kind string.
    #[error("unknown recurrence kind: {value}")]
    UnknownKind { value: String },

    /// Weekday index outside 0..=6.
    #[error("weekday must be 0-6, got {value}")]
    WeekdayOutOfRange { value: i64 },

    /// Role slot index must start at 1.
    #[error("role slot index must be >= 1, got {value}")]
    SlotOutOfRange { value: u32 },
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated recurrence-rule identifier.
    ///
    /// Rule IDs must be non-empty strings. They are the stable half of every
    /// occurrence id, so they must never be regenerated for an existing rule.
    RuleId, "rule ID"
);

define_string_id!(
    /// A validated ministry (team) identifier.
    MinistryId, "ministry ID"
);

define_string_id!(
    /// A validated organization identifier.
    ///
    /// Ministries belonging to the same organization share a member pool for
    /// conflict detection.
    OrganizationId, "organization ID"
);

define_string_id!(
    /// A validated member identifier.
    ///
    /// In this system the member id doubles as the display name; the conflict
    /// indexer normalizes it (case, diacritics, whitespace) before comparing
    /// across ministries.
    MemberId, "member ID"
);

/// A role a member can fill at an occurrence.
///
/// A role is either a bare name ("Camera") or one numbered slot of an
/// expanded role ("Vocal_3" is slot 3 of base role "Vocal"). The storage key
/// is the full suffixed string, so parallel slots never collide with each
/// other or with the base role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Role {
    base: String,
    slot: Option<u32>,
}

impl Role {
    /// Creates a bare (unslotted) role.
    pub fn new(base: impl Into<String>) -> Result<Self, ValidationError> {
        let base = base.into();
        if base.is_empty() {
            return Err(ValidationError::Empty { field: "role" });
        }
        Ok(Self { base, slot: None })
    }

    /// Creates one numbered slot of an expanded role. Slots start at 1.
    pub fn slotted(base: impl Into<String>, slot: u32) -> Result<Self, ValidationError> {
        let base = base.into();
        if base.is_empty() {
            return Err(ValidationError::Empty { field: "role" });
        }
        if slot == 0 {
            return Err(ValidationError::SlotOutOfRange { value: slot });
        }
        Ok(Self {
            base,
            slot: Some(slot),
        })
    }

    /// Expands a base role into `count` parallel numbered slots.
    pub fn expand(base: &str, count: u32) -> Result<Vec<Self>, ValidationError> {
        (1..=count).map(|i| Self::slotted(base, i)).collect()
    }

    /// Parses a storage key back into a role.
    ///
    /// The suffix after the last `_` is treated as a slot index only when it
    /// parses as a positive integer; otherwise the whole string is the base
    /// ("Front_Desk" stays one bare role).
    pub fn parse_key(key: &str) -> Result<Self, ValidationError> {
        if key.is_empty() {
            return Err(ValidationError::Empty { field: "role" });
        }
        if let Some((base, suffix)) = key.rsplit_once('_') {
            if !base.is_empty() {
                if let Ok(slot @ 1..) = suffix.parse::<u32>() {
                    return Self::slotted(base, slot);
                }
            }
        }
        Self::new(key)
    }

    /// The base role name shared by all slots.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// The slot index, if this is one slot of an expanded role.
    pub const fn slot(&self) -> Option<u32> {
        self.slot
    }

    /// The full storage key (`Base` or `Base_N`).
    pub fn storage_key(&self) -> String {
        match self.slot {
            Some(slot) => format!("{}_{slot}", self.base),
            None => self.base.clone(),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_key(&value)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.storage_key()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.slot {
            Some(slot) => write!(f, "{} {slot}", self.base),
            None => write!(f, "{}", self.base),
        }
    }
}
