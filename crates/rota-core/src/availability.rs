//! Availability matching.
//!
//! Members declare availability as compact date tokens, one set per month:
//!
//! - `2024-03-10` — free the whole day
//! - `2024-03-10_morning` — free before 13:00 only
//! - `2024-03-10_night` — free from 13:00 only
//! - `month_blocked` — unavailable for the entire month, overriding any
//!   individual day tokens
//!
//! Tokens that don't parse are ignored. A member with no tokens at all is
//! treated as available: the system is opt-out on scarcity of information,
//! not opt-in. That default is product policy, not an accident — editors may
//! schedule members who never declared anything, and flipping it to
//! "no data means unavailable" would change scheduling behavior materially.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};

/// The whole-month block marker.
pub const MONTH_BLOCKED: &str = "month_blocked";

/// Half-day qualifier on an availability token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayHalf {
    Morning,
    Night,
}

impl DayHalf {
    /// The half of day an event time falls in. The boundary is 13:00:
    /// 12:59 is still morning, 13:00 is night.
    pub fn of(time: NaiveTime) -> Self {
        if time.hour() < 13 {
            Self::Morning
        } else {
            Self::Night
        }
    }

    const fn suffix(self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Night => "night",
        }
    }
}

/// A parsed availability token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvailabilityToken {
    FullDay(NaiveDate),
    HalfDay(NaiveDate, DayHalf),
    MonthBlocked,
}

impl AvailabilityToken {
    /// Parses one token, returning `None` for anything unrecognized.
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        if token == MONTH_BLOCKED {
            return Some(Self::MonthBlocked);
        }
        if let Some((date, suffix)) = token.split_once('_') {
            let date: NaiveDate = date.parse().ok()?;
            let half = match suffix {
                "morning" => DayHalf::Morning,
                "night" => DayHalf::Night,
                _ => return None,
            };
            return Some(Self::HalfDay(date, half));
        }
        token.parse().ok().map(Self::FullDay)
    }

    /// Renders the token back to its storage form.
    pub fn encode(self) -> String {
        match self {
            Self::FullDay(date) => date.format("%Y-%m-%d").to_string(),
            Self::HalfDay(date, half) => {
                format!("{}_{}", date.format("%Y-%m-%d"), half.suffix())
            }
            Self::MonthBlocked => MONTH_BLOCKED.to_string(),
        }
    }
}

/// Whether a member with the given token set is free at `at`.
///
/// Never errors: unparseable tokens are skipped, and an empty set means
/// available (see the module docs for why).
pub fn is_available<S: AsRef<str>>(tokens: &[S], at: NaiveDateTime) -> bool {
    let parsed: Vec<AvailabilityToken> = tokens
        .iter()
        .filter_map(|t| AvailabilityToken::parse(t.as_ref()))
        .collect();

    if parsed.is_empty() {
        return true;
    }
    if parsed.contains(&AvailabilityToken::MonthBlocked) {
        return false;
    }

    let half = DayHalf::of(at.time());
    parsed.iter().any(|token| match token {
        AvailabilityToken::FullDay(date) => *date == at.date(),
        AvailabilityToken::HalfDay(date, token_half) => {
            *date == at.date() && *token_half == half
        }
        AvailabilityToken::MonthBlocked => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> NaiveDateTime {
        s.parse().unwrap()
    }

    #[test]
    fn full_day_token_matches_any_hour() {
        let tokens = ["2024-03-10"];
        assert!(is_available(&tokens, at("2024-03-10T08:00:00")));
        assert!(is_available(&tokens, at("2024-03-10T20:00:00")));
        assert!(!is_available(&tokens, at("2024-03-11T08:00:00")));
    }

    #[test]
    fn half_day_boundary_is_thirteen_hundred() {
        let morning = ["2024-03-10_morning"];
        assert!(is_available(&morning, at("2024-03-10T12:59:00")));
        assert!(!is_available(&morning, at("2024-03-10T13:00:00")));

        let night = ["2024-03-10_night"];
        assert!(!is_available(&night, at("2024-03-10T12:59:00")));
        assert!(is_available(&night, at("2024-03-10T13:00:00")));
    }

    #[test]
    fn month_block_overrides_day_tokens() {
        let tokens = ["2024-03-10", "2024-03-17_morning", MONTH_BLOCKED];
        assert!(!is_available(&tokens, at("2024-03-10T09:00:00")));
        assert!(!is_available(&tokens, at("2024-03-17T09:00:00")));
        assert!(!is_available(&tokens, at("2024-03-24T09:00:00")));
    }

    #[test]
    fn no_data_defaults_to_available() {
        let tokens: [&str; 0] = [];
        assert!(is_available(&tokens, at("2024-03-10T09:00:00")));
    }

    #[test]
    fn declared_but_unmatched_dates_mean_unavailable() {
        let tokens = ["2024-03-10"];
        assert!(!is_available(&tokens, at("2024-03-17T09:00:00")));
    }

    #[test]
    fn garbage_tokens_are_ignored() {
        let tokens = ["not-a-date", "2024-13-99", "2024-03-10_brunch"];
        // All tokens unparseable: same as no data.
        assert!(is_available(&tokens, at("2024-03-10T09:00:00")));

        let mixed = ["garbage", "2024-03-10"];
        assert!(is_available(&mixed, at("2024-03-10T09:00:00")));
        assert!(!is_available(&mixed, at("2024-03-11T09:00:00")));
    }

    #[test]
    fn token_parse_encode_round_trips() {
        for raw in ["2024-03-10", "2024-03-10_morning", "2024-03-10_night", MONTH_BLOCKED] {
            let token = AvailabilityToken::parse(raw).unwrap();
            assert_eq!(token.encode(), raw);
        }
    }
}
