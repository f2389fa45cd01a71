//! Domain status and verdict definitions
//!
//! A domain starts `Untested` and moves exactly once to one of the terminal
//! statuses, which mirror the three classifier verdicts.

use std::fmt;

/// Classifier output for a single probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// The response carries a WordPress signature
    Positive,

    /// The response was readable and carries no signature
    Negative,

    /// No usable response (failure marker, empty or unreadable body)
    NoReply,
}

impl Verdict {
    /// Terminal domain status recorded for this verdict
    pub fn status(&self) -> DomainStatus {
        match self {
            Self::Positive => DomainStatus::Positive,
            Self::Negative => DomainStatus::Negative,
            Self::NoReply => DomainStatus::NoReply,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::NoReply => "no-reply",
        };
        write!(f, "{}", s)
    }
}

/// Classification status of a domain record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainStatus {
    /// Imported but not yet probed
    Untested,

    /// Classified as running WordPress
    Positive,

    /// Classified as not running WordPress
    Negative,

    /// Probe produced no usable reply
    NoReply,
}

impl DomainStatus {
    /// All statuses, in reporting order
    pub const ALL: [DomainStatus; 4] = [
        Self::Untested,
        Self::Positive,
        Self::Negative,
        Self::NoReply,
    ];

    /// Returns true once the domain has been classified
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Untested)
    }

    /// Returns true if moving from `self` to `next` respects forward-only transitions
    ///
    /// Untested may move to any status; a terminal status may only be rewritten
    /// with the same value.
    pub fn can_transition_to(&self, next: DomainStatus) -> bool {
        !self.is_terminal() || *self == next
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Untested => "untested",
            Self::Positive => "yes",
            Self::Negative => "no",
            Self::NoReply => "no_http_reply",
        }
    }

    /// Parses a status from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "untested" => Some(Self::Untested),
            "yes" => Some(Self::Positive),
            "no" => Some(Self::Negative),
            "no_http_reply" => Some(Self::NoReply),
            _ => None,
        }
    }
}

impl fmt::Display for DomainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Untested => "untested",
            Self::Positive => "classified-positive",
            Self::Negative => "classified-negative",
            Self::NoReply => "no-reply",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_string_roundtrip() {
        for status in DomainStatus::ALL {
            assert_eq!(
                DomainStatus::from_db_string(status.to_db_string()),
                Some(status)
            );
        }
        assert_eq!(DomainStatus::from_db_string("maybe"), None);
    }

    #[test]
    fn test_verdict_maps_to_terminal_status() {
        assert_eq!(Verdict::Positive.status(), DomainStatus::Positive);
        assert_eq!(Verdict::Negative.status(), DomainStatus::Negative);
        assert_eq!(Verdict::NoReply.status(), DomainStatus::NoReply);
        assert!(Verdict::NoReply.status().is_terminal());
        assert!(!DomainStatus::Untested.is_terminal());
    }

    #[test]
    fn test_transitions_only_move_forward() {
        assert!(DomainStatus::Untested.can_transition_to(DomainStatus::Positive));
        assert!(DomainStatus::Untested.can_transition_to(DomainStatus::NoReply));
        assert!(DomainStatus::Positive.can_transition_to(DomainStatus::Positive));
        assert!(!DomainStatus::Positive.can_transition_to(DomainStatus::Negative));
        assert!(!DomainStatus::NoReply.can_transition_to(DomainStatus::Untested));
    }
}
