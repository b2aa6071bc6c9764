//! Trap statuses and the click transition rule.

use serde::{Deserialize, Serialize};

/// Current state of a trap.
///
/// The variants cover both status schemes; a running dashboard only ever
/// stores the statuses of its configured [`TransitionScheme`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrapStatus {
    /// Binary scheme: trap idle.
    Inactive,
    /// Binary scheme: trap armed / flagged.
    Active,
    /// Cyclic scheme: no marking.
    Default,
    /// Cyclic scheme: ready.
    Green,
    /// Cyclic scheme: warning.
    Yellow,
    /// Cyclic scheme: alert.
    Red,
}

impl TrapStatus {
    /// Returns the lowercase wire name of the status.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Active => "active",
            Self::Default => "default",
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Red => "red",
        }
    }
}

impl std::fmt::Display for TrapStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const BINARY_SEQUENCE: [TrapStatus; 2] = [TrapStatus::Inactive, TrapStatus::Active];
const CYCLIC4_SEQUENCE: [TrapStatus; 4] = [
    TrapStatus::Default,
    TrapStatus::Green,
    TrapStatus::Yellow,
    TrapStatus::Red,
];

/// Which status set the dashboard cycles through on click.
///
/// The two schemes are mutually exclusive: pick one per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransitionScheme {
    /// `inactive <-> active`
    #[default]
    Binary,
    /// `default -> green -> yellow -> red -> default`
    Cyclic4,
}

impl TransitionScheme {
    /// Ordered statuses of this scheme; index 0 is the initial status.
    pub const fn sequence(self) -> &'static [TrapStatus] {
        match self {
            Self::Binary => &BINARY_SEQUENCE,
            Self::Cyclic4 => &CYCLIC4_SEQUENCE,
        }
    }

    /// Status every trap starts in.
    pub const fn initial(self) -> TrapStatus {
        match self {
            Self::Binary => TrapStatus::Inactive,
            Self::Cyclic4 => TrapStatus::Default,
        }
    }

    /// Status that signals a confirmed detection.
    pub const fn alert(self) -> TrapStatus {
        match self {
            Self::Binary => TrapStatus::Active,
            Self::Cyclic4 => TrapStatus::Red,
        }
    }

    /// Whether `status` belongs to this scheme.
    pub fn contains(self, status: TrapStatus) -> bool {
        self.sequence().contains(&status)
    }

    /// Computes the status that follows `current` on a click.
    ///
    /// Every status has a successor. A status from the other scheme maps to
    /// this scheme's initial status.
    pub fn next(self, current: TrapStatus) -> TrapStatus {
        let sequence = self.sequence();
        sequence
            .iter()
            .position(|s| *s == current)
            .map_or(self.initial(), |idx| sequence[(idx + 1) % sequence.len()])
    }

    /// Returns the configuration name of the scheme.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Cyclic4 => "cyclic4",
        }
    }
}

impl std::str::FromStr for TransitionScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "binary" => Ok(Self::Binary),
            "cyclic4" | "cyclic" => Ok(Self::Cyclic4),
            other => Err(format!(
                "unknown transition scheme '{other}' (expected 'binary' or 'cyclic4')"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_toggle() {
        let scheme = TransitionScheme::Binary;
        assert_eq!(scheme.next(TrapStatus::Inactive), TrapStatus::Active);
        assert_eq!(scheme.next(TrapStatus::Active), TrapStatus::Inactive);
    }

    #[test]
    fn test_cyclic4_order() {
        let scheme = TransitionScheme::Cyclic4;
        assert_eq!(scheme.next(TrapStatus::Default), TrapStatus::Green);
        assert_eq!(scheme.next(TrapStatus::Green), TrapStatus::Yellow);
        assert_eq!(scheme.next(TrapStatus::Yellow), TrapStatus::Red);
        assert_eq!(scheme.next(TrapStatus::Red), TrapStatus::Default);
    }

    #[test]
    fn test_cycle_closure() {
        for scheme in [TransitionScheme::Binary, TransitionScheme::Cyclic4] {
            let period = scheme.sequence().len();
            for &start in scheme.sequence() {
                let mut status = start;
                for _ in 0..period {
                    status = scheme.next(status);
                }
                assert_eq!(status, start, "{scheme:?} does not close on {start}");
            }
        }
    }

    #[test]
    fn test_foreign_status_maps_to_initial() {
        assert_eq!(
            TransitionScheme::Binary.next(TrapStatus::Yellow),
            TrapStatus::Inactive
        );
        assert_eq!(
            TransitionScheme::Cyclic4.next(TrapStatus::Active),
            TrapStatus::Default
        );
    }

    #[test]
    fn test_scheme_from_str() {
        assert_eq!(
            "binary".parse::<TransitionScheme>(),
            Ok(TransitionScheme::Binary)
        );
        assert_eq!(
            "Cyclic4".parse::<TransitionScheme>(),
            Ok(TransitionScheme::Cyclic4)
        );
        assert!("traffic-light".parse::<TransitionScheme>().is_err());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&TrapStatus::Yellow).unwrap();
        assert_eq!(json, "\"yellow\"");
    }
}
