//! Room status state machine.

use serde::{Deserialize, Serialize};

use crate::error::HotelError;

/// The operational status of a room.
///
/// Manual transitions (requested by staff or admins):
/// ```text
/// Available ◄──► Cleaning ◄──► Maintenance
///     │              ▲              ▲
///     └──────────────┴──────────────┤
/// Occupied ──────────────────────────┘   (emergency only)
/// ```
/// `Occupied` is never a manual target: it is entered through check-in and
/// left through check-out, which also drives `Occupied → Cleaning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    /// Ready to receive a guest.
    #[default]
    Available,

    /// A guest is checked in (reachable only through check-in).
    Occupied,

    /// Being cleaned after a checkout or on request.
    Cleaning,

    /// Taken out of service.
    Maintenance,
}

/// Whether a status change was requested by a person or driven by
/// check-in/check-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Manual,
    Automatic,
}

impl RoomStatus {
    /// The transition table for manual status changes.
    ///
    /// This is the single source of truth consulted by
    /// [`RoomStatus::allows_manual_transition`]; no call site re-derives the
    /// rules with its own conditionals. The `Available → Available` self-edge
    /// is the idempotent no-op.
    pub fn manual_targets(self) -> &'static [RoomStatus] {
        match self {
            RoomStatus::Available => &[
                RoomStatus::Cleaning,
                RoomStatus::Maintenance,
                RoomStatus::Available,
            ],
            RoomStatus::Cleaning => &[RoomStatus::Available, RoomStatus::Maintenance],
            RoomStatus::Maintenance => &[RoomStatus::Available, RoomStatus::Cleaning],
            RoomStatus::Occupied => &[RoomStatus::Maintenance],
        }
    }

    /// Returns true if a manual change from `self` to `to` is permitted.
    pub fn allows_manual_transition(self, to: RoomStatus) -> bool {
        self.manual_targets().contains(&to)
    }

    /// Returns true if a guest can be checked into a room in this status.
    ///
    /// Check-in drives the automatic `→ Occupied` edge; rooms under
    /// maintenance or already occupied refuse it.
    pub fn allows_check_in(self) -> bool {
        matches!(self, RoomStatus::Available | RoomStatus::Cleaning)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomStatus::Available => "available",
            RoomStatus::Occupied => "occupied",
            RoomStatus::Cleaning => "cleaning",
            RoomStatus::Maintenance => "maintenance",
        }
    }
}

impl std::fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RoomStatus {
    type Err = HotelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(RoomStatus::Available),
            "occupied" => Ok(RoomStatus::Occupied),
            "cleaning" => Ok(RoomStatus::Cleaning),
            "maintenance" => Ok(RoomStatus::Maintenance),
            other => Err(HotelError::validation(format!(
                "unknown room status: {other}"
            ))),
        }
    }
}

impl TransitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionKind::Manual => "manual",
            TransitionKind::Automatic => "automatic",
        }
    }
}

impl std::fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [RoomStatus; 4] = [
        RoomStatus::Available,
        RoomStatus::Occupied,
        RoomStatus::Cleaning,
        RoomStatus::Maintenance,
    ];

    #[test]
    fn occupied_is_never_a_manual_target() {
        for from in ALL {
            assert!(!from.allows_manual_transition(RoomStatus::Occupied));
        }
    }

    #[test]
    fn occupied_cannot_be_manually_released() {
        assert!(!RoomStatus::Occupied.allows_manual_transition(RoomStatus::Available));
        assert!(!RoomStatus::Occupied.allows_manual_transition(RoomStatus::Cleaning));
        assert!(RoomStatus::Occupied.allows_manual_transition(RoomStatus::Maintenance));
    }

    #[test]
    fn available_self_edge_is_the_only_idempotent_one() {
        assert!(RoomStatus::Available.allows_manual_transition(RoomStatus::Available));
        assert!(!RoomStatus::Cleaning.allows_manual_transition(RoomStatus::Cleaning));
        assert!(!RoomStatus::Maintenance.allows_manual_transition(RoomStatus::Maintenance));
    }

    #[test]
    fn cleaning_and_maintenance_flow_freely() {
        assert!(RoomStatus::Cleaning.allows_manual_transition(RoomStatus::Available));
        assert!(RoomStatus::Cleaning.allows_manual_transition(RoomStatus::Maintenance));
        assert!(RoomStatus::Maintenance.allows_manual_transition(RoomStatus::Available));
        assert!(RoomStatus::Maintenance.allows_manual_transition(RoomStatus::Cleaning));
        assert!(RoomStatus::Available.allows_manual_transition(RoomStatus::Cleaning));
        assert!(RoomStatus::Available.allows_manual_transition(RoomStatus::Maintenance));
    }

    #[test]
    fn check_in_requires_available_or_cleaning() {
        assert!(RoomStatus::Available.allows_check_in());
        assert!(RoomStatus::Cleaning.allows_check_in());
        assert!(!RoomStatus::Occupied.allows_check_in());
        assert!(!RoomStatus::Maintenance.allows_check_in());
    }

    #[test]
    fn string_roundtrip() {
        for status in ALL {
            assert_eq!(status.as_str().parse::<RoomStatus>().unwrap(), status);
        }
        assert!("penthouse".parse::<RoomStatus>().is_err());
    }
}
