//! Booking lifecycle states.

use serde::{Deserialize, Serialize};

use crate::error::HotelError;

/// The state of a booking in its lifecycle.
///
/// ```text
/// Confirmed ──► CheckedIn ──► CheckedOut
///     │
///     └──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Reserved, awaiting check-in.
    #[default]
    Confirmed,

    /// The guest is in the room.
    CheckedIn,

    /// The stay is over (terminal state).
    CheckedOut,

    /// Cancelled by the owner, staff, or the expiry sweeper (terminal state).
    Cancelled,
}

impl BookingStatus {
    /// Returns true if this booking holds a claim on its room's dates.
    ///
    /// Only active bookings participate in conflict detection.
    pub fn is_active(&self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::CheckedIn)
    }

    /// Returns true if the guest can check in from this state.
    pub fn can_check_in(&self) -> bool {
        matches!(self, BookingStatus::Confirmed)
    }

    /// Returns true if the guest can check out from this state.
    pub fn can_check_out(&self) -> bool {
        matches!(self, BookingStatus::CheckedIn)
    }

    /// Returns true if the booking can still be cancelled.
    pub fn can_cancel(&self) -> bool {
        matches!(self, BookingStatus::Confirmed)
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::CheckedOut | BookingStatus::Cancelled)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::CheckedIn => "checked_in",
            BookingStatus::CheckedOut => "checked_out",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = HotelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(BookingStatus::Confirmed),
            "checked_in" => Ok(BookingStatus::CheckedIn),
            "checked_out" => Ok(BookingStatus::CheckedOut),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(HotelError::validation(format!(
                "unknown booking status: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_confirmed_and_checked_in_are_active() {
        assert!(BookingStatus::Confirmed.is_active());
        assert!(BookingStatus::CheckedIn.is_active());
        assert!(!BookingStatus::CheckedOut.is_active());
        assert!(!BookingStatus::Cancelled.is_active());
    }

    #[test]
    fn lifecycle_edges() {
        assert!(BookingStatus::Confirmed.can_check_in());
        assert!(!BookingStatus::CheckedIn.can_check_in());

        assert!(BookingStatus::CheckedIn.can_check_out());
        assert!(!BookingStatus::Confirmed.can_check_out());

        assert!(BookingStatus::Confirmed.can_cancel());
        assert!(!BookingStatus::CheckedIn.can_cancel());
        assert!(!BookingStatus::CheckedOut.can_cancel());
    }

    #[test]
    fn terminal_states() {
        assert!(BookingStatus::CheckedOut.is_terminal());
        assert!(BookingStatus::Cancelled.is_terminal());
        assert!(!BookingStatus::Confirmed.is_terminal());
        assert!(!BookingStatus::CheckedIn.is_terminal());
    }

    #[test]
    fn string_roundtrip() {
        for status in [
            BookingStatus::Confirmed,
            BookingStatus::CheckedIn,
            BookingStatus::CheckedOut,
            BookingStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<BookingStatus>().unwrap(), status);
        }
    }
}
