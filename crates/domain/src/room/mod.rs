//! Room entity and its status state machine.

mod status;

pub use status::{RoomStatus, TransitionKind};

use common::RoomId;
use serde::{Deserialize, Serialize};

use crate::error::{HotelError, Result};
use crate::money::Money;

/// Category of a room, which determines its fittings but not its rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomCategory {
    Single,
    Double,
    Suite,
    Deluxe,
}

impl RoomCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomCategory::Single => "single",
            RoomCategory::Double => "double",
            RoomCategory::Suite => "suite",
            RoomCategory::Deluxe => "deluxe",
        }
    }
}

impl std::fmt::Display for RoomCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RoomCategory {
    type Err = HotelError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "single" => Ok(RoomCategory::Single),
            "double" => Ok(RoomCategory::Double),
            "suite" => Ok(RoomCategory::Suite),
            "deluxe" => Ok(RoomCategory::Deluxe),
            other => Err(HotelError::validation(format!(
                "unknown room category: {other}"
            ))),
        }
    }
}

/// A physical room: the unit of allocation.
///
/// The status field changes only through the state machine in
/// [`RoomStatus`]; all writes go through the transaction coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    /// Human-readable room number, unique across the property.
    pub number: String,
    pub category: RoomCategory,
    /// Price for one night; always strictly positive.
    pub nightly_rate: Money,
    pub status: RoomStatus,
}

impl Room {
    /// Creates a new room in the `Available` state.
    ///
    /// Rejects an empty room number or a non-positive rate.
    pub fn new(number: impl Into<String>, category: RoomCategory, nightly_rate: Money) -> Result<Self> {
        let number = number.into();
        if number.trim().is_empty() {
            return Err(HotelError::validation("room number must not be empty"));
        }
        if !nightly_rate.is_positive() {
            return Err(HotelError::validation(format!(
                "nightly rate must be positive, got {nightly_rate}"
            )));
        }

        Ok(Self {
            id: RoomId::new(),
            number,
            category,
            nightly_rate,
            status: RoomStatus::Available,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_room_starts_available() {
        let room = Room::new("101", RoomCategory::Double, Money::from_dollars(100)).unwrap();
        assert_eq!(room.status, RoomStatus::Available);
        assert_eq!(room.number, "101");
    }

    #[test]
    fn rejects_empty_number() {
        let err = Room::new("  ", RoomCategory::Single, Money::from_dollars(80)).unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn rejects_non_positive_rate() {
        assert!(Room::new("102", RoomCategory::Single, Money::zero()).is_err());
        assert!(Room::new("102", RoomCategory::Single, Money::from_cents(-100)).is_err());
    }

    #[test]
    fn category_string_roundtrip() {
        for category in [
            RoomCategory::Single,
            RoomCategory::Double,
            RoomCategory::Suite,
            RoomCategory::Deluxe,
        ] {
            assert_eq!(category.as_str().parse::<RoomCategory>().unwrap(), category);
        }
    }
}
