//! Broadcast payloads published to subscribers after committed changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::booking::Booking;
use crate::money::Money;
use crate::room::Room;

/// What happened to the entity carried by a broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Created,
    Updated,
    Deleted,
    StatusChanged,
    Reserved,
    Cancelled,
    CheckedIn,
    CheckedOut,
    PaymentRecorded,
    Expired,
}

/// A committed state change, fanned out to every subscriber.
///
/// A value of this type is only ever constructed after the transaction it
/// describes has committed; every variant carries the server timestamp of
/// that moment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StateChange {
    /// A room was created, repriced, deleted, or changed status.
    RoomUpdate {
        action: ChangeAction,
        room: Room,
        timestamp: DateTime<Utc>,
    },

    /// A booking was created, cancelled, or expired.
    BookingUpdate {
        action: ChangeAction,
        booking: Booking,
        room: Room,
        timestamp: DateTime<Utc>,
    },

    /// A front-desk operation (check-in, check-out, payment) completed.
    OperationUpdate {
        action: ChangeAction,
        booking: Booking,
        room: Room,
        late_penalty: Money,
        timestamp: DateTime<Utc>,
    },

    /// Full current-state snapshot sent to a subscriber on connect, before
    /// any incremental event.
    InitialState {
        rooms: Vec<Room>,
        timestamp: DateTime<Utc>,
    },
}

impl StateChange {
    /// The wire name of the event, as used in the serialized `event` tag.
    pub fn event_name(&self) -> &'static str {
        match self {
            StateChange::RoomUpdate { .. } => "room_update",
            StateChange::BookingUpdate { .. } => "booking_update",
            StateChange::OperationUpdate { .. } => "operation_update",
            StateChange::InitialState { .. } => "initial_state",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::RoomCategory;

    #[test]
    fn serializes_with_event_tag() {
        let room = Room::new("101", RoomCategory::Double, Money::from_dollars(100)).unwrap();
        let change = StateChange::RoomUpdate {
            action: ChangeAction::Created,
            room,
            timestamp: Utc::now(),
        };

        let value = serde_json::to_value(&change).unwrap();
        assert_eq!(value["event"], "room_update");
        assert_eq!(value["action"], "created");
        assert_eq!(change.event_name(), "room_update");
    }

    #[test]
    fn initial_state_carries_rooms_and_timestamp() {
        let rooms = vec![
            Room::new("101", RoomCategory::Single, Money::from_dollars(80)).unwrap(),
            Room::new("102", RoomCategory::Suite, Money::from_dollars(250)).unwrap(),
        ];
        let change = StateChange::InitialState {
            rooms,
            timestamp: Utc::now(),
        };

        let value = serde_json::to_value(&change).unwrap();
        assert_eq!(value["event"], "initial_state");
        assert_eq!(value["rooms"].as_array().unwrap().len(), 2);
        assert!(value["timestamp"].is_string());
    }
}
