use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares a UUID-backed identifier newtype.
///
/// Each identifier wraps a UUID to provide type safety and prevent mixing
/// up, say, room identifiers with booking identifiers.
macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_id! {
    /// Unique identifier for a room.
    RoomId
}

uuid_id! {
    /// Unique identifier for a booking.
    BookingId
}

uuid_id! {
    /// Unique identifier for a user account.
    ///
    /// Also used as the actor identifier on audit entries; automated
    /// actions are attributed to the reserved [`UserId::system`] identity.
    UserId
}

uuid_id! {
    /// Unique identifier for a payment record.
    PaymentId
}

uuid_id! {
    /// Unique identifier for an audit trail entry.
    EntryId
}

impl UserId {
    /// The reserved identity under which automated actions (such as the
    /// expiry sweeper) are recorded. Never assigned to a real user.
    pub fn system() -> Self {
        Self(Uuid::nil())
    }

    /// Returns true if this is the reserved system identity.
    pub fn is_system(&self) -> bool {
        self.0.is_nil()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ids_are_unique() {
        assert_ne!(RoomId::new(), RoomId::new());
        assert_ne!(BookingId::new(), BookingId::new());
        assert_ne!(UserId::new(), UserId::new());
    }

    #[test]
    fn from_uuid_preserves_value() {
        let uuid = Uuid::new_v4();
        let id = BookingId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), uuid);
    }

    #[test]
    fn serialization_roundtrip() {
        let id = RoomId::new();
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: RoomId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }

    #[test]
    fn system_identity_is_reserved() {
        let system = UserId::system();
        assert!(system.is_system());
        assert!(!UserId::new().is_system());
        assert_eq!(system, UserId::system());
    }
}
