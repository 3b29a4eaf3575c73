//! Error taxonomy for the reservation engine.

use common::{BookingId, RoomId};
use thiserror::Error;
use uuid::Uuid;

use crate::actor::Role;
use crate::room::RoomStatus;

/// Errors surfaced by any engine operation.
///
/// Every variant maps to a stable machine-readable kind via
/// [`HotelError::kind`]; the display string is the human message. Internal
/// failures (storage, serialization) are generalized to [`HotelError::Internal`]
/// before they reach a caller so no backend detail leaks.
#[derive(Debug, Error)]
pub enum HotelError {
    /// Malformed input: bad date range, empty room number, non-positive
    /// amount, unknown enum value.
    #[error("{0}")]
    Validation(String),

    /// The actor's role does not permit the requested operation.
    #[error("role {role} is not permitted to {action}")]
    Authorization { role: Role, action: &'static str },

    /// Active reservations stand in the way of the requested change:
    /// overlapping dates on a reserve, or remaining claims on a delete.
    #[error("room {room_id} has conflicting active reservations")]
    BookingConflict {
        room_id: RoomId,
        conflicting: Vec<BookingId>,
    },

    /// A room with this number already exists.
    #[error("room number {0} is already in use")]
    DuplicateRoomNumber(String),

    /// The referenced room or booking does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    /// The requested room status edge is not in the transition table.
    #[error("room status cannot change from {from} to {to}")]
    InvalidTransition { from: RoomStatus, to: RoomStatus },

    /// An internal failure. The cause is logged server-side; callers only
    /// ever see this opaque kind.
    #[error("internal error")]
    Internal,
}

impl HotelError {
    /// Stable machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            HotelError::Validation(_) => "validation",
            HotelError::Authorization { .. } => "authorization",
            HotelError::BookingConflict { .. } | HotelError::DuplicateRoomNumber(_) => "conflict",
            HotelError::NotFound { .. } => "not_found",
            HotelError::InvalidTransition { .. } => "invalid_transition",
            HotelError::Internal => "internal",
        }
    }

    /// Shorthand for a validation error with a formatted message.
    pub fn validation(message: impl Into<String>) -> Self {
        HotelError::Validation(message.into())
    }

    /// Shorthand for a not-found error on a given entity.
    pub fn not_found(entity: &'static str, id: impl Into<Uuid>) -> Self {
        HotelError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

/// Result type for domain and engine operations.
pub type Result<T> = std::result::Result<T, HotelError>;
