use common::{BookingId, RoomId};
use domain::HotelError;
use thiserror::Error;

/// Errors that can occur in the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced room does not exist.
    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    /// The referenced booking does not exist.
    #[error("booking {0} not found")]
    BookingNotFound(BookingId),

    /// A room with this number already exists.
    #[error("room number {0} is already in use")]
    DuplicateRoomNumber(String),

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row could not be decoded back into a domain value.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    /// A serialization/deserialization error occurred.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Surfaces store failures through the engine taxonomy.
///
/// Lookup misses keep their precise kind; backend failures are logged here
/// and generalized to the opaque internal kind so no detail reaches callers.
impl From<StoreError> for HotelError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RoomNotFound(id) => HotelError::not_found("room", id),
            StoreError::BookingNotFound(id) => HotelError::not_found("booking", id),
            StoreError::DuplicateRoomNumber(number) => HotelError::DuplicateRoomNumber(number),
            StoreError::Database(e) => {
                tracing::error!(error = %e, "database failure");
                HotelError::Internal
            }
            StoreError::Corrupt(detail) => {
                tracing::error!(detail, "corrupt row in store");
                HotelError::Internal
            }
            StoreError::Serialization(e) => {
                tracing::error!(error = %e, "serialization failure");
                HotelError::Internal
            }
        }
    }
}
