//! Shared identifier types used across the reservation engine crates.

pub mod types;

pub use types::{BookingId, EntryId, PaymentId, RoomId, UserId};
