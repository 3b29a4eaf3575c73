//! Domain layer for the reservation engine.
//!
//! This crate holds the entities and the pure rules that govern them:
//! - `Room` and its status state machine (explicit transition table)
//! - `Booking`, stay date arithmetic, and date-range conflict detection
//! - `Payment` records
//! - the append-only audit trail entry types
//! - broadcast payloads published after committed state changes
//! - the `HotelError` taxonomy shared by every crate above this one

pub mod actor;
pub mod audit;
pub mod booking;
pub mod error;
pub mod events;
pub mod money;
pub mod payment;
pub mod room;

pub use actor::{Actor, Role};
pub use audit::{AuditAction, AuditDetails, AuditEntry};
pub use booking::{Booking, BookingStatus, Quote, StaySpan, find_conflicts};
pub use error::{HotelError, Result};
pub use events::{ChangeAction, StateChange};
pub use money::Money;
pub use payment::{Payment, PaymentMethod};
pub use room::{Room, RoomCategory, RoomStatus, TransitionKind};
