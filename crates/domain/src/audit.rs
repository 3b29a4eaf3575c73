//! Audit trail entry types.
//!
//! One entry is appended per successful state-changing operation, after that
//! operation's commit. The entry type itself carries no mutation API, and the
//! storage trait over it exposes inserts and reads only.

use chrono::{DateTime, Utc};
use common::{EntryId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{HotelError, Result};

/// Tag identifying what kind of state change an entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    RoomCreated,
    RoomPricingUpdated,
    RoomDeleted,
    RoomStatusChanged,
    BookingCreated,
    BookingCancelled,
    BookingCheckedIn,
    BookingCheckedOut,
    PaymentRecorded,
    /// One entry per sweep run, not per expired booking.
    BookingsExpired,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::RoomCreated => "room_created",
            AuditAction::RoomPricingUpdated => "room_pricing_updated",
            AuditAction::RoomDeleted => "room_deleted",
            AuditAction::RoomStatusChanged => "room_status_changed",
            AuditAction::BookingCreated => "booking_created",
            AuditAction::BookingCancelled => "booking_cancelled",
            AuditAction::BookingCheckedIn => "booking_checked_in",
            AuditAction::BookingCheckedOut => "booking_checked_out",
            AuditAction::PaymentRecorded => "payment_recorded",
            AuditAction::BookingsExpired => "bookings_expired",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AuditAction {
    type Err = HotelError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "room_created" => Ok(AuditAction::RoomCreated),
            "room_pricing_updated" => Ok(AuditAction::RoomPricingUpdated),
            "room_deleted" => Ok(AuditAction::RoomDeleted),
            "room_status_changed" => Ok(AuditAction::RoomStatusChanged),
            "booking_created" => Ok(AuditAction::BookingCreated),
            "booking_cancelled" => Ok(AuditAction::BookingCancelled),
            "booking_checked_in" => Ok(AuditAction::BookingCheckedIn),
            "booking_checked_out" => Ok(AuditAction::BookingCheckedOut),
            "payment_recorded" => Ok(AuditAction::PaymentRecorded),
            "bookings_expired" => Ok(AuditAction::BookingsExpired),
            other => Err(HotelError::validation(format!(
                "unknown audit action: {other}"
            ))),
        }
    }
}

/// Structured payload of an audit entry: state before, state after, which
/// entity was touched, plus action-specific extras (e.g. `transition_type`
/// on status changes, `affected_ids` on sweeps).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditDetails {
    pub previous_value: Value,
    pub new_value: Value,
    pub affected_entity_id: Uuid,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl AuditDetails {
    /// Builds details, rejecting null before/after values. Operations that
    /// create an entity pass an empty object as the previous value.
    pub fn new(
        previous_value: Value,
        new_value: Value,
        affected_entity_id: impl Into<Uuid>,
    ) -> Result<Self> {
        if previous_value.is_null() || new_value.is_null() {
            return Err(HotelError::validation(
                "audit details require non-null previous and new values",
            ));
        }
        Ok(Self {
            previous_value,
            new_value,
            affected_entity_id: affected_entity_id.into(),
            extra: serde_json::Map::new(),
        })
    }

    /// Attaches an action-specific extra field.
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// One immutable record in the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: EntryId,
    /// A real user, or [`UserId::system`] for automated actions.
    pub actor_id: UserId,
    pub action: AuditAction,
    pub details: AuditDetails,
    /// Server-assigned; callers never supply this.
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn record(
        actor_id: UserId,
        action: AuditAction,
        details: AuditDetails,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EntryId::new(),
            actor_id,
            action,
            details,
            recorded_at,
        }
    }
}
