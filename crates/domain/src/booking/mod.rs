//! Booking entity, stay dates, and conflict detection.

mod status;
mod stay;

pub use status::BookingStatus;
pub use stay::{Quote, StaySpan};

use chrono::{DateTime, TimeDelta, Utc};
use common::{BookingId, RoomId, UserId};
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// A reservation: a claim on one room for a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub user_id: UserId,
    pub room_id: RoomId,
    #[serde(flatten)]
    pub span: StaySpan,
    /// Quoted cost at reservation time; accrues the late surcharge on
    /// checkout.
    pub total_cost: Money,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Creates a confirmed booking. The caller has already quoted the cost
    /// and verified the span is conflict-free under the room lock.
    pub fn confirmed(
        user_id: UserId,
        room_id: RoomId,
        span: StaySpan,
        total_cost: Money,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: BookingId::new(),
            user_id,
            room_id,
            span,
            total_cost,
            status: BookingStatus::Confirmed,
            created_at,
        }
    }

    /// Returns true if this booking is active and its dates overlap `span`.
    pub fn conflicts_with(&self, span: &StaySpan) -> bool {
        self.status.is_active() && self.span.overlaps(span)
    }

    /// The late-checkout surcharge owed at `now`: half of one night's rate
    /// once `now` is past end-of-day on the scheduled check-out date, zero
    /// before that.
    pub fn late_penalty(&self, nightly_rate: Money, now: DateTime<Utc>) -> Money {
        if now.date_naive() > self.span.check_out() {
            nightly_rate.percent(50)
        } else {
            Money::zero()
        }
    }

    /// Returns true if the booking has sat `Confirmed` for longer than
    /// `max_age` and should be expired by the sweeper.
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: TimeDelta) -> bool {
        self.status == BookingStatus::Confirmed && now - self.created_at > max_age
    }
}

/// Returns the bookings that block a new reservation for `span`.
///
/// Filters to active bookings (confirmed or checked-in) whose interval
/// overlaps, optionally excluding one booking (used when rescheduling).
pub fn find_conflicts<'a>(
    bookings: &'a [Booking],
    span: &StaySpan,
    exclude: Option<BookingId>,
) -> Vec<&'a Booking> {
    bookings
        .iter()
        .filter(|b| Some(b.id) != exclude && b.conflicts_with(span))
        .collect()
}
