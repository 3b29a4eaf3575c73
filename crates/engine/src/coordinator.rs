//! Transaction coordinator: the single write path for rooms and bookings.

use std::sync::Arc;

use chrono::TimeDelta;
use common::{BookingId, RoomId, UserId};
use domain::{
    Actor, AuditAction, AuditDetails, AuditEntry, Booking, BookingStatus, ChangeAction,
    HotelError, Money, Payment, PaymentMethod, Quote, Result, Role, Room, RoomCategory,
    RoomStatus, StateChange, StaySpan, TransitionKind, find_conflicts,
};
use serde_json::{Value, json};
use store::{AuditLog, Store, WriteSet};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::broadcast::Broadcaster;
use crate::clock::{Clock, SystemClock};
use crate::locks::RoomLocks;

/// How long a booking may sit `Confirmed` before the sweeper cancels it.
const STALE_AFTER_HOURS: i64 = 24;

/// Result of a checkout: the closed booking and any late surcharge applied.
#[derive(Debug, Clone)]
pub struct CheckoutSummary {
    pub booking: Booking,
    pub room: Room,
    pub late_penalty: Money,
}

/// Result of one sweeper run.
#[derive(Debug, Clone, Default)]
pub struct SweepOutcome {
    pub count: usize,
    pub affected_ids: Vec<BookingId>,
}

/// Serializes and commits every state-changing operation.
///
/// The protocol for each operation is always the same: acquire the room's
/// entry in the lock table, re-read state under the lock, re-validate, build
/// the mutated records, commit them atomically through the store, and only
/// then append the audit entry and publish the broadcast. A failure at any
/// point before commit leaves nothing behind: no row, no audit entry, no
/// broadcast.
///
/// Read-only queries go straight to the store and never touch the locks.
pub struct Coordinator<S, A> {
    store: S,
    audit: A,
    broadcaster: Broadcaster,
    locks: RoomLocks,
    clock: Arc<dyn Clock>,
}

impl<S, A> Coordinator<S, A>
where
    S: Store,
    A: AuditLog,
{
    /// Creates a coordinator over the given store, audit log, and broadcast
    /// dispatcher, using the system wall clock.
    pub fn new(store: S, audit: A, broadcaster: Broadcaster) -> Self {
        Self::with_clock(store, audit, broadcaster, Arc::new(SystemClock))
    }

    /// Creates a coordinator with an explicit time source.
    pub fn with_clock(
        store: S,
        audit: A,
        broadcaster: Broadcaster,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            audit,
            broadcaster,
            locks: RoomLocks::new(),
            clock,
        }
    }

    // ---- queries (lock-free) ----

    /// Fetches one room.
    pub async fn room(&self, room_id: RoomId) -> Result<Room> {
        self.store
            .room(room_id)
            .await?
            .ok_or_else(|| HotelError::not_found("room", room_id))
    }

    /// Lists all rooms, ordered by number.
    pub async fn rooms(&self) -> Result<Vec<Room>> {
        Ok(self.store.rooms().await?)
    }

    /// Lists rooms currently in one status.
    pub async fn rooms_by_status(&self, status: RoomStatus) -> Result<Vec<Room>> {
        Ok(self.store.rooms_by_status(status).await?)
    }

    /// Lists rooms open for the given dates: not under maintenance and free
    /// of conflicting active bookings.
    pub async fn available_rooms(&self, span: StaySpan) -> Result<Vec<Room>> {
        let mut open = Vec::new();
        for room in self.store.rooms().await? {
            if room.status == RoomStatus::Maintenance {
                continue;
            }
            let existing = self.store.active_bookings_for_room(room.id).await?;
            if find_conflicts(&existing, &span, None).is_empty() {
                open.push(room);
            }
        }
        Ok(open)
    }

    /// Lists a user's bookings. Guests may only list their own.
    pub async fn bookings_for_user(&self, actor: &Actor, user_id: UserId) -> Result<Vec<Booking>> {
        if !actor.is_operator() && actor.id != user_id {
            return Err(HotelError::Authorization {
                role: actor.role,
                action: "list another user's bookings",
            });
        }
        Ok(self.store.bookings_for_user(user_id).await?)
    }

    /// Prices a stay in the given room without reserving anything.
    pub async fn quote(&self, room_id: RoomId, span: StaySpan) -> Result<Quote> {
        let room = self.room(room_id).await?;
        Ok(Quote::for_stay(room.nightly_rate, &span))
    }

    /// Returns the active bookings that would block a reservation for
    /// `span`, optionally ignoring one booking.
    pub async fn conflicts(
        &self,
        room_id: RoomId,
        span: StaySpan,
        exclude: Option<BookingId>,
    ) -> Result<Vec<Booking>> {
        let existing = self.store.active_bookings_for_room(room_id).await?;
        Ok(find_conflicts(&existing, &span, exclude)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Opens a subscription: the receiver is created *before* the room
    /// snapshot is taken, so a change committed in between is delivered as
    /// an incremental event rather than lost.
    pub async fn subscribe(&self) -> Result<(StateChange, broadcast::Receiver<StateChange>)> {
        let receiver = self.broadcaster.subscribe_raw();
        let rooms = self.store.rooms().await?;
        let snapshot = StateChange::InitialState {
            rooms,
            timestamp: self.clock.now(),
        };
        Ok((snapshot, receiver))
    }

    // ---- room management ----

    /// Creates a room. Admin only.
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.id, role = %actor.role))]
    pub async fn create_room(
        &self,
        actor: &Actor,
        number: &str,
        category: RoomCategory,
        nightly_rate: Money,
    ) -> Result<Room> {
        require_admin(actor, "create rooms")?;

        let room = Room::new(number, category, nightly_rate)?;
        self.store
            .commit(WriteSet::new().insert_room(room.clone()))
            .await?;

        self.record_audit(
            actor.id,
            AuditAction::RoomCreated,
            AuditDetails::new(json!({}), entity_json(&room), room.id),
        )
        .await;
        self.broadcaster.publish(StateChange::RoomUpdate {
            action: ChangeAction::Created,
            room: room.clone(),
            timestamp: self.clock.now(),
        });

        tracing::info!(room = %room.number, "room created");
        Ok(room)
    }

    /// Changes a room's nightly rate. Admin only.
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn update_room_pricing(
        &self,
        actor: &Actor,
        room_id: RoomId,
        nightly_rate: Money,
    ) -> Result<Room> {
        require_admin(actor, "update room pricing")?;
        if !nightly_rate.is_positive() {
            return Err(HotelError::validation(format!(
                "nightly rate must be positive, got {nightly_rate}"
            )));
        }

        let _guard = self.locks.acquire(room_id).await;
        let before = self.room(room_id).await?;

        let mut room = before.clone();
        room.nightly_rate = nightly_rate;
        self.store
            .commit(WriteSet::new().update_room(room.clone()))
            .await?;

        self.record_audit(
            actor.id,
            AuditAction::RoomPricingUpdated,
            AuditDetails::new(entity_json(&before), entity_json(&room), room.id),
        )
        .await;
        self.broadcaster.publish(StateChange::RoomUpdate {
            action: ChangeAction::Updated,
            room: room.clone(),
            timestamp: self.clock.now(),
        });

        Ok(room)
    }

    /// Deletes a room. Admin only; refused while any active booking still
    /// references the room. Historical bookings do not block deletion.
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn delete_room(&self, actor: &Actor, room_id: RoomId) -> Result<()> {
        require_admin(actor, "delete rooms")?;

        let _guard = self.locks.acquire(room_id).await;
        let room = self.room(room_id).await?;

        let active = self.store.active_bookings_for_room(room_id).await?;
        if !active.is_empty() {
            return Err(HotelError::BookingConflict {
                room_id,
                conflicting: active.iter().map(|b| b.id).collect(),
            });
        }

        self.store
            .commit(WriteSet::new().delete_room(room_id))
            .await?;

        self.record_audit(
            actor.id,
            AuditAction::RoomDeleted,
            AuditDetails::new(entity_json(&room), json!({}), room.id),
        )
        .await;
        self.broadcaster.publish(StateChange::RoomUpdate {
            action: ChangeAction::Deleted,
            room,
            timestamp: self.clock.now(),
        });

        Ok(())
    }

    /// Manually changes a room's status. Staff or admin.
    ///
    /// The transition must be an edge of the manual transition table; no
    /// role, including admin, can push a room into `Occupied` or pull an
    /// occupied room straight back to `Available`. Setting an available
    /// room to `Available` again is an accepted no-op: it is audited but
    /// writes and broadcasts nothing.
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.id, role = %actor.role))]
    pub async fn set_room_status(
        &self,
        actor: &Actor,
        room_id: RoomId,
        new_status: RoomStatus,
    ) -> Result<Room> {
        require_operator(actor, "change room status")?;

        let _guard = self.locks.acquire(room_id).await;
        let before = self.room(room_id).await?;

        if !before.status.allows_manual_transition(new_status) {
            return Err(HotelError::InvalidTransition {
                from: before.status,
                to: new_status,
            });
        }

        // Releasing a room back to Available requires that nobody is still
        // checked in, whatever the current status claims.
        if new_status == RoomStatus::Available {
            let checked_in = self
                .store
                .active_bookings_for_room(room_id)
                .await?
                .iter()
                .any(|b| b.status == BookingStatus::CheckedIn);
            if checked_in {
                return Err(HotelError::InvalidTransition {
                    from: before.status,
                    to: new_status,
                });
            }
        }

        if new_status == before.status {
            self.audit_status_change(actor.id, &before, before.status, TransitionKind::Manual)
                .await;
            return Ok(before);
        }

        let mut room = before.clone();
        room.status = new_status;
        self.store
            .commit(WriteSet::new().update_room(room.clone()))
            .await?;

        self.audit_status_change(actor.id, &room, before.status, TransitionKind::Manual)
            .await;
        self.broadcaster.publish(StateChange::RoomUpdate {
            action: ChangeAction::StatusChanged,
            room: room.clone(),
            timestamp: self.clock.now(),
        });

        Ok(room)
    }

    // ---- reservations ----

    /// Reserves a room for a user over a date span.
    ///
    /// Guests reserve for themselves; staff and admins may reserve on any
    /// user's behalf. Conflict detection runs under the room lock, so of two
    /// racing reservations for overlapping dates exactly one commits and the
    /// other observes it and fails.
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.id, role = %actor.role))]
    pub async fn reserve(
        &self,
        actor: &Actor,
        user_id: UserId,
        room_id: RoomId,
        span: StaySpan,
    ) -> Result<Booking> {
        let may_reserve = actor.is_operator() || (actor.role == Role::Guest && actor.id == user_id);
        if !may_reserve {
            return Err(HotelError::Authorization {
                role: actor.role,
                action: "create this reservation",
            });
        }

        let _guard = self.locks.acquire(room_id).await;
        let room = self.room(room_id).await?;

        let existing = self.store.active_bookings_for_room(room_id).await?;
        let conflicting = find_conflicts(&existing, &span, None);
        if !conflicting.is_empty() {
            metrics::counter!("reservation_conflicts_total").increment(1);
            return Err(HotelError::BookingConflict {
                room_id,
                conflicting: conflicting.iter().map(|b| b.id).collect(),
            });
        }

        let quote = Quote::for_stay(room.nightly_rate, &span);
        let booking = Booking::confirmed(user_id, room_id, span, quote.total, self.clock.now());
        self.store
            .commit(WriteSet::new().insert_booking(booking.clone()))
            .await?;
        metrics::counter!("reservations_total").increment(1);

        self.record_audit(
            actor.id,
            AuditAction::BookingCreated,
            AuditDetails::new(json!({}), entity_json(&booking), booking.id),
        )
        .await;
        self.broadcaster.publish(StateChange::BookingUpdate {
            action: ChangeAction::Reserved,
            booking: booking.clone(),
            room,
            timestamp: self.clock.now(),
        });

        tracing::info!(booking = %booking.id, nights = quote.nights, "reservation created");
        Ok(booking)
    }

    /// Cancels a confirmed booking. The owner, staff, or an admin may do it.
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn cancel_booking(&self, actor: &Actor, booking_id: BookingId) -> Result<Booking> {
        let found = self.lookup_booking(booking_id).await?;
        if !actor.is_operator() && actor.id != found.user_id {
            return Err(HotelError::Authorization {
                role: actor.role,
                action: "cancel another user's booking",
            });
        }

        let _guard = self.locks.acquire(found.room_id).await;
        let booking = self.lookup_booking(booking_id).await?;
        let room = self.room(booking.room_id).await?;

        if !booking.status.can_cancel() {
            return Err(HotelError::validation(format!(
                "booking {booking_id} is {}, only confirmed bookings can be cancelled",
                booking.status
            )));
        }

        let mut cancelled = booking.clone();
        cancelled.status = BookingStatus::Cancelled;
        self.store
            .commit(WriteSet::new().update_booking(cancelled.clone()))
            .await?;

        self.record_audit(
            actor.id,
            AuditAction::BookingCancelled,
            AuditDetails::new(
                json!({ "status": booking.status }),
                json!({ "status": cancelled.status }),
                booking_id,
            ),
        )
        .await;
        self.broadcaster.publish(StateChange::BookingUpdate {
            action: ChangeAction::Cancelled,
            booking: cancelled.clone(),
            room,
            timestamp: self.clock.now(),
        });

        Ok(cancelled)
    }

    // ---- front desk operations ----

    /// Checks a guest in: booking to `CheckedIn`, room to `Occupied`.
    /// Staff or admin only; check-in day must have arrived.
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.id, role = %actor.role))]
    pub async fn check_in(&self, actor: &Actor, booking_id: BookingId) -> Result<Booking> {
        require_operator(actor, "check guests in")?;

        let found = self.lookup_booking(booking_id).await?;
        let _guard = self.locks.acquire(found.room_id).await;

        // Pre-lock reads are only good for finding the room to lock.
        let booking = self.lookup_booking(booking_id).await?;
        let room = self.room(booking.room_id).await?;

        if !booking.status.can_check_in() {
            return Err(HotelError::validation(format!(
                "booking {booking_id} is {}, expected confirmed",
                booking.status
            )));
        }
        let today = self.clock.now().date_naive();
        if today < booking.span.check_in() {
            return Err(HotelError::validation(format!(
                "cannot check in before {}",
                booking.span.check_in()
            )));
        }
        if !room.status.allows_check_in() {
            return Err(HotelError::InvalidTransition {
                from: room.status,
                to: RoomStatus::Occupied,
            });
        }

        let mut checked_in = booking.clone();
        checked_in.status = BookingStatus::CheckedIn;
        let mut occupied = room.clone();
        occupied.status = RoomStatus::Occupied;

        self.store
            .commit(
                WriteSet::new()
                    .update_booking(checked_in.clone())
                    .update_room(occupied.clone()),
            )
            .await?;

        self.record_audit(
            actor.id,
            AuditAction::BookingCheckedIn,
            AuditDetails::new(
                json!({ "booking_status": booking.status, "room_status": room.status }),
                json!({ "booking_status": checked_in.status, "room_status": occupied.status }),
                booking_id,
            )
            .map(|d| d.with_extra("transition_type", json!(TransitionKind::Automatic))),
        )
        .await;
        self.broadcaster.publish(StateChange::OperationUpdate {
            action: ChangeAction::CheckedIn,
            booking: checked_in.clone(),
            room: occupied,
            late_penalty: Money::zero(),
            timestamp: self.clock.now(),
        });

        tracing::info!(booking = %booking_id, "guest checked in");
        Ok(checked_in)
    }

    /// Checks a guest out: booking to `CheckedOut`, room to `Cleaning`, and
    /// a 50%-of-one-night surcharge added once the scheduled check-out day
    /// has fully passed. Staff or admin only.
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.id, role = %actor.role))]
    pub async fn check_out(&self, actor: &Actor, booking_id: BookingId) -> Result<CheckoutSummary> {
        require_operator(actor, "check guests out")?;

        let found = self.lookup_booking(booking_id).await?;
        let _guard = self.locks.acquire(found.room_id).await;

        let booking = self.lookup_booking(booking_id).await?;
        let room = self.room(booking.room_id).await?;

        if !booking.status.can_check_out() {
            return Err(HotelError::validation(format!(
                "booking {booking_id} is {}, expected checked_in",
                booking.status
            )));
        }

        let now = self.clock.now();
        let late_penalty = booking.late_penalty(room.nightly_rate, now);

        let mut checked_out = booking.clone();
        checked_out.status = BookingStatus::CheckedOut;
        checked_out.total_cost += late_penalty;

        // An emergency maintenance set during the stay survives checkout;
        // only an occupied room goes to cleaning.
        let mut released = room.clone();
        if released.status == RoomStatus::Occupied {
            released.status = RoomStatus::Cleaning;
        }

        self.store
            .commit(
                WriteSet::new()
                    .update_booking(checked_out.clone())
                    .update_room(released.clone()),
            )
            .await?;

        self.record_audit(
            actor.id,
            AuditAction::BookingCheckedOut,
            AuditDetails::new(
                json!({
                    "booking_status": booking.status,
                    "room_status": room.status,
                    "total_cost_cents": booking.total_cost.cents(),
                }),
                json!({
                    "booking_status": checked_out.status,
                    "room_status": released.status,
                    "total_cost_cents": checked_out.total_cost.cents(),
                }),
                booking_id,
            )
            .map(|d| {
                d.with_extra("transition_type", json!(TransitionKind::Automatic))
                    .with_extra("late_penalty_cents", json!(late_penalty.cents()))
            }),
        )
        .await;
        self.broadcaster.publish(StateChange::OperationUpdate {
            action: ChangeAction::CheckedOut,
            booking: checked_out.clone(),
            room: released.clone(),
            late_penalty,
            timestamp: self.clock.now(),
        });

        tracing::info!(booking = %booking_id, late = %late_penalty, "guest checked out");
        Ok(CheckoutSummary {
            booking: checked_out,
            room: released,
            late_penalty,
        })
    }

    /// Records a payment against a booking. Staff or admin only. Room and
    /// booking statuses are untouched.
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn record_payment(
        &self,
        actor: &Actor,
        booking_id: BookingId,
        amount: Money,
        method: PaymentMethod,
    ) -> Result<Payment> {
        require_operator(actor, "record payments")?;

        let found = self.lookup_booking(booking_id).await?;
        let _guard = self.locks.acquire(found.room_id).await;

        let booking = self.lookup_booking(booking_id).await?;
        let room = self.room(booking.room_id).await?;

        let payment = Payment::new(booking_id, amount, method, actor.id, self.clock.now())?;
        self.store
            .commit(WriteSet::new().insert_payment(payment.clone()))
            .await?;

        self.record_audit(
            actor.id,
            AuditAction::PaymentRecorded,
            AuditDetails::new(json!({}), entity_json(&payment), payment.id),
        )
        .await;
        self.broadcaster.publish(StateChange::BookingUpdate {
            action: ChangeAction::PaymentRecorded,
            booking,
            room,
            timestamp: self.clock.now(),
        });

        Ok(payment)
    }

    // ---- expiry sweeping ----

    /// Cancels every booking left `Confirmed` beyond the staleness window,
    /// in one batch, under the reserved system identity. One audit entry is
    /// appended per sweep that found anything, carrying the affected count
    /// and identifiers.
    #[tracing::instrument(skip(self))]
    pub async fn sweep(&self) -> Result<SweepOutcome> {
        let cutoff = self.clock.now() - TimeDelta::hours(STALE_AFTER_HOURS);
        let expired = self.store.expire_confirmed_before(cutoff).await?;
        if expired.is_empty() {
            return Ok(SweepOutcome::default());
        }

        let affected_ids: Vec<BookingId> = expired.iter().map(|b| b.id).collect();
        metrics::counter!("bookings_expired_total").increment(expired.len() as u64);

        let system = Actor::system();
        self.record_audit(
            system.id,
            AuditAction::BookingsExpired,
            AuditDetails::new(
                json!({ "status": BookingStatus::Confirmed }),
                json!({ "status": BookingStatus::Cancelled }),
                Uuid::nil(),
            )
            .map(|d| {
                d.with_extra("affected_count", json!(affected_ids.len()))
                    .with_extra("affected_ids", entity_json(&affected_ids))
            }),
        )
        .await;

        for booking in &expired {
            match self.store.room(booking.room_id).await? {
                Some(room) => self.broadcaster.publish(StateChange::BookingUpdate {
                    action: ChangeAction::Expired,
                    booking: booking.clone(),
                    room,
                    timestamp: self.clock.now(),
                }),
                None => tracing::warn!(
                    booking = %booking.id,
                    room = %booking.room_id,
                    "expired booking references a deleted room, skipping broadcast"
                ),
            }
        }

        tracing::info!(count = expired.len(), "stale reservations expired");
        Ok(SweepOutcome {
            count: expired.len(),
            affected_ids,
        })
    }

    // ---- internals ----

    async fn lookup_booking(&self, booking_id: BookingId) -> Result<Booking> {
        self.store
            .booking(booking_id)
            .await?
            .ok_or_else(|| HotelError::not_found("booking", booking_id))
    }

    async fn audit_status_change(
        &self,
        actor_id: UserId,
        room: &Room,
        previous: RoomStatus,
        kind: TransitionKind,
    ) {
        self.record_audit(
            actor_id,
            AuditAction::RoomStatusChanged,
            AuditDetails::new(
                json!({ "status": previous }),
                json!({ "status": room.status }),
                room.id,
            )
            .map(|d| d.with_extra("transition_type", json!(kind))),
        )
        .await;
    }

    /// Appends the post-commit audit entry. The mutation is already durable
    /// at this point, so failures here are logged rather than unwound.
    async fn record_audit(
        &self,
        actor_id: UserId,
        action: AuditAction,
        details: Result<AuditDetails>,
    ) {
        let details = match details {
            Ok(details) => details,
            Err(e) => {
                tracing::error!(error = %e, %action, "audit details rejected");
                return;
            }
        };
        let entry = AuditEntry::record(actor_id, action, details, self.clock.now());
        if let Err(e) = self.audit.append(entry).await {
            tracing::error!(error = %e, %action, "failed to append audit entry after commit");
        }
    }
}

fn require_admin(actor: &Actor, action: &'static str) -> Result<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(HotelError::Authorization {
            role: actor.role,
            action,
        })
    }
}

fn require_operator(actor: &Actor, action: &'static str) -> Result<()> {
    if actor.is_operator() {
        Ok(())
    } else {
        Err(HotelError::Authorization {
            role: actor.role,
            action,
        })
    }
}

fn entity_json<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to serialize audit payload");
        json!({})
    })
}
