use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{BookingId, RoomId, UserId};
use domain::{AuditAction, AuditEntry, Booking, Payment, Room, RoomStatus};

use crate::Result;

/// A single mutation inside a [`WriteSet`].
#[derive(Debug, Clone)]
pub enum Write {
    InsertRoom(Room),
    UpdateRoom(Room),
    DeleteRoom(RoomId),
    InsertBooking(Booking),
    UpdateBooking(Booking),
    InsertPayment(Payment),
}

/// An ordered batch of mutations applied atomically by [`Store::commit`].
///
/// The transaction coordinator validates everything under the room lock,
/// collects the resulting records here, and commits once. Either every write
/// lands or none does.
#[derive(Debug, Clone, Default)]
pub struct WriteSet {
    ops: Vec<Write>,
}

impl WriteSet {
    /// Creates an empty write set.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_room(mut self, room: Room) -> Self {
        self.ops.push(Write::InsertRoom(room));
        self
    }

    pub fn update_room(mut self, room: Room) -> Self {
        self.ops.push(Write::UpdateRoom(room));
        self
    }

    pub fn delete_room(mut self, id: RoomId) -> Self {
        self.ops.push(Write::DeleteRoom(id));
        self
    }

    pub fn insert_booking(mut self, booking: Booking) -> Self {
        self.ops.push(Write::InsertBooking(booking));
        self
    }

    pub fn update_booking(mut self, booking: Booking) -> Self {
        self.ops.push(Write::UpdateBooking(booking));
        self
    }

    pub fn insert_payment(mut self, payment: Payment) -> Self {
        self.ops.push(Write::InsertPayment(payment));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[Write] {
        &self.ops
    }

    /// Room identifiers touched by this write set, for row locking.
    pub fn room_ids(&self) -> Vec<RoomId> {
        let mut ids = Vec::new();
        for op in &self.ops {
            let id = match op {
                Write::UpdateRoom(room) => room.id,
                Write::DeleteRoom(id) => *id,
                Write::InsertBooking(b) | Write::UpdateBooking(b) => b.room_id,
                Write::InsertRoom(_) | Write::InsertPayment(_) => continue,
            };
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }
}

/// Core trait for room/booking/payment persistence.
///
/// Reads are lock-free; all mutation goes through [`Store::commit`], which
/// applies the whole batch or nothing. Implementations must be thread-safe.
#[async_trait]
pub trait Store: Send + Sync {
    /// Fetches a room by identifier.
    async fn room(&self, id: RoomId) -> Result<Option<Room>>;

    /// Lists all rooms, ordered by room number.
    async fn rooms(&self) -> Result<Vec<Room>>;

    /// Lists rooms currently in the given status.
    async fn rooms_by_status(&self, status: RoomStatus) -> Result<Vec<Room>>;

    /// Fetches a booking by identifier.
    async fn booking(&self, id: BookingId) -> Result<Option<Booking>>;

    /// Lists a user's bookings, newest first.
    async fn bookings_for_user(&self, user_id: UserId) -> Result<Vec<Booking>>;

    /// Lists the bookings on a room that currently hold a claim on dates
    /// (status confirmed or checked-in).
    async fn active_bookings_for_room(&self, room_id: RoomId) -> Result<Vec<Booking>>;

    /// Applies every write in the set atomically.
    ///
    /// Fails with `DuplicateRoomNumber` on a room-number collision and
    /// `RoomNotFound`/`BookingNotFound` when an update or delete targets a
    /// missing row; in every failure case nothing is applied.
    async fn commit(&self, writes: WriteSet) -> Result<()>;

    /// Cancels every booking still `Confirmed` and created before `cutoff`,
    /// in one atomic batch. Returns the cancelled bookings.
    async fn expire_confirmed_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>>;
}

/// Pagination window for audit queries.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Page {
    /// First page with the given size.
    pub fn first(limit: usize) -> Self {
        Self { offset: 0, limit }
    }

    /// The page following this one.
    pub fn next(self) -> Self {
        Self {
            offset: self.offset + self.limit,
            limit: self.limit,
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// Append-only storage for the audit trail.
///
/// Immutability is structural: this trait is the entire access surface for
/// audit entries, and it defines inserts and reads only. No update or delete
/// exists to misuse.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Appends one entry. Entries are never modified afterwards.
    async fn append(&self, entry: AuditEntry) -> Result<()>;

    /// Entries recorded by one actor, oldest first.
    async fn entries_by_actor(&self, actor_id: UserId, page: Page) -> Result<Vec<AuditEntry>>;

    /// Entries with one action tag, oldest first.
    async fn entries_by_action(&self, action: AuditAction, page: Page) -> Result<Vec<AuditEntry>>;

    /// Entries recorded in `[from, to)`, oldest first.
    async fn entries_in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        page: Page,
    ) -> Result<Vec<AuditEntry>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{Money, RoomCategory};

    #[test]
    fn write_set_collects_room_ids_for_locking() {
        let room = Room::new("101", RoomCategory::Double, Money::from_dollars(100)).unwrap();
        let other = RoomId::new();
        let writes = WriteSet::new()
            .update_room(room.clone())
            .delete_room(other);

        let ids = writes.room_ids();
        assert!(ids.contains(&room.id));
        assert!(ids.contains(&other));
    }

    #[test]
    fn inserting_a_new_room_needs_no_lock() {
        let room = Room::new("101", RoomCategory::Double, Money::from_dollars(100)).unwrap();
        let writes = WriteSet::new().insert_room(room);
        assert!(writes.room_ids().is_empty());
        assert!(!writes.is_empty());
    }

    #[test]
    fn page_advances_by_its_limit() {
        let page = Page::first(20);
        assert_eq!(page.offset, 0);
        let next = page.next();
        assert_eq!(next.offset, 20);
        assert_eq!(next.limit, 20);
    }
}
