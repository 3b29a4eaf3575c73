use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{BookingId, RoomId, UserId};
use domain::{AuditAction, AuditEntry, Booking, BookingStatus, Payment, Room, RoomStatus};
use tokio::sync::RwLock;

use crate::store::{AuditLog, Page, Store, Write, WriteSet};
use crate::{Result, StoreError};

#[derive(Default)]
struct Tables {
    rooms: HashMap<RoomId, Room>,
    bookings: HashMap<BookingId, Booking>,
    payments: Vec<Payment>,
}

/// In-memory store implementation used by the test suite.
///
/// All tables live behind one `RwLock`, which is what makes a committed
/// write set atomic: the lock is taken once, every write is validated
/// against current state, and only then is the batch applied.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of bookings held, across all statuses.
    pub async fn booking_count(&self) -> usize {
        self.tables.read().await.bookings.len()
    }

    /// Returns the number of payment records held.
    pub async fn payment_count(&self) -> usize {
        self.tables.read().await.payments.len()
    }
}

fn check(tables: &Tables, op: &Write) -> Result<()> {
    match op {
        Write::InsertRoom(room) | Write::UpdateRoom(room) => {
            if let Write::UpdateRoom(_) = op
                && !tables.rooms.contains_key(&room.id)
            {
                return Err(StoreError::RoomNotFound(room.id));
            }
            let duplicate = tables
                .rooms
                .values()
                .any(|existing| existing.number == room.number && existing.id != room.id);
            if duplicate {
                return Err(StoreError::DuplicateRoomNumber(room.number.clone()));
            }
            Ok(())
        }
        Write::DeleteRoom(id) => {
            if !tables.rooms.contains_key(id) {
                return Err(StoreError::RoomNotFound(*id));
            }
            Ok(())
        }
        Write::UpdateBooking(booking) => {
            if !tables.bookings.contains_key(&booking.id) {
                return Err(StoreError::BookingNotFound(booking.id));
            }
            Ok(())
        }
        Write::InsertBooking(_) | Write::InsertPayment(_) => Ok(()),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn room(&self, id: RoomId) -> Result<Option<Room>> {
        Ok(self.tables.read().await.rooms.get(&id).cloned())
    }

    async fn rooms(&self) -> Result<Vec<Room>> {
        let tables = self.tables.read().await;
        let mut rooms: Vec<_> = tables.rooms.values().cloned().collect();
        rooms.sort_by(|a, b| a.number.cmp(&b.number));
        Ok(rooms)
    }

    async fn rooms_by_status(&self, status: RoomStatus) -> Result<Vec<Room>> {
        let tables = self.tables.read().await;
        let mut rooms: Vec<_> = tables
            .rooms
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect();
        rooms.sort_by(|a, b| a.number.cmp(&b.number));
        Ok(rooms)
    }

    async fn booking(&self, id: BookingId) -> Result<Option<Booking>> {
        Ok(self.tables.read().await.bookings.get(&id).cloned())
    }

    async fn bookings_for_user(&self, user_id: UserId) -> Result<Vec<Booking>> {
        let tables = self.tables.read().await;
        let mut bookings: Vec<_> = tables
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn active_bookings_for_room(&self, room_id: RoomId) -> Result<Vec<Booking>> {
        let tables = self.tables.read().await;
        let mut bookings: Vec<_> = tables
            .bookings
            .values()
            .filter(|b| b.room_id == room_id && b.status.is_active())
            .cloned()
            .collect();
        bookings.sort_by_key(|b| b.span.check_in());
        Ok(bookings)
    }

    async fn commit(&self, writes: WriteSet) -> Result<()> {
        let mut tables = self.tables.write().await;

        // Validate the whole batch before touching anything, so a failure
        // leaves no partial state behind.
        for op in writes.ops() {
            check(&tables, op)?;
        }

        for op in writes.ops() {
            match op {
                Write::InsertRoom(room) | Write::UpdateRoom(room) => {
                    tables.rooms.insert(room.id, room.clone());
                }
                Write::DeleteRoom(id) => {
                    tables.rooms.remove(id);
                }
                Write::InsertBooking(booking) | Write::UpdateBooking(booking) => {
                    tables.bookings.insert(booking.id, booking.clone());
                }
                Write::InsertPayment(payment) => {
                    tables.payments.push(payment.clone());
                }
            }
        }

        Ok(())
    }

    async fn expire_confirmed_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>> {
        let mut tables = self.tables.write().await;
        let mut expired = Vec::new();

        for booking in tables.bookings.values_mut() {
            if booking.status == BookingStatus::Confirmed && booking.created_at < cutoff {
                booking.status = BookingStatus::Cancelled;
                expired.push(booking.clone());
            }
        }

        expired.sort_by_key(|b| b.created_at);
        Ok(expired)
    }
}

/// In-memory audit log used by the test suite. Append-only like its trait.
#[derive(Clone, Default)]
pub struct MemoryAuditLog {
    entries: Arc<RwLock<Vec<AuditEntry>>>,
}

impl MemoryAuditLog {
    /// Creates a new empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of entries appended.
    pub async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }
}

fn paginate(mut entries: Vec<AuditEntry>, page: Page) -> Vec<AuditEntry> {
    entries.sort_by_key(|e| e.recorded_at);
    entries.into_iter().skip(page.offset).take(page.limit).collect()
}

#[async_trait]
impl AuditLog for MemoryAuditLog {
    async fn append(&self, entry: AuditEntry) -> Result<()> {
        self.entries.write().await.push(entry);
        Ok(())
    }

    async fn entries_by_actor(&self, actor_id: UserId, page: Page) -> Result<Vec<AuditEntry>> {
        let entries = self.entries.read().await;
        let matching: Vec<_> = entries
            .iter()
            .filter(|e| e.actor_id == actor_id)
            .cloned()
            .collect();
        Ok(paginate(matching, page))
    }

    async fn entries_by_action(&self, action: AuditAction, page: Page) -> Result<Vec<AuditEntry>> {
        let entries = self.entries.read().await;
        let matching: Vec<_> = entries
            .iter()
            .filter(|e| e.action == action)
            .cloned()
            .collect();
        Ok(paginate(matching, page))
    }

    async fn entries_in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        page: Page,
    ) -> Result<Vec<AuditEntry>> {
        let entries = self.entries.read().await;
        let matching: Vec<_> = entries
            .iter()
            .filter(|e| e.recorded_at >= from && e.recorded_at < to)
            .cloned()
            .collect();
        Ok(paginate(matching, page))
    }
}
