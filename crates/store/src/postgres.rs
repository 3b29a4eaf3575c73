use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use common::{BookingId, EntryId, RoomId, UserId};
use domain::{
    AuditAction, AuditDetails, AuditEntry, Booking, Money, Room, RoomStatus, StaySpan,
};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::store::{AuditLog, Page, Store, Write, WriteSet};
use crate::{Result, StoreError};

/// PostgreSQL-backed store implementation.
///
/// Each committed write set runs in one SQL transaction that first locks the
/// touched room rows with `SELECT ... FOR UPDATE`, so the all-or-nothing
/// guarantee holds even against writers outside this process.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_room(row: &PgRow) -> Result<Room> {
        let status: String = row.try_get("status")?;
        let category: String = row.try_get("category")?;
        Ok(Room {
            id: RoomId::from_uuid(row.try_get::<Uuid, _>("id")?),
            number: row.try_get("number")?,
            category: category
                .parse()
                .map_err(|_| StoreError::Corrupt(format!("room category {category}")))?,
            nightly_rate: Money::from_cents(row.try_get("nightly_rate_cents")?),
            status: status
                .parse()
                .map_err(|_| StoreError::Corrupt(format!("room status {status}")))?,
        })
    }

    fn row_to_booking(row: &PgRow) -> Result<Booking> {
        let status: String = row.try_get("status")?;
        let check_in: NaiveDate = row.try_get("check_in")?;
        let check_out: NaiveDate = row.try_get("check_out")?;
        Ok(Booking {
            id: BookingId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            room_id: RoomId::from_uuid(row.try_get::<Uuid, _>("room_id")?),
            span: StaySpan::new(check_in, check_out)
                .map_err(|_| StoreError::Corrupt(format!("stay span {check_in}..{check_out}")))?,
            total_cost: Money::from_cents(row.try_get("total_cost_cents")?),
            status: status
                .parse()
                .map_err(|_| StoreError::Corrupt(format!("booking status {status}")))?,
            created_at: row.try_get("created_at")?,
        })
    }

    async fn apply(tx: &mut Transaction<'_, Postgres>, op: &Write) -> Result<()> {
        match op {
            Write::InsertRoom(room) => {
                sqlx::query(
                    r#"
                    INSERT INTO rooms (id, number, category, nightly_rate_cents, status)
                    VALUES ($1, $2, $3, $4, $5)
                    "#,
                )
                .bind(room.id.as_uuid())
                .bind(&room.number)
                .bind(room.category.as_str())
                .bind(room.nightly_rate.cents())
                .bind(room.status.as_str())
                .execute(&mut **tx)
                .await
                .map_err(|e| {
                    // Unique violation on the room number means a concurrent
                    // creation won; report it as a duplicate, not a DB error.
                    if let sqlx::Error::Database(ref db_err) = e
                        && db_err.constraint() == Some("rooms_number_key")
                    {
                        return StoreError::DuplicateRoomNumber(room.number.clone());
                    }
                    StoreError::Database(e)
                })?;
            }
            Write::UpdateRoom(room) => {
                let result = sqlx::query(
                    r#"
                    UPDATE rooms
                    SET number = $2, category = $3, nightly_rate_cents = $4, status = $5
                    WHERE id = $1
                    "#,
                )
                .bind(room.id.as_uuid())
                .bind(&room.number)
                .bind(room.category.as_str())
                .bind(room.nightly_rate.cents())
                .bind(room.status.as_str())
                .execute(&mut **tx)
                .await?;
                if result.rows_affected() == 0 {
                    return Err(StoreError::RoomNotFound(room.id));
                }
            }
            Write::DeleteRoom(id) => {
                let result = sqlx::query("DELETE FROM rooms WHERE id = $1")
                    .bind(id.as_uuid())
                    .execute(&mut **tx)
                    .await?;
                if result.rows_affected() == 0 {
                    return Err(StoreError::RoomNotFound(*id));
                }
            }
            Write::InsertBooking(booking) => {
                sqlx::query(
                    r#"
                    INSERT INTO bookings
                        (id, user_id, room_id, check_in, check_out, total_cost_cents, status, created_at)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                    "#,
                )
                .bind(booking.id.as_uuid())
                .bind(booking.user_id.as_uuid())
                .bind(booking.room_id.as_uuid())
                .bind(booking.span.check_in())
                .bind(booking.span.check_out())
                .bind(booking.total_cost.cents())
                .bind(booking.status.as_str())
                .bind(booking.created_at)
                .execute(&mut **tx)
                .await?;
            }
            Write::UpdateBooking(booking) => {
                let result = sqlx::query(
                    r#"
                    UPDATE bookings
                    SET check_in = $2, check_out = $3, total_cost_cents = $4, status = $5
                    WHERE id = $1
                    "#,
                )
                .bind(booking.id.as_uuid())
                .bind(booking.span.check_in())
                .bind(booking.span.check_out())
                .bind(booking.total_cost.cents())
                .bind(booking.status.as_str())
                .execute(&mut **tx)
                .await?;
                if result.rows_affected() == 0 {
                    return Err(StoreError::BookingNotFound(booking.id));
                }
            }
            Write::InsertPayment(payment) => {
                sqlx::query(
                    r#"
                    INSERT INTO payments (id, booking_id, amount_cents, method, recorded_by, recorded_at)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    "#,
                )
                .bind(payment.id.as_uuid())
                .bind(payment.booking_id.as_uuid())
                .bind(payment.amount.cents())
                .bind(payment.method.as_str())
                .bind(payment.recorded_by.as_uuid())
                .bind(payment.recorded_at)
                .execute(&mut **tx)
                .await?;
            }
        }
        Ok(())
    }
}

const SELECT_ROOM: &str = "SELECT id, number, category, nightly_rate_cents, status FROM rooms";
const SELECT_BOOKING: &str =
    "SELECT id, user_id, room_id, check_in, check_out, total_cost_cents, status, created_at FROM bookings";

#[async_trait]
impl Store for PgStore {
    async fn room(&self, id: RoomId) -> Result<Option<Room>> {
        let row = sqlx::query(&format!("{SELECT_ROOM} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_room).transpose()
    }

    async fn rooms(&self) -> Result<Vec<Room>> {
        let rows = sqlx::query(&format!("{SELECT_ROOM} ORDER BY number ASC"))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_room).collect()
    }

    async fn rooms_by_status(&self, status: RoomStatus) -> Result<Vec<Room>> {
        let rows = sqlx::query(&format!("{SELECT_ROOM} WHERE status = $1 ORDER BY number ASC"))
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_room).collect()
    }

    async fn booking(&self, id: BookingId) -> Result<Option<Booking>> {
        let row = sqlx::query(&format!("{SELECT_BOOKING} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_booking).transpose()
    }

    async fn bookings_for_user(&self, user_id: UserId) -> Result<Vec<Booking>> {
        let rows = sqlx::query(&format!(
            "{SELECT_BOOKING} WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_booking).collect()
    }

    async fn active_bookings_for_room(&self, room_id: RoomId) -> Result<Vec<Booking>> {
        let rows = sqlx::query(&format!(
            "{SELECT_BOOKING} WHERE room_id = $1 AND status IN ('confirmed', 'checked_in') \
             ORDER BY check_in ASC"
        ))
        .bind(room_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_booking).collect()
    }

    async fn commit(&self, writes: WriteSet) -> Result<()> {
        if writes.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        // Row-level locks on the touched rooms; concurrent commits against
        // the same room queue here until this transaction finishes.
        let room_ids: Vec<Uuid> = writes.room_ids().iter().map(|id| id.as_uuid()).collect();
        if !room_ids.is_empty() {
            sqlx::query("SELECT id FROM rooms WHERE id = ANY($1) FOR UPDATE")
                .bind(&room_ids)
                .fetch_all(&mut *tx)
                .await?;
        }

        for op in writes.ops() {
            Self::apply(&mut tx, op).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn expire_confirmed_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>> {
        let rows = sqlx::query(
            r#"
            UPDATE bookings
            SET status = 'cancelled'
            WHERE status = 'confirmed' AND created_at < $1
            RETURNING id, user_id, room_id, check_in, check_out, total_cost_cents, status, created_at
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        let mut expired: Vec<Booking> = rows
            .iter()
            .map(Self::row_to_booking)
            .collect::<Result<_>>()?;
        expired.sort_by_key(|b| b.created_at);
        Ok(expired)
    }
}

/// PostgreSQL-backed audit log. The only statement this type ever issues
/// against `audit_entries` besides `SELECT` is `INSERT`.
#[derive(Clone)]
pub struct PgAuditLog {
    pool: PgPool,
}

impl PgAuditLog {
    /// Creates a new PostgreSQL audit log sharing the store's pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_entry(row: &PgRow) -> Result<AuditEntry> {
        let action: String = row.try_get("action")?;
        let details: serde_json::Value = row.try_get("details")?;
        Ok(AuditEntry {
            id: EntryId::from_uuid(row.try_get::<Uuid, _>("id")?),
            actor_id: UserId::from_uuid(row.try_get::<Uuid, _>("actor_id")?),
            action: action
                .parse()
                .map_err(|_| StoreError::Corrupt(format!("audit action {action}")))?,
            details: serde_json::from_value::<AuditDetails>(details)?,
            recorded_at: row.try_get("recorded_at")?,
        })
    }
}

const SELECT_ENTRY: &str = "SELECT id, actor_id, action, details, recorded_at FROM audit_entries";

#[async_trait]
impl AuditLog for PgAuditLog {
    async fn append(&self, entry: AuditEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_entries (id, actor_id, action, details, recorded_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.actor_id.as_uuid())
        .bind(entry.action.as_str())
        .bind(serde_json::to_value(&entry.details)?)
        .bind(entry.recorded_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn entries_by_actor(&self, actor_id: UserId, page: Page) -> Result<Vec<AuditEntry>> {
        let rows = sqlx::query(&format!(
            "{SELECT_ENTRY} WHERE actor_id = $1 ORDER BY recorded_at ASC LIMIT $2 OFFSET $3"
        ))
        .bind(actor_id.as_uuid())
        .bind(page.limit as i64)
        .bind(page.offset as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_entry).collect()
    }

    async fn entries_by_action(&self, action: AuditAction, page: Page) -> Result<Vec<AuditEntry>> {
        let rows = sqlx::query(&format!(
            "{SELECT_ENTRY} WHERE action = $1 ORDER BY recorded_at ASC LIMIT $2 OFFSET $3"
        ))
        .bind(action.as_str())
        .bind(page.limit as i64)
        .bind(page.offset as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_entry).collect()
    }

    async fn entries_in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        page: Page,
    ) -> Result<Vec<AuditEntry>> {
        let rows = sqlx::query(&format!(
            "{SELECT_ENTRY} WHERE recorded_at >= $1 AND recorded_at < $2 \
             ORDER BY recorded_at ASC LIMIT $3 OFFSET $4"
        ))
        .bind(from)
        .bind(to)
        .bind(page.limit as i64)
        .bind(page.offset as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_entry).collect()
    }
}
