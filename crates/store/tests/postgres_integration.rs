//! PostgreSQL backend tests.
//!
//! One shared container serves every test; each test gets a fresh pool and
//! truncated tables. Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use chrono::{NaiveDate, TimeDelta, Utc};
use common::{RoomId, UserId};
use domain::{
    AuditAction, AuditDetails, AuditEntry, Booking, BookingStatus, Money, Room, RoomCategory,
    RoomStatus, StaySpan,
};
use sqlx::PgPool;
use store::{AuditLog, Page, PgAuditLog, PgStore, Store, StoreError, WriteSet};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Keeps the container alive for the whole test run.
struct ContainerInfo {
    #[allow(dead_code)] // dropping it would stop the database
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Short-lived pool, only to install the schema; raw_sql runs
            // the whole multi-statement file.
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_reservation_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Fresh store and audit log over a private pool, with emptied tables.
async fn get_test_store() -> (PgStore, PgAuditLog) {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE payments, bookings, rooms, audit_entries")
        .execute(&pool)
        .await
        .unwrap();

    (PgStore::new(pool.clone()), PgAuditLog::new(pool))
}

fn make_room(number: &str) -> Room {
    Room::new(number, RoomCategory::Double, Money::from_dollars(100)).unwrap()
}

fn make_booking(room_id: RoomId, from_day: u32, to_day: u32) -> Booking {
    let span = StaySpan::new(
        NaiveDate::from_ymd_opt(2026, 6, from_day).unwrap(),
        NaiveDate::from_ymd_opt(2026, 6, to_day).unwrap(),
    )
    .unwrap();
    Booking::confirmed(
        UserId::new(),
        room_id,
        span,
        Money::from_dollars(400),
        Utc::now(),
    )
}

#[tokio::test]
async fn room_roundtrip() {
    let (store, _) = get_test_store().await;
    let room = make_room("101");

    store
        .commit(WriteSet::new().insert_room(room.clone()))
        .await
        .unwrap();

    let fetched = store.room(room.id).await.unwrap().unwrap();
    assert_eq!(fetched, room);

    let all = store.rooms().await.unwrap();
    assert_eq!(all.len(), 1);

    let available = store.rooms_by_status(RoomStatus::Available).await.unwrap();
    assert_eq!(available.len(), 1);
    assert!(
        store
            .rooms_by_status(RoomStatus::Cleaning)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn duplicate_room_number_maps_to_typed_error() {
    let (store, _) = get_test_store().await;
    store
        .commit(WriteSet::new().insert_room(make_room("201")))
        .await
        .unwrap();

    let result = store
        .commit(WriteSet::new().insert_room(make_room("201")))
        .await;
    assert!(matches!(result, Err(StoreError::DuplicateRoomNumber(n)) if n == "201"));
}

#[tokio::test]
async fn failed_batch_rolls_back_entirely() {
    let (store, _) = get_test_store().await;
    let good = make_room("301");
    let missing = make_room("302");

    // The update targets a row that does not exist, so the insert must not
    // survive either.
    let result = store
        .commit(
            WriteSet::new()
                .insert_room(good.clone())
                .update_room(missing),
        )
        .await;

    assert!(matches!(result, Err(StoreError::RoomNotFound(_))));
    assert!(store.room(good.id).await.unwrap().is_none());
}

#[tokio::test]
async fn booking_roundtrip_and_active_filter() {
    let (store, _) = get_test_store().await;
    let room = make_room("401");
    let active = make_booking(room.id, 1, 5);
    let mut done = make_booking(room.id, 10, 12);
    done.status = BookingStatus::CheckedOut;

    store
        .commit(
            WriteSet::new()
                .insert_room(room.clone())
                .insert_booking(active.clone())
                .insert_booking(done.clone()),
        )
        .await
        .unwrap();

    let fetched = store.booking(active.id).await.unwrap().unwrap();
    assert_eq!(fetched.span, active.span);
    assert_eq!(fetched.total_cost, active.total_cost);

    let found = store.active_bookings_for_room(room.id).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, active.id);

    let for_user = store.bookings_for_user(active.user_id).await.unwrap();
    assert_eq!(for_user.len(), 1);
}

#[tokio::test]
async fn expire_batch_flips_only_stale_confirmed_rows() {
    let (store, _) = get_test_store().await;
    let room = make_room("501");
    let mut stale = make_booking(room.id, 1, 5);
    stale.created_at = Utc::now() - TimeDelta::hours(30);
    let fresh = make_booking(room.id, 10, 12);

    store
        .commit(
            WriteSet::new()
                .insert_room(room)
                .insert_booking(stale.clone())
                .insert_booking(fresh.clone()),
        )
        .await
        .unwrap();

    let cutoff = Utc::now() - TimeDelta::hours(24);
    let expired = store.expire_confirmed_before(cutoff).await.unwrap();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].id, stale.id);
    assert_eq!(expired[0].status, BookingStatus::Cancelled);

    assert_eq!(
        store.booking(fresh.id).await.unwrap().unwrap().status,
        BookingStatus::Confirmed
    );
}

#[tokio::test]
async fn audit_log_roundtrip_and_pagination() {
    let (_, log) = get_test_store().await;
    let actor = UserId::new();
    let base = Utc::now();

    for i in 0..3i64 {
        let details = AuditDetails::new(
            serde_json::json!({}),
            serde_json::json!({ "seq": i }),
            RoomId::new(),
        )
        .unwrap()
        .with_extra("transition_type", serde_json::json!("manual"));
        log.append(AuditEntry::record(
            actor,
            AuditAction::RoomStatusChanged,
            details,
            base + TimeDelta::seconds(i),
        ))
        .await
        .unwrap();
    }

    let by_actor = log.entries_by_actor(actor, Page::default()).await.unwrap();
    assert_eq!(by_actor.len(), 3);
    assert_eq!(by_actor[0].details.new_value["seq"], 0);
    assert_eq!(by_actor[0].details.extra["transition_type"], "manual");

    let page = log.entries_by_actor(actor, Page::first(2)).await.unwrap();
    assert_eq!(page.len(), 2);
    let rest = log
        .entries_by_actor(actor, Page::first(2).next())
        .await
        .unwrap();
    assert_eq!(rest.len(), 1);

    let by_action = log
        .entries_by_action(AuditAction::RoomStatusChanged, Page::default())
        .await
        .unwrap();
    assert_eq!(by_action.len(), 3);

    let in_range = log
        .entries_in_range(base, base + TimeDelta::seconds(2), Page::default())
        .await
        .unwrap();
    assert_eq!(in_range.len(), 2);
}
