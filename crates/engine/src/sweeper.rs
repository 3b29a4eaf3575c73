//! Recurring expiry sweeps for stale unconfirmed reservations.

use std::sync::Arc;
use std::time::Duration;

use store::{AuditLog, Store};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::coordinator::Coordinator;

/// Runs [`Coordinator::sweep`] on a fixed interval.
///
/// A failed sweep is logged and counted; it never tears down the schedule,
/// and the next tick runs as if nothing happened.
pub struct Sweeper<S, A> {
    coordinator: Arc<Coordinator<S, A>>,
    period: Duration,
}

impl<S, A> Sweeper<S, A>
where
    S: Store + 'static,
    A: AuditLog + 'static,
{
    /// Creates a sweeper over the shared coordinator.
    pub fn new(coordinator: Arc<Coordinator<S, A>>, period: Duration) -> Self {
        Self {
            coordinator,
            period,
        }
    }

    /// Spawns the sweep loop onto the runtime. The first sweep runs
    /// immediately, which catches up after a restart; abort the returned
    /// handle to stop the schedule.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                metrics::counter!("sweeps_total").increment(1);

                match self.coordinator.sweep().await {
                    Ok(outcome) if outcome.count > 0 => {
                        tracing::info!(count = outcome.count, "sweep expired stale reservations");
                    }
                    Ok(_) => {
                        tracing::debug!("sweep found nothing to expire");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "sweep failed; next run is unaffected");
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeDelta, Utc};
    use common::UserId;
    use domain::{Actor, BookingStatus, Money, Role, RoomCategory, StaySpan};
    use store::{MemoryAuditLog, MemoryStore};

    use crate::broadcast::Broadcaster;
    use crate::clock::ManualClock;

    #[tokio::test]
    async fn sweeps_keep_running_on_schedule() {
        let clock = ManualClock::at(Utc::now());
        let store = MemoryStore::new();
        let coordinator = Arc::new(Coordinator::with_clock(
            store.clone(),
            MemoryAuditLog::new(),
            Broadcaster::default(),
            Arc::new(clock.clone()),
        ));

        let admin = Actor::new(UserId::new(), Role::Admin);
        let room = coordinator
            .create_room(&admin, "101", RoomCategory::Double, Money::from_dollars(100))
            .await
            .unwrap();
        let span = StaySpan::new(
            NaiveDate::from_ymd_opt(2099, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2099, 1, 5).unwrap(),
        )
        .unwrap();
        let guest = Actor::new(UserId::new(), Role::Guest);
        let booking = coordinator
            .reserve(&guest, guest.id, room.id, span)
            .await
            .unwrap();

        // Age the booking past the staleness window, then let the loop run.
        clock.advance(TimeDelta::hours(25));
        let handle = Sweeper::new(Arc::clone(&coordinator), Duration::from_millis(10)).spawn();

        let mut cancelled = false;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let status = store.booking(booking.id).await.unwrap().unwrap().status;
            if status == BookingStatus::Cancelled {
                cancelled = true;
                break;
            }
        }
        handle.abort();

        assert!(cancelled, "sweeper never expired the stale booking");
    }
}
