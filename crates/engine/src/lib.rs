//! The reservation concurrency engine.
//!
//! Every state-changing operation runs through the [`Coordinator`], which
//! serializes work per room via an explicit lock table, re-validates all
//! preconditions under the lock, commits atomically through the store, and
//! only then appends the audit entry and hands the change to the broadcast
//! dispatcher. The [`Sweeper`] cancels stale unconfirmed reservations on a
//! fixed schedule under the reserved system identity.

pub mod broadcast;
pub mod clock;
pub mod coordinator;
pub mod locks;
pub mod sweeper;

pub use broadcast::Broadcaster;
pub use clock::{Clock, ManualClock, SystemClock};
pub use coordinator::{CheckoutSummary, Coordinator, SweepOutcome};
pub use locks::RoomLocks;
pub use sweeper::Sweeper;
