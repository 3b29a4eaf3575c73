//! Persistence layer for the reservation engine.
//!
//! Two backends implement the same traits: [`MemoryStore`]/[`MemoryAuditLog`]
//! back the test suite, [`PgStore`]/[`PgAuditLog`] back production over
//! PostgreSQL. Mutations travel as a [`WriteSet`] applied all-or-nothing by
//! [`Store::commit`]; the audit trail is append-only by construction — its
//! trait carries no update or delete.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{MemoryAuditLog, MemoryStore};
pub use postgres::{PgAuditLog, PgStore};
pub use store::{AuditLog, Page, Store, Write, WriteSet};
