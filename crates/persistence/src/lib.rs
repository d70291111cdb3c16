//! # RCard Persistence
//!
//! Ledger store for RCard - SQLite (state) + JSONL (audit events).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Database                               │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────────┐ │
//! │  │   SQLite    │    │    JSONL    │    │     Repos       │ │
//! │  │  (records)  │    │  (events)   │    │   (queries)     │ │
//! │  └─────────────┘    └─────────────┘    └─────────────────┘ │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every repo function takes a generic sqlx executor, so the same call works
//! on the pool or inside a transaction (`&mut *tx`).
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rcard_persistence::{Database, LoanRepo};
//!
//! let db = Database::open("sqlite:data/rcard.db", "data/events").await?;
//! let loans = LoanRepo::list_by_user(db.pool(), user_id, None).await?;
//! ```

pub mod error;
pub mod events;
pub mod sqlite;

pub use error::{PersistenceError, PersistenceResult};
pub use events::{EventFilter, EventReader, EventStore};
pub use sqlite::schema::{
    BalanceRow, CardGrantRow, FraudReportRow, LoanRow, SponsorCardRow, UserRow,
};
pub use sqlite::{
    connect, init_database, load_user, run_migrations, BalanceRepo, CardGrantRepo,
    FraudReportRepo, LoanRepo, SponsorCardRepo, UserRepo,
};

use sqlx::SqlitePool;
use std::path::Path;

/// Database facade - SQLite pool plus audit event store
pub struct Database {
    pool: SqlitePool,
    event_store: EventStore,
}

impl Database {
    /// Open (creating if missing) and migrate the database
    ///
    /// # Arguments
    /// * `db_url` - SQLite URL (e.g., "sqlite:data/rcard.db")
    /// * `events_path` - Directory for JSONL audit events
    pub async fn open<Q: AsRef<Path>>(db_url: &str, events_path: Q) -> PersistenceResult<Self> {
        let pool = init_database(db_url).await?;
        let event_store = EventStore::new(events_path)?;

        Ok(Self { pool, event_store })
    }

    /// Build from existing parts
    pub fn from_parts(pool: SqlitePool, event_store: EventStore) -> Self {
        Self { pool, event_store }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn events(&self) -> &EventStore {
        &self.event_store
    }

    /// Reader over the audit events written so far
    pub fn event_reader(&self) -> EventReader {
        EventReader::new(self.event_store.base_path())
    }

    /// Split into pool and event store
    pub fn into_parts(self) -> (SqlitePool, EventStore) {
        (self.pool, self.event_store)
    }
}
