//! Service context shared by every business service
//!
//! Holds the database pool, the audit event store, configuration, the
//! injected clock, the rate limiter and the per-user locks.

use crate::auth::{PasswordHasher, Sha256Hasher};
use crate::config::PlatformConfig;
use crate::error::{BusinessError, BusinessResult};
use crate::rate_limit::{RateAction, RateLimiter};
use chrono::{DateTime, NaiveDate, Utc};
use rcard_core::{Clock, Event, EventType, PolicyCatalog, UserId};
use rcard_persistence::{Database, EventStore, UserRepo};
use sqlx::{SqliteExecutor, SqlitePool};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Actor id recorded on events not tied to a user (sponsor programs)
pub const SYSTEM_USER_ID: UserId = 0;

/// Idle locks are pruned once the map grows past this size
const PRUNE_THRESHOLD: usize = 1024;

/// One async mutex per user; serializes read-modify-write cycles on a
/// user's records.
#[derive(Default)]
pub struct UserLocks {
    locks: DashMap<UserId, Arc<Mutex<()>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, user_id: UserId) -> OwnedMutexGuard<()> {
        if self.locks.len() > PRUNE_THRESHOLD {
            self.prune_idle();
        }
        let lock = self.locks.entry(user_id).or_default().clone();
        lock.lock_owned().await
    }

    /// Drop locks nobody holds or waits on; returns how many were removed
    pub fn prune_idle(&self) -> usize {
        let before = self.locks.len();
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before.saturating_sub(self.locks.len())
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Context for business operations
pub struct ServiceContext {
    pool: SqlitePool,
    events: Arc<EventStore>,
    config: Arc<PlatformConfig>,
    clock: Arc<dyn Clock>,
    limiter: RateLimiter,
    locks: UserLocks,
    hasher: Arc<dyn PasswordHasher>,
}

impl ServiceContext {
    pub fn new(db: Database, config: PlatformConfig, clock: Arc<dyn Clock>) -> Self {
        let (pool, events) = db.into_parts();
        Self::from_parts(pool, Arc::new(events), config, clock)
    }

    pub fn from_parts(
        pool: SqlitePool,
        events: Arc<EventStore>,
        config: PlatformConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            pool,
            events,
            config: Arc::new(config),
            limiter: RateLimiter::new(clock.clone()),
            clock,
            locks: UserLocks::new(),
            hasher: Arc::new(Sha256Hasher),
        }
    }

    /// Replace the password hasher
    pub fn with_hasher(mut self, hasher: Arc<dyn PasswordHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn events(&self) -> &EventStore {
        &self.events
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    pub fn catalog(&self) -> &PolicyCatalog {
        &self.config.catalog
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn hasher(&self) -> &dyn PasswordHasher {
        self.hasher.as_ref()
    }

    pub async fn lock_user(&self, user_id: UserId) -> OwnedMutexGuard<()> {
        self.locks.lock(user_id).await
    }

    /// Apply one of the configured rate limits to `actor`
    pub fn rate_limit(&self, actor: &str, action: RateAction) -> BusinessResult<()> {
        let limits = &self.config.rate_limits;
        let limit = match action {
            RateAction::Login => limits.login,
            RateAction::LoanCreate => limits.loan_create,
            RateAction::Api => limits.api,
        };

        self.limiter.check(actor, action, limit).map_err(|retry| {
            tracing::warn!(actor, action = action.as_str(), retry_after = retry.0, "rate limited");
            BusinessError::RateLimited {
                action: action.to_string(),
                retry_after_secs: retry.0,
            }
        })
    }

    /// Fail with `UserNotFound` unless the user exists
    pub async fn ensure_user<'e, E>(&self, executor: E, user_id: UserId) -> BusinessResult<()>
    where
        E: SqliteExecutor<'e>,
    {
        match UserRepo::get_by_id(executor, user_id).await? {
            Some(_) => Ok(()),
            None => Err(BusinessError::UserNotFound(user_id)),
        }
    }

    /// Start an event stamped with the next id and the current time
    pub fn event(&self, event_type: EventType, user_id: UserId) -> Event {
        Event::new(self.events.next_event_id(), self.now(), event_type, user_id)
    }

    /// Append an audit event for an already committed change. A failed
    /// append is logged and does not undo the change.
    pub fn record(&self, event: &Event) {
        if let Err(e) = self.events.append(event) {
            tracing::error!(
                event_id = %event.event_id,
                event_type = %event.event_type,
                error = %e,
                "failed to append audit event"
            );
        }
    }
}
