//! Process-wide application state shared by every request handler.
//!
//! `CoreState` owns the query cache (created at startup, cleared on every
//! mutation) and knows how to open a connection to the event store.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{FixedOffset, NaiveDate, Offset, Utc};

use crate::bucket::DATE_FORMAT;
use crate::config::{self, AppConfig};
use crate::db;
use crate::query_cache::QueryCache;

// ═══════════════════════════════════════════════════════════
// Clock
// ═══════════════════════════════════════════════════════════

/// Source of the server's "today".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    /// Wall clock at a fixed UTC offset.
    System(FixedOffset),
    /// Pinned date, for tests.
    Fixed(NaiveDate),
}

impl Clock {
    /// System clock at `hours` east of UTC. Out-of-range offsets fall back to UTC.
    pub fn with_offset_hours(hours: i32) -> Self {
        let offset = FixedOffset::east_opt(hours * 3600).unwrap_or_else(|| Utc.fix());
        Clock::System(offset)
    }

    pub fn today(&self) -> NaiveDate {
        match self {
            Clock::System(offset) => Utc::now().with_timezone(offset).date_naive(),
            Clock::Fixed(date) => *date,
        }
    }

    pub fn today_string(&self) -> String {
        self.today().format(DATE_FORMAT).to_string()
    }
}

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

pub struct CoreState {
    db_path: PathBuf,
    cache: Mutex<QueryCache>,
    unit_code: String,
    admin_code: String,
    clock: Clock,
    /// Bound on each query/mutation's storage work.
    pub query_timeout: Duration,
    /// SQLite lock wait for request connections; outlasts `query_timeout`.
    busy_timeout: Duration,
    /// Serve an expired cache entry when a query times out.
    pub serve_stale: bool,
}

impl CoreState {
    /// Build state from config and bring the schema up to date.
    pub fn from_config(config: &AppConfig) -> Result<Self, CoreError> {
        // Migrations run once here; request connections skip them.
        db::open_database(&config.db_path)?;
        Ok(Self::new(
            config.db_path.clone(),
            QueryCache::new(config.cache_ttl, config.cache_capacity),
            config.unit_code.clone(),
            config.admin_code.clone(),
            Clock::with_offset_hours(config.utc_offset_hours),
            config.query_timeout,
            config.serve_stale,
        ))
    }

    pub fn new(
        db_path: PathBuf,
        cache: QueryCache,
        unit_code: String,
        admin_code: String,
        clock: Clock,
        query_timeout: Duration,
        serve_stale: bool,
    ) -> Self {
        Self {
            db_path,
            cache: Mutex::new(cache),
            unit_code,
            admin_code,
            clock,
            query_timeout,
            busy_timeout: config::busy_timeout_for(query_timeout),
            serve_stale,
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Open a connection for one request.
    pub fn open_db(&self) -> Result<rusqlite::Connection, CoreError> {
        db::connect(&self.db_path, self.busy_timeout).map_err(CoreError::Database)
    }

    pub fn busy_timeout(&self) -> Duration {
        self.busy_timeout
    }

    pub fn unit_code(&self) -> &str {
        &self.unit_code
    }

    pub fn admin_code(&self) -> &str {
        &self.admin_code
    }

    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Today's date (`YYYY-MM-DD`) in the deployment timezone.
    pub fn today(&self) -> String {
        self.clock.today_string()
    }

    // ── Cache ──────────────────────────────────────────────

    pub fn cache(&self) -> Result<MutexGuard<'_, QueryCache>, CoreError> {
        self.cache.lock().map_err(|_| CoreError::LockPoisoned)
    }

    /// Drop every cached response. Called after each committed mutation.
    pub fn invalidate_all(&self) -> Result<(), CoreError> {
        self.cache()?.invalidate_all();
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
}
