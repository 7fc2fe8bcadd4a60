//! Storage layer and domain operations for the workforce temporal engine.
//!
//! Persists entities, events and participations using `rusqlite`, and exposes
//! the composite domain operations (employment, shifts, clock punches, payroll
//! pieces) that are the only way to write them.
//!
//! # Write Path
//!
//! The generic row stores live in a crate-private module. Every mutation goes
//! through a [`Database`] method that runs inside a single `BEGIN IMMEDIATE`
//! transaction: the write lock is taken before overlap and uniqueness checks
//! read anything, so two connections cannot both pass a stale check. Any
//! failure drops the transaction, which rolls back every row it wrote.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! Open one `Database` per thread; they coordinate through `SQLite` locking,
//! waiting up to the configured busy timeout for the write lock.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in RFC 3339 format with millisecond precision
//! and a `Z` suffix (e.g., `2024-01-15T10:30:00.000Z`), so lexicographic
//! ordering matches chronological ordering and interval predicates can be
//! evaluated in SQL.
//!
//! ## Property Storage
//!
//! `properties` columns hold a JSON object (checked with `json_valid`). Keys
//! are always strings; path lookups use `json_extract`.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, ErrorCode, TransactionBehavior};
use thiserror::Error;
use tracing::info;
use wf_core::dispatch::DispatchError;
use wf_core::{ContainmentError, EventValidator, OverlapError, ValidationError, ValidatorRegistry};

mod hooks;
mod ops;
mod queries;
mod registry;
mod store;

pub use hooks::{ChangeKind, ChangeNotice, CommitHook};
pub use ops::{ClockOptions, ClockPeriodCreated, CreatedEvent, ShiftCreated};
pub use queries::{EventFilter, EventIncludes, EventView, TypeCount};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(rusqlite::Error),
    /// A field-level problem with the request.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The request collides with an existing event.
    #[error(transparent)]
    Overlap(#[from] OverlapError),
    /// A child interval falls outside its parent.
    #[error(transparent)]
    Containment(#[from] ContainmentError),
    /// A referenced record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    /// A storage-level uniqueness constraint rejected the write.
    #[error("conflict: {message}")]
    Conflict { message: String },
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for {record_id}: {timestamp}")]
    TimestampParse {
        record_id: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored row could not be decoded.
    #[error("invalid stored data for {record_id}: {message}")]
    InvalidRow { record_id: String, message: String },
}

/// Coarse classification of a [`DbError`] for callers at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Overlap,
    Containment,
    NotFound,
    Conflict,
    Storage,
}

impl DbError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Overlap(_) => ErrorKind::Overlap,
            Self::Containment(_) => ErrorKind::Containment,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Sqlite(_) | Self::TimestampParse { .. } | Self::InvalidRow { .. } => {
                ErrorKind::Storage
            }
        }
    }

    /// Whether the failure came from lock contention with another writer.
    ///
    /// These are the only errors worth retrying, and only once.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, _))
                if matches!(err.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
        )
    }

    pub(crate) fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(failure, message) = &err {
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE {
                return Self::Conflict {
                    message: message
                        .clone()
                        .unwrap_or_else(|| "unique constraint violated".to_string()),
                };
            }
        }
        Self::Sqlite(err)
    }
}

/// Connection settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseOptions {
    /// How long a writer waits for another connection's lock.
    pub busy_timeout: Duration,
    /// Depth limit for materialised event trees.
    pub max_tree_depth: usize,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
            max_tree_depth: 16,
        }
    }
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
    options: DatabaseOptions,
    validators: ValidatorRegistry,
    hooks: Vec<Box<dyn CommitHook>>,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        Self::open_with(path, DatabaseOptions::default())
    }

    pub fn open_with(path: &Path, options: DatabaseOptions) -> Result<Self, DbError> {
        Self::from_connection(Connection::open(path)?, options)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        Self::from_connection(Connection::open_in_memory()?, DatabaseOptions::default())
    }

    fn from_connection(conn: Connection, options: DatabaseOptions) -> Result<Self, DbError> {
        conn.busy_timeout(options.busy_timeout)?;
        let db = Self {
            conn,
            options,
            validators: ValidatorRegistry::with_builtin(),
            hooks: Vec::new(),
        };
        db.init()?;
        Ok(db)
    }

    pub const fn options(&self) -> DatabaseOptions {
        self.options
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            -- Participants: people, organizations, locations, resources
            CREATE TABLE IF NOT EXISTS entities (
                id TEXT PRIMARY KEY,
                entity_type TEXT NOT NULL,
                properties TEXT NOT NULL DEFAULT '{}' CHECK (json_valid(properties)),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_entities_type ON entities(entity_type);

            -- Event type catalog, seeded at bootstrap
            CREATE TABLE IF NOT EXISTS event_types (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                category TEXT NOT NULL,
                can_nest INTEGER NOT NULL DEFAULT 0,
                can_have_children INTEGER NOT NULL DEFAULT 0,
                requires_participation INTEGER NOT NULL DEFAULT 0,
                schema TEXT NOT NULL DEFAULT '{}' CHECK (json_valid(schema)),
                rules TEXT NOT NULL DEFAULT '{}' CHECK (json_valid(rules)),
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            );

            -- Events: time-bounded occurrences, optionally nested
            -- end_time: NULL means open-ended
            CREATE TABLE IF NOT EXISTS events (
                id TEXT PRIMARY KEY,
                event_type_id TEXT NOT NULL,
                parent_id TEXT,
                start_time TEXT NOT NULL,
                end_time TEXT,
                status TEXT NOT NULL DEFAULT 'active'
                    CHECK (status IN ('draft', 'active', 'completed', 'cancelled', 'ended')),
                properties TEXT NOT NULL DEFAULT '{}' CHECK (json_valid(properties)),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                CHECK (end_time IS NULL OR end_time > start_time),
                FOREIGN KEY (event_type_id) REFERENCES event_types(id),
                FOREIGN KEY (parent_id) REFERENCES events(id) ON DELETE SET NULL
            );

            CREATE INDEX IF NOT EXISTS idx_events_type_start ON events(event_type_id, start_time);
            CREATE INDEX IF NOT EXISTS idx_events_parent ON events(parent_id);
            CREATE INDEX IF NOT EXISTS idx_events_span ON events(start_time, end_time);

            -- Participations: typed entity <-> event links
            CREATE TABLE IF NOT EXISTS participations (
                id TEXT PRIMARY KEY,
                participant_id TEXT NOT NULL,
                event_id TEXT NOT NULL,
                participation_type TEXT NOT NULL,
                role TEXT,
                start_time TEXT,
                end_time TEXT,
                properties TEXT NOT NULL DEFAULT '{}' CHECK (json_valid(properties)),
                created_at TEXT NOT NULL,
                FOREIGN KEY (participant_id) REFERENCES entities(id) ON DELETE CASCADE,
                FOREIGN KEY (event_id) REFERENCES events(id) ON DELETE CASCADE
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_participations_unique
                ON participations(participant_id, event_id, participation_type);
            CREATE INDEX IF NOT EXISTS idx_participations_event ON participations(event_id);
            ",
        )?;
        Ok(())
    }

    /// Registers a validator for an additional event type.
    pub fn register_validator(
        &mut self,
        validator: Box<dyn EventValidator>,
    ) -> Result<(), DispatchError> {
        self.validators.register(validator)
    }

    /// Adds a hook that is called after every successful commit that touched events.
    pub fn add_commit_hook(&mut self, hook: Box<dyn CommitHook>) {
        self.hooks.push(hook);
    }

    /// Runs `op` inside an immediate transaction and notifies hooks after commit.
    ///
    /// Returning an error from `op` drops the transaction, rolling it back.
    fn transact<T>(
        &mut self,
        operation: &'static str,
        op: impl FnOnce(&mut ops::Tx<'_>) -> Result<T, DbError>,
    ) -> Result<T, DbError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut ctx = ops::Tx::new(&tx, &self.validators);
        let value = op(&mut ctx)?;
        let changes = ctx.into_changes();
        tx.commit()?;
        info!(operation, changes = changes.len(), "committed");
        if !changes.is_empty() {
            for hook in &self.hooks {
                hook.on_commit(&changes);
            }
        }
        Ok(value)
    }
}

pub(crate) fn parse_timestamp(timestamp: &str, record_id: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            record_id: record_id.to_string(),
            timestamp: timestamp.to_string(),
            source,
        })
}

pub(crate) fn parse_optional_timestamp(
    timestamp: Option<&str>,
    record_id: &str,
) -> Result<Option<DateTime<Utc>>, DbError> {
    timestamp
        .map(|ts| parse_timestamp(ts, record_id))
        .transpose()
}

pub(crate) fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
