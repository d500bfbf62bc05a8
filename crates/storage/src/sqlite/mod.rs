//! SQLite counter store
//!
//! One `id_counters` table shared by every connection that opens the same
//! database file, so separate processes allocate from the same sequences.
//!
//! Transactions start with `BEGIN IMMEDIATE`, which takes SQLite's write lock
//! before the first statement. SQLite has no row locks; the write lock is the
//! strongest it offers and subsumes `SELECT ... FOR UPDATE`, at the price of
//! serializing every entity type. Contention waits up to the busy timeout and
//! then surfaces as a retryable [`Error::Busy`].
//!
//! Upsert uses `INSERT ... ON CONFLICT DO UPDATE ... RETURNING value`, so the
//! post-write value is always reported, on both branches.

pub mod schema;

use parking_lot::{Mutex, MutexGuard};
use rusqlite::{Connection, ErrorCode, OptionalExtension};
use std::path::{Path, PathBuf};
use std::time::Duration;
use wishid_core::{
    CounterRow, CounterStore, CounterTransaction, EntityType, Error, Id, Result, UpsertBranch,
};

/// Default time a connection waits on a locked database
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection options for [`SqliteCounterStore`]
#[derive(Debug, Clone)]
pub struct SqliteOptions {
    /// How long to wait for another connection's write lock
    pub busy_timeout: Duration,
}

impl Default for SqliteOptions {
    fn default() -> Self {
        Self {
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }
}

impl SqliteOptions {
    /// Set the busy timeout
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }
}

/// Translate a driver error into the store error taxonomy
pub(crate) fn map_sqlite_error(err: rusqlite::Error) -> Error {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => Error::Busy(err.to_string()),
            ErrorCode::ConstraintViolation => Error::ConstraintViolation(err.to_string()),
            _ => Error::Backend(err.to_string()),
        },
        _ => Error::Backend(err.to_string()),
    }
}

fn to_id(raw: i64) -> Result<Id> {
    Id::try_from(raw).map_err(|_| Error::Backend(format!("negative counter value {}", raw)))
}

fn to_sql_value(entity_type: EntityType, value: Id) -> Result<i64> {
    i64::try_from(value).map_err(|_| Error::ValueOverflow(entity_type))
}

/// Counter table in a SQLite database
///
/// The connection is guarded by a mutex, so one store value runs one
/// transaction at a time. Open one store per thread or process to get
/// concurrent connections against the same file.
pub struct SqliteCounterStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
    busy_timeout: Duration,
}

impl std::fmt::Debug for SqliteCounterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCounterStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteCounterStore {
    /// Open (or create) a database file and ensure the counter table exists
    pub fn open(path: impl AsRef<Path>, options: SqliteOptions) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path).map_err(map_sqlite_error)?;
        Self::from_connection(conn, Some(path.to_path_buf()), &options)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(map_sqlite_error)?;
        Self::from_connection(conn, None, &SqliteOptions::default())
    }

    fn from_connection(
        conn: Connection,
        path: Option<PathBuf>,
        options: &SqliteOptions,
    ) -> Result<Self> {
        conn.busy_timeout(options.busy_timeout)
            .map_err(map_sqlite_error)?;
        schema::ensure_schema(&conn)?;
        tracing::info!(
            path = ?path,
            busy_timeout_ms = options.busy_timeout.as_millis() as u64,
            "opened sqlite counter store"
        );
        Ok(Self {
            conn: Mutex::new(conn),
            path,
            busy_timeout: options.busy_timeout,
        })
    }

    /// Database file, or `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Connection for inspection outside a transaction
    ///
    /// Waits up to the busy timeout for an open transaction of this store to
    /// finish, then fails with `Busy`. A caller holding that transaction on
    /// the same thread always gets `Busy`.
    fn inspection_conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.try_lock_for(self.busy_timeout).ok_or_else(|| {
            Error::Busy("a transaction on this store is still open".to_string())
        })
    }

    /// Committed counter value for `entity_type`
    ///
    /// Inspection for tests and maintenance tooling. While a transaction
    /// from this store is open, waits up to the busy timeout and then fails
    /// with `Busy`.
    pub fn committed_value(&self, entity_type: EntityType) -> Result<Option<Id>> {
        let conn = self.inspection_conn()?;
        let raw: Option<i64> = conn
            .query_row(schema::SELECT_VALUE, [entity_type.as_u16()], |row| {
                row.get(0)
            })
            .optional()
            .map_err(map_sqlite_error)?;
        raw.map(to_id).transpose()
    }

    /// All committed rows, ordered by entity type
    pub fn rows(&self) -> Result<Vec<CounterRow>> {
        let conn = self.inspection_conn()?;
        let mut stmt = conn.prepare(schema::SELECT_ALL).map_err(map_sqlite_error)?;
        let raw = stmt
            .query_map([], |row| Ok((row.get::<_, u16>(0)?, row.get::<_, i64>(1)?)))
            .map_err(map_sqlite_error)?;

        let mut rows = Vec::new();
        for entry in raw {
            let (entity_type, value) = entry.map_err(map_sqlite_error)?;
            rows.push(CounterRow::new(EntityType::new(entity_type), to_id(value)?));
        }
        Ok(rows)
    }
}

impl CounterStore for SqliteCounterStore {
    type Transaction<'a> = SqliteTransaction<'a>;

    fn begin(&self) -> Result<SqliteTransaction<'_>> {
        let conn = self.conn.lock();
        conn.execute_batch("BEGIN IMMEDIATE")
            .map_err(map_sqlite_error)?;
        Ok(SqliteTransaction {
            conn,
            finished: false,
            last_write_value: None,
        })
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn supports_upsert(&self) -> bool {
        true
    }
}

/// Open `BEGIN IMMEDIATE` transaction on a [`SqliteCounterStore`]
pub struct SqliteTransaction<'a> {
    conn: MutexGuard<'a, Connection>,
    finished: bool,
    last_write_value: Option<Id>,
}

impl std::fmt::Debug for SqliteTransaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteTransaction")
            .field("finished", &self.finished)
            .field("last_write_value", &self.last_write_value)
            .finish_non_exhaustive()
    }
}

impl SqliteTransaction<'_> {
    /// End the transaction; on failure it stays open for `Drop` to roll back
    fn finish(&mut self, statement: &str) -> Result<()> {
        self.conn
            .execute_batch(statement)
            .map_err(map_sqlite_error)?;
        self.finished = true;
        Ok(())
    }
}

impl CounterTransaction for SqliteTransaction<'_> {
    fn select_for_update(&mut self, entity_type: EntityType) -> Result<Option<Id>> {
        let raw: Option<i64> = self
            .conn
            .query_row(schema::SELECT_VALUE, [entity_type.as_u16()], |row| {
                row.get(0)
            })
            .optional()
            .map_err(map_sqlite_error)?;
        raw.map(to_id).transpose()
    }

    fn insert(&mut self, entity_type: EntityType, value: Id) -> Result<()> {
        let value = to_sql_value(entity_type, value)?;
        self.conn
            .execute(schema::INSERT_ROW, (entity_type.as_u16(), value))
            .map_err(map_sqlite_error)?;
        Ok(())
    }

    fn update(&mut self, entity_type: EntityType, value: Id) -> Result<()> {
        let value = to_sql_value(entity_type, value)?;
        let changed = self
            .conn
            .execute(schema::UPDATE_ROW, (entity_type.as_u16(), value))
            .map_err(map_sqlite_error)?;
        if changed == 0 {
            return Err(Error::RowNotFound(entity_type));
        }
        Ok(())
    }

    fn upsert_increment(&mut self, entity_type: EntityType) -> Result<UpsertBranch> {
        let raw: i64 = self
            .conn
            .query_row(schema::UPSERT_INCREMENT, [entity_type.as_u16()], |row| {
                row.get(0)
            })
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Error::ValueOverflow(entity_type),
                other => map_sqlite_error(other),
            })?;
        let value = to_id(raw)?;
        self.last_write_value = Some(value);

        // The insert branch always writes 1; an update always yields >= 2
        Ok(if value == 1 {
            UpsertBranch::Inserted
        } else {
            UpsertBranch::Updated
        })
    }

    fn last_write_value(&self) -> Option<Id> {
        self.last_write_value
    }

    fn commit(mut self) -> Result<()> {
        self.finish("COMMIT")
    }

    fn rollback(mut self) -> Result<()> {
        self.finish("ROLLBACK")
    }
}

impl Drop for SqliteTransaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                tracing::warn!(error = %e, "sqlite rollback on drop failed");
            }
        }
    }
}
