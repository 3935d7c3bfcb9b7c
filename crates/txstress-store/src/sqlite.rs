//! SQLite store adapter (`rusqlite`, bundled).
//!
//! One database file, one `records` table, one connection per session. The
//! database is put in WAL mode at creation so sessions on distinct
//! connections genuinely run concurrently; writers serialize at `BEGIN
//! IMMEDIATE` with a busy timeout rather than failing instantly on lock
//! contention.
//!
//! SQLite error codes are classified into the harness taxonomy here so the
//! core never sees a `rusqlite` type.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, params};
use tracing::debug;
use txstress_error::{Result, StressError};
use txstress_types::Record;

use crate::{Store, StoreSession, require_closed, require_open};

/// How long a session waits on a locked database before reporting
/// [`StressError::StoreIo`].
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const CREATE_TABLE_SQL: &str = "\
CREATE TABLE IF NOT EXISTS records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    label TEXT NOT NULL,
    done INTEGER NOT NULL,
    created_unix_ms INTEGER NOT NULL
)";

/// SQLite-backed store over a single database file.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    /// Create a fresh store at `path`, deleting any existing database file
    /// (and its WAL sidecars) first.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        for suffix in ["", "-wal", "-shm"] {
            let mut sidecar = path.as_os_str().to_owned();
            sidecar.push(suffix);
            match std::fs::remove_file(PathBuf::from(sidecar)) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }

        let store = Self { path };
        let conn = store.connect()?;
        conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get::<_, String>(0))
            .map_err(classify)?;
        conn.execute_batch(CREATE_TABLE_SQL).map_err(classify)?;
        debug!(target: "txstress::store", adapter = "sqlite", path = %store.path.display(), "store created");
        Ok(store)
    }

    /// Open an existing store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
        };
        // Probe once so a bad path surfaces here, not in a worker.
        store.connect()?;
        Ok(store)
    }

    /// Path of the backing database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path).map_err(|err| {
            StressError::unavailable(format!("cannot open {}: {err}", self.path.display()))
        })?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(classify)?;
        Ok(conn)
    }
}

impl Store for SqliteStore {
    type Session = SqliteSession;

    fn open_session(&self) -> Result<Self::Session> {
        Ok(SqliteSession {
            conn: self.connect()?,
            in_txn: false,
        })
    }
}

/// Session owning one SQLite connection.
pub struct SqliteSession {
    conn: Connection,
    in_txn: bool,
}

impl StoreSession for SqliteSession {
    fn begin(&mut self) -> Result<()> {
        require_closed(self.in_txn)?;
        // IMMEDIATE takes the write lock up front; the busy timeout absorbs
        // writer contention instead of surfacing SQLITE_BUSY mid-batch.
        self.conn.execute_batch("BEGIN IMMEDIATE").map_err(classify)?;
        self.in_txn = true;
        Ok(())
    }

    fn insert(&mut self, record: &Record) -> Result<()> {
        require_open("insert", self.in_txn)?;
        self.conn
            .execute(
                "INSERT INTO records (label, done, created_unix_ms) VALUES (?1, ?2, ?3)",
                params![
                    record.label,
                    record.done,
                    i64::try_from(record.created_unix_ms).unwrap_or(i64::MAX),
                ],
            )
            .map_err(classify)?;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        require_open("commit", self.in_txn)?;
        let result = self.conn.execute_batch("COMMIT").map_err(classify);
        // COMMIT failure leaves SQLite outside the transaction for most
        // error codes; the caller's rollback will then be a contract error
        // unless we track the handle as closed either way.
        self.in_txn = false;
        result
    }

    fn rollback(&mut self) -> Result<()> {
        require_open("rollback", self.in_txn)?;
        let result = self.conn.execute_batch("ROLLBACK").map_err(classify);
        self.in_txn = false;
        result
    }

    fn in_transaction(&self) -> bool {
        self.in_txn
    }

    fn count(&mut self) -> Result<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))
            .map_err(classify)?;
        Ok(u64::try_from(n).unwrap_or_default())
    }

    fn group_count(&mut self) -> Result<BTreeMap<String, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT label, COUNT(*) FROM records GROUP BY label")
            .map_err(classify)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })
            .map_err(classify)?;

        let mut groups = BTreeMap::new();
        for row in rows {
            let (label, n) = row.map_err(classify)?;
            groups.insert(label, u64::try_from(n).unwrap_or_default());
        }
        Ok(groups)
    }
}

impl Drop for SqliteSession {
    fn drop(&mut self) {
        if self.in_txn {
            let _ = self.conn.execute_batch("ROLLBACK");
        }
    }
}

/// Map a `rusqlite` error into the harness taxonomy.
fn classify(err: rusqlite::Error) -> StressError {
    match &err {
        rusqlite::Error::SqliteFailure(ffi_err, _) => match ffi_err.code {
            rusqlite::ErrorCode::ConstraintViolation => StressError::constraint(err.to_string()),
            rusqlite::ErrorCode::CannotOpen | rusqlite::ErrorCode::NotADatabase => {
                StressError::unavailable(err.to_string())
            }
            _ => StressError::store_io(err.to_string()),
        },
        _ => StressError::store_io(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_store(dir: &tempfile::TempDir) -> SqliteStore {
        SqliteStore::create(dir.path().join("stress.db")).unwrap()
    }

    fn record(label: &str) -> Record {
        Record::new(label, true)
    }

    #[test]
    fn commit_is_visible_across_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let store = fresh_store(&dir);

        let mut writer = store.open_session().unwrap();
        writer.begin().unwrap();
        writer.insert(&record("a")).unwrap();
        writer.insert(&record("b")).unwrap();
        writer.commit().unwrap();

        let mut reader = store.open_session().unwrap();
        assert_eq!(reader.count().unwrap(), 2);
    }

    #[test]
    fn rollback_leaves_no_trace() {
        let dir = tempfile::tempdir().unwrap();
        let store = fresh_store(&dir);

        let mut session = store.open_session().unwrap();
        session.begin().unwrap();
        session.insert_many(&[record("x"), record("y"), record("z")]).unwrap();
        session.rollback().unwrap();

        assert_eq!(session.count().unwrap(), 0);
    }

    #[test]
    fn uncommitted_rows_invisible_to_concurrent_reader() {
        let dir = tempfile::tempdir().unwrap();
        let store = fresh_store(&dir);

        let mut writer = store.open_session().unwrap();
        let mut reader = store.open_session().unwrap();

        writer.begin().unwrap();
        writer.insert(&record("pending")).unwrap();
        assert_eq!(reader.count().unwrap(), 0, "WAL snapshot must hide the open txn");

        writer.commit().unwrap();
        assert_eq!(reader.count().unwrap(), 1);
    }

    #[test]
    fn group_count_aggregates_shared_labels() {
        let dir = tempfile::tempdir().unwrap();
        let store = fresh_store(&dir);

        let mut session = store.open_session().unwrap();
        session.begin().unwrap();
        session.insert(&record("dup")).unwrap();
        session.insert(&record("dup")).unwrap();
        session.insert(&record("solo")).unwrap();
        session.commit().unwrap();

        let groups = session.group_count().unwrap();
        assert_eq!(groups.get("dup"), Some(&2));
        assert_eq!(groups.get("solo"), Some(&1));
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn lifecycle_violations_are_contract_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = fresh_store(&dir);
        let mut session = store.open_session().unwrap();

        assert!(session.commit().unwrap_err().is_contract_violation());
        assert!(session.rollback().unwrap_err().is_contract_violation());
        assert!(session.insert(&record("x")).unwrap_err().is_contract_violation());

        session.begin().unwrap();
        assert!(session.begin().unwrap_err().is_contract_violation());
        session.rollback().unwrap();
    }

    #[test]
    fn create_resets_an_existing_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stress.db");

        let store = SqliteStore::create(&path).unwrap();
        let mut session = store.open_session().unwrap();
        session.begin().unwrap();
        session.insert(&record("old")).unwrap();
        session.commit().unwrap();
        drop(session);

        let store = SqliteStore::create(&path).unwrap();
        let mut session = store.open_session().unwrap();
        assert_eq!(session.count().unwrap(), 0, "create must start from empty");
    }

    #[test]
    fn open_rejects_an_unreachable_path() {
        let err = SqliteStore::open("/nonexistent-dir/never/stress.db").unwrap_err();
        assert!(matches!(err, StressError::StoreUnavailable { .. }));
    }

    #[test]
    fn dropped_session_rolls_back_open_transaction() {
        let dir = tempfile::tempdir().unwrap();
        let store = fresh_store(&dir);

        {
            let mut session = store.open_session().unwrap();
            session.begin().unwrap();
            session.insert(&record("leaked")).unwrap();
        }

        let mut reader = store.open_session().unwrap();
        assert_eq!(reader.count().unwrap(), 0);
    }
}
