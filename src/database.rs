//! Database connection descriptor and scoped connections.
//!
//! A connection is opened per operation and released before control returns,
//! on every exit path. `ConnectionStats` makes that observable.

use crate::types::{AskError, Result};
use rusqlite::{Connection, OpenFlags};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shared open/close counters for connections created from one target.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    opened: AtomicUsize,
    closed: AtomicUsize,
}

impl ConnectionStats {
    /// Total connections opened.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Total connections released.
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Connections currently held.
    pub fn live(&self) -> usize {
        self.opened().saturating_sub(self.closed())
    }
}

/// Identifies one SQLite database and how to open it.
///
/// Cheap to clone; clones share the same [`ConnectionStats`].
#[derive(Debug, Clone)]
pub struct DatabaseTarget {
    path: PathBuf,
    read_only: bool,
    busy_timeout: Duration,
    stats: Arc<ConnectionStats>,
}

impl DatabaseTarget {
    /// Target an existing database file, read-write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            read_only: false,
            busy_timeout: Duration::from_millis(5000),
            stats: Arc::new(ConnectionStats::default()),
        }
    }

    /// Open connections read-only.
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// How long a statement waits on a locked database.
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Database file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether connections are opened read-only.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Connection counters shared by all clones of this target.
    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }

    /// Open a scoped connection.
    ///
    /// The database is never created: a missing file is a `ConnectionError`.
    ///
    /// # Errors
    ///
    /// Returns `AskError::ConnectionError` if the database cannot be opened
    pub fn connect(&self) -> Result<ScopedConnection> {
        let mut flags = OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        flags |= if self.read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY
        } else {
            OpenFlags::SQLITE_OPEN_READ_WRITE
        };

        let conn = Connection::open_with_flags(&self.path, flags).map_err(|e| {
            AskError::connection(format!("cannot open {}: {}", self.path.display(), e))
        })?;

        // Counted before any further fallible step so Drop always balances it.
        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        let scoped = ScopedConnection {
            conn: Some(conn),
            stats: Arc::clone(&self.stats),
        };

        scoped
            .busy_timeout(self.busy_timeout)
            .map_err(|e| AskError::connection(format!("cannot configure connection: {}", e)))?;

        tracing::trace!(path = %self.path.display(), live = self.stats.live(), "connection opened");
        Ok(scoped)
    }
}

/// A connection released exactly once, explicitly or on drop.
pub struct ScopedConnection {
    conn: Option<Connection>,
    stats: Arc<ConnectionStats>,
}

impl ScopedConnection {
    /// Close the connection, logging (not returning) a failed close.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err((_conn, e)) = conn.close() {
                // The returned handle is dropped here, which finalizes it.
                tracing::warn!(error = %e, "connection close reported an error");
            }
            self.stats.closed.fetch_add(1, Ordering::SeqCst);
            tracing::trace!(live = self.stats.live(), "connection released");
        }
    }
}

impl Deref for ScopedConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        // Only `release` takes the connection, and it is reachable only
        // through `close(self)` or `Drop`.
        self.conn
            .as_ref()
            .unwrap_or_else(|| unreachable!("scoped connection used after release"))
    }
}

impl Drop for ScopedConnection {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn create_db(path: &Path) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch("CREATE TABLE t (a INTEGER);").unwrap();
    }

    #[test]
    fn test_missing_database_is_connection_error() {
        let dir = tempdir().unwrap();
        let target = DatabaseTarget::new(dir.path().join("missing.sqlite"));

        let err = target.connect().err().unwrap();
        assert!(matches!(err, AskError::ConnectionError(_)));
        assert!(!dir.path().join("missing.sqlite").exists());
        assert_eq!(target.stats().opened(), 0);
    }

    #[test]
    fn test_close_and_drop_both_release_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.sqlite");
        create_db(&path);
        let target = DatabaseTarget::new(&path);

        let conn = target.connect().unwrap();
        assert_eq!(target.stats().live(), 1);
        conn.close();
        assert_eq!(target.stats().live(), 0);

        {
            let _conn = target.connect().unwrap();
            assert_eq!(target.stats().live(), 1);
        }
        assert_eq!(target.stats().opened(), 2);
        assert_eq!(target.stats().closed(), 2);
    }

    #[test]
    fn test_read_only_rejects_writes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.sqlite");
        create_db(&path);
        let target = DatabaseTarget::new(&path).read_only(true);

        let conn = target.connect().unwrap();
        let result = conn.execute("INSERT INTO t (a) VALUES (1)", []);
        assert!(result.is_err());
    }

    #[test]
    fn test_clones_share_stats() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.sqlite");
        create_db(&path);
        let target = DatabaseTarget::new(&path);
        let clone = target.clone();

        clone.connect().unwrap().close();
        assert_eq!(target.stats().opened(), 1);
        assert_eq!(target.stats().closed(), 1);
    }
}
