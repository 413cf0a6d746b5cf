use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, OpenFlags};

use crate::config::DatabaseUrl;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens rusqlite connections for the r2d2 pool.
#[derive(Debug, Clone)]
pub struct ConnectionFactory {
    path: PathBuf,
    read_only: bool,
}

impl ConnectionFactory {
    pub fn new(url: &DatabaseUrl) -> Self {
        Self {
            path: url.path.clone(),
            read_only: url.read_only,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flags(&self) -> OpenFlags {
        let base = OpenFlags::SQLITE_OPEN_NO_MUTEX | OpenFlags::SQLITE_OPEN_URI;
        if self.read_only {
            base | OpenFlags::SQLITE_OPEN_READ_ONLY
        } else {
            base | OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
        }
    }

    /// Open a connection outside the pool.
    pub fn open(&self) -> rusqlite::Result<Connection> {
        let conn = Connection::open_with_flags(&self.path, self.flags())?;

        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        if !self.read_only {
            // WAL mode for concurrent reads
            let _mode: String =
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        }

        Ok(conn)
    }
}

impl r2d2::ManageConnection for ConnectionFactory {
    type Connection = Connection;
    type Error = rusqlite::Error;

    fn connect(&self) -> Result<Connection, rusqlite::Error> {
        self.open()
    }

    fn is_valid(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        conn.query_row("SELECT 1", [], |_| Ok(()))
    }

    fn has_broken(&self, _conn: &mut Connection) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn opens_with_foreign_keys_enabled() {
        let dir = tempdir().unwrap();
        let url = DatabaseUrl {
            path: dir.path().join("nop.db"),
            read_only: false,
        };

        let conn = ConnectionFactory::new(&url).open().unwrap();
        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn missing_directory_fails_to_open() {
        let dir = tempdir().unwrap();
        let url = DatabaseUrl {
            path: dir.path().join("missing").join("nop.db"),
            read_only: false,
        };

        assert!(ConnectionFactory::new(&url).open().is_err());
    }
}
