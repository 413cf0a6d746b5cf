use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, SubsecRound, Utc};
use r2d2::PooledConnection;
use rusqlite::{Connection, Transaction};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::DbError;
use crate::factory::ConnectionFactory;

pub type PooledConn = PooledConnection<ConnectionFactory>;

/// A write that runs inside one transaction of [`Session::save`].
///
/// `now` is the timestamp the write must stamp into `updated_at` (and
/// `created_at` for inserts).
pub trait Persist {
    type Output;

    fn persist(self, tx: &Transaction<'_>, now: DateTime<Utc>) -> Result<Self::Output, DbError>;
}

/// One checked-out connection, used by exactly one request context.
///
/// Closing returns the connection to the pool. A dropped session is closed.
pub struct Session {
    id: Uuid,
    conn: Mutex<Option<PooledConn>>,
}

impl Session {
    pub(crate) fn new(conn: PooledConn) -> Self {
        let id = Uuid::new_v4();
        debug!(session = %id, "session opened");
        Self {
            id,
            conn: Mutex::new(Some(conn)),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    fn lock(&self) -> MutexGuard<'_, Option<PooledConn>> {
        // A panic while holding the lock leaves the connection usable; the
        // open transaction (if any) was rolled back by its drop.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the session's connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&Connection) -> Result<T, DbError>,
    {
        let guard = self.lock();
        let conn = guard.as_ref().ok_or(DbError::SessionClosed)?;
        f(conn)
    }

    /// Add and commit a single write.
    ///
    /// Any failure rolls the transaction back before the error is returned.
    pub fn save<P: Persist>(&self, record: P) -> Result<P::Output, DbError> {
        let mut guard = self.lock();
        let conn = guard.as_mut().ok_or(DbError::SessionClosed)?;

        // Stored with microsecond precision.
        let now = Utc::now().trunc_subsecs(6);
        let tx = conn.transaction()?;
        match record.persist(&tx, now) {
            Ok(output) => {
                tx.commit()?;
                Ok(output)
            }
            Err(e) => {
                debug!(session = %self.id, error = %e, "write rolled back");
                if let Err(rollback) = tx.rollback() {
                    warn!(session = %self.id, error = %rollback, "rollback failed");
                }
                Err(e)
            }
        }
    }

    /// Release the connection. Returns `true` only for the call that closed it.
    pub fn close(&self) -> bool {
        let closed = self.lock().take().is_some();
        if closed {
            debug!(session = %self.id, "session closed");
        }
        closed
    }

    pub fn is_closed(&self) -> bool {
        self.lock().is_none()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// A session that is closed when the guard goes out of scope, whatever the
/// exit path.
#[derive(Debug)]
pub struct ScopedSession {
    session: Arc<Session>,
}

impl ScopedSession {
    pub(crate) fn new(session: Session) -> Self {
        Self {
            session: Arc::new(session),
        }
    }

    /// A handle that outlives the scope; it reports closed once the guard drops.
    pub fn handle(&self) -> Arc<Session> {
        Arc::clone(&self.session)
    }
}

impl Deref for ScopedSession {
    type Target = Session;

    fn deref(&self) -> &Session {
        &self.session
    }
}

impl Drop for ScopedSession {
    fn drop(&mut self) {
        self.session.close();
    }
}
