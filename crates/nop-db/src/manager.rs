use std::sync::Arc;

use r2d2::Pool;
use tracing::{debug, info, warn};

use crate::config::{DatabaseConfig, DatabaseUrl};
use crate::context::RequestContext;
use crate::error::DbError;
use crate::factory::ConnectionFactory;
use crate::migrations;
use crate::session::{ScopedSession, Session};

/// Hands out one session per request context on top of a shared pool.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

struct Inner {
    config: DatabaseConfig,
    factory: ConnectionFactory,
    pool: Pool<ConnectionFactory>,
}

impl SessionManager {
    /// Build the connection pool from `config`.
    ///
    /// No connection is opened here; the first session checkout is the first
    /// time the database is touched. The per-request teardown hook is the
    /// caller's to install (see `nop_api::context`).
    pub fn initialize(config: DatabaseConfig) -> Result<Self, DbError> {
        let url = DatabaseUrl::parse(&config.url)?;
        let factory = ConnectionFactory::new(&url);

        let pool = Pool::builder()
            .max_size(config.pool_size)
            .min_idle(Some(0))
            .connection_timeout(config.connect_timeout)
            .build_unchecked(factory.clone());

        info!(
            "Session manager ready for {} (pool size {})",
            factory.path().display(),
            config.pool_size
        );

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                factory,
                pool,
            }),
        })
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.inner.config
    }

    fn key(&self) -> &str {
        &self.inner.config.context_key
    }

    /// Apply pending schema migrations.
    pub fn migrate(&self) -> Result<(), DbError> {
        let conn = self.inner.factory.open()?;
        migrations::run(&conn)
    }

    /// Check a fresh connection out of the pool, not bound to any context.
    pub fn open_session(&self) -> Result<Session, DbError> {
        let conn = self.inner.pool.get()?;
        Ok(Session::new(conn))
    }

    /// The session bound to `ctx`, created on first access while the context
    /// is active. Once the context has been torn down this only reports what
    /// is bound, which is normally nothing.
    pub fn current_session(&self, ctx: &RequestContext) -> Result<Option<Arc<Session>>, DbError> {
        let request = ctx.id();
        ctx.get_or_open(self.key(), || {
            let session = self.open_session()?;
            debug!(%request, session = %session.id(), "session bound to request");
            Ok(session)
        })
    }

    /// Like [`current_session`](Self::current_session) but treats a missing
    /// session as an error.
    pub fn require_session(&self, ctx: &RequestContext) -> Result<Arc<Session>, DbError> {
        self.current_session(ctx)?.ok_or(DbError::NoRequestContext)
    }

    /// Bind `session` to `ctx`, closing whatever was bound before.
    ///
    /// A context that has been torn down accepts no new session: `session` is
    /// closed and [`DbError::NoRequestContext`] returned.
    pub fn bind_session(&self, ctx: &RequestContext, session: Session) -> Result<Arc<Session>, DbError> {
        let session = Arc::new(session);
        match ctx.bind(self.key(), Arc::clone(&session)) {
            Ok(previous) => {
                if let Some(previous) = previous {
                    previous.close();
                }
                Ok(session)
            }
            Err(refused) => {
                refused.close();
                debug!(request = %ctx.id(), "bind refused on finished request");
                Err(DbError::NoRequestContext)
            }
        }
    }

    /// A fresh session for work outside any request; closed when the guard drops.
    pub fn scoped_session(&self) -> Result<ScopedSession, DbError> {
        Ok(ScopedSession::new(self.open_session()?))
    }

    /// Run `f` with a scoped session and close it afterwards.
    pub fn with_scoped_session<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Session) -> Result<T, E>,
        E: From<DbError>,
    {
        let session = self.scoped_session()?;
        f(&session)
    }

    /// End-of-request hook: finish the context and close its session.
    ///
    /// Returns `true` if a session was closed. Safe to call more than once.
    pub fn teardown(&self, ctx: &RequestContext) -> bool {
        match ctx.finish(self.key()) {
            Some(session) => {
                let closed = session.close();
                debug!(request = %ctx.id(), session = %session.id(), "request torn down");
                closed
            }
            None => false,
        }
    }

    /// Open and close a connection. Never fails; problems are logged.
    pub fn health_check(&self) -> bool {
        let result = self
            .inner
            .factory
            .open()
            .and_then(|conn| conn.query_row("SELECT 1", [], |_| Ok(())));

        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    "Database health check failed for {}: {}",
                    self.inner.factory.path().display(),
                    e
                );
                false
            }
        }
    }
}
