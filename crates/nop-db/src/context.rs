use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::error::DbError;
use crate::session::Session;

/// Per-request state handed explicitly to handlers.
///
/// Sessions are bound under the owning manager's context key. Cloning is
/// cheap and every clone refers to the same request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    inner: Arc<Mutex<ContextState>>,
}

#[derive(Debug)]
struct ContextState {
    id: Uuid,
    active: bool,
    sessions: HashMap<String, Arc<Session>>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ContextState {
                id: Uuid::new_v4(),
                active: true,
                sessions: HashMap::new(),
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, ContextState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> Uuid {
        self.state().id
    }

    /// False once the request has been torn down.
    pub fn is_active(&self) -> bool {
        self.state().active
    }

    /// Return the bound session, creating one with `open` while the context is
    /// active. The context stays locked during `open` so a context never ends
    /// up with two sessions under one key.
    pub(crate) fn get_or_open<F>(&self, key: &str, open: F) -> Result<Option<Arc<Session>>, DbError>
    where
        F: FnOnce() -> Result<Session, DbError>,
    {
        let mut state = self.state();
        if let Some(session) = state.sessions.get(key) {
            return Ok(Some(Arc::clone(session)));
        }
        if !state.active {
            return Ok(None);
        }

        let session = Arc::new(open()?);
        state.sessions.insert(key.to_string(), Arc::clone(&session));
        Ok(Some(session))
    }

    /// Bind `session` under `key`, returning the session it displaced. A
    /// finished context refuses the bind and hands the session back.
    pub(crate) fn bind(
        &self,
        key: &str,
        session: Arc<Session>,
    ) -> Result<Option<Arc<Session>>, Arc<Session>> {
        let mut state = self.state();
        if !state.active {
            return Err(session);
        }
        Ok(state.sessions.insert(key.to_string(), session))
    }

    /// Mark the request finished and unbind the session under `key`.
    pub(crate) fn finish(&self, key: &str) -> Option<Arc<Session>> {
        let mut state = self.state();
        state.active = false;
        state.sessions.remove(key)
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
