//! Per-request database scope.
//!
//! [`request_scope`] gives every request its own [`RequestContext`] and tears
//! it down once the handler has produced a response, error responses
//! included. Handlers receive the context explicitly through
//! `Extension<RequestContext>`.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::error;

use nop_db::{RequestContext, Session};

use crate::auth::AppState;
use crate::error::ApiError;

pub async fn request_scope(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let ctx = RequestContext::new();
    req.extensions_mut().insert(ctx.clone());

    let response = next.run(req).await;

    state.sessions.teardown(&ctx);
    response
}

/// Run blocking database work with the request's session off the async runtime.
pub async fn with_session<F, T>(state: &AppState, ctx: &RequestContext, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Session) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    let ctx = ctx.clone();

    tokio::task::spawn_blocking(move || {
        let session = state.sessions.require_session(&ctx)?;
        f(&session)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal
    })?
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, Router, body::Body, http::StatusCode, middleware, routing::get};
    use nop_db::{DatabaseConfig, SessionManager};
    use tempfile::{TempDir, tempdir};
    use tower::ServiceExt;

    use super::*;
    use crate::auth::AppStateInner;

    type Seen = Arc<Mutex<Vec<Arc<Session>>>>;

    fn state() -> (TempDir, AppState) {
        let dir = tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("nop.db").display());
        let sessions = SessionManager::initialize(DatabaseConfig::new(url)).unwrap();
        sessions.migrate().unwrap();
        let state = Arc::new(AppStateInner {
            sessions,
            jwt_secret: "test-secret".into(),
        });
        (dir, state)
    }

    fn router(state: AppState, seen: Seen, fail: bool) -> Router {
        let handler = move |Extension(ctx): Extension<RequestContext>, State(state): State<AppState>| {
            let seen = seen.clone();
            async move {
                let first = state.sessions.require_session(&ctx)?;
                let second = state.sessions.require_session(&ctx)?;
                assert!(Arc::ptr_eq(&first, &second));
                seen.lock().unwrap().push(first);

                if fail {
                    Err(ApiError::NotFound("nothing here".into()))
                } else {
                    Ok::<_, ApiError>("ok")
                }
            }
        };

        Router::new()
            .route("/probe", get(handler))
            .layer(middleware::from_fn_with_state(state.clone(), request_scope))
            .with_state(state)
    }

    async fn probe(app: Router) -> StatusCode {
        let req = axum::http::Request::builder()
            .uri("/probe")
            .body(Body::empty())
            .unwrap();
        app.oneshot(req).await.unwrap().status()
    }

    #[tokio::test]
    async fn session_is_closed_after_each_request() {
        let (_dir, state) = state();
        let seen: Seen = Arc::default();

        assert_eq!(probe(router(state.clone(), seen.clone(), false)).await, StatusCode::OK);
        assert_eq!(probe(router(state, seen.clone(), false)).await, StatusCode::OK);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|s| s.is_closed()));
        assert!(!Arc::ptr_eq(&seen[0], &seen[1]));
    }

    #[tokio::test]
    async fn session_is_closed_when_handler_fails() {
        let (_dir, state) = state();
        let seen: Seen = Arc::default();

        assert_eq!(probe(router(state, seen.clone(), true)).await, StatusCode::NOT_FOUND);
        assert!(seen.lock().unwrap()[0].is_closed());
    }
}
