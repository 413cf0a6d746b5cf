pub mod auth;
pub mod brands;
pub mod categories;
pub mod context;
pub mod error;
pub mod extract;
pub mod health;
pub mod middleware;
pub mod products;
pub mod routes;
pub mod validation;

pub use auth::{AppState, AppStateInner};
pub use routes::create_router;
