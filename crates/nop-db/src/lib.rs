//! Data access for the nop backend.
//!
//! A [`SessionManager`] owns the connection pool and binds one [`Session`]
//! per [`RequestContext`]. Record types in [`models`] get the generic reads
//! of [`Record`] and write through [`Session::save`].

pub mod config;
pub mod context;
pub mod error;
pub mod factory;
pub mod manager;
pub mod migrations;
pub mod models;
pub mod query;
pub mod session;

pub use config::DatabaseConfig;
pub use context::RequestContext;
pub use error::DbError;
pub use manager::SessionManager;
pub use query::{Column, Filter, Order, Record};
pub use session::{Persist, ScopedSession, Session};
