use chrono::{DateTime, Utc};
use rusqlite::{Row, Transaction, params};

use super::{format_timestamp, timestamp_at};
use crate::error::DbError;
use crate::query::{Column, Record};
use crate::session::{Persist, Session};

/// An account created on first OAuth login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub provider: String,
    pub thumbnail_url: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub const ID: Column = Column::new("id");
    pub const PROVIDER: Column = Column::new("provider");
    pub const NAME: Column = Column::new("name");

    pub fn get_by_id(session: &Session, id: &str) -> Result<Option<Self>, DbError> {
        Self::get_first(session, Some(&Self::ID.eq(id.to_string())), &[])
    }
}

impl Record for User {
    const TABLE: &'static str = "tbl_users";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "provider",
        "thumbnail_url",
        "name",
        "created_at",
        "updated_at",
    ];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            provider: row.get(1)?,
            thumbnail_url: row.get(2)?,
            name: row.get(3)?,
            created_at: timestamp_at(row, 4)?,
            updated_at: timestamp_at(row, 5)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: String,
    pub provider: String,
    pub thumbnail_url: String,
    pub name: String,
}

impl Persist for NewUser {
    type Output = User;

    fn persist(self, tx: &Transaction<'_>, now: DateTime<Utc>) -> Result<User, DbError> {
        let stamp = format_timestamp(now);
        tx.execute(
            "INSERT INTO tbl_users (id, provider, thumbnail_url, name, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![self.id, self.provider, self.thumbnail_url, self.name, stamp],
        )?;

        Ok(User {
            id: self.id,
            provider: self.provider,
            thumbnail_url: self.thumbnail_url,
            name: self.name,
            created_at: now,
            updated_at: now,
        })
    }
}
