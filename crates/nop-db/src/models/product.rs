use chrono::{DateTime, Utc};
use rusqlite::{Row, Transaction, params};

use super::{ProductCategory, format_timestamp, timestamp_at};
use crate::error::DbError;
use crate::query::{Column, Record};
use crate::session::{Persist, Session};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub image_url: String,
    pub brand_id: i64,
    pub category_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub const ID: Column = Column::new("id");
    pub const NAME: Column = Column::new("name");
    pub const BRAND_ID: Column = Column::new("brand_id");
    pub const CATEGORY_ID: Column = Column::new("category_id");

    pub fn get_by_id(session: &Session, id: i64) -> Result<Option<Self>, DbError> {
        Self::get_first(session, Some(&Self::ID.eq(id)), &[])
    }

    pub fn get_by_name(session: &Session, name: &str) -> Result<Option<Self>, DbError> {
        Self::get_first(session, Some(&Self::NAME.eq(name.to_string())), &[])
    }

    pub fn category(&self, session: &Session) -> Result<ProductCategory, DbError> {
        ProductCategory::get_one(session, Some(&ProductCategory::ID.eq(self.category_id)), &[], || {
            DbError::not_found(format!("product category {} not found", self.category_id))
        })
    }
}

impl Record for Product {
    const TABLE: &'static str = "tbl_products";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "image_url",
        "brand_id",
        "category_id",
        "created_at",
        "updated_at",
    ];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            image_url: row.get(2)?,
            brand_id: row.get(3)?,
            category_id: row.get(4)?,
            created_at: timestamp_at(row, 5)?,
            updated_at: timestamp_at(row, 6)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub image_url: String,
    pub brand_id: i64,
    pub category_id: i64,
}

impl Persist for NewProduct {
    type Output = Product;

    fn persist(self, tx: &Transaction<'_>, now: DateTime<Utc>) -> Result<Product, DbError> {
        let stamp = format_timestamp(now);
        tx.execute(
            "INSERT INTO tbl_products (name, image_url, brand_id, category_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![self.name, self.image_url, self.brand_id, self.category_id, stamp],
        )?;

        Ok(Product {
            id: tx.last_insert_rowid(),
            name: self.name,
            image_url: self.image_url,
            brand_id: self.brand_id,
            category_id: self.category_id,
            created_at: now,
            updated_at: now,
        })
    }
}
