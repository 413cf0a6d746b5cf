use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{Row, Transaction, params};

use super::{format_timestamp, timestamp_at};
use crate::error::DbError;
use crate::query::{Column, Record};
use crate::session::{Persist, Session};

/// The three category families. They share one shape but live in separate
/// tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryKind {
    Brand,
    Product,
    Campaign,
}

impl CategoryKind {
    pub const ALL: [CategoryKind; 3] = [Self::Brand, Self::Product, Self::Campaign];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Brand => "brand",
            Self::Product => "product",
            Self::Campaign => "campaign",
        }
    }
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown category kind '{}'", s))
    }
}

/// Binds a category marker type to its table.
pub trait CategoryTable {
    const TABLE: &'static str;
    const KIND: CategoryKind;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrandCategories;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductCategories;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CampaignCategories;

impl CategoryTable for BrandCategories {
    const TABLE: &'static str = "tbl_brand_categories";
    const KIND: CategoryKind = CategoryKind::Brand;
}

impl CategoryTable for ProductCategories {
    const TABLE: &'static str = "tbl_product_categories";
    const KIND: CategoryKind = CategoryKind::Product;
}

impl CategoryTable for CampaignCategories {
    const TABLE: &'static str = "tbl_campaign_categories";
    const KIND: CategoryKind = CategoryKind::Campaign;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category<K> {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    kind: PhantomData<fn() -> K>,
}

pub type BrandCategory = Category<BrandCategories>;
pub type ProductCategory = Category<ProductCategories>;
pub type CampaignCategory = Category<CampaignCategories>;

impl<K: CategoryTable> Category<K> {
    pub const ID: Column = Column::new("id");
    pub const NAME: Column = Column::new("name");

    pub fn kind(&self) -> CategoryKind {
        K::KIND
    }

    pub fn get_by_id(session: &Session, id: i64) -> Result<Option<Self>, DbError> {
        Self::get_first(session, Some(&Self::ID.eq(id)), &[])
    }

    pub fn exists(session: &Session, id: i64) -> Result<bool, DbError> {
        let found: Option<i64> = Self::get_scalar(session, Self::ID, Some(&Self::ID.eq(id)), &[])?;
        Ok(found.is_some())
    }
}

impl<K: CategoryTable> Record for Category<K> {
    const TABLE: &'static str = K::TABLE;
    const COLUMNS: &'static [&'static str] = &["id", "name", "created_at", "updated_at"];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            created_at: timestamp_at(row, 2)?,
            updated_at: timestamp_at(row, 3)?,
            kind: PhantomData,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewCategory<K> {
    pub name: String,
    kind: PhantomData<fn() -> K>,
}

impl<K> NewCategory<K> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PhantomData,
        }
    }
}

impl<K: CategoryTable> Persist for NewCategory<K> {
    type Output = Category<K>;

    fn persist(self, tx: &Transaction<'_>, now: DateTime<Utc>) -> Result<Category<K>, DbError> {
        let stamp = format_timestamp(now);
        tx.execute(
            &format!(
                "INSERT INTO {} (name, created_at, updated_at) VALUES (?1, ?2, ?2)",
                K::TABLE
            ),
            params![self.name, stamp],
        )?;

        Ok(Category {
            id: tx.last_insert_rowid(),
            name: self.name,
            created_at: now,
            updated_at: now,
            kind: PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{manager, session};

    #[test]
    fn kinds_parse_from_path_segments() {
        assert_eq!("brand".parse::<CategoryKind>(), Ok(CategoryKind::Brand));
        assert_eq!("campaign".parse::<CategoryKind>(), Ok(CategoryKind::Campaign));
        assert!("shoes".parse::<CategoryKind>().is_err());
    }

    #[test]
    fn kinds_are_stored_separately() {
        let (_dir, manager) = manager();
        let session = session(&manager);

        let outdoor = session.save(NewCategory::<BrandCategories>::new("Outdoor")).unwrap();
        session.save(NewCategory::<ProductCategories>::new("Jackets")).unwrap();
        session.save(NewCategory::<ProductCategories>::new("Boots")).unwrap();

        let brands = BrandCategory::get_all(&session, None, &[]).unwrap();
        assert_eq!(brands, vec![outdoor.clone()]);
        assert_eq!(brands[0].kind(), CategoryKind::Brand);

        let products =
            ProductCategory::get_all(&session, None, &[ProductCategory::NAME.asc()]).unwrap();
        let names: Vec<_> = products.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Boots", "Jackets"]);

        assert!(CampaignCategory::get_all(&session, None, &[]).unwrap().is_empty());
        assert!(BrandCategory::exists(&session, outdoor.id).unwrap());
        assert!(!CampaignCategory::exists(&session, outdoor.id).unwrap());
    }
}
