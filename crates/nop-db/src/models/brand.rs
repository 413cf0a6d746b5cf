use chrono::{DateTime, Utc};
use rusqlite::{Row, Transaction, params};

use super::{BrandCategory, Product, format_timestamp, timestamp_at};
use crate::error::DbError;
use crate::query::{Column, Record};
use crate::session::{Persist, Session};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Brand {
    pub id: i64,
    pub name: String,
    pub logo_url: String,
    pub category_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Brand {
    pub const ID: Column = Column::new("id");
    pub const NAME: Column = Column::new("name");
    pub const CATEGORY_ID: Column = Column::new("category_id");

    pub fn get_by_id(session: &Session, id: i64) -> Result<Option<Self>, DbError> {
        Self::get_first(session, Some(&Self::ID.eq(id)), &[])
    }

    pub fn get_by_name(session: &Session, name: &str) -> Result<Option<Self>, DbError> {
        Self::get_first(session, Some(&Self::NAME.eq(name.to_string())), &[])
    }

    /// Other brands in the same category.
    pub fn alternatives(&self, session: &Session) -> Result<Vec<Brand>, DbError> {
        let filter = Self::CATEGORY_ID.eq(self.category_id) & Self::ID.ne(self.id);
        Self::get_all(session, Some(&filter), &[Self::ID.asc()])
    }

    pub fn products(&self, session: &Session) -> Result<Vec<Product>, DbError> {
        Product::get_all(session, Some(&Product::BRAND_ID.eq(self.id)), &[Product::ID.asc()])
    }

    pub fn category(&self, session: &Session) -> Result<BrandCategory, DbError> {
        BrandCategory::get_one(session, Some(&BrandCategory::ID.eq(self.category_id)), &[], || {
            DbError::not_found(format!("brand category {} not found", self.category_id))
        })
    }
}

impl Record for Brand {
    const TABLE: &'static str = "tbl_brands";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "logo_url",
        "category_id",
        "created_at",
        "updated_at",
    ];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            logo_url: row.get(2)?,
            category_id: row.get(3)?,
            created_at: timestamp_at(row, 4)?,
            updated_at: timestamp_at(row, 5)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewBrand {
    pub name: String,
    pub logo_url: String,
    pub category_id: i64,
}

impl Persist for NewBrand {
    type Output = Brand;

    fn persist(self, tx: &Transaction<'_>, now: DateTime<Utc>) -> Result<Brand, DbError> {
        let stamp = format_timestamp(now);
        tx.execute(
            "INSERT INTO tbl_brands (name, logo_url, category_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![self.name, self.logo_url, self.category_id, stamp],
        )?;

        Ok(Brand {
            id: tx.last_insert_rowid(),
            name: self.name,
            logo_url: self.logo_url,
            category_id: self.category_id,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update of a brand; `None` fields are left as they are.
#[derive(Debug, Clone, Default)]
pub struct BrandUpdate {
    pub id: i64,
    pub logo_url: Option<String>,
    pub category_id: Option<i64>,
}

impl Persist for BrandUpdate {
    type Output = Brand;

    fn persist(self, tx: &Transaction<'_>, now: DateTime<Utc>) -> Result<Brand, DbError> {
        let changed = tx.execute(
            "UPDATE tbl_brands
             SET logo_url = COALESCE(?1, logo_url),
                 category_id = COALESCE(?2, category_id),
                 updated_at = ?3
             WHERE id = ?4",
            params![self.logo_url, self.category_id, format_timestamp(now), self.id],
        )?;

        if changed == 0 {
            return Err(DbError::not_found(format!("brand {} not found", self.id)));
        }

        let brand = tx.query_row(
            &format!("SELECT {} FROM tbl_brands WHERE id = ?1", Brand::COLUMNS.join(", ")),
            [self.id],
            Brand::from_row,
        )?;
        Ok(brand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BrandCategories, NewCategory};
    use crate::query::Filter;
    use crate::test_support::{manager, session};

    fn acme(category_id: i64) -> NewBrand {
        NewBrand {
            name: "Acme".into(),
            logo_url: "https://cdn.example.com/acme.png".into(),
            category_id,
        }
    }

    #[test]
    fn duplicate_brand_name_is_rejected_without_new_row() {
        let (_dir, manager) = manager();
        let session = session(&manager);
        let category = session.save(NewCategory::<BrandCategories>::new("Tools")).unwrap();

        session.save(acme(category.id)).unwrap();
        let brands = Brand::get_all(&session, None, &[]).unwrap();
        assert_eq!(brands.len(), 1);
        assert_eq!(brands[0].name, "Acme");

        let err = session.save(acme(category.id)).unwrap_err();
        assert!(err.is_constraint(), "unexpected error: {err}");
        assert_eq!(Brand::get_all(&session, None, &[]).unwrap().len(), 1);
    }

    #[test]
    fn missing_category_is_a_constraint_violation() {
        let (_dir, manager) = manager();
        let session = session(&manager);

        let err = session.save(acme(42)).unwrap_err();
        assert!(err.is_constraint());
        assert!(Brand::get_by_name(&session, "Acme").unwrap().is_none());
    }

    #[test]
    fn alternatives_share_category_and_exclude_self() {
        let (_dir, manager) = manager();
        let session = session(&manager);
        let tools = session.save(NewCategory::<BrandCategories>::new("Tools")).unwrap();
        let food = session.save(NewCategory::<BrandCategories>::new("Food")).unwrap();

        let acme = session.save(acme(tools.id)).unwrap();
        let globex = session
            .save(NewBrand {
                name: "Globex".into(),
                logo_url: "https://cdn.example.com/globex.png".into(),
                category_id: tools.id,
            })
            .unwrap();
        session
            .save(NewBrand {
                name: "Initech".into(),
                logo_url: "https://cdn.example.com/initech.png".into(),
                category_id: food.id,
            })
            .unwrap();

        let alternatives = acme.alternatives(&session).unwrap();
        assert_eq!(alternatives, vec![globex]);
        assert_eq!(acme.category(&session).unwrap().name, "Tools");
        assert!(acme.products(&session).unwrap().is_empty());
    }

    #[test]
    fn update_refreshes_updated_at_only() {
        let (_dir, manager) = manager();
        let session = session(&manager);
        let tools = session.save(NewCategory::<BrandCategories>::new("Tools")).unwrap();
        let created = session.save(acme(tools.id)).unwrap();

        std::thread::sleep(std::time::Duration::from_millis(5));
        let updated = session
            .save(BrandUpdate {
                id: created.id,
                logo_url: Some("https://cdn.example.com/acme-v2.png".into()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(updated.logo_url, "https://cdn.example.com/acme-v2.png");
        assert_eq!(updated.category_id, tools.id);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);
    }

    #[test]
    fn update_of_missing_brand_is_not_found() {
        let (_dir, manager) = manager();
        let session = session(&manager);

        let err = session
            .save(BrandUpdate {
                id: 7,
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[test]
    fn get_first_honours_order() {
        let (_dir, manager) = manager();
        let session = session(&manager);
        let tools = session.save(NewCategory::<BrandCategories>::new("Tools")).unwrap();
        for name in ["Bravo", "Alpha", "Charlie"] {
            session
                .save(NewBrand {
                    name: name.into(),
                    logo_url: format!("https://cdn.example.com/{name}.png"),
                    category_id: tools.id,
                })
                .unwrap();
        }

        let first = Brand::get_first(&session, None, &[Brand::NAME.asc()]).unwrap().unwrap();
        assert_eq!(first.name, "Alpha");

        let last: Option<String> =
            Brand::get_scalar(&session, Brand::NAME, Some(&Filter::all()), &[Brand::NAME.desc()])
                .unwrap();
        assert_eq!(last.as_deref(), Some("Charlie"));

        let none = Brand::get_first(&session, Some(&Brand::NAME.eq("Delta".to_string())), &[])
            .unwrap();
        assert!(none.is_none());
        let nothing: Option<i64> =
            Brand::get_scalar(&session, Brand::ID, Some(&Brand::NAME.like("Z%")), &[]).unwrap();
        assert!(nothing.is_none());
        assert!(
            Brand::get_all(&session, Some(&Brand::NAME.eq("Delta".to_string())), &[])
                .unwrap()
                .is_empty()
        );
    }
}
