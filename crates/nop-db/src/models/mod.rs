//! Row types for the nop tables and their write paths.
//!
//! Every table carries `created_at`/`updated_at`; writes stamp them from the
//! `now` handed in by [`Session::save`](crate::Session::save).

mod brand;
mod category;
mod product;
mod user;

pub use brand::{Brand, BrandUpdate, NewBrand};
pub use category::{
    BrandCategories, BrandCategory, CampaignCategories, CampaignCategory, Category, CategoryKind,
    CategoryTable, NewCategory, ProductCategories, ProductCategory,
};
pub use product::{NewProduct, Product};
pub use user::{NewUser, User};

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use rusqlite::Row;
use rusqlite::types::Type;

pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    raw.parse::<DateTime<Utc>>().or_else(|_| {
        // Column defaults use SQLite's "YYYY-MM-DD HH:MM:SS" without timezone.
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
    })
}

pub(crate) fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_both_timestamp_layouts() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();

        assert_eq!(parse_timestamp("2024-03-01 12:30:00").unwrap(), expected);
        assert_eq!(parse_timestamp(&format_timestamp(expected)).unwrap(), expected);
        assert!(parse_timestamp("yesterday").is_err());
    }
}
