use rusqlite::Connection;
use tracing::info;

use crate::error::DbError;

/// Versioned schema steps; index + 1 is the version each one produces.
const MIGRATIONS: &[&str] = &[
    // v1: users, categories, brands, products
    "
    CREATE TABLE tbl_users (
        id              TEXT PRIMARY KEY CHECK (length(id) <= 256),
        provider        TEXT NOT NULL CHECK (length(provider) <= 16),
        thumbnail_url   TEXT NOT NULL,
        name            TEXT NOT NULL CHECK (length(name) <= 64),
        created_at      TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at      TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE tbl_brand_categories (
        id          INTEGER PRIMARY KEY,
        name        TEXT NOT NULL CHECK (length(name) <= 32),
        created_at  TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE tbl_product_categories (
        id          INTEGER PRIMARY KEY,
        name        TEXT NOT NULL CHECK (length(name) <= 32),
        created_at  TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE tbl_campaign_categories (
        id          INTEGER PRIMARY KEY,
        name        TEXT NOT NULL CHECK (length(name) <= 32),
        created_at  TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE tbl_brands (
        id          INTEGER PRIMARY KEY,
        name        TEXT NOT NULL UNIQUE CHECK (length(name) <= 128),
        logo_url    TEXT NOT NULL,
        category_id INTEGER NOT NULL REFERENCES tbl_brand_categories(id),
        created_at  TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE INDEX idx_brands_category ON tbl_brands(category_id);

    CREATE TABLE tbl_products (
        id          INTEGER PRIMARY KEY,
        name        TEXT NOT NULL UNIQUE CHECK (length(name) <= 256),
        image_url   TEXT NOT NULL,
        brand_id    INTEGER NOT NULL REFERENCES tbl_brands(id),
        category_id INTEGER NOT NULL REFERENCES tbl_product_categories(id),
        created_at  TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE INDEX idx_products_brand ON tbl_products(brand_id);
    ",
];

pub fn run(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let current: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    for (idx, step) in MIGRATIONS.iter().enumerate() {
        let version = idx as i64 + 1;
        if version <= current {
            continue;
        }

        info!("Running migration v{}", version);
        conn.execute_batch(&format!(
            "BEGIN;\n{}\nINSERT INTO schema_version (version) VALUES ({});\nCOMMIT;",
            step, version
        ))
        .map_err(|e| {
            // Leave no half-applied step behind.
            let _ = conn.execute_batch("ROLLBACK;");
            DbError::Migration(format!("v{}: {}", version, e))
        })?;
    }

    info!("Database migrations complete");
    Ok(())
}
