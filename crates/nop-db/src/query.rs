//! Generic read helpers shared by every record type.
//!
//! Callers compose a [`Filter`] from typed [`Column`] handles and pass it to
//! the [`Record`] helpers, which only render it into the `WHERE` clause of a
//! `SELECT` with bound parameters.

use std::ops::{BitAnd, BitOr, Not};

use rusqlite::types::{FromSql, Value};
use rusqlite::{Connection, Row, params_from_iter};

use crate::error::DbError;
use crate::session::Session;

/// A column of a record's table.
#[derive(Debug, Clone, Copy)]
pub struct Column {
    name: &'static str,
}

impl Column {
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn compare(self, op: CompareOp, value: impl Into<Value>) -> Filter {
        Filter::Compare {
            column: self.name,
            op,
            value: value.into(),
        }
    }

    pub fn eq(self, value: impl Into<Value>) -> Filter {
        self.compare(CompareOp::Eq, value)
    }

    pub fn ne(self, value: impl Into<Value>) -> Filter {
        self.compare(CompareOp::Ne, value)
    }

    pub fn lt(self, value: impl Into<Value>) -> Filter {
        self.compare(CompareOp::Lt, value)
    }

    pub fn le(self, value: impl Into<Value>) -> Filter {
        self.compare(CompareOp::Le, value)
    }

    pub fn gt(self, value: impl Into<Value>) -> Filter {
        self.compare(CompareOp::Gt, value)
    }

    pub fn ge(self, value: impl Into<Value>) -> Filter {
        self.compare(CompareOp::Ge, value)
    }

    pub fn like(self, pattern: impl Into<String>) -> Filter {
        self.compare(CompareOp::Like, pattern.into())
    }

    pub fn is_null(self) -> Filter {
        Filter::IsNull(self.name)
    }

    pub fn in_list<I, V>(self, values: I) -> Filter
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Filter::In {
            column: self.name,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn asc(self) -> Order {
        Order {
            column: self.name,
            descending: false,
        }
    }

    pub fn desc(self) -> Order {
        Order {
            column: self.name,
            descending: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
}

impl CompareOp {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Like => "LIKE",
        }
    }
}

/// Boolean predicate over a record's columns.
///
/// Combine with `&`, `|` and `!`.
#[derive(Debug, Clone)]
pub enum Filter {
    /// Matches every row.
    All,
    Compare {
        column: &'static str,
        op: CompareOp,
        value: Value,
    },
    IsNull(&'static str),
    In {
        column: &'static str,
        values: Vec<Value>,
    },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn all() -> Self {
        Self::All
    }

    pub fn and(self, other: Filter) -> Self {
        match self {
            Self::And(mut parts) => {
                parts.push(other);
                Self::And(parts)
            }
            first => Self::And(vec![first, other]),
        }
    }

    pub fn or(self, other: Filter) -> Self {
        match self {
            Self::Or(mut parts) => {
                parts.push(other);
                Self::Or(parts)
            }
            first => Self::Or(vec![first, other]),
        }
    }

    fn render(&self, sql: &mut String, params: &mut Vec<Value>) {
        match self {
            Self::All => sql.push('1'),
            Self::Compare { column, op, value } => {
                sql.push_str(column);
                sql.push(' ');
                sql.push_str(op.as_sql());
                sql.push_str(" ?");
                params.push(value.clone());
            }
            Self::IsNull(column) => {
                sql.push_str(column);
                sql.push_str(" IS NULL");
            }
            // An empty IN list matches nothing.
            Self::In { values, .. } if values.is_empty() => sql.push('0'),
            Self::In { column, values } => {
                sql.push_str(column);
                sql.push_str(" IN (");
                sql.push_str(&vec!["?"; values.len()].join(", "));
                sql.push(')');
                params.extend(values.iter().cloned());
            }
            Self::And(parts) => render_joined(parts, " AND ", '1', sql, params),
            Self::Or(parts) => render_joined(parts, " OR ", '0', sql, params),
            Self::Not(inner) => {
                sql.push_str("NOT (");
                inner.render(sql, params);
                sql.push(')');
            }
        }
    }
}

fn render_joined(
    parts: &[Filter],
    separator: &str,
    empty: char,
    sql: &mut String,
    params: &mut Vec<Value>,
) {
    if parts.is_empty() {
        sql.push(empty);
        return;
    }

    sql.push('(');
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            sql.push_str(separator);
        }
        part.render(sql, params);
    }
    sql.push(')');
}

impl BitAnd for Filter {
    type Output = Filter;

    fn bitand(self, rhs: Filter) -> Filter {
        self.and(rhs)
    }
}

impl BitOr for Filter {
    type Output = Filter;

    fn bitor(self, rhs: Filter) -> Filter {
        self.or(rhs)
    }
}

impl Not for Filter {
    type Output = Filter;

    fn not(self) -> Filter {
        Filter::Not(Box::new(self))
    }
}

/// One `ORDER BY` term.
#[derive(Debug, Clone, Copy)]
pub struct Order {
    column: &'static str,
    descending: bool,
}

/// A single-table `SELECT` with optional filter, ordering and limit.
#[derive(Debug)]
pub(crate) struct Select {
    sql: String,
    params: Vec<Value>,
}

impl Select {
    pub(crate) fn new(
        table: &str,
        projection: &str,
        filter: Option<&Filter>,
        order_by: &[Order],
        limit: Option<u32>,
    ) -> Self {
        let mut sql = format!("SELECT {} FROM {}", projection, table);
        let mut params = Vec::new();

        if let Some(filter) = filter {
            sql.push_str(" WHERE ");
            filter.render(&mut sql, &mut params);
        }

        if !order_by.is_empty() {
            let terms: Vec<String> = order_by
                .iter()
                .map(|o| format!("{} {}", o.column, if o.descending { "DESC" } else { "ASC" }))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms.join(", "));
        }

        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        Self { sql, params }
    }

    pub(crate) fn fetch_all<T, F>(&self, conn: &Connection, map: F) -> Result<Vec<T>, DbError>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let mut stmt = conn.prepare(&self.sql)?;
        let rows = stmt
            .query_map(params_from_iter(self.params.iter()), map)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub(crate) fn fetch_first<T, F>(&self, conn: &Connection, map: F) -> Result<Option<T>, DbError>
    where
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        let mut stmt = conn.prepare(&self.sql)?;
        let mut rows = stmt.query(params_from_iter(self.params.iter()))?;
        match rows.next()? {
            Some(row) => Ok(Some(map(row)?)),
            None => Ok(None),
        }
    }
}

/// A persisted record type and the generic reads every record gets.
pub trait Record: Sized {
    const TABLE: &'static str;
    /// Selected in this order and read back positionally by `from_row`.
    const COLUMNS: &'static [&'static str];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// All matching records; empty when nothing matches.
    fn get_all(
        session: &Session,
        filter: Option<&Filter>,
        order_by: &[Order],
    ) -> Result<Vec<Self>, DbError> {
        let select = Select::new(Self::TABLE, &Self::COLUMNS.join(", "), filter, order_by, None);
        session.with_conn(|conn| select.fetch_all(conn, Self::from_row))
    }

    /// First matching record in `order_by` order (store order when empty).
    fn get_first(
        session: &Session,
        filter: Option<&Filter>,
        order_by: &[Order],
    ) -> Result<Option<Self>, DbError> {
        let select = Select::new(Self::TABLE, &Self::COLUMNS.join(", "), filter, order_by, Some(1));
        session.with_conn(|conn| select.fetch_first(conn, Self::from_row))
    }

    /// Like [`get_first`](Self::get_first) but a missing record becomes the
    /// caller's error.
    fn get_one<E, F>(
        session: &Session,
        filter: Option<&Filter>,
        order_by: &[Order],
        not_found: F,
    ) -> Result<Self, E>
    where
        E: From<DbError>,
        F: FnOnce() -> E,
    {
        Self::get_first(session, filter, order_by)?.ok_or_else(not_found)
    }

    /// A single column of the first matching record.
    ///
    /// `None` both when nothing matches and when the matched value is NULL.
    fn get_scalar<T: FromSql>(
        session: &Session,
        column: Column,
        filter: Option<&Filter>,
        order_by: &[Order],
    ) -> Result<Option<T>, DbError> {
        let select = Select::new(Self::TABLE, column.name(), filter, order_by, Some(1));
        let value = session.with_conn(|conn| select.fetch_first(conn, |row| row.get::<_, Option<T>>(0)))?;
        Ok(value.flatten())
    }
}
