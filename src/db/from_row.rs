//! Row mapping trait and helpers for reducing boilerplate in queries.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::*;

/// Parse a string column into an enum type, converting parse errors to rusqlite errors.
fn parse_enum<T: std::str::FromStr>(row: &Row, col: usize, col_name: &str) -> rusqlite::Result<T> {
    row.get::<_, String>(col)?.parse::<T>().map_err(|_| {
        rusqlite::Error::InvalidColumnType(col, col_name.to_string(), rusqlite::types::Type::Text)
    })
}

/// Trait for constructing a type from a database row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============ SQL SELECT Constants ============

pub const ORDER_COLS: &str =
    "id, amount, currency, receipt, status, superseded_by, retry_of, created_at, updated_at";

pub const PAYMENT_COLS: &str = "id, order_id, signature_presented, verified, capture_confirmed, status, amount, currency, refunded_amount, failure_reason, created_at, updated_at";

pub const REFUND_COLS: &str =
    "id, gateway_refund_id, payment_id, amount, currency, status, created_at, updated_at";

pub const WEBHOOK_EVENT_COLS: &str =
    "event_id, event_type, payment_id, order_id, raw_body, processed, received_at, processed_at";

// ============ FromRow Implementations ============

impl FromRow for Order {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Order {
            id: row.get(0)?,
            amount: row.get(1)?,
            currency: row.get(2)?,
            receipt: row.get(3)?,
            status: parse_enum(row, 4, "status")?,
            superseded_by: row.get(5)?,
            retry_of: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }
}

impl FromRow for Payment {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Payment {
            id: row.get(0)?,
            order_id: row.get(1)?,
            signature_presented: row.get(2)?,
            verified: row.get::<_, i32>(3)? != 0,
            capture_confirmed: row.get::<_, i32>(4)? != 0,
            status: parse_enum(row, 5, "status")?,
            amount: row.get(6)?,
            currency: row.get(7)?,
            refunded_amount: row.get(8)?,
            failure_reason: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }
}

impl FromRow for Refund {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Refund {
            id: row.get(0)?,
            gateway_refund_id: row.get(1)?,
            payment_id: row.get(2)?,
            amount: row.get(3)?,
            currency: row.get(4)?,
            status: parse_enum(row, 5, "status")?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}

impl FromRow for WebhookEventRecord {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(WebhookEventRecord {
            event_id: row.get(0)?,
            event_type: row.get(1)?,
            payment_id: row.get(2)?,
            order_id: row.get(3)?,
            raw_body: row.get(4)?,
            processed: row.get::<_, i32>(5)? != 0,
            received_at: row.get(6)?,
            processed_at: row.get(7)?,
        })
    }
}
