use chrono::NaiveDateTime;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use thiserror::Error;

use crate::models::{NewQrCode, QrCode};
use crate::schema::qr_code;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub fn insert_record(conn: &mut PgConnection, record: NewQrCode) -> StoreResult<QrCode> {
    let inserted = diesel::insert_into(qr_code::table)
        .values(&record)
        .get_result(conn)?;
    Ok(inserted)
}

pub fn update_record(conn: &mut PgConnection, record: &QrCode) -> StoreResult<QrCode> {
    let updated = diesel::update(qr_code::table.find(record.id))
        .set((
            qr_code::url.eq(&record.url),
            qr_code::file_id.eq(&record.file_id),
            qr_code::is_active.eq(record.is_active),
            qr_code::expiration_date.eq(record.expiration_date),
            qr_code::deleted_at.eq(record.deleted_at),
        ))
        .get_result(conn)?;
    Ok(updated)
}

/// Lookup scoped to active records: a soft-deleted record is treated as
/// absent, so repeating a delete surfaces as not-found.
pub fn find_active_by_file_id(
    conn: &mut PgConnection,
    file_id: &str,
) -> StoreResult<Option<QrCode>> {
    let record = qr_code::table
        .filter(qr_code::file_id.eq(file_id))
        .filter(qr_code::is_active.eq(true))
        .first(conn)
        .optional()?;
    Ok(record)
}

pub fn find_expired(conn: &mut PgConnection, now: NaiveDateTime) -> StoreResult<Vec<QrCode>> {
    let records = qr_code::table
        .filter(qr_code::expiration_date.le(now))
        .filter(qr_code::is_active.eq(true))
        .load(conn)?;
    Ok(records)
}

pub fn count_records(conn: &mut PgConnection) -> StoreResult<i64> {
    let count = qr_code::table.count().get_result(conn)?;
    Ok(count)
}
