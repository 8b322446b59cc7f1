use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::schema::qr_code;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = qr_code)]
pub struct QrCode {
    pub id: i64,
    pub url: String,
    pub file_id: String,
    pub is_active: bool,
    pub expiration_date: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

impl QrCode {
    /// Returns the soft-deleted successor of this record. The stored row is
    /// only mutated once the result is written back through the store.
    pub fn soft_deleted(self, now: NaiveDateTime) -> QrCode {
        QrCode {
            is_active: false,
            deleted_at: Some(now),
            ..self
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = qr_code)]
pub struct NewQrCode {
    pub url: String,
    pub file_id: String,
    pub is_active: bool,
    pub expiration_date: NaiveDateTime,
}
