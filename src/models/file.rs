use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A durable file record. `uri` is scheme-prefixed (`private://…`,
/// `public://…`, `temporary://…`) so the storage backend stays swappable.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StoredFile {
    pub id: String,
    pub uri: String,
    pub filename: String,
    pub filesize: i64,
    pub filemime: String,
    pub owner_id: String,
    pub created_at: String,
}

impl StoredFile {
    pub fn new(
        owner_id: String,
        uri: String,
        filename: String,
        filesize: i64,
        filemime: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            uri,
            filename,
            filesize,
            filemime,
            owner_id,
            created_at: Utc::now().to_rfc3339(),
        }
    }
}
