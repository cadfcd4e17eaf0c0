use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An immutable snapshot of a collection, addressable by its share path.
///
/// Written once at share time; afterwards only recipient emails may be
/// appended. The archive is frozen at creation and never regenerated.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SharedCollection {
    pub id: String,
    pub owner_id: String,
    pub url: String,
    pub archive_file_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl SharedCollection {
    pub fn new(owner_id: String) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id,
            url: String::new(),
            archive_file_id: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Relative share path: `/collection/shared/{date}/{id}`.
    pub fn share_path(&self, date: &str) -> String {
        format!("/collection/shared/{}/{}", date, self.id)
    }
}
