use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A named image transformation producing resized derivatives.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ImageStyle {
    pub id: String,
    pub label: String,
    pub width: i64,
    pub height: i64,
    pub created_at: String,
}
