use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The closed set of media kinds the library manages.
///
/// Each kind owns a fixed, ordered list of file slots; resolution walks
/// the slots in order instead of probing arbitrary field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
pub enum MediaKind {
    #[serde(rename = "image")]
    #[sqlx(rename = "image")]
    Image,
    #[serde(rename = "video")]
    #[sqlx(rename = "video")]
    Video,
    #[serde(rename = "document")]
    #[sqlx(rename = "document")]
    Document,
    #[serde(rename = "generic")]
    #[sqlx(rename = "generic")]
    Generic,
}

impl MediaKind {
    /// Human-readable label, used for archive-internal directories.
    pub fn label(self) -> &'static str {
        match self {
            MediaKind::Image => "Image",
            MediaKind::Video => "Video",
            MediaKind::Document => "Document",
            MediaKind::Generic => "Generic",
        }
    }

    /// File slots for this kind, in resolution priority order.
    pub fn file_slots(self) -> &'static [&'static str] {
        match self {
            MediaKind::Image => &["image", "images"],
            MediaKind::Video => &["video_file"],
            MediaKind::Document => &["file", "template_file"],
            MediaKind::Generic => &["files"],
        }
    }

    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "tiff" | "bmp" => MediaKind::Image,
            "mp4" | "mov" | "webm" | "avi" | "mkv" => MediaKind::Video,
            "pdf" | "doc" | "docx" | "xls" | "xlsx" | "ppt" | "pptx" | "txt" => {
                MediaKind::Document
            }
            _ => MediaKind::Generic,
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
            MediaKind::Document => write!(f, "document"),
            MediaKind::Generic => write!(f, "generic"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MediaAsset {
    pub id: String,
    pub kind: MediaKind,
    pub name: String,
    pub owner_id: String,
    pub created_at: String,
    pub updated_at: String,
}

impl MediaAsset {
    pub fn new(owner_id: String, kind: MediaKind, name: String) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            name,
            owner_id,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}
