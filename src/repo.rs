use sqlx::SqlitePool;

use crate::error::Error;
use crate::models::{ImageStyle, MediaAsset, StoredFile};

/// Lookups and inserts for file records.
pub struct FileRepository {
    db: SqlitePool,
}

impl FileRepository {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn load(&self, id: &str) -> Result<Option<StoredFile>, Error> {
        let file: Option<StoredFile> = sqlx::query_as("SELECT * FROM files WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(file)
    }

    pub async fn find_by_uri(&self, uri: &str) -> Result<Option<StoredFile>, Error> {
        let file: Option<StoredFile> =
            sqlx::query_as("SELECT * FROM files WHERE uri = ? ORDER BY created_at LIMIT 1")
                .bind(uri)
                .fetch_optional(&self.db)
                .await?;
        Ok(file)
    }

    pub async fn insert(&self, file: &StoredFile) -> Result<(), Error> {
        sqlx::query(
            "INSERT INTO files (id, uri, filename, filesize, filemime, owner_id, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&file.id)
        .bind(&file.uri)
        .bind(&file.filename)
        .bind(file.filesize)
        .bind(&file.filemime)
        .bind(&file.owner_id)
        .bind(&file.created_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}

/// Lookups for media assets and their slotted files.
pub struct MediaRepository {
    db: SqlitePool,
}

impl MediaRepository {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn load(&self, id: &str) -> Result<Option<MediaAsset>, Error> {
        let media: Option<MediaAsset> = sqlx::query_as("SELECT * FROM media WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(media)
    }

    pub async fn list(&self) -> Result<Vec<MediaAsset>, Error> {
        let media: Vec<MediaAsset> = sqlx::query_as("SELECT * FROM media ORDER BY name, id")
            .fetch_all(&self.db)
            .await?;
        Ok(media)
    }

    /// Files attached to one slot, in stored order.
    pub async fn files_in_slot(
        &self,
        media_id: &str,
        slot: &str,
    ) -> Result<Vec<StoredFile>, Error> {
        let files: Vec<StoredFile> = sqlx::query_as(
            r#"
            SELECT f.* FROM files f
            JOIN media_files mf ON mf.file_id = f.id
            WHERE mf.media_id = ? AND mf.slot = ?
            ORDER BY mf.position
            "#,
        )
        .bind(media_id)
        .bind(slot)
        .fetch_all(&self.db)
        .await?;
        Ok(files)
    }

}

/// Lookups for image styles.
pub struct StyleRepository {
    db: SqlitePool,
}

impl StyleRepository {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn load(&self, id: &str) -> Result<Option<ImageStyle>, Error> {
        let style: Option<ImageStyle> = sqlx::query_as("SELECT * FROM image_styles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(style)
    }

    pub async fn list(&self) -> Result<Vec<ImageStyle>, Error> {
        let styles: Vec<ImageStyle> = sqlx::query_as("SELECT * FROM image_styles ORDER BY id")
            .fetch_all(&self.db)
            .await?;
        Ok(styles)
    }
}
