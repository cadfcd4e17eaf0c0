use sqlx::SqlitePool;
use std::fs;
use uuid::Uuid;

use crate::models::{MediaAsset, MediaKind, StoredFile};
use crate::storage::{FileStorage, LocalStorage};

pub async fn create_user(
    pool: &SqlitePool,
    name: &str,
    email: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let id = Uuid::new_v4().to_string();
    let invite_code = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        "INSERT INTO users (id, name, email, invite_code, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(name)
    .bind(email)
    .bind(&invite_code)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    println!("Created user:");
    println!("  ID: {}", id);
    println!("  Name: {}", name);
    println!("  Invite Code: {}", invite_code);

    Ok(())
}

fn mime_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

/// Bulk-import every regular file in a directory as a media asset owned
/// by the given user. Files land in the private storage area; each one
/// becomes a media record of the kind inferred from its extension.
pub async fn import_media(
    pool: &SqlitePool,
    storage: &LocalStorage,
    dir: &str,
    owner_id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    // Verify user exists before importing
    let user_exists: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE id = ?")
        .bind(owner_id)
        .fetch_one(pool)
        .await?;

    if user_exists.0 == 0 {
        return Err(format!("User with ID '{}' not found", owner_id).into());
    }

    let mut entries: Vec<_> = fs::read_dir(dir)?.filter_map(|e| e.ok()).collect();
    entries.sort_by_key(|e| e.file_name());

    let mut imported = 0;
    let mut tx = pool.begin().await?;

    for entry in entries {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let filename = entry.file_name().to_string_lossy().into_owned();
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default();
        let kind = MediaKind::from_extension(&extension);
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| filename.clone());

        let contents = fs::read(&path)?;
        let uri = format!("private://media/{filename}");
        storage.write(&uri, &contents)?;

        let file = StoredFile::new(
            owner_id.to_string(),
            uri,
            filename,
            contents.len() as i64,
            mime_for_extension(&extension).to_string(),
        );
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
        .execute(&mut *tx)
        .await?;

        let media = MediaAsset::new(owner_id.to_string(), kind, name);
        sqlx::query(
            "INSERT INTO media (id, kind, name, owner_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&media.id)
        .bind(media.kind)
        .bind(&media.name)
        .bind(&media.owner_id)
        .bind(&media.created_at)
        .bind(&media.updated_at)
        .execute(&mut *tx)
        .await?;

        // Imported files land in the kind's primary slot.
        sqlx::query(
            "INSERT INTO media_files (media_id, slot, file_id, position) VALUES (?, ?, ?, ?)",
        )
        .bind(&media.id)
        .bind(kind.file_slots()[0])
        .bind(&file.id)
        .bind(0)
        .execute(&mut *tx)
        .await?;

        imported += 1;
    }

    tx.commit().await?;
    println!("Imported {} media assets", imported);
    Ok(())
}
