use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::Error;
use crate::models::{Collection, CollectionItem};

/// Owns the per-user collection aggregate and its items.
///
/// A user has at most one collection (enforced by a uniqueness constraint
/// on the owner; a violation surfaces as a database error and requires
/// manual remediation). Items are kept structurally unique via
/// [`CollectionItem::same_selection`].
pub struct CollectionStore {
    db: SqlitePool,
}

impl CollectionStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn load_for_owner(&self, owner_id: &str) -> Result<Option<Collection>, Error> {
        let collection: Option<Collection> =
            sqlx::query_as("SELECT * FROM collections WHERE owner_id = ?")
                .bind(owner_id)
                .fetch_optional(&self.db)
                .await?;
        Ok(collection)
    }

    /// Load the owner's collection, creating and persisting an empty one
    /// when none exists yet.
    pub async fn get_or_create_for_owner(&self, owner_id: &str) -> Result<Collection, Error> {
        if let Some(collection) = self.load_for_owner(owner_id).await? {
            return Ok(collection);
        }

        let collection = Collection::new(owner_id.to_string());
        sqlx::query(
            "INSERT INTO collections (id, owner_id, archive_file_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&collection.id)
        .bind(&collection.owner_id)
        .bind(&collection.archive_file_id)
        .bind(&collection.created_at)
        .bind(&collection.updated_at)
        .execute(&self.db)
        .await?;

        Ok(collection)
    }

    /// Items in stored order.
    pub async fn items(&self, collection: &Collection) -> Result<Vec<CollectionItem>, Error> {
        let items: Vec<CollectionItem> = sqlx::query_as(
            "SELECT * FROM collection_items WHERE collection_id = ? ORDER BY position, created_at",
        )
        .bind(&collection.id)
        .fetch_all(&self.db)
        .await?;
        Ok(items)
    }

    /// Items belonging to a shared snapshot, in stored order.
    pub async fn items_for_shared(&self, shared_id: &str) -> Result<Vec<CollectionItem>, Error> {
        let items: Vec<CollectionItem> = sqlx::query_as(
            "SELECT * FROM collection_items WHERE shared_collection_id = ? ORDER BY position, created_at",
        )
        .bind(shared_id)
        .fetch_all(&self.db)
        .await?;
        Ok(items)
    }

    pub async fn load_item(&self, item_id: &str) -> Result<Option<CollectionItem>, Error> {
        let item: Option<CollectionItem> =
            sqlx::query_as("SELECT * FROM collection_items WHERE id = ?")
                .bind(item_id)
                .fetch_optional(&self.db)
                .await?;
        Ok(item)
    }

    /// Index of the first structurally equal item, linear scan.
    pub async fn item_index_of(
        &self,
        collection: &Collection,
        candidate: &CollectionItem,
    ) -> Result<Option<usize>, Error> {
        let items = self.items(collection).await?;
        Ok(items.iter().position(|item| item.same_selection(candidate)))
    }

    pub async fn has_item(
        &self,
        collection: &Collection,
        candidate: &CollectionItem,
    ) -> Result<bool, Error> {
        Ok(self.item_index_of(collection, candidate).await?.is_some())
    }

    /// Append a (media, optional style) selection. Adding a selection
    /// that is already present is a no-op; returns whether an item was
    /// actually inserted.
    pub async fn add_item(
        &self,
        collection: &Collection,
        media_id: &str,
        style_id: Option<&str>,
    ) -> Result<bool, Error> {
        let items = self.items(collection).await?;
        let position = items.last().map_or(0, |item| item.position + 1);
        let item = CollectionItem::new(
            collection.id.clone(),
            collection.owner_id.clone(),
            media_id.to_string(),
            style_id.map(String::from),
            position,
        );

        if items.iter().any(|existing| existing.same_selection(&item)) {
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO collection_items
                (id, collection_id, shared_collection_id, owner_id, media_id, style_id, position, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&item.id)
        .bind(&item.collection_id)
        .bind(&item.shared_collection_id)
        .bind(&item.owner_id)
        .bind(&item.media_id)
        .bind(&item.style_id)
        .bind(item.position)
        .bind(&item.created_at)
        .execute(&self.db)
        .await?;

        self.touch(collection).await?;

        Ok(true)
    }

    /// Remove every item structurally equal to the given selection.
    ///
    /// Removes all matches rather than the first, guarding against
    /// duplicates inserted through paths that bypassed `add_item`. The
    /// collection is touched even when nothing matched.
    pub async fn remove_item(
        &self,
        collection: &Collection,
        media_id: &str,
        style_id: Option<&str>,
    ) -> Result<u64, Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM collection_items
            WHERE collection_id = ? AND media_id = ?
              AND ((style_id IS NULL AND ? IS NULL) OR (style_id IS NOT NULL AND style_id = ?))
            "#,
        )
        .bind(&collection.id)
        .bind(media_id)
        .bind(style_id)
        .bind(style_id)
        .execute(&self.db)
        .await?;

        self.touch(collection).await?;

        Ok(result.rows_affected())
    }

    /// Delete every item and persist the emptied collection. The
    /// collection row itself survives.
    pub async fn clear(&self, collection: &Collection) -> Result<(), Error> {
        let context = format!(
            "clearing the collection for owner {} failed",
            collection.owner_id
        );

        sqlx::query("DELETE FROM collection_items WHERE collection_id = ?")
            .bind(&collection.id)
            .execute(&self.db)
            .await
            .map_err(|source| Error::Persistence {
                context: context.clone(),
                source,
            })?;

        sqlx::query("UPDATE collections SET archive_file_id = NULL, updated_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(&collection.id)
            .execute(&self.db)
            .await
            .map_err(|source| Error::Persistence { context, source })?;

        Ok(())
    }

    async fn touch(&self, collection: &Collection) -> Result<(), Error> {
        sqlx::query("UPDATE collections SET updated_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(&collection.id)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}
