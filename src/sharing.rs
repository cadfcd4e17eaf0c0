use std::sync::{Arc, LazyLock};

use chrono::Utc;
use regex::Regex;
use sqlx::SqlitePool;
use url::Url;

use crate::collection_store::CollectionStore;
use crate::downloads::ArchiveOrchestrator;
use crate::error::Error;
use crate::models::{CollectionItem, SharedCollection};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

pub fn is_valid_email(candidate: &str) -> bool {
    EMAIL_RE.is_match(candidate)
}

/// Join a share path onto the configured base URL.
pub fn absolute_share_url(base_url: &str, share_path: &str) -> String {
    Url::parse(base_url)
        .and_then(|base| base.join(share_path))
        .map(String::from)
        .unwrap_or_else(|_| format!("{}{}", base_url.trim_end_matches('/'), share_path))
}

/// Per-candidate outcome of adding recipient emails.
#[derive(Debug, Default, serde::Serialize)]
pub struct EmailAddOutcome {
    pub added: Vec<String>,
    pub duplicates: Vec<String>,
    pub invalid: Vec<String>,
}

/// Snapshots collections into immutable shared copies.
///
/// Sharing is idempotent: a collection whose owner and item set match an
/// existing share (set comparison, order ignored) reuses that share
/// instead of creating a new one.
pub struct SharingService {
    db: SqlitePool,
    store: Arc<CollectionStore>,
    orchestrator: Arc<ArchiveOrchestrator>,
}

impl SharingService {
    pub fn new(
        db: SqlitePool,
        store: Arc<CollectionStore>,
        orchestrator: Arc<ArchiveOrchestrator>,
    ) -> Self {
        Self {
            db,
            store,
            orchestrator,
        }
    }

    /// Share the owner's current collection. Returns the share and
    /// whether it was newly created.
    pub async fn share_for_owner(&self, owner_id: &str) -> Result<(SharedCollection, bool), Error> {
        let collection = self
            .store
            .load_for_owner(owner_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("collection for user {owner_id}")))?;

        let source_items = self.store.items(&collection).await?;

        if let Some(existing) = self.find_matching_share(owner_id, &source_items).await? {
            return Ok((existing, false));
        }

        let date = Utc::now().format("%Y-%m-%d").to_string();
        let mut shared = SharedCollection::new(owner_id.to_string());
        shared.url = shared.share_path(&date);

        // Persist before cloning so the items reference a stable identity.
        sqlx::query(
            "INSERT INTO shared_collections (id, owner_id, url, archive_file_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&shared.id)
        .bind(&shared.owner_id)
        .bind(&shared.url)
        .bind(&shared.archive_file_id)
        .bind(&shared.created_at)
        .bind(&shared.updated_at)
        .execute(&self.db)
        .await?;

        let cloned = self.clone_items(&source_items, &shared).await?;

        // The archive is frozen once; an empty collection shares without
        // one rather than failing the flow.
        let archive = self
            .orchestrator
            .archive_items(
                owner_id,
                &cloned,
                &format!("private://collection/shared/{date}/{}", shared.id),
                "Collection",
            )
            .await?;

        if let Some(archive) = &archive {
            sqlx::query("UPDATE shared_collections SET archive_file_id = ?, updated_at = ? WHERE id = ?")
                .bind(&archive.id)
                .bind(Utc::now().to_rfc3339())
                .bind(&shared.id)
                .execute(&self.db)
                .await?;
            shared.archive_file_id = Some(archive.id.clone());
        } else {
            tracing::warn!("Shared collection {} has no archivable files", shared.id);
        }

        Ok((shared, true))
    }

    pub async fn load_shared(&self, id: &str) -> Result<Option<SharedCollection>, Error> {
        let shared: Option<SharedCollection> =
            sqlx::query_as("SELECT * FROM shared_collections WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.db)
                .await?;
        Ok(shared)
    }

    /// Recipient emails explicitly attached to a share, in added order.
    pub async fn emails(&self, shared_id: &str) -> Result<Vec<String>, Error> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT email FROM shared_collection_emails WHERE shared_collection_id = ? ORDER BY position",
        )
        .bind(shared_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(|(email,)| email).collect())
    }

    /// Attach recipient emails. Candidates are trimmed and validated;
    /// invalid addresses and duplicates are reported back rather than
    /// silently swallowed.
    pub async fn add_recipient_emails(
        &self,
        shared: &SharedCollection,
        candidates: &[String],
    ) -> Result<EmailAddOutcome, Error> {
        let mut existing = self.emails(&shared.id).await?;
        let mut position = existing.len() as i64;
        let mut outcome = EmailAddOutcome::default();

        for candidate in candidates {
            let email = candidate.trim();

            if !is_valid_email(email) {
                outcome.invalid.push(candidate.clone());
                continue;
            }

            if existing.iter().any(|e| e == email) {
                outcome.duplicates.push(email.to_string());
                continue;
            }

            sqlx::query(
                "INSERT INTO shared_collection_emails (shared_collection_id, email, position) VALUES (?, ?, ?)",
            )
            .bind(&shared.id)
            .bind(email)
            .bind(position)
            .execute(&self.db)
            .await?;

            existing.push(email.to_string());
            outcome.added.push(email.to_string());
            position += 1;
        }

        Ok(outcome)
    }

    /// Find an existing share whose item set matches the source items.
    async fn find_matching_share(
        &self,
        owner_id: &str,
        source_items: &[CollectionItem],
    ) -> Result<Option<SharedCollection>, Error> {
        let candidates: Vec<SharedCollection> = sqlx::query_as(
            "SELECT * FROM shared_collections WHERE owner_id = ? ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.db)
        .await?;

        for candidate in candidates {
            let shared_items = self.store.items_for_shared(&candidate.id).await?;
            if item_sets_match(source_items, &shared_items) {
                return Ok(Some(candidate));
            }
        }

        Ok(None)
    }

    async fn clone_items(
        &self,
        source_items: &[CollectionItem],
        shared: &SharedCollection,
    ) -> Result<Vec<CollectionItem>, Error> {
        let mut cloned = Vec::with_capacity(source_items.len());

        for (position, item) in source_items.iter().enumerate() {
            let copy = item.clone_for_shared(shared.id.clone(), position as i64);
            sqlx::query(
                r#"
                INSERT INTO collection_items
                    (id, collection_id, shared_collection_id, owner_id, media_id, style_id, position, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&copy.id)
            .bind(&copy.collection_id)
            .bind(&copy.shared_collection_id)
            .bind(&copy.owner_id)
            .bind(&copy.media_id)
            .bind(&copy.style_id)
            .bind(copy.position)
            .bind(&copy.created_at)
            .execute(&self.db)
            .await?;
            cloned.push(copy);
        }

        Ok(cloned)
    }
}

/// Set equality over items: same cardinality and every item in one side
/// has a structural match on the other.
fn item_sets_match(reference: &[CollectionItem], test: &[CollectionItem]) -> bool {
    if reference.len() != test.len() {
        return false;
    }

    let mut reference: Vec<&CollectionItem> = reference.iter().collect();
    let mut test: Vec<&CollectionItem> = test.iter().collect();
    reference.sort_by(|a, b| CollectionItem::compare_by_value(a, b));
    test.sort_by(|a, b| CollectionItem::compare_by_value(a, b));

    reference
        .iter()
        .zip(test.iter())
        .all(|(a, b)| a.same_selection(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(media: &str, style: Option<&str>) -> CollectionItem {
        CollectionItem::new(
            "col".to_string(),
            "owner".to_string(),
            media.to_string(),
            style.map(String::from),
            0,
        )
    }

    #[test]
    fn item_sets_match_ignores_order() {
        let a = vec![item("m1", Some("thumb")), item("m2", None)];
        let b = vec![item("m2", None), item("m1", Some("thumb"))];
        assert!(item_sets_match(&a, &b));
        assert!(item_sets_match(&b, &a));
    }

    #[test]
    fn item_sets_with_different_members_do_not_match() {
        let a = vec![item("m1", None)];
        let b = vec![item("m2", None)];
        let c = vec![item("m1", None), item("m2", None)];
        assert!(!item_sets_match(&a, &b));
        assert!(!item_sets_match(&a, &c));
        assert!(!item_sets_match(&c, &a));
    }

    #[test]
    fn style_distinguishes_set_members() {
        let a = vec![item("m1", Some("thumb"))];
        let b = vec![item("m1", None)];
        assert!(!item_sets_match(&a, &b));
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("first.last@sub.domain.org"));
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("user@nodot"));
        assert!(!is_valid_email("spaces in@example.com"));
    }

    #[test]
    fn absolute_share_url_joins_base() {
        assert_eq!(
            absolute_share_url("http://localhost:3000", "/collection/shared/2025-01-01/abc"),
            "http://localhost:3000/collection/shared/2025-01-01/abc"
        );
        assert_eq!(
            absolute_share_url("https://dam.example.com/", "/collection/shared/2025-01-01/abc"),
            "https://dam.example.com/collection/shared/2025-01-01/abc"
        );
    }
}
