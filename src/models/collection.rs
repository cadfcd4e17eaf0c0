use std::cmp::Ordering;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A user's collection of media selections. At most one exists per owner.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Collection {
    pub id: String,
    pub owner_id: String,
    pub archive_file_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Collection {
    pub fn new(owner_id: String) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id,
            archive_file_id: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// One (media, optional style) entry. Belongs to exactly one parent:
/// either a live collection or a shared snapshot, never both.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CollectionItem {
    pub id: String,
    pub collection_id: Option<String>,
    pub shared_collection_id: Option<String>,
    pub owner_id: String,
    pub media_id: String,
    pub style_id: Option<String>,
    pub position: i64,
    pub created_at: String,
}

impl CollectionItem {
    pub fn new(
        collection_id: String,
        owner_id: String,
        media_id: String,
        style_id: Option<String>,
        position: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            collection_id: Some(collection_id),
            shared_collection_id: None,
            owner_id,
            media_id,
            style_id,
            position,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    /// Clone this item's selection under a shared snapshot, cutting the
    /// reference to the live parent.
    pub fn clone_for_shared(&self, shared_collection_id: String, position: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            collection_id: None,
            shared_collection_id: Some(shared_collection_id),
            owner_id: self.owner_id.clone(),
            media_id: self.media_id.clone(),
            style_id: self.style_id.clone(),
            position,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    /// Structural equality: same media, and either both styles absent or
    /// the same style.
    pub fn same_selection(&self, other: &CollectionItem) -> bool {
        self.media_id == other.media_id && self.style_id == other.style_id
    }

    /// Deterministic ordering: media id ascending, ties broken by style id
    /// ascending with "no style" first.
    pub fn compare_by_value(a: &CollectionItem, b: &CollectionItem) -> Ordering {
        match a.media_id.cmp(&b.media_id) {
            Ordering::Equal => match (&a.style_id, &b.style_id) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(x), Some(y)) => x.cmp(y),
            },
            other => other,
        }
    }
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
    fn same_selection_requires_matching_style() {
        let plain = item("m1", None);
        let styled = item("m1", Some("thumb"));

        assert!(plain.same_selection(&item("m1", None)));
        assert!(styled.same_selection(&item("m1", Some("thumb"))));
        assert!(!plain.same_selection(&styled));
        assert!(!styled.same_selection(&item("m1", Some("large"))));
        assert!(!plain.same_selection(&item("m2", None)));
    }

    #[test]
    fn compare_is_antisymmetric_and_reflexive() {
        let items = vec![
            item("m1", None),
            item("m1", Some("a")),
            item("m1", Some("b")),
            item("m2", None),
        ];

        for a in &items {
            assert_eq!(CollectionItem::compare_by_value(a, a), Ordering::Equal);
            for b in &items {
                let fwd = CollectionItem::compare_by_value(a, b);
                let rev = CollectionItem::compare_by_value(b, a);
                assert_eq!(fwd, rev.reverse());
            }
        }
    }

    #[test]
    fn no_style_sorts_first() {
        let mut items = vec![
            item("m1", Some("b")),
            item("m1", None),
            item("m1", Some("a")),
        ];
        items.sort_by(CollectionItem::compare_by_value);

        assert_eq!(items[0].style_id, None);
        assert_eq!(items[1].style_id.as_deref(), Some("a"));
        assert_eq!(items[2].style_id.as_deref(), Some("b"));
    }

    #[test]
    fn ordering_consistent_with_equality() {
        let a = item("m1", Some("thumb"));
        let b = item("m1", Some("thumb"));
        assert!(a.same_selection(&b));
        assert_eq!(CollectionItem::compare_by_value(&a, &b), Ordering::Equal);
    }
}
