// src/model/entity.rs
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Identity and timestamps shared by persisted records.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EntityMeta {
    pub id: Uuid,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

impl EntityMeta {
    /// Fresh metadata with a random id; both timestamps are now.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            date_created: now,
            date_updated: now,
        }
    }

    /// Metadata for a record loaded from storage.
    pub fn restore(id: Uuid, date_created: DateTime<Utc>, date_updated: DateTime<Utc>) -> Self {
        Self {
            id,
            date_created,
            date_updated,
        }
    }
}

impl Default for EntityMeta {
    fn default() -> Self {
        Self::new()
    }
}

pub trait Entity {
    fn meta(&self) -> &EntityMeta;

    fn meta_mut(&mut self) -> &mut EntityMeta;

    fn id(&self) -> Uuid {
        self.meta().id
    }

    fn set_id(&mut self, id: Uuid) {
        self.meta_mut().id = id;
    }

    fn date_created(&self) -> DateTime<Utc> {
        self.meta().date_created
    }

    fn set_date_created(&mut self, date: DateTime<Utc>) {
        self.meta_mut().date_created = date;
    }

    fn date_updated(&self) -> DateTime<Utc> {
        self.meta().date_updated
    }

    fn set_date_updated(&mut self, date: DateTime<Utc>) {
        self.meta_mut().date_updated = date;
    }

    /// Marks the record as updated now.
    fn touch(&mut self) {
        self.set_date_updated(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    struct Post {
        meta: EntityMeta,
    }

    impl Entity for Post {
        fn meta(&self) -> &EntityMeta {
            &self.meta
        }

        fn meta_mut(&mut self) -> &mut EntityMeta {
            &mut self.meta
        }
    }

    #[test]
    fn test_new_meta_timestamps_match() {
        let meta = EntityMeta::new();
        assert_eq!(meta.date_created, meta.date_updated);
    }

    #[test]
    fn test_touch_moves_only_updated() {
        let created = Utc::now() - Duration::hours(1);
        let mut post = Post {
            meta: EntityMeta::restore(Uuid::new_v4(), created, created),
        };

        post.touch();
        assert_eq!(post.date_created(), created);
        assert!(post.date_updated() > created);
    }

    #[test]
    fn test_setters() {
        let mut post = Post {
            meta: EntityMeta::default(),
        };
        let id = Uuid::new_v4();
        post.set_id(id);
        assert_eq!(post.id(), id);
    }

    #[test]
    fn test_serde_roundtrip_keeps_fields() {
        let meta = EntityMeta::new();
        let json = serde_json::to_string(&meta).unwrap();
        let back: EntityMeta = serde_json::from_str(&json).unwrap();
        assert_eq!(back, meta);
    }
}
