//! Shot entity, creation DTO and the sparse field set used by upserts.

use s2v_core::sequence::Sequenced;
use s2v_core::types::{EntityId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use super::status::ShotStatus;

/// A row from the `shots` table.
///
/// Free-text columns are never NULL; an empty string means "not set".
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Shot {
    pub id: EntityId,
    pub user_id: EntityId,
    pub story_id: EntityId,
    pub sequence: String,
    pub title: String,
    pub description: String,
    pub details: String,
    pub narration: String,
    #[serde(rename = "type")]
    pub shot_type: String,
    pub transition: String,
    pub voice: String,
    pub bgm: String,
    pub image_url: String,
    pub status: ShotStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Sequenced for Shot {
    fn sequence(&self) -> &str {
        &self.sequence
    }

    fn created_at(&self) -> Timestamp {
        self.created_at
    }
}

/// Content fields of a shot.
///
/// On update, only non-empty values overwrite what is stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShotFields {
    pub sequence: String,
    pub title: String,
    pub description: String,
    pub details: String,
    pub narration: String,
    pub shot_type: String,
    pub transition: String,
    pub voice: String,
    pub bgm: String,
    pub image_url: String,
}

impl ShotFields {
    /// True when no field carries a value.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge into `shot`, keeping stored values where the new one is empty.
    pub fn apply_to(&self, shot: &mut Shot) {
        fn merge(slot: &mut String, value: &str) {
            if !value.is_empty() {
                *slot = value.to_string();
            }
        }
        merge(&mut shot.sequence, &self.sequence);
        merge(&mut shot.title, &self.title);
        merge(&mut shot.description, &self.description);
        merge(&mut shot.details, &self.details);
        merge(&mut shot.narration, &self.narration);
        merge(&mut shot.shot_type, &self.shot_type);
        merge(&mut shot.transition, &self.transition);
        merge(&mut shot.voice, &self.voice);
        merge(&mut shot.bgm, &self.bgm);
        merge(&mut shot.image_url, &self.image_url);
    }
}

/// Fields required to insert a shot.
#[derive(Debug, Clone)]
pub struct CreateShot {
    pub id: EntityId,
    pub user_id: EntityId,
    pub story_id: EntityId,
    pub fields: ShotFields,
    pub status: ShotStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn stored() -> Shot {
        let now = chrono::Utc::now();
        Shot {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            story_id: Uuid::new_v4(),
            sequence: "1".into(),
            title: "Opening".into(),
            description: "A quiet street".into(),
            details: "wide shot".into(),
            narration: "It was late.".into(),
            shot_type: "wide".into(),
            transition: "fade".into(),
            voice: "calm".into(),
            bgm: "piano".into(),
            image_url: "http://x/1.png".into(),
            status: ShotStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn empty_fields_keep_stored_values() {
        let mut shot = stored();
        let before = shot.clone();
        ShotFields::default().apply_to(&mut shot);
        assert_eq!(shot.title, before.title);
        assert_eq!(shot.narration, before.narration);
        assert_eq!(shot.image_url, before.image_url);
    }

    #[test]
    fn default_fields_are_empty() {
        assert!(ShotFields::default().is_empty());
        let fields = ShotFields {
            voice: "warm".into(),
            ..Default::default()
        };
        assert!(!fields.is_empty());
    }

    #[test]
    fn non_empty_fields_overwrite() {
        let mut shot = stored();
        let fields = ShotFields {
            title: "Reprise".into(),
            image_url: "http://x/2.png".into(),
            ..Default::default()
        };
        fields.apply_to(&mut shot);
        assert_eq!(shot.title, "Reprise");
        assert_eq!(shot.image_url, "http://x/2.png");
        assert_eq!(shot.description, "A quiet street");
    }
}
