use std::sync::Arc;

use s2v_core::error::{ErrorCode, ServiceError, ServiceResult};
use s2v_core::job::StoryJobMessage;
use s2v_core::types::EntityId;
use s2v_db::models::operation::CreateOperation;
use s2v_db::models::shot::Shot;
use s2v_db::models::status::{OperationType, ShotStatus, StoryStatus};
use s2v_db::models::story::{CreateStory, Story};
use s2v_db::{Datastore, OperationStore};
use s2v_queue::JobDispatcher;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{db_failed, fail_operation, OperationHandle};

/// Styles the model service knows how to render.
pub const ALLOWED_STYLES: &[&str] = &["movie", "animation", "realistic"];

#[derive(Debug, Clone, Deserialize)]
pub struct CreateStoryInput {
    pub display_name: String,
    pub script_content: String,
    pub style: String,
}

/// A story together with its ordered shots.
#[derive(Debug, Clone, Serialize)]
pub struct StoryDetail {
    #[serde(flatten)]
    pub story: Story,
    pub shots: Vec<Shot>,
}

pub struct StoryService {
    store: Arc<dyn Datastore>,
    dispatcher: Arc<JobDispatcher>,
}

impl StoryService {
    pub fn new(store: Arc<dyn Datastore>, dispatcher: Arc<JobDispatcher>) -> Self {
        Self { store, dispatcher }
    }

    /// Create a story in `generating` plus its storyboard operation, then
    /// enqueue the job.
    pub async fn create(
        &self,
        user_id: EntityId,
        input: &CreateStoryInput,
    ) -> ServiceResult<OperationHandle> {
        let style = input.style.trim();
        if !ALLOWED_STYLES.contains(&style) {
            return Err(ServiceError::new(
                ErrorCode::InvalidStyle,
                format!("unsupported style: {style:?}"),
            ));
        }
        if input.script_content.trim().is_empty() {
            return Err(ServiceError::new(
                ErrorCode::InvalidRequest,
                "script_content is required",
            ));
        }

        let story = CreateStory {
            id: Uuid::new_v4(),
            user_id,
            title: input.display_name.trim().to_string(),
            script_content: input.script_content.clone(),
            style: style.to_string(),
            status: StoryStatus::Generating,
        };
        let operation = CreateOperation {
            id: Uuid::new_v4(),
            user_id,
            story_id: story.id,
            shot_id: None,
            operation_type: OperationType::CreateStoryboard,
            payload: serde_json::json!({
                "display_name": story.title,
                "style": story.style,
            }),
        };
        let (story, operation) = self
            .store
            .create_story_with_operation(&story, &operation)
            .await
            .map_err(|e| ServiceError::wrap(ErrorCode::OperationCreateFailed, "create story", e))?;

        let job = StoryJobMessage::create_storyboard(
            operation.id,
            story.id,
            user_id,
            &story.title,
            &story.script_content,
            &story.style,
            operation.created_at,
        );
        if let Err(err) = self.dispatcher.dispatch(&job).await {
            fail_operation(&OperationStore::new(Arc::clone(&self.store)), operation.id, &err).await;
            if let Err(e) = self
                .store
                .set_story_status(story.id, user_id, StoryStatus::Failed)
                .await
            {
                tracing::error!(story_id = %story.id, error = %e, "Could not mark story failed");
            }
            return Err(err);
        }

        tracing::info!(
            story_id = %story.id,
            operation_id = %operation.id,
            user_id = %user_id,
            "Story created",
        );
        Ok(OperationHandle::from(&operation))
    }

    /// Load a story with its shots, checking that a `ready` story is complete.
    pub async fn get(&self, user_id: EntityId, story_id: EntityId) -> ServiceResult<StoryDetail> {
        let story = self
            .store
            .find_story(story_id, user_id)
            .await
            .map_err(|e| db_failed("find story", e))?
            .ok_or_else(|| ServiceError::from_code(ErrorCode::StoryNotFound))?;
        let shots = self
            .store
            .list_shots(story_id, user_id)
            .await
            .map_err(|e| db_failed("list shots", e))?;

        validate_story_result(&story, &shots)?;
        Ok(StoryDetail { story, shots })
    }
}

/// Graded completeness check for `ready` stories.
///
/// Checked in order: any shot not `done` (or no shots at all) is
/// `SVC4101`; any shot without details, narration or description is
/// `SVC4102`; any shot without an image is `SVC4103`. Stories in any other
/// status pass unchecked.
pub fn validate_story_result(story: &Story, shots: &[Shot]) -> ServiceResult<()> {
    if story.status != StoryStatus::Ready {
        return Ok(());
    }
    if shots.is_empty() || shots.iter().any(|s| s.status != ShotStatus::Done) {
        return Err(ServiceError::from_code(ErrorCode::ShotMissingPartial));
    }
    if shots
        .iter()
        .any(|s| blank(&s.details) || blank(&s.narration) || blank(&s.description))
    {
        return Err(ServiceError::from_code(ErrorCode::ShotContentMissing));
    }
    if shots.iter().any(|s| blank(&s.image_url)) {
        return Err(ServiceError::from_code(ErrorCode::ShotAssetMissing));
    }
    Ok(())
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn story(status: StoryStatus) -> Story {
        let now = Utc::now();
        Story {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Night Walk".into(),
            script_content: "It was late.".into(),
            style: "movie".into(),
            status,
            cover_url: None,
            video_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn complete_shot(story: &Story, seq: &str) -> Shot {
        let now = Utc::now();
        Shot {
            id: Uuid::new_v4(),
            user_id: story.user_id,
            story_id: story.id,
            sequence: seq.into(),
            title: "Opening".into(),
            description: "A quiet street".into(),
            details: "wide shot".into(),
            narration: "It was late.".into(),
            shot_type: "wide".into(),
            transition: "fade".into(),
            voice: "calm".into(),
            bgm: "piano".into(),
            image_url: format!("http://cdn/{seq}.png"),
            status: ShotStatus::Done,
            created_at: now,
            updated_at: now,
        }
    }

    fn code_of(result: ServiceResult<()>) -> ErrorCode {
        result.unwrap_err().code()
    }

    #[test]
    fn complete_ready_story_passes() {
        let s = story(StoryStatus::Ready);
        let shots = vec![complete_shot(&s, "1"), complete_shot(&s, "2")];
        validate_story_result(&s, &shots).unwrap();
    }

    #[test]
    fn generating_story_is_not_checked() {
        let s = story(StoryStatus::Generating);
        validate_story_result(&s, &[]).unwrap();
    }

    #[test]
    fn ready_story_without_shots_is_partial() {
        let s = story(StoryStatus::Ready);
        assert_eq!(code_of(validate_story_result(&s, &[])), ErrorCode::ShotMissingPartial);
    }

    #[test]
    fn pending_shot_wins_over_missing_content() {
        let s = story(StoryStatus::Ready);
        let mut pending = complete_shot(&s, "1");
        pending.status = ShotStatus::Pending;
        let mut bare = complete_shot(&s, "2");
        bare.narration.clear();
        bare.image_url.clear();

        assert_eq!(
            code_of(validate_story_result(&s, &[pending, bare])),
            ErrorCode::ShotMissingPartial
        );
    }

    #[test]
    fn missing_content_wins_over_missing_image() {
        let s = story(StoryStatus::Ready);
        let mut no_image = complete_shot(&s, "1");
        no_image.image_url.clear();
        let mut no_description = complete_shot(&s, "2");
        no_description.description = "  ".into();

        assert_eq!(
            code_of(validate_story_result(&s, &[no_image, no_description])),
            ErrorCode::ShotContentMissing
        );
    }

    #[test]
    fn missing_image_is_asset_missing() {
        let s = story(StoryStatus::Ready);
        let mut no_image = complete_shot(&s, "1");
        no_image.image_url.clear();

        assert_eq!(
            code_of(validate_story_result(&s, &[no_image])),
            ErrorCode::ShotAssetMissing
        );
    }
}
