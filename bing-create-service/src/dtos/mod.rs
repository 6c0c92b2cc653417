use chrono::{DateTime, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{Aspect, ImageGeneration, Model, SelectorInput, TaskStatus, VideoTask};
use crate::services::{Generation, VideoTaskCreated};

/// Success envelope shared by every JSON endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            timestamp: Utc::now(),
        }
    }
}

/// Non-string values (numbers, objects, null) read as absent so they fail
/// the `required` check instead of the body parser.
fn text_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lenient {
        Text(String),
        Other(IgnoredAny),
    }

    Ok(match Lenient::deserialize(deserializer)? {
        Lenient::Text(text) => Some(text),
        Lenient::Other(_) => None,
    })
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateImageRequest {
    #[serde(default, deserialize_with = "text_or_none")]
    #[validate(
        required(message = "query is required and must be a string."),
        length(min = 1, message = "query is required and must be a string.")
    )]
    pub query: Option<String>,
    #[serde(default)]
    pub model: Option<SelectorInput>,
    #[serde(default)]
    pub aspect: Option<SelectorInput>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateVideoRequest {
    #[serde(default, deserialize_with = "text_or_none")]
    #[validate(
        required(message = "query is required and must be a string."),
        length(min = 1, message = "query is required and must be a string.")
    )]
    pub query: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRequest {
    #[serde(default, deserialize_with = "text_or_none")]
    #[validate(
        required(message = "query is required and must be a string."),
        length(min = 1, message = "query is required and must be a string.")
    )]
    pub query: Option<String>,
    #[serde(default)]
    pub model: Option<SelectorInput>,
    #[serde(default)]
    pub aspect: Option<SelectorInput>,
    /// `image` (default) or `video`.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoTaskCreatedResponse {
    pub task_id: Uuid,
    pub prompt: String,
}

impl From<VideoTaskCreated> for VideoTaskCreatedResponse {
    fn from(created: VideoTaskCreated) -> Self {
        Self {
            task_id: created.task_id,
            prompt: created.prompt,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CreateResponse {
    Image(ImageGeneration),
    Video(VideoTaskCreatedResponse),
}

impl From<Generation> for CreateResponse {
    fn from(generation: Generation) -> Self {
        match generation {
            Generation::Image(image) => CreateResponse::Image(image),
            Generation::Video(video) => CreateResponse::Video(video.into()),
        }
    }
}

/// Public view of a video task.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    pub id: Uuid,
    pub status: TaskStatus,
    pub prompt: String,
    pub video: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<VideoTask> for TaskResponse {
    fn from(task: VideoTask) -> Self {
        let (video, error) = match task.status {
            TaskStatus::Completed => (task.video, None),
            TaskStatus::Failed => (None, task.error),
            TaskStatus::Processing => (None, None),
        };
        Self {
            id: task.id,
            status: task.status,
            prompt: task.prompt,
            video,
            error,
            created_at: task.created_at,
            completed_at: task.completed_at.filter(|_| task.status.is_terminal()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub cookie: &'static str,
    pub session: &'static str,
    pub active_tasks: usize,
}

#[derive(Debug, Serialize)]
pub struct ModelOption {
    pub id: &'static str,
    pub value: u8,
    pub description: &'static str,
}

#[derive(Debug, Serialize)]
pub struct AspectOption {
    pub id: &'static str,
    pub value: u8,
    pub ratio: &'static str,
}

#[derive(Debug, Serialize)]
pub struct OptionsResponse {
    pub models: Vec<ModelOption>,
    pub aspects: Vec<AspectOption>,
}

impl OptionsResponse {
    pub fn catalog() -> Self {
        Self {
            models: Model::ALL
                .iter()
                .map(|m| ModelOption {
                    id: m.name(),
                    value: m.code(),
                    description: m.description(),
                })
                .collect(),
            aspects: Aspect::ALL
                .iter()
                .map(|a| AspectOption {
                    id: a.name(),
                    value: a.code(),
                    ratio: a.ratio(),
                })
                .collect(),
        }
    }
}
