use axum::{
    extract::{Path, State},
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::{ApiResponse, TaskResponse};
use crate::startup::AppState;

/// Current state of a video task. Ids that are not UUIDs are simply unknown.
pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<ApiResponse<TaskResponse>>, AppError> {
    let task = Uuid::parse_str(&task_id)
        .ok()
        .and_then(|id| state.generation.get_video_task(&id))
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Task not found.")))?;

    tracing::debug!(task_id = %task.id, status = ?task.status, "Fetched video task");
    Ok(Json(ApiResponse::ok(task.into())))
}
