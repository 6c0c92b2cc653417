use axum::{extract::State, Json};
use service_core::error::AppError;

use crate::dtos::{
    ApiResponse, CreateImageRequest, CreateRequest, CreateResponse, CreateVideoRequest,
    VideoTaskCreatedResponse,
};
use crate::models::{GenerationKind, ImageGeneration};
use crate::startup::AppState;
use crate::utils::ValidatedPayload;

/// Generate images and wait for the result.
pub async fn create_image(
    State(state): State<AppState>,
    ValidatedPayload(req): ValidatedPayload<CreateImageRequest>,
) -> Result<Json<ApiResponse<ImageGeneration>>, AppError> {
    let query = req.query.unwrap_or_default();
    tracing::info!(
        model = ?req.model,
        aspect = ?req.aspect,
        prompt_len = query.len(),
        "Creating image"
    );

    let generation = state
        .generation
        .create_image(&query, req.model.as_ref(), req.aspect.as_ref())
        .await?;

    tracing::info!(images = generation.images.len(), "Image generation finished");
    Ok(Json(ApiResponse::ok(generation)))
}

/// Submit a video; the result is fetched later through `/task/:taskId`.
pub async fn create_video(
    State(state): State<AppState>,
    ValidatedPayload(req): ValidatedPayload<CreateVideoRequest>,
) -> Result<Json<ApiResponse<VideoTaskCreatedResponse>>, AppError> {
    let query = req.query.unwrap_or_default();
    tracing::info!(prompt_len = query.len(), "Creating video");

    let created = state.generation.create_video(&query).await?;

    Ok(Json(ApiResponse::ok(created.into())))
}

pub async fn create(
    State(state): State<AppState>,
    ValidatedPayload(req): ValidatedPayload<CreateRequest>,
) -> Result<Json<ApiResponse<CreateResponse>>, AppError> {
    let kind = match req.kind.as_deref() {
        None | Some("") => GenerationKind::default(),
        Some(raw) => raw
            .parse::<GenerationKind>()
            .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e)))?,
    };
    let query = req.query.unwrap_or_default();
    tracing::info!(%kind, prompt_len = query.len(), "Creating generation");

    let generation = state
        .generation
        .create(&query, req.model.as_ref(), req.aspect.as_ref(), kind)
        .await?;

    Ok(Json(ApiResponse::ok(generation.into())))
}
