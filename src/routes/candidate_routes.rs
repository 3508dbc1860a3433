use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use super::extract::JsonBody;

use crate::dto::candidate_dto::{
    ConnectPayload, CreateCandidatePayload, DeleteCandidateResponse, ListCandidatesQuery,
    ProfileUpdatePayload, UpdateCandidatePayload,
};
use crate::middleware::auth::Claims;
use crate::{error::Result, AppState};

pub async fn list_candidates(
    State(state): State<AppState>,
    Query(query): Query<ListCandidatesQuery>,
) -> Result<impl axum::response::IntoResponse> {
    let status = query.status_filter()?;
    let candidates = state.candidate_service.list_candidates(status).await?;
    Ok(Json(candidates))
}

pub async fn create_candidate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    JsonBody(payload): JsonBody<CreateCandidatePayload>,
) -> Result<impl axum::response::IntoResponse> {
    let created_by = claims.user_id().ok();
    let candidate = state
        .candidate_service
        .create_candidate(payload, created_by)
        .await
        .map_err(|e| {
            tracing::warn!("Failed to create candidate: {}", e);
            e
        })?;
    Ok((StatusCode::CREATED, Json(candidate)))
}

pub async fn get_candidate(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl axum::response::IntoResponse> {
    let candidate = state.candidate_service.get_candidate(id).await?;
    Ok(Json(candidate))
}

pub async fn update_candidate(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    JsonBody(payload): JsonBody<UpdateCandidatePayload>,
) -> Result<impl axum::response::IntoResponse> {
    let candidate = state.candidate_service.apply_update(id, payload).await?;
    Ok(Json(candidate))
}

pub async fn delete_candidate(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl axum::response::IntoResponse> {
    state.candidate_service.delete_candidate(id).await?;
    Ok(Json(DeleteCandidateResponse {
        id,
        message: "Deleted successfully".to_string(),
    }))
}

pub async fn connect_candidate(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<ConnectPayload>,
) -> Result<impl axum::response::IntoResponse> {
    let record = state.candidate_service.connect(payload.candidate_id).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn get_own_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl axum::response::IntoResponse> {
    let profile = state.candidate_service.get_profile(claims.user_id()?).await?;
    Ok(Json(profile))
}

pub async fn update_own_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    JsonBody(payload): JsonBody<ProfileUpdatePayload>,
) -> Result<impl axum::response::IntoResponse> {
    let user_id = claims.user_id()?;
    let profile = state.candidate_service.update_profile(user_id, payload).await?;
    Ok(Json(profile))
}
