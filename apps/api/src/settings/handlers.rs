//! Axum route handlers for the settings panel.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::settings::preferences::{
    load_settings, set_auto_apply, set_minimum_match, toggle_job_type, SettingsView,
};
use crate::state::AppState;

/// The select sends its value as text; API clients may send a number.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ThresholdValue {
    Text(String),
    Number(i64),
}

#[derive(Debug, Deserialize)]
pub struct MinimumMatchRequest {
    pub value: ThresholdValue,
}

#[derive(Debug, Deserialize)]
pub struct AutoApplyRequest {
    pub enabled: bool,
}

/// GET /api/v1/settings
pub async fn handle_get_settings(
    State(state): State<AppState>,
) -> Result<Json<SettingsView>, AppError> {
    let session = state.session.snapshot();
    let view = load_settings(state.data.as_ref(), &session, &state.toasts).await?;
    Ok(Json(view))
}

/// POST /api/v1/settings/job-types/:job_type/toggle
pub async fn handle_toggle_job_type(
    State(state): State<AppState>,
    Path(job_type): Path<String>,
) -> Result<Json<SettingsView>, AppError> {
    let session = state.session.snapshot();
    let view = toggle_job_type(state.data.as_ref(), &session, &state.toasts, &job_type).await?;
    Ok(Json(view))
}

/// PUT /api/v1/settings/minimum-match
pub async fn handle_set_minimum_match(
    State(state): State<AppState>,
    Json(req): Json<MinimumMatchRequest>,
) -> Result<Json<SettingsView>, AppError> {
    let raw = match req.value {
        ThresholdValue::Text(s) => s,
        ThresholdValue::Number(n) => n.to_string(),
    };
    let session = state.session.snapshot();
    let view = set_minimum_match(state.data.as_ref(), &session, &state.toasts, &raw).await?;
    Ok(Json(view))
}

/// PUT /api/v1/settings/auto-apply
pub async fn handle_set_auto_apply(
    State(state): State<AppState>,
    Json(req): Json<AutoApplyRequest>,
) -> Result<Json<SettingsView>, AppError> {
    let session = state.session.snapshot();
    let view = set_auto_apply(state.data.as_ref(), &session, &state.toasts, req.enabled).await?;
    Ok(Json(view))
}
