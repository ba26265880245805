//! Axum route handlers for the dashboard and the application tracker.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::applications::dashboard::{load_dashboard, DashboardView};
use crate::applications::export::{export_applications, ExportQuery};
use crate::applications::tracker::{
    list_applications, submit_job_url, toggle_auto_apply, ApplicationCard, ApplicationFilter,
    ApplicationList, AutoApplyState, SubmitJobRequest,
};
use crate::errors::AppError;
use crate::state::AppState;

/// GET /api/v1/dashboard
pub async fn handle_dashboard(
    State(state): State<AppState>,
) -> Result<Json<DashboardView>, AppError> {
    let session = state.session.snapshot();
    let view = load_dashboard(state.data.as_ref(), &session, &state.toasts).await?;
    Ok(Json(view))
}

/// GET /api/v1/applications?q=&status=
pub async fn handle_list_applications(
    State(state): State<AppState>,
    Query(filter): Query<ApplicationFilter>,
) -> Result<Json<ApplicationList>, AppError> {
    let session = state.session.snapshot();
    let list = list_applications(state.data.as_ref(), &session, &state.toasts, &filter).await?;
    Ok(Json(list))
}

/// POST /api/v1/applications
pub async fn handle_submit_job(
    State(state): State<AppState>,
    Json(req): Json<SubmitJobRequest>,
) -> Result<(StatusCode, Json<ApplicationCard>), AppError> {
    if req.job_url.trim().is_empty() {
        return Err(state.toasts.rejected("job_url is required"));
    }
    let session = state.session.snapshot();
    let card = submit_job_url(state.data.as_ref(), &session, &state.toasts, req).await?;
    Ok((StatusCode::CREATED, Json(card)))
}

/// POST /api/v1/applications/auto-apply/toggle
pub async fn handle_toggle_auto_apply(
    State(state): State<AppState>,
) -> Result<Json<AutoApplyState>, AppError> {
    let session = state.session.snapshot();
    let result = toggle_auto_apply(state.data.as_ref(), &session, &state.toasts).await?;
    Ok(Json(result))
}

/// GET /api/v1/applications/export?format=csv|json
pub async fn handle_export_applications(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.session.snapshot();
    let file = export_applications(
        state.data.as_ref(),
        &session,
        &state.toasts,
        query.format.as_deref(),
    )
    .await?;
    let disposition = format!("attachment; filename=\"{}\"", file.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, file.format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.body,
    ))
}
