//! Axum route handlers for the profile editor.

use axum::{
    extract::{Multipart, State},
    Json,
};

use crate::errors::AppError;
use crate::profile::form::{load_profile_form, save_profile_form, ProfileForm, ProfileFormView};
use crate::profile::resume::{upload_resume, ResumeUpload};
use crate::state::AppState;

/// Multipart field carrying the file.
const FILE_FIELD: &str = "file";

/// GET /api/v1/profile
pub async fn handle_get_profile(
    State(state): State<AppState>,
) -> Result<Json<ProfileFormView>, AppError> {
    let session = state.session.snapshot();
    let view = load_profile_form(state.data.as_ref(), &session, &state.toasts).await?;
    Ok(Json(view))
}

/// PUT /api/v1/profile
pub async fn handle_save_profile(
    State(state): State<AppState>,
    Json(form): Json<ProfileForm>,
) -> Result<Json<ProfileFormView>, AppError> {
    let session = state.session.snapshot();
    let (saved, view) =
        save_profile_form(state.data.as_ref(), &session, &state.toasts, &form).await?;
    state.session.profile_saved(saved);
    Ok(Json(view))
}

/// POST /api/v1/profile/resume (multipart, field `file`)
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ResumeUpload>, AppError> {
    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let body = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
        file = Some((file_name, body));
        break;
    }
    let (file_name, body) =
        file.ok_or_else(|| state.toasts.rejected("Choose a resume file to upload"))?;

    let session = state.session.snapshot();
    let (profile, upload) = upload_resume(
        state.data.as_ref(),
        state.storage.as_ref(),
        &state.config.resume_bucket,
        &session,
        &state.toasts,
        &file_name,
        body,
    )
    .await?;
    state.session.profile_saved(profile);
    Ok(Json(upload))
}
