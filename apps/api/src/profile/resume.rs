use bytes::Bytes;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::profile::{Profile, ProfileChanges};
use crate::notify::Toasts;
use crate::remote::{DataBackend, ObjectStorage};
use crate::session::{require_identity, SessionState};

pub const MAX_RESUME_BYTES: usize = 10 * 1024 * 1024;
const SIGN_IN_FOR_UPLOAD: &str = "You must be logged in to upload a resume";
const UNSUPPORTED: &str = "Upload a PDF, DOC or DOCX file";
const TOO_LARGE: &str = "Resume must be 10 MB or smaller";
const EMPTY: &str = "The uploaded file is empty";

/// Accepted résumé formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeFormat {
    Pdf,
    Doc,
    Docx,
}

impl ResumeFormat {
    /// Detects the format from the file name's extension.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(ResumeFormat::Pdf),
            "doc" => Some(ResumeFormat::Doc),
            "docx" => Some(ResumeFormat::Docx),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ResumeFormat::Pdf => "pdf",
            ResumeFormat::Doc => "doc",
            ResumeFormat::Docx => "docx",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ResumeFormat::Pdf => "application/pdf",
            ResumeFormat::Doc => "application/msword",
            ResumeFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResumeUpload {
    pub path: String,
    pub cv_url: String,
}

/// Object path for a new upload. A fresh name per upload keeps browser and
/// CDN caches from serving an older file.
pub fn object_path(user_id: Uuid, format: ResumeFormat) -> String {
    format!("{user_id}/{}.{}", Uuid::new_v4(), format.extension())
}

/// Stores the file in the résumé bucket and points the profile's `cv_url` at
/// its public URL.
pub async fn upload_resume(
    data: &dyn DataBackend,
    storage: &dyn ObjectStorage,
    bucket: &str,
    session: &SessionState,
    toasts: &Toasts,
    file_name: &str,
    body: Bytes,
) -> Result<(Profile, ResumeUpload), AppError> {
    let identity = require_identity(session, toasts, SIGN_IN_FOR_UPLOAD)?;
    let format =
        ResumeFormat::from_file_name(file_name).ok_or_else(|| toasts.rejected(UNSUPPORTED))?;
    if body.is_empty() {
        return Err(toasts.rejected(EMPTY));
    }
    if body.len() > MAX_RESUME_BYTES {
        return Err(toasts.rejected(TOO_LARGE));
    }

    let path = object_path(identity.id, format);
    let size = body.len();
    let cv_url = storage
        .upload_public(bucket, &path, format.content_type(), body)
        .await
        .map_err(|e| toasts.remote_failure("Failed to upload resume", e))?;
    info!(
        "Uploaded resume for user {} ({size} bytes) to {bucket}/{path}",
        identity.id
    );

    let changes = ProfileChanges {
        cv_url: Some(Some(cv_url.clone())),
        ..Default::default()
    };
    let profile = data
        .upsert_profile(identity.id, &changes)
        .await
        .map_err(|e| toasts.remote_failure("Failed to save resume link", e))?;

    toasts.success("Resume uploaded", "Your resume has been saved to your profile");
    Ok((profile, ResumeUpload { path, cv_url }))
}
