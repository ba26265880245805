//! Settings panel: automation switch, job-type preferences and the minimum
//! match threshold, all stored on the profile row.

use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::profile::{JobType, MatchThreshold, Profile, ProfileChanges};
use crate::notify::Toasts;
use crate::remote::DataBackend;
use crate::session::{require_identity, SessionState};

pub const SAVE_PROFILE_FIRST: &str = "Save your profile before changing settings";
pub const LAST_JOB_TYPE: &str = "Select at least one job type";
const SIGN_IN_FOR_SETTINGS: &str = "You must be logged in to change settings";
const SIGN_IN_FOR_AUTOMATION: &str = "You must be logged in to change automation settings";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct JobTypeOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SettingsView {
    pub auto_apply: bool,
    pub job_types: Vec<JobTypeOption>,
    pub minimum_match_percentage: i32,
    pub match_choices: Vec<i32>,
    pub profile_saved: bool,
}

/// Selected job types; full-time when the profile has none.
pub fn selected_job_types(profile: Option<&Profile>) -> Vec<JobType> {
    let mut selected: Vec<JobType> = Vec::new();
    for raw in profile.and_then(|p| p.job_types.clone()).unwrap_or_default() {
        let job_type = JobType::from(raw);
        if !selected.contains(&job_type) {
            selected.push(job_type);
        }
    }
    if selected.is_empty() {
        selected.push(JobType::FullTime);
    }
    selected
}

pub fn threshold(profile: Option<&Profile>) -> MatchThreshold {
    profile
        .and_then(|p| p.minimum_match_percentage)
        .and_then(|v| MatchThreshold::new(v.into()))
        .unwrap_or_default()
}

pub fn settings_view(profile: Option<&Profile>) -> SettingsView {
    let selected = selected_job_types(profile);
    let mut options: Vec<JobType> = JobType::OFFERED.to_vec();
    for extra in &selected {
        if !options.contains(extra) {
            options.push(extra.clone());
        }
    }

    SettingsView {
        auto_apply: profile.and_then(|p| p.auto_apply).unwrap_or(false),
        job_types: options
            .iter()
            .map(|t| JobTypeOption {
                value: t.as_str().to_string(),
                label: t.label().to_string(),
                selected: selected.contains(t),
            })
            .collect(),
        minimum_match_percentage: threshold(profile).value(),
        match_choices: MatchThreshold::CHOICES.iter().map(|&c| i32::from(c)).collect(),
        profile_saved: profile.is_some(),
    }
}

/// Flips `job_type` in the selection. Never leaves the selection empty.
pub fn toggle(selected: &[JobType], job_type: JobType) -> Result<Vec<JobType>, &'static str> {
    if selected.contains(&job_type) {
        if selected.len() == 1 {
            return Err(LAST_JOB_TYPE);
        }
        Ok(selected.iter().filter(|t| **t != job_type).cloned().collect())
    } else {
        let mut next = selected.to_vec();
        next.push(job_type);
        Ok(next)
    }
}

/// Updates settings columns on an existing profile row.
pub(crate) async fn update_settings(
    data: &dyn DataBackend,
    id: Uuid,
    changes: &ProfileChanges,
    toasts: &Toasts,
    failure: &str,
) -> Result<Profile, AppError> {
    match data.update_profile(id, changes).await {
        Ok(Some(profile)) => Ok(profile),
        Ok(None) => {
            toasts.failure("Error", SAVE_PROFILE_FIRST);
            Err(AppError::NotFound(SAVE_PROFILE_FIRST.to_string()))
        }
        Err(e) => Err(toasts.remote_failure(failure, e)),
    }
}

/// Writes the automation switch and announces the new mode.
pub(crate) async fn write_auto_apply(
    data: &dyn DataBackend,
    id: Uuid,
    enabled: bool,
    toasts: &Toasts,
) -> Result<Profile, AppError> {
    let changes = ProfileChanges {
        auto_apply: Some(enabled),
        ..Default::default()
    };
    let profile = update_settings(
        data,
        id,
        &changes,
        toasts,
        "Failed to update automation settings",
    )
    .await?;
    if enabled {
        toasts.success(
            "Automation Enabled",
            "Matching jobs will be automatically applied to",
        );
    } else {
        toasts.success(
            "Automation Disabled",
            "Job applications will now require manual approval",
        );
    }
    Ok(profile)
}

async fn current_profile(
    data: &dyn DataBackend,
    id: Uuid,
    toasts: &Toasts,
) -> Result<Option<Profile>, AppError> {
    data.fetch_profile(id)
        .await
        .map_err(|e| toasts.remote_failure("Failed to load settings", e))
}

pub async fn load_settings(
    data: &dyn DataBackend,
    session: &SessionState,
    toasts: &Toasts,
) -> Result<SettingsView, AppError> {
    let identity = require_identity(session, toasts, SIGN_IN_FOR_SETTINGS)?;
    let profile = current_profile(data, identity.id, toasts).await?;
    Ok(settings_view(profile.as_ref()))
}

pub async fn toggle_job_type(
    data: &dyn DataBackend,
    session: &SessionState,
    toasts: &Toasts,
    raw: &str,
) -> Result<SettingsView, AppError> {
    let identity = require_identity(session, toasts, SIGN_IN_FOR_SETTINGS)?;
    let profile = current_profile(data, identity.id, toasts).await?;
    let current = selected_job_types(profile.as_ref());
    let next = toggle(&current, JobType::from(raw.to_string())).map_err(|m| toasts.rejected(m))?;

    let changes = ProfileChanges {
        job_types: Some(next.iter().map(|t| t.as_str().to_string()).collect()),
        ..Default::default()
    };
    let updated = update_settings(
        data,
        identity.id,
        &changes,
        toasts,
        "Failed to update job preferences",
    )
    .await?;

    let labels = next.iter().map(|t| t.label()).collect::<Vec<_>>().join(", ");
    toasts.success("Job preferences updated", &format!("Looking for: {labels}"));
    Ok(settings_view(Some(&updated)))
}

pub async fn set_minimum_match(
    data: &dyn DataBackend,
    session: &SessionState,
    toasts: &Toasts,
    raw: &str,
) -> Result<SettingsView, AppError> {
    let identity = require_identity(session, toasts, SIGN_IN_FOR_SETTINGS)?;
    let threshold = MatchThreshold::parse(raw)
        .ok_or_else(|| toasts.rejected("Minimum match must be one of 75, 80, 85, 90 or 95"))?;

    let changes = ProfileChanges {
        minimum_match_percentage: Some(threshold.value()),
        ..Default::default()
    };
    let updated = update_settings(
        data,
        identity.id,
        &changes,
        toasts,
        "Failed to update minimum match percentage",
    )
    .await?;

    toasts.success(
        "Settings updated",
        &format!("Minimum match percentage set to {}%", threshold.value()),
    );
    Ok(settings_view(Some(&updated)))
}

pub async fn set_auto_apply(
    data: &dyn DataBackend,
    session: &SessionState,
    toasts: &Toasts,
    enabled: bool,
) -> Result<SettingsView, AppError> {
    let identity = require_identity(session, toasts, SIGN_IN_FOR_AUTOMATION)?;
    let updated = write_auto_apply(data, identity.id, enabled, toasts).await?;
    Ok(settings_view(Some(&updated)))
}
