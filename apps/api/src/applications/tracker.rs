use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::application::{ApplicationStatus, AutomatedApplication, NewApplication};
use crate::notify::Toasts;
use crate::remote::DataBackend;
use crate::session::{require_identity, SessionState};
use crate::settings::preferences::write_auto_apply;

pub const TITLE_PENDING: &str = "Job Title Pending";
pub const COMPANY_PENDING: &str = "Company Pending";
pub const EMPTY_HINT: &str =
    "No automated applications yet. Make sure your profile and job preferences are set up.";
const INVALID_URL: &str = "Enter a valid job URL starting with http:// or https://";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Strong,
    Fair,
    Weak,
}

impl MatchTier {
    pub fn for_percentage(percentage: i32) -> Self {
        match percentage {
            p if p >= 85 => MatchTier::Strong,
            p if p >= 70 => MatchTier::Fair,
            _ => MatchTier::Weak,
        }
    }
}

/// One application as the list shows it.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ApplicationCard {
    pub id: Uuid,
    pub job_url: String,
    pub title: String,
    pub company: String,
    pub status: ApplicationStatus,
    pub status_label: String,
    pub match_percentage: Option<i32>,
    pub match_tier: Option<MatchTier>,
    pub error_message: Option<String>,
    pub job_description: Option<String>,
    pub cover_letter_sent: bool,
    pub application_method: Option<String>,
    /// Pending rows offer a "review match" action.
    pub awaiting_review: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&AutomatedApplication> for ApplicationCard {
    fn from(row: &AutomatedApplication) -> Self {
        let status = row.status();
        Self {
            id: row.id,
            job_url: row.job_url.clone(),
            title: non_blank(row.job_title.as_deref()).unwrap_or(TITLE_PENDING).to_string(),
            company: non_blank(row.company_name.as_deref())
                .unwrap_or(COMPANY_PENDING)
                .to_string(),
            status,
            status_label: status.label(),
            match_percentage: row.match_percentage,
            match_tier: row.match_percentage.map(MatchTier::for_percentage),
            error_message: row.error_message.clone(),
            job_description: row.job_description.clone(),
            cover_letter_sent: row.cover_letter_sent.unwrap_or(false),
            application_method: row.application_method.clone(),
            awaiting_review: status == ApplicationStatus::Pending,
            created_at: row.created_at,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Default, Deserialize)]
pub struct ApplicationFilter {
    /// Case-insensitive match against title, company and URL.
    pub q: Option<String>,
    pub status: Option<ApplicationStatus>,
}

impl ApplicationFilter {
    pub fn matches(&self, row: &AutomatedApplication) -> bool {
        if let Some(status) = self.status {
            if row.status() != status {
                return false;
            }
        }
        let Some(query) = self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) else {
            return true;
        };
        let query = query.to_lowercase();
        [
            row.job_title.as_deref(),
            row.company_name.as_deref(),
            Some(row.job_url.as_str()),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&query))
    }
}

#[derive(Debug, Serialize)]
pub struct ApplicationList {
    pub applications: Vec<ApplicationCard>,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty_hint: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitJobRequest {
    pub job_url: String,
    pub company_name: Option<String>,
    pub job_title: Option<String>,
    pub job_description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AutoApplyState {
    pub auto_apply: bool,
}

/// Accepts absolute http(s) URLs only.
pub fn parse_job_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw.trim()).ok()?;
    let web = matches!(url.scheme(), "http" | "https");
    (web && url.host_str().is_some()).then_some(url)
}

pub async fn list_applications(
    data: &dyn DataBackend,
    session: &SessionState,
    toasts: &Toasts,
    filter: &ApplicationFilter,
) -> Result<ApplicationList, AppError> {
    require_identity(session, toasts, "You must be logged in to view applications")?;
    let rows = data
        .list_applications()
        .await
        .map_err(|e| toasts.remote_failure("Failed to load applications", e))?;

    let total = rows.len();
    let applications: Vec<ApplicationCard> = rows
        .iter()
        .filter(|row| filter.matches(row))
        .map(ApplicationCard::from)
        .collect();
    Ok(ApplicationList {
        applications,
        total,
        empty_hint: (total == 0).then_some(EMPTY_HINT),
    })
}

/// Queues a job for the automation backend as a `pending` application.
pub async fn submit_job_url(
    data: &dyn DataBackend,
    session: &SessionState,
    toasts: &Toasts,
    req: SubmitJobRequest,
) -> Result<ApplicationCard, AppError> {
    let identity = require_identity(session, toasts, "You must be logged in to submit a job")?;
    let job_url = req.job_url.trim().to_string();
    if parse_job_url(&job_url).is_none() {
        return Err(toasts.rejected(INVALID_URL));
    }

    let new = NewApplication {
        job_url,
        user_id: identity.id,
        status: ApplicationStatus::Pending,
        company_name: req.company_name.filter(|v| !v.trim().is_empty()),
        job_title: req.job_title.filter(|v| !v.trim().is_empty()),
        job_description: req.job_description.filter(|v| !v.trim().is_empty()),
    };
    let row = data
        .insert_application(&new)
        .await
        .map_err(|e| toasts.remote_failure("Failed to submit job", e))?;

    toasts.success("Job submitted", "The application is pending automation");
    Ok(ApplicationCard::from(&row))
}

/// Flips the profile's automation switch.
pub async fn toggle_auto_apply(
    data: &dyn DataBackend,
    session: &SessionState,
    toasts: &Toasts,
) -> Result<AutoApplyState, AppError> {
    let identity = require_identity(
        session,
        toasts,
        "You must be logged in to change automation settings",
    )?;
    let current = data
        .fetch_profile(identity.id)
        .await
        .map_err(|e| toasts.remote_failure("Failed to update automation settings", e))?
        .and_then(|p| p.auto_apply)
        .unwrap_or(false);

    let profile = write_auto_apply(data, identity.id, !current, toasts).await?;
    Ok(AutoApplyState {
        auto_apply: profile.auto_apply.unwrap_or(false),
    })
}
