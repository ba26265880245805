//! Application history download as CSV or JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::application::{ApplicationStatus, AutomatedApplication};
use crate::notify::Toasts;
use crate::remote::DataBackend;
use crate::session::{require_identity, SessionState};

const FILE_STEM: &str = "application-history";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "csv" => Some(ExportFormat::Csv),
            "json" => Some(ExportFormat::Json),
            _ => None,
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }

    fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    /// `csv` (default) or `json`.
    pub format: Option<String>,
}

/// One exported row. Column order is the CSV header order.
#[derive(Debug, Serialize)]
struct ExportRecord<'a> {
    id: Uuid,
    created_at: DateTime<Utc>,
    job_title: Option<&'a str>,
    company_name: Option<&'a str>,
    job_url: &'a str,
    status: ApplicationStatus,
    match_percentage: Option<i32>,
    cover_letter_sent: bool,
    application_method: Option<&'a str>,
    error_message: Option<&'a str>,
}

impl<'a> From<&'a AutomatedApplication> for ExportRecord<'a> {
    fn from(row: &'a AutomatedApplication) -> Self {
        Self {
            id: row.id,
            created_at: row.created_at,
            job_title: row.job_title.as_deref(),
            company_name: row.company_name.as_deref(),
            job_url: &row.job_url,
            status: row.status(),
            match_percentage: row.match_percentage,
            cover_letter_sent: row.cover_letter_sent.unwrap_or(false),
            application_method: row.application_method.as_deref(),
            error_message: row.error_message.as_deref(),
        }
    }
}

/// A rendered download.
#[derive(Debug)]
pub struct ExportFile {
    pub format: ExportFormat,
    pub file_name: String,
    pub body: Vec<u8>,
}

fn to_csv(records: &[ExportRecord<'_>]) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer
            .serialize(record)
            .map_err(|e| AppError::Export(e.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::Export(e.to_string()))
}

fn to_json(records: &[ExportRecord<'_>]) -> Result<Vec<u8>, AppError> {
    serde_json::to_vec_pretty(records).map_err(|e| AppError::Export(e.to_string()))
}

pub async fn export_applications(
    data: &dyn DataBackend,
    session: &SessionState,
    toasts: &Toasts,
    format: Option<&str>,
) -> Result<ExportFile, AppError> {
    let identity = require_identity(
        session,
        toasts,
        "You must be logged in to export your applications",
    )?;
    let format = match format {
        None => ExportFormat::default(),
        Some(raw) => ExportFormat::parse(raw).ok_or_else(|| {
            toasts.rejected(&format!("Unsupported export format \"{}\"", raw.trim()))
        })?,
    };
    let rows = data
        .list_applications()
        .await
        .map_err(|e| toasts.remote_failure("Failed to export applications", e))?;

    let records: Vec<ExportRecord<'_>> = rows.iter().map(ExportRecord::from).collect();
    let body = match format {
        ExportFormat::Csv => to_csv(&records)?,
        ExportFormat::Json => to_json(&records)?,
    };
    info!(
        "Exported {} applications for user {} as {}",
        records.len(),
        identity.id,
        format.extension()
    );
    Ok(ExportFile {
        format,
        file_name: format!("{FILE_STEM}.{}", format.extension()),
        body,
    })
}
