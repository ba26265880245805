use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of an automated application. Transitions happen in the external
/// automation backend; this service only reads them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 4] = [
        ApplicationStatus::Pending,
        ApplicationStatus::InProgress,
        ApplicationStatus::Completed,
        ApplicationStatus::Failed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::InProgress => "in_progress",
            ApplicationStatus::Completed => "completed",
            ApplicationStatus::Failed => "failed",
        }
    }

    /// Human label, e.g. `in progress`.
    pub fn label(self) -> String {
        self.as_str().replace('_', " ")
    }
}

/// Row of the `automated_applications` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AutomatedApplication {
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_url: String,
    pub company_name: Option<String>,
    pub job_title: Option<String>,
    pub job_description: Option<String>,
    pub status: Option<ApplicationStatus>,
    pub error_message: Option<String>,
    pub match_percentage: Option<i32>,
    pub cover_letter_sent: Option<bool>,
    pub application_method: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AutomatedApplication {
    /// Rows written before the status column had a default come back null.
    pub fn status(&self) -> ApplicationStatus {
        self.status.unwrap_or_default()
    }
}

/// Insert payload for a submitted job URL.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewApplication {
    pub job_url: String,
    pub user_id: Uuid,
    pub status: ApplicationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        let json = serde_json::to_string(&ApplicationStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        assert_eq!(ApplicationStatus::InProgress.label(), "in progress");
    }

    #[test]
    fn test_null_status_reads_as_pending() {
        let row: AutomatedApplication = serde_json::from_value(serde_json::json!({
            "id": Uuid::new_v4(),
            "user_id": Uuid::new_v4(),
            "job_url": "https://x.test/job/1",
            "company_name": null,
            "job_title": null,
            "job_description": null,
            "status": null,
            "error_message": null,
            "match_percentage": null,
            "cover_letter_sent": null,
            "application_method": null,
            "created_at": "2024-02-20T10:00:00Z",
            "updated_at": "2024-02-20T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(row.status(), ApplicationStatus::Pending);
    }

    #[test]
    fn test_insert_payload_omits_missing_fields() {
        let new = NewApplication {
            job_url: "https://x.test/job/1".to_string(),
            user_id: Uuid::nil(),
            status: ApplicationStatus::Pending,
            company_name: None,
            job_title: None,
            job_description: None,
        };
        let json = serde_json::to_value(&new).unwrap();
        assert_eq!(json["status"], "pending");
        assert!(json.get("company_name").is_none());
    }
}
