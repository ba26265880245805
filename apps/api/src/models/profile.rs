use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Row of the `profiles` table. One per identity, keyed by the identity id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub portfolio_url: Option<String>,
    pub cv_url: Option<String>,
    pub summary: Option<String>,
    #[serde(default)]
    pub desired_job_titles: Option<Vec<String>>,
    #[serde(default)]
    pub desired_locations: Option<Vec<String>>,
    #[serde(default)]
    pub job_types: Option<Vec<String>>,
    pub auto_apply: Option<bool>,
    pub minimum_match_percentage: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
impl Profile {
    /// An empty row for `id`, as the database would create it.
    pub fn empty(id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            first_name: None,
            last_name: None,
            email: None,
            phone: None,
            portfolio_url: None,
            cv_url: None,
            summary: None,
            desired_job_titles: None,
            desired_locations: None,
            job_types: None,
            auto_apply: None,
            minimum_match_percentage: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Column changes sent with an upsert or update of a profile row.
///
/// `None` leaves a column out of the payload. For nullable text columns
/// `Some(None)` writes an explicit null.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ProfileChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portfolio_url: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cv_url: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired_job_titles: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired_locations: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_types: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_apply: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_match_percentage: Option<i32>,
}

#[cfg(test)]
impl ProfileChanges {
    /// Writes every present column onto `profile`.
    pub fn apply_to(&self, profile: &mut Profile) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(v) = value {
                *target = v.clone();
            }
        }
        set(&mut profile.first_name, &self.first_name);
        set(&mut profile.last_name, &self.last_name);
        set(&mut profile.email, &self.email);
        set(&mut profile.phone, &self.phone);
        set(&mut profile.portfolio_url, &self.portfolio_url);
        set(&mut profile.cv_url, &self.cv_url);
        set(&mut profile.summary, &self.summary);
        if let Some(v) = &self.desired_job_titles {
            profile.desired_job_titles = Some(v.clone());
        }
        if let Some(v) = &self.desired_locations {
            profile.desired_locations = Some(v.clone());
        }
        if let Some(v) = &self.job_types {
            profile.job_types = Some(v.clone());
        }
        if let Some(v) = self.auto_apply {
            profile.auto_apply = Some(v);
        }
        if let Some(v) = self.minimum_match_percentage {
            profile.minimum_match_percentage = Some(v);
        }
        profile.updated_at = Utc::now();
    }
}

/// Job-type preference. The known values are what the settings panel offers;
/// anything else stored on the row is kept trimmed, and compares without
/// regard to ASCII case.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobType {
    FullTime,
    PartTime,
    Contract,
    Freelance,
    Other(String),
}

impl JobType {
    pub const OFFERED: [JobType; 4] = [
        JobType::FullTime,
        JobType::PartTime,
        JobType::Contract,
        JobType::Freelance,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            JobType::FullTime => "full-time",
            JobType::PartTime => "part-time",
            JobType::Contract => "contract",
            JobType::Freelance => "freelance",
            JobType::Other(s) => s,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            JobType::FullTime => "Full-time",
            JobType::PartTime => "Part-time",
            JobType::Contract => "Contract",
            JobType::Freelance => "Freelance",
            JobType::Other(s) => s,
        }
    }
}

impl From<String> for JobType {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "full-time" | "full_time" | "fulltime" => JobType::FullTime,
            "part-time" | "part_time" | "parttime" => JobType::PartTime,
            "contract" => JobType::Contract,
            "freelance" => JobType::Freelance,
            _ => JobType::Other(value.trim().to_string()),
        }
    }
}

impl PartialEq for JobType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (JobType::Other(a), JobType::Other(b)) => a.eq_ignore_ascii_case(b),
            (a, b) => std::mem::discriminant(a) == std::mem::discriminant(b),
        }
    }
}

impl Hash for JobType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        if let JobType::Other(s) = self {
            s.to_ascii_lowercase().hash(state);
        }
    }
}

impl From<JobType> for String {
    fn from(value: JobType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minimum match percentage a job must reach before automation applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "i32")]
pub struct MatchThreshold(u8);

impl MatchThreshold {
    pub const CHOICES: [u8; 5] = [75, 80, 85, 90, 95];

    pub fn new(value: i64) -> Option<Self> {
        Self::CHOICES
            .iter()
            .copied()
            .find(|c| i64::from(*c) == value)
            .map(MatchThreshold)
    }

    /// Parses the raw select value, e.g. `"90"`.
    pub fn parse(raw: &str) -> Option<Self> {
        raw.trim().parse::<i64>().ok().and_then(Self::new)
    }

    pub fn value(self) -> i32 {
        i32::from(self.0)
    }
}

impl Default for MatchThreshold {
    fn default() -> Self {
        MatchThreshold(85)
    }
}

impl From<MatchThreshold> for i32 {
    fn from(value: MatchThreshold) -> Self {
        value.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_changes_skip_absent_columns() {
        let changes = ProfileChanges {
            first_name: Some(Some("John".to_string())),
            phone: Some(None),
            ..Default::default()
        };
        let json = serde_json::to_value(&changes).unwrap();
        assert_eq!(json, serde_json::json!({"first_name": "John", "phone": null}));
    }

    #[test]
    fn test_apply_changes_clears_and_sets() {
        let mut profile = Profile::empty(Uuid::new_v4());
        profile.phone = Some("555".to_string());
        ProfileChanges {
            first_name: Some(Some("John".to_string())),
            phone: Some(None),
            minimum_match_percentage: Some(90),
            ..Default::default()
        }
        .apply_to(&mut profile);
        assert_eq!(profile.first_name.as_deref(), Some("John"));
        assert_eq!(profile.phone, None);
        assert_eq!(profile.minimum_match_percentage, Some(90));
    }

    #[test]
    fn test_job_type_known_and_open_values() {
        assert_eq!(JobType::from("Full-Time".to_string()), JobType::FullTime);
        assert_eq!(
            JobType::from("internship".to_string()),
            JobType::Other("internship".to_string())
        );
        assert_eq!(String::from(JobType::PartTime), "part-time");
    }

    #[test]
    fn test_open_job_type_is_trimmed_and_case_insensitive() {
        let stored = JobType::from("internship".to_string());
        let typed = JobType::from("  Internship ".to_string());
        assert_eq!(typed, stored);
        assert_eq!(typed.as_str(), "Internship");
        assert_ne!(typed, JobType::Other("apprenticeship".to_string()));
        assert_ne!(JobType::FullTime, JobType::PartTime);
    }

    #[test]
    fn test_threshold_accepts_only_offered_values() {
        assert_eq!(MatchThreshold::parse("90").map(|t| t.value()), Some(90));
        assert!(MatchThreshold::parse("70").is_none());
        assert!(MatchThreshold::parse("ninety").is_none());
        assert_eq!(MatchThreshold::default().value(), 85);
    }
}
