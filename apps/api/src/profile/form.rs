//! Profile editor: loads the row into an editable form and upserts it back.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::AppError;
use crate::models::identity::Identity;
use crate::models::profile::{Profile, ProfileChanges};
use crate::notify::Toasts;
use crate::remote::DataBackend;
use crate::session::{require_identity, SessionState};

const SIGN_IN_FOR_PROFILE: &str = "You must be logged in to edit your profile";
const INVALID_PORTFOLIO: &str = "Portfolio URL must start with http:// or https://";

/// Editable fields as the browser sends and receives them. Missing fields
/// read as blank.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProfileForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub portfolio_url: String,
    pub summary: String,
    pub desired_job_titles: Vec<String>,
    pub desired_locations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Placeholders {
    pub first_name: &'static str,
    pub last_name: &'static str,
    pub email: &'static str,
    pub phone: &'static str,
    pub portfolio_url: &'static str,
    pub summary: &'static str,
}

pub const PLACEHOLDERS: Placeholders = Placeholders {
    first_name: "John",
    last_name: "Doe",
    email: "john@example.com",
    phone: "+1 (555) 000-0000",
    portfolio_url: "https://your-portfolio.com",
    summary: "Write a brief professional summary...",
};

#[derive(Debug, Serialize)]
pub struct ProfileFormView {
    pub form: ProfileForm,
    pub placeholders: Placeholders,
    /// False until the first save creates the row.
    pub profile_saved: bool,
    pub cv_url: Option<String>,
}

impl ProfileForm {
    /// Fills the form from the stored row. Without a row only the email is
    /// known, taken from the identity.
    pub fn from_profile(profile: Option<&Profile>, identity: &Identity) -> Self {
        let Some(p) = profile else {
            return Self {
                email: identity.email.clone().unwrap_or_default(),
                ..Default::default()
            };
        };
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        Self {
            first_name: text(&p.first_name),
            last_name: text(&p.last_name),
            email: p
                .email
                .clone()
                .or_else(|| identity.email.clone())
                .unwrap_or_default(),
            phone: text(&p.phone),
            portfolio_url: text(&p.portfolio_url),
            summary: text(&p.summary),
            desired_job_titles: p.desired_job_titles.clone().unwrap_or_default(),
            desired_locations: p.desired_locations.clone().unwrap_or_default(),
        }
    }

    /// Column changes for an upsert: blank text becomes null, list entries
    /// are trimmed and deduplicated.
    pub fn to_changes(&self) -> Result<ProfileChanges, &'static str> {
        let portfolio_url = blank_to_null(&self.portfolio_url);
        if let Some(url) = &portfolio_url {
            let lower = url.to_ascii_lowercase();
            if !(lower.starts_with("http://") || lower.starts_with("https://")) {
                return Err(INVALID_PORTFOLIO);
            }
        }
        Ok(ProfileChanges {
            first_name: Some(blank_to_null(&self.first_name)),
            last_name: Some(blank_to_null(&self.last_name)),
            email: Some(blank_to_null(&self.email)),
            phone: Some(blank_to_null(&self.phone)),
            portfolio_url: Some(portfolio_url),
            summary: Some(blank_to_null(&self.summary)),
            desired_job_titles: Some(clean_list(&self.desired_job_titles)),
            desired_locations: Some(clean_list(&self.desired_locations)),
            ..Default::default()
        })
    }
}

fn blank_to_null(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn clean_list(values: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()) {
        if !out.iter().any(|seen| seen.eq_ignore_ascii_case(value)) {
            out.push(value.to_string());
        }
    }
    out
}

fn form_view(profile: Option<&Profile>, identity: &Identity) -> ProfileFormView {
    ProfileFormView {
        form: ProfileForm::from_profile(profile, identity),
        placeholders: PLACEHOLDERS,
        profile_saved: profile.is_some(),
        cv_url: profile.and_then(|p| p.cv_url.clone()),
    }
}

pub async fn load_profile_form(
    data: &dyn DataBackend,
    session: &SessionState,
    toasts: &Toasts,
) -> Result<ProfileFormView, AppError> {
    let identity = require_identity(session, toasts, SIGN_IN_FOR_PROFILE)?;
    let profile = data
        .fetch_profile(identity.id)
        .await
        .map_err(|e| toasts.remote_failure("Failed to load profile", e))?;
    if profile.is_none() {
        debug!("No profile yet for user {}", identity.id);
    }
    Ok(form_view(profile.as_ref(), &identity))
}

/// Upserts the form keyed by the identity id. Saving the same form twice
/// leaves a single row.
pub async fn save_profile_form(
    data: &dyn DataBackend,
    session: &SessionState,
    toasts: &Toasts,
    form: &ProfileForm,
) -> Result<(Profile, ProfileFormView), AppError> {
    let identity = require_identity(session, toasts, SIGN_IN_FOR_PROFILE)?;
    let changes = form.to_changes().map_err(|m| toasts.rejected(m))?;
    let saved = data
        .upsert_profile(identity.id, &changes)
        .await
        .map_err(|e| toasts.remote_failure("Failed to save profile", e))?;

    toasts.success("Profile saved", "Your profile has been updated");
    let view = form_view(Some(&saved), &identity);
    Ok((saved, view))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::ToastVariant;
    use crate::remote::fake::FakeRemote;

    fn signed_in(remote: &FakeRemote) -> (Identity, SessionState) {
        let identity = remote.add_account("u1@x.test", "pw");
        remote.set_session(&identity);
        let session = SessionState::Authenticated {
            identity: identity.clone(),
            profile: None,
        };
        (identity, session)
    }

    #[test]
    fn test_to_changes_blank_becomes_null() {
        let form = ProfileForm {
            first_name: "  John ".to_string(),
            phone: "   ".to_string(),
            ..Default::default()
        };
        let changes = form.to_changes().unwrap();
        assert_eq!(changes.first_name, Some(Some("John".to_string())));
        assert_eq!(changes.phone, Some(None));
        assert_eq!(changes.auto_apply, None);
    }

    #[test]
    fn test_to_changes_cleans_lists() {
        let form = ProfileForm {
            desired_job_titles: vec![
                " Engineer ".to_string(),
                "engineer".to_string(),
                "".to_string(),
                "Designer".to_string(),
            ],
            ..Default::default()
        };
        let changes = form.to_changes().unwrap();
        assert_eq!(
            changes.desired_job_titles,
            Some(vec!["Engineer".to_string(), "Designer".to_string()])
        );
    }

    #[test]
    fn test_to_changes_rejects_non_web_portfolio() {
        let form = ProfileForm {
            portfolio_url: "ftp://me.test".to_string(),
            ..Default::default()
        };
        assert_eq!(form.to_changes(), Err(INVALID_PORTFOLIO));

        let form = ProfileForm {
            portfolio_url: "https://me.test".to_string(),
            ..Default::default()
        };
        assert!(form.to_changes().is_ok());
    }

    #[tokio::test]
    async fn test_missing_profile_gives_empty_form_then_save_creates_row() {
        let remote = FakeRemote::default();
        let (identity, session) = signed_in(&remote);
        let toasts = Toasts::default();

        let view = load_profile_form(&remote, &session, &toasts).await.unwrap();
        assert!(!view.profile_saved);
        assert_eq!(view.form.first_name, "");
        assert_eq!(view.form.email, "u1@x.test");
        assert_eq!(view.placeholders.first_name, "John");

        let form = ProfileForm {
            first_name: "John".to_string(),
            ..Default::default()
        };
        let (saved, view) = save_profile_form(&remote, &session, &toasts, &form)
            .await
            .unwrap();

        assert_eq!(saved.id, identity.id);
        assert!(view.profile_saved);
        let row = remote.profile(identity.id).unwrap();
        assert_eq!(row.first_name.as_deref(), Some("John"));
        assert_eq!(row.last_name, None);
        assert_eq!(toasts.drain()[0].title, "Profile saved");
    }

    #[tokio::test]
    async fn test_saving_twice_keeps_one_row() {
        let remote = FakeRemote::default();
        let (identity, session) = signed_in(&remote);
        let toasts = Toasts::default();
        let form = ProfileForm {
            first_name: "John".to_string(),
            summary: "Backend engineer".to_string(),
            ..Default::default()
        };

        let (first, _) = save_profile_form(&remote, &session, &toasts, &form)
            .await
            .unwrap();
        let (second, _) = save_profile_form(&remote, &session, &toasts, &form)
            .await
            .unwrap();

        assert_eq!(remote.profile_count(), 1);
        assert_eq!(first.first_name, second.first_name);
        assert_eq!(first.summary, second.summary);
        assert_eq!(remote.profile(identity.id).unwrap().summary, second.summary);
    }

    #[tokio::test]
    async fn test_save_keeps_settings_columns() {
        let remote = FakeRemote::default();
        let (identity, session) = signed_in(&remote);
        let mut existing = Profile::empty(identity.id);
        existing.auto_apply = Some(true);
        existing.minimum_match_percentage = Some(90);
        remote.insert_profile(existing);

        let form = ProfileForm {
            last_name: "Doe".to_string(),
            ..Default::default()
        };
        save_profile_form(&remote, &session, &Toasts::default(), &form)
            .await
            .unwrap();

        let row = remote.profile(identity.id).unwrap();
        assert_eq!(row.auto_apply, Some(true));
        assert_eq!(row.minimum_match_percentage, Some(90));
        assert_eq!(row.last_name.as_deref(), Some("Doe"));
    }

    #[tokio::test]
    async fn test_save_failure_toasts_and_writes_nothing() {
        let remote = FakeRemote::default();
        let (_identity, session) = signed_in(&remote);
        *remote.fail_writes.lock().unwrap() = true;
        let toasts = Toasts::default();

        let err = save_profile_form(&remote, &session, &toasts, &ProfileForm::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Remote(_)));
        assert_eq!(remote.profile_count(), 0);
        let shown = toasts.drain();
        assert_eq!(shown[0].variant, ToastVariant::Destructive);
        assert_eq!(shown[0].description, "Failed to save profile");
    }

    #[tokio::test]
    async fn test_profile_form_requires_sign_in() {
        let remote = FakeRemote::default();
        let err = load_profile_form(&remote, &SessionState::Anonymous, &Toasts::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
