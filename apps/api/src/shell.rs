//! Shell: the tabbed layout around the views and the gate that keeps every
//! view behind a signed-in session.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
    Json,
};
use serde::Serialize;

use crate::errors::AppError;
use crate::session::machine::SessionState;
use crate::session::navigation::Screen;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tab {
    Dashboard,
    Jobs,
    Profile,
    Settings,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Dashboard, Tab::Jobs, Tab::Profile, Tab::Settings];

    pub fn label(self) -> &'static str {
        match self {
            Tab::Dashboard => "Dashboard",
            Tab::Jobs => "Jobs",
            Tab::Profile => "Profile",
            Tab::Settings => "Settings",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TabView {
    pub id: Tab,
    pub label: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ShellView {
    pub screen: Screen,
    pub user_email: Option<String>,
    pub display_name: Option<String>,
    pub tabs: Vec<TabView>,
    pub default_tab: Tab,
}

pub fn shell_view(session: &SessionState, screen: Screen) -> ShellView {
    let display_name = session.profile().and_then(|p| {
        let name = [p.first_name.as_deref(), p.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        (!name.is_empty()).then_some(name)
    });
    ShellView {
        screen,
        user_email: session.identity().and_then(|i| i.email.clone()),
        display_name,
        tabs: Tab::ALL
            .iter()
            .map(|&id| TabView {
                id,
                label: id.label(),
            })
            .collect(),
        default_tab: Tab::Dashboard,
    }
}

/// Rejects view requests unless someone is signed in.
pub async fn require_session(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    match state.session.snapshot() {
        SessionState::Initializing => Err(AppError::SessionInitializing),
        SessionState::Anonymous => Err(AppError::Unauthorized(
            "Sign in to continue".to_string(),
        )),
        SessionState::Authenticated { .. } => Ok(next.run(request).await),
    }
}

/// GET /api/v1/shell
pub async fn handle_shell(State(state): State<AppState>) -> Json<ShellView> {
    Json(shell_view(&state.session.snapshot(), state.screens.current()))
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::models::identity::Identity;
    use crate::models::profile::Profile;

    #[test]
    fn test_shell_lists_four_tabs_and_user() {
        let id = Uuid::new_v4();
        let mut profile = Profile::empty(id);
        profile.first_name = Some("John".to_string());
        let session = SessionState::Authenticated {
            identity: Identity {
                id,
                email: Some("u1@x.test".to_string()),
            },
            profile: Some(profile),
        };
        let view = shell_view(&session, Screen::Main);
        assert_eq!(view.tabs.len(), 4);
        assert_eq!(view.tabs[1].label, "Jobs");
        assert_eq!(view.user_email.as_deref(), Some("u1@x.test"));
        assert_eq!(view.display_name.as_deref(), Some("John"));
    }

    #[test]
    fn test_shell_without_profile_has_no_name() {
        let view = shell_view(&SessionState::Anonymous, Screen::Auth);
        assert_eq!(view.display_name, None);
        assert_eq!(view.screen, Screen::Auth);
    }
}
