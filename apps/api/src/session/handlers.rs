//! Axum route handlers for the auth screen and the session snapshot.

use std::time::Duration;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::notify::Toast;
use crate::remote::SignUp;
use crate::session::machine::SessionState;
use crate::session::navigation::Screen;
use crate::state::AppState;

/// How long a sign-in/out request waits for the auth notification to land.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session: SessionState,
    pub screen: Screen,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toast: Option<Toast>,
}

impl SessionResponse {
    fn now(state: &AppState, toast: Option<Toast>) -> Self {
        Self {
            session: state.session.snapshot(),
            screen: state.screens.current(),
            toast,
        }
    }
}

fn validate_credentials(state: &AppState, req: &CredentialsRequest) -> Result<(), AppError> {
    if req.email.trim().is_empty() || !req.email.contains('@') {
        return Err(state.toasts.rejected("Enter a valid email address"));
    }
    if req.password.is_empty() {
        return Err(state.toasts.rejected("Enter your password"));
    }
    Ok(())
}

/// GET /api/v1/session
pub async fn handle_get_session(State(state): State<AppState>) -> Json<SessionResponse> {
    Json(SessionResponse::now(&state, None))
}

/// POST /api/v1/auth/sign-up
pub async fn handle_sign_up(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    validate_credentials(&state, &req)?;
    info!("Signing up with email: {}", req.email.trim());

    let outcome = state
        .auth
        .sign_up(req.email.trim(), &req.password)
        .await
        .map_err(|e| state.toasts.remote_failure(&e.user_message(), e))?;

    let toast = state.toasts.success(
        "Account created!",
        "Please check your email to verify your account.",
    );
    if let SignUp::SignedIn(identity) = outcome {
        state
            .session
            .wait_for(SETTLE_TIMEOUT, |s| s.identity().map(|i| i.id) == Some(identity.id))
            .await;
    }
    Ok(Json(SessionResponse::now(&state, Some(toast))))
}

/// POST /api/v1/auth/sign-in
///
/// Navigation to the main screen is left to the `SignedIn` notification.
pub async fn handle_sign_in(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    validate_credentials(&state, &req)?;
    info!("Signing in with email: {}", req.email.trim());

    let identity = state
        .auth
        .sign_in(req.email.trim(), &req.password)
        .await
        .map_err(|e| state.toasts.remote_failure(&e.user_message(), e))?;

    state
        .session
        .wait_for(SETTLE_TIMEOUT, |s| s.identity().map(|i| i.id) == Some(identity.id))
        .await;
    state.screens.wait_for(Screen::Main, SETTLE_TIMEOUT).await;
    Ok(Json(SessionResponse::now(&state, None)))
}

/// POST /api/v1/auth/sign-out
pub async fn handle_sign_out(
    State(state): State<AppState>,
) -> Result<Json<SessionResponse>, AppError> {
    state
        .session
        .sign_out()
        .await
        .map_err(|e| state.toasts.remote_failure("Failed to sign out", e))?;

    state
        .session
        .wait_for(SETTLE_TIMEOUT, |s| *s == SessionState::Anonymous)
        .await;
    state.screens.wait_for(Screen::Auth, SETTLE_TIMEOUT).await;
    Ok(Json(SessionResponse::now(&state, None)))
}
