/// Remote data service boundary: the hosted auth, table and object storage
/// APIs every view goes through.
///
/// Nothing outside this module talks HTTP to the hosted service. Views and the
/// session store depend on the traits below; `supabase::SupabaseClient` is the
/// production implementation.
use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::application::{AutomatedApplication, NewApplication};
use crate::models::identity::{Identity, Session};
use crate::models::profile::{Profile, ProfileChanges};

#[cfg(test)]
pub mod fake;
pub mod supabase;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} error (status {status}): {message}")]
    Api {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("No active session")]
    NoSession,

    #[error("Session file error: {0}")]
    Io(#[from] std::io::Error),
}

impl RemoteError {
    /// Message suitable for a notification: the service's own wording when it
    /// sent one.
    pub fn user_message(&self) -> String {
        match self {
            RemoteError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// The service answered with a 4xx status.
    pub fn is_client_error(&self) -> bool {
        matches!(self, RemoteError::Api { status, .. } if (400..500).contains(status))
    }
}

/// Change notification from the auth service.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    /// Answer to the startup session check.
    InitialSession(Option<Identity>),
    SignedIn(Identity),
    SignedOut,
    TokenRefreshed(Identity),
    UserUpdated(Identity),
}

impl AuthEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AuthEvent::InitialSession(_) => "INITIAL_SESSION",
            AuthEvent::SignedIn(_) => "SIGNED_IN",
            AuthEvent::SignedOut => "SIGNED_OUT",
            AuthEvent::TokenRefreshed(_) => "TOKEN_REFRESHED",
            AuthEvent::UserUpdated(_) => "USER_UPDATED",
        }
    }
}

/// Outcome of a sign-up request.
#[derive(Debug, Clone, PartialEq)]
pub enum SignUp {
    /// The account is usable immediately; a `SignedIn` event follows.
    SignedIn(Identity),
    /// The account exists but the email address must be confirmed first.
    ConfirmationSent(Identity),
}

#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// The locally held session, restored or refreshed if necessary.
    async fn current_session(&self) -> Result<Option<Session>, RemoteError>;
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUp, RemoteError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, RemoteError>;
    async fn sign_out(&self) -> Result<(), RemoteError>;
    /// Subscribes to auth change notifications. Dropping the receiver
    /// unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

/// Row operations against the `profiles` and `automated_applications` tables.
#[async_trait]
pub trait DataBackend: Send + Sync {
    /// Single-row lookup by identity id. `Ok(None)` means no row yet.
    async fn fetch_profile(&self, id: Uuid) -> Result<Option<Profile>, RemoteError>;
    /// Insert-or-merge keyed by the primary key.
    async fn upsert_profile(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> Result<Profile, RemoteError>;
    /// Update filtered by id. `Ok(None)` when no row matched.
    async fn update_profile(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> Result<Option<Profile>, RemoteError>;
    /// Rows visible to the current session, newest first.
    async fn list_applications(&self) -> Result<Vec<AutomatedApplication>, RemoteError>;
    async fn insert_application(
        &self,
        new: &NewApplication,
    ) -> Result<AutomatedApplication, RemoteError>;
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Uploads (overwriting) and returns the public URL of the stored object.
    async fn upload_public(
        &self,
        bucket: &str,
        path: &str,
        content_type: &str,
        body: Bytes,
    ) -> Result<String, RemoteError>;
}
