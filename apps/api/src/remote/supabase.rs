/// Supabase-compatible REST client: GoTrue auth, PostgREST tables and Storage.
///
/// Holds the signed-in session in memory (optionally mirrored to a session
/// file so a restart keeps the user signed in) and broadcasts auth change
/// events to subscribers.
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use reqwest::{header::CONTENT_TYPE, Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::application::{AutomatedApplication, NewApplication};
use crate::models::identity::{Identity, Session};
use crate::models::profile::{Profile, ProfileChanges};
use crate::remote::{
    AuthBackend, AuthEvent, DataBackend, ObjectStorage, RemoteError, SignUp,
};

const PROFILES: &str = "profiles";
const APPLICATIONS: &str = "automated_applications";
const EVENT_CAPACITY: usize = 16;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// How often the auto-refresh task checks the access token.
pub const AUTO_REFRESH_TICK: Duration = Duration::from_secs(30);
/// Refresh once the access token is this close to expiring.
pub const EXPIRY_MARGIN_SECS: i64 = 90;

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct RemoteUser {
    id: Uuid,
    email: Option<String>,
}

impl From<RemoteUser> for Identity {
    fn from(user: RemoteUser) -> Self {
        Identity {
            id: user.id,
            email: user.email,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: RemoteUser,
}

impl TokenResponse {
    fn into_session(self, now: i64) -> Session {
        Session {
            expires_at: self.expires_at.or(self.expires_in.map(|secs| now + secs)),
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            user: self.user.into(),
        }
    }
}

/// Sign-up answers with a full session when email confirmation is disabled,
/// otherwise with the bare user.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(RemoteUser),
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

/// Pulls the human-readable message out of an auth, PostgREST or storage
/// error body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error_description.or(b.msg).or(b.message).or(b.error))
        .unwrap_or_else(|| body.to_string())
}

async fn check(service: &'static str, response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!("{service} returned {status}: {body}");
    Err(RemoteError::Api {
        service,
        status: status.as_u16(),
        message: error_message(&body),
    })
}

/// Public URL of an object in a public bucket.
pub fn public_url(base_url: &str, bucket: &str, path: &str) -> String {
    format!("{base_url}/storage/v1/object/public/{bucket}/{path}")
}

#[derive(Debug, Serialize)]
struct UpsertBody<'a> {
    id: Uuid,
    #[serde(flatten)]
    changes: &'a ProfileChanges,
}

struct Inner {
    http: Client,
    base_url: String,
    anon_key: String,
    session: RwLock<Option<Session>>,
    session_file: Option<PathBuf>,
    events: broadcast::Sender<AuthEvent>,
}

/// The single client for the hosted service. Cheap to clone.
#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<Inner>,
}

impl SupabaseClient {
    pub fn new(
        base_url: &str,
        anon_key: String,
        session_file: Option<PathBuf>,
    ) -> Result<Self, RemoteError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            inner: Arc::new(Inner {
                http,
                base_url: base_url.trim_end_matches('/').to_string(),
                anon_key,
                session: RwLock::new(None),
                session_file,
                events,
            }),
        })
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.inner.base_url, path)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.inner.base_url, table)
    }

    fn emit(&self, event: AuthEvent) {
        debug!("Auth event {}", event.name());
        if self.inner.events.send(event).is_err() {
            debug!("No auth subscribers");
        }
    }

    /// Adds the project key and the user's bearer token (anon key when signed out).
    async fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        let token = self
            .inner
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone())
            .unwrap_or_else(|| self.inner.anon_key.clone());
        builder
            .header("apikey", &self.inner.anon_key)
            .bearer_auth(token)
    }

    async fn store_session(&self, session: Option<Session>) {
        *self.inner.session.write().await = session.clone();

        let Some(path) = &self.inner.session_file else {
            return;
        };
        let result = match &session {
            Some(s) => match serde_json::to_vec(s) {
                Ok(bytes) => tokio::fs::write(path, bytes).await,
                Err(e) => {
                    warn!("Could not encode session: {e}");
                    return;
                }
            },
            None => match tokio::fs::remove_file(path).await {
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                other => other,
            },
        };
        if let Err(e) = result {
            warn!("Could not persist session to {}: {e}", path.display());
        }
    }

    async fn restore(&self) -> Result<Option<Session>, RemoteError> {
        let Some(path) = &self.inner.session_file else {
            return Ok(None);
        };
        match tokio::fs::read(path).await {
            Ok(bytes) => {
                let session: Session = serde_json::from_slice(&bytes)?;
                info!("Restored session for user {}", session.user.id);
                Ok(Some(session))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(RemoteError::Io(e)),
        }
    }

    async fn refresh_with(&self, refresh_token: &str) -> Result<Session, RemoteError> {
        let response = self
            .inner
            .http
            .post(self.auth_url("token"))
            .query(&[("grant_type", "refresh_token")])
            .header("apikey", &self.inner.anon_key)
            .json(&RefreshRequest { refresh_token })
            .send()
            .await?;
        let token: TokenResponse = match check("auth", response).await {
            Ok(response) => response.json().await?,
            Err(e) => {
                // A rejected refresh token cannot be retried; the user must sign in again.
                if e.is_client_error() {
                    warn!("Refresh token rejected, signing out");
                    self.store_session(None).await;
                    self.emit(AuthEvent::SignedOut);
                }
                return Err(e);
            }
        };
        let session = token.into_session(Utc::now().timestamp());
        let previous = self.inner.session.read().await.as_ref().map(|s| s.user.clone());
        self.store_session(Some(session.clone())).await;
        // A changed email on the same account surfaces as a user update.
        match previous {
            Some(user) if user.id == session.user.id && user.email != session.user.email => {
                self.emit(AuthEvent::UserUpdated(session.user.clone()))
            }
            _ => self.emit(AuthEvent::TokenRefreshed(session.user.clone())),
        }
        Ok(session)
    }

    /// Exchanges the held refresh token for a new access token.
    pub async fn refresh_session(&self) -> Result<Session, RemoteError> {
        let refresh_token = self
            .inner
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.refresh_token.clone())
            .ok_or(RemoteError::NoSession)?;
        self.refresh_with(&refresh_token).await
    }

    /// Keeps the access token fresh in the background.
    pub fn spawn_auto_refresh(&self) -> JoinHandle<()> {
        let client = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(AUTO_REFRESH_TICK);
            loop {
                ticker.tick().await;
                let due = client
                    .inner
                    .session
                    .read()
                    .await
                    .as_ref()
                    .map(|s| s.expires_within(Utc::now().timestamp(), EXPIRY_MARGIN_SECS))
                    .unwrap_or(false);
                if due {
                    if let Err(e) = client.refresh_session().await {
                        warn!("Token auto-refresh failed: {e}");
                    }
                }
            }
        })
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, RemoteError> {
        let request = self
            .authorized(
                self.inner
                    .http
                    .get(self.rest_url(table))
                    .query(&[("select", "*")])
                    .query(query),
            )
            .await;
        let rows: Vec<T> = check("database", request.send().await?)
            .await?
            .json()
            .await?;
        Ok(rows)
    }

    async fn write<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        table: &str,
        query: &[(&str, String)],
        prefer: &str,
        body: &B,
    ) -> Result<Vec<T>, RemoteError> {
        let request = self
            .authorized(
                self.inner
                    .http
                    .request(method, self.rest_url(table))
                    .query(query)
                    .header("Prefer", prefer)
                    .json(body),
            )
            .await;
        let rows: Vec<T> = check("database", request.send().await?)
            .await?
            .json()
            .await?;
        Ok(rows)
    }
}

fn missing_row(operation: &str) -> RemoteError {
    RemoteError::Api {
        service: "database",
        status: StatusCode::OK.as_u16(),
        message: format!("{operation} returned no row"),
    }
}

#[async_trait]
impl AuthBackend for SupabaseClient {
    async fn current_session(&self) -> Result<Option<Session>, RemoteError> {
        let held = self.inner.session.read().await.clone();
        let session = match held {
            Some(s) => s,
            None => match self.restore().await? {
                Some(s) => {
                    *self.inner.session.write().await = Some(s.clone());
                    s
                }
                None => return Ok(None),
            },
        };

        if !session.expires_within(Utc::now().timestamp(), 0) {
            return Ok(Some(session));
        }

        match self.refresh_with(&session.refresh_token).await {
            Ok(fresh) => Ok(Some(fresh)),
            Err(e) => {
                warn!("Stored session expired and could not be refreshed: {e}");
                self.store_session(None).await;
                Ok(None)
            }
        }
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUp, RemoteError> {
        let response = self
            .inner
            .http
            .post(self.auth_url("signup"))
            .header("apikey", &self.inner.anon_key)
            .json(&Credentials { email, password })
            .send()
            .await?;
        let body: SignUpResponse = check("auth", response).await?.json().await?;

        match body {
            SignUpResponse::Session(token) => {
                let session = token.into_session(Utc::now().timestamp());
                let identity = session.user.clone();
                self.store_session(Some(session)).await;
                info!("Signed up and signed in user {}", identity.id);
                self.emit(AuthEvent::SignedIn(identity.clone()));
                Ok(SignUp::SignedIn(identity))
            }
            SignUpResponse::User(user) => {
                let identity: Identity = user.into();
                info!("Signed up user {}; confirmation pending", identity.id);
                Ok(SignUp::ConfirmationSent(identity))
            }
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, RemoteError> {
        let response = self
            .inner
            .http
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.inner.anon_key)
            .json(&Credentials { email, password })
            .send()
            .await?;
        let token: TokenResponse = check("auth", response).await?.json().await?;
        let session = token.into_session(Utc::now().timestamp());
        let identity = session.user.clone();
        self.store_session(Some(session)).await;
        info!("Signed in user {}", identity.id);
        self.emit(AuthEvent::SignedIn(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), RemoteError> {
        let token = self
            .inner
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone());

        if let Some(token) = token {
            let response = self
                .inner
                .http
                .post(self.auth_url("logout"))
                .header("apikey", &self.inner.anon_key)
                .bearer_auth(token)
                .send()
                .await?;
            // An unknown or expired token means the remote session is already gone.
            if !matches!(
                response.status(),
                StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND
            ) {
                check("auth", response).await?;
            }
        }

        self.store_session(None).await;
        info!("Signed out");
        self.emit(AuthEvent::SignedOut);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.inner.events.subscribe()
    }
}

#[async_trait]
impl DataBackend for SupabaseClient {
    async fn fetch_profile(&self, id: Uuid) -> Result<Option<Profile>, RemoteError> {
        let rows: Vec<Profile> = self
            .select(
                PROFILES,
                &[("id", format!("eq.{id}")), ("limit", "1".to_string())],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn upsert_profile(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> Result<Profile, RemoteError> {
        let rows: Vec<Profile> = self
            .write(
                Method::POST,
                PROFILES,
                &[("on_conflict", "id".to_string())],
                "resolution=merge-duplicates,return=representation",
                &UpsertBody { id, changes },
            )
            .await?;
        rows.into_iter().next().ok_or_else(|| missing_row("upsert"))
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> Result<Option<Profile>, RemoteError> {
        let rows: Vec<Profile> = self
            .write(
                Method::PATCH,
                PROFILES,
                &[("id", format!("eq.{id}"))],
                "return=representation",
                changes,
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn list_applications(&self) -> Result<Vec<AutomatedApplication>, RemoteError> {
        self.select(APPLICATIONS, &[("order", "created_at.desc".to_string())])
            .await
    }

    async fn insert_application(
        &self,
        new: &NewApplication,
    ) -> Result<AutomatedApplication, RemoteError> {
        let rows: Vec<AutomatedApplication> = self
            .write(
                Method::POST,
                APPLICATIONS,
                &[],
                "return=representation",
                new,
            )
            .await?;
        rows.into_iter().next().ok_or_else(|| missing_row("insert"))
    }
}

#[async_trait]
impl ObjectStorage for SupabaseClient {
    async fn upload_public(
        &self,
        bucket: &str,
        path: &str,
        content_type: &str,
        body: Bytes,
    ) -> Result<String, RemoteError> {
        let url = format!("{}/storage/v1/object/{bucket}/{path}", self.inner.base_url);
        let request = self
            .authorized(
                self.inner
                    .http
                    .post(url)
                    .header("x-upsert", "true")
                    .header(CONTENT_TYPE, content_type)
                    .body(body),
            )
            .await;
        check("storage", request.send().await?).await?;
        info!("Uploaded {bucket}/{path}");
        Ok(public_url(&self.inner.base_url, bucket, path))
    }
}
