use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::profile::Profile;
use crate::remote::{AuthBackend, AuthEvent, DataBackend, RemoteError};
use crate::session::machine::{transition, Effect, SessionState};
use crate::session::navigation::Navigator;

/// Process-wide source of truth for who is signed in and their profile.
///
/// Only the store's own event handling mutates the state; everyone else reads
/// snapshots or subscribes to changes.
pub struct SessionStore {
    auth: Arc<dyn AuthBackend>,
    data: Arc<dyn DataBackend>,
    navigator: Arc<dyn Navigator>,
    state: watch::Sender<SessionState>,
}

/// Running subscription to auth change notifications. Dropping it (or calling
/// `unsubscribe`) stops the listener task.
pub struct AuthListener {
    handle: JoinHandle<()>,
}

impl AuthListener {
    pub fn unsubscribe(self) {
        info!("Unsubscribing from auth notifications");
    }
}

impl Drop for AuthListener {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl SessionStore {
    pub fn new(
        auth: Arc<dyn AuthBackend>,
        data: Arc<dyn DataBackend>,
        navigator: Arc<dyn Navigator>,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(SessionState::Initializing);
        Arc::new(Self {
            auth,
            data,
            navigator,
            state,
        })
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Waits up to `within` for a state matching `pred`.
    pub async fn wait_for(
        &self,
        within: Duration,
        pred: impl FnMut(&SessionState) -> bool,
    ) -> Option<SessionState> {
        let mut rx = self.state.subscribe();
        let found = match tokio::time::timeout(within, rx.wait_for(pred)).await {
            Ok(Ok(state)) => Some(state.clone()),
            _ => None,
        };
        found
    }

    /// Starts consuming auth change notifications.
    pub fn spawn_listener(self: &Arc<Self>) -> AuthListener {
        let store = Arc::clone(self);
        let mut events = self.auth.subscribe();
        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => store.handle_event(event).await,
                    Err(RecvError::Lagged(missed)) => {
                        warn!("Auth listener lagged, {missed} events dropped")
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("Auth event stream closed");
        });
        AuthListener { handle }
    }

    /// Asks the auth service for an existing session and leaves `Initializing`.
    pub async fn initialize(&self) {
        let found = match self.auth.current_session().await {
            Ok(session) => session.map(|s| s.user),
            Err(e) => {
                error!("Initial session check failed: {e}");
                None
            }
        };
        match &found {
            Some(identity) => info!("Initial session found for user {}", identity.id),
            None => info!("No initial session"),
        }
        self.handle_event(AuthEvent::InitialSession(found)).await;
    }

    pub async fn handle_event(&self, event: AuthEvent) {
        info!("Auth state changed: {}", event.name());

        let mut effects = Vec::new();
        self.state.send_modify(|state| {
            let t = transition(state, &event);
            *state = t.next;
            effects = t.effects;
        });

        for effect in effects {
            match effect {
                Effect::FetchProfile(id) => self.load_profile(id).await,
                Effect::Navigate(screen) => self.navigator.navigate(screen),
            }
        }
    }

    /// Requests sign-out. On success the `SignedOut` notification performs the
    /// transition; on failure the state is left as it was.
    pub async fn sign_out(&self) -> Result<(), RemoteError> {
        info!("Signing out");
        self.auth.sign_out().await.map_err(|e| {
            error!("Error signing out: {e}");
            e
        })
    }

    async fn load_profile(&self, id: Uuid) {
        debug!("Fetching profile for user {id}");
        let profile = match self.data.fetch_profile(id).await {
            Ok(Some(profile)) => Some(profile),
            Ok(None) => {
                info!("No profile yet for user {id}");
                None
            }
            Err(e) => {
                error!("Error fetching profile for user {id}: {e}");
                return;
            }
        };

        if !self.apply_profile(id, profile) {
            debug!("Discarding profile for user {id}: identity changed while fetching");
        }
    }

    /// Records a profile row the caller just wrote, so the snapshot does not
    /// lag behind the remote row until the next auth event.
    pub fn profile_saved(&self, profile: Profile) {
        let id = profile.id;
        if !self.apply_profile(id, Some(profile)) {
            debug!("Ignoring saved profile for user {id}: no longer signed in");
        }
    }

    /// Stores `profile` only while `id` is still the held identity.
    fn apply_profile(&self, id: Uuid, profile: Option<Profile>) -> bool {
        self.state.send_if_modified(|state| match state {
            SessionState::Authenticated {
                identity,
                profile: held,
            } if identity.id == id => {
                *held = profile;
                true
            }
            _ => false,
        })
    }
}
