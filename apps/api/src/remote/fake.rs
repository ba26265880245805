//! In-memory stand-in for the hosted service, used by unit tests.
//!
//! Behaves like the real backend where the views can observe it: rows are
//! scoped to the signed-in user, upserts merge by primary key and listings
//! come back newest first.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Duration, Utc};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::application::{AutomatedApplication, NewApplication};
use crate::models::identity::{Identity, Session};
use crate::models::profile::{Profile, ProfileChanges};
use crate::remote::{AuthBackend, AuthEvent, DataBackend, ObjectStorage, RemoteError, SignUp};

#[derive(Default)]
struct Tables {
    accounts: HashMap<String, (String, Identity)>,
    session: Option<Session>,
    profiles: HashMap<Uuid, Profile>,
    applications: Vec<AutomatedApplication>,
    objects: HashMap<String, (String, Bytes)>,
}

pub struct FakeRemote {
    tables: Mutex<Tables>,
    events: broadcast::Sender<AuthEvent>,
    pub fail_sign_out: Mutex<bool>,
    pub fail_profile_fetch: Mutex<bool>,
    pub fail_writes: Mutex<bool>,
    pub profile_fetches: AtomicUsize,
}

impl Default for FakeRemote {
    fn default() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            tables: Mutex::new(Tables::default()),
            events,
            fail_sign_out: Mutex::new(false),
            fail_profile_fetch: Mutex::new(false),
            fail_writes: Mutex::new(false),
            profile_fetches: AtomicUsize::new(0),
        }
    }
}

fn unavailable() -> RemoteError {
    RemoteError::Api {
        service: "database",
        status: 503,
        message: "service unavailable".to_string(),
    }
}

impl FakeRemote {
    /// Registers an account without signing it in.
    pub fn add_account(&self, email: &str, password: &str) -> Identity {
        let identity = Identity {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
        };
        self.tables.lock().unwrap().accounts.insert(
            email.to_string(),
            (password.to_string(), identity.clone()),
        );
        identity
    }

    /// Puts a session in place as if it had been restored from storage.
    pub fn set_session(&self, identity: &Identity) {
        self.tables.lock().unwrap().session = Some(Session {
            access_token: format!("at-{}", identity.id),
            refresh_token: format!("rt-{}", identity.id),
            expires_at: Some(Utc::now().timestamp() + 3_600),
            user: identity.clone(),
        });
    }

    pub fn insert_profile(&self, profile: Profile) {
        self.tables
            .lock()
            .unwrap()
            .profiles
            .insert(profile.id, profile);
    }

    pub fn profile(&self, id: Uuid) -> Option<Profile> {
        self.tables.lock().unwrap().profiles.get(&id).cloned()
    }

    pub fn profile_count(&self) -> usize {
        self.tables.lock().unwrap().profiles.len()
    }

    /// Seeds an application row created `age_days` ago.
    pub fn seed_application(
        &self,
        user_id: Uuid,
        job_url: &str,
        status: crate::models::application::ApplicationStatus,
        match_percentage: Option<i32>,
        age_days: i64,
    ) -> AutomatedApplication {
        let created_at = Utc::now() - Duration::days(age_days);
        let row = AutomatedApplication {
            id: Uuid::new_v4(),
            user_id,
            job_url: job_url.to_string(),
            company_name: None,
            job_title: None,
            job_description: None,
            status: Some(status),
            error_message: None,
            match_percentage,
            cover_letter_sent: Some(false),
            application_method: None,
            created_at,
            updated_at: created_at,
        };
        self.tables.lock().unwrap().applications.push(row.clone());
        row
    }

    pub fn object(&self, path: &str) -> Option<(String, Bytes)> {
        self.tables.lock().unwrap().objects.get(path).cloned()
    }

    fn emit(&self, event: AuthEvent) {
        let _ = self.events.send(event);
    }

    fn check_writes(&self) -> Result<(), RemoteError> {
        if *self.fail_writes.lock().unwrap() {
            return Err(unavailable());
        }
        Ok(())
    }
}

#[async_trait]
impl AuthBackend for FakeRemote {
    async fn current_session(&self) -> Result<Option<Session>, RemoteError> {
        Ok(self.tables.lock().unwrap().session.clone())
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUp, RemoteError> {
        let mut tables = self.tables.lock().unwrap();
        if tables.accounts.contains_key(email) {
            return Err(RemoteError::Api {
                service: "auth",
                status: 422,
                message: "User already registered".to_string(),
            });
        }
        let identity = Identity {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
        };
        tables
            .accounts
            .insert(email.to_string(), (password.to_string(), identity.clone()));
        Ok(SignUp::ConfirmationSent(identity))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, RemoteError> {
        let identity = {
            let tables = self.tables.lock().unwrap();
            match tables.accounts.get(email) {
                Some((stored, identity)) if stored == password => identity.clone(),
                _ => {
                    return Err(RemoteError::Api {
                        service: "auth",
                        status: 400,
                        message: "Invalid login credentials".to_string(),
                    })
                }
            }
        };
        self.set_session(&identity);
        self.emit(AuthEvent::SignedIn(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), RemoteError> {
        if *self.fail_sign_out.lock().unwrap() {
            return Err(RemoteError::Api {
                service: "auth",
                status: 500,
                message: "logout failed".to_string(),
            });
        }
        self.tables.lock().unwrap().session = None;
        self.emit(AuthEvent::SignedOut);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

#[async_trait]
impl DataBackend for FakeRemote {
    async fn fetch_profile(&self, id: Uuid) -> Result<Option<Profile>, RemoteError> {
        self.profile_fetches.fetch_add(1, Ordering::SeqCst);
        if *self.fail_profile_fetch.lock().unwrap() {
            return Err(unavailable());
        }
        Ok(self.profile(id))
    }

    async fn upsert_profile(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> Result<Profile, RemoteError> {
        self.check_writes()?;
        let mut tables = self.tables.lock().unwrap();
        let row = tables
            .profiles
            .entry(id)
            .or_insert_with(|| Profile::empty(id));
        changes.apply_to(row);
        Ok(row.clone())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> Result<Option<Profile>, RemoteError> {
        self.check_writes()?;
        let mut tables = self.tables.lock().unwrap();
        Ok(tables.profiles.get_mut(&id).map(|row| {
            changes.apply_to(row);
            row.clone()
        }))
    }

    async fn list_applications(&self) -> Result<Vec<AutomatedApplication>, RemoteError> {
        let tables = self.tables.lock().unwrap();
        let Some(owner) = tables.session.as_ref().map(|s| s.user.id) else {
            return Ok(Vec::new());
        };
        let mut rows: Vec<_> = tables
            .applications
            .iter()
            .filter(|a| a.user_id == owner)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn insert_application(
        &self,
        new: &NewApplication,
    ) -> Result<AutomatedApplication, RemoteError> {
        self.check_writes()?;
        let now = Utc::now();
        let row = AutomatedApplication {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            job_url: new.job_url.clone(),
            company_name: new.company_name.clone(),
            job_title: new.job_title.clone(),
            job_description: new.job_description.clone(),
            status: Some(new.status),
            error_message: None,
            match_percentage: None,
            cover_letter_sent: Some(false),
            application_method: None,
            created_at: now,
            updated_at: now,
        };
        self.tables.lock().unwrap().applications.push(row.clone());
        Ok(row)
    }
}

#[async_trait]
impl ObjectStorage for FakeRemote {
    async fn upload_public(
        &self,
        bucket: &str,
        path: &str,
        content_type: &str,
        body: Bytes,
    ) -> Result<String, RemoteError> {
        self.check_writes()?;
        self.tables
            .lock()
            .unwrap()
            .objects
            .insert(path.to_string(), (content_type.to_string(), body));
        Ok(format!("https://fake.test/storage/v1/object/public/{bucket}/{path}"))
    }
}
