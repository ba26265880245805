use std::sync::Arc;

use crate::config::Config;
use crate::notify::Toasts;
use crate::remote::{AuthBackend, DataBackend, ObjectStorage};
use crate::session::navigation::ScreenRouter;
use crate::session::store::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<SessionStore>,
    pub screens: Arc<ScreenRouter>,
    pub auth: Arc<dyn AuthBackend>,
    pub data: Arc<dyn DataBackend>,
    pub storage: Arc<dyn ObjectStorage>,
    pub toasts: Toasts,
    pub config: Config,
}
