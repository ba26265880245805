pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::services::ServeDir;

use crate::applications::handlers as applications;
use crate::notify::handle_drain_toasts;
use crate::profile::handlers as profile;
use crate::profile::resume::MAX_RESUME_BYTES;
use crate::session::handlers as session;
use crate::settings::handlers as settings;
use crate::shell::{handle_shell, require_session};
use crate::state::AppState;

/// Room for multipart framing around a maximum-size file.
const UPLOAD_OVERHEAD: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    // Views: only reachable with a signed-in session
    let views = Router::new()
        .route("/api/v1/shell", get(handle_shell))
        .route("/api/v1/dashboard", get(applications::handle_dashboard))
        .route(
            "/api/v1/applications",
            get(applications::handle_list_applications).post(applications::handle_submit_job),
        )
        .route(
            "/api/v1/applications/export",
            get(applications::handle_export_applications),
        )
        .route(
            "/api/v1/applications/auto-apply/toggle",
            post(applications::handle_toggle_auto_apply),
        )
        .route(
            "/api/v1/profile",
            get(profile::handle_get_profile).put(profile::handle_save_profile),
        )
        .route(
            "/api/v1/profile/resume",
            post(profile::handle_upload_resume)
                .layer(DefaultBodyLimit::max(MAX_RESUME_BYTES + UPLOAD_OVERHEAD)),
        )
        .route("/api/v1/settings", get(settings::handle_get_settings))
        .route(
            "/api/v1/settings/job-types/:job_type/toggle",
            post(settings::handle_toggle_job_type),
        )
        .route(
            "/api/v1/settings/minimum-match",
            put(settings::handle_set_minimum_match),
        )
        .route(
            "/api/v1/settings/auto-apply",
            put(settings::handle_set_auto_apply),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    let router = Router::new()
        .route("/health", get(health::health_handler))
        // Auth screen
        .route("/api/v1/session", get(session::handle_get_session))
        .route("/api/v1/auth/sign-up", post(session::handle_sign_up))
        .route("/api/v1/auth/sign-in", post(session::handle_sign_in))
        .route("/api/v1/auth/sign-out", post(session::handle_sign_out))
        .route("/api/v1/toasts", get(handle_drain_toasts))
        .merge(views);

    let router = match &state.config.static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };
    router.with_state(state)
}
