//! Toast notifications: one per user-visible outcome, drained by the browser.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use axum::{extract::State, Json};
use serde::Serialize;
use tracing::{error, info};

use crate::errors::AppError;
use crate::remote::RemoteError;
use crate::state::AppState;

const MAX_PENDING: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastVariant {
    Default,
    Destructive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub title: String,
    pub description: String,
    pub variant: ToastVariant,
}

/// Bounded queue of notifications not yet shown. Oldest are dropped first.
#[derive(Clone, Default)]
pub struct Toasts {
    pending: Arc<Mutex<VecDeque<Toast>>>,
}

impl Toasts {
    fn push(&self, toast: Toast) -> Toast {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if pending.len() == MAX_PENDING {
            pending.pop_front();
        }
        pending.push_back(toast.clone());
        toast
    }

    pub fn success(&self, title: &str, description: &str) -> Toast {
        info!("Toast: {title}: {description}");
        self.push(Toast {
            title: title.to_string(),
            description: description.to_string(),
            variant: ToastVariant::Default,
        })
    }

    pub fn failure(&self, title: &str, description: &str) -> Toast {
        info!("Error toast: {title}: {description}");
        self.push(Toast {
            title: title.to_string(),
            description: description.to_string(),
            variant: ToastVariant::Destructive,
        })
    }

    /// Reports a failed remote call and converts it for the HTTP layer.
    pub fn remote_failure(&self, description: &str, err: RemoteError) -> AppError {
        error!("{description}: {err}");
        self.failure("Error", description);
        AppError::Remote(err)
    }

    /// Reports a rejected input and converts it for the HTTP layer.
    pub fn rejected(&self, description: &str) -> AppError {
        self.failure("Error", description);
        AppError::Validation(description.to_string())
    }

    pub fn drain(&self) -> Vec<Toast> {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect()
    }
}

/// GET /api/v1/toasts
pub async fn handle_drain_toasts(State(state): State<AppState>) -> Json<Vec<Toast>> {
    Json(state.toasts.drain())
}
