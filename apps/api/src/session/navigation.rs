use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::info;

/// Top-level screens the browser can be on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Auth,
    Main,
}

impl Screen {
    pub fn path(self) -> &'static str {
        match self {
            Screen::Auth => "/auth",
            Screen::Main => "/",
        }
    }
}

/// Receives the navigation effects of session transitions.
pub trait Navigator: Send + Sync {
    fn navigate(&self, screen: Screen);
}

/// Publishes the screen the browser should show; the shell endpoint reads it.
pub struct ScreenRouter {
    current: watch::Sender<Screen>,
}

impl ScreenRouter {
    pub fn new(initial: Screen) -> Self {
        let (current, _) = watch::channel(initial);
        Self { current }
    }

    pub fn current(&self) -> Screen {
        *self.current.borrow()
    }

    /// Waits up to `within` for `screen` to become current.
    pub async fn wait_for(&self, screen: Screen, within: Duration) -> bool {
        let mut rx = self.current.subscribe();
        let reached = matches!(
            tokio::time::timeout(within, rx.wait_for(|s| *s == screen)).await,
            Ok(Ok(_))
        );
        reached
    }
}

impl Navigator for ScreenRouter {
    fn navigate(&self, screen: Screen) {
        info!("Navigating to {}", screen.path());
        self.current.send_replace(screen);
    }
}
