// Session store: who is signed in and their profile, driven by auth events.
// The transition table is pure (machine.rs); store.rs runs its effects.

pub mod handlers;
pub mod machine;
pub mod navigation;
pub mod store;

use crate::errors::AppError;
use crate::models::identity::Identity;
use crate::notify::Toasts;

pub use machine::SessionState;

/// The signed-in identity, or a notification plus `Unauthorized` when the
/// action needs one and there is none.
pub fn require_identity(
    session: &SessionState,
    toasts: &Toasts,
    message: &str,
) -> Result<Identity, AppError> {
    match session {
        SessionState::Authenticated { identity, .. } => Ok(identity.clone()),
        SessionState::Initializing => Err(AppError::SessionInitializing),
        SessionState::Anonymous => {
            toasts.failure("Error", message);
            Err(AppError::Unauthorized(message.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::notify::ToastVariant;

    #[test]
    fn test_require_identity_anonymous_toasts() {
        let toasts = Toasts::default();
        let err = require_identity(&SessionState::Anonymous, &toasts, "Sign in first").unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        let shown = toasts.drain();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].variant, ToastVariant::Destructive);
        assert_eq!(shown[0].description, "Sign in first");
    }

    #[test]
    fn test_require_identity_initializing_is_silent() {
        let toasts = Toasts::default();
        let err = require_identity(&SessionState::Initializing, &toasts, "x").unwrap_err();
        assert!(matches!(err, AppError::SessionInitializing));
        assert!(toasts.drain().is_empty());
    }

    #[test]
    fn test_require_identity_authenticated() {
        let identity = Identity {
            id: Uuid::new_v4(),
            email: None,
        };
        let state = SessionState::Authenticated {
            identity: identity.clone(),
            profile: None,
        };
        assert_eq!(
            require_identity(&state, &Toasts::default(), "x").unwrap(),
            identity
        );
    }
}
