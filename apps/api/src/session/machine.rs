//! Session transition table.
//!
//! `transition` is pure: it maps the held state and an auth event to the next
//! state plus the effects the store must run (profile lookup, navigation).

use serde::Serialize;
use uuid::Uuid;

use crate::models::identity::Identity;
use crate::models::profile::Profile;
use crate::remote::AuthEvent;
use crate::session::navigation::Screen;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionState {
    Initializing,
    Anonymous,
    Authenticated {
        identity: Identity,
        profile: Option<Profile>,
    },
}

impl SessionState {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::Authenticated { identity, .. } => Some(identity),
            _ => None,
        }
    }

    pub fn profile(&self) -> Option<&Profile> {
        match self {
            SessionState::Authenticated { profile, .. } => profile.as_ref(),
            _ => None,
        }
    }

    fn identity_id(&self) -> Option<Uuid> {
        self.identity().map(|i| i.id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    FetchProfile(Uuid),
    Navigate(Screen),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next: SessionState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn stay(state: &SessionState) -> Self {
        Transition {
            next: state.clone(),
            effects: Vec::new(),
        }
    }
}

/// Holds `identity`, keeping the current profile only if the id is unchanged.
/// A changed id (including none → some) schedules a profile lookup.
fn hold_identity(state: &SessionState, identity: &Identity) -> Transition {
    if state.identity_id() == Some(identity.id) {
        Transition {
            next: SessionState::Authenticated {
                identity: identity.clone(),
                profile: state.profile().cloned(),
            },
            effects: Vec::new(),
        }
    } else {
        Transition {
            next: SessionState::Authenticated {
                identity: identity.clone(),
                profile: None,
            },
            effects: vec![Effect::FetchProfile(identity.id)],
        }
    }
}

pub fn transition(state: &SessionState, event: &AuthEvent) -> Transition {
    match event {
        AuthEvent::InitialSession(found) => {
            // The startup answer only counts while nothing else has happened.
            if *state != SessionState::Initializing {
                return Transition::stay(state);
            }
            match found {
                Some(identity) => hold_identity(state, identity),
                None => Transition {
                    next: SessionState::Anonymous,
                    effects: Vec::new(),
                },
            }
        }
        AuthEvent::SignedIn(identity) => {
            // Navigate first so the screen never waits on the profile lookup.
            let mut t = hold_identity(state, identity);
            t.effects.insert(0, Effect::Navigate(Screen::Main));
            t
        }
        AuthEvent::SignedOut => Transition {
            next: SessionState::Anonymous,
            effects: vec![Effect::Navigate(Screen::Auth)],
        },
        AuthEvent::TokenRefreshed(identity) | AuthEvent::UserUpdated(identity) => {
            hold_identity(state, identity)
        }
    }
}
