//! Route guards.
//!
//! Two gates exist: any signed-in user, and signed-in admins. While the auth
//! state is unresolved a gate neither allows nor redirects.

use serde::Serialize;

use crate::session::AuthState;

/// Access requirement of a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Authenticated,
    Admin,
}

/// Routes a guard can send the user to
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Login,
    Dashboard,
    Admin,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::Dashboard => "/dashboard",
            Self::Admin => "/admin",
        }
    }
}

/// Decision of a guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Auth state not known yet; show a loading indicator
    Loading,
    Allow,
    Redirect(Route),
}

/// Evaluate a gate against the current auth state
pub fn evaluate(gate: Gate, state: &AuthState) -> GuardOutcome {
    match state {
        AuthState::Loading => GuardOutcome::Loading,
        AuthState::SignedOut => GuardOutcome::Redirect(Route::Login),
        AuthState::SignedIn { profile, .. } => match gate {
            Gate::Authenticated => GuardOutcome::Allow,
            Gate::Admin if profile.is_admin() => GuardOutcome::Allow,
            Gate::Admin => GuardOutcome::Redirect(Route::Dashboard),
        },
    }
}
