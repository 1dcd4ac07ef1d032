//! Explicit auth session.
//!
//! One [`AuthSession`] is built at startup and handed to whatever needs the
//! signed-in user. Its state is published on a watch channel; `restore`,
//! `sign_in`, `sign_up` and `sign_out` are the only places that change it.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::backend::AuthBackend;
use crate::error::{AuthError, AuthResult};
use crate::guard::{evaluate, Gate, GuardOutcome};
use crate::types::{AuthSessionData, AuthTokens, AuthUser, Profile};

/// What is known about the current user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// Not resolved yet
    Loading,
    SignedOut,
    SignedIn {
        session: AuthSessionData,
        profile: Profile,
    },
}

impl AuthState {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Loading)
    }

    pub fn user(&self) -> Option<&AuthUser> {
        match self {
            Self::SignedIn { session, .. } => Some(&session.user),
            _ => None,
        }
    }

    pub fn profile(&self) -> Option<&Profile> {
        match self {
            Self::SignedIn { profile, .. } => Some(profile),
            _ => None,
        }
    }

    pub fn session(&self) -> Option<&AuthSessionData> {
        match self {
            Self::SignedIn { session, .. } => Some(session),
            _ => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.profile().map(Profile::is_admin).unwrap_or(false)
    }
}

/// Result of a sign-up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    SignedIn,
    /// The account exists but the email must be confirmed before signing in
    ConfirmationPending,
}

/// Signed-in user, session tokens and profile, with change notifications
pub struct AuthSession {
    backend: Arc<dyn AuthBackend>,
    state: watch::Sender<AuthState>,
}

impl AuthSession {
    /// Create a session in the `Loading` state
    pub fn new(backend: Arc<dyn AuthBackend>) -> Self {
        let (state, _) = watch::channel(AuthState::Loading);
        Self { backend, state }
    }

    pub fn backend(&self) -> &Arc<dyn AuthBackend> {
        &self.backend
    }

    /// Receive every state change from now on
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Snapshot of the current state
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.state.borrow().user().cloned()
    }

    pub fn profile(&self) -> Option<Profile> {
        self.state.borrow().profile().cloned()
    }

    pub fn is_admin(&self) -> bool {
        self.state.borrow().is_admin()
    }

    /// Tokens of the signed-in user, or `NotSignedIn`
    pub fn tokens(&self) -> AuthResult<AuthTokens> {
        self.state
            .borrow()
            .session()
            .map(|s| s.tokens.clone())
            .ok_or(AuthError::NotSignedIn)
    }

    /// Resolve the initial state from a previously stored session
    pub async fn restore(&self, stored: Option<AuthSessionData>) -> AuthState {
        match stored {
            Some(session) => {
                debug!("Restoring session for user {}", session.user.id);
                let profile = self.resolve_profile(&session).await;
                self.publish(AuthState::SignedIn { session, profile })
            }
            None => self.publish(AuthState::SignedOut),
        }
    }

    /// Sign in with email and password.
    ///
    /// On failure the previous state is restored and the service's error is
    /// returned for the caller to show.
    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthState> {
        info!("Attempting to sign in with: {}", email);
        let previous = self.begin_loading();

        match self.backend.sign_in(email, password).await {
            Ok(session) => {
                let profile = self.resolve_profile(&session).await;
                Ok(self.publish(AuthState::SignedIn { session, profile }))
            }
            Err(e) => {
                warn!("Sign in error: {}", e);
                self.publish(resolved_or_signed_out(previous));
                Err(e)
            }
        }
    }

    /// Register a new account, signing in when the service allows it
    pub async fn sign_up(&self, email: &str, password: &str) -> AuthResult<SignUpOutcome> {
        info!("Attempting to sign up with: {}", email);
        let previous = self.begin_loading();

        match self.backend.sign_up(email, password).await {
            Ok(Some(session)) => {
                let profile = self.resolve_profile(&session).await;
                self.publish(AuthState::SignedIn { session, profile });
                Ok(SignUpOutcome::SignedIn)
            }
            Ok(None) => {
                self.publish(resolved_or_signed_out(previous));
                Ok(SignUpOutcome::ConfirmationPending)
            }
            Err(e) => {
                warn!("Sign up error: {}", e);
                self.publish(resolved_or_signed_out(previous));
                Err(e)
            }
        }
    }

    /// Sign out. The local state always ends `SignedOut`.
    pub async fn sign_out(&self) {
        info!("Signing out...");
        let previous = self.begin_loading();

        if let Some(session) = previous.session() {
            if let Err(e) = self.backend.sign_out(&session.tokens).await {
                warn!("Sign out error: {}", e);
            }
        }
        self.publish(AuthState::SignedOut);
    }

    /// Re-read the signed-in user's profile row
    pub async fn refresh_profile(&self) -> AuthResult<Profile> {
        let session = self
            .state
            .borrow()
            .session()
            .cloned()
            .ok_or(AuthError::NotSignedIn)?;
        let profile = self.resolve_profile(&session).await;
        self.publish(AuthState::SignedIn {
            session,
            profile: profile.clone(),
        });
        Ok(profile)
    }

    /// Wait until the state is resolved, then evaluate a route gate
    pub async fn wait_for(&self, gate: Gate) -> GuardOutcome {
        let mut rx = self.subscribe();
        let resolved = match rx.wait_for(AuthState::is_resolved).await {
            Ok(state) => state.clone(),
            // Sender lives as long as self, so this only happens mid-teardown
            Err(_) => AuthState::SignedOut,
        };
        evaluate(gate, &resolved)
    }

    /// Profile for a session; a missing row or a failed lookup falls back
    /// to a local `user` profile
    async fn resolve_profile(&self, session: &AuthSessionData) -> Profile {
        match self
            .backend
            .fetch_profile(&session.tokens, &session.user.id)
            .await
        {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                info!("Profile not found for {}, using a basic profile", session.user.id);
                Profile::default_for(&session.user)
            }
            Err(e) => {
                warn!("Error fetching profile for {}: {}", session.user.id, e);
                Profile::default_for(&session.user)
            }
        }
    }

    /// Publish a new state and return it
    fn publish(&self, state: AuthState) -> AuthState {
        let previous = self.state.send_replace(state.clone());
        debug!(
            "Auth state changed: {} -> {}",
            describe(&previous),
            describe(&state)
        );
        state
    }

    /// Enter `Loading` for the duration of an auth call, returning the state before it
    fn begin_loading(&self) -> AuthState {
        self.state.send_replace(AuthState::Loading)
    }
}

fn resolved_or_signed_out(state: AuthState) -> AuthState {
    match state {
        AuthState::Loading => AuthState::SignedOut,
        other => other,
    }
}

fn describe(state: &AuthState) -> String {
    match state {
        AuthState::Loading => "loading".to_string(),
        AuthState::SignedOut => "signed out".to_string(),
        AuthState::SignedIn { session, profile } => format!(
            "signed in as {} ({})",
            session.user.email.as_deref().unwrap_or(&session.user.id),
            profile.role
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockAuthBackend;
    use crate::guard::Route;
    use crate::types::Role;

    fn session_data() -> AuthSessionData {
        AuthSessionData {
            user: AuthUser {
                id: "u1".to_string(),
                email: Some("ana@example.com".to_string()),
            },
            tokens: AuthTokens {
                access_token: "access".to_string(),
                refresh_token: Some("refresh".to_string()),
                expires_at: None,
            },
        }
    }

    fn profile(role: Role) -> Profile {
        let mut profile = Profile::default_for(&session_data().user);
        profile.role = role;
        profile
    }

    fn auth(mock: MockAuthBackend) -> AuthSession {
        AuthSession::new(Arc::new(mock))
    }

    #[tokio::test]
    async fn test_starts_loading_until_restored() {
        let session = Arc::new(auth(MockAuthBackend::new()));
        assert_eq!(session.state(), AuthState::Loading);

        let waiter = {
            let session = session.clone();
            tokio::spawn(async move { session.wait_for(Gate::Authenticated).await })
        };
        tokio::task::yield_now().await;

        session.restore(None).await;
        assert_eq!(waiter.await.unwrap(), GuardOutcome::Redirect(Route::Login));
        assert_eq!(session.state(), AuthState::SignedOut);
    }

    #[tokio::test]
    async fn test_restore_resolves_profile() {
        let mut mock = MockAuthBackend::new();
        mock.expect_fetch_profile()
            .times(1)
            .returning(|_, _| Ok(Some(profile(Role::Admin))));
        let session = auth(mock);

        session.restore(Some(session_data())).await;
        assert!(session.is_admin());
        assert_eq!(session.wait_for(Gate::Admin).await, GuardOutcome::Allow);
    }

    #[tokio::test]
    async fn test_sign_in_with_missing_profile_defaults_to_user() {
        let mut mock = MockAuthBackend::new();
        mock.expect_sign_in()
            .times(1)
            .returning(|_, _| Ok(session_data()));
        mock.expect_fetch_profile().returning(|_, _| Ok(None));
        let session = auth(mock);
        session.restore(None).await;

        let state = session.sign_in("ana@example.com", "secret").await.unwrap();
        assert_eq!(state.user().map(|u| u.id.as_str()), Some("u1"));
        assert_eq!(session.profile().unwrap().role, Role::User);
        assert!(!session.is_admin());
        assert_eq!(
            session.wait_for(Gate::Admin).await,
            GuardOutcome::Redirect(Route::Dashboard)
        );
    }

    #[tokio::test]
    async fn test_profile_lookup_failure_is_recovered() {
        let mut mock = MockAuthBackend::new();
        mock.expect_sign_in().returning(|_, _| Ok(session_data()));
        mock.expect_fetch_profile()
            .returning(|_, _| Err(AuthError::Network("connection refused".to_string())));
        let session = auth(mock);

        session.sign_in("ana@example.com", "secret").await.unwrap();
        assert_eq!(session.profile().unwrap().role, Role::User);
    }

    #[tokio::test]
    async fn test_failed_sign_in_resolves_to_signed_out() {
        let mut mock = MockAuthBackend::new();
        mock.expect_sign_in()
            .returning(|_, _| {
                Err(AuthError::InvalidCredentials(
                    "Invalid login credentials".to_string(),
                ))
            });
        let session = auth(mock);

        let result = session.sign_in("ana@example.com", "wrong").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials(_))));
        assert_eq!(session.state(), AuthState::SignedOut);
        assert!(matches!(session.tokens(), Err(AuthError::NotSignedIn)));
    }

    #[tokio::test]
    async fn test_sign_up_pending_confirmation() {
        let mut mock = MockAuthBackend::new();
        mock.expect_sign_up().returning(|_, _| Ok(None));
        let session = auth(mock);
        session.restore(None).await;

        let outcome = session.sign_up("novo@example.com", "secret").await.unwrap();
        assert_eq!(outcome, SignUpOutcome::ConfirmationPending);
        assert_eq!(session.state(), AuthState::SignedOut);
    }

    #[tokio::test]
    async fn test_sign_up_error_is_returned_verbatim() {
        let mut mock = MockAuthBackend::new();
        mock.expect_sign_up()
            .returning(|_, _| Err(AuthError::rejected(422, "User already registered")));
        let session = auth(mock);

        let err = session.sign_up("ana@example.com", "secret").await.unwrap_err();
        assert_eq!(err.to_string(), "User already registered");
        assert!(session.state().is_resolved());
    }

    #[tokio::test]
    async fn test_sign_out_always_signs_out() {
        let mut mock = MockAuthBackend::new();
        mock.expect_fetch_profile()
            .returning(|_, _| Ok(Some(profile(Role::User))));
        mock.expect_sign_out()
            .times(1)
            .returning(|_| Err(AuthError::Network("offline".to_string())));
        let session = auth(mock);
        session.restore(Some(session_data())).await;

        session.sign_out().await;
        assert_eq!(session.state(), AuthState::SignedOut);
        assert!(session.current_user().is_none());
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let mut mock = MockAuthBackend::new();
        mock.expect_sign_in().returning(|_, _| Ok(session_data()));
        mock.expect_fetch_profile()
            .returning(|_, _| Ok(Some(profile(Role::User))));
        let session = auth(mock);
        session.restore(None).await;

        let mut rx = session.subscribe();
        assert!(!rx.has_changed().unwrap());

        session.sign_in("ana@example.com", "secret").await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().user().is_some());
    }

    #[tokio::test]
    async fn test_refresh_profile_picks_up_role_change() {
        let mut mock = MockAuthBackend::new();
        let mut seq = mockall::Sequence::new();
        mock.expect_fetch_profile()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(Some(profile(Role::User))));
        mock.expect_fetch_profile()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(Some(profile(Role::Admin))));
        let session = auth(mock);
        session.restore(Some(session_data())).await;
        assert!(!session.is_admin());

        let refreshed = session.refresh_profile().await.unwrap();
        assert!(refreshed.is_admin());
        assert!(session.is_admin());
    }
}
