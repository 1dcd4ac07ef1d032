//! Shared command context: workspace, settings and the auth session.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info};

use copydesk_auth::{
    AuthSession, AuthSessionData, Gate, GuardOutcome, RestAuthBackend, Route, SessionFile,
};
use copydesk_chat::{ChatDispatcher, CopydeskConfig, STATE_DIR};

use crate::commands::GlobalArgs;

/// A route guard refused the command
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{reason}; redirecting to {}", route.path())]
pub struct GuardRedirect {
    pub route: Route,
    pub reason: &'static str,
}

impl GuardRedirect {
    fn for_route(route: Route) -> Self {
        let reason = match route {
            Route::Login => "Sign in required",
            _ => "Admin role required",
        };
        Self { route, reason }
    }
}

/// Everything a command needs from the environment
pub struct AppContext {
    workspace: PathBuf,
    config: CopydeskConfig,
    quiet: bool,
}

impl AppContext {
    /// Resolve the workspace and load its settings
    pub fn load(global: &GlobalArgs) -> Result<Self> {
        let workspace = match &global.workspace {
            Some(path) => path.clone(),
            None => std::env::current_dir()?,
        };

        let mut config = CopydeskConfig::load(&workspace)
            .with_context(|| format!("Failed to load settings from {}", workspace.display()))?;
        if let Some(url) = &global.webhook_url {
            config.webhook_url = Some(url.clone());
        }
        debug!("Workspace: {}", workspace.display());

        Ok(Self {
            workspace,
            config,
            quiet: global.quiet,
        })
    }

    pub fn session_file(&self) -> SessionFile {
        SessionFile::in_dir(self.workspace.join(STATE_DIR))
    }

    pub fn dispatcher(&self) -> Result<ChatDispatcher> {
        Ok(ChatDispatcher::from_config(&self.config)?)
    }

    /// Client for the auth/profile service
    pub fn auth_backend(&self) -> Result<RestAuthBackend> {
        let url = self
            .config
            .auth_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .context(
                "Auth service not configured. \
                 Set COPYDESK_AUTH_URL or authUrl in .copydesk/settings.json",
            )?;
        let anon_key = self
            .config
            .auth_anon_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .context(
                "Auth key not configured. \
                 Set COPYDESK_AUTH_ANON_KEY or authAnonKey in .copydesk/settings.json",
            )?;

        Ok(RestAuthBackend::new(url, anon_key)
            .with_service_key(self.config.auth_service_key.clone()))
    }

    /// Auth session resolved from the stored session file
    pub async fn session(&self) -> Result<AuthSession> {
        let session = AuthSession::new(Arc::new(self.auth_backend()?));
        session.restore(self.stored_session()).await;
        Ok(session)
    }

    /// Stored session, unless its tokens have expired
    fn stored_session(&self) -> Option<AuthSessionData> {
        let stored = self.session_file().load()?;
        if stored.tokens.is_expired(Utc::now()) {
            info!("Stored session for {} has expired", stored.user.id);
            return None;
        }
        Some(stored)
    }

    /// Restore the session and check a route gate against it
    pub async fn guarded(&self, gate: Gate) -> Result<AuthSession> {
        let session = self.session().await?;
        require(&session, gate).await?;
        Ok(session)
    }

    /// Print unless `--quiet`
    pub fn say(&self, line: impl AsRef<str>) {
        if !self.quiet {
            println!("{}", line.as_ref());
        }
    }
}

/// Wait for the auth state and fail with the redirect target if refused
pub async fn require(session: &AuthSession, gate: Gate) -> Result<(), GuardRedirect> {
    match session.wait_for(gate).await {
        GuardOutcome::Allow => Ok(()),
        GuardOutcome::Redirect(route) => Err(GuardRedirect::for_route(route)),
        // wait_for only returns once the state is resolved
        GuardOutcome::Loading => Err(GuardRedirect::for_route(Route::Login)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    fn global(workspace: &Path) -> GlobalArgs {
        GlobalArgs {
            verbose: false,
            quiet: true,
            workspace: Some(workspace.to_path_buf()),
            webhook_url: None,
        }
    }

    #[test]
    fn test_redirect_messages() {
        let login = GuardRedirect::for_route(Route::Login);
        assert_eq!(login.to_string(), "Sign in required; redirecting to /login");

        let dashboard = GuardRedirect::for_route(Route::Dashboard);
        assert_eq!(
            dashboard.to_string(),
            "Admin role required; redirecting to /dashboard"
        );
    }

    #[test]
    fn test_webhook_flag_overrides_settings() {
        let temp = tempdir().unwrap();
        let settings = CopydeskConfig {
            webhook_url: Some("http://from-settings/webhook".to_string()),
            ..Default::default()
        };
        settings
            .save(&CopydeskConfig::settings_path(temp.path()))
            .unwrap();

        let mut args = global(temp.path());
        args.webhook_url = Some("http://from-flag/webhook".to_string());
        let ctx = AppContext::load(&args).unwrap();

        assert_eq!(
            ctx.config.webhook_url.as_deref(),
            Some("http://from-flag/webhook")
        );
        assert!(ctx.session_file().path().starts_with(temp.path()));
    }

    #[test]
    fn test_auth_backend_requires_settings() {
        let temp = tempdir().unwrap();
        let settings = CopydeskConfig {
            auth_url: Some("http://auth.local/".to_string()),
            auth_anon_key: Some("anon".to_string()),
            ..Default::default()
        };
        settings
            .save(&CopydeskConfig::settings_path(temp.path()))
            .unwrap();

        let ctx = AppContext::load(&global(temp.path())).unwrap();
        let backend = ctx.auth_backend().unwrap();
        assert_eq!(backend.base_url(), "http://auth.local");
    }

    #[test]
    fn test_expired_session_is_ignored() {
        use copydesk_auth::{AuthTokens, AuthUser};

        let temp = tempdir().unwrap();
        let ctx = AppContext::load(&global(temp.path())).unwrap();
        let stored = AuthSessionData {
            user: AuthUser {
                id: "u1".to_string(),
                email: None,
            },
            tokens: AuthTokens {
                access_token: "old".to_string(),
                refresh_token: None,
                expires_at: Some(Utc::now() - chrono::Duration::hours(1)),
            },
        };
        ctx.session_file().save(&stored).unwrap();
        assert!(ctx.stored_session().is_none());

        let mut fresh = stored;
        fresh.tokens.expires_at = Some(Utc::now() + chrono::Duration::hours(1));
        ctx.session_file().save(&fresh).unwrap();
        assert!(ctx.stored_session().is_some());
    }
}
