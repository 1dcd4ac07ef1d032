//! Admin account management.

use tracing::{error, info};

use crate::error::{AuthError, AuthResult};
use crate::session::AuthSession;
use crate::types::{AuthUser, NewAccount, Profile, Role};

/// User management available to admins
pub struct AdminPanel<'a> {
    session: &'a AuthSession,
}

impl<'a> AdminPanel<'a> {
    /// Open the panel; requires a signed-in admin
    pub fn new(session: &'a AuthSession) -> AuthResult<Self> {
        let state = session.state();
        if state.user().is_none() {
            return Err(AuthError::NotSignedIn);
        }
        if !state.is_admin() {
            return Err(AuthError::Forbidden);
        }
        Ok(Self { session })
    }

    /// All profiles, newest first
    pub async fn list_users(&self) -> AuthResult<Vec<Profile>> {
        let tokens = self.session.tokens()?;
        self.session.backend().list_profiles(&tokens).await
    }

    pub async fn set_role(&self, user_id: &str, role: Role) -> AuthResult<()> {
        let tokens = self.session.tokens()?;
        self.session
            .backend()
            .update_role(&tokens, user_id, role)
            .await?;
        info!("Updated role of {} to {}", user_id, role);
        Ok(())
    }

    /// Create a confirmed account and, for admins, promote it
    pub async fn create_user(&self, account: NewAccount) -> AuthResult<AuthUser> {
        if account.email.trim().is_empty() {
            return Err(AuthError::MissingField("email"));
        }
        if account.password.is_empty() {
            return Err(AuthError::MissingField("password"));
        }

        let user = self.session.backend().create_account(&account).await?;
        info!("Created account {}", user.id);

        if account.role == Role::Admin {
            // The account exists either way; a failed promotion is only logged
            if let Err(e) = self.set_role(&user.id, Role::Admin).await {
                error!("Error updating role for {}: {}", user.id, e);
            }
        }
        Ok(user)
    }

    pub async fn delete_user(&self, user_id: &str) -> AuthResult<()> {
        self.session.backend().delete_account(user_id).await?;
        info!("Deleted account {}", user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockAuthBackend;
    use crate::types::{AuthSessionData, AuthTokens};
    use std::sync::Arc;

    fn session_data() -> AuthSessionData {
        AuthSessionData {
            user: AuthUser {
                id: "admin-1".to_string(),
                email: Some("admin@example.com".to_string()),
            },
            tokens: AuthTokens {
                access_token: "admin-token".to_string(),
                refresh_token: None,
                expires_at: None,
            },
        }
    }

    fn profile_with(id: &str, role: Role) -> Profile {
        let mut profile = Profile::default_for(&AuthUser {
            id: id.to_string(),
            email: None,
        });
        profile.role = role;
        profile
    }

    async fn signed_in(mut mock: MockAuthBackend, role: Role) -> AuthSession {
        mock.expect_fetch_profile()
            .returning(move |_, _| Ok(Some(profile_with("admin-1", role))));
        let session = AuthSession::new(Arc::new(mock));
        session.restore(Some(session_data())).await;
        session
    }

    fn account(role: Role) -> NewAccount {
        NewAccount {
            email: "novo@example.com".to_string(),
            password: "secret".to_string(),
            role,
        }
    }

    #[tokio::test]
    async fn test_requires_admin() {
        let signed_out = AuthSession::new(Arc::new(MockAuthBackend::new()));
        signed_out.restore(None).await;
        assert!(matches!(AdminPanel::new(&signed_out), Err(AuthError::NotSignedIn)));

        let user = signed_in(MockAuthBackend::new(), Role::User).await;
        assert!(matches!(AdminPanel::new(&user), Err(AuthError::Forbidden)));

        let admin = signed_in(MockAuthBackend::new(), Role::Admin).await;
        assert!(AdminPanel::new(&admin).is_ok());
    }

    #[tokio::test]
    async fn test_list_users_uses_session_tokens() {
        let mut mock = MockAuthBackend::new();
        mock.expect_list_profiles()
            .withf(|tokens| tokens.access_token == "admin-token")
            .times(1)
            .returning(|_| {
                Ok(vec![
                    profile_with("u2", Role::User),
                    profile_with("admin-1", Role::Admin),
                ])
            });
        let session = signed_in(mock, Role::Admin).await;
        let panel = AdminPanel::new(&session).unwrap();

        let users = panel.list_users().await.unwrap();
        assert_eq!(users.len(), 2);
    }

    #[tokio::test]
    async fn test_create_admin_promotes_account() {
        let mut mock = MockAuthBackend::new();
        mock.expect_create_account()
            .times(1)
            .returning(|account| {
                Ok(AuthUser {
                    id: "u2".to_string(),
                    email: Some(account.email.clone()),
                })
            });
        mock.expect_update_role()
            .withf(|_, _, role| *role == Role::Admin)
            .times(1)
            .returning(|_, _, _| Ok(()));
        let session = signed_in(mock, Role::Admin).await;
        let panel = AdminPanel::new(&session).unwrap();

        let user = panel.create_user(account(Role::Admin)).await.unwrap();
        assert_eq!(user.id, "u2");
    }

    #[tokio::test]
    async fn test_create_regular_user_skips_promotion() {
        let mut mock = MockAuthBackend::new();
        mock.expect_create_account().times(1).returning(|_| {
            Ok(AuthUser {
                id: "u3".to_string(),
                email: None,
            })
        });
        mock.expect_update_role().never();
        let session = signed_in(mock, Role::Admin).await;
        let panel = AdminPanel::new(&session).unwrap();

        panel.create_user(account(Role::User)).await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_promotion_is_not_fatal() {
        let mut mock = MockAuthBackend::new();
        mock.expect_create_account().returning(|_| {
            Ok(AuthUser {
                id: "u4".to_string(),
                email: None,
            })
        });
        mock.expect_update_role()
            .returning(|_, _, _| Err(AuthError::rejected(403, "permission denied")));
        let session = signed_in(mock, Role::Admin).await;
        let panel = AdminPanel::new(&session).unwrap();

        assert!(panel.create_user(account(Role::Admin)).await.is_ok());
    }

    #[tokio::test]
    async fn test_create_requires_credentials() {
        let mut mock = MockAuthBackend::new();
        mock.expect_create_account().never();
        let session = signed_in(mock, Role::Admin).await;
        let panel = AdminPanel::new(&session).unwrap();

        let mut missing_email = account(Role::User);
        missing_email.email = "  ".to_string();
        assert!(matches!(
            panel.create_user(missing_email).await,
            Err(AuthError::MissingField("email"))
        ));

        let mut missing_password = account(Role::User);
        missing_password.password.clear();
        assert!(matches!(
            panel.create_user(missing_password).await,
            Err(AuthError::MissingField("password"))
        ));
    }

    #[tokio::test]
    async fn test_delete_and_set_role_errors_propagate() {
        let mut mock = MockAuthBackend::new();
        mock.expect_delete_account()
            .returning(|_| Err(AuthError::ServiceKeyMissing));
        mock.expect_update_role()
            .returning(|_, _, _| Err(AuthError::rejected(500, "boom")));
        let session = signed_in(mock, Role::Admin).await;
        let panel = AdminPanel::new(&session).unwrap();

        assert!(matches!(
            panel.delete_user("u2").await,
            Err(AuthError::ServiceKeyMissing)
        ));
        assert!(panel.set_role("u2", Role::Admin).await.is_err());
    }
}
