//! Login, signup, logout and whoami commands.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use tracing::info;

use copydesk_auth::{AuthSession, AuthState, Gate, SessionFile, SignUpOutcome};

use super::GlobalArgs;
use crate::context::{require, AppContext};

#[derive(Args)]
pub struct CredentialsArgs {
    /// Account email
    #[arg(short, long)]
    email: String,

    /// Account password
    #[arg(short, long, env = "COPYDESK_PASSWORD", hide_env_values = true)]
    password: String,
}

pub async fn login(global: &GlobalArgs, args: CredentialsArgs) -> Result<()> {
    let ctx = AppContext::load(global)?;
    let session = AuthSession::new(Arc::new(ctx.auth_backend()?));

    let state = session.sign_in(args.email.trim(), &args.password).await?;
    store(&ctx.session_file(), &state)?;

    println!("✅ Signed in as {}", signed_in_label(&state));
    ctx.say("   Next: copydesk agents");
    Ok(())
}

pub async fn signup(global: &GlobalArgs, args: CredentialsArgs) -> Result<()> {
    let ctx = AppContext::load(global)?;
    let session = AuthSession::new(Arc::new(ctx.auth_backend()?));

    match session.sign_up(args.email.trim(), &args.password).await? {
        SignUpOutcome::SignedIn => {
            let state = session.state();
            store(&ctx.session_file(), &state)?;
            println!("✅ Account created. Signed in as {}", signed_in_label(&state));
        }
        SignUpOutcome::ConfirmationPending => {
            println!("✅ Account created");
            println!("📧 Check your email to confirm the account, then run: copydesk login");
        }
    }
    Ok(())
}

pub async fn logout(global: &GlobalArgs) -> Result<()> {
    let ctx = AppContext::load(global)?;
    let file = ctx.session_file();

    if file.load().is_none() {
        println!("Not signed in");
        return Ok(());
    }

    let session = ctx.session().await?;
    session.sign_out().await;
    file.clear()?;
    info!("Cleared stored session");
    println!("👋 Signed out");
    Ok(())
}

pub async fn whoami(global: &GlobalArgs) -> Result<()> {
    let ctx = AppContext::load(global)?;
    let session = ctx.session().await?;
    require(&session, Gate::Authenticated).await?;

    let state = session.state();
    println!("👤 {}", signed_in_label(&state));
    if let Some(profile) = state.profile() {
        println!("   Role: {}", profile.role);
        println!("   Member since: {}", profile.created_at.format("%Y-%m-%d"));
    }
    Ok(())
}

/// Keep the signed-in session for later commands
fn store(file: &SessionFile, state: &AuthState) -> Result<()> {
    if let Some(session) = state.session() {
        file.save(session)?;
        info!("Stored session at {}", file.path().display());
    }
    Ok(())
}

fn signed_in_label(state: &AuthState) -> String {
    match state.user() {
        Some(user) => {
            let name = user.email.as_deref().unwrap_or(&user.id);
            if state.is_admin() {
                format!("{} (admin)", name)
            } else {
                name.to_string()
            }
        }
        None => "nobody".to_string(),
    }
}
