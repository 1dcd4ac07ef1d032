//! Admin command - account management for admins.

use anyhow::Result;
use clap::{Args, Subcommand};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use copydesk_auth::{AdminPanel, Gate, NewAccount, Profile, Role};

use super::GlobalArgs;
use crate::context::AppContext;

#[derive(Args)]
pub struct AdminArgs {
    #[command(subcommand)]
    command: AdminCommand,
}

#[derive(Subcommand)]
enum AdminCommand {
    /// List all accounts, newest first
    List {
        /// Print the accounts as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a confirmed account
    Create {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "COPYDESK_NEW_PASSWORD", hide_env_values = true)]
        password: String,

        /// Role of the new account (user or admin)
        #[arg(short, long, default_value = "user")]
        role: Role,
    },

    /// Change the role of an account
    #[command(name = "set-role")]
    SetRole {
        /// Account id
        user_id: String,

        /// New role (user or admin)
        role: Role,
    },

    /// Delete an account (asks for confirmation)
    Delete {
        /// Account id
        user_id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

pub async fn execute(global: &GlobalArgs, args: AdminArgs) -> Result<()> {
    let ctx = AppContext::load(global)?;
    let session = ctx.guarded(Gate::Admin).await?;
    let panel = AdminPanel::new(&session)?;

    match args.command {
        AdminCommand::List { json } => {
            let users = panel.list_users().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&users)?);
                return Ok(());
            }
            if users.is_empty() {
                println!("No accounts");
                return Ok(());
            }
            println!("📋 Accounts ({}):", users.len());
            for profile in &users {
                println!("{}", account_row(profile));
            }
        }
        AdminCommand::Create {
            email,
            password,
            role,
        } => {
            let user = panel
                .create_user(NewAccount {
                    email: email.trim().to_string(),
                    password,
                    role,
                })
                .await?;
            println!("✅ Account created");
            ctx.say(format!("   Id: {}", user.id));
            ctx.say(format!("   Role: {}", role));
        }
        AdminCommand::SetRole { user_id, role } => {
            panel.set_role(&user_id, role).await?;
            println!("✅ Role updated");
            ctx.say(format!("   {} is now {}", user_id, role));
        }
        AdminCommand::Delete { user_id, yes } => {
            let own_account = session.current_user().map(|u| u.id) == Some(user_id.clone());
            if own_account {
                println!("⚠️  This is your own account; you will be signed out");
            }
            if !yes {
                let mut stdin = BufReader::new(tokio::io::stdin());
                if !confirm_delete(&mut stdin, &user_id).await? {
                    println!("Cancelled, nothing was deleted");
                    return Ok(());
                }
            }

            panel.delete_user(&user_id).await?;
            if own_account {
                ctx.session_file().clear()?;
            }
            println!("✅ Account deleted");
        }
    }
    Ok(())
}

/// Ask before deleting; only an explicit yes confirms
async fn confirm_delete<R>(input: &mut R, user_id: &str) -> Result<bool>
where
    R: AsyncBufRead + Unpin,
{
    use std::io::Write;

    print!("Delete account {}? This cannot be undone. [y/N] ", user_id);
    // An unflushed prompt still leaves the answer readable
    let _ = std::io::stdout().flush();

    let mut answer = String::new();
    input.read_line(&mut answer).await?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes" | "s" | "sim"
    ))
}

fn account_row(profile: &Profile) -> String {
    let badge = if profile.is_admin() { "🛡️ " } else { "👤" };
    format!(
        "  {} {:<32} {:<6} {}  created {}",
        badge,
        profile.email.as_deref().unwrap_or("-"),
        profile.role.as_str(),
        profile.id,
        profile.created_at.format("%d/%m/%Y")
    )
}
