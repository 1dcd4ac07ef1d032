//! CLI command definitions.
//!
//! This module defines the command structure for the Copydesk CLI.
//! Each subcommand maps to one screen of the copywriting desk.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

pub mod admin;
pub mod agents;
pub mod auth;
pub mod chat;
pub mod generate;

/// Copydesk - chat with copywriting agents
#[derive(Parser)]
#[command(name = "copydesk")]
#[command(version, about = "Copydesk - chat with copywriting agents")]
#[command(long_about = r#"
Copydesk lets signed-in marketers chat with specialised copywriting agents.
Replies are produced by an external generation webhook.

COMMANDS:
  agents        → List the agent catalog
  chat          → Open the chat screen of an agent
  generate      → One-off copy generation for an agent
  login/signup  → Sign in or register
  logout/whoami → End or show the current session
  admin         → Manage accounts (admins only)

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Authentication or permission failure
  4 - Generation failure
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Directory holding .copydesk/ (settings and session)
    #[arg(long, global = true, env = "COPYDESK_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Generation webhook URL, overriding settings
    #[arg(long, global = true)]
    pub webhook_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the available copywriting agents
    Agents(agents::AgentsArgs),

    /// Chat with an agent
    Chat(chat::ChatArgs),

    /// Generate copy once, without a conversation
    Generate(generate::GenerateArgs),

    /// Sign in with email and password
    Login(auth::CredentialsArgs),

    /// Register a new account
    Signup(auth::CredentialsArgs),

    /// Sign out and forget the stored session
    Logout,

    /// Show the signed-in user and role
    Whoami,

    /// Account management (admins only)
    Admin(admin::AdminArgs),
}
