//! Copydesk CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Authentication or permission failure
//! - 4: Generation failure

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod context;

use commands::{Cli, Commands};
use context::GuardRedirect;
use copydesk_auth::AuthError;
use copydesk_chat::ChatError;

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const AUTH_FAILURE: u8 = 3;
    pub const GENERATION_FAILURE: u8 = 4;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.global.verbose { "copydesk=debug" } else { "copydesk=info" };
    let mut filter = EnvFilter::from_default_env();
    for directive in [default_level, "warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }
    let log_result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }

    let global = cli.global;
    let result = match cli.command {
        Commands::Agents(args) => commands::agents::execute(&global, args).await,
        Commands::Chat(args) => commands::chat::execute(&global, args).await,
        Commands::Generate(args) => commands::generate::execute(&global, args).await,
        Commands::Login(args) => commands::auth::login(&global, args).await,
        Commands::Signup(args) => commands::auth::signup(&global, args).await,
        Commands::Logout => commands::auth::logout(&global).await,
        Commands::Whoami => commands::auth::whoami(&global).await,
        Commands::Admin(args) => commands::admin::execute(&global, args).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    if e.downcast_ref::<GuardRedirect>().is_some() {
        return ExitCodes::AUTH_FAILURE;
    }
    if let Some(auth) = e.downcast_ref::<AuthError>() {
        return match auth {
            AuthError::MissingField(_) | AuthError::InvalidRole(_) => ExitCodes::INVALID_ARGS,
            other if other.is_access_denied() => ExitCodes::AUTH_FAILURE,
            _ => ExitCodes::GENERAL_ERROR,
        };
    }
    if let Some(chat) = e.downcast_ref::<ChatError>() {
        return match chat {
            ChatError::UnknownAgent(_) | ChatError::EmptyMessage => ExitCodes::INVALID_ARGS,
            ChatError::Dispatch(_) => ExitCodes::GENERATION_FAILURE,
            _ => ExitCodes::GENERAL_ERROR,
        };
    }
    ExitCodes::GENERAL_ERROR
}
