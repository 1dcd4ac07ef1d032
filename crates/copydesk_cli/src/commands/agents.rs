//! Agents command - the dashboard's agent menu.

use anyhow::Result;
use clap::Args;

use copydesk_auth::Gate;
use copydesk_chat::{catalog, Agent};

use super::GlobalArgs;
use crate::context::AppContext;

#[derive(Args)]
pub struct AgentsArgs {
    /// Print the catalog as JSON
    #[arg(long)]
    json: bool,
}

pub async fn execute(global: &GlobalArgs, args: AgentsArgs) -> Result<()> {
    let ctx = AppContext::load(global)?;
    let session = ctx.guarded(Gate::Authenticated).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(catalog::all())?);
        return Ok(());
    }

    if let Some(user) = session.current_user() {
        ctx.say(format!(
            "👋 Signed in as {}",
            user.email.as_deref().unwrap_or(&user.id)
        ));
    }
    println!("📋 Agents:\n");
    for agent in catalog::all() {
        println!("{}", menu_entry(agent));
    }
    ctx.say("\nStart a chat with: copydesk chat <agent-id>");
    if session.is_admin() {
        ctx.say("Manage accounts with: copydesk admin list");
    }
    Ok(())
}

fn menu_entry(agent: &Agent) -> String {
    format!(
        "  {}  {:<22} {}\n      {}",
        agent.icon.glyph(),
        agent.id,
        agent.title,
        agent.description
    )
}
