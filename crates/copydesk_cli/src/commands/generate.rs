//! Generate command - one-off copy generation for an agent.

use anyhow::Result;
use clap::Args;
use tracing::info;

use copydesk_auth::Gate;
use copydesk_chat::{catalog, Notifier};

use super::GlobalArgs;
use crate::context::AppContext;

#[derive(Args)]
pub struct GenerateArgs {
    /// Agent id (see `copydesk agents`)
    agent: String,
}

pub async fn execute(global: &GlobalArgs, args: GenerateArgs) -> Result<()> {
    let ctx = AppContext::load(global)?;
    ctx.guarded(Gate::Authenticated).await?;

    let agent = catalog::require(&args.agent)?;
    let dispatcher = ctx.dispatcher()?;
    let notifier = Notifier::new();

    ctx.say(format!("⏳ Generating with {} {}...", agent.icon.glyph(), agent.title));
    let result = dispatcher.generate_with(agent.id, &notifier).await;

    for notification in notifier.drain() {
        ctx.say(format!("{} {}", notification.title, notification.description));
    }

    let copy = result?;
    info!("Generated {} characters of copy", copy.chars().count());
    println!("\n{}", copy);
    Ok(())
}
