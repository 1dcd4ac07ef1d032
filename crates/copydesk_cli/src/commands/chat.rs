//! Chat command - interactive chat screen for one agent.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use copydesk_auth::Gate;
use copydesk_chat::{
    shared_store, ChatMessage, ChatView, Conversation, ConversationSummary, IgnoreReason,
    MessageRole, Notification, NotificationKind, Notifier, SendOutcome,
};

use super::GlobalArgs;
use crate::context::AppContext;

#[derive(Args)]
pub struct ChatArgs {
    /// Agent id (see `copydesk agents`)
    agent: String,
}

/// A line typed at the chat prompt
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Send(String),
    New,
    List,
    Open(String),
    Delete(String),
    Retry,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl Input {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Self::Send(line.to_string());
        };

        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };
        match (name, arg) {
            ("new", _) => Self::New,
            ("list", _) => Self::List,
            ("open", target) if !target.is_empty() => Self::Open(target.to_string()),
            ("delete", target) if !target.is_empty() => Self::Delete(target.to_string()),
            ("retry", _) => Self::Retry,
            ("help", _) => Self::Help,
            ("quit" | "exit", _) => Self::Quit,
            _ => Self::Unknown(line.to_string()),
        }
    }
}

const HELP: &str = "\
Commands:
  /new            start a new conversation
  /list           list this agent's conversations
  /open <n|id>    switch to a conversation
  /delete <n|id>  delete a conversation
  /retry          resend the last unanswered message
  /help           show this help
  /quit           leave the chat
Anything else is sent to the agent.";

pub async fn execute(global: &GlobalArgs, args: ChatArgs) -> Result<()> {
    let ctx = AppContext::load(global)?;
    ctx.guarded(Gate::Authenticated).await?;

    let notifier = Arc::new(Notifier::new());
    let view = ChatView::open(&args.agent, shared_store(), ctx.dispatcher()?, notifier)?;
    let agent = view.agent();
    info!("Chat opened with {}", agent.id);

    println!("{} {}", agent.icon.glyph(), agent.title);
    ctx.say(format!("   {}", agent.description));
    ctx.say("   Type /help for commands. Conversations are kept until you quit.\n");
    if let Some(conversation) = view.current_conversation() {
        print_conversation(&conversation);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt();
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match Input::parse(&line) {
            Input::Empty => continue,
            Input::Quit => break,
            Input::Help => println!("{}", HELP),
            Input::Unknown(line) => println!("⚠️  Unknown command: {} (try /help)", line),
            Input::New => {
                view.new_conversation()?;
                if let Some(conversation) = view.current_conversation() {
                    print_conversation(&conversation);
                }
            }
            Input::List => print_sidebar(&view.sidebar()),
            Input::Open(target) => match resolve_target(&view.sidebar(), &target) {
                Some(id) => {
                    view.select(&id)?;
                    if let Some(conversation) = view.current_conversation() {
                        print_conversation(&conversation);
                    }
                }
                None => println!("⚠️  No conversation matches '{}'", target),
            },
            Input::Delete(target) => match resolve_target(&view.sidebar(), &target) {
                Some(id) => {
                    view.delete(&id)?;
                    println!("🗑️  Conversation deleted");
                }
                None => println!("⚠️  No conversation matches '{}'", target),
            },
            Input::Send(content) => {
                println!("⏳ {} is writing...", agent.title);
                let outcome = view.send(&content).await;
                report(&outcome);
            }
            Input::Retry => {
                let outcome = view.retry().await;
                if !matches!(outcome, SendOutcome::Ignored(_)) {
                    println!("⏳ {} is writing...", agent.title);
                }
                report(&outcome);
            }
        }

        for notification in view.notifier().drain() {
            println!("{}", format_notification(&notification));
        }
    }

    println!("👋 Bye");
    Ok(())
}

fn prompt() {
    use std::io::Write;

    print!("> ");
    // A prompt that fails to flush is still followed by the reply
    let _ = std::io::stdout().flush();
}

fn report(outcome: &SendOutcome) {
    match outcome {
        SendOutcome::Replied(reply) => print_message(reply, false),
        SendOutcome::Failed(e) => {
            debug!("Send failed: {}", e);
            println!("⚠️  Message not answered. Use /retry to send it again.");
        }
        SendOutcome::Dropped(_) => println!("⚠️  Reply arrived for a deleted conversation"),
        SendOutcome::Ignored(IgnoreReason::NothingToRetry) => {
            println!("Nothing to retry")
        }
        SendOutcome::Ignored(IgnoreReason::RetrySuperseded) => {
            println!("⚠️  Only an unanswered last message can be retried; send it again instead")
        }
        SendOutcome::Ignored(IgnoreReason::Busy) => println!("⏳ Still waiting for the last reply"),
        SendOutcome::Ignored(IgnoreReason::EmptyInput) => {}
    }
}

/// Sidebar row number (1-based) or conversation id to a conversation id
fn resolve_target(sidebar: &[ConversationSummary], target: &str) -> Option<String> {
    if let Ok(n) = target.parse::<usize>() {
        return n
            .checked_sub(1)
            .and_then(|i| sidebar.get(i))
            .map(|s| s.id.clone());
    }
    sidebar.iter().find(|s| s.id == target).map(|s| s.id.clone())
}

fn print_sidebar(sidebar: &[ConversationSummary]) {
    if sidebar.is_empty() {
        println!("No conversations yet");
        return;
    }
    println!("📋 Conversations:");
    for (i, row) in sidebar.iter().enumerate() {
        println!("{}", sidebar_row(i + 1, row));
    }
}

fn sidebar_row(number: usize, row: &ConversationSummary) -> String {
    let marker = if row.is_current { "▶" } else { " " };
    format!(
        "{} {:>2}. {} ({}, {})",
        marker,
        number,
        row.title,
        row.count_label(),
        row.updated_at.format("%d/%m %H:%M")
    )
}

fn print_conversation(conversation: &Conversation) {
    println!("── {} ──", conversation.title);
    for message in &conversation.messages {
        print_message(message, conversation.is_unanswered(&message.id));
    }
}

fn print_message(message: &ChatMessage, unanswered: bool) {
    println!("{}", message_line(message, unanswered));
}

fn message_line(message: &ChatMessage, unanswered: bool) -> String {
    let who = match message.role {
        MessageRole::User => "You",
        MessageRole::Assistant => "Agent",
    };
    let time = message.timestamp.format("%H:%M");
    let mut line = format!("[{}] {}: {}", time, who, message.content);
    if unanswered {
        line.push_str("  ⚠️ no reply (/retry)");
    }
    line
}

fn format_notification(notification: &Notification) -> String {
    let icon = match notification.kind {
        NotificationKind::Success => "✅",
        NotificationKind::Error => "❌",
    };
    format!("{} {} {}", icon, notification.title, notification.description)
}

#[cfg(test)]
mod tests {
    use super::*;
    use copydesk_chat::{ConversationStore, SEND_FAILED_NOTICE};

    #[test]
    fn test_parse_input() {
        assert_eq!(Input::parse("  "), Input::Empty);
        assert_eq!(
            Input::parse(" Quero um roteiro "),
            Input::Send("Quero um roteiro".to_string())
        );
        assert_eq!(Input::parse("/new"), Input::New);
        assert_eq!(Input::parse("/list"), Input::List);
        assert_eq!(Input::parse("/open 2"), Input::Open("2".to_string()));
        assert_eq!(Input::parse("/delete  abc "), Input::Delete("abc".to_string()));
        assert_eq!(Input::parse("/retry"), Input::Retry);
        assert_eq!(Input::parse("/quit"), Input::Quit);
        assert_eq!(Input::parse("/exit"), Input::Quit);
        assert_eq!(Input::parse("/open"), Input::Unknown("/open".to_string()));
        assert_eq!(Input::parse("/shout"), Input::Unknown("/shout".to_string()));
    }

    #[test]
    fn test_resolve_target_by_number_or_id() {
        let mut store = ConversationStore::new();
        let older = store.create_conversation("roteiro-reels").unwrap();
        let newer = store.create_conversation("roteiro-reels").unwrap();
        let sidebar: Vec<_> = store
            .conversations_by_agent("roteiro-reels")
            .into_iter()
            .map(|c| ConversationSummary::from_conversation(c, store.current_conversation_id()))
            .collect();

        assert_eq!(resolve_target(&sidebar, "1"), Some(newer.clone()));
        assert_eq!(resolve_target(&sidebar, "2"), Some(older.clone()));
        assert_eq!(resolve_target(&sidebar, &older), Some(older));
        assert_eq!(resolve_target(&sidebar, "0"), None);
        assert_eq!(resolve_target(&sidebar, "3"), None);
        assert_eq!(resolve_target(&sidebar, "missing"), None);
    }

    #[test]
    fn test_sidebar_row_marks_current() {
        let mut store = ConversationStore::new();
        let id = store.create_conversation("sequencia-emails").unwrap();
        let conversation = store.get(&id).unwrap();
        let row = ConversationSummary::from_conversation(conversation, Some(id.as_str()));

        let line = sidebar_row(1, &row);
        assert!(line.starts_with('▶'));
        assert!(line.contains("Nova conversa"));
        assert!(line.contains("1 mensagem"));
    }

    #[test]
    fn test_unanswered_marker() {
        let message = ChatMessage::user("Oi");
        assert!(!message_line(&message, false).contains("/retry"));
        assert!(message_line(&message, true).contains("/retry"));
        assert!(message_line(&message, false).contains("You: Oi"));
    }

    #[test]
    fn test_format_notification() {
        let notifier = Notifier::new();
        notifier.error(SEND_FAILED_NOTICE);
        let line = format_notification(&notifier.drain()[0]);
        assert_eq!(line, format!("❌ Erro {}", SEND_FAILED_NOTICE));
    }
}
