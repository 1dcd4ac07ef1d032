//! # copydesk_chat - Agent chat core for Copydesk
//!
//! Users pick a copywriting agent from a fixed catalog and chat with it.
//! Every chat turn is posted to a single generation webhook.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │    Chat View    │────▶│ Chat Dispatcher │────▶│ Webhook Client  │
//! └────────┬────────┘     └────────┬────────┘     └─────────────────┘
//!          │                       │
//!          ▼                       ▼
//! ┌─────────────────┐     ┌─────────────────┐
//! │ Conversation    │     │  Notifications  │
//! │ Store + Catalog │     └─────────────────┘
//! └─────────────────┘
//! ```
//!
//! The dispatcher returns a result instead of touching the store; the view
//! decides where a reply is committed.

pub mod catalog;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod notify;
pub mod store;
pub mod types;
pub mod view;
pub mod webhook;

pub use catalog::{Agent, AgentIcon};
pub use config::*;
pub use dispatcher::*;
pub use error::*;
pub use notify::*;
pub use store::*;
pub use types::*;
pub use view::*;
pub use webhook::*;
