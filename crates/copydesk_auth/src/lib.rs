//! # copydesk_auth - Authentication for Copydesk
//!
//! Accounts, tokens and profile rows live in an external auth service. This
//! crate consumes it and provides:
//!
//! - [`AuthSession`]: the explicitly passed signed-in state, with change
//!   notifications over a watch channel
//! - Route guards for signed-in and admin-only screens
//! - [`AdminPanel`]: listing accounts, changing roles, creating and deleting
//!   accounts
//! - [`SessionFile`]: keeping the session between CLI runs

pub mod admin;
pub mod backend;
pub mod error;
pub mod guard;
pub mod persistence;
pub mod session;
pub mod types;

pub use admin::AdminPanel;
pub use backend::{AuthBackend, RestAuthBackend};
pub use error::{AuthError, AuthResult};
pub use guard::{evaluate, Gate, GuardOutcome, Route};
pub use persistence::SessionFile;
pub use session::{AuthSession, AuthState, SignUpOutcome};
pub use types::*;
