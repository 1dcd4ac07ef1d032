//! Signed-in session storage.
//!
//! Each CLI invocation is a new process, so the session is kept at
//! `<workspace>/.copydesk/session.json` between runs.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::AuthResult;
use crate::types::AuthSessionData;

const SESSION_FILE: &str = "session.json";

/// File holding the stored session
#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Session file inside a state directory
    pub fn in_dir(state_dir: impl AsRef<Path>) -> Self {
        Self::new(state_dir.as_ref().join(SESSION_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, session: &AuthSessionData) -> AuthResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(session)?)?;
        debug!("Saved session to {:?}", self.path);
        Ok(())
    }

    /// Stored session, if any. An unreadable file counts as signed out.
    pub fn load(&self) -> Option<AuthSessionData> {
        let content = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&content) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!("Ignoring corrupt session file {:?}: {}", self.path, e);
                None
            }
        }
    }

    pub fn clear(&self) -> AuthResult<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}
