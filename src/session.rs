//! Local persisted session state.
//!
//! Resolution order for each credential:
//! 1) STEWARD_TOKEN / STEWARD_ORG_ID environment variables
//! 2) Persisted value in the session file (`session.json`)
//!
//! The session file lives in the platform state directory by default
//! (`directories::ProjectDirs`), or in an explicit directory for tests.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const SESSION_FILENAME: &str = "session.json";

/// Ambient credentials attached to every API request
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
}

impl SessionState {
    /// Anonymous session: no auth header, no organization header
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn new(auth_token: Option<String>, organization_id: Option<String>) -> Self {
        Self {
            auth_token: non_empty(auth_token),
            organization_id: non_empty(organization_id),
        }
    }
}

/// Resolve the session using environment variables and the persisted file.
pub fn resolve_session(state_dir: Option<&Path>) -> Result<SessionState> {
    let mut session = match state_dir {
        Some(dir) => load_persisted_session(dir)?.unwrap_or_default(),
        None => match default_state_dir() {
            Some(dir) => load_persisted_session(&dir)?.unwrap_or_default(),
            None => SessionState::default(),
        },
    };

    if let Ok(token) = std::env::var("STEWARD_TOKEN") {
        if let Some(token) = non_empty(Some(token)) {
            session.auth_token = Some(token);
        }
    }
    if let Ok(org) = std::env::var("STEWARD_ORG_ID") {
        if let Some(org) = non_empty(Some(org)) {
            session.organization_id = Some(org);
        }
    }

    Ok(session)
}

/// Persist the session state in `<dir>/session.json`.
pub fn persist_session(state_dir: &Path, session: &SessionState) -> Result<()> {
    std::fs::create_dir_all(state_dir)?;
    let json = serde_json::to_vec_pretty(session)?;
    std::fs::write(session_path(state_dir), json)?;
    Ok(())
}

/// Load the persisted session from `<dir>/session.json`, if present.
pub fn load_persisted_session(state_dir: &Path) -> Result<Option<SessionState>> {
    let path = session_path(state_dir);
    if !path.exists() {
        return Ok(None);
    }

    let raw = std::fs::read_to_string(path)?;
    if raw.trim().is_empty() {
        return Ok(None);
    }
    let session: SessionState = serde_json::from_str(&raw)?;
    Ok(Some(session))
}

/// Remove the persisted session file (logout).
pub fn clear_session(state_dir: &Path) -> Result<()> {
    let path = session_path(state_dir);
    if path.exists() {
        std::fs::remove_file(&path).map_err(Error::Io)?;
    }
    Ok(())
}

/// Platform state directory for steward, if resolvable.
pub fn default_state_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "steward")
        .map(|dirs| dirs.data_local_dir().to_path_buf())
}

fn session_path(state_dir: &Path) -> PathBuf {
    state_dir.join(SESSION_FILENAME)
}

fn non_empty(input: Option<String>) -> Option<String> {
    input.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
