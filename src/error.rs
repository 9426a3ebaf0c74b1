//! Error types for steward
//!
//! Wire codes per the API error contract:
//! - `TIMEOUT`, `NETWORK_ERROR`: transport-level failures
//! - `HTTP_<status>`: non-OK response without a structured error body
//! - server-declared code: non-OK response with a structured error body
//! - `CONFLICT`: concurrent-mutation rejection in the local store

use std::collections::BTreeMap;

use thiserror::Error;

/// Main error type for steward operations
#[derive(Error, Debug)]
pub enum Error {
    // Transport failures
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("{code}: {message}")]
    Api {
        code: String,
        message: String,
        details: Option<BTreeMap<String, Vec<String>>>,
        status: u16,
    },

    // Local store discipline
    #[error("mutation already in flight for entity {0}")]
    Conflict(String),

    #[error("entity not found in snapshot: {0}")]
    NotFound(String),

    // Wizard / draft validation
    #[error("draft parent title cannot be empty")]
    EmptyDraftTitle,

    #[error("invalid wizard transition: {0}")]
    InvalidTransition(String),

    #[error("invalid draft: {0}")]
    InvalidDraft(String),

    // Configuration and parsing
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Error {
    /// Get the wire code for this error
    pub fn code(&self) -> String {
        match self {
            Error::Timeout => "TIMEOUT".to_string(),
            Error::Network(_) => "NETWORK_ERROR".to_string(),
            Error::Http { status, .. } => format!("HTTP_{status}"),
            Error::Api { code, .. } => code.clone(),
            Error::Conflict(_) => "CONFLICT".to_string(),
            Error::NotFound(_) => "NOT_FOUND".to_string(),
            Error::EmptyDraftTitle => "EMPTY_DRAFT_TITLE".to_string(),
            Error::InvalidTransition(_) => "INVALID_TRANSITION".to_string(),
            Error::InvalidDraft(_) => "INVALID_DRAFT".to_string(),
            Error::InvalidConfig(_) => "INVALID_CONFIG".to_string(),
            Error::InvalidArgument(_) => "INVALID_ARGUMENT".to_string(),
            Error::Io(_) => "IO_ERROR".to_string(),
            Error::Json(_) => "JSON_ERROR".to_string(),
            Error::TomlParse(_) | Error::TomlSerialize(_) => "TOML_ERROR".to_string(),
        }
    }

    /// True for failures produced before any network call was issued
    pub fn is_local(&self) -> bool {
        !matches!(
            self,
            Error::Timeout | Error::Network(_) | Error::Http { .. } | Error::Api { .. }
        )
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout
        } else {
            Error::Network(err.to_string())
        }
    }
}

/// Result type alias for steward operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for reporting errors in JSON form
#[derive(serde::Serialize)]
pub struct JsonError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, Vec<String>>>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        let details = match err {
            Error::Api { details, .. } => details.clone(),
            _ => None,
        };
        JsonError {
            code: err.code(),
            message: err.to_string(),
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes_match_taxonomy() {
        assert_eq!(Error::Timeout.code(), "TIMEOUT");
        assert_eq!(Error::Network("reset".to_string()).code(), "NETWORK_ERROR");
        assert_eq!(
            Error::Http {
                status: 502,
                message: "Bad Gateway".to_string()
            }
            .code(),
            "HTTP_502"
        );
        assert_eq!(
            Error::Api {
                code: "VALIDATION_ERROR".to_string(),
                message: "title required".to_string(),
                details: None,
                status: 422,
            }
            .code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(Error::Conflict("task-1".to_string()).code(), "CONFLICT");
    }

    #[test]
    fn local_errors_are_flagged() {
        assert!(Error::Conflict("task-1".to_string()).is_local());
        assert!(Error::EmptyDraftTitle.is_local());
        assert!(!Error::Timeout.is_local());
        assert!(!Error::Http {
            status: 500,
            message: "boom".to_string()
        }
        .is_local());
    }

    #[test]
    fn json_error_carries_api_details() {
        let mut details = BTreeMap::new();
        details.insert("title".to_string(), vec!["required".to_string()]);
        let err = Error::Api {
            code: "VALIDATION_ERROR".to_string(),
            message: "invalid".to_string(),
            details: Some(details),
            status: 422,
        };
        let json = JsonError::from(&err);
        assert_eq!(json.code, "VALIDATION_ERROR");
        assert!(json.details.is_some());
    }
}
