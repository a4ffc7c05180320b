use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure body returned by the appointment service.
///
/// The service is inconsistent about the key casing, so both `error` and
/// `Error` are read. When both are present the lowercase key wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, rename = "Error", skip_serializing)]
    pub error_pascal: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            error_pascal: None,
        }
    }

    /// The service's message exactly as sent, unless it is blank.
    pub fn message(&self) -> Option<&str> {
        [self.error.as_deref(), self.error_pascal.as_deref()]
            .into_iter()
            .flatten()
            .find(|message| !message.trim().is_empty())
    }

    pub fn from_body(body: &str) -> Option<String> {
        serde_json::from_str::<Self>(body)
            .ok()
            .and_then(|envelope| envelope.message().map(str::to_string))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusParseError {
    #[error("unrecognized appointment status: {0}")]
    UnknownLabel(String),
    #[error("unrecognized appointment status ordinal: {0}")]
    UnknownOrdinal(u64),
}
