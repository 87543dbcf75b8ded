use thiserror::Error;

pub const GENERIC_FAILURE: &str = "Failed to fetch match data";
pub const NO_MATCHES: &str = "No matches found";

/// Failures on the analyze path. All of them end up as the session's error line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalyzeError {
    #[error("{0}")]
    Input(String),

    #[error("{0}")]
    Transport(String),

    #[error("request failed with status {status}")]
    Backend {
        status: u16,
        message: Option<String>,
    },

    #[error("No matches found")]
    EmptyResult,

    #[error("malformed payload: {0}")]
    Malformed(String),
}

impl AnalyzeError {
    /// Text shown to the user: structured backend message first, then transport text,
    /// then a generic fallback.
    pub fn user_message(&self) -> String {
        let msg = match self {
            AnalyzeError::Backend {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => return message.clone(),
            AnalyzeError::Backend { status, .. } => {
                format!("Request failed with status code {status}")
            }
            AnalyzeError::EmptyResult => NO_MATCHES.to_string(),
            AnalyzeError::Input(msg)
            | AnalyzeError::Transport(msg)
            | AnalyzeError::Malformed(msg) => msg.clone(),
        };
        if msg.trim().is_empty() {
            GENERIC_FAILURE.to_string()
        } else {
            msg
        }
    }
}
