//! Error taxonomy shared by every coordinator.
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("no files selected")]
    NoFiles,
    #[error("{invalid} file(s) are not PDFs and {oversized} file(s) exceed the size limit")]
    InvalidFiles { invalid: usize, oversized: usize },
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("{0}")]
    Invalid(&'static str),
    #[error("password too weak: {0}")]
    WeakPassword(&'static str),
    #[error("no uploaded script; upload a PDF first")]
    NoUpload,
    #[error("monthly guide limit reached ({used}/{limit})")]
    QuotaExceeded { used: u32, limit: u32 },
    #[error("another request is already in progress")]
    Busy,
    #[error("authentication failed")]
    Unauthorized,
    #[error("admin access required")]
    Forbidden,
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("network error: {0}")]
    Transport(String),
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },
    #[error("upload response did not include an upload id")]
    MissingUploadId,
    #[error("no content returned")]
    NoContent,
    #[error("unexpected response: {0}")]
    Contract(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}

impl ClientError {
    /// Single human-readable notice shown for this failure.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Unauthorized => {
                "Authentication failed. Please log in again.".to_string()
            }
            ClientError::Forbidden => "Admin Access Required".to_string(),
            ClientError::Timeout(limit) => format!(
                "Guide generation timed out after {} seconds. Please try again.",
                limit.as_secs()
            ),
            ClientError::NoContent => "No content returned from the server.".to_string(),
            ClientError::QuotaExceeded { used, limit } => format!(
                "You have used {used} of {limit} guides this month. Upgrade your plan to keep going."
            ),
            // Server text is surfaced verbatim.
            ClientError::Server { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Transport-level failures the user can retry by hand.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::Transport(_) | ClientError::Timeout(_) | ClientError::Server { .. }
        )
    }

    /// Caught before any network call.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ClientError::NoFiles
                | ClientError::InvalidFiles { .. }
                | ClientError::MissingField(_)
                | ClientError::Invalid(_)
                | ClientError::WeakPassword(_)
                | ClientError::NoUpload
                | ClientError::QuotaExceeded { .. }
                | ClientError::Busy
        )
    }
}
