//! Error types for the dashboard client.

use crate::controller::JobPhase;
use crate::model::JobId;

/// Client errors.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Input rejected before any network call.
    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// Network or backend failure on a user-initiated request.
    #[error("request failed: {message}")]
    Request {
        message: String,
        status: Option<u16>,
    },

    /// Backend answered, but the body did not match the expected shape.
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },

    /// A single metrics fetch failed while polling. Never surfaced to callers
    /// of the controller; the next tick retries.
    #[error("metrics fetch for job {job_id} failed: {message}")]
    TransientPoll { job_id: JobId, message: String },

    /// A reference was submitted before the job's base metrics finished.
    #[error("job {job_id} is not ready for a reference (phase: {phase})")]
    NotReady { job_id: JobId, phase: JobPhase },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl ClientError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn request(message: impl Into<String>) -> Self {
        Self::Request {
            message: message.into(),
            status: None,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            // Backend / transport
            Self::Request { .. } => 1,
            Self::InvalidResponse { .. } => 1,
            Self::TransientPoll { .. } => 1,

            // User must correct input or wait
            Self::Validation { .. } => 2,
            Self::NotReady { .. } => 2,
            Self::Config { .. } => 2,
        }
    }

    /// Whether the error belongs to the request class (user must resend).
    pub fn is_request_error(&self) -> bool {
        matches!(self, Self::Request { .. } | Self::InvalidResponse { .. })
    }

    /// Downgrade a fetch failure into the transient poll class.
    pub(crate) fn into_transient(self, job_id: &JobId) -> Self {
        match self {
            transient @ Self::TransientPoll { .. } => transient,
            other => Self::TransientPoll {
                job_id: job_id.clone(),
                message: other.to_string(),
            },
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Request {
            message: err.to_string(),
            status: err.status().map(|s| s.as_u16()),
        }
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_split_request_from_input_errors() {
        assert_eq!(ClientError::request("boom").exit_code(), 1);
        assert_eq!(ClientError::validation("prompt", "empty").exit_code(), 2);
        assert_eq!(ClientError::config("bad").exit_code(), 2);
    }

    #[test]
    fn transient_conversion_keeps_original_message() {
        let job = JobId::from("7");
        let err = ClientError::request("HTTP 502: bad gateway").into_transient(&job);
        match err {
            ClientError::TransientPoll { job_id, message } => {
                assert_eq!(job_id, job);
                assert!(message.contains("bad gateway"));
            }
            other => panic!("expected TransientPoll, got {other:?}"),
        }
    }

    #[test]
    fn request_class() {
        assert!(ClientError::request("x").is_request_error());
        assert!(ClientError::InvalidResponse {
            message: "x".into()
        }
        .is_request_error());
        assert!(!ClientError::validation("reference", "empty").is_request_error());
    }
}
