//! Error taxonomy shared by every client and the pipeline.

/// Errors produced while answering a discussion topic.
#[derive(Debug, thiserror::Error)]
pub enum ResponderError {
    /// Required configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A remote API answered with a status outside the accepted set.
    #[error("{operation} failed with status {status}: {body}")]
    Remote {
        operation: &'static str,
        status: u16,
        body: String,
    },

    /// The course has no discussion topics.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The downloaded document could not be parsed as a PDF.
    #[error("Failed to parse PDF: {0}")]
    Parse(String),

    /// The completion provider refused the prompt or filtered the output.
    /// `status` is set when the refusal came as an HTTP error.
    #[error("Content policy violation: {message}")]
    PolicyViolation { status: Option<u16>, message: String },

    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A response body did not have the expected JSON shape.
    #[error("Unexpected response from {context}: {message}")]
    Decode {
        context: &'static str,
        message: String,
    },
}

impl ResponderError {
    /// HTTP status carried by a remote failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } => Some(*status),
            Self::PolicyViolation { status, .. } => *status,
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ResponderError>;
