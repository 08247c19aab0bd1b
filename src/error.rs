//! Error types for GoalPilot
//!
//! This module provides the error hierarchy used across the orchestrator,
//! built on `thiserror`. Every error that reaches a caller is rendered as a
//! single `error` message whose detail is the `Display` text below.

use thiserror::Error;

/// The main error type for GoalPilot operations
#[derive(Error, Debug)]
pub enum Error {
    /// Model collaborator errors
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Errors recovering structured data from model output
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Inbound message errors
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Goal session errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

/// Errors from the hosted language-model call
#[derive(Error, Debug)]
pub enum ModelError {
    /// The model endpoint could not be reached
    #[error("Model unavailable: {0}")]
    Unavailable(String),

    /// The model endpoint answered with a failure status
    #[error("Model HTTP error {status}: {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Response body or error message
        message: String,
    },

    /// The model answered with no content
    #[error("Model returned no response")]
    EmptyResponse,

    /// The model call did not finish in time
    #[error("Model call timed out after {0}ms")]
    Timeout(u64),

    /// Missing or invalid model configuration
    #[error("Invalid model configuration: {0}")]
    Config(String),
}

/// Errors recovering JSON payloads from model output
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// No balanced JSON value in the text
    #[error("No JSON found in model output: {raw}")]
    NoJsonFound {
        /// The full model text
        raw: String,
    },

    /// A balanced span was found but is not valid JSON
    #[error("Model returned malformed JSON ({reason}): {raw}")]
    MalformedJson {
        /// The extracted span
        raw: String,
        /// Parser diagnostic
        reason: String,
    },

    /// An action kind outside the known set
    #[error("Unknown action kind: {0}")]
    UnknownActionKind(String),

    /// An evaluation status outside completed/replan/continue
    #[error("Unknown evaluation status: {0}")]
    UnknownStatus(String),

    /// A required field is absent from the model payload
    #[error("Missing field in model output: {0}")]
    MissingField(&'static str),
}

/// Inbound message errors
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The message is not valid structured data
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// The message has a `type` this server does not handle
    #[error("Unknown message type: {0}")]
    UnknownType(String),

    /// No goal was supplied where one is required
    #[error("No goal has been set")]
    MissingGoal,
}

/// Goal session errors
#[derive(Error, Debug)]
pub enum SessionError {
    /// The session is finished and needs a new `init`
    #[error("Session is {0}; send init to start a new goal")]
    Inactive(String),

    /// The evaluation asked for more replans than allowed
    #[error("Replan limit of {0} reached for this goal")]
    ReplanLimit(u32),
}

/// Result type alias for GoalPilot operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a generic error from a string
    pub fn generic<S: Into<String>>(msg: S) -> Self {
        Error::Generic(msg.into())
    }

    /// Short label used for metrics breakdowns
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Model(ModelError::Timeout(_)) => "model_timeout",
            Error::Model(_) => "model",
            Error::Extraction(_) => "extraction",
            Error::Protocol(_) => "protocol",
            Error::Session(_) => "session",
            Error::Io(_) => "io",
            Error::Json(_) => "json",
            Error::Generic(_) => "generic",
        }
    }
}

impl From<reqwest::Error> for ModelError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ModelError::Unavailable(format!("request timed out: {}", err))
        } else {
            ModelError::Unavailable(err.to_string())
        }
    }
}
