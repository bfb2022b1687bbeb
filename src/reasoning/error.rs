//! Error types for the reasoning ticket store.

use thiserror::Error;

/// Result type for reasoning store operations.
pub type ReasoningResult<T> = Result<T, ReasoningError>;

/// Errors surfaced by the ticket store, learning log and coordinator.
#[derive(Debug, Error)]
pub enum ReasoningError {
    /// Malformed tool input.
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Another reasoning cycle is still active in this workspace.
    #[error(
        "An active reasoning ticket already exists for this workspace (id: {ticket_id}, task: \"{task_description}\"). \
         Log a reflection for it or revert it before starting a new cycle."
    )]
    Conflict {
        ticket_id: String,
        task_description: String,
    },

    /// No active ticket with this id.
    #[error("No active reasoning ticket with id {ticket_id} in this workspace")]
    NotFound { ticket_id: String },

    /// A persisted document exists but cannot be parsed.
    #[error("Stored {document} is corrupt and was left untouched: {source}")]
    StorageCorrupt {
        document: String,
        #[source]
        source: serde_json::Error,
    },

    /// A value could not be encoded as JSON.
    #[error("Failed to encode {what}: {source}")]
    Encode {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    /// The ticket was completed but its reflection could not be recorded.
    #[error(
        "Ticket {ticket_id} was marked completed, but its reflection may not have been recorded: {source}"
    )]
    PartialFailure {
        ticket_id: String,
        #[source]
        source: Box<ReasoningError>,
    },

    /// Filesystem failure.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl ReasoningError {
    pub fn validation(message: impl Into<String>) -> Self {
        ReasoningError::Validation {
            message: message.into(),
        }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        ReasoningError::Io {
            context: context.into(),
            source,
        }
    }
}
