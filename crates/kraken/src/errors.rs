use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures of the tool dispatch machinery. Property lookups never produce
/// one of these; their failures travel back to the model as tool output.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum AgentError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AgentResult<T> = Result<T, AgentError>;
