use thiserror::Error;

use crate::core::error::ActorError;

#[derive(Debug, Error)]
pub enum LLMError {
    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("OpenAI error: {0}")]
    OpenAIError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Error calling function {name}: {source}")]
    FunctionFailed {
        name: String,
        #[source]
        source: ActorError,
    },
}
