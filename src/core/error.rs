use crate::core::message::ActorId;
use thiserror::Error;

/// Error type returned by actor bodies.
pub type ActorError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Every attempt of an actor step failed; `source` is the last attempt's error.
    #[error("actor {actor} failed after {attempts} attempt(s): {source}")]
    Actor {
        actor: ActorId,
        attempts: usize,
        #[source]
        source: ActorError,
    },
}

impl PipelineError {
    /// The actor whose failure aborted the pipeline.
    pub fn actor(&self) -> ActorId {
        match self {
            PipelineError::Actor { actor, .. } => *actor,
        }
    }

    /// The error returned by the actor body.
    pub fn actor_error(&self) -> &ActorError {
        match self {
            PipelineError::Actor { source, .. } => source,
        }
    }
}
