pub mod chat;
pub mod combinators;
pub mod error;
pub mod message;
pub mod retry;
pub mod step;
pub mod store;

use async_trait::async_trait;
use chat::Chat;
use error::PipelineError;
use std::sync::Arc;

pub(crate) mod sealed {
    /// Keeps `Pipeline` closed: only the engine may write to a chat.
    pub trait Sealed {}
}

/// A composable unit of work executed against a [`Chat`].
///
/// Pipelines are immutable once built and may be executed against any number
/// of chats. The node set is closed: static and actor steps as leaves,
/// [`Chain`](combinators::chain::Chain), [`Parallel`](combinators::parallel::Parallel),
/// [`While`](combinators::control::While) and [`If`](combinators::control::If)
/// as inner nodes.
#[async_trait]
pub trait Pipeline: sealed::Sealed + Send + Sync {
    /// Runs the pipeline, writing any produced messages to `chat`.
    async fn execute(&self, chat: &mut Chat) -> Result<(), PipelineError>;

    /// Whether running this pipeline discards the prior history.
    ///
    /// Parents use this as a hint; it never changes how a node itself runs.
    fn trims(&self) -> bool;
}

/// A type-erased pipeline, as stored by the combinators.
pub type BoxPipeline = Box<dyn Pipeline>;

impl<P: Pipeline + ?Sized> sealed::Sealed for Box<P> {}

#[async_trait]
impl<P: Pipeline + ?Sized> Pipeline for Box<P> {
    async fn execute(&self, chat: &mut Chat) -> Result<(), PipelineError> {
        (**self).execute(chat).await
    }

    fn trims(&self) -> bool {
        (**self).trims()
    }
}

impl<P: Pipeline + ?Sized> sealed::Sealed for Arc<P> {}

#[async_trait]
impl<P: Pipeline + ?Sized> Pipeline for Arc<P> {
    async fn execute(&self, chat: &mut Chat) -> Result<(), PipelineError> {
        (**self).execute(chat).await
    }

    fn trims(&self) -> bool {
        (**self).trims()
    }
}
