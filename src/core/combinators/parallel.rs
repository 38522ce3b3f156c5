use crate::core::chat::Chat;
use crate::core::error::PipelineError;
use crate::core::{BoxPipeline, Pipeline, sealed};
use async_trait::async_trait;
use futures::future::join_all;

/// Runs pipelines concurrently, each on a private copy of the history.
///
/// All branches share the parent's store. Once every branch has finished,
/// the messages each branch wrote are appended to the parent in branch order,
/// regardless of which branch finished first. If any branch fails, nothing is
/// merged and the error of the lowest-indexed failing branch is returned.
///
/// Branches are polled concurrently on the task that executes the `Parallel`;
/// no task is spawned per branch. A branch that blocks its thread (a
/// synchronous sleep or read, say) stalls its siblings too, so actor bodies
/// doing blocking work should move it to `tokio::task::spawn_blocking`.
#[derive(Default)]
pub struct Parallel {
    pipelines: Vec<BoxPipeline>,
}

impl Parallel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a branch.
    pub fn branch<P: Pipeline + 'static>(mut self, pipeline: P) -> Self {
        self.pipelines.push(Box::new(pipeline));
        self
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }
}

impl From<Vec<BoxPipeline>> for Parallel {
    fn from(pipelines: Vec<BoxPipeline>) -> Self {
        Parallel { pipelines }
    }
}

impl sealed::Sealed for Parallel {}

#[async_trait]
impl Pipeline for Parallel {
    async fn execute(&self, chat: &mut Chat) -> Result<(), PipelineError> {
        if self.pipelines.is_empty() {
            return Ok(());
        }

        let mut branches: Vec<Chat> = self.pipelines.iter().map(|_| chat.fork()).collect();

        let results = join_all(
            self.pipelines
                .iter()
                .zip(branches.iter_mut())
                .map(|(pipeline, branch)| pipeline.execute(branch)),
        )
        .await;

        let mut first_error = None;
        for (index, result) in results.into_iter().enumerate() {
            if let Err(err) = result {
                log::error!("chat {}: parallel branch {} failed: {}", chat.id(), index, err);
                first_error.get_or_insert(err);
            }
        }
        if let Some(err) = first_error {
            return Err(err);
        }

        if self.trims() {
            chat.trim();
        }

        for branch in &branches {
            for message in branch.unique_messages() {
                chat.write(message.clone());
            }
        }
        log::debug!(
            "chat {}: merged {} parallel branches",
            chat.id(),
            branches.len()
        );

        Ok(())
    }

    /// True only when every branch trims; an empty `Parallel` does not.
    fn trims(&self) -> bool {
        !self.pipelines.is_empty() && self.pipelines.iter().all(|p| p.trims())
    }
}
