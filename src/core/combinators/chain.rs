use crate::core::chat::Chat;
use crate::core::error::PipelineError;
use crate::core::{BoxPipeline, Pipeline, sealed};
use async_trait::async_trait;

/// Runs pipelines one after the other against the same chat.
///
/// Each child sees everything its predecessors wrote. The first error stops
/// the chain.
#[derive(Default)]
pub struct Chain {
    pipelines: Vec<BoxPipeline>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step to the chain.
    pub fn then<P: Pipeline + 'static>(mut self, pipeline: P) -> Self {
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

impl From<Vec<BoxPipeline>> for Chain {
    fn from(pipelines: Vec<BoxPipeline>) -> Self {
        Chain { pipelines }
    }
}

impl sealed::Sealed for Chain {}

#[async_trait]
impl Pipeline for Chain {
    async fn execute(&self, chat: &mut Chat) -> Result<(), PipelineError> {
        for pipeline in &self.pipelines {
            pipeline.execute(chat).await?;
        }
        Ok(())
    }

    fn trims(&self) -> bool {
        self.pipelines.iter().any(|p| p.trims())
    }
}
