use crate::core::chat::Chat;
use crate::core::error::PipelineError;
use crate::core::store::StoreRO;
use crate::core::{BoxPipeline, Pipeline, sealed};
use async_trait::async_trait;
use std::sync::Arc;

/// A predicate over the store. Conditions only get a read-only view.
pub type Condition = Arc<dyn Fn(&StoreRO<'_>) -> bool + Send + Sync>;

/// Repeats `body` while `condition` holds.
///
/// The condition is evaluated before every iteration, never mid-body.
pub struct While {
    condition: Condition,
    body: BoxPipeline,
}

impl While {
    pub fn new<C, P>(condition: C, body: P) -> Self
    where
        C: Fn(&StoreRO<'_>) -> bool + Send + Sync + 'static,
        P: Pipeline + 'static,
    {
        While {
            condition: Arc::new(condition),
            body: Box::new(body),
        }
    }
}

impl sealed::Sealed for While {}

#[async_trait]
impl Pipeline for While {
    async fn execute(&self, chat: &mut Chat) -> Result<(), PipelineError> {
        while (self.condition)(&chat.store().ro()) {
            self.body.execute(chat).await?;
        }
        Ok(())
    }

    fn trims(&self) -> bool {
        self.body.trims()
    }
}

/// Runs `then` if `condition` holds, `otherwise` if not.
pub struct If {
    condition: Condition,
    then: BoxPipeline,
    otherwise: BoxPipeline,
}

impl If {
    pub fn new<C, L, R>(condition: C, then: L, otherwise: R) -> Self
    where
        C: Fn(&StoreRO<'_>) -> bool + Send + Sync + 'static,
        L: Pipeline + 'static,
        R: Pipeline + 'static,
    {
        If {
            condition: Arc::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }
}

impl sealed::Sealed for If {}

#[async_trait]
impl Pipeline for If {
    async fn execute(&self, chat: &mut Chat) -> Result<(), PipelineError> {
        if (self.condition)(&chat.store().ro()) {
            self.then.execute(chat).await
        } else {
            self.otherwise.execute(chat).await
        }
    }

    // unclear which branch will run, so only claim a trim both sides agree on
    fn trims(&self) -> bool {
        self.then.trims() && self.otherwise.trims()
    }
}
