use crate::core::chat::{Chat, History};
use crate::core::error::{ActorError, PipelineError};
use crate::core::message::{ActorId, Message, Role};
use crate::core::retry::RetryPolicy;
use crate::core::store::Store;
use crate::core::{Pipeline, sealed};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Observer invoked with every message an actor step writes.
pub type Echo = Arc<dyn Fn(&Message) + Send + Sync>;

/// The body of an [`Actor`]: turns a history snapshot and the store into new messages.
///
/// This is the contract a model backend implements to take part in a pipeline.
#[async_trait]
pub trait ActorLogic: Send + Sync + 'static {
    async fn act(&self, history: History, store: Store) -> Result<Vec<Message>, ActorError>;
}

/// Adapts a closure producing a single message body.
struct ContentFn<F> {
    role: Role,
    f: F,
}

#[async_trait]
impl<F, Fut> ActorLogic for ContentFn<F>
where
    F: Fn(History, Store) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<String, ActorError>> + Send + 'static,
{
    async fn act(&self, history: History, store: Store) -> Result<Vec<Message>, ActorError> {
        let content = (self.f)(history, store).await?;
        Ok(vec![Message::new(self.role, content)])
    }
}

/// Adapts a closure producing any number of messages.
struct MessagesFn<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> ActorLogic for MessagesFn<F>
where
    F: Fn(History, Store) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<Message>, ActorError>> + Send + 'static,
{
    async fn act(&self, history: History, store: Store) -> Result<Vec<Message>, ActorError> {
        (self.f)(history, store).await
    }
}

/// A named, role-tagged participant in a conversation.
///
/// Each actor gets a process-unique [`ActorId`] at construction, stamped onto
/// every message it writes. Cloning keeps the identity.
#[derive(Clone)]
pub struct Actor {
    id: ActorId,
    role: Role,
    logic: Arc<dyn ActorLogic>,
}

impl fmt::Debug for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actor")
            .field("id", &self.id)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

impl Actor {
    /// An actor whose body returns the content of one message with `role`.
    pub fn new<F, Fut>(role: Role, f: F) -> Self
    where
        F: Fn(History, Store) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, ActorError>> + Send + 'static,
    {
        Self::from_logic(role, ContentFn { role, f })
    }

    /// An actor whose body returns complete messages, possibly several and of
    /// different roles (an assistant reply followed by tool results, say).
    pub fn new_multi<F, Fut>(role: Role, f: F) -> Self
    where
        F: Fn(History, Store) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<Message>, ActorError>> + Send + 'static,
    {
        Self::from_logic(role, MessagesFn { f })
    }

    pub fn from_logic<L: ActorLogic>(role: Role, logic: L) -> Self {
        Actor {
            id: ActorId::fresh(),
            role,
            logic: Arc::new(logic),
        }
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Wraps the actor into an executable step (single attempt, no echo, no trim).
    pub fn pipeline(&self) -> ActorPipeline {
        ActorPipeline {
            actor: self.clone(),
            echo: None,
            trim: false,
            retry: RetryPolicy::default(),
        }
    }
}

/// An [`Actor`] inside a retry envelope.
#[derive(Clone)]
pub struct ActorPipeline {
    actor: Actor,
    echo: Option<Echo>,
    trim: bool,
    retry: RetryPolicy,
}

impl fmt::Debug for ActorPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorPipeline")
            .field("actor", &self.actor)
            .field("echo", &self.echo.is_some())
            .field("trim", &self.trim)
            .field("retry", &self.retry)
            .finish()
    }
}

impl ActorPipeline {
    /// Calls `echo` with each produced message before it is written.
    pub fn echo(mut self, echo: impl Fn(&Message) + Send + Sync + 'static) -> Self {
        self.echo = Some(Arc::new(echo));
        self
    }

    /// Replace the history with the produced messages instead of appending.
    pub fn trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    /// Total number of attempts; 0 behaves like 1.
    pub fn retry_limit(mut self, limit: usize) -> Self {
        self.retry = RetryPolicy::new(limit).with_backoff(self.retry.base());
        self
    }

    /// Base of the exponential backoff between attempts (1s by default).
    pub fn backoff(mut self, base: Duration) -> Self {
        self.retry = self.retry.with_backoff(base);
        self
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    async fn invoke(&self, history: History, store: &Store) -> Result<Vec<Message>, PipelineError> {
        let attempts = self.retry.attempts();
        let mut attempt = 0;

        loop {
            let err = match self.actor.logic.act(history.clone(), store.clone()).await {
                Ok(messages) => return Ok(messages),
                Err(err) => err,
            };

            match self.retry.delay_after(attempt) {
                Some(delay) => {
                    log::warn!(
                        "actor {} attempt {}/{} failed: {}; retrying in {:?}",
                        self.actor.id,
                        attempt + 1,
                        attempts,
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => {
                    log::warn!(
                        "actor {} attempt {}/{} failed: {}",
                        self.actor.id,
                        attempt + 1,
                        attempts,
                        err
                    );
                    return Err(PipelineError::Actor {
                        actor: self.actor.id,
                        attempts,
                        source: err,
                    });
                }
            }
        }
    }
}

impl sealed::Sealed for ActorPipeline {}

#[async_trait]
impl Pipeline for ActorPipeline {
    async fn execute(&self, chat: &mut Chat) -> Result<(), PipelineError> {
        let messages = self.invoke(chat.history(), chat.store()).await?;

        if self.trim {
            chat.trim();
        }

        for mut message in messages {
            if let Some(echo) = &self.echo {
                echo(&message);
            }
            message.actor = self.actor.id;
            chat.write(message);
        }

        Ok(())
    }

    fn trims(&self) -> bool {
        self.trim
    }
}
