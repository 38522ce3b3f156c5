use crate::core::chat::Chat;
use crate::core::error::PipelineError;
use crate::core::message::{ActorId, Message, Role};
use crate::core::{Pipeline, sealed};
use async_trait::async_trait;

/// Writes one fixed message, optionally after trimming the history.
#[derive(Debug, Clone)]
pub struct StaticPipeline {
    role: Role,
    content: String,
    trim: bool,
}

impl StaticPipeline {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            trim: false,
        }
    }

    /// Discard the history before writing.
    pub fn trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }
}

/// A user message, e.g. the prompt that opens a conversation.
pub fn user_prompt(content: impl Into<String>, trim: bool) -> StaticPipeline {
    StaticPipeline::new(Role::User, content).trim(trim)
}

impl sealed::Sealed for StaticPipeline {}

#[async_trait]
impl Pipeline for StaticPipeline {
    async fn execute(&self, chat: &mut Chat) -> Result<(), PipelineError> {
        if self.trim {
            chat.trim();
        }

        let mut message = Message::new(self.role, self.content.clone());
        message.actor = ActorId::USER;
        chat.write(message);

        Ok(())
    }

    fn trims(&self) -> bool {
        self.trim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_step_appends() {
        let mut chat = Chat::new();
        user_prompt("hello", false).execute(&mut chat).await.unwrap();
        StaticPipeline::new(Role::Assistant, "hi there")
            .execute(&mut chat)
            .await
            .unwrap();

        let history = chat.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].content, "hello");
        assert_eq!(history[0].actor(), ActorId::USER);
        assert_eq!(history[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_static_step_trims_first() {
        let mut chat = Chat::new();
        user_prompt("old", false).execute(&mut chat).await.unwrap();
        let step = user_prompt("fresh start", true);
        assert!(step.trims());
        step.execute(&mut chat).await.unwrap();

        let history = chat.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "fresh start");
    }
}
