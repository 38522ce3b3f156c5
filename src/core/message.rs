use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Opaque per-message payload owned by backend adapters.
///
/// The engine copies it around but never looks inside.
pub type Metadata = serde_json::Value;

/// The role of a participant in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Function,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Function => "function",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static LAST_ACTOR_ID: AtomicU32 = AtomicU32::new(0);

/// Identity of the actor that wrote a message.
///
/// Ids are handed out by a process-wide counter and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct ActorId(u32);

impl ActorId {
    /// Stamped on messages written by static steps.
    pub const USER: ActorId = ActorId(0);

    pub(crate) fn fresh() -> Self {
        ActorId(LAST_ACTOR_ID.fetch_add(1, Ordering::Relaxed) + 1)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Set by the engine when the message is written to a chat.
    #[serde(default)]
    pub(crate) actor: ActorId,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: Metadata,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            actor: ActorId::USER,
            metadata: Metadata::Null,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn function(content: impl Into<String>) -> Self {
        Self::new(Role::Function, content)
    }

    /// Attaches backend-specific metadata.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// The actor that produced this message.
    pub fn actor(&self) -> ActorId {
        self.actor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_display() {
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::Assistant.to_string(), "assistant");
        assert_eq!(Role::Function.to_string(), "function");
    }

    #[test]
    fn test_fresh_actor_ids_are_unique_and_nonzero() {
        let a = ActorId::fresh();
        let b = ActorId::fresh();
        assert_ne!(a, b);
        assert_ne!(a, ActorId::USER);
        assert!(b > a);
    }

    #[test]
    fn test_message_serialization_skips_null_metadata() {
        let plain = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(plain["role"], json!("user"));
        assert!(plain.get("metadata").is_none());

        let tagged = Message::function("42").with_metadata(json!({"id": "call_1_0"}));
        let value = serde_json::to_value(&tagged).unwrap();
        assert_eq!(value["metadata"]["id"], json!("call_1_0"));

        let back: Message = serde_json::from_value(value).unwrap();
        assert_eq!(back, tagged);
    }
}
