//! Chat-completions wire format and the assistant actor built on it.
//!
//! Tool calls survive in the conversation through message metadata: an
//! assistant message records the calls it made and how many results each
//! produced, and every result message records the call id it answers. A call
//! with id `X` that produced `k` results is replayed as calls `X_0 .. X_{k-1}`.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::chat::History;
use crate::core::error::ActorError;
use crate::core::message::{Message, Role};
use crate::core::step::{Actor, ActorLogic, ActorPipeline};
use crate::core::store::Store;
use crate::llm::{ChatModel, Client, LLMError};

// ============================================================================
// Wire types
// ============================================================================

/// Request body for `/v1/chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// A message in the chat-completions format, used both ways.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl WireMessage {
    fn plain(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain("assistant", content)
    }

    pub fn tool(content: impl Into<String>, call_id: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(call_id.into()),
            ..Self::plain("tool", content)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments, as produced by the model.
    pub arguments: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

fn function_kind() -> String {
    "function".to_string()
}

/// Response from the chat completions endpoint.
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub id: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created: DateTime<Utc>,
    pub model: String,
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub index: u32,
    pub message: WireMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

// ============================================================================
// Tool-call metadata
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ToolCallRecord {
    call: ToolCall,
    responses: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct AssistantMetadata {
    tool_calls: Vec<ToolCallRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionMetadata {
    tool_call_id: String,
}

fn response_id(call_id: &str, k: usize) -> String {
    format!("{}_{}", call_id, k)
}

/// Translates a conversation into wire messages, prefixed by `system_prompt`
/// when it is not empty.
///
/// A function result whose call is not issued by an earlier assistant message
/// in `history` (e.g. after truncation) is sent as a user message.
pub fn history_to_wire(system_prompt: &str, history: &[Message]) -> Vec<WireMessage> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    if !system_prompt.is_empty() {
        messages.push(WireMessage::system(system_prompt));
    }

    // a tool result is only valid after the assistant message that issued its call
    let mut issued = HashSet::new();
    for message in history {
        let wire = match message.role {
            Role::User => WireMessage::user(&message.content),
            Role::Assistant => {
                let mut wire = WireMessage::assistant(&message.content);
                if let Ok(metadata) = AssistantMetadata::deserialize(&message.metadata) {
                    wire.tool_calls = metadata
                        .tool_calls
                        .iter()
                        .flat_map(|record| {
                            (0..record.responses).map(move |k| ToolCall {
                                id: response_id(&record.call.id, k),
                                ..record.call.clone()
                            })
                        })
                        .collect();
                    issued.extend(wire.tool_calls.iter().map(|call| call.id.clone()));
                }
                wire
            }
            Role::Function => match FunctionMetadata::deserialize(&message.metadata) {
                Ok(metadata) if issued.contains(&metadata.tool_call_id) => {
                    WireMessage::tool(&message.content, metadata.tool_call_id)
                }
                // the call it answered was truncated away, keep the text
                _ => WireMessage::user(&message.content),
            },
        };
        messages.push(wire);
    }

    messages
}

// ============================================================================
// Actor
// ============================================================================

type ToolFn = Arc<dyn Fn(&str, &Store) -> Result<Vec<String>, ActorError> + Send + Sync>;

struct Function {
    definition: ToolDefinition,
    call: ToolFn,
}

type Registry = Arc<RwLock<HashMap<String, Function>>>;

#[derive(Clone)]
struct OpenAILogic {
    client: Client,
    model: ChatModel,
    system_prompt: String,
    functions: Registry,
}

impl OpenAILogic {
    fn request(&self, history: &[Message]) -> ChatRequest {
        let functions = self.functions.read().unwrap_or_else(PoisonError::into_inner);
        let mut tools: Vec<ToolDefinition> =
            functions.values().map(|f| f.definition.clone()).collect();
        tools.sort_by(|a, b| a.function.name.cmp(&b.function.name));

        ChatRequest {
            model: self.model.as_str().to_string(),
            messages: history_to_wire(&self.system_prompt, history),
            tools,
            temperature: self.client.config.temperature,
        }
    }

    fn call_tool(&self, call: &ToolCall, store: &Store) -> Result<Vec<String>, LLMError> {
        let name = &call.function.name;
        let tool = {
            let functions = self.functions.read().unwrap_or_else(PoisonError::into_inner);
            functions.get(name).map(|f| Arc::clone(&f.call))
        }
        .ok_or_else(|| LLMError::UnknownFunction(name.clone()))?;

        tool(&call.function.arguments, store).map_err(|source| LLMError::FunctionFailed {
            name: name.clone(),
            source,
        })
    }

    fn translate(&self, response: ChatResponse, store: &Store) -> Result<Vec<Message>, LLMError> {
        if response.choices.is_empty() {
            return Err(LLMError::InvalidResponse(
                "No choices in response".to_string(),
            ));
        }

        let mut messages = Vec::new();
        for choice in response.choices {
            let mut records = Vec::new();
            let mut results = Vec::new();

            for call in choice.message.tool_calls {
                let outputs = self.call_tool(&call, store)?;
                for (k, output) in outputs.iter().enumerate() {
                    let metadata = serde_json::to_value(FunctionMetadata {
                        tool_call_id: response_id(&call.id, k),
                    })?;
                    results.push(Message::function(output.as_str()).with_metadata(metadata));
                }
                records.push(ToolCallRecord {
                    responses: outputs.len(),
                    call,
                });
            }

            let mut assistant = Message::assistant(choice.message.content.unwrap_or_default());
            if !records.is_empty() {
                assistant = assistant.with_metadata(serde_json::to_value(AssistantMetadata {
                    tool_calls: records,
                })?);
            }
            messages.push(assistant);
            messages.extend(results);
        }

        Ok(messages)
    }
}

#[async_trait]
impl ActorLogic for OpenAILogic {
    async fn act(&self, history: History, store: Store) -> Result<Vec<Message>, ActorError> {
        let request = self.request(&history);
        let response = self.client.chat(&request).await?;
        Ok(self.translate(response, &store)?)
    }
}

/// An assistant actor backed by a chat-completions endpoint.
///
/// Functions registered with [`add_function`](Self::add_function) are offered
/// to the model as tools. When the model calls one, the actor runs it against
/// the store and writes the results after the assistant message.
#[derive(Clone)]
pub struct OpenAIActor {
    actor: Actor,
    logic: OpenAILogic,
}

impl fmt::Debug for OpenAIActor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAIActor")
            .field("actor", &self.actor)
            .field("model", &self.logic.model)
            .finish_non_exhaustive()
    }
}

impl OpenAIActor {
    pub fn new(client: Client, model: ChatModel, system_prompt: impl Into<String>) -> Self {
        let logic = OpenAILogic {
            client,
            model,
            system_prompt: system_prompt.into(),
            functions: Registry::default(),
        };
        OpenAIActor {
            actor: Actor::from_logic(Role::Assistant, logic.clone()),
            logic,
        }
    }

    /// Uses the model from the client's configuration.
    pub fn with_default_model(client: Client, system_prompt: impl Into<String>) -> Self {
        let model = client.config.model.clone();
        Self::new(client, model, system_prompt)
    }

    /// Registers a tool taking JSON arguments `I` and returning one JSON result.
    ///
    /// `parameters` is the JSON schema of `I` shown to the model. Registering
    /// a name twice replaces the earlier function.
    pub fn add_function<I, O, F>(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        f: F,
    ) -> &Self
    where
        I: DeserializeOwned + 'static,
        O: Serialize + 'static,
        F: Fn(I, &Store) -> Result<O, ActorError> + Send + Sync + 'static,
    {
        self.add_function_multi(name, description, parameters, move |input: I, store: &Store| {
            let output = f(input, store)?;
            Ok(vec![serde_json::to_string(&output)?])
        })
    }

    /// Registers a tool whose results become one message each.
    pub fn add_function_multi<I, F>(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        f: F,
    ) -> &Self
    where
        I: DeserializeOwned + 'static,
        F: Fn(I, &Store) -> Result<Vec<String>, ActorError> + Send + Sync + 'static,
    {
        let name = name.into();
        let call: ToolFn = Arc::new(
            move |arguments: &str, store: &Store| -> Result<Vec<String>, ActorError> {
                let input: I = serde_json::from_str(arguments)?;
                f(input, store)
            },
        );
        let function = Function {
            definition: ToolDefinition {
                kind: function_kind(),
                function: FunctionDefinition {
                    name: name.clone(),
                    description: description.into(),
                    parameters,
                },
            },
            call,
        };

        let mut functions = self
            .logic
            .functions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if functions.insert(name.clone(), function).is_some() {
            log::debug!("actor {}: replaced function {}", self.actor.id(), name);
        }
        self
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn pipeline(&self) -> ActorPipeline {
        self.actor.pipeline()
    }
}
