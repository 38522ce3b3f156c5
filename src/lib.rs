//! # Palaver
//!
//! Composable pipelines for multi-step conversations with a language model.
//!
//! ## Features
//!
//! - **Shared conversation state**: a bounded message history plus a typed store, threaded through every step
//! - **Combinators**: sequence steps with [`Chain`], fan out with [`Parallel`], branch and loop with [`If`] and [`While`]
//! - **Deterministic merges**: parallel branches run concurrently but are merged back in declaration order
//! - **Retries**: actor steps retry with exponential backoff before failing the pipeline
//! - **Optional integrations**: an OpenAI-compatible actor (`llm` feature) and terminal helpers (`extra` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use palaver::prelude::*;
//!
//! # async fn run() -> Result<(), PipelineError> {
//! let done = Var::<bool>::fresh();
//!
//! let reviewer = Actor::new(Role::Assistant, move |history, store| async move {
//!     store.set(done, true);
//!     Ok::<_, ActorError>(format!("reviewed {} messages", history.len()))
//! });
//!
//! let pipeline = Chain::new()
//!     .then(user_prompt("Review this draft.", false))
//!     .then(While::new(
//!         move |store| !store.get(done).unwrap_or(false),
//!         reviewer.pipeline().retry_limit(3),
//!     ));
//!
//! let mut chat = Chat::new();
//! pipeline.execute(&mut chat).await?;
//! for message in chat.history().iter() {
//!     println!("{}: {}", message.role, message.content);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`core`]: chat state, store, steps and combinators
//! - [`prelude`]: commonly used types and traits (import with `use palaver::prelude::*`)
//! - `llm`: OpenAI-compatible actor (feature `llm`)
//! - `extra`: echo and stdin helpers for terminal programs (feature `extra`)

// ============================================================================
// Core Module
// ============================================================================

pub mod core;

// ============================================================================
// Public Re-exports - Granular Imports
// ============================================================================

pub use crate::core::{BoxPipeline, Pipeline};

// State
pub use crate::core::chat::{Chat, History, MAX_HISTORY_LENGTH};
pub use crate::core::message::{ActorId, Message, Metadata, Role};
pub use crate::core::store::{Store, StoreRO, Var};

// Errors
pub use crate::core::error::{ActorError, PipelineError};

// Steps
pub use crate::core::retry::RetryPolicy;
pub use crate::core::step::{Actor, ActorLogic, ActorPipeline, Echo, StaticPipeline, user_prompt};

// Combinators
pub use crate::core::combinators::{Chain, Condition, If, Parallel, While};

// ============================================================================
// Prelude Module - Convenient Bulk Imports
// ============================================================================

/// Imports everything needed to build and run pipelines.
///
/// # Example
/// ```rust
/// use palaver::prelude::*;
/// ```
pub mod prelude {
    pub use super::{
        // Steps
        Actor,
        ActorError,
        ActorLogic,
        ActorPipeline,
        // Combinators
        Chain,
        // State
        Chat,
        History,
        If,
        Message,
        Parallel,
        Pipeline,
        PipelineError,
        Role,
        StaticPipeline,
        Store,
        StoreRO,
        Var,
        While,
        user_prompt,
    };
}

// ============================================================================
// Optional Features
// ============================================================================

#[cfg(feature = "llm")]
pub mod llm;

#[cfg(feature = "llm")]
pub use llm::{ChatModel, LLMError, OpenAIActor, OpenAIConfig};

#[cfg(feature = "extra")]
pub mod extra;

// ============================================================================
// Library Metadata
// ============================================================================

/// The version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of this crate.
pub const NAME: &str = env!("CARGO_PKG_NAME");
