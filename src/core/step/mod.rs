//! Leaf pipelines.
//!
//! - [`StaticPipeline`] writes one fixed message.
//! - [`ActorPipeline`] runs an [`Actor`] inside a retry envelope and writes
//!   whatever it produced.

pub mod actor;
pub mod static_step;

pub use actor::{Actor, ActorLogic, ActorPipeline, Echo};
pub use static_step::{StaticPipeline, user_prompt};
