//! Pipelines built out of other pipelines.
//!
//! - [`Chain`]: children in order, over the same chat
//! - [`Parallel`]: children concurrently over private copies of the history,
//!   merged back in declaration order
//! - [`While`] / [`If`]: control flow driven by a [`Condition`] on the store

pub mod chain;
pub mod control;
pub mod parallel;

pub use chain::Chain;
pub use control::{Condition, If, While};
pub use parallel::Parallel;
