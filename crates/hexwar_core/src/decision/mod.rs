//! Pluggable agent decision layer.
//!
//! Agents follow their movement patterns on their own. On top of that, a
//! [`DecisionProvider`] may be consulted with a [`Perception`] snapshot and
//! answers with an action verb, a target descriptor and free-text
//! reasoning. Requests go through a rate-limited [`DecisionQueue`] and the
//! answer arrives on a later tick, so the simulation never waits for a
//! provider.
//!
//! Every failure in this layer (timeouts, malformed answers, unknown verbs)
//! is recovered locally with a deterministic fallback action.

pub mod action;
pub mod executor;
pub mod knowledge;
pub mod memory;
pub mod perception;
pub mod provider;
pub mod queue;
mod system;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use action::{ActionKind, Decision, TargetDescriptor};
pub use executor::{ActionExecutor, Intent};
pub use knowledge::TeamKnowledge;
pub use memory::{AgentMemory, MemoryEvent};
pub use perception::{Observer, Perception, WorldView};
pub use provider::{
    fallback_decision, parse_response, DecisionProvider, RawDecision, RuleBasedProvider, ScriptedProvider,
};
pub use queue::{DecisionQueue, Resolution};
pub(crate) use system::DecisionContext;
pub use system::DecisionSystem;

/// Failure inside the decision layer. Never fatal to the tick.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum DecisionError {
    /// The provider did not answer in time.
    #[error("Decision request timed out")]
    Timeout,

    /// The answer could not be parsed.
    #[error("Malformed decision: {0}")]
    Malformed(String),

    /// The answer named a verb outside the action set.
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// The provider itself reported a failure.
    #[error("Provider failure: {0}")]
    Provider(String),
}
