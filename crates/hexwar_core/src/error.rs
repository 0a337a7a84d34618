//! Error types for the territory simulation.

use thiserror::Error;

use crate::team::TeamId;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for the simulation core.
///
/// Only [`GameError::NoBaseCell`] and [`GameError::Config`] abort world
/// construction. Everything else is reported to the caller of a single
/// operation and the tick loop keeps running.
#[derive(Debug, Error)]
pub enum GameError {
    /// No free cell was found for a team's base.
    #[error("No valid base cell for team {team}")]
    NoBaseCell {
        /// Team that could not be placed.
        team: TeamId,
    },

    /// Obstacle or resource placement found no eligible cell.
    #[error("Invalid placement: {0}")]
    InvalidPlacement(String),

    /// Agent identifier does not refer to a live agent.
    #[error("Agent not found: {0}")]
    AgentNotFound(u32),

    /// Invalid world state.
    #[error("Invalid world state: {0}")]
    InvalidState(String),

    /// Configuration value out of range.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Aggregate cell/agent/resource scan failed.
    #[error("Aggregate scan failed: {0}")]
    ScanFailed(String),

    /// Snapshot encoding or decoding failed.
    #[error("Snapshot error: {0}")]
    Snapshot(String),
}
