//! Headless match runner for balance testing and CI verification.
//!
//! This crate plays [`hexwar_core`] matches without any graphics:
//!
//! - **Single matches**: [`runner::MatchRunner`] plays one match to a
//!   decision or a time limit and returns its [`metrics::MatchMetrics`]
//! - **Batches**: [`batch::run_batch`] plays many seeds in parallel
//! - **Determinism checks**: [`runner::verify_seed`] replays a seed and
//!   compares the final state hashes
//! - **Terminal review**: [`ascii::render_world`] draws the arena as text
//!
//! # Example
//!
//! ```bash
//! cargo run -p hexwar_headless -- batch --count 50 --map small
//! ```

pub mod ascii;
pub mod batch;
pub mod match_config;
pub mod metrics;
pub mod runner;

pub use ascii::{render_world, AsciiConfig, AsciiSurface};
pub use batch::{run_batch, BatchConfig, BatchResults};
pub use match_config::{MatchConfig, MatchConfigError};
pub use metrics::{BatchSummary, MatchMetrics, MetricsCollector};
pub use runner::{verify_seed, DeterminismReport, MatchReport, MatchRunner};
