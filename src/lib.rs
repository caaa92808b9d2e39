//! Ballot Race - the classic ballot-counting problem
//!
//! Given `a` votes for candidate A and `b` votes for candidate B counted in a
//! uniformly random order, what is the probability that A strictly leads the
//! running tally after every ballot? This crate provides the closed-form
//! answer, a Monte Carlo estimator, and a step-by-step animation of a single
//! count rendered as a signed lead path.

pub mod animation;
pub mod config;
pub mod logging;
pub mod monte_carlo;
pub mod output;
pub mod probability;
pub mod render;
pub mod sequence;
pub mod tick;

use thiserror::Error;

// Re-export main types
pub use animation::{AnimationController, AnimationEvent, AnimationPhase, AnimationStatus};
pub use config::BallotConfig;
pub use monte_carlo::{
    estimate, estimate_with_policy, run_monte_carlo, MonteCarloConfig, MonteCarloResult,
};
pub use probability::{theoretical_probability, ProbabilityPolicy};
pub use render::{AxisBounds, LeadColor, PathPoint, PathRenderer, PathSink, Segment, TieMarker};
pub use sequence::{generate, Ballot, BallotCounts, Sequence, TallyState, MAX_BALLOTS};
pub use tick::{IntervalTicker, ManualTicker, TickSource};

#[derive(Debug, Error)]
pub enum BallotError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("cannot {operation} while {phase}")]
    InvalidTransition {
        operation: &'static str,
        phase: AnimationPhase,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
