use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::animation::{DEFAULT_MAX_INTERVAL_MS, MAX_SPEED, MIN_SPEED};
use crate::monte_carlo::{MonteCarloConfig, DEFAULT_SEED, DEFAULT_TRIALS, MAX_TRIALS};
use crate::probability::ProbabilityPolicy;
use crate::sequence::BallotCounts;
use crate::BallotError;

/// File looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "ballot.json";

/// Run parameters shared by the estimator and the animation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BallotConfig {
    /// Votes for candidate A
    pub a: u32,
    /// Votes for candidate B
    pub b: u32,
    /// Monte Carlo trials per estimate
    pub trials: u64,
    /// Seed for every random draw
    pub seed: u64,
    /// Playback speed percentage
    pub speed: u32,
    /// Tick interval at the slowest speed [ms]
    pub max_interval_ms: u64,
    pub policy: ProbabilityPolicy,
}

impl Default for BallotConfig {
    fn default() -> Self {
        Self {
            a: 7,
            b: 3,
            trials: DEFAULT_TRIALS,
            seed: DEFAULT_SEED,
            speed: 50,
            max_interval_ms: DEFAULT_MAX_INTERVAL_MS,
            policy: ProbabilityPolicy::Classic,
        }
    }
}

impl BallotConfig {
    pub fn validate(&self) -> Result<(), BallotError> {
        if self.a == 0 {
            return Err(BallotError::InvalidInput(
                "a must be at least 1".to_string(),
            ));
        }
        self.counts().ensure_within_limit()?;

        if self.trials == 0 || self.trials > MAX_TRIALS {
            return Err(BallotError::InvalidInput(format!(
                "trials must be in 1..={MAX_TRIALS}"
            )));
        }

        if !(MIN_SPEED..=MAX_SPEED).contains(&self.speed) {
            return Err(BallotError::InvalidInput(format!(
                "speed must be in {MIN_SPEED}..={MAX_SPEED}"
            )));
        }

        if self.max_interval_ms == 0 {
            return Err(BallotError::InvalidInput(
                "max_interval_ms must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    pub fn counts(&self) -> BallotCounts {
        BallotCounts::new(self.a, self.b)
    }

    pub fn monte_carlo(&self) -> MonteCarloConfig {
        MonteCarloConfig {
            counts: self.counts(),
            trials: self.trials,
            seed: self.seed,
            policy: self.policy,
        }
    }

    /// Probability under the configured policy
    pub fn theoretical(&self) -> f64 {
        self.policy.probability(self.a, self.b)
    }
}

/// Load `path`, else `ballot.json` in the working directory, else defaults.
pub fn load_config(path: Option<&Path>) -> Result<BallotConfig, BallotError> {
    if let Some(path) = path {
        return load_config_file(path);
    }

    let cwd_config = PathBuf::from(DEFAULT_CONFIG_FILE);
    if cwd_config.exists() {
        return load_config_file(&cwd_config);
    }

    Ok(BallotConfig::default())
}

pub fn load_config_file(path: &Path) -> Result<BallotConfig, BallotError> {
    debug!(path = %path.display(), "loading config");
    let raw = fs::read_to_string(path)?;
    let config: BallotConfig = serde_json::from_str(&raw)?;
    Ok(config)
}
