use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::probability::ProbabilityPolicy;
use crate::sequence::{generate, Ballot, BallotCounts, TallyState};
use crate::BallotError;

/// Upper bound on trials for one blocking estimate.
pub const MAX_TRIALS: u64 = 2_000_000;
pub const DEFAULT_TRIALS: u64 = 10_000;
pub const DEFAULT_SEED: u64 = 0xBA11_07;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonteCarloResult {
    pub trials: u64,
    pub successes: u64,
    pub empirical: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    pub counts: BallotCounts,
    pub trials: u64,
    pub seed: u64,
    #[serde(default)]
    pub policy: ProbabilityPolicy,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            counts: BallotCounts::new(7, 3),
            trials: DEFAULT_TRIALS,
            seed: DEFAULT_SEED,
            policy: ProbabilityPolicy::Classic,
        }
    }
}

impl MonteCarloConfig {
    pub fn validate(&self) -> Result<(), BallotError> {
        if self.trials == 0 || self.trials > MAX_TRIALS {
            return Err(BallotError::InvalidInput(format!(
                "trials must be in 1..={MAX_TRIALS}, got {}",
                self.trials
            )));
        }
        self.counts.ensure_within_limit()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct MonteCarloSummary {
    pub a: u32,
    pub b: u32,
    pub policy: ProbabilityPolicy,
    pub trials: u64,
    pub seed: u64,
    pub successes: u64,
    pub empirical: f64,
    pub theoretical: f64,
    pub abs_error: f64,
    pub std_error: f64,
}

/// True when A is strictly ahead after every ballot of `sequence`.
///
/// An empty sequence has no prefix where A leads, so it does not count.
pub fn lead_holds_throughout(sequence: &[Ballot]) -> bool {
    if sequence.is_empty() {
        return false;
    }
    let mut tally = TallyState::new();
    sequence.iter().all(|&ballot| tally.record(ballot) > 0)
}

/// True when the candidate with more votes is strictly ahead after every
/// ballot. A tied count has no winner and never succeeds.
pub fn winner_leads_throughout(sequence: &[Ballot]) -> bool {
    let counts = BallotCounts::of_sequence(sequence);
    let final_lead = i64::from(counts.a) - i64::from(counts.b);
    if final_lead == 0 {
        return false;
    }
    let mut tally = TallyState::new();
    sequence
        .iter()
        .all(|&ballot| tally.record(ballot).signum() == final_lead.signum())
}

/// Estimate the ballot probability from `trials` random counts.
pub fn estimate<R: Rng + ?Sized>(
    a: u32,
    b: u32,
    trials: u64,
    rng: &mut R,
) -> Result<MonteCarloResult, BallotError> {
    estimate_with_policy(ProbabilityPolicy::Classic, a, b, trials, rng)
}

/// Estimate the probability `policy` describes from `trials` random counts.
pub fn estimate_with_policy<R: Rng + ?Sized>(
    policy: ProbabilityPolicy,
    a: u32,
    b: u32,
    trials: u64,
    rng: &mut R,
) -> Result<MonteCarloResult, BallotError> {
    if trials == 0 {
        return Err(BallotError::InvalidInput(
            "trials must be greater than zero".to_string(),
        ));
    }
    BallotCounts::new(a, b).ensure_within_limit()?;

    // No ordering can satisfy the policy, so skip the sampling.
    if policy.probability(a, b) == 0.0 {
        debug!(
            a,
            b,
            trials,
            policy = policy.label(),
            "no ordering can succeed; skipping trials"
        );
        return Ok(MonteCarloResult {
            trials,
            successes: 0,
            empirical: 0.0,
        });
    }

    let holds: fn(&[Ballot]) -> bool = match policy {
        ProbabilityPolicy::Classic => lead_holds_throughout,
        ProbabilityPolicy::Symmetric => winner_leads_throughout,
    };
    let successes = (0..trials)
        .filter(|_| holds(&generate(a, b, &mut *rng)))
        .count() as u64;

    Ok(MonteCarloResult {
        trials,
        successes,
        empirical: successes as f64 / trials as f64,
    })
}

/// Run a seeded estimate described by `config`.
pub fn run_monte_carlo(config: &MonteCarloConfig) -> Result<MonteCarloResult, BallotError> {
    config.validate()?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let BallotCounts { a, b } = config.counts;

    info!(
        a,
        b,
        trials = config.trials,
        seed = config.seed,
        policy = config.policy.label(),
        "running Monte Carlo estimate"
    );
    let result = estimate_with_policy(config.policy, a, b, config.trials, &mut rng)?;
    info!(
        successes = result.successes,
        empirical = result.empirical,
        "Monte Carlo estimate complete"
    );
    Ok(result)
}

pub fn summarize(config: &MonteCarloConfig, result: &MonteCarloResult) -> MonteCarloSummary {
    let theoretical = config.policy.probability(config.counts.a, config.counts.b);
    let p = result.empirical;

    MonteCarloSummary {
        a: config.counts.a,
        b: config.counts.b,
        policy: config.policy,
        trials: result.trials,
        seed: config.seed,
        successes: result.successes,
        empirical: p,
        theoretical,
        abs_error: (p - theoretical).abs(),
        std_error: (p * (1.0 - p) / result.trials as f64).sqrt(),
    }
}
