//! Closed-form ballot probabilities
//!
//! Bertrand's ballot theorem: if A receives `a` votes and B receives `b < a`
//! votes, the probability that A is strictly ahead throughout the count is
//! `(a - b) / (a + b)`.

use serde::{Deserialize, Serialize};

/// Which candidate the leading condition is evaluated for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbabilityPolicy {
    /// A must strictly lead at every prefix; zero whenever `a <= b`.
    #[default]
    Classic,
    /// Whichever candidate wins must lead throughout; zero only on a tie.
    Symmetric,
}

impl ProbabilityPolicy {
    /// Evaluate the policy for `a` votes for A and `b` votes for B.
    pub fn probability(self, a: u32, b: u32) -> f64 {
        match self {
            Self::Classic => theoretical_probability(a, b),
            Self::Symmetric => {
                if a == b {
                    return 0.0;
                }
                f64::from(a.abs_diff(b)) / (f64::from(a) + f64::from(b))
            }
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::Symmetric => "symmetric",
        }
    }
}

/// Probability that A strictly leads after every ballot.
///
/// Returns `0.0` when `a <= b`, otherwise `(a - b) / (a + b)`.
pub fn theoretical_probability(a: u32, b: u32) -> f64 {
    if a <= b {
        return 0.0;
    }
    f64::from(a - b) / (f64::from(a) + f64::from(b))
}
