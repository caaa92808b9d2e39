//! Ballot sequences and running tallies

use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::BallotError;

/// Most ballots one run may count (A up to 1000, B up to 999).
pub const MAX_BALLOTS: u64 = 1_999;

/// A single ballot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ballot {
    A,
    B,
}

impl fmt::Display for Ballot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ballot::A => f.write_str("A"),
            Ballot::B => f.write_str("B"),
        }
    }
}

/// One ordering of every ballot cast in a run
pub type Sequence = Vec<Ballot>;

/// Vote totals for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotCounts {
    /// Votes for candidate A
    pub a: u32,
    /// Votes for candidate B
    pub b: u32,
}

impl BallotCounts {
    pub fn new(a: u32, b: u32) -> Self {
        Self { a, b }
    }

    /// Number of ballots counted in a full run
    pub fn total(&self) -> u64 {
        u64::from(self.a) + u64::from(self.b)
    }

    /// Reject runs too large to generate and replay
    pub fn ensure_within_limit(&self) -> Result<(), BallotError> {
        if self.total() > MAX_BALLOTS {
            return Err(BallotError::InvalidInput(format!(
                "a + b must be at most {MAX_BALLOTS}, got {}",
                self.total()
            )));
        }
        Ok(())
    }

    /// Count the ballots of an existing sequence
    pub fn of_sequence(sequence: &[Ballot]) -> Self {
        let a = sequence.iter().filter(|&&ballot| ballot == Ballot::A).count() as u32;
        Self {
            a,
            b: sequence.len() as u32 - a,
        }
    }
}

/// Generate a uniformly random ordering of `a` A-ballots and `b` B-ballots.
///
/// A Fisher-Yates shuffle over the multiset makes every distinct ordering
/// equally likely. Pass a seeded RNG to reproduce a sequence.
pub fn generate<R: Rng + ?Sized>(a: u32, b: u32, rng: &mut R) -> Sequence {
    let mut sequence = Vec::with_capacity(a as usize + b as usize);
    sequence.extend(std::iter::repeat(Ballot::A).take(a as usize));
    sequence.extend(std::iter::repeat(Ballot::B).take(b as usize));
    sequence.shuffle(rng);
    sequence
}

/// Running tally after `step_index` ballots
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TallyState {
    pub step_index: u32,
    pub count_a: u32,
    pub count_b: u32,
}

impl TallyState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A's lead over B (negative when B is ahead)
    pub fn lead(&self) -> i64 {
        i64::from(self.count_a) - i64::from(self.count_b)
    }

    /// Count one ballot and return the new lead
    pub fn record(&mut self, ballot: Ballot) -> i64 {
        match ballot {
            Ballot::A => self.count_a += 1,
            Ballot::B => self.count_b += 1,
        }
        self.step_index += 1;
        self.lead()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_total_does_not_overflow() {
        let counts = BallotCounts::new(u32::MAX, 1);
        assert_eq!(counts.total(), u64::from(u32::MAX) + 1);
        assert!(matches!(
            counts.ensure_within_limit(),
            Err(BallotError::InvalidInput(_))
        ));
        assert!(BallotCounts::new(1_000, 999).ensure_within_limit().is_ok());
        assert!(BallotCounts::new(1_000, 1_000).ensure_within_limit().is_err());
    }

    #[test]
    fn test_generate_preserves_counts() {
        let mut rng = StdRng::seed_from_u64(7);
        for (a, b) in [(7, 3), (1, 0), (0, 5), (12, 12)] {
            let sequence = generate(a, b, &mut rng);
            assert_eq!(sequence.len(), (a + b) as usize);
            assert_eq!(BallotCounts::of_sequence(&sequence), BallotCounts::new(a, b));
        }
    }

    #[test]
    fn test_generate_empty() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(generate(0, 0, &mut rng).is_empty());
    }

    #[test]
    fn test_generate_is_reproducible() {
        let first = generate(20, 15, &mut StdRng::seed_from_u64(99));
        let second = generate(20, 15, &mut StdRng::seed_from_u64(99));
        assert_eq!(first, second);
    }

    #[test]
    fn test_generate_covers_all_orderings() {
        // 2 A's and 2 B's have 6 distinct orderings, each with mass 1/6.
        let mut rng = StdRng::seed_from_u64(2024);
        let mut counts = std::collections::HashMap::new();
        let trials = 12_000;
        for _ in 0..trials {
            *counts.entry(generate(2, 2, &mut rng)).or_insert(0_u32) += 1;
        }
        assert_eq!(counts.len(), 6);
        for (ordering, hits) in counts {
            let share = f64::from(hits) / f64::from(trials);
            assert!((share - 1.0 / 6.0).abs() < 0.02, "{ordering:?}: {share}");
        }
    }

    #[test]
    fn test_tally_record() {
        let mut tally = TallyState::new();
        let leads: Vec<i64> = [Ballot::A, Ballot::A, Ballot::B]
            .into_iter()
            .map(|ballot| tally.record(ballot))
            .collect();
        assert_eq!(leads, vec![1, 2, 1]);
        assert_eq!(tally.step_index, tally.count_a + tally.count_b);
    }
}
