//! Belief read-outs for the harness.
//!
//! A board display shades each cell by how likely it is to hold a ghost, and
//! a hunter wants the single best guess. Neither needs the joint table
//! directly, so both are derived here.

use crate::distribution::Distribution;
use crate::state::{GhostTuple, Position};

/// Probability that at least one ghost occupies each position.
///
/// Tuples with several ghosts on one cell contribute to that cell once.
/// The result is not a distribution over positions: with k ghosts it sums
/// to somewhere between 1 and k.
pub fn position_marginals(belief: &Distribution<GhostTuple>) -> Distribution<Position> {
    let total = belief.total();
    let mut marginals = Distribution::new();
    if total <= 0.0 {
        return marginals;
    }

    for (tuple, weight) in belief.iter() {
        let mut previous = None;
        for position in tuple.positions() {
            // Positions are sorted, so duplicates are adjacent.
            if previous == Some(position) {
                continue;
            }
            marginals.increment(*position, weight / total);
            previous = Some(position);
        }
    }
    marginals
}

/// Most probable joint placement and its probability.
pub fn most_likely(belief: &Distribution<GhostTuple>) -> Option<(GhostTuple, f64)> {
    let total = belief.total();
    belief
        .argmax()
        .filter(|_| total > 0.0)
        .map(|(tuple, weight)| (tuple.clone(), weight / total))
}

/// Kish effective sample size `1 / Σ p²` of a weighting.
///
/// Equals the support size for uniform weights and 1 when all mass sits on
/// one key. Returns 0 for an empty table.
pub fn effective_sample_size<K: Ord + Clone>(weights: &Distribution<K>) -> f64 {
    let total = weights.total();
    if total <= 0.0 {
        return 0.0;
    }
    let sum_sq: f64 = weights.iter().map(|(_, w)| (w / total).powi(2)).sum();
    1.0 / sum_sq
}
