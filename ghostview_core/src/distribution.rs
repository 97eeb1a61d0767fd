//! Sparse probability tables.
//!
//! A [`Distribution`] maps keys to non-negative weights. A key that is not
//! stored has weight zero, and any write that would store a zero weight
//! removes the key instead, so the support of a table is exactly its set of
//! stored keys.
//!
//! Entries live in an ordered map. Iteration order therefore depends only on
//! the keys, which keeps seeded sampling reproducible from run to run.

use crate::error::InferenceError;
use rand::distributions::{Distribution as RandDistribution, WeightedIndex};
use rand::Rng;
use std::collections::BTreeMap;

/// Tolerance used when checking that a table sums to one.
pub const PROBABILITY_EPSILON: f64 = 1e-9;

/// Sparse mapping from key to non-negative weight.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution<K: Ord> {
    weights: BTreeMap<K, f64>,
}

impl<K: Ord> Default for Distribution<K> {
    fn default() -> Self {
        Self {
            weights: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Clone> Distribution<K> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table by accumulating `(key, weight)` pairs.
    ///
    /// Repeated keys add up into the same bucket.
    pub fn from_weights<I: IntoIterator<Item = (K, f64)>>(pairs: I) -> Self {
        let mut dist = Self::new();
        for (key, weight) in pairs {
            dist.increment(key, weight);
        }
        dist
    }

    /// Builds a normalized uniform table over the given keys.
    pub fn uniform<I: IntoIterator<Item = K>>(keys: I) -> Self {
        let mut dist = Self::from_weights(keys.into_iter().map(|k| (k, 1.0)));
        // An empty key set stays empty.
        let _ = dist.normalize();
        dist
    }

    /// Builds a table with all mass on a single key.
    pub fn point(key: K) -> Self {
        let mut dist = Self::new();
        dist.set(key, 1.0);
        dist
    }

    /// Returns the weight of `key` (zero when absent).
    pub fn get(&self, key: &K) -> f64 {
        self.weights.get(key).copied().unwrap_or(0.0)
    }

    /// Sets the weight of `key`. Zero removes the key.
    pub fn set(&mut self, key: K, weight: f64) {
        debug_assert!(
            weight.is_finite() && weight >= 0.0,
            "weights must be finite and non-negative, got {weight}"
        );
        if weight > 0.0 && weight.is_finite() {
            self.weights.insert(key, weight);
        } else {
            self.weights.remove(&key);
        }
    }

    /// Adds `delta` to the weight of `key`, pruning the key if the result is not positive.
    pub fn increment(&mut self, key: K, delta: f64) {
        let updated = self.get(&key) + delta;
        if updated > 0.0 && updated.is_finite() {
            self.weights.insert(key, updated);
        } else {
            self.weights.remove(&key);
        }
    }

    /// Removes `key`, returning its previous weight.
    pub fn remove(&mut self, key: &K) -> f64 {
        self.weights.remove(key).unwrap_or(0.0)
    }

    /// Returns true if `key` carries nonzero weight.
    pub fn contains(&self, key: &K) -> bool {
        self.weights.contains_key(key)
    }

    /// Number of keys with nonzero weight.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Iterates `(key, weight)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, f64)> + '_ {
        self.weights.iter().map(|(k, w)| (k, *w))
    }

    /// Iterates the support in key order.
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.weights.keys()
    }

    /// Keys with nonzero weight, in key order.
    pub fn support(&self) -> Vec<K> {
        self.weights.keys().cloned().collect()
    }

    /// Sum of all weights.
    pub fn total(&self) -> f64 {
        self.weights.values().sum()
    }

    /// Returns true if the weights sum to one within `tolerance`.
    pub fn is_normalized(&self, tolerance: f64) -> bool {
        (self.total() - 1.0).abs() <= tolerance
    }

    /// Rescales the weights to sum to one.
    ///
    /// Fails with `DegenerateBelief` when the total is zero or not finite; the
    /// table is left untouched in that case.
    pub fn normalize(&mut self) -> Result<(), InferenceError> {
        let total = self.total();
        if !(total > 0.0 && total.is_finite()) {
            return Err(InferenceError::degenerate("normalize"));
        }
        for weight in self.weights.values_mut() {
            *weight /= total;
        }
        // Tiny weights can underflow to zero after division.
        self.weights.retain(|_, w| *w > 0.0);
        Ok(())
    }

    /// Returns a normalized copy.
    pub fn normalized(&self) -> Result<Self, InferenceError> {
        let mut copy = self.clone();
        copy.normalize()?;
        Ok(copy)
    }

    /// Multiplies every weight by `factor`.
    pub fn scale(&mut self, factor: f64) {
        for weight in self.weights.values_mut() {
            *weight *= factor;
        }
        self.weights.retain(|_, w| *w > 0.0 && w.is_finite());
    }

    /// Pointwise product with `other`. Keys missing from either side vanish.
    pub fn product(&self, other: &Self) -> Self {
        let mut result = Self::new();
        for (key, weight) in self.iter() {
            let other_weight = other.get(key);
            if other_weight > 0.0 {
                result.set(key.clone(), weight * other_weight);
            }
        }
        result
    }

    /// Pointwise `(1 - weight) * self + weight * other`.
    pub fn mixture(&self, other: &Self, weight: f64) -> Self {
        let weight = weight.clamp(0.0, 1.0);
        let mut result = Self::new();
        for (key, w) in self.iter() {
            result.increment(key.clone(), (1.0 - weight) * w);
        }
        for (key, w) in other.iter() {
            result.increment(key.clone(), weight * w);
        }
        result
    }

    /// Returns the heaviest key. Ties resolve to the smallest key.
    pub fn argmax(&self) -> Option<(&K, f64)> {
        self.iter().fold(None, |best, (key, weight)| match best {
            Some((_, best_weight)) if best_weight >= weight => best,
            _ => Some((key, weight)),
        })
    }

    /// Shannon entropy of the normalized table, in bits.
    pub fn entropy(&self) -> f64 {
        let total = self.total();
        if total <= 0.0 {
            return 0.0;
        }
        self.weights
            .values()
            .map(|w| w / total)
            .filter(|p| *p > 0.0)
            .map(|p| -p * p.log2())
            .sum()
    }

    /// Total variation distance between the normalized forms of two tables.
    ///
    /// An empty table is treated as all-zero.
    pub fn total_variation(&self, other: &Self) -> f64 {
        let self_total = self.total();
        let other_total = other.total();
        let p = |key: &K| {
            if self_total > 0.0 {
                self.get(key) / self_total
            } else {
                0.0
            }
        };
        let q = |key: &K| {
            if other_total > 0.0 {
                other.get(key) / other_total
            } else {
                0.0
            }
        };

        let mut sum = 0.0;
        for key in self.keys() {
            sum += (p(key) - q(key)).abs();
        }
        for key in other.keys() {
            if !self.contains(key) {
                sum += q(key);
            }
        }
        0.5 * sum
    }

    /// Precomputes a weighted sampler over the current support.
    pub fn sampler(&self) -> Result<Sampler<K>, InferenceError> {
        Sampler::new(self)
    }

    /// Draws a single key with probability proportional to its weight.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<K, InferenceError> {
        Ok(self.sampler()?.sample(rng))
    }
}

impl<K: Ord + Clone> FromIterator<(K, f64)> for Distribution<K> {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self::from_weights(iter)
    }
}

impl<K: Ord> IntoIterator for Distribution<K> {
    type Item = (K, f64);
    type IntoIter = std::collections::btree_map::IntoIter<K, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.weights.into_iter()
    }
}

/// Weighted sampler over a frozen snapshot of a [`Distribution`].
///
/// The particle filter draws thousands of samples from one table, so the
/// cumulative weights are built once here and reused.
#[derive(Debug, Clone)]
pub struct Sampler<K> {
    keys: Vec<K>,
    index: WeightedIndex<f64>,
}

impl<K: Ord + Clone> Sampler<K> {
    fn new(dist: &Distribution<K>) -> Result<Self, InferenceError> {
        let keys: Vec<K> = dist.keys().cloned().collect();
        let index = WeightedIndex::new(dist.weights.values().copied())
            .map_err(|_| InferenceError::degenerate("sampling"))?;
        Ok(Self { keys, index })
    }

    /// Draws one key.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> K {
        self.keys[self.index.sample(rng)].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_absent_key_is_zero() {
        let dist: Distribution<&str> = Distribution::new();
        assert_eq!(dist.get(&"missing"), 0.0);
        assert!(dist.is_empty());
    }

    #[test]
    fn test_zero_weight_is_pruned() {
        let mut dist = Distribution::new();
        dist.set("a", 0.5);
        dist.set("b", 0.5);
        dist.set("a", 0.0);

        assert!(!dist.contains(&"a"));
        assert_eq!(dist.len(), 1);
        assert_eq!(dist.support(), vec!["b"]);

        dist.increment("b", -0.5);
        assert!(dist.is_empty());
    }

    #[test]
    fn test_from_weights_accumulates_duplicates() {
        let dist = Distribution::from_weights(vec![("a", 1.0), ("b", 2.0), ("a", 3.0)]);
        assert_relative_eq!(dist.get(&"a"), 4.0);
        assert_relative_eq!(dist.get(&"b"), 2.0);
    }

    #[test]
    fn test_normalize() {
        let mut dist = Distribution::from_weights(vec![(1, 1.0), (2, 3.0)]);
        dist.normalize().unwrap();

        assert!(dist.is_normalized(PROBABILITY_EPSILON));
        assert_relative_eq!(dist.get(&1), 0.25);
        assert_relative_eq!(dist.get(&2), 0.75);
    }

    #[test]
    fn test_normalize_empty_is_degenerate() {
        let mut dist: Distribution<u8> = Distribution::new();
        let err = dist.normalize().unwrap_err();
        assert!(err.is_degenerate());
        assert!(dist.is_empty());
    }

    #[test]
    fn test_uniform() {
        let dist = Distribution::uniform(0..4);
        assert_eq!(dist.len(), 4);
        for k in 0..4 {
            assert_relative_eq!(dist.get(&k), 0.25);
        }
        assert!(Distribution::<u8>::uniform(std::iter::empty()).is_empty());
    }

    #[test]
    fn test_product_drops_disjoint_keys() {
        let a = Distribution::from_weights(vec![("x", 0.5), ("y", 0.5)]);
        let b = Distribution::from_weights(vec![("y", 0.2), ("z", 0.8)]);
        let prod = a.product(&b);

        assert_eq!(prod.len(), 1);
        assert_relative_eq!(prod.get(&"y"), 0.1);
    }

    #[test]
    fn test_mixture() {
        let a = Distribution::point("x");
        let b = Distribution::point("y");
        let mix = a.mixture(&b, 0.25);

        assert_relative_eq!(mix.get(&"x"), 0.75);
        assert_relative_eq!(mix.get(&"y"), 0.25);
    }

    #[test]
    fn test_argmax_and_entropy() {
        let dist = Distribution::from_weights(vec![(1, 0.25), (2, 0.5), (3, 0.25)]);
        assert_eq!(dist.argmax(), Some((&2, 0.5)));
        assert_relative_eq!(dist.entropy(), 1.5, epsilon = 1e-12);

        assert_relative_eq!(Distribution::point(7).entropy(), 0.0);
    }

    #[test]
    fn test_total_variation() {
        let a = Distribution::from_weights(vec![("x", 0.5), ("y", 0.5)]);
        let b = Distribution::from_weights(vec![("y", 0.5), ("z", 0.5)]);

        assert_relative_eq!(a.total_variation(&a), 0.0);
        assert_relative_eq!(a.total_variation(&b), 0.5);
        assert_relative_eq!(b.total_variation(&a), 0.5);
    }

    #[test]
    fn test_sampling_frequencies() {
        let dist = Distribution::from_weights(vec![("rare", 1.0), ("common", 3.0)]);
        let sampler = dist.sampler().unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let draws = 20_000;
        let common = (0..draws)
            .filter(|_| sampler.sample(&mut rng) == "common")
            .count();

        assert_relative_eq!(common as f64 / draws as f64, 0.75, epsilon = 0.02);
    }

    #[test]
    fn test_sampling_empty_is_degenerate() {
        let dist: Distribution<u8> = Distribution::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(dist.sample(&mut rng).unwrap_err().is_degenerate());
    }

    #[test]
    fn test_seeded_sampling_is_reproducible() {
        let dist = Distribution::uniform(0..50);
        let mut rng_a = ChaCha8Rng::seed_from_u64(99);
        let mut rng_b = ChaCha8Rng::seed_from_u64(99);

        let a: Vec<i32> = (0..100).map(|_| dist.sample(&mut rng_a).unwrap()).collect();
        let b: Vec<i32> = (0..100).map(|_| dist.sample(&mut rng_b).unwrap()).collect();
        assert_eq!(a, b);
    }

    proptest! {
        #[test]
        fn prop_normalized_weights_sum_to_one(
            weights in proptest::collection::vec(0.0f64..10.0, 1..32),
        ) {
            let dist: Distribution<usize> = weights.iter().copied().enumerate().collect();
            prop_assume!(dist.total() > 0.0);

            let normalized = dist.normalized().unwrap();
            prop_assert!(normalized.is_normalized(1e-9));
            prop_assert!(normalized.iter().all(|(_, w)| w > 0.0 && w <= 1.0 + 1e-12));
            prop_assert_eq!(normalized.len(), weights.iter().filter(|w| **w > 0.0).count());
        }

        #[test]
        fn prop_total_variation_is_bounded(
            a in proptest::collection::vec(0.0f64..5.0, 1..16),
            b in proptest::collection::vec(0.0f64..5.0, 1..16),
        ) {
            let p: Distribution<usize> = a.into_iter().enumerate().collect();
            let q: Distribution<usize> = b.into_iter().enumerate().collect();
            let tv = p.total_variation(&q);
            prop_assert!((0.0..=1.0 + 1e-12).contains(&tv));
            prop_assert!((tv - q.total_variation(&p)).abs() < 1e-12);
        }
    }
}
