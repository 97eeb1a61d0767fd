//! The "PARTICLE" Engine - sampling approximation of the belief
//!
//! A fixed population of N particles stands in for the posterior. Particles
//! are bucketed by ghost tuple, so the ensemble is a tuple → count map:
//! - `observe` reweights each bucket by `count × likelihood` and resamples N
//!   fresh particles from the result (sequential importance resampling)
//! - `elapse_time` moves every particle independently through the
//!   transition model, writing into a fresh ensemble
//!
//! N never changes after construction.

use crate::distribution::{Distribution, Sampler};
use crate::error::InferenceError;
use crate::inference::DynamicInference;
use crate::model::{validate_observation, GameModel};
use crate::state::{GhostTuple, Observation};
use crate::summary::effective_sample_size;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Default ensemble size.
pub const DEFAULT_NUM_PARTICLES: usize = 10_000;

/// What `observe` does when every particle is ruled out by the evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegeneracyPolicy {
    /// Return `DegenerateBelief` and keep the previous ensemble
    #[default]
    Fail,

    /// Redraw the whole ensemble from the prior and carry on
    Reinitialize,
}

/// Configuration for the ParticleFilter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleFilterConfig {
    /// Ensemble size N (default: 10 000)
    pub num_particles: usize,

    /// Reaction to an all-zero reweighting (default: Fail)
    pub degeneracy_policy: DegeneracyPolicy,
}

impl Default for ParticleFilterConfig {
    fn default() -> Self {
        Self {
            num_particles: DEFAULT_NUM_PARTICLES,
            degeneracy_policy: DegeneracyPolicy::Fail,
        }
    }
}

impl ParticleFilterConfig {
    /// Sets the ensemble size.
    pub fn with_particles(mut self, num_particles: usize) -> Self {
        self.num_particles = num_particles;
        self
    }

    /// Sets the degeneracy policy.
    pub fn with_policy(mut self, policy: DegeneracyPolicy) -> Self {
        self.degeneracy_policy = policy;
        self
    }
}

// ============================================================================
// PARTICLE ENSEMBLE
// ============================================================================

/// Particle population bucketed by ghost tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticleEnsemble {
    /// Particles per occupied tuple (no zero entries)
    counts: BTreeMap<GhostTuple, usize>,

    /// Configured population size N
    size: usize,
}

impl ParticleEnsemble {
    fn with_size(size: usize) -> Self {
        Self {
            counts: BTreeMap::new(),
            size,
        }
    }

    /// Draws `size` independent particles from `sampler`.
    pub fn draw<R: Rng + ?Sized>(
        sampler: &Sampler<GhostTuple>,
        size: usize,
        rng: &mut R,
    ) -> Self {
        let mut ensemble = Self::with_size(size);
        for _ in 0..size {
            ensemble.add(sampler.sample(rng));
        }
        ensemble
    }

    fn add(&mut self, tuple: GhostTuple) {
        *self.counts.entry(tuple).or_insert(0) += 1;
    }

    /// Configured population size N.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Particles currently in the ensemble (always equal to `size()`).
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Particles sitting on `tuple`.
    pub fn count(&self, tuple: &GhostTuple) -> usize {
        self.counts.get(tuple).copied().unwrap_or(0)
    }

    /// Number of distinct occupied tuples.
    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GhostTuple, usize)> + '_ {
        self.counts.iter().map(|(t, c)| (t, *c))
    }

    /// Empirical distribution: count / N.
    pub fn to_distribution(&self) -> Distribution<GhostTuple> {
        let n = self.size as f64;
        self.iter()
            .map(|(tuple, count)| (tuple.clone(), count as f64 / n))
            .collect()
    }

    /// Kish effective sample size of the bucket counts.
    pub fn effective_sample_size(&self) -> f64 {
        effective_sample_size(&self.to_distribution())
    }
}

// ============================================================================
// PARTICLE FILTER
// ============================================================================

/// Approximate dynamic inference by sequential importance resampling.
///
/// The random source is injected so runs can be replayed from a seed.
pub struct ParticleFilter<M: GameModel, R: Rng> {
    model: Arc<M>,
    config: ParticleFilterConfig,
    rng: R,
    ensemble: Option<ParticleEnsemble>,
}

impl<M: GameModel, R: Rng> ParticleFilter<M, R> {
    /// Creates an uninitialized filter.
    ///
    /// Fails with `InvalidConfig` when `config.num_particles` is zero.
    pub fn new(
        model: Arc<M>,
        config: ParticleFilterConfig,
        rng: R,
    ) -> Result<Self, InferenceError> {
        if config.num_particles == 0 {
            return Err(InferenceError::InvalidConfig(
                "particle filter needs at least one particle".to_string(),
            ));
        }
        Ok(Self {
            model,
            config,
            rng,
            ensemble: None,
        })
    }

    pub fn config(&self) -> &ParticleFilterConfig {
        &self.config
    }

    /// Returns the current ensemble, if initialized.
    pub fn ensemble(&self) -> Option<&ParticleEnsemble> {
        self.ensemble.as_ref()
    }

    fn current(&self) -> Result<&ParticleEnsemble, InferenceError> {
        self.ensemble.as_ref().ok_or(InferenceError::NotInitialized)
    }

    fn sample_prior(&mut self) -> Result<ParticleEnsemble, InferenceError> {
        let sampler = self
            .model
            .initial_distribution()
            .sampler()
            .map_err(|_| InferenceError::degenerate("initialize"))?;
        Ok(ParticleEnsemble::draw(
            &sampler,
            self.config.num_particles,
            &mut self.rng,
        ))
    }
}

impl<M: GameModel, R: Rng> DynamicInference for ParticleFilter<M, R> {
    type Reading = M::Reading;

    fn initialize(&mut self) -> Result<(), InferenceError> {
        let ensemble = self.sample_prior()?;
        debug!(
            particles = ensemble.size(),
            distinct = ensemble.distinct(),
            "particle ensemble drawn from prior"
        );
        self.ensemble = Some(ensemble);
        Ok(())
    }

    fn observe(&mut self, observation: &Observation<M::Reading>) -> Result<(), InferenceError> {
        validate_observation(self.model.as_ref(), observation.sensor, &observation.reading)?;

        let mut weighted = Distribution::new();
        for (tuple, count) in self.current()?.iter() {
            let likelihood = self
                .model
                .likelihood(tuple, observation.sensor, &observation.reading);
            if likelihood > 0.0 {
                weighted.set(tuple.clone(), count as f64 * likelihood);
            }
        }

        if weighted.normalize().is_err() {
            return match self.config.degeneracy_policy {
                DegeneracyPolicy::Fail => Err(InferenceError::degenerate("observe")),
                DegeneracyPolicy::Reinitialize => {
                    warn!(
                        sensor = %observation.sensor,
                        reading = ?observation.reading,
                        "every particle ruled out, redrawing ensemble from prior"
                    );
                    let ensemble = self.sample_prior()?;
                    self.ensemble = Some(ensemble);
                    Ok(())
                }
            };
        }

        let sampler = weighted.sampler()?;
        let resampled = ParticleEnsemble::draw(&sampler, self.config.num_particles, &mut self.rng);
        debug!(
            sensor = %observation.sensor,
            reading = ?observation.reading,
            ess = effective_sample_size(&weighted),
            distinct = resampled.distinct(),
            "particle ensemble resampled"
        );
        self.ensemble = Some(resampled);
        Ok(())
    }

    fn elapse_time(&mut self) -> Result<(), InferenceError> {
        let Self {
            model,
            rng,
            ensemble,
            ..
        } = self;
        let current = ensemble.as_ref().ok_or(InferenceError::NotInitialized)?;

        // Read from the current ensemble, write into a fresh one.
        let mut next = ParticleEnsemble::with_size(current.size());
        for (tuple, count) in current.iter() {
            let sampler = model
                .transition_distribution(tuple)
                .sampler()
                .map_err(|_| InferenceError::degenerate("elapse_time"))?;
            for _ in 0..count {
                next.add(sampler.sample(rng));
            }
        }

        debug_assert_eq!(next.total(), next.size());
        debug!(distinct = next.distinct(), "particle ensemble advanced");
        *ensemble = Some(next);
        Ok(())
    }

    fn belief_distribution(&self) -> Result<Distribution<GhostTuple>, InferenceError> {
        Ok(self.current()?.to_distribution())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::PROBABILITY_EPSILON;
    use crate::exact::ExactInference;
    use crate::model::toy::*;
    use crate::state::Position;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn filter(num_particles: usize, seed: u64) -> ParticleFilter<ToyModel, ChaCha8Rng> {
        let config = ParticleFilterConfig::default().with_particles(num_particles);
        let mut filter =
            ParticleFilter::new(Arc::new(ToyModel), config, ChaCha8Rng::seed_from_u64(seed))
                .unwrap();
        filter.initialize().unwrap();
        filter
    }

    #[test]
    fn test_default_config() {
        let config = ParticleFilterConfig::default();
        assert_eq!(config.num_particles, 10_000);
        assert_eq!(config.degeneracy_policy, DegeneracyPolicy::Fail);
    }

    #[test]
    fn test_zero_particles_rejected() {
        let config = ParticleFilterConfig::default().with_particles(0);
        let result = ParticleFilter::new(Arc::new(ToyModel), config, ChaCha8Rng::seed_from_u64(1));
        assert!(matches!(result, Err(InferenceError::InvalidConfig(_))));
    }

    #[test]
    fn test_initialize_draws_configured_count() {
        let filter = filter(500, 3);
        let ensemble = filter.ensemble().unwrap();

        assert_eq!(ensemble.size(), 500);
        assert_eq!(ensemble.total(), 500);
        assert!(filter.belief_distribution().unwrap().is_normalized(PROBABILITY_EPSILON));
    }

    #[test]
    fn test_particle_count_conserved() {
        let mut filter = filter(777, 11);
        let script = [
            Observation::new(LEFT, Ping::Hot),
            Observation::new(RIGHT, Ping::Cold),
            Observation::new(DEAD_ZONE, Ping::Cold),
            Observation::new(RIGHT, Ping::Hot),
        ];

        for observation in &script {
            filter.elapse_time().unwrap();
            assert_eq!(filter.ensemble().unwrap().total(), 777);
            filter.observe(observation).unwrap();
            assert_eq!(filter.ensemble().unwrap().total(), 777);
            assert!(filter.belief_distribution().unwrap().is_normalized(PROBABILITY_EPSILON));
        }
    }

    #[test]
    fn test_effective_sample_size_collapses_on_certain_evidence() {
        let mut filter = filter(1_000, 5);
        let before = filter.ensemble().unwrap().effective_sample_size();
        assert!(before > 1.5 && before <= 2.0);

        filter.observe(&Observation::new(BEACON, Ping::Hot)).unwrap();
        let ensemble = filter.ensemble().unwrap();
        assert_eq!(ensemble.count(&left()), 1_000);
        assert_relative_eq!(ensemble.effective_sample_size(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let mut a = filter(1_000, 42);
        let mut b = filter(1_000, 42);

        for f in [&mut a, &mut b] {
            f.observe(&Observation::new(LEFT, Ping::Hot)).unwrap();
            f.elapse_time().unwrap();
        }
        assert_eq!(a.ensemble(), b.ensemble());
    }

    #[test]
    fn test_observe_drops_ruled_out_tuples() {
        let mut filter = filter(1_000, 5);
        filter.observe(&Observation::new(BEACON, Ping::Hot)).unwrap();

        let ensemble = filter.ensemble().unwrap();
        assert_eq!(ensemble.count(&left()), 1_000);
        assert_eq!(ensemble.count(&right()), 0);
    }

    #[test]
    fn test_converges_to_exact_filter() {
        let model = Arc::new(ToyModel);
        let mut exact = ExactInference::new(model.clone());
        let mut approx = ParticleFilter::new(
            model,
            ParticleFilterConfig::default().with_particles(50_000),
            ChaCha8Rng::seed_from_u64(2024),
        )
        .unwrap();

        exact.initialize().unwrap();
        approx.initialize().unwrap();

        let run = |f: &mut dyn DynamicInference<Reading = Ping>| {
            f.observe(&Observation::new(LEFT, Ping::Hot)).unwrap();
            f.elapse_time().unwrap();
            f.observe(&Observation::new(RIGHT, Ping::Cold)).unwrap();
            f.elapse_time().unwrap();
            f.observe(&Observation::new(LEFT, Ping::Cold)).unwrap();
        };
        run(&mut exact);
        run(&mut approx);

        let tv = exact
            .belief_distribution()
            .unwrap()
            .total_variation(&approx.belief_distribution().unwrap());
        assert!(tv < 0.02, "total variation {tv} too large");
    }

    #[test]
    fn test_degenerate_fail_policy_keeps_ensemble() {
        let mut filter = filter(300, 8);
        filter.observe(&Observation::new(LEFT, Ping::Hot)).unwrap();
        let before = filter.ensemble().cloned();

        let err = filter
            .observe(&Observation::new(DEAD_ZONE, Ping::Hot))
            .unwrap_err();
        assert!(err.is_degenerate());
        assert_eq!(filter.ensemble().cloned(), before);
    }

    #[test]
    fn test_degenerate_reinitialize_policy_redraws_from_prior() {
        let config = ParticleFilterConfig::default()
            .with_particles(2_000)
            .with_policy(DegeneracyPolicy::Reinitialize);
        let mut filter =
            ParticleFilter::new(Arc::new(ToyModel), config, ChaCha8Rng::seed_from_u64(9)).unwrap();
        filter.initialize().unwrap();

        // Collapse onto LEFT, then feed evidence nothing can explain.
        filter.observe(&Observation::new(BEACON, Ping::Hot)).unwrap();
        assert_eq!(filter.ensemble().unwrap().count(&right()), 0);

        filter.observe(&Observation::new(DEAD_ZONE, Ping::Hot)).unwrap();
        let ensemble = filter.ensemble().unwrap();
        assert_eq!(ensemble.total(), 2_000);
        // Uniform prior: both tuples come back.
        assert!(ensemble.count(&right()) > 800);
        assert!(ensemble.count(&left()) > 800);
    }

    #[test]
    fn test_requires_initialize() {
        let mut filter = ParticleFilter::new(
            Arc::new(ToyModel),
            ParticleFilterConfig::default(),
            ChaCha8Rng::seed_from_u64(0),
        )
        .unwrap();

        assert_eq!(filter.elapse_time(), Err(InferenceError::NotInitialized));
        assert_eq!(
            filter.observe(&Observation::new(LEFT, Ping::Hot)),
            Err(InferenceError::NotInitialized)
        );
        assert_eq!(
            filter.belief_distribution().unwrap_err(),
            InferenceError::NotInitialized
        );
        assert!(filter.ensemble().is_none());
    }

    #[test]
    fn test_invalid_evidence_keeps_ensemble() {
        let mut filter = filter(400, 13);
        let before = filter.ensemble().cloned();

        let off_board = filter.observe(&Observation::new(Position::new(9, 9), Ping::Hot));
        assert!(matches!(off_board, Err(InferenceError::InvalidEvidence(_))));
        assert_eq!(filter.ensemble().cloned(), before);

        let unknown_reading = filter.observe(&Observation::new(LEFT, Ping::Silent));
        assert!(matches!(unknown_reading, Err(InferenceError::InvalidEvidence(_))));
        assert_eq!(filter.ensemble().cloned(), before);
    }
}
