//! Capability traits exposed to the game harness.

use crate::distribution::Distribution;
use crate::error::InferenceError;
use crate::state::{Evidence, GhostTuple, Observation, Position};
use std::fmt::Debug;

/// A belief tracker updated incrementally as evidence arrives and time passes.
///
/// The harness calls [`initialize`](Self::initialize) once, then any mix of
/// [`observe`](Self::observe) and [`elapse_time`](Self::elapse_time). A call
/// that returns an error leaves the previous belief in place.
///
/// # Implementations
///
/// - [`ExactInference`](crate::ExactInference): forward algorithm
/// - [`ParticleFilter`](crate::ParticleFilter): sampling approximation
pub trait DynamicInference {
    type Reading: Clone + Ord + Debug;

    /// Resets the belief to the model's prior.
    fn initialize(&mut self) -> Result<(), InferenceError>;

    /// Conditions the belief on one sensor reading.
    fn observe(&mut self, observation: &Observation<Self::Reading>) -> Result<(), InferenceError>;

    /// Advances the belief by one time step.
    fn elapse_time(&mut self) -> Result<(), InferenceError>;

    /// Returns a snapshot of the current belief.
    ///
    /// The snapshot is owned: later updates never change it.
    fn belief_distribution(&self) -> Result<Distribution<GhostTuple>, InferenceError>;
}

/// Batch inference over one simultaneous set of readings.
pub trait StaticInference {
    type Reading: Clone + Ord + Debug;

    /// Posterior over ghost tuples given every reading in `evidence`.
    fn posterior(
        &self,
        evidence: &Evidence<Self::Reading>,
    ) -> Result<Distribution<GhostTuple>, InferenceError>;

    /// Predictive distribution of the reading a sensor at `location` would report.
    fn reading_distribution(
        &self,
        evidence: &Evidence<Self::Reading>,
        location: Position,
    ) -> Result<Distribution<Self::Reading>, InferenceError>;
}
