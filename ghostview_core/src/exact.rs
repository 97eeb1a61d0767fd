//! The "EXACT" Engine - forward-algorithm belief tracking
//!
//! Keeps the full posterior over ghost tuples and updates it with the two
//! halves of the forward algorithm:
//! 1. **Correct** (`observe`): reweight every live tuple by the reading likelihood
//! 2. **Predict** (`elapse_time`): push each tuple's mass through the transition model
//!
//! The predict step touches every (source, target) pair the model produces,
//! so its cost grows with the square of the state space.

use crate::distribution::{Distribution, PROBABILITY_EPSILON};
use crate::error::InferenceError;
use crate::inference::DynamicInference;
use crate::model::{validate_observation, GameModel};
use crate::state::{GhostTuple, Observation};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Exact dynamic inference over joint ghost placements.
pub struct ExactInference<M: GameModel> {
    /// The game model (shared with the harness)
    model: Arc<M>,

    /// Current posterior; `None` until `initialize()`
    belief: Option<Distribution<GhostTuple>>,
}

impl<M: GameModel> ExactInference<M> {
    /// Creates an uninitialized module bound to `model`.
    pub fn new(model: Arc<M>) -> Self {
        Self {
            model,
            belief: None,
        }
    }

    /// Returns the game model.
    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn is_initialized(&self) -> bool {
        self.belief.is_some()
    }

    fn current(&self) -> Result<&Distribution<GhostTuple>, InferenceError> {
        self.belief.as_ref().ok_or(InferenceError::NotInitialized)
    }

    /// Correct step, computed into a fresh table.
    fn corrected(
        &self,
        observation: &Observation<M::Reading>,
    ) -> Result<Distribution<GhostTuple>, InferenceError> {
        let belief = self.current()?;

        let mut posterior = Distribution::new();
        for (tuple, weight) in belief.iter() {
            let likelihood = self
                .model
                .likelihood(tuple, observation.sensor, &observation.reading);
            if likelihood > 0.0 {
                posterior.set(tuple.clone(), weight * likelihood);
            }
        }

        posterior
            .normalize()
            .map_err(|_| InferenceError::degenerate("observe"))?;
        Ok(posterior)
    }

    /// Predict step, computed into a fresh table.
    ///
    /// Sources are drawn from the model's full tuple universe, not the
    /// belief's support. Belief mass on tuples the universe does not list is
    /// still propagated, with a warning.
    fn predicted(&self) -> Result<Distribution<GhostTuple>, InferenceError> {
        let belief = self.current()?;
        let universe = self.model.ghost_tuples();

        let mut predicted = Distribution::new();
        let mut covered = 0.0;
        for source in &universe {
            let weight = belief.get(source);
            if weight == 0.0 {
                continue;
            }
            covered += weight;
            self.propagate(source, weight, &mut predicted);
        }

        let stray_mass = belief.total() - covered;
        if stray_mass > PROBABILITY_EPSILON {
            let listed: BTreeSet<&GhostTuple> = universe.iter().collect();
            let strays: Vec<(&GhostTuple, f64)> = belief
                .iter()
                .filter(|(tuple, _)| !listed.contains(tuple))
                .collect();
            warn!(
                stray_mass,
                tuples = strays.len(),
                "belief holds tuples missing from the model's tuple universe"
            );
            for (source, weight) in strays {
                self.propagate(source, weight, &mut predicted);
            }
        }

        predicted
            .normalize()
            .map_err(|_| InferenceError::degenerate("elapse_time"))?;
        Ok(predicted)
    }

    fn propagate(&self, source: &GhostTuple, weight: f64, into: &mut Distribution<GhostTuple>) {
        for (target, probability) in self.model.transition_distribution(source).iter() {
            into.increment(target.clone(), weight * probability);
        }
    }
}

impl<M: GameModel> DynamicInference for ExactInference<M> {
    type Reading = M::Reading;

    fn initialize(&mut self) -> Result<(), InferenceError> {
        let prior = self
            .model
            .initial_distribution()
            .normalized()
            .map_err(|_| InferenceError::degenerate("initialize"))?;

        debug!(support = prior.len(), "exact belief initialized from prior");
        self.belief = Some(prior);
        Ok(())
    }

    fn observe(&mut self, observation: &Observation<M::Reading>) -> Result<(), InferenceError> {
        validate_observation(self.model.as_ref(), observation.sensor, &observation.reading)?;

        let posterior = self.corrected(observation)?;
        debug!(
            sensor = %observation.sensor,
            reading = ?observation.reading,
            support = posterior.len(),
            "exact belief corrected"
        );
        self.belief = Some(posterior);
        Ok(())
    }

    fn elapse_time(&mut self) -> Result<(), InferenceError> {
        let predicted = self.predicted()?;
        debug!(support = predicted.len(), "exact belief predicted");
        self.belief = Some(predicted);
        Ok(())
    }

    fn belief_distribution(&self) -> Result<Distribution<GhostTuple>, InferenceError> {
        self.current().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::toy::*;
    use crate::state::Position;
    use approx::assert_relative_eq;

    fn filter() -> ExactInference<ToyModel> {
        let mut filter = ExactInference::new(Arc::new(ToyModel));
        filter.initialize().unwrap();
        filter
    }

    #[test]
    fn test_initialize_copies_prior() {
        let filter = filter();
        let belief = filter.belief_distribution().unwrap();

        assert_eq!(belief, ToyModel.initial_distribution());
        assert!(belief.is_normalized(PROBABILITY_EPSILON));
    }

    #[test]
    fn test_forward_algorithm_matches_hand_computation() {
        let mut filter = filter();

        // Prior [0.5, 0.5]; Hot at LEFT: [0.45, 0.10] -> [9/11, 2/11]
        filter.observe(&Observation::new(LEFT, Ping::Hot)).unwrap();
        let belief = filter.belief_distribution().unwrap();
        assert_relative_eq!(belief.get(&left()), 9.0 / 11.0, epsilon = 1e-12);

        // Predict: [7.1/11, 3.9/11]
        filter.elapse_time().unwrap();
        let belief = filter.belief_distribution().unwrap();
        assert_relative_eq!(belief.get(&left()), 7.1 / 11.0, epsilon = 1e-12);
        assert_relative_eq!(belief.get(&right()), 3.9 / 11.0, epsilon = 1e-12);

        // Cold at RIGHT: [7.1 * 0.8, 3.9 * 0.1] normalized
        filter.observe(&Observation::new(RIGHT, Ping::Cold)).unwrap();
        let belief = filter.belief_distribution().unwrap();
        let left_weight = 7.1 * 0.8;
        let right_weight = 3.9 * 0.1;
        let total = left_weight + right_weight;
        assert_relative_eq!(belief.get(&left()), left_weight / total, epsilon = 1e-9);
        assert_relative_eq!(belief.get(&right()), right_weight / total, epsilon = 1e-9);
        assert_relative_eq!(belief.get(&left()), 0.935_749_588, epsilon = 1e-6);
    }

    #[test]
    fn test_belief_stays_normalized() {
        let mut filter = filter();
        let script = [
            Observation::new(LEFT, Ping::Hot),
            Observation::new(RIGHT, Ping::Hot),
            Observation::new(LEFT, Ping::Cold),
            Observation::new(DEAD_ZONE, Ping::Cold),
        ];

        for observation in &script {
            filter.observe(observation).unwrap();
            assert!(filter.belief_distribution().unwrap().is_normalized(PROBABILITY_EPSILON));
            filter.elapse_time().unwrap();
            let belief = filter.belief_distribution().unwrap();
            assert!(belief.is_normalized(PROBABILITY_EPSILON));
            assert!(belief.iter().all(|(_, w)| w >= 0.0));
        }
    }

    #[test]
    fn test_observe_prunes_impossible_states() {
        let mut filter = filter();
        filter.observe(&Observation::new(BEACON, Ping::Hot)).unwrap();

        let belief = filter.belief_distribution().unwrap();
        assert_eq!(belief.len(), 1);
        assert!(!belief.contains(&right()));
        assert_relative_eq!(belief.get(&left()), 1.0);
    }

    #[test]
    fn test_elapse_time_reaches_states_outside_support() {
        let mut filter = filter();
        filter.observe(&Observation::new(BEACON, Ping::Hot)).unwrap();
        filter.elapse_time().unwrap();

        let belief = filter.belief_distribution().unwrap();
        assert_relative_eq!(belief.get(&left()), 0.7, epsilon = 1e-12);
        assert_relative_eq!(belief.get(&right()), 0.3, epsilon = 1e-12);
    }

    /// Toy model whose tuple universe forgets `right()`.
    struct LeftOnlyUniverse;

    impl GameModel for LeftOnlyUniverse {
        type Reading = Ping;

        fn initial_distribution(&self) -> Distribution<GhostTuple> {
            ToyModel.initial_distribution()
        }

        fn ghost_tuples(&self) -> Vec<GhostTuple> {
            vec![left()]
        }

        fn transition_distribution(&self, tuple: &GhostTuple) -> Distribution<GhostTuple> {
            ToyModel.transition_distribution(tuple)
        }

        fn reading_distribution(
            &self,
            tuple: &GhostTuple,
            location: Position,
        ) -> Distribution<Ping> {
            ToyModel.reading_distribution(tuple, location)
        }

        fn readings(&self) -> Vec<Ping> {
            ToyModel.readings()
        }

        fn contains_location(&self, location: Position) -> bool {
            ToyModel.contains_location(location)
        }
    }

    #[test]
    fn test_elapse_time_keeps_mass_outside_tuple_universe() {
        let mut filter = ExactInference::new(Arc::new(LeftOnlyUniverse));
        filter.initialize().unwrap();
        filter.elapse_time().unwrap();

        // Same as the full toy model: 0.5 * 0.7 + 0.5 * 0.4 on LEFT.
        let belief = filter.belief_distribution().unwrap();
        assert_relative_eq!(belief.get(&left()), 0.55, epsilon = 1e-12);
        assert_relative_eq!(belief.get(&right()), 0.45, epsilon = 1e-12);
    }

    #[test]
    fn test_snapshot_is_stable() {
        let mut filter = filter();
        filter.observe(&Observation::new(LEFT, Ping::Hot)).unwrap();

        let first = filter.belief_distribution().unwrap();
        let second = filter.belief_distribution().unwrap();
        assert_eq!(first, second);

        filter.elapse_time().unwrap();
        assert_eq!(first, second);
        assert_ne!(first, filter.belief_distribution().unwrap());
    }

    #[test]
    fn test_degenerate_observation_leaves_belief_untouched() {
        let mut filter = filter();
        filter.observe(&Observation::new(LEFT, Ping::Hot)).unwrap();
        let before = filter.belief_distribution().unwrap();

        let err = filter
            .observe(&Observation::new(DEAD_ZONE, Ping::Hot))
            .unwrap_err();
        assert_eq!(err, InferenceError::degenerate("observe"));
        assert_eq!(filter.belief_distribution().unwrap(), before);
    }

    #[test]
    fn test_invalid_evidence_is_rejected() {
        let mut filter = filter();
        let before = filter.belief_distribution().unwrap();

        let err = filter
            .observe(&Observation::new(Position::new(7, 7), Ping::Hot))
            .unwrap_err();
        assert!(matches!(err, InferenceError::InvalidEvidence(_)));

        let err = filter
            .observe(&Observation::new(LEFT, Ping::Silent))
            .unwrap_err();
        assert!(matches!(err, InferenceError::InvalidEvidence(_)));
        assert_eq!(filter.belief_distribution().unwrap(), before);
    }

    #[test]
    fn test_requires_initialize() {
        let mut filter = ExactInference::new(Arc::new(ToyModel));
        assert!(!filter.is_initialized());
        assert_eq!(filter.elapse_time(), Err(InferenceError::NotInitialized));
        assert_eq!(
            filter.observe(&Observation::new(LEFT, Ping::Hot)),
            Err(InferenceError::NotInitialized)
        );
        assert_eq!(
            filter.belief_distribution().unwrap_err(),
            InferenceError::NotInitialized
        );
    }
}
