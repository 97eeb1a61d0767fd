//! Static inference: one batch of simultaneous readings, no time passing.
//!
//! Nothing is cached between calls; each query conditions the prior on the
//! whole evidence set from scratch.

use crate::distribution::Distribution;
use crate::error::InferenceError;
use crate::inference::StaticInference;
use crate::model::{validate_observation, GameModel};
use crate::state::{Evidence, GhostTuple, Position};
use std::sync::Arc;
use tracing::debug;

/// Exact posterior and predictive queries over a batch of readings.
pub struct ExactStaticInference<M: GameModel> {
    model: Arc<M>,
}

impl<M: GameModel> ExactStaticInference<M> {
    pub fn new(model: Arc<M>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    fn validate(&self, evidence: &Evidence<M::Reading>) -> Result<(), InferenceError> {
        for (location, reading) in evidence {
            validate_observation(self.model.as_ref(), *location, reading)?;
        }
        Ok(())
    }
}

impl<M: GameModel> StaticInference for ExactStaticInference<M> {
    type Reading = M::Reading;

    fn posterior(
        &self,
        evidence: &Evidence<M::Reading>,
    ) -> Result<Distribution<GhostTuple>, InferenceError> {
        self.validate(evidence)?;

        let prior = self.model.initial_distribution();
        let mut posterior = Distribution::new();
        for tuple in self.model.ghost_tuples() {
            let mut weight = prior.get(&tuple);
            for (location, reading) in evidence {
                if weight == 0.0 {
                    break;
                }
                weight *= self.model.likelihood(&tuple, *location, reading);
            }
            posterior.set(tuple, weight);
        }

        posterior
            .normalize()
            .map_err(|_| InferenceError::degenerate("posterior"))?;
        debug!(
            readings = evidence.len(),
            support = posterior.len(),
            "static posterior computed"
        );
        Ok(posterior)
    }

    fn reading_distribution(
        &self,
        evidence: &Evidence<M::Reading>,
        location: Position,
    ) -> Result<Distribution<M::Reading>, InferenceError> {
        self.validate(evidence)?;
        if !self.model.contains_location(location) {
            return Err(InferenceError::invalid_evidence(format!(
                "query location {location} is not on the board"
            )));
        }

        // Impossible evidence fails here, even for an already-read location.
        let posterior = self.posterior(evidence)?;

        // Already conditioned on this sensor: its reading is certain.
        if let Some(recorded) = evidence.get(&location) {
            return Ok(Distribution::point(recorded.clone()));
        }

        let readings = self.model.readings();
        let mut predictive = Distribution::new();
        for (tuple, probability) in posterior.iter() {
            let given_tuple = self.model.reading_distribution(tuple, location);
            for reading in &readings {
                let likelihood = given_tuple.get(reading);
                if likelihood > 0.0 {
                    predictive.increment(reading.clone(), probability * likelihood);
                }
            }
        }

        predictive
            .normalize()
            .map_err(|_| InferenceError::degenerate("reading_distribution"))?;
        Ok(predictive)
    }
}
