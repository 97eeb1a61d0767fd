//! The game model consumed by every inference module.
//!
//! Board geometry, ghost movement and the sensor physics all live behind
//! [`GameModel`]. The inference code treats every method as a pure function
//! of its arguments.

use crate::distribution::Distribution;
use crate::error::InferenceError;
use crate::state::{GhostTuple, Position};
use std::fmt::Debug;

/// Transition and observation oracle for a ghost-tracking game.
pub trait GameModel {
    /// Sensor reading alphabet (colours, distances, ...).
    type Reading: Clone + Ord + Debug;

    /// Prior over joint ghost placements at time zero.
    fn initial_distribution(&self) -> Distribution<GhostTuple>;

    /// Every hidden state the model can produce.
    fn ghost_tuples(&self) -> Vec<GhostTuple>;

    /// `P(next | tuple)` for one time step.
    fn transition_distribution(&self, tuple: &GhostTuple) -> Distribution<GhostTuple>;

    /// `P(reading | tuple, location)` for a sensor placed at `location`.
    fn reading_distribution(
        &self,
        tuple: &GhostTuple,
        location: Position,
    ) -> Distribution<Self::Reading>;

    /// The full reading alphabet.
    fn readings(&self) -> Vec<Self::Reading>;

    /// Returns true if a sensor may be placed at `location`.
    fn contains_location(&self, location: Position) -> bool;

    /// Convenience: `P(reading | tuple, location)`.
    fn likelihood(&self, tuple: &GhostTuple, location: Position, reading: &Self::Reading) -> f64 {
        self.reading_distribution(tuple, location).get(reading)
    }
}

/// Rejects a sensor location or reading the model does not know about.
pub fn validate_observation<M: GameModel + ?Sized>(
    model: &M,
    location: Position,
    reading: &M::Reading,
) -> Result<(), InferenceError> {
    if !model.contains_location(location) {
        return Err(InferenceError::invalid_evidence(format!(
            "sensor location {location} is not on the board"
        )));
    }
    if !model.readings().contains(reading) {
        return Err(InferenceError::invalid_evidence(format!(
            "reading {reading:?} at {location} is not in the model's alphabet"
        )));
    }
    Ok(())
}
