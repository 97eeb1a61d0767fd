//! Ground truth oracle for simulation.
//!
//! The Oracle maintains the "God's eye view" of the simulated board:
//! - True joint position of all ghosts
//! - Ghost movement, sampled from the board's own transition model
//! - Sensor reading generation (with the board's noise model)

use crate::board::{GhostBoard, Reading};
use crate::error::SimError;
use ghostview_core::{GameModel, GhostTuple, Position};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

/// The Oracle - maintains ground truth and generates sensor readings.
pub struct Oracle {
    /// The board the ghosts live on
    board: Arc<GhostBoard>,

    /// RNG for movement and sensor noise
    physics_rng: ChaCha8Rng,

    /// True ghost placement
    ghosts: GhostTuple,

    /// Ticks elapsed
    time: u64,
}

impl Oracle {
    /// Creates a new Oracle, drawing the starting placement from the board's prior.
    ///
    /// Note: The physics seed should be derived separately from the filter
    /// seeds so that changing the particle count doesn't change the ghosts'
    /// trajectories.
    pub fn new(board: Arc<GhostBoard>, physics_seed: u64) -> Result<Self, SimError> {
        let mut physics_rng = ChaCha8Rng::seed_from_u64(physics_seed);
        let ghosts = board.initial_distribution().sample(&mut physics_rng)?;

        Ok(Self {
            board,
            physics_rng,
            ghosts,
            time: 0,
        })
    }

    /// Creates an Oracle with a fixed starting placement.
    pub fn with_ghosts(board: Arc<GhostBoard>, physics_seed: u64, ghosts: GhostTuple) -> Self {
        Self {
            board,
            physics_rng: ChaCha8Rng::seed_from_u64(physics_seed),
            ghosts,
            time: 0,
        }
    }

    /// Moves every ghost one tick.
    pub fn step(&mut self) -> Result<(), SimError> {
        self.ghosts = self
            .board
            .transition_distribution(&self.ghosts)
            .sample(&mut self.physics_rng)?;
        self.time += 1;
        Ok(())
    }

    /// Samples what a sensor at `location` reports right now.
    pub fn sense(&mut self, location: Position) -> Result<Reading, SimError> {
        if !self.board.contains(&location) {
            return Err(SimError::config(format!("sensor {location} is off the board")));
        }
        Ok(self
            .board
            .reading_distribution(&self.ghosts, location)
            .sample(&mut self.physics_rng)?)
    }

    /// Returns the true ghost placement.
    pub fn ghosts(&self) -> &GhostTuple {
        &self.ghosts
    }

    /// Returns the number of ticks elapsed.
    pub fn time(&self) -> u64 {
        self.time
    }
}
