//! SimWorld - The simulation harness container.
//!
//! Runs the ground-truth oracle and both dynamic inference modules in
//! lock-step: each tick the ghosts move, both filters predict, random
//! sensors fire, and both filters correct on the same readings.

use crate::board::{BoardConfig, GhostBoard, Reading};
use crate::error::SimError;
use crate::oracle::Oracle;

use ghostview_core::{
    DegeneracyPolicy, Distribution, DynamicInference, ExactInference, GhostTuple, Observation,
    ParticleFilter, ParticleFilterConfig,
};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use tracing::debug;

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Board geometry, ghost count and noise
    pub board: BoardConfig,

    /// Particle filter settings
    pub particles: ParticleFilterConfig,

    /// Sensors fired per tick
    pub sensors_per_tick: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            board: BoardConfig::default(),
            particles: ParticleFilterConfig::default().with_policy(DegeneracyPolicy::Reinitialize),
            sensors_per_tick: 1,
        }
    }
}

/// What happened during one tick.
#[derive(Debug, Clone)]
pub struct TickReport {
    /// Tick index (1-based)
    pub tick: u64,

    /// True ghost placement after the move
    pub ghosts: GhostTuple,

    /// Readings fed to both filters
    pub observations: Vec<Observation<Reading>>,

    /// Exact posterior mass on the true placement
    pub exact_truth_probability: f64,

    /// Particle posterior mass on the true placement
    pub particle_truth_probability: f64,

    /// Total variation between the particle and exact beliefs
    pub total_variation: f64,

    /// Entropy of the exact belief (bits)
    pub exact_entropy: f64,
}

/// The SimWorld - container for the entire simulation.
pub struct SimWorld {
    /// Configuration
    pub config: SimConfig,

    /// Shared game model
    board: Arc<GhostBoard>,

    /// Ground truth oracle
    oracle: Oracle,

    /// Forward-algorithm filter
    exact: ExactInference<GhostBoard>,

    /// Particle filter
    particles: ParticleFilter<GhostBoard, ChaCha8Rng>,

    /// RNG for sensor placement
    sensor_rng: ChaCha8Rng,

    /// Current tick count
    tick_count: u64,
}

impl SimWorld {
    /// Creates a new SimWorld with the given configuration and initializes both filters.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        // Derive separate seeds for different subsystems
        let physics_seed = config.seed.wrapping_mul(0x9e3779b97f4a7c15);
        let filter_seed = config.seed.wrapping_mul(0x517cc1b727220a95);
        let sensor_seed = config.seed ^ 0x2545f4914f6cdd1d;

        let board = Arc::new(GhostBoard::new(config.board.clone())?);
        let oracle = Oracle::new(board.clone(), physics_seed)?;

        let mut exact = ExactInference::new(board.clone());
        exact.initialize()?;

        let mut particles = ParticleFilter::new(
            board.clone(),
            config.particles.clone(),
            ChaCha8Rng::seed_from_u64(filter_seed),
        )?;
        particles.initialize()?;

        debug!(
            seed = config.seed,
            tuples = board.num_tuples(),
            particles = config.particles.num_particles,
            "sim world created"
        );

        Ok(Self {
            config,
            board,
            oracle,
            exact,
            particles,
            sensor_rng: ChaCha8Rng::seed_from_u64(sensor_seed),
            tick_count: 0,
        })
    }

    /// Advances simulation by one tick.
    pub fn tick(&mut self) -> Result<TickReport, SimError> {
        self.oracle.step()?;
        self.exact.elapse_time()?;
        self.particles.elapse_time()?;

        let mut observations = Vec::with_capacity(self.config.sensors_per_tick);
        for _ in 0..self.config.sensors_per_tick {
            let sensor = *self
                .board
                .cells()
                .choose(&mut self.sensor_rng)
                .ok_or_else(|| SimError::config("board has no cells"))?;
            let observation = Observation::new(sensor, self.oracle.sense(sensor)?);

            self.exact.observe(&observation)?;
            self.particles.observe(&observation)?;
            observations.push(observation);
        }

        self.tick_count += 1;

        let exact = self.exact_belief()?;
        let approx = self.particle_belief()?;
        let ghosts = self.oracle.ghosts().clone();
        let report = TickReport {
            tick: self.tick_count,
            exact_truth_probability: exact.get(&ghosts),
            particle_truth_probability: approx.get(&ghosts),
            total_variation: exact.total_variation(&approx),
            exact_entropy: exact.entropy(),
            ghosts,
            observations,
        };

        debug!(
            tick = report.tick,
            ghosts = %report.ghosts,
            p_exact = report.exact_truth_probability,
            p_particle = report.particle_truth_probability,
            tv = report.total_variation,
            "tick"
        );
        Ok(report)
    }

    /// Current exact belief.
    pub fn exact_belief(&self) -> Result<Distribution<GhostTuple>, SimError> {
        Ok(self.exact.belief_distribution()?)
    }

    /// Current particle belief.
    pub fn particle_belief(&self) -> Result<Distribution<GhostTuple>, SimError> {
        Ok(self.particles.belief_distribution()?)
    }

    /// Particles currently held (always the configured N).
    pub fn particle_count(&self) -> usize {
        self.particles.ensemble().map_or(0, |e| e.total())
    }

    /// True ghost placement.
    pub fn ghosts(&self) -> &GhostTuple {
        self.oracle.ghosts()
    }

    pub fn board(&self) -> &Arc<GhostBoard> {
        &self.board
    }

    /// Returns the current tick count.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ghostview_core::PROBABILITY_EPSILON;

    fn small_config(seed: u64) -> SimConfig {
        SimConfig {
            seed,
            board: BoardConfig {
                width: 4,
                height: 4,
                ..Default::default()
            },
            particles: ParticleFilterConfig::default()
                .with_particles(2_000)
                .with_policy(DegeneracyPolicy::Reinitialize),
            sensors_per_tick: 2,
        }
    }

    #[test]
    fn test_sim_world_tick() {
        let mut world = SimWorld::new(small_config(42)).unwrap();
        assert_eq!(world.tick_count(), 0);

        let report = world.tick().unwrap();

        assert_eq!(world.tick_count(), 1);
        assert_eq!(report.tick, 1);
        assert_eq!(report.observations.len(), 2);
        assert_eq!(&report.ghosts, world.ghosts());
    }

    #[test]
    fn test_beliefs_stay_normalized_and_particles_conserved() {
        let mut world = SimWorld::new(small_config(3)).unwrap();

        for _ in 0..15 {
            let report = world.tick().unwrap();
            assert!(world.exact_belief().unwrap().is_normalized(PROBABILITY_EPSILON));
            assert!(world.particle_belief().unwrap().is_normalized(PROBABILITY_EPSILON));
            assert_eq!(world.particle_count(), 2_000);
            // The model is exact, so the truth never leaves the exact support.
            assert!(report.exact_truth_probability > 0.0);
        }
    }

    #[test]
    fn test_sim_world_determinism() {
        let mut world1 = SimWorld::new(small_config(42)).unwrap();
        let mut world2 = SimWorld::new(small_config(42)).unwrap();

        for _ in 0..5 {
            let a = world1.tick().unwrap();
            let b = world2.tick().unwrap();
            assert_eq!(a.ghosts, b.ghosts);
            assert_eq!(a.observations, b.observations);
            assert_eq!(a.total_variation, b.total_variation);
        }
    }

    #[test]
    fn test_invalid_board_is_rejected() {
        let mut config = small_config(1);
        config.board.num_ghosts = 0;
        assert!(matches!(SimWorld::new(config), Err(SimError::InvalidConfig(_))));
    }
}
