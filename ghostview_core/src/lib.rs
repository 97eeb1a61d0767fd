//! GhostView Core - belief tracking over hidden ghost positions
//!
//! This library estimates where one or more ghosts are hiding on a discrete
//! board from noisy sensor readings:
//! 1. **Exact filtering**: forward algorithm over every joint ghost placement
//! 2. **Particle filtering**: sampling approximation for large state spaces
//! 3. **Static inference**: posterior and predictive queries over one batch of readings
//!
//! The board, ghost movement and sensor physics are supplied by the caller
//! through the [`GameModel`] trait.

pub mod distribution;
pub mod error;
pub mod exact;
pub mod inference;
pub mod model;
pub mod particle;
pub mod state;
pub mod static_inference;
pub mod summary;

// Re-export key types for convenience
pub use distribution::{Distribution, Sampler, PROBABILITY_EPSILON};
pub use error::InferenceError;
pub use exact::ExactInference;
pub use inference::{DynamicInference, StaticInference};
pub use model::GameModel;
pub use particle::{DegeneracyPolicy, ParticleEnsemble, ParticleFilter, ParticleFilterConfig};
pub use state::{Evidence, GhostTuple, Observation, Position};
pub use static_inference::ExactStaticInference;
