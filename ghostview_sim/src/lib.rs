//! GhostView Deterministic Simulation Harness
//!
//! This crate provides a controlled ghost hunt where the ground truth is
//! known, so the inference engines in `ghostview_core` can be checked
//! against it and against each other.
//!
//! # Core Principle: One Seed
//!
//! All randomness is derived from a single 64-bit seed:
//! - **Physics**: ghost movement and sensor noise (the Oracle)
//! - **Particles**: the particle filter's resampling stream
//! - **Sensors**: which cells are probed each tick
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         SimWorld                            │
//! │                                                             │
//! │  ┌──────────────────┐   readings   ┌────────────────────┐   │
//! │  │      Oracle      │─────────────►│  ExactInference    │   │
//! │  │  (true ghosts,   │              └────────────────────┘   │
//! │  │   sensor noise)  │─────────────►┌────────────────────┐   │
//! │  └────────┬─────────┘              │  ParticleFilter    │   │
//! │           │                        └────────────────────┘   │
//! │  ┌────────▼─────────────────────────────────────────────┐   │
//! │  │        GhostBoard (GameModel: prior, moves, bands)   │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use ghostview_sim::{SimConfig, SimWorld};
//!
//! let mut world = SimWorld::new(SimConfig::default())?;
//! let report = world.tick()?;
//! println!("TV after one tick: {:.3}", report.total_variation);
//! # Ok::<(), ghostview_sim::SimError>(())
//! ```

mod board;
mod error;
mod exporter;
mod oracle;
mod runner;
pub mod scenarios;
mod world;

pub use board::{BoardConfig, GhostBoard, Reading};
pub use error::SimError;
pub use exporter::{CellProbability, SimExport, SimFrame};
pub use oracle::Oracle;
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use world::{SimConfig, SimWorld, TickReport};
