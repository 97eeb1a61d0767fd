//! JSON exporter for board visualization.
//!
//! Exports per-tick frames (true ghosts, readings, and the occupancy shading
//! each filter would paint on the board) as a single JSON document.

use crate::board::{BoardConfig, Reading};
use crate::error::SimError;
use crate::world::{SimWorld, TickReport};

use ghostview_core::summary::{most_likely, position_marginals};
use ghostview_core::{Distribution, Observation, Position};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// A single frame of simulation data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimFrame {
    /// Tick index
    pub tick: u64,

    /// Ground truth ghost positions
    pub ghosts: Vec<Position>,

    /// Readings taken this tick
    pub observations: Vec<Observation<Reading>>,

    /// Exact occupancy probability per cell
    pub exact: Vec<CellProbability>,

    /// Particle occupancy probability per cell
    pub particle: Vec<CellProbability>,

    /// Exact filter's best guess
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exact_guess: Option<Vec<Position>>,

    /// Total variation between the two beliefs
    pub total_variation: f64,
}

/// Occupancy probability of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellProbability {
    pub x: i32,
    pub y: i32,
    pub p: f64,
}

impl SimFrame {
    /// Captures the world right after `report` was produced.
    pub fn capture(world: &SimWorld, report: &TickReport) -> Result<Self, SimError> {
        let exact = world.exact_belief()?;
        let particle = world.particle_belief()?;

        Ok(Self {
            tick: report.tick,
            ghosts: report.ghosts.positions().to_vec(),
            observations: report.observations.clone(),
            exact: cells(&position_marginals(&exact)),
            particle: cells(&position_marginals(&particle)),
            exact_guess: most_likely(&exact).map(|(tuple, _)| tuple.positions().to_vec()),
            total_variation: report.total_variation,
        })
    }
}

fn cells(marginals: &Distribution<Position>) -> Vec<CellProbability> {
    marginals
        .iter()
        .map(|(position, p)| CellProbability {
            x: position.x,
            y: position.y,
            p,
        })
        .collect()
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Board the run used
    pub board: BoardConfig,

    /// All frames
    pub frames: Vec<SimFrame>,

    /// Final results
    pub passed: bool,

    /// Mean particle/exact total variation, if the run had ticks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_total_variation: Option<f64>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64, board: BoardConfig) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            board,
            frames: Vec::new(),
            passed: false,
            mean_total_variation: None,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: SimFrame) {
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, mean_total_variation: Option<f64>) {
        self.passed = passed;
        self.mean_total_variation = mean_total_variation;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), SimError> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
