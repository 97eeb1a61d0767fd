//! Reference grid board implementing the GhostView game model.
//!
//! - Ghosts start uniformly and independently on a `width × height` grid
//! - Each tick a ghost stays put with `stay_probability`, otherwise it steps
//!   to a uniformly chosen in-bounds neighbour
//! - A sensor reports a colour band for the Manhattan distance to the
//!   nearest ghost, off by one band with probability `sensor_noise`

use crate::error::SimError;
use ghostview_core::{Distribution, GameModel, GhostTuple, Position};
use serde::{Deserialize, Serialize};

/// Sensor colour bands, nearest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reading {
    /// Distance 0-1
    Red,
    /// Distance 2-3
    Orange,
    /// Distance 4-5
    Yellow,
    /// Distance 6+
    Green,
}

impl Reading {
    pub const ALL: [Reading; 4] = [Reading::Red, Reading::Orange, Reading::Yellow, Reading::Green];

    /// Noise-free band for a distance.
    pub fn from_distance(distance: u32) -> Self {
        match distance {
            0..=1 => Reading::Red,
            2..=3 => Reading::Orange,
            4..=5 => Reading::Yellow,
            _ => Reading::Green,
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    /// Bands one step nearer and farther, where they exist.
    fn adjacent(self) -> Vec<Reading> {
        let i = self.index();
        let mut bands = Vec::with_capacity(2);
        if i > 0 {
            bands.push(Self::ALL[i - 1]);
        }
        if i + 1 < Self::ALL.len() {
            bands.push(Self::ALL[i + 1]);
        }
        bands
    }
}

/// Configuration for a GhostBoard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Columns (default: 6)
    pub width: i32,

    /// Rows (default: 6)
    pub height: i32,

    /// Ghosts on the board (default: 1)
    pub num_ghosts: usize,

    /// Chance a ghost skips its move (default: 0.2)
    pub stay_probability: f64,

    /// Chance a reading lands one band off (default: 0.2)
    pub sensor_noise: f64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            width: 6,
            height: 6,
            num_ghosts: 1,
            stay_probability: 0.2,
            sensor_noise: 0.2,
        }
    }
}

impl BoardConfig {
    fn validate(&self) -> Result<(), SimError> {
        if self.width < 1 || self.height < 1 {
            return Err(SimError::config(format!(
                "board must be at least 1x1, got {}x{}",
                self.width, self.height
            )));
        }
        if self.num_ghosts == 0 {
            return Err(SimError::config("board needs at least one ghost"));
        }
        if !(0.0..=1.0).contains(&self.stay_probability) {
            return Err(SimError::config(format!(
                "stay_probability {} outside [0, 1]",
                self.stay_probability
            )));
        }
        if !(0.0..1.0).contains(&self.sensor_noise) {
            return Err(SimError::config(format!(
                "sensor_noise {} outside [0, 1)",
                self.sensor_noise
            )));
        }
        Ok(())
    }
}

/// Grid board with interchangeable, independently wandering ghosts.
#[derive(Debug, Clone)]
pub struct GhostBoard {
    config: BoardConfig,

    /// Every cell, in position order
    cells: Vec<Position>,

    /// Every canonical ghost tuple, enumerated once
    tuples: Vec<GhostTuple>,
}

impl GhostBoard {
    /// Builds a board, enumerating its full hidden-state space.
    pub fn new(config: BoardConfig) -> Result<Self, SimError> {
        config.validate()?;

        let cells: Vec<Position> = (0..config.width)
            .flat_map(|x| (0..config.height).map(move |y| Position::new(x, y)))
            .collect();
        let tuples = multisets(&cells, config.num_ghosts);

        Ok(Self {
            config,
            cells,
            tuples,
        })
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn cells(&self) -> &[Position] {
        &self.cells
    }

    /// Size of the hidden-state space.
    pub fn num_tuples(&self) -> usize {
        self.tuples.len()
    }

    pub fn contains(&self, position: &Position) -> bool {
        (0..self.config.width).contains(&position.x)
            && (0..self.config.height).contains(&position.y)
    }

    /// Where a single ghost at `position` may be after one tick.
    pub fn move_distribution(&self, position: &Position) -> Distribution<Position> {
        let moves: Vec<Position> = position
            .neighbors()
            .into_iter()
            .filter(|p| self.contains(p))
            .collect();

        if moves.is_empty() {
            return Distribution::point(*position);
        }

        let step = (1.0 - self.config.stay_probability) / moves.len() as f64;
        let mut dist = Distribution::new();
        dist.increment(*position, self.config.stay_probability);
        for target in moves {
            dist.increment(target, step);
        }
        dist
    }
}

impl GameModel for GhostBoard {
    type Reading = Reading;

    fn initial_distribution(&self) -> Distribution<GhostTuple> {
        let uniform = Distribution::uniform(self.cells.iter().copied());
        joint(&vec![uniform; self.config.num_ghosts])
    }

    fn ghost_tuples(&self) -> Vec<GhostTuple> {
        self.tuples.clone()
    }

    fn transition_distribution(&self, tuple: &GhostTuple) -> Distribution<GhostTuple> {
        let per_ghost: Vec<Distribution<Position>> = tuple
            .positions()
            .iter()
            .map(|p| self.move_distribution(p))
            .collect();
        joint(&per_ghost)
    }

    fn reading_distribution(
        &self,
        tuple: &GhostTuple,
        location: Position,
    ) -> Distribution<Reading> {
        let distance = tuple.nearest_distance(&location).unwrap_or(u32::MAX);
        let truth = Reading::from_distance(distance);
        let neighbours = truth.adjacent();

        let mut dist = Distribution::new();
        dist.increment(truth, 1.0 - self.config.sensor_noise);
        for band in &neighbours {
            dist.increment(*band, self.config.sensor_noise / neighbours.len() as f64);
        }
        dist
    }

    fn readings(&self) -> Vec<Reading> {
        Reading::ALL.to_vec()
    }

    fn contains_location(&self, location: Position) -> bool {
        self.contains(&location)
    }
}

/// Joint distribution of independent per-ghost marginals, bucketed by
/// canonical tuple so that permutations pool their mass.
fn joint(per_ghost: &[Distribution<Position>]) -> Distribution<GhostTuple> {
    let mut partial: Vec<(Vec<Position>, f64)> = vec![(Vec::new(), 1.0)];
    for marginal in per_ghost {
        let mut extended = Vec::with_capacity(partial.len() * marginal.len());
        for (positions, weight) in &partial {
            for (position, probability) in marginal.iter() {
                let mut next = positions.clone();
                next.push(*position);
                extended.push((next, weight * probability));
            }
        }
        partial = extended;
    }

    partial
        .into_iter()
        .map(|(positions, weight)| (GhostTuple::new(positions), weight))
        .collect()
}

/// All size-`k` multisets of `cells` (which must be sorted), as tuples.
fn multisets(cells: &[Position], k: usize) -> Vec<GhostTuple> {
    fn extend(
        cells: &[Position],
        start: usize,
        k: usize,
        current: &mut Vec<Position>,
        out: &mut Vec<GhostTuple>,
    ) {
        if current.len() == k {
            out.push(GhostTuple::new(current.iter().copied()));
            return;
        }
        for i in start..cells.len() {
            current.push(cells[i]);
            extend(cells, i, k, current, out);
            current.pop();
        }
    }

    let mut out = Vec::new();
    extend(cells, 0, k, &mut Vec::with_capacity(k), &mut out);
    out
}
