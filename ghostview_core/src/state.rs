//! Hidden-state and evidence types.
//!
//! A hidden state is a [`GhostTuple`]: the joint placement of every tracked
//! ghost. Ghosts are interchangeable, so a tuple is stored in canonical
//! (sorted) order and two tuples holding the same multiset of positions are
//! the same state for equality, ordering and hashing alike.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A discrete board coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan (grid) distance to `other`.
    pub fn manhattan(&self, other: &Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// The four orthogonal neighbours, in N/S/E/W order.
    pub fn neighbors(&self) -> [Position; 4] {
        [
            Position::new(self.x, self.y + 1),
            Position::new(self.x, self.y - 1),
            Position::new(self.x + 1, self.y),
            Position::new(self.x - 1, self.y),
        ]
    }
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Joint ghost placement, canonicalized so that permutations coincide.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Position>", into = "Vec<Position>")]
pub struct GhostTuple(Vec<Position>);

impl GhostTuple {
    /// Creates a tuple from positions in any order.
    pub fn new<I: IntoIterator<Item = Position>>(positions: I) -> Self {
        let mut positions: Vec<Position> = positions.into_iter().collect();
        positions.sort_unstable();
        Self(positions)
    }

    /// A one-ghost tuple.
    pub fn single(position: Position) -> Self {
        Self(vec![position])
    }

    /// Positions in canonical order.
    pub fn positions(&self) -> &[Position] {
        &self.0
    }

    /// Number of ghosts in the tuple.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if some ghost sits on `position`.
    pub fn occupies(&self, position: &Position) -> bool {
        self.0.binary_search(position).is_ok()
    }

    /// Distance from `location` to the closest ghost.
    pub fn nearest_distance(&self, location: &Position) -> Option<u32> {
        self.0.iter().map(|p| p.manhattan(location)).min()
    }
}

impl From<Vec<Position>> for GhostTuple {
    fn from(positions: Vec<Position>) -> Self {
        Self::new(positions)
    }
}

impl From<GhostTuple> for Vec<Position> {
    fn from(tuple: GhostTuple) -> Self {
        tuple.0
    }
}

impl fmt::Display for GhostTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, position) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{position}")?;
        }
        write!(f, "]")
    }
}

/// A single sensor reading for sequential inference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation<R> {
    /// Where the sensor was placed
    pub sensor: Position,

    /// What it reported
    pub reading: R,
}

impl<R> Observation<R> {
    pub fn new(sensor: Position, reading: R) -> Self {
        Self { sensor, reading }
    }
}

/// A batch of simultaneous readings keyed by sensor location.
pub type Evidence<R> = BTreeMap<Position, R>;
