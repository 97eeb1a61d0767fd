//! Ghost-hunting scenarios for the simulation harness.

use crate::board::BoardConfig;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// GV-001: one ghost on an open board
    SingleGhost,

    /// GV-002: two interchangeable ghosts
    GhostPair,

    /// GV-003: three ghosts packed on a small board
    Crowd,

    /// GV-004: half of all readings land one band off
    NoisySensor,

    /// GV-005: one batch of simultaneous readings, static inference only
    StaticSweep,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::SingleGhost,
            ScenarioId::GhostPair,
            ScenarioId::Crowd,
            ScenarioId::NoisySensor,
            ScenarioId::StaticSweep,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::SingleGhost => "single_ghost",
            ScenarioId::GhostPair => "ghost_pair",
            ScenarioId::Crowd => "crowd",
            ScenarioId::NoisySensor => "noisy_sensor",
            ScenarioId::StaticSweep => "static_sweep",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::SingleGhost => "1 ghost on 8x8, exact vs particle tracking",
            ScenarioId::GhostPair => "2 ghosts on 6x6, permutation-pooled tuples",
            ScenarioId::Crowd => "3 ghosts on 4x4, 2 sensors per tick",
            ScenarioId::NoisySensor => "1 ghost on 8x8 with 50% band noise",
            ScenarioId::StaticSweep => "2 ghosts on 5x5, batch posterior from a sensor sweep",
        }
    }

    /// Returns true if the scenario exercises static inference only.
    pub fn is_static(&self) -> bool {
        matches!(self, ScenarioId::StaticSweep)
    }

    /// Board used by the scenario.
    pub fn board(&self) -> BoardConfig {
        let base = BoardConfig::default();
        match self {
            ScenarioId::SingleGhost => BoardConfig {
                width: 8,
                height: 8,
                num_ghosts: 1,
                ..base
            },
            ScenarioId::GhostPair => BoardConfig {
                width: 6,
                height: 6,
                num_ghosts: 2,
                ..base
            },
            ScenarioId::Crowd => BoardConfig {
                width: 4,
                height: 4,
                num_ghosts: 3,
                ..base
            },
            ScenarioId::NoisySensor => BoardConfig {
                width: 8,
                height: 8,
                num_ghosts: 1,
                sensor_noise: 0.5,
                ..base
            },
            ScenarioId::StaticSweep => BoardConfig {
                width: 5,
                height: 5,
                num_ghosts: 2,
                ..base
            },
        }
    }

    /// Sensors fired per tick.
    pub fn sensors_per_tick(&self) -> usize {
        match self {
            ScenarioId::Crowd => 2,
            _ => 1,
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single_ghost" | "singleghost" | "gv-001" => Ok(ScenarioId::SingleGhost),
            "ghost_pair" | "ghostpair" | "gv-002" => Ok(ScenarioId::GhostPair),
            "crowd" | "gv-003" => Ok(ScenarioId::Crowd),
            "noisy_sensor" | "noisysensor" | "gv-004" => Ok(ScenarioId::NoisySensor),
            "static_sweep" | "staticsweep" | "gv-005" => Ok(ScenarioId::StaticSweep),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
