use serde::{Deserialize, Serialize};

const DEFAULT_GREEN_FLOOR: u8 = 85;
const DEFAULT_AMBER_FLOOR: u8 = 50;

/// Per-tenant RAG banding: green at or above `green_floor`, amber at or
/// above `amber_floor`, red below. Injected configuration, not constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringConfig {
    green_floor: u8,
    amber_floor: u8,
}

impl ScoringConfig {
    /// Builds a config, falling back to the defaults when the floors are
    /// out of range or inverted.
    pub fn new(green_floor: u8, amber_floor: u8) -> Self {
        if green_floor > 100 || amber_floor >= green_floor {
            return Self::default();
        }
        Self {
            green_floor,
            amber_floor,
        }
    }

    pub fn green_floor(&self) -> u8 {
        self.green_floor
    }

    pub fn amber_floor(&self) -> u8 {
        self.amber_floor
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            green_floor: DEFAULT_GREEN_FLOOR,
            amber_floor: DEFAULT_AMBER_FLOOR,
        }
    }
}
