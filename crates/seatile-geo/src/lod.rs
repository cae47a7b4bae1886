use seatile_core::{SeatileError, SeatileResult};
use serde::{Deserialize, Serialize};

/// One pyramid level: the grid used while the camera is above `max_height_m`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LodLevel {
    pub index: u8,
    pub max_height_m: f64,
    pub tiles_x: u32,
    pub tiles_y: u32,
}

impl LodLevel {
    pub const fn new(index: u8, max_height_m: f64, tiles_x: u32, tiles_y: u32) -> Self {
        Self {
            index,
            max_height_m,
            tiles_x,
            tiles_y,
        }
    }

    pub fn tile_count(&self) -> u64 {
        self.tiles_x as u64 * self.tiles_y as u64
    }

    /// Tile span in degrees as `(lon, lat)`.
    pub fn tile_span_deg(&self) -> (f64, f64) {
        (360.0 / self.tiles_x as f64, 180.0 / self.tiles_y as f64)
    }
}

const DEFAULT_LEVELS: [LodLevel; 8] = [
    LodLevel::new(0, 50_000_000.0, 2, 1),
    LodLevel::new(1, 20_000_000.0, 4, 2),
    LodLevel::new(2, 10_000_000.0, 8, 4),
    LodLevel::new(3, 5_000_000.0, 16, 8),
    LodLevel::new(4, 2_000_000.0, 32, 16),
    LodLevel::new(5, 1_000_000.0, 64, 32),
    LodLevel::new(6, 500_000.0, 128, 64),
    LodLevel::new(7, 0.0, 256, 128),
];

static CATCH_ALL: LodLevel = DEFAULT_LEVELS[DEFAULT_LEVELS.len() - 1];

/// Ordered tile pyramid, coarsest first, ending in a 0 m catch-all level.
///
/// Deserialization goes through [`LodTable::new`] like every other custom
/// table, so a table is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<LodLevel>", into = "Vec<LodLevel>")]
pub struct LodTable {
    levels: Vec<LodLevel>,
}

impl LodTable {
    pub fn new(levels: Vec<LodLevel>) -> SeatileResult<Self> {
        let Some(last) = levels.last() else {
            return Err(SeatileError::invalid_input("LOD table must not be empty"));
        };
        if last.max_height_m != 0.0 {
            return Err(SeatileError::invalid_input(
                "last LOD level must have a 0 m threshold",
            ));
        }
        if levels.len() > u8::MAX as usize {
            return Err(SeatileError::invalid_input("too many LOD levels"));
        }
        for (position, level) in levels.iter().enumerate() {
            if level.index as usize != position {
                return Err(SeatileError::invalid_input(format!(
                    "LOD level at position {position} has index {}",
                    level.index
                )));
            }
            if level.tiles_y == 0 || level.tiles_x != level.tiles_y.saturating_mul(2) {
                return Err(SeatileError::invalid_input(format!(
                    "LOD level {position} must have tiles_x = 2 * tiles_y > 0"
                )));
            }
        }
        if levels
            .windows(2)
            .any(|pair| pair[0].max_height_m <= pair[1].max_height_m)
        {
            return Err(SeatileError::invalid_input(
                "LOD thresholds must be strictly descending",
            ));
        }
        Ok(Self { levels })
    }

    pub fn levels(&self) -> &[LodLevel] {
        &self.levels
    }

    pub fn get(&self, index: u8) -> Option<&LodLevel> {
        self.levels.get(index as usize)
    }

    pub fn finest(&self) -> &LodLevel {
        self.levels.last().unwrap_or(&CATCH_ALL)
    }

    /// First level whose threshold lies strictly below `height_m`, else the finest.
    pub fn select(&self, height_m: f64) -> &LodLevel {
        self.levels
            .iter()
            .find(|level| height_m > level.max_height_m)
            .unwrap_or_else(|| self.finest())
    }
}

impl TryFrom<Vec<LodLevel>> for LodTable {
    type Error = SeatileError;

    fn try_from(levels: Vec<LodLevel>) -> Result<Self, Self::Error> {
        Self::new(levels)
    }
}

impl From<LodTable> for Vec<LodLevel> {
    fn from(table: LodTable) -> Self {
        table.levels
    }
}

impl Default for LodTable {
    fn default() -> Self {
        Self {
            levels: DEFAULT_LEVELS.to_vec(),
        }
    }
}
