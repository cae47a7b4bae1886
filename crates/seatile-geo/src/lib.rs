use serde::{Deserialize, Serialize};

pub mod lod;
pub mod mapping;

pub use lod::{LodLevel, LodTable};
pub use mapping::{bounds_of, to_tile};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl GeoBounds {
    pub fn contains(&self, point: GeoPoint) -> bool {
        point.lat <= self.north
            && point.lat >= self.south
            && point.lon <= self.east
            && point.lon >= self.west
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint {
            lon: (self.west + self.east) * 0.5,
            lat: (self.south + self.north) * 0.5,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.west < self.east && self.south < self.north)
    }

    pub fn within_world(&self) -> bool {
        self.west >= -180.0 && self.east <= 180.0 && self.south >= -90.0 && self.north <= 90.0
    }
}

/// Latitude band where source data exists; tiles are clipped to it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatBand {
    pub min: f64,
    pub max: f64,
}

impl Default for LatBand {
    fn default() -> Self {
        Self {
            min: -75.0,
            max: 85.0,
        }
    }
}
