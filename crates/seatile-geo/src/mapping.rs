//! Equirectangular mapping between geographic coordinates and pyramid tiles.
//!
//! Tile `(0, 0)` is the north-west corner; x grows east, y grows south.

use crate::{GeoBounds, LatBand, LodLevel};

/// Tile index containing `(lon, lat)` at `level`, clamped into the grid.
pub fn to_tile(lon: f64, lat: f64, level: &LodLevel) -> (u32, u32) {
    let x = ((lon + 180.0) / 360.0 * level.tiles_x as f64).floor();
    let y = ((90.0 - lat) / 180.0 * level.tiles_y as f64).floor();
    (clamp_index(x, level.tiles_x), clamp_index(y, level.tiles_y))
}

fn clamp_index(value: f64, count: u32) -> u32 {
    let max = count.saturating_sub(1) as i64;
    (value as i64).clamp(0, max) as u32
}

/// Geographic bounds of a tile with latitude clipped to `band`.
///
/// Returns `None` when the tile lies entirely outside the band.
pub fn bounds_of(
    tile_x: u32,
    tile_y: u32,
    tiles_x: u32,
    tiles_y: u32,
    band: LatBand,
) -> Option<GeoBounds> {
    if tiles_x == 0 || tiles_y == 0 {
        return None;
    }
    let span_x = 360.0 / tiles_x as f64;
    let span_y = 180.0 / tiles_y as f64;
    let west = tile_x as f64 * span_x - 180.0;
    let east = west + span_x;
    let north = 90.0 - tile_y as f64 * span_y;
    let south = north - span_y;

    let north = north.min(band.max);
    let south = south.max(band.min);
    if south >= band.max || north <= band.min {
        return None;
    }

    Some(GeoBounds {
        west,
        south,
        east,
        north,
    })
}
