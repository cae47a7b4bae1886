use crate::cache::TileKey;
use reqwest::Url;
use seatile_config::BackendConfig;
use seatile_core::{SeatileError, SeatileResult, TimeKey};

/// Backend query for one tile. The data is monthly, so `day` and `hour` are
/// pinned to the first hour of the month.
pub fn build_tile_url(backend: &BackendConfig, time: TimeKey, key: TileKey) -> SeatileResult<String> {
    let params = [
        ("ncType", backend.nc_type.clone()),
        ("timeType", backend.time_type.to_string()),
        ("year", time.year().to_string()),
        ("month", time.month().to_string()),
        ("day", "1".to_string()),
        ("hour", "0".to_string()),
        ("depth", backend.depth_m.to_string()),
        ("level", key.level.to_string()),
        ("tileX", key.x.to_string()),
        ("tileY", key.y.to_string()),
    ];
    let url = Url::parse_with_params(&backend.base_url, &params).map_err(|err| {
        SeatileError::invalid_input(format!("invalid backend url {:?}: {err}", backend.base_url))
    })?;
    Ok(url.into())
}
