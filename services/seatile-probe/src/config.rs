use std::time::Duration;

use seatile_config::{ConfigSource, ProcessEnv};
use seatile_core::SeatileResult;
use seatile_tiles::ViewState;

use crate::camera::{parse_path, parse_time_steps};

const DEFAULT_PATH: &str = "116.4,39.9,20000000;116.4,39.9,3000000;121.5,31.2,800000";

#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub waypoints: Vec<ViewState>,
    pub time_steps: Vec<i32>,
    pub leg_ms: u64,
    pub tick_ms: u64,
    pub linger_ms: u64,
}

impl ProbeConfig {
    pub fn from_env() -> SeatileResult<Self> {
        Self::from_source(&ProcessEnv)
    }

    pub fn from_source(source: &impl ConfigSource) -> SeatileResult<Self> {
        let path = source
            .get("SEATILE_PROBE_PATH")
            .unwrap_or_else(|| DEFAULT_PATH.to_string());
        let steps = source.get("SEATILE_PROBE_TIME_STEPS").unwrap_or_default();
        Ok(Self {
            waypoints: parse_path(&path)?,
            time_steps: parse_time_steps(&steps)?,
            leg_ms: millis(source, "SEATILE_PROBE_LEG_MS", 4_000),
            tick_ms: millis(source, "SEATILE_PROBE_TICK_MS", 50).max(1),
            linger_ms: millis(source, "SEATILE_PROBE_LINGER_MS", 3_000),
        })
    }

    pub fn leg_duration(&self) -> Duration {
        Duration::from_millis(self.leg_ms)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn linger(&self) -> Duration {
        Duration::from_millis(self.linger_ms)
    }
}

fn millis(source: &impl ConfigSource, key: &str, default: u64) -> u64 {
    source
        .get(key)
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}
