use seatile_core::TimeKey;
use seatile_geo::{LatBand, LodLevel, LodTable};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use std::{env, fmt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Local,
    Dev,
    Test,
    Staging,
    Prod,
}

impl Environment {
    pub fn from_env(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "local" => Self::Local,
            "dev" | "development" => Self::Dev,
            "test" | "testing" => Self::Test,
            "staging" => Self::Staging,
            "prod" | "production" => Self::Prod,
            _ => Self::Local,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Self::Local => "local",
            Self::Dev => "dev",
            Self::Test => "test",
            Self::Staging => "staging",
            Self::Prod => "prod",
        };
        write!(f, "{}", value)
    }
}

/// Source of raw configuration values, keyed by variable name.
pub trait ConfigSource {
    fn get(&self, key: &str) -> Option<String>;
}

pub struct ProcessEnv;

impl ConfigSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

impl<F> ConfigSource for F
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        self(key)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub service_name: String,
    pub environment: Environment,
    pub metrics_addr: Option<String>,
    pub log_level: String,
}

impl ServiceConfig {
    pub fn from_env(default_service_name: &str) -> Self {
        Self::from_source(&ProcessEnv, default_service_name)
    }

    pub fn from_source(source: &impl ConfigSource, default_service_name: &str) -> Self {
        Self {
            service_name: var_or(source, "SEATILE_SERVICE_NAME", default_service_name),
            environment: Environment::from_env(&var_or(source, "SEATILE_ENV", "local")),
            metrics_addr: source.get("SEATILE_METRICS_ADDR"),
            log_level: var_or(source, "SEATILE_LOG_LEVEL", "info"),
        }
    }
}

/// Values that shape each backend tile request. Mirrors the user-facing
/// address, depth and time controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    pub nc_type: String,
    pub time_type: i32,
    pub depth_m: f64,
    pub initial_time: TimeKey,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4433/api/tile".to_string(),
            nc_type: "so".to_string(),
            time_type: 0,
            depth_m: 0.0,
            initial_time: TimeKey::default(),
        }
    }
}

impl BackendConfig {
    pub fn from_env() -> Self {
        Self::from_source(&ProcessEnv)
    }

    pub fn from_source(source: &impl ConfigSource) -> Self {
        let defaults = Self::default();
        let initial_time = match source.get("SEATILE_TIME") {
            Some(raw) => TimeKey::parse(&raw).unwrap_or_else(|err| {
                tracing::warn!(
                    value = %raw,
                    error = %err,
                    "Invalid SEATILE_TIME value, using default"
                );
                defaults.initial_time
            }),
            None => defaults.initial_time,
        };
        Self {
            base_url: source
                .get("SEATILE_BACKEND_URL")
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or(defaults.base_url),
            nc_type: var_or(source, "SEATILE_NC_TYPE", &defaults.nc_type),
            time_type: var_parse(source, "SEATILE_TIME_TYPE", defaults.time_type),
            depth_m: var_parse(source, "SEATILE_DEPTH", defaults.depth_m),
            initial_time,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    pub range: u32,
    pub max_age_ms: u64,
    pub lat_band: LatBand,
    pub settled_throttle_ms: u64,
    pub moving_throttle_ms: u64,
    pub reload_delay_ms: u64,
    pub initial_load_delay_ms: u64,
    pub fetch_workers: usize,
    pub fetch_timeout_secs: u64,
    pub lod_table: LodTable,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            range: 4,
            max_age_ms: 60_000,
            lat_band: LatBand::default(),
            settled_throttle_ms: 300,
            moving_throttle_ms: 1_000,
            reload_delay_ms: 100,
            initial_load_delay_ms: 500,
            fetch_workers: 6,
            fetch_timeout_secs: 12,
            lod_table: LodTable::default(),
        }
    }
}

impl LoaderConfig {
    pub fn from_env() -> Self {
        Self::from_source(&ProcessEnv)
    }

    pub fn from_source(source: &impl ConfigSource) -> Self {
        let defaults = Self::default();
        let mut lat_band = LatBand {
            min: var_parse(source, "SEATILE_LAT_MIN", defaults.lat_band.min),
            max: var_parse(source, "SEATILE_LAT_MAX", defaults.lat_band.max),
        };
        if !(-90.0..=90.0).contains(&lat_band.min)
            || !(-90.0..=90.0).contains(&lat_band.max)
            || lat_band.min >= lat_band.max
        {
            tracing::warn!(
                lat_min = lat_band.min,
                lat_max = lat_band.max,
                "Invalid latitude band, using default"
            );
            lat_band = defaults.lat_band;
        }
        let lod_table = source
            .get("SEATILE_LOD_TABLE")
            .and_then(|raw| serde_json::from_str::<serde_json::Value>(&raw).ok())
            .and_then(|value| lod_table_from_value(&value))
            .unwrap_or(defaults.lod_table);

        Self {
            range: var_parse(source, "SEATILE_RANGE", defaults.range),
            max_age_ms: var_parse(source, "SEATILE_MAX_AGE_MS", defaults.max_age_ms),
            lat_band,
            settled_throttle_ms: var_parse(
                source,
                "SEATILE_SETTLED_THROTTLE_MS",
                defaults.settled_throttle_ms,
            ),
            moving_throttle_ms: var_parse(
                source,
                "SEATILE_MOVING_THROTTLE_MS",
                defaults.moving_throttle_ms,
            ),
            reload_delay_ms: var_parse(source, "SEATILE_RELOAD_DELAY_MS", defaults.reload_delay_ms),
            initial_load_delay_ms: var_parse(
                source,
                "SEATILE_INITIAL_LOAD_DELAY_MS",
                defaults.initial_load_delay_ms,
            ),
            fetch_workers: var_parse(source, "SEATILE_FETCH_WORKERS", defaults.fetch_workers)
                .max(1),
            fetch_timeout_secs: var_parse(
                source,
                "SEATILE_FETCH_TIMEOUT_SECS",
                defaults.fetch_timeout_secs,
            ),
            lod_table,
        }
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_millis(self.max_age_ms)
    }

    pub fn settled_throttle(&self) -> Duration {
        Duration::from_millis(self.settled_throttle_ms)
    }

    pub fn moving_throttle(&self) -> Duration {
        Duration::from_millis(self.moving_throttle_ms)
    }

    pub fn reload_delay(&self) -> Duration {
        Duration::from_millis(self.reload_delay_ms)
    }

    pub fn initial_load_delay(&self) -> Duration {
        Duration::from_millis(self.initial_load_delay_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LodTableConfig {
    levels: Vec<LodLevelConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LodLevelConfig {
    max_height: f64,
    tiles_x: u32,
    tiles_y: u32,
}

/// Parses a pyramid override such as
/// `{"levels":[{"maxHeight":1e7,"tilesX":2,"tilesY":1},{"maxHeight":0,"tilesX":4,"tilesY":2}]}`.
pub fn lod_table_from_value(value: &serde_json::Value) -> Option<LodTable> {
    let config: LodTableConfig = match serde_json::from_value(value.clone()) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(error = %err, "Malformed SEATILE_LOD_TABLE, using default pyramid");
            return None;
        }
    };
    let levels = config
        .levels
        .into_iter()
        .enumerate()
        .map(|(index, level)| {
            LodLevel::new(
                index.min(u8::MAX as usize) as u8,
                level.max_height,
                level.tiles_x,
                level.tiles_y,
            )
        })
        .collect();
    match LodTable::new(levels) {
        Ok(table) => Some(table),
        Err(err) => {
            tracing::warn!(error = %err, "Rejected SEATILE_LOD_TABLE, using default pyramid");
            None
        }
    }
}

fn var_or(source: &impl ConfigSource, key: &str, default: &str) -> String {
    source.get(key).unwrap_or_else(|| default.to_string())
}

fn var_parse<T: FromStr>(source: &impl ConfigSource, key: &str, default: T) -> T {
    source
        .get(key)
        .and_then(|value| value.trim().parse::<T>().ok())
        .unwrap_or(default)
}
