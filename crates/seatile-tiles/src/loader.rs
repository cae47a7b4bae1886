use std::time::{Duration, Instant};

use seatile_config::{BackendConfig, LoaderConfig};
use seatile_core::TimeKey;
use seatile_geo::{bounds_of, to_tile, LatBand, LodLevel, LodTable};

use crate::cache::{RecordId, TileCache, TileKey};
use crate::fetch::{FetchError, FetchOutcome, FetchRequest, TileFetch};
use crate::request::build_tile_url;
use crate::surface::{RenderSurface, RenderableSpec};
use crate::telemetry;
use crate::viewport::ViewState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Polar,
    Degenerate,
    OutOfWorld,
    BadUrl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Cached,
    Skipped(SkipReason),
    Requested(RecordId),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchReport {
    pub level: LodLevel,
    pub center: (u32, u32),
    pub requested: usize,
    pub skipped: usize,
    pub evicted: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoaderStats {
    pub last_batch: Option<Duration>,
    pub total_requested: u64,
    pub batches: u64,
    pub dropped_batches: u64,
    pub fetch_successes: u64,
    pub fetch_failures: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchDisposition {
    Applied,
    Failed,
    Stale,
}

/// Owns the displayed-tile cache and runs load batches against it.
///
/// Every cache insert happens before the matching fetch is queued, and a
/// batch evicts only after all of its own inserts.
pub struct TileLoader<S: RenderSurface, F: TileFetch> {
    cache: TileCache<S::Handle>,
    surface: S,
    fetcher: F,
    backend: BackendConfig,
    table: LodTable,
    lat_band: LatBand,
    range: u32,
    max_age: Duration,
    in_flight: bool,
    stats: LoaderStats,
}

impl<S: RenderSurface, F: TileFetch> TileLoader<S, F> {
    pub fn new(config: &LoaderConfig, backend: BackendConfig, surface: S, fetcher: F) -> Self {
        Self {
            cache: TileCache::new(),
            surface,
            fetcher,
            backend,
            table: config.lod_table.clone(),
            lat_band: config.lat_band,
            range: config.range,
            max_age: config.max_age(),
            in_flight: false,
            stats: LoaderStats::default(),
        }
    }

    pub fn cache(&self) -> &TileCache<S::Handle> {
        &self.cache
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn stats(&self) -> &LoaderStats {
        &self.stats
    }

    pub fn lod_table(&self) -> &LodTable {
        &self.table
    }

    pub fn backend(&self) -> &BackendConfig {
        &self.backend
    }

    pub fn set_backend(&mut self, backend: BackendConfig) {
        self.backend = backend;
    }

    pub fn is_batch_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn load_one(
        &mut self,
        tile_x: u32,
        tile_y: u32,
        level: &LodLevel,
        time: TimeKey,
        now: Instant,
    ) -> LoadOutcome {
        let key = TileKey::new(level.index, tile_x, tile_y);
        if self.cache.has(&key) {
            return LoadOutcome::Cached;
        }

        let Some(bounds) = bounds_of(tile_x, tile_y, level.tiles_x, level.tiles_y, self.lat_band)
        else {
            tracing::debug!(key = %key, "Skipping polar tile");
            return self.skipped(SkipReason::Polar);
        };
        if bounds.is_degenerate() {
            tracing::warn!(key = %key, ?bounds, "Skipping degenerate tile");
            return self.skipped(SkipReason::Degenerate);
        }
        if !bounds.within_world() {
            tracing::warn!(key = %key, ?bounds, "Tile bounds outside world range");
            return self.skipped(SkipReason::OutOfWorld);
        }

        let url = match build_tile_url(&self.backend, time, key) {
            Ok(url) => url,
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "Cannot build tile url");
                return self.skipped(SkipReason::BadUrl);
            }
        };

        let handle = self.surface.add(RenderableSpec {
            key,
            bounds,
            image_url: url.clone(),
        });
        let record = match self.cache.insert(key, handle, bounds, now) {
            Ok(record) => record,
            Err(handle) => {
                self.surface.remove(handle);
                return LoadOutcome::Cached;
            }
        };
        metrics::counter!(telemetry::TILES_REQUESTED).increment(1);
        tracing::debug!(key = %key, record = %record, url = %url, "Requesting tile");

        let accepted = self.fetcher.request(FetchRequest { record, key, url });
        if !accepted {
            self.note_fetch_failure(key, &FetchError::Rejected);
        }
        LoadOutcome::Requested(record)
    }

    /// Loads the neighborhood around a viewpoint at the level its height
    /// selects, then evicts everything else. Returns `None` when another
    /// batch is still running.
    ///
    /// Batches run to completion inside this call, so the in-flight guard
    /// only trips for hosts that share the loader through a cell and re-enter
    /// it from a surface or fetcher callback.
    pub fn load_around(
        &mut self,
        view: ViewState,
        time: TimeKey,
        now: Instant,
    ) -> Option<BatchReport> {
        if self.in_flight {
            self.stats.dropped_batches += 1;
            metrics::counter!(telemetry::BATCHES_DROPPED).increment(1);
            tracing::debug!("Load batch already in flight, dropping request");
            return None;
        }
        self.in_flight = true;
        let timer = Instant::now();

        let level = *self.table.select(view.height_m);
        let (center_x, center_y) = to_tile(view.lon, view.lat, &level);
        let (span_lon, span_lat) = level.tile_span_deg();
        tracing::debug!(
            level = level.index,
            tiles_x = level.tiles_x,
            tiles_y = level.tiles_y,
            center_x,
            center_y,
            span_lon,
            span_lat,
            "Loading tiles around viewpoint"
        );

        let mut requested = 0;
        let mut skipped = 0;
        for (tile_x, tile_y) in neighborhood(center_x, center_y, self.range, &level) {
            match self.load_one(tile_x, tile_y, &level, time, now) {
                LoadOutcome::Requested(_) => requested += 1,
                LoadOutcome::Skipped(_) => skipped += 1,
                LoadOutcome::Cached => {}
            }
        }

        let evicted = self.cache.evict(&mut self.surface, level.index, self.max_age, now);
        if evicted > 0 {
            metrics::counter!(telemetry::TILES_EVICTED).increment(evicted as u64);
        }

        let elapsed = timer.elapsed();
        self.stats.last_batch = Some(elapsed);
        self.stats.total_requested += requested as u64;
        self.stats.batches += 1;
        self.in_flight = false;
        metrics::gauge!(telemetry::CACHE_TILES).set(self.cache.len() as f64);
        metrics::histogram!(telemetry::BATCH_DURATION_MS).record(elapsed.as_secs_f64() * 1000.0);
        tracing::info!(
            level = level.index,
            requested,
            skipped,
            evicted,
            cached = self.cache.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Load batch complete"
        );

        Some(BatchReport {
            level,
            center: (center_x, center_y),
            requested,
            skipped,
            evicted,
            elapsed,
        })
    }

    /// Applies a finished fetch to its record if that record is still cached.
    /// Completions never add, remove or retry cache entries.
    pub fn handle_fetch_outcome(&mut self, outcome: FetchOutcome) -> FetchDisposition {
        let live = self
            .cache
            .get(&outcome.key)
            .filter(|record| record.id == outcome.record);
        let Some(record) = live else {
            tracing::debug!(
                key = %outcome.key,
                record = %outcome.record,
                "Ignoring completion for evicted tile"
            );
            return FetchDisposition::Stale;
        };
        match outcome.result {
            Ok(texture) => {
                tracing::debug!(
                    key = %outcome.key,
                    width = texture.width,
                    height = texture.height,
                    "Tile image loaded"
                );
                self.surface.attach_texture(record.handle(), texture);
                self.stats.fetch_successes += 1;
                metrics::counter!(telemetry::FETCH_SUCCESS).increment(1);
                FetchDisposition::Applied
            }
            Err(err) => {
                self.note_fetch_failure(outcome.key, &err);
                FetchDisposition::Failed
            }
        }
    }

    /// Removes every record and releases its renderable.
    pub fn clear_all(&mut self) -> usize {
        let removed = self.cache.clear_all(&mut self.surface);
        if removed > 0 {
            metrics::counter!(telemetry::TILES_EVICTED).increment(removed as u64);
        }
        metrics::gauge!(telemetry::CACHE_TILES).set(0.0);
        removed
    }

    pub fn into_surface(mut self) -> S {
        self.clear_all();
        self.surface
    }

    fn skipped(&mut self, reason: SkipReason) -> LoadOutcome {
        metrics::counter!(telemetry::TILES_SKIPPED).increment(1);
        LoadOutcome::Skipped(reason)
    }

    fn note_fetch_failure(&mut self, key: TileKey, err: &FetchError) {
        self.stats.fetch_failures += 1;
        metrics::counter!(telemetry::FETCH_FAILURE).increment(1);
        tracing::warn!(key = %key, error = %err, "Tile image failed to load");
    }
}

/// In-grid tiles within `range` of the center, column by column. Neighbors
/// past the antimeridian are dropped rather than wrapped. The window is
/// clipped to the grid first, so a huge `range` costs no more than the level.
fn neighborhood(
    center_x: u32,
    center_y: u32,
    range: u32,
    level: &LodLevel,
) -> impl Iterator<Item = (u32, u32)> {
    let window = |center: u32, count: u32| {
        let last = count.saturating_sub(1);
        center.saturating_sub(range)..=center.saturating_add(range).min(last)
    };
    let columns = window(center_x, level.tiles_x);
    let rows = window(center_y, level.tiles_y);
    columns.flat_map(move |x| rows.clone().map(move |y| (x, y)))
}
