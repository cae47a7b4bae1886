//! Metric names recorded by the loader.

pub const TILES_REQUESTED: &str = "seatile_tiles_requested_total";
pub const TILES_SKIPPED: &str = "seatile_tiles_skipped_total";
pub const TILES_EVICTED: &str = "seatile_tiles_evicted_total";
pub const FETCH_SUCCESS: &str = "seatile_fetch_success_total";
pub const FETCH_FAILURE: &str = "seatile_fetch_failure_total";
pub const BATCHES_DROPPED: &str = "seatile_batches_dropped_total";
pub const CACHE_TILES: &str = "seatile_cache_tiles";
pub const BATCH_DURATION_MS: &str = "seatile_batch_duration_ms";

/// Registers help text for every tile metric with the installed recorder.
pub fn describe_metrics() {
    metrics::describe_counter!(TILES_REQUESTED, "Tiles inserted and sent to the backend");
    metrics::describe_counter!(TILES_SKIPPED, "Tiles skipped for polar or invalid geometry");
    metrics::describe_counter!(TILES_EVICTED, "Tiles removed by eviction or clear");
    metrics::describe_counter!(FETCH_SUCCESS, "Tile images decoded successfully");
    metrics::describe_counter!(FETCH_FAILURE, "Tile image fetches that failed");
    metrics::describe_counter!(BATCHES_DROPPED, "Load batches dropped while another was in flight");
    metrics::describe_gauge!(CACHE_TILES, "Tiles currently held by the cache");
    metrics::describe_histogram!(BATCH_DURATION_MS, "Duration of one load batch in milliseconds");
}
