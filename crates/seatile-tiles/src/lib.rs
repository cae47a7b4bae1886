//! Viewpoint-driven tile pyramid cache.
//!
//! [`TileSession`] is the owning controller: it throttles viewpoint signals,
//! runs one [`TileLoader`] batch at a time, drives the time axis and drains
//! fetch completions. Everything runs on the caller's thread; only image
//! downloads happen on [`HttpTileFetcher`] workers.

pub mod cache;
pub mod fetch;
pub mod loader;
pub mod request;
pub mod session;
pub mod status;
pub mod surface;
pub mod telemetry;
pub mod timeline;
pub mod viewport;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{RecordId, TileCache, TileKey, TileRecord};
pub use fetch::{FetchError, FetchOutcome, FetchRequest, HttpTileFetcher, TileFetch};
pub use loader::{BatchReport, FetchDisposition, LoadOutcome, LoaderStats, SkipReason, TileLoader};
pub use request::build_tile_url;
pub use session::TileSession;
pub use status::StatusReporter;
pub use surface::{RenderSurface, RenderableSpec, TileTexture};
pub use telemetry::describe_metrics;
pub use timeline::TimeAxisController;
pub use viewport::{ViewSignal, ViewState, Viewpoint, ViewportTracker};
