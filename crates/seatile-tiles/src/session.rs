use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};

use seatile_config::{BackendConfig, LoaderConfig};
use seatile_core::{SeatileResult, TimeKey};

use crate::cache::TileCache;
use crate::fetch::{FetchOutcome, TileFetch};
use crate::loader::{BatchReport, FetchDisposition, LoaderStats, TileLoader};
use crate::status::StatusReporter;
use crate::surface::RenderSurface;
use crate::timeline::TimeAxisController;
use crate::viewport::{ViewSignal, Viewpoint, ViewportTracker};

/// Controller bound to one view: owns the loader and cache, the throttle,
/// the time axis and the status line.
///
/// The host drives it from a single thread: forward viewpoint signals to
/// [`on_signal`](Self::on_signal), call [`tick`](Self::tick) and
/// [`drain_fetches`](Self::drain_fetches) from its event loop, and call
/// [`dispose`](Self::dispose) to release every renderable.
pub struct TileSession<S: RenderSurface, F: TileFetch, V: Viewpoint> {
    loader: TileLoader<S, F>,
    viewpoint: V,
    tracker: ViewportTracker,
    timeline: TimeAxisController,
    status: StatusReporter,
    fetch_results: Receiver<FetchOutcome>,
    initial_load_at: Option<Instant>,
    initial_load_delay: Duration,
}

impl<S: RenderSurface, F: TileFetch, V: Viewpoint> TileSession<S, F, V> {
    pub fn new(
        config: &LoaderConfig,
        backend: BackendConfig,
        surface: S,
        fetcher: F,
        fetch_results: Receiver<FetchOutcome>,
        viewpoint: V,
    ) -> Self {
        let timeline = TimeAxisController::new(backend.initial_time, config.reload_delay());
        Self {
            loader: TileLoader::new(config, backend, surface, fetcher),
            viewpoint,
            tracker: ViewportTracker::new(config.settled_throttle(), config.moving_throttle()),
            timeline,
            status: StatusReporter::new(),
            fetch_results,
            initial_load_at: None,
            initial_load_delay: config.initial_load_delay(),
        }
    }

    /// Schedules the first load once the host view is up.
    pub fn start(&mut self, now: Instant) {
        self.initial_load_at = Some(now + self.initial_load_delay);
        self.report("ready, loading initial view");
    }

    pub fn on_signal(&mut self, signal: ViewSignal, now: Instant) -> Option<BatchReport> {
        if !self.tracker.admit(signal, now) {
            return None;
        }
        let view = self.viewpoint.view_state();
        tracing::debug!(
            ?signal,
            lon = view.lon,
            lat = view.lat,
            height_m = view.height_m,
            "Viewpoint changed"
        );
        self.load_now(now)
    }

    /// Runs one batch around the current viewpoint, bypassing the throttle.
    pub fn load_now(&mut self, now: Instant) -> Option<BatchReport> {
        let view = self.viewpoint.view_state();
        let report = self
            .loader
            .load_around(view, self.timeline.current(), now)?;
        self.report(&format!(
            "LOD level {}, {} new tiles",
            report.level.index, report.requested
        ));
        Some(report)
    }

    pub fn step_time(&mut self, months: i32, now: Instant) -> TimeKey {
        let key = self.timeline.step(months, now);
        self.on_time_changed(key);
        key
    }

    pub fn set_time(&mut self, input: &str, now: Instant) -> SeatileResult<TimeKey> {
        let key = self.timeline.set_explicit(input, now)?;
        self.on_time_changed(key);
        Ok(key)
    }

    pub fn set_backend(&mut self, backend: BackendConfig) {
        self.loader.set_backend(backend);
    }

    /// Fires due timers: the initial load and the reload after a time change.
    pub fn tick(&mut self, now: Instant) -> Vec<BatchReport> {
        let mut reports = Vec::new();
        if self.initial_load_at.is_some_and(|at| now >= at) {
            self.initial_load_at = None;
            reports.extend(self.load_now(now));
        }
        for _ in 0..self.timeline.take_due_reloads(now) {
            reports.extend(self.load_now(now));
        }
        reports
    }

    /// Applies every completion that has arrived so far. Returns how many
    /// were processed.
    pub fn drain_fetches(&mut self) -> usize {
        let mut processed = 0;
        loop {
            let outcome = match self.fetch_results.try_recv() {
                Ok(outcome) => outcome,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            };
            processed += 1;
            let key = outcome.key;
            match self.loader.handle_fetch_outcome(outcome) {
                FetchDisposition::Applied => self.report(&format!("tile {key} loaded")),
                FetchDisposition::Failed => self.report(&format!("tile {key} failed to load")),
                FetchDisposition::Stale => {}
            }
        }
        processed
    }

    /// Releases every renderable and hands the surface back.
    pub fn dispose(self) -> S {
        let Self { loader, .. } = self;
        let surface = loader.into_surface();
        tracing::debug!("Tile session disposed");
        surface
    }

    pub fn cache(&self) -> &TileCache<S::Handle> {
        self.loader.cache()
    }

    pub fn loader(&self) -> &TileLoader<S, F> {
        &self.loader
    }

    pub fn stats(&self) -> &LoaderStats {
        self.loader.stats()
    }

    pub fn time(&self) -> TimeKey {
        self.timeline.current()
    }

    pub fn status_line(&self) -> &str {
        self.status.line()
    }

    pub fn viewpoint(&self) -> &V {
        &self.viewpoint
    }

    pub fn viewpoint_mut(&mut self) -> &mut V {
        &mut self.viewpoint
    }

    fn on_time_changed(&mut self, key: TimeKey) {
        let removed = self.loader.clear_all();
        tracing::info!(time = %key, removed, "Time axis changed");
        self.report(&format!(
            "time changed to {}, cleared tiles, reloading",
            key.display()
        ));
    }

    fn report(&mut self, message: &str) {
        let cache_len = self.loader.cache().len();
        self.status.report(message, cache_len, self.loader.stats());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeSurface, RecordingFetcher};
    use crate::viewport::ViewState;

    type Session = TileSession<FakeSurface, RecordingFetcher, ViewState>;

    fn session_at(view: ViewState, range: u32) -> Session {
        let (fetcher, results) = RecordingFetcher::new();
        let config = LoaderConfig {
            range,
            ..LoaderConfig::default()
        };
        TileSession::new(
            &config,
            BackendConfig::default(),
            FakeSurface::default(),
            fetcher,
            results,
            view,
        )
    }

    fn beijing() -> ViewState {
        ViewState {
            lon: 116.4,
            lat: 39.9,
            height_m: 10_000_000.0,
        }
    }

    #[test]
    fn initial_load_waits_for_delay() {
        let t0 = Instant::now();
        let mut session = session_at(beijing(), 1);
        session.start(t0);
        assert!(session.tick(t0 + Duration::from_millis(499)).is_empty());
        let reports = session.tick(t0 + Duration::from_millis(500));
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].level.index, 3);
        assert!(session.tick(t0 + Duration::from_secs(2)).is_empty());
        assert!(!session.cache().is_empty());
    }

    #[test]
    fn settled_then_moving_runs_one_batch() {
        let t0 = Instant::now();
        let mut session = session_at(beijing(), 1);
        let first = session.on_signal(ViewSignal::Settled, t0);
        let second = session.on_signal(ViewSignal::Moving, t0 + Duration::from_millis(200));
        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(session.stats().batches, 1);
    }

    #[test]
    fn batch_leaves_only_current_level() {
        let t0 = Instant::now();
        let mut session = session_at(beijing(), 1);
        session.on_signal(ViewSignal::Settled, t0).unwrap();
        session.viewpoint_mut().height_m = 700_000.0;
        let report = session
            .on_signal(ViewSignal::Settled, t0 + Duration::from_millis(400))
            .unwrap();
        assert_eq!(report.level.index, 6);
        assert!(session.cache().records().all(|record| record.level() == 6));
        assert!(session.status_line().starts_with("LOD level 6, 9 new tiles"));
    }

    #[test]
    fn time_change_clears_then_reloads_with_new_time() {
        let t0 = Instant::now();
        let mut session = session_at(beijing(), 1);
        session.on_signal(ViewSignal::Settled, t0).unwrap();
        assert!(!session.cache().is_empty());

        let changed_at = t0 + Duration::from_secs(1);
        session.set_time("202403", changed_at).unwrap();
        assert!(session.cache().is_empty());
        assert_eq!(session.loader().surface().live_count(), 0);
        assert!(session.status_line().starts_with("time changed to 2024-03"));

        let before = session.loader().fetcher().requests().len();
        assert!(session.tick(changed_at + Duration::from_millis(50)).is_empty());
        let reports = session.tick(changed_at + Duration::from_millis(100));
        assert_eq!(reports.len(), 1);
        let requests = &session.loader().fetcher().requests()[before..];
        assert_eq!(requests.len(), 9);
        assert!(
            requests
                .iter()
                .all(|request| request.url.contains("year=2024&month=3&"))
        );
    }

    #[test]
    fn quick_time_changes_each_reload() {
        let t0 = Instant::now();
        let mut session = session_at(beijing(), 1);
        session.step_time(1, t0);
        session.step_time(1, t0 + Duration::from_millis(40));

        let first = session.tick(t0 + Duration::from_millis(100));
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].requested, 9);
        let second = session.tick(t0 + Duration::from_millis(140));
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].requested, 0);
        assert_eq!(session.stats().batches, 2);
        assert!(
            session
                .loader()
                .fetcher()
                .requests()
                .iter()
                .all(|request| request.url.contains("year=2024&month=3&"))
        );
    }

    #[test]
    fn invalid_time_input_keeps_state() {
        let t0 = Instant::now();
        let mut session = session_at(beijing(), 1);
        session.on_signal(ViewSignal::Settled, t0).unwrap();
        let cached = session.cache().len();

        let err = session.set_time("2024/03", t0).unwrap_err();
        assert_eq!(err.code, seatile_core::ErrorCode::InvalidInput);
        assert_eq!(session.cache().len(), cached);
        assert_eq!(session.time().to_string(), "202401");
        assert!(session.tick(t0 + Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn step_time_rolls_over_and_reloads() {
        let t0 = Instant::now();
        let mut session = session_at(beijing(), 0);
        assert_eq!(session.step_time(-1, t0).to_string(), "202312");
        let reports = session.tick(t0 + Duration::from_millis(100));
        assert_eq!(reports.len(), 1);
        let url = &session.loader().fetcher().requests()[0].url;
        assert!(url.contains("year=2023&month=12&"));
    }

    #[test]
    fn drain_applies_live_and_ignores_stale_completions() {
        let t0 = Instant::now();
        let mut session = session_at(beijing(), 1);
        session.on_signal(ViewSignal::Settled, t0).unwrap();
        let failed = session.loader().fetcher().requests()[0].clone();
        session.loader().fetcher().fail(&failed, 500);
        assert_eq!(session.drain_fetches(), 1);
        assert!(session.status_line().contains("failed to load"));
        assert!(session.cache().has(&failed.key));

        session.step_time(1, t0 + Duration::from_secs(1));
        session.loader().fetcher().complete_all();
        assert_eq!(session.drain_fetches(), 9);
        assert_eq!(session.loader().surface().textured_count(), 0);
        assert_eq!(session.stats().fetch_failures, 1);
    }

    #[test]
    fn completions_texture_displayed_tiles() {
        let t0 = Instant::now();
        let mut session = session_at(beijing(), 1);
        session.on_signal(ViewSignal::Settled, t0).unwrap();
        session.loader().fetcher().complete_all();
        assert_eq!(session.drain_fetches(), 9);
        assert_eq!(session.loader().surface().textured_count(), 9);
        assert_eq!(session.stats().fetch_successes, 9);
        assert_eq!(session.cache().len(), 9);
        let status = session.status_line();
        assert!(status.starts_with("tile 3_"), "{status}");
        assert!(status.contains(" loaded | tiles loaded: 9 |"), "{status}");
    }

    #[test]
    fn stale_completion_leaves_status_alone() {
        let t0 = Instant::now();
        let mut session = session_at(beijing(), 0);
        session.on_signal(ViewSignal::Settled, t0).unwrap();
        session.step_time(1, t0 + Duration::from_secs(1));
        let before = session.status_line().to_string();
        session.loader().fetcher().complete_all();
        assert_eq!(session.drain_fetches(), 1);
        assert_eq!(session.status_line(), before);
    }

    #[test]
    fn huge_time_steps_stop_at_last_month() {
        let t0 = Instant::now();
        let mut session = session_at(beijing(), 0);
        assert_eq!(session.step_time(i32::MAX, t0).to_string(), "210012");
        session.tick(t0 + Duration::from_millis(100));
        let url = &session.loader().fetcher().requests()[0].url;
        assert!(url.contains("year=2100&month=12&"));
    }

    #[test]
    fn backend_changes_apply_to_later_requests() {
        let t0 = Instant::now();
        let mut session = session_at(beijing(), 0);
        session.set_backend(BackendConfig {
            base_url: "http://10.0.0.5:9000/tiles".to_string(),
            depth_m: 100.0,
            ..BackendConfig::default()
        });
        session.on_signal(ViewSignal::Settled, t0).unwrap();
        let url = &session.loader().fetcher().requests()[0].url;
        assert!(url.starts_with("http://10.0.0.5:9000/tiles?"));
        assert!(url.contains("depth=100&"));
    }

    #[test]
    fn dispose_releases_all_renderables() {
        let t0 = Instant::now();
        let mut session = session_at(beijing(), 2);
        session.on_signal(ViewSignal::Settled, t0).unwrap();
        let added = session.loader().surface().added.len();
        assert!(added > 0);
        let surface = session.dispose();
        assert_eq!(surface.live_count(), 0);
        assert_eq!(surface.removed.len(), added);
    }
}
