mod camera;
mod config;
mod surface;

use std::time::Instant;

use seatile_config::{BackendConfig, LoaderConfig, ServiceConfig};
use seatile_observability::{init, log_startup};
use seatile_tiles::{describe_metrics, HttpTileFetcher, TileSession, ViewSignal};
use tokio::time::MissedTickBehavior;

use crate::camera::{CameraEvent, ScriptedCamera};
use crate::config::ProbeConfig;
use crate::surface::HeadlessSurface;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env("seatile-probe");
    let handle = init(&config);
    log_startup(&handle);
    if handle.metrics_enabled() {
        describe_metrics();
    }

    let backend = BackendConfig::from_env();
    let loader_config = LoaderConfig::from_env();
    let probe = ProbeConfig::from_env()?;
    tracing::info!(
        backend = %backend.base_url,
        time = %backend.initial_time,
        waypoints = probe.waypoints.len(),
        levels = loader_config.lod_table.levels().len(),
        "Probe configured"
    );

    let camera = ScriptedCamera::new(probe.waypoints.clone(), probe.leg_duration())?;
    let (fetcher, results) =
        HttpTileFetcher::new(loader_config.fetch_workers, loader_config.fetch_timeout());
    let mut session = TileSession::new(
        &loader_config,
        backend,
        HeadlessSurface::default(),
        fetcher,
        results,
        camera,
    );

    let started = Instant::now();
    session.start(started);
    session.viewpoint_mut().begin(started);

    let mut time_steps = probe.time_steps.iter().copied();
    let mut finished_at: Option<Instant> = None;
    let mut final_view_loaded = false;
    let mut ticker = tokio::time::interval(probe.tick());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(err) = result {
                    tracing::error!("failed to install ctrl-c handler: {}", err);
                }
                tracing::info!("Interrupted, shutting down");
                break;
            }
            _ = ticker.tick() => {
                let now = Instant::now();
                session.drain_fetches();

                match session.viewpoint_mut().advance(now) {
                    CameraEvent::Moving => {
                        session.on_signal(ViewSignal::Moving, now);
                    }
                    CameraEvent::Arrived(index) => {
                        tracing::info!(waypoint = index, "Camera arrived");
                        session.on_signal(ViewSignal::Settled, now);
                        if let Some(months) = time_steps.next() {
                            session.step_time(months, now);
                        }
                    }
                    CameraEvent::Finished => {
                        let done = *finished_at.get_or_insert(now);
                        if !final_view_loaded {
                            final_view_loaded =
                                session.on_signal(ViewSignal::Settled, now).is_some();
                        }
                        if now.saturating_duration_since(done) >= probe.linger() {
                            tracing::info!("Camera path complete");
                            break;
                        }
                    }
                }

                session.tick(now);
            }
        }
    }

    session.drain_fetches();
    let stats = *session.stats();
    let status = session.status_line().to_string();
    let surface = session.dispose();
    tracing::info!(
        batches = stats.batches,
        dropped_batches = stats.dropped_batches,
        total_requested = stats.total_requested,
        fetch_successes = stats.fetch_successes,
        fetch_failures = stats.fetch_failures,
        textured = surface.textured(),
        texture_bytes = surface.texture_bytes(),
        live = surface.live_count(),
        status = %status,
        "Probe finished"
    );

    Ok(())
}
