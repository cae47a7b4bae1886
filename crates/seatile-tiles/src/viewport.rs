use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Camera position sampled when a batch starts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub lon: f64,
    pub lat: f64,
    pub height_m: f64,
}

pub trait Viewpoint {
    fn view_state(&self) -> ViewState;
}

impl Viewpoint for ViewState {
    fn view_state(&self) -> ViewState {
        *self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewSignal {
    /// Camera stopped after a gesture.
    Settled,
    /// Camera is still changing.
    Moving,
}

/// Throttles both signal kinds against one shared last-trigger timestamp.
#[derive(Debug, Clone)]
pub struct ViewportTracker {
    settled_window: Duration,
    moving_window: Duration,
    last_trigger: Option<Instant>,
}

impl ViewportTracker {
    pub fn new(settled_window: Duration, moving_window: Duration) -> Self {
        Self {
            settled_window,
            moving_window,
            last_trigger: None,
        }
    }

    /// Returns `true` when `signal` should start a batch, recording `now` as
    /// the last trigger.
    pub fn admit(&mut self, signal: ViewSignal, now: Instant) -> bool {
        let window = match signal {
            ViewSignal::Settled => self.settled_window,
            ViewSignal::Moving => self.moving_window,
        };
        if let Some(last) = self.last_trigger {
            if now.saturating_duration_since(last) < window {
                return false;
            }
        }
        self.last_trigger = Some(now);
        true
    }

    pub fn last_trigger(&self) -> Option<Instant> {
        self.last_trigger
    }
}
