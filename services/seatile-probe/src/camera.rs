use std::time::{Duration, Instant};

use seatile_core::{SeatileError, SeatileResult};
use seatile_tiles::{ViewState, Viewpoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraEvent {
    Moving,
    /// Reached the waypoint with this index.
    Arrived(usize),
    Finished,
}

/// Camera that flies straight legs between waypoints, one leg per
/// `leg_duration`.
#[derive(Debug, Clone)]
pub struct ScriptedCamera {
    waypoints: Vec<ViewState>,
    leg_duration: Duration,
    target: usize,
    leg_started: Option<Instant>,
    view: ViewState,
}

impl ScriptedCamera {
    pub fn new(waypoints: Vec<ViewState>, leg_duration: Duration) -> SeatileResult<Self> {
        let Some(first) = waypoints.first().copied() else {
            return Err(SeatileError::invalid_input("camera path has no waypoints"));
        };
        Ok(Self {
            waypoints,
            leg_duration,
            target: 1,
            leg_started: None,
            view: first,
        })
    }

    pub fn begin(&mut self, now: Instant) {
        self.leg_started = Some(now);
    }

    pub fn is_finished(&self) -> bool {
        self.target >= self.waypoints.len()
    }

    pub fn advance(&mut self, now: Instant) -> CameraEvent {
        if self.is_finished() {
            return CameraEvent::Finished;
        }
        let started = *self.leg_started.get_or_insert(now);
        let progress = if self.leg_duration.is_zero() {
            1.0
        } else {
            (now.saturating_duration_since(started).as_secs_f64()
                / self.leg_duration.as_secs_f64())
            .min(1.0)
        };
        let from = self.waypoints[self.target - 1];
        let to = self.waypoints[self.target];
        self.view = lerp(from, to, progress);

        if progress < 1.0 {
            return CameraEvent::Moving;
        }
        let arrived = self.target;
        self.target += 1;
        self.leg_started = Some(now);
        CameraEvent::Arrived(arrived)
    }
}

impl Viewpoint for ScriptedCamera {
    fn view_state(&self) -> ViewState {
        self.view
    }
}

fn lerp(from: ViewState, to: ViewState, t: f64) -> ViewState {
    ViewState {
        lon: from.lon + (to.lon - from.lon) * t,
        lat: from.lat + (to.lat - from.lat) * t,
        height_m: from.height_m + (to.height_m - from.height_m) * t,
    }
}

/// Parses `lon,lat,height;lon,lat,height;...`. Empty segments are ignored.
pub fn parse_path(input: &str) -> SeatileResult<Vec<ViewState>> {
    let mut waypoints = Vec::new();
    for segment in input.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        let values = segment
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| {
                SeatileError::invalid_input(format!("bad waypoint {segment:?}: {err}"))
            })?;
        let [lon, lat, height_m] = values[..] else {
            return Err(SeatileError::invalid_input(format!(
                "waypoint {segment:?} needs lon,lat,height"
            )));
        };
        if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) || height_m < 0.0 {
            return Err(SeatileError::invalid_input(format!(
                "waypoint {segment:?} is out of range"
            )));
        }
        waypoints.push(ViewState { lon, lat, height_m });
    }
    if waypoints.is_empty() {
        return Err(SeatileError::invalid_input("camera path has no waypoints"));
    }
    Ok(waypoints)
}

/// Parses month offsets such as `1,-2,12`.
pub fn parse_time_steps(input: &str) -> SeatileResult<Vec<i32>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|step| {
            step.parse::<i32>().map_err(|err| {
                SeatileError::invalid_input(format!("bad time step {step:?}: {err}"))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(lon: f64, lat: f64, height_m: f64) -> ViewState {
        ViewState { lon, lat, height_m }
    }

    #[test]
    fn parses_waypoints() {
        let path = parse_path(" 116.4,39.9,20000000 ; 121.5, 31.2, 800000;").unwrap();
        assert_eq!(
            path,
            vec![view(116.4, 39.9, 20_000_000.0), view(121.5, 31.2, 800_000.0)]
        );
    }

    #[test]
    fn rejects_malformed_waypoints() {
        assert!(parse_path("").is_err());
        assert!(parse_path("1,2").is_err());
        assert!(parse_path("1,2,3,4").is_err());
        assert!(parse_path("east,2,3").is_err());
        assert!(parse_path("0,95,1000").is_err());
        assert!(parse_path("0,0,-1").is_err());
    }

    #[test]
    fn parses_time_steps() {
        assert_eq!(parse_time_steps("1, -2,,12").unwrap(), vec![1, -2, 12]);
        assert!(parse_time_steps("").unwrap().is_empty());
        assert!(parse_time_steps("1,x").is_err());
    }

    #[test]
    fn flies_between_waypoints() {
        let t0 = Instant::now();
        let leg = Duration::from_secs(2);
        let mut camera = ScriptedCamera::new(
            vec![view(0.0, 0.0, 10_000_000.0), view(10.0, 20.0, 2_000_000.0)],
            leg,
        )
        .unwrap();
        camera.begin(t0);

        assert_eq!(camera.advance(t0 + Duration::from_secs(1)), CameraEvent::Moving);
        assert_eq!(camera.view_state(), view(5.0, 10.0, 6_000_000.0));

        assert_eq!(camera.advance(t0 + leg), CameraEvent::Arrived(1));
        assert_eq!(camera.view_state(), view(10.0, 20.0, 2_000_000.0));
        assert!(camera.is_finished());
        assert_eq!(camera.advance(t0 + leg * 2), CameraEvent::Finished);
    }

    #[test]
    fn late_tick_clamps_to_waypoint() {
        let t0 = Instant::now();
        let mut camera = ScriptedCamera::new(
            vec![view(0.0, 0.0, 1.0), view(4.0, 0.0, 1.0), view(8.0, 0.0, 1.0)],
            Duration::from_millis(100),
        )
        .unwrap();
        camera.begin(t0);
        assert_eq!(camera.advance(t0 + Duration::from_secs(5)), CameraEvent::Arrived(1));
        assert_eq!(camera.view_state().lon, 4.0);
        assert_eq!(camera.advance(t0 + Duration::from_secs(5)), CameraEvent::Moving);
        assert_eq!(camera.view_state().lon, 4.0);
    }

    #[test]
    fn single_waypoint_path_is_already_finished() {
        let mut camera =
            ScriptedCamera::new(vec![view(1.0, 2.0, 3.0)], Duration::from_secs(1)).unwrap();
        assert!(camera.is_finished());
        assert_eq!(camera.advance(Instant::now()), CameraEvent::Finished);
        assert!(ScriptedCamera::new(Vec::new(), Duration::from_secs(1)).is_err());
    }
}
