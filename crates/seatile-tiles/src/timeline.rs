use seatile_core::{SeatileResult, TimeKey};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Active month on the data time axis plus the delayed reloads that follow
/// it. Every change schedules its own reload.
#[derive(Debug, Clone)]
pub struct TimeAxisController {
    current: TimeKey,
    reload_delay: Duration,
    reloads: VecDeque<Instant>,
}

impl TimeAxisController {
    pub fn new(initial: TimeKey, reload_delay: Duration) -> Self {
        Self {
            current: initial,
            reload_delay,
            reloads: VecDeque::new(),
        }
    }

    pub fn current(&self) -> TimeKey {
        self.current
    }

    pub fn step(&mut self, months: i32, now: Instant) -> TimeKey {
        self.current = self.current.step(months);
        self.schedule_reload(now);
        self.current
    }

    /// Applies user input. Invalid input leaves the axis and any pending
    /// reloads untouched.
    pub fn set_explicit(&mut self, input: &str, now: Instant) -> SeatileResult<TimeKey> {
        let key = TimeKey::parse(input)?;
        self.current = key;
        self.schedule_reload(now);
        Ok(key)
    }

    /// Earliest scheduled reload.
    pub fn pending_reload(&self) -> Option<Instant> {
        self.reloads.front().copied()
    }

    pub fn pending_reloads(&self) -> usize {
        self.reloads.len()
    }

    /// Consumes every reload whose deadline has passed and returns how many.
    pub fn take_due_reloads(&mut self, now: Instant) -> usize {
        let mut due = 0;
        while self.reloads.front().is_some_and(|at| now >= *at) {
            self.reloads.pop_front();
            due += 1;
        }
        due
    }

    fn schedule_reload(&mut self, now: Instant) {
        self.reloads.push_back(now + self.reload_delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> TimeAxisController {
        TimeAxisController::new(TimeKey::parse("202401").unwrap(), Duration::from_millis(100))
    }

    #[test]
    fn step_schedules_reload() {
        let now = Instant::now();
        let mut axis = controller();
        assert_eq!(axis.step(-1, now).to_string(), "202312");
        assert_eq!(axis.pending_reload(), Some(now + Duration::from_millis(100)));
        assert_eq!(axis.take_due_reloads(now + Duration::from_millis(99)), 0);
        assert_eq!(axis.take_due_reloads(now + Duration::from_millis(100)), 1);
        assert_eq!(axis.take_due_reloads(now + Duration::from_millis(500)), 0);
    }

    #[test]
    fn invalid_input_changes_nothing() {
        let now = Instant::now();
        let mut axis = controller();
        assert!(axis.set_explicit("2024-3", now).is_err());
        assert!(axis.set_explicit("202413", now).is_err());
        assert_eq!(axis.current().to_string(), "202401");
        assert_eq!(axis.pending_reload(), None);
    }

    #[test]
    fn explicit_input_replaces_key() {
        let now = Instant::now();
        let mut axis = controller();
        let key = axis.set_explicit("202403", now).unwrap();
        assert_eq!((key.year(), key.month()), (2024, 3));
        assert_eq!(axis.current(), key);
        assert!(axis.pending_reload().is_some());
    }

    #[test]
    fn each_change_schedules_its_own_reload() {
        let now = Instant::now();
        let mut axis = controller();
        axis.step(1, now);
        axis.step(1, now + Duration::from_millis(60));
        assert_eq!(axis.pending_reloads(), 2);
        assert_eq!(axis.take_due_reloads(now + Duration::from_millis(120)), 1);
        assert_eq!(axis.pending_reload(), Some(now + Duration::from_millis(160)));
        assert_eq!(axis.take_due_reloads(now + Duration::from_millis(160)), 1);
        assert_eq!(axis.pending_reloads(), 0);
        assert_eq!(axis.current().to_string(), "202403");
    }

    #[test]
    fn late_tick_fires_all_due_reloads() {
        let now = Instant::now();
        let mut axis = controller();
        axis.step(-1, now);
        axis.step(-1, now + Duration::from_millis(10));
        axis.set_explicit("199901", now + Duration::from_millis(20)).unwrap();
        assert_eq!(axis.take_due_reloads(now + Duration::from_secs(1)), 3);
    }
}
