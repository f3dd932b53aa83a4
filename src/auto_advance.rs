//! Deadline-based page auto-advance
//!
//! The timer has no thread of its own. The host event loop calls
//! [`AutoAdvance::poll`] with the current instant, so cancelling is a plain
//! state change and a cancelled timer can never fire afterwards.

use std::time::{Duration, Instant};

use crate::view_state::clamp_scroll_speed;

#[derive(Debug)]
pub struct AutoAdvance {
    base_interval: Duration,
    deadline: Option<Instant>,
    interval: Duration,
}

impl AutoAdvance {
    /// `base_interval` is the period at scroll speed 1.0
    pub fn new(base_interval: Duration) -> Self {
        Self {
            base_interval,
            deadline: None,
            interval: base_interval,
        }
    }

    /// Period between advances at `scroll_speed`
    pub fn interval_for(&self, scroll_speed: f32) -> Duration {
        self.base_interval
            .div_f64(f64::from(clamp_scroll_speed(scroll_speed)))
    }

    /// Arm (or re-arm) the timer; the first tick is one full period away
    pub fn start(&mut self, now: Instant, scroll_speed: f32) {
        self.interval = self.interval_for(scroll_speed);
        self.deadline = Some(now + self.interval);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns true once per elapsed period.
    ///
    /// A host that polls late gets a single tick, not a burst: the next
    /// deadline is scheduled from `now` when the regular one already passed.
    pub fn poll(&mut self, now: Instant) -> bool {
        let Some(deadline) = self.deadline else {
            return false;
        };
        if now < deadline {
            return false;
        }
        let next = deadline + self.interval;
        self.deadline = Some(if next > now { next } else { now + self.interval });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: Duration = Duration::from_millis(3000);

    #[test]
    fn interval_scales_inversely_with_speed() {
        let timer = AutoAdvance::new(BASE);
        assert_eq!(timer.interval_for(1.0), Duration::from_millis(3000));
        assert_eq!(timer.interval_for(2.0), Duration::from_millis(1500));
        assert_eq!(timer.interval_for(0.5), Duration::from_millis(6000));
        // Speeds outside the allowed range are clamped first
        assert_eq!(timer.interval_for(30.0), Duration::from_millis(1000));
    }

    #[test]
    fn fires_once_per_period() {
        let start = Instant::now();
        let mut timer = AutoAdvance::new(BASE);
        timer.start(start, 1.0);

        assert!(!timer.poll(start + Duration::from_millis(2999)));
        assert!(timer.poll(start + Duration::from_millis(3000)));
        assert!(!timer.poll(start + Duration::from_millis(3001)));
        assert!(timer.poll(start + Duration::from_millis(6000)));
    }

    #[test]
    fn late_poll_does_not_burst() {
        let start = Instant::now();
        let mut timer = AutoAdvance::new(BASE);
        timer.start(start, 1.0);

        let late = start + Duration::from_millis(20_000);
        assert!(timer.poll(late));
        assert!(!timer.poll(late));
        assert_eq!(timer.deadline(), Some(late + BASE));
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let start = Instant::now();
        let mut timer = AutoAdvance::new(BASE);
        timer.start(start, 1.0);
        timer.cancel();

        assert!(!timer.is_armed());
        assert!(!timer.poll(start + Duration::from_secs(60)));
    }

    #[test]
    fn restart_uses_new_speed() {
        let start = Instant::now();
        let mut timer = AutoAdvance::new(BASE);
        timer.start(start, 1.0);
        timer.start(start + Duration::from_millis(1000), 2.0);

        assert!(!timer.poll(start + Duration::from_millis(2400)));
        assert!(timer.poll(start + Duration::from_millis(2500)));
    }
}
