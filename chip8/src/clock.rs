//! Host pacing clock.
use std::{
    thread,
    time::{Duration, Instant},
};

use crate::conf::Hz;

/// Timer to synchronize a host loop with the software clock of the virtual CPU.
///
/// It is designed to work with the yielding cooperative pattern
/// of the interpreter loop. When the VM yields control back to the
/// caller, time elapses until it is resumed. Once the interpreter
/// is resumed, the elapsed time is taken into account when determining
/// the next cycle.
#[derive(Debug)]
pub struct Clock {
    start: Instant,
    interval: Duration,
}

impl Clock {
    /// Creates a new clock ticking at the given frequency, with the current time as internal state.
    pub fn new(frequency: Hz) -> Self {
        Self {
            start: Instant::now(),
            interval: frequency.into(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Set the clock state back to zero.
    pub fn reset(&mut self) {
        self.start = Instant::now()
    }

    /// Check, without blocking, whether a full cycle has elapsed.
    ///
    /// When it has, the clock advances by exactly one interval so that
    /// a late check does not shift the cadence of later cycles.
    pub fn tick(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.start) >= self.interval {
            self.start += self.interval;

            // Fell far behind, likely paused. Resume from now rather than
            // replaying every missed cycle.
            if now.duration_since(self.start) >= self.interval * 4 {
                self.start = now;
            }
            true
        } else {
            false
        }
    }

    /// Block the current thread until the next clock cycle.
    pub fn wait(&mut self) {
        loop {
            let elapsed = self.start.elapsed();
            if elapsed < self.interval {
                // Sleep does not have enough resolution, and causes
                // the clock to run at 30 FPS.
                //
                // Spinning a loop causes high CPU usage and fan madness.
                //
                // Yielding in a loop is the best alternative.
                thread::yield_now();
            } else {
                // Reset back to zero, rather than trying to catch up.
                //
                // If the VM was paused for debugging, and a large
                // amount of time has elapsed until it is resumed,
                // it should simply continue at the next cycle running
                // at its usual speed.
                self.reset();
                return;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_zero_frequency_always_ticks() {
        let mut clock = Clock::new(Hz(0));
        assert!(clock.tick());
        assert!(clock.tick());
        clock.wait();
    }

    #[test]
    fn test_tick_waits_for_interval() {
        let mut clock = Clock::new(Hz(1));
        assert!(!clock.tick());
        assert_eq!(clock.interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_wait_blocks_one_interval() {
        let mut clock = Clock::new(Hz(200));
        let start = Instant::now();
        clock.wait();
        assert!(start.elapsed() >= Duration::from_millis(4));
    }
}
