use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

/// The single simulated clock. The engine's main loop advances it one unit
/// per configured wall tick; every other thread reads snapshots without
/// coordination.
#[derive(Debug, Default)]
pub struct SimClock {
    current_time: AtomicI64,
}

impl SimClock {
    pub fn new() -> Self {
        SimClock { current_time: AtomicI64::new(0) }
    }

    pub fn advance(&self, delta: i64) {
        self.current_time.fetch_add(delta, Ordering::SeqCst);
    }

    pub fn now(&self) -> i64 {
        self.current_time.load(Ordering::SeqCst)
    }

    pub fn set(&self, time: i64) {
        self.current_time.store(time, Ordering::SeqCst);
    }

    /// Sleeps until the simulated clock has advanced `units` past the call
    /// time, polling at `poll_ms`. Returns false if `running` was cleared
    /// before the deadline, so callers can treat it as a shutdown checkpoint.
    pub fn sleep_sim(&self, units: i64, poll_ms: u64, running: &AtomicBool) -> bool {
        let deadline = self.now() + units;
        while self.now() < deadline {
            if !running.load(Ordering::SeqCst) {
                return false;
            }
            std::thread::sleep(Duration::from_millis(poll_ms.max(1)));
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_and_set() {
        let clock = SimClock::new();
        assert_eq!(clock.now(), 0);
        clock.advance(5);
        clock.advance(2);
        assert_eq!(clock.now(), 7);
        clock.set(100);
        assert_eq!(clock.now(), 100);
    }

    #[test]
    fn sleep_sim_returns_false_on_shutdown() {
        let clock = SimClock::new();
        let running = AtomicBool::new(false);
        assert!(!clock.sleep_sim(10, 1, &running));
    }

    #[test]
    fn sleep_sim_wakes_once_clock_passes_deadline() {
        use std::sync::Arc;

        let clock = Arc::new(SimClock::new());
        let running = Arc::new(AtomicBool::new(true));

        let ticker = {
            let clock = Arc::clone(&clock);
            std::thread::spawn(move || {
                for _ in 0..20 {
                    clock.advance(1);
                    std::thread::sleep(Duration::from_millis(1));
                }
            })
        };

        assert!(clock.sleep_sim(10, 1, &running));
        assert!(clock.now() >= 10);
        ticker.join().unwrap();
    }
}
