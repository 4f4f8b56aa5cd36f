use std::time::{Duration, Instant};

/// Longest wait `poll_until` will honor.
pub const MAX_POLL_TIMEOUT: Duration = Duration::from_secs(60);

/// Time source for bounded waits; tests substitute a manual clock.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Evaluates `predicate` immediately and then every `interval` until it holds or
/// `timeout` has elapsed. The last sleep is shortened so the final check lands on the
/// deadline. `timeout` is capped at [`MAX_POLL_TIMEOUT`].
pub fn poll_until<C, F>(clock: &C, interval: Duration, timeout: Duration, mut predicate: F) -> bool
where
    C: Clock + ?Sized,
    F: FnMut() -> bool,
{
    let start = clock.now();
    let deadline = start
        .checked_add(timeout.min(MAX_POLL_TIMEOUT))
        .unwrap_or(start);
    let interval = interval.max(Duration::from_millis(1));
    loop {
        if predicate() {
            return true;
        }
        let now = clock.now();
        if now >= deadline {
            return false;
        }
        clock.sleep(interval.min(deadline - now));
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::cell::Cell;
    use std::time::{Duration, Instant};

    use super::Clock;

    /// Clock that only advances when slept on.
    pub struct ManualClock {
        origin: Instant,
        offset: Cell<Duration>,
        sleeps: Cell<usize>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                offset: Cell::new(Duration::ZERO),
                sleeps: Cell::new(0),
            }
        }

        pub fn elapsed(&self) -> Duration {
            self.offset.get()
        }

        pub fn sleeps(&self) -> usize {
            self.sleeps.get()
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.origin + self.offset.get()
        }

        fn sleep(&self, duration: Duration) {
            self.offset.set(self.offset.get() + duration);
            self.sleeps.set(self.sleeps.get() + 1);
        }
    }
}
