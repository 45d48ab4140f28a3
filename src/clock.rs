use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How often a blocking wait looks at its abort handle
const ABORT_POLL: Duration = Duration::from_millis(10);

/// Lets another thread stop a running plan
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst)
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn reset(&self) {
        self.0.store(false, Ordering::SeqCst)
    }
}

/// Where the sequencer waits for motions to finish.
///
/// Motion is open loop: the sequencer computes how long a move takes and
/// blocks that long, so tests swap in a clock that doesn't really sleep
pub trait Clock {
    fn sleep(&mut self, duration: Duration);

    /// Waits like [`Clock::sleep`], but returns as soon as `abort` fires.
    /// False if the wait was cut short.
    ///
    /// Clocks that can't be woken up only look at `abort` before and after
    fn sleep_unless(&mut self, duration: Duration, abort: &AbortHandle) -> bool {
        if abort.is_triggered() {
            return false;
        }
        self.sleep(duration);
        !abort.is_triggered()
    }
}

/// Blocks the calling thread
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&mut self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration)
        }
    }

    fn sleep_unless(&mut self, duration: Duration, abort: &AbortHandle) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if abort.is_triggered() {
                return false;
            }
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return true;
            }
            std::thread::sleep(left.min(ABORT_POLL));
        }
    }
}

/// Only adds up the time it was asked to wait
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    elapsed: Duration,
    waits: Vec<Duration>,
}

impl ManualClock {
    pub fn new() -> ManualClock {
        ManualClock::default()
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn waits(&self) -> &[Duration] {
        &self.waits
    }
}

impl Clock for ManualClock {
    fn sleep(&mut self, duration: Duration) {
        self.elapsed += duration;
        self.waits.push(duration);
    }
}

impl<C: Clock + ?Sized> Clock for &mut C {
    fn sleep(&mut self, duration: Duration) {
        (**self).sleep(duration)
    }

    fn sleep_unless(&mut self, duration: Duration, abort: &AbortHandle) -> bool {
        (**self).sleep_unless(duration, abort)
    }
}
