use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current time in whole seconds since the Unix epoch
pub trait Clock {
    fn now(&self) -> u64;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Current time, or `None` when the system clock reads before the epoch
    pub fn checked_now(&self) -> Option<u64> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .ok()
    }
}

impl Clock for SystemClock {
    /// Falls back to 0 when the system clock reads before the epoch; callers
    /// that care can detect this with [`SystemClock::checked_now`].
    fn now(&self) -> u64 {
        self.checked_now().unwrap_or_default()
    }
}

/// Clock pinned to a single instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now(&self) -> u64 {
        self.0
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> u64 {
        (**self).now()
    }
}
