//! Time source
//!
//! Every time-dependent decision in the core (token expiry, timestamps on
//! writes, the expiry sweep) reads the time from an injected
//! [`mockable::Clock`]. Production code uses [`DefaultClock`]; tests drive a
//! [`ManualClock`] forward explicitly.

use chrono::{DateTime, Duration, Local, Utc};
use std::sync::{Arc, Mutex};

pub use mockable::{Clock, DefaultClock};

/// Clock handle shared by the services
pub type SharedClock = Arc<dyn Clock + Send + Sync>;

/// Returns the system clock as a [`SharedClock`]
pub fn system_clock() -> SharedClock {
    Arc::new(DefaultClock)
}

/// Clock that only moves when told to
///
/// # Example
///
/// ```
/// use dothe2_shared::clock::{Clock, ManualClock};
/// use chrono::Duration;
///
/// let clock = ManualClock::starting_now();
/// let before = clock.utc();
/// clock.advance(Duration::minutes(16));
/// assert_eq!(clock.utc() - before, Duration::minutes(16));
/// ```
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Creates a clock frozen at `now`
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Creates a clock frozen at the current system time
    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }

    /// Moves the clock forward (or backward, for negative durations)
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += by;
    }

    /// Jumps to an absolute instant
    pub fn set(&self, to: DateTime<Utc>) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now = to;
    }
}

impl Clock for ManualClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
