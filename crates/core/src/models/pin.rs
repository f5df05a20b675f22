use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Persisted failed-attempt counter for the local PIN lock.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PinAttemptState {
    pub failed_attempts: u32,
    pub lockout_until: Option<DateTime<Utc>>,
}

/// Throttle tier derived from the failed-attempt count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThrottleState {
    /// Fewer than 3 failures.
    Normal,
    /// 3 or 4 failures: a growing delay before the next entry.
    Delayed,
    /// 5 to 9 failures: 30 second lockout.
    ShortLockout,
    /// 10 or more failures: 5 minute lockout.
    ExtendedLockout,
}

/// Outcome of submitting a PIN to the guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinOutcome {
    /// PIN matched; attempt state was reset.
    Unlocked,
    /// PIN did not match. `delay` is the wait imposed before the next entry
    /// (zero when a lockout applies or fewer than 3 failures).
    Rejected {
        attempts: u32,
        delay: Duration,
        lockout: Option<Duration>,
    },
    /// Input refused without comparing: a lockout is running.
    LockedOut { remaining: Duration },
    /// Input refused without comparing: the post-failure delay is running.
    Throttled { remaining: Duration },
}

/// Salted Argon2id hash of the unlock PIN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinSecret {
    pub salt: [u8; 16],
    pub hash: [u8; 32],
}
