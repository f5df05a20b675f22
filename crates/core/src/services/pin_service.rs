use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex};
use subtle::ConstantTimeEq;

use crate::errors::CoreError;
use crate::models::pin::{PinAttemptState, PinOutcome, PinSecret, ThrottleState};
use crate::storage::encryption::{self, KdfParams};
use crate::storage::store::{keys, load_json, save_json, SecureStore};

pub const PIN_LENGTH: usize = 4;

/// Failures before each entry is followed by a delay.
pub const DELAY_THRESHOLD: u32 = 3;
/// Failures that trigger the 30 second lockout.
pub const SHORT_LOCKOUT_THRESHOLD: u32 = 5;
/// Failures that trigger the 5 minute lockout.
pub const EXTENDED_LOCKOUT_THRESHOLD: u32 = 10;

const SHORT_LOCKOUT_SECS: i64 = 30;
const EXTENDED_LOCKOUT_SECS: i64 = 5 * 60;
const DELAY_STEP_SECS: i64 = 2;

/// Delay imposed after the given number of failures, when no lockout applies.
pub fn delay_for(attempts: u32) -> Duration {
    if (DELAY_THRESHOLD..SHORT_LOCKOUT_THRESHOLD).contains(&attempts) {
        Duration::seconds(i64::from(attempts - 2) * DELAY_STEP_SECS)
    } else {
        Duration::zero()
    }
}

/// Lockout length triggered by reaching the given number of failures.
pub fn lockout_for(attempts: u32) -> Option<Duration> {
    if attempts >= EXTENDED_LOCKOUT_THRESHOLD {
        Some(Duration::seconds(EXTENDED_LOCKOUT_SECS))
    } else if attempts >= SHORT_LOCKOUT_THRESHOLD {
        Some(Duration::seconds(SHORT_LOCKOUT_SECS))
    } else {
        None
    }
}

pub fn throttle_state_for(attempts: u32) -> ThrottleState {
    match attempts {
        a if a >= EXTENDED_LOCKOUT_THRESHOLD => ThrottleState::ExtendedLockout,
        a if a >= SHORT_LOCKOUT_THRESHOLD => ThrottleState::ShortLockout,
        a if a >= DELAY_THRESHOLD => ThrottleState::Delayed,
        _ => ThrottleState::Normal,
    }
}

/// Exactly four ASCII digits.
pub fn validate_pin(pin: &str) -> Result<(), CoreError> {
    if pin.len() != PIN_LENGTH || !pin.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoreError::ValidationError(format!(
            "PIN must be exactly {PIN_LENGTH} digits"
        )));
    }
    Ok(())
}

/// Human-readable countdown for a running lockout, in whole seconds under
/// a minute and whole minutes (rounded down) from there.
pub fn format_lockout(remaining: Duration) -> String {
    let secs = remaining.num_seconds().max(0);
    if secs < 60 {
        return format!("Too many attempts. Try again in {secs} seconds.");
    }
    let minutes = secs / 60;
    let unit = if minutes > 1 { "minutes" } else { "minute" };
    format!("Too many attempts. Try again in {minutes} {unit}.")
}

/// Local 4-digit unlock PIN with escalating brute-force friction.
///
/// Attempt state lives in the secure store so a restart does not reset the
/// counter. The post-failure delay countdown is in memory only; lockouts
/// are persisted.
pub struct PinService {
    store: Arc<dyn SecureStore>,
    kdf: KdfParams,
    delay_until: Mutex<Option<DateTime<Utc>>>,
}

impl PinService {
    pub fn new(store: Arc<dyn SecureStore>) -> Self {
        Self::with_params(store, KdfParams::for_pin())
    }

    pub fn with_params(store: Arc<dyn SecureStore>, kdf: KdfParams) -> Self {
        Self {
            store,
            kdf,
            delay_until: Mutex::new(None),
        }
    }

    // ── Attempt state ───────────────────────────────────────────────

    pub fn attempt_state(&self) -> Result<PinAttemptState, CoreError> {
        Ok(load_json(self.store.as_ref(), keys::PIN_ATTEMPTS)?.unwrap_or_default())
    }

    fn save_attempt_state(&self, state: &PinAttemptState) -> Result<(), CoreError> {
        save_json(self.store.as_ref(), keys::PIN_ATTEMPTS, state)
    }

    fn set_delay_until(&self, until: Option<DateTime<Utc>>) {
        *self.delay_until.lock().unwrap_or_else(|e| e.into_inner()) = until;
    }

    fn delay_until(&self) -> Option<DateTime<Utc>> {
        *self.delay_until.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Count one failed verification and apply the resulting lockout.
    pub fn record_failure(&self, now: DateTime<Utc>) -> Result<PinAttemptState, CoreError> {
        let mut state = self.attempt_state()?;
        state.failed_attempts += 1;

        match lockout_for(state.failed_attempts) {
            Some(lockout) => {
                state.lockout_until = Some(now + lockout);
                self.set_delay_until(None);
                log::warn!(
                    "PIN locked for {}s after {} failed attempts",
                    lockout.num_seconds(),
                    state.failed_attempts
                );
            }
            None => {
                let delay = delay_for(state.failed_attempts);
                self.set_delay_until((delay > Duration::zero()).then(|| now + delay));
            }
        }

        self.save_attempt_state(&state)?;
        Ok(state)
    }

    /// Back to `Normal`: zero failures, no lockout, no delay.
    pub fn record_success(&self) -> Result<(), CoreError> {
        self.set_delay_until(None);
        self.save_attempt_state(&PinAttemptState::default())
    }

    /// True while a lockout is running. A lockout that has already expired
    /// is cleared from the store; the failure count is kept.
    pub fn is_locked_out(&self, now: DateTime<Utc>) -> Result<bool, CoreError> {
        let mut state = self.attempt_state()?;
        match state.lockout_until {
            Some(until) if until > now => Ok(true),
            Some(_) => {
                state.lockout_until = None;
                self.save_attempt_state(&state)?;
                log::debug!("PIN lockout expired");
                Ok(false)
            }
            None => Ok(false),
        }
    }

    /// Delay the current failure count imposes before the next entry.
    pub fn required_delay(&self) -> Result<Duration, CoreError> {
        Ok(delay_for(self.attempt_state()?.failed_attempts))
    }

    /// Time left on the running lockout, zero when none.
    pub fn remaining_lockout(&self, now: DateTime<Utc>) -> Result<Duration, CoreError> {
        Ok(self
            .attempt_state()?
            .lockout_until
            .map(|until| until - now)
            .filter(|d| *d > Duration::zero())
            .unwrap_or_else(Duration::zero))
    }

    /// Time left on the delay started by the last failure, zero when none.
    pub fn remaining_delay(&self, now: DateTime<Utc>) -> Duration {
        self.delay_until()
            .map(|until| until - now)
            .filter(|d| *d > Duration::zero())
            .unwrap_or_else(Duration::zero)
    }

    pub fn throttle_state(&self) -> Result<ThrottleState, CoreError> {
        Ok(throttle_state_for(self.attempt_state()?.failed_attempts))
    }

    /// Verify an entered PIN through the throttle.
    ///
    /// While a lockout or delay is running the PIN is not compared and the
    /// failure counter does not move.
    pub fn submit(&self, pin: &str, now: DateTime<Utc>) -> Result<PinOutcome, CoreError> {
        if self.is_locked_out(now)? {
            return Ok(PinOutcome::LockedOut {
                remaining: self.remaining_lockout(now)?,
            });
        }
        let delay = self.remaining_delay(now);
        if delay > Duration::zero() {
            return Ok(PinOutcome::Throttled { remaining: delay });
        }

        if self.verify(pin)? {
            self.record_success()?;
            log::info!("PIN accepted");
            return Ok(PinOutcome::Unlocked);
        }

        let state = self.record_failure(now)?;
        let lockout = lockout_for(state.failed_attempts);
        Ok(PinOutcome::Rejected {
            attempts: state.failed_attempts,
            delay: if lockout.is_some() {
                Duration::zero()
            } else {
                delay_for(state.failed_attempts)
            },
            lockout,
        })
    }

    /// Lockout countdown text, or `None` when not locked out.
    pub fn lockout_message(&self, now: DateTime<Utc>) -> Result<Option<String>, CoreError> {
        if !self.is_locked_out(now)? {
            return Ok(None);
        }
        Ok(Some(format_lockout(self.remaining_lockout(now)?)))
    }

    /// Escalating warning shown after failed attempts.
    pub fn warning_message(&self) -> Result<Option<String>, CoreError> {
        let attempts = self.attempt_state()?.failed_attempts;
        let message = if attempts >= EXTENDED_LOCKOUT_THRESHOLD - 1 {
            Some("Warning: 1 more wrong attempt will lock you out for 5 minutes!".to_string())
        } else if attempts >= DELAY_THRESHOLD + 1 {
            Some(format!(
                "Warning: {} more wrong attempts will lock you out!",
                EXTENDED_LOCKOUT_THRESHOLD - attempts
            ))
        } else if attempts >= DELAY_THRESHOLD {
            Some("Multiple failed attempts detected. Delays are now active.".to_string())
        } else {
            None
        };
        Ok(message)
    }

    // ── Secret ──────────────────────────────────────────────────────

    fn hash(&self, pin: &str, salt: &[u8; 16]) -> Result<[u8; 32], CoreError> {
        encryption::derive_key(pin, salt, &self.kdf)
    }

    /// Store a new PIN. Attempt state is left alone.
    pub fn set_pin(&self, pin: &str) -> Result<(), CoreError> {
        validate_pin(pin)?;
        let salt = encryption::generate_salt()?;
        let secret = PinSecret {
            salt,
            hash: self.hash(pin, &salt)?,
        };
        save_json(self.store.as_ref(), keys::PIN_HASH, &secret)?;
        log::info!("PIN set");
        Ok(())
    }

    pub fn is_pin_set(&self) -> Result<bool, CoreError> {
        Ok(self.store.get(keys::PIN_HASH)?.is_some())
    }

    /// Compare `pin` with the stored secret in constant time. Does not
    /// touch attempt state; use `submit` for throttled entry.
    pub fn verify(&self, pin: &str) -> Result<bool, CoreError> {
        let secret: PinSecret = load_json(self.store.as_ref(), keys::PIN_HASH)?
            .ok_or_else(|| CoreError::NotFound("No PIN has been set".into()))?;
        if validate_pin(pin).is_err() {
            return Ok(false);
        }
        let candidate = self.hash(pin, &secret.salt)?;
        Ok(bool::from(candidate[..].ct_eq(&secret.hash[..])))
    }

    /// Replace the PIN after checking the current one.
    pub fn update_pin(&self, old_pin: &str, new_pin: &str) -> Result<(), CoreError> {
        validate_pin(new_pin)?;
        if !self.verify(old_pin)? {
            return Err(CoreError::ValidationError("Current PIN is incorrect".into()));
        }
        self.set_pin(new_pin)
    }

    /// Remove the PIN and its attempt state.
    pub fn clear_pin(&self) -> Result<(), CoreError> {
        self.store.remove(keys::PIN_HASH)?;
        self.store.remove(keys::PIN_ATTEMPTS)?;
        self.set_delay_until(None);
        log::info!("PIN cleared");
        Ok(())
    }
}
