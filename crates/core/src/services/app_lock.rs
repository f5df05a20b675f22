use std::sync::{Arc, Mutex};

use crate::errors::CoreError;
use crate::storage::store::{keys, load_json, save_json, SecureStore};

#[derive(Debug, Default)]
struct SessionLock {
    in_background: bool,
    authenticated: bool,
}

/// Optional app lock: a persisted on/off preference plus the in-memory
/// state of the current foreground session.
///
/// A session is unlocked by a successful PIN entry and locks again as soon
/// as the app goes to the background. The preference defaults to off.
pub struct AppLock {
    store: Arc<dyn SecureStore>,
    session: Mutex<SessionLock>,
}

impl AppLock {
    pub fn new(store: Arc<dyn SecureStore>) -> Self {
        Self {
            store,
            session: Mutex::new(SessionLock::default()),
        }
    }

    fn session(&self) -> std::sync::MutexGuard<'_, SessionLock> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ── Preference ──────────────────────────────────────────────────

    pub fn is_enabled(&self) -> Result<bool, CoreError> {
        Ok(load_json(self.store.as_ref(), keys::LOCK_ENABLED)?.unwrap_or(false))
    }

    pub fn set_enabled(&self, enabled: bool) -> Result<(), CoreError> {
        save_json(self.store.as_ref(), keys::LOCK_ENABLED, &enabled)?;
        log::info!("App lock {}", if enabled { "enabled" } else { "disabled" });
        Ok(())
    }

    /// Flip the preference and return the new value.
    pub fn toggle(&self) -> Result<bool, CoreError> {
        let enabled = !self.is_enabled()?;
        self.set_enabled(enabled)?;
        Ok(enabled)
    }

    // ── Session ─────────────────────────────────────────────────────

    /// The app came to the foreground. Returns true when the lock is enabled
    /// and the user has to unlock before seeing any data.
    pub fn on_foreground(&self) -> Result<bool, CoreError> {
        let enabled = self.is_enabled()?;
        let mut session = self.session();
        let required = session.in_background || !session.authenticated;
        session.in_background = false;
        Ok(enabled && required)
    }

    /// The app went to the background; the next foreground needs an unlock.
    pub fn on_background(&self) {
        let mut session = self.session();
        session.in_background = true;
        session.authenticated = false;
    }

    pub fn mark_authenticated(&self) {
        self.session().authenticated = true;
    }

    /// Lock the current session without waiting for a background transition.
    pub fn require_reauthentication(&self) {
        self.session().authenticated = false;
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().authenticated
    }

    /// True while the lock is enabled and this session has not been unlocked.
    pub fn is_locked(&self) -> Result<bool, CoreError> {
        Ok(self.is_enabled()? && !self.is_authenticated())
    }
}
