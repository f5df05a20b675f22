use std::sync::Arc;

use crate::errors::CoreError;
use crate::storage::store::{keys, SecureStore};

/// Signed-in user's token and profile, kept in the secure store.
#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn SecureStore>,
}

impl SessionService {
    pub fn new(store: Arc<dyn SecureStore>) -> Self {
        Self { store }
    }

    pub fn save_token(&self, token: &str) -> Result<(), CoreError> {
        self.store.set(keys::AUTH_TOKEN, token)
    }

    pub fn token(&self) -> Result<Option<String>, CoreError> {
        Ok(self.store.get(keys::AUTH_TOKEN)?.filter(|t| !t.is_empty()))
    }

    /// The stored token, or `AuthError` asking the user to login again.
    pub fn require_token(&self) -> Result<String, CoreError> {
        self.token()?.ok_or_else(CoreError::missing_token)
    }

    pub fn is_logged_in(&self) -> bool {
        matches!(self.token(), Ok(Some(_)))
    }

    pub fn save_user(&self, username: &str, email: &str) -> Result<(), CoreError> {
        self.store.set(keys::USER_NAME, username)?;
        self.store.set(keys::USER_EMAIL, email)
    }

    pub fn save_username(&self, username: &str) -> Result<(), CoreError> {
        self.store.set(keys::USER_NAME, username)
    }

    pub fn username(&self) -> Result<Option<String>, CoreError> {
        self.store.get(keys::USER_NAME)
    }

    pub fn email(&self) -> Result<Option<String>, CoreError> {
        self.store.get(keys::USER_EMAIL)
    }

    /// Forget token and profile. Goal and PIN data stay.
    pub fn clear(&self) -> Result<(), CoreError> {
        self.store.remove(keys::AUTH_TOKEN)?;
        self.store.remove(keys::USER_NAME)?;
        self.store.remove(keys::USER_EMAIL)
    }
}
