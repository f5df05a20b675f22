use std::sync::Arc;

use crate::api::traits::ExpenseApi;
use crate::errors::CoreError;
use crate::models::auth::{LoginResponse, SignupResponse};
use crate::services::session_service::SessionService;

/// Login, signup, logout and password change against the remote API,
/// keeping the local session in step.
pub struct AuthService {
    api: Arc<dyn ExpenseApi>,
    session: SessionService,
}

fn require_non_empty(value: &str, field: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::ValidationError(format!("{field} must not be empty")));
    }
    Ok(())
}

impl AuthService {
    pub fn new(api: Arc<dyn ExpenseApi>, session: SessionService) -> Self {
        Self { api, session }
    }

    /// Log in and persist token, username and email.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, CoreError> {
        require_non_empty(email, "Email")?;
        require_non_empty(password, "Password")?;

        let resp = self
            .api
            .login(email.trim(), password)
            .await
            .inspect_err(|e| log::error!("login failed: {e}"))?;

        if resp.token.is_empty() {
            return Err(CoreError::AuthError("Server returned an empty token".into()));
        }
        self.session.save_token(&resp.token)?;
        self.session.save_user(&resp.user.username, &resp.user.email)?;
        log::info!("Logged in as {}", resp.user.username);
        Ok(resp)
    }

    /// Register an account. The username is stored right away; the token
    /// only when the server logs the user in as part of signup. A response
    /// carrying only a `message` (e.g. "Email already registered") is
    /// returned as a validation failure.
    pub async fn signup(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<SignupResponse, CoreError> {
        require_non_empty(email, "Email")?;
        require_non_empty(username, "Username")?;
        require_non_empty(password, "Password")?;

        let resp = self
            .api
            .signup(email.trim(), username.trim(), password)
            .await
            .inspect_err(|e| log::error!("signup failed: {e}"))?;

        if resp.token.is_none() && resp.user.is_none() {
            if let Some(message) = resp.message.as_deref().filter(|m| !m.is_empty()) {
                return Err(CoreError::ValidationError(message.to_string()));
            }
        }

        self.session.save_username(username.trim())?;
        if let Some(token) = resp.token.as_deref().filter(|t| !t.is_empty()) {
            self.session.save_token(token)?;
            if let Some(user) = &resp.user {
                self.session.save_user(&user.username, &user.email)?;
            }
        }
        Ok(resp)
    }

    /// Log out remotely and clear the local session. The local session is
    /// cleared even when the server call fails; the failure is returned.
    pub async fn logout(&self) -> Result<String, CoreError> {
        let result = self.api.logout().await;
        self.session.clear()?;
        match result {
            Ok(resp) if !resp.message.is_empty() => Ok(resp.message),
            Ok(_) => Ok("Logout successful".to_string()),
            Err(e) => {
                log::error!("logout failed: {e}");
                Err(e)
            }
        }
    }

    pub async fn change_password(&self, old_password: &str, new_password: &str) -> Result<String, CoreError> {
        require_non_empty(old_password, "Current password")?;
        require_non_empty(new_password, "New password")?;
        if old_password == new_password {
            return Err(CoreError::ValidationError(
                "New password must differ from the current one".into(),
            ));
        }
        let token = self.session.require_token()?;
        let resp = self
            .api
            .change_password(&token, old_password, new_password)
            .await
            .inspect_err(|e| log::error!("change password failed: {e}"))?;
        Ok(if resp.message.is_empty() {
            "Password changed successfully".to_string()
        } else {
            resp.message
        })
    }

    pub fn session(&self) -> &SessionService {
        &self.session
    }
}
