use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::traits::ExpenseApi;
use crate::errors::CoreError;
use crate::models::auth::{
    ChangePasswordRequest, LoginRequest, LoginResponse, MessageResponse, SignupRequest,
    SignupResponse,
};
use crate::models::exchange::ExchangeRate;
use crate::models::report::{MonthlyReport, Summary};
use crate::models::settings::Settings;
use crate::models::transaction::{NewTransaction, Transaction};

/// JSON-over-HTTPS client for the expense API.
///
/// - Auth: `Authorization: Bearer <token>` on every `transactions/me/*` call.
/// - Timeouts: connect and whole-request budgets come from `Settings`
///   (30 s each by default).
/// - Errors: 401/403 → `AuthError`, any other non-2xx → `Api { status }`,
///   transport failures → `Network`.
pub struct HttpExpenseApi {
    client: Client,
    base_url: String,
}

impl HttpExpenseApi {
    pub fn new(settings: &Settings) -> Self {
        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder
            .connect_timeout(settings.connect_timeout())
            .timeout(settings.request_timeout());
        Self {
            client: builder.build().unwrap_or_else(|e| {
                log::warn!("Falling back to default HTTP client: {e}");
                Client::new()
            }),
            base_url: normalize_base_url(&settings.api_base_url),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a path relative to the API root.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authed(&self, builder: RequestBuilder, token: &str) -> RequestBuilder {
        builder.header(reqwest::header::AUTHORIZATION, bearer(token))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        context: &str,
    ) -> Result<T, CoreError> {
        let resp = self.check(builder.send().await?, context).await?;
        resp.json::<T>().await.map_err(|e| CoreError::Api {
            status: 200,
            message: format!("Failed to parse {context} response: {e}"),
        })
    }

    async fn check(&self, resp: Response, context: &str) -> Result<Response, CoreError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        let err = status_error(status.as_u16(), &body, context);
        log::error!("{context} failed: {err}");
        Err(err)
    }
}

/// `Authorization` header value for a bare token.
pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

/// Ensure the base URL ends with exactly one `/`.
pub fn normalize_base_url(raw: &str) -> String {
    format!("{}/", raw.trim().trim_end_matches('/'))
}

/// Map a non-2xx status to the error taxonomy. The server usually puts a
/// human-readable reason in a `message` field; that wins over the raw body.
pub fn status_error(status: u16, body: &str, context: &str) -> CoreError {
    let detail = serde_json::from_str::<MessageResponse>(body)
        .ok()
        .map(|m| m.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string());
    let message = if detail.is_empty() {
        format!("{context} failed ({status})")
    } else {
        format!("{context} failed ({status}): {detail}")
    };
    match status {
        401 | 403 => CoreError::AuthError(message),
        _ => CoreError::Api { status, message },
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl ExpenseApi for HttpExpenseApi {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, CoreError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.send_json(self.client.post(self.endpoint("auth/login")).json(&body), "Login")
            .await
    }

    async fn signup(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<SignupResponse, CoreError> {
        let body = SignupRequest {
            email: email.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        };
        self.send_json(self.client.post(self.endpoint("auth/signup")).json(&body), "Signup")
            .await
    }

    async fn logout(&self) -> Result<MessageResponse, CoreError> {
        self.send_json(self.client.post(self.endpoint("auth/logout")), "Logout")
            .await
    }

    async fn get_transactions(&self, token: &str) -> Result<Vec<Transaction>, CoreError> {
        let req = self.authed(self.client.get(self.endpoint("transactions/me/transactions")), token);
        self.send_json(req, "Fetch transactions").await
    }

    async fn create_transaction(
        &self,
        token: &str,
        transaction: &NewTransaction,
    ) -> Result<Transaction, CoreError> {
        let req = self
            .authed(self.client.post(self.endpoint("transactions/me/createtransaction")), token)
            .json(transaction);
        self.send_json(req, "Create transaction").await
    }

    async fn delete_transaction(&self, token: &str, id: i64) -> Result<(), CoreError> {
        let req = self.authed(self.client.delete(self.endpoint(&format!("transactions/me/{id}"))), token);
        self.check(req.send().await?, "Delete transaction").await?;
        Ok(())
    }

    async fn get_summary(&self, token: &str) -> Result<Summary, CoreError> {
        let req = self.authed(self.client.get(self.endpoint("transactions/me/summary")), token);
        self.send_json(req, "Fetch summary").await
    }

    async fn get_monthly_report(
        &self,
        token: &str,
        month: u32,
        year: i32,
    ) -> Result<MonthlyReport, CoreError> {
        let req = self
            .authed(self.client.get(self.endpoint("transactions/me/monthly-summary")), token)
            .query(&[("year", year.to_string()), ("month", month.to_string())]);
        self.send_json(req, &format!("Fetch monthly report for {year}-{month:02}"))
            .await
    }

    async fn get_exchange_rate(&self) -> Result<ExchangeRate, CoreError> {
        self.send_json(self.client.get(self.endpoint("exchange")), "Fetch exchange rate")
            .await
    }

    async fn change_password(
        &self,
        token: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<MessageResponse, CoreError> {
        let body = ChangePasswordRequest {
            old_password: old_password.to_string(),
            new_password: new_password.to_string(),
        };
        let req = self
            .authed(self.client.post(self.endpoint("auth/change-password")), token)
            .json(&body);
        self.send_json(req, "Change password").await
    }
}
