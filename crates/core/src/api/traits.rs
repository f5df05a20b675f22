use async_trait::async_trait;

use crate::errors::CoreError;
use crate::models::auth::{LoginResponse, MessageResponse, SignupResponse};
use crate::models::exchange::ExchangeRate;
use crate::models::report::{MonthlyReport, Summary};
use crate::models::transaction::{NewTransaction, Transaction};

/// The remote expense API.
///
/// `HttpExpenseApi` talks to the real server; tests plug in their own
/// implementation. `token` is the bare session token, without the
/// `Bearer ` prefix.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait ExpenseApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, CoreError>;

    async fn signup(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<SignupResponse, CoreError>;

    async fn logout(&self) -> Result<MessageResponse, CoreError>;

    async fn get_transactions(&self, token: &str) -> Result<Vec<Transaction>, CoreError>;

    async fn create_transaction(
        &self,
        token: &str,
        transaction: &NewTransaction,
    ) -> Result<Transaction, CoreError>;

    async fn delete_transaction(&self, token: &str, id: i64) -> Result<(), CoreError>;

    async fn get_summary(&self, token: &str) -> Result<Summary, CoreError>;

    async fn get_monthly_report(
        &self,
        token: &str,
        month: u32,
        year: i32,
    ) -> Result<MonthlyReport, CoreError>;

    async fn get_exchange_rate(&self) -> Result<ExchangeRate, CoreError>;

    async fn change_password(
        &self,
        token: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<MessageResponse, CoreError>;
}
