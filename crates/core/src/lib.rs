pub mod api;
pub mod errors;
pub mod models;
pub mod services;
pub mod storage;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

use api::{http::HttpExpenseApi, traits::ExpenseApi};
use errors::CoreError;
use models::{
    auth::{LoginResponse, SignupResponse},
    exchange::ConversionDirection,
    goal::GoalProgress,
    pin::PinOutcome,
    report::{MonthlyReport, Summary},
    settings::Settings,
    transaction::{NewTransaction, Transaction},
};
use services::{
    app_lock::AppLock, auth_service::AuthService, currency_service::CurrencyService,
    goal_service::GoalService, loading::LoadTracker, notification::Notifier,
    pin_service::PinService, report_service::ReportService, session_service::SessionService,
    transaction_service::TransactionService,
};
use storage::store::SecureStore;

/// Outcome of a dashboard refresh. Each feed succeeds or fails on its own.
#[derive(Debug)]
pub struct Dashboard {
    pub transactions: Result<Vec<Transaction>, CoreError>,
    pub summary: Result<Summary, CoreError>,
}

/// Main entry point for the expense tracker client core.
/// Owns the session, the cached feeds and the local goal and PIN state.
#[must_use]
pub struct ExpenseTracker {
    settings: Settings,
    api: Arc<dyn ExpenseApi>,
    auth: AuthService,
    transactions: TransactionService,
    reports: ReportService,
    goal: GoalService,
    pin: PinService,
    app_lock: AppLock,
    currency: CurrencyService,
    loading: LoadTracker,
}

impl std::fmt::Debug for ExpenseTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpenseTracker")
            .field("settings", &self.settings)
            .field("logged_in", &self.auth.session().is_logged_in())
            .field("cached_transactions", &self.transactions.cached().map(<[_]>::len))
            .field("in_flight", &self.loading.in_flight())
            .field("unlocked", &self.app_lock.is_authenticated())
            .finish()
    }
}

impl ExpenseTracker {
    /// Wire all services around the given collaborators.
    pub fn new(
        settings: Settings,
        api: Arc<dyn ExpenseApi>,
        store: Arc<dyn SecureStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let window = settings.cache_window();
        let session = SessionService::new(Arc::clone(&store));
        Self {
            auth: AuthService::new(Arc::clone(&api), session.clone()),
            transactions: TransactionService::new(Arc::clone(&api), session.clone(), window),
            reports: ReportService::new(Arc::clone(&api), session.clone(), window),
            goal: GoalService::new(Arc::clone(&api), session, Arc::clone(&store), notifier),
            app_lock: AppLock::new(Arc::clone(&store)),
            pin: PinService::new(store),
            currency: CurrencyService::new(),
            loading: LoadTracker::new(),
            settings,
            api,
        }
    }

    /// Same as [`ExpenseTracker::new`] with the HTTP client built from `settings`.
    pub fn with_http(
        settings: Settings,
        store: Arc<dyn SecureStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, CoreError> {
        settings.validate()?;
        let api: Arc<dyn ExpenseApi> = Arc::new(HttpExpenseApi::new(&settings));
        Ok(Self::new(settings, api, store, notifier))
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// True while any request started through the facade is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading.is_loading()
    }

    #[must_use]
    pub fn loading(&self) -> &LoadTracker {
        &self.loading
    }

    // ── Session ─────────────────────────────────────────────────────

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, CoreError> {
        let _guard = self.loading.begin();
        self.auth.login(email, password).await
    }

    pub async fn signup(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<SignupResponse, CoreError> {
        let _guard = self.loading.begin();
        self.auth.signup(email, username, password).await
    }

    /// Log out and drop every cached feed of the previous user.
    pub async fn logout(&mut self) -> Result<String, CoreError> {
        let _guard = self.loading.begin();
        let result = self.auth.logout().await;
        self.transactions.clear();
        self.reports.clear();
        result
    }

    pub async fn change_password(&self, old_password: &str, new_password: &str) -> Result<String, CoreError> {
        let _guard = self.loading.begin();
        self.auth.change_password(old_password, new_password).await
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.auth.session().is_logged_in()
    }

    pub fn username(&self) -> Result<Option<String>, CoreError> {
        self.auth.session().username()
    }

    pub fn email(&self) -> Result<Option<String>, CoreError> {
        self.auth.session().email()
    }

    // ── Transactions & reports ──────────────────────────────────────

    /// Transactions newest first, from cache while fresh.
    pub async fn transactions(&mut self, now: DateTime<Utc>, force: bool) -> Result<Vec<Transaction>, CoreError> {
        let _guard = self.loading.begin();
        self.transactions.load(now, force).await
    }

    /// Create a transaction. Transactions and report caches are dropped.
    pub async fn add_transaction(&mut self, transaction: &NewTransaction) -> Result<Transaction, CoreError> {
        let _guard = self.loading.begin();
        let created = self.transactions.create(transaction).await?;
        self.reports.invalidate_all();
        Ok(created)
    }

    /// Delete a transaction. Transactions and report caches are dropped.
    pub async fn delete_transaction(&mut self, id: i64) -> Result<(), CoreError> {
        let _guard = self.loading.begin();
        self.transactions.delete(id).await?;
        self.reports.invalidate_all();
        Ok(())
    }

    pub async fn summary(&mut self, now: DateTime<Utc>, force: bool) -> Result<Summary, CoreError> {
        let _guard = self.loading.begin();
        self.reports.load_summary(now, force).await
    }

    pub async fn monthly_report(
        &mut self,
        year: i32,
        month: u32,
        now: DateTime<Utc>,
        force: bool,
    ) -> Result<MonthlyReport, CoreError> {
        let _guard = self.loading.begin();
        self.reports.load_monthly_report(year, month, now, force).await
    }

    /// Load transactions and summary concurrently; resolves once both are
    /// done. Each branch holds its own loading guard, so `is_loading` stays
    /// true until the slower one finishes.
    pub async fn refresh_dashboard(&mut self, now: DateTime<Utc>, force: bool) -> Dashboard {
        let loading = &self.loading;
        let transactions = &mut self.transactions;
        let reports = &mut self.reports;

        let (transactions, summary) = futures::join!(
            async {
                let _guard = loading.begin();
                transactions.load(now, force).await
            },
            async {
                let _guard = loading.begin();
                reports.load_summary(now, force).await
            }
        );
        Dashboard { transactions, summary }
    }

    #[must_use]
    pub fn transaction_service(&self) -> &TransactionService {
        &self.transactions
    }

    #[must_use]
    pub fn report_service(&self) -> &ReportService {
        &self.reports
    }

    // ── Goal ────────────────────────────────────────────────────────

    pub fn save_goal(&self, amount: Decimal, now: DateTime<Utc>) -> Result<(), CoreError> {
        self.goal.save_goal(amount, now)
    }

    pub fn goal_amount(&self) -> Result<Option<Decimal>, CoreError> {
        self.goal.goal_amount()
    }

    pub fn delete_goal(&self) -> Result<(), CoreError> {
        self.goal.delete_goal()
    }

    /// Recompute goal progress and send any newly reached milestones.
    /// Safe to call from both the foreground and a periodic background job.
    pub async fn refresh_goal(&self, now: DateTime<Utc>) -> Result<Option<GoalProgress>, CoreError> {
        let _guard = self.loading.begin();
        self.goal.refresh(now).await
    }

    #[must_use]
    pub fn goal(&self) -> &GoalService {
        &self.goal
    }

    // ── PIN ─────────────────────────────────────────────────────────

    #[must_use]
    pub fn pin(&self) -> &PinService {
        &self.pin
    }

    /// Enter the PIN through the throttle. A match also unlocks the current
    /// app session.
    pub fn submit_pin(&self, pin: &str, now: DateTime<Utc>) -> Result<PinOutcome, CoreError> {
        let outcome = self.pin.submit(pin, now)?;
        if outcome == PinOutcome::Unlocked {
            self.app_lock.mark_authenticated();
        }
        Ok(outcome)
    }

    // ── App lock ────────────────────────────────────────────────────

    #[must_use]
    pub fn app_lock(&self) -> &AppLock {
        &self.app_lock
    }

    /// True when the app must show the PIN screen after coming to the
    /// foreground.
    pub fn on_foreground(&self) -> Result<bool, CoreError> {
        self.app_lock.on_foreground()
    }

    pub fn on_background(&self) {
        self.app_lock.on_background();
    }

    // ── Currency ────────────────────────────────────────────────────

    pub async fn refresh_exchange_rate(&mut self) -> Result<Decimal, CoreError> {
        let _guard = self.loading.begin();
        self.currency.refresh_rate(self.api.as_ref()).await
    }

    pub fn convert(&self, amount: Decimal, direction: ConversionDirection) -> Result<Decimal, CoreError> {
        self.currency.convert(amount, direction)
    }

    #[must_use]
    pub fn currency(&self) -> &CurrencyService {
        &self.currency
    }
}
