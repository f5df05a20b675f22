use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use expense_tracker_core::api::traits::ExpenseApi;
use expense_tracker_core::errors::CoreError;
use expense_tracker_core::models::auth::{LoginResponse, MessageResponse, SignupResponse, User};
use expense_tracker_core::models::exchange::{ConversionDirection, ExchangeRate};
use expense_tracker_core::models::goal::Milestone;
use expense_tracker_core::models::pin::PinOutcome;
use expense_tracker_core::models::report::{MonthlyReport, Summary};
use expense_tracker_core::models::settings::Settings;
use expense_tracker_core::models::transaction::{NewTransaction, Transaction, TransactionKind};
use expense_tracker_core::services::loading::LoadTracker;
use expense_tracker_core::services::notification::{LogNotifier, Notification, Notifier};
use expense_tracker_core::storage::store::MemoryStore;
use expense_tracker_core::ExpenseTracker;

// ═══════════════════════════════════════════════════════════════════
// Mock API (each call yields once so concurrent branches interleave)
// ═══════════════════════════════════════════════════════════════════

#[derive(Default)]
struct MockServer {
    transactions: Mutex<Vec<Transaction>>,
    watch: Mutex<Option<LoadTracker>>,
    peak_in_flight: AtomicUsize,
    transaction_calls: AtomicUsize,
    summary_calls: AtomicUsize,
}

impl MockServer {
    fn observe(&self) {
        if let Some(tracker) = self.watch.lock().unwrap().as_ref() {
            self.peak_in_flight
                .fetch_max(tracker.in_flight(), Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl ExpenseApi for MockServer {
    async fn login(&self, email: &str, _password: &str) -> Result<LoginResponse, CoreError> {
        Ok(LoginResponse {
            token: "tok-abc".into(),
            user: User {
                id: "1".into(),
                email: email.to_string(),
                username: "carol".into(),
                created_at: None,
            },
        })
    }

    async fn signup(&self, _: &str, _: &str, _: &str) -> Result<SignupResponse, CoreError> {
        Ok(SignupResponse::default())
    }

    async fn logout(&self) -> Result<MessageResponse, CoreError> {
        Ok(MessageResponse::default())
    }

    async fn get_transactions(&self, _token: &str) -> Result<Vec<Transaction>, CoreError> {
        self.transaction_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.observe();
        Ok(self.transactions.lock().unwrap().clone())
    }

    async fn create_transaction(
        &self,
        _token: &str,
        transaction: &NewTransaction,
    ) -> Result<Transaction, CoreError> {
        let created = Transaction {
            id: 500,
            amount: transaction.amount,
            category: transaction.category.as_str().into(),
            kind: None,
            title: transaction.title.clone(),
            created_at: "2025-06-10T09:30:00Z".into(),
            date: None,
            user_id: None,
        };
        self.transactions.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn delete_transaction(&self, _token: &str, id: i64) -> Result<(), CoreError> {
        self.transactions.lock().unwrap().retain(|t| t.id != id);
        Ok(())
    }

    async fn get_summary(&self, _token: &str) -> Result<Summary, CoreError> {
        self.summary_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.observe();
        Ok(Summary::default())
    }

    async fn get_monthly_report(
        &self,
        _token: &str,
        month: u32,
        year: i32,
    ) -> Result<MonthlyReport, CoreError> {
        Ok(MonthlyReport {
            year,
            month,
            income: None,
            expenses: None,
            balance: None,
        })
    }

    async fn get_exchange_rate(&self) -> Result<ExchangeRate, CoreError> {
        Ok(ExchangeRate {
            base: "USD".into(),
            target: "LBP".into(),
            rate: dec!(89500),
            last_updated: "2025-06-10".into(),
            success: true,
        })
    }

    async fn change_password(&self, _: &str, _: &str, _: &str) -> Result<MessageResponse, CoreError> {
        Ok(MessageResponse {
            message: "Password updated".into(),
        })
    }
}

#[derive(Default)]
struct Inbox {
    received: Mutex<Vec<Notification>>,
}

impl Notifier for Inbox {
    fn notify(&self, notification: &Notification) -> Result<(), CoreError> {
        self.received.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

fn june(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, day, hour, 0, 0).unwrap()
}

fn tracker() -> (Arc<MockServer>, Arc<Inbox>, ExpenseTracker) {
    let server = Arc::new(MockServer::default());
    let inbox = Arc::new(Inbox::default());
    let app = ExpenseTracker::new(
        Settings::default(),
        server.clone(),
        Arc::new(MemoryStore::new()),
        inbox.clone(),
    );
    (server, inbox, app)
}

// ═══════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════

#[tokio::test]
async fn dashboard_loads_both_feeds_concurrently() {
    let (server, _, mut app) = tracker();
    *server.watch.lock().unwrap() = Some(app.loading().clone());
    app.login("carol@example.com", "pw").await.unwrap();

    let dashboard = app.refresh_dashboard(june(1, 9), false).await;
    assert!(dashboard.transactions.is_ok());
    assert!(dashboard.summary.is_ok());
    assert_eq!(server.peak_in_flight.load(Ordering::SeqCst), 2);
    assert!(!app.is_loading());
}

#[tokio::test]
async fn dashboard_respects_cache_window() {
    let (server, _, mut app) = tracker();
    app.login("carol@example.com", "pw").await.unwrap();

    app.refresh_dashboard(june(1, 9), false).await;
    app.refresh_dashboard(june(1, 9) + Duration::minutes(2), false).await;
    assert_eq!(server.transaction_calls.load(Ordering::SeqCst), 1);
    assert_eq!(server.summary_calls.load(Ordering::SeqCst), 1);

    app.refresh_dashboard(june(1, 9) + Duration::minutes(2), true).await;
    assert_eq!(server.transaction_calls.load(Ordering::SeqCst), 2);
    assert_eq!(server.summary_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn dashboard_without_login_fails_both_branches() {
    let (_, _, mut app) = tracker();
    let dashboard = app.refresh_dashboard(june(1, 9), false).await;
    assert!(matches!(dashboard.transactions, Err(CoreError::AuthError(_))));
    assert!(matches!(dashboard.summary, Err(CoreError::AuthError(_))));
    assert!(!app.is_loading());
}

#[tokio::test]
async fn adding_transaction_invalidates_summary() {
    let (server, _, mut app) = tracker();
    app.login("carol@example.com", "pw").await.unwrap();
    let now = june(10, 10);

    app.summary(now, false).await.unwrap();
    app.add_transaction(&NewTransaction::new(dec!(20), TransactionKind::Expense, "Taxi"))
        .await
        .unwrap();
    app.summary(now + Duration::minutes(1), false).await.unwrap();
    assert_eq!(server.summary_calls.load(Ordering::SeqCst), 2);

    let list = app.transactions(now + Duration::minutes(1), false).await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].title, "Taxi");
}

#[tokio::test]
async fn goal_flow_notifies_once_per_period() {
    let (_, inbox, mut app) = tracker();
    app.login("carol@example.com", "pw").await.unwrap();
    app.save_goal(dec!(200), june(1, 0)).unwrap();

    app.add_transaction(&NewTransaction::new(dec!(110), TransactionKind::Expense, "Rent share"))
        .await
        .unwrap();

    let progress = app.refresh_goal(june(10, 12)).await.unwrap().unwrap();
    assert_eq!(progress.percent, 55);
    assert_eq!(progress.fired, vec![Milestone::Twenty, Milestone::Fifty]);

    app.refresh_goal(june(11, 12)).await.unwrap();
    assert_eq!(inbox.received.lock().unwrap().len(), 2);

    app.delete_goal().unwrap();
    assert_eq!(app.goal_amount().unwrap(), None);
    assert!(app.refresh_goal(june(12, 12)).await.unwrap().is_none());
}

#[tokio::test]
async fn logout_drops_cached_feeds() {
    let (_, _, mut app) = tracker();
    app.login("carol@example.com", "pw").await.unwrap();
    assert_eq!(app.username().unwrap().as_deref(), Some("carol"));
    app.transactions(june(1, 9), false).await.unwrap();
    assert!(app.transaction_service().cached().is_some());

    app.logout().await.unwrap();
    assert!(!app.is_logged_in());
    assert!(app.transaction_service().cached().is_none());
    assert!(app.report_service().summary_feed().get().is_none());
}

#[tokio::test]
async fn currency_conversion_through_facade() {
    let (_, _, mut app) = tracker();
    assert!(app.convert(dec!(1), ConversionDirection::AToB).is_err());

    app.refresh_exchange_rate().await.unwrap();
    assert_eq!(
        app.convert(dec!(2), ConversionDirection::AToB).unwrap(),
        dec!(179000)
    );
    assert_eq!(
        app.convert(dec!(179000), ConversionDirection::BToA).unwrap(),
        dec!(2)
    );
}

#[tokio::test]
async fn pin_lock_through_facade() {
    let (_, _, app) = tracker();
    let t0 = june(1, 8);
    app.pin().set_pin("2468").unwrap();
    assert_eq!(app.pin().submit("2468", t0).unwrap(), PinOutcome::Unlocked);

    for _ in 0..4 {
        app.pin().record_failure(t0).unwrap();
    }
    match app.pin().submit("0000", t0 + Duration::seconds(5)).unwrap() {
        PinOutcome::Rejected { attempts, lockout, .. } => {
            assert_eq!(attempts, 5);
            assert_eq!(lockout, Some(Duration::seconds(30)));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn oversized_conversion_is_rejected() {
    let (_, _, mut app) = tracker();
    app.refresh_exchange_rate().await.unwrap();
    assert!(matches!(
        app.convert(Decimal::MAX, ConversionDirection::AToB).unwrap_err(),
        CoreError::ValidationError(_)
    ));
    assert_eq!(app.convert(dec!(1), ConversionDirection::AToB).unwrap(), dec!(89500));
}

#[test]
fn app_lock_follows_foreground_and_pin() {
    let (_, _, app) = tracker();
    let t0 = june(1, 8);
    app.pin().set_pin("2468").unwrap();

    // off by default: nothing to unlock
    assert!(!app.on_foreground().unwrap());

    assert!(app.app_lock().toggle().unwrap());
    assert!(app.on_foreground().unwrap());
    assert!(app.app_lock().is_locked().unwrap());

    assert!(matches!(app.submit_pin("1111", t0).unwrap(), PinOutcome::Rejected { .. }));
    assert!(app.app_lock().is_locked().unwrap());
    assert_eq!(app.submit_pin("2468", t0).unwrap(), PinOutcome::Unlocked);
    assert!(!app.app_lock().is_locked().unwrap());
    assert!(!app.on_foreground().unwrap());

    app.on_background();
    assert!(app.on_foreground().unwrap());
}

#[test]
fn with_http_validates_settings() {
    let store = Arc::new(MemoryStore::new());
    assert!(ExpenseTracker::with_http(Settings::default(), store.clone(), Arc::new(LogNotifier)).is_ok());

    let bad = Settings {
        cache_window_secs: 0,
        ..Settings::default()
    };
    assert!(matches!(
        ExpenseTracker::with_http(bad, store, Arc::new(LogNotifier)).unwrap_err(),
        CoreError::ValidationError(_)
    ));
}
