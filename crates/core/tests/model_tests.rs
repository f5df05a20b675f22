// ═══════════════════════════════════════════════════════════════════
// Model Tests — transactions, auth/report/exchange shapes, goal and
// PIN records, settings
// ═══════════════════════════════════════════════════════════════════

use chrono::{TimeZone, Utc};
use rust_decimal_macros::dec;

use expense_tracker_core::errors::CoreError;
use expense_tracker_core::models::auth::{ChangePasswordRequest, SignupResponse};
use expense_tracker_core::models::exchange::ExchangeRate;
use expense_tracker_core::models::goal::{period_key, period_key_of, GoalState, Milestone, ProgressLevel};
use expense_tracker_core::models::pin::{PinAttemptState, PinSecret};
use expense_tracker_core::models::report::{MonthlyReport, Summary};
use expense_tracker_core::models::settings::{Settings, DEFAULT_API_BASE_URL};
use expense_tracker_core::models::transaction::{
    parse_timestamp, sort_newest_first, NewTransaction, Transaction, TransactionKind,
};

// ═══════════════════════════════════════════════════════════════════
// Transactions
// ═══════════════════════════════════════════════════════════════════

mod transaction {
    use super::*;

    fn from_json(raw: &str) -> Transaction {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn deserialize_server_shape() {
        let t = from_json(
            r#"{"id":7,"amount":12.5,"category":"expense","type":"expense",
                "title":"Coffee","created_at":"2025-11-05T15:30:00.000Z",
                "date":"2025-11-05","user_id":"u1"}"#,
        );
        assert_eq!(t.id, 7);
        assert_eq!(t.amount, dec!(12.5));
        assert_eq!(t.kind.as_deref(), Some("expense"));
        assert_eq!(t.date.as_deref(), Some("2025-11-05"));
        assert!(t.is_expense());
    }

    #[test]
    fn optional_fields_default() {
        let t = from_json(r#"{"id":1,"amount":3,"created_at":"2025-01-01T00:00:00Z"}"#);
        assert_eq!(t.category, "");
        assert_eq!(t.kind, None);
        assert!(!t.is_expense());
    }

    #[test]
    fn expense_marker_in_either_field() {
        let by_category = from_json(r#"{"id":1,"amount":3,"category":"EXPENSE","created_at":"x"}"#);
        assert!(by_category.is_expense());

        let by_type = from_json(r#"{"id":2,"amount":3,"category":"Food","type":"Expense","created_at":"x"}"#);
        assert!(by_type.is_expense());

        let income = from_json(r#"{"id":3,"amount":3,"category":"expense","type":"income","created_at":"x"}"#);
        assert!(!income.is_expense());
    }

    #[test]
    fn kind_parse_is_case_insensitive() {
        assert_eq!(TransactionKind::parse(" Income "), Some(TransactionKind::Income));
        assert_eq!(TransactionKind::parse("EXPENSE"), Some(TransactionKind::Expense));
        assert_eq!(TransactionKind::parse("transfer"), None);
        assert_eq!(TransactionKind::Expense.to_string(), "expense");
    }

    #[test]
    fn timestamps() {
        let utc = Utc.with_ymd_and_hms(2025, 11, 5, 15, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2025-11-05T15:30:00Z").unwrap(), utc);
        assert_eq!(parse_timestamp("2025-11-05T15:30:00.000Z").unwrap(), utc);
        assert_eq!(parse_timestamp("2025-11-05T17:30:00+02:00").unwrap(), utc);
        assert_eq!(parse_timestamp("2025-11-05T15:30:00").unwrap(), utc);
        assert!(matches!(parse_timestamp("05/11/2025").unwrap_err(), CoreError::Parse(_)));
    }

    #[test]
    fn created_day_falls_back_to_date_prefix() {
        let t = from_json(r#"{"id":1,"amount":3,"created_at":"2025-11-05T25:99:00"}"#);
        assert_eq!(
            t.created_day().unwrap(),
            chrono::NaiveDate::from_ymd_opt(2025, 11, 5).unwrap()
        );
        let bad = from_json(r#"{"id":2,"amount":3,"created_at":"soon"}"#);
        assert!(bad.created_day().is_err());
    }

    #[test]
    fn sort_puts_unparseable_last() {
        let mut list = vec![
            from_json(r#"{"id":1,"amount":1,"created_at":"bogus"}"#),
            from_json(r#"{"id":2,"amount":1,"created_at":"2025-01-02T00:00:00Z"}"#),
            from_json(r#"{"id":3,"amount":1,"created_at":"2025-03-01T00:00:00Z"}"#),
        ];
        sort_newest_first(&mut list);
        let ids: Vec<i64> = list.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn new_transaction_body() {
        let body = NewTransaction::new(dec!(20), TransactionKind::Income, "Salary");
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["category"], "income");
        assert_eq!(json["title"], "Salary");
        assert!(body.validate().is_ok());
    }

    #[test]
    fn new_transaction_validation() {
        assert!(NewTransaction::new(dec!(-1), TransactionKind::Expense, "x").validate().is_err());
        assert!(NewTransaction::new(dec!(1), TransactionKind::Expense, "").validate().is_err());
    }
}

// ═══════════════════════════════════════════════════════════════════
// Auth, report and exchange shapes
// ═══════════════════════════════════════════════════════════════════

mod wire_shapes {
    use super::*;

    #[test]
    fn signup_message_only() {
        let r: SignupResponse = serde_json::from_str(r#"{"message":"Email already registered"}"#).unwrap();
        assert_eq!(r.token, None);
        assert_eq!(r.user, None);
        assert_eq!(r.message.as_deref(), Some("Email already registered"));
    }

    #[test]
    fn change_password_is_camel_case() {
        let body = ChangePasswordRequest {
            old_password: "a".into(),
            new_password: "b".into(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["oldPassword"], "a");
        assert_eq!(json["newPassword"], "b");
    }

    #[test]
    fn summary_defaults() {
        let s: Summary = serde_json::from_str(r#"{"balance":"$12.00"}"#).unwrap();
        assert_eq!(s.balance, "$12.00");
        assert_eq!(s.income, "$0.00");
        assert_eq!(s.expenses, "$0.00");
    }

    #[test]
    fn monthly_report_derives_balance() {
        let r: MonthlyReport = serde_json::from_str(r#"{"year":2025,"month":2,"income":500,"expenses":120.5}"#).unwrap();
        assert_eq!(r.balance_or_derived(), dec!(379.5));

        let empty: MonthlyReport = serde_json::from_str(r#"{"year":2025,"month":2}"#).unwrap();
        assert_eq!(empty.income_or_zero(), dec!(0));
        assert_eq!(empty.balance_or_derived(), dec!(0));
    }

    #[test]
    fn exchange_rate_body() {
        let r: ExchangeRate = serde_json::from_str(
            r#"{"base":"USD","target":"LBP","rate":89500.5,"last_updated":"2025-06-01","success":true}"#,
        )
        .unwrap();
        assert_eq!(r.rate, dec!(89500.5));
        assert!(r.success);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Goal & PIN records
// ═══════════════════════════════════════════════════════════════════

mod goal_records {
    use super::*;

    #[test]
    fn milestone_percents() {
        let percents: Vec<u8> = Milestone::ALL.iter().map(Milestone::percent).collect();
        assert_eq!(percents, vec![20, 50, 80, 100]);
        assert_eq!(Milestone::from_percent(80), Some(Milestone::Eighty));
        assert_eq!(Milestone::from_percent(75), None);
        assert_eq!(Milestone::Fifty.to_string(), "50%");
    }

    #[test]
    fn period_keys() {
        assert_eq!(period_key(2024, 11), 202411);
        let now = Utc.with_ymd_and_hms(2025, 1, 31, 23, 59, 59).unwrap();
        assert_eq!(period_key_of(now), 202501);
    }

    #[test]
    fn started_state() {
        let now = Utc.with_ymd_and_hms(2025, 7, 4, 10, 0, 0).unwrap();
        let state = GoalState::started(dec!(300), now);
        assert_eq!(state.period(), Some((7, 2025)));
        assert_eq!(state.period_key(), Some(202507));
        assert!(state.notified.is_empty());
        assert!(!state.is_notified(Milestone::Twenty, 202507));
    }

    #[test]
    fn state_json_round_trip() {
        let now = Utc.with_ymd_and_hms(2025, 7, 4, 10, 0, 0).unwrap();
        let mut state = GoalState::started(dec!(300), now);
        state.notified.insert(50, 202507);

        let raw = serde_json::to_string(&state).unwrap();
        let back: GoalState = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, state);
        assert_eq!(back.notified_for(Milestone::Fifty), Some(202507));
    }

    #[test]
    fn empty_state_deserializes() {
        let state: GoalState = serde_json::from_str(
            r#"{"goal_amount":null,"period_month":null,"period_year":null,"period_start":null}"#,
        )
        .unwrap();
        assert_eq!(state, GoalState::default());
        assert_eq!(state.period(), None);
    }

    #[test]
    fn progress_level_bands() {
        assert_eq!(ProgressLevel::from_percent(0), ProgressLevel::OnTrack);
        assert_eq!(ProgressLevel::from_percent(49), ProgressLevel::OnTrack);
        assert_eq!(ProgressLevel::from_percent(50), ProgressLevel::Warning);
        assert_eq!(ProgressLevel::from_percent(79), ProgressLevel::Warning);
        assert_eq!(ProgressLevel::from_percent(80), ProgressLevel::Critical);
        assert_eq!(ProgressLevel::from_percent(250), ProgressLevel::Critical);
    }

    #[test]
    fn pin_records_round_trip() {
        let attempts = PinAttemptState {
            failed_attempts: 6,
            lockout_until: Some(Utc.with_ymd_and_hms(2025, 7, 4, 10, 0, 30).unwrap()),
        };
        let raw = serde_json::to_string(&attempts).unwrap();
        assert_eq!(serde_json::from_str::<PinAttemptState>(&raw).unwrap(), attempts);

        let secret = PinSecret {
            salt: [1u8; 16],
            hash: [2u8; 32],
        };
        let raw = serde_json::to_string(&secret).unwrap();
        assert_eq!(serde_json::from_str::<PinSecret>(&raw).unwrap(), secret);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Settings
// ═══════════════════════════════════════════════════════════════════

mod settings {
    use super::*;

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(s.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(s.connect_timeout(), std::time::Duration::from_secs(30));
        assert_eq!(s.request_timeout(), std::time::Duration::from_secs(30));
        assert_eq!(s.cache_window(), chrono::Duration::minutes(5));
        assert!(s.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let s = Settings::from_json(r#"{"cache_window_secs":60,"target_currency":"EUR"}"#).unwrap();
        assert_eq!(s.cache_window(), chrono::Duration::minutes(1));
        assert_eq!(s.target_currency, "EUR");
        assert_eq!(s.base_currency, "USD");
    }

    #[test]
    fn invalid_values_rejected() {
        assert!(matches!(
            Settings::from_json(r#"{"api_base_url":"  "}"#).unwrap_err(),
            CoreError::ValidationError(_)
        ));
        assert!(Settings::from_json(r#"{"request_timeout_secs":0}"#).is_err());
        assert!(Settings::from_json("not json").is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"api_base_url":"http://localhost:3000/api"}"#).unwrap();
        let s = Settings::load(&path).unwrap();
        assert_eq!(s.api_base_url, "http://localhost:3000/api");
    }
}
