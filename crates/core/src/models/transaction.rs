use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Direction of money flow for a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    /// Case-insensitive parse of `"income"` / `"expense"`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("income") {
            Some(TransactionKind::Income)
        } else if raw.eq_ignore_ascii_case("expense") {
            Some(TransactionKind::Expense)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transaction as returned by the remote API.
///
/// The server is not consistent about where it puts the income/expense
/// marker: older records carry it in `category`, newer ones in `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub amount: Decimal,
    #[serde(default)]
    pub category: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub title: String,
    /// ISO-8601 UTC timestamp, e.g. `2025-11-05T15:30:00.000Z`.
    pub created_at: String,
    /// Calendar date `YYYY-MM-DD`, when the server provides one.
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl Transaction {
    /// True if either `type` or `category` says "expense" (any case).
    pub fn is_expense(&self) -> bool {
        self.kind
            .as_deref()
            .and_then(TransactionKind::parse)
            .or_else(|| TransactionKind::parse(&self.category))
            == Some(TransactionKind::Expense)
    }

    /// Parse `created_at` as a UTC instant.
    ///
    /// Accepts RFC 3339 (with or without fractional seconds) and the
    /// zone-less `YYYY-MM-DDTHH:MM:SS[.fff]` form, read as UTC.
    pub fn created_at_utc(&self) -> Result<DateTime<Utc>, CoreError> {
        parse_timestamp(&self.created_at)
    }

    /// The calendar day the transaction was created on (UTC).
    ///
    /// Falls back to the leading `YYYY-MM-DD` of `created_at` when the full
    /// timestamp does not parse.
    pub fn created_day(&self) -> Result<NaiveDate, CoreError> {
        if let Ok(ts) = self.created_at_utc() {
            return Ok(ts.date_naive());
        }
        let day_part = self.created_at.split('T').next().unwrap_or_default();
        NaiveDate::parse_from_str(day_part.trim(), "%Y-%m-%d")
            .map_err(|_| CoreError::Parse(format!("transaction date '{}'", self.created_at)))
    }
}

/// Parse an ISO-8601 timestamp into UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, CoreError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| CoreError::Parse(format!("timestamp '{raw}'")))
}

/// Sort newest first by `created_at`. Records whose timestamp does not
/// parse sort as the Unix epoch, i.e. last.
pub fn sort_newest_first(transactions: &mut [Transaction]) {
    transactions.sort_by_cached_key(|t| {
        std::cmp::Reverse(t.created_at_utc().unwrap_or(DateTime::<Utc>::UNIX_EPOCH))
    });
}

/// Body of a create-transaction request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub amount: Decimal,
    pub category: TransactionKind,
    pub title: String,
}

impl NewTransaction {
    pub fn new(amount: Decimal, category: TransactionKind, title: impl Into<String>) -> Self {
        Self {
            amount,
            category,
            title: title.into(),
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.amount <= Decimal::ZERO {
            return Err(CoreError::ValidationError(format!(
                "Transaction amount must be greater than zero, got {}",
                self.amount
            )));
        }
        if self.title.trim().is_empty() {
            return Err(CoreError::ValidationError("Transaction title must not be empty".into()));
        }
        Ok(())
    }
}
