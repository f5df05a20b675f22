use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

fn zero_display() -> String {
    "$0.00".to_string()
}

/// Account totals. The server sends these pre-formatted for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(default = "zero_display")]
    pub balance: String,
    #[serde(default = "zero_display")]
    pub income: String,
    #[serde(default = "zero_display")]
    pub expenses: String,
}

impl Default for Summary {
    fn default() -> Self {
        Self {
            balance: zero_display(),
            income: zero_display(),
            expenses: zero_display(),
        }
    }
}

/// Income/expense totals for one calendar month. Any figure may be missing
/// when the month has no activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReport {
    pub year: i32,
    pub month: u32,
    #[serde(default)]
    pub income: Option<Decimal>,
    #[serde(default)]
    pub expenses: Option<Decimal>,
    #[serde(default)]
    pub balance: Option<Decimal>,
}

impl MonthlyReport {
    pub fn income_or_zero(&self) -> Decimal {
        self.income.unwrap_or_default()
    }

    pub fn expenses_or_zero(&self) -> Decimal {
        self.expenses.unwrap_or_default()
    }

    /// Reported balance, or income minus expenses when the server left it out.
    pub fn balance_or_derived(&self) -> Decimal {
        self.balance
            .unwrap_or_else(|| self.income_or_zero() - self.expenses_or_zero())
    }
}
