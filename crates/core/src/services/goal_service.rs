use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

use crate::api::traits::ExpenseApi;
use crate::errors::CoreError;
use crate::models::goal::{period_key_of, GoalProgress, GoalState, Milestone, ProgressLevel};
use crate::models::transaction::Transaction;
use crate::services::notification::{milestone_notification, Notifier};
use crate::services::session_service::SessionService;
use crate::storage::store::{keys, load_json, save_json, SecureStore};

// ── Pure progress logic ─────────────────────────────────────────────

/// True iff a period is stored and it is not `(current_month, current_year)`.
pub fn should_rollover(state: &GoalState, current_month: u32, current_year: i32) -> bool {
    match state.period() {
        Some((month, year)) => month != current_month || year != current_year,
        None => false,
    }
}

/// Sum of expense amounts counted against the goal.
///
/// A transaction counts when it is an expense, its creation day lies in
/// `[period_start's day, now's day]`, and it falls in `now`'s calendar
/// month. Transactions whose date cannot be parsed are skipped.
/// Zero when there is no goal or no transaction list. The total saturates
/// at `Decimal::MAX`.
pub fn compute_spend(
    goal: Option<Decimal>,
    transactions: Option<&[Transaction]>,
    period_start: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Decimal {
    let (Some(_), Some(transactions)) = (goal, transactions) else {
        return Decimal::ZERO;
    };

    let from = period_start.date_naive();
    let to = now.date_naive();

    transactions
        .iter()
        .filter(|t| t.is_expense())
        .filter_map(|t| match t.created_day() {
            Ok(day) => Some((t, day)),
            Err(e) => {
                log::warn!("Skipping transaction {} in spend total: {e}", t.id);
                None
            }
        })
        .filter(|(_, day)| *day >= from && *day <= to)
        .filter(|(_, day)| day.year() == now.year() && day.month() == now.month())
        .fold(Decimal::ZERO, |total, (t, _)| total.saturating_add(t.amount))
}

/// `floor(spend / goal * 100)`, or 0 when `goal` is not positive.
/// Not clamped: 120 means 20% over budget. A ratio too large for `Decimal`
/// or `i64` saturates at `i64::MAX` (or `i64::MIN` for negative spend).
pub fn progress_percent(spend: Decimal, goal: Decimal) -> i64 {
    if goal <= Decimal::ZERO {
        return 0;
    }
    let saturated = if spend.is_sign_negative() { i64::MIN } else { i64::MAX };
    spend
        .checked_div(goal)
        .and_then(|ratio| ratio.checked_mul(dec!(100)))
        .and_then(|percent| percent.floor().to_i64())
        .unwrap_or(saturated)
}

/// Clamp a progress value into `0..=100` for a progress bar.
pub fn display_percent(percent: i64) -> u8 {
    percent.clamp(0, 100) as u8
}

/// Milestones reached by `progress` and not yet notified for `period_key`,
/// ascending. Several may be returned at once when progress jumps.
pub fn check_milestones(state: &GoalState, progress: i64, period_key: i32) -> Vec<Milestone> {
    Milestone::ALL
        .into_iter()
        .filter(|m| progress >= i64::from(m.percent()))
        .filter(|m| !state.is_notified(*m, period_key))
        .collect()
}

fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .unwrap_or(now)
}

// ── Service ─────────────────────────────────────────────────────────

/// Monthly spending goal with one-time milestone notifications.
///
/// State is one `GoalState` record in the secure store, read and written
/// whole. The same `refresh` runs from the foreground screen and from a
/// background periodic check; the notified-milestone record keeps the two
/// from notifying twice within a period.
pub struct GoalService {
    api: Arc<dyn ExpenseApi>,
    session: SessionService,
    store: Arc<dyn SecureStore>,
    notifier: Arc<dyn Notifier>,
}

impl GoalService {
    pub fn new(
        api: Arc<dyn ExpenseApi>,
        session: SessionService,
        store: Arc<dyn SecureStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            api,
            session,
            store,
            notifier,
        }
    }

    /// Current record; an empty default when no goal was ever saved.
    pub fn state(&self) -> Result<GoalState, CoreError> {
        load_json(self.store.as_ref(), keys::GOAL_STATE)
            .map(Option::unwrap_or_default)
            .inspect_err(|e| log::error!("Failed to read goal state: {e}"))
    }

    fn save_state(&self, state: &GoalState) -> Result<(), CoreError> {
        save_json(self.store.as_ref(), keys::GOAL_STATE, state)
            .inspect_err(|e| log::error!("Failed to write goal state: {e}"))
    }

    /// Set the monthly goal and start a fresh period at `now`.
    pub fn save_goal(&self, amount: Decimal, now: DateTime<Utc>) -> Result<(), CoreError> {
        if amount <= Decimal::ZERO {
            return Err(CoreError::ValidationError(
                "Goal amount must be greater than zero".into(),
            ));
        }
        let state = GoalState::started(amount, now);
        self.save_state(&state)?;
        log::info!("Goal saved: {amount} for {}/{}", now.month(), now.year());
        Ok(())
    }

    pub fn goal_amount(&self) -> Result<Option<Decimal>, CoreError> {
        Ok(self.state()?.goal_amount)
    }

    pub fn should_rollover(&self, current_month: u32, current_year: i32) -> Result<bool, CoreError> {
        Ok(should_rollover(&self.state()?, current_month, current_year))
    }

    /// Move the goal into `now`'s month: new period, empty notified set,
    /// `period_start = now`. Callers gate this with `should_rollover`.
    pub fn rollover(&self, now: DateTime<Utc>) -> Result<(), CoreError> {
        let mut state = self.state()?;
        if let Some((month, year)) = state.period() {
            log::info!("Goal period {month}/{year} -> {}/{}", now.month(), now.year());
        }
        state.period_month = Some(now.month());
        state.period_year = Some(now.year());
        state.period_start = Some(now);
        state.notified.clear();
        self.save_state(&state)
    }

    pub fn check_milestones(&self, progress: i64, period_key: i32) -> Result<Vec<Milestone>, CoreError> {
        Ok(check_milestones(&self.state()?, progress, period_key))
    }

    /// Record that `milestone` was notified for `period_key`.
    pub fn mark_notified(&self, milestone: Milestone, period_key: i32) -> Result<(), CoreError> {
        let mut state = self.state()?;
        state.notified.insert(milestone.percent(), period_key);
        self.save_state(&state)?;
        log::debug!("Marked {milestone} milestone as notified for {period_key}");
        Ok(())
    }

    /// Remove the goal and everything tracked for it.
    pub fn delete_goal(&self) -> Result<(), CoreError> {
        self.store
            .remove(keys::GOAL_STATE)
            .inspect_err(|e| log::error!("Failed to delete goal: {e}"))?;
        log::info!("Goal deleted");
        Ok(())
    }

    async fn fetch_transactions(&self) -> Result<Vec<Transaction>, CoreError> {
        let token = self.session.require_token()?;
        self.api.get_transactions(&token).await
    }

    /// Full progress cycle: roll the period over if the month changed,
    /// total this period's expenses, and notify each newly reached
    /// milestone exactly once.
    ///
    /// Returns `Ok(None)` when no goal is set. If transactions cannot be
    /// fetched, spend is taken as zero and the reason is put in
    /// `GoalProgress::warning`.
    pub async fn refresh(&self, now: DateTime<Utc>) -> Result<Option<GoalProgress>, CoreError> {
        let mut state = self.state()?;
        if should_rollover(&state, now.month(), now.year()) {
            self.rollover(now)?;
            state = self.state()?;
        }

        let Some(goal) = state.goal_amount.filter(|g| *g > Decimal::ZERO) else {
            log::debug!("No goal set - skipping milestone checks");
            return Ok(None);
        };

        let (transactions, warning) = match self.fetch_transactions().await {
            Ok(list) => (Some(list), None),
            Err(e) => {
                log::warn!("Could not fetch transactions for goal progress: {e}");
                (None, Some(e.to_string()))
            }
        };

        let period_start = state.period_start.unwrap_or_else(|| start_of_month(now));
        let spend = compute_spend(Some(goal), transactions.as_deref(), period_start, now);
        let percent = progress_percent(spend, goal);
        log::debug!("Goal progress: {percent}% ({spend} / {goal})");

        let key = period_key_of(now);
        let due = check_milestones(&state, percent, key);
        for milestone in &due {
            let notification = milestone_notification(*milestone, goal, spend);
            if let Err(e) = self.notifier.notify(&notification) {
                log::warn!("Milestone {milestone} notification not delivered: {e}");
            }
            self.mark_notified(*milestone, key)?;
        }

        Ok(Some(GoalProgress {
            goal,
            spend,
            percent,
            display_percent: display_percent(percent),
            remaining: goal.saturating_sub(spend),
            exceeded: spend > goal,
            level: ProgressLevel::from_percent(percent),
            fired: due,
            warning,
        }))
    }
}
