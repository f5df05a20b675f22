use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Progress thresholds that each trigger one notification per period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Milestone {
    Twenty,
    Fifty,
    Eighty,
    Hundred,
}

impl Milestone {
    /// All milestones, ascending.
    pub const ALL: [Milestone; 4] = [
        Milestone::Twenty,
        Milestone::Fifty,
        Milestone::Eighty,
        Milestone::Hundred,
    ];

    pub fn percent(&self) -> u8 {
        match self {
            Milestone::Twenty => 20,
            Milestone::Fifty => 50,
            Milestone::Eighty => 80,
            Milestone::Hundred => 100,
        }
    }

    pub fn from_percent(percent: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.percent() == percent)
    }
}

impl std::fmt::Display for Milestone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

/// Identifier of a goal period: `year * 100 + month`, e.g. `202411`.
pub fn period_key(year: i32, month: u32) -> i32 {
    year * 100 + month as i32
}

/// Period key of the calendar month containing `now` (UTC).
pub fn period_key_of(now: DateTime<Utc>) -> i32 {
    period_key(now.year(), now.month())
}

/// Persisted monthly-goal record. One per installation.
///
/// `notified` maps a milestone percent to the period key it was last
/// notified for. It is emptied whenever the period changes or the goal is
/// deleted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GoalState {
    pub goal_amount: Option<Decimal>,
    pub period_month: Option<u32>,
    pub period_year: Option<i32>,
    pub period_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notified: BTreeMap<u8, i32>,
}

impl GoalState {
    /// Fresh period starting at `now` for the given goal amount.
    pub fn started(goal_amount: Decimal, now: DateTime<Utc>) -> Self {
        Self {
            goal_amount: Some(goal_amount),
            period_month: Some(now.month()),
            period_year: Some(now.year()),
            period_start: Some(now),
            notified: BTreeMap::new(),
        }
    }

    /// Stored period as `(month, year)` if one is set.
    pub fn period(&self) -> Option<(u32, i32)> {
        self.period_month.zip(self.period_year)
    }

    pub fn period_key(&self) -> Option<i32> {
        self.period().map(|(month, year)| period_key(year, month))
    }

    pub fn notified_for(&self, milestone: Milestone) -> Option<i32> {
        self.notified.get(&milestone.percent()).copied()
    }

    pub fn is_notified(&self, milestone: Milestone, key: i32) -> bool {
        self.notified_for(milestone) == Some(key)
    }
}

/// Colour band for the progress indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressLevel {
    /// Below 50%.
    OnTrack,
    /// 50% to 79%.
    Warning,
    /// 80% and above.
    Critical,
}

impl ProgressLevel {
    pub fn from_percent(percent: i64) -> Self {
        match percent {
            p if p < 50 => ProgressLevel::OnTrack,
            p if p < 80 => ProgressLevel::Warning,
            _ => ProgressLevel::Critical,
        }
    }
}

/// Result of one goal refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalProgress {
    pub goal: Decimal,
    pub spend: Decimal,
    /// Unclamped; exceeds 100 when over budget.
    pub percent: i64,
    /// `percent` clamped to 0..=100 for progress bars.
    pub display_percent: u8,
    /// `goal - spend`; negative when overspent.
    pub remaining: Decimal,
    pub exceeded: bool,
    pub level: ProgressLevel,
    /// Milestones notified during this refresh, ascending.
    pub fired: Vec<Milestone>,
    /// Non-fatal problem met while refreshing (e.g. transactions could not
    /// be fetched, so spend was taken as zero).
    pub warning: Option<String>,
}
