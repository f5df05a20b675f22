use rust_decimal::Decimal;

use crate::errors::CoreError;
use crate::models::goal::Milestone;
use crate::services::currency_service::format_amount;

/// A user-visible notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Stable per-kind id; re-sending replaces the previous notification.
    pub id: u32,
    pub title: String,
    pub body: String,
}

/// Fire-and-forget notification delivery. Callers log and swallow errors.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification) -> Result<(), CoreError>;
}

/// Notifier that writes to the log. Useful headless and as a default.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), CoreError> {
        log::info!("[notification {}] {}: {}", notification.id, notification.title, notification.body);
        Ok(())
    }
}

/// Build the notification for a reached spending milestone.
pub fn milestone_notification(milestone: Milestone, goal: Decimal, spend: Decimal) -> Notification {
    let remaining = goal.saturating_sub(spend);
    let (title, body) = match milestone {
        Milestone::Twenty => (
            "20% of Monthly Goal Reached!".to_string(),
            format!(
                "You've spent ${} of your ${} goal. Keep tracking!",
                format_amount(spend),
                format_amount(goal)
            ),
        ),
        Milestone::Fifty => (
            "50% of Monthly Goal Reached!".to_string(),
            format!(
                "You're halfway there! ${} remaining in your budget.",
                format_amount(remaining)
            ),
        ),
        Milestone::Eighty => (
            "80% of Monthly Goal Reached!".to_string(),
            format!(
                "Watch out! Only ${} left in your budget for this month.",
                format_amount(remaining)
            ),
        ),
        Milestone::Hundred => {
            let body = if spend > goal {
                format!(
                    "You've exceeded your budget by ${}. Review your expenses!",
                    format_amount(spend.saturating_sub(goal))
                )
            } else {
                format!(
                    "You've reached your monthly expense goal of ${}.",
                    format_amount(goal)
                )
            };
            ("Monthly Goal Reached!".to_string(), body)
        }
    };
    Notification {
        id: 1000 + u32::from(milestone.percent()),
        title,
        body,
    }
}
