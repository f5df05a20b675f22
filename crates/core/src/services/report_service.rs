use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::traits::ExpenseApi;
use crate::errors::CoreError;
use crate::models::report::{MonthlyReport, Summary};
use crate::services::cache::CachedFeed;
use crate::services::session_service::SessionService;

/// Account summary and monthly reports, each behind its own cache window.
/// Monthly reports are cached per `(year, month)`; months whose window has
/// lapsed are evicted on the next monthly load.
pub struct ReportService {
    api: Arc<dyn ExpenseApi>,
    session: SessionService,
    window: Duration,
    summary: CachedFeed<Summary>,
    monthly: HashMap<(i32, u32), CachedFeed<MonthlyReport>>,
}

impl ReportService {
    pub fn new(api: Arc<dyn ExpenseApi>, session: SessionService, window: Duration) -> Self {
        Self {
            api,
            session,
            window,
            summary: CachedFeed::new(window),
            monthly: HashMap::new(),
        }
    }

    pub async fn load_summary(&mut self, now: DateTime<Utc>, force: bool) -> Result<Summary, CoreError> {
        if let Some(summary) = self.summary.get().filter(|_| !self.summary.needs_fetch(now, force)) {
            return Ok(summary.clone());
        }
        let token = self.session.require_token()?;
        let summary = self
            .api
            .get_summary(&token)
            .await
            .inspect_err(|e| log::error!("getSummary failed: {e}"))?;
        self.summary.store(summary.clone(), now);
        Ok(summary)
    }

    pub async fn load_monthly_report(
        &mut self,
        year: i32,
        month: u32,
        now: DateTime<Utc>,
        force: bool,
    ) -> Result<MonthlyReport, CoreError> {
        if !(1..=12).contains(&month) {
            return Err(CoreError::ValidationError(format!(
                "Month must be between 1 and 12, got {month}"
            )));
        }

        self.evict_stale_months((year, month), now);

        let window = self.window;
        let feed = self
            .monthly
            .entry((year, month))
            .or_insert_with(|| CachedFeed::new(window));
        if let Some(report) = feed.get().filter(|_| !feed.needs_fetch(now, force)) {
            return Ok(report.clone());
        }

        let token = self.session.require_token()?;
        log::debug!("Fetching monthly report for {year}-{month:02}");
        let report = self
            .api
            .get_monthly_report(&token, month, year)
            .await
            .inspect_err(|e| log::error!("getMonthlyReport failed for {year}-{month:02}: {e}"))?;
        feed.store(report.clone(), now);
        Ok(report)
    }

    /// Forget monthly reports other than `keep` whose window has lapsed, so
    /// the map holds at most the months viewed within one window.
    fn evict_stale_months(&mut self, keep: (i32, u32), now: DateTime<Utc>) {
        let before = self.monthly.len();
        self.monthly
            .retain(|key, feed| *key == keep || !feed.needs_fetch(now, false));
        let evicted = before - self.monthly.len();
        if evicted > 0 {
            log::debug!("Evicted {evicted} stale monthly report(s)");
        }
    }

    /// Drop freshness of every feed, e.g. after a transaction was added.
    pub fn invalidate_all(&mut self) {
        self.summary.invalidate();
        self.monthly.values_mut().for_each(CachedFeed::invalidate);
    }

    /// Drop every cached report, e.g. on logout.
    pub fn clear(&mut self) {
        self.summary.clear();
        self.monthly.clear();
    }

    pub fn summary_feed(&self) -> &CachedFeed<Summary> {
        &self.summary
    }

    pub fn monthly_feed(&self, year: i32, month: u32) -> Option<&CachedFeed<MonthlyReport>> {
        self.monthly.get(&(year, month))
    }
}
