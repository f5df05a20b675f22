use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::api::traits::ExpenseApi;
use crate::errors::CoreError;
use crate::models::transaction::{sort_newest_first, NewTransaction, Transaction};
use crate::services::cache::CachedFeed;
use crate::services::session_service::SessionService;

/// Transaction history: list, create, delete, with a cached list feed.
pub struct TransactionService {
    api: Arc<dyn ExpenseApi>,
    session: SessionService,
    feed: CachedFeed<Vec<Transaction>>,
}

impl TransactionService {
    pub fn new(api: Arc<dyn ExpenseApi>, session: SessionService, window: Duration) -> Self {
        Self {
            api,
            session,
            feed: CachedFeed::new(window),
        }
    }

    /// Fetch all transactions, newest first. Bypasses the cache.
    pub async fn fetch(&self) -> Result<Vec<Transaction>, CoreError> {
        let token = self.session.require_token()?;
        let mut list = self
            .api
            .get_transactions(&token)
            .await
            .inspect_err(|e| log::error!("getTransactions failed: {e}"))?;
        sort_newest_first(&mut list);
        Ok(list)
    }

    /// Return the cached list while it is fresh, otherwise fetch it.
    /// A failed fetch keeps the previous list and its timestamp.
    pub async fn load(&mut self, now: DateTime<Utc>, force: bool) -> Result<Vec<Transaction>, CoreError> {
        if let Some(list) = self.feed.get().filter(|_| !self.feed.needs_fetch(now, force)) {
            return Ok(list.clone());
        }
        let list = self.fetch().await?;
        self.feed.store(list.clone(), now);
        Ok(list)
    }

    pub async fn create(&mut self, transaction: &NewTransaction) -> Result<Transaction, CoreError> {
        transaction.validate()?;
        let token = self.session.require_token()?;
        let created = self
            .api
            .create_transaction(&token, transaction)
            .await
            .inspect_err(|e| log::error!("createTransaction failed: {e}"))?;
        self.feed.invalidate();
        Ok(created)
    }

    pub async fn delete(&mut self, id: i64) -> Result<(), CoreError> {
        let token = self.session.require_token()?;
        self.api
            .delete_transaction(&token, id)
            .await
            .inspect_err(|e| log::error!("deleteTransaction failed for ID {id}: {e}"))?;
        self.feed.invalidate();
        Ok(())
    }

    pub fn invalidate(&mut self) {
        self.feed.invalidate();
    }

    /// Drop the cached list, e.g. on logout.
    pub fn clear(&mut self) {
        self.feed.clear();
    }

    pub fn cached(&self) -> Option<&[Transaction]> {
        self.feed.get().map(Vec::as_slice)
    }

    pub fn feed(&self) -> &CachedFeed<Vec<Transaction>> {
        &self.feed
    }
}
