use chrono::{DateTime, Duration, Utc};

/// Default staleness window for fetched feeds, in seconds (5 minutes).
pub const DEFAULT_WINDOW_SECS: i64 = 300;

/// Decide whether a feed must be re-fetched.
///
/// True when `force` is set, when nothing has been loaded yet, or when the
/// last successful fetch is older than `window`. A fetch exactly `window`
/// old still counts as fresh.
pub fn needs_fetch(
    loaded: bool,
    last_fetch_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    force: bool,
    window: Duration,
) -> bool {
    if force || !loaded {
        return true;
    }
    match last_fetch_at {
        Some(at) => now - at > window,
        None => true,
    }
}

/// Freshness bookkeeping for one feed (transactions, summary, a monthly
/// report...). Each feed owns its own window; forcing one never touches
/// another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheWindow {
    loaded: bool,
    last_fetch_at: Option<DateTime<Utc>>,
    window: Duration,
}

impl Default for CacheWindow {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_WINDOW_SECS))
    }
}

impl CacheWindow {
    pub fn new(window: Duration) -> Self {
        Self {
            loaded: false,
            last_fetch_at: None,
            window,
        }
    }

    pub fn needs_fetch(&self, now: DateTime<Utc>, force: bool) -> bool {
        needs_fetch(self.loaded, self.last_fetch_at, now, force, self.window)
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        !self.needs_fetch(now, false)
    }

    /// Call after a successful fetch.
    pub fn record_success(&mut self, now: DateTime<Utc>) {
        self.loaded = true;
        self.last_fetch_at = Some(now);
    }

    /// Mark the feed stale so the next load goes to the network, e.g. after
    /// a mutation the cached copy no longer reflects.
    pub fn invalidate(&mut self) {
        self.loaded = false;
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn last_fetch_at(&self) -> Option<DateTime<Utc>> {
        self.last_fetch_at
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

/// A cached value together with its freshness window.
///
/// A failed fetch leaves both the previous value and its timestamp alone,
/// so a transient error never throws away good data.
#[derive(Debug, Clone)]
pub struct CachedFeed<T> {
    value: Option<T>,
    window: CacheWindow,
}

impl<T> CachedFeed<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            value: None,
            window: CacheWindow::new(window),
        }
    }

    pub fn needs_fetch(&self, now: DateTime<Utc>, force: bool) -> bool {
        self.window.needs_fetch(now, force)
    }

    pub fn store(&mut self, value: T, now: DateTime<Utc>) {
        self.value = Some(value);
        self.window.record_success(now);
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn invalidate(&mut self) {
        self.window.invalidate();
    }

    /// Forget the value and its fetch history.
    pub fn clear(&mut self) {
        self.value = None;
        self.window = CacheWindow::new(self.window.window());
    }

    pub fn window(&self) -> &CacheWindow {
        &self.window
    }
}
