//! Race-safe coordinator for a live search input.
//!
//! Keystrokes produce overlapping catalog calls with no ordering
//! guarantee; [`SearchFeed`] applies the same last-write-wins token
//! discipline the session reconciler uses, so observers only ever see the
//! newest submission's result. Stale responses are dropped, a resubmitted
//! identical query is skipped outright, and blank input resets to idle
//! without touching the catalog.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::debug;

use super::{MovieCatalog, SearchPage};

/// Observable state of one search box.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchState {
    /// The query this state belongs to; empty when idle.
    pub query: String,

    /// True from submission until that submission's result lands.
    pub searching: bool,

    /// Most recent result page, kept visible while a newer search runs.
    pub page: Option<SearchPage>,

    /// Display message of the last failure, cleared on the next submit.
    pub error: Option<String>,
}

struct FeedShared {
    catalog: Arc<dyn MovieCatalog>,
    tx: watch::Sender<SearchState>,
    /// Token of the newest submission; only its result may publish.
    latest: AtomicU64,
    /// Last non-blank query submitted, for duplicate suppression.
    last_query: Mutex<Option<String>>,
}

/// Handle to a search feed. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SearchFeed {
    shared: Arc<FeedShared>,
}

impl SearchFeed {
    pub fn new(catalog: Arc<dyn MovieCatalog>) -> Self {
        let (tx, _rx) = watch::channel(SearchState::default());
        Self {
            shared: Arc::new(FeedShared {
                catalog,
                tx,
                latest: AtomicU64::new(0),
                last_query: Mutex::new(None),
            }),
        }
    }

    /// Submit a query.
    ///
    /// Blank input invalidates any in-flight search and resets to idle.
    /// A query equal to the last submitted one is skipped. Anything else
    /// starts page 1 of a fresh search; must be called from within a
    /// Tokio runtime.
    pub fn submit(&self, query: &str) {
        let query = query.trim().to_string();
        if query.is_empty() {
            self.shared.latest.fetch_add(1, Ordering::SeqCst);
            *self.shared.last_query.lock().unwrap() = None;
            self.shared.tx.send_replace(SearchState::default());
            return;
        }

        {
            let mut last = self.shared.last_query.lock().unwrap();
            if last.as_deref() == Some(query.as_str()) {
                debug!(query, "duplicate query skipped");
                return;
            }
            *last = Some(query.clone());
        }
        self.start_search(query, 1);
    }

    /// Fetch another page of the current query under the same token
    /// discipline; a stale page load loses to any newer submission.
    pub fn load_page(&self, page: u32) {
        let query = self.shared.last_query.lock().unwrap().clone();
        let Some(query) = query else {
            return;
        };
        self.start_search(query, page);
    }

    /// Current state.
    pub fn snapshot(&self) -> SearchState {
        self.shared.tx.borrow().clone()
    }

    /// Watch the feed; the receiver always holds the latest state.
    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.shared.tx.subscribe()
    }

    fn start_search(&self, query: String, page: u32) {
        let token = self.shared.latest.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.tx.send_modify(|state| {
            state.query = query.clone();
            state.searching = true;
            state.error = None;
        });

        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            let result = shared.catalog.search(&query, page).await;
            let published = shared.tx.send_if_modified(|state| {
                if shared.latest.load(Ordering::SeqCst) != token {
                    return false;
                }
                state.searching = false;
                match &result {
                    Ok(found) => {
                        state.page = Some(found.clone());
                        state.error = None;
                    }
                    Err(e) => {
                        state.error = Some(e.to_string());
                    }
                }
                true
            });
            if !published {
                debug!(query, token, "stale search result discarded");
            }
        });
    }
}
