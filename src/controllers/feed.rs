use std::collections::HashSet;
use std::sync::{Arc, Weak};

use tokio::sync::{mpsc, Mutex};
use tokio::time::{timeout, Duration};

use crate::entities::{InteractionKind, Prompt, UserId};
use crate::repositories::{
    InteractionRepository, PageRange, PromptQuery, PromptRepository, Result,
};

pub const PROMPTS_PER_PAGE: usize = 10;

/// quiet period after the last keystroke before the store is queried.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(1000);

/// which slice of the prompt table a feed shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedScope {
    /// everything, newest first. the main page.
    Recent,
    /// prompts the user published. the profile's "created" tab.
    OwnedBy(UserId),
    /// prompts the user liked/bookmarked, resolved through the edge
    /// table. the profile's other two tabs.
    MarkedBy(InteractionKind, UserId),
}

/// read surface handed to the rendering layer.
#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    pub items: Vec<Prompt>,
    pub page: u32,
    pub search_term: String,
    pub loading: bool,
    pub can_prev: bool,
    pub can_next: bool,
}

struct FeedState {
    search_term: String,
    page: u32,
    items: Vec<Prompt>,
    loading: bool,
    /// row count of the most recent successful fetch. `None` until one
    /// lands; a short page means there is no next page to walk to.
    last_fetch_len: Option<usize>,
}

/// message to the debounce worker.
enum DebounceSignal {
    /// a keystroke landed; (re)start the quiet window.
    Nudge,
    /// the term went away; disarm any pending window without fetching.
    Cancel,
}

/// owner of the paginated, searchable prompt window.
///
/// keystrokes land in state immediately but only nudge the debounce
/// worker; page moves and empty terms fetch at once. in-flight fetches
/// are never cancelled, so a slow earlier response can overwrite a
/// faster later one -- only the debounce window arbitrates which query
/// is issued last.
pub struct FeedController {
    prompt_repository: Arc<dyn PromptRepository + Sync + Send>,
    interaction_repository: Arc<dyn InteractionRepository + Sync + Send>,
    scope: FeedScope,
    state: Mutex<FeedState>,
    debounce_tx: mpsc::UnboundedSender<DebounceSignal>,
}

impl FeedController {
    pub fn new(
        prompt_repository: Arc<dyn PromptRepository + Sync + Send>,
        interaction_repository: Arc<dyn InteractionRepository + Sync + Send>,
        scope: FeedScope,
    ) -> Arc<Self> {
        let (debounce_tx, rx) = mpsc::unbounded_channel();

        let this = Arc::new(Self {
            prompt_repository,
            interaction_repository,
            scope,
            state: Mutex::new(FeedState {
                search_term: String::new(),
                page: 1,
                items: vec![],
                loading: false,
                last_fetch_len: None,
            }),
            debounce_tx,
        });

        tokio::spawn(debounce_worker(Arc::downgrade(&this), rx));

        this
    }

    pub async fn snapshot(&self) -> FeedSnapshot {
        let state = self.state.lock().await;

        FeedSnapshot {
            items: state.items.clone(),
            page: state.page,
            search_term: state.search_term.clone(),
            loading: state.loading,
            can_prev: state.page > 1,
            can_next: state.last_fetch_len == Some(PROMPTS_PER_PAGE),
        }
    }

    /// records the typed term at once; the remote query waits for the
    /// debounce window, except a cleared term which disarms the window
    /// and fetches immediately.
    pub async fn set_search_term(&self, term: impl Into<String>) {
        let term = term.into();
        let cleared = term.is_empty();

        self.state.lock().await.search_term = term;

        // worker gone means the controller is being torn down
        match cleared {
            true => {
                let _ = self.debounce_tx.send(DebounceSignal::Cancel);
                self.refetch().await;
            },
            false => {
                let _ = self.debounce_tx.send(DebounceSignal::Nudge);
            },
        }
    }

    /// page moves bypass the debounce window.
    pub async fn set_page(&self, page: u32) {
        self.state.lock().await.page = page.max(1);
        self.refetch().await;
    }

    /// walks forward unless the last fetched page was short.
    pub async fn next_page(&self) -> bool {
        {
            let mut state = self.state.lock().await;
            if state.last_fetch_len != Some(PROMPTS_PER_PAGE) {
                return false;
            }
            state.page += 1;
        }

        self.refetch().await;
        true
    }

    /// walks back unless already at page 1.
    pub async fn prev_page(&self) -> bool {
        {
            let mut state = self.state.lock().await;
            if state.page <= 1 {
                return false;
            }
            state.page -= 1;
        }

        self.refetch().await;
        true
    }

    /// queries the store for the current (scope, term, page) window.
    ///
    /// the shown items stay in place until a result lands; a failed fetch
    /// keeps the last good page and only logs.
    pub async fn refetch(&self) {
        let (term, page) = {
            let mut state = self.state.lock().await;
            state.loading = true;
            (state.search_term.clone(), state.page)
        };

        let res = self.fetch_window(&term, page).await;

        let mut state = self.state.lock().await;
        match res {
            Ok(items) => {
                state.last_fetch_len = Some(items.len());
                state.items = items;
            },
            Err(e) => tracing::warn!("feed fetch failed, keeping current page: {}", e),
        }
        state.loading = false;
    }

    async fn fetch_window(&self, term: &str, page: u32) -> Result<Vec<Prompt>> {
        let mut query = PromptQuery {
            range: Some(PageRange::of_page(page, PROMPTS_PER_PAGE)),
            ..Default::default()
        };

        if !term.is_empty() {
            match PromptQuery::term_pattern(term) {
                Ok(r) => query.search = Some(r),
                // unreachable with an escaped term; drop the filter rather
                // than fail the fetch
                Err(e) => tracing::warn!("unusable search term {:?}: {}", term, e),
            }
        }

        match self.scope {
            FeedScope::Recent => (),
            FeedScope::OwnedBy(user_id) => query.owner = Some(user_id),
            FeedScope::MarkedBy(kind, user_id) => {
                let ids = self.interaction_repository.marks_of(kind, user_id).await?;
                query.ids = Some(ids.into_iter().collect::<HashSet<_>>());
            },
        }

        self.prompt_repository.finds(query).await
    }
}

/// collapses bursts of keystroke nudges into one `refetch` per quiet
/// window. holds only a weak handle so dropping the controller's last
/// user ends the task via the closed channel.
async fn debounce_worker(
    this: Weak<FeedController>,
    mut rx: mpsc::UnboundedReceiver<DebounceSignal>,
) {
    'idle: while let Some(sig) = rx.recv().await {
        if let DebounceSignal::Cancel = sig {
            continue;
        }

        loop {
            match timeout(SEARCH_DEBOUNCE, rx.recv()).await {
                // another keystroke: the window restarts
                Ok(Some(DebounceSignal::Nudge)) => continue,
                Ok(Some(DebounceSignal::Cancel)) => continue 'idle,
                Ok(None) => return,
                Err(_elapsed) => break,
            }
        }

        match this.upgrade() {
            Some(c) => c.refetch().await,
            None => return,
        }
    }
}
