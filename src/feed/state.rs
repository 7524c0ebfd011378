//! Feed state machine.
//!
//! [`FeedState`] owns the accumulated items together with the page cursor,
//! the in-flight and end-of-data flags, the last error and the generation
//! counter.  Mutation happens only through the crate-private `begin_*`,
//! `apply`, `abandon` and `reset` methods, which the synchronizer calls with
//! its lock held.

use std::sync::Arc;

use super::{dedupe, FeedItem};
use crate::error::{Error, Result};

/// Index of the first page of every feed.
pub const FIRST_PAGE: u32 = 1;

/// Coarse state of a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedPhase {
    /// Not loading; more pages may be available.
    Idle,
    /// A fetch is in flight.
    Loading,
    /// The last fetch produced nothing new.  Only `reset` / `load_initial`
    /// leave this state.
    Exhausted,
}

/// What a single `load_initial` / `load_more` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Precondition not met (already loading, or exhausted); nothing fetched.
    Skipped,
    /// `added` new items from `page` were appended.
    Appended { page: u32, added: usize },
    /// `page` was empty or contained only known items.
    Exhausted { page: u32 },
    /// Fetching `page` failed; see `last_error`.
    Failed { page: u32 },
    /// The result for `page` arrived after a reset and was discarded.
    Stale { page: u32 },
}

/// Handle for one in-flight fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ticket {
    pub generation: u64,
    pub page: u32,
}

/// Accumulated state of one feed.
#[derive(Debug)]
pub struct FeedState<T> {
    items: Vec<T>,
    /// Last page that contributed items.  `None` until one has.
    loaded_page: Option<u32>,
    is_loading: bool,
    can_load_more: bool,
    last_error: Option<Arc<Error>>,
    generation: u64,
}

impl<T> Default for FeedState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            loaded_page: None,
            is_loading: false,
            can_load_more: true,
            last_error: None,
            generation: 0,
        }
    }
}

impl<T: FeedItem> FeedState<T> {
    pub fn new() -> Self {
        Self::default()
    }

    // -- read access ---------------------------------------------------------

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn can_load_more(&self) -> bool {
        self.can_load_more
    }

    pub fn last_error(&self) -> Option<Arc<Error>> {
        self.last_error.clone()
    }

    /// Last successfully loaded page, or [`FIRST_PAGE`] before any load.
    pub fn current_page(&self) -> u32 {
        self.loaded_page.unwrap_or(FIRST_PAGE)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn phase(&self) -> FeedPhase {
        if self.is_loading {
            FeedPhase::Loading
        } else if !self.can_load_more {
            FeedPhase::Exhausted
        } else {
            FeedPhase::Idle
        }
    }

    pub fn snapshot(&self) -> FeedSnapshot<T> {
        FeedSnapshot {
            items: self.items.clone(),
            phase: self.phase(),
            current_page: self.current_page(),
            is_loading: self.is_loading,
            can_load_more: self.can_load_more,
            last_error: self.last_error.clone(),
        }
    }

    // -- transitions ---------------------------------------------------------

    /// Return to the initial state.  Any fetch issued before this call is
    /// now stale.
    pub(crate) fn reset(&mut self) {
        self.items.clear();
        self.loaded_page = None;
        self.is_loading = false;
        self.can_load_more = true;
        self.last_error = None;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Reset and start fetching the first page, unless a fetch is in flight.
    pub(crate) fn begin_initial(&mut self) -> Option<Ticket> {
        if self.is_loading {
            return None;
        }
        self.reset();
        Some(self.begin(FIRST_PAGE))
    }

    /// Start fetching the page after the cursor, if allowed.
    pub(crate) fn begin_more(&mut self) -> Option<Ticket> {
        if self.is_loading || !self.can_load_more {
            return None;
        }
        let page = self.loaded_page.map_or(FIRST_PAGE, |p| p + 1);
        Some(self.begin(page))
    }

    fn begin(&mut self, page: u32) -> Ticket {
        self.is_loading = true;
        Ticket {
            generation: self.generation,
            page,
        }
    }

    /// Fold the result of `ticket`'s fetch into the feed.
    pub(crate) fn apply(&mut self, ticket: Ticket, result: Result<Vec<T>>) -> LoadOutcome {
        if ticket.generation != self.generation {
            return LoadOutcome::Stale { page: ticket.page };
        }
        self.is_loading = false;

        match result {
            Ok(page_items) => {
                self.last_error = None;
                let fresh = dedupe(&self.items, page_items);
                if fresh.is_empty() {
                    self.can_load_more = false;
                    return LoadOutcome::Exhausted { page: ticket.page };
                }
                let added = fresh.len();
                self.items.extend(fresh);
                self.loaded_page = Some(ticket.page);
                LoadOutcome::Appended {
                    page: ticket.page,
                    added,
                }
            }
            Err(e) => {
                self.last_error = Some(Arc::new(e));
                LoadOutcome::Failed { page: ticket.page }
            }
        }
    }

    /// The fetch for `ticket` was dropped before completing.
    pub(crate) fn abandon(&mut self, ticket: Ticket) {
        if ticket.generation == self.generation {
            self.is_loading = false;
        }
    }
}

/// Owned, read-only copy of a feed for the presentation layer.
#[derive(Debug, Clone)]
pub struct FeedSnapshot<T> {
    pub items: Vec<T>,
    pub phase: FeedPhase,
    pub current_page: u32,
    pub is_loading: bool,
    pub can_load_more: bool,
    pub last_error: Option<Arc<Error>>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
