use chrono::{DateTime, Utc};
use ratatui::widgets::ListState;

use gread_feed::feed::{FeedItem, FeedPhase, FeedSnapshot, LoadOutcome};
use gread_feed::source::{ActivityItem, Book};

use crate::loader::LoadKind;

/// Start fetching the next page once the selection is this close to the end.
const PREFETCH_DISTANCE: usize = 3;

/// How an item is shown in the list.
pub trait ListEntry: FeedItem {
    /// Main line.
    fn headline(&self) -> String;
    /// Dimmed trailing text (author, poster, age).
    fn byline(&self, now: DateTime<Utc>) -> String;
}

impl ListEntry for Book {
    fn headline(&self) -> String {
        self.display_title()
    }

    fn byline(&self, _now: DateTime<Utc>) -> String {
        match (&self.author, self.page_count) {
            (Some(author), Some(pages)) => format!("{author} · {pages} pages"),
            (Some(author), None) => author.clone(),
            (None, Some(pages)) => format!("{pages} pages"),
            (None, None) => "Unknown author".to_string(),
        }
    }
}

impl ListEntry for ActivityItem {
    fn headline(&self) -> String {
        self.formatted_content()
            .lines()
            .next()
            .unwrap_or_default()
            .to_string()
    }

    fn byline(&self, now: DateTime<Utc>) -> String {
        let who = self.user_name.as_deref().unwrap_or("someone");
        format!("{who} · {}", self.time_ago(now))
    }
}

pub struct App<T> {
    /// Items from the latest feed snapshot, in feed order.
    pub items: Vec<T>,
    /// List selection state for scrolling.
    pub list_state: ListState,
    /// Whether the user has requested to quit.
    pub quit: bool,
    /// Last load status message.
    pub status: String,
    /// Feed label for the list title.
    pub feed_name: String,
    pub phase: FeedPhase,
    /// Message of the feed's last error, if any.
    pub last_error: Option<String>,
    /// Load the main loop should start on its next tick.
    requested: Option<LoadKind>,
}

impl<T: ListEntry> App<T> {
    pub fn new(feed_name: impl Into<String>) -> Self {
        Self {
            items: Vec::new(),
            list_state: ListState::default(),
            quit: false,
            status: "Starting…".into(),
            feed_name: feed_name.into(),
            phase: FeedPhase::Idle,
            last_error: None,
            requested: None,
        }
    }

    /// Replace displayed state with a fresh snapshot.
    pub fn apply_snapshot(&mut self, snapshot: FeedSnapshot<T>) {
        self.items = snapshot.items;
        self.phase = snapshot.phase;
        self.last_error = snapshot.last_error.map(|e| e.to_string());

        match self.list_state.selected() {
            Some(_) if self.items.is_empty() => self.list_state.select(None),
            Some(i) if i >= self.items.len() => self.list_state.select(Some(self.items.len() - 1)),
            _ => {}
        }
    }

    /// Record the result of a finished load in the status line.
    pub fn record_outcome(&mut self, kind: LoadKind, outcome: LoadOutcome) {
        self.status = match outcome {
            LoadOutcome::Appended { page, added } => format!("Loaded page {page} (+{added})"),
            LoadOutcome::Exhausted { .. } if self.items.is_empty() => "Nothing here yet".into(),
            LoadOutcome::Exhausted { .. } => "End of feed".into(),
            LoadOutcome::Failed { page } => {
                let reason = self.last_error.as_deref().unwrap_or("unknown error");
                format!("Page {page} failed: {reason}  (m: retry)")
            }
            LoadOutcome::Stale { .. } | LoadOutcome::Skipped => return,
        };
        if let LoadOutcome::Appended { .. } = outcome {
            if kind == LoadKind::Initial {
                self.select_first();
            }
            // A short page can leave the cursor near the end already.
            self.prefetch_if_near_end();
        }
    }

    // -- load requests -------------------------------------------------------

    pub fn request_refresh(&mut self) {
        self.list_state.select(None);
        self.status = "Refreshing…".into();
        self.requested = Some(LoadKind::Initial);
    }

    pub fn request_more(&mut self) {
        if self.requested.is_none() {
            self.requested = Some(LoadKind::More);
        }
    }

    pub fn take_request(&mut self) -> Option<LoadKind> {
        self.requested.take()
    }

    fn prefetch_if_near_end(&mut self) {
        let Some(i) = self.list_state.selected() else {
            return;
        };
        if self.phase == FeedPhase::Idle && i + PREFETCH_DISTANCE >= self.items.len() {
            self.request_more();
        }
    }

    // -- navigation ----------------------------------------------------------

    pub fn select_next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => (i + 1).min(self.items.len() - 1),
            None => 0,
        };
        self.list_state.select(Some(i));
        self.prefetch_if_near_end();
    }

    pub fn select_previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn select_first(&mut self) {
        if !self.items.is_empty() {
            self.list_state.select(Some(0));
        }
    }

    pub fn select_last(&mut self) {
        if !self.items.is_empty() {
            self.list_state.select(Some(self.items.len() - 1));
            self.prefetch_if_near_end();
        }
    }
}
