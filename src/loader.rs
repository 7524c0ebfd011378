//! Background feed loading.
//!
//! Each load request runs as its own task on the tokio runtime and reports
//! back to the UI thread over an [`mpsc`] channel.  Overlap is handled by the
//! synchronizer itself: a `load_more` spawned while another load is pending
//! comes back as [`LoadOutcome::Skipped`] without touching the network.

use std::sync::mpsc;
use std::sync::Arc;

use tokio::runtime::Handle;

use gread_feed::feed::{FeedSynchronizer, LoadOutcome, PageFetcher};

/// Which entry point to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    /// Pull-to-refresh: reset and fetch the first page.
    Initial,
    /// Infinite scroll: fetch the next page.
    More,
}

/// Sent to the UI thread when a load task finishes.
pub struct LoadMsg {
    pub kind: LoadKind,
    pub outcome: LoadOutcome,
}

/// Start one load on `handle`.
///
/// The task ends silently if the receiver is gone.
pub fn spawn<F>(
    handle: &Handle,
    sync: Arc<FeedSynchronizer<F>>,
    kind: LoadKind,
    tx: mpsc::Sender<LoadMsg>,
) where
    F: PageFetcher + 'static,
{
    handle.spawn(async move {
        let outcome = match kind {
            LoadKind::Initial => {
                // Abandon whatever is in flight so a refresh always wins.
                sync.reset();
                sync.load_initial().await
            }
            LoadKind::More => sync.load_more().await,
        };
        let _ = tx.send(LoadMsg { kind, outcome });
    });
}
