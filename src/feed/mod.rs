//! Paginated feed synchronization.
//!
//! This module defines the [`FeedItem`] and [`PageFetcher`] traits and the
//! [`FeedSynchronizer`] that drives them.  Concrete fetchers for the GRead
//! backend live in [`crate::source`].
//!
//! ## How the pieces fit
//!
//! ```text
//! load_initial() / load_more()
//!        │
//!        ▼
//! ┌──────────────┐ begin()  ┌────────────┐
//! │  sync.rs     │ ───────► │  state.rs  │  cursor, flags, generation
//! │ (orchestrate)│ ◄─────── │            │
//! └──────────────┘ apply()  └────────────┘
//!        │ fetch_page(n)          ▲
//!        ▼                        │ dedupe()
//! ┌──────────────┐          ┌────────────┐
//! │ PageFetcher  │          │ dedupe.rs  │
//! └──────────────┘          └────────────┘
//! ```
//!
//! ## For contributors: adding a new feed
//!
//! 1. Give your item type an integer identity by implementing [`FeedItem`].
//! 2. Implement [`PageFetcher`] for whatever performs the request.
//! 3. Wrap it in a [`FeedSynchronizer`].
//!
//! De-duplication, end-of-data detection and overlap suppression all come
//! for free.

mod dedupe;
mod state;
mod sync;

pub use dedupe::dedupe;
pub use state::{FeedPhase, FeedSnapshot, FeedState, LoadOutcome, FIRST_PAGE};
pub use sync::FeedSynchronizer;

use async_trait::async_trait;

use crate::error::Result;

/// Anything that can live in a paginated feed.
///
/// Two items with the same [`id`](FeedItem::id) are the same logical item,
/// whatever their payload.  The copy seen first wins; fields are never merged.
pub trait FeedItem: Clone + Send + Sync + 'static {
    /// Stable identity across fetches.
    fn id(&self) -> i64;
}

/// Source of feed pages.
///
/// The synchronizer calls [`fetch_page()`](PageFetcher::fetch_page) at most
/// once per load and never retries, so timeouts and retries (if any) belong
/// to the implementation.
///
/// ## Implementing a new fetcher
///
/// ```ignore
/// pub struct MyFetcher { /* client, endpoint */ }
///
/// #[async_trait]
/// impl PageFetcher for MyFetcher {
///     type Item = MyItem;
///
///     fn name(&self) -> &str { "my-feed" }
///
///     async fn fetch_page(&self, page: u32) -> Result<Vec<MyItem>> {
///         // Perform HTTP / IO, then decode into MyItem values.
///         todo!()
///     }
/// }
/// ```
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Item type produced by this fetcher.
    type Item: FeedItem;

    /// Human-readable label used in logs and the status bar.
    fn name(&self) -> &str;

    /// Fetch one page.  Pages are 1-based.
    async fn fetch_page(&self, page: u32) -> Result<Vec<Self::Item>>;
}

#[cfg(test)]
pub(crate) mod testing;
