//! gread-feed: paginated feed synchronization for the GRead reading platform.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌──────────────┐ fetch_page(n) ┌──────────────────┐  snapshot()  ┌──────────┐
//! │  source/     │ ◄──────────── │ feed::           │ ───────────► │ caller   │
//! │ (HTTP, JSON) │ ────────────► │ FeedSynchronizer │ ◄─────────── │ (UI)     │
//! └──────────────┘  Vec<Item>    └──────────────────┘ load_*()     └──────────┘
//! ```
//!
//! * **`feed`**: the [`FeedItem`](feed::FeedItem) / [`PageFetcher`](feed::PageFetcher)
//!   traits, de-duplication, the feed state machine and the synchronizer.
//! * **`source`**: page fetchers for the GRead REST API (book directory,
//!   activity stream) and credential providers.
//! * **`config`**: backend URL, page size, timeout, token.
//! * **`error`**: the crate-wide [`Error`](error::Error) type.
//!
//! ## Example
//!
//! ```no_run
//! use gread_feed::{config::Config, feed::FeedSynchronizer, source::BookDirectorySource};
//!
//! # async fn run() -> gread_feed::error::Result<()> {
//! let config = Config::from_env()?;
//! let books = FeedSynchronizer::new(BookDirectorySource::new(&config)?);
//!
//! books.load_initial().await;
//! books.load_more().await;
//! println!("{} books, more available: {}", books.len(), books.can_load_more());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod feed;
pub mod source;

pub use config::Config;
pub use error::{Error, Result};
pub use feed::{FeedItem, FeedSynchronizer, LoadOutcome, PageFetcher};
