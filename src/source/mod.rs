//! GRead backend sources.
//!
//! Each feed screen of the GRead app is backed by one [`PageFetcher`]
//! implementation here.  They own the HTTP and JSON work so that the
//! synchronizer only ever sees decoded items.
//!
//! ## For contributors: adding a new endpoint
//!
//! 1. Create a new file in this directory (e.g. `groups.rs`).
//! 2. Define the item model, derive `Deserialize`, implement
//!    [`FeedItem`](crate::feed::FeedItem).
//! 3. Define a source struct and implement [`PageFetcher`] for it, using
//!    [`fetch_json_page`] for the request.
//! 4. Add `mod groups;` below and re-export the public types.
//!
//! [`PageFetcher`]: crate::feed::PageFetcher

mod activity;
mod book;
mod credentials;
mod html;

pub use activity::{ActivityFeedSource, ActivityItem};
pub use book::{Book, BookDirectorySource};
pub use credentials::{CredentialProvider, EnvToken, StaticToken};
pub use html::{clean_html, decode_entities, strip_html};

use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::Config;
use crate::error::{Error, Result};

/// HTTP client shared by the sources, with the configured timeout.
pub fn build_client(config: &Config) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(config.timeout())
        .user_agent(concat!("gread-feed/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// WordPress error code for a page index past the last page.
const INVALID_PAGE_NUMBER: &str = "rest_post_invalid_page_number";

/// The `code` field of a WordPress REST error body.
#[derive(Deserialize)]
struct RestError {
    code: String,
}

/// Send `request` and decode a JSON array page.
///
/// WordPress answers a page index past the end with HTTP 400 and the code
/// `rest_post_invalid_page_number`; for pages after the first that is
/// reported as an empty page so the feed ends normally.  Any other 400 is an
/// error like every other non-success status.
pub(crate) async fn fetch_json_page<T: DeserializeOwned>(
    request: RequestBuilder,
    page: u32,
) -> Result<Vec<T>> {
    let response = request.send().await?;
    let status = response.status();
    let url = response.url().to_string();

    if !status.is_success() {
        if status == StatusCode::BAD_REQUEST && page > crate::feed::FIRST_PAGE {
            let body = response.bytes().await?;
            let past_end = serde_json::from_slice::<RestError>(&body)
                .map(|e| e.code == INVALID_PAGE_NUMBER)
                .unwrap_or(false);
            if past_end {
                return Ok(Vec::new());
            }
        }
        return Err(Error::Status {
            status: status.as_u16(),
            url,
        });
    }

    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}
