//! Public book directory (`wp/v2/book`).

use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

use super::{build_client, clean_html, fetch_json_page};
use crate::config::Config;
use crate::error::Result;
use crate::feed::{FeedItem, PageFetcher};

/// A book in the directory.
///
/// Equality and hashing consider only `id`, matching the feed's notion of
/// identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    #[serde(deserialize_with = "text_or_rendered")]
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub page_count: Option<u32>,
    #[serde(default)]
    pub content: Option<String>,
}

impl Book {
    /// Title with markup and entities removed.
    pub fn display_title(&self) -> String {
        clean_html(&self.title)
    }
}

impl PartialEq for Book {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Book {}

impl Hash for Book {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl FeedItem for Book {
    fn id(&self) -> i64 {
        self.id
    }
}

/// Custom post types expose `title` as a string; stock WordPress wraps it in
/// `{"rendered": ...}`.  Accept both.
fn text_or_rendered<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Text {
        Plain(String),
        Rendered { rendered: String },
    }

    Ok(match Text::deserialize(deserializer)? {
        Text::Plain(s) => s,
        Text::Rendered { rendered } => rendered,
    })
}

/// Pages through the public book directory.  No authentication.
pub struct BookDirectorySource {
    client: reqwest::Client,
    endpoint: String,
    per_page: u32,
}

impl BookDirectorySource {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self::with_client(build_client(config)?, config))
    }

    pub fn with_client(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            endpoint: format!("{}/book", config.wp_api()),
            per_page: config.per_page,
        }
    }
}

#[async_trait]
impl PageFetcher for BookDirectorySource {
    type Item = Book;

    fn name(&self) -> &str {
        "Books"
    }

    async fn fetch_page(&self, page: u32) -> Result<Vec<Book>> {
        let request = self
            .client
            .get(&self.endpoint)
            .query(&[("per_page", self.per_page), ("page", page)]);
        fetch_json_page(request, page).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
