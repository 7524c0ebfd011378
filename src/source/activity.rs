//! Authenticated activity stream (`gread/v1/activity`).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{build_client, clean_html, fetch_json_page, CredentialProvider};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::feed::{FeedItem, PageFetcher};

/// One post in the activity stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityItem {
    pub id: i64,
    pub user_id: i64,
    /// HTML fragment as stored by BuddyPress.
    pub content: String,
    /// ISO-8601 timestamp.
    pub date: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub user_name: Option<String>,
}

impl ActivityItem {
    /// Content as plain text.
    pub fn formatted_content(&self) -> String {
        clean_html(&self.content)
    }

    /// Parsed `date`.  BuddyPress sometimes omits the offset; such values
    /// are taken as UTC.
    pub fn published(&self) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&self.date) {
            return Some(dt.with_timezone(&Utc));
        }
        ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(&self.date, fmt).ok())
            .map(|naive| naive.and_utc())
    }

    /// Relative age such as "5 minutes ago", measured from `now`.
    pub fn time_ago(&self, now: DateTime<Utc>) -> String {
        let Some(published) = self.published() else {
            return "Recently".to_string();
        };
        let secs = (now - published).num_seconds();

        fn plural(n: i64, unit: &str) -> String {
            format!("{n} {unit}{} ago", if n == 1 { "" } else { "s" })
        }

        if secs < 60 {
            "Just now".to_string()
        } else if secs < 3_600 {
            plural(secs / 60, "minute")
        } else if secs < 86_400 {
            plural(secs / 3_600, "hour")
        } else {
            plural(secs / 86_400, "day")
        }
    }
}

impl FeedItem for ActivityItem {
    fn id(&self) -> i64 {
        self.id
    }
}

/// Pages through the signed-in user's activity stream.
pub struct ActivityFeedSource {
    client: reqwest::Client,
    endpoint: String,
    per_page: u32,
    credentials: Arc<dyn CredentialProvider>,
}

#[derive(Serialize)]
struct NewUpdate<'a> {
    content: &'a str,
}

impl ActivityFeedSource {
    pub fn new(config: &Config, credentials: Arc<dyn CredentialProvider>) -> Result<Self> {
        Ok(Self::with_client(build_client(config)?, config, credentials))
    }

    pub fn with_client(
        client: reqwest::Client,
        config: &Config,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            client,
            endpoint: format!("{}/activity", config.custom_api()),
            per_page: config.per_page,
            credentials,
        }
    }

    /// Post a status update as the signed-in user.
    ///
    /// Blank text is rejected before any request is made.  The new post only
    /// shows up in a synchronizer after it is reset and reloaded.
    pub async fn post_update(&self, content: &str) -> Result<()> {
        let token = self.credentials.token().ok_or(Error::Unauthenticated)?;
        if content.trim().is_empty() {
            return Err(Error::EmptyUpdate);
        }

        let response = self
            .client
            .post(format!("{}/post", self.endpoint))
            .bearer_auth(token)
            .json(&NewUpdate { content })
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }
        info!(chars = content.chars().count(), "posted activity update");
        Ok(())
    }
}

#[async_trait]
impl PageFetcher for ActivityFeedSource {
    type Item = ActivityItem;

    fn name(&self) -> &str {
        "Activity"
    }

    async fn fetch_page(&self, page: u32) -> Result<Vec<ActivityItem>> {
        let token = self.credentials.token().ok_or(Error::Unauthenticated)?;
        let request = self
            .client
            .get(&self.endpoint)
            .query(&[("page", page), ("per_page", self.per_page)])
            .bearer_auth(token);
        fetch_json_page(request, page).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
