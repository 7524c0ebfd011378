//! Test doubles for the feed module.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::{FeedItem, PageFetcher};
use crate::error::{Error, Result};

/// Minimal feed item: an id plus a label to tell copies apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestItem {
    pub id: i64,
    pub label: String,
}

impl TestItem {
    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }
}

impl FeedItem for TestItem {
    fn id(&self) -> i64 {
        self.id
    }
}

/// Shorthand constructor for tests.
pub fn make_item(id: i64) -> TestItem {
    TestItem {
        id,
        label: format!("item-{id}"),
    }
}

pub fn make_items(ids: &[i64]) -> Vec<TestItem> {
    ids.iter().copied().map(make_item).collect()
}

pub fn ids(items: &[TestItem]) -> Vec<i64> {
    items.iter().map(|i| i.id).collect()
}

enum Reply {
    Items(Vec<TestItem>),
    Fail,
}

struct Scripted {
    reply: Reply,
    gate: Option<oneshot::Receiver<()>>,
}

/// A [`PageFetcher`] that replays scripted responses per page.
///
/// Each page has a queue of responses consumed in call order; an unscripted
/// call returns an empty page.  Gated responses wait until the returned
/// sender fires (or is dropped).
#[derive(Default)]
pub struct ScriptedFetcher {
    script: Mutex<HashMap<u32, VecDeque<Scripted>>>,
    calls: Mutex<Vec<u32>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, page: u32, reply: Reply, gate: Option<oneshot::Receiver<()>>) {
        self.script
            .lock()
            .unwrap()
            .entry(page)
            .or_default()
            .push_back(Scripted { reply, gate });
    }

    pub fn push_page(&self, page: u32, ids: &[i64]) {
        self.push(page, Reply::Items(make_items(ids)), None);
    }

    pub fn push_failure(&self, page: u32) {
        self.push(page, Reply::Fail, None);
    }

    /// Script a page whose response is held back until the sender fires.
    pub fn push_gated_page(&self, page: u32, ids: &[i64]) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.push(page, Reply::Items(make_items(ids)), Some(rx));
        tx
    }

    /// Pages requested so far, in call order.
    pub fn calls(&self) -> Vec<u32> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    type Item = TestItem;

    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch_page(&self, page: u32) -> Result<Vec<TestItem>> {
        self.calls.lock().unwrap().push(page);
        let next = self
            .script
            .lock()
            .unwrap()
            .get_mut(&page)
            .and_then(VecDeque::pop_front);

        let Some(Scripted { reply, gate }) = next else {
            return Ok(Vec::new());
        };
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        match reply {
            Reply::Items(items) => Ok(items),
            Reply::Fail => Err(Error::Status {
                status: 500,
                url: format!("http://test/feed?page={page}"),
            }),
        }
    }
}
