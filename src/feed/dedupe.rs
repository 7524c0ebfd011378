//! Identity-based de-duplication of incoming pages.

use std::collections::HashSet;

use super::FeedItem;

/// Return the items of `incoming` whose ids are not already in `existing`.
///
/// Order of `incoming` is preserved.  If `incoming` repeats an id, only the
/// first occurrence survives, so appending the result can never introduce a
/// duplicate.
pub fn dedupe<T: FeedItem>(existing: &[T], incoming: Vec<T>) -> Vec<T> {
    let mut seen: HashSet<i64> = existing.iter().map(FeedItem::id).collect();
    incoming
        .into_iter()
        .filter(|item| seen.insert(item.id()))
        .collect()
}
