//! Cursor-paginated cache of todo pages, one entry per query key, with
//! optimistic patches that are always settled by invalidation.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::model::{ScrollPage, TodoItem, TodoPatch};
use crate::query::QueryKey;

pub const INITIAL_CURSOR: &str = "0";

#[derive(Debug, Default)]
struct CacheEntry {
    pages: Vec<ScrollPage>,
    in_flight: Option<InFlight>,
}

#[derive(Debug)]
struct InFlight {
    ticket: u64,
    cancel: CancellationToken,
}

/// Permission to run one page fetch. Hand it back through
/// [`PageCache::complete_fetch`] or [`PageCache::fail_fetch`].
#[derive(Debug)]
pub struct FetchTicket {
    key: QueryKey,
    cursor: String,
    ticket: u64,
    generation: u64,
    cancel: CancellationToken,
}

impl FetchTicket {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn cursor(&self) -> &str {
        &self.cursor
    }

    /// Cancelled when the entry is invalidated, evicted or superseded.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

#[derive(Debug)]
pub enum FetchStart {
    Ready(FetchTicket),
    /// The last page said there is nothing more to fetch.
    Exhausted,
    /// A fetch for this key is already running.
    InFlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchAccept {
    Appended { added: usize, has_more: bool },
    /// The entry was invalidated or replaced while the request ran.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptimisticPatch {
    Create(TodoItem),
    Update {
        id: String,
        patch: TodoPatch,
        stamped_at: DateTime<Utc>,
    },
    Delete {
        id: String,
    },
}

impl OptimisticPatch {
    pub fn label(&self) -> &'static str {
        match self {
            OptimisticPatch::Create(_) => "create",
            OptimisticPatch::Update { .. } => "update",
            OptimisticPatch::Delete { .. } => "delete",
        }
    }
}

/// Open optimistic transaction. Consumed by [`PageCache::commit`] or
/// [`PageCache::abort`].
#[derive(Debug)]
#[must_use = "optimistic patches must be committed or aborted"]
pub struct OptimisticToken {
    id: u64,
    label: &'static str,
    touched: usize,
}

impl OptimisticToken {
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Number of cached items the patch inserted, changed or removed.
    pub fn touched(&self) -> usize {
        self.touched
    }
}

#[derive(Debug)]
pub struct PageCache {
    entries: HashMap<QueryKey, CacheEntry>,
    recency: VecDeque<QueryKey>,
    retained: usize,
    generation: u64,
    next_id: u64,
}

impl PageCache {
    pub fn new(retained: usize) -> Self {
        Self {
            entries: HashMap::new(),
            recency: VecDeque::new(),
            retained: retained.max(1),
            generation: 0,
            next_id: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Bumped on every full invalidation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn page_count(&self, key: &QueryKey) -> usize {
        self.entries.get(key).map_or(0, |entry| entry.pages.len())
    }

    /// All fetched items for `key`, in fetch order.
    pub fn items(&self, key: &QueryKey) -> Vec<TodoItem> {
        self.entries
            .get(key)
            .map(|entry| {
                entry
                    .pages
                    .iter()
                    .flat_map(|page| page.items.iter().cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// True until a page reports the end. A key with nothing fetched yet has
    /// more by definition.
    pub fn has_more(&self, key: &QueryKey) -> bool {
        match self.entries.get(key).and_then(|entry| entry.pages.last()) {
            Some(last) => last.has_more && last.next_cursor.is_some(),
            None => true,
        }
    }

    pub fn is_loading(&self, key: &QueryKey) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| entry.pages.is_empty() && entry.in_flight.is_some())
    }

    pub fn is_fetching_more(&self, key: &QueryKey) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.pages.is_empty() && entry.in_flight.is_some())
    }

    /// Reserve the next fetch for `key`: the initial cursor for a new entry,
    /// otherwise the last page's continuation.
    pub fn begin_fetch(&mut self, key: &QueryKey) -> FetchStart {
        self.touch(key);
        let ticket = self.bump_id();
        let generation = self.generation;
        let entry = self.entries.entry(key.clone()).or_default();
        if entry.in_flight.is_some() {
            return FetchStart::InFlight;
        }

        let cursor = match entry.pages.last() {
            None => INITIAL_CURSOR.to_string(),
            Some(last) => match (&last.next_cursor, last.has_more) {
                (Some(cursor), true) => cursor.clone(),
                _ => return FetchStart::Exhausted,
            },
        };

        let cancel = CancellationToken::new();
        entry.in_flight = Some(InFlight {
            ticket,
            cancel: cancel.clone(),
        });
        FetchStart::Ready(FetchTicket {
            key: key.clone(),
            cursor,
            ticket,
            generation,
            cancel,
        })
    }

    /// Append a fetched page unless the ticket went stale. Items already
    /// present in earlier pages are dropped so the concatenation stays
    /// duplicate-free.
    pub fn complete_fetch(&mut self, ticket: FetchTicket, mut page: ScrollPage) -> FetchAccept {
        if ticket.generation != self.generation {
            return FetchAccept::Stale;
        }
        let Some(entry) = self.entries.get_mut(&ticket.key) else {
            return FetchAccept::Stale;
        };
        if entry.in_flight.as_ref().map(|f| f.ticket) != Some(ticket.ticket) {
            return FetchAccept::Stale;
        }
        entry.in_flight = None;

        let seen: HashSet<&str> = entry
            .pages
            .iter()
            .flat_map(|p| p.items.iter().map(|todo| todo.id.as_str()))
            .collect();
        let before = page.items.len();
        page.items.retain(|todo| !seen.contains(todo.id.as_str()));
        if page.items.len() != before {
            tracing::debug!(
                key = %ticket.key,
                dropped = before - page.items.len(),
                "dropped duplicate items from fetched page"
            );
        }

        let added = page.items.len();
        let has_more = page.has_more && page.next_cursor.is_some();
        entry.pages.push(page);
        FetchAccept::Appended { added, has_more }
    }

    /// Release the in-flight slot after a failed or cancelled request.
    pub fn fail_fetch(&mut self, ticket: FetchTicket) {
        if let Some(entry) = self.entries.get_mut(&ticket.key) {
            if entry.in_flight.as_ref().map(|f| f.ticket) == Some(ticket.ticket) {
                entry.in_flight = None;
            }
        }
    }

    /// Cancel a running fetch for `key` without dropping fetched pages. Used
    /// when the active query moves away from `key`.
    pub fn supersede(&mut self, key: &QueryKey) {
        if let Some(entry) = self.entries.get_mut(key) {
            if let Some(in_flight) = entry.in_flight.take() {
                in_flight.cancel.cancel();
                tracing::debug!(key = %key, "cancelled superseded fetch");
            }
        }
    }

    /// Discard one entry and cancel its fetch; the next read starts again from
    /// the first page. Other entries and the generation are untouched.
    pub fn invalidate(&mut self, key: &QueryKey) {
        if let Some(entry) = self.entries.remove(key) {
            cancel_entry(entry);
        }
        self.recency.retain(|k| k != key);
    }

    /// Discard every entry and cancel every running fetch.
    pub fn invalidate_all(&mut self) -> usize {
        let discarded = self.entries.len();
        for (_, entry) in self.entries.drain() {
            cancel_entry(entry);
        }
        self.recency.clear();
        self.generation = self.generation.wrapping_add(1);
        discarded
    }

    /// Apply `patch` to every page of every cached entry: a create is
    /// prepended to each entry's first page, an update merged by id, a delete
    /// removed by id.
    pub fn begin_optimistic(&mut self, patch: OptimisticPatch) -> OptimisticToken {
        let mut touched = 0usize;
        for entry in self.entries.values_mut() {
            match &patch {
                OptimisticPatch::Create(item) => {
                    if let Some(first) = entry.pages.first_mut() {
                        first.items.insert(0, item.clone());
                        touched += 1;
                    }
                }
                OptimisticPatch::Update {
                    id,
                    patch,
                    stamped_at,
                } => {
                    for todo in entry
                        .pages
                        .iter_mut()
                        .flat_map(|page| page.items.iter_mut())
                        .filter(|todo| &todo.id == id)
                    {
                        patch.apply_to(todo, *stamped_at);
                        touched += 1;
                    }
                }
                OptimisticPatch::Delete { id } => {
                    for page in entry.pages.iter_mut() {
                        let before = page.items.len();
                        page.items.retain(|todo| &todo.id != id);
                        touched += before - page.items.len();
                    }
                }
            }
        }

        let token = OptimisticToken {
            id: self.bump_id(),
            label: patch.label(),
            touched,
        };
        tracing::debug!(
            token = token.id,
            action = token.label,
            touched,
            "applied optimistic patch"
        );
        token
    }

    /// The remote call succeeded. Cached pages are discarded and refetched so
    /// server-computed fields win over the optimistic copy.
    pub fn commit(&mut self, token: OptimisticToken) -> usize {
        tracing::debug!(token = token.id, action = token.label, "optimistic patch committed");
        self.invalidate_all()
    }

    /// The remote call failed. Rolls back by discarding, not by reversing.
    pub fn abort(&mut self, token: OptimisticToken) -> usize {
        tracing::debug!(token = token.id, action = token.label, "optimistic patch aborted");
        self.invalidate_all()
    }

    fn touch(&mut self, key: &QueryKey) {
        self.recency.retain(|k| k != key);
        self.recency.push_back(key.clone());
        while self.recency.len() > self.retained {
            if let Some(oldest) = self.recency.pop_front() {
                tracing::debug!(key = %oldest, "evicting cache entry");
                self.invalidate(&oldest);
            }
        }
    }

    fn bump_id(&mut self) -> u64 {
        self.next_id = self.next_id.wrapping_add(1);
        self.next_id
    }
}

fn cancel_entry(entry: CacheEntry) {
    if let Some(in_flight) = entry.in_flight {
        in_flight.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockStore;
    use crate::model::CompletedFilter;
    use crate::query::TodoQuery;
    use pretty_assertions::assert_eq;

    fn ready(cache: &mut PageCache, key: &QueryKey) -> FetchTicket {
        match cache.begin_fetch(key) {
            FetchStart::Ready(ticket) => ticket,
            other => panic!("expected a ticket, got {other:?}"),
        }
    }

    fn fetch_page(cache: &mut PageCache, store: &MockStore, query: &TodoQuery) -> FetchAccept {
        let key = query.key();
        let ticket = ready(cache, &key);
        let page = store.scroll(query, Some(ticket.cursor()));
        cache.complete_fetch(ticket, page)
    }

    #[test]
    fn walks_cursor_until_exhausted() {
        let store = MockStore::seeded();
        let query = TodoQuery::with_limit(3);
        let key = query.key();
        let mut cache = PageCache::new(4);

        let first = ready(&mut cache, &key);
        assert_eq!(first.cursor(), INITIAL_CURSOR);
        let page = store.scroll(&query, Some(first.cursor()));
        assert_eq!(
            cache.complete_fetch(first, page),
            FetchAccept::Appended {
                added: 3,
                has_more: true
            }
        );

        let second = ready(&mut cache, &key);
        assert_eq!(second.cursor(), "3");
        let page = store.scroll(&query, Some(second.cursor()));
        cache.complete_fetch(second, page);

        assert!(!cache.has_more(&key));
        assert!(matches!(cache.begin_fetch(&key), FetchStart::Exhausted));
        assert_eq!(cache.items(&key), store.filtered(&query));
    }

    #[test]
    fn second_fetch_for_same_key_waits_for_the_first() {
        let mut cache = PageCache::new(4);
        let key = TodoQuery::default().key();
        let ticket = ready(&mut cache, &key);
        assert!(cache.is_loading(&key));
        assert!(matches!(cache.begin_fetch(&key), FetchStart::InFlight));
        cache.fail_fetch(ticket);
        assert!(!cache.is_loading(&key));
        assert!(matches!(cache.begin_fetch(&key), FetchStart::Ready(_)));
    }

    #[test]
    fn fetch_finishing_after_invalidation_is_discarded() {
        let store = MockStore::seeded();
        let query = TodoQuery::default();
        let key = query.key();
        let mut cache = PageCache::new(4);

        let ticket = ready(&mut cache, &key);
        let cancel = ticket.cancellation();
        assert_eq!(cache.invalidate_all(), 1);
        assert!(cancel.is_cancelled());

        let page = store.scroll(&query, Some(ticket.cursor()));
        assert_eq!(cache.complete_fetch(ticket, page), FetchAccept::Stale);
        assert!(!cache.contains(&key));
        assert!(cache.items(&key).is_empty());
    }

    #[test]
    fn superseding_cancels_but_keeps_pages() {
        let store = MockStore::seeded();
        let query = TodoQuery::with_limit(2);
        let key = query.key();
        let mut cache = PageCache::new(4);
        fetch_page(&mut cache, &store, &query);

        let ticket = ready(&mut cache, &key);
        assert!(cache.is_fetching_more(&key));
        cache.supersede(&key);
        assert!(ticket.cancellation().is_cancelled());
        assert!(!cache.is_fetching_more(&key));
        assert_eq!(cache.page_count(&key), 1);

        let page = store.scroll(&query, Some(ticket.cursor()));
        assert_eq!(cache.complete_fetch(ticket, page), FetchAccept::Stale);
    }

    #[test]
    fn optimistic_patches_reach_every_entry() {
        let store = MockStore::seeded();
        let all = TodoQuery::default();
        let mut active = TodoQuery::default();
        active.completed = CompletedFilter::Active;
        let mut cache = PageCache::new(4);
        fetch_page(&mut cache, &store, &all);
        fetch_page(&mut cache, &store, &active);

        let mut created = store.items()[0].clone();
        created.id = "temp-1".into();
        let token = cache.begin_optimistic(OptimisticPatch::Create(created));
        assert_eq!(token.touched(), 2);
        assert_eq!(cache.items(&all.key())[0].id, "temp-1");
        assert_eq!(cache.items(&active.key())[0].id, "temp-1");
        let _ = cache.commit(token);

        fetch_page(&mut cache, &store, &all);
        fetch_page(&mut cache, &store, &active);
        let stamped_at = Utc::now();
        let token = cache.begin_optimistic(OptimisticPatch::Update {
            id: "2".into(),
            patch: TodoPatch {
                title: Some("Renamed".into()),
                ..TodoPatch::default()
            },
            stamped_at,
        });
        assert_eq!(token.touched(), 2);
        for key in [all.key(), active.key()] {
            let renamed = cache
                .items(&key)
                .into_iter()
                .find(|todo| todo.id == "2")
                .unwrap();
            assert_eq!(renamed.title, "Renamed");
            assert_eq!(renamed.updated_at, stamped_at);
        }

        let token2 = cache.begin_optimistic(OptimisticPatch::Delete { id: "1".into() });
        assert_eq!(token2.touched(), 2);
        assert!(cache.items(&all.key()).iter().all(|todo| todo.id != "1"));

        assert_eq!(cache.abort(token), 2);
        assert!(cache.is_empty());
        let _ = cache.commit(token2);
    }

    #[test]
    fn create_skips_entries_without_pages() {
        let mut cache = PageCache::new(4);
        let key = TodoQuery::default().key();
        let _ticket = ready(&mut cache, &key);
        let item = MockStore::seeded().items()[0].clone();
        let token = cache.begin_optimistic(OptimisticPatch::Create(item));
        assert_eq!(token.touched(), 0);
        let _ = cache.abort(token);
    }

    #[test]
    fn duplicate_ids_across_pages_are_dropped() {
        let store = MockStore::seeded();
        let query = TodoQuery::with_limit(2);
        let key = query.key();
        let mut cache = PageCache::new(4);
        fetch_page(&mut cache, &store, &query);

        let ticket = ready(&mut cache, &key);
        // A shifted window overlapping the first page.
        let page = store.scroll(&query, Some("1"));
        assert_eq!(
            cache.complete_fetch(ticket, page),
            FetchAccept::Appended {
                added: 1,
                has_more: true
            }
        );
        assert_eq!(cache.items(&key).len(), 3);
    }

    #[test]
    fn evicts_least_recently_used_keys() {
        let store = MockStore::seeded();
        let mut cache = PageCache::new(2);
        let mut queries = Vec::new();
        for filter in [
            CompletedFilter::All,
            CompletedFilter::Active,
            CompletedFilter::Completed,
        ] {
            let mut query = TodoQuery::default();
            query.completed = filter;
            fetch_page(&mut cache, &store, &query);
            queries.push(query);
        }
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&queries[0].key()));
        assert!(cache.contains(&queries[2].key()));
    }

    #[test]
    fn invalidating_one_key_leaves_the_others() {
        let store = MockStore::seeded();
        let all = TodoQuery::with_limit(2);
        let mut active = TodoQuery::with_limit(2);
        active.completed = CompletedFilter::Active;
        let mut cache = PageCache::new(4);
        fetch_page(&mut cache, &store, &all);
        fetch_page(&mut cache, &store, &active);
        let generation = cache.generation();

        let ticket = ready(&mut cache, &all.key());
        let cancel = ticket.cancellation();
        cache.invalidate(&all.key());
        assert!(cancel.is_cancelled());
        assert!(!cache.contains(&all.key()));
        assert_eq!(cache.page_count(&active.key()), 1);
        assert_eq!(cache.generation(), generation);

        let page = store.scroll(&all, Some(ticket.cursor()));
        assert_eq!(cache.complete_fetch(ticket, page), FetchAccept::Stale);
        assert_eq!(ready(&mut cache, &all.key()).cursor(), INITIAL_CURSOR);
    }
}
