//! Facade the presentation layer talks to: owns the active query, the page
//! cache and the remote client, and exposes snapshots to render.

use std::collections::VecDeque;

use anyhow::{Context, Result};
use chrono::Utc;
use parking_lot::Mutex;
use ulid::Ulid;

use crate::cache::{FetchAccept, FetchStart, OptimisticPatch, OptimisticToken, PageCache};
use crate::config::AppConfig;
use crate::debounce::Debouncer;
use crate::error::SyncError;
use crate::model::{NewTodo, OffsetPage, TodoItem, TodoPatch};
use crate::notice::{MutationKind, Notice};
use crate::query::{QueryPatch, TodoQuery};
use crate::remote::RemoteClient;
use crate::telemetry::{Event, Handle};
use crate::view::derive_items;

/// Everything a front end needs to render the list.
#[derive(Debug, Clone)]
pub struct ViewSnapshot {
    pub query: TodoQuery,
    pub items: Vec<TodoItem>,
    pub is_loading: bool,
    pub is_fetching_more: bool,
    pub has_more: bool,
    pub using_mock_data: bool,
    pub pending_mutations: usize,
    /// Changes whenever cached pages were discarded.
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Appended { added: usize, has_more: bool },
    /// The last page already reported the end; nothing was requested.
    NoMorePages,
    /// Another fetch for the active query is running.
    AlreadyFetching,
    /// The result arrived after the entry was invalidated or the query
    /// changed, and was thrown away.
    Discarded,
}

struct SyncState {
    query: TodoQuery,
    cache: PageCache,
    notices: VecDeque<Notice>,
    pending_mutations: usize,
}

pub struct TodoSync {
    remote: RemoteClient,
    state: Mutex<SyncState>,
    debouncer: Debouncer,
    telemetry: Handle,
}

impl TodoSync {
    pub fn new(remote: RemoteClient, config: &AppConfig) -> Self {
        Self {
            remote,
            state: Mutex::new(SyncState {
                query: TodoQuery::with_limit(config.page_limit()),
                cache: PageCache::new(config.retained_queries()),
                notices: VecDeque::new(),
                pending_mutations: 0,
            }),
            debouncer: Debouncer::new(config.search_debounce()),
            telemetry: Handle::new(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let remote = RemoteClient::from_config(config).with_context(|| {
            format!("failed to build HTTP client for {}", config.api_base_url())
        })?;
        Ok(Self::new(remote, config))
    }

    pub fn remote(&self) -> &RemoteClient {
        &self.remote
    }

    pub fn telemetry(&self) -> &Handle {
        &self.telemetry
    }

    pub fn query(&self) -> TodoQuery {
        self.state.lock().query.clone()
    }

    /// Merge `patch` into the active query. A new query key cancels any fetch
    /// still running for the old one; returns whether anything changed.
    pub fn set_filters(&self, patch: QueryPatch) -> bool {
        let mut state = self.state.lock();
        let previous = state.query.key();
        if !patch.apply(&mut state.query) {
            return false;
        }
        let current = state.query.key();
        if current != previous {
            state.cache.supersede(&previous);
            tracing::debug!(from = %previous, to = %current, "query changed");
        }
        true
    }

    /// Back to default filters, keeping the page size.
    pub fn reset(&self) -> bool {
        let limit = self.state.lock().query.limit;
        let defaults = TodoQuery::with_limit(limit);
        let patch = QueryPatch {
            completed: Some(defaults.completed),
            priority: Some(defaults.priority),
            date_gte: Some(defaults.date_gte),
            date_lte: Some(defaults.date_lte),
            sort: Some(defaults.sort),
            order: Some(defaults.order),
            search: Some(defaults.search),
            limit: None,
        };
        self.set_filters(patch)
    }

    /// Keystroke-driven search. Only the last text of a burst is applied.
    pub async fn search(&self, text: impl Into<String>) -> bool {
        match self.debouncer.settle(text.into()).await {
            Some(text) => self.set_filters(QueryPatch::search(text)),
            None => false,
        }
    }

    /// Fetch the next page for the active query: the first page when nothing
    /// is cached, otherwise the page after the last one.
    ///
    /// If the fallback engages during the request, the cache is emptied and
    /// the query starts over from the first mock page.
    pub async fn fetch_next(&self) -> Result<FetchOutcome, SyncError> {
        let was_mock = self.remote.using_mock_data();
        let outcome = self.fetch_once().await;
        if self.fell_back(was_mock) {
            return self.fetch_once().await;
        }
        outcome
    }

    async fn fetch_once(&self) -> Result<FetchOutcome, SyncError> {
        let (ticket, query) = {
            let mut state = self.state.lock();
            let key = state.query.key();
            match state.cache.begin_fetch(&key) {
                FetchStart::Ready(ticket) => (ticket, state.query.clone()),
                FetchStart::Exhausted => return Ok(FetchOutcome::NoMorePages),
                FetchStart::InFlight => return Ok(FetchOutcome::AlreadyFetching),
            }
        };
        let key = ticket.key().to_string();
        self.telemetry.record(Event::FetchRequested {
            key: key.clone(),
            cursor: ticket.cursor().to_string(),
        });

        let cancel = ticket.cancellation();
        let result = tokio::select! {
            _ = cancel.cancelled() => None,
            result = self.remote.list_scroll(&query, Some(ticket.cursor())) => Some(result),
        };

        let mut state = self.state.lock();
        match result {
            None => {
                state.cache.fail_fetch(ticket);
                self.telemetry.record(Event::FetchDiscarded(key));
                Ok(FetchOutcome::Discarded)
            }
            Some(Ok(page)) => match state.cache.complete_fetch(ticket, page) {
                FetchAccept::Appended { added, has_more } => {
                    self.telemetry.record(Event::FetchCompleted { key, count: added });
                    Ok(FetchOutcome::Appended { added, has_more })
                }
                FetchAccept::Stale => {
                    self.telemetry.record(Event::FetchDiscarded(key));
                    Ok(FetchOutcome::Discarded)
                }
            },
            Some(Err(err)) => {
                state.cache.fail_fetch(ticket);
                self.telemetry.record(Event::FetchFailed {
                    key,
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Keep fetching until the active query is exhausted. Returns the number
    /// of items appended.
    pub async fn fetch_all(&self) -> Result<usize, SyncError> {
        let mut total = 0usize;
        loop {
            match self.fetch_next().await? {
                FetchOutcome::Appended { added, has_more } => {
                    total += added;
                    if !has_more {
                        return Ok(total);
                    }
                }
                FetchOutcome::NoMorePages
                | FetchOutcome::AlreadyFetching
                | FetchOutcome::Discarded => return Ok(total),
            }
        }
    }

    /// Page-number listing for the active query. Not cached.
    pub async fn load_page(&self, page: u32) -> Result<OffsetPage, SyncError> {
        let query = self.query();
        let was_mock = self.remote.using_mock_data();
        let mut result = self.remote.list_page(&query, page).await;
        if self.fell_back(was_mock) && matches!(result, Err(SyncError::BackendUnavailable)) {
            result = self.remote.list_page(&query, page).await;
        }
        let mut page = result?;
        page.items = derive_items(&page.items, &query);
        Ok(page)
    }

    pub async fn create(&self, input: NewTodo) -> Result<TodoItem, SyncError> {
        input.require_title()?;
        let now = Utc::now();
        let placeholder = TodoItem {
            id: format!("temp-{}", Ulid::new()),
            title: input.title.clone(),
            completed: input.completed.unwrap_or(false),
            date: input.date.clone(),
            start_date: input.start_date.clone(),
            priority: input.priority,
            created_at: now,
            updated_at: now,
        };
        let token = self.begin(OptimisticPatch::Create(placeholder));
        let was_mock = self.remote.using_mock_data();
        let result = self.remote.create(&input).await;
        self.settle(token, MutationKind::Create, was_mock, result.as_ref().err());
        result
    }

    pub async fn update(&self, id: &str, patch: TodoPatch) -> Result<TodoItem, SyncError> {
        let token = self.begin(OptimisticPatch::Update {
            id: id.to_string(),
            patch: patch.clone(),
            stamped_at: Utc::now(),
        });
        let was_mock = self.remote.using_mock_data();
        let result = self.remote.update(id, &patch).await;
        self.settle(token, MutationKind::Update, was_mock, result.as_ref().err());
        result
    }

    pub async fn delete(&self, id: &str) -> Result<(), SyncError> {
        let token = self.begin(OptimisticPatch::Delete { id: id.to_string() });
        let was_mock = self.remote.using_mock_data();
        let result = self.remote.delete(id).await;
        self.settle(token, MutationKind::Delete, was_mock, result.as_ref().err());
        result
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        let state = self.state.lock();
        let key = state.query.key();
        let fetched = state.cache.items(&key);
        ViewSnapshot {
            items: derive_items(&fetched, &state.query),
            query: state.query.clone(),
            is_loading: state.cache.is_loading(&key),
            is_fetching_more: state.cache.is_fetching_more(&key),
            has_more: state.cache.has_more(&key),
            using_mock_data: self.remote.using_mock_data(),
            pending_mutations: state.pending_mutations,
            generation: state.cache.generation(),
        }
    }

    /// Drain queued notifications, oldest first.
    pub fn take_notices(&self) -> Vec<Notice> {
        self.state.lock().notices.drain(..).collect()
    }

    /// True when the fallback engaged since `was_mock` was sampled. Cached
    /// pages all came from the server and are discarded.
    fn fell_back(&self, was_mock: bool) -> bool {
        if was_mock || !self.remote.using_mock_data() {
            return false;
        }
        let discarded = self.state.lock().cache.invalidate_all();
        tracing::debug!(discarded, "discarded server pages after fallback");
        self.telemetry.record(Event::FallbackEngaged);
        true
    }

    fn begin(&self, patch: OptimisticPatch) -> OptimisticToken {
        let mut state = self.state.lock();
        state.pending_mutations += 1;
        state.cache.begin_optimistic(patch)
    }

    fn settle(
        &self,
        token: OptimisticToken,
        kind: MutationKind,
        was_mock: bool,
        error: Option<&SyncError>,
    ) {
        self.fell_back(was_mock);

        let mut state = self.state.lock();
        state.pending_mutations = state.pending_mutations.saturating_sub(1);
        match error {
            None => {
                let discarded = state.cache.commit(token);
                tracing::debug!(action = kind.label(), discarded, "mutation applied");
                self.telemetry
                    .record(Event::MutationApplied(kind.label().to_string()));
                state.notices.extend(kind.success());
            }
            Some(err) => {
                state.cache.abort(token);
                tracing::warn!(action = kind.label(), error = %err, "mutation failed");
                self.telemetry.record(Event::MutationFailed {
                    action: kind.label().to_string(),
                    error: err.to_string(),
                });
                state.notices.push_back(kind.failure());
            }
        }
    }
}
