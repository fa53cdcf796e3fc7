use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;

use super::{HttpTransport, TodoTransport};
use crate::config::AppConfig;
use crate::error::{SyncError, TransportError};
use crate::mock::MockStore;
use crate::model::{NewTodo, OffsetPage, ScrollPage, TodoItem, TodoPatch};
use crate::query::TodoQuery;

/// Whether a client still talks to the network, plus the mock data it serves
/// once it does not. Engagement is one-way.
#[derive(Debug)]
pub struct BackendMode {
    engaged: AtomicBool,
    store: Mutex<MockStore>,
}

impl BackendMode {
    pub fn live() -> Self {
        Self::with_store(MockStore::seeded())
    }

    /// Starts already serving mock data.
    pub fn offline() -> Self {
        let mode = Self::live();
        mode.engaged.store(true, Ordering::SeqCst);
        mode
    }

    pub fn with_store(store: MockStore) -> Self {
        Self {
            engaged: AtomicBool::new(false),
            store: Mutex::new(store),
        }
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged.load(Ordering::SeqCst)
    }

    /// Returns true when this call flipped the flag.
    pub fn engage(&self) -> bool {
        !self.engaged.swap(true, Ordering::SeqCst)
    }

    /// Run `f` against the mock store. Access is serialized.
    pub fn with_store_mut<T>(&self, f: impl FnOnce(&mut MockStore) -> T) -> T {
        f(&mut self.store.lock())
    }
}

pub struct RemoteClient {
    transport: Arc<dyn TodoTransport>,
    mode: Arc<BackendMode>,
}

impl RemoteClient {
    pub fn new(transport: Arc<dyn TodoTransport>, mode: Arc<BackendMode>) -> Self {
        Self { transport, mode }
    }

    /// HTTP client for the configured API.
    pub fn from_config(config: &AppConfig) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(config.api_base_url(), config.request_timeout())?;
        let mode = if config.offline() {
            BackendMode::offline()
        } else {
            BackendMode::live()
        };
        Ok(Self::new(Arc::new(transport), Arc::new(mode)))
    }

    pub fn mode(&self) -> &Arc<BackendMode> {
        &self.mode
    }

    pub fn using_mock_data(&self) -> bool {
        self.mode.is_engaged()
    }

    pub async fn list_page(&self, query: &TodoQuery, page: u32) -> Result<OffsetPage, SyncError> {
        if self.mode.is_engaged() {
            return Ok(self.mode.with_store_mut(|store| store.page(query, page)));
        }
        let result = self.transport.list_page(query, page).await;
        self.settle(result, "list_page")
    }

    pub async fn list_scroll(
        &self,
        query: &TodoQuery,
        cursor: Option<&str>,
    ) -> Result<ScrollPage, SyncError> {
        if self.mode.is_engaged() {
            return Ok(self.mode.with_store_mut(|store| store.scroll(query, cursor)));
        }
        let result = self.transport.list_scroll(query, cursor).await;
        self.settle(result, "list_scroll")
    }

    pub async fn create(&self, input: &NewTodo) -> Result<TodoItem, SyncError> {
        if self.mode.is_engaged() {
            return Ok(self
                .mode
                .with_store_mut(|store| store.create(input, Utc::now())));
        }
        let result = self.transport.create(input).await;
        self.settle(result, "create")
    }

    pub async fn update(&self, id: &str, patch: &TodoPatch) -> Result<TodoItem, SyncError> {
        if self.mode.is_engaged() {
            return self
                .mode
                .with_store_mut(|store| store.update(id, patch, Utc::now()));
        }
        let result = self.transport.update(id, patch).await;
        self.settle(result, "update")
    }

    pub async fn delete(&self, id: &str) -> Result<(), SyncError> {
        if self.mode.is_engaged() {
            return self.mode.with_store_mut(|store| store.delete(id));
        }
        let result = self.transport.delete(id).await;
        self.settle(result, "delete")
    }

    fn settle<T>(&self, result: Result<T, TransportError>, op: &str) -> Result<T, SyncError> {
        result.map_err(|err| {
            if self.mode.engage() {
                tracing::warn!(op, error = %err, "backend unavailable, switching to mock data");
            } else {
                tracing::debug!(op, error = %err, "request failed after fallback engaged");
            }
            SyncError::BackendUnavailable
        })
    }
}
