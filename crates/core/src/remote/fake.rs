use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::TodoTransport;
use crate::error::{SyncError, TransportError};
use crate::mock::MockStore;
use crate::model::{NewTodo, OffsetPage, ScrollPage, TodoItem, TodoPatch};
use crate::query::TodoQuery;

/// In-process stand-in for the API server. Serves its own store, counts every
/// request, can be switched to fail, and can hold requests open.
pub(crate) struct FakeTransport {
    server: Mutex<MockStore>,
    failing: AtomicBool,
    calls: AtomicUsize,
    list_gate: Mutex<Option<Arc<Notify>>>,
    mutation_gate: Mutex<Option<Arc<Notify>>>,
}

#[derive(Clone, Copy)]
enum Gate {
    List,
    Mutation,
}

impl FakeTransport {
    pub(crate) fn healthy() -> Self {
        Self::with_store(MockStore::seeded())
    }

    pub(crate) fn failing() -> Self {
        let transport = Self::healthy();
        transport.set_failing(true);
        transport
    }

    pub(crate) fn with_store(store: MockStore) -> Self {
        Self {
            server: Mutex::new(store),
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            list_gate: Mutex::new(None),
            mutation_gate: Mutex::new(None),
        }
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Subsequent list requests wait until the returned gate is notified.
    pub(crate) fn hold_lists(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.list_gate.lock() = Some(gate.clone());
        gate
    }

    /// Subsequent create/update/delete requests wait until the returned gate
    /// is notified.
    pub(crate) fn hold_mutations(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.mutation_gate.lock() = Some(gate.clone());
        gate
    }

    pub(crate) fn server_len(&self) -> usize {
        self.server.lock().len()
    }

    async fn enter(&self, gate: Gate) -> Result<(), TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let held = match gate {
            Gate::List => self.list_gate.lock().clone(),
            Gate::Mutation => self.mutation_gate.lock().clone(),
        };
        if let Some(held) = held {
            held.notified().await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::Status {
                status: 503,
                body: "unavailable".into(),
            });
        }
        Ok(())
    }
}

fn not_found(err: SyncError) -> TransportError {
    TransportError::Status {
        status: 404,
        body: err.to_string(),
    }
}

#[async_trait]
impl TodoTransport for FakeTransport {
    async fn list_page(&self, query: &TodoQuery, page: u32) -> Result<OffsetPage, TransportError> {
        self.enter(Gate::List).await?;
        Ok(self.server.lock().page(query, page))
    }

    async fn list_scroll(
        &self,
        query: &TodoQuery,
        cursor: Option<&str>,
    ) -> Result<ScrollPage, TransportError> {
        self.enter(Gate::List).await?;
        Ok(self.server.lock().scroll(query, cursor))
    }

    async fn create(&self, input: &NewTodo) -> Result<TodoItem, TransportError> {
        self.enter(Gate::Mutation).await?;
        Ok(self.server.lock().create(input, Utc::now()))
    }

    async fn update(&self, id: &str, patch: &TodoPatch) -> Result<TodoItem, TransportError> {
        self.enter(Gate::Mutation).await?;
        self.server
            .lock()
            .update(id, patch, Utc::now())
            .map_err(not_found)
    }

    async fn delete(&self, id: &str) -> Result<(), TransportError> {
        self.enter(Gate::Mutation).await?;
        self.server.lock().delete(id).map_err(not_found)
    }
}
