//! Access to the todo API, with a sticky switch to bundled mock data once the
//! backend has failed.

mod client;
#[cfg(test)]
pub(crate) mod fake;
mod http;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::model::{NewTodo, OffsetPage, ScrollPage, TodoItem, TodoPatch};
use crate::query::TodoQuery;

pub use client::{BackendMode, RemoteClient};
pub use http::HttpTransport;

/// The network side of the remote client.
#[async_trait]
pub trait TodoTransport: Send + Sync {
    async fn list_page(&self, query: &TodoQuery, page: u32) -> Result<OffsetPage, TransportError>;

    async fn list_scroll(
        &self,
        query: &TodoQuery,
        cursor: Option<&str>,
    ) -> Result<ScrollPage, TransportError>;

    async fn create(&self, input: &NewTodo) -> Result<TodoItem, TransportError>;

    async fn update(&self, id: &str, patch: &TodoPatch) -> Result<TodoItem, TransportError>;

    async fn delete(&self, id: &str) -> Result<(), TransportError>;
}
