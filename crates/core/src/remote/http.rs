use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;

use super::TodoTransport;
use crate::error::TransportError;
use crate::model::{NewTodo, OffsetPage, ScrollPage, TodoItem, TodoPatch};
use crate::query::TodoQuery;

/// `reqwest`-backed transport for the todo REST API.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base: Url,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let base = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|err| TransportError::InvalidUrl(format!("{base_url}: {err}")))?;
        if base.cannot_be_a_base() {
            return Err(TransportError::InvalidUrl(base_url.to_string()));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    /// Base URL extended by path segments. Each segment is percent-encoded,
    /// so ids containing `/`, `?` or `#` stay one segment.
    fn url(&self, segments: &[&str]) -> Result<Url, TransportError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| TransportError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, TransportError> {
        let resp = request
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::debug!(status = status.as_u16(), body = %body, "api error response");
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, TransportError> {
        let resp = self.send(request).await?;
        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|err| TransportError::Decode(err.to_string()))
    }
}

#[async_trait]
impl TodoTransport for HttpTransport {
    async fn list_page(&self, query: &TodoQuery, page: u32) -> Result<OffsetPage, TransportError> {
        let mut params = query.to_params();
        params.push(("page", page.max(1).to_string()));
        tracing::debug!(page, "GET /todos");
        let url = self.url(&["todos"])?;
        self.send_json(self.client.get(url).query(&params)).await
    }

    async fn list_scroll(
        &self,
        query: &TodoQuery,
        cursor: Option<&str>,
    ) -> Result<ScrollPage, TransportError> {
        let mut params = query.to_params();
        if let Some(cursor) = cursor {
            params.push(("nextCursor", cursor.to_string()));
        }
        tracing::debug!(cursor = cursor.unwrap_or("0"), "GET /todos/scroll");
        let url = self.url(&["todos", "scroll"])?;
        self.send_json(self.client.get(url).query(&params)).await
    }

    async fn create(&self, input: &NewTodo) -> Result<TodoItem, TransportError> {
        tracing::debug!(title = input.title.as_str(), "POST /todos");
        let url = self.url(&["todos"])?;
        self.send_json(self.client.post(url).json(input)).await
    }

    async fn update(&self, id: &str, patch: &TodoPatch) -> Result<TodoItem, TransportError> {
        tracing::debug!(id, "PUT /todos/{{id}}");
        let url = self.url(&["todos", id])?;
        self.send_json(self.client.put(url).json(patch)).await
    }

    async fn delete(&self, id: &str) -> Result<(), TransportError> {
        tracing::debug!(id, "DELETE /todos/{{id}}");
        let url = self.url(&["todos", id])?;
        self.send(self.client.delete(url)).await.map(|_| ())
    }
}
