//! Handle to the remote managed queue service.
//!
//! The queue's wire protocol is an external collaborator; this module
//! only knows how to submit a built task body (or a batch of them) and
//! report failures. [`QueueTransport`] is the seam tests replace.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::TasksConfig;
use crate::error::DispatchError;
use crate::wrapper::TaskBody;

/// Task resource created by the remote service.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedTask {
    pub name: String,
}

/// Per-item failure reported by the batch API. Carries the raw error
/// payload bytes; the batch driver decodes the embedded
/// `{"error": {"message": ...}}` structure.
#[derive(Debug, Clone)]
pub struct BatchItemError {
    pub body: Vec<u8>,
}

/// Enqueue and batch-enqueue primitives against the remote queue.
#[async_trait]
pub trait QueueTransport: Send + Sync {
    async fn create_task(
        &self,
        queue_path: &str,
        body: TaskBody,
    ) -> Result<CreatedTask, DispatchError>;

    /// Submit every item as one network operation, returning a per-item
    /// result in input order.
    async fn batch_create(
        &self,
        items: Vec<(String, TaskBody)>,
    ) -> Result<Vec<Result<CreatedTask, BatchItemError>>, DispatchError>;
}

/// reqwest-backed transport against the configured queue endpoint.
pub struct HttpQueueTransport {
    endpoint: String,
    http: reqwest::Client,
}

impl HttpQueueTransport {
    pub fn new(endpoint: impl Into<String>, timeout_ms: u64) -> Result<Self, DispatchError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            http,
        })
    }

    fn base(&self) -> &str {
        self.endpoint.trim_end_matches('/')
    }
}

#[derive(Debug, Deserialize)]
struct BatchItemResponse {
    task: Option<CreatedTask>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    responses: Vec<BatchItemResponse>,
}

#[async_trait]
impl QueueTransport for HttpQueueTransport {
    async fn create_task(
        &self,
        queue_path: &str,
        body: TaskBody,
    ) -> Result<CreatedTask, DispatchError> {
        let url = format!("{}/v2/{}/tasks", self.base(), queue_path);
        tracing::debug!(url = %url, "enqueueing task");

        let resp = self
            .http
            .post(url)
            .json(&serde_json::json!({ "task": body }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DispatchError::Remote {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }
        Ok(resp.json::<CreatedTask>().await?)
    }

    async fn batch_create(
        &self,
        items: Vec<(String, TaskBody)>,
    ) -> Result<Vec<Result<CreatedTask, BatchItemError>>, DispatchError> {
        let url = format!("{}/batch", self.base());
        let requests: Vec<_> = items
            .iter()
            .map(|(parent, body)| serde_json::json!({ "parent": parent, "task": body }))
            .collect();
        tracing::debug!(url = %url, count = requests.len(), "submitting task batch");

        let resp = self
            .http
            .post(url)
            .json(&serde_json::json!({ "requests": requests }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DispatchError::Remote {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }

        let batch: BatchResponse = resp.json().await?;
        let results = batch
            .responses
            .into_iter()
            .map(|item| match (item.task, item.error) {
                (Some(task), _) => Ok(task),
                (None, Some(error)) => Err(BatchItemError {
                    body: serde_json::to_vec(&serde_json::json!({ "error": error }))
                        .unwrap_or_default(),
                }),
                (None, None) => Err(BatchItemError {
                    body: br#"{"error":{"message":"empty batch item response"}}"#.to_vec(),
                }),
            })
            .collect();
        Ok(results)
    }
}

/// Cached handle to the queue service.
pub struct Connection {
    transport: Arc<dyn QueueTransport>,
}

impl Connection {
    pub fn new(transport: Arc<dyn QueueTransport>) -> Self {
        Self { transport }
    }

    pub fn from_config(cfg: &TasksConfig) -> Result<Self, DispatchError> {
        let transport = HttpQueueTransport::new(cfg.queue_endpoint.clone(), cfg.http_timeout_ms)?;
        Ok(Self::new(Arc::new(transport)))
    }

    pub async fn create_task(
        &self,
        queue_path: &str,
        body: TaskBody,
    ) -> Result<CreatedTask, DispatchError> {
        self.transport.create_task(queue_path, body).await
    }

    pub async fn batch_create(
        &self,
        items: Vec<(String, TaskBody)>,
    ) -> Result<Vec<Result<CreatedTask, BatchItemError>>, DispatchError> {
        self.transport.batch_create(items).await
    }
}

static CONNECTION: OnceLock<Arc<Connection>> = OnceLock::new();

/// Process-wide connection, constructed at most once on first access.
/// Concurrent first access may race to build the transport, but exactly
/// one instance is installed and returned thereafter.
pub fn shared(cfg: &TasksConfig) -> Result<Arc<Connection>, DispatchError> {
    if let Some(conn) = CONNECTION.get() {
        return Ok(conn.clone());
    }
    let conn = Arc::new(Connection::from_config(cfg)?);
    Ok(CONNECTION.get_or_init(|| conn).clone())
}
