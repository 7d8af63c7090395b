//! The central scheduling abstraction: one `TaskWrapper` per scheduling
//! intent, deciding between remote enqueue and local emulated execution.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::config::TasksConfig;
use crate::connection::{Connection, CreatedTask};
use crate::constants::HANDLER_SECRET_HEADER;
use crate::emulated::EmulatedTask;
use crate::error::DispatchError;
use crate::registry::TaskRegistry;
use crate::retry::{self, with_retry};
use crate::task::{Payload, TaskContext, TaskDefinition};

/// What a wrapper is bound to: a locally registered definition, or a
/// handler name for tasks whose code is not loaded in this process.
#[derive(Debug, Clone)]
pub enum TaskTarget {
    Registered(Arc<TaskDefinition>),
    Remote { handler: String },
}

impl TaskTarget {
    pub fn internal_task_name(&self) -> &str {
        match self {
            TaskTarget::Registered(def) => &def.internal_task_name,
            TaskTarget::Remote { handler } => handler,
        }
    }
}

/// OIDC token configuration naming the service account the queue uses to
/// authenticate its callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OidcToken {
    pub service_account_email: String,
}

/// The HTTP request the queue will deliver to the worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpRequest {
    pub http_method: String,
    pub url: String,
    pub oidc_token: OidcToken,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    /// Payload bytes, base64-encoded for the JSON wire.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Remote request body built from one wrapper; exists only for the
/// duration of a single enqueue call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskBody {
    pub http_request: HttpRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Result of [`TaskWrapper::execute`].
#[derive(Debug)]
pub enum ExecuteOutcome {
    /// Ran through the emulated local path; carries the task body's
    /// return value.
    Local(serde_json::Value),
    /// Enqueued on the remote queue.
    Enqueued(CreatedTask),
    /// Remote task dropped by the block-remote-tasks safety valve.
    Blocked,
}

/// One scheduling intent: a task target bound to a payload and a queue.
///
/// Created per invocation, owned solely by the caller, discarded after
/// `execute` returns. No shared mutable state across wrappers.
#[derive(Clone)]
pub struct TaskWrapper {
    target: TaskTarget,
    payload: Payload,
    queue: String,
    task_handler_url: String,
    headers: HashMap<String, String>,
    is_remote: bool,
    handler_secret: String,
    delay_seconds: Option<f64>,
    remote_task_name: Option<String>,
    config: Arc<TasksConfig>,
    connection: Arc<Connection>,
    registry: Arc<TaskRegistry>,
}

impl std::fmt::Debug for TaskWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskWrapper")
            .field("target", &self.target)
            .field("payload", &self.payload)
            .field("queue", &self.queue)
            .field("task_handler_url", &self.task_handler_url)
            .field("headers", &self.headers)
            .field("is_remote", &self.is_remote)
            .field("delay_seconds", &self.delay_seconds)
            .field("remote_task_name", &self.remote_task_name)
            .finish_non_exhaustive()
    }
}

impl TaskWrapper {
    pub fn new(
        target: TaskTarget,
        queue: impl Into<String>,
        payload: Payload,
        headers: HashMap<String, String>,
        task_handler_url: Option<String>,
        config: Arc<TasksConfig>,
        connection: Arc<Connection>,
        registry: Arc<TaskRegistry>,
    ) -> Result<Self, DispatchError> {
        let is_remote = matches!(target, TaskTarget::Remote { .. });
        if target.internal_task_name().is_empty() {
            return Err(DispatchError::Config(
                "either an internal task name or a registered task must be provided".into(),
            ));
        }
        let task_handler_url =
            task_handler_url.unwrap_or_else(|| config.task_handler_root_url.clone());
        if task_handler_url.is_empty() {
            return Err(DispatchError::Config(
                "could not identify task handler URL of the worker service".into(),
            ));
        }
        Ok(Self {
            target,
            payload,
            queue: queue.into(),
            task_handler_url,
            headers,
            is_remote,
            handler_secret: config.handler_secret.clone(),
            delay_seconds: None,
            remote_task_name: None,
            config,
            connection,
            registry,
        })
    }

    pub fn internal_task_name(&self) -> &str {
        self.target.internal_task_name()
    }

    pub fn is_remote(&self) -> bool {
        self.is_remote
    }

    pub fn set_queue(&mut self, queue: impl Into<String>) {
        self.queue = queue.into();
    }

    /// Delay delivery by `seconds` from enqueue time.
    pub fn with_delay(mut self, seconds: f64) -> Self {
        self.delay_seconds = Some(seconds);
        self
    }

    /// Explicit remote task name; the remote service deduplicates on it,
    /// so idempotent naming prevents duplicate delivery.
    pub fn with_remote_name(mut self, name: impl Into<String>) -> Self {
        self.remote_task_name = Some(name.into());
        self
    }

    /// Fully qualified queue:
    /// `projects/{p}/locations/{l}/queues/{queue}`.
    pub fn queue_path(&self) -> String {
        format!("{}/queues/{}", self.config.project_location_name(), self.queue)
    }

    /// Worker URL for this task: the configured root with the internal
    /// task name as the final path segment.
    pub fn handler_url(&self) -> String {
        format!(
            "{}/{}",
            self.task_handler_url.trim_end_matches('/'),
            self.internal_task_name()
        )
    }

    /// Caller headers, case-normalized: `foo_bar` becomes `FOO-BAR`.
    /// The handler-secret header is set last and overrides any
    /// caller-supplied value with the same name.
    pub fn formatted_headers(&self) -> HashMap<String, String> {
        let mut formatted = HashMap::new();
        for (key, value) in &self.headers {
            let key = key.replace('_', "-").to_uppercase();
            formatted.insert(key, value.clone());
        }
        formatted.insert(HANDLER_SECRET_HEADER.to_string(), self.handler_secret.clone());
        formatted
    }

    /// Construct the remote request body.
    ///
    /// A mapping payload is serialized to JSON, tagged with
    /// `Content-Type: application/json`, and base64-encoded for the
    /// wire. `delay_seconds` becomes an RFC3339 `schedule_time` with
    /// sub-second precision; `task_name` becomes the explicit remote
    /// task identifier.
    pub fn get_body(
        &self,
        payload: Option<&Payload>,
        delay_seconds: Option<f64>,
        task_name: Option<&str>,
    ) -> Result<TaskBody, DispatchError> {
        let mut http_request = HttpRequest {
            http_method: "POST".to_string(),
            url: self.handler_url(),
            oidc_token: OidcToken {
                service_account_email: self.config.service_account_email.clone(),
            },
            headers: None,
            body: None,
        };

        let mut headers = HashMap::new();
        if let Some(payload) = payload {
            let serialized = serde_json::to_string(payload)?;
            headers.insert("Content-Type".to_string(), "application/json".to_string());
            http_request.body = Some(BASE64.encode(serialized.as_bytes()));
        }
        // Secret goes in last: it must win over any caller-supplied
        // header with the same name.
        headers.extend(self.formatted_headers());
        http_request.headers = Some(headers);

        let schedule_time = delay_seconds.map(|seconds| {
            let eta = Utc::now() + chrono::Duration::microseconds((seconds * 1e6) as i64);
            eta.to_rfc3339_opts(SecondsFormat::Micros, true)
        });

        Ok(TaskBody {
            http_request,
            schedule_time,
            name: task_name.map(str::to_string),
        })
    }

    /// Body for this wrapper's own enqueue: its payload plus any
    /// scheduling options set on it.
    pub(crate) fn body_for_enqueue(&self) -> Result<TaskBody, DispatchError> {
        self.get_body(
            Some(&self.payload),
            self.delay_seconds,
            self.remote_task_name.as_deref(),
        )
    }

    pub(crate) fn config(&self) -> &Arc<TasksConfig> {
        &self.config
    }

    pub(crate) fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    /// Schedule with default retry settings (10 attempts, 5s interval).
    pub async fn execute(&self) -> Result<ExecuteOutcome, DispatchError> {
        self.execute_opts(retry::DEFAULT_RETRY_LIMIT, retry::DEFAULT_RETRY_INTERVAL)
            .await
    }

    /// Schedule the task.
    ///
    /// Local mode short-circuits to the emulated path (no retry, no
    /// connection). A remote-marked wrapper under `block_remote_tasks`
    /// is logged and dropped. Otherwise the enqueue is wrapped in the
    /// retry wrapper unless `retry_limit` is zero, in which case it runs
    /// once and errors propagate directly.
    pub async fn execute_opts(
        &self,
        retry_limit: u32,
        retry_interval: Duration,
    ) -> Result<ExecuteOutcome, DispatchError> {
        if self.config.execute_locally && !self.is_remote {
            return self.execute_local().await.map(ExecuteOutcome::Local);
        }

        if self.is_remote && self.config.block_remote_tasks {
            tracing::debug!(
                task = %self.internal_task_name(),
                payload = %serde_json::Value::Object(self.payload.clone()),
                "remote task ignored by block_remote_tasks"
            );
            return Ok(ExecuteOutcome::Blocked);
        }

        if retry_limit == 0 {
            return self.create_cloud_task().await.map(ExecuteOutcome::Enqueued);
        }

        tracing::info!(
            task = %self.internal_task_name(),
            retry_limit,
            retry_interval_secs = retry_interval.as_secs_f64(),
            "scheduling task"
        );
        with_retry(retry_limit, retry_interval, || self.create_cloud_task())
            .await
            .map(ExecuteOutcome::Enqueued)
    }

    /// Run through the emulated delivery path: encode the body exactly
    /// as the remote enqueue would, then decode and hand it to the
    /// worker-side handler.
    pub async fn execute_local(&self) -> Result<serde_json::Value, DispatchError> {
        let body = self.get_body(Some(&self.payload), None, None)?;
        EmulatedTask::new(body)?
            .execute(&self.registry, &self.config)
            .await
    }

    /// Invoke the bound task body directly with this wrapper's payload.
    /// `mock_ctx` stands in for the request context a real delivery
    /// would carry; a default is synthesized when absent.
    pub async fn run(
        &self,
        mock_ctx: Option<TaskContext>,
    ) -> Result<serde_json::Value, DispatchError> {
        match &self.target {
            TaskTarget::Registered(def) => {
                let ctx = mock_ctx.unwrap_or_default();
                def.run(ctx, self.payload.clone()).await
            }
            TaskTarget::Remote { handler } => Err(DispatchError::Config(format!(
                "remote-only task {handler} has no local body to run"
            ))),
        }
    }

    async fn create_cloud_task(&self) -> Result<CreatedTask, DispatchError> {
        let body = self.body_for_enqueue()?;
        let parent = self.queue_path();
        let task = self.connection.create_task(&parent, body).await?;
        tracing::info!(task = %task.name, "created task");
        Ok(task)
    }
}
