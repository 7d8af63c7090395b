//! Task definitions and the declaration surface.
//!
//! `task()` is the decorator equivalent: called at startup, it registers
//! a named async function and hands back a [`TaskFactory`] whose `call`
//! produces a [`TaskWrapper`] bound to a payload. Declaration and
//! invocation never perform I/O — scheduling is deferred until
//! `TaskWrapper::execute`.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::{Map, Value};

use crate::config::{self, TasksConfig};
use crate::connection::{self, Connection};
use crate::constants::EMULATED_QUEUE_NAME;
use crate::error::DispatchError;
use crate::registry::{self, TaskRegistry};
use crate::wrapper::{TaskTarget, TaskWrapper};

/// Keyword payload of a task: string keys to JSON values.
pub type Payload = Map<String, Value>;

pub type TaskResult = Result<Value, DispatchError>;

type TaskFn = Arc<dyn Fn(TaskContext, Payload) -> BoxFuture<'static, TaskResult> + Send + Sync>;

/// Request context handed to every task body: either synthesized by the
/// emulated path, extracted from a real callback, or a caller-supplied
/// mock.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub task_id: String,
    pub queue_name: String,
    pub headers: HashMap<String, String>,
}

impl TaskContext {
    /// A default mock context: random task id, emulated queue, no
    /// headers.
    pub fn new() -> Self {
        Self {
            task_id: uuid::Uuid::new_v4().simple().to_string(),
            queue_name: EMULATED_QUEUE_NAME.to_string(),
            headers: HashMap::new(),
        }
    }

    pub fn from_parts(
        task_id: String,
        queue_name: String,
        headers: HashMap<String, String>,
    ) -> Self {
        Self {
            task_id,
            queue_name,
            headers,
        }
    }
}

impl Default for TaskContext {
    fn default() -> Self {
        Self::new()
    }
}

/// A named task: the unit stored in the registry.
///
/// Immutable after creation; lives behind `Arc` for the process
/// lifetime. The internal task name is globally unique per process,
/// conventionally `module.function`.
pub struct TaskDefinition {
    pub internal_task_name: String,
    pub doc: Option<String>,
    run: TaskFn,
}

impl TaskDefinition {
    pub fn new<F, Fut>(internal_task_name: impl Into<String>, f: F) -> Self
    where
        F: Fn(TaskContext, Payload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TaskResult> + Send + 'static,
    {
        Self {
            internal_task_name: internal_task_name.into(),
            doc: None,
            run: Arc::new(move |ctx, payload| Box::pin(f(ctx, payload))),
        }
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Invoke the task body. The payload map is handed to the body as-is
    /// (empty map for empty payloads); the return value passes through
    /// untransformed.
    pub async fn run(&self, ctx: TaskContext, payload: Payload) -> TaskResult {
        (self.run)(ctx, payload).await
    }
}

impl fmt::Debug for TaskDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDefinition")
            .field("internal_task_name", &self.internal_task_name)
            .field("doc", &self.doc)
            .finish_non_exhaustive()
    }
}

/// Register a task in the process-wide registry and return its factory.
///
/// `headers` are extra headers sent with every callback for this task;
/// keys go through the normalization rule in
/// [`TaskWrapper::formatted_headers`].
pub fn task<F, Fut>(
    queue: impl Into<String>,
    internal_task_name: impl Into<String>,
    headers: HashMap<String, String>,
    f: F,
) -> TaskFactory
where
    F: Fn(TaskContext, Payload) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = TaskResult> + Send + 'static,
{
    task_in(&registry::global(), queue, internal_task_name, headers, f)
}

/// Like [`task`], registering into an explicit registry.
pub fn task_in<F, Fut>(
    registry: &TaskRegistry,
    queue: impl Into<String>,
    internal_task_name: impl Into<String>,
    headers: HashMap<String, String>,
    f: F,
) -> TaskFactory
where
    F: Fn(TaskContext, Payload) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = TaskResult> + Send + 'static,
{
    let definition = registry.register(TaskDefinition::new(internal_task_name, f));
    TaskFactory {
        definition,
        queue: queue.into(),
        headers,
    }
}

/// Invocation wrapper returned by [`task`]. Calling it with a payload
/// produces a [`TaskWrapper`]; no I/O happens until `execute`.
#[derive(Clone)]
pub struct TaskFactory {
    definition: Arc<TaskDefinition>,
    queue: String,
    headers: HashMap<String, String>,
}

impl TaskFactory {
    pub fn definition(&self) -> &Arc<TaskDefinition> {
        &self.definition
    }

    /// Bind a payload, using the process-wide config, connection and
    /// registry.
    pub fn call(&self, payload: Payload) -> Result<TaskWrapper, DispatchError> {
        let cfg = config::get()?;
        let conn = connection::shared(&cfg)?;
        self.call_with(cfg, conn, registry::global(), payload)
    }

    /// Bind an empty payload.
    pub fn call_empty(&self) -> Result<TaskWrapper, DispatchError> {
        self.call(Payload::new())
    }

    /// Bind a payload with explicit handles — the test seam.
    pub fn call_with(
        &self,
        config: Arc<TasksConfig>,
        connection: Arc<Connection>,
        registry: Arc<TaskRegistry>,
        payload: Payload,
    ) -> Result<TaskWrapper, DispatchError> {
        TaskWrapper::new(
            TaskTarget::Registered(self.definition.clone()),
            self.queue.clone(),
            payload,
            self.headers.clone(),
            None,
            config,
            connection,
            registry,
        )
    }
}

/// Reference to a task by handler name alone, for services that don't
/// have the task's code loaded locally. Wrappers built from it are
/// remote-only and can never run the emulated path.
#[derive(Debug, Clone)]
pub struct RemoteTask {
    pub queue: String,
    pub handler: String,
    pub task_handler_url: Option<String>,
    pub headers: HashMap<String, String>,
}

impl RemoteTask {
    /// Bind a payload, producing a remote-only wrapper.
    pub fn payload(&self, payload: Payload) -> Result<TaskWrapper, DispatchError> {
        let cfg = config::get()?;
        let conn = connection::shared(&cfg)?;
        self.payload_with(cfg, conn, payload)
    }

    pub fn payload_with(
        &self,
        config: Arc<TasksConfig>,
        connection: Arc<Connection>,
        payload: Payload,
    ) -> Result<TaskWrapper, DispatchError> {
        TaskWrapper::new(
            TaskTarget::Remote {
                handler: self.handler.clone(),
            },
            self.queue.clone(),
            payload,
            self.headers.clone(),
            self.task_handler_url.clone(),
            config,
            connection,
            registry::global(),
        )
    }
}

/// Build a [`RemoteTask`] for scheduling tasks that are not available in
/// the current scope.
pub fn remote_task(
    queue: impl Into<String>,
    handler: impl Into<String>,
    task_handler_url: Option<String>,
    headers: HashMap<String, String>,
) -> RemoteTask {
    RemoteTask {
        queue: queue.into(),
        handler: handler.into(),
        task_handler_url,
        headers,
    }
}
