//! Stable re-exports for consumers (`cli` and external crates).
//!
//! Prefer importing from `taskwire_core::api` instead of reaching into
//! internal modules.

pub use crate::batch::{batch_execute, BatchOutcome};
pub use crate::codec;
pub use crate::config::{load_default, load_from_path, LoggingConfig, TasksConfig};
pub use crate::connection::{
    BatchItemError, Connection, CreatedTask, HttpQueueTransport, QueueTransport,
};
pub use crate::constants::{
    EMULATED_QUEUE_NAME, HANDLER_SECRET_HEADER, MAX_TASKS_PER_BATCH, QUEUE_NAME_HEADER,
    TASK_NAME_HEADER,
};
pub use crate::emulated::EmulatedTask;
pub use crate::error::DispatchError;
pub use crate::registry::TaskRegistry;
pub use crate::retry::{
    with_retry, DEFAULT_BATCH_RETRY_INTERVAL, DEFAULT_RETRY_INTERVAL, DEFAULT_RETRY_LIMIT,
};
pub use crate::task::{
    remote_task, task, task_in, Payload, RemoteTask, TaskContext, TaskDefinition, TaskFactory,
    TaskResult,
};
pub use crate::worker::{run_task, TaskRequest};
pub use crate::wrapper::{ExecuteOutcome, HttpRequest, OidcToken, TaskBody, TaskTarget, TaskWrapper};
