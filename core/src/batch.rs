//! Batched task submission.

use std::time::Duration;

use crate::connection::{BatchItemError, CreatedTask};
use crate::constants::MAX_TASKS_PER_BATCH;
use crate::error::DispatchError;
use crate::retry::with_retry;
use crate::wrapper::TaskWrapper;

/// Result of [`batch_execute`].
#[derive(Debug)]
pub enum BatchOutcome {
    /// Local mode: every runnable task was executed (or skipped)
    /// in-process; nothing was batched.
    Local,
    /// Remote mode: the batch was submitted in one network operation.
    Enqueued(Vec<CreatedTask>),
}

/// Unpack one per-item batch failure: decode the embedded error payload
/// and surface its message. The first failure aborts the batch, so
/// callers only ever see one message.
fn batch_callback(index: usize, result: &Result<CreatedTask, BatchItemError>) -> Result<(), DispatchError> {
    match result {
        Ok(task) => {
            tracing::debug!(index, task = %task.name, "batch item created");
            Ok(())
        }
        Err(item) => {
            let message = serde_json::from_slice::<serde_json::Value>(&item.body)
                .ok()
                .and_then(|v| {
                    v.get("error")
                        .and_then(|e| e.get("message"))
                        .and_then(|m| m.as_str())
                        .map(str::to_string)
                })
                .unwrap_or_else(|| String::from_utf8_lossy(&item.body).into_owned());
            Err(DispatchError::Batch(message))
        }
    }
}

/// Execute `tasks` in batch.
///
/// Batches of 1000 or more are rejected before any body is built. In
/// local mode, each non-remote task runs through the emulated path and
/// remote-marked tasks are skipped (logged) under `block_remote_tasks`
/// or enqueued individually otherwise — batching is a remote-protocol
/// optimization with no local meaning. In remote mode, one batched call
/// carries every task's body; the first per-item failure is re-raised as
/// a single aggregate error. The batch call is wrapped in the retry
/// wrapper unless `retry_limit` is zero.
pub async fn batch_execute(
    tasks: &[TaskWrapper],
    retry_limit: u32,
    retry_interval: Duration,
) -> Result<BatchOutcome, DispatchError> {
    if tasks.len() >= MAX_TASKS_PER_BATCH {
        return Err(DispatchError::BatchTooLarge(tasks.len()));
    }

    let Some(first) = tasks.first() else {
        return Ok(BatchOutcome::Enqueued(Vec::new()));
    };

    let cfg = first.config().clone();
    if cfg.execute_locally {
        for task in tasks {
            if !task.is_remote() {
                task.execute_local().await?;
            } else if cfg.block_remote_tasks {
                tracing::debug!(
                    task = %task.internal_task_name(),
                    "remote task ignored by block_remote_tasks"
                );
            } else {
                task.execute_opts(retry_limit, retry_interval).await?;
            }
        }
        return Ok(BatchOutcome::Local);
    }

    let mut items = Vec::with_capacity(tasks.len());
    for task in tasks {
        items.push((task.queue_path(), task.body_for_enqueue()?));
    }

    let connection = first.connection().clone();
    let submit = || {
        let items = items.clone();
        let connection = connection.clone();
        async move {
            let responses = connection.batch_create(items).await?;
            for (index, result) in responses.iter().enumerate() {
                batch_callback(index, result)?;
            }
            Ok(responses.into_iter().filter_map(Result::ok).collect())
        }
    };

    let created = if retry_limit == 0 {
        submit().await?
    } else {
        with_retry(retry_limit, retry_interval, submit).await?
    };
    Ok(BatchOutcome::Enqueued(created))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TasksConfig;
    use crate::connection::{Connection, QueueTransport};
    use crate::registry::TaskRegistry;
    use crate::task::{Payload, TaskDefinition};
    use crate::wrapper::{TaskBody, TaskTarget};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct RecordingTransport {
        create_calls: AtomicU32,
        batch_calls: AtomicU32,
        fail_first_item: bool,
    }

    impl RecordingTransport {
        fn new(fail_first_item: bool) -> Self {
            Self {
                create_calls: AtomicU32::new(0),
                batch_calls: AtomicU32::new(0),
                fail_first_item,
            }
        }
    }

    #[async_trait]
    impl QueueTransport for RecordingTransport {
        async fn create_task(
            &self,
            queue_path: &str,
            _body: TaskBody,
        ) -> Result<CreatedTask, DispatchError> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            Ok(CreatedTask {
                name: format!("{queue_path}/tasks/1"),
            })
        }

        async fn batch_create(
            &self,
            items: Vec<(String, TaskBody)>,
        ) -> Result<Vec<Result<CreatedTask, BatchItemError>>, DispatchError> {
            self.batch_calls.fetch_add(1, Ordering::SeqCst);
            Ok(items
                .into_iter()
                .enumerate()
                .map(|(i, (parent, _))| {
                    if i == 0 && self.fail_first_item {
                        Err(BatchItemError {
                            body: br#"{"error":{"message":"queue does not exist"}}"#.to_vec(),
                        })
                    } else {
                        Ok(CreatedTask {
                            name: format!("{parent}/tasks/{i}"),
                        })
                    }
                })
                .collect())
        }
    }

    fn setup(
        execute_locally: bool,
        transport: Arc<RecordingTransport>,
    ) -> (Arc<TasksConfig>, Arc<Connection>, Arc<TaskRegistry>) {
        let cfg = Arc::new(TasksConfig {
            project_id: "acme".into(),
            task_handler_root_url: "https://worker.local/tasks".into(),
            handler_secret: "s3cret".into(),
            execute_locally,
            ..TasksConfig::default()
        });
        let conn = Arc::new(Connection::new(transport));
        let registry = Arc::new(TaskRegistry::new());
        (cfg, conn, registry)
    }

    fn local_wrapper(
        cfg: &Arc<TasksConfig>,
        conn: &Arc<Connection>,
        registry: &Arc<TaskRegistry>,
        name: &str,
    ) -> TaskWrapper {
        let def = registry.register(TaskDefinition::new(name, |_ctx, _p: Payload| async move {
            Ok(json!("done"))
        }));
        TaskWrapper::new(
            TaskTarget::Registered(def),
            "default",
            Payload::new(),
            HashMap::new(),
            None,
            cfg.clone(),
            conn.clone(),
            registry.clone(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn rejects_batches_of_1000_before_building_bodies() {
        let transport = Arc::new(RecordingTransport::new(false));
        let (cfg, conn, registry) = setup(false, transport.clone());
        let wrapper = local_wrapper(&cfg, &conn, &registry, "tests.t");
        let tasks: Vec<_> = (0..1000).map(|_| wrapper.clone()).collect();

        let err = batch_execute(&tasks, 1, Duration::from_millis(1))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::BatchTooLarge(1000)));
        assert_eq!(transport.batch_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn accepts_batches_of_999() {
        let transport = Arc::new(RecordingTransport::new(false));
        let (cfg, conn, registry) = setup(false, transport.clone());
        let wrapper = local_wrapper(&cfg, &conn, &registry, "tests.t");
        let tasks: Vec<_> = (0..999).map(|_| wrapper.clone()).collect();

        match batch_execute(&tasks, 1, Duration::from_millis(1)).await.unwrap() {
            BatchOutcome::Enqueued(created) => assert_eq!(created.len(), 999),
            other => panic!("expected enqueued outcome, got {other:?}"),
        }
        assert_eq!(transport.batch_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn local_mode_runs_tasks_without_batching() {
        let transport = Arc::new(RecordingTransport::new(false));
        let (cfg, conn, registry) = setup(true, transport.clone());
        let tasks = vec![
            local_wrapper(&cfg, &conn, &registry, "tests.a"),
            local_wrapper(&cfg, &conn, &registry, "tests.b"),
        ];

        assert!(matches!(
            batch_execute(&tasks, 1, Duration::from_millis(1)).await.unwrap(),
            BatchOutcome::Local
        ));
        assert_eq!(transport.batch_calls.load(Ordering::SeqCst), 0);
        assert_eq!(transport.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn first_item_failure_surfaces_as_aggregate_error() {
        let transport = Arc::new(RecordingTransport::new(true));
        let (cfg, conn, registry) = setup(false, transport.clone());
        let wrapper = local_wrapper(&cfg, &conn, &registry, "tests.t");
        let tasks = vec![wrapper.clone(), wrapper.clone()];

        // retry_limit 0: single shot, error propagates directly.
        let err = batch_execute(&tasks, 0, Duration::from_millis(1))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Batch(ref m) if m == "queue does not exist"));
        assert_eq!(transport.batch_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn batch_failures_are_retried_then_exhausted() {
        let transport = Arc::new(RecordingTransport::new(true));
        let (cfg, conn, registry) = setup(false, transport.clone());
        let wrapper = local_wrapper(&cfg, &conn, &registry, "tests.t");
        let tasks = vec![wrapper];

        let err = batch_execute(&tasks, 3, Duration::from_millis(1))
            .await
            .unwrap_err();
        assert_eq!(transport.batch_calls.load(Ordering::SeqCst), 3);
        assert!(err.to_string().starts_with("Task scheduling limit exhausted"));
    }

    #[tokio::test]
    async fn empty_batch_is_a_successful_noop() {
        match batch_execute(&[], 1, Duration::from_millis(1)).await.unwrap() {
            BatchOutcome::Enqueued(created) => assert!(created.is_empty()),
            other => panic!("expected empty enqueued outcome, got {other:?}"),
        }
    }
}
