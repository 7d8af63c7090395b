//! Worker-side entry point for task callbacks.
//!
//! Both the emulated path and a real HTTP frontend (see the cli's serve
//! command) funnel inbound deliveries through [`run_task`], so local
//! tests exercise the same dispatch logic production callbacks do.

use std::collections::HashMap;

use crate::config::TasksConfig;
use crate::constants::{HANDLER_SECRET_HEADER, QUEUE_NAME_HEADER, TASK_NAME_HEADER};
use crate::error::DispatchError;
use crate::registry::TaskRegistry;
use crate::task::{Payload, TaskContext};

/// An inbound task delivery, real or emulated.
#[derive(Debug, Clone)]
pub struct TaskRequest {
    pub uri: String,
    pub headers: HashMap<String, String>,
    pub body: serde_json::Value,
}

impl TaskRequest {
    pub fn new(uri: String, headers: HashMap<String, String>, body: serde_json::Value) -> Self {
        Self { uri, headers, body }
    }

    /// Id of the delivered task, from the delivery headers.
    pub fn task_id(&self) -> Option<&str> {
        self.headers.get(TASK_NAME_HEADER).map(String::as_str)
    }

    /// Originating queue name, from the delivery headers.
    pub fn queue_name(&self) -> Option<&str> {
        self.headers.get(QUEUE_NAME_HEADER).map(String::as_str)
    }

    /// Internal task name: the last path segment of the delivery URI.
    pub fn task_name(&self) -> Option<&str> {
        let path = self.uri.split('?').next().unwrap_or("");
        path.trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
    }
}

/// Verify the callback secret, resolve the task, and run its body with
/// the delivered payload.
///
/// The secret check happens before anything else; a mismatch never
/// reaches the registry or the task body.
pub async fn run_task(
    request: TaskRequest,
    registry: &TaskRegistry,
    cfg: &TasksConfig,
) -> Result<serde_json::Value, DispatchError> {
    let supplied = request.headers.get(HANDLER_SECRET_HEADER);
    if supplied.map(String::as_str) != Some(cfg.handler_secret.as_str()) {
        tracing::warn!(uri = %request.uri, "rejected task callback: handler secret mismatch");
        return Err(DispatchError::Unauthorized);
    }

    let name = request
        .task_name()
        .ok_or_else(|| DispatchError::Decode("delivery URI carries no task name".into()))?
        .to_string();
    let definition = registry.resolve(&name)?;

    let payload: Payload = match &request.body {
        serde_json::Value::Object(map) => map.clone(),
        serde_json::Value::Null => Payload::new(),
        other => {
            return Err(DispatchError::Decode(format!(
                "task payload must be a JSON object, got {other}"
            )))
        }
    };

    let ctx = TaskContext::from_parts(
        request
            .task_id()
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string()),
        request
            .queue_name()
            .map(str::to_string)
            .unwrap_or_else(|| "unknown".to_string()),
        request.headers.clone(),
    );

    tracing::debug!(task = %name, task_id = %ctx.task_id, queue = %ctx.queue_name, "running task");
    definition.run(ctx, payload).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskDefinition;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn cfg() -> TasksConfig {
        TasksConfig {
            handler_secret: "s3cret".into(),
            ..TasksConfig::default()
        }
    }

    fn delivery(secret: &str, body: serde_json::Value) -> TaskRequest {
        let mut headers = HashMap::new();
        headers.insert(TASK_NAME_HEADER.to_string(), "abc123".to_string());
        headers.insert(QUEUE_NAME_HEADER.to_string(), "emulated".to_string());
        headers.insert(HANDLER_SECRET_HEADER.to_string(), secret.to_string());
        TaskRequest::new(
            "https://worker.local/tasks/tests.echo".to_string(),
            headers,
            body,
        )
    }

    #[tokio::test]
    async fn dispatches_to_registered_task() {
        let registry = TaskRegistry::new();
        registry.register(TaskDefinition::new("tests.echo", |ctx: TaskContext, p: Payload| {
            async move {
                assert_eq!(ctx.task_id, "abc123");
                assert_eq!(ctx.queue_name, "emulated");
                Ok(p.get("x").cloned().unwrap_or(serde_json::Value::Null))
            }
        }));

        let out = run_task(delivery("s3cret", json!({"x": 7})), &registry, &cfg())
            .await
            .unwrap();
        assert_eq!(out, json!(7));
    }

    #[tokio::test]
    async fn secret_mismatch_never_reaches_task_body() {
        let calls = Arc::new(AtomicU32::new(0));
        let registry = TaskRegistry::new();
        let seen = calls.clone();
        registry.register(TaskDefinition::new("tests.echo", move |_ctx, _p| {
            let seen = seen.clone();
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(serde_json::Value::Null)
            }
        }));

        let err = run_task(delivery("wrong", json!({})), &registry, &cfg())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Unauthorized));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_task_is_not_found() {
        let registry = TaskRegistry::new();
        let err = run_task(delivery("s3cret", json!({})), &registry, &cfg())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::TaskNotFound(_)));
    }

    #[tokio::test]
    async fn non_object_payload_is_rejected() {
        let registry = TaskRegistry::new();
        registry.register(TaskDefinition::new("tests.echo", |_ctx, _p| async move {
            Ok(serde_json::Value::Null)
        }));

        let err = run_task(delivery("s3cret", json!([1, 2, 3])), &registry, &cfg())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Decode(_)));
    }

    #[test]
    fn task_name_comes_from_last_path_segment() {
        let req = TaskRequest::new(
            "https://w/tasks/pkg.mod.f/?x=1".into(),
            HashMap::new(),
            serde_json::Value::Null,
        );
        assert_eq!(req.task_name(), Some("pkg.mod.f"));
    }
}
