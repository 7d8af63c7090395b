//! End-to-end dispatch flows through the public API.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use taskwire_core::api::{
    batch_execute, remote_task, task_in, BatchOutcome, Connection, CreatedTask, DispatchError,
    ExecuteOutcome, Payload, QueueTransport, TaskBody, TaskRegistry, TasksConfig,
};
use taskwire_core::connection::BatchItemError;

struct UnreachableTransport;

#[async_trait::async_trait]
impl QueueTransport for UnreachableTransport {
    async fn create_task(
        &self,
        _queue_path: &str,
        _body: TaskBody,
    ) -> Result<CreatedTask, DispatchError> {
        panic!("no network call expected");
    }

    async fn batch_create(
        &self,
        _items: Vec<(String, TaskBody)>,
    ) -> Result<Vec<Result<CreatedTask, BatchItemError>>, DispatchError> {
        panic!("no network call expected");
    }
}

fn local_config() -> Arc<TasksConfig> {
    Arc::new(TasksConfig {
        project_id: "acme".into(),
        task_handler_root_url: "https://worker.local:8000/tasks".into(),
        service_account_email: "acme@appspot.gserviceaccount.com".into(),
        handler_secret: "integration-secret".into(),
        execute_locally: true,
        ..TasksConfig::default()
    })
}

fn no_network() -> Arc<Connection> {
    Arc::new(Connection::new(Arc::new(UnreachableTransport)))
}

#[tokio::test]
async fn declared_task_executes_locally_through_the_worker_path() {
    let registry = Arc::new(TaskRegistry::new());
    let factory = task_in(
        &registry,
        "default",
        "billing.charge",
        HashMap::new(),
        |ctx, payload: Payload| async move {
            // The emulated path must deliver through the real worker
            // entry point, so the context carries delivery headers.
            assert_eq!(ctx.queue_name, "emulated");
            let amount = payload.get("amount").and_then(|v| v.as_i64()).unwrap_or(0);
            Ok(json!({ "charged": amount }))
        },
    );

    let mut payload = Payload::new();
    payload.insert("amount".into(), json!(250));

    let wrapper = factory
        .call_with(local_config(), no_network(), registry.clone(), payload)
        .unwrap();

    match wrapper.execute().await.unwrap() {
        ExecuteOutcome::Local(value) => assert_eq!(value, json!({ "charged": 250 })),
        other => panic!("expected local execution, got {other:?}"),
    }
}

#[tokio::test]
async fn payload_round_trips_exactly_through_body_and_emulation() {
    let registry = Arc::new(TaskRegistry::new());
    let factory = task_in(
        &registry,
        "default",
        "tests.mirror",
        HashMap::new(),
        |_ctx, payload: Payload| async move { Ok(serde_json::Value::Object(payload)) },
    );

    let mut payload = Payload::new();
    payload.insert("s".into(), json!("text"));
    payload.insert("n".into(), json!(42));
    payload.insert("f".into(), json!(1.5));
    payload.insert("b".into(), json!(true));
    payload.insert("null".into(), json!(null));
    payload.insert("deep".into(), json!({ "list": [1, "two", {"three": 3}] }));

    let wrapper = factory
        .call_with(local_config(), no_network(), registry.clone(), payload.clone())
        .unwrap();

    // Keys, value types and nesting must all survive the base64/JSON
    // wire round-trip.
    let echoed = wrapper.execute_local().await.unwrap();
    assert_eq!(echoed, serde_json::Value::Object(payload));
}

#[tokio::test]
async fn blocked_remote_task_performs_no_network_call() {
    let cfg = Arc::new(TasksConfig {
        block_remote_tasks: true,
        execute_locally: false,
        ..(*local_config()).clone()
    });

    let reference = remote_task("default", "other-service.cleanup", None, HashMap::new());
    let wrapper = reference
        .payload_with(cfg, no_network(), Payload::new())
        .unwrap();

    assert!(matches!(
        wrapper.execute().await.unwrap(),
        ExecuteOutcome::Blocked
    ));
}

#[tokio::test]
async fn batch_ceiling_applies_before_any_dispatch() {
    let registry = Arc::new(TaskRegistry::new());
    let factory = task_in(
        &registry,
        "default",
        "tests.bulk",
        HashMap::new(),
        |_ctx, _payload| async move { Ok(serde_json::Value::Null) },
    );
    let wrapper = factory
        .call_with(local_config(), no_network(), registry.clone(), Payload::new())
        .unwrap();

    let tasks: Vec<_> = (0..1000).map(|_| wrapper.clone()).collect();
    let err = batch_execute(&tasks, 1, Duration::from_millis(1))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::BatchTooLarge(1000)));

    // 999 local tasks run fine.
    let tasks: Vec<_> = (0..999).map(|_| wrapper.clone()).collect();
    assert!(matches!(
        batch_execute(&tasks, 1, Duration::from_millis(1)).await.unwrap(),
        BatchOutcome::Local
    ));
}
