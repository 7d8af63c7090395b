//! Sample task declarations for the demo worker.
//!
//! Real services declare their tasks the same way at startup: one
//! `task(...)` call per function, before serving or dispatching.

use std::collections::HashMap;

use serde_json::json;
use taskwire_core::api::{task, DispatchError, Payload, TaskContext, TaskFactory};

pub fn register_all() -> Vec<TaskFactory> {
    let hello = task(
        "default",
        "demo.hello",
        HashMap::new(),
        |ctx: TaskContext, payload: Payload| async move {
            let name = payload
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("world");
            tracing::info!(task_id = %ctx.task_id, queue = %ctx.queue_name, "saying hello");
            Ok(json!({ "greeting": format!("hello, {name}") }))
        },
    );

    let sum = task(
        "default",
        "demo.sum",
        HashMap::new(),
        |_ctx, payload: Payload| async move {
            let values = payload
                .get("values")
                .and_then(|v| v.as_array())
                .ok_or_else(|| {
                    DispatchError::Task("payload must carry a \"values\" array".into())
                })?;
            let total: i64 = values.iter().filter_map(|v| v.as_i64()).sum();
            Ok(json!({ "total": total }))
        },
    );

    vec![hello, sum]
}
