//! Local-mode delivery emulation.
//!
//! The emulated path round-trips exactly what the remote queue would
//! send: the base64-encoded body built by `get_body` is decoded back,
//! synthetic delivery headers are attached, and the result is driven
//! through the same worker-side entry point a real callback would hit.
//! Decode failures are fatal — there is no transient remote failure to
//! retry against in local mode.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::config::TasksConfig;
use crate::constants::{EMULATED_QUEUE_NAME, HANDLER_SECRET_HEADER, QUEUE_NAME_HEADER, TASK_NAME_HEADER};
use crate::error::DispatchError;
use crate::registry::TaskRegistry;
use crate::worker::{self, TaskRequest};
use crate::wrapper::TaskBody;

/// A task body re-interpreted as an inbound delivery.
#[derive(Debug)]
pub struct EmulatedTask {
    body: TaskBody,
    payload: serde_json::Value,
}

impl EmulatedTask {
    /// Decode the embedded base64/JSON body. Malformed input propagates
    /// as a fatal local error.
    pub fn new(body: TaskBody) -> Result<Self, DispatchError> {
        let encoded = body
            .http_request
            .body
            .as_deref()
            .ok_or_else(|| DispatchError::Decode("emulated task has no body".into()))?;
        let raw = BASE64.decode(encoded)?;
        let payload: serde_json::Value = serde_json::from_slice(&raw)?;
        Ok(Self { body, payload })
    }

    /// The decoded JSON payload as it will be delivered.
    pub fn json_body(&self) -> &serde_json::Value {
        &self.payload
    }

    /// Synthetic delivery headers: random task id, the emulated queue
    /// name, and the handler secret from configuration.
    pub fn request_headers(&self, handler_secret: &str) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert(
            TASK_NAME_HEADER.to_string(),
            uuid::Uuid::new_v4().simple().to_string(),
        );
        headers.insert(
            QUEUE_NAME_HEADER.to_string(),
            EMULATED_QUEUE_NAME.to_string(),
        );
        headers.insert(HANDLER_SECRET_HEADER.to_string(), handler_secret.to_string());
        headers
    }

    /// Deliver the synthetic request to the worker-side handler exactly
    /// as a real callback would arrive, returning its result.
    pub async fn execute(
        &self,
        registry: &TaskRegistry,
        cfg: &TasksConfig,
    ) -> Result<serde_json::Value, DispatchError> {
        let request = TaskRequest::new(
            self.body.http_request.url.clone(),
            self.request_headers(&cfg.handler_secret),
            self.payload.clone(),
        );
        worker::run_task(request, registry, cfg).await
    }
}
