use serde::{Deserialize, Serialize};

/// Configuration consumed by the dispatch core.
///
/// The core does not own credential acquisition or settings discovery;
/// it only reads the values collected here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Cloud project the queues live in.
    #[serde(default = "default_project_id")]
    pub project_id: String,

    /// Queue location, e.g. "us-central1".
    #[serde(default = "default_location")]
    pub location: String,

    /// Base URL of the managed queue API.
    #[serde(default = "default_queue_endpoint")]
    pub queue_endpoint: String,

    /// Queue used when a task declaration does not name one.
    #[serde(default = "default_queue")]
    pub default_queue: String,

    /// Root URL of the worker service the queue calls back into.
    /// The internal task name is joined onto this as the final path
    /// segment. Required for building any request body.
    #[serde(default)]
    pub task_handler_root_url: String,

    /// Path prefix the worker serves task callbacks under.
    #[serde(default = "default_task_handler_uri")]
    pub task_handler_uri: String,

    /// Service account named in the OIDC token configuration; the queue
    /// uses it to authenticate its callback to the worker.
    #[serde(default)]
    pub service_account_email: String,

    /// Shared secret the worker verifies on every inbound callback.
    #[serde(default)]
    pub handler_secret: String,

    /// If true, non-remote tasks run in-process through the emulated
    /// delivery path instead of being enqueued.
    #[serde(default)]
    pub execute_locally: bool,

    /// Safety valve: if true, remote-marked tasks are dropped (logged)
    /// instead of enqueued.
    #[serde(default)]
    pub block_remote_tasks: bool,

    /// Timeout for calls to the queue API, in milliseconds.
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_project_id() -> String {
    "my-project".to_string()
}

fn default_location() -> String {
    "us-central1".to_string()
}

fn default_queue_endpoint() -> String {
    "https://cloudtasks.googleapis.com".to_string()
}

fn default_queue() -> String {
    "default".to_string()
}

fn default_task_handler_uri() -> String {
    "/tasks".to_string()
}

fn default_http_timeout_ms() -> u64 {
    30_000
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            project_id: default_project_id(),
            location: default_location(),
            queue_endpoint: default_queue_endpoint(),
            default_queue: default_queue(),
            task_handler_root_url: String::new(),
            task_handler_uri: default_task_handler_uri(),
            service_account_email: String::new(),
            handler_secret: String::new(),
            execute_locally: false,
            block_remote_tasks: false,
            http_timeout_ms: default_http_timeout_ms(),
            logging: LoggingConfig::default(),
        }
    }
}

impl TasksConfig {
    /// Fully qualified parent of the project's queues:
    /// `projects/{project}/locations/{location}`.
    pub fn project_location_name(&self) -> String {
        format!("projects/{}/locations/{}", self.project_id, self.location)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// EnvFilter string, e.g. "info" or "taskwire_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            level: default_logging_level(),
        }
    }
}
