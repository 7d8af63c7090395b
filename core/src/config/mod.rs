pub mod load;
pub mod types;

pub use load::{load_default, load_from_path};
pub use types::{LoggingConfig, TasksConfig};

use std::sync::{Arc, OnceLock};

use crate::error::DispatchError;

static CONFIG: OnceLock<Arc<TasksConfig>> = OnceLock::new();

/// Install the process-wide configuration.
///
/// First call wins; later calls (including concurrent first-access races)
/// return the already-installed configuration. Core types also accept an
/// explicit `Arc<TasksConfig>`, so tests never need this global.
pub fn init(cfg: TasksConfig) -> Arc<TasksConfig> {
    CONFIG.get_or_init(|| Arc::new(cfg)).clone()
}

/// Fetch the process-wide configuration installed by [`init`].
pub fn get() -> Result<Arc<TasksConfig>, DispatchError> {
    CONFIG.get().cloned().ok_or_else(|| {
        DispatchError::Config("taskwire configuration not initialized; call config::init first".into())
    })
}
