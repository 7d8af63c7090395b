//! Process-wide mapping from internal task name to task definition.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use crate::error::DispatchError;
use crate::task::TaskDefinition;

/// Registry of task definitions keyed by internal task name.
///
/// Registration happens at startup (module-init time); resolution happens
/// at call time, possibly from many threads. Re-registering a name
/// replaces the prior definition — last write wins, by contract rather
/// than by accident, so startup code may re-declare a task deliberately.
pub struct TaskRegistry {
    tasks: RwLock<HashMap<String, Arc<TaskDefinition>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
        }
    }

    /// Store a definition under its internal task name, returning the
    /// shared handle. Overwrites any prior entry with the same name.
    pub fn register(&self, definition: TaskDefinition) -> Arc<TaskDefinition> {
        let name = definition.internal_task_name.clone();
        let def = Arc::new(definition);
        let mut tasks = self.tasks.write().unwrap();
        if tasks.insert(name.clone(), def.clone()).is_some() {
            tracing::debug!(task = %name, "task re-registered, replacing prior definition");
        } else {
            tracing::debug!(task = %name, "task registered");
        }
        def
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<TaskDefinition>, DispatchError> {
        let tasks = self.tasks.read().unwrap();
        tasks
            .get(name)
            .cloned()
            .ok_or_else(|| DispatchError::TaskNotFound(name.to_string()))
    }

    pub fn registered_names(&self) -> Vec<String> {
        let tasks = self.tasks.read().unwrap();
        tasks.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide registry used by the declaration surface. Constructed
/// on first access, lives for the process lifetime.
pub fn global() -> Arc<TaskRegistry> {
    static REGISTRY: OnceLock<Arc<TaskRegistry>> = OnceLock::new();
    REGISTRY.get_or_init(|| Arc::new(TaskRegistry::new())).clone()
}
