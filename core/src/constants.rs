//! Wire-level names shared by the enqueue and worker sides.

/// Header carrying the delivered task's id.
pub const TASK_NAME_HEADER: &str = "X-TASK-NAME";

/// Header carrying the originating queue name.
pub const QUEUE_NAME_HEADER: &str = "X-TASK-QUEUE";

/// Header carrying the shared secret the worker verifies on every
/// inbound callback. Force-set by the dispatch side; caller-supplied
/// values never survive.
pub const HANDLER_SECRET_HEADER: &str = "X-TASK-HANDLER-SECRET";

/// Queue name reported to task bodies running through the emulated path.
pub const EMULATED_QUEUE_NAME: &str = "emulated";

/// Batches at or above this size are rejected before any body is built.
pub const MAX_TASKS_PER_BATCH: usize = 1000;
