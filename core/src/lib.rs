//! taskwire-core
//!
//! Task-dispatch shim: named tasks are registered at startup and
//! scheduled either onto a remote managed queue (which calls back into a
//! worker HTTP endpoint) or, in local mode, executed in-process through
//! an emulated HTTP round-trip that exercises the same worker-side
//! dispatch logic.
//!
//! Delivery is at-least-once with bounded retries; there is no
//! exactly-once guarantee.

pub mod api;
pub mod batch;
pub mod codec;
pub mod config;
pub mod connection;
pub mod constants;
pub mod emulated;
pub mod error;
pub mod registry;
pub mod retry;
pub mod task;
pub mod worker;
pub mod wrapper;
