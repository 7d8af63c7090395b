//! Command-line argument definitions.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "taskwire", about = "Task-dispatch worker and demo tooling")]
pub struct Cli {
    /// Path to a config.toml; defaults to ./config.toml when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the worker callback endpoint.
    Serve(ServeArgs),
    /// Enqueue a task by handler name (remote-only reference).
    Enqueue(EnqueueArgs),
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, default_value_t = 8080)]
    pub port: u16,
}

#[derive(Debug, Args)]
pub struct EnqueueArgs {
    /// Internal task name of the handler on the worker service.
    #[arg(long)]
    pub handler: String,

    /// Queue to enqueue onto; defaults to the configured default queue.
    #[arg(long)]
    pub queue: Option<String>,

    /// JSON object payload, e.g. '{"x": 1}'.
    #[arg(long)]
    pub payload: Option<String>,

    /// Delay delivery by this many seconds.
    #[arg(long)]
    pub delay: Option<f64>,

    /// Scheduling attempts before giving up (0 = single shot).
    #[arg(long, default_value_t = 10)]
    pub retry_limit: u32,
}
