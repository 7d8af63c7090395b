use clap::Parser;

mod commands;
mod server;
mod tasks;

use commands::{Cli, Command, EnqueueArgs};
use taskwire_core::api::{remote_task, ExecuteOutcome, LoggingConfig, Payload, TasksConfig};
use taskwire_core::{config, registry};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(e) = real_main().await {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

async fn real_main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = match &cli.config {
        Some(path) => config::load_from_path(path)?,
        None => config::load_default()?,
    };
    init_tracing(&cfg.logging);

    let cfg = config::init(cfg);
    tasks::register_all();

    match cli.command {
        Command::Serve(args) => {
            let state = server::AppState {
                config: cfg,
                registry: registry::global(),
            };
            server::serve(args.host, args.port, state).await
        }
        Command::Enqueue(args) => enqueue(cfg, args).await,
    }
}

async fn enqueue(cfg: std::sync::Arc<TasksConfig>, args: EnqueueArgs) -> anyhow::Result<()> {
    let payload: Payload = match &args.payload {
        Some(raw) => serde_json::from_str(raw)?,
        None => Payload::new(),
    };

    let queue = args.queue.unwrap_or_else(|| cfg.default_queue.clone());
    let reference = remote_task(queue, args.handler, None, Default::default());

    let mut wrapper = reference.payload(payload)?;
    if let Some(delay) = args.delay {
        wrapper = wrapper.with_delay(delay);
    }

    let outcome = wrapper
        .execute_opts(
            args.retry_limit,
            taskwire_core::retry::DEFAULT_RETRY_INTERVAL,
        )
        .await?;

    match outcome {
        ExecuteOutcome::Enqueued(task) => println!("enqueued: {}", task.name),
        ExecuteOutcome::Blocked => println!("blocked: remote tasks are disabled by config"),
        ExecuteOutcome::Local(value) => println!("ran locally: {value}"),
    }
    Ok(())
}

fn init_tracing(cfg: &LoggingConfig) {
    if !cfg.enabled {
        return;
    }
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
