//! Fanout - bounded concurrent task fan-out
//!
//! CLI entry point for running demo task sets through the executor.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result, eyre};
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use fanout::cli::{Cli, Command, OutputFormat};
use fanout::config::Config;
use fanout::demo::{CompletionLog, DemoError, DemoPlan};
use fanout::error::RunError;
use fanout::events::{EventBus, EventLogEntry};
use fanout::results::Results;
use fanout::scheduler::Executor;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fanout")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("fanout.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Setup logging with priority: CLI > config > INFO default
    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;

    config.validate()?;
    info!(
        default_limit = config.executor.default_limit,
        unit_ms = config.demo.unit_ms,
        "Fanout loaded config"
    );

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Run {
            values,
            limit,
            keys,
            fail_at,
            tuple,
            unit_ms,
            format,
            events,
        } => {
            let plan = DemoPlan {
                values,
                fail_at,
                tuple,
                keys,
            };
            cmd_run(config, plan, limit, unit_ms, format, events).await
        }
        Command::Config => cmd_config(&config),
    }
}

async fn cmd_run(
    mut config: Config,
    plan: DemoPlan,
    limit: Option<usize>,
    unit_ms: Option<u64>,
    format: OutputFormat,
    stream_events: bool,
) -> Result<()> {
    debug!(?plan, ?limit, ?unit_ms, ?format, stream_events, "cmd_run: called");
    if let Some(unit_ms) = unit_ms {
        config.demo.unit_ms = unit_ms;
        config.demo.validate()?;
    }

    let log = CompletionLog::new();
    let tasks = plan.build(&config.demo, &log)?;

    let bus = Arc::new(EventBus::new(config.executor.event_capacity));
    let printer = stream_events.then(|| tokio::spawn(print_events(bus.subscribe())));
    let executor = Executor::new(config.executor.clone()).with_event_bus(bus.clone());

    let handle = match limit {
        Some(limit) => executor.run_limited(tasks, limit, None),
        None => executor.run_all(tasks, None),
    }?;
    let run_id = handle.run_id();
    info!(%run_id, "cmd_run: waiting for run");
    let outcome = handle.await;
    let order = log.snapshot();

    // The printer stops once every sender is gone, which includes the
    // emitters held by tasks still running after a failure.
    drop(executor);
    drop(bus);
    if let Some(printer) = printer
        && let Err(e) = printer.await
    {
        warn!(error = %e, "cmd_run: event printer failed");
    }

    report(outcome, &order, format)
}

fn report(outcome: Result<Results<u64>, RunError<DemoError>>, order: &[u64], format: OutputFormat) -> Result<()> {
    debug!(?order, ?format, "report: called");
    match (outcome, format) {
        (Ok(results), OutputFormat::Json) => {
            println!("{}", json!({ "results": results, "order": order }));
            Ok(())
        }
        (Ok(results), OutputFormat::Text) => {
            println!("results: {}", serde_json::to_string(&results)?);
            println!("order: {}", format_order(order));
            Ok(())
        }
        (Err(e), OutputFormat::Json) => {
            println!("{}", json!({ "error": e.to_string(), "order": order }));
            Err(eyre!("Run failed: {}", e))
        }
        (Err(e), OutputFormat::Text) => {
            println!("order: {}", format_order(order));
            Err(eyre!("Run failed: {}", e))
        }
    }
}

fn format_order(order: &[u64]) -> String {
    order.iter().map(u64::to_string).collect::<Vec<_>>().join(" ")
}

async fn print_events(mut rx: broadcast::Receiver<fanout::events::ExecutorEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => match serde_json::to_string(&EventLogEntry::new(event)) {
                Ok(line) => {
                    let _ = writeln!(std::io::stderr(), "{}", line);
                }
                Err(e) => warn!(error = %e, "print_events: failed to serialize event"),
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "print_events: subscriber lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn cmd_config(config: &Config) -> Result<()> {
    debug!("cmd_config: called");
    let yaml = serde_yaml::to_string(config).context("Failed to serialize configuration")?;
    print!("{}", yaml);
    Ok(())
}
