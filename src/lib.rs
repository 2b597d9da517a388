// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod maintenance;
pub mod notify;
pub mod types;
pub mod workflow;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::dag::{GraphExecutor, TaskGraph};
use crate::engine::{
    CoreRuntime, ExecutorLauncher, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason,
    spawn_ticker,
};
use crate::exec::{HttpRemoteClient, RetryPolicy};
use crate::maintenance::{AccuracyGate, MaintenanceOutcome, MaintenanceTasks, maintenance_graph};
use crate::notify::ConfiguredNotifier;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the maintenance graph and its executor
/// - scheduler core / queue / runtime
/// - the interval ticker (disabled in `--once` mode)
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config_path();
    let cfg = load_and_validate(&config_path)?;
    let graph = Arc::new(maintenance_graph()?);

    if args.dry_run {
        print_dry_run(&cfg, &graph);
        return Ok(());
    }

    let client = HttpRemoteClient::new(&cfg.api)?;
    let notifier = ConfiguredNotifier::from_config(&cfg.notify, &cfg.api)?;
    let tasks = MaintenanceTasks::new(
        client,
        notifier,
        AccuracyGate::new(cfg.gate.accuracy_threshold),
        cfg.notify.recipients.clone(),
    );
    let executor = Arc::new(GraphExecutor::new(
        graph,
        tasks,
        RetryPolicy::from(cfg.retry),
    ));

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let launcher = ExecutorLauncher::new(executor, rt_tx.clone());

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    let _ticker = if args.once {
        rt_tx
            .send(RuntimeEvent::Tick {
                reason: TriggerReason::Manual,
            })
            .await?;
        None
    } else {
        Some(spawn_ticker(
            cfg.schedule.interval,
            cfg.schedule.run_on_startup,
            rt_tx.clone(),
        ))
    };

    let options = RuntimeOptions {
        exit_when_idle: args.once,
    };

    // Construct the pure core runtime (single source of truth for semantics).
    let core = CoreRuntime::new(
        cfg.schedule.overlap,
        cfg.schedule.queue_length,
        cfg.schedule.history_length,
        options,
    );

    // Construct the async IO shell around the core.
    let runtime = Runtime::new(core, rt_rx, launcher);
    let history = runtime.run().await?;

    if let Some(last) = history.latest() {
        let outcome = MaintenanceOutcome::from_run(last);
        if outcome.is_success() {
            info!(
                run_id = %last.id(),
                outcome = outcome.as_str(),
                status = %last.status(),
                finished_runs = history.len(),
                "last workflow run succeeded"
            );
        } else {
            warn!(
                run_id = %last.id(),
                outcome = outcome.as_str(),
                status = %last.status(),
                finished_runs = history.len(),
                "last workflow run needs attention"
            );
        }
    }

    Ok(())
}

/// Simple dry-run output: print settings and the task graph.
fn print_dry_run(cfg: &ConfigFile, graph: &TaskGraph) {
    println!("retraindag dry-run");
    println!("  api.base_url = {}", cfg.api.base_url);
    println!("  api.username = {}", cfg.api.username);
    println!("  api.request_timeout = {:?}", cfg.api.request_timeout);
    println!("  gate.accuracy_threshold = {}", cfg.gate.accuracy_threshold);
    println!(
        "  retry = {} attempts, {:?} apart",
        cfg.retry.max_attempts, cfg.retry.delay
    );
    println!(
        "  schedule = every {:?} (run_on_startup = {}, overlap = {:?}, queue_length = {}, history_length = {})",
        cfg.schedule.interval,
        cfg.schedule.run_on_startup,
        cfg.schedule.overlap,
        cfg.schedule.queue_length,
        cfg.schedule.history_length
    );
    println!("  notify.channel = {:?}", cfg.notify.channel);
    if let Some(ref url) = cfg.notify.webhook_url {
        println!("  notify.webhook_url = {url}");
    }
    if !cfg.notify.recipients.is_empty() {
        println!("  notify.recipients = {:?}", cfg.notify.recipients);
    }
    println!();

    println!("nodes ({}), entry = {}:", graph.len(), graph.entry_node().name());
    for name in graph.topological_order() {
        let Some(node) = graph.node(name) else {
            continue;
        };
        println!("  - {name} ({})", node.kind());
        if !node.deps().is_empty() {
            println!("      after: {:?}", node.deps());
        }
        for outcome in node.outcomes() {
            println!("      on {}: {:?}", outcome.label, outcome.targets);
        }
        println!("      trigger_rule: {}", node.trigger());
        println!("      on_failure: {:?}", node.failure_policy());
        if !node.read_keys().is_empty() {
            let keys: Vec<&str> = node.read_keys().iter().map(|k| k.as_str()).collect();
            println!("      reads: {keys:?}");
        }
        if !node.optional_read_keys().is_empty() {
            let keys: Vec<&str> = node
                .optional_read_keys()
                .iter()
                .map(|k| k.as_str())
                .collect();
            println!("      reads if present: {keys:?}");
        }
        if !node.write_keys().is_empty() {
            let keys: Vec<&str> = node.write_keys().iter().map(|k| k.as_str()).collect();
            println!("      writes: {keys:?}");
        }
    }

    debug!("dry-run complete (no execution)");
}
