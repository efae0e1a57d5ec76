use std::sync::Arc;

use console::{Term, style};
use starfeed::{Engine, QueueStats, Store, SyncOutcome, WorkItem};
use tokio::sync::mpsc;

use crate::SyncAction;
use crate::commands::shared::{build_engine, open_store};
use crate::config::Config;
use crate::shutdown::Shutdown;

pub(crate) async fn handle_sync(
    action: SyncAction,
    config: &Config,
    database_url: &str,
    shutdown: &Shutdown,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(database_url).await?;
    let engine = build_engine(config, Arc::clone(&store))?;
    let is_tty = Term::stdout().is_term();

    match action {
        SyncAction::Stars { user } => {
            let item = WorkItem::SyncStarredRepos { user_id: user };
            let outcome = engine.handle(&item).await?;
            display_outcome(&format!("user {user}"), "followed", &outcome, is_tty);
        }
        SyncAction::Versions { repo } => {
            let item = WorkItem::SyncVersion { repo_id: repo };
            let outcome = engine.handle(&item).await?;
            display_outcome(&format!("repo {repo}"), "new versions", &outcome, is_tty);
        }
        SyncAction::AllStars { concurrency } => {
            let items = store
                .active_user_ids()
                .await?
                .into_iter()
                .map(|user_id| WorkItem::SyncStarredRepos { user_id })
                .collect();
            let concurrency = concurrency.unwrap_or(config.worker.concurrency);
            let stats = run_bulk(&engine, items, concurrency, shutdown.clone()).await;
            display_stats("users", &stats, is_tty);
        }
        SyncAction::AllVersions { concurrency } => {
            let items = store
                .active_repo_ids()
                .await?
                .into_iter()
                .map(|repo_id| WorkItem::SyncVersion { repo_id })
                .collect();
            let concurrency = concurrency.unwrap_or(config.worker.concurrency);
            let stats = run_bulk(&engine, items, concurrency, shutdown.clone()).await;
            display_stats("repositories", &stats, is_tty);
        }
    }

    Ok(())
}

/// Feed `items` through the engine's queue. Enqueueing stops on Ctrl+C;
/// items already running are allowed to finish.
async fn run_bulk(
    engine: &Engine,
    items: Vec<WorkItem>,
    concurrency: usize,
    shutdown: Shutdown,
) -> QueueStats {
    let concurrency = concurrency.max(1);
    let total = items.len();
    let (tx, rx) = mpsc::channel(concurrency * 2);

    let producer = tokio::spawn(async move {
        let mut sent = 0usize;
        for item in items {
            if shutdown.is_requested() {
                tracing::warn!(sent, total, "Shutdown requested, not enqueueing remaining items");
                break;
            }
            if tx.send(item).await.is_err() {
                break;
            }
            sent += 1;
        }
        sent
    });

    tracing::info!(total, concurrency, "Processing work items");
    let stats = engine.run_queue(rx, concurrency).await;

    if let Err(e) = producer.await {
        tracing::error!("Enqueueing task failed: {}", e);
    }
    stats
}

fn display_outcome(subject: &str, counted: &str, outcome: &SyncOutcome, is_tty: bool) {
    if !is_tty {
        tracing::info!(subject, %outcome, "Sync finished");
        return;
    }

    match outcome {
        SyncOutcome::Completed(count) => {
            println!("{} {subject}: {count} {counted}", style("✓").green());
        }
        SyncOutcome::Partial { count, reason } => {
            println!(
                "{} {subject}: {count} {counted}, stopped early ({})",
                style("⚠").yellow(),
                reason.as_str()
            );
        }
        SyncOutcome::Aborted(reason) => {
            println!(
                "{} {subject}: nothing done ({})",
                style("✗").red(),
                reason.as_str()
            );
        }
    }
}

fn display_stats(subject: &str, stats: &QueueStats, is_tty: bool) {
    if !is_tty {
        return;
    }

    println!(
        "\n{} {} {subject} processed: {} completed, {} partial, {} skipped, {} failed",
        if stats.failed > 0 {
            style("⚠").yellow()
        } else {
            style("✓").green()
        },
        stats.total(),
        stats.completed,
        stats.partial,
        stats.aborted,
        stats.failed
    );
}
