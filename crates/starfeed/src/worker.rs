//! Work items and their dispatch.
//!
//! A work item names one user or one repository. Items can be handled
//! directly with [`Engine::handle`] or fed through a channel to
//! [`Engine::run_queue`], which runs several of them at once. Each item
//! selects its own client; no state is shared between items besides the
//! store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;

use crate::credentials::CredentialSelector;
use crate::publisher::Publisher;
use crate::store::Store;
use crate::sync::{
    AbortReason, Result, SyncOptions, SyncOutcome, sync_starred_repos, sync_versions,
};

/// Default number of items processed concurrently by [`Engine::run_queue`].
pub const DEFAULT_CONCURRENCY: usize = 4;

/// One unit of work, as carried by the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkItem {
    SyncStarredRepos { user_id: i64 },
    SyncVersion { repo_id: i64 },
}

/// Counters collected by [`Engine::run_queue`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub completed: usize,
    pub partial: usize,
    pub aborted: usize,
    /// Items that ended with an error or a panic.
    pub failed: usize,
}

impl QueueStats {
    pub fn total(&self) -> usize {
        self.completed + self.partial + self.aborted + self.failed
    }

    fn record(&mut self, outcome: &Result<SyncOutcome>) {
        match outcome {
            Ok(SyncOutcome::Completed(_)) => self.completed += 1,
            Ok(SyncOutcome::Partial { .. }) => self.partial += 1,
            Ok(SyncOutcome::Aborted(_)) => self.aborted += 1,
            Err(_) => self.failed += 1,
        }
    }
}

/// Everything needed to run work items.
#[derive(Clone)]
pub struct Engine {
    store: Arc<dyn Store>,
    selector: Arc<CredentialSelector>,
    publisher: Arc<dyn Publisher>,
    options: SyncOptions,
}

impl Engine {
    pub fn new(
        store: Arc<dyn Store>,
        selector: Arc<CredentialSelector>,
        publisher: Arc<dyn Publisher>,
        options: SyncOptions,
    ) -> Self {
        Self {
            store,
            selector,
            publisher,
            options,
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn selector(&self) -> &CredentialSelector {
        &self.selector
    }

    /// Run one work item to completion.
    ///
    /// # Errors
    /// Store failures, which should surface instead of being retried.
    pub async fn handle(&self, item: &WorkItem) -> Result<SyncOutcome> {
        let Some(client) = self.selector.find().await? else {
            tracing::warn!(?item, "No usable GitHub client, skipping");
            return Ok(SyncOutcome::Aborted(AbortReason::NoClient));
        };

        let outcome = match *item {
            WorkItem::SyncStarredRepos { user_id } => {
                sync_starred_repos(self.store.as_ref(), &client, user_id, &self.options).await?
            }
            WorkItem::SyncVersion { repo_id } => {
                sync_versions(
                    self.store.as_ref(),
                    &client,
                    self.publisher.as_ref(),
                    repo_id,
                    &self.options,
                )
                .await?
            }
        };

        tracing::debug!(?item, identity = %client.identity, %outcome, "Handled work item");
        Ok(outcome)
    }

    /// Consume `rx` until it closes, running up to `concurrency` items at
    /// once. Failing items are logged and counted; they never stop the queue.
    pub async fn run_queue(&self, mut rx: mpsc::Receiver<WorkItem>, concurrency: usize) -> QueueStats {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut tasks: JoinSet<Result<SyncOutcome>> = JoinSet::new();
        let mut stats = QueueStats::default();

        while let Some(item) = rx.recv().await {
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    tracing::error!("Worker semaphore closed unexpectedly");
                    break;
                }
            };

            let engine = self.clone();
            tasks.spawn(async move {
                let _permit = permit;
                let result = engine.handle(&item).await;
                if let Err(e) = &result {
                    tracing::error!(?item, error = %e, "Work item failed");
                }
                result
            });

            while let Some(joined) = tasks.try_join_next() {
                record_joined(&mut stats, joined);
            }
        }

        while let Some(joined) = tasks.join_next().await {
            record_joined(&mut stats, joined);
        }

        tracing::info!(
            completed = stats.completed,
            partial = stats.partial,
            aborted = stats.aborted,
            failed = stats.failed,
            "Queue drained"
        );
        stats
    }
}

fn record_joined(
    stats: &mut QueueStats,
    joined: std::result::Result<Result<SyncOutcome>, tokio::task::JoinError>,
) {
    match joined {
        Ok(outcome) => stats.record(&outcome),
        Err(e) => {
            tracing::error!(error = %e, "Work item task panicked");
            stats.failed += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_item_wire_format() {
        let item = WorkItem::SyncStarredRepos { user_id: 42 };
        let json = serde_json::to_value(item).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"type": "sync_starred_repos", "user_id": 42})
        );

        let parsed: WorkItem =
            serde_json::from_str(r#"{"type":"sync_version","repo_id":7}"#).expect("deserialize");
        assert_eq!(parsed, WorkItem::SyncVersion { repo_id: 7 });
    }

    #[test]
    fn test_queue_stats_total() {
        let mut stats = QueueStats::default();
        stats.record(&Ok(SyncOutcome::Completed(1)));
        stats.record(&Ok(SyncOutcome::Aborted(AbortReason::NoClient)));
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.aborted, 1);
        assert_eq!(stats.total(), 2);
    }
}
