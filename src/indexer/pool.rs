use anyhow::{Context, Result, anyhow};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use super::{IndexPlan, index_file};
use crate::collector::Collector;

/// Worker count when none is configured
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Index every file on blocking workers, at most `concurrency` at a time.
///
/// Results go straight into `collector`. Returns once every task is done.
/// The first failure aborts the remaining tasks and is returned.
pub async fn index_all(
    files: &[PathBuf],
    plan: IndexPlan,
    concurrency: usize,
    collector: Arc<Collector>,
) -> Result<()> {
    if files.is_empty() || plan.is_noop() {
        return Ok(());
    }

    let concurrency = concurrency.max(1);
    info!(files = files.len(), workers = concurrency, "indexing capture files");

    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut tasks = JoinSet::new();

    for path in files.iter().cloned() {
        let semaphore = Arc::clone(&semaphore);
        let collector = Arc::clone(&collector);
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await?;
            let task_path = path.clone();
            let indexed = tokio::task::spawn_blocking(move || index_file(&task_path, plan))
                .await
                .map_err(|e| anyhow!("indexing worker panicked: {}", e))?
                .with_context(|| format!("failed to index {}", path.display()))?;

            collector.extend(indexed.entries, indexed.pages);
            debug!(file = %path.display(), "indexing done");
            Ok::<_, anyhow::Error>(())
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let result = joined
            .map_err(|e| anyhow!("indexing task failed: {}", e))
            .and_then(|r| r);
        if let Err(e) = result {
            tasks.abort_all();
            return Err(e);
        }
    }

    info!(
        entries = collector.entry_count(),
        pages = collector.page_count(),
        "indexing complete"
    );
    Ok(())
}
