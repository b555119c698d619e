//! Sequential work queue shared by the pipeline stages.
//!
//! Generation, orchestration and aggregation all reduce to the same loop:
//! drain an ordered list of pending items one at a time, log and count a
//! failed item without stopping, and stop early on Ctrl-C. [`drain`] is that
//! loop, so the skip/log policy is written once instead of three times.

use std::fmt::Display;
use std::future::Future;

use tracing::{info, warn};

/// How often progress is logged for long queues.
const PROGRESS_INTERVAL: usize = 1000;

/// Tally of a drained queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkReport {
    /// Items whose operation returned Ok.
    pub completed: usize,
    /// Items whose operation returned Err; logged and skipped.
    pub failed: usize,
    /// True when the loop was halted by Ctrl-C before the queue emptied.
    pub cancelled: bool,
}

impl WorkReport {
    /// Total items the loop looked at.
    pub fn processed(&self) -> usize {
        self.completed + self.failed
    }
}

/// Drains `items` in order, applying `op` to each.
///
/// A per-item error is logged under `label` and counted; the loop keeps
/// going. Ctrl-C terminates the in-flight operation (dropping its future,
/// which kills a child process spawned with `kill_on_drop`) and halts the
/// loop.
pub async fn drain<T, E, F, Fut>(label: &str, items: Vec<T>, mut op: F) -> WorkReport
where
    T: Display,
    E: Display,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    let total = items.len();
    let mut report = WorkReport::default();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    for item in items {
        let desc = item.to_string();
        tokio::select! {
            _ = &mut ctrl_c => {
                warn!(label, completed = report.completed, "Interrupted, halting queue");
                report.cancelled = true;
                break;
            }
            result = op(item) => match result {
                Ok(()) => report.completed += 1,
                Err(error) => {
                    warn!(label, item = %desc, %error, "Work item failed, continuing");
                    report.failed += 1;
                }
            }
        }

        if report.processed() % PROGRESS_INTERVAL == 0 {
            info!(label, done = report.processed(), total, "Queue progress");
        }
    }

    info!(
        label,
        completed = report.completed,
        failed = report.failed,
        cancelled = report.cancelled,
        "Queue drained"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_drain_counts_completed() {
        let report = drain("test", vec![1, 2, 3], |_| async { Ok::<(), String>(()) }).await;
        assert_eq!(report.completed, 3);
        assert_eq!(report.failed, 0);
        assert!(!report.cancelled);
    }

    #[tokio::test]
    async fn test_drain_continues_past_failures() {
        let report = drain("test", vec![1, 2, 3, 4], |n| async move {
            if n % 2 == 0 {
                Err(format!("item {n} broke"))
            } else {
                Ok(())
            }
        })
        .await;
        assert_eq!(report.completed, 2);
        assert_eq!(report.failed, 2);
        assert_eq!(report.processed(), 4);
    }

    #[tokio::test]
    async fn test_drain_empty_queue() {
        let report = drain("test", Vec::<u32>::new(), |_| async { Ok::<(), String>(()) }).await;
        assert_eq!(report, WorkReport::default());
    }
}
