//! Background range-update worker.
//!
//! In deferred mode all coverage bookkeeping runs on a single
//! [`RangeDaemon`] task consuming a FIFO queue. One worker is enough, and
//! deliberate: serializing all store mutation for a dataset preserves the
//! monotonic-coverage invariant without any locking subtleties. Callers
//! never wait on the daemon; the engine's change notification is the only
//! signal that new range information landed.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use super::{EngineShared, TaskKey};
use crate::region::SliceRegion;
use crate::source::VolumeSource;

/// One queued bookkeeping job: the access region to bring coverage up to.
///
/// The task carries the region rather than pre-planned expansions: the
/// worker re-plans against the coverage current at execution time, so a
/// task enqueued behind another touching the same unit never applies a
/// stale plan.
#[derive(Debug)]
pub(crate) struct UpdateTask {
    pub(crate) key: TaskKey,
    pub(crate) region: SliceRegion,
}

/// The deferred-mode worker. Created alongside the engine by
/// [`RangeEngine::deferred`](super::RangeEngine::deferred); the caller
/// spawns [`RangeDaemon::run`] on its runtime.
pub struct RangeDaemon<S: VolumeSource> {
    shared: Arc<EngineShared<S>>,
    queue: mpsc::Receiver<UpdateTask>,
}

impl<S: VolumeSource> RangeDaemon<S> {
    pub(crate) fn new(shared: Arc<EngineShared<S>>, queue: mpsc::Receiver<UpdateTask>) -> Self {
        Self { shared, queue }
    }

    /// Consume tasks until the engine is destroyed or the queue closes.
    ///
    /// A task found after destruction is a safe no-op: the destroyed flag
    /// is consulted before any store mutation. Source failures are recorded
    /// on the engine and never tear the worker down.
    pub async fn run(mut self) {
        info!("range daemon starting");
        loop {
            tokio::select! {
                biased;

                _ = self.shared.cancel.cancelled() => {
                    debug!("range daemon cancelled");
                    break;
                }

                task = self.queue.recv() => match task {
                    Some(task) => self.process(task),
                    None => break,
                },
            }
        }
        info!("range daemon stopped");
    }

    fn process(&self, task: UpdateTask) {
        // The key stops deduplicating once work starts: a later identical
        // request must re-plan against the updated coverage.
        self.shared.in_flight.remove(&task.key);
        if self.shared.cancel.is_cancelled() {
            return;
        }
        debug!(region = %task.region, "processing range update");
        self.shared.run_update(&task.region);
    }
}
