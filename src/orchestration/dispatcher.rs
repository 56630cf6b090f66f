//! # Dispatcher
//!
//! Hands pipeline runs to a background executor so that triggering a workflow
//! returns as soon as the task record exists. A dispatcher must accept a job,
//! run it to completion off the caller's path, and keep at most one active run
//! per task id.
//!
//! `TokioDispatcher` spawns each run on the current tokio runtime and tracks
//! active task ids in a `DashMap`. An optional semaphore bounds the runs in
//! flight. Under a bound, surplus runs wait for a permit; a hard limit instead
//! refuses them at scheduling time with `CapacityExhausted`.

use dashmap::{mapref::entry::Entry, DashMap};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::DispatcherConfig;

/// A pipeline run ready to be executed in the background
pub type PipelineJob = BoxFuture<'static, ()>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulingError {
    #[error("No async runtime available to run task {task_id}")]
    NoRuntime { task_id: i64 },

    #[error("Dispatcher is at capacity ({limit} runs in flight); task {task_id} not scheduled")]
    CapacityExhausted { task_id: i64, limit: usize },

    #[error("Task {task_id} already has an active pipeline run")]
    AlreadyScheduled { task_id: i64 },
}

/// Background executor for pipeline runs
pub trait Dispatcher: Send + Sync {
    /// Start `job` for `task_id` without waiting for it to finish
    fn schedule(&self, task_id: i64, job: PipelineJob) -> Result<(), SchedulingError>;
}

/// Removes a task id from the active set when its run ends, even on panic
struct ActiveRun {
    task_id: i64,
    active: Arc<DashMap<i64, ()>>,
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        self.active.remove(&self.task_id);
    }
}

/// What happens to a run scheduled while every permit is taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    /// Start immediately
    Unbounded,
    /// Wait inside the spawned task for a permit
    Queue(usize),
    /// Refuse with `CapacityExhausted`
    Reject(usize),
}

/// Dispatcher backed by tokio tasks
pub struct TokioDispatcher {
    admission: Admission,
    permits: Arc<Semaphore>,
    active: Arc<DashMap<i64, ()>>,
    runs: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for TokioDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioDispatcher")
            .field("admission", &self.admission)
            .field("active_runs", &self.active.len())
            .finish()
    }
}

impl TokioDispatcher {
    /// At most `max_in_flight` runs execute at once; the rest wait their turn
    pub fn new(max_in_flight: Option<usize>) -> Self {
        match max_in_flight {
            Some(limit) => Self::build(Admission::Queue(limit.max(1))),
            None => Self::build(Admission::Unbounded),
        }
    }

    /// Refuse runs scheduled while `limit` are already in flight
    pub fn rejecting(limit: usize) -> Self {
        Self::build(Admission::Reject(limit))
    }

    pub fn from_config(config: &DispatcherConfig) -> Self {
        match config.in_flight_limit() {
            Some(limit) if config.reject_when_full => Self::rejecting(limit),
            limit => Self::new(limit),
        }
    }

    fn build(admission: Admission) -> Self {
        let permits = match admission {
            Admission::Unbounded => 0,
            Admission::Queue(limit) | Admission::Reject(limit) => limit,
        };
        Self {
            admission,
            permits: Arc::new(Semaphore::new(permits)),
            active: Arc::new(DashMap::new()),
            runs: Mutex::new(Vec::new()),
        }
    }

    /// Runs allowed to execute at once, if bounded
    pub fn limit(&self) -> Option<usize> {
        match self.admission {
            Admission::Unbounded => None,
            Admission::Queue(limit) | Admission::Reject(limit) => Some(limit),
        }
    }

    /// Number of scheduled runs that have not ended, queued ones included
    pub fn active_runs(&self) -> usize {
        self.active.len()
    }

    pub fn is_active(&self, task_id: i64) -> bool {
        self.active.contains_key(&task_id)
    }

    /// Wait until every scheduled run, including ones scheduled meanwhile, has ended
    pub async fn wait_idle(&self) {
        loop {
            let pending = std::mem::take(&mut *self.runs.lock());
            if pending.is_empty() {
                return;
            }
            for run in pending {
                if let Err(err) = run.await {
                    warn!(error = %err, "Pipeline run ended abnormally");
                }
            }
        }
    }
}

impl Dispatcher for TokioDispatcher {
    fn schedule(&self, task_id: i64, job: PipelineJob) -> Result<(), SchedulingError> {
        let handle = Handle::try_current().map_err(|_| SchedulingError::NoRuntime { task_id })?;

        let reserved: Option<OwnedSemaphorePermit> = match self.admission {
            Admission::Reject(limit) => Some(
                Arc::clone(&self.permits)
                    .try_acquire_owned()
                    .map_err(|_| SchedulingError::CapacityExhausted { task_id, limit })?,
            ),
            Admission::Unbounded | Admission::Queue(_) => None,
        };

        match self.active.entry(task_id) {
            Entry::Occupied(_) => return Err(SchedulingError::AlreadyScheduled { task_id }),
            Entry::Vacant(slot) => {
                slot.insert(());
            }
        }

        let guard = ActiveRun {
            task_id,
            active: Arc::clone(&self.active),
        };
        let queued = matches!(self.admission, Admission::Queue(_))
            .then(|| Arc::clone(&self.permits));
        let run = handle.spawn(async move {
            let _guard = guard;
            let _permit = match queued {
                Some(permits) => match permits.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(_) => {
                        warn!(task_id, "Dispatcher permits closed; run dropped");
                        return;
                    }
                },
                None => reserved,
            };
            job.await;
        });

        let mut runs = self.runs.lock();
        runs.retain(|run| !run.is_finished());
        runs.push(run);

        debug!(task_id, in_flight = self.active.len(), "Pipeline run scheduled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_runs_job_in_background() {
        let dispatcher = TokioDispatcher::new(None);
        let counter = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&counter);

        dispatcher
            .schedule(
                1,
                async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                }
                .boxed(),
            )
            .unwrap();

        dispatcher.wait_idle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.active_runs(), 0);
    }

    #[tokio::test]
    async fn test_rejects_second_run_for_same_task() {
        let dispatcher = TokioDispatcher::new(None);
        let (release, wait) = oneshot::channel::<()>();

        dispatcher
            .schedule(
                7,
                async move {
                    let _ = wait.await;
                }
                .boxed(),
            )
            .unwrap();
        assert!(dispatcher.is_active(7));

        let err = dispatcher.schedule(7, async {}.boxed()).unwrap_err();
        assert_eq!(err, SchedulingError::AlreadyScheduled { task_id: 7 });

        release.send(()).unwrap();
        dispatcher.wait_idle().await;
        assert!(!dispatcher.is_active(7));
    }

    #[tokio::test]
    async fn test_bounded_runs_wait_for_a_permit() {
        let dispatcher = TokioDispatcher::new(Some(1));
        let (release, wait) = oneshot::channel::<()>();
        let counter = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&counter);

        dispatcher
            .schedule(
                1,
                async move {
                    let _ = wait.await;
                }
                .boxed(),
            )
            .unwrap();
        dispatcher
            .schedule(
                2,
                async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                }
                .boxed(),
            )
            .unwrap();

        tokio::task::yield_now().await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(dispatcher.is_active(2));

        release.send(()).unwrap();
        dispatcher.wait_idle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.active_runs(), 0);
    }

    #[tokio::test]
    async fn test_capacity_limit() {
        let dispatcher = TokioDispatcher::rejecting(1);
        let (release, wait) = oneshot::channel::<()>();

        dispatcher
            .schedule(
                1,
                async move {
                    let _ = wait.await;
                }
                .boxed(),
            )
            .unwrap();

        let err = dispatcher.schedule(2, async {}.boxed()).unwrap_err();
        assert_eq!(
            err,
            SchedulingError::CapacityExhausted {
                task_id: 2,
                limit: 1
            }
        );

        release.send(()).unwrap();
        dispatcher.wait_idle().await;
        dispatcher.schedule(2, async {}.boxed()).unwrap();
        dispatcher.wait_idle().await;
    }

    #[test]
    fn test_built_from_config() {
        let queued = TokioDispatcher::from_config(&DispatcherConfig::default());
        assert_eq!(queued.admission, Admission::Queue(64));

        let hard = TokioDispatcher::from_config(&DispatcherConfig {
            max_in_flight: 2,
            reject_when_full: true,
        });
        assert_eq!(hard.admission, Admission::Reject(2));

        let open = TokioDispatcher::from_config(&DispatcherConfig {
            max_in_flight: 0,
            reject_when_full: true,
        });
        assert_eq!(open.limit(), None);
    }

    #[test]
    fn test_no_runtime() {
        let dispatcher = TokioDispatcher::new(None);
        let err = dispatcher.schedule(3, async {}.boxed()).unwrap_err();
        assert_eq!(err, SchedulingError::NoRuntime { task_id: 3 });
    }

    #[tokio::test]
    async fn test_panicking_run_releases_task_id() {
        let dispatcher = TokioDispatcher::new(None);
        dispatcher
            .schedule(
                4,
                async {
                    panic!("boom");
                }
                .boxed(),
            )
            .unwrap();
        dispatcher.wait_idle().await;
        assert!(!dispatcher.is_active(4));
    }
}
