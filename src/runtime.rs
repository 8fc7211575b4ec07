//! Background forecast runtime.
//!
//! Simulations can run for tens of millions of iterations, so projections are
//! handed to a small, bounded pool of worker threads. Each job carries a
//! [`CancellationToken`]; a superseding submission cancels the previous
//! superseding job, which is how a configuration change abandons stale work.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cancel::CancellationToken;
use crate::error::{BurnupError, BurnupResult, ExecutionError};
use crate::forecast::{ForecastProjector, ForecastRequest, ForecastResult};

/// Identifier of one submitted projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForecastRunId(pub Uuid);

impl ForecastRunId {
    /// A fresh random id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ForecastRunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ForecastRunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "forecast:{}", self.0)
    }
}

/// Runtime configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastRuntimeConfig {
    /// Number of worker threads.
    pub workers: usize,
    /// Maximum queued jobs.
    pub queue_capacity: usize,
}

impl Default for ForecastRuntimeConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 64,
        }
    }
}

type Reply = BurnupResult<Option<ForecastResult>>;

enum Job {
    Project {
        id: ForecastRunId,
        request: Box<ForecastRequest>,
        token: CancellationToken,
        reply: Sender<Reply>,
    },

    #[cfg(test)]
    Block {
        started: Sender<()>,
        release: Receiver<()>,
    },
}

fn run_job(projector: &ForecastProjector, job: Job) {
    match job {
        Job::Project {
            id,
            request,
            token,
            reply,
        } => {
            let result = if token.is_cancelled() {
                tracing::debug!(%id, "skipping cancelled forecast");
                Err(ExecutionError::Cancelled {
                    completed_trials: 0,
                    requested_trials: request.config.trials,
                }
                .into())
            } else {
                projector.project_cancellable(&request, &token)
            };
            let _ = reply.send(result);
        }

        #[cfg(test)]
        Job::Block { started, release } => {
            let _ = started.send(());
            let _ = release.recv();
        }
    }
}

struct WorkerPool {
    tx: Sender<Job>,
    workers: Vec<JoinHandle<()>>,
    queue_capacity: usize,
}

impl WorkerPool {
    fn start(
        workers: usize,
        queue_capacity: usize,
        projector: &Arc<ForecastProjector>,
    ) -> BurnupResult<Self> {
        let workers = workers.max(1);
        let queue_capacity = queue_capacity.max(1);
        let (tx, rx) = bounded::<Job>(queue_capacity);

        let mut handles = Vec::with_capacity(workers);
        for idx in 0..workers {
            let rx: Receiver<Job> = rx.clone();
            let projector = Arc::clone(projector);
            let handle = thread::Builder::new()
                .name(format!("burnup-forecast-{idx}"))
                .spawn(move || {
                    while let Ok(job) = rx.recv() {
                        run_job(&projector, job);
                    }
                })
                .map_err(|e| BurnupError::internal(format!("failed to spawn forecast worker: {e}")))?;
            handles.push(handle);
        }

        Ok(Self {
            tx,
            workers: handles,
            queue_capacity,
        })
    }

    fn try_submit(&self, job: Job) -> BurnupResult<()> {
        match self.tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(ExecutionError::QueueFull {
                capacity: self.queue_capacity,
            }
            .into()),
            Err(TrySendError::Disconnected(_)) => Err(ExecutionError::Disconnected.into()),
        }
    }

    fn shutdown(self) {
        // Workers drain queued jobs, then see the closed channel.
        drop(self.tx);
        for handle in self.workers {
            let _ = handle.join();
        }
    }
}

/// Handle to a submitted projection.
pub struct ForecastHandle {
    id: ForecastRunId,
    token: CancellationToken,
    rx: Receiver<Reply>,
}

impl ForecastHandle {
    #[must_use]
    pub const fn id(&self) -> ForecastRunId {
        self.id
    }

    /// Requests cancellation; the job reports `ExecutionError::Cancelled`.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Waits for the projection to finish.
    ///
    /// # Errors
    ///
    /// Returns the projection's error, or `ExecutionError::Disconnected` if
    /// the worker went away without replying.
    pub fn join(self) -> Reply {
        self.rx
            .recv()
            .map_err(|_| BurnupError::from(ExecutionError::Disconnected))?
    }

    /// Waits for the projection with a timeout.
    ///
    /// # Errors
    ///
    /// As [`Self::join`], plus `ExecutionError::Timeout`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn join_timeout(self, timeout: Duration) -> Reply {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => BurnupError::from(ExecutionError::Timeout {
                duration_ms: timeout.as_millis().min(u128::from(u64::MAX)) as u64,
            }),
            RecvTimeoutError::Disconnected => BurnupError::from(ExecutionError::Disconnected),
        })?
    }
}

impl fmt::Debug for ForecastHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForecastHandle")
            .field("id", &self.id)
            .field("cancelled", &self.token.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Runs projections on a bounded worker pool.
pub struct ForecastRuntime {
    projector: Arc<ForecastProjector>,
    pool: Option<WorkerPool>,
    latest: Mutex<Option<CancellationToken>>,
}

impl ForecastRuntime {
    /// Starts the worker pool.
    ///
    /// # Errors
    ///
    /// Returns an internal error if a worker thread cannot be spawned.
    pub fn new(projector: ForecastProjector, config: ForecastRuntimeConfig) -> BurnupResult<Self> {
        let projector = Arc::new(projector);
        let pool = WorkerPool::start(config.workers, config.queue_capacity, &projector)?;
        Ok(Self {
            projector,
            pool: Some(pool),
            latest: Mutex::new(None),
        })
    }

    pub fn projector(&self) -> &ForecastProjector {
        &self.projector
    }

    /// Queues an independent projection.
    ///
    /// # Errors
    ///
    /// `ExecutionError::QueueFull` when the queue is at capacity.
    pub fn submit(&self, request: ForecastRequest) -> BurnupResult<ForecastHandle> {
        self.enqueue(request, CancellationToken::new())
    }

    /// Queues a projection that replaces the previous superseding one.
    ///
    /// The previous job is cancelled whether or not it has started.
    ///
    /// # Errors
    ///
    /// As [`Self::submit`].
    pub fn submit_superseding(&self, request: ForecastRequest) -> BurnupResult<ForecastHandle> {
        let token = CancellationToken::new();
        {
            let mut latest = self
                .latest
                .lock()
                .map_err(|_| BurnupError::internal("forecast runtime lock poisoned"))?;
            if let Some(previous) = latest.replace(token.clone()) {
                if !previous.is_cancelled() {
                    tracing::debug!("superseding in-flight forecast");
                }
                previous.cancel();
            }
        }
        self.enqueue(request, token)
    }

    /// Runs a projection on the pool and waits for it.
    ///
    /// # Errors
    ///
    /// As [`Self::submit`] and [`ForecastHandle::join`].
    pub fn project(&self, request: ForecastRequest) -> Reply {
        self.submit(request)?.join()
    }

    fn pool(&self) -> BurnupResult<&WorkerPool> {
        self.pool
            .as_ref()
            .ok_or_else(|| BurnupError::from(ExecutionError::Disconnected))
    }

    fn enqueue(&self, request: ForecastRequest, token: CancellationToken) -> BurnupResult<ForecastHandle> {
        let id = ForecastRunId::new();
        let (tx, rx) = bounded::<Reply>(1);
        self.pool()?.try_submit(Job::Project {
            id,
            request: Box::new(request),
            token: token.clone(),
            reply: tx,
        })?;
        tracing::debug!(%id, "forecast submitted");
        Ok(ForecastHandle { id, token, rx })
    }

    #[cfg(test)]
    fn block_worker(&self) -> BurnupResult<(Sender<()>, Receiver<()>)> {
        let (started_tx, started_rx) = bounded::<()>(1);
        let (release_tx, release_rx) = bounded::<()>(1);
        self.pool()?.try_submit(Job::Block {
            started: started_tx,
            release: release_rx,
        })?;
        Ok((release_tx, started_rx))
    }
}

impl Drop for ForecastRuntime {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.shutdown();
        }
    }
}
