//! Bounded pool of long-lived worker tasks sharing one input queue

use std::future::Future;
use std::sync::{Arc, OnceLock};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::PipelineError;

/// Fixed-size pool of workers.
///
/// Each worker takes items from the shared input receiver, runs the handler on
/// them and forwards `Some` results to the output sender. The pool stops when
/// the input closes or the token is cancelled; an item already taken is always
/// finished and its result sent. A handler error cancels the token and is
/// returned by [`PoolHandle::join`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskPool {
    workers: usize,
}

impl TaskPool {
    /// Create a pool with `workers` tasks (at least one)
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Spawn the workers. The output channel closes once every worker exits.
    pub fn spawn<I, O, H, Fut>(
        &self,
        input: mpsc::Receiver<I>,
        output: mpsc::Sender<O>,
        cancel: CancellationToken,
        handler: H,
    ) -> PoolHandle
    where
        I: Send + 'static,
        O: Send + 'static,
        H: Fn(usize, I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<O>, PipelineError>> + Send + 'static,
    {
        let input = Arc::new(Mutex::new(input));
        let handler = Arc::new(handler);
        let failure = Arc::new(OnceLock::new());
        let mut handles = Vec::with_capacity(self.workers);

        for worker_id in 0..self.workers {
            let input = Arc::clone(&input);
            let output = output.clone();
            let cancel = cancel.clone();
            let handler = Arc::clone(&handler);
            let failure = Arc::clone(&failure);

            let handle = tokio::spawn(async move {
                loop {
                    let item = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        item = async { input.lock().await.recv().await } => item,
                    };

                    let Some(item) = item else {
                        break; // Channel closed
                    };

                    match (*handler)(worker_id, item).await {
                        Ok(Some(result)) => {
                            if output.send(result).await.is_err() {
                                warn!(worker_id, "Output channel closed");
                                let _ = failure.set(PipelineError::OutputClosed);
                                cancel.cancel();
                                break;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            error!(worker_id, error = %e, "Worker failed, cancelling run");
                            let _ = failure.set(e);
                            cancel.cancel();
                            break;
                        }
                    }
                }

                debug!(worker_id, "Worker shutting down");
            });

            handles.push(handle);
        }

        PoolHandle { handles, failure }
    }
}

/// Running workers of a [`TaskPool`]
#[derive(Debug)]
pub struct PoolHandle {
    handles: Vec<JoinHandle<()>>,
    failure: Arc<OnceLock<PipelineError>>,
}

impl PoolHandle {
    /// Wait for every worker to exit and report the first failure, if any
    pub async fn join(self) -> Result<(), PipelineError> {
        let mut task_error = None;
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Worker task failed");
                task_error.get_or_insert(PipelineError::TaskFailed(e.to_string()));
            }
        }

        match self.failure.get().cloned().or(task_error) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
