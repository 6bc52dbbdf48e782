//! Per-session negotiation queue
//!
//! Every state-mutating operation of a session runs as a task on this queue.
//! A single worker drains the queue in FIFO order and drives exactly one
//! task to completion before starting the next, so two offer/answer cycles
//! never interleave on the same negotiation primitive.
//!
//! Enqueueing is synchronous: the order in which callers call
//! [`NegotiationQueue::enqueue`] is the order tasks run in, regardless of
//! when (or whether) the returned [`TaskCompletion`] is awaited. A task that
//! fails, panics or exceeds the configured timeout still releases the queue.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, trace, warn};

use crate::errors::{self, QueueError, SessionError};

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

struct QueuedTask {
    name: String,
    job: Job,
}

/// Serial executor for one session's negotiation tasks
pub struct NegotiationQueue {
    label: String,
    tx: mpsc::UnboundedSender<QueuedTask>,
    timeout: Option<Duration>,
    pending: Arc<AtomicUsize>,
}

impl NegotiationQueue {
    /// Create a queue and spawn its worker on the current tokio runtime
    ///
    /// Fails with a configuration error when called outside a runtime.
    pub fn new(label: impl Into<String>, timeout: Option<Duration>) -> errors::Result<Self> {
        let label = label.into();
        let runtime = Handle::try_current().map_err(|e| {
            SessionError::config(format!("Negotiation queue for {} needs a tokio runtime: {}", label, e))
        })?;
        let (tx, rx) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));

        runtime.spawn(run_worker(label.clone(), rx));
        debug!("Started negotiation queue for {}", label);

        Ok(Self {
            label,
            tx,
            timeout,
            pending,
        })
    }

    /// Number of tasks queued or running
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Append a task to the queue
    ///
    /// The task is scheduled immediately; dropping the returned completion
    /// does not cancel it.
    pub fn enqueue<T, E, F>(&self, name: &str, task: F) -> TaskCompletion<T, E>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: From<QueueError> + Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let timeout = self.timeout;
        let task_name = name.to_string();
        let slot = PendingSlot::acquire(&self.pending);

        let job = async move {
            let guarded = AssertUnwindSafe(task).catch_unwind();
            let outcome = match timeout {
                Some(limit) => match tokio::time::timeout(limit, guarded).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        warn!("Negotiation task '{}' timed out after {:?}", task_name, limit);
                        drop(slot);
                        let _ = done_tx.send(Err(E::from(QueueError::TimedOut {
                            task: task_name,
                            timeout: limit,
                        })));
                        return;
                    }
                },
                None => guarded.await,
            };

            let result = match outcome {
                Ok(result) => result,
                Err(_) => {
                    error!("Negotiation task '{}' panicked", task_name);
                    Err(E::from(QueueError::Aborted(task_name)))
                }
            };
            drop(slot);
            // Receiver may have been dropped by a caller that did not wait
            let _ = done_tx.send(result);
        };

        let queued = QueuedTask {
            name: name.to_string(),
            job: Box::pin(job),
        };
        if self.tx.send(queued).is_err() {
            // Dropping the rejected job releases its slot and drops its
            // sender, which resolves the completion as aborted.
            warn!("Negotiation queue for {} is closed, dropping '{}'", self.label, name);
        }

        TaskCompletion::pending(name, done_rx)
    }
}

async fn run_worker(label: String, mut rx: mpsc::UnboundedReceiver<QueuedTask>) {
    while let Some(task) = rx.recv().await {
        trace!("{}: running '{}'", label, task.name);
        task.job.await;
        trace!("{}: finished '{}'", label, task.name);
    }
    debug!("Negotiation queue for {} stopped", label);
}

/// Counts a task as pending until it has produced its result
struct PendingSlot(Arc<AtomicUsize>);

impl PendingSlot {
    fn acquire(pending: &Arc<AtomicUsize>) -> Self {
        pending.fetch_add(1, Ordering::SeqCst);
        Self(pending.clone())
    }
}

impl Drop for PendingSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Completion handle for a queued task
///
/// Resolves to the task's own result, or to the error converted from
/// [`QueueError`] when the task was aborted or timed out.
pub struct TaskCompletion<T, E> {
    state: CompletionState<T, E>,
}

enum CompletionState<T, E> {
    Waiting {
        task: String,
        rx: oneshot::Receiver<Result<T, E>>,
    },
    Ready(Option<Result<T, E>>),
}

impl<T, E> TaskCompletion<T, E> {
    fn pending(task: &str, rx: oneshot::Receiver<Result<T, E>>) -> Self {
        Self {
            state: CompletionState::Waiting {
                task: task.to_string(),
                rx,
            },
        }
    }

    /// Completion that is already resolved, for requests rejected before
    /// reaching the queue
    pub fn ready(result: Result<T, E>) -> Self {
        Self {
            state: CompletionState::Ready(Some(result)),
        }
    }
}

// No field is structurally pinned.
impl<T, E> Unpin for TaskCompletion<T, E> {}

impl<T, E> Future for TaskCompletion<T, E>
where
    E: From<QueueError>,
{
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            CompletionState::Waiting { task, rx } => match Pin::new(rx).poll(cx) {
                Poll::Ready(Ok(result)) => Poll::Ready(result),
                Poll::Ready(Err(_)) => Poll::Ready(Err(E::from(QueueError::Aborted(task.clone())))),
                Poll::Pending => Poll::Pending,
            },
            CompletionState::Ready(result) => match result.take() {
                Some(result) => Poll::Ready(result),
                None => Poll::Pending,
            },
        }
    }
}
