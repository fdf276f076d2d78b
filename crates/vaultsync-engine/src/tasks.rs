//! Task execution: a bounded write pool with a completion barrier.
//!
//! Writes are idempotent upserts executed concurrently by a fixed number
//! of workers. The coordinator calls [`WritePool::wait`] before any
//! cleanup listing so that a resource with an in-flight write can never
//! look orphaned. Deletes are not executed here; they are collected as
//! [`DeleteTask`]s and reviewed one at a time.

use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error};
use vaultsync_types::{bug, Result, SyncError, VaultBackend};

/// An idempotent write to one backend path.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteTask {
    /// Backend path
    pub path: String,
    /// Human readable description used in logs
    pub description: String,
    /// Request body
    pub data: Map<String, Value>,
}

impl WriteTask {
    /// Create a write task.
    pub fn new(path: impl Into<String>, description: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            path: path.into(),
            description: description.into(),
            data,
        }
    }
}

/// A delete that must be confirmed by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteTask {
    /// Backend path
    pub path: String,
    /// Human readable description shown in the prompt
    pub description: String,
}

impl DeleteTask {
    /// Create a delete task.
    pub fn new(path: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            description: description.into(),
        }
    }
}

/// Counts outstanding work and wakes waiters when it reaches zero.
#[derive(Default)]
struct WaitGroup {
    count: AtomicUsize,
    zero: Notify,
}

impl WaitGroup {
    fn add(&self, n: usize) {
        self.count.fetch_add(n, Ordering::SeqCst);
    }

    fn done(&self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.zero.notify_waiters();
        }
    }

    fn pending(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        loop {
            let notified = self.zero.notified();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// First failure reported by any worker.
#[derive(Default)]
struct Failure {
    failed: AtomicBool,
    message: Mutex<Option<String>>,
}

impl Failure {
    fn record(&self, message: String) {
        let mut slot = self.message.lock();
        if slot.is_none() {
            *slot = Some(message);
        }
        self.failed.store(true, Ordering::SeqCst);
    }

    fn is_set(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    fn message(&self) -> Option<String> {
        self.message.lock().clone()
    }
}

/// A fixed-size pool of write workers.
pub struct WritePool {
    sender: mpsc::Sender<WriteTask>,
    pending: Arc<WaitGroup>,
    failure: Arc<Failure>,
    submitted: AtomicUsize,
    workers: Vec<JoinHandle<()>>,
}

impl WritePool {
    /// Start `workers` workers writing to `backend`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(backend: Arc<dyn VaultBackend>, workers: usize) -> Self {
        let workers = workers.max(1);
        let (sender, receiver) = mpsc::channel::<WriteTask>(workers * 4);
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let pending = Arc::new(WaitGroup::default());
        let failure = Arc::new(Failure::default());

        let handles = (0..workers)
            .map(|id| {
                let backend = backend.clone();
                let receiver = receiver.clone();
                let pending = pending.clone();
                let failure = failure.clone();

                tokio::spawn(async move {
                    loop {
                        let next = receiver.lock().await.recv().await;
                        let Some(task) = next else {
                            break;
                        };

                        if failure.is_set() {
                            debug!("Worker {} skipping [{}] after an earlier failure", id, task.path);
                        } else {
                            debug!("Worker {} writing {}", id, task.description);
                            if let Err(e) = backend.write(&task.path, &task.data).await {
                                error!("Failed to write {}: {}", task.description, e);
                                failure.record(format!("{}: {}", task.description, e));
                            }
                        }

                        pending.done();
                    }
                })
            })
            .collect();

        Self {
            sender,
            pending,
            failure,
            submitted: AtomicUsize::new(0),
            workers: handles,
        }
    }

    /// Queue a write.
    pub async fn submit(&self, task: WriteTask) -> Result<()> {
        if let Some(message) = self.failure.message() {
            return Err(SyncError::Task(message));
        }

        self.pending.add(1);
        if self.sender.send(task).await.is_err() {
            self.pending.done();
            bug!("write pool has no running workers");
        }
        self.submitted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Block until every queued write has completed.
    ///
    /// # Errors
    ///
    /// Returns the first write failure observed by any worker.
    pub async fn wait(&self) -> Result<()> {
        self.pending.wait().await;
        match self.failure.message() {
            Some(message) => Err(SyncError::Task(message)),
            None => Ok(()),
        }
    }

    /// Writes queued but not yet completed.
    pub fn pending(&self) -> usize {
        self.pending.pending()
    }

    /// Total writes accepted since the pool started.
    pub fn submitted(&self) -> usize {
        self.submitted.load(Ordering::SeqCst)
    }

    /// Close the queue and wait for the workers to exit.
    pub async fn shutdown(self) {
        drop(self.sender);
        for result in futures::future::join_all(self.workers).await {
            if let Err(e) = result {
                error!("Write worker panicked: {}", e);
            }
        }
    }
}
