//! Fixed-size pool of named worker threads for threaded module variants.
//!
//! Workers share one job channel. Termination is a non-blocking request:
//! each worker finishes its current job and exits; [`WorkerPool::join`]
//! waits for them when a caller needs the threads gone.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::error::{HostError, HostResult};

/// Unit of work executed on a worker thread.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Job),
    Terminate,
}

/// Pool of OS threads owned by a threaded module handle.
pub struct WorkerPool {
    name: String,
    size: usize,
    sender: Mutex<Option<mpsc::Sender<Message>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    live: Arc<AtomicUsize>,
}

impl WorkerPool {
    /// Start `size` workers named `<name>-<index>`.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::WorkerSpawn`] if any thread fails to start; the
    /// workers already started are terminated.
    pub fn spawn(size: usize, name: &str) -> HostResult<Self> {
        let (sender, receiver) = mpsc::channel::<Message>();
        let receiver = Arc::new(Mutex::new(receiver));
        let live = Arc::new(AtomicUsize::new(0));

        let pool = Self {
            name: name.to_string(),
            size,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(Vec::with_capacity(size)),
            live: Arc::clone(&live),
        };

        for index in 0..size {
            let receiver = Arc::clone(&receiver);
            let live = Arc::clone(&live);
            live.fetch_add(1, Ordering::SeqCst);

            let spawned = thread::Builder::new()
                .name(format!("{name}-{index}"))
                .spawn(move || worker_loop(&receiver, &live));

            match spawned {
                Ok(handle) => pool.workers.lock().push(handle),
                Err(source) => {
                    pool.live.fetch_sub(1, Ordering::SeqCst);
                    // Dropping the partial pool terminates the started workers.
                    return Err(HostError::WorkerSpawn { index, source });
                }
            }
        }

        debug!(pool = %pool.name, size, "Worker pool started");
        Ok(pool)
    }

    /// Queue `job` for execution on the next free worker.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::PoolTerminated`] once termination was requested.
    pub fn execute<F>(&self, job: F) -> HostResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let guard = self.sender.lock();
        let sender = guard.as_ref().ok_or(HostError::PoolTerminated)?;
        sender
            .send(Message::Run(Box::new(job)))
            .map_err(|_| HostError::PoolTerminated)
    }

    /// Ask every worker to stop after its current job.
    ///
    /// Idempotent and non-blocking. Returns the number of workers signalled,
    /// which is `0` on every call after the first.
    pub fn terminate_all_threads(&self) -> usize {
        let Some(sender) = self.sender.lock().take() else {
            return 0;
        };
        for _ in 0..self.size {
            // A send error means every worker is already gone.
            let _ = sender.send(Message::Terminate);
        }
        debug!(pool = %self.name, workers = self.size, "Worker pool termination requested");
        self.size
    }

    /// Terminate and wait for every worker thread to exit.
    pub fn join(&self) {
        self.terminate_all_threads();
        let handles: Vec<_> = self.workers.lock().drain(..).collect();
        let current = thread::current().id();
        for handle in handles {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                warn!(pool = %self.name, "Worker thread exited with a panic");
            }
        }
    }

    /// Number of worker threads still running.
    #[must_use]
    pub fn live_workers(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Configured number of workers.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.terminate_all_threads();
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("live", &self.live_workers())
            .field("terminated", &self.is_terminated())
            .finish()
    }
}

fn worker_loop(receiver: &Mutex<mpsc::Receiver<Message>>, live: &AtomicUsize) {
    loop {
        let message = receiver.lock().recv();
        match message {
            Ok(Message::Run(job)) => {
                if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                    warn!("Worker job panicked; worker keeps running");
                }
            }
            Ok(Message::Terminate) | Err(_) => break,
        }
    }
    live.fetch_sub(1, Ordering::SeqCst);
}
