//! Background layout worker.
//!
//! One dedicated thread runs queued layout computations in submission order.
//! Trees share a process-wide worker by default so background layouts never
//! compete with each other, mirroring a single background looper.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, OnceLock};
use std::thread;

struct JobEntry {
    cancelled: Arc<AtomicBool>,
    job: Box<dyn FnOnce() + Send>,
}

/// Handle to one submitted job. Cancelling only prevents a job that has not
/// started yet; a running job finishes and its output is discarded by the
/// re-validation step downstream.
#[derive(Clone)]
pub struct JobHandle {
    cancelled: Arc<AtomicBool>,
}

impl JobHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// A serial queue of background layout computations.
#[derive(Clone)]
pub struct LayoutWorker {
    tx: Arc<Mutex<mpsc::Sender<JobEntry>>>,
}

impl LayoutWorker {
    /// Spawns a dedicated worker thread. Most callers want
    /// [`shared`](Self::shared) instead.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel::<JobEntry>();
        thread::Builder::new()
            .name("trellis-layout".into())
            .spawn(move || {
                while let Ok(entry) = rx.recv() {
                    if entry.cancelled.load(Ordering::Acquire) {
                        continue;
                    }
                    (entry.job)();
                }
            })
            .expect("failed to spawn layout worker thread");
        Self {
            tx: Arc::new(Mutex::new(tx)),
        }
    }

    /// The process-wide worker, spawned on first use.
    pub fn shared() -> &'static LayoutWorker {
        static SHARED: OnceLock<LayoutWorker> = OnceLock::new();
        SHARED.get_or_init(LayoutWorker::new)
    }

    /// Queues a job and returns its cancellation handle.
    pub fn submit(&self, job: impl FnOnce() + Send + 'static) -> JobHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let entry = JobEntry {
            cancelled: Arc::clone(&cancelled),
            job: Box::new(job),
        };
        // The worker thread never drops its receiver while a sender exists.
        let _ = self
            .tx
            .lock()
            .expect("layout worker sender lock poisoned")
            .send(entry);
        JobHandle { cancelled }
    }
}

impl Default for LayoutWorker {
    fn default() -> Self {
        Self::new()
    }
}
