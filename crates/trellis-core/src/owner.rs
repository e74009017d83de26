//! The owner-thread queue.
//!
//! Hand-off work (result promotion, host callbacks) must run on the thread
//! that owns the tree's host surface. An [`OwnerQueue`] collects that work
//! from any thread; the owner thread drains it. Draining requires an
//! [`OwnerToken`], which can only be obtained on the owner thread and cannot
//! be sent anywhere else.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, ThreadId};

type OwnerTask = Box<dyn FnOnce(&OwnerToken) + Send>;

/// Capability proving the current code runs on the owner thread.
///
/// `!Send` by construction, so a token can never leak to another thread.
pub struct OwnerToken {
    _not_send: PhantomData<*const ()>,
}

struct QueueShared {
    tx: mpsc::Sender<OwnerTask>,
    rx: Mutex<mpsc::Receiver<OwnerTask>>,
    pending: AtomicUsize,
    owner: ThreadId,
}

/// Single-consumer task queue bound to the thread that created it.
#[derive(Clone)]
pub struct OwnerQueue {
    shared: Arc<QueueShared>,
}

impl OwnerQueue {
    /// Creates a queue owned by the calling thread.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            shared: Arc::new(QueueShared {
                tx,
                rx: Mutex::new(rx),
                pending: AtomicUsize::new(0),
                owner: thread::current().id(),
            }),
        }
    }

    #[inline]
    pub fn is_owner_thread(&self) -> bool {
        thread::current().id() == self.shared.owner
    }

    /// Returns the owner capability.
    ///
    /// Panics when called from any thread other than the owner.
    pub fn token(&self) -> OwnerToken {
        assert!(
            self.is_owner_thread(),
            "owner token requested from thread {:?} but the queue is owned by {:?}",
            thread::current().id(),
            self.shared.owner
        );
        OwnerToken {
            _not_send: PhantomData,
        }
    }

    /// Enqueues a task for the owner thread. Callable from any thread.
    pub fn post(&self, task: impl FnOnce(&OwnerToken) + Send + 'static) {
        self.shared.pending.fetch_add(1, Ordering::AcqRel);
        // A send failure means the receiver half is gone, which cannot
        // happen while this handle holds the shared state alive.
        let _ = self.shared.tx.send(Box::new(task));
    }

    #[inline]
    pub fn has_pending(&self) -> bool {
        self.shared.pending.load(Ordering::Acquire) > 0
    }

    /// Runs every queued task, in order, on the owner thread.
    ///
    /// The receiver lock is dropped between tasks so a task may post
    /// follow-up work without deadlocking; follow-ups queued while draining
    /// run in the same drain.
    pub fn drain(&self, token: &OwnerToken) {
        loop {
            let task = {
                let rx = self
                    .shared
                    .rx
                    .lock()
                    .expect("owner queue receiver lock poisoned");
                rx.try_recv()
            };
            match task {
                Ok(task) => {
                    self.shared.pending.fetch_sub(1, Ordering::AcqRel);
                    task(token);
                }
                Err(_) => break,
            }
        }
    }
}

impl Default for OwnerQueue {
    fn default() -> Self {
        Self::new()
    }
}
