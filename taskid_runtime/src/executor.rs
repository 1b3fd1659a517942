//! Task executor for the taskid runtime.
//!
//! [`Runtime`] keeps spawned tasks in a slab and schedules them through a
//! run queue of slab keys. Wakers push the key of their task back onto
//! the queue. A runtime is bound to the thread that created it.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::task::Poll;

use slab::Slab;

use crate::task::{JoinHandle, Task};

thread_local! {
    /// Runtime driven by [`Runtime::run`] on this thread, used by [`spawn`].
    static CURRENT_RUNTIME: RefCell<Option<Rc<Runtime>>> = const { RefCell::new(None) };
}

/// Asynchronous task runtime.
pub struct Runtime {
    task_sender: Sender<usize>,
    task_receiver: Receiver<usize>,
    task_pool: RefCell<Slab<Option<Task>>>,
}

impl Runtime {
    /// Creates a new runtime with room for `queue_size` tasks before the
    /// task pool grows.
    pub fn new(queue_size: usize) -> Rc<Self> {
        let (task_sender, task_receiver) = channel();
        Rc::new(Runtime {
            task_sender,
            task_receiver,
            task_pool: RefCell::new(Slab::with_capacity(queue_size)),
        })
    }

    /// Spawn a future onto the runtime and return a [`JoinHandle`] to await
    /// its result.
    pub fn spawn<F, T>(&self, future: F) -> JoinHandle<T>
    where
        F: Future<Output = T> + 'static,
        T: 'static,
    {
        let (task, handle) = Task::create_task_and_handle(future, self.task_sender.clone());

        let task_key = self.task_pool.borrow_mut().insert(Some(task));
        tracing::trace!("Runtime::spawn task_key: {}", task_key);

        self.task_sender.send(task_key).expect("Failed to send task");

        handle
    }

    /// Number of tasks spawned on this runtime that have not finished.
    pub fn pending_tasks(&self) -> usize {
        self.task_pool.borrow().len()
    }

    /// Run tasks until the task pool becomes empty.
    ///
    /// Stops early if tasks remain but none of them has been woken, since
    /// nothing on this thread could wake them any more.
    pub fn run_queue(&self) {
        while self.pending_tasks() > 0 {
            let Ok(task_key) = self.task_receiver.try_recv() else {
                tracing::warn!(
                    "{} tasks pending but none scheduled, leaving run queue",
                    self.pending_tasks()
                );
                break;
            };

            tracing::trace!("Runtime::run_queue task_key: {}", task_key);
            if let Poll::Ready(()) = self.poll_task(task_key) {
                let finished = self.task_pool.borrow_mut().remove(task_key);
                if let Some(task) = &finished {
                    tracing::trace!(
                        "Task {} completed after {} polls, remaining tasks: {}",
                        task_key,
                        task.polls(),
                        self.pending_tasks()
                    );
                }
                // Dropped outside of the pool borrow: the future may own handles
                // whose drop touches this runtime.
                drop(finished);
            }
        }
    }

    /// Run the provided future to completion, driving the event loop.
    ///
    /// The runtime is installed as the target of [`spawn`] on this thread
    /// for the duration of the call. Returns `None` if the queue stalled
    /// before `future` finished.
    pub fn run<F, T>(self: &Rc<Self>, future: F) -> Option<T>
    where
        F: Future<Output = T> + 'static,
        T: 'static,
    {
        let _current = CurrentRuntime::install(self.clone());
        let handle = self.spawn(future);
        self.run_queue();
        handle.try_take()
    }

    /// Poll a single task by its slab key.
    ///
    /// Keys of tasks that already finished are ignored; a stale waker may
    /// still carry them.
    pub(crate) fn poll_task(&self, task_key: usize) -> Poll<()> {
        let task = match self.task_pool.borrow_mut().get_mut(task_key) {
            Some(slot) => slot.take(),
            None => None,
        };
        let Some(task) = task else {
            tracing::trace!("Task {} not in pool, skipping", task_key);
            return Poll::Pending;
        };

        let ret = task.poll_task(task_key);

        if let Some(slot) = self.task_pool.borrow_mut().get_mut(task_key) {
            slot.replace(task);
        }
        ret
    }
}

/// Restores the previously installed runtime on drop.
struct CurrentRuntime {
    previous: Option<Rc<Runtime>>,
}

impl CurrentRuntime {
    fn install(runtime: Rc<Runtime>) -> Self {
        let previous = CURRENT_RUNTIME.with(|current| current.replace(Some(runtime)));
        CurrentRuntime { previous }
    }
}

impl Drop for CurrentRuntime {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT_RUNTIME.with(|current| *current.borrow_mut() = previous);
    }
}

/// Spawn a future onto the runtime currently driven by [`Runtime::run`] on
/// this thread.
///
/// # Panics
///
/// Panics when called outside of [`Runtime::run`].
pub fn spawn<F, T>(future: F) -> JoinHandle<T>
where
    F: Future<Output = T> + 'static,
    T: 'static,
{
    let runtime = CURRENT_RUNTIME
        .with(|current| current.borrow().clone())
        .expect("spawn called outside of Runtime::run");
    runtime.spawn(future)
}
