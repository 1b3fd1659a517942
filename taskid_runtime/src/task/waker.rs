//! Custom waker used by [`Task`](crate::task::Task).

use std::{
    sync::{mpsc::Sender, Arc},
    task::{Wake, Waker},
};

/// Internal waker data used to reschedule tasks on the runtime.
///
/// A [`Waker`] may be cloned and woken from any thread, so the data is
/// shared through an `Arc` even though the runtime itself is single-threaded.
#[derive(Debug)]
struct TaskWaker {
    task_key: usize,
    task_sender: Sender<usize>,
}

impl TaskWaker {
    fn schedule(&self) {
        // The runtime may already be gone when a stray waker fires.
        if self.task_sender.send(self.task_key).is_err() {
            tracing::trace!("TaskWaker: runtime dropped, task {} not rescheduled", self.task_key);
        }
    }
}

impl Wake for TaskWaker {
    fn wake(self: Arc<Self>) {
        self.schedule();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.schedule();
    }
}

/// Create a [`Waker`] that requeues the task onto the runtime.
pub(crate) fn new_waker(sender: Sender<usize>, task_key: usize) -> Waker {
    Waker::from(Arc::new(TaskWaker {
        task_key,
        task_sender: sender,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::{channel, TryRecvError};
    use std::thread;

    #[test]
    fn wake_requeues_task_key() {
        let (sender, receiver) = channel();
        let waker = new_waker(sender, 7);
        waker.wake_by_ref();
        let clone = waker.clone();
        clone.wake();
        assert_eq!(receiver.try_recv(), Ok(7));
        assert_eq!(receiver.try_recv(), Ok(7));
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn wake_after_receiver_dropped_is_ignored() {
        let (sender, receiver) = channel();
        drop(receiver);
        new_waker(sender, 3).wake();
    }

    #[test]
    fn clone_and_wake_from_other_threads() {
        const THREADS: usize = 8;
        const CLONES: usize = 10_000;

        let (sender, receiver) = channel();
        let waker = new_waker(sender, 5);
        thread::scope(|scope| {
            for _ in 0..THREADS {
                let waker = &waker;
                scope.spawn(move || {
                    for _ in 0..CLONES {
                        drop(waker.clone());
                    }
                    waker.wake_by_ref();
                    waker.clone().wake();
                });
            }
        });

        let woken: Vec<usize> = receiver.try_iter().collect();
        assert_eq!(woken, vec![5; THREADS * 2]);

        // Dropping the last waker drops the last sender.
        drop(waker);
        assert_eq!(receiver.try_recv(), Err(TryRecvError::Disconnected));
    }
}
