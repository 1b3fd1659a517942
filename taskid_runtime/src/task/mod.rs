//! Tasks and the handles used to await their output.

pub(crate) mod control;
mod waker;

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::mpsc::Sender;
use std::task::{Context, Poll, Waker};

use crate::task::control::ControlBlock;
use crate::task::waker::new_waker;

/// State shared between a task and its [`JoinHandle`].
#[derive(Debug)]
struct SharedState<T> {
    waker: Option<Waker>,
    result: Option<T>,
}

/// Handle to await the output of a spawned task.
pub struct JoinHandle<T> {
    shared_state: Rc<RefCell<SharedState<T>>>,
}

impl<T> JoinHandle<T> {
    /// Whether the task has produced its output and it has not been taken yet.
    pub fn is_finished(&self) -> bool {
        self.shared_state.borrow().result.is_some()
    }

    /// Take the output if the task already finished.
    pub fn try_take(&self) -> Option<T> {
        self.shared_state.borrow_mut().result.take()
    }
}

impl<T> Future for JoinHandle<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut shared = self.shared_state.borrow_mut();
        if let Some(result) = shared.result.take() {
            return Poll::Ready(result);
        }
        shared.waker = Some(cx.waker().clone());
        Poll::Pending
    }
}

/// A spawned future together with its control block.
pub(crate) struct Task {
    future: RefCell<Pin<Box<dyn Future<Output = ()> + 'static>>>,
    task_sender: Sender<usize>,
    control: Box<ControlBlock>,
}

impl Task {
    pub(crate) fn create_task_and_handle<F, T>(
        future: F,
        sender: Sender<usize>,
    ) -> (Task, JoinHandle<T>)
    where
        F: Future<Output = T> + 'static,
        T: 'static,
    {
        let shared = Rc::new(RefCell::new(SharedState {
            waker: None,
            result: None,
        }));
        let handle = JoinHandle {
            shared_state: shared.clone(),
        };

        let wrapped_future = async move {
            let res = future.await;
            let waker = {
                let mut shared = shared.borrow_mut();
                shared.result = Some(res);
                shared.waker.take()
            };
            if let Some(waker) = waker {
                tracing::trace!("Task finished, waking join handle");
                waker.wake();
            }
        };

        let task = Task {
            future: RefCell::new(Box::pin(wrapped_future)),
            task_sender: sender,
            control: ControlBlock::new(),
        };
        (task, handle)
    }

    /// Poll the task once with its control block published as current.
    pub(crate) fn poll_task(&self, task_key: usize) -> Poll<()> {
        let waker = new_waker(self.task_sender.clone(), task_key);
        let mut context = Context::from_waker(&waker);
        let mut future_slot = match self.future.try_borrow_mut() {
            Ok(future) => future,
            Err(_) => {
                tracing::warn!("Failed to borrow future of task {}", task_key);
                return Poll::Pending;
            }
        };

        let ret = {
            let _running = self.control.enter();
            future_slot.as_mut().poll(&mut context)
        };
        if ret.is_ready() {
            self.control.finish();
        }
        ret
    }

    pub(crate) fn polls(&self) -> u64 {
        self.control.polls()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::control::TaskState;
    use std::sync::mpsc::channel;

    #[test]
    fn ready_task_fills_join_handle() {
        let (sender, _receiver) = channel();
        let (task, handle) = Task::create_task_and_handle(async { 5usize }, sender);
        assert!(!handle.is_finished());
        assert_eq!(task.poll_task(0), Poll::Ready(()));
        assert_eq!(task.control.state(), TaskState::Finished);
        assert!(handle.is_finished());
        assert_eq!(handle.try_take(), Some(5));
        assert_eq!(handle.try_take(), None);
    }

    #[test]
    fn yielding_task_requeues_itself() {
        let (sender, receiver) = channel();
        let (task, handle) = Task::create_task_and_handle(
            async {
                crate::yield_now().await;
                "done"
            },
            sender,
        );
        assert_eq!(task.poll_task(3), Poll::Pending);
        assert_eq!(receiver.try_recv(), Ok(3));
        assert_eq!(task.control.state(), TaskState::Idle);
        assert_eq!(task.poll_task(3), Poll::Ready(()));
        assert_eq!(task.polls(), 2);
        assert_eq!(handle.try_take(), Some("done"));
    }

    #[test]
    fn join_handle_registers_waker() {
        let (sender, _receiver) = channel::<usize>();
        let (_task, mut handle) = Task::create_task_and_handle(async { 1u8 }, sender);
        let waker = futures::task::noop_waker();
        let mut cx = Context::from_waker(&waker);
        assert_eq!(Pin::new(&mut handle).poll(&mut cx), Poll::Pending);
        assert!(handle.shared_state.borrow().waker.is_some());
    }
}
