//! Per-task control block.
//!
//! The block is `#[repr(C)]` and boxed for the lifetime of its task, so
//! its address stays put while the task moves in and out of the task
//! pool. While a task is polled, its block is published in a thread
//! local for [`crate::raw::current_control_block`].
//!
//! Layout of the 0.3 series (offsets in bytes):
//!
//! | offset | width | field   |
//! |--------|-------|---------|
//! | 0      | 4     | `magic` |
//! | 4      | 4     | `state` |
//! | 8      | 8     | `polls` |
//! | 16     | 8     | `id`    |

use std::cell::Cell;
use std::fmt;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Constant stored at offset 0 of every control block ("task").
pub(crate) const CONTROL_BLOCK_MAGIC: u32 = 0x7461_736b;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);
static LIVE_TASKS: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    /// Control block of the task currently polled on this thread.
    static CURRENT_BLOCK: Cell<*const ControlBlock> = const { Cell::new(ptr::null()) };
}

/// Scheduling state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub(crate) enum TaskState {
    Idle = 0,
    Running = 1,
    Finished = 2,
}

impl TaskState {
    fn from_raw(raw: u32) -> Self {
        match raw {
            1 => TaskState::Running,
            2 => TaskState::Finished,
            _ => TaskState::Idle,
        }
    }
}

#[repr(C)]
pub(crate) struct ControlBlock {
    magic: u32,
    state: Cell<u32>,
    polls: Cell<u64>,
    // Only read through `raw::current_control_block`.
    #[allow(dead_code)]
    id: u64,
}

impl ControlBlock {
    pub(crate) fn new() -> Box<Self> {
        LIVE_TASKS.fetch_add(1, Ordering::Relaxed);
        Box::new(ControlBlock {
            magic: CONTROL_BLOCK_MAGIC,
            state: Cell::new(TaskState::Idle as u32),
            polls: Cell::new(0),
            id: NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed),
        })
    }

    /// Mark the task as running and publish this block until the returned
    /// guard is dropped.
    pub(crate) fn enter(&self) -> Running<'_> {
        debug_assert_eq!(self.magic, CONTROL_BLOCK_MAGIC);
        self.state.set(TaskState::Running as u32);
        self.polls.set(self.polls.get() + 1);
        let previous = CURRENT_BLOCK.with(|current| current.replace(self as *const ControlBlock));
        Running {
            block: self,
            previous,
        }
    }

    pub(crate) fn finish(&self) {
        self.state.set(TaskState::Finished as u32);
    }

    pub(crate) fn state(&self) -> TaskState {
        TaskState::from_raw(self.state.get())
    }

    pub(crate) fn polls(&self) -> u64 {
        self.polls.get()
    }
}

impl Drop for ControlBlock {
    fn drop(&mut self) {
        LIVE_TASKS.fetch_sub(1, Ordering::Relaxed);
    }
}

impl fmt::Debug for ControlBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlBlock")
            .field("state", &self.state())
            .field("polls", &self.polls())
            .finish()
    }
}

/// Guard returned by [`ControlBlock::enter`].
pub(crate) struct Running<'a> {
    block: &'a ControlBlock,
    previous: *const ControlBlock,
}

impl Drop for Running<'_> {
    fn drop(&mut self) {
        CURRENT_BLOCK.with(|current| current.set(self.previous));
        if self.block.state() == TaskState::Running {
            self.block.state.set(TaskState::Idle as u32);
        }
    }
}

pub(crate) fn current() -> Option<NonNull<ControlBlock>> {
    NonNull::new(CURRENT_BLOCK.with(Cell::get).cast_mut())
}

pub(crate) fn live_count() -> usize {
    LIVE_TASKS.load(Ordering::Relaxed)
}
