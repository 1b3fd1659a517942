//! Raw access to runtime internals for diagnostic tooling.
//!
//! Nothing in this module is covered by semver. The control block layout
//! is specific to each release of the runtime; anything reading through
//! the returned pointer must key its interpretation on [`crate::VERSION`]
//! and validate what it reads.

use std::mem;
use std::ptr::NonNull;

use crate::task::control::{self, ControlBlock};

/// Address and readable length of a task control block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawControlBlock {
    pub ptr: NonNull<u8>,
    pub len: usize,
}

/// Locate the control block of the task currently polled on this thread.
///
/// Returns `None` when no task is being polled. The block stays alive and
/// in place until the current poll returns; the pointer must not be used
/// after that, and must never be written through.
pub fn current_control_block() -> Option<RawControlBlock> {
    control::current().map(|block| RawControlBlock {
        ptr: block.cast(),
        len: mem::size_of::<ControlBlock>(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Runtime;

    #[test]
    fn no_block_outside_of_a_task() {
        assert!(current_control_block().is_none());
    }

    #[test]
    fn block_is_stable_across_yields() {
        let runtime = Runtime::new(4);
        let seen = runtime
            .run(async {
                let first = current_control_block().expect("inside a task");
                crate::yield_now().await;
                let second = current_control_block().expect("inside a task");
                (first, second)
            })
            .expect("main task finished");
        assert_eq!(seen.0, seen.1);
        assert_eq!(seen.0.len, mem::size_of::<ControlBlock>());
        assert!(current_control_block().is_none());
    }

    #[test]
    fn spawned_tasks_get_distinct_blocks() {
        let runtime = Runtime::new(4);
        let (outer, inner) = runtime
            .run(async {
                let outer = current_control_block().expect("inside a task");
                let inner = crate::spawn(async {
                    current_control_block().expect("inside a task")
                })
                .await;
                (outer, inner)
            })
            .expect("main task finished");
        assert_ne!(outer.ptr, inner.ptr);
    }
}
