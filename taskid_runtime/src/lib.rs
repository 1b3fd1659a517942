//! Crate level module for the `taskid_runtime` task executor.
//!
//! This library provides a small single-threaded runtime and a simple
//! task system. Each OS thread drives its own [`Runtime`]; running one
//! runtime per thread spreads tasks over a pool of OS threads.
//!
//! Every task owns a control block holding its scheduling state. The
//! control block is internal to the runtime: its layout changes between
//! releases and the task identifier it carries is not part of the public
//! API. Diagnostic tooling that needs to look inside it goes through
//! [`raw::current_control_block`] and keys its interpretation on
//! [`VERSION`].
//!
//! ## Example
//!
//! ```no_run
//! use taskid_runtime::{spawn, yield_now, Runtime};
//!
//! let runtime = Runtime::new(1024);
//! let answer = runtime.run(async {
//!     let handle = spawn(async { 21 * 2 });
//!     yield_now().await;
//!     handle.await
//! });
//! assert_eq!(answer, Some(42));
//! ```

/// Task executor.
pub mod executor;
/// Raw access to runtime internals.
pub mod raw;
/// Task abstraction, control blocks and waker utilities.
pub mod task;

pub use executor::{spawn, Runtime};
pub use futures_lite::future::yield_now;
pub use task::JoinHandle;

/// Release of this runtime, as published in its package metadata.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Number of tasks alive across every runtime in the process.
pub fn live_tasks() -> usize {
    task::control::live_count()
}
