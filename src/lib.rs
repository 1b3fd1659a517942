//! Recover the identifier of the running `taskid_runtime` task.
//!
//! `taskid_runtime` keeps the identifier of each task in a runtime-internal
//! control block and does not expose it. Loggers and tracers still need it
//! to correlate records produced by concurrently running tasks. This crate
//! reads it out of the control block:
//!
//! 1. the host release is detected once per process ([`detect`]);
//! 2. the release selects a [`LayoutDescriptor`] from a compiled-in table
//!    ([`layout`]);
//! 3. a single bounds- and sanity-checked read returns the identifier
//!    ([`access`]).
//!
//! A release without a registered layout, or whose control block does not
//! look like its registered layout, is fatal: [`resolve_current_unit_id`]
//! panics with a message naming the release rather than returning a
//! plausible but wrong identifier.
//!
//! ## Example
//!
//! ```no_run
//! use taskid_runtime::{spawn, yield_now, Runtime};
//!
//! taskid::init().expect("supported taskid_runtime release");
//! Runtime::new(64).run(async {
//!     let before = taskid::resolve_current_unit_id();
//!     yield_now().await;
//!     assert_eq!(before, taskid::resolve_current_unit_id());
//!
//!     let child = spawn(async { taskid::resolve_current_unit_id() }).await;
//!     assert_ne!(before, child);
//! });
//! ```

pub mod access;
pub mod detect;
pub mod error;
pub mod layout;
pub mod release;
pub mod resolve;
pub mod tag;

use std::sync::LazyLock;

pub use access::{ControlBlockHandle, UnitId};
pub use detect::{Detection, HostRelease, ReleaseSource};
pub use error::{AccessError, RegistryError, ResolveError, UnsupportedCause};
pub use layout::{LayoutDescriptor, LayoutRegistry};
pub use release::RuntimeRelease;
pub use resolve::{Resolver, ResolverState};
pub use tag::{init_logging, UnitTagFormat};

/// Resolver for the linked `taskid_runtime`, shared by the whole process.
pub fn global() -> &'static Resolver {
    static GLOBAL: LazyLock<Resolver> =
        LazyLock::new(|| Resolver::new(HostRelease::new(), LayoutRegistry::builtin()));
    &GLOBAL
}

/// Identifier of the task currently polled on this thread.
///
/// # Panics
///
/// Panics when the running `taskid_runtime` release is not supported by
/// this build, when its control block fails validation, or when called
/// outside of a task. See [`Resolver::resolve`].
pub fn resolve_current_unit_id() -> UnitId {
    global().resolve()
}

/// Fallible form of [`resolve_current_unit_id`].
pub fn try_current_unit_id() -> Result<UnitId, ResolveError> {
    global().try_resolve()
}

/// Detect the host release up front and log the outcome.
///
/// Calling this at startup keeps the one-time detection (and its single
/// allocation) off the first call that needs an identifier.
pub fn init() -> Result<RuntimeRelease, ResolveError> {
    match global().prime() {
        Ok(detection) => {
            tracing::info!(release = %detection, "taskid_runtime release supported");
            Ok(detection.release())
        }
        Err(err) => {
            tracing::error!(
                supported = ?LayoutRegistry::builtin().supported_releases(),
                "{err}"
            );
            Err(err)
        }
    }
}
