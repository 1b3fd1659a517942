//! Error types for unit id resolution.

use crate::detect::Detection;
use crate::release::RuntimeRelease;

/// Failure of a single guarded read from a control block.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    /// The known-constant field did not hold its constant: the layout
    /// registered for this release does not describe the running host.
    #[error("control block sanity check failed: expected {expected:#x}, found {found:#x}")]
    SanityMismatch { expected: u64, found: u64 },

    /// The field lies past the end of the readable control block.
    #[error("field at offset {offset} ({width} bytes) exceeds the {len} byte control block")]
    OutOfBounds {
        offset: usize,
        width: usize,
        len: usize,
    },
}

/// Why a detected release cannot be served.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnsupportedCause {
    #[error("no control block layout registered")]
    Unregistered,

    #[error(transparent)]
    Layout(#[from] AccessError),
}

/// Errors returned by [`Resolver::try_resolve`](crate::resolve::Resolver::try_resolve).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// The running host cannot be introspected by this build. Never
    /// transient: only shipping a layout for the release fixes it.
    #[error("unsupported runtime release {release}: {cause}")]
    UnsupportedRelease {
        release: String,
        cause: UnsupportedCause,
    },

    /// No task is being polled on the calling thread.
    #[error("no task is running on this thread")]
    OutsideTask,
}

impl ResolveError {
    pub(crate) fn unsupported(detection: &Detection, cause: impl Into<UnsupportedCause>) -> Self {
        ResolveError::UnsupportedRelease {
            release: detection.to_string(),
            cause: cause.into(),
        }
    }
}

/// Invalid layout table handed to [`LayoutRegistry::from_table`](crate::layout::LayoutRegistry::from_table).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("release {0} listed more than once")]
    DuplicateRelease(RuntimeRelease),

    #[error("the unknown release cannot carry a layout")]
    UnknownRelease,

    #[error("release {0}: sanity field overlaps the identifier field")]
    OverlappingSanity(RuntimeRelease),

    #[error("release {0}: field offset overflows")]
    FieldOverflow(RuntimeRelease),
}
