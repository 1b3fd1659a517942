//! Detection of the running host release.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::release::RuntimeRelease;

/// Outcome of release detection: the parsed release and the signal it
/// was parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    release: RuntimeRelease,
    signal: String,
}

impl Detection {
    pub fn from_signal(signal: impl Into<String>) -> Self {
        let signal = signal.into();
        Detection {
            release: RuntimeRelease::parse(&signal),
            signal,
        }
    }

    pub fn release(&self) -> RuntimeRelease {
        self.release
    }

    pub fn signal(&self) -> &str {
        &self.signal
    }
}

impl fmt::Display for Detection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.release {
            RuntimeRelease::Unknown => write!(f, "unknown ({:?})", self.signal),
            release => write!(f, "{release}"),
        }
    }
}

/// Something that can tell which host release is running.
///
/// Implementations must not emit tracing events: detection may run from
/// inside an event formatter.
pub trait ReleaseSource: Send + Sync {
    fn detect(&self) -> Detection;
}

/// Reads the release published by `taskid_runtime`.
#[derive(Debug, Default)]
pub struct HostRelease {
    detections: AtomicUsize,
}

impl HostRelease {
    pub const fn new() -> Self {
        HostRelease {
            detections: AtomicUsize::new(0),
        }
    }

    /// How many times [`ReleaseSource::detect`] ran on this source.
    pub fn detections(&self) -> usize {
        self.detections.load(Ordering::Relaxed)
    }
}

impl ReleaseSource for HostRelease {
    fn detect(&self) -> Detection {
        self.detections.fetch_add(1, Ordering::Relaxed);
        Detection::from_signal(taskid_runtime::VERSION)
    }
}
