//! Release tags of the host runtime.

use std::fmt;

/// A release of `taskid_runtime`.
///
/// Parsed from the runtime's version string. Anything that is not a plain
/// `major.minor.patch` release becomes [`RuntimeRelease::Unknown`], which
/// sorts before every known release and never has a registered layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuntimeRelease {
    Unknown,
    Version { major: u16, minor: u16, patch: u16 },
}

impl RuntimeRelease {
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        RuntimeRelease::Version {
            major,
            minor,
            patch,
        }
    }

    /// Parse a version signal.
    ///
    /// Build metadata (`+...`) is ignored. Pre-releases (`-...`) are
    /// rejected: their control block layout is not pinned down yet.
    pub fn parse(signal: &str) -> Self {
        let signal = signal.trim();
        let core = signal.split_once('+').map_or(signal, |(core, _)| core);
        if core.contains('-') {
            return RuntimeRelease::Unknown;
        }

        let mut parts = core.split('.');
        let (Some(major), Some(minor), Some(patch), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return RuntimeRelease::Unknown;
        };
        match (component(major), component(minor), component(patch)) {
            (Some(major), Some(minor), Some(patch)) => RuntimeRelease::new(major, minor, patch),
            _ => RuntimeRelease::Unknown,
        }
    }

    pub const fn is_known(&self) -> bool {
        matches!(self, RuntimeRelease::Version { .. })
    }

    /// `==` usable in constant evaluation.
    pub(crate) const fn same_as(&self, other: &RuntimeRelease) -> bool {
        match (self, other) {
            (RuntimeRelease::Unknown, RuntimeRelease::Unknown) => true,
            (
                RuntimeRelease::Version {
                    major: a,
                    minor: b,
                    patch: c,
                },
                RuntimeRelease::Version {
                    major: x,
                    minor: y,
                    patch: z,
                },
            ) => *a == *x && *b == *y && *c == *z,
            _ => false,
        }
    }
}

fn component(part: &str) -> Option<u16> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

impl fmt::Display for RuntimeRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeRelease::Unknown => f.write_str("unknown"),
            RuntimeRelease::Version {
                major,
                minor,
                patch,
            } => write!(f, "{major}.{minor}.{patch}"),
        }
    }
}
