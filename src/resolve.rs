//! Dispatch from the detected release to its layout and the guarded read.

use std::sync::OnceLock;

use crate::access::{read_identifier, ControlBlockHandle, UnitId};
use crate::detect::{Detection, HostRelease, ReleaseSource};
use crate::error::{ResolveError, UnsupportedCause};
use crate::layout::{LayoutDescriptor, LayoutRegistry};

/// Cached outcome of detection. Both variants are final.
#[derive(Debug)]
enum Resolution {
    Ready {
        detection: Detection,
        layout: &'static LayoutDescriptor,
    },
    Unsupported {
        detection: Detection,
    },
}

/// Observable state of a [`Resolver`].
///
/// Detection itself happens behind a one-time barrier: callers racing the
/// first resolution wait for it and all observe the same outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverState<'a> {
    Uninitialized,
    Ready(&'a Detection),
    Unsupported(&'a Detection),
}

/// Resolves the identifier of the running task.
///
/// Detects the host release once, binds it to a layout from the registry
/// and then serves every call with a single guarded read.
#[derive(Debug)]
pub struct Resolver<S = HostRelease> {
    source: S,
    registry: &'static LayoutRegistry,
    resolution: OnceLock<Resolution>,
}

impl<S: ReleaseSource> Resolver<S> {
    pub const fn new(source: S, registry: &'static LayoutRegistry) -> Self {
        Resolver {
            source,
            registry,
            resolution: OnceLock::new(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn state(&self) -> ResolverState<'_> {
        match self.resolution.get() {
            None => ResolverState::Uninitialized,
            Some(Resolution::Ready { detection, .. }) => ResolverState::Ready(detection),
            Some(Resolution::Unsupported { detection }) => ResolverState::Unsupported(detection),
        }
    }

    /// Run detection if it has not run yet and report whether the release
    /// is supported.
    pub fn prime(&self) -> Result<&Detection, ResolveError> {
        self.bound().map(|(detection, _)| detection)
    }

    /// Identifier of the task polled on this thread.
    pub fn try_resolve(&self) -> Result<UnitId, ResolveError> {
        let (detection, layout) = self.bound()?;
        ControlBlockHandle::with_current(|block| read(detection, layout, block))
            .unwrap_or(Err(ResolveError::OutsideTask))
    }

    /// Identifier stored in an explicitly supplied control block.
    pub fn try_resolve_in(&self, block: ControlBlockHandle<'_>) -> Result<UnitId, ResolveError> {
        let (detection, layout) = self.bound()?;
        read(detection, layout, block)
    }

    /// Identifier of the task polled on this thread.
    ///
    /// # Panics
    ///
    /// Panics with a message naming the detected release when the release
    /// is unsupported or its control block does not match the registered
    /// layout, and when called outside a task. A wrong identifier would
    /// silently corrupt every consumer's correlation, so there is no
    /// fallback value.
    pub fn resolve(&self) -> UnitId {
        match self.try_resolve() {
            Ok(id) => id,
            Err(err) => panic!("{err}"),
        }
    }

    fn bound(&self) -> Result<(&Detection, &'static LayoutDescriptor), ResolveError> {
        match self.resolution() {
            Resolution::Ready { detection, layout } => Ok((detection, layout)),
            Resolution::Unsupported { detection } => Err(ResolveError::unsupported(
                detection,
                UnsupportedCause::Unregistered,
            )),
        }
    }

    fn resolution(&self) -> &Resolution {
        self.resolution.get_or_init(|| {
            let detection = self.source.detect();
            match self.registry.lookup(detection.release()) {
                Some(layout) => Resolution::Ready { detection, layout },
                None => Resolution::Unsupported { detection },
            }
        })
    }
}

fn read(
    detection: &Detection,
    layout: &LayoutDescriptor,
    block: ControlBlockHandle<'_>,
) -> Result<UnitId, ResolveError> {
    read_identifier(block, layout).map_err(|err| ResolveError::unsupported(detection, err))
}
