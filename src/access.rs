//! Guarded reads from a task control block.
//!
//! This is the only module that dereferences runtime-internal memory.
//! Each read is bounds-checked against the readable length of the block,
//! never writes, never allocates and never logs, so it can run inside a
//! log formatter.

use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

use taskid_runtime::raw;

use crate::error::AccessError;
use crate::layout::{FieldSpec, LayoutDescriptor};

/// Identifier of a task, as stored in its control block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitId(u64);

impl UnitId {
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A borrowed view of a control block.
///
/// Neither `Send` nor `Sync`, and only handed out for the extent of one
/// call, so it cannot outlive the poll that owns the block.
#[derive(Clone, Copy)]
pub struct ControlBlockHandle<'a> {
    ptr: NonNull<u8>,
    len: usize,
    _block: PhantomData<(&'a [u8], *const u8)>,
}

impl<'a> ControlBlockHandle<'a> {
    /// # Safety
    ///
    /// `ptr` must be valid for reads of `len` bytes for `'a`, and nothing
    /// may write to those bytes through another path concurrently.
    pub unsafe fn from_raw(ptr: NonNull<u8>, len: usize) -> Self {
        ControlBlockHandle {
            ptr,
            len,
            _block: PhantomData,
        }
    }

    /// Lend the control block of the task polled on this thread to `f`.
    ///
    /// Returns `None` when no task is being polled.
    pub fn with_current<R>(f: impl FnOnce(ControlBlockHandle<'_>) -> R) -> Option<R> {
        let block = raw::current_control_block()?;
        // SAFETY: the runtime keeps the block alive and in place until the
        // current poll returns, which outlives this call. Only the polling
        // thread writes to it, and that thread is here.
        let handle = unsafe { ControlBlockHandle::from_raw(block.ptr, block.len) };
        Some(f(handle))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn read(&self, field: FieldSpec) -> Result<u64, AccessError> {
        let out_of_bounds = AccessError::OutOfBounds {
            offset: field.offset,
            width: field.width.bytes(),
            len: self.len,
        };
        match field.end() {
            Some(end) if end <= self.len => {}
            _ => return Err(out_of_bounds),
        }
        // SAFETY: `from_raw` guarantees `len` readable bytes at `ptr` and the
        // field ends within them.
        Ok(unsafe { field.width.read(self.ptr.as_ptr().add(field.offset)) })
    }
}

impl fmt::Debug for ControlBlockHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlBlockHandle")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}

/// Read the task identifier out of `block` using `layout`.
///
/// The sanity field, when the layout has one, is checked first; a
/// mismatch means the layout does not describe this block and nothing is
/// read from the identifier field.
pub fn read_identifier(
    block: ControlBlockHandle<'_>,
    layout: &LayoutDescriptor,
) -> Result<UnitId, AccessError> {
    if let Some(sanity) = &layout.sanity {
        let found = block.read(sanity.field)?;
        if found != sanity.expected {
            return Err(AccessError::SanityMismatch {
                expected: sanity.expected,
                found,
            });
        }
    }
    block.read(layout.id).map(UnitId)
}
