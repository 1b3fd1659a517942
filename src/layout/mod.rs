//! Control block layouts, one per supported host release.
//!
//! A [`LayoutDescriptor`] records where the task identifier lives inside
//! the control block of one release, and optionally a field with a known
//! constant value used to confirm that the release really has that
//! layout. The builtin [`LayoutRegistry`] is built once from the table in
//! [`table`] and never changes afterwards.

mod table;

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::error::RegistryError;
use crate::release::RuntimeRelease;

pub use table::{CONTROL_BLOCK_MAGIC, SUPPORTED};

/// Width of an integer field, read in native byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Width {
    U8,
    U16,
    U32,
    U64,
}

impl Width {
    pub const fn bytes(self) -> usize {
        match self {
            Width::U8 => 1,
            Width::U16 => 2,
            Width::U32 => 4,
            Width::U64 => 8,
        }
    }

    /// Read an integer of this width and widen it to `u64`.
    ///
    /// # Safety
    ///
    /// `src` must be valid for reads of `self.bytes()` bytes.
    pub(crate) unsafe fn read(self, src: *const u8) -> u64 {
        match self {
            Width::U8 => u64::from(src.read()),
            Width::U16 => u64::from(src.cast::<u16>().read_unaligned()),
            Width::U32 => u64::from(src.cast::<u32>().read_unaligned()),
            Width::U64 => src.cast::<u64>().read_unaligned(),
        }
    }
}

/// An integer field at a fixed byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldSpec {
    pub offset: usize,
    pub width: Width,
}

impl FieldSpec {
    pub const fn new(offset: usize, width: Width) -> Self {
        FieldSpec { offset, width }
    }

    /// One past the last byte of the field, or `None` on overflow.
    pub const fn end(&self) -> Option<usize> {
        self.offset.checked_add(self.width.bytes())
    }

    const fn overlaps(&self, other: &FieldSpec) -> bool {
        match (self.end(), other.end()) {
            (Some(end), Some(other_end)) => self.offset < other_end && other.offset < end,
            _ => true,
        }
    }
}

/// A field that holds the same constant in every control block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SanityCheck {
    pub field: FieldSpec,
    pub expected: u64,
}

impl SanityCheck {
    pub const fn new(field: FieldSpec, expected: u64) -> Self {
        SanityCheck { field, expected }
    }
}

/// Where the identifier sits in the control block of one release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutDescriptor {
    pub id: FieldSpec,
    pub sanity: Option<SanityCheck>,
}

impl LayoutDescriptor {
    pub const fn new(id: FieldSpec) -> Self {
        LayoutDescriptor { id, sanity: None }
    }

    pub const fn with_sanity(self, sanity: SanityCheck) -> Self {
        LayoutDescriptor {
            id: self.id,
            sanity: Some(sanity),
        }
    }

    const fn check(&self, release: RuntimeRelease) -> Result<(), RegistryError> {
        if self.id.end().is_none() {
            return Err(RegistryError::FieldOverflow(release));
        }
        if let Some(sanity) = &self.sanity {
            if sanity.field.end().is_none() {
                return Err(RegistryError::FieldOverflow(release));
            }
            if sanity.field.overlaps(&self.id) {
                return Err(RegistryError::OverlappingSanity(release));
            }
        }
        Ok(())
    }
}

/// Validate a layout table. `const` so the builtin table is checked at
/// compile time.
pub(crate) const fn validate(table: &[(RuntimeRelease, LayoutDescriptor)]) -> Result<(), RegistryError> {
    let mut i = 0;
    while i < table.len() {
        let (release, layout) = &table[i];
        if !release.is_known() {
            return Err(RegistryError::UnknownRelease);
        }
        if let Err(err) = layout.check(*release) {
            return Err(err);
        }
        let mut j = 0;
        while j < i {
            if table[j].0.same_as(release) {
                return Err(RegistryError::DuplicateRelease(*release));
            }
            j += 1;
        }
        i += 1;
    }
    Ok(())
}

/// Immutable map from host release to control block layout.
#[derive(Debug)]
pub struct LayoutRegistry {
    layouts: HashMap<RuntimeRelease, LayoutDescriptor>,
}

impl LayoutRegistry {
    /// The registry of every release this build knows.
    pub fn builtin() -> &'static LayoutRegistry {
        static BUILTIN: LazyLock<LayoutRegistry> = LazyLock::new(|| LayoutRegistry {
            layouts: SUPPORTED.iter().copied().collect(),
        });
        &BUILTIN
    }

    /// Build a registry from a caller-supplied table, with the same checks
    /// the builtin table passes at compile time.
    pub fn from_table(table: &[(RuntimeRelease, LayoutDescriptor)]) -> Result<Self, RegistryError> {
        validate(table)?;
        Ok(LayoutRegistry {
            layouts: table.iter().copied().collect(),
        })
    }

    pub fn lookup(&self, release: RuntimeRelease) -> Option<&LayoutDescriptor> {
        self.layouts.get(&release)
    }

    /// Registered releases in ascending order.
    pub fn supported_releases(&self) -> Vec<RuntimeRelease> {
        let mut releases: Vec<_> = self.layouts.keys().copied().collect();
        releases.sort();
        releases
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }
}
