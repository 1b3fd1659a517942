use super::{validate, FieldSpec, LayoutDescriptor, SanityCheck, Width};
use crate::release::RuntimeRelease;

/// Value of the `magic` field at offset 0 of control blocks since 0.2.0.
pub const CONTROL_BLOCK_MAGIC: u64 = 0x7461_736b;

const MAGIC: SanityCheck = SanityCheck::new(FieldSpec::new(0, Width::U32), CONTROL_BLOCK_MAGIC);

// 0.1: { state: u32, flags: u32, id: u32, polls: u32 }, no magic.
const V0_1: LayoutDescriptor = LayoutDescriptor::new(FieldSpec::new(8, Width::U32));

// 0.2: { magic: u32, state: u32, id: u64 }
const V0_2: LayoutDescriptor = LayoutDescriptor::new(FieldSpec::new(8, Width::U64)).with_sanity(MAGIC);

// 0.3: { magic: u32, state: u32, polls: u64, id: u64 }
const V0_3: LayoutDescriptor = LayoutDescriptor::new(FieldSpec::new(16, Width::U64)).with_sanity(MAGIC);

/// Every release of `taskid_runtime` this build can read.
///
/// Supporting a new release means adding a row here.
pub const SUPPORTED: &[(RuntimeRelease, LayoutDescriptor)] = &[
    (RuntimeRelease::new(0, 1, 0), V0_1),
    (RuntimeRelease::new(0, 1, 1), V0_1),
    (RuntimeRelease::new(0, 2, 0), V0_2),
    (RuntimeRelease::new(0, 2, 1), V0_2),
    (RuntimeRelease::new(0, 3, 0), V0_3),
    (RuntimeRelease::new(0, 3, 1), V0_3),
];

const _: () = assert!(validate(SUPPORTED).is_ok());
