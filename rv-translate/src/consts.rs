//! Core parameters.

use core::mem;

/// The guest integer register width, selected by the `rv64` feature.
#[cfg(feature = "rv64")]
pub type GuestWord = u64;

/// The guest integer register width, selected by the `rv64` feature.
#[cfg(not(feature = "rv64"))]
pub type GuestWord = u32;

/// Signed view of [`GuestWord`].
#[cfg(feature = "rv64")]
pub type GuestSword = i64;

/// Signed view of [`GuestWord`].
#[cfg(not(feature = "rv64"))]
pub type GuestSword = i32;

/// Guest register width in bits.
pub const TARGET_LONG_BITS: u32 = GuestWord::BITS;

/// Guest register width in bytes.
pub const WORD_SIZE: usize = mem::size_of::<GuestWord>();

/// Guest page width in bits.
pub const TARGET_PAGE_BITS: u32 = 12;

/// Guest page size in bytes.
pub const TARGET_PAGE_SIZE: GuestWord = 1 << TARGET_PAGE_BITS;

/// Mask selecting the page number of a guest address.
pub const TARGET_PAGE_MASK: GuestWord = !(TARGET_PAGE_SIZE - 1);

/// Reset value of the guest program counter.
pub const RISCV_START_PC: GuestWord = 0x1000;

/// Micro-op buffer high-water mark; translation stops once a block grows
/// past it.
pub const IR_OPC_CAPACITY: usize = 640;

/// Default per-block instruction budget.
pub const DEFAULT_MAX_INSNS: usize = 512;

/// Largest element width the vector unit supports, in bits.
pub const ELEN: u32 = 64;

static_assertions::const_assert!(TARGET_LONG_BITS == 32 || TARGET_LONG_BITS == 64);
static_assertions::const_assert!(IR_OPC_CAPACITY > 64);
