//! RISC-V instruction-decode and IR-emission core.
//!
//! Given a linear stream of guest instructions, the core produces a
//! translation block: a sequence of target-independent micro-ops that, once
//! lowered by a host back end, reproduces the architectural side effects of
//! the guest code on a shared [`state::CpuState`]. The host back end, the
//! soft-TLB, MMIO dispatch and the outer execution loop are collaborators
//! and live outside this crate.

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(unused_must_use)]

extern crate alloc;

pub mod consts;
pub mod ir;
pub mod state;
pub mod tb;
pub mod vector;

mod translator;

#[cfg(any(test, feature = "test-helpers"))]
pub mod util;

// Re-export the decode primitives.
#[doc(no_inline)]
pub use rv_asm;

pub mod prelude {
    //! Convenience re-exports for embedders.
    #[doc(no_inline)]
    pub use rv_asm::{Exception, RawInsn, Register32, Register64};

    pub use crate::{
        consts::{GuestWord, RISCV_START_PC, TARGET_LONG_BITS},
        ir::{IrBuffer, MicroOp},
        state::{Breakpoint, CpuState, MisaExt, Mstatus, Privilege},
        tb::{GuestCode, TranslationBlock, Translator, TranslatorConfig},
    };
}
