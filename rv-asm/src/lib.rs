//! Atomic types of the RISC-V translation core.
//!
//! This crate carries everything the translator needs to take a raw guest
//! opcode word apart: bit-field extraction, the field accessors for the
//! standard and compressed encodings, the major/minor opcode tables, the
//! architectural exception causes, and the register enumerations exported to
//! the embedding runtime.

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(unused_must_use)]

mod exception;
mod fields;
mod registers;

pub mod opcode;

pub use exception::Exception;
pub use fields::{extract32, sextract32, sextract64, RawInsn};
pub use registers::{Register32, Register64, FPR_NAMES, GPR_NAMES};

/// Number of integer registers of the guest architecture.
pub const GPR_COUNT: usize = 32;

/// Number of floating-point registers of the guest architecture.
pub const FPR_COUNT: usize = 32;

/// Number of vector registers of the guest architecture.
pub const VREG_COUNT: usize = 32;
