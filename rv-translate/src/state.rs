//! Guest CPU state.
//!
//! A single mutable structure owned by the enclosing runtime and shared
//! between generated code and runtime helpers. The core itself only reads it
//! during translation (feature bits, breakpoints, single-step flag); all
//! mutation it expresses goes through emitted micro-ops that run later.

use alloc::{vec, vec::Vec};

use rv_asm::{Exception, FPR_COUNT, GPR_COUNT, VREG_COUNT};

use crate::consts::{GuestWord, ELEN, RISCV_START_PC};

/// Result type of runtime helpers: a guest exception, or the value.
pub type HelperResult<T = ()> = Result<T, Exception>;

bitflags::bitflags! {
    /// Fields of the `mstatus` CSR the core cares about.
    pub struct Mstatus: GuestWord {
        /// Supervisor interrupt enable.
        const SIE = 1 << 1;
        /// Machine interrupt enable.
        const MIE = 1 << 3;
        /// Supervisor previous interrupt enable.
        const SPIE = 1 << 5;
        /// Machine previous interrupt enable.
        const MPIE = 1 << 7;
        /// Supervisor previous privilege.
        const SPP = 1 << 8;
        /// Vector-unit status. Zero traps every vector instruction.
        const VS = 0x3 << 9;
        /// Machine previous privilege.
        const MPP = 0x3 << 11;
        /// Floating-point status. Zero traps every FP instruction.
        const FS = 0x3 << 13;
        /// Modify-privilege for loads and stores.
        const MPRV = 1 << 17;
        /// Supervisor user-memory access.
        const SUM = 1 << 18;
        /// Make executable readable.
        const MXR = 1 << 19;
    }
}

bitflags::bitflags! {
    /// Extension letters of the `misa` CSR.
    pub struct MisaExt: GuestWord {
        /// Atomic extension.
        const A = 1 << 0;
        /// Compressed extension.
        const C = 1 << 2;
        /// Double-precision floating point.
        const D = 1 << 3;
        /// Single-precision floating point.
        const F = 1 << 5;
        /// Base integer ISA.
        const I = 1 << 8;
        /// Integer multiply/divide.
        const M = 1 << 12;
        /// Supervisor mode.
        const S = 1 << 18;
        /// User mode.
        const U = 1 << 20;
        /// Vector extension.
        const V = 1 << 21;
    }
}

/// Guest privilege levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Privilege {
    /// User mode.
    #[display(fmt = "U")]
    User = 0,
    /// Supervisor mode.
    #[display(fmt = "S")]
    Supervisor = 1,
    /// Machine mode.
    #[display(fmt = "M")]
    Machine = 3,
}

/// A host breakpoint on a guest address.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Breakpoint {
    pc: GuestWord,
}

impl Breakpoint {
    /// Create a breakpoint at a guest address.
    pub const fn new(pc: GuestWord) -> Self {
        Self { pc }
    }

    /// Guest address that triggers the breakpoint.
    pub const fn pc(&self) -> GuestWord {
        self.pc
    }
}

/// A power-of-two rational vector length multiplier.
///
/// Kept as numerator/denominator so `vlmax` never goes through floating
/// point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Lmul {
    /// Numerator; a power of two.
    pub num: u32,
    /// Denominator; a power of two.
    pub den: u32,
}

impl Lmul {
    /// LMUL of 1.
    pub const UNIT: Self = Self { num: 1, den: 1 };

    /// Decode the sign-extended 3-bit `vlmul` field.
    pub const fn from_field(vlmul: u32) -> Self {
        // sign-extend the 3-bit field
        let signed = ((vlmul as i32) << 29) >> 29;
        if signed >= 0 {
            Self {
                num: 1 << signed,
                den: 1,
            }
        } else {
            Self {
                num: 1,
                den: 1 << -signed,
            }
        }
    }

    /// Whether this multiplier groups several registers (LMUL > 1).
    pub const fn grouped(self) -> bool {
        self.num > 1
    }
}

impl Default for Lmul {
    fn default() -> Self {
        Self::UNIT
    }
}

/// The guest CPU state.
///
/// Field layout follows the architectural register file plus the control
/// bits the translation core consults. Everything here is reachable from
/// generated code through the IR globals or from runtime helpers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuState {
    /// Integer registers. `gpr[0]` is kept for layout but reads as zero and
    /// never receives a write through the accessors.
    pub gpr: [GuestWord; GPR_COUNT],
    /// Floating-point registers, 64-bit wide (F and D share the bank).
    pub fpr: [u64; FPR_COUNT],
    /// Program counter of the current instruction boundary.
    pub pc: GuestWord,
    /// Reservation latch for LR/SC. Declared by the core, never written by
    /// it; see the atomics module.
    pub load_res: GuestWord,

    /// `mstatus` CSR.
    pub mstatus: GuestWord,
    /// `mie` CSR.
    pub mie: GuestWord,
    /// `mip` CSR.
    pub mip: GuestWord,
    /// `mtvec` CSR.
    pub mtvec: GuestWord,
    /// `mscratch` CSR.
    pub mscratch: GuestWord,
    /// `mepc` CSR.
    pub mepc: GuestWord,
    /// `mcause` CSR.
    pub mcause: GuestWord,
    /// `mtval` CSR.
    pub mtval: GuestWord,
    /// `misa` CSR.
    pub misa: GuestWord,
    /// Writable-extension mask backing `misa`.
    pub misa_mask: GuestWord,
    /// `medeleg` CSR.
    pub medeleg: GuestWord,
    /// `mideleg` CSR.
    pub mideleg: GuestWord,
    /// `stvec` CSR.
    pub stvec: GuestWord,
    /// `sscratch` CSR.
    pub sscratch: GuestWord,
    /// `sepc` CSR.
    pub sepc: GuestWord,
    /// `scause` CSR.
    pub scause: GuestWord,
    /// `stval` CSR.
    pub stval: GuestWord,

    /// Current privilege level.
    pub privilege: Privilege,
    /// Hart id; survives reset.
    pub mhartid: GuestWord,
    /// Privileged-architecture 1.10 selector; survives reset.
    pub privilege_architecture_1_10: bool,
    /// Pending exception, if any. `None` is the original's `EXCP_NONE`.
    pub exception_index: Option<Exception>,
    /// Whether the debugger requested single-step execution.
    pub singlestep_enabled: bool,
    /// Host breakpoints, stable for the duration of one translation call.
    pub breakpoints: Vec<Breakpoint>,

    /// Active vector length.
    pub vl: GuestWord,
    /// Raw `vtype` CSR value.
    pub vtype: GuestWord,
    /// First element index vector ops start at.
    pub vstart: GuestWord,
    /// Selected element width in bits.
    pub vsew: u32,
    /// Raw 3-bit `vlmul` field.
    pub vlmul: u32,
    /// Rational length multiplier derived from `vlmul`.
    pub vflmul: Lmul,
    /// Maximum vector length for the current configuration.
    pub vlmax: GuestWord,
    /// Illegal-configuration flag; blocks all non-config vector ops.
    pub vill: bool,
    /// Tail-agnostic bit of `vtype`.
    pub vta: bool,
    /// Mask-agnostic bit of `vtype`.
    pub vma: bool,
    /// Vector register width in bytes; a hardware parameter.
    pub vlenb: u32,
    /// Largest supported element width in bits; a hardware parameter.
    pub elen: u32,

    vreg: Vec<u8>,
}

impl CpuState {
    /// Create a fresh state with the given vector register width in bytes.
    pub fn new(misa_mask: MisaExt, vlenb: u32) -> Self {
        let mut state = Self {
            gpr: [0; GPR_COUNT],
            fpr: [0; FPR_COUNT],
            pc: 0,
            load_res: 0,
            mstatus: 0,
            mie: 0,
            mip: 0,
            mtvec: 0,
            mscratch: 0,
            mepc: 0,
            mcause: 0,
            mtval: 0,
            misa: 0,
            misa_mask: misa_mask.bits(),
            medeleg: 0,
            mideleg: 0,
            stvec: 0,
            sscratch: 0,
            sepc: 0,
            scause: 0,
            stval: 0,
            privilege: Privilege::Machine,
            mhartid: 0,
            privilege_architecture_1_10: true,
            exception_index: None,
            singlestep_enabled: false,
            breakpoints: Vec::new(),
            vl: 0,
            vtype: 0,
            vstart: 0,
            vsew: 8,
            vlmul: 0,
            vflmul: Lmul::UNIT,
            vlmax: 0,
            vill: false,
            vta: false,
            vma: false,
            vlenb,
            elen: ELEN,
            vreg: vec![0; VREG_COUNT * vlenb as usize],
        };
        state.reset();
        state
    }

    /// Reset the state, preserving `mhartid`, the privileged-architecture
    /// selector and the `misa` mask; the PC moves to the architectural start
    /// address and the hart comes up in machine mode.
    pub fn reset(&mut self) {
        let mhartid = self.mhartid;
        let privilege = self.privilege_architecture_1_10;
        let misa_mask = self.misa_mask;
        let vlenb = self.vlenb;
        let elen = self.elen;
        *self = Self {
            mhartid,
            privilege_architecture_1_10: privilege,
            misa_mask,
            vlenb,
            elen,
            gpr: [0; GPR_COUNT],
            fpr: [0; FPR_COUNT],
            pc: RISCV_START_PC,
            load_res: 0,
            mstatus: 0,
            mie: 0,
            mip: 0,
            mtvec: 0,
            mscratch: 0,
            mepc: 0,
            mcause: 0,
            mtval: 0,
            misa: misa_mask,
            medeleg: 0,
            mideleg: 0,
            stvec: 0,
            sscratch: 0,
            sepc: 0,
            scause: 0,
            stval: 0,
            privilege: Privilege::Machine,
            exception_index: None,
            singlestep_enabled: false,
            breakpoints: Vec::new(),
            vl: 0,
            vtype: 0,
            vstart: 0,
            vsew: 8,
            vlmul: 0,
            vflmul: Lmul::UNIT,
            vlmax: 0,
            vill: false,
            vta: false,
            vma: false,
            vreg: vec![0; VREG_COUNT * vlenb as usize],
        };
    }

    /// Whether the guest has an extension enabled in `misa`.
    pub fn has_ext(&self, ext: MisaExt) -> bool {
        self.misa & ext.bits() != 0
    }

    /// MMU index generated memory accesses run under.
    pub fn mmu_index(&self) -> u32 {
        self.privilege as u32
    }

    /// Whether a breakpoint is armed at the given address.
    pub fn breakpoint_at(&self, pc: GuestWord) -> bool {
        self.breakpoints.iter().any(|bp| bp.pc() == pc)
    }

    /// Byte view of vector register `idx`.
    pub fn v(&self, idx: u32) -> &[u8] {
        let len = self.vlenb as usize;
        &self.vreg[idx as usize * len..][..len]
    }

    /// Mutable byte view of vector register `idx`.
    pub fn v_mut(&mut self, idx: u32) -> &mut [u8] {
        let len = self.vlenb as usize;
        &mut self.vreg[idx as usize * len..][..len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_state() -> CpuState {
        CpuState::new(
            MisaExt::I | MisaExt::M | MisaExt::A | MisaExt::F | MisaExt::D | MisaExt::C,
            16,
        )
    }

    #[test]
    fn reset_preserves_hart_identity() {
        let mut state = default_state();
        state.mhartid = 3;
        state.gpr[5] = 0xdead;
        state.pc = 0x8000_0000;
        state.privilege = Privilege::User;
        state.reset();

        assert_eq!(state.mhartid, 3);
        assert_eq!(state.gpr[5], 0);
        assert_eq!(state.pc, RISCV_START_PC);
        assert_eq!(state.privilege, Privilege::Machine);
        assert_eq!(state.misa, state.misa_mask);
        assert_eq!(state.exception_index, None);
    }

    #[test]
    fn misa_gates_extensions() {
        let state = default_state();
        assert!(state.has_ext(MisaExt::C));
        assert!(!state.has_ext(MisaExt::V));
    }

    #[test]
    fn lmul_field_decodes_as_signed_power_of_two() {
        assert_eq!(Lmul::from_field(0), Lmul { num: 1, den: 1 });
        assert_eq!(Lmul::from_field(2), Lmul { num: 4, den: 1 });
        assert_eq!(Lmul::from_field(3), Lmul { num: 8, den: 1 });
        assert_eq!(Lmul::from_field(7), Lmul { num: 1, den: 2 });
        assert_eq!(Lmul::from_field(5), Lmul { num: 1, den: 8 });
        assert_eq!(Lmul::from_field(4), Lmul { num: 1, den: 16 });
    }
}
