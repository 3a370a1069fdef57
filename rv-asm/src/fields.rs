//! Bit-field extraction and instruction field accessors.

/// Extract the unsigned bit-field `[start, start + length)` from `value`.
pub const fn extract32(value: u32, start: u32, length: u32) -> u32 {
    (value >> start) & ((1u32 << length) - 1)
}

/// Extract a bit-field from `value` and sign-extend it from its top bit.
pub const fn sextract32(value: u32, start: u32, length: u32) -> i32 {
    let field = extract32(value, start, length);
    if field >> (length - 1) != 0 {
        (field | !((1u32 << length) - 1)) as i32
    } else {
        field as i32
    }
}

/// 64-bit variant of [`sextract32`].
pub const fn sextract64(value: u64, start: u32, length: u32) -> i64 {
    let field = (value >> start) & ((1u64 << length) - 1);
    if field >> (length - 1) != 0 {
        (field | !((1u64 << length) - 1)) as i64
    } else {
        field as i64
    }
}

/// A raw, undecoded guest opcode word.
///
/// A 32-bit instruction occupies the full word; a compressed instruction
/// only the low 16 bits. The accessors are purely syntactic: they extract
/// and descramble fields without judging whether the encoding is legal.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawInsn(u32);

impl RawInsn {
    /// Size of a standard instruction in bytes.
    pub const LEN: u64 = 4;

    /// Size of a compressed instruction in bytes.
    pub const C_LEN: u64 = 2;

    /// Wrap a raw opcode word.
    pub const fn new(word: u32) -> Self {
        Self(word)
    }

    /// The raw opcode word.
    pub const fn word(self) -> u32 {
        self.0
    }

    /// Destination register index.
    pub const fn rd(self) -> u32 {
        extract32(self.0, 7, 5)
    }

    /// First source register index.
    pub const fn rs1(self) -> u32 {
        extract32(self.0, 15, 5)
    }

    /// Second source register index.
    pub const fn rs2(self) -> u32 {
        extract32(self.0, 20, 5)
    }

    /// Third source register index (fused multiply-add forms).
    pub const fn rs3(self) -> u32 {
        extract32(self.0, 27, 5)
    }

    /// Rounding mode field of a floating-point instruction.
    pub const fn rm(self) -> u32 {
        extract32(self.0, 12, 3)
    }

    /// The 12-bit CSR address field.
    pub const fn csr(self) -> u32 {
        self.0 >> 20
    }

    /// I-form immediate, sign-extended.
    pub const fn imm_i(self) -> i64 {
        sextract64(self.0 as u64, 20, 12)
    }

    /// S-form (store) immediate, sign-extended.
    pub const fn imm_s(self) -> i64 {
        extract32(self.0, 7, 5) as i64 | (sextract64(self.0 as u64, 25, 7) << 5)
    }

    /// B-form (branch) immediate, sign-extended. Always even.
    pub const fn imm_b(self) -> i64 {
        ((extract32(self.0, 8, 4) << 1)
            | (extract32(self.0, 25, 6) << 5)
            | (extract32(self.0, 7, 1) << 11)) as i64
            | (sextract64(self.0 as u64, 31, 1) << 12)
    }

    /// U-form immediate: the raw 20-bit field, sign-extended but not shifted.
    pub const fn imm_u(self) -> i64 {
        sextract64(self.0 as u64, 12, 20)
    }

    /// J-form (jump) immediate, sign-extended. Always even.
    pub const fn imm_j(self) -> i64 {
        ((extract32(self.0, 21, 10) << 1)
            | (extract32(self.0, 20, 1) << 11)
            | (extract32(self.0, 12, 8) << 12)) as i64
            | (sextract64(self.0 as u64, 31, 1) << 20)
    }
}

/// Compressed-encoding accessors.
///
/// Register fields named `*s` address the popular-register window
/// `x8..x15`; the immediates implement the per-form bit scrambles of the C
/// extension.
impl RawInsn {
    /// Quadrant of a compressed instruction (`op[1:0]`, never 3).
    pub const fn c_quadrant(self) -> u32 {
        extract32(self.0, 0, 2)
    }

    /// `funct3` of a compressed instruction.
    pub const fn c_funct3(self) -> u32 {
        extract32(self.0, 13, 3)
    }

    /// Full-width `rd`/`rs1` field of a compressed instruction.
    pub const fn c_rs1(self) -> u32 {
        extract32(self.0, 7, 5)
    }

    /// Full-width `rs2` field of a compressed instruction.
    pub const fn c_rs2(self) -> u32 {
        extract32(self.0, 2, 5)
    }

    /// Popular-window `rd'`/`rs1'` field, rebased to `x8`.
    pub const fn c_rs1s(self) -> u32 {
        8 + extract32(self.0, 7, 3)
    }

    /// Popular-window `rd'`/`rs2'` field, rebased to `x8`.
    pub const fn c_rs2s(self) -> u32 {
        8 + extract32(self.0, 2, 3)
    }

    /// CI-form immediate, sign-extended (`imm[5]` at bit 12).
    pub const fn c_imm(self) -> i64 {
        extract32(self.0, 2, 5) as i64 | (sextract64(self.0 as u64, 12, 1) << 5)
    }

    /// CI-form immediate, zero-extended (shift amounts).
    pub const fn c_zimm(self) -> i64 {
        (extract32(self.0, 2, 5) | (extract32(self.0, 12, 1) << 5)) as i64
    }

    /// `C.ADDI4SPN` immediate: `zimm[9:2]`, zero-extended.
    pub const fn c_addi4spn_imm(self) -> i64 {
        ((extract32(self.0, 6, 1) << 2)
            | (extract32(self.0, 5, 1) << 3)
            | (extract32(self.0, 11, 2) << 4)
            | (extract32(self.0, 7, 4) << 6)) as i64
    }

    /// `C.ADDI16SP` immediate: `nzimm[9:4]`, sign-extended.
    pub const fn c_addi16sp_imm(self) -> i64 {
        ((extract32(self.0, 6, 1) << 4)
            | (extract32(self.0, 2, 1) << 5)
            | (extract32(self.0, 5, 1) << 6)
            | (extract32(self.0, 3, 2) << 7)) as i64
            | (sextract64(self.0 as u64, 12, 1) << 9)
    }

    /// CL/CS-form word offset: `offset[6:2]`, zero-extended.
    pub const fn c_lw_imm(self) -> i64 {
        ((extract32(self.0, 6, 1) << 2)
            | (extract32(self.0, 10, 3) << 3)
            | (extract32(self.0, 5, 1) << 6)) as i64
    }

    /// CL/CS-form doubleword offset: `offset[7:3]`, zero-extended.
    pub const fn c_ld_imm(self) -> i64 {
        ((extract32(self.0, 10, 3) << 3) | (extract32(self.0, 5, 2) << 6)) as i64
    }

    /// CJ-form jump offset, sign-extended. Always even.
    pub const fn c_j_imm(self) -> i64 {
        ((extract32(self.0, 3, 3) << 1)
            | (extract32(self.0, 11, 1) << 4)
            | (extract32(self.0, 2, 1) << 5)
            | (extract32(self.0, 7, 1) << 6)
            | (extract32(self.0, 6, 1) << 7)
            | (extract32(self.0, 9, 2) << 8)
            | (extract32(self.0, 8, 1) << 10)) as i64
            | (sextract64(self.0 as u64, 12, 1) << 11)
    }

    /// CB-form branch offset, sign-extended. Always even.
    pub const fn c_b_imm(self) -> i64 {
        ((extract32(self.0, 3, 2) << 1)
            | (extract32(self.0, 10, 2) << 3)
            | (extract32(self.0, 2, 1) << 5)
            | (extract32(self.0, 5, 2) << 6)) as i64
            | (sextract64(self.0 as u64, 12, 1) << 8)
    }

    /// `C.LWSP` offset: `offset[7:2]`, zero-extended.
    pub const fn c_lwsp_imm(self) -> i64 {
        ((extract32(self.0, 4, 3) << 2)
            | (extract32(self.0, 12, 1) << 5)
            | (extract32(self.0, 2, 2) << 6)) as i64
    }

    /// `C.LDSP` offset: `offset[8:3]`, zero-extended.
    pub const fn c_ldsp_imm(self) -> i64 {
        ((extract32(self.0, 5, 2) << 3)
            | (extract32(self.0, 12, 1) << 5)
            | (extract32(self.0, 2, 3) << 6)) as i64
    }

    /// `C.SWSP` offset: `offset[7:2]`, zero-extended.
    pub const fn c_swsp_imm(self) -> i64 {
        ((extract32(self.0, 9, 4) << 2) | (extract32(self.0, 7, 2) << 6)) as i64
    }

    /// `C.SDSP` offset: `offset[8:3]`, zero-extended.
    pub const fn c_sdsp_imm(self) -> i64 {
        ((extract32(self.0, 10, 3) << 3) | (extract32(self.0, 7, 3) << 6)) as i64
    }
}

impl From<u32> for RawInsn {
    fn from(word: u32) -> Self {
        Self::new(word)
    }
}

impl From<RawInsn> for u32 {
    fn from(insn: RawInsn) -> u32 {
        insn.word()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_masks_and_shifts() {
        assert_eq!(extract32(0xdead_beef, 0, 8), 0xef);
        assert_eq!(extract32(0xdead_beef, 8, 8), 0xbe);
        assert_eq!(extract32(0xdead_beef, 16, 16), 0xdead);
        assert_eq!(extract32(u32::MAX, 0, 1), 1);
    }

    #[test]
    fn sign_extraction_replicates_the_top_bit() {
        assert_eq!(sextract64(0x800, 0, 12), -2048);
        assert_eq!(sextract64(0x7ff, 0, 12), 2047);
        assert_eq!(sextract32(0xfff0_0000, 20, 12), -1);
    }

    #[test]
    fn standard_fields() {
        // add x10, x10, x11
        let insn = RawInsn::new(0x00b5_0533);
        assert_eq!(insn.rd(), 10);
        assert_eq!(insn.rs1(), 10);
        assert_eq!(insn.rs2(), 11);

        // csrrw x5, mscratch, x6
        let insn = RawInsn::new(0x3403_12f3);
        assert_eq!(insn.csr(), 0x340);
        assert_eq!(insn.rd(), 5);
        assert_eq!(insn.rs1(), 6);
    }

    #[test]
    fn i_and_s_immediates() {
        // addi x1, x2, -1
        assert_eq!(RawInsn::new(0xfff1_0093).imm_i(), -1);
        // sd x11, 8(x10)
        assert_eq!(RawInsn::new(0x00b5_3423).imm_s(), 8);
        // sb x11, -1(x10)
        assert_eq!(RawInsn::new(0xfeb5_0fa3).imm_s(), -1);
    }

    #[test]
    fn branch_and_jump_immediates() {
        // beq x10, x11, +16
        assert_eq!(RawInsn::new(0x00b5_0863).imm_b(), 16);
        // bne x10, x11, -4
        assert_eq!(RawInsn::new(0xfeb5_1ee3).imm_b(), -4);
        // jal x1, +8
        assert_eq!(RawInsn::new(0x0080_00ef).imm_j(), 8);
        // jal x0, -16
        assert_eq!(RawInsn::new(0xff1f_f06f).imm_j(), -16);
    }

    #[test]
    fn compressed_register_windows() {
        // c.add x10, x11 (funct4=1001, rd=10, rs2=11)
        let insn = RawInsn::new(0x952e);
        assert_eq!(insn.c_rs1(), 10);
        assert_eq!(insn.c_rs2(), 11);

        // c.sub x8, x9 (rd'=0 -> x8, rs2'=1 -> x9)
        let insn = RawInsn::new(0x8c05);
        assert_eq!(insn.c_rs1s(), 8);
        assert_eq!(insn.c_rs2s(), 9);
    }

    #[test]
    fn compressed_immediates() {
        // c.addi x10, -1: imm[5]=1 bits[6:2]=0b11111
        assert_eq!(RawInsn::new(0x157d).c_imm(), -1);
        // c.addi4spn x8, 16: zimm[9:2]=4 -> bits 7..10 carry [9:6]=0, [5:4]=01
        assert_eq!(RawInsn::new(0x0800).c_addi4spn_imm(), 16);
        // c.lw x9, 4(x8): offset[6:2] = 4
        assert_eq!(RawInsn::new(0x4044).c_lw_imm(), 4);
        // c.ld x9, 8(x8)
        assert_eq!(RawInsn::new(0x6404).c_ld_imm(), 8);
        // c.j -2: offset[11:1] all-ones pattern
        assert_eq!(RawInsn::new(0xbffd).c_j_imm(), -2);
        // c.beqz x8, +8
        assert_eq!(RawInsn::new(0xc401).c_b_imm(), 8);
    }
}
