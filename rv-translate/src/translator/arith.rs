//! Integer register-register and register-immediate translators.

use rv_asm::{opcode::*, Exception};

use super::{gen_get_gpr, gen_set_gpr, kill_unknown, DisasContext};
use crate::{
    consts::{GuestSword, GuestWord, TARGET_LONG_BITS},
    ir::{Cond, IrBuilder, Value},
};

/// `mulhsu`: unsigned high product, then subtract `rs2` where `rs1` was
/// negative (the one-negative fix-up).
fn gen_mulhsu(ir: &mut IrBuilder, ret: Value, arg1: Value, arg2: Value) {
    let rl = ir.new_temp();
    let rh = ir.new_temp();

    ir.mulu2(rl, rh, arg1, arg2);
    ir.sari(rl, arg1, TARGET_LONG_BITS - 1);
    ir.and(rl, rl, arg2);
    ir.sub(ret, rh, rl);

    ir.free(rl);
    ir.free(rh);
}

pub(super) fn gen_arith(
    ctx: &mut DisasContext,
    ir: &mut IrBuilder,
    opc: u32,
    rd: u32,
    rs1: u32,
    rs2: u32,
) {
    let source1 = ir.new_temp();
    let source2 = ir.new_temp();
    gen_get_gpr(ir, source1, rs1);
    gen_get_gpr(ir, source2, rs2);

    match opc {
        OPC_RISC_ADD | OPC_RISC_ADDW => {
            ir.add(source1, source1, source2);
        }
        OPC_RISC_SUB | OPC_RISC_SUBW => {
            ir.sub(source1, source1, source2);
        }
        OPC_RISC_SLLW => {
            ir.andi(source2, source2, 0x1f);
            ir.shl(source1, source1, source2);
        }
        OPC_RISC_SLL => {
            ir.andi(source2, source2, (TARGET_LONG_BITS - 1) as u64);
            ir.shl(source1, source1, source2);
        }
        OPC_RISC_SLT => {
            ir.setcond(Cond::Lt, source1, source1, source2);
        }
        OPC_RISC_SLTU => {
            ir.setcond(Cond::Ltu, source1, source1, source2);
        }
        OPC_RISC_XOR => {
            ir.xor(source1, source1, source2);
        }
        OPC_RISC_SRLW => {
            // clear upper 32 first so the logical shift sees a 32-bit value
            ir.ext32u(source1, source1);
            ir.andi(source2, source2, 0x1f);
            ir.shr(source1, source1, source2);
        }
        OPC_RISC_SRL => {
            ir.andi(source2, source2, (TARGET_LONG_BITS - 1) as u64);
            ir.shr(source1, source1, source2);
        }
        OPC_RISC_SRAW => {
            // sign-extend so the arithmetic shift acts on 32 bits
            ir.ext32s(source1, source1);
            ir.andi(source2, source2, 0x1f);
            ir.sar(source1, source1, source2);
        }
        OPC_RISC_SRA => {
            ir.andi(source2, source2, (TARGET_LONG_BITS - 1) as u64);
            ir.sar(source1, source1, source2);
        }
        OPC_RISC_OR => {
            ir.or(source1, source1, source2);
        }
        OPC_RISC_AND => {
            ir.and(source1, source1, source2);
        }
        OPC_RISC_MUL | OPC_RISC_MULW => {
            ir.mul(source1, source1, source2);
        }
        OPC_RISC_MULH => {
            ir.muls2(source2, source1, source1, source2);
        }
        OPC_RISC_MULHSU => {
            gen_mulhsu(ir, source1, source1, source2);
        }
        OPC_RISC_MULHU => {
            ir.mulu2(source2, source1, source1, source2);
        }
        OPC_RISC_DIV | OPC_RISC_DIVW => {
            if opc == OPC_RISC_DIVW {
                ir.ext32s(source1, source1);
                ir.ext32s(source2, source2);
            }
            // Substitute the operands so the plain division produces the
            // required results. Overflow wants the dividend untouched and a
            // divisor of 1; divide-by-zero wants a dividend of -1 and a
            // divisor of 1.
            let cond1 = ir.new_temp();
            let cond2 = ir.new_temp();
            let zeroreg = ir.const_word(0);
            let resultopt1 = ir.new_temp();

            ir.movi(resultopt1, GuestWord::MAX as u64);
            ir.setcondi(Cond::Eq, cond2, source2, GuestWord::MAX as u64);
            ir.setcondi(
                Cond::Eq,
                cond1,
                source1,
                ((1 as GuestWord) << (TARGET_LONG_BITS - 1)) as u64,
            );
            ir.and(cond1, cond1, cond2); // cond1 = overflow
            ir.setcondi(Cond::Eq, cond2, source2, 0); // cond2 = div by zero
            ir.movcond(Cond::Eq, source1, cond2, zeroreg, source1, resultopt1);
            ir.or(cond1, cond1, cond2);
            ir.movi(resultopt1, 1);
            ir.movcond(Cond::Eq, source2, cond1, zeroreg, source2, resultopt1);
            ir.div(source1, source1, source2);

            ir.free(cond1);
            ir.free(cond2);
            ir.free(zeroreg);
            ir.free(resultopt1);
        }
        OPC_RISC_DIVU | OPC_RISC_DIVUW => {
            if opc == OPC_RISC_DIVUW {
                ir.ext32u(source1, source1);
                ir.ext32u(source2, source2);
            }
            let cond1 = ir.new_temp();
            let zeroreg = ir.const_word(0);
            let resultopt1 = ir.new_temp();

            ir.setcondi(Cond::Eq, cond1, source2, 0);
            ir.movi(resultopt1, GuestWord::MAX as u64);
            ir.movcond(Cond::Eq, source1, cond1, zeroreg, source1, resultopt1);
            ir.movi(resultopt1, 1);
            ir.movcond(Cond::Eq, source2, cond1, zeroreg, source2, resultopt1);
            ir.divu(source1, source1, source2);

            ir.free(cond1);
            ir.free(zeroreg);
            ir.free(resultopt1);
        }
        OPC_RISC_REM | OPC_RISC_REMW => {
            if opc == OPC_RISC_REMW {
                ir.ext32s(source1, source1);
                ir.ext32s(source2, source2);
            }
            let cond1 = ir.new_temp();
            let cond2 = ir.new_temp();
            let zeroreg = ir.const_word(0);
            let resultopt1 = ir.new_temp();

            ir.movi(resultopt1, 1);
            ir.setcondi(Cond::Eq, cond2, source2, GuestWord::MAX as u64);
            ir.setcondi(
                Cond::Eq,
                cond1,
                source1,
                ((1 as GuestWord) << (TARGET_LONG_BITS - 1)) as u64,
            );
            ir.and(cond2, cond1, cond2); // cond2 = overflow
            ir.setcondi(Cond::Eq, cond1, source2, 0); // cond1 = div by zero
            ir.or(cond2, cond1, cond2);
            ir.movcond(Cond::Eq, source2, cond2, zeroreg, source2, resultopt1);
            ir.rem(resultopt1, source1, source2);
            // divide-by-zero keeps the original dividend
            ir.movcond(Cond::Eq, source1, cond1, zeroreg, resultopt1, source1);

            ir.free(cond1);
            ir.free(cond2);
            ir.free(zeroreg);
            ir.free(resultopt1);
        }
        OPC_RISC_REMU | OPC_RISC_REMUW => {
            if opc == OPC_RISC_REMUW {
                ir.ext32u(source1, source1);
                ir.ext32u(source2, source2);
            }
            let cond1 = ir.new_temp();
            let zeroreg = ir.const_word(0);
            let resultopt1 = ir.new_temp();

            ir.movi(resultopt1, 1);
            ir.setcondi(Cond::Eq, cond1, source2, 0);
            ir.movcond(Cond::Eq, source2, cond1, zeroreg, source2, resultopt1);
            ir.remu(resultopt1, source1, source2);
            // divide-by-zero keeps the original dividend
            ir.movcond(Cond::Eq, source1, cond1, zeroreg, resultopt1, source1);

            ir.free(cond1);
            ir.free(zeroreg);
            ir.free(resultopt1);
        }
        _ => {
            kill_unknown(ctx, ir, Exception::IllegalInst);
        }
    }

    if opc & 0x8 != 0 {
        // sign extend for W instructions
        ir.ext32s(source1, source1);
    }

    gen_set_gpr(ir, rd, source1);
    ir.free(source1);
    ir.free(source2);
}

pub(super) fn gen_arith_imm(
    ctx: &mut DisasContext,
    ir: &mut IrBuilder,
    opc: u32,
    rd: u32,
    rs1: u32,
    imm: GuestSword,
) {
    let source1 = ir.new_temp();
    gen_get_gpr(ir, source1, rs1);
    let mut extra_shamt = 0u32;

    match opc {
        OPC_RISC_ADDI | OPC_RISC_ADDIW => {
            ir.addi(source1, source1, imm as GuestWord as u64);
        }
        OPC_RISC_SLTI => {
            ir.setcondi(Cond::Lt, source1, source1, imm as GuestWord as u64);
        }
        OPC_RISC_SLTIU => {
            ir.setcondi(Cond::Ltu, source1, source1, imm as GuestWord as u64);
        }
        OPC_RISC_XORI => {
            ir.xori(source1, source1, imm as GuestWord as u64);
        }
        OPC_RISC_ORI => {
            ir.ori(source1, source1, imm as GuestWord as u64);
        }
        OPC_RISC_ANDI => {
            ir.andi(source1, source1, imm as GuestWord as u64);
        }
        OPC_RISC_SLLI | OPC_RISC_SLLIW => {
            if opc == OPC_RISC_SLLIW && imm >= 32 {
                kill_unknown(ctx, ir, Exception::IllegalInst);
            } else if (imm as u32) < TARGET_LONG_BITS {
                ir.shli(source1, source1, imm as u32);
            } else {
                kill_unknown(ctx, ir, Exception::IllegalInst);
            }
        }
        OPC_RISC_SHIFT_RIGHT_I | OPC_RISC_SHIFT_RIGHT_IW => {
            if opc == OPC_RISC_SHIFT_RIGHT_IW {
                if (imm & 0x3ff) >= 32 {
                    kill_unknown(ctx, ir, Exception::IllegalInst);
                }
                ir.shli(source1, source1, 32);
                extra_shamt = 32;
            }
            // the arithmetic variant is flagged by immediate bit 10
            if (imm & 0x3ff) < TARGET_LONG_BITS as GuestSword {
                if imm & 0x400 != 0 {
                    // SRAI[W]
                    ir.sari(source1, source1, ((imm ^ 0x400) as u32).wrapping_add(extra_shamt));
                } else {
                    // SRLI[W]
                    ir.shri(source1, source1, (imm as u32).wrapping_add(extra_shamt));
                }
            } else {
                kill_unknown(ctx, ir, Exception::IllegalInst);
            }
        }
        _ => {
            kill_unknown(ctx, ir, Exception::IllegalInst);
        }
    }

    if opc & 0x8 != 0 {
        // sign extend for W instructions
        ir.ext32s(source1, source1);
    }

    gen_set_gpr(ir, rd, source1);
    ir.free(source1);
}
