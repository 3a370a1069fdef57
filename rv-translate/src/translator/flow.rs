//! Jump and branch translators.

use rv_asm::{opcode::*, Exception};

use super::{
    gen_get_gpr, gen_goto_tb, generate_exception_badaddr, kill_unknown, BlockState, DisasContext,
};
use crate::{
    consts::{GuestSword, GuestWord},
    ir::{Cond, IrBuilder, Value},
    state::{CpuState, MisaExt},
};

pub(super) fn gen_jal(
    env: &CpuState,
    ctx: &mut DisasContext,
    ir: &mut IrBuilder,
    rd: u32,
    imm: GuestSword,
) {
    let next_pc = ctx.pc.wrapping_add(imm as GuestWord);

    // the jump target is a translation-time constant, so the misalignment
    // check is too
    if !env.has_ext(MisaExt::C) && next_pc & 0x3 != 0 {
        let badaddr = ir.const_word(next_pc as u64);
        generate_exception_badaddr(ctx, ir, Exception::InstAddrMisaligned, badaddr);
        ir.free(badaddr);
    }
    if rd != 0 {
        ir.movi(Value::gpr(rd), ctx.next_pc as u64);
    }

    gen_goto_tb(ctx, ir, 0, next_pc);
    ctx.bstate = BlockState::Branch;
}

pub(super) fn gen_jalr(
    env: &CpuState,
    ctx: &mut DisasContext,
    ir: &mut IrBuilder,
    opc: u32,
    rd: u32,
    rs1: u32,
    imm: GuestSword,
) {
    // no chaining with JALR; the target is a runtime value
    let misaligned = ir.new_label();
    let t0 = ir.new_temp();

    match opc {
        OPC_RISC_JALR => {
            gen_get_gpr(ir, Value::PC, rs1);
            ir.addi(Value::PC, Value::PC, imm as GuestWord as u64);
            ir.andi(Value::PC, Value::PC, (-2 as GuestSword) as GuestWord as u64);

            if !env.has_ext(MisaExt::C) {
                ir.andi(t0, Value::PC, 0x2);
                ir.brcondi(Cond::Ne, t0, 0, misaligned);
            }

            if rd != 0 {
                ir.movi(Value::gpr(rd), ctx.next_pc as u64);
            }
            ir.exit_tb(None);

            ir.set_label(misaligned);
            let badaddr = ir.new_temp();
            ir.mov(badaddr, Value::PC);
            generate_exception_badaddr(ctx, ir, Exception::InstAddrMisaligned, badaddr);
            ir.free(badaddr);
            ir.exit_tb(None);
            ctx.bstate = BlockState::Branch;
        }
        _ => {
            kill_unknown(ctx, ir, Exception::IllegalInst);
        }
    }
    ir.free(t0);
}

pub(super) fn gen_branch(
    env: &CpuState,
    ctx: &mut DisasContext,
    ir: &mut IrBuilder,
    opc: u32,
    rs1: u32,
    rs2: u32,
    bimm: GuestSword,
) {
    let taken = ir.new_label();
    let source1 = ir.new_temp();
    let source2 = ir.new_temp();
    gen_get_gpr(ir, source1, rs1);
    gen_get_gpr(ir, source2, rs2);

    match opc {
        OPC_RISC_BEQ => ir.brcond(Cond::Eq, source1, source2, taken),
        OPC_RISC_BNE => ir.brcond(Cond::Ne, source1, source2, taken),
        OPC_RISC_BLT => ir.brcond(Cond::Lt, source1, source2, taken),
        OPC_RISC_BGE => ir.brcond(Cond::Ge, source1, source2, taken),
        OPC_RISC_BLTU => ir.brcond(Cond::Ltu, source1, source2, taken),
        OPC_RISC_BGEU => ir.brcond(Cond::Geu, source1, source2, taken),
        _ => {
            kill_unknown(ctx, ir, Exception::IllegalInst);
        }
    }

    gen_goto_tb(ctx, ir, 1, ctx.next_pc);
    ir.set_label(taken);
    let target = ctx.pc.wrapping_add(bimm as GuestWord);
    if !env.has_ext(MisaExt::C) && target & 0x3 != 0 {
        // misaligned
        let badaddr = ir.const_word(target as u64);
        generate_exception_badaddr(ctx, ir, Exception::InstAddrMisaligned, badaddr);
        ir.free(badaddr);
        ir.exit_tb(None);
    } else {
        gen_goto_tb(ctx, ir, 0, target);
    }
    ir.free(source1);
    ir.free(source2);
    ctx.bstate = BlockState::Branch;
}
