//! Integer and floating-point load/store translators.

use rv_asm::{opcode::*, Exception};

use super::{fp::FsGate, gen_get_gpr, gen_set_gpr, kill_unknown, DisasContext};
use crate::{
    consts::{GuestSword, GuestWord},
    ir::{IrBuilder, LoadKind, StoreKind, Value},
};

pub(super) fn gen_load(
    ctx: &mut DisasContext,
    ir: &mut IrBuilder,
    opc: u32,
    rd: u32,
    rs1: u32,
    imm: GuestSword,
) {
    let t0 = ir.new_temp();
    let t1 = ir.new_temp();

    gen_get_gpr(ir, t0, rs1);
    ir.addi(t0, t0, imm as GuestWord as u64);

    // publish the PC so a memory trap reports this instruction
    ir.movi(Value::PC, ctx.pc as u64);
    match opc {
        OPC_RISC_LB => ir.load(LoadKind::Ld8S, t1, t0, ctx.mem_idx),
        OPC_RISC_LH => ir.load(LoadKind::Ld16S, t1, t0, ctx.mem_idx),
        OPC_RISC_LW => ir.load(LoadKind::Ld32S, t1, t0, ctx.mem_idx),
        #[cfg(feature = "rv64")]
        OPC_RISC_LD => ir.load(LoadKind::Ld64, t1, t0, ctx.mem_idx),
        OPC_RISC_LBU => ir.load(LoadKind::Ld8U, t1, t0, ctx.mem_idx),
        OPC_RISC_LHU => ir.load(LoadKind::Ld16U, t1, t0, ctx.mem_idx),
        #[cfg(feature = "rv64")]
        OPC_RISC_LWU => ir.load(LoadKind::Ld32U, t1, t0, ctx.mem_idx),
        _ => {
            kill_unknown(ctx, ir, Exception::IllegalInst);
        }
    }

    gen_set_gpr(ir, rd, t1);
    ir.free(t0);
    ir.free(t1);
}

pub(super) fn gen_store(
    ctx: &mut DisasContext,
    ir: &mut IrBuilder,
    opc: u32,
    rs1: u32,
    rs2: u32,
    imm: GuestSword,
) {
    ir.movi(Value::PC, ctx.pc as u64);

    let t0 = ir.new_temp();
    let dat = ir.new_temp();
    gen_get_gpr(ir, t0, rs1);
    ir.addi(t0, t0, imm as GuestWord as u64);
    gen_get_gpr(ir, dat, rs2);

    match opc {
        OPC_RISC_SB => ir.store(StoreKind::St8, dat, t0, ctx.mem_idx),
        OPC_RISC_SH => ir.store(StoreKind::St16, dat, t0, ctx.mem_idx),
        OPC_RISC_SW => ir.store(StoreKind::St32, dat, t0, ctx.mem_idx),
        #[cfg(feature = "rv64")]
        OPC_RISC_SD => ir.store(StoreKind::St64, dat, t0, ctx.mem_idx),
        _ => {
            kill_unknown(ctx, ir, Exception::IllegalInst);
        }
    }

    ir.free(t0);
    ir.free(dat);
}

pub(super) fn gen_fp_load(
    ctx: &mut DisasContext,
    ir: &mut IrBuilder,
    opc: u32,
    rd: u32,
    rs1: u32,
    imm: GuestSword,
) {
    let gate = FsGate::open(ctx, ir);
    let t0 = ir.new_temp();

    gen_get_gpr(ir, t0, rs1);
    ir.addi(t0, t0, imm as GuestWord as u64);
    ir.movi(Value::PC, ctx.pc as u64);

    match opc {
        OPC_RISC_FLW => ir.load(LoadKind::Ld32U, Value::fpr(rd), t0, ctx.mem_idx),
        OPC_RISC_FLD => ir.load(LoadKind::Ld64, Value::fpr(rd), t0, ctx.mem_idx),
        _ => {
            kill_unknown(ctx, ir, Exception::IllegalInst);
        }
    }

    ir.free(t0);
    gate.close(ir);
}

pub(super) fn gen_fp_store(
    ctx: &mut DisasContext,
    ir: &mut IrBuilder,
    opc: u32,
    rs1: u32,
    rs2: u32,
    imm: GuestSword,
) {
    let gate = FsGate::open(ctx, ir);
    let t0 = ir.new_temp();

    gen_get_gpr(ir, t0, rs1);
    ir.addi(t0, t0, imm as GuestWord as u64);
    ir.movi(Value::PC, ctx.pc as u64);

    match opc {
        OPC_RISC_FSW => ir.store(StoreKind::St32, Value::fpr(rs2), t0, ctx.mem_idx),
        OPC_RISC_FSD => ir.store(StoreKind::St64, Value::fpr(rs2), t0, ctx.mem_idx),
        _ => {
            kill_unknown(ctx, ir, Exception::IllegalInst);
        }
    }

    ir.free(t0);
    gate.close(ir);
}
