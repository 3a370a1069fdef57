//! A-extension translator.
//!
//! The sequences are emitted *as if uncontended*: LR is a plain load, SC
//! always succeeds with 0, and the AMOs are load-op-store. The embedding
//! runtime must serialise guest execution across them (single-threaded
//! guest, or barriers outside this core) for these to be correct.

use rv_asm::{opcode::*, Exception};

use super::{gen_get_gpr, gen_set_gpr, kill_unknown, DisasContext};
use crate::ir::{Cond, IrBuilder, LoadKind, StoreKind};

pub(super) fn gen_atomic(
    ctx: &mut DisasContext,
    ir: &mut IrBuilder,
    opc: u32,
    rd: u32,
    rs1: u32,
    rs2: u32,
) {
    // ordering bits are not modelled
    let opc = mask_op_atomic_no_aq_rl(opc);

    // locals: the min/max forms branch over their store, and the values
    // must survive that label
    let source1 = ir.new_local();
    let source2 = ir.new_local();
    let dat = ir.new_local();
    let done = ir.new_label();
    gen_get_gpr(ir, source1, rs1);
    gen_get_gpr(ir, source2, rs2);

    match opc {
        OPC_RISC_LR_W => {
            ir.load(LoadKind::Ld32S, dat, source1, ctx.mem_idx);
        }
        OPC_RISC_SC_W => {
            ir.store(StoreKind::St32, source2, source1, ctx.mem_idx);
            ir.movi(dat, 0); // assume always success
        }
        OPC_RISC_AMOSWAP_W => {
            ir.load(LoadKind::Ld32S, dat, source1, ctx.mem_idx);
            ir.store(StoreKind::St32, source2, source1, ctx.mem_idx);
            ir.mov(source1, dat);
        }
        OPC_RISC_AMOADD_W => {
            ir.load(LoadKind::Ld32S, dat, source1, ctx.mem_idx);
            ir.add(source2, dat, source2);
            ir.store(StoreKind::St32, source2, source1, ctx.mem_idx);
            ir.mov(source1, dat);
        }
        OPC_RISC_AMOXOR_W => {
            ir.load(LoadKind::Ld32S, dat, source1, ctx.mem_idx);
            ir.xor(source2, dat, source2);
            ir.store(StoreKind::St32, source2, source1, ctx.mem_idx);
            ir.mov(source1, dat);
        }
        OPC_RISC_AMOAND_W => {
            ir.load(LoadKind::Ld32S, dat, source1, ctx.mem_idx);
            ir.and(source2, dat, source2);
            ir.store(StoreKind::St32, source2, source1, ctx.mem_idx);
            ir.mov(source1, dat);
        }
        OPC_RISC_AMOOR_W => {
            ir.load(LoadKind::Ld32S, dat, source1, ctx.mem_idx);
            ir.or(source2, dat, source2);
            ir.store(StoreKind::St32, source2, source1, ctx.mem_idx);
            ir.mov(source1, dat);
        }
        OPC_RISC_AMOMIN_W => {
            ir.load(LoadKind::Ld32S, dat, source1, ctx.mem_idx);
            ir.brcond(Cond::Lt, dat, source2, done);
            ir.store(StoreKind::St32, source2, source1, ctx.mem_idx);
        }
        OPC_RISC_AMOMAX_W => {
            ir.load(LoadKind::Ld32S, dat, source1, ctx.mem_idx);
            ir.brcond(Cond::Gt, dat, source2, done);
            ir.store(StoreKind::St32, source2, source1, ctx.mem_idx);
        }
        OPC_RISC_AMOMINU_W => {
            ir.load(LoadKind::Ld32S, dat, source1, ctx.mem_idx);
            ir.brcond(Cond::Ltu, dat, source2, done);
            ir.store(StoreKind::St32, source2, source1, ctx.mem_idx);
        }
        OPC_RISC_AMOMAXU_W => {
            ir.load(LoadKind::Ld32S, dat, source1, ctx.mem_idx);
            ir.brcond(Cond::Gtu, dat, source2, done);
            ir.store(StoreKind::St32, source2, source1, ctx.mem_idx);
        }
        #[cfg(feature = "rv64")]
        OPC_RISC_LR_D => {
            ir.load(LoadKind::Ld64, dat, source1, ctx.mem_idx);
        }
        #[cfg(feature = "rv64")]
        OPC_RISC_SC_D => {
            ir.store(StoreKind::St64, source2, source1, ctx.mem_idx);
            ir.movi(dat, 0); // assume always success
        }
        #[cfg(feature = "rv64")]
        OPC_RISC_AMOSWAP_D => {
            ir.load(LoadKind::Ld64, dat, source1, ctx.mem_idx);
            ir.store(StoreKind::St64, source2, source1, ctx.mem_idx);
            ir.mov(source1, dat);
        }
        #[cfg(feature = "rv64")]
        OPC_RISC_AMOADD_D => {
            ir.load(LoadKind::Ld64, dat, source1, ctx.mem_idx);
            ir.add(source2, dat, source2);
            ir.store(StoreKind::St64, source2, source1, ctx.mem_idx);
            ir.mov(source1, dat);
        }
        #[cfg(feature = "rv64")]
        OPC_RISC_AMOXOR_D => {
            ir.load(LoadKind::Ld64, dat, source1, ctx.mem_idx);
            ir.xor(source2, dat, source2);
            ir.store(StoreKind::St64, source2, source1, ctx.mem_idx);
            ir.mov(source1, dat);
        }
        #[cfg(feature = "rv64")]
        OPC_RISC_AMOAND_D => {
            ir.load(LoadKind::Ld64, dat, source1, ctx.mem_idx);
            ir.and(source2, dat, source2);
            ir.store(StoreKind::St64, source2, source1, ctx.mem_idx);
            ir.mov(source1, dat);
        }
        #[cfg(feature = "rv64")]
        OPC_RISC_AMOOR_D => {
            ir.load(LoadKind::Ld64, dat, source1, ctx.mem_idx);
            ir.or(source2, dat, source2);
            ir.store(StoreKind::St64, source2, source1, ctx.mem_idx);
            ir.mov(source1, dat);
        }
        #[cfg(feature = "rv64")]
        OPC_RISC_AMOMIN_D => {
            ir.load(LoadKind::Ld64, dat, source1, ctx.mem_idx);
            ir.brcond(Cond::Lt, dat, source2, done);
            ir.store(StoreKind::St64, source2, source1, ctx.mem_idx);
        }
        #[cfg(feature = "rv64")]
        OPC_RISC_AMOMAX_D => {
            ir.load(LoadKind::Ld64, dat, source1, ctx.mem_idx);
            ir.brcond(Cond::Gt, dat, source2, done);
            ir.store(StoreKind::St64, source2, source1, ctx.mem_idx);
        }
        #[cfg(feature = "rv64")]
        OPC_RISC_AMOMINU_D => {
            ir.load(LoadKind::Ld64, dat, source1, ctx.mem_idx);
            ir.brcond(Cond::Ltu, dat, source2, done);
            ir.store(StoreKind::St64, source2, source1, ctx.mem_idx);
        }
        #[cfg(feature = "rv64")]
        OPC_RISC_AMOMAXU_D => {
            ir.load(LoadKind::Ld64, dat, source1, ctx.mem_idx);
            ir.brcond(Cond::Gtu, dat, source2, done);
            ir.store(StoreKind::St64, source2, source1, ctx.mem_idx);
        }
        _ => {
            kill_unknown(ctx, ir, Exception::IllegalInst);
        }
    }
    ir.set_label(done);
    gen_set_gpr(ir, rd, dat);
    ir.free(source1);
    ir.free(source2);
    ir.free(dat);
}
