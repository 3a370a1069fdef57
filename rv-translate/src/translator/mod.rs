//! Per-family instruction translators and the decode dispatcher.
//!
//! Each `gen_*` function consumes one decoded instruction and appends the
//! micro-ops that reproduce it. Guest faults never unwind the translator:
//! they are emitted as IR that raises the exception at guest-execution
//! time, and translation carries on according to the block state.

mod arith;
mod atomic;
mod compressed;
mod flow;
mod fp;
mod mem;
mod system;
mod vector;

use rv_asm::{opcode::*, Exception, RawInsn};

use crate::{
    consts::{GuestSword, GuestWord, TARGET_PAGE_MASK},
    ir::{Helper, IrBuilder, Value},
    state::{CpuState, MisaExt},
};

/// Why the block stopped growing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockState {
    /// Still translating; outside the loop this means the block ran into a
    /// page boundary and must exit unchained.
    None,
    /// A translator requested a stop (trap, CSR write, budget); the block
    /// continues at the next PC and may chain.
    Stop,
    /// A control-flow translator emitted its own exit sequence.
    Branch,
}

/// Transient per-translation state; lives for one block.
#[derive(Debug)]
pub(crate) struct DisasContext {
    /// Entry PC of the block; chaining is only legal within its page.
    pub tb_pc: GuestWord,
    /// Address of the instruction being translated.
    pub pc: GuestWord,
    /// Address of the following instruction.
    pub next_pc: GuestWord,
    /// Raw opcode word.
    pub opcode: u32,
    /// Debugger single-step flag, latched at block entry.
    pub singlestep_enabled: bool,
    /// MMU index memory accesses run under.
    pub mem_idx: u32,
    /// Block-ending state.
    pub bstate: BlockState,
}

impl DisasContext {
    pub(crate) fn insn(&self) -> RawInsn {
        RawInsn::new(self.opcode)
    }
}

/// Read guest register `reg` into `t`; `x0` reads as constant zero.
pub(crate) fn gen_get_gpr(ir: &mut IrBuilder, t: Value, reg: u32) {
    if reg == 0 {
        ir.movi(t, 0);
    } else {
        ir.mov(t, Value::gpr(reg));
    }
}

/// Write `t` to guest register `rd`; writes to `x0` are discarded.
pub(crate) fn gen_set_gpr(ir: &mut IrBuilder, rd: u32, t: Value) {
    if rd != 0 {
        ir.mov(Value::gpr(rd), t);
    }
}

/// Emit IR raising `excp` with this instruction's address as the faulting
/// PC.
pub(crate) fn generate_exception(ctx: &DisasContext, ir: &mut IrBuilder, excp: Exception) {
    ir.movi(Value::PC, ctx.pc as u64);
    let code = ir.const_word(excp.code() as u64);
    ir.call(Helper::RaiseException, None, &[code]);
    ir.free(code);
}

/// Emit IR raising `excp` carrying a bad-address value (`mtval`).
pub(crate) fn generate_exception_badaddr(
    ctx: &DisasContext,
    ir: &mut IrBuilder,
    excp: Exception,
    badaddr: Value,
) {
    ir.movi(Value::PC, ctx.pc as u64);
    let code = ir.const_word(excp.code() as u64);
    ir.call(Helper::RaiseExceptionBadaddr, None, &[code, badaddr]);
    ir.free(code);
}

/// Unknown or rejected instruction: raise and stop the block.
pub(crate) fn kill_unknown(ctx: &mut DisasContext, ir: &mut IrBuilder, excp: Exception) {
    generate_exception(ctx, ir, excp);
    ctx.bstate = BlockState::Stop;
}

/// Whether a direct chain to `dest` is legal: same guest page as the block
/// entry and single-step off.
pub(crate) fn use_goto_tb(ctx: &DisasContext, dest: GuestWord) -> bool {
    if ctx.singlestep_enabled {
        return false;
    }
    (ctx.tb_pc & TARGET_PAGE_MASK) == (dest & TARGET_PAGE_MASK)
}

/// Terminate towards `dest`, chained through slot `n` when legal.
pub(crate) fn gen_goto_tb(ctx: &DisasContext, ir: &mut IrBuilder, n: u8, dest: GuestWord) {
    if use_goto_tb(ctx, dest) {
        // chaining is only allowed when the jump stays on the entry page
        ir.goto_tb(n);
        ir.movi(Value::PC, dest as u64);
        ir.exit_tb(Some(n));
    } else {
        ir.movi(Value::PC, dest as u64);
        if ctx.singlestep_enabled {
            ir.call(Helper::RaiseExceptionDebug, None, &[]);
        }
        ir.exit_tb(None);
    }
}

fn decode_rv32_64g(env: &CpuState, ctx: &mut DisasContext, ir: &mut IrBuilder) {
    // Misaligned fetches cannot happen here: every instruction that sets the
    // PC checks the target itself, since epc must point at the faulting
    // jump, not at the fetch.
    let insn = ctx.insn();
    let opcode = ctx.opcode;
    let op = mask_op_major(opcode);
    let rd = insn.rd();
    let rs1 = insn.rs1();
    let rs2 = insn.rs2();
    let imm = insn.imm_i() as GuestSword;

    tracing::trace!(pc = ctx.pc as u64, opcode, "decode");

    match op {
        OPC_RISC_LUI => {
            if rd == 0 {
                return; // NOP
            }
            ir.movi(Value::gpr(rd), ((insn.imm_u() << 12) as GuestSword) as u64);
        }
        OPC_RISC_AUIPC => {
            if rd == 0 {
                return; // NOP
            }
            let value = (((insn.imm_u() << 12) as GuestSword) as GuestWord).wrapping_add(ctx.pc);
            ir.movi(Value::gpr(rd), value as u64);
        }
        OPC_RISC_JAL => flow::gen_jal(env, ctx, ir, rd, insn.imm_j() as GuestSword),
        OPC_RISC_JALR_MAJOR => {
            flow::gen_jalr(env, ctx, ir, mask_op_jalr(opcode), rd, rs1, imm)
        }
        OPC_RISC_BRANCH => flow::gen_branch(
            env,
            ctx,
            ir,
            mask_op_branch(opcode),
            rs1,
            rs2,
            insn.imm_b() as GuestSword,
        ),
        OPC_RISC_LOAD => mem::gen_load(ctx, ir, mask_op_load(opcode), rd, rs1, imm),
        OPC_RISC_STORE => mem::gen_store(
            ctx,
            ir,
            mask_op_store(opcode),
            rs1,
            rs2,
            insn.imm_s() as GuestSword,
        ),
        OPC_RISC_ARITH_IMM => {
            if rd == 0 {
                return; // NOP
            }
            arith::gen_arith_imm(ctx, ir, mask_op_arith_imm(opcode), rd, rs1, imm);
        }
        #[cfg(feature = "rv64")]
        OPC_RISC_ARITH_IMM_W => {
            if rd == 0 {
                return; // NOP
            }
            arith::gen_arith_imm(ctx, ir, mask_op_arith_imm(opcode), rd, rs1, imm);
        }
        OPC_RISC_ARITH => {
            if rd == 0 {
                return; // NOP
            }
            arith::gen_arith(ctx, ir, mask_op_arith(opcode), rd, rs1, rs2);
        }
        #[cfg(feature = "rv64")]
        OPC_RISC_ARITH_W => {
            if rd == 0 {
                return; // NOP
            }
            arith::gen_arith(ctx, ir, mask_op_arith(opcode), rd, rs1, rs2);
        }
        OPC_RISC_FP_LOAD => mem::gen_fp_load(ctx, ir, mask_op_fp_load(opcode), rd, rs1, imm),
        OPC_RISC_FP_STORE => mem::gen_fp_store(
            ctx,
            ir,
            mask_op_fp_store(opcode),
            rs1,
            rs2,
            insn.imm_s() as GuestSword,
        ),
        OPC_RISC_ATOMIC => atomic::gen_atomic(ctx, ir, mask_op_atomic(opcode), rd, rs1, rs2),
        OPC_RISC_FMADD | OPC_RISC_FMSUB | OPC_RISC_FNMSUB | OPC_RISC_FNMADD => fp::gen_fp_fma(
            ctx,
            ir,
            mask_op_fp_fma(opcode),
            rd,
            rs1,
            rs2,
            insn.rs3(),
            insn.rm(),
        ),
        OPC_RISC_FP_ARITH => fp::gen_fp_arith(
            ctx,
            ir,
            mask_op_fp_arith(opcode),
            rd,
            rs1,
            rs2,
            insn.rm(),
        ),
        OPC_RISC_FENCE => {
            // standard fence is a nop; FENCE.I flushes translated code
            if ctx.opcode & 0x1000 != 0 {
                ir.call(Helper::FenceI, None, &[]);
                ir.movi(Value::PC, ctx.next_pc as u64);
                ir.exit_tb(None);
                ctx.bstate = BlockState::Branch;
            }
        }
        OPC_RISC_SYSTEM => system::gen_system(
            ctx,
            ir,
            mask_op_system(opcode),
            rd,
            rs1,
            insn.csr(),
        ),
        OPC_RISC_VECTOR => {
            if env.has_ext(MisaExt::V) {
                vector::gen_vector(ctx, ir);
            } else {
                kill_unknown(ctx, ir, Exception::IllegalInst);
            }
        }
        _ => kill_unknown(ctx, ir, Exception::IllegalInst),
    }
}

/// Translate one instruction; returns the bytes of guest code consumed.
pub(crate) fn disas_insn(env: &CpuState, ctx: &mut DisasContext, ir: &mut IrBuilder) -> GuestWord {
    use rv_asm::extract32;

    if extract32(ctx.opcode, 0, 2) != 3 {
        if !env.has_ext(MisaExt::C) {
            tracing::error!("RISC-V C instruction set is not enabled for this CPU");
            kill_unknown(ctx, ir, Exception::IllegalInst);
            0
        } else {
            ctx.next_pc = ctx.pc.wrapping_add(2);
            compressed::decode_rv32_64c(env, ctx, ir);
            ctx.pc = ctx.next_pc;
            2
        }
    } else {
        ctx.next_pc = ctx.pc.wrapping_add(4);
        decode_rv32_64g(env, ctx, ir);
        ctx.pc = ctx.next_pc;
        4
    }
}
