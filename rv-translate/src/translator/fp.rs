//! Floating-point translators.
//!
//! Every FP instruction opens with the FS gate: `mstatus.FS` is loaded and
//! tested at guest-execution time, and a zero field raises
//! illegal-instruction before any side effect. Most operations lower to a
//! single helper call; sign-injection is emitted inline as bit arithmetic.

use rv_asm::{opcode::*, Exception};

use super::{gen_get_gpr, gen_set_gpr, kill_unknown, DisasContext};
use crate::{
    ir::{Cond, Helper, IrBuilder, Label, Value},
    state::Mstatus,
};

/// The emitted `mstatus.FS` gate. `open` places the check; `close` binds
/// the join label after the protected body.
pub(super) struct FsGate {
    done: Label,
}

impl FsGate {
    pub(super) fn open(ctx: &mut DisasContext, ir: &mut IrBuilder) -> Self {
        let fp_ok = ir.new_label();
        let done = ir.new_label();
        let t0 = ir.new_temp();

        ir.load_mstatus(t0);
        ir.andi(t0, t0, Mstatus::FS.bits() as u64);
        ir.brcondi(Cond::Ne, t0, 0, fp_ok);
        // MSTATUS.FS was zero
        kill_unknown(ctx, ir, Exception::IllegalInst);
        ir.br(done);

        ir.set_label(fp_ok);
        ir.free(t0);
        Self { done }
    }

    pub(super) fn close(self, ir: &mut IrBuilder) {
        ir.set_label(self.done);
    }
}

/// Inline sign-injection; `sign_mask` selects the sign bit of the operand
/// width (`i32::MIN` for S, `i64::MIN` for D, sign-extended to 64 bits).
fn gen_fsgnj(
    ctx: &mut DisasContext,
    ir: &mut IrBuilder,
    rd: u32,
    rs1: u32,
    rs2: u32,
    rm: u32,
    sign_mask: u64,
) {
    let gate = FsGate::open(ctx, ir);

    let src1 = ir.new_temp_i64();
    let src2 = ir.new_temp_i64();
    ir.mov(src1, Value::fpr(rs1));
    ir.mov(src2, Value::fpr(rs2));

    match rm {
        0 => {
            // fsgnj; equal sources collapse to a register move
            if rs1 == rs2 {
                ir.mov(Value::fpr(rd), src1);
            } else {
                ir.andi(src1, src1, !sign_mask);
                ir.andi(src2, src2, sign_mask);
                ir.or(Value::fpr(rd), src1, src2);
            }
        }
        1 => {
            // fsgnjn
            ir.andi(src1, src1, !sign_mask);
            ir.not(src2, src2);
            ir.andi(src2, src2, sign_mask);
            ir.or(Value::fpr(rd), src1, src2);
        }
        2 => {
            // fsgnjx
            ir.andi(src2, src2, sign_mask);
            ir.xor(Value::fpr(rd), src1, src2);
        }
        _ => {
            kill_unknown(ctx, ir, Exception::IllegalInst);
        }
    }

    ir.free(src1);
    ir.free(src2);
    gate.close(ir);
}

/// The four fused multiply-add families: three FP sources and a rounding
/// mode, one helper each.
pub(super) fn gen_fp_fma(
    ctx: &mut DisasContext,
    ir: &mut IrBuilder,
    opc: u32,
    rd: u32,
    rs1: u32,
    rs2: u32,
    rs3: u32,
    rm: u32,
) {
    let gate = FsGate::open(ctx, ir);
    let rm_reg = ir.const_i64(rm as u64);

    let helper = match opc {
        OPC_RISC_FMADD_S => Some(Helper::FmaddS),
        OPC_RISC_FMADD_D => Some(Helper::FmaddD),
        OPC_RISC_FMSUB_S => Some(Helper::FmsubS),
        OPC_RISC_FMSUB_D => Some(Helper::FmsubD),
        OPC_RISC_FNMSUB_S => Some(Helper::FnmsubS),
        OPC_RISC_FNMSUB_D => Some(Helper::FnmsubD),
        OPC_RISC_FNMADD_S => Some(Helper::FnmaddS),
        OPC_RISC_FNMADD_D => Some(Helper::FnmaddD),
        _ => None,
    };
    match helper {
        Some(helper) => ir.call(
            helper,
            Some(Value::fpr(rd)),
            &[Value::fpr(rs1), Value::fpr(rs2), Value::fpr(rs3), rm_reg],
        ),
        None => kill_unknown(ctx, ir, Exception::IllegalInst),
    }

    ir.free(rm_reg);
    gate.close(ir);
}

pub(super) fn gen_fp_arith(
    ctx: &mut DisasContext,
    ir: &mut IrBuilder,
    opc: u32,
    rd: u32,
    rs1: u32,
    rs2: u32,
    rm: u32,
) {
    match opc {
        OPC_RISC_FSGNJ_S => {
            gen_fsgnj(ctx, ir, rd, rs1, rs2, rm, i32::MIN as i64 as u64);
            return;
        }
        OPC_RISC_FSGNJ_D => {
            gen_fsgnj(ctx, ir, rd, rs1, rs2, rm, i64::MIN as u64);
            return;
        }
        _ => {}
    }

    let gate = FsGate::open(ctx, ir);
    let rm_reg = ir.const_i64(rm as u64);
    let write_int_rd = ir.new_temp();

    let fprs = |i: u32| Value::fpr(i);
    match opc {
        OPC_RISC_FADD_S => ir.call(
            Helper::FaddS,
            Some(fprs(rd)),
            &[fprs(rs1), fprs(rs2), rm_reg],
        ),
        OPC_RISC_FSUB_S => ir.call(
            Helper::FsubS,
            Some(fprs(rd)),
            &[fprs(rs1), fprs(rs2), rm_reg],
        ),
        OPC_RISC_FMUL_S => ir.call(
            Helper::FmulS,
            Some(fprs(rd)),
            &[fprs(rs1), fprs(rs2), rm_reg],
        ),
        OPC_RISC_FDIV_S => ir.call(
            Helper::FdivS,
            Some(fprs(rd)),
            &[fprs(rs1), fprs(rs2), rm_reg],
        ),
        OPC_RISC_FMIN_S => match rm {
            // rm selects min/max here
            0x0 => ir.call(Helper::FminS, Some(fprs(rd)), &[fprs(rs1), fprs(rs2)]),
            0x1 => ir.call(Helper::FmaxS, Some(fprs(rd)), &[fprs(rs1), fprs(rs2)]),
            _ => kill_unknown(ctx, ir, Exception::IllegalInst),
        },
        OPC_RISC_FSQRT_S => ir.call(Helper::FsqrtS, Some(fprs(rd)), &[fprs(rs1), rm_reg]),
        OPC_RISC_FEQ_S => {
            // rm selects the comparison
            match rm {
                0x0 => ir.call(Helper::FleS, Some(write_int_rd), &[fprs(rs1), fprs(rs2)]),
                0x1 => ir.call(Helper::FltS, Some(write_int_rd), &[fprs(rs1), fprs(rs2)]),
                0x2 => ir.call(Helper::FeqS, Some(write_int_rd), &[fprs(rs1), fprs(rs2)]),
                _ => kill_unknown(ctx, ir, Exception::IllegalInst),
            }
            gen_set_gpr(ir, rd, write_int_rd);
        }
        OPC_RISC_FCVT_W_S => {
            // rs2 encodes the integer flavour
            match rs2 {
                0x0 => ir.call(Helper::FcvtWS, Some(write_int_rd), &[fprs(rs1), rm_reg]),
                0x1 => ir.call(Helper::FcvtWuS, Some(write_int_rd), &[fprs(rs1), rm_reg]),
                0x2 if cfg!(feature = "rv64") => {
                    ir.call(Helper::FcvtLS, Some(write_int_rd), &[fprs(rs1), rm_reg])
                }
                0x3 if cfg!(feature = "rv64") => {
                    ir.call(Helper::FcvtLuS, Some(write_int_rd), &[fprs(rs1), rm_reg])
                }
                _ => kill_unknown(ctx, ir, Exception::IllegalInst),
            }
            gen_set_gpr(ir, rd, write_int_rd);
        }
        OPC_RISC_FCVT_S_W => {
            gen_get_gpr(ir, write_int_rd, rs1);
            match rs2 {
                0x0 => ir.call(Helper::FcvtSW, Some(fprs(rd)), &[write_int_rd, rm_reg]),
                0x1 => ir.call(Helper::FcvtSWu, Some(fprs(rd)), &[write_int_rd, rm_reg]),
                0x2 if cfg!(feature = "rv64") => {
                    ir.call(Helper::FcvtSL, Some(fprs(rd)), &[write_int_rd, rm_reg])
                }
                0x3 if cfg!(feature = "rv64") => {
                    ir.call(Helper::FcvtSLu, Some(fprs(rd)), &[write_int_rd, rm_reg])
                }
                _ => kill_unknown(ctx, ir, Exception::IllegalInst),
            }
        }
        OPC_RISC_FMV_X_S => {
            // rm selects FMV/FCLASS
            match rm {
                0x0 => ir.ext32s(write_int_rd, fprs(rs1)),
                0x1 => ir.call(Helper::FclassS, Some(write_int_rd), &[fprs(rs1)]),
                _ => kill_unknown(ctx, ir, Exception::IllegalInst),
            }
            gen_set_gpr(ir, rd, write_int_rd);
        }
        OPC_RISC_FMV_S_X => {
            gen_get_gpr(ir, write_int_rd, rs1);
            if cfg!(feature = "rv64") {
                ir.mov(fprs(rd), write_int_rd);
            } else {
                ir.extu_to_i64(fprs(rd), write_int_rd);
            }
        }
        OPC_RISC_FADD_D => ir.call(
            Helper::FaddD,
            Some(fprs(rd)),
            &[fprs(rs1), fprs(rs2), rm_reg],
        ),
        OPC_RISC_FSUB_D => ir.call(
            Helper::FsubD,
            Some(fprs(rd)),
            &[fprs(rs1), fprs(rs2), rm_reg],
        ),
        OPC_RISC_FMUL_D => ir.call(
            Helper::FmulD,
            Some(fprs(rd)),
            &[fprs(rs1), fprs(rs2), rm_reg],
        ),
        OPC_RISC_FDIV_D => ir.call(
            Helper::FdivD,
            Some(fprs(rd)),
            &[fprs(rs1), fprs(rs2), rm_reg],
        ),
        OPC_RISC_FMIN_D => match rm {
            0x0 => ir.call(Helper::FminD, Some(fprs(rd)), &[fprs(rs1), fprs(rs2)]),
            0x1 => ir.call(Helper::FmaxD, Some(fprs(rd)), &[fprs(rs1), fprs(rs2)]),
            _ => kill_unknown(ctx, ir, Exception::IllegalInst),
        },
        OPC_RISC_FCVT_S_D => match rs2 {
            0x1 => ir.call(Helper::FcvtSD, Some(fprs(rd)), &[fprs(rs1), rm_reg]),
            _ => kill_unknown(ctx, ir, Exception::IllegalInst),
        },
        OPC_RISC_FCVT_D_S => match rs2 {
            0x0 => ir.call(Helper::FcvtDS, Some(fprs(rd)), &[fprs(rs1), rm_reg]),
            _ => kill_unknown(ctx, ir, Exception::IllegalInst),
        },
        OPC_RISC_FSQRT_D => ir.call(Helper::FsqrtD, Some(fprs(rd)), &[fprs(rs1), rm_reg]),
        OPC_RISC_FEQ_D => {
            match rm {
                0x0 => ir.call(Helper::FleD, Some(write_int_rd), &[fprs(rs1), fprs(rs2)]),
                0x1 => ir.call(Helper::FltD, Some(write_int_rd), &[fprs(rs1), fprs(rs2)]),
                0x2 => ir.call(Helper::FeqD, Some(write_int_rd), &[fprs(rs1), fprs(rs2)]),
                _ => kill_unknown(ctx, ir, Exception::IllegalInst),
            }
            gen_set_gpr(ir, rd, write_int_rd);
        }
        OPC_RISC_FCVT_W_D => {
            match rs2 {
                0x0 => ir.call(Helper::FcvtWD, Some(write_int_rd), &[fprs(rs1), rm_reg]),
                0x1 => ir.call(Helper::FcvtWuD, Some(write_int_rd), &[fprs(rs1), rm_reg]),
                0x2 if cfg!(feature = "rv64") => {
                    ir.call(Helper::FcvtLD, Some(write_int_rd), &[fprs(rs1), rm_reg])
                }
                0x3 if cfg!(feature = "rv64") => {
                    ir.call(Helper::FcvtLuD, Some(write_int_rd), &[fprs(rs1), rm_reg])
                }
                _ => kill_unknown(ctx, ir, Exception::IllegalInst),
            }
            gen_set_gpr(ir, rd, write_int_rd);
        }
        OPC_RISC_FCVT_D_W => {
            gen_get_gpr(ir, write_int_rd, rs1);
            match rs2 {
                0x0 => ir.call(Helper::FcvtDW, Some(fprs(rd)), &[write_int_rd, rm_reg]),
                0x1 => ir.call(Helper::FcvtDWu, Some(fprs(rd)), &[write_int_rd, rm_reg]),
                0x2 if cfg!(feature = "rv64") => {
                    ir.call(Helper::FcvtDL, Some(fprs(rd)), &[write_int_rd, rm_reg])
                }
                0x3 if cfg!(feature = "rv64") => {
                    ir.call(Helper::FcvtDLu, Some(fprs(rd)), &[write_int_rd, rm_reg])
                }
                _ => kill_unknown(ctx, ir, Exception::IllegalInst),
            }
        }
        #[cfg(feature = "rv64")]
        OPC_RISC_FMV_X_D => {
            match rm {
                0x0 => ir.mov(write_int_rd, fprs(rs1)),
                0x1 => ir.call(Helper::FclassD, Some(write_int_rd), &[fprs(rs1)]),
                _ => kill_unknown(ctx, ir, Exception::IllegalInst),
            }
            gen_set_gpr(ir, rd, write_int_rd);
        }
        #[cfg(feature = "rv64")]
        OPC_RISC_FMV_D_X => {
            gen_get_gpr(ir, write_int_rd, rs1);
            ir.mov(fprs(rd), write_int_rd);
        }
        _ => kill_unknown(ctx, ir, Exception::IllegalInst),
    }

    ir.free(rm_reg);
    ir.free(write_int_rd);
    gate.close(ir);
}
