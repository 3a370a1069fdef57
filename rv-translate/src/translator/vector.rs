//! V-extension decode.
//!
//! Vector semantics execute in runtime helpers against the live
//! VL/SEW/VSTART configuration; the translator only marshals operand
//! indices and scalar values into a helper call. Only the configuration
//! ops and the element subset backed by the helper kernel decode; the rest
//! of the major opcode raises illegal-instruction.

use rv_asm::{extract32, opcode::*, sextract32, Exception};

use super::{gen_get_gpr, gen_set_gpr, kill_unknown, DisasContext};
use crate::{
    consts::GuestSword,
    ir::{Helper, IrBuilder, Value},
};

pub(super) fn gen_vector(ctx: &mut DisasContext, ir: &mut IrBuilder) {
    let funct3 = extract32(ctx.opcode, 12, 3);

    match funct3 {
        OPC_V_CFG => gen_vsetvl(ctx, ir),
        OPC_V_IVV => gen_ivv(ctx, ir),
        OPC_V_IVX | OPC_V_IVI => gen_ivx_ivi(ctx, ir, funct3 == OPC_V_IVI),
        OPC_V_MVV => gen_mvv(ctx, ir),
        _ => kill_unknown(ctx, ir, Exception::IllegalInst),
    }
}

/// The `vsetvli`/`vsetivli`/`vsetvl` trio. All three funnel into the
/// `vsetvl` helper; they differ in where AVL and the new `vtype` come from.
fn gen_vsetvl(ctx: &mut DisasContext, ir: &mut IrBuilder) {
    let insn = ctx.insn();
    let rd = insn.rd();
    let rs1 = insn.rs1();
    let bit31 = extract32(ctx.opcode, 31, 1);
    let bits30 = extract32(ctx.opcode, 30, 1);

    let avl = ir.new_temp();
    let vtype = ir.new_temp();
    let is_imm;

    if bit31 == 0 {
        // vsetvli: vtype in zimm[10:0], AVL in rs1
        gen_get_gpr(ir, avl, rs1);
        ir.movi(vtype, extract32(ctx.opcode, 20, 11) as u64);
        is_imm = 0u64;
    } else if bits30 == 1 {
        // vsetivli: AVL is the 5-bit immediate in the rs1 slot, vtype in
        // zimm[9:0]
        ir.movi(avl, rs1 as u64);
        ir.movi(vtype, extract32(ctx.opcode, 20, 10) as u64);
        is_imm = 1;
    } else if extract32(ctx.opcode, 25, 6) == 0 {
        // vsetvl: vtype from rs2
        gen_get_gpr(ir, avl, rs1);
        gen_get_gpr(ir, vtype, insn.rs2());
        is_imm = 0;
    } else {
        ir.free(avl);
        ir.free(vtype);
        kill_unknown(ctx, ir, Exception::IllegalInst);
        return;
    }

    let rd_pass = ir.const_word(rd as u64);
    let rs1_pass = ir.const_word(rs1 as u64);
    let imm_flag = ir.const_word(is_imm);
    let new_vl = ir.new_temp();
    ir.call(
        Helper::Vsetvl,
        Some(new_vl),
        &[rd_pass, rs1_pass, avl, vtype, imm_flag],
    );
    gen_set_gpr(ir, rd, new_vl);

    ir.free(rd_pass);
    ir.free(rs1_pass);
    ir.free(imm_flag);
    ir.free(new_vl);
    ir.free(avl);
    ir.free(vtype);
}

/// Marshal `(vd, vs2 [, vs1])` register indices into constants.
fn vreg_args(ir: &mut IrBuilder, ctx: &DisasContext) -> (Value, Value, Value) {
    let insn = ctx.insn();
    let vd = ir.const_word(insn.rd() as u64);
    let vs2 = ir.const_word(insn.rs2() as u64);
    let vs1 = ir.const_word(insn.rs1() as u64);
    (vd, vs2, vs1)
}

fn gen_ivv(ctx: &mut DisasContext, ir: &mut IrBuilder) {
    let funct6 = extract32(ctx.opcode, 26, 6);
    let vm = extract32(ctx.opcode, 25, 1) != 0;

    let helper = match (funct6, vm) {
        (0x10, false) => Helper::VadcVvm,
        (0x11, false) => Helper::VmadcVvm,
        (0x11, true) => Helper::VmadcVv,
        (0x12, false) => Helper::VsbcVvm,
        (0x13, false) => Helper::VmsbcVvm,
        (0x13, true) => Helper::VmsbcVv,
        (0x17, false) => Helper::VmergeIvv,
        (0x17, true) => Helper::VmvIvv,
        _ => {
            kill_unknown(ctx, ir, Exception::IllegalInst);
            return;
        }
    };

    let (vd, vs2, vs1) = vreg_args(ir, ctx);
    if helper == Helper::VmvIvv {
        // vmv.v.v reads only vs1
        ir.call(helper, None, &[vd, vs1]);
    } else {
        ir.call(helper, None, &[vd, vs2, vs1]);
    }
    ir.free(vd);
    ir.free(vs2);
    ir.free(vs1);
}

fn gen_ivx_ivi(ctx: &mut DisasContext, ir: &mut IrBuilder, imm_form: bool) {
    let funct6 = extract32(ctx.opcode, 26, 6);
    let vm = extract32(ctx.opcode, 25, 1) != 0;
    let insn = ctx.insn();

    let helper = match (funct6, vm) {
        (0x10, false) => Helper::VadcVi,
        (0x11, false) => Helper::VmadcVim,
        (0x11, true) => Helper::VmadcVi,
        // vsbc/vmsbc have no immediate encoding
        (0x12, false) if !imm_form => Helper::VsbcVi,
        (0x13, false) if !imm_form => Helper::VmsbcVim,
        (0x13, true) if !imm_form => Helper::VmsbcVi,
        (0x17, false) => Helper::VmergeIvi,
        (0x17, true) => Helper::VmvIvi,
        _ => {
            kill_unknown(ctx, ir, Exception::IllegalInst);
            return;
        }
    };

    let scalar = ir.new_temp();
    if imm_form {
        let simm5 = sextract32(ctx.opcode, 15, 5) as GuestSword;
        ir.movi(scalar, simm5 as i64 as u64);
    } else {
        gen_get_gpr(ir, scalar, insn.rs1());
    }

    let vd = ir.const_word(insn.rd() as u64);
    let vs2 = ir.const_word(insn.rs2() as u64);
    if helper == Helper::VmvIvi {
        // vmv.v.x / vmv.v.i read only the scalar
        ir.call(helper, None, &[vd, scalar]);
    } else {
        ir.call(helper, None, &[vd, vs2, scalar]);
    }
    ir.free(vd);
    ir.free(vs2);
    ir.free(scalar);
}

fn gen_mvv(ctx: &mut DisasContext, ir: &mut IrBuilder) {
    let funct6 = extract32(ctx.opcode, 26, 6);

    match funct6 {
        0x17 => {
            // vcompress.vm
            let (vd, vs2, vs1) = vreg_args(ir, ctx);
            ir.call(Helper::VcompressMvv, None, &[vd, vs2, vs1]);
            ir.free(vd);
            ir.free(vs2);
            ir.free(vs1);
        }
        _ => kill_unknown(ctx, ir, Exception::IllegalInst),
    }
}
