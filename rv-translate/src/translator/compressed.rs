//! Compressed (RVC) instruction expansion.
//!
//! Each 16-bit form is expanded by calling the translator of its 32-bit
//! equivalent with decoded operands, so both encodings share one emission
//! path. Dispatch is quadrant, then `funct3`, then the nested minor fields;
//! reserved encodings fall through to explicit illegal-instruction arms.

use rv_asm::{extract32, opcode::*, Exception};

use super::{arith, flow, kill_unknown, mem, system, DisasContext};
use crate::{
    consts::{GuestSword, GuestWord},
    ir::{IrBuilder, Value},
    state::CpuState,
};

fn decode_c0(ctx: &mut DisasContext, ir: &mut IrBuilder) {
    let insn = ctx.insn();
    let funct3 = insn.c_funct3();
    let rd_rs2 = insn.c_rs2s();
    let rs1s = insn.c_rs1s();

    match funct3 {
        0 => {
            if extract32(ctx.opcode, 0, 16) == 0 {
                // the all-zero opcode is always illegal
                kill_unknown(ctx, ir, Exception::IllegalInst);
            } else {
                // C.ADDI4SPN -> addi rd', x2, zimm[9:2]
                arith::gen_arith_imm(
                    ctx,
                    ir,
                    OPC_RISC_ADDI,
                    rd_rs2,
                    2,
                    insn.c_addi4spn_imm() as GuestSword,
                );
            }
        }
        1 => {
            // C.FLD -> fld rd', offset[7:3](rs1')
            mem::gen_fp_load(ctx, ir, OPC_RISC_FLD, rd_rs2, rs1s, insn.c_ld_imm() as GuestSword);
        }
        2 => {
            // C.LW -> lw rd', offset[6:2](rs1')
            mem::gen_load(ctx, ir, OPC_RISC_LW, rd_rs2, rs1s, insn.c_lw_imm() as GuestSword);
        }
        3 => {
            #[cfg(feature = "rv64")]
            // C.LD -> ld rd', offset[7:3](rs1')
            mem::gen_load(ctx, ir, OPC_RISC_LD, rd_rs2, rs1s, insn.c_ld_imm() as GuestSword);
            #[cfg(not(feature = "rv64"))]
            // C.FLW -> flw rd', offset[6:2](rs1')
            mem::gen_fp_load(ctx, ir, OPC_RISC_FLW, rd_rs2, rs1s, insn.c_lw_imm() as GuestSword);
        }
        4 => {
            // reserved
            kill_unknown(ctx, ir, Exception::IllegalInst);
        }
        5 => {
            // C.FSD -> fsd rs2', offset[7:3](rs1')
            mem::gen_fp_store(ctx, ir, OPC_RISC_FSD, rs1s, rd_rs2, insn.c_ld_imm() as GuestSword);
        }
        6 => {
            // C.SW -> sw rs2', offset[6:2](rs1')
            mem::gen_store(ctx, ir, OPC_RISC_SW, rs1s, rd_rs2, insn.c_lw_imm() as GuestSword);
        }
        7 => {
            #[cfg(feature = "rv64")]
            // C.SD -> sd rs2', offset[7:3](rs1')
            mem::gen_store(ctx, ir, OPC_RISC_SD, rs1s, rd_rs2, insn.c_ld_imm() as GuestSword);
            #[cfg(not(feature = "rv64"))]
            // C.FSW -> fsw rs2', offset[6:2](rs1')
            mem::gen_fp_store(ctx, ir, OPC_RISC_FSW, rs1s, rd_rs2, insn.c_lw_imm() as GuestSword);
        }
        _ => unreachable!("funct3 is three bits"),
    }
}

fn decode_c1(env: &CpuState, ctx: &mut DisasContext, ir: &mut IrBuilder) {
    let insn = ctx.insn();
    let funct3 = insn.c_funct3();
    let rd_rs1 = insn.c_rs1();

    match funct3 {
        0 => {
            // C.ADDI -> addi rd, rd, nzimm[5:0]
            arith::gen_arith_imm(ctx, ir, OPC_RISC_ADDI, rd_rs1, rd_rs1, insn.c_imm() as GuestSword);
        }
        1 => {
            #[cfg(feature = "rv64")]
            // C.ADDIW -> addiw rd, rd, imm[5:0]
            arith::gen_arith_imm(
                ctx,
                ir,
                OPC_RISC_ADDIW,
                rd_rs1,
                rd_rs1,
                insn.c_imm() as GuestSword,
            );
            #[cfg(not(feature = "rv64"))]
            // C.JAL -> jal x1, offset[11:1]
            flow::gen_jal(env, ctx, ir, 1, insn.c_j_imm() as GuestSword);
        }
        2 => {
            // C.LI -> addi rd, x0, imm[5:0]
            arith::gen_arith_imm(ctx, ir, OPC_RISC_ADDI, rd_rs1, 0, insn.c_imm() as GuestSword);
        }
        3 => {
            if rd_rs1 == 2 {
                // C.ADDI16SP -> addi x2, x2, nzimm[9:4]
                arith::gen_arith_imm(
                    ctx,
                    ir,
                    OPC_RISC_ADDI,
                    2,
                    2,
                    insn.c_addi16sp_imm() as GuestSword,
                );
            } else if rd_rs1 != 0 {
                // C.LUI -> lui rd, nzimm[17:12]
                ir.movi(
                    Value::gpr(rd_rs1),
                    ((insn.c_imm() << 12) as GuestSword) as GuestWord as u64,
                );
            }
        }
        4 => {
            let funct2 = extract32(ctx.opcode, 10, 2);
            let rs1s = insn.c_rs1s();
            match funct2 {
                0 => {
                    // C.SRLI -> srli rd', rd', shamt[5:0]
                    arith::gen_arith_imm(
                        ctx,
                        ir,
                        OPC_RISC_SHIFT_RIGHT_I,
                        rs1s,
                        rs1s,
                        insn.c_zimm() as GuestSword,
                    );
                }
                1 => {
                    // C.SRAI -> srai rd', rd', shamt[5:0]
                    arith::gen_arith_imm(
                        ctx,
                        ir,
                        OPC_RISC_SHIFT_RIGHT_I,
                        rs1s,
                        rs1s,
                        (insn.c_zimm() | 0x400) as GuestSword,
                    );
                }
                2 => {
                    // C.ANDI -> andi rd', rd', imm[5:0]
                    arith::gen_arith_imm(ctx, ir, OPC_RISC_ANDI, rs1s, rs1s, insn.c_imm() as GuestSword);
                }
                3 => {
                    let funct2 = extract32(ctx.opcode, 5, 2);
                    let rs2s = insn.c_rs2s();
                    let w_bit = extract32(ctx.opcode, 12, 1) != 0;
                    match funct2 {
                        0 => {
                            // C.SUB / C.SUBW
                            if !w_bit {
                                arith::gen_arith(ctx, ir, OPC_RISC_SUB, rs1s, rs1s, rs2s);
                            } else {
                                #[cfg(feature = "rv64")]
                                arith::gen_arith(ctx, ir, OPC_RISC_SUBW, rs1s, rs1s, rs2s);
                                #[cfg(not(feature = "rv64"))]
                                kill_unknown(ctx, ir, Exception::IllegalInst);
                            }
                        }
                        1 => {
                            // C.XOR / C.ADDW
                            if !w_bit {
                                arith::gen_arith(ctx, ir, OPC_RISC_XOR, rs1s, rs1s, rs2s);
                            } else {
                                #[cfg(feature = "rv64")]
                                arith::gen_arith(ctx, ir, OPC_RISC_ADDW, rs1s, rs1s, rs2s);
                                #[cfg(not(feature = "rv64"))]
                                kill_unknown(ctx, ir, Exception::IllegalInst);
                            }
                        }
                        2 => {
                            // C.OR
                            arith::gen_arith(ctx, ir, OPC_RISC_OR, rs1s, rs1s, rs2s);
                        }
                        3 => {
                            // C.AND
                            arith::gen_arith(ctx, ir, OPC_RISC_AND, rs1s, rs1s, rs2s);
                        }
                        _ => unreachable!("funct2 is two bits"),
                    }
                }
                _ => unreachable!("funct2 is two bits"),
            }
        }
        5 => {
            // C.J -> jal x0, offset[11:1]
            flow::gen_jal(env, ctx, ir, 0, insn.c_j_imm() as GuestSword);
        }
        6 => {
            // C.BEQZ -> beq rs1', x0, offset[8:1]
            let rs1s = insn.c_rs1s();
            flow::gen_branch(env, ctx, ir, OPC_RISC_BEQ, rs1s, 0, insn.c_b_imm() as GuestSword);
        }
        7 => {
            // C.BNEZ -> bne rs1', x0, offset[8:1]
            let rs1s = insn.c_rs1s();
            flow::gen_branch(env, ctx, ir, OPC_RISC_BNE, rs1s, 0, insn.c_b_imm() as GuestSword);
        }
        _ => unreachable!("funct3 is three bits"),
    }
}

fn decode_c2(env: &CpuState, ctx: &mut DisasContext, ir: &mut IrBuilder) {
    let insn = ctx.insn();
    let funct3 = insn.c_funct3();
    let rd = insn.c_rs1();

    match funct3 {
        0 => {
            // C.SLLI -> slli rd, rd, shamt[5:0]
            arith::gen_arith_imm(ctx, ir, OPC_RISC_SLLI, rd, rd, insn.c_zimm() as GuestSword);
        }
        1 => {
            // C.FLDSP -> fld rd, offset[8:3](x2)
            mem::gen_fp_load(ctx, ir, OPC_RISC_FLD, rd, 2, insn.c_ldsp_imm() as GuestSword);
        }
        2 => {
            // C.LWSP -> lw rd, offset[7:2](x2)
            mem::gen_load(ctx, ir, OPC_RISC_LW, rd, 2, insn.c_lwsp_imm() as GuestSword);
        }
        3 => {
            #[cfg(feature = "rv64")]
            // C.LDSP -> ld rd, offset[8:3](x2)
            mem::gen_load(ctx, ir, OPC_RISC_LD, rd, 2, insn.c_ldsp_imm() as GuestSword);
            #[cfg(not(feature = "rv64"))]
            // C.FLWSP -> flw rd, offset[7:2](x2)
            mem::gen_fp_load(ctx, ir, OPC_RISC_FLW, rd, 2, insn.c_lwsp_imm() as GuestSword);
        }
        4 => {
            let rs2 = insn.c_rs2();
            if extract32(ctx.opcode, 12, 1) == 0 {
                if rs2 == 0 {
                    // C.JR -> jalr x0, rs1, 0
                    flow::gen_jalr(env, ctx, ir, OPC_RISC_JALR, 0, rd, 0);
                } else {
                    // C.MV -> add rd, x0, rs2
                    arith::gen_arith(ctx, ir, OPC_RISC_ADD, rd, 0, rs2);
                }
            } else if rd == 0 {
                // C.EBREAK -> ebreak
                system::gen_system(ctx, ir, OPC_RISC_ECALL, 0, 0, 0x1);
            } else if rs2 == 0 {
                // C.JALR -> jalr x1, rs1, 0
                flow::gen_jalr(env, ctx, ir, OPC_RISC_JALR, 1, rd, 0);
            } else {
                // C.ADD -> add rd, rd, rs2
                arith::gen_arith(ctx, ir, OPC_RISC_ADD, rd, rd, rs2);
            }
        }
        5 => {
            // C.FSDSP -> fsd rs2, offset[8:3](x2)
            mem::gen_fp_store(ctx, ir, OPC_RISC_FSD, 2, insn.c_rs2(), insn.c_sdsp_imm() as GuestSword);
        }
        6 => {
            // C.SWSP -> sw rs2, offset[7:2](x2)
            mem::gen_store(ctx, ir, OPC_RISC_SW, 2, insn.c_rs2(), insn.c_swsp_imm() as GuestSword);
        }
        7 => {
            #[cfg(feature = "rv64")]
            // C.SDSP -> sd rs2, offset[8:3](x2)
            mem::gen_store(ctx, ir, OPC_RISC_SD, 2, insn.c_rs2(), insn.c_sdsp_imm() as GuestSword);
            #[cfg(not(feature = "rv64"))]
            // C.FSWSP -> fsw rs2, offset[7:2](x2)
            mem::gen_fp_store(ctx, ir, OPC_RISC_FSW, 2, insn.c_rs2(), insn.c_swsp_imm() as GuestSword);
        }
        _ => unreachable!("funct3 is three bits"),
    }
}

pub(super) fn decode_rv32_64c(env: &CpuState, ctx: &mut DisasContext, ir: &mut IrBuilder) {
    match extract32(ctx.opcode, 0, 2) {
        0 => decode_c0(ctx, ir),
        1 => decode_c1(env, ctx, ir),
        2 => decode_c2(env, ctx, ir),
        _ => unreachable!("quadrant 3 is the 32-bit space"),
    }
}
