//! CSR access and system instruction translator.

use rv_asm::{opcode::*, Exception};

use super::{gen_get_gpr, gen_set_gpr, generate_exception, kill_unknown, BlockState, DisasContext};
use crate::ir::{Helper, IrBuilder, Value};

pub(super) fn gen_system(
    ctx: &mut DisasContext,
    ir: &mut IrBuilder,
    opc: u32,
    rd: u32,
    rs1: u32,
    csr: u32,
) {
    let source1 = ir.new_temp();
    let csr_store = ir.new_temp();
    let dest = ir.new_temp();
    let rs1_pass = ir.new_temp();
    let imm_rs1 = ir.new_temp();
    gen_get_gpr(ir, source1, rs1);
    ir.movi(Value::PC, ctx.pc as u64);
    ir.movi(rs1_pass, rs1 as u64);
    ir.movi(csr_store, csr as u64); // feed the CSR number to the helper

    match opc {
        OPC_RISC_ECALL => match csr {
            0x0 => {
                // ECALL: always a U-level ecall here, promoted to the
                // current privilege by the trap handler
                generate_exception(ctx, ir, Exception::UserEcall);
                ir.exit_tb(None); // no chaining
                ctx.bstate = BlockState::Branch;
            }
            0x1 => {
                // EBREAK
                generate_exception(ctx, ir, Exception::Breakpoint);
                ir.exit_tb(None); // no chaining
                ctx.bstate = BlockState::Branch;
            }
            0x002 => {
                // URET
                kill_unknown(ctx, ir, Exception::IllegalInst);
            }
            0x102 => {
                // SRET
                ir.call(Helper::Sret, Some(Value::PC), &[Value::PC]);
                ir.exit_tb(None); // no chaining
                ctx.bstate = BlockState::Branch;
            }
            0x202 => {
                // HRET
                kill_unknown(ctx, ir, Exception::IllegalInst);
            }
            0x302 => {
                // MRET
                ir.call(Helper::Mret, Some(Value::PC), &[Value::PC]);
                ir.exit_tb(None); // no chaining
                ctx.bstate = BlockState::Branch;
            }
            0x7b2 => {
                // DRET
                kill_unknown(ctx, ir, Exception::IllegalInst);
            }
            0x105 => {
                // WFI
                ir.movi(Value::PC, ctx.next_pc as u64);
                ir.call(Helper::Wfi, None, &[]);
            }
            0x104 => {
                // SFENCE.VM
                ir.call(Helper::TlbFlush, None, &[]);
            }
            0x120 => {
                // SFENCE.VMA; ASID-specific fences are not modelled
                ir.call(Helper::TlbFlush, None, &[]);
            }
            _ => {
                kill_unknown(ctx, ir, Exception::IllegalInst);
            }
        },
        _ => {
            ir.movi(imm_rs1, rs1 as u64);
            match opc {
                OPC_RISC_CSRRW => ir.call(Helper::Csrrw, Some(dest), &[source1, csr_store]),
                OPC_RISC_CSRRS => {
                    ir.call(Helper::Csrrs, Some(dest), &[source1, csr_store, rs1_pass])
                }
                OPC_RISC_CSRRC => {
                    ir.call(Helper::Csrrc, Some(dest), &[source1, csr_store, rs1_pass])
                }
                OPC_RISC_CSRRWI => ir.call(Helper::Csrrw, Some(dest), &[imm_rs1, csr_store]),
                OPC_RISC_CSRRSI => {
                    ir.call(Helper::Csrrs, Some(dest), &[imm_rs1, csr_store, rs1_pass])
                }
                OPC_RISC_CSRRCI => {
                    ir.call(Helper::Csrrc, Some(dest), &[imm_rs1, csr_store, rs1_pass])
                }
                _ => {
                    kill_unknown(ctx, ir, Exception::IllegalInst);
                }
            }
            gen_set_gpr(ir, rd, dest);
            // end the block: the write may have changed priv or mmu_index,
            // invalidating its premises
            ir.movi(Value::PC, ctx.next_pc as u64);
            ir.exit_tb(None); // no chaining
            ctx.bstate = BlockState::Branch;
        }
    }
    ir.free(source1);
    ir.free(csr_store);
    ir.free(dest);
    ir.free(rs1_pass);
    ir.free(imm_rs1);
}
