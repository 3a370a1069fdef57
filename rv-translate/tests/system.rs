//! CSR accesses, environment calls, returns and fences.

use rv_translate::prelude::*;
use rv_translate::util::{
    enc,
    exec::{BlockExit, TestRig},
};

#[test]
fn csrrw_swaps_and_ends_the_block_unchained() {
    let mut rig = TestRig::new();
    rig.load(&[enc::csrrw(5, 0x340, 6), enc::addi(7, 0, 1)]);
    rig.env.gpr[6] = 0x1234;
    rig.env.mscratch = 0xaaaa;

    let (tb, exit) = rig.run();

    assert_eq!(rig.env.mscratch, 0x1234);
    assert_eq!(rig.env.gpr[5], 0xaaaa);
    assert_eq!(exit, BlockExit::Unchained);
    assert_eq!(rig.env.pc, 0x1004);
    // the CSR write terminated the block before the addi
    assert_eq!(tb.icount, 1);
    assert_eq!(rig.env.gpr[7], 0);
}

#[test]
fn csrrs_with_x0_suppresses_the_write() {
    let mut rig = TestRig::new();
    rig.load(&[enc::csrrs(5, 0x340, 0)]);
    rig.env.mscratch = 0xbbbb;

    rig.run();

    assert_eq!(rig.env.gpr[5], 0xbbbb);
    assert_eq!(rig.env.mscratch, 0xbbbb);
}

#[test]
fn csrrs_sets_bits() {
    let mut rig = TestRig::new();
    rig.load(&[enc::csrrs(5, 0x340, 6)]);
    rig.env.mscratch = 0xf0;
    rig.env.gpr[6] = 0x0f;

    rig.run();

    assert_eq!(rig.env.gpr[5], 0xf0);
    assert_eq!(rig.env.mscratch, 0xff);
}

#[test]
fn unknown_csr_faults() {
    let mut rig = TestRig::new();
    rig.load(&[enc::csrrw(5, 0x7c0, 6)]);

    let (_, exit) = rig.run();

    assert_eq!(exit, BlockExit::Exception(Exception::IllegalInst));
}

#[test]
fn ecall_raises_a_user_ecall() {
    let mut rig = TestRig::new();
    rig.load(&[enc::ecall()]);

    let (_, exit) = rig.run();

    assert_eq!(exit, BlockExit::Exception(Exception::UserEcall));
    assert_eq!(rig.env.mepc, 0x1000);
}

#[test]
fn ebreak_raises_a_breakpoint() {
    let mut rig = TestRig::new();
    rig.load(&[enc::ebreak()]);

    let (_, exit) = rig.run();

    assert_eq!(exit, BlockExit::Exception(Exception::Breakpoint));
}

#[test]
fn mret_pops_the_machine_state() {
    let mut rig = TestRig::new();
    rig.load(&[enc::mret()]);
    rig.env.mepc = 0x2000;
    rig.env.mstatus |= Mstatus::MPP.bits(); // MPP = machine

    let (_, exit) = rig.run();

    assert_eq!(rig.env.pc, 0x2000);
    assert_eq!(rig.env.privilege, Privilege::Machine);
    assert_eq!(exit, BlockExit::Unchained);
}

#[test]
fn sret_pops_the_supervisor_state() {
    let mut rig = TestRig::new();
    rig.load(&[enc::sret()]);
    rig.env.sepc = 0x3000;
    rig.env.mstatus |= Mstatus::SPP.bits();

    let (_, exit) = rig.run();

    assert_eq!(rig.env.pc, 0x3000);
    assert_eq!(rig.env.privilege, Privilege::Supervisor);
    assert_eq!(exit, BlockExit::Unchained);
}

#[test]
fn wfi_does_not_end_the_block() {
    let mut rig = TestRig::new();
    rig.limit_insns(2);
    rig.load(&[enc::wfi(), enc::addi(5, 0, 3)]);

    let (tb, _) = rig.run();

    assert_eq!(tb.icount, 2);
    assert_eq!(rig.env.gpr[5], 3);
}

#[test]
fn plain_fence_is_a_nop() {
    let mut rig = TestRig::new();
    rig.limit_insns(2);
    rig.load(&[enc::fence(), enc::addi(5, 0, 9)]);

    let (tb, _) = rig.run();

    assert_eq!(tb.icount, 2);
    assert_eq!(rig.env.gpr[5], 9);
}

#[test]
fn fence_i_ends_the_block_unchained() {
    let mut rig = TestRig::new();
    rig.load(&[enc::fence_i(), enc::addi(5, 0, 9)]);

    let (tb, exit) = rig.run();

    assert_eq!(tb.icount, 1);
    assert_eq!(exit, BlockExit::Unchained);
    assert_eq!(rig.env.pc, 0x1004);
    assert_eq!(rig.env.gpr[5], 0);
}

#[test]
fn reserved_system_codes_are_illegal() {
    for csr in [0x002u32, 0x202, 0x7b2] {
        let insn = (csr << 20) | 0x73; // uret / hret / dret
        let mut rig = TestRig::new();
        rig.load(&[insn]);

        let (_, exit) = rig.run();
        assert_eq!(exit, BlockExit::Exception(Exception::IllegalInst));
    }
}
