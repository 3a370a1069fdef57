//! Compressed-form expansion equivalence.

use rv_translate::prelude::*;
use rv_translate::util::{
    enc,
    exec::{BlockExit, TestRig},
};

/// Run a compressed stream and its 32-bit expansion from the same
/// pre-state; both post-states must agree.
fn assert_equivalent(
    parcels: &[u16],
    expansion: &[u32],
    setup: impl Fn(&mut TestRig),
    check: impl Fn(&TestRig, &TestRig),
) {
    let mut c = TestRig::new();
    c.limit_insns(parcels.len());
    c.load16(parcels);
    setup(&mut c);
    c.run();

    let mut g = TestRig::new();
    g.limit_insns(expansion.len());
    g.load(expansion);
    setup(&mut g);
    g.run();

    assert_eq!(c.env.gpr, g.env.gpr);
    assert_eq!(c.env.fpr, g.env.fpr);
    check(&c, &g);
}

#[test]
fn all_zero_parcel_is_illegal() {
    let mut rig = TestRig::new();
    rig.load16(&[0x0000]);

    let (_, exit) = rig.run();

    assert_eq!(exit, BlockExit::Exception(Exception::IllegalInst));
}

#[test]
fn compressed_without_rvc_is_illegal() {
    let mut rig = TestRig::without_rvc();
    rig.load16(&[0x157d]); // c.addi x10, -1

    let (tb, exit) = rig.run();

    assert_eq!(exit, BlockExit::Exception(Exception::IllegalInst));
    // the rejected parcel consumed no guest bytes
    assert_eq!(tb.size, 0);
}

#[test]
fn c_addi_matches_addi() {
    assert_equivalent(
        &[0x157d], // c.addi x10, -1
        &[enc::addi(10, 10, -1)],
        |rig| rig.env.gpr[10] = 7,
        |c, _| assert_eq!(c.env.gpr[10], 6),
    );
}

#[test]
fn c_li_matches_addi_from_x0() {
    // c.li x9, 13: funct3 010, rd 01001, imm 01101
    assert_equivalent(
        &[0x44b5],
        &[enc::addi(9, 0, 13)],
        |rig| rig.env.gpr[9] = 0xdead,
        |c, _| assert_eq!(c.env.gpr[9], 13),
    );
}

#[test]
fn c_mv_and_c_add_match_add() {
    // c.mv x10, x11
    assert_equivalent(
        &[0x852e],
        &[enc::add(10, 0, 11)],
        |rig| rig.env.gpr[11] = 77,
        |c, _| assert_eq!(c.env.gpr[10], 77),
    );
    // c.add x10, x11
    assert_equivalent(
        &[0x952e],
        &[enc::add(10, 10, 11)],
        |rig| {
            rig.env.gpr[10] = 5;
            rig.env.gpr[11] = 7;
        },
        |c, _| assert_eq!(c.env.gpr[10], 12),
    );
}

#[test]
fn c_sub_matches_sub() {
    // c.sub x8, x9
    assert_equivalent(
        &[0x8c05],
        &[enc::sub(8, 8, 9)],
        |rig| {
            rig.env.gpr[8] = 10;
            rig.env.gpr[9] = 4;
        },
        |c, _| assert_eq!(c.env.gpr[8], 6),
    );
}

#[test]
fn c_lw_matches_lw() {
    // c.lw x9, 4(x8)
    assert_equivalent(
        &[0x4044],
        &[enc::lw(9, 8, 4)],
        |rig| {
            rig.env.gpr[8] = 0x3000;
            rig.mem.write_u32(0x3004, 0xfeed_f00d);
        },
        |c, _| assert_eq!(c.env.gpr[9], 0xffff_ffff_feed_f00d),
    );
}

#[test]
fn c_sw_matches_sw() {
    // c.sw x9, 4(x8): funct3 110, imm[5:3]=0, rs1'=000, imm[2]=1, rd'=001
    assert_equivalent(
        &[0xc044],
        &[enc::sw(9, 8, 4)],
        |rig| {
            rig.env.gpr[8] = 0x3000;
            rig.env.gpr[9] = 0x1234_5678;
        },
        |c, g| {
            assert_eq!(c.mem.read_u32(0x3004), 0x1234_5678);
            assert_eq!(g.mem.read_u32(0x3004), 0x1234_5678);
        },
    );
}

#[test]
fn c_ld_matches_ld() {
    // c.ld x9, 8(x8)
    assert_equivalent(
        &[0x6404],
        &[enc::ld(9, 8, 8)],
        |rig| {
            rig.env.gpr[8] = 0x3000;
            rig.mem.write_u64(0x3008, 0x0102_0304_0506_0708);
        },
        |c, _| assert_eq!(c.env.gpr[9], 0x0102_0304_0506_0708),
    );
}

#[test]
fn c_addi4spn_matches_addi_off_sp() {
    // c.addi4spn x8, 16
    assert_equivalent(
        &[0x0800],
        &[enc::addi(8, 2, 16)],
        |rig| rig.env.gpr[2] = 0x4000,
        |c, _| assert_eq!(c.env.gpr[8], 0x4010),
    );
}

#[test]
fn c_j_matches_jal_x0() {
    let mut rig = TestRig::new();
    rig.load16(&[0xbffd]); // c.j -2

    let (_, exit) = rig.run();

    assert_eq!(rig.env.pc, 0x0ffe);
    // the target sits on the previous page, so no chaining
    assert_eq!(exit, BlockExit::Unchained);
}

#[test]
fn c_beqz_matches_beq_x0() {
    let mut rig = TestRig::new();
    rig.load16(&[0xc401]); // c.beqz x8, +8
    rig.env.gpr[8] = 0;

    rig.run();

    assert_eq!(rig.env.pc, 0x1008);

    let mut rig = TestRig::new();
    rig.load16(&[0xc401]);
    rig.env.gpr[8] = 1;

    rig.run();

    // fallthrough of a 2-byte instruction
    assert_eq!(rig.env.pc, 0x1002);
}

#[test]
fn c_jr_clears_bit_zero() {
    // c.jr x10: funct4 1000, rd 01010, rs2 00000
    let mut rig = TestRig::new();
    rig.load16(&[0x8502]);
    rig.env.gpr[10] = 0x2001;

    let (_, exit) = rig.run();

    assert_eq!(rig.env.pc, 0x2000);
    assert_eq!(exit, BlockExit::Unchained);
}

#[test]
fn c_ebreak_raises_a_breakpoint() {
    // c.ebreak: 0x9002
    let mut rig = TestRig::new();
    rig.load16(&[0x9002]);

    let (_, exit) = rig.run();

    assert_eq!(exit, BlockExit::Exception(Exception::Breakpoint));
}

#[test]
fn c_lui_to_x0_is_silently_skipped() {
    // c.lui x0, 1 keeps the original's quiet fall-through
    let mut rig = TestRig::new();
    rig.limit_insns(2);
    rig.load16(&[0x6005, 0x4485]); // c.lui x0, 1 ; c.li x9, 1

    let (tb, _) = rig.run();

    assert_eq!(rig.env.gpr[0], 0);
    assert_eq!(rig.env.gpr[9], 1);
    assert_eq!(tb.icount, 2);
    assert_eq!(tb.size, 4);
}

#[test]
fn reserved_c0_funct3_is_illegal() {
    // quadrant 0, funct3 100
    let mut rig = TestRig::new();
    rig.load16(&[0x8000]);

    let (_, exit) = rig.run();

    assert_eq!(exit, BlockExit::Exception(Exception::IllegalInst));
}

#[test]
fn mixed_width_stream_accumulates_sizes() {
    let mut rig = TestRig::new();
    rig.limit_insns(2);
    rig.load16(&[0x157d]); // c.addi x10, -1 at 0x1000
    let addi = enc::addi(10, 10, 5).to_le_bytes();
    rig.mem.write_u8(0x1002, addi[0]);
    rig.mem.write_u8(0x1003, addi[1]);
    rig.mem.write_u8(0x1004, addi[2]);
    rig.mem.write_u8(0x1005, addi[3]);
    rig.env.gpr[10] = 10;

    let (tb, _) = rig.run();

    assert_eq!(rig.env.gpr[10], 14);
    assert_eq!(tb.size, 6);
    assert_eq!(tb.icount, 2);
    assert_eq!(rig.env.pc, 0x1006);
}
