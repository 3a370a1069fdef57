//! Loads and stores, including the FP forms and their FS gate.

use rv_translate::prelude::*;
use rv_translate::util::{
    enc,
    exec::{BlockExit, TestRig},
};

fn rig_with(words: &[u32]) -> TestRig {
    let mut rig = TestRig::new();
    rig.limit_insns(words.len());
    rig.load(words);
    rig
}

#[test]
fn loads_extend_correctly() {
    let mut rig = rig_with(&[
        enc::lw(5, 10, 0),
        enc::lbu(6, 10, 3),
        enc::ld(7, 10, 0),
    ]);
    rig.env.gpr[10] = 0x3000;
    rig.mem.write_u64(0x3000, 0xffff_ffff_8000_00ff);

    rig.run();

    // lw sign-extends from bit 31
    assert_eq!(rig.env.gpr[5], 0xffff_ffff_8000_00ff);
    // lbu zero-extends the selected byte
    assert_eq!(rig.env.gpr[6], 0x80);
    assert_eq!(rig.env.gpr[7], 0xffff_ffff_8000_00ff);
}

#[test]
fn stores_write_the_selected_width() {
    let mut rig = rig_with(&[enc::sw(11, 10, 4), enc::sd(12, 10, 8)]);
    rig.env.gpr[10] = 0x3000;
    rig.env.gpr[11] = 0xaabb_ccdd_1122_3344;
    rig.env.gpr[12] = 0x0102_0304_0506_0708;

    rig.run();

    assert_eq!(rig.mem.read_u32(0x3004), 0x1122_3344);
    assert_eq!(rig.mem.read_u64(0x3008), 0x0102_0304_0506_0708);
}

#[test]
fn negative_offsets_apply() {
    let mut rig = rig_with(&[enc::lw(5, 10, -4)]);
    rig.env.gpr[10] = 0x3004;
    rig.mem.write_u32(0x3000, 77);

    rig.run();

    assert_eq!(rig.env.gpr[5], 77);
}

#[test]
fn memory_ops_publish_the_faulting_pc() {
    let mut rig = rig_with(&[enc::addi(5, 0, 1), enc::lw(6, 10, 0)]);
    rig.env.gpr[10] = 0x3000;

    let (_, buf) = rig.translate();

    // the PC global is set to the load's own address before the access
    let ops = buf.ops();
    let publish = ops.iter().position(|op| {
        matches!(op, rv_translate::ir::MicroOp::MovImm { dst, imm: 0x1004 }
            if *dst == rv_translate::ir::Value::PC)
    });
    let load = ops
        .iter()
        .position(|op| matches!(op, rv_translate::ir::MicroOp::Load { .. }));
    assert!(publish.unwrap() < load.unwrap());
}

#[test]
fn fp_load_and_store_move_raw_bits() {
    let mut rig = rig_with(&[enc::fld(1, 10, 0), enc::flw(2, 10, 8), enc::fsw(2, 10, 16)]);
    rig.env.gpr[10] = 0x3000;
    rig.mem.write_u64(0x3000, 0x4004_0000_0000_0000); // 2.5
    rig.mem.write_u32(0x3008, 0x3fc0_0000); // 1.5f

    rig.run();

    assert_eq!(rig.env.fpr[1], 0x4004_0000_0000_0000);
    assert_eq!(rig.env.fpr[2], 0x3fc0_0000);
    assert_eq!(rig.mem.read_u32(0x3010), 0x3fc0_0000);
}

#[test]
fn fp_load_traps_when_fs_is_clear() {
    let mut rig = rig_with(&[enc::fld(1, 10, 0)]);
    rig.env.mstatus &= !Mstatus::FS.bits();
    rig.env.gpr[10] = 0x3000;
    rig.mem.write_u64(0x3000, 0x4004_0000_0000_0000);

    let (_, exit) = rig.run();

    assert_eq!(exit, BlockExit::Exception(Exception::IllegalInst));
    assert_eq!(rig.env.fpr[1], 0);
}

#[test]
fn fp_store_traps_when_fs_is_clear() {
    let mut rig = rig_with(&[enc::fsw(2, 10, 0)]);
    rig.env.mstatus &= !Mstatus::FS.bits();
    rig.env.gpr[10] = 0x3000;
    rig.env.fpr[2] = 0x3fc0_0000;

    let (_, exit) = rig.run();

    assert_eq!(exit, BlockExit::Exception(Exception::IllegalInst));
    assert_eq!(rig.mem.read_u32(0x3000), 0);
}
