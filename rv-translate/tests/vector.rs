//! Vector configuration and element ops through the full decode + helper
//! pipeline.

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

/// Write a 32-bit element into a vector register directly.
fn set_e32(rig: &mut TestRig, reg: u32, index: usize, value: u32) {
    rig.env.v_mut(reg)[index * 4..index * 4 + 4].copy_from_slice(&value.to_le_bytes());
}

fn get_e32(rig: &TestRig, reg: u32, index: usize) -> u32 {
    u32::from_le_bytes(rig.env.v(reg)[index * 4..index * 4 + 4].try_into().unwrap())
}

#[test]
fn vsetvli_configures_and_writes_vl() {
    let mut rig = rig_with(&[enc::vsetvli(1, 2, 0x10)]); // e32, m1
    rig.env.gpr[2] = 100;

    let (_, exit) = rig.run();

    assert_eq!(rig.env.vsew, 32);
    assert_eq!(rig.env.vlmax, 4);
    assert_eq!(rig.env.vl, 4);
    assert_eq!(rig.env.gpr[1], 4);
    assert_eq!(rig.env.vstart, 0);
    assert!(!rig.env.vill);
    assert_eq!(exit, BlockExit::Chained(0));
}

#[test]
fn vsetvli_clamps_to_avl() {
    let mut rig = rig_with(&[enc::vsetvli(1, 2, 0x10)]);
    rig.env.gpr[2] = 3;

    rig.run();

    assert_eq!(rig.env.vl, 3);
    assert_eq!(rig.env.gpr[1], 3);
}

#[test]
fn vsetivli_takes_the_immediate_avl() {
    let mut rig = rig_with(&[enc::vsetivli(1, 2, 0x10)]);

    rig.run();

    assert_eq!(rig.env.vl, 2);
    assert_eq!(rig.env.gpr[1], 2);
}

#[test]
fn vector_ops_require_the_misa_bit() {
    let mut rig = rig_with(&[enc::vsetvli(1, 2, 0x10)]);
    rig.env.misa &= !MisaExt::V.bits();

    let (_, exit) = rig.run();

    assert_eq!(exit, BlockExit::Exception(Exception::IllegalInst));
}

#[test]
fn vector_ops_require_the_vs_gate() {
    let mut rig = rig_with(&[enc::vsetvli(1, 2, 0x10)]);
    rig.env.mstatus &= !Mstatus::VS.bits();
    rig.env.gpr[2] = 4;

    let (_, exit) = rig.run();

    assert_eq!(exit, BlockExit::Exception(Exception::IllegalInst));
}

#[test]
fn vmv_v_i_splats_through_decode() {
    let mut rig = rig_with(&[enc::vsetvli(1, 2, 0x10), enc::vmv_v_i(3, -5)]);
    rig.env.gpr[2] = 4;

    rig.run();

    for i in 0..4 {
        assert_eq!(get_e32(&rig, 3, i), (-5i32) as u32);
    }
}

#[test]
fn vadc_vvm_adds_the_mask_carry_through_decode() {
    let mut rig = rig_with(&[enc::vsetvli(1, 2, 0x10), enc::vadc_vvm(3, 4, 5)]);
    rig.env.gpr[2] = 4;
    rig.env.v_mut(0)[0] = 0b1010;
    for i in 0..4 {
        set_e32(&mut rig, 4, i, 100);
        set_e32(&mut rig, 5, i, 10);
    }

    rig.run();

    assert_eq!(get_e32(&rig, 3, 0), 110);
    assert_eq!(get_e32(&rig, 3, 1), 111);
    assert_eq!(get_e32(&rig, 3, 2), 110);
    assert_eq!(get_e32(&rig, 3, 3), 111);
}

#[test]
fn vmerge_vim_selects_through_decode() {
    let mut rig = rig_with(&[enc::vsetvli(1, 2, 0x10), enc::vmerge_vim(3, 4, 7)]);
    rig.env.gpr[2] = 2;
    rig.env.v_mut(0)[0] = 0b01;
    set_e32(&mut rig, 4, 0, 1000);
    set_e32(&mut rig, 4, 1, 2000);

    rig.run();

    assert_eq!(get_e32(&rig, 3, 0), 7);
    assert_eq!(get_e32(&rig, 3, 1), 2000);
}

#[test]
fn vcompress_packs_through_decode() {
    let mut rig = rig_with(&[enc::vsetvli(1, 2, 0x10), enc::vcompress_vm(3, 4, 5)]);
    rig.env.gpr[2] = 4;
    rig.env.v_mut(5)[0] = 0b1100;
    for i in 0..4 {
        set_e32(&mut rig, 4, i, 50 + i as u32);
    }

    rig.run();

    assert_eq!(get_e32(&rig, 3, 0), 52);
    assert_eq!(get_e32(&rig, 3, 1), 53);
}

#[test]
fn unknown_vector_encodings_are_illegal() {
    // OPIVV funct6 0x00 (vadd) is not part of the helper subset
    let vadd_vv = (0x00 << 26) | (1 << 25) | (4 << 20) | (5 << 15) | (0x0 << 12) | (3 << 7) | 0x57;
    let mut rig = rig_with(&[vadd_vv]);

    let (_, exit) = rig.run();

    assert_eq!(exit, BlockExit::Exception(Exception::IllegalInst));
}
