//! Integer ALU behaviour observed through translated blocks.

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
fn add_produces_a_stopped_chained_block() {
    let mut rig = rig_with(&[enc::add(10, 10, 11)]);
    rig.env.gpr[10] = 7;
    rig.env.gpr[11] = (-3i64) as u64;

    let (tb, exit) = rig.run();

    assert_eq!(rig.env.gpr[10], 4);
    assert_eq!(rig.env.pc, 0x1004);
    assert_eq!(tb.icount, 1);
    assert_eq!(tb.size, 4);
    assert_eq!(exit, BlockExit::Chained(0));
}

#[test]
fn writes_to_x0_are_discarded() {
    let mut rig = rig_with(&[enc::addi(0, 0, 42), enc::add(0, 11, 11)]);
    rig.env.gpr[11] = 1000;

    rig.run();

    assert_eq!(rig.env.gpr[0], 0);
}

#[test]
fn x0_reads_as_zero() {
    let mut rig = rig_with(&[enc::add(5, 0, 0)]);
    rig.env.gpr[5] = 0xdead;

    rig.run();

    assert_eq!(rig.env.gpr[5], 0);
}

#[test]
fn lui_and_auipc_materialise_immediates() {
    let mut rig = rig_with(&[enc::lui(5, 0x12345), enc::auipc(6, 1)]);

    rig.run();

    assert_eq!(rig.env.gpr[5], 0x1234_5000);
    // auipc executes at 0x1004
    assert_eq!(rig.env.gpr[6], 0x1004 + 0x1000);
}

#[test]
fn lui_sign_extends() {
    let mut rig = rig_with(&[enc::lui(5, -1)]);

    rig.run();

    assert_eq!(rig.env.gpr[5], 0xffff_ffff_ffff_f000);
}

#[test]
fn register_shifts_mask_the_amount() {
    let mut rig = rig_with(&[enc::sll(5, 6, 7), enc::srl(8, 6, 7), enc::sra(9, 10, 7)]);
    rig.env.gpr[6] = 1;
    rig.env.gpr[7] = 68; // 68 mod 64 == 4
    rig.env.gpr[10] = (-16i64) as u64;

    rig.run();

    assert_eq!(rig.env.gpr[5], 16);
    assert_eq!(rig.env.gpr[8], 0);
    assert_eq!(rig.env.gpr[9], (-1i64) as u64);
}

#[test]
fn w_shifts_mask_to_five_bits_and_sign_extend() {
    let mut rig = rig_with(&[enc::sllw(5, 6, 7), enc::sraw(8, 9, 7), enc::srlw(10, 9, 7)]);
    rig.env.gpr[6] = 1 << 30;
    rig.env.gpr[7] = 33; // 33 mod 32 == 1
    rig.env.gpr[9] = 0x8000_0000; // negative as a 32-bit value

    rig.run();

    assert_eq!(rig.env.gpr[5], 0xffff_ffff_8000_0000);
    assert_eq!(rig.env.gpr[8], 0xffff_ffff_c000_0000);
    assert_eq!(rig.env.gpr[10], 0x4000_0000);
}

#[test_case::test_case(enc::slli(5, 6, 64); "slli shamt 64")]
#[test_case::test_case(enc::srai(5, 6, 64); "srai shamt 64")]
#[test_case::test_case(enc::slliw(5, 6, 32); "slliw shamt 32")]
#[test_case::test_case(enc::sraiw(5, 6, 32); "sraiw shamt 32")]
fn immediate_shift_out_of_range_is_illegal(insn: u32) {
    use rv_translate::prelude::Exception;

    let mut rig = rig_with(&[insn]);
    let (_, exit) = rig.run();
    assert_eq!(exit, BlockExit::Exception(Exception::IllegalInst));
}

#[test]
fn srai_flag_selects_arithmetic_shift() {
    let mut rig = rig_with(&[enc::srai(5, 6, 4), enc::srli(7, 6, 4)]);
    rig.env.gpr[6] = (-256i64) as u64;

    rig.run();

    assert_eq!(rig.env.gpr[5], (-16i64) as u64);
    assert_eq!(rig.env.gpr[7], 0x0fff_ffff_ffff_fff0);
}

#[test]
fn div_signed_overflow_returns_the_dividend() {
    let mut rig = rig_with(&[enc::div(10, 10, 11)]);
    rig.env.gpr[10] = 0x8000_0000_0000_0000;
    rig.env.gpr[11] = u64::MAX;

    let (_, exit) = rig.run();

    assert_eq!(rig.env.gpr[10], 0x8000_0000_0000_0000);
    assert_eq!(exit, BlockExit::Chained(0));
}

#[test]
fn div_by_zero_returns_all_ones() {
    let mut rig = rig_with(&[enc::div(10, 10, 11)]);
    rig.env.gpr[10] = 12345;
    rig.env.gpr[11] = 0;

    rig.run();

    assert_eq!(rig.env.gpr[10], u64::MAX);
}

#[test]
fn divu_by_zero_returns_all_ones() {
    let mut rig = rig_with(&[enc::divu(10, 10, 11)]);
    rig.env.gpr[10] = 12345;
    rig.env.gpr[11] = 0;

    rig.run();

    assert_eq!(rig.env.gpr[10], u64::MAX);
}

#[test]
fn rem_corner_cases() {
    // signed overflow: remainder is zero
    let mut rig = rig_with(&[enc::rem(5, 10, 11)]);
    rig.env.gpr[10] = 0x8000_0000_0000_0000;
    rig.env.gpr[11] = u64::MAX;
    rig.run();
    assert_eq!(rig.env.gpr[5], 0);

    // divide by zero: remainder is the dividend
    let mut rig = rig_with(&[enc::rem(5, 10, 11)]);
    rig.env.gpr[10] = 77;
    rig.env.gpr[11] = 0;
    rig.run();
    assert_eq!(rig.env.gpr[5], 77);

    let mut rig = rig_with(&[enc::remu(5, 10, 11)]);
    rig.env.gpr[10] = 77;
    rig.env.gpr[11] = 0;
    rig.run();
    assert_eq!(rig.env.gpr[5], 77);
}

#[test]
fn plain_division_still_divides() {
    let mut rig = rig_with(&[enc::div(5, 10, 11), enc::rem(6, 10, 11)]);
    rig.env.gpr[10] = (-7i64) as u64;
    rig.env.gpr[11] = 2;

    rig.run();

    assert_eq!(rig.env.gpr[5], (-3i64) as u64);
    assert_eq!(rig.env.gpr[6], (-1i64) as u64);
}

#[test]
fn divw_uses_32_bit_operands_and_sign_extends() {
    let mut rig = rig_with(&[enc::divw(5, 10, 11)]);
    rig.env.gpr[10] = 0x8000_0000; // INT32_MIN once truncated
    rig.env.gpr[11] = u64::MAX;

    rig.run();

    assert_eq!(rig.env.gpr[5], 0xffff_ffff_8000_0000);

    let mut rig = rig_with(&[enc::remw(5, 10, 11)]);
    rig.env.gpr[10] = 0x8000_0000;
    rig.env.gpr[11] = u64::MAX;
    rig.run();
    assert_eq!(rig.env.gpr[5], 0);
}

#[test]
fn addw_wraps_and_sign_extends_from_bit_31() {
    let mut rig = rig_with(&[enc::addw(5, 6, 7)]);
    rig.env.gpr[6] = 0x7fff_ffff;
    rig.env.gpr[7] = 1;

    rig.run();

    assert_eq!(rig.env.gpr[5], 0xffff_ffff_8000_0000);
}

#[test]
fn high_multiplies() {
    let mut rig = rig_with(&[enc::mulh(5, 10, 11), enc::mulhu(6, 10, 11), enc::mulhsu(7, 10, 11)]);
    rig.env.gpr[10] = u64::MAX; // -1 signed
    rig.env.gpr[11] = u64::MAX;

    rig.run();

    // (-1) * (-1) = 1, high word 0
    assert_eq!(rig.env.gpr[5], 0);
    // unsigned: (2^64-1)^2 high word
    assert_eq!(rig.env.gpr[6], 0xffff_ffff_ffff_fffe);
    // signed * unsigned: -(2^64-1) high word
    assert_eq!(rig.env.gpr[7], u64::MAX);
}

#[test]
fn mul_low_half() {
    let mut rig = rig_with(&[enc::mul(5, 10, 11)]);
    rig.env.gpr[10] = 0x1_0000_0001;
    rig.env.gpr[11] = 7;

    rig.run();

    assert_eq!(rig.env.gpr[5], 0x7_0000_0007);
}
