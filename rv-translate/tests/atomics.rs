//! A-extension sequences (emitted as-if-uncontended).

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
fn lr_reads_and_sc_always_succeeds() {
    let mut rig = rig_with(&[enc::lr_w(5, 10), enc::sc_w(6, 10, 11)]);
    rig.env.gpr[10] = 0x3000;
    rig.env.gpr[11] = 99;
    rig.mem.write_u32(0x3000, 0xffff_fff0);

    rig.run();

    // lr.w sign-extends the loaded word
    assert_eq!(rig.env.gpr[5], 0xffff_ffff_ffff_fff0);
    // sc.w stores unconditionally and reports success
    assert_eq!(rig.env.gpr[6], 0);
    assert_eq!(rig.mem.read_u32(0x3000), 99);
}

#[test]
fn amoadd_returns_the_old_value() {
    let mut rig = rig_with(&[enc::amoadd_w(5, 10, 11)]);
    rig.env.gpr[10] = 0x3000;
    rig.env.gpr[11] = 5;
    rig.mem.write_u32(0x3000, 10);

    let (_, exit) = rig.run();

    assert_eq!(rig.env.gpr[5], 10);
    assert_eq!(rig.mem.read_u32(0x3000), 15);
    assert_eq!(exit, BlockExit::Chained(0));
}

#[test]
fn amomax_skips_the_store_when_memory_wins() {
    let mut rig = rig_with(&[enc::amomax_w(5, 10, 11)]);
    rig.env.gpr[10] = 0x3000;
    rig.env.gpr[11] = 3;
    rig.mem.write_u32(0x3000, 7);

    rig.run();

    // memory already satisfies the ordering: store skipped, old value out
    assert_eq!(rig.env.gpr[5], 7);
    assert_eq!(rig.mem.read_u32(0x3000), 7);
}

#[test]
fn amomax_stores_when_the_operand_wins() {
    let mut rig = rig_with(&[enc::amomax_w(5, 10, 11)]);
    rig.env.gpr[10] = 0x3000;
    rig.env.gpr[11] = 9;
    rig.mem.write_u32(0x3000, 7);

    rig.run();

    assert_eq!(rig.env.gpr[5], 7);
    assert_eq!(rig.mem.read_u32(0x3000), 9);
}

#[test]
fn amoswap_d_exchanges() {
    let mut rig = rig_with(&[enc::amoswap_d(5, 10, 11)]);
    rig.env.gpr[10] = 0x3000;
    rig.env.gpr[11] = 0x1111_2222_3333_4444;
    rig.mem.write_u64(0x3000, 0xaaaa_bbbb_cccc_dddd);

    rig.run();

    assert_eq!(rig.env.gpr[5], 0xaaaa_bbbb_cccc_dddd);
    assert_eq!(rig.mem.read_u64(0x3000), 0x1111_2222_3333_4444);
}

#[test]
fn aq_rl_bits_are_ignored() {
    // amoadd.w.aqrl
    let insn = enc::amoadd_w(5, 10, 11) | (0x3 << 25);
    let mut rig = rig_with(&[insn]);
    rig.env.gpr[10] = 0x3000;
    rig.env.gpr[11] = 1;
    rig.mem.write_u32(0x3000, 1);

    rig.run();

    assert_eq!(rig.env.gpr[5], 1);
    assert_eq!(rig.mem.read_u32(0x3000), 2);
}
