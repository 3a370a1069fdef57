//! Reference micro-op interpreter and minimal helper runtime.
//!
//! Executes an [`IrBuffer`] against a [`CpuState`] and a flat little-endian
//! guest memory, with just enough helper semantics (trap latching, CSR
//! read-modify-write, a host-float FP kernel, the real vector kernel) for
//! the integration tests to observe architectural post-states. Requires
//! `std`.

use alloc::{vec, vec::Vec};

use rv_asm::Exception;

use crate::{
    consts::{GuestWord, TARGET_LONG_BITS},
    ir::{Cond, Global, Helper, IrBuffer, Label, LoadKind, MicroOp, StoreKind, TempKind, Value},
    state::{CpuState, MisaExt, Mstatus, Privilege},
    tb::{GuestCode, TranslationBlock, Translator, TranslatorConfig},
    vector,
};

/// Flat guest memory starting at `base`.
#[derive(Debug, Clone)]
pub struct GuestMemory {
    base: GuestWord,
    bytes: Vec<u8>,
}

impl GuestMemory {
    /// Allocate `len` zeroed bytes at guest address `base`.
    pub fn new(base: GuestWord, len: usize) -> Self {
        Self {
            base,
            bytes: vec![0; len],
        }
    }

    fn offset(&self, addr: GuestWord) -> usize {
        addr.checked_sub(self.base).expect("address below guest memory") as usize
    }

    /// Store 32-bit instruction words from `addr`.
    pub fn load_program(&mut self, addr: GuestWord, words: &[u32]) {
        for (i, word) in words.iter().enumerate() {
            self.write_u32(addr + 4 * i as GuestWord, *word);
        }
    }

    /// Store 16-bit instruction parcels from `addr` (compressed streams).
    pub fn load_program16(&mut self, addr: GuestWord, parcels: &[u16]) {
        for (i, parcel) in parcels.iter().enumerate() {
            let off = self.offset(addr + 2 * i as GuestWord);
            self.bytes[off..off + 2].copy_from_slice(&parcel.to_le_bytes());
        }
    }

    /// Read a byte.
    pub fn read_u8(&self, addr: GuestWord) -> u8 {
        self.bytes[self.offset(addr)]
    }

    /// Read a little-endian u16.
    pub fn read_u16(&self, addr: GuestWord) -> u16 {
        let off = self.offset(addr);
        u16::from_le_bytes(self.bytes[off..off + 2].try_into().unwrap())
    }

    /// Read a little-endian u32.
    pub fn read_u32(&self, addr: GuestWord) -> u32 {
        let off = self.offset(addr);
        u32::from_le_bytes(self.bytes[off..off + 4].try_into().unwrap())
    }

    /// Read a little-endian u64.
    pub fn read_u64(&self, addr: GuestWord) -> u64 {
        let off = self.offset(addr);
        u64::from_le_bytes(self.bytes[off..off + 8].try_into().unwrap())
    }

    /// Write a byte.
    pub fn write_u8(&mut self, addr: GuestWord, value: u8) {
        let off = self.offset(addr);
        self.bytes[off] = value;
    }

    /// Write a little-endian u16.
    pub fn write_u16(&mut self, addr: GuestWord, value: u16) {
        let off = self.offset(addr);
        self.bytes[off..off + 2].copy_from_slice(&value.to_le_bytes());
    }

    /// Write a little-endian u32.
    pub fn write_u32(&mut self, addr: GuestWord, value: u32) {
        let off = self.offset(addr);
        self.bytes[off..off + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// Write a little-endian u64.
    pub fn write_u64(&mut self, addr: GuestWord, value: u64) {
        let off = self.offset(addr);
        self.bytes[off..off + 8].copy_from_slice(&value.to_le_bytes());
    }
}

impl GuestCode for GuestMemory {
    fn ldl_code(&self, pc: GuestWord) -> u32 {
        self.read_u32(pc)
    }
}

/// How executing a block ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockExit {
    /// `exit_tb` linked to a chain slot.
    Chained(u8),
    /// Unchained `exit_tb`.
    Unchained,
    /// A helper raised a guest exception (or the debug event).
    Exception(Exception),
}

const WORD_MASK: u64 = GuestWord::MAX as u64;

fn kind_width(kind: TempKind) -> u32 {
    match kind {
        TempKind::Word => TARGET_LONG_BITS,
        TempKind::I64 => 64,
    }
}

struct Machine<'a> {
    buf: &'a IrBuffer,
    env: &'a mut CpuState,
    mem: &'a mut GuestMemory,
    temps: Vec<u64>,
    labels: Vec<Option<usize>>,
}

impl Machine<'_> {
    fn kind(&self, value: Value) -> TempKind {
        match value {
            Value::Global(Global::Fpr(_)) => TempKind::I64,
            Value::Global(_) => TempKind::Word,
            Value::Temp(id) => self.buf.temp_kind(id),
        }
    }

    fn get(&self, value: Value) -> u64 {
        match value {
            Value::Global(Global::Gpr(i)) => self.env.gpr[i as usize] as u64,
            Value::Global(Global::Fpr(i)) => self.env.fpr[i as usize],
            Value::Global(Global::Pc) => self.env.pc as u64,
            Value::Global(Global::LoadRes) => self.env.load_res as u64,
            Value::Temp(id) => self.temps[id as usize],
        }
    }

    fn set(&mut self, value: Value, raw: u64) {
        let masked = match self.kind(value) {
            TempKind::Word => raw & WORD_MASK,
            TempKind::I64 => raw,
        };
        match value {
            Value::Global(Global::Gpr(i)) => self.env.gpr[i as usize] = masked as GuestWord,
            Value::Global(Global::Fpr(i)) => self.env.fpr[i as usize] = masked,
            Value::Global(Global::Pc) => self.env.pc = masked as GuestWord,
            Value::Global(Global::LoadRes) => self.env.load_res = masked as GuestWord,
            Value::Temp(id) => self.temps[id as usize] = masked,
        }
    }

    fn sext(&self, value: Value) -> i64 {
        let raw = self.get(value);
        if kind_width(self.kind(value)) == 32 {
            raw as u32 as i32 as i64
        } else {
            raw as i64
        }
    }

    fn compare(&self, cond: Cond, a: Value, b_raw: u64, b_signed: i64) -> bool {
        let ua = self.get(a);
        let sa = self.sext(a);
        match cond {
            Cond::Eq => ua == b_raw,
            Cond::Ne => ua != b_raw,
            Cond::Lt => sa < b_signed,
            Cond::Ge => sa >= b_signed,
            Cond::Ltu => ua < b_raw,
            Cond::Geu => ua >= b_raw,
            Cond::Gt => sa > b_signed,
            Cond::Gtu => ua > b_raw,
        }
    }

    fn compare_vv(&self, cond: Cond, a: Value, b: Value) -> bool {
        self.compare(cond, a, self.get(b), self.sext(b))
    }

    fn compare_vi(&self, cond: Cond, a: Value, imm: u64) -> bool {
        let signed = if kind_width(self.kind(a)) == 32 {
            imm as u32 as i32 as i64
        } else {
            imm as i64
        };
        self.compare(cond, a, imm, signed)
    }
}

/// Execute a finished block. Traps latch into `env.exception_index`,
/// `mcause`, `mepc` (and `mtval` for address faults) before execution
/// stops.
pub fn execute(buf: &IrBuffer, env: &mut CpuState, mem: &mut GuestMemory) -> BlockExit {
    let mut labels: Vec<Option<usize>> = vec![None; buf.label_count()];
    for (index, op) in buf.ops().iter().enumerate() {
        if let MicroOp::SetLabel { label: Label(id) } = op {
            labels[*id as usize] = Some(index);
        }
    }

    let mut m = Machine {
        temps: vec![0; buf.temp_slots()],
        buf,
        env,
        mem,
        labels,
    };

    let mut pc = 0usize;
    while pc < m.buf.ops().len() {
        let op = &m.buf.ops()[pc];
        pc += 1;
        match op.clone() {
            MicroOp::MovImm { dst, imm } => m.set(dst, imm),
            MicroOp::Mov { dst, src } => {
                let v = m.get(src);
                m.set(dst, v);
            }
            MicroOp::Add { dst, a, b } => {
                let v = m.get(a).wrapping_add(m.get(b));
                m.set(dst, v);
            }
            MicroOp::AddImm { dst, src, imm } => {
                let v = m.get(src).wrapping_add(imm);
                m.set(dst, v);
            }
            MicroOp::Sub { dst, a, b } => {
                let v = m.get(a).wrapping_sub(m.get(b));
                m.set(dst, v);
            }
            MicroOp::And { dst, a, b } => {
                let v = m.get(a) & m.get(b);
                m.set(dst, v);
            }
            MicroOp::AndImm { dst, src, imm } => {
                let v = m.get(src) & imm;
                m.set(dst, v);
            }
            MicroOp::Or { dst, a, b } => {
                let v = m.get(a) | m.get(b);
                m.set(dst, v);
            }
            MicroOp::OrImm { dst, src, imm } => {
                let v = m.get(src) | imm;
                m.set(dst, v);
            }
            MicroOp::Xor { dst, a, b } => {
                let v = m.get(a) ^ m.get(b);
                m.set(dst, v);
            }
            MicroOp::XorImm { dst, src, imm } => {
                let v = m.get(src) ^ imm;
                m.set(dst, v);
            }
            MicroOp::Not { dst, src } => {
                let v = !m.get(src);
                m.set(dst, v);
            }
            MicroOp::Shl { dst, a, b } => {
                let width = kind_width(m.kind(dst));
                let amount = (m.get(b) as u32) & (width - 1);
                let v = m.get(a) << amount;
                m.set(dst, v);
            }
            MicroOp::ShlImm { dst, src, amount } => {
                let width = kind_width(m.kind(dst));
                let v = m.get(src) << (amount & (width - 1));
                m.set(dst, v);
            }
            MicroOp::Shr { dst, a, b } => {
                let width = kind_width(m.kind(dst));
                let amount = (m.get(b) as u32) & (width - 1);
                let v = m.get(a) >> amount;
                m.set(dst, v);
            }
            MicroOp::ShrImm { dst, src, amount } => {
                let width = kind_width(m.kind(dst));
                let v = m.get(src) >> (amount & (width - 1));
                m.set(dst, v);
            }
            MicroOp::Sar { dst, a, b } => {
                let width = kind_width(m.kind(dst));
                let amount = (m.get(b) as u32) & (width - 1);
                let v = (m.sext(a) >> amount) as u64;
                m.set(dst, v);
            }
            MicroOp::SarImm { dst, src, amount } => {
                let width = kind_width(m.kind(dst));
                let v = (m.sext(src) >> (amount & (width - 1))) as u64;
                m.set(dst, v);
            }
            MicroOp::Mul { dst, a, b } => {
                let v = m.get(a).wrapping_mul(m.get(b));
                m.set(dst, v);
            }
            MicroOp::Muls2 { lo, hi, a, b } => {
                let width = kind_width(m.kind(lo));
                let product = (m.sext(a) as i128).wrapping_mul(m.sext(b) as i128);
                let lo_v = product as u64;
                let hi_v = (product >> width) as u64;
                m.set(lo, lo_v);
                m.set(hi, hi_v);
            }
            MicroOp::Mulu2 { lo, hi, a, b } => {
                let width = kind_width(m.kind(lo));
                let product = (m.get(a) as u128).wrapping_mul(m.get(b) as u128);
                let lo_v = product as u64;
                let hi_v = (product >> width) as u64;
                m.set(lo, lo_v);
                m.set(hi, hi_v);
            }
            MicroOp::Div { dst, a, b } => {
                let (sa, sb) = (m.sext(a), m.sext(b));
                let v = if sb == 0 { 0 } else { sa.wrapping_div(sb) };
                m.set(dst, v as u64);
            }
            MicroOp::Divu { dst, a, b } => {
                let (ua, ub) = (m.get(a), m.get(b));
                let v = if ub == 0 { 0 } else { ua / ub };
                m.set(dst, v);
            }
            MicroOp::Rem { dst, a, b } => {
                let (sa, sb) = (m.sext(a), m.sext(b));
                let v = if sb == 0 { 0 } else { sa.wrapping_rem(sb) };
                m.set(dst, v as u64);
            }
            MicroOp::Remu { dst, a, b } => {
                let (ua, ub) = (m.get(a), m.get(b));
                let v = if ub == 0 { 0 } else { ua % ub };
                m.set(dst, v);
            }
            MicroOp::Ext32S { dst, src } => {
                let v = m.get(src) as u32 as i32 as i64 as u64;
                m.set(dst, v);
            }
            MicroOp::Ext32U { dst, src } => {
                let v = m.get(src) as u32 as u64;
                m.set(dst, v);
            }
            MicroOp::ExtuTo64 { dst, src } => {
                let v = m.get(src) & WORD_MASK;
                m.set(dst, v);
            }
            MicroOp::Setcond { cond, dst, a, b } => {
                let v = m.compare_vv(cond, a, b) as u64;
                m.set(dst, v);
            }
            MicroOp::SetcondImm { cond, dst, a, imm } => {
                let v = m.compare_vi(cond, a, imm) as u64;
                m.set(dst, v);
            }
            MicroOp::Movcond {
                cond,
                dst,
                c1,
                c2,
                vtrue,
                vfalse,
            } => {
                let v = if m.compare_vv(cond, c1, c2) {
                    m.get(vtrue)
                } else {
                    m.get(vfalse)
                };
                m.set(dst, v);
            }
            MicroOp::LoadMstatus { dst } => {
                let v = m.env.mstatus as u64;
                m.set(dst, v);
            }
            MicroOp::Load {
                kind,
                dst,
                addr,
                mem_idx: _,
            } => {
                let addr = m.get(addr) as GuestWord;
                let v = match kind {
                    LoadKind::Ld8S => m.mem.read_u8(addr) as i8 as i64 as u64,
                    LoadKind::Ld8U => m.mem.read_u8(addr) as u64,
                    LoadKind::Ld16S => m.mem.read_u16(addr) as i16 as i64 as u64,
                    LoadKind::Ld16U => m.mem.read_u16(addr) as u64,
                    LoadKind::Ld32S => m.mem.read_u32(addr) as i32 as i64 as u64,
                    LoadKind::Ld32U => m.mem.read_u32(addr) as u64,
                    LoadKind::Ld64 => m.mem.read_u64(addr),
                };
                m.set(dst, v);
            }
            MicroOp::Store {
                kind,
                src,
                addr,
                mem_idx: _,
            } => {
                let addr = m.get(addr) as GuestWord;
                let v = m.get(src);
                match kind {
                    StoreKind::St8 => m.mem.write_u8(addr, v as u8),
                    StoreKind::St16 => m.mem.write_u16(addr, v as u16),
                    StoreKind::St32 => m.mem.write_u32(addr, v as u32),
                    StoreKind::St64 => m.mem.write_u64(addr, v),
                }
            }
            MicroOp::SetLabel { .. } => {}
            MicroOp::Br { label } => {
                pc = m.labels[label.0 as usize].expect("branch to unbound label") + 1;
            }
            MicroOp::Brcond { cond, a, b, label } => {
                if m.compare_vv(cond, a, b) {
                    pc = m.labels[label.0 as usize].expect("branch to unbound label") + 1;
                }
            }
            MicroOp::BrcondImm { cond, a, imm, label } => {
                if m.compare_vi(cond, a, imm) {
                    pc = m.labels[label.0 as usize].expect("branch to unbound label") + 1;
                }
            }
            MicroOp::GotoTb { .. } => {}
            MicroOp::ExitTb { link } => {
                return match link {
                    Some(slot) => BlockExit::Chained(slot),
                    None => BlockExit::Unchained,
                };
            }
            MicroOp::Call { helper, ret, args } => {
                let arg_values: Vec<u64> = args.iter().map(|a| m.get(*a)).collect();
                match dispatch_helper(helper, m.env, &arg_values) {
                    Ok(Some(value)) => {
                        if let Some(ret) = ret {
                            m.set(ret, value);
                        }
                    }
                    Ok(None) => {}
                    Err(excp) => {
                        latch_trap(m.env, excp);
                        return BlockExit::Exception(excp);
                    }
                }
            }
        }
    }
    // a well-formed block never falls off the end
    BlockExit::Unchained
}

fn latch_trap(env: &mut CpuState, excp: Exception) {
    env.exception_index = Some(excp);
    if excp != Exception::Debug {
        env.mcause = excp.code() as GuestWord;
        env.mepc = env.pc;
    }
}

fn csr_read(env: &CpuState, csr: u32) -> Result<GuestWord, Exception> {
    Ok(match csr {
        0x100 => env.mstatus, // sstatus view, unfiltered here
        0x104 => env.mie,
        0x105 => env.stvec,
        0x140 => env.sscratch,
        0x141 => env.sepc,
        0x142 => env.scause,
        0x143 => env.stval,
        0x144 => env.mip,
        0x300 => env.mstatus,
        0x301 => env.misa,
        0x302 => env.medeleg,
        0x303 => env.mideleg,
        0x304 => env.mie,
        0x305 => env.mtvec,
        0x340 => env.mscratch,
        0x341 => env.mepc,
        0x342 => env.mcause,
        0x343 => env.mtval,
        0x344 => env.mip,
        0xf14 => env.mhartid,
        _ => return Err(Exception::IllegalInst),
    })
}

fn csr_write(env: &mut CpuState, csr: u32, value: GuestWord) -> Result<(), Exception> {
    match csr {
        0x100 => env.mstatus = value,
        0x104 => env.mie = value,
        0x105 => env.stvec = value,
        0x140 => env.sscratch = value,
        0x141 => env.sepc = value,
        0x142 => env.scause = value,
        0x143 => env.stval = value,
        0x144 => env.mip = value,
        0x300 => env.mstatus = value,
        0x301 => env.misa = value & env.misa_mask,
        0x302 => env.medeleg = value,
        0x303 => env.mideleg = value,
        0x304 => env.mie = value,
        0x305 => env.mtvec = value,
        0x340 => env.mscratch = value,
        0x341 => env.mepc = value,
        0x342 => env.mcause = value,
        0x343 => env.mtval = value,
        0x344 => env.mip = value,
        _ => return Err(Exception::IllegalInst),
    }
    Ok(())
}

fn f32_of(bits: u64) -> f32 {
    f32::from_bits(bits as u32)
}

fn f64_of(bits: u64) -> f64 {
    f64::from_bits(bits)
}

fn fclass_bits(sign: bool, class: core::num::FpCategory, signalling: bool) -> u64 {
    use core::num::FpCategory::*;
    match (sign, class) {
        (true, Infinite) => 1 << 0,
        (true, Normal) => 1 << 1,
        (true, Subnormal) => 1 << 2,
        (true, Zero) => 1 << 3,
        (false, Zero) => 1 << 4,
        (false, Subnormal) => 1 << 5,
        (false, Normal) => 1 << 6,
        (false, Infinite) => 1 << 7,
        (_, Nan) => {
            if signalling {
                1 << 8
            } else {
                1 << 9
            }
        }
    }
}

#[allow(clippy::too_many_lines)]
fn dispatch_helper(
    helper: Helper,
    env: &mut CpuState,
    args: &[u64],
) -> Result<Option<u64>, Exception> {
    use Helper::*;

    let s1 = |bits: &[u64]| f32_of(bits[0]);
    let d1 = |bits: &[u64]| f64_of(bits[0]);

    Ok(match helper {
        RaiseException => {
            let code = args[0] as u32;
            return Err(Exception::try_from(code).unwrap_or(Exception::IllegalInst));
        }
        RaiseExceptionBadaddr => {
            let code = args[0] as u32;
            env.mtval = args[1] as GuestWord;
            return Err(Exception::try_from(code).unwrap_or(Exception::IllegalInst));
        }
        RaiseExceptionDebug => return Err(Exception::Debug),
        Csrrw => {
            let old = csr_read(env, args[1] as u32)?;
            csr_write(env, args[1] as u32, args[0] as GuestWord)?;
            Some(old as u64)
        }
        Csrrs => {
            let old = csr_read(env, args[1] as u32)?;
            if args[2] != 0 {
                csr_write(env, args[1] as u32, old | args[0] as GuestWord)?;
            }
            Some(old as u64)
        }
        Csrrc => {
            let old = csr_read(env, args[1] as u32)?;
            if args[2] != 0 {
                csr_write(env, args[1] as u32, old & !(args[0] as GuestWord))?;
            }
            Some(old as u64)
        }
        Sret => {
            let spp = env.mstatus & Mstatus::SPP.bits() != 0;
            let spie = env.mstatus & Mstatus::SPIE.bits() != 0;
            env.mstatus &= !(Mstatus::SIE.bits() | Mstatus::SPP.bits());
            if spie {
                env.mstatus |= Mstatus::SIE.bits();
            }
            env.mstatus |= Mstatus::SPIE.bits();
            env.privilege = if spp {
                Privilege::Supervisor
            } else {
                Privilege::User
            };
            Some(env.sepc as u64)
        }
        Mret => {
            let mpp = (env.mstatus & Mstatus::MPP.bits()) >> 11;
            let mpie = env.mstatus & Mstatus::MPIE.bits() != 0;
            env.mstatus &= !(Mstatus::MIE.bits() | Mstatus::MPP.bits());
            if mpie {
                env.mstatus |= Mstatus::MIE.bits();
            }
            env.mstatus |= Mstatus::MPIE.bits();
            env.privilege = match mpp {
                3 => Privilege::Machine,
                1 => Privilege::Supervisor,
                _ => Privilege::User,
            };
            Some(env.mepc as u64)
        }
        Wfi | TlbFlush | FenceI => None,
        FaddS => Some((f32_of(args[0]) + f32_of(args[1])).to_bits() as u64),
        FsubS => Some((f32_of(args[0]) - f32_of(args[1])).to_bits() as u64),
        FmulS => Some((f32_of(args[0]) * f32_of(args[1])).to_bits() as u64),
        FdivS => Some((f32_of(args[0]) / f32_of(args[1])).to_bits() as u64),
        FsqrtS => Some(s1(args).sqrt().to_bits() as u64),
        FminS => Some(s1(args).min(f32_of(args[1])).to_bits() as u64),
        FmaxS => Some(s1(args).max(f32_of(args[1])).to_bits() as u64),
        FmaddS => Some(s1(args).mul_add(f32_of(args[1]), f32_of(args[2])).to_bits() as u64),
        FmsubS => Some(s1(args).mul_add(f32_of(args[1]), -f32_of(args[2])).to_bits() as u64),
        FnmsubS => Some((-s1(args)).mul_add(f32_of(args[1]), f32_of(args[2])).to_bits() as u64),
        FnmaddS => Some((-s1(args)).mul_add(f32_of(args[1]), -f32_of(args[2])).to_bits() as u64),
        FeqS => Some((s1(args) == f32_of(args[1])) as u64),
        FltS => Some((s1(args) < f32_of(args[1])) as u64),
        FleS => Some((s1(args) <= f32_of(args[1])) as u64),
        FclassS => {
            let v = s1(args);
            Some(fclass_bits(
                v.is_sign_negative(),
                v.classify(),
                v.is_nan() && v.to_bits() & 0x0040_0000 == 0,
            ))
        }
        FcvtWS => Some(s1(args) as i32 as i64 as u64),
        FcvtWuS => Some(s1(args) as u32 as i32 as i64 as u64),
        FcvtLS => Some(s1(args) as i64 as u64),
        FcvtLuS => Some(s1(args) as u64),
        FcvtSW => Some((args[0] as u32 as i32 as f32).to_bits() as u64),
        FcvtSWu => Some((args[0] as u32 as f32).to_bits() as u64),
        FcvtSL => Some((args[0] as i64 as f32).to_bits() as u64),
        FcvtSLu => Some((args[0] as f32).to_bits() as u64),
        FaddD => Some((f64_of(args[0]) + f64_of(args[1])).to_bits()),
        FsubD => Some((f64_of(args[0]) - f64_of(args[1])).to_bits()),
        FmulD => Some((f64_of(args[0]) * f64_of(args[1])).to_bits()),
        FdivD => Some((f64_of(args[0]) / f64_of(args[1])).to_bits()),
        FsqrtD => Some(d1(args).sqrt().to_bits()),
        FminD => Some(d1(args).min(f64_of(args[1])).to_bits()),
        FmaxD => Some(d1(args).max(f64_of(args[1])).to_bits()),
        FmaddD => Some(d1(args).mul_add(f64_of(args[1]), f64_of(args[2])).to_bits()),
        FmsubD => Some(d1(args).mul_add(f64_of(args[1]), -f64_of(args[2])).to_bits()),
        FnmsubD => Some((-d1(args)).mul_add(f64_of(args[1]), f64_of(args[2])).to_bits()),
        FnmaddD => Some((-d1(args)).mul_add(f64_of(args[1]), -f64_of(args[2])).to_bits()),
        FeqD => Some((d1(args) == f64_of(args[1])) as u64),
        FltD => Some((d1(args) < f64_of(args[1])) as u64),
        FleD => Some((d1(args) <= f64_of(args[1])) as u64),
        FclassD => {
            let v = d1(args);
            Some(fclass_bits(
                v.is_sign_negative(),
                v.classify(),
                v.is_nan() && v.to_bits() & 0x0008_0000_0000_0000 == 0,
            ))
        }
        FcvtWD => Some(d1(args) as i32 as i64 as u64),
        FcvtWuD => Some(d1(args) as u32 as i32 as i64 as u64),
        FcvtLD => Some(d1(args) as i64 as u64),
        FcvtLuD => Some(d1(args) as u64),
        FcvtDW => Some((args[0] as u32 as i32 as f64).to_bits()),
        FcvtDWu => Some((args[0] as u32 as f64).to_bits()),
        FcvtDL => Some((args[0] as i64 as f64).to_bits()),
        FcvtDLu => Some((args[0] as f64).to_bits()),
        FcvtSD => Some((d1(args) as f32).to_bits() as u64),
        FcvtDS => Some((s1(args) as f64).to_bits()),
        Vsetvl => Some(vector::vsetvl(
            env,
            args[0] as u32,
            args[1] as u32,
            args[2] as GuestWord,
            args[3] as GuestWord,
            args[4] != 0,
        )? as u64),
        VmvIvi => {
            vector::vmv_ivi(env, args[0] as u32, args[1] as i64)?;
            None
        }
        VmvIvv => {
            vector::vmv_ivv(env, args[0] as u32, args[1] as u32)?;
            None
        }
        VmergeIvv => {
            vector::vmerge_ivv(env, args[0] as u32, args[1] as u32, args[2] as u32)?;
            None
        }
        VmergeIvi => {
            vector::vmerge_ivi(env, args[0] as u32, args[1] as u32, args[2] as i64)?;
            None
        }
        VcompressMvv => {
            vector::vcompress_mvv(env, args[0] as u32, args[1] as u32, args[2] as u32)?;
            None
        }
        VadcVvm => {
            vector::vadc_vvm(env, args[0] as u32, args[1] as u32, args[2] as u32)?;
            None
        }
        VmadcVv => {
            vector::vmadc_vv(env, args[0] as u32, args[1] as u32, args[2] as u32)?;
            None
        }
        VmadcVvm => {
            vector::vmadc_vvm(env, args[0] as u32, args[1] as u32, args[2] as u32)?;
            None
        }
        VsbcVvm => {
            vector::vsbc_vvm(env, args[0] as u32, args[1] as u32, args[2] as u32)?;
            None
        }
        VmsbcVv => {
            vector::vmsbc_vv(env, args[0] as u32, args[1] as u32, args[2] as u32)?;
            None
        }
        VmsbcVvm => {
            vector::vmsbc_vvm(env, args[0] as u32, args[1] as u32, args[2] as u32)?;
            None
        }
        VadcVi => {
            vector::vadc_vi(env, args[0] as u32, args[1] as u32, args[2])?;
            None
        }
        VmadcVi => {
            vector::vmadc_vi(env, args[0] as u32, args[1] as u32, args[2])?;
            None
        }
        VmadcVim => {
            vector::vmadc_vim(env, args[0] as u32, args[1] as u32, args[2])?;
            None
        }
        VsbcVi => {
            vector::vsbc_vi(env, args[0] as u32, args[1] as u32, args[2])?;
            None
        }
        VmsbcVi => {
            vector::vmsbc_vi(env, args[0] as u32, args[1] as u32, args[2])?;
            None
        }
        VmsbcVim => {
            vector::vmsbc_vim(env, args[0] as u32, args[1] as u32, args[2])?;
            None
        }
    })
}

/// A prebuilt translation-and-execution rig for tests: full-featured
/// `misa`, FS and VS enabled, 64 KiB of guest memory covering the start
/// PC.
#[derive(Debug)]
pub struct TestRig {
    /// The translator under test.
    pub translator: Translator,
    /// Guest state.
    pub env: CpuState,
    /// Flat guest memory.
    pub mem: GuestMemory,
}

impl TestRig {
    /// Rig with the default configuration.
    pub fn new() -> Self {
        let mut env = CpuState::new(
            MisaExt::I
                | MisaExt::M
                | MisaExt::A
                | MisaExt::F
                | MisaExt::D
                | MisaExt::C
                | MisaExt::S
                | MisaExt::U
                | MisaExt::V,
            16,
        );
        env.mstatus |= Mstatus::FS.bits() | Mstatus::VS.bits();
        Self {
            translator: Translator::default(),
            env,
            mem: GuestMemory::new(0, 0x1_0000),
        }
    }

    /// Rig without the compressed extension.
    pub fn without_rvc() -> Self {
        let mut rig = Self::new();
        rig.env.misa &= !MisaExt::C.bits();
        rig.env.misa_mask = rig.env.misa;
        rig
    }

    /// Cap the per-block instruction budget.
    pub fn limit_insns(&mut self, max_insns: usize) {
        self.translator = Translator::new(TranslatorConfig {
            max_insns,
            ..TranslatorConfig::default()
        });
    }

    /// Place 32-bit instruction words at the current PC.
    pub fn load(&mut self, words: &[u32]) {
        self.mem.load_program(self.env.pc, words);
    }

    /// Place 16-bit parcels at the current PC.
    pub fn load16(&mut self, parcels: &[u16]) {
        self.mem.load_program16(self.env.pc, parcels);
    }

    /// Translate one block at the current PC.
    pub fn translate(&mut self) -> (TranslationBlock, crate::ir::IrBuffer) {
        let mut tb = TranslationBlock::new(self.env.pc);
        let buf = self.translator.translate_block(&self.env, &self.mem, &mut tb);
        (tb, buf)
    }

    /// Translate one block at the current PC and execute it.
    pub fn run(&mut self) -> (TranslationBlock, BlockExit) {
        let (tb, buf) = self.translate();
        let exit = execute(&buf, &mut self.env, &mut self.mem);
        (tb, exit)
    }
}

impl Default for TestRig {
    fn default() -> Self {
        Self::new()
    }
}
