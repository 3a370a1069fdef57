//! The micro-op language and its emitter.
//!
//! Translators append abstract, target-independent micro-ops to an
//! [`IrBuilder`]; a host back end lowers the finished [`IrBuffer`] later.
//! Guest registers are pre-allocated *globals*; everything else flows
//! through SSA-style temporaries that must be released before the end of
//! the instruction that allocated them (the driver checks).

use alloc::vec::Vec;

/// Identifier of a temporary.
pub type TempId = u32;

/// A forward-branch target inside one emitted instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(pub u32);

/// Pre-allocated globals backed by guest state fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Global {
    /// Integer register `x1..x31`. `x0` is never allocated.
    Gpr(u8),
    /// Floating-point register, 64-bit wide.
    Fpr(u8),
    /// The guest program counter.
    Pc,
    /// The LR/SC reservation latch.
    LoadRes,
}

/// An IR operand: a global or a temporary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    /// A guest-state global.
    Global(Global),
    /// A temporary allocated by the builder.
    Temp(TempId),
}

impl Value {
    /// The program-counter global.
    pub const PC: Value = Value::Global(Global::Pc);

    /// Integer register global. Register 0 has no backing global; callers
    /// must special-case it.
    pub fn gpr(index: u32) -> Value {
        debug_assert!(index > 0 && index < 32, "x0 is not an allocated global");
        Value::Global(Global::Gpr(index as u8))
    }

    /// Floating-point register global.
    pub fn fpr(index: u32) -> Value {
        debug_assert!(index < 32);
        Value::Global(Global::Fpr(index as u8))
    }
}

/// Width class of a temporary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempKind {
    /// Guest-word width.
    Word,
    /// Explicit 64 bits (floating-point values, helper immediates).
    I64,
}

/// Comparison conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cond {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Signed less-than.
    Lt,
    /// Signed greater-or-equal.
    Ge,
    /// Unsigned less-than.
    Ltu,
    /// Unsigned greater-or-equal.
    Geu,
    /// Signed greater-than.
    Gt,
    /// Unsigned greater-than.
    Gtu,
}

/// Guest memory load flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadKind {
    /// 8-bit sign-extending.
    Ld8S,
    /// 8-bit zero-extending.
    Ld8U,
    /// 16-bit sign-extending.
    Ld16S,
    /// 16-bit zero-extending.
    Ld16U,
    /// 32-bit sign-extending.
    Ld32S,
    /// 32-bit zero-extending.
    Ld32U,
    /// 64-bit.
    Ld64,
}

/// Guest memory store flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    /// 8-bit.
    St8,
    /// 16-bit.
    St16,
    /// 32-bit.
    St32,
    /// 64-bit.
    St64,
}

/// Named runtime helpers callable from generated code.
///
/// Helpers receive the CPU state pointer implicitly; the IR carries only the
/// explicit arguments. Display renders the conventional `helper_*` symbol
/// suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[allow(missing_docs)]
pub enum Helper {
    RaiseException,
    RaiseExceptionBadaddr,
    RaiseExceptionDebug,
    Csrrw,
    Csrrs,
    Csrrc,
    Sret,
    Mret,
    Wfi,
    TlbFlush,
    FenceI,
    FaddS,
    FsubS,
    FmulS,
    FdivS,
    FsqrtS,
    FminS,
    FmaxS,
    FmaddS,
    FmsubS,
    FnmaddS,
    FnmsubS,
    FeqS,
    FltS,
    FleS,
    FclassS,
    FcvtWS,
    FcvtWuS,
    FcvtLS,
    FcvtLuS,
    FcvtSW,
    FcvtSWu,
    FcvtSL,
    FcvtSLu,
    FaddD,
    FsubD,
    FmulD,
    FdivD,
    FsqrtD,
    FminD,
    FmaxD,
    FmaddD,
    FmsubD,
    FnmaddD,
    FnmsubD,
    FeqD,
    FltD,
    FleD,
    FclassD,
    FcvtWD,
    FcvtWuD,
    FcvtLD,
    FcvtLuD,
    FcvtDW,
    FcvtDWu,
    FcvtDL,
    FcvtDLu,
    FcvtSD,
    FcvtDS,
    Vsetvl,
    VmvIvi,
    VmvIvv,
    VmergeIvv,
    VmergeIvi,
    VcompressMvv,
    VadcVvm,
    VmadcVv,
    VmadcVvm,
    VsbcVvm,
    VmsbcVv,
    VmsbcVvm,
    VadcVi,
    VmadcVi,
    VmadcVim,
    VsbcVi,
    VmsbcVi,
    VmsbcVim,
}

/// One abstract operation in a translation block.
///
/// Word-width operations compute at the width of their destination: guest
/// word for word temps and integer globals, 64 bits for FP values. Shift
/// amounts are taken modulo the operand width by the back end.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum MicroOp {
    MovImm { dst: Value, imm: u64 },
    Mov { dst: Value, src: Value },
    Add { dst: Value, a: Value, b: Value },
    AddImm { dst: Value, src: Value, imm: u64 },
    Sub { dst: Value, a: Value, b: Value },
    And { dst: Value, a: Value, b: Value },
    AndImm { dst: Value, src: Value, imm: u64 },
    Or { dst: Value, a: Value, b: Value },
    OrImm { dst: Value, src: Value, imm: u64 },
    Xor { dst: Value, a: Value, b: Value },
    XorImm { dst: Value, src: Value, imm: u64 },
    Not { dst: Value, src: Value },
    Shl { dst: Value, a: Value, b: Value },
    ShlImm { dst: Value, src: Value, amount: u32 },
    Shr { dst: Value, a: Value, b: Value },
    ShrImm { dst: Value, src: Value, amount: u32 },
    Sar { dst: Value, a: Value, b: Value },
    SarImm { dst: Value, src: Value, amount: u32 },
    Mul { dst: Value, a: Value, b: Value },
    Muls2 { lo: Value, hi: Value, a: Value, b: Value },
    Mulu2 { lo: Value, hi: Value, a: Value, b: Value },
    Div { dst: Value, a: Value, b: Value },
    Divu { dst: Value, a: Value, b: Value },
    Rem { dst: Value, a: Value, b: Value },
    Remu { dst: Value, a: Value, b: Value },
    Ext32S { dst: Value, src: Value },
    Ext32U { dst: Value, src: Value },
    /// Zero-extend a guest-word value into a 64-bit destination.
    ExtuTo64 { dst: Value, src: Value },
    Setcond { cond: Cond, dst: Value, a: Value, b: Value },
    SetcondImm { cond: Cond, dst: Value, a: Value, imm: u64 },
    /// `dst = cond(c1, c2) ? vtrue : vfalse`, branchless.
    Movcond { cond: Cond, dst: Value, c1: Value, c2: Value, vtrue: Value, vfalse: Value },
    /// Read the `mstatus` field out of the CPU state (the FS/VS gates).
    LoadMstatus { dst: Value },
    Load { kind: LoadKind, dst: Value, addr: Value, mem_idx: u32 },
    Store { kind: StoreKind, src: Value, addr: Value, mem_idx: u32 },
    SetLabel { label: Label },
    Br { label: Label },
    Brcond { cond: Cond, a: Value, b: Value, label: Label },
    BrcondImm { cond: Cond, a: Value, imm: u64, label: Label },
    /// Chain-entry point `slot` (0 or 1); always followed by the PC update
    /// and the linked exit.
    GotoTb { slot: u8 },
    /// Leave the block. `link` names the chain slot a matching `GotoTb`
    /// opened, `None` leaves unchained.
    ExitTb { link: Option<u8> },
    Call { helper: Helper, ret: Option<Value>, args: Vec<Value> },
}

#[derive(Debug, Clone, Copy)]
struct TempDesc {
    kind: TempKind,
    local: bool,
    freed: bool,
}

/// A finished, immutable micro-op sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct IrBuffer {
    ops: Vec<MicroOp>,
    temp_kinds: Vec<TempKind>,
    label_count: usize,
}

impl IrBuffer {
    /// The micro-ops, in emission order.
    pub fn ops(&self) -> &[MicroOp] {
        &self.ops
    }

    /// Number of temporary slots a back end must provide.
    pub fn temp_slots(&self) -> usize {
        self.temp_kinds.len()
    }

    /// Width class of temporary `id`.
    pub fn temp_kind(&self, id: TempId) -> TempKind {
        self.temp_kinds[id as usize]
    }

    /// Number of labels used.
    pub fn label_count(&self) -> usize {
        self.label_count
    }
}

/// The emitter. One per translation call.
#[derive(Debug, Default)]
pub struct IrBuilder {
    ops: Vec<MicroOp>,
    temps: Vec<TempDesc>,
    live_temps: usize,
    labels: u32,
}

impl IrBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of micro-ops emitted so far.
    pub fn op_count(&self) -> usize {
        self.ops.len()
    }

    /// Number of currently-live temporaries. Zero between instructions, or
    /// the translator leaked.
    pub fn live_temps(&self) -> usize {
        self.live_temps
    }

    /// Finish the block and hand the buffer over.
    pub fn finish(self) -> IrBuffer {
        IrBuffer {
            ops: self.ops,
            temp_kinds: self.temps.iter().map(|desc| desc.kind).collect(),
            label_count: self.labels as usize,
        }
    }

    fn alloc(&mut self, kind: TempKind, local: bool) -> Value {
        let id = self.temps.len() as TempId;
        self.temps.push(TempDesc {
            kind,
            local,
            freed: false,
        });
        self.live_temps += 1;
        Value::Temp(id)
    }

    /// Allocate a guest-word temporary. Dead across labels.
    pub fn new_temp(&mut self) -> Value {
        self.alloc(TempKind::Word, false)
    }

    /// Allocate a guest-word temporary that survives label crossings.
    pub fn new_local(&mut self) -> Value {
        self.alloc(TempKind::Word, true)
    }

    /// Allocate a 64-bit temporary.
    pub fn new_temp_i64(&mut self) -> Value {
        self.alloc(TempKind::I64, false)
    }

    /// Allocate a word temporary holding a constant.
    pub fn const_word(&mut self, imm: u64) -> Value {
        let t = self.new_temp();
        self.movi(t, imm);
        t
    }

    /// Allocate a 64-bit temporary holding a constant.
    pub fn const_i64(&mut self, imm: u64) -> Value {
        let t = self.new_temp_i64();
        self.movi(t, imm);
        t
    }

    /// Release a temporary.
    pub fn free(&mut self, value: Value) {
        let Value::Temp(id) = value else {
            panic!("attempted to free a global");
        };
        let desc = &mut self.temps[id as usize];
        assert!(!desc.freed, "temporary freed twice");
        desc.freed = true;
        self.live_temps -= 1;
    }

    /// Width class of a value.
    pub fn kind_of(&self, value: Value) -> TempKind {
        match value {
            Value::Global(Global::Fpr(_)) => TempKind::I64,
            Value::Global(_) => TempKind::Word,
            Value::Temp(id) => self.temps[id as usize].kind,
        }
    }

    /// Whether a temporary was allocated as a local.
    pub fn is_local(&self, value: Value) -> bool {
        match value {
            Value::Temp(id) => self.temps[id as usize].local,
            Value::Global(_) => false,
        }
    }

    fn push(&mut self, op: MicroOp) {
        self.ops.push(op);
    }

    /// `dst = imm`.
    pub fn movi(&mut self, dst: Value, imm: u64) {
        self.push(MicroOp::MovImm { dst, imm });
    }

    /// `dst = src`.
    pub fn mov(&mut self, dst: Value, src: Value) {
        self.push(MicroOp::Mov { dst, src });
    }

    /// `dst = a + b`.
    pub fn add(&mut self, dst: Value, a: Value, b: Value) {
        self.push(MicroOp::Add { dst, a, b });
    }

    /// `dst = src + imm`.
    pub fn addi(&mut self, dst: Value, src: Value, imm: u64) {
        self.push(MicroOp::AddImm { dst, src, imm });
    }

    /// `dst = a - b`.
    pub fn sub(&mut self, dst: Value, a: Value, b: Value) {
        self.push(MicroOp::Sub { dst, a, b });
    }

    /// `dst = a & b`.
    pub fn and(&mut self, dst: Value, a: Value, b: Value) {
        self.push(MicroOp::And { dst, a, b });
    }

    /// `dst = src & imm`.
    pub fn andi(&mut self, dst: Value, src: Value, imm: u64) {
        self.push(MicroOp::AndImm { dst, src, imm });
    }

    /// `dst = a | b`.
    pub fn or(&mut self, dst: Value, a: Value, b: Value) {
        self.push(MicroOp::Or { dst, a, b });
    }

    /// `dst = src | imm`.
    pub fn ori(&mut self, dst: Value, src: Value, imm: u64) {
        self.push(MicroOp::OrImm { dst, src, imm });
    }

    /// `dst = a ^ b`.
    pub fn xor(&mut self, dst: Value, a: Value, b: Value) {
        self.push(MicroOp::Xor { dst, a, b });
    }

    /// `dst = src ^ imm`.
    pub fn xori(&mut self, dst: Value, src: Value, imm: u64) {
        self.push(MicroOp::XorImm { dst, src, imm });
    }

    /// `dst = !src`.
    pub fn not(&mut self, dst: Value, src: Value) {
        self.push(MicroOp::Not { dst, src });
    }

    /// `dst = a << b`.
    pub fn shl(&mut self, dst: Value, a: Value, b: Value) {
        self.push(MicroOp::Shl { dst, a, b });
    }

    /// `dst = src << amount`.
    pub fn shli(&mut self, dst: Value, src: Value, amount: u32) {
        self.push(MicroOp::ShlImm { dst, src, amount });
    }

    /// `dst = a >> b`, logical.
    pub fn shr(&mut self, dst: Value, a: Value, b: Value) {
        self.push(MicroOp::Shr { dst, a, b });
    }

    /// `dst = src >> amount`, logical.
    pub fn shri(&mut self, dst: Value, src: Value, amount: u32) {
        self.push(MicroOp::ShrImm { dst, src, amount });
    }

    /// `dst = a >> b`, arithmetic.
    pub fn sar(&mut self, dst: Value, a: Value, b: Value) {
        self.push(MicroOp::Sar { dst, a, b });
    }

    /// `dst = src >> amount`, arithmetic.
    pub fn sari(&mut self, dst: Value, src: Value, amount: u32) {
        self.push(MicroOp::SarImm { dst, src, amount });
    }

    /// `dst = a * b`, low half.
    pub fn mul(&mut self, dst: Value, a: Value, b: Value) {
        self.push(MicroOp::Mul { dst, a, b });
    }

    /// Signed widening multiply into a low/high pair.
    pub fn muls2(&mut self, lo: Value, hi: Value, a: Value, b: Value) {
        self.push(MicroOp::Muls2 { lo, hi, a, b });
    }

    /// Unsigned widening multiply into a low/high pair.
    pub fn mulu2(&mut self, lo: Value, hi: Value, a: Value, b: Value) {
        self.push(MicroOp::Mulu2 { lo, hi, a, b });
    }

    /// `dst = a / b`, signed.
    pub fn div(&mut self, dst: Value, a: Value, b: Value) {
        self.push(MicroOp::Div { dst, a, b });
    }

    /// `dst = a / b`, unsigned.
    pub fn divu(&mut self, dst: Value, a: Value, b: Value) {
        self.push(MicroOp::Divu { dst, a, b });
    }

    /// `dst = a % b`, signed.
    pub fn rem(&mut self, dst: Value, a: Value, b: Value) {
        self.push(MicroOp::Rem { dst, a, b });
    }

    /// `dst = a % b`, unsigned.
    pub fn remu(&mut self, dst: Value, a: Value, b: Value) {
        self.push(MicroOp::Remu { dst, a, b });
    }

    /// Sign-extend `src` from bit 31.
    pub fn ext32s(&mut self, dst: Value, src: Value) {
        self.push(MicroOp::Ext32S { dst, src });
    }

    /// Zero-extend `src` from bit 31.
    pub fn ext32u(&mut self, dst: Value, src: Value) {
        self.push(MicroOp::Ext32U { dst, src });
    }

    /// Zero-extend a guest-word value into a 64-bit destination.
    pub fn extu_to_i64(&mut self, dst: Value, src: Value) {
        self.push(MicroOp::ExtuTo64 { dst, src });
    }

    /// `dst = cond(a, b) ? 1 : 0`.
    pub fn setcond(&mut self, cond: Cond, dst: Value, a: Value, b: Value) {
        self.push(MicroOp::Setcond { cond, dst, a, b });
    }

    /// `dst = cond(a, imm) ? 1 : 0`.
    pub fn setcondi(&mut self, cond: Cond, dst: Value, a: Value, imm: u64) {
        self.push(MicroOp::SetcondImm { cond, dst, a, imm });
    }

    /// `dst = cond(c1, c2) ? vtrue : vfalse`.
    pub fn movcond(
        &mut self,
        cond: Cond,
        dst: Value,
        c1: Value,
        c2: Value,
        vtrue: Value,
        vfalse: Value,
    ) {
        self.push(MicroOp::Movcond {
            cond,
            dst,
            c1,
            c2,
            vtrue,
            vfalse,
        });
    }

    /// Read `mstatus` out of the CPU state.
    pub fn load_mstatus(&mut self, dst: Value) {
        self.push(MicroOp::LoadMstatus { dst });
    }

    /// Typed guest memory load.
    pub fn load(&mut self, kind: LoadKind, dst: Value, addr: Value, mem_idx: u32) {
        self.push(MicroOp::Load {
            kind,
            dst,
            addr,
            mem_idx,
        });
    }

    /// Typed guest memory store.
    pub fn store(&mut self, kind: StoreKind, src: Value, addr: Value, mem_idx: u32) {
        self.push(MicroOp::Store {
            kind,
            src,
            addr,
            mem_idx,
        });
    }

    /// Allocate a fresh label.
    pub fn new_label(&mut self) -> Label {
        let label = Label(self.labels);
        self.labels += 1;
        label
    }

    /// Bind a label to the current position.
    pub fn set_label(&mut self, label: Label) {
        self.push(MicroOp::SetLabel { label });
    }

    /// Unconditional forward branch.
    pub fn br(&mut self, label: Label) {
        self.push(MicroOp::Br { label });
    }

    /// Conditional forward branch.
    pub fn brcond(&mut self, cond: Cond, a: Value, b: Value, label: Label) {
        self.push(MicroOp::Brcond { cond, a, b, label });
    }

    /// Conditional forward branch against an immediate.
    pub fn brcondi(&mut self, cond: Cond, a: Value, imm: u64, label: Label) {
        self.push(MicroOp::BrcondImm { cond, a, imm, label });
    }

    /// Open chain slot `slot`.
    pub fn goto_tb(&mut self, slot: u8) {
        debug_assert!(slot < 2, "a block has two chain slots");
        self.push(MicroOp::GotoTb { slot });
    }

    /// Leave the block, optionally linked to a chain slot.
    pub fn exit_tb(&mut self, link: Option<u8>) {
        self.push(MicroOp::ExitTb { link });
    }

    /// Call a named runtime helper.
    pub fn call(&mut self, helper: Helper, ret: Option<Value>, args: &[Value]) {
        self.push(MicroOp::Call {
            helper,
            ret,
            args: args.to_vec(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_accounting_balances() {
        let mut ir = IrBuilder::new();
        let a = ir.new_temp();
        let b = ir.new_local();
        assert_eq!(ir.live_temps(), 2);
        assert!(!ir.is_local(a));
        assert!(ir.is_local(b));
        ir.free(a);
        ir.free(b);
        assert_eq!(ir.live_temps(), 0);
    }

    #[test]
    #[should_panic(expected = "freed twice")]
    fn double_free_is_a_bug() {
        let mut ir = IrBuilder::new();
        let t = ir.new_temp();
        ir.free(t);
        ir.free(t);
    }

    #[test]
    fn helper_names_render_like_symbols() {
        assert_eq!(Helper::FaddS.to_string(), "fadd_s");
        assert_eq!(Helper::RaiseExceptionBadaddr.to_string(), "raise_exception_badaddr");
        assert_eq!(Helper::Vsetvl.to_string(), "vsetvl");
        assert_eq!(Helper::FcvtWuD.to_string(), "fcvt_wu_d");
    }

    #[test]
    fn const_temps_emit_their_move() {
        let mut ir = IrBuilder::new();
        let t = ir.const_word(42);
        ir.free(t);
        let buf = ir.finish();
        assert_eq!(buf.ops(), &[MicroOp::MovImm { dst: t, imm: 42 }]);
        assert_eq!(buf.temp_slots(), 1);
    }
}
