//! Translation-block formation.
//!
//! The driver walks guest instructions from the block entry until a
//! block-ending condition fires, invoking the decode dispatcher for each
//! one and closing the block with either a chained `goto_tb` or an
//! unchained exit. It also services host breakpoints, the single-step
//! flag, and the restore path that re-emits a block to map an IR position
//! back to a guest PC.

use alloc::vec::Vec;

use rv_asm::Exception;

use crate::{
    consts::{
        GuestWord, DEFAULT_MAX_INSNS, IR_OPC_CAPACITY, TARGET_PAGE_MASK, TARGET_PAGE_SIZE,
    },
    ir::{Helper, IrBuffer, IrBuilder, Value},
    state::CpuState,
    translator::{disas_insn, gen_goto_tb, generate_exception, BlockState, DisasContext},
};

/// Code-fetch collaborator: reads raw opcode words from guest memory.
pub trait GuestCode {
    /// Fetch the 32-bit word at `pc`. Compressed instructions use the low
    /// half.
    fn ldl_code(&self, pc: GuestWord) -> u32;
}

/// Descriptor of one translated block.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TranslationBlock {
    /// Guest entry address.
    pub pc: GuestWord,
    /// Bytes of guest code covered.
    pub size: GuestWord,
    /// `size` before the most recent instruction.
    pub prev_size: GuestWord,
    /// `size` frozen at first emission; bounds the restore path.
    pub original_size: GuestWord,
    /// Guest instructions covered.
    pub icount: usize,
    /// Restore mode: re-emit to recover the opcode-to-PC mapping instead of
    /// translating fresh.
    pub search_pc: bool,
    /// Flags the outer runtime attaches to the block.
    pub disas_flags: u32,
    /// `(micro-op index, guest pc)` pairs recorded in restore mode.
    pub opc_pc: Vec<(usize, GuestWord)>,
}

impl TranslationBlock {
    /// Fresh descriptor for a block entered at `pc`.
    pub fn new(pc: GuestWord) -> Self {
        Self {
            pc,
            size: 0,
            prev_size: 0,
            original_size: 0,
            icount: 0,
            search_pc: false,
            disas_flags: 0,
            opc_pc: Vec::new(),
        }
    }

    /// Reset the accumulated sizes for a re-emission, keeping
    /// `original_size`.
    pub fn restart(&mut self) {
        self.size = 0;
        self.prev_size = 0;
        self.icount = 0;
        self.opc_pc.clear();
    }
}

/// Map an IR position back to the guest PC of the instruction that emitted
/// it, using the table recorded by a `search_pc` translation.
pub fn restore_state_to_opc(env: &mut CpuState, tb: &TranslationBlock, pc_pos: usize) {
    let mut pc = tb.pc;
    for &(op_index, insn_pc) in &tb.opc_pc {
        if op_index > pc_pos {
            break;
        }
        pc = insn_pc;
    }
    env.pc = pc;
}

/// Tunables of one translator instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslatorConfig {
    /// Per-block instruction budget.
    pub max_insns: usize,
    /// Micro-op buffer high-water mark.
    pub ir_capacity: usize,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            max_insns: DEFAULT_MAX_INSNS,
            ir_capacity: IR_OPC_CAPACITY,
        }
    }
}

/// The translation core. Construct once per host thread; owns no guest
/// state.
#[derive(Debug, Default, Clone)]
pub struct Translator {
    config: TranslatorConfig,
}

impl Translator {
    /// Create a translator with the given configuration.
    pub fn new(config: TranslatorConfig) -> Self {
        Self { config }
    }

    /// Translate one block starting at `tb.pc`, appending micro-ops until a
    /// block-ending condition fires.
    ///
    /// # Panics
    ///
    /// Panics if a translator leaks IR temporaries; that is a bug in the
    /// core, not a guest-visible condition.
    pub fn translate_block<C: GuestCode>(
        &self,
        env: &CpuState,
        code: &C,
        tb: &mut TranslationBlock,
    ) -> IrBuffer {
        let mut ir = IrBuilder::new();
        let mut ctx = DisasContext {
            tb_pc: tb.pc,
            pc: tb.pc,
            next_pc: tb.pc,
            opcode: 0,
            singlestep_enabled: env.singlestep_enabled,
            mem_idx: env.mmu_index(),
            bstate: BlockState::None,
        };

        tracing::trace!(pc = tb.pc as u64, search_pc = tb.search_pc, "translate block");

        loop {
            if !env.breakpoints.is_empty() && env.breakpoint_at(ctx.pc) {
                generate_exception(&ctx, &mut ir, Exception::Debug);
                // advance past the breakpoint so clearing it invalidates
                // this block
                ctx.pc += 4;
                break;
            }

            if tb.search_pc {
                tb.opc_pc.push((ir.op_count(), ctx.pc));
            }

            ctx.opcode = code.ldl_code(ctx.pc);

            tb.prev_size = tb.size;
            tb.size += disas_insn(env, &mut ctx, &mut ir);
            tb.icount += 1;

            if !tb.search_pc {
                // `search_pc` is only set when restoring; freeze the size of
                // the first emission so the restore can be bounded to it
                tb.original_size = tb.size;
            }

            if ir.live_temps() != 0 {
                panic!("IR temporary leak detected at PC {:#x}", ctx.pc);
            }

            if ctx.bstate != BlockState::None {
                break;
            }
            if ctx.singlestep_enabled {
                break;
            }
            if ctx.pc.wrapping_sub(tb.pc & TARGET_PAGE_MASK) >= TARGET_PAGE_SIZE {
                break;
            }
            if tb.icount >= self.config.max_insns {
                ctx.bstate = BlockState::Stop;
                break;
            }
            if ir.op_count() >= self.config.ir_capacity {
                break;
            }
            if tb.search_pc && tb.size == tb.original_size {
                // a restored block must not grow past the original one
                ctx.bstate = BlockState::Stop;
                break;
            }
        }

        if env.singlestep_enabled && ctx.bstate != BlockState::Branch {
            if ctx.bstate == BlockState::None {
                ir.movi(Value::PC, ctx.pc as u64);
            }
            ir.call(Helper::RaiseExceptionDebug, None, &[]);
        } else {
            match ctx.bstate {
                BlockState::Stop => gen_goto_tb(&ctx, &mut ir, 0, ctx.pc),
                BlockState::None => {
                    // end of page: DO NOT chain
                    ir.movi(Value::PC, ctx.pc as u64);
                    ir.exit_tb(None);
                }
                // branch translators emit their own exit sequence
                BlockState::Branch => {}
            }
        }

        tb.disas_flags = get_disas_flags(env, &ctx);
        ir.finish()
    }
}

fn get_disas_flags(_env: &CpuState, _ctx: &DisasContext) -> u32 {
    0
}
