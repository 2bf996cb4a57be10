//! Per block compile state.
//!
//! The context tracks which general purpose registers hold a value known at compile time. Known
//! values are kept out of the register file until something could observe it, which is when the
//! block may leave, either by a branch or by an exception. The state only lives for a single
//! block.

use super::ir::{Operand, MicroOp, Reg, Seq};
use super::opcode::{Opcode, RegIdx};
use super::registry::{self, Descriptor, InsFlags, Kind};
use super::Regs;

/// The instruction in the delay slot of the branch being compiled.
#[derive(Clone, Copy)]
struct DelaySlot {
    addr: u32,
    op: Opcode,
    desc: &'static Descriptor,
}

pub struct CompileContext {
    /// Bit `n` is set if register `n` is known.
    known: u32,
    /// Bit `n` is set if register `n` is known but hasn't been written to the register file.
    dirty: u32,
    vals: [u32; 32],
    fold_constants: bool,
    delay_slot: Option<DelaySlot>,
}

impl CompileContext {
    pub fn new(fold_constants: bool) -> Self {
        Self {
            // `$zero` is always known.
            known: 1,
            dirty: 0,
            vals: [0; 32],
            fold_constants,
            delay_slot: None,
        }
    }

    /// The value of `reg` if known at compile time.
    pub fn known(&self, reg: RegIdx) -> Option<u32> {
        if self.known & (1 << reg.0) != 0 {
            Some(self.vals[reg.idx()])
        } else {
            None
        }
    }

    /// Read `reg`, either as a known constant or by loading it.
    pub fn read(&mut self, seq: &mut Seq, reg: RegIdx) -> Operand {
        match self.known(reg) {
            Some(val) => Operand::Const(val),
            None => seq.load_reg(Reg::Gpr(reg)),
        }
    }

    /// Write `val` to `reg`. Constants are held back if folding is enabled.
    pub fn write(&mut self, seq: &mut Seq, reg: RegIdx, val: Operand) {
        if reg == RegIdx::ZERO {
            return;
        }
        let bit = 1 << reg.0;
        match val {
            Operand::Const(val) if self.fold_constants => {
                self.known |= bit;
                self.dirty |= bit;
                self.vals[reg.idx()] = val;
            }
            _ => {
                self.known &= !bit;
                self.dirty &= !bit;
                seq.store_reg(Reg::Gpr(reg), val);
            }
        }
    }

    /// Write every held back constant to the register file.
    pub fn flush(&mut self, seq: &mut Seq) {
        let mut dirty = self.dirty;
        while dirty != 0 {
            let idx = dirty.trailing_zeros();
            dirty &= dirty - 1;
            seq.store_reg(
                Reg::Gpr(RegIdx(idx as u8)),
                Operand::Const(self.vals[idx as usize]),
            );
        }
        self.dirty = 0;
    }

    /// Compile a single instruction.
    pub fn compile(&mut self, seq: &mut Seq, addr: u32, op: Opcode, desc: &'static Descriptor) {
        seq.push(MicroOp::Ins { addr });

        if self.try_fold(op, desc) {
            return;
        }

        if desc.flags.contains(InsFlags::MAY_SIGNAL_EXCEPTION) {
            self.flush(seq);
        }

        match desc.compile_fn() {
            Some(compile) => compile(self, addr, op, seq),
            None => registry::compile_reserved(self, addr, op, seq),
        }
    }

    /// Run the simulator of the instruction at compile time if every register it reads is
    /// known. Returns true if the instruction got folded into a constant.
    fn try_fold(&mut self, op: Opcode, desc: &Descriptor) -> bool {
        let Kind::Simulated { simulate, .. } = desc.kind else {
            return false;
        };

        if !self.fold_constants
            || desc.flags.intersects(InsFlags::READS_HILO | InsFlags::WRITES_HILO)
        {
            return false;
        }

        let mut regs = Regs::default();
        for reg in registry::read_regs(desc, op) {
            match self.known(reg) {
                Some(val) => regs.write(reg, val),
                None => return false,
            }
        }

        if !simulate(op, &mut regs) {
            return false;
        }

        if let Some(reg) = registry::written_reg(desc, op) {
            if reg != RegIdx::ZERO {
                let bit = 1 << reg.0;
                self.known |= bit;
                self.dirty |= bit;
                self.vals[reg.idx()] = regs.read(reg);
            }
        }

        true
    }

    pub(super) fn set_delay_slot(&mut self, addr: u32, op: Opcode, desc: &'static Descriptor) {
        self.delay_slot = Some(DelaySlot { addr, op, desc });
    }

    /// Compile the pending delay slot, if there is one.
    pub fn emit_delay_slot(&mut self, seq: &mut Seq) {
        if let Some(slot) = self.delay_slot.take() {
            if slot.desc.is_branch() {
                warn!("branch {} in delay slot at {:08x}", slot.desc.name, slot.addr);
            }
            self.compile(seq, slot.addr, slot.op, slot.desc);
        }
    }

    /// Emit a branch. Must be called after the condition and target has been computed, since
    /// the delay slot is emitted first and may change the registers they depend on.
    ///
    /// A constant false condition only emits the delay slot.
    pub fn branch(
        &mut self,
        seq: &mut Seq,
        cond: Option<Operand>,
        target: Operand,
        link: Option<(RegIdx, u32)>,
    ) {
        self.emit_delay_slot(seq);
        self.flush(seq);

        let cond = match cond {
            Some(Operand::Const(0)) => return,
            Some(Operand::Const(_)) | None => None,
            cond => cond,
        };

        seq.push(MicroOp::Branch { cond, target, link });
    }
}
