//! Translation of basic blocks into micro-operations.

use crate::bus::AddrSpace;
use crate::Config;
use super::context::CompileContext;
use super::ir::{MicroOp, Operand, Seq};
use super::opcode::Opcode;
use super::registry::{BranchKind, InsFlags, Registry};

/// A translated basic block.
#[derive(Debug)]
pub struct Block {
    /// Address of the first instruction.
    pub start: u32,
    /// Address right after the last instruction.
    pub end: u32,
    /// The number of instructions, including delay slots.
    pub len: usize,
    pub ops: Vec<MicroOp>,
    /// The number of temporaries used by `ops`.
    pub temps: u32,
}

pub struct Translator<'a> {
    registry: &'a Registry,
    max_len: usize,
    fold_constants: bool,
    trace: bool,
}

impl<'a> Translator<'a> {
    pub fn new(registry: &'a Registry, config: &Config) -> Self {
        Self {
            registry,
            max_len: config.max_block_len.max(1),
            fold_constants: config.fold_constants,
            trace: config.trace_blocks,
        }
    }

    /// Limit the number of instructions, not counting the delay slot of a final branch.
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len.max(1);
        self
    }

    /// Translate the block starting at `start`.
    ///
    /// The block ends after the first branch which may be taken (and its delay slot), after an
    /// instruction which always traps, or when the block is full. Every block ends in an
    /// unconditional branch to the next instruction, so executing a block always ends in a jump
    /// or an exception.
    pub fn translate(&self, code: &mut dyn AddrSpace, start: u32) -> Block {
        let mut ctx = CompileContext::new(self.fold_constants);
        let mut seq = Seq::new();

        let mut addr = start;
        let mut len = 0;

        loop {
            let op = Opcode::new(code.fetch(addr));
            let desc = self.registry.decode(op);

            len += 1;

            if let Some(kind) = desc.classify(op) {
                match kind {
                    BranchKind::Never => {
                        // The branch does nothing, so the delay slot is translated as an
                        // ordinary instruction. If it's a branch itself, it gets its own delay slot.
                        seq.push(MicroOp::Ins { addr });
                        addr = addr.wrapping_add(4);
                    }
                    BranchKind::Always | BranchKind::Sometimes => {
                        let slot_addr = addr.wrapping_add(4);
                        let slot_op = Opcode::new(code.fetch(slot_addr));

                        len += 1;

                        ctx.set_delay_slot(slot_addr, slot_op, self.registry.decode(slot_op));
                        ctx.compile(&mut seq, addr, op, desc);
                        ctx.emit_delay_slot(&mut seq);

                        addr = addr.wrapping_add(8);
                        break;
                    }
                }
            } else {
                ctx.compile(&mut seq, addr, op, desc);
                addr = addr.wrapping_add(4);

                if desc.flags.contains(InsFlags::TRAP) {
                    break;
                }
            }

            if len >= self.max_len {
                break;
            }
        }

        ctx.flush(&mut seq);
        seq.push(MicroOp::Branch {
            cond: None,
            target: Operand::Const(addr),
            link: None,
        });

        let (ops, temps) = seq.into_parts();
        let block = Block { start, end: addr, len, ops, temps };

        if self.trace {
            trace!("block {:08x}..{:08x}", block.start, block.end);
            for op in &block.ops {
                if let MicroOp::Ins { addr } = op {
                    let word = Opcode::new(code.fetch(*addr));
                    trace!("{} ; {}", op, self.registry.disassemble(*addr, word));
                } else {
                    trace!("{op}");
                }
            }
        }

        block
    }
}
