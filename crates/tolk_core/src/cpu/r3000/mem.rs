//! Loads and stores.
//!
//! Accesses are tagged before they are performed, unless the base register is the stack
//! pointer. Stack accesses are frequent and never interesting to trace.
//!
//! There is no load delay. The loaded value is visible to the next instruction.

use crate::bus::Width;
use crate::cpu::context::CompileContext;
use crate::cpu::ir::{BinOp, MergeKind, Operand, Seq};
use crate::cpu::registry::Descriptor;
use crate::cpu::{Opcode, RegIdx};

/// `rs + imm`. Folds into a constant if `rs` is known.
pub(crate) fn effective_addr(ctx: &mut CompileContext, seq: &mut Seq, op: Opcode) -> Operand {
    let base = ctx.read(seq, op.rs());
    seq.bin(BinOp::Add, base, Operand::Const(op.signed_imm()))
}

pub(crate) fn is_tagged(op: Opcode) -> bool {
    op.rs() != RegIdx::SP
}

fn compile_load(width: Width, signed: bool, ctx: &mut CompileContext, op: Opcode, seq: &mut Seq) {
    let addr = effective_addr(ctx, seq, op);
    let val = seq.read(width, signed, addr, is_tagged(op));
    ctx.write(seq, op.rt(), val);
}

fn compile_store(width: Width, ctx: &mut CompileContext, op: Opcode, seq: &mut Seq) {
    let addr = effective_addr(ctx, seq, op);
    let val = ctx.read(seq, op.rt());
    seq.write(width, addr, val, is_tagged(op));
}

/// `lwl` and `lwr`. Reads the aligned word and merges it into `rt`.
fn compile_load_merge(kind: MergeKind, ctx: &mut CompileContext, op: Opcode, seq: &mut Seq) {
    let addr = effective_addr(ctx, seq, op);
    let aligned = seq.bin(BinOp::And, addr, Operand::Const(!3));
    let word = seq.read(Width::Word, false, aligned, is_tagged(op));
    let reg = ctx.read(seq, op.rt());
    let val = seq.merge(kind, reg, word, addr);
    ctx.write(seq, op.rt(), val);
}

/// `swl` and `swr`. Reads the aligned word, merges `rt` into it and writes it back. Only the
/// write is tagged.
fn compile_store_merge(kind: MergeKind, ctx: &mut CompileContext, op: Opcode, seq: &mut Seq) {
    let addr = effective_addr(ctx, seq, op);
    let aligned = seq.bin(BinOp::And, addr, Operand::Const(!3));
    let word = seq.read(Width::Word, false, aligned, false);
    let reg = ctx.read(seq, op.rt());
    let val = seq.merge(kind, reg, word, addr);
    seq.write(Width::Word, aligned, val, is_tagged(op));
}

macro_rules! load {
    ($static:ident, $name:literal, $mem:ident, $width:expr, $signed:expr) => {
        pub static $static: Descriptor = compiled!(
            $name,
            [READS_RS, WRITES_RT, LOAD, $mem],
            RtOffset,
            |ctx, _, op, seq| compile_load($width, $signed, ctx, op, seq)
        );
    };
}

macro_rules! store {
    ($static:ident, $name:literal, $mem:ident, $width:expr) => {
        pub static $static: Descriptor = compiled!(
            $name,
            [READS_RS, READS_RT, STORE, $mem],
            RtOffset,
            |ctx, _, op, seq| compile_store($width, ctx, op, seq)
        );
    };
}

load!(LB, "lb", MEM8, Width::Byte, true);
load!(LBU, "lbu", MEM8, Width::Byte, false);
load!(LH, "lh", MEM16, Width::Half, true);
load!(LHU, "lhu", MEM16, Width::Half, false);
load!(LW, "lw", MEM32, Width::Word, false);

store!(SB, "sb", MEM8, Width::Byte);
store!(SH, "sh", MEM16, Width::Half);
store!(SW, "sw", MEM32, Width::Word);

pub static LWL: Descriptor = compiled!(
    "lwl",
    [READS_RS, READS_RT, WRITES_RT, LOAD, MEM32],
    RtOffset,
    |ctx, _, op, seq| compile_load_merge(MergeKind::Lwl, ctx, op, seq)
);

pub static LWR: Descriptor = compiled!(
    "lwr",
    [READS_RS, READS_RT, WRITES_RT, LOAD, MEM32],
    RtOffset,
    |ctx, _, op, seq| compile_load_merge(MergeKind::Lwr, ctx, op, seq)
);

pub static SWL: Descriptor = compiled!(
    "swl",
    [READS_RS, READS_RT, STORE, MEM32],
    RtOffset,
    |ctx, _, op, seq| compile_store_merge(MergeKind::Swl, ctx, op, seq)
);

pub static SWR: Descriptor = compiled!(
    "swr",
    [READS_RS, READS_RT, STORE, MEM32],
    RtOffset,
    |ctx, _, op, seq| compile_store_merge(MergeKind::Swr, ctx, op, seq)
);
