//! Multiply and divide instructions, and moves to and from `hi` and `lo`.
//!
//! The real hardware runs these in the background and stalls on reading the result early.
//! Timing isn't emulated, so the result is available right away.

use crate::cpu::context::CompileContext;
use crate::cpu::ir::{BinOp, Reg, Seq};
use crate::cpu::registry::Descriptor;
use crate::cpu::{Opcode, Regs};

/// `lo = rs lo_op rt` and `hi = rs hi_op rt`.
fn compile_hilo(lo_op: BinOp, hi_op: BinOp, ctx: &mut CompileContext, op: Opcode, seq: &mut Seq) {
    let lhs = ctx.read(seq, op.rs());
    let rhs = ctx.read(seq, op.rt());
    let lo = seq.bin(lo_op, lhs, rhs);
    let hi = seq.bin(hi_op, lhs, rhs);
    seq.store_reg(Reg::Lo, lo);
    seq.store_reg(Reg::Hi, hi);
}

fn simulate_hilo(lo_op: BinOp, hi_op: BinOp, op: Opcode, regs: &mut Regs) -> bool {
    let (lhs, rhs) = (regs.read(op.rs()), regs.read(op.rt()));
    match (lo_op.eval(lhs, rhs), hi_op.eval(lhs, rhs)) {
        (Some(lo), Some(hi)) => {
            regs.lo = lo;
            regs.hi = hi;
            true
        }
        _ => false,
    }
}

macro_rules! hilo {
    ($static:ident, $name:literal, $lo:expr, $hi:expr) => {
        pub static $static: Descriptor = simulated!(
            $name,
            [READS_RS, READS_RT, WRITES_HILO],
            RsRt,
            |ctx, _, op, seq| compile_hilo($lo, $hi, ctx, op, seq),
            |op, regs| simulate_hilo($lo, $hi, op, regs)
        );
    };
}

hilo!(MULT, "mult", BinOp::MulLo, BinOp::MulHi);
hilo!(MULTU, "multu", BinOp::MulLo, BinOp::MulHiU);
hilo!(DIV, "div", BinOp::Div, BinOp::Rem);
hilo!(DIVU, "divu", BinOp::DivU, BinOp::RemU);

pub static MFHI: Descriptor = simulated!(
    "mfhi",
    [READS_HILO, WRITES_RD],
    Rd,
    |ctx, _, op, seq| {
        let val = seq.load_reg(Reg::Hi);
        ctx.write(seq, op.rd(), val);
    },
    |op, regs| {
        regs.write(op.rd(), regs.hi);
        true
    }
);

pub static MFLO: Descriptor = simulated!(
    "mflo",
    [READS_HILO, WRITES_RD],
    Rd,
    |ctx, _, op, seq| {
        let val = seq.load_reg(Reg::Lo);
        ctx.write(seq, op.rd(), val);
    },
    |op, regs| {
        regs.write(op.rd(), regs.lo);
        true
    }
);

pub static MTHI: Descriptor = simulated!(
    "mthi",
    [READS_RS, WRITES_HILO],
    Rs,
    |ctx, _, op, seq| {
        let val = ctx.read(seq, op.rs());
        seq.store_reg(Reg::Hi, val);
    },
    |op, regs| {
        regs.hi = regs.read(op.rs());
        true
    }
);

pub static MTLO: Descriptor = simulated!(
    "mtlo",
    [READS_RS, WRITES_HILO],
    Rs,
    |ctx, _, op, seq| {
        let val = ctx.read(seq, op.rs());
        seq.store_reg(Reg::Lo, val);
    },
    |op, regs| {
        regs.lo = regs.read(op.rs());
        true
    }
);
