//! Arithmetic, logic and shift instructions.
//!
//! Every instruction here is a single [`BinOp`], so both the compiled and the simulated form are
//! derived from [`BinOp::eval`].

use crate::cpu::context::CompileContext;
use crate::cpu::ir::{BinOp, Operand, Seq};
use crate::cpu::registry::Descriptor;
use crate::cpu::{Opcode, Regs};
use crate::IGNORE_OVERFLOW;

const ADD: BinOp = if IGNORE_OVERFLOW { BinOp::Add } else { BinOp::AddTrap };
const SUB: BinOp = if IGNORE_OVERFLOW { BinOp::Sub } else { BinOp::SubTrap };

/// `rd = rs op rt`.
fn compile_rrr(bin: BinOp, ctx: &mut CompileContext, op: Opcode, seq: &mut Seq) {
    let lhs = ctx.read(seq, op.rs());
    let rhs = ctx.read(seq, op.rt());
    let val = seq.bin(bin, lhs, rhs);
    ctx.write(seq, op.rd(), val);
}

fn simulate_rrr(bin: BinOp, op: Opcode, regs: &mut Regs) -> bool {
    match bin.eval(regs.read(op.rs()), regs.read(op.rt())) {
        Some(val) => {
            regs.write(op.rd(), val);
            true
        }
        None => false,
    }
}

/// `rd = rt op rs`, used by the variable shifts.
fn compile_shift_var(bin: BinOp, ctx: &mut CompileContext, op: Opcode, seq: &mut Seq) {
    let lhs = ctx.read(seq, op.rt());
    let rhs = ctx.read(seq, op.rs());
    let val = seq.bin(bin, lhs, rhs);
    ctx.write(seq, op.rd(), val);
}

fn simulate_shift_var(bin: BinOp, op: Opcode, regs: &mut Regs) -> bool {
    match bin.eval(regs.read(op.rt()), regs.read(op.rs())) {
        Some(val) => {
            regs.write(op.rd(), val);
            true
        }
        None => false,
    }
}

/// `rd = rt op shift`.
fn compile_shift(bin: BinOp, ctx: &mut CompileContext, op: Opcode, seq: &mut Seq) {
    let lhs = ctx.read(seq, op.rt());
    let val = seq.bin(bin, lhs, Operand::Const(op.shift()));
    ctx.write(seq, op.rd(), val);
}

fn simulate_shift(bin: BinOp, op: Opcode, regs: &mut Regs) -> bool {
    match bin.eval(regs.read(op.rt()), op.shift()) {
        Some(val) => {
            regs.write(op.rd(), val);
            true
        }
        None => false,
    }
}

/// `rt = rs op imm`.
fn compile_imm(bin: BinOp, imm: u32, ctx: &mut CompileContext, op: Opcode, seq: &mut Seq) {
    let lhs = ctx.read(seq, op.rs());
    let val = seq.bin(bin, lhs, Operand::Const(imm));
    ctx.write(seq, op.rt(), val);
}

fn simulate_imm(bin: BinOp, imm: u32, op: Opcode, regs: &mut Regs) -> bool {
    match bin.eval(regs.read(op.rs()), imm) {
        Some(val) => {
            regs.write(op.rt(), val);
            true
        }
        None => false,
    }
}

macro_rules! reg_reg {
    ($static:ident, $name:literal, $bin:expr) => {
        pub static $static: Descriptor = simulated!(
            $name,
            [READS_RS, READS_RT, WRITES_RD],
            RdRsRt,
            |ctx, _, op, seq| compile_rrr($bin, ctx, op, seq),
            |op, regs| simulate_rrr($bin, op, regs)
        );
    };
}

macro_rules! shift_var {
    ($static:ident, $name:literal, $bin:expr) => {
        pub static $static: Descriptor = simulated!(
            $name,
            [READS_RS, READS_RT, WRITES_RD],
            RdRtRs,
            |ctx, _, op, seq| compile_shift_var($bin, ctx, op, seq),
            |op, regs| simulate_shift_var($bin, op, regs)
        );
    };
}

macro_rules! shift {
    ($static:ident, $name:literal, $bin:expr) => {
        pub static $static: Descriptor = simulated!(
            $name,
            [READS_RT, WRITES_RD],
            RdRtShift,
            |ctx, _, op, seq| compile_shift($bin, ctx, op, seq),
            |op, regs| simulate_shift($bin, op, regs)
        );
    };
}

/// `$imm` is an expression of the opcode `op`.
macro_rules! reg_imm {
    ($static:ident, $name:literal, $format:ident, $bin:expr, |$op:ident| $imm:expr) => {
        pub static $static: Descriptor = simulated!(
            $name,
            [READS_RS, WRITES_RT],
            $format,
            |ctx, _, $op, seq| compile_imm($bin, $imm, ctx, $op, seq),
            |$op, regs| simulate_imm($bin, $imm, $op, regs)
        );
    };
}

pub static ADD_INS: Descriptor = simulated!(
    "add",
    [READS_RS, READS_RT, WRITES_RD, MAY_SIGNAL_EXCEPTION],
    RdRsRt,
    |ctx, _, op, seq| compile_rrr(ADD, ctx, op, seq),
    |op, regs| simulate_rrr(ADD, op, regs)
);

pub static SUB_INS: Descriptor = simulated!(
    "sub",
    [READS_RS, READS_RT, WRITES_RD, MAY_SIGNAL_EXCEPTION],
    RdRsRt,
    |ctx, _, op, seq| compile_rrr(SUB, ctx, op, seq),
    |op, regs| simulate_rrr(SUB, op, regs)
);

pub static ADDI: Descriptor = simulated!(
    "addi",
    [READS_RS, WRITES_RT, MAY_SIGNAL_EXCEPTION],
    RtRsImm,
    |ctx, _, op, seq| compile_imm(ADD, op.signed_imm(), ctx, op, seq),
    |op, regs| simulate_imm(ADD, op.signed_imm(), op, regs)
);

reg_reg!(ADDU, "addu", BinOp::Add);
reg_reg!(SUBU, "subu", BinOp::Sub);
reg_reg!(AND, "and", BinOp::And);
reg_reg!(OR, "or", BinOp::Or);
reg_reg!(XOR, "xor", BinOp::Xor);
reg_reg!(NOR, "nor", BinOp::Nor);
reg_reg!(SLT, "slt", BinOp::Slt);
reg_reg!(SLTU, "sltu", BinOp::Sltu);

shift_var!(SLLV, "sllv", BinOp::Sll);
shift_var!(SRLV, "srlv", BinOp::Srl);
shift_var!(SRAV, "srav", BinOp::Sra);

shift!(SLL, "sll", BinOp::Sll);
shift!(SRL, "srl", BinOp::Srl);
shift!(SRA, "sra", BinOp::Sra);

reg_imm!(ADDIU, "addiu", RtRsImm, BinOp::Add, |op| op.signed_imm());
reg_imm!(SLTI, "slti", RtRsImm, BinOp::Slt, |op| op.signed_imm());
// The immediate is sign extended, but the comparison is unsigned.
reg_imm!(SLTIU, "sltiu", RtRsImm, BinOp::Sltu, |op| op.signed_imm());
reg_imm!(ANDI, "andi", RtRsUimm, BinOp::And, |op| op.imm());
reg_imm!(ORI, "ori", RtRsUimm, BinOp::Or, |op| op.imm());
reg_imm!(XORI, "xori", RtRsUimm, BinOp::Xor, |op| op.imm());

pub static LUI: Descriptor = simulated!(
    "lui",
    [WRITES_RT],
    RtImm,
    |ctx, _, op, seq| ctx.write(seq, op.rt(), Operand::Const(op.imm() << 16)),
    |op, regs| {
        regs.write(op.rt(), op.imm() << 16);
        true
    }
);
