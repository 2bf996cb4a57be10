//! Branch and jump instructions.
//!
//! All branches and jumps have a delay slot. The condition and target is computed before the
//! delay slot is emitted, and the control transfer happens after it.

use crate::cpu::context::CompileContext;
use crate::cpu::ir::{BinOp, Operand, Seq};
use crate::cpu::registry::{BranchKind, Descriptor};
use crate::cpu::{Opcode, RegIdx};

/// Emit a relative branch taken if `cond` is non-zero. `cond` is only called for branches that
/// may or may not be taken.
fn compile_branch(
    kind: BranchKind,
    link: bool,
    ctx: &mut CompileContext,
    addr: u32,
    op: Opcode,
    seq: &mut Seq,
    cond: impl FnOnce(&mut CompileContext, &mut Seq) -> Operand,
) {
    let cond = match kind {
        BranchKind::Always => None,
        BranchKind::Sometimes => Some(cond(ctx, seq)),
        BranchKind::Never => Some(Operand::Const(0)),
    };
    let link = link.then(|| (RegIdx::RA, addr.wrapping_add(8)));
    ctx.branch(seq, cond, Operand::Const(op.branch_target(addr)), link);
}

fn classify_beq(op: Opcode) -> BranchKind {
    if op.rs() == op.rt() {
        BranchKind::Always
    } else {
        BranchKind::Sometimes
    }
}

fn classify_bne(op: Opcode) -> BranchKind {
    if op.rs() == op.rt() {
        BranchKind::Never
    } else {
        BranchKind::Sometimes
    }
}

/// Classify branches comparing `rs` against zero, which always holds or never holds when `rs`
/// is `$zero`.
fn classify_zero(op: Opcode, holds_on_zero: bool) -> BranchKind {
    match (op.rs() == RegIdx::ZERO, holds_on_zero) {
        (true, true) => BranchKind::Always,
        (true, false) => BranchKind::Never,
        (false, _) => BranchKind::Sometimes,
    }
}

/// `rs < 0`.
fn less_than_zero(ctx: &mut CompileContext, seq: &mut Seq, op: Opcode) -> Operand {
    let rs = ctx.read(seq, op.rs());
    seq.bin(BinOp::Slt, rs, Operand::Const(0))
}

/// `rs >= 0`.
fn greater_or_equal_zero(ctx: &mut CompileContext, seq: &mut Seq, op: Opcode) -> Operand {
    let lt = less_than_zero(ctx, seq, op);
    seq.bin(BinOp::Eq, lt, Operand::Const(0))
}

pub static BEQ: Descriptor = branch!(
    "beq",
    [READS_RS, READS_RT, BRANCH],
    RsRtBranch,
    |ctx, addr, op, seq| {
        compile_branch(classify_beq(op), false, ctx, addr, op, seq, |ctx, seq| {
            let rs = ctx.read(seq, op.rs());
            let rt = ctx.read(seq, op.rt());
            seq.bin(BinOp::Eq, rs, rt)
        })
    },
    classify_beq
);

pub static BNE: Descriptor = branch!(
    "bne",
    [READS_RS, READS_RT, BRANCH],
    RsRtBranch,
    |ctx, addr, op, seq| {
        compile_branch(classify_bne(op), false, ctx, addr, op, seq, |ctx, seq| {
            let rs = ctx.read(seq, op.rs());
            let rt = ctx.read(seq, op.rt());
            seq.bin(BinOp::Ne, rs, rt)
        })
    },
    classify_bne
);

pub static BLEZ: Descriptor = branch!(
    "blez",
    [READS_RS, BRANCH],
    RsBranch,
    |ctx, addr, op, seq| {
        compile_branch(classify_zero(op, true), false, ctx, addr, op, seq, |ctx, seq| {
            // `rs <= 0` is `rs < 1`.
            let rs = ctx.read(seq, op.rs());
            seq.bin(BinOp::Slt, rs, Operand::Const(1))
        })
    },
    |op| classify_zero(op, true)
);

pub static BGTZ: Descriptor = branch!(
    "bgtz",
    [READS_RS, BRANCH],
    RsBranch,
    |ctx, addr, op, seq| {
        compile_branch(classify_zero(op, false), false, ctx, addr, op, seq, |ctx, seq| {
            let rs = ctx.read(seq, op.rs());
            seq.bin(BinOp::Slt, Operand::Const(0), rs)
        })
    },
    |op| classify_zero(op, false)
);

pub static BLTZ: Descriptor = branch!(
    "bltz",
    [READS_RS, BRANCH],
    RsBranch,
    |ctx, addr, op, seq| {
        compile_branch(classify_zero(op, false), false, ctx, addr, op, seq, |ctx, seq| {
            less_than_zero(ctx, seq, op)
        })
    },
    |op| classify_zero(op, false)
);

pub static BGEZ: Descriptor = branch!(
    "bgez",
    [READS_RS, BRANCH],
    RsBranch,
    |ctx, addr, op, seq| {
        compile_branch(classify_zero(op, true), false, ctx, addr, op, seq, |ctx, seq| {
            greater_or_equal_zero(ctx, seq, op)
        })
    },
    |op| classify_zero(op, true)
);

/// Links only if the branch is taken.
pub static BLTZAL: Descriptor = branch!(
    "bltzal",
    [READS_RS, BRANCH, LINK],
    RsBranch,
    |ctx, addr, op, seq| {
        compile_branch(classify_zero(op, false), true, ctx, addr, op, seq, |ctx, seq| {
            less_than_zero(ctx, seq, op)
        })
    },
    |op| classify_zero(op, false)
);

/// Links only if the branch is taken.
pub static BGEZAL: Descriptor = branch!(
    "bgezal",
    [READS_RS, BRANCH, LINK],
    RsBranch,
    |ctx, addr, op, seq| {
        compile_branch(classify_zero(op, true), true, ctx, addr, op, seq, |ctx, seq| {
            greater_or_equal_zero(ctx, seq, op)
        })
    },
    |op| classify_zero(op, true)
);

pub static J: Descriptor = branch!(
    "j",
    [JUMP],
    Jump,
    |ctx, addr, op, seq| {
        ctx.branch(seq, None, Operand::Const(op.jump_target(addr)), None);
    },
    |_| BranchKind::Always
);

/// Unconditional jumps link right away, so the delay slot sees the return address.
pub static JAL: Descriptor = branch!(
    "jal",
    [JUMP, LINK],
    Jump,
    |ctx, addr, op, seq| {
        ctx.write(seq, RegIdx::RA, Operand::Const(addr.wrapping_add(8)));
        ctx.branch(seq, None, Operand::Const(op.jump_target(addr)), None);
    },
    |_| BranchKind::Always
);

pub static JR: Descriptor = branch!(
    "jr",
    [READS_RS, JUMP],
    Rs,
    |ctx, _, op, seq| {
        let target = ctx.read(seq, op.rs());
        ctx.branch(seq, None, target, None);
    },
    |_| BranchKind::Always
);

pub static JALR: Descriptor = branch!(
    "jalr",
    [READS_RS, WRITES_RD, JUMP, LINK],
    RdRs,
    |ctx, addr, op, seq| {
        // The target is read before linking, in case `rd` and `rs` is the same register.
        let target = ctx.read(seq, op.rs());
        ctx.write(seq, op.rd(), Operand::Const(addr.wrapping_add(8)));
        ctx.branch(seq, None, target, None);
    },
    |_| BranchKind::Always
);
