//! Micro-operations emitted by the translator.
//!
//! A translated block is a flat list of [`MicroOp`]s working on numbered temporaries. Operands
//! are either a temporary or a constant, which is how the translator hands folded values to the
//! backend. Nothing here knows how the operations are executed, see [`super::exec`] for the
//! reference backend.

use crate::bus::Width;
use crate::cop0::Exception;
use super::opcode::RegIdx;

use std::fmt;

/// A temporary value produced by a micro-operation.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Temp(pub u32);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Operand {
    Temp(Temp),
    Const(u32),
}

impl Operand {
    pub fn as_const(self) -> Option<u32> {
        match self {
            Operand::Const(val) => Some(val),
            Operand::Temp(_) => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operand::Temp(temp) => write!(f, "t{}", temp.0),
            Operand::Const(val) => write!(f, "{val:#x}"),
        }
    }
}

/// A register of the CPU as seen by micro-operations.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Reg {
    Gpr(RegIdx),
    Hi,
    Lo,
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Reg::Gpr(idx) => write!(f, "{idx}"),
            Reg::Hi => f.write_str("$hi"),
            Reg::Lo => f.write_str("$lo"),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BinOp {
    Add,
    /// Add which traps on signed overflow.
    AddTrap,
    Sub,
    /// Subtract which traps on signed overflow.
    SubTrap,
    And,
    Or,
    Xor,
    Nor,
    /// Signed less than. Results in 1 or 0.
    Slt,
    /// Unsigned less than. Results in 1 or 0.
    Sltu,
    /// Shift left by the low 5 bits of the right hand side.
    Sll,
    /// Logical shift right by the low 5 bits of the right hand side.
    Srl,
    /// Arithmetic shift right by the low 5 bits of the right hand side.
    Sra,
    Eq,
    Ne,
    /// Low word of the product. The same for signed and unsigned operands.
    MulLo,
    /// High word of the signed product.
    MulHi,
    /// High word of the unsigned product.
    MulHiU,
    /// Signed quotient.
    Div,
    /// Signed remainder.
    Rem,
    /// Unsigned quotient.
    DivU,
    /// Unsigned remainder.
    RemU,
}

impl BinOp {
    /// Evaluate the operation. This is the only definition of the arithmetic. The compiler uses
    /// it for folding, the backend for executing and the instruction simulators for
    /// interpreting.
    ///
    /// Returns `None` if the operation traps, which only `AddTrap` and `SubTrap` do.
    pub fn eval(self, lhs: u32, rhs: u32) -> Option<u32> {
        let val = match self {
            BinOp::Add => lhs.wrapping_add(rhs),
            BinOp::AddTrap => return (lhs as i32).checked_add(rhs as i32).map(|val| val as u32),
            BinOp::Sub => lhs.wrapping_sub(rhs),
            BinOp::SubTrap => return (lhs as i32).checked_sub(rhs as i32).map(|val| val as u32),
            BinOp::And => lhs & rhs,
            BinOp::Or => lhs | rhs,
            BinOp::Xor => lhs ^ rhs,
            BinOp::Nor => !(lhs | rhs),
            BinOp::Slt => ((lhs as i32) < (rhs as i32)) as u32,
            BinOp::Sltu => (lhs < rhs) as u32,
            BinOp::Sll => lhs << (rhs & 0x1f),
            BinOp::Srl => lhs >> (rhs & 0x1f),
            BinOp::Sra => ((lhs as i32) >> (rhs & 0x1f)) as u32,
            BinOp::Eq => (lhs == rhs) as u32,
            BinOp::Ne => (lhs != rhs) as u32,
            BinOp::MulLo => lhs.wrapping_mul(rhs),
            BinOp::MulHi => {
                let val = i64::from(lhs as i32) * i64::from(rhs as i32);
                (val >> 32) as u32
            }
            BinOp::MulHiU => {
                let val = u64::from(lhs) * u64::from(rhs);
                (val >> 32) as u32
            }
            // Division by zero doesn't trap. The result is garbage computed by the division
            // hardware, which for the quotient ends up as 1 or -1 depending on the sign of the
            // dividend.
            BinOp::Div => match (lhs as i32, rhs as i32) {
                (lhs, 0) if lhs < 0 => 1,
                (_, 0) => 0xffff_ffff,
                (i32::MIN, -1) => 0x8000_0000,
                (lhs, rhs) => (lhs / rhs) as u32,
            },
            BinOp::Rem => match (lhs as i32, rhs as i32) {
                (lhs, 0) => lhs as u32,
                (i32::MIN, -1) => 0,
                (lhs, rhs) => (lhs % rhs) as u32,
            },
            BinOp::DivU => match rhs {
                0 => 0xffff_ffff,
                rhs => lhs / rhs,
            },
            BinOp::RemU => match rhs {
                0 => lhs,
                rhs => lhs % rhs,
            },
        };
        Some(val)
    }

    pub fn may_trap(self) -> bool {
        matches!(self, BinOp::AddTrap | BinOp::SubTrap)
    }
}

/// Merging of a partial word for the unaligned loads and stores. The byte offset into the
/// word, `addr & 3`, indexes the masks and shifts.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MergeKind {
    Lwl,
    Lwr,
    Swl,
    Swr,
}

impl MergeKind {
    /// Merge `reg` and the aligned memory word `word`. For loads the result is the new register
    /// value, for stores it's the word to write back.
    pub fn merge(self, reg: u32, word: u32, addr: u32) -> u32 {
        let idx = (addr & 3) as usize;
        match self {
            MergeKind::Lwl => {
                const MASK: [u32; 4] = [0x00ff_ffff, 0x0000_ffff, 0x0000_00ff, 0x0000_0000];
                const SHIFT: [u32; 4] = [24, 16, 8, 0];
                (reg & MASK[idx]) | (word << SHIFT[idx])
            }
            MergeKind::Lwr => {
                const MASK: [u32; 4] = [0x0000_0000, 0xff00_0000, 0xffff_0000, 0xffff_ff00];
                const SHIFT: [u32; 4] = [0, 8, 16, 24];
                (reg & MASK[idx]) | (word >> SHIFT[idx])
            }
            MergeKind::Swl => {
                const MASK: [u32; 4] = [0xffff_ff00, 0xffff_0000, 0xff00_0000, 0x0000_0000];
                const SHIFT: [u32; 4] = [24, 16, 8, 0];
                (word & MASK[idx]) | (reg >> SHIFT[idx])
            }
            MergeKind::Swr => {
                const MASK: [u32; 4] = [0x0000_0000, 0x0000_00ff, 0x0000_ffff, 0x00ff_ffff];
                const SHIFT: [u32; 4] = [0, 8, 16, 24];
                (word & MASK[idx]) | (reg << SHIFT[idx])
            }
        }
    }
}

/// Calls out of the block into the coprocessors and the system control port.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Call {
    GteDataLoad(u8),
    GteDataStore(u8),
    GteControlLoad(u8),
    GteControlStore(u8),
    /// Run a GTE command. Holds the whole instruction word.
    GteExec(u32),
    Cop0Load(u8),
    Cop0Store(u8),
    ReturnFromException,
    /// Signal an exception and leave the block.
    Signal(Exception),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MicroOp {
    /// Marks the start of the instruction at `addr`.
    Ins { addr: u32 },
    LoadReg { dst: Temp, reg: Reg },
    StoreReg { reg: Reg, src: Operand },
    BinOp { op: BinOp, dst: Temp, lhs: Operand, rhs: Operand },
    Merge { kind: MergeKind, dst: Temp, reg: Operand, word: Operand, addr: Operand },
    /// Read from memory. `signed` sign extends bytes and half words.
    MemRead { width: Width, signed: bool, dst: Temp, addr: Operand, tagged: bool },
    MemWrite { width: Width, addr: Operand, src: Operand, tagged: bool },
    /// Leave the block and continue at `target` if `cond` is non-zero or missing. `link` is
    /// written only when the branch is taken.
    Branch { cond: Option<Operand>, target: Operand, link: Option<(RegIdx, u32)> },
    Call { call: Call, arg: Option<Operand>, dst: Option<Temp> },
}

impl fmt::Display for MicroOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MicroOp::Ins { addr } => write!(f, "{addr:08x}:"),
            MicroOp::LoadReg { dst, reg } => write!(f, "  t{} = {reg}", dst.0),
            MicroOp::StoreReg { reg, src } => write!(f, "  {reg} = {src}"),
            MicroOp::BinOp { op, dst, lhs, rhs } => {
                write!(f, "  t{} = {op:?} {lhs}, {rhs}", dst.0)
            }
            MicroOp::Merge { kind, dst, reg, word, addr } => {
                write!(f, "  t{} = {kind:?} {reg}, {word}, {addr}", dst.0)
            }
            MicroOp::MemRead { width, signed, dst, addr, tagged } => {
                let sign = if *signed { "s" } else { "u" };
                let tag = if *tagged { "" } else { " untagged" };
                write!(f, "  t{} = read.{sign}{width} [{addr}]{tag}", dst.0)
            }
            MicroOp::MemWrite { width, addr, src, tagged } => {
                let tag = if *tagged { "" } else { " untagged" };
                write!(f, "  write.{width} [{addr}], {src}{tag}")
            }
            MicroOp::Branch { cond, target, link } => {
                f.write_str("  branch ")?;
                if let Some(cond) = cond {
                    write!(f, "if {cond} ")?;
                }
                write!(f, "to {target}")?;
                if let Some((reg, val)) = link {
                    write!(f, ", link {reg} = {val:#x}")?;
                }
                Ok(())
            }
            MicroOp::Call { call, arg, dst } => {
                f.write_str("  ")?;
                if let Some(dst) = dst {
                    write!(f, "t{} = ", dst.0)?;
                }
                write!(f, "call {call:?}")?;
                if let Some(arg) = arg {
                    write!(f, " {arg}")?;
                }
                Ok(())
            }
        }
    }
}

/// Append only sequence of micro-operations.
///
/// Binary operations on two constants are folded right away, reading `$zero` gives a constant
/// zero and writes to `$zero` are dropped.
#[derive(Default, Debug)]
pub struct Seq {
    ops: Vec<MicroOp>,
    temps: u32,
}

impl Seq {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn temp(&mut self) -> Temp {
        let temp = Temp(self.temps);
        self.temps += 1;
        temp
    }

    pub fn push(&mut self, op: MicroOp) {
        self.ops.push(op);
    }

    pub fn ops(&self) -> &[MicroOp] {
        &self.ops
    }

    pub fn temp_count(&self) -> u32 {
        self.temps
    }

    pub fn into_parts(self) -> (Vec<MicroOp>, u32) {
        (self.ops, self.temps)
    }

    pub fn load_reg(&mut self, reg: Reg) -> Operand {
        if reg == Reg::Gpr(RegIdx::ZERO) {
            return Operand::Const(0);
        }
        let dst = self.temp();
        self.push(MicroOp::LoadReg { dst, reg });
        Operand::Temp(dst)
    }

    pub fn store_reg(&mut self, reg: Reg, src: Operand) {
        if reg != Reg::Gpr(RegIdx::ZERO) {
            self.push(MicroOp::StoreReg { reg, src });
        }
    }

    pub fn bin(&mut self, op: BinOp, lhs: Operand, rhs: Operand) -> Operand {
        if let (Operand::Const(lhs), Operand::Const(rhs)) = (lhs, rhs) {
            if let Some(val) = op.eval(lhs, rhs) {
                return Operand::Const(val);
            }
        }
        let dst = self.temp();
        self.push(MicroOp::BinOp { op, dst, lhs, rhs });
        Operand::Temp(dst)
    }

    pub fn merge(&mut self, kind: MergeKind, reg: Operand, word: Operand, addr: Operand) -> Operand {
        if let (Some(reg), Some(word), Some(addr)) = (reg.as_const(), word.as_const(), addr.as_const()) {
            return Operand::Const(kind.merge(reg, word, addr));
        }
        let dst = self.temp();
        self.push(MicroOp::Merge { kind, dst, reg, word, addr });
        Operand::Temp(dst)
    }

    pub fn read(&mut self, width: Width, signed: bool, addr: Operand, tagged: bool) -> Operand {
        let dst = self.temp();
        self.push(MicroOp::MemRead { width, signed, dst, addr, tagged });
        Operand::Temp(dst)
    }

    pub fn write(&mut self, width: Width, addr: Operand, src: Operand, tagged: bool) {
        self.push(MicroOp::MemWrite { width, addr, src, tagged });
    }

    pub fn call(&mut self, call: Call, arg: Option<Operand>) {
        self.push(MicroOp::Call { call, arg, dst: None });
    }

    pub fn call_with_result(&mut self, call: Call, arg: Option<Operand>) -> Operand {
        let dst = self.temp();
        self.push(MicroOp::Call { call, arg, dst: Some(dst) });
        Operand::Temp(dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn division_by_zero() {
        assert_eq!(BinOp::Div.eval(5, 0), Some(0xffff_ffff));
        assert_eq!(BinOp::Rem.eval(5, 0), Some(5));
        assert_eq!(BinOp::Div.eval(-5_i32 as u32, 0), Some(1));
        assert_eq!(BinOp::Rem.eval(-5_i32 as u32, 0), Some(-5_i32 as u32));
        assert_eq!(BinOp::DivU.eval(5, 0), Some(0xffff_ffff));
        assert_eq!(BinOp::RemU.eval(5, 0), Some(5));
    }

    #[test]
    fn division_overflow() {
        assert_eq!(BinOp::Div.eval(0x8000_0000, 0xffff_ffff), Some(0x8000_0000));
        assert_eq!(BinOp::Rem.eval(0x8000_0000, 0xffff_ffff), Some(0));
    }

    #[test]
    fn trapping_add() {
        assert_eq!(BinOp::AddTrap.eval(0x7fff_ffff, 1), None);
        assert_eq!(BinOp::AddTrap.eval(0xffff_ffff, 1), Some(0));
        assert_eq!(BinOp::SubTrap.eval(0x8000_0000, 1), None);
        assert_eq!(BinOp::Add.eval(0x7fff_ffff, 1), Some(0x8000_0000));
    }

    #[test]
    fn shifts_mask_amount() {
        assert_eq!(BinOp::Sll.eval(1, 33), Some(2));
        assert_eq!(BinOp::Srl.eval(0x8000_0000, 31), Some(1));
        assert_eq!(BinOp::Sra.eval(0x8000_0000, 31), Some(0xffff_ffff));
    }

    #[test]
    fn unaligned_merge() {
        assert_eq!(MergeKind::Lwl.merge(0xaabb_ccdd, 0x1234_5678, 1), 0x5678_ccdd);
        assert_eq!(MergeKind::Lwl.merge(0xaabb_ccdd, 0x1234_5678, 3), 0x1234_5678);
        assert_eq!(MergeKind::Lwr.merge(0xaabb_ccdd, 0x1234_5678, 0), 0x1234_5678);
        assert_eq!(MergeKind::Lwr.merge(0xaabb_ccdd, 0x1234_5678, 2), 0xaabb_1234);
        assert_eq!(MergeKind::Swl.merge(0xaabb_ccdd, 0x1234_5678, 0), 0x1234_56aa);
        assert_eq!(MergeKind::Swr.merge(0xaabb_ccdd, 0x1234_5678, 3), 0xdd34_5678);
    }

    #[test]
    fn constants_fold() {
        let mut seq = Seq::new();

        let val = seq.bin(BinOp::Add, Operand::Const(1), Operand::Const(2));
        assert_eq!(val, Operand::Const(3));

        // Overflowing trap is left for the backend.
        let val = seq.bin(BinOp::AddTrap, Operand::Const(0x7fff_ffff), Operand::Const(1));
        assert!(matches!(val, Operand::Temp(_)));
        assert_eq!(seq.ops().len(), 1);
    }

    #[test]
    fn zero_register() {
        let mut seq = Seq::new();

        assert_eq!(seq.load_reg(Reg::Gpr(RegIdx::ZERO)), Operand::Const(0));
        seq.store_reg(Reg::Gpr(RegIdx::ZERO), Operand::Const(1));

        assert!(seq.ops().is_empty());
    }
}
