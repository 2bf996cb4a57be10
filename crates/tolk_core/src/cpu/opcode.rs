//! Decoding of MIPS R3000 Opcodes.
//!
//! All Opcodes are encoded in 32 bits.
//!
//! There are three main opcode layouts:
//! - Immediate
//!     - 6-bit op.
//!     - 5-bit source register.
//!     - 5-bit target register.
//!     - 16-bit immediate value.
//!
//! - Jump
//!     - 6-bit op.
//!     - 26-bit target address.
//!
//! - Register
//!     - 6-bit op.
//!     - 5-bit source register.
//!     - 5-bit target register.
//!     - 5-bit destination register.
//!     - 5-bit shift value.
//!     - 6-bit function field.
//!
//! Two op values select a second table. Op 0x0 (SPECIAL) is decoded by the function field and
//! op 0x1 (REGIMM) by the target register field.

use tolk_util::{Bit, SignExtend};

use std::fmt;

/// Index of a general purpose register.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct RegIdx(pub u8);

impl RegIdx {
    pub const ZERO: Self = Self(0);
    pub const AT: Self = Self(1);
    pub const V0: Self = Self(2);
    pub const V1: Self = Self(3);
    pub const A0: Self = Self(4);
    pub const A1: Self = Self(5);
    pub const A2: Self = Self(6);
    pub const A3: Self = Self(7);
    pub const T0: Self = Self(8);
    pub const T1: Self = Self(9);
    pub const T2: Self = Self(10);
    pub const S0: Self = Self(16);
    pub const S1: Self = Self(17);
    pub const K0: Self = Self(26);
    pub const GP: Self = Self(28);
    pub const SP: Self = Self(29);
    pub const FP: Self = Self(30);
    pub const RA: Self = Self(31);

    #[inline]
    pub fn idx(self) -> usize {
        self.0 as usize
    }

    pub fn name(self) -> &'static str {
        REGISTER_NAMES[self.idx() & 0x1f]
    }
}

impl From<u32> for RegIdx {
    fn from(val: u32) -> Self {
        Self(val as u8 & 0x1f)
    }
}

impl fmt::Display for RegIdx {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "${}", self.name())
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Opcode(pub u32);

impl Opcode {
    pub fn new(opcode: u32) -> Self {
        Opcode(opcode)
    }

    /// Operation.
    pub fn op(self) -> u32 {
        self.0.bit_range(26, 31)
    }

    /// Function field, used to decode SPECIAL instructions.
    pub fn special(self) -> u32 {
        self.0.bit_range(0, 5)
    }

    /// The target register field, used to decode REGIMM instructions.
    pub fn regimm(self) -> u32 {
        self.0.bit_range(16, 20)
    }

    /// Coprocessor operation.
    pub fn cop_op(self) -> u32 {
        self.0.bit_range(21, 25)
    }

    /// Immediate value.
    pub fn imm(self) -> u32 {
        self.0.bit_range(0, 15)
    }

    /// Sign extended immediate value.
    pub fn signed_imm(self) -> u32 {
        self.0.sext16()
    }

    /// Jump target.
    pub fn target(self) -> u32 {
        self.0.bit_range(0, 25)
    }

    pub fn shift(self) -> u32 {
        self.0.bit_range(6, 10)
    }

    /// Destination register.
    pub fn rd(self) -> RegIdx {
        RegIdx::from(self.0.bit_range(11, 15))
    }

    /// Target register.
    pub fn rt(self) -> RegIdx {
        RegIdx::from(self.0.bit_range(16, 20))
    }

    /// Source register.
    pub fn rs(self) -> RegIdx {
        RegIdx::from(self.0.bit_range(21, 25))
    }

    /// Coprocessor register number in the `rd` field.
    pub fn cop_reg(self) -> u8 {
        self.0.bit_range(11, 15) as u8
    }

    /// Address of a relative branch at `addr`. It's relative to the delay slot.
    pub fn branch_target(self, addr: u32) -> u32 {
        addr.wrapping_add(4).wrapping_add(self.signed_imm() << 2)
    }

    /// Address of an absolute jump at `addr`. The upper bits comes from the delay slot address.
    pub fn jump_target(self, addr: u32) -> u32 {
        (addr.wrapping_add(4) & 0xf000_0000) | (self.target() << 2)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

pub const REGISTER_NAMES: [&str; 32] = [
    "zero", "at", "v0", "v1", "a0", "a1", "a2", "a3", "t0", "t1", "t2", "t3", "t4", "t5", "t6",
    "t7", "s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7", "t8", "t9", "k0", "k1", "gp", "sp", "fp",
    "ra",
];
