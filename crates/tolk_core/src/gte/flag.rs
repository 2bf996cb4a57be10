//! The FLAG register and the saturation stages which set it.
//!
//! Bit 31 (CHK) is the logical or of bits 30..23 and 18..13. Every flag constant which
//! contributes to CHK has it folded in, so setting any of them keeps the register consistent.

use serde::{Deserialize, Serialize};

/// Error summary.
pub const CHK: u32 = 1 << 31;

/// MAC1 result larger than 43 bits and positive.
pub const A1P: u32 = 1 << 30 | CHK;
/// MAC2 result larger than 43 bits and positive.
pub const A2P: u32 = 1 << 29 | CHK;
/// MAC3 result larger than 43 bits and positive.
pub const A3P: u32 = 1 << 28 | CHK;
/// MAC1 result larger than 43 bits and negative.
pub const A1N: u32 = 1 << 27 | CHK;
/// MAC2 result larger than 43 bits and negative.
pub const A2N: u32 = 1 << 26 | CHK;
/// MAC3 result larger than 43 bits and negative.
pub const A3N: u32 = 1 << 25 | CHK;

/// IR1 saturated.
pub const B1: u32 = 1 << 24 | CHK;
/// IR2 saturated.
pub const B2: u32 = 1 << 23 | CHK;
/// IR3 saturated.
pub const B3: u32 = 1 << 22;

/// Color FIFO red saturated.
pub const C1: u32 = 1 << 21;
/// Color FIFO green saturated.
pub const C2: u32 = 1 << 20;
/// Color FIFO blue saturated.
pub const C3: u32 = 1 << 19;

/// SZ3 or OTZ saturated.
pub const D: u32 = 1 << 18 | CHK;
/// Divide overflow.
pub const E: u32 = 1 << 17 | CHK;
/// MAC0 result larger than 31 bits and positive.
pub const FP: u32 = 1 << 16 | CHK;
/// MAC0 result larger than 31 bits and negative.
pub const FN: u32 = 1 << 15 | CHK;
/// SX2 saturated.
pub const G1: u32 = 1 << 14 | CHK;
/// SY2 saturated.
pub const G2: u32 = 1 << 13 | CHK;
/// IR0 saturated.
pub const H: u32 = 1 << 12;

/// The bits which contribute to [`CHK`].
pub const CHK_MASK: u32 = 0x7f87_e000;

/// The bits which can be written by `ctc2`.
pub const WRITE_MASK: u32 = 0x7fff_f000;

const A_POS: [u32; 4] = [0, A1P, A2P, A3P];
const A_NEG: [u32; 4] = [0, A1N, A2N, A3N];
const B: [u32; 4] = [0, B1, B2, B3];
const C: [u32; 4] = [0, C1, C2, C3];

/// Clamp `val` to `min..=max`, returning if it was out of range.
#[inline]
fn saturate<T: Ord + Copy>(val: T, min: T, max: T) -> (T, bool) {
    (val.clamp(min, max), val < min || val > max)
}

/// The sticky FLAG register.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Flags(u32);

impl Flags {
    #[inline]
    pub fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn clear(&mut self) {
        self.0 = 0;
    }

    #[inline]
    pub fn set(&mut self, flag: u32) {
        self.0 |= flag;
    }

    #[inline]
    pub fn contains(self, flag: u32) -> bool {
        self.0 & flag == flag
    }

    /// Store a value written by `ctc2`. Only bits 12..30 are writable and CHK is recalculated.
    pub fn store(&mut self, val: u32) {
        let val = val & WRITE_MASK;
        self.0 = if val & CHK_MASK != 0 { val | CHK } else { val };
    }

    /// `A1`, `A2` and `A3`. Check that an accumulation into MAC1..3 fits in 44 bits. `idx` is
    /// 1 to 3.
    #[inline]
    pub fn a(&mut self, idx: usize, val: i64) -> i64 {
        if val > (1 << 43) - 1 {
            self.set(A_POS[idx]);
        } else if val < -(1 << 43) {
            self.set(A_NEG[idx]);
        }
        val
    }

    /// `Lm_B1`, `Lm_B2` and `Lm_B3`. Saturate to IR1..3. The lower bound is 0 if `lm` is set.
    #[inline]
    pub fn lm_b(&mut self, idx: usize, val: i32, lm: bool) -> i16 {
        let min = if lm { 0 } else { -0x8000 };
        let (val, of) = saturate(val, min, 0x7fff);
        if of {
            self.set(B[idx]);
        }
        val as i16
    }

    /// `Lm_B3` as done by perspective transformation. `val` is saturated as usual, but the flag
    /// is decided by `z`, the depth before the fraction shift, and ignores `lm`.
    #[inline]
    pub fn lm_b3_ptz(&mut self, val: i32, z: i64, lm: bool) -> i16 {
        let min = if lm { 0 } else { -0x8000 };
        if !(-0x8000..=0x7fff).contains(&z) {
            self.set(B3);
        }
        val.clamp(min, 0x7fff) as i16
    }

    /// `Lm_C1`, `Lm_C2` and `Lm_C3`. Convert a MAC value to a color component.
    #[inline]
    pub fn lm_c(&mut self, idx: usize, val: i32) -> u8 {
        let (val, of) = saturate(val, 0, 0xfff);
        if of {
            self.set(C[idx]);
        }
        (val >> 4) as u8
    }

    /// `Lm_D`. Saturate a depth value to SZ3 or OTZ.
    #[inline]
    pub fn lm_d(&mut self, val: i64) -> u16 {
        let (val, of) = saturate(val, 0, 0xffff);
        if of {
            self.set(D);
        }
        val as u16
    }

    /// `Lm_E`. Saturate the result of the perspective division.
    #[inline]
    pub fn lm_e(&mut self, val: u32) -> u32 {
        if val > 0x1ffff {
            self.set(E);
            0x1ffff
        } else {
            val
        }
    }

    /// `Lm_F`. Check that a result fits in MAC0.
    #[inline]
    pub fn lm_f(&mut self, val: i64) -> i64 {
        if val > i64::from(i32::MAX) {
            self.set(FP);
        } else if val < i64::from(i32::MIN) {
            self.set(FN);
        }
        val
    }

    /// `Lm_G1`. Saturate a screen x coordinate.
    #[inline]
    pub fn lm_g1(&mut self, val: i64) -> i16 {
        let (val, of) = saturate(val, -0x400, 0x3ff);
        if of {
            self.set(G1);
        }
        val as i16
    }

    /// `Lm_G2`. Saturate a screen y coordinate.
    #[inline]
    pub fn lm_g2(&mut self, val: i64) -> i16 {
        let (val, of) = saturate(val, -0x400, 0x3ff);
        if of {
            self.set(G2);
        }
        val as i16
    }

    /// `Lm_H`. Saturate a depth cueing factor to IR0.
    #[inline]
    pub fn lm_h(&mut self, val: i64) -> i16 {
        let (val, of) = saturate(val, 0, 0xfff);
        if of {
            self.set(H);
        }
        val as i16
    }
}
