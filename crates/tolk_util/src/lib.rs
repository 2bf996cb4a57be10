pub mod bit;

pub use bit::{Bit, BitSet, SignExtend, leading_sign_bits};
