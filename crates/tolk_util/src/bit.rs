macro_rules! impl_bit {
    ($t:ident) => {
        impl Bit for $t {
            #[inline]
            fn bit(self, n: usize) -> bool {
                (self >> n) & 1 == 1
            }

            #[inline]
            fn bit_range(self, ls: usize, ms: usize) -> Self {
                let width = ms - ls + 1;
                let mask = if width >= Self::BITS as usize {
                    !0
                } else {
                    ((1 as Self) << width) - 1
                };
                (self >> ls) & mask
            }
        }
    }
}

macro_rules! impl_bit_set {
    ($t:ident) => {
        impl BitSet for $t {
            #[inline]
            fn set_bit(self, bit: usize, val: bool) -> Self {
                (self & !(1 << bit)) | ((val as Self) << bit)
            }

            #[inline]
            fn set_bit_range(self, ls: usize, ms: usize, val: Self) -> Self {
                let mask = (1 << (ms - ls + 1)) - 1;
                (self & !(mask << ls)) | ((val & mask) << ls)
            }
        }
    }
}

impl_bit!(u32);
impl_bit!(u16);

impl_bit_set!(u32);
impl_bit_set!(u16);

/// Extract a value between two given bit positions.
pub trait Bit {
    /// Extract a single bit.
    #[must_use]
    fn bit(self, n: usize) -> bool;

    /// Extract a range of bits. Both ends are inclusive.
    #[must_use]
    fn bit_range(self, ls: usize, ms: usize) -> Self;
}

pub trait BitSet {
    #[must_use]
    fn set_bit(self, bit: usize, val: bool) -> Self;

    #[must_use]
    fn set_bit_range(self, ls: usize, ms: usize, val: Self) -> Self;
}

/// Sign extension of the low half of a word.
pub trait SignExtend {
    /// Sign extend bits `0..16` to a full word.
    fn sext16(self) -> u32;

    /// Sign extend bits `0..8` to a full word.
    fn sext8(self) -> u32;
}

impl SignExtend for u32 {
    #[inline]
    fn sext16(self) -> u32 {
        self as u16 as i16 as i32 as u32
    }

    #[inline]
    fn sext8(self) -> u32 {
        self as u8 as i8 as i32 as u32
    }
}

/// Count the leading bits equal to the sign bit. For positive values that's the leading zeroes
/// and for negative values the leading ones.
#[inline]
pub fn leading_sign_bits(val: i32) -> u32 {
    if val >= 0 {
        val.leading_zeros()
    } else {
        (!val).leading_zeros()
    }
}

#[test]
fn test_set_bit_range() {
    let a = 0_u32.set_bit_range(3, 4, 0b11);
    assert_eq!(0b11000, a);

    let a = 0_u32.set_bit_range(0, 10, u32::MAX);
    assert_eq!(0b11111111111, a);

    let a = 0_u32.set_bit_range(1, 2, 0b11);
    assert_eq!(0b110, a);
}

#[test]
fn test_bit_range() {
    assert_eq!(0xdead_beef_u32.bit_range(16, 31), 0xdead);
    assert_eq!(0xdead_beef_u32.bit_range(0, 31), 0xdead_beef);
    assert_eq!(0x8000_0000_u32.bit_range(26, 31), 0x20);
    assert!(0x8000_0000_u32.bit(31));
}

#[test]
fn test_sign_extend() {
    assert_eq!(0x8000_u32.sext16(), 0xffff_8000);
    assert_eq!(0x1234_7fff_u32.sext16(), 0x0000_7fff);
    assert_eq!(0x80_u32.sext8(), 0xffff_ff80);
}

#[test]
fn test_leading_sign_bits() {
    assert_eq!(leading_sign_bits(0), 32);
    assert_eq!(leading_sign_bits(-1), 32);
    assert_eq!(leading_sign_bits(1), 31);
    assert_eq!(leading_sign_bits(i32::MIN), 1);
    assert_eq!(leading_sign_bits(0x0000_ffff), 16);
    assert_eq!(leading_sign_bits(-0x10000), 16);
    assert_eq!(leading_sign_bits(-0x10001), 15);
}
