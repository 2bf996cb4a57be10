//! Perspective division `H / SZ3` as a 1.16 fixed point value.
//!
//! The default is an exact rounded division. The hardware uses an unsigned Newton-Raphson
//! approximation which is available with the `unr-divide` feature. The two agree on most inputs
//! but may differ by one in the lowest bit.
//!
//! Neither saturates. The result is passed through `Lm_E`, so anything above 0x1ffff, including
//! [`OVERFLOW`], sets the divide overflow flag.

/// Result of a division which overflows, for instance if `sz` is zero.
pub const OVERFLOW: u32 = 0x7fff_ffff;

#[cfg(not(feature = "unr-divide"))]
pub fn divide(h: u16, sz: u16) -> u32 {
    if sz == 0 {
        return OVERFLOW;
    }
    let quot = ((u64::from(h) << 17) / u64::from(sz) + 1) / 2;
    quot.min(u64::from(OVERFLOW)) as u32
}

#[cfg(feature = "unr-divide")]
pub fn divide(h: u16, sz: u16) -> u32 {
    if u32::from(h) >= u32::from(sz) * 2 {
        return OVERFLOW;
    }

    let shift = sz.leading_zeros();
    let n = u64::from(h) << shift;
    let d = u32::from(sz) << shift;

    let u = u32::from(UNR_TABLE[((d - 0x7fc0) >> 7) as usize]) + 0x101;
    let d = (0x200_0080 - d * u) >> 8;
    let d = (0x000_0080 + d * u) >> 8;

    ((n * u64::from(d) + 0x8000) >> 16).min(0x1ffff) as u32
}

#[cfg(feature = "unr-divide")]
const UNR_TABLE: [u8; 0x101] = [
    0xff, 0xfd, 0xfb, 0xf9, 0xf7, 0xf5, 0xf3, 0xf1, 0xef, 0xee, 0xec, 0xea, 0xe8, 0xe6, 0xe4, 0xe3,
    0xe1, 0xdf, 0xdd, 0xdc, 0xda, 0xd8, 0xd6, 0xd5, 0xd3, 0xd1, 0xd0, 0xce, 0xcd, 0xcb, 0xc9, 0xc8,
    0xc6, 0xc5, 0xc3, 0xc1, 0xc0, 0xbe, 0xbd, 0xbb, 0xba, 0xb8, 0xb7, 0xb5, 0xb4, 0xb2, 0xb1, 0xb0,
    0xae, 0xad, 0xab, 0xaa, 0xa9, 0xa7, 0xa6, 0xa4, 0xa3, 0xa2, 0xa0, 0x9f, 0x9e, 0x9c, 0x9b, 0x9a,
    0x99, 0x97, 0x96, 0x95, 0x94, 0x92, 0x91, 0x90, 0x8f, 0x8d, 0x8c, 0x8b, 0x8a, 0x89, 0x87, 0x86,
    0x85, 0x84, 0x83, 0x82, 0x81, 0x7f, 0x7e, 0x7d, 0x7c, 0x7b, 0x7a, 0x79, 0x78, 0x77, 0x75, 0x74,
    0x73, 0x72, 0x71, 0x70, 0x6f, 0x6e, 0x6d, 0x6c, 0x6b, 0x6a, 0x69, 0x68, 0x67, 0x66, 0x65, 0x64,
    0x63, 0x62, 0x61, 0x60, 0x5f, 0x5e, 0x5d, 0x5d, 0x5c, 0x5b, 0x5a, 0x59, 0x58, 0x57, 0x56, 0x55,
    0x54, 0x53, 0x53, 0x52, 0x51, 0x50, 0x4f, 0x4e, 0x4d, 0x4d, 0x4c, 0x4b, 0x4a, 0x49, 0x48, 0x48,
    0x47, 0x46, 0x45, 0x44, 0x43, 0x43, 0x42, 0x41, 0x40, 0x3f, 0x3f, 0x3e, 0x3d, 0x3c, 0x3c, 0x3b,
    0x3a, 0x39, 0x39, 0x38, 0x37, 0x36, 0x36, 0x35, 0x34, 0x33, 0x33, 0x32, 0x31, 0x31, 0x30, 0x2f,
    0x2e, 0x2e, 0x2d, 0x2c, 0x2c, 0x2b, 0x2a, 0x2a, 0x29, 0x28, 0x28, 0x27, 0x26, 0x26, 0x25, 0x24,
    0x24, 0x23, 0x22, 0x22, 0x21, 0x20, 0x20, 0x1f, 0x1e, 0x1e, 0x1d, 0x1d, 0x1c, 0x1b, 0x1b, 0x1a,
    0x19, 0x19, 0x18, 0x18, 0x17, 0x16, 0x16, 0x15, 0x15, 0x14, 0x14, 0x13, 0x12, 0x12, 0x11, 0x11,
    0x10, 0x0f, 0x0f, 0x0e, 0x0e, 0x0d, 0x0d, 0x0c, 0x0c, 0x0b, 0x0a, 0x0a, 0x09, 0x09, 0x08, 0x08,
    0x07, 0x07, 0x06, 0x06, 0x05, 0x05, 0x04, 0x04, 0x03, 0x03, 0x02, 0x02, 0x01, 0x01, 0x00, 0x00,
    0x00,
];
