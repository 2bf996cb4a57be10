//! The Geometry Transformation Engine.
//!
//! A fixed point coprocessor doing vector and matrix math for 3D graphics. It's attached as
//! coprocessor 2, and has 32 data registers and 32 control registers, which are moved to and
//! from the CPU with `mfc2`, `mtc2`, `cfc2`, `ctc2`, `lwc2` and `swc2`. Commands are issued
//! with `cop2`.
//!
//! Most registers are 16 bits in a 32 bit cell. Some are paired, holding two 16-bit fields where
//! the first field is the low half.

mod cmd;
mod divide;
pub mod flag;
pub mod ins;

pub use divide::divide;
pub use flag::Flags;

use tolk_util::leading_sign_bits;

use serde::{Deserialize, Serialize};

type Matrix = [[i16; 3]; 3];

#[derive(Clone, Default, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Gte {
    /// Input vectors V0, V1 and V2.
    v: [[i16; 3]; 3],
    /// Color and code value.
    rgbc: [u8; 4],
    /// Average Z value.
    otz: u16,
    /// IR0 to IR3.
    ir: [i16; 4],
    /// Screen XY FIFO. The last entry is the newest.
    sxy: [[i16; 2]; 3],
    /// Screen Z FIFO. The last entry is the newest.
    sz: [u16; 4],
    /// Color FIFO. The last entry is the newest.
    rgb: [[u8; 4]; 3],
    res1: u32,
    /// MAC0 to MAC3.
    mac: [i32; 4],
    /// Leading sign bit count input.
    lzcs: u32,
    /// Leading sign bit count of `lzcs`.
    lzcr: u32,

    /// Rotation matrix.
    rt: Matrix,
    /// Translation vector.
    tr: [i32; 3],
    /// Light source matrix.
    llm: Matrix,
    /// Background color.
    bk: [i32; 3],
    /// Light color matrix.
    lcm: Matrix,
    /// Far color.
    fc: [i32; 3],
    ofx: i32,
    ofy: i32,
    /// Projection plane distance.
    h: u16,
    /// Depth cueing coefficient.
    dqa: i16,
    /// Depth cueing offset.
    dqb: i32,
    /// Average Z scale factors.
    zsf3: i16,
    zsf4: i16,
    flags: Flags,
}

#[inline]
fn lo(val: u32) -> i16 {
    val as u16 as i16
}

#[inline]
fn hi(val: u32) -> i16 {
    (val >> 16) as u16 as i16
}

#[inline]
fn pair(lo: i16, hi: i16) -> u32 {
    u32::from(lo as u16) | u32::from(hi as u16) << 16
}

#[inline]
fn sext(val: i16) -> u32 {
    i32::from(val) as u32
}

/// Read one of the five registers holding a matrix. The nine elements are packed two per
/// register in row major order, so the last register only holds a single sign extended element.
fn matrix_load(mat: &Matrix, idx: usize) -> u32 {
    let elem = |n: usize| mat[n / 3][n % 3];
    match idx {
        0..=3 => pair(elem(idx * 2), elem(idx * 2 + 1)),
        _ => sext(mat[2][2]),
    }
}

fn matrix_store(mat: &mut Matrix, idx: usize, val: u32) {
    match idx {
        0..=3 => {
            let (a, b) = (idx * 2, idx * 2 + 1);
            mat[a / 3][a % 3] = lo(val);
            mat[b / 3][b % 3] = hi(val);
        }
        _ => mat[2][2] = lo(val),
    }
}

fn color_load(rgb: [u8; 4]) -> u32 {
    u32::from_le_bytes(rgb)
}

impl Gte {
    pub fn new() -> Self {
        Self::default()
    }

    /// The FLAG register.
    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// IRGB and ORGB. IR1..3 converted to 5-bit color components.
    fn orgb(&self) -> u32 {
        let comp = |ir: i16| (ir >> 7).clamp(0, 0x1f) as u32;
        comp(self.ir[1]) | comp(self.ir[2]) << 5 | comp(self.ir[3]) << 10
    }

    /// `mfc2` and `swc2`.
    pub fn data_load(&self, reg: u8) -> u32 {
        let reg = reg & 0x1f;
        match reg {
            0 | 2 | 4 => {
                let v = &self.v[usize::from(reg / 2)];
                pair(v[0], v[1])
            }
            1 | 3 | 5 => sext(self.v[usize::from(reg / 2)][2]),
            6 => color_load(self.rgbc),
            7 => u32::from(self.otz),
            8..=11 => sext(self.ir[usize::from(reg - 8)]),
            12..=14 => {
                let [x, y] = self.sxy[usize::from(reg - 12)];
                pair(x, y)
            }
            // SXYP mirrors SXY2 on reads.
            15 => pair(self.sxy[2][0], self.sxy[2][1]),
            16..=19 => u32::from(self.sz[usize::from(reg - 16)]),
            20..=22 => color_load(self.rgb[usize::from(reg - 20)]),
            23 => self.res1,
            24..=27 => self.mac[usize::from(reg - 24)] as u32,
            28 | 29 => self.orgb(),
            30 => self.lzcs,
            _ => self.lzcr,
        }
    }

    /// `mtc2` and `lwc2`.
    pub fn data_store(&mut self, reg: u8, val: u32) {
        let reg = reg & 0x1f;
        match reg {
            0 | 2 | 4 => {
                let v = &mut self.v[usize::from(reg / 2)];
                v[0] = lo(val);
                v[1] = hi(val);
            }
            1 | 3 | 5 => self.v[usize::from(reg / 2)][2] = lo(val),
            6 => self.rgbc = val.to_le_bytes(),
            7 => self.otz = val as u16,
            8..=11 => self.ir[usize::from(reg - 8)] = lo(val),
            12..=14 => self.sxy[usize::from(reg - 12)] = [lo(val), hi(val)],
            15 => self.sxy_push(lo(val), hi(val)),
            16..=19 => self.sz[usize::from(reg - 16)] = val as u16,
            20..=22 => self.rgb[usize::from(reg - 20)] = val.to_le_bytes(),
            23 => self.res1 = val,
            24..=27 => self.mac[usize::from(reg - 24)] = val as i32,
            28 => {
                let comp = |shift: u32| ((val >> shift & 0x1f) << 7) as i16;
                self.ir[1] = comp(0);
                self.ir[2] = comp(5);
                self.ir[3] = comp(10);
            }
            30 => {
                self.lzcs = val;
                self.lzcr = leading_sign_bits(val as i32);
            }
            _ => warn!("write {val:08x} to read-only GTE data register {reg}"),
        }
    }

    /// `cfc2`.
    pub fn control_load(&self, reg: u8) -> u32 {
        let reg = reg & 0x1f;
        match reg {
            0..=4 => matrix_load(&self.rt, usize::from(reg)),
            5..=7 => self.tr[usize::from(reg - 5)] as u32,
            8..=12 => matrix_load(&self.llm, usize::from(reg - 8)),
            13..=15 => self.bk[usize::from(reg - 13)] as u32,
            16..=20 => matrix_load(&self.lcm, usize::from(reg - 16)),
            21..=23 => self.fc[usize::from(reg - 21)] as u32,
            24 => self.ofx as u32,
            25 => self.ofy as u32,
            // H is unsigned, but reads are sign extended anyway.
            26 => sext(self.h as i16),
            27 => sext(self.dqa),
            28 => self.dqb as u32,
            29 => sext(self.zsf3),
            30 => sext(self.zsf4),
            _ => self.flags.bits(),
        }
    }

    /// `ctc2`.
    pub fn control_store(&mut self, reg: u8, val: u32) {
        let reg = reg & 0x1f;
        match reg {
            0..=4 => matrix_store(&mut self.rt, usize::from(reg), val),
            5..=7 => self.tr[usize::from(reg - 5)] = val as i32,
            8..=12 => matrix_store(&mut self.llm, usize::from(reg - 8), val),
            13..=15 => self.bk[usize::from(reg - 13)] = val as i32,
            16..=20 => matrix_store(&mut self.lcm, usize::from(reg - 16), val),
            21..=23 => self.fc[usize::from(reg - 21)] = val as i32,
            24 => self.ofx = val as i32,
            25 => self.ofy = val as i32,
            26 => self.h = val as u16,
            27 => self.dqa = lo(val),
            28 => self.dqb = val as i32,
            29 => self.zsf3 = lo(val),
            30 => self.zsf4 = lo(val),
            _ => self.flags.store(val),
        }
    }

    /// Push onto the screen XY FIFO.
    fn sxy_push(&mut self, x: i16, y: i16) {
        self.sxy.rotate_left(1);
        self.sxy[2] = [x, y];
    }

    /// Push onto the screen Z FIFO.
    fn sz_push(&mut self, z: u16) {
        self.sz.rotate_left(1);
        self.sz[3] = z;
    }

    /// Push MAC1..3 onto the color FIFO, with the code from RGBC.
    fn rgb_push(&mut self) {
        let color = [
            self.flags.lm_c(1, self.mac[1]),
            self.flags.lm_c(2, self.mac[2]),
            self.flags.lm_c(3, self.mac[3]),
            self.rgbc[3],
        ];
        self.rgb.rotate_left(1);
        self.rgb[2] = color;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// VXY0 to VXY2 and SXY0 to SXY2.
    const PAIRED: [u8; 6] = [0, 2, 4, 12, 13, 14];

    fn assert_pair_round_trip(gte: &mut Gte, reg: u8, lo: i16, hi: i16) {
        gte.data_store(reg, pair(lo, hi));
        let val = gte.data_load(reg);
        assert_eq!(val as u16 as i16, lo, "low half of register {reg}");
        assert_eq!((val >> 16) as u16 as i16, hi, "high half of register {reg}");
    }

    #[test]
    fn paired_data_registers() {
        let mut gte = Gte::new();

        let edges = [i16::MIN, i16::MIN + 1, -1, 0, 1, i16::MAX - 1, i16::MAX];
        for reg in PAIRED {
            for val in (i16::MIN..=i16::MAX).step_by(0x101) {
                for edge in edges {
                    assert_pair_round_trip(&mut gte, reg, val, edge);
                    assert_pair_round_trip(&mut gte, reg, edge, val);
                }
            }
        }

        let mut rng = StdRng::seed_from_u64(0x9a1e);
        for _ in 0..10_000 {
            let reg = PAIRED[rng.gen_range(0..PAIRED.len())];
            assert_pair_round_trip(&mut gte, reg, rng.gen(), rng.gen());
        }
    }

    #[test]
    fn snapshot_round_trip() {
        let mut gte = Gte::new();
        gte.control_store(0, pair(0x1000, -3));
        gte.control_store(5, 0x0123_4567);
        gte.control_store(26, 256);
        gte.data_store(0, pair(-20, 30));
        gte.data_store(1, 256);
        gte.data_store(6, 0x1122_3344);
        gte.exec(0x0018_0001);

        let snapshot = match toml::to_string(&gte) {
            Ok(snapshot) => snapshot,
            Err(err) => panic!("{err}"),
        };
        let restored: Gte = match toml::from_str(&snapshot) {
            Ok(restored) => restored,
            Err(err) => panic!("{err}"),
        };

        assert_eq!(restored, gte);
        assert_eq!(restored.data_load(19), gte.data_load(19));
    }

    #[test]
    fn matrix_registers() {
        let mut gte = Gte::new();
        gte.control_store(8, pair(1, 2));
        gte.control_store(9, pair(3, 4));
        gte.control_store(10, pair(5, 6));
        gte.control_store(11, pair(7, 8));
        gte.control_store(12, 0x1234_fff7);

        assert_eq!(gte.llm, [[1, 2, 3], [4, 5, 6], [7, 8, -9]]);
        assert_eq!(gte.control_load(9), pair(3, 4));
        assert_eq!(gte.control_load(12), 0xffff_fff7);
    }

    #[test]
    fn sign_extended_readback() {
        let mut gte = Gte::new();
        gte.control_store(26, 0x8000);
        gte.control_store(27, 0x0001_8000);
        gte.control_store(29, 0xffff);

        assert_eq!(gte.control_load(26), 0xffff_8000);
        assert_eq!(gte.control_load(27), 0xffff_8000);
        assert_eq!(gte.control_load(29), 0xffff_ffff);

        gte.data_store(1, 0x0000_8000);
        assert_eq!(gte.data_load(1), 0xffff_8000);

        gte.data_store(17, 0xffff_8000);
        assert_eq!(gte.data_load(17), 0x8000);
    }

    #[test]
    fn sxyp_pushes_fifo() {
        let mut gte = Gte::new();
        gte.data_store(12, pair(1, 1));
        gte.data_store(13, pair(2, 2));
        gte.data_store(14, pair(3, 3));
        gte.data_store(15, pair(4, -4));

        assert_eq!(gte.sxy, [[2, 2], [3, 3], [4, -4]]);
        assert_eq!(gte.data_load(15), pair(4, -4));
    }

    #[test]
    fn irgb_conversion() {
        let mut gte = Gte::new();
        gte.data_store(28, 0x7fff_0000 | 3 << 10 | 2 << 5 | 1);

        assert_eq!(gte.ir[1..], [1 << 7, 2 << 7, 3 << 7]);
        assert_eq!(gte.data_load(29), 3 << 10 | 2 << 5 | 1);

        // Negative components are clamped.
        gte.data_store(9, 0xffff_ff00);
        assert_eq!(gte.data_load(28), 3 << 10 | 2 << 5);
    }

    #[test]
    fn leading_sign_count() {
        let mut gte = Gte::new();
        gte.data_store(30, 0x0000_ffff);
        assert_eq!(gte.data_load(31), 16);

        gte.data_store(30, 0xffff_0000);
        assert_eq!(gte.data_load(31), 16);

        // Read-only.
        gte.data_store(31, 5);
        assert_eq!(gte.data_load(31), 16);
    }

    #[test]
    fn flag_writes() {
        let mut gte = Gte::new();
        gte.control_store(31, 0xffff_ffff);
        assert_eq!(gte.control_load(31), 0xffff_f000);

        gte.control_store(31, flag::H);
        assert_eq!(gte.control_load(31), flag::H);
    }
}
