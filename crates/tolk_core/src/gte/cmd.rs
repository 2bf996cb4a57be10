//! GTE commands.
//!
//! Accumulations into MAC1..3 are done in 64 bits, but checked and wrapped to 44 bits after
//! every addition, like the hardware accumulators.

use super::{divide, Gte, Matrix};
use tolk_util::Bit;

use std::fmt;

/// A command word, the low 25 bits of a `cop2` instruction.
#[derive(Clone, Copy)]
pub struct Command(pub u32);

impl Command {
    /// The real command number. Bits 20..24 hold a command number as well, but it's ignored.
    pub fn num(self) -> u32 {
        self.0.bit_range(0, 5)
    }

    /// `lm`. Saturate IR1..3 to 0 instead of -0x8000.
    fn lm(self) -> bool {
        self.0.bit(10)
    }

    /// `sf`. Shift fractions out of MAC1..3.
    fn shift(self) -> u32 {
        self.0.bit(19) as u32 * 12
    }

    /// `mx`. MVMVA matrix.
    fn mx(self) -> u32 {
        self.0.bit_range(17, 18)
    }

    /// `v`. MVMVA vector.
    fn vec(self) -> u32 {
        self.0.bit_range(15, 16)
    }

    /// `cv`. MVMVA translation vector.
    fn cv(self) -> u32 {
        self.0.bit_range(13, 14)
    }

    pub fn name(self) -> Option<&'static str> {
        let name = match self.num() {
            0x01 => "rtps",
            0x06 => "nclip",
            0x0c => "op",
            0x10 => "dpcs",
            0x11 => "intpl",
            0x12 => "mvmva",
            0x13 => "ncds",
            0x14 => "cdp",
            0x16 => "ncdt",
            0x1b => "nccs",
            0x1c => "cc",
            0x1e => "ncs",
            0x20 => "nct",
            0x28 => "sqr",
            0x29 => "dcpl",
            0x2a => "dpct",
            0x2d => "avsz3",
            0x2e => "avsz4",
            0x30 => "rtpt",
            0x3d => "gpf",
            0x3e => "gpl",
            0x3f => "ncct",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} sf={} lm={}",
            self.name().unwrap_or("invalid"),
            self.0.bit(19) as u8,
            self.lm() as u8,
        )
    }
}

/// Wrap to a signed 44-bit value.
#[inline]
fn wrap44(val: i64) -> i64 {
    (val << 20) >> 20
}

impl Gte {
    /// Execute a command. FLAG is cleared first.
    pub fn exec(&mut self, word: u32) {
        let cmd = Command(word & 0x1ff_ffff);
        trace!("gte {cmd}");

        self.flags.clear();

        let (shift, lm) = (cmd.shift(), cmd.lm());

        match cmd.num() {
            0x01 => self.cmd_rtps(shift, lm),
            0x06 => self.cmd_nclip(),
            0x0c => self.cmd_op(shift, lm),
            0x10 => self.cmd_dpcs(shift, lm),
            0x11 => self.cmd_intpl(shift, lm),
            0x12 => self.cmd_mvmva(cmd, shift, lm),
            0x13 => self.cmd_ncds(shift, lm),
            0x14 => self.cmd_cdp(shift, lm),
            0x16 => self.cmd_ncdt(shift, lm),
            0x1b => self.cmd_nccs(shift, lm),
            0x1c => self.cmd_cc(shift, lm),
            0x1e => self.cmd_ncs(shift, lm),
            0x20 => self.cmd_nct(shift, lm),
            0x28 => self.cmd_sqr(shift, lm),
            0x29 => self.cmd_dcpl(shift, lm),
            0x2a => self.cmd_dpct(shift, lm),
            0x2d => self.cmd_avsz3(),
            0x2e => self.cmd_avsz4(),
            0x30 => self.cmd_rtpt(shift, lm),
            0x3d => self.cmd_gpf(shift, lm),
            0x3e => self.cmd_gpl(shift, lm),
            0x3f => self.cmd_ncct(shift, lm),
            num => warn!("invalid GTE command {num:02x}"),
        }
    }

    /// Add to accumulator `idx`, checking for overflow and wrapping to 44 bits.
    #[inline]
    fn accumulate(&mut self, idx: usize, acc: i64, val: i64) -> i64 {
        wrap44(self.flags.a(idx, acc + val))
    }

    /// Set MAC1..3 from `val` shifted right by `shift`.
    #[inline]
    fn set_mac(&mut self, idx: usize, val: i64, shift: u32) {
        self.flags.a(idx, val);
        self.mac[idx] = (val >> shift) as i32;
    }

    /// Set MAC0, checking that `val` fits.
    #[inline]
    fn set_mac0(&mut self, val: i64) {
        self.mac[0] = self.flags.lm_f(val) as i32;
    }

    /// `[IR1, IR2, IR3] = [MAC1, MAC2, MAC3]`.
    fn mac_to_ir(&mut self, lm: bool) {
        for i in 1..=3 {
            self.ir[i] = self.flags.lm_b(i, self.mac[i], lm);
        }
    }

    fn ir_vec(&self) -> [i16; 3] {
        [self.ir[1], self.ir[2], self.ir[3]]
    }

    /// `MAC = (tr * 0x1000 + mat * v) >> shift`. Returns the sums before the shift.
    fn transform(&mut self, mat: &Matrix, tr: [i32; 3], v: [i16; 3], shift: u32) -> [i64; 3] {
        let mut sums = [0; 3];
        for (row, sum) in sums.iter_mut().enumerate() {
            let idx = row + 1;
            let mut acc = self.accumulate(idx, 0, i64::from(tr[row]) << 12);
            for col in 0..3 {
                let prod = i64::from(mat[row][col]) * i64::from(v[col]);
                acc = self.accumulate(idx, acc, prod);
            }
            self.set_mac(idx, acc, shift);
            *sum = acc;
        }
        sums
    }

    /// Rotate, translate and perspective transform vector `v`, pushing the result onto the screen
    /// FIFOs. Returns the projection factor.
    fn rtp(&mut self, v: usize, shift: u32, lm: bool) -> i64 {
        let rt = self.rt;
        let [_, _, z] = self.transform(&rt, self.tr, self.v[v], shift);

        self.ir[1] = self.flags.lm_b(1, self.mac[1], lm);
        self.ir[2] = self.flags.lm_b(2, self.mac[2], lm);

        // The IR3 flag is decided by the depth, which is always shifted 12 bits, regardless
        // of `sf`.
        self.ir[3] = self.flags.lm_b3_ptz(self.mac[3], z >> 12, lm);

        let sz = self.flags.lm_d(z >> 12);
        self.sz_push(sz);

        let pf = i64::from(self.flags.lm_e(divide(self.h, sz)));

        let sx = self.flags.lm_f(pf * i64::from(self.ir[1]) + i64::from(self.ofx));
        let sy = self.flags.lm_f(pf * i64::from(self.ir[2]) + i64::from(self.ofy));
        self.mac[0] = sy as i32;

        let x = self.flags.lm_g1(sx >> 16);
        let y = self.flags.lm_g2(sy >> 16);
        self.sxy_push(x, y);

        pf
    }

    /// `MAC0 = pf * DQA + DQB` and `IR0 = MAC0 >> 12`.
    fn depth_cue(&mut self, pf: i64) {
        let val = pf * i64::from(self.dqa) + i64::from(self.dqb);
        self.set_mac0(val);
        self.ir[0] = self.flags.lm_h(val >> 12);
    }

    /// Light the normal vector `v`. `IR = LLM * v` followed by `IR = BK + LCM * IR`.
    fn light(&mut self, v: [i16; 3], shift: u32, lm: bool) {
        let llm = self.llm;
        self.transform(&llm, [0; 3], v, shift);
        self.mac_to_ir(lm);
        self.color_matrix(shift, lm);
    }

    /// `IR = BK + LCM * IR`.
    fn color_matrix(&mut self, shift: u32, lm: bool) {
        let lcm = self.lcm;
        let ir = self.ir_vec();
        self.transform(&lcm, self.bk, ir, shift);
        self.mac_to_ir(lm);
    }

    /// `[R * IR1, G * IR2, B * IR3] << 4`, where RGB is the color in RGBC.
    fn color_product(&self) -> [i64; 3] {
        let mut out = [0; 3];
        for (i, val) in out.iter_mut().enumerate() {
            *val = (i64::from(self.rgbc[i]) * i64::from(self.ir[i + 1])) << 4;
        }
        out
    }

    /// Shift `vals` into MAC1..3, push the color FIFO and saturate into IR1..3.
    fn color_out(&mut self, vals: [i64; 3], shift: u32, lm: bool) {
        for (i, val) in vals.into_iter().enumerate() {
            self.set_mac(i + 1, val, shift);
        }
        self.rgb_push();
        self.mac_to_ir(lm);
    }

    /// Interpolate between `base` and the far color by IR0. `MAC = base + (FC - base) * IR0`.
    fn interpolate(&mut self, base: [i64; 3], shift: u32, lm: bool) {
        for (i, val) in base.into_iter().enumerate() {
            self.set_mac(i + 1, (i64::from(self.fc[i]) << 12) - val, shift);
        }
        self.mac_to_ir(false);

        let mut out = [0; 3];
        for (i, val) in base.into_iter().enumerate() {
            out[i] = self.accumulate(i + 1, val, i64::from(self.ir[i + 1]) * i64::from(self.ir[0]));
        }
        self.color_out(out, shift, lm);
    }

    fn cmd_rtps(&mut self, shift: u32, lm: bool) {
        let pf = self.rtp(0, shift, lm);
        self.depth_cue(pf);
    }

    fn cmd_rtpt(&mut self, shift: u32, lm: bool) {
        self.rtp(0, shift, lm);
        self.rtp(1, shift, lm);
        let pf = self.rtp(2, shift, lm);
        self.depth_cue(pf);
    }

    /// Signed area of the triangle in the screen XY FIFO. MAC0 isn't saturated and doesn't set
    /// any flags, even if the result doesn't fit.
    fn cmd_nclip(&mut self) {
        let [[x0, y0], [x1, y1], [x2, y2]] = self.sxy.map(|[x, y]| [i64::from(x), i64::from(y)]);
        let area = x0 * y1 + x1 * y2 + x2 * y0 - x0 * y2 - x1 * y0 - x2 * y1;
        self.mac[0] = area as i32;
    }

    /// Outer product of IR1..3 and the diagonal of the rotation matrix.
    fn cmd_op(&mut self, shift: u32, lm: bool) {
        let [d1, d2, d3] = [self.rt[0][0], self.rt[1][1], self.rt[2][2]].map(i64::from);
        let [ir1, ir2, ir3] = self.ir_vec().map(i64::from);

        let vals = [ir3 * d2 - ir2 * d3, ir1 * d3 - ir3 * d1, ir2 * d1 - ir1 * d2];
        for (i, val) in vals.into_iter().enumerate() {
            self.set_mac(i + 1, val, shift);
        }
        self.mac_to_ir(lm);
    }

    fn cmd_dpcs(&mut self, shift: u32, lm: bool) {
        let base = [0, 1, 2].map(|i| i64::from(self.rgbc[i]) << 16);
        self.interpolate(base, shift, lm);
    }

    /// Like `dpcs` three times, but the color is taken from the head of the color FIFO.
    fn cmd_dpct(&mut self, shift: u32, lm: bool) {
        for _ in 0..3 {
            let base = [0, 1, 2].map(|i| i64::from(self.rgb[0][i]) << 16);
            self.interpolate(base, shift, lm);
        }
    }

    fn cmd_intpl(&mut self, shift: u32, lm: bool) {
        let base = self.ir_vec().map(|ir| i64::from(ir) << 12);
        self.interpolate(base, shift, lm);
    }

    fn cmd_dcpl(&mut self, shift: u32, lm: bool) {
        let base = self.color_product();
        self.interpolate(base, shift, lm);
    }

    fn cmd_mvmva(&mut self, cmd: Command, shift: u32, lm: bool) {
        let mat = match cmd.mx() {
            0 => self.rt,
            1 => self.llm,
            2 => self.lcm,
            // There is no fourth matrix. The hardware uses a mix of other registers.
            _ => {
                let r = i16::from(self.rgbc[0]) << 4;
                [
                    [-r, r, self.ir[0]],
                    [self.rt[0][2]; 3],
                    [self.rt[1][1]; 3],
                ]
            }
        };
        let v = match cmd.vec() {
            3 => self.ir_vec(),
            v => self.v[v as usize],
        };

        match cmd.cv() {
            0 => {
                self.transform(&mat, self.tr, v, shift);
            }
            1 => {
                self.transform(&mat, self.bk, v, shift);
            }
            2 => self.far_color_transform(&mat, v, shift),
            _ => {
                self.transform(&mat, [0; 3], v, shift);
            }
        }

        self.mac_to_ir(lm);
    }

    /// MVMVA with the far color as translation vector is broken. The first column and the
    /// translation is only used to set flags, and the result is just the last two columns.
    fn far_color_transform(&mut self, mat: &Matrix, v: [i16; 3], shift: u32) {
        for row in 0..3 {
            let idx = row + 1;

            let acc = self.accumulate(idx, 0, i64::from(self.fc[row]) << 12);
            let acc = self.accumulate(idx, acc, i64::from(mat[row][0]) * i64::from(v[0]));
            self.flags.lm_b(idx, (acc >> shift) as i32, false);

            let acc = self.accumulate(idx, 0, i64::from(mat[row][1]) * i64::from(v[1]));
            let acc = self.accumulate(idx, acc, i64::from(mat[row][2]) * i64::from(v[2]));
            self.set_mac(idx, acc, shift);
        }
    }

    fn cmd_ncs(&mut self, shift: u32, lm: bool) {
        self.light(self.v[0], shift, lm);
        self.rgb_push();
    }

    fn cmd_nct(&mut self, shift: u32, lm: bool) {
        for v in 0..3 {
            self.light(self.v[v], shift, lm);
            self.rgb_push();
        }
    }

    fn nccs(&mut self, v: usize, shift: u32, lm: bool) {
        self.light(self.v[v], shift, lm);
        let vals = self.color_product();
        self.color_out(vals, shift, lm);
    }

    fn cmd_nccs(&mut self, shift: u32, lm: bool) {
        self.nccs(0, shift, lm);
    }

    fn cmd_ncct(&mut self, shift: u32, lm: bool) {
        for v in 0..3 {
            self.nccs(v, shift, lm);
        }
    }

    fn ncds(&mut self, v: usize, shift: u32, lm: bool) {
        self.light(self.v[v], shift, lm);
        let base = self.color_product();
        self.interpolate(base, shift, lm);
    }

    fn cmd_ncds(&mut self, shift: u32, lm: bool) {
        self.ncds(0, shift, lm);
    }

    fn cmd_ncdt(&mut self, shift: u32, lm: bool) {
        for v in 0..3 {
            self.ncds(v, shift, lm);
        }
    }

    fn cmd_cc(&mut self, shift: u32, lm: bool) {
        self.color_matrix(shift, lm);
        let vals = self.color_product();
        self.color_out(vals, shift, lm);
    }

    fn cmd_cdp(&mut self, shift: u32, lm: bool) {
        self.color_matrix(shift, lm);
        let base = self.color_product();
        self.interpolate(base, shift, lm);
    }

    fn cmd_sqr(&mut self, shift: u32, lm: bool) {
        for i in 1..=3 {
            let ir = i64::from(self.ir[i]);
            self.set_mac(i, ir * ir, shift);
        }
        self.mac_to_ir(lm);
    }

    /// Average of the three newest screen Z values.
    fn cmd_avsz3(&mut self) {
        let sum: i64 = self.sz[1..].iter().copied().map(i64::from).sum();
        let val = i64::from(self.zsf3) * sum;
        self.set_mac0(val);
        self.otz = self.flags.lm_d(val >> 12);
    }

    /// Average of all four screen Z values.
    fn cmd_avsz4(&mut self) {
        let sum: i64 = self.sz.iter().copied().map(i64::from).sum();
        let val = i64::from(self.zsf4) * sum;
        self.set_mac0(val);
        self.otz = self.flags.lm_d(val >> 12);
    }

    /// `MAC = IR * IR0`.
    fn cmd_gpf(&mut self, shift: u32, lm: bool) {
        let vals = self.ir_vec().map(|ir| i64::from(ir) * i64::from(self.ir[0]));
        self.color_out(vals, shift, lm);
    }

    /// `MAC = MAC + IR * IR0`.
    fn cmd_gpl(&mut self, shift: u32, lm: bool) {
        let mut vals = [0; 3];
        for (i, val) in vals.iter_mut().enumerate() {
            let mac = i64::from(self.mac[i + 1]) << shift;
            *val = self.accumulate(i + 1, mac, i64::from(self.ir[i + 1]) * i64::from(self.ir[0]));
        }
        self.color_out(vals, shift, lm);
    }
}
