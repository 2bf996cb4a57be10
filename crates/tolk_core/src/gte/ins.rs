//! Coprocessor 2 instructions.
//!
//! Register moves and commands all go through calls, since the GTE registers live outside the
//! general purpose register file.

use crate::bus::Width;
use crate::cpu::CompileContext;
use crate::cpu::ir::{Call, Seq};
use crate::cpu::r3000::mem::{effective_addr, is_tagged};
use crate::cpu::registry::{Descriptor, InstructionProvider, Registry, INVALID};
use crate::cpu::Opcode;
use crate::Error;

use super::cmd::Command;

pub static MFC2: Descriptor = compiled!(
    "mfc2",
    [WRITES_RT],
    RtCop,
    |ctx, _, op, seq| {
        let val = seq.call_with_result(Call::GteDataLoad(op.cop_reg()), None);
        ctx.write(seq, op.rt(), val);
    }
);

pub static CFC2: Descriptor = compiled!(
    "cfc2",
    [WRITES_RT],
    RtCop,
    |ctx, _, op, seq| {
        let val = seq.call_with_result(Call::GteControlLoad(op.cop_reg()), None);
        ctx.write(seq, op.rt(), val);
    }
);

pub static MTC2: Descriptor = compiled!(
    "mtc2",
    [READS_RT],
    RtCop,
    |ctx, _, op, seq| {
        let val = ctx.read(seq, op.rt());
        seq.call(Call::GteDataStore(op.cop_reg()), Some(val));
    }
);

pub static CTC2: Descriptor = compiled!(
    "ctc2",
    [READS_RT],
    RtCop,
    |ctx, _, op, seq| {
        let val = ctx.read(seq, op.rt());
        seq.call(Call::GteControlStore(op.cop_reg()), Some(val));
    }
);

/// Load a word into the GTE data register in the `rt` field.
pub static LWC2: Descriptor = compiled!(
    "lwc2",
    [READS_RS, LOAD, MEM32],
    RtOffset,
    |ctx, _, op, seq| {
        let addr = effective_addr(ctx, seq, op);
        let val = seq.read(Width::Word, false, addr, is_tagged(op));
        seq.call(Call::GteDataStore(op.rt().0), Some(val));
    }
);

/// Store the GTE data register in the `rt` field.
pub static SWC2: Descriptor = compiled!(
    "swc2",
    [READS_RS, STORE, MEM32],
    RtOffset,
    |ctx, _, op, seq| {
        let addr = effective_addr(ctx, seq, op);
        let val = seq.call_with_result(Call::GteDataLoad(op.rt().0), None);
        seq.write(Width::Word, addr, val, is_tagged(op));
    }
);

fn compile_command(_: &mut CompileContext, _: u32, op: Opcode, seq: &mut Seq) {
    seq.call(Call::GteExec(op.0 & 0x1ff_ffff), None);
}

macro_rules! command {
    ($($static:ident = $name:literal),* $(,)?) => {
        $(
            pub static $static: Descriptor = compiled!($name, [], GteCmd, compile_command);
        )*
    };
}

command! {
    RTPS = "rtps",
    NCLIP = "nclip",
    OP = "op",
    DPCS = "dpcs",
    INTPL = "intpl",
    MVMVA = "mvmva",
    NCDS = "ncds",
    CDP = "cdp",
    NCDT = "ncdt",
    NCCS = "nccs",
    CC = "cc",
    NCS = "ncs",
    NCT = "nct",
    SQR = "sqr",
    DCPL = "dcpl",
    DPCT = "dpct",
    AVSZ3 = "avsz3",
    AVSZ4 = "avsz4",
    RTPT = "rtpt",
    GPF = "gpf",
    GPL = "gpl",
    NCCT = "ncct",
}

fn decode_command(op: Opcode) -> &'static Descriptor {
    match Command(op.0).num() {
        0x01 => &RTPS,
        0x06 => &NCLIP,
        0x0c => &OP,
        0x10 => &DPCS,
        0x11 => &INTPL,
        0x12 => &MVMVA,
        0x13 => &NCDS,
        0x14 => &CDP,
        0x16 => &NCDT,
        0x1b => &NCCS,
        0x1c => &CC,
        0x1e => &NCS,
        0x20 => &NCT,
        0x28 => &SQR,
        0x29 => &DCPL,
        0x2a => &DPCT,
        0x2d => &AVSZ3,
        0x2e => &AVSZ4,
        0x30 => &RTPT,
        0x3d => &GPF,
        0x3e => &GPL,
        0x3f => &NCCT,
        _ => &INVALID,
    }
}

/// Coprocessor 2 operations. Commands have bit 4 of the `rs` field set, the rest are moves.
pub static COP2: Descriptor = nested!("cop2", decode_cop2);

fn decode_cop2(_: &Registry, op: Opcode) -> &'static Descriptor {
    match op.cop_op() {
        0x0 => &MFC2,
        0x2 => &CFC2,
        0x4 => &MTC2,
        0x6 => &CTC2,
        cop_op if cop_op & 0x10 != 0 => decode_command(op),
        _ => &INVALID,
    }
}

/// Attaches the GTE as coprocessor 2.
pub struct GteInstructions;

impl InstructionProvider for GteInstructions {
    fn register(&self, registry: &mut Registry) -> Result<(), Error> {
        registry.set_instruction(0x12, &COP2)?;
        registry.set_instruction(0x32, &LWC2)?;
        registry.set_instruction(0x3a, &SWC2)?;
        Ok(())
    }
}
