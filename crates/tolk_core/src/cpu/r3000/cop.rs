//! Exception instructions and coprocessor 0.
//!
//! Coprocessor 0 lives behind the system control port, so these only emit calls.

use crate::cop0::Exception;
use crate::cpu::ir::Call;
use crate::cpu::registry::{Descriptor, Registry, INVALID};
use crate::cpu::Opcode;

pub static SYSCALL: Descriptor = compiled!(
    "syscall",
    [MAY_SIGNAL_EXCEPTION, TRAP],
    None,
    |_, _, _, seq| seq.call(Call::Signal(Exception::Syscall), None)
);

pub static BREAK: Descriptor = compiled!(
    "break",
    [MAY_SIGNAL_EXCEPTION, TRAP],
    None,
    |_, _, _, seq| seq.call(Call::Signal(Exception::Breakpoint), None)
);

pub static MFC0: Descriptor = compiled!(
    "mfc0",
    [WRITES_RT],
    RtCop,
    |ctx, _, op, seq| {
        let val = seq.call_with_result(Call::Cop0Load(op.cop_reg()), None);
        ctx.write(seq, op.rt(), val);
    }
);

pub static MTC0: Descriptor = compiled!(
    "mtc0",
    [READS_RT],
    RtCop,
    |ctx, _, op, seq| {
        let val = ctx.read(seq, op.rt());
        seq.call(Call::Cop0Store(op.cop_reg()), Some(val));
    }
);

pub static RFE: Descriptor = compiled!(
    "rfe",
    [],
    None,
    |_, _, _, seq| seq.call(Call::ReturnFromException, None)
);

/// Coprocessor 0 operations, decoded by the `rs` field.
pub static COP0: Descriptor = nested!("cop0", decode_cop0);

fn decode_cop0(_: &Registry, op: Opcode) -> &'static Descriptor {
    match op.cop_op() {
        0x0 => &MFC0,
        0x4 => &MTC0,
        0x10 if op.special() == 0x10 => &RFE,
        _ => &INVALID,
    }
}

// The Playstation has no coprocessor 1 or 3.
pub static COP1: Descriptor = reserved!("cop1");
pub static COP3: Descriptor = reserved!("cop3");
pub static LWC0: Descriptor = reserved!("lwc0");
pub static LWC1: Descriptor = reserved!("lwc1");
pub static LWC3: Descriptor = reserved!("lwc3");
pub static SWC0: Descriptor = reserved!("swc0");
pub static SWC1: Descriptor = reserved!("swc1");
pub static SWC3: Descriptor = reserved!("swc3");
