//! The instruction registry.
//!
//! Instructions are described by static [`Descriptor`]s, which instruction providers put into
//! three flat tables at startup:
//!
//! - The primary table, indexed by the 6-bit op field.
//! - The SPECIAL table, indexed by the function field of op 0x0.
//! - The REGIMM table, indexed by the target register field of op 0x1.
//!
//! Further decoding, for instance of coprocessor instructions, is done by a nested descriptor
//! which picks the final descriptor from the rest of the word.

use crate::Error;
use super::context::CompileContext;
use super::ir::{Call, Seq};
use super::opcode::{Opcode, RegIdx};
use super::Regs;
use crate::cop0::Exception;

use bitflags::bitflags;

use std::fmt::Write;
use std::ptr;

/// Build [`InsFlags`] from a list of flag names.
macro_rules! ins_flags {
    ($($flag:ident),*) => {
        $crate::cpu::registry::InsFlags::empty()
            $(.union($crate::cpu::registry::InsFlags::$flag))*
    };
}

/// A [`Descriptor`] with a compile hook only.
macro_rules! compiled {
    ($name:literal, [$($flag:ident),*], $format:ident, $compile:expr) => {
        $crate::cpu::registry::Descriptor {
            name: $name,
            flags: ins_flags!($($flag),*),
            format: $crate::cpu::registry::Format::$format,
            kind: $crate::cpu::registry::Kind::Compiled($compile),
        }
    };
}

/// A [`Descriptor`] with both a compile and a simulate hook.
macro_rules! simulated {
    ($name:literal, [$($flag:ident),*], $format:ident, $compile:expr, $simulate:expr) => {
        $crate::cpu::registry::Descriptor {
            name: $name,
            flags: ins_flags!(SIMULATE $(, $flag)*),
            format: $crate::cpu::registry::Format::$format,
            kind: $crate::cpu::registry::Kind::Simulated {
                compile: $compile,
                simulate: $simulate,
            },
        }
    };
}

/// A branch or jump [`Descriptor`].
macro_rules! branch {
    ($name:literal, [$($flag:ident),*], $format:ident, $compile:expr, $classify:expr) => {
        $crate::cpu::registry::Descriptor {
            name: $name,
            flags: ins_flags!($($flag),*),
            format: $crate::cpu::registry::Format::$format,
            kind: $crate::cpu::registry::Kind::Branch {
                compile: $compile,
                classify: $classify,
            },
        }
    };
}

/// A [`Descriptor`] which decodes further bits of the word.
macro_rules! nested {
    ($name:literal, $decode:expr) => {
        $crate::cpu::registry::Descriptor {
            name: $name,
            flags: $crate::cpu::registry::InsFlags::empty(),
            format: $crate::cpu::registry::Format::None,
            kind: $crate::cpu::registry::Kind::Nested($decode),
        }
    };
}

/// A [`Descriptor`] which signals a reserved instruction exception.
macro_rules! reserved {
    ($name:literal) => {
        compiled!(
            $name,
            [MAY_SIGNAL_EXCEPTION, TRAP],
            None,
            $crate::cpu::registry::compile_reserved
        )
    };
}

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct InsFlags: u32 {
        const READS_RS = 1 << 0;
        const READS_RT = 1 << 1;
        const WRITES_RD = 1 << 2;
        const WRITES_RT = 1 << 3;
        const READS_HILO = 1 << 4;
        const WRITES_HILO = 1 << 5;
        const MEM8 = 1 << 6;
        const MEM16 = 1 << 7;
        const MEM32 = 1 << 8;
        const LOAD = 1 << 9;
        const STORE = 1 << 10;
        /// Relative branch.
        const BRANCH = 1 << 11;
        /// Absolute or register jump.
        const JUMP = 1 << 12;
        /// Writes a return address.
        const LINK = 1 << 13;
        /// Has a simulate hook.
        const SIMULATE = 1 << 14;
        const MAY_SIGNAL_EXCEPTION = 1 << 15;
        /// Always leaves the block, like `syscall`.
        const TRAP = 1 << 16;
    }
}

/// Emit micro-operations for the instruction at the given address.
pub type CompileFn = fn(&mut CompileContext, u32, Opcode, &mut Seq);

/// Execute the instruction directly on the register file. Returns false if the instruction
/// couldn't complete, in which case the registers are untouched and the compiled form must be
/// used instead.
pub type SimulateFn = fn(Opcode, &mut Regs) -> bool;

pub type ClassifyFn = fn(Opcode) -> BranchKind;

/// Pick the descriptor of a nested instruction group.
pub type DecodeFn = fn(&Registry, Opcode) -> &'static Descriptor;

/// Static classification of a branch from the instruction word alone.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BranchKind {
    Always,
    Sometimes,
    Never,
}

/// The capabilities of an instruction. Every capability carries its hooks, so it's not possible
/// to ask for a simulation of an instruction that can't be simulated.
#[derive(Clone, Copy)]
pub enum Kind {
    Compiled(CompileFn),
    Simulated { compile: CompileFn, simulate: SimulateFn },
    Branch { compile: CompileFn, classify: ClassifyFn },
    Nested(DecodeFn),
}

/// Operand layout, used for disassembly.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Format {
    None,
    RdRsRt,
    RdRtRs,
    RdRtShift,
    RtRsImm,
    RtRsUimm,
    RtImm,
    RsRt,
    Rd,
    Rs,
    RdRs,
    RsRtBranch,
    RsBranch,
    Jump,
    RtOffset,
    RtCop,
    GteCmd,
}

pub struct Descriptor {
    pub name: &'static str,
    pub flags: InsFlags,
    pub format: Format,
    pub kind: Kind,
}

impl Descriptor {
    pub fn compile_fn(&self) -> Option<CompileFn> {
        match self.kind {
            Kind::Compiled(compile)
            | Kind::Simulated { compile, .. }
            | Kind::Branch { compile, .. } => Some(compile),
            Kind::Nested(_) => None,
        }
    }

    pub fn simulate_fn(&self) -> Option<SimulateFn> {
        match self.kind {
            Kind::Simulated { simulate, .. } => Some(simulate),
            _ => None,
        }
    }

    pub fn classify(&self, op: Opcode) -> Option<BranchKind> {
        match self.kind {
            Kind::Branch { classify, .. } => Some(classify(op)),
            _ => None,
        }
    }

    pub fn is_branch(&self) -> bool {
        matches!(self.kind, Kind::Branch { .. })
    }

    /// Render the instruction at `addr` as assembly.
    pub fn disassemble(&self, addr: u32, op: Opcode) -> String {
        let mut out = String::from(self.name);
        let _ = match self.format {
            Format::None => Ok(()),
            Format::RdRsRt => write!(out, " {}, {}, {}", op.rd(), op.rs(), op.rt()),
            Format::RdRtRs => write!(out, " {}, {}, {}", op.rd(), op.rt(), op.rs()),
            Format::RdRtShift => write!(out, " {}, {}, {}", op.rd(), op.rt(), op.shift()),
            Format::RtRsImm => {
                write!(out, " {}, {}, {}", op.rt(), op.rs(), op.signed_imm() as i32)
            }
            Format::RtRsUimm => write!(out, " {}, {}, {:#x}", op.rt(), op.rs(), op.imm()),
            Format::RtImm => write!(out, " {}, {:#x}", op.rt(), op.imm()),
            Format::RsRt => write!(out, " {}, {}", op.rs(), op.rt()),
            Format::Rd => write!(out, " {}", op.rd()),
            Format::Rs => write!(out, " {}", op.rs()),
            Format::RdRs => write!(out, " {}, {}", op.rd(), op.rs()),
            Format::RsRtBranch => {
                write!(out, " {}, {}, {:#010x}", op.rs(), op.rt(), op.branch_target(addr))
            }
            Format::RsBranch => write!(out, " {}, {:#010x}", op.rs(), op.branch_target(addr)),
            Format::Jump => write!(out, " {:#010x}", op.jump_target(addr)),
            Format::RtOffset => {
                write!(out, " {}, {}({})", op.rt(), op.signed_imm() as i32, op.rs())
            }
            Format::RtCop => write!(out, " {}, ${}", op.rt(), op.cop_reg()),
            Format::GteCmd => {
                write!(out, " sf={} lm={}", op.0 >> 19 & 1, op.0 >> 10 & 1)
            }
        };
        out
    }
}

/// Signal a reserved instruction exception. Used for unassigned slots and instructions for
/// coprocessors which doesn't exist.
pub fn compile_reserved(ctx: &mut CompileContext, _: u32, _: Opcode, seq: &mut Seq) {
    ctx.flush(seq);
    seq.call(Call::Signal(Exception::ReservedInstruction), None);
}

/// The descriptor of every unassigned slot.
pub static INVALID: Descriptor = reserved!("invalid");

static SPECIAL: Descriptor = nested!("special", decode_special);

static REGIMM: Descriptor = nested!("regimm", decode_regimm);

fn decode_special(registry: &Registry, op: Opcode) -> &'static Descriptor {
    registry.special[op.special() as usize]
}

fn decode_regimm(registry: &Registry, op: Opcode) -> &'static Descriptor {
    registry.regimm[op.regimm() as usize]
}

/// Something which puts instructions into the registry, like the R3000 or the GTE.
pub trait InstructionProvider {
    fn register(&self, registry: &mut Registry) -> Result<(), Error>;
}

pub struct Registry {
    primary: [&'static Descriptor; 64],
    special: [&'static Descriptor; 64],
    regimm: [&'static Descriptor; 32],
}

impl Default for Registry {
    fn default() -> Self {
        let mut primary = [&INVALID; 64];
        primary[0x0] = &SPECIAL;
        primary[0x1] = &REGIMM;
        Self {
            primary,
            special: [&INVALID; 64],
            regimm: [&INVALID; 32],
        }
    }
}

impl Registry {
    /// An empty registry. Only the SPECIAL and REGIMM groups are assigned.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_providers(providers: &[&dyn InstructionProvider]) -> Result<Self, Error> {
        let mut registry = Self::new();
        for provider in providers {
            provider.register(&mut registry)?;
        }
        Ok(registry)
    }

    /// The R3000 with the GTE attached as coprocessor 2.
    pub fn standard() -> Result<Self, Error> {
        Self::with_providers(&[&super::r3000::R3000, &crate::gte::ins::GteInstructions])
    }

    pub fn set_instruction(&mut self, opcode: u32, desc: &'static Descriptor) -> Result<(), Error> {
        set_slot(&mut self.primary, "primary", opcode, desc)
    }

    pub fn set_special_instruction(
        &mut self,
        opcode: u32,
        desc: &'static Descriptor,
    ) -> Result<(), Error> {
        set_slot(&mut self.special, "SPECIAL", opcode, desc)
    }

    pub fn set_regimm_instruction(
        &mut self,
        opcode: u32,
        desc: &'static Descriptor,
    ) -> Result<(), Error> {
        set_slot(&mut self.regimm, "REGIMM", opcode, desc)
    }

    /// Find the descriptor of `op`. Never fails, unassigned slots decode to [`INVALID`].
    pub fn decode(&self, op: Opcode) -> &'static Descriptor {
        let mut desc = self.primary[op.op() as usize];
        while let Kind::Nested(decode) = desc.kind {
            desc = decode(self, op);
        }
        desc
    }

    pub fn disassemble(&self, addr: u32, op: Opcode) -> String {
        self.decode(op).disassemble(addr, op)
    }
}

fn set_slot(
    table: &mut [&'static Descriptor],
    name: &'static str,
    opcode: u32,
    desc: &'static Descriptor,
) -> Result<(), Error> {
    let slot = table
        .get_mut(opcode as usize)
        .ok_or(Error::OpcodeOutOfRange { table: name, opcode })?;
    if !ptr::eq(*slot, &INVALID) {
        return Err(Error::DuplicateInstruction {
            table: name,
            opcode,
            existing: slot.name,
        });
    }
    *slot = desc;
    Ok(())
}

/// The general purpose registers an instruction reads.
pub(super) fn read_regs(desc: &Descriptor, op: Opcode) -> impl Iterator<Item = RegIdx> {
    let rs = desc.flags.contains(InsFlags::READS_RS).then(|| op.rs());
    let rt = desc.flags.contains(InsFlags::READS_RT).then(|| op.rt());
    rs.into_iter().chain(rt)
}

/// The general purpose register an instruction writes, if any.
pub(super) fn written_reg(desc: &Descriptor, op: Opcode) -> Option<RegIdx> {
    if desc.flags.contains(InsFlags::WRITES_RD) {
        Some(op.rd())
    } else if desc.flags.contains(InsFlags::WRITES_RT) {
        Some(op.rt())
    } else {
        None
    }
}
