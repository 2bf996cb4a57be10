//! Instruction level execution core of a MIPS R3000 with its geometry transformation
//! coprocessor (GTE).
//!
//! Every instruction has two implementations. A direct interpreter working on the register file,
//! and a compiler emitting micro-operations for a whole basic block at a time. Both must agree
//! bit for bit.

#[macro_use]
extern crate log;

#[cfg(test)]
mod test;

mod config;
mod error;

pub mod bus;
pub mod cop0;
#[macro_use]
pub mod cpu;
pub mod gte;

pub use bus::{AddrSpace, Ram, Width};
pub use config::Config;
pub use cop0::{Cop0, Exception, SystemControl};
pub use cpu::{Cpu, Exit, Opcode, RegIdx, Regs, Registry};
pub use error::Error;
pub use gte::Gte;

/// If signed overflow in `add`, `addi` and `sub` should be ignored. The interpreter and compiler
/// both read this, so they always follow the same policy.
pub const IGNORE_OVERFLOW: bool = cfg!(feature = "ignore-overflow");
