//! # Coprocessor 0
//!
//! Handles exceptions for the R3000. The core never unwinds on its own. It signals the exception
//! through [`SystemControl`] and stops executing the current block, leaving the control transfer
//! to whoever implements the trait.

use tolk_util::{Bit, BitSet};

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exception {
    /// Thrown by `syscall`.
    Syscall = 0x8,
    /// Thrown by `break`.
    Breakpoint = 0x9,
    /// Thrown by unassigned opcodes and by instructions for coprocessors which doesn't exist.
    ReservedInstruction = 0xa,
    /// Thrown by `add`, `addi` and `sub` on signed overflow, unless overflow is ignored.
    IntegerOverflow = 0xc,
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Exception::Syscall => f.write_str("syscall"),
            Exception::Breakpoint => f.write_str("breakpoint"),
            Exception::ReservedInstruction => f.write_str("reserved instruction"),
            Exception::IntegerOverflow => f.write_str("integer overflow"),
        }
    }
}

/// The system control side of the CPU. Exceptions are signalled synchronously and the core
/// doesn't continue past the signalling instruction.
pub trait SystemControl {
    fn signal_integer_overflow(&mut self);

    fn signal_reserved_instruction(&mut self);

    fn signal_break(&mut self);

    fn signal_syscall(&mut self);

    /// `mfc0`.
    fn read_cop0(&mut self, reg: u8) -> u32;

    /// `mtc0`.
    fn write_cop0(&mut self, reg: u8, val: u32);

    /// `rfe`.
    fn return_from_exception(&mut self);

    /// Called by the driver after an exception with the address of the faulting instruction.
    fn set_epc(&mut self, _epc: u32) {}

    fn signal(&mut self, ex: Exception) {
        match ex {
            Exception::Syscall => self.signal_syscall(),
            Exception::Breakpoint => self.signal_break(),
            Exception::ReservedInstruction => self.signal_reserved_instruction(),
            Exception::IntegerOverflow => self.signal_integer_overflow(),
        }
    }
}

/// Register state of coprocessor 0.
///
/// | Number | Name     | Usage                       |
/// |--------|----------|-----------------------------|
/// | 3      | bpc      | Breakpoint on execution     |
/// | 5      | bda      | Breakpoint on data access   |
/// | 7      | dcic     | Breakpoint control          |
/// | 8      | badvaddr | Bad virtual address         |
/// | 12     | sr       | Status register             |
/// | 13     | cause    | Exception type              |
/// | 14     | epc      | Return address from trap    |
/// | 15     | prid     | Processor ID                |
///
/// The core doesn't know the address of the faulting instruction when signalling, so `epc` is
/// filled in afterwards by [`crate::Cpu`] through [`SystemControl::set_epc`].
pub struct Cop0 {
    regs: [u32; 16],
    last: Option<Exception>,
}

impl Default for Cop0 {
    fn default() -> Self {
        Self { regs: REGISTER_VALUES, last: None }
    }
}

impl Cop0 {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last signalled exception, if it hasn't been taken yet.
    pub fn take_exception(&mut self) -> Option<Exception> {
        self.last.take()
    }

    pub fn reg(&self, reg: u8) -> u32 {
        self.regs[reg as usize & 0xf]
    }

    fn enter_exception(&mut self, ex: Exception) {
        debug!("exception: {ex}");

        // Bits 0..5 of the status register is a three deep stack of the interrupt enable and
        // kernel mode flags. Entering an exception pushes two zeroes, which disables interrupts
        // and enters kernel mode.
        let flags = self.regs[12].bit_range(0, 5);
        self.regs[12] = self.regs[12].set_bit_range(0, 5, flags << 2);
        self.regs[13] = self.regs[13].set_bit_range(2, 6, ex as u32);

        self.last = Some(ex);
    }
}

impl SystemControl for Cop0 {
    fn signal_integer_overflow(&mut self) {
        self.enter_exception(Exception::IntegerOverflow);
    }

    fn signal_reserved_instruction(&mut self) {
        self.enter_exception(Exception::ReservedInstruction);
    }

    fn signal_break(&mut self) {
        self.enter_exception(Exception::Breakpoint);
    }

    fn signal_syscall(&mut self) {
        self.enter_exception(Exception::Syscall);
    }

    fn read_cop0(&mut self, reg: u8) -> u32 {
        if reg == 8 {
            trace!("bad virtual address register read");
        }
        self.reg(reg)
    }

    fn write_cop0(&mut self, reg: u8, val: u32) {
        match reg {
            // Processor id and bad virtual address are read only.
            8 | 15 => warn!("write to read only cop0 register {reg}"),
            _ => self.regs[reg as usize & 0xf] = val,
        }
    }

    fn return_from_exception(&mut self) {
        let flags = self.regs[12].bit_range(0, 5);
        self.regs[12] = self.regs[12].set_bit_range(0, 3, flags >> 2);
    }

    fn set_epc(&mut self, epc: u32) {
        self.regs[14] = epc;
    }
}

/// Register reset values. Only the processor id is set.
const REGISTER_VALUES: [u32; 16] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x0000_0002];
