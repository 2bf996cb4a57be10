mod cpu;

use crate::bus::Ram;
use crate::cop0::{Cop0, Exception};
use crate::cpu::{Cpu, Exit};
use crate::Config;

/// Where test programs are loaded.
pub const BASE: u32 = 0x8000_1000;

/// Scratch memory for test data.
pub const DATA: u32 = 0x8000_8000;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn load_code(code: &[u32], config: Config) -> Cpu<Ram, Cop0> {
    init_logger();

    let mut ram = Ram::new(0x10_0000);
    ram.store_words(BASE, code);

    let mut cpu = match Cpu::new(ram, Cop0::new(), config) {
        Ok(cpu) => cpu,
        Err(err) => panic!("{err}"),
    };
    cpu.pc = BASE;
    cpu
}

/// Run blocks until an exception is signalled.
pub fn run_until_exception(cpu: &mut Cpu<Ram, Cop0>) -> (u32, Exception) {
    for _ in 0..100_000 {
        if let Exit::Exception { pc, ex } = cpu.run_block() {
            return (pc, ex);
        }
    }
    panic!("program didn't terminate");
}

/// Run until `break` and return the address of it.
pub fn run_cpu(cpu: &mut Cpu<Ram, Cop0>) -> u32 {
    match run_until_exception(cpu) {
        (pc, Exception::Breakpoint) => pc,
        (pc, ex) => panic!("unexpected {ex} at {pc:08x}"),
    }
}

pub fn run_code(code: &[u32]) -> Cpu<Ram, Cop0> {
    let mut cpu = load_code(code, Config::default());
    run_cpu(&mut cpu);
    cpu
}

/// Instruction encoding.
pub mod enc {
    use crate::cpu::RegIdx;

    pub const NOP: u32 = 0;

    fn reg(rs: RegIdx, rt: RegIdx, rd: RegIdx, shift: u32, funct: u32) -> u32 {
        u32::from(rs.0) << 21 | u32::from(rt.0) << 16 | u32::from(rd.0) << 11 | shift << 6 | funct
    }

    fn imm(op: u32, rs: RegIdx, rt: RegIdx, imm: u16) -> u32 {
        op << 26 | u32::from(rs.0) << 21 | u32::from(rt.0) << 16 | u32::from(imm)
    }

    fn cop(op: u32, cop_op: u32, rt: RegIdx, reg: u8) -> u32 {
        op << 26 | cop_op << 21 | u32::from(rt.0) << 16 | u32::from(reg & 0x1f) << 11
    }

    /// Branch from `addr` to `target`.
    fn offset(addr: u32, target: u32) -> u16 {
        (target.wrapping_sub(addr.wrapping_add(4)) as i32 >> 2) as u16
    }

    pub fn sll(rd: RegIdx, rt: RegIdx, shift: u32) -> u32 {
        reg(RegIdx::ZERO, rt, rd, shift, 0x00)
    }

    pub fn sra(rd: RegIdx, rt: RegIdx, shift: u32) -> u32 {
        reg(RegIdx::ZERO, rt, rd, shift, 0x03)
    }

    pub fn jr(rs: RegIdx) -> u32 {
        reg(rs, RegIdx::ZERO, RegIdx::ZERO, 0, 0x08)
    }

    pub fn jalr(rd: RegIdx, rs: RegIdx) -> u32 {
        reg(rs, RegIdx::ZERO, rd, 0, 0x09)
    }

    pub fn syscall() -> u32 {
        0x0000_000c
    }

    pub fn brk() -> u32 {
        0x0000_000d
    }

    pub fn mfhi(rd: RegIdx) -> u32 {
        reg(RegIdx::ZERO, RegIdx::ZERO, rd, 0, 0x10)
    }

    pub fn mflo(rd: RegIdx) -> u32 {
        reg(RegIdx::ZERO, RegIdx::ZERO, rd, 0, 0x12)
    }

    pub fn mult(rs: RegIdx, rt: RegIdx) -> u32 {
        reg(rs, rt, RegIdx::ZERO, 0, 0x18)
    }

    pub fn multu(rs: RegIdx, rt: RegIdx) -> u32 {
        reg(rs, rt, RegIdx::ZERO, 0, 0x19)
    }

    pub fn div(rs: RegIdx, rt: RegIdx) -> u32 {
        reg(rs, rt, RegIdx::ZERO, 0, 0x1a)
    }

    pub fn divu(rs: RegIdx, rt: RegIdx) -> u32 {
        reg(rs, rt, RegIdx::ZERO, 0, 0x1b)
    }

    pub fn add(rd: RegIdx, rs: RegIdx, rt: RegIdx) -> u32 {
        reg(rs, rt, rd, 0, 0x20)
    }

    pub fn addu(rd: RegIdx, rs: RegIdx, rt: RegIdx) -> u32 {
        reg(rs, rt, rd, 0, 0x21)
    }

    pub fn j(target: u32) -> u32 {
        0x02 << 26 | (target >> 2 & 0x03ff_ffff)
    }

    pub fn jal(target: u32) -> u32 {
        0x03 << 26 | (target >> 2 & 0x03ff_ffff)
    }

    pub fn beq(addr: u32, rs: RegIdx, rt: RegIdx, target: u32) -> u32 {
        imm(0x04, rs, rt, offset(addr, target))
    }

    pub fn bne(addr: u32, rs: RegIdx, rt: RegIdx, target: u32) -> u32 {
        imm(0x05, rs, rt, offset(addr, target))
    }

    pub fn bltzal(addr: u32, rs: RegIdx, target: u32) -> u32 {
        imm(0x01, rs, RegIdx(0x10), offset(addr, target))
    }

    pub fn bgezal(addr: u32, rs: RegIdx, target: u32) -> u32 {
        imm(0x01, rs, RegIdx(0x11), offset(addr, target))
    }

    pub fn addi(rt: RegIdx, rs: RegIdx, val: i16) -> u32 {
        imm(0x08, rs, rt, val as u16)
    }

    pub fn addiu(rt: RegIdx, rs: RegIdx, val: i16) -> u32 {
        imm(0x09, rs, rt, val as u16)
    }

    pub fn slti(rt: RegIdx, rs: RegIdx, val: i16) -> u32 {
        imm(0x0a, rs, rt, val as u16)
    }

    pub fn ori(rt: RegIdx, rs: RegIdx, val: u16) -> u32 {
        imm(0x0d, rs, rt, val)
    }

    pub fn lui(rt: RegIdx, val: u16) -> u32 {
        imm(0x0f, RegIdx::ZERO, rt, val)
    }

    /// `lui` and `ori` loading a full word.
    pub fn li(rt: RegIdx, val: u32) -> [u32; 2] {
        [lui(rt, (val >> 16) as u16), ori(rt, rt, val as u16)]
    }

    pub fn lb(rt: RegIdx, off: i16, base: RegIdx) -> u32 {
        imm(0x20, base, rt, off as u16)
    }

    pub fn lh(rt: RegIdx, off: i16, base: RegIdx) -> u32 {
        imm(0x21, base, rt, off as u16)
    }

    pub fn lwl(rt: RegIdx, off: i16, base: RegIdx) -> u32 {
        imm(0x22, base, rt, off as u16)
    }

    pub fn lw(rt: RegIdx, off: i16, base: RegIdx) -> u32 {
        imm(0x23, base, rt, off as u16)
    }

    pub fn lbu(rt: RegIdx, off: i16, base: RegIdx) -> u32 {
        imm(0x24, base, rt, off as u16)
    }

    pub fn lhu(rt: RegIdx, off: i16, base: RegIdx) -> u32 {
        imm(0x25, base, rt, off as u16)
    }

    pub fn lwr(rt: RegIdx, off: i16, base: RegIdx) -> u32 {
        imm(0x26, base, rt, off as u16)
    }

    pub fn swl(rt: RegIdx, off: i16, base: RegIdx) -> u32 {
        imm(0x2a, base, rt, off as u16)
    }

    pub fn sw(rt: RegIdx, off: i16, base: RegIdx) -> u32 {
        imm(0x2b, base, rt, off as u16)
    }

    pub fn lwc1(rt: u8, off: i16, base: RegIdx) -> u32 {
        imm(0x31, base, RegIdx(rt), off as u16)
    }

    pub fn lwc2(rt: u8, off: i16, base: RegIdx) -> u32 {
        imm(0x32, base, RegIdx(rt), off as u16)
    }

    pub fn swc2(rt: u8, off: i16, base: RegIdx) -> u32 {
        imm(0x3a, base, RegIdx(rt), off as u16)
    }

    pub fn mfc0(rt: RegIdx, reg: u8) -> u32 {
        cop(0x10, 0x0, rt, reg)
    }

    pub fn mtc0(rt: RegIdx, reg: u8) -> u32 {
        cop(0x10, 0x4, rt, reg)
    }

    pub fn mfc2(rt: RegIdx, reg: u8) -> u32 {
        cop(0x12, 0x0, rt, reg)
    }

    pub fn cfc2(rt: RegIdx, reg: u8) -> u32 {
        cop(0x12, 0x2, rt, reg)
    }

    pub fn mtc2(rt: RegIdx, reg: u8) -> u32 {
        cop(0x12, 0x4, rt, reg)
    }

    pub fn ctc2(rt: RegIdx, reg: u8) -> u32 {
        cop(0x12, 0x6, rt, reg)
    }

    /// GTE command `cmd`, including the `sf`, `lm` and operand selection bits.
    pub fn cop2(cmd: u32) -> u32 {
        0x4a00_0000 | (cmd & 0x01ff_ffff)
    }
}
