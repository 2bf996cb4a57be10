use crate::bus::{AddrSpace, Ram, Width};
use crate::cop0::{Cop0, Exception};
use crate::cpu::{Cpu, Exit, RegIdx};
use crate::{Config, IGNORE_OVERFLOW};

use super::enc::*;
use super::{load_code, run_code, run_cpu, run_until_exception, BASE, DATA};

const T3: RegIdx = RegIdx(11);
const T4: RegIdx = RegIdx(12);
const T5: RegIdx = RegIdx(13);

fn addr(idx: usize) -> u32 {
    BASE + idx as u32 * 4
}

#[test]
fn zero_reg() {
    let cpu = run_code(&[
        addiu(RegIdx::ZERO, RegIdx::ZERO, 1),
        lui(RegIdx::ZERO, 0x1234),
        brk(),
    ]);
    assert_eq!(cpu.regs.read(RegIdx::ZERO), 0);
}

#[test]
fn zero_reg_without_folding() {
    let config = Config { fold_constants: false, ..Config::default() };
    let mut cpu = load_code(&[addiu(RegIdx::ZERO, RegIdx::ZERO, 1), brk()], config);
    run_cpu(&mut cpu);
    assert_eq!(cpu.regs.read(RegIdx::ZERO), 0);
}

#[test]
fn data() {
    let code = [
        &li(RegIdx::T1, DATA)[..],
        &[lw(RegIdx::T2, 0, RegIdx::T1), brk()],
    ]
    .concat();

    let mut cpu = load_code(&code, Config::default());
    cpu.mem.store(Width::Word, DATA, 42);
    run_cpu(&mut cpu);

    assert_eq!(cpu.regs.read(RegIdx::T2), 42);
}

#[test]
fn branch_delay() {
    let cpu = run_code(&[
        addiu(RegIdx::V0, RegIdx::ZERO, 0),
        j(addr(3)),
        addiu(RegIdx::V0, RegIdx::V0, 1),
        brk(),
    ]);
    assert_eq!(cpu.regs.read(RegIdx::V0), 1);
}

#[test]
fn simple_loop() {
    let cpu = run_code(&[
        addiu(RegIdx::V0, RegIdx::ZERO, 1),
        sll(RegIdx::V0, RegIdx::V0, 1),
        slti(RegIdx::V1, RegIdx::V0, 1024),
        bne(addr(3), RegIdx::V1, RegIdx::ZERO, addr(1)),
        NOP,
        brk(),
    ]);
    assert_eq!(cpu.regs.read(RegIdx::V0), 1024);
}

#[test]
fn sign_extension() {
    let code = [
        &li(RegIdx::A0, DATA)[..],
        &[
            lb(RegIdx::T0, 0, RegIdx::A0),
            lbu(RegIdx::T1, 0, RegIdx::A0),
            lh(RegIdx::T2, 0, RegIdx::A0),
            lhu(T3, 0, RegIdx::A0),
            sra(T4, T3, 4),
            brk(),
        ],
    ]
    .concat();

    let mut cpu = load_code(&code, Config::default());
    cpu.mem.store(Width::Half, DATA, 0xff80);
    run_cpu(&mut cpu);

    assert_eq!(cpu.regs.read(RegIdx::T0), 0xffff_ff80);
    assert_eq!(cpu.regs.read(RegIdx::T1), 0x80);
    assert_eq!(cpu.regs.read(RegIdx::T2), 0xffff_ff80);
    assert_eq!(cpu.regs.read(T3), 0xff80);
    assert_eq!(cpu.regs.read(T4), 0xff8);
}

#[test]
fn division_by_zero() {
    let cpu = run_code(&[
        addiu(RegIdx::A0, RegIdx::ZERO, 5),
        addiu(RegIdx::A1, RegIdx::ZERO, -5),
        div(RegIdx::A0, RegIdx::ZERO),
        mflo(RegIdx::T0),
        mfhi(RegIdx::T1),
        divu(RegIdx::A0, RegIdx::ZERO),
        mflo(RegIdx::T2),
        mfhi(T3),
        div(RegIdx::A1, RegIdx::ZERO),
        mflo(T4),
        mfhi(T5),
        brk(),
    ]);

    assert_eq!(cpu.regs.read(RegIdx::T0), 0xffff_ffff);
    assert_eq!(cpu.regs.read(RegIdx::T1), 5);
    assert_eq!(cpu.regs.read(RegIdx::T2), 0xffff_ffff);
    assert_eq!(cpu.regs.read(T3), 5);
    assert_eq!(cpu.regs.read(T4), 1);
    assert_eq!(cpu.regs.read(T5), -5_i32 as u32);
}

#[test]
fn multiply() {
    let cpu = run_code(&[
        addiu(RegIdx::A0, RegIdx::ZERO, -3),
        addiu(RegIdx::A1, RegIdx::ZERO, 5),
        mult(RegIdx::A0, RegIdx::A1),
        mflo(RegIdx::T0),
        mfhi(RegIdx::T1),
        multu(RegIdx::A0, RegIdx::A1),
        mflo(RegIdx::T2),
        mfhi(T3),
        brk(),
    ]);

    assert_eq!(cpu.regs.read(RegIdx::T0), -15_i32 as u32);
    assert_eq!(cpu.regs.read(RegIdx::T1), 0xffff_ffff);
    assert_eq!(cpu.regs.read(RegIdx::T2), 0xffff_fff1);
    assert_eq!(cpu.regs.read(T3), 4);
}

#[test]
fn unaligned_load() {
    let code = [
        &li(RegIdx::T0, 0xaabb_ccdd)[..],
        &li(RegIdx::T1, DATA)[..],
        &[
            lwl(RegIdx::T0, 1, RegIdx::T1),
            lwr(RegIdx::T2, 1, RegIdx::T1),
            lwl(RegIdx::T2, 4, RegIdx::T1),
            brk(),
        ],
    ]
    .concat();

    let mut cpu = load_code(&code, Config::default());
    cpu.mem.store(Width::Word, DATA, 0x1234_5678);
    cpu.mem.store(Width::Word, DATA + 4, 0x9abc_def0);
    run_cpu(&mut cpu);

    assert_eq!(cpu.regs.read(RegIdx::T0), 0x5678_ccdd);
    assert_eq!(cpu.regs.read(RegIdx::T2), 0xf012_3456);
}

#[test]
fn unaligned_store() {
    let code = [
        &li(RegIdx::T0, 0xaabb_ccdd)[..],
        &li(RegIdx::T1, DATA)[..],
        &[swl(RegIdx::T0, 0, RegIdx::T1), brk()],
    ]
    .concat();

    let mut cpu = load_code(&code, Config::default());
    cpu.mem.store(Width::Word, DATA, 0x1234_5678);
    run_cpu(&mut cpu);

    assert_eq!(cpu.mem.load(Width::Word, DATA), 0x1234_56aa);
}

#[test]
fn overflow() {
    let code = [
        &li(RegIdx::T0, 0x7fff_ffff)[..],
        &[addi(RegIdx::T1, RegIdx::T0, 1), brk()],
    ]
    .concat();

    let mut cpu = load_code(&code, Config::default());
    let (pc, ex) = run_until_exception(&mut cpu);

    if IGNORE_OVERFLOW {
        assert_eq!(ex, Exception::Breakpoint);
        assert_eq!(cpu.regs.read(RegIdx::T1), 0x8000_0000);
    } else {
        assert_eq!(ex, Exception::IntegerOverflow);
        assert_eq!(pc, addr(2));
        assert_eq!(cpu.pc, addr(2));
        assert_eq!(cpu.regs.read(RegIdx::T0), 0x7fff_ffff);
        assert_eq!(cpu.regs.read(RegIdx::T1), 0);
        assert_eq!(cpu.sys.reg(13) >> 2 & 0x1f, 0xc);
    }
}

#[test]
fn syscall_stops_at_instruction() {
    let mut cpu = load_code(
        &[
            addiu(RegIdx::V0, RegIdx::ZERO, 3),
            syscall(),
            addiu(RegIdx::V0, RegIdx::ZERO, 4),
            brk(),
        ],
        Config::default(),
    );

    let exit = cpu.run_block();

    assert_eq!(exit, Exit::Exception { pc: addr(1), ex: Exception::Syscall });
    assert_eq!(cpu.pc, addr(1));
    assert_eq!(cpu.regs.read(RegIdx::V0), 3);
    assert_eq!(cpu.sys.take_exception(), Some(Exception::Syscall));
}

#[test]
fn missing_coprocessor() {
    let mut cpu = load_code(&[NOP, lwc1(0, 0, RegIdx::ZERO), brk()], Config::default());
    let (pc, ex) = run_until_exception(&mut cpu);

    assert_eq!(ex, Exception::ReservedInstruction);
    assert_eq!(pc, addr(1));
}

#[test]
fn exception_sets_epc() {
    let code = [NOP, syscall(), brk()];

    let mut cpu = load_code(&code, Config::default());
    let (pc, _) = run_until_exception(&mut cpu);

    assert_eq!(pc, addr(1));
    assert_eq!(cpu.sys.reg(14), addr(1));

    let mut cpu = load_code(&code, Config::default());
    assert_eq!(cpu.step(), Exit::Jump(addr(1)));
    assert_eq!(cpu.sys.reg(14), 0);

    assert_eq!(cpu.step(), Exit::Exception { pc: addr(1), ex: Exception::Syscall });
    assert_eq!(cpu.sys.reg(14), addr(1));
}

#[test]
fn link_only_when_taken() {
    let cpu = run_code(&[
        addiu(RegIdx::T0, RegIdx::ZERO, 1),
        bltzal(addr(1), RegIdx::T0, addr(4)),
        NOP,
        brk(),
        NOP,
    ]);
    assert_eq!(cpu.regs.read(RegIdx::RA), 0);

    let cpu = run_code(&[
        addiu(RegIdx::T0, RegIdx::ZERO, 1),
        bgezal(addr(1), RegIdx::T0, addr(4)),
        NOP,
        NOP,
        brk(),
    ]);
    assert_eq!(cpu.regs.read(RegIdx::RA), addr(3));
}

#[test]
fn call_and_return() {
    let code = [
        jal(addr(4)),
        addu(RegIdx::T0, RegIdx::RA, RegIdx::ZERO),
        brk(),
        NOP,
        addiu(RegIdx::V0, RegIdx::ZERO, 7),
        jr(RegIdx::RA),
        NOP,
    ];

    for fold_constants in [true, false] {
        let mut cpu = load_code(&code, Config { fold_constants, ..Config::default() });
        let pc = run_cpu(&mut cpu);

        assert_eq!(pc, addr(2));
        assert_eq!(cpu.regs.read(RegIdx::V0), 7);
        // The delay slot sees the return address.
        assert_eq!(cpu.regs.read(RegIdx::T0), addr(2));
    }
}

#[test]
fn register_jump_and_link() {
    let code = [
        &li(RegIdx::T1, addr(5))[..],
        &[jalr(RegIdx::T2, RegIdx::T1), NOP, brk(), brk(), brk()],
    ]
    .concat();

    let mut cpu = load_code(&code, Config::default());
    let pc = run_cpu(&mut cpu);

    assert_eq!(pc, addr(5));
    assert_eq!(cpu.regs.read(RegIdx::T2), addr(4));
}

#[test]
fn cop0_moves() {
    let cpu = run_code(&[
        addiu(RegIdx::T0, RegIdx::ZERO, 0x401),
        mtc0(RegIdx::T0, 12),
        mfc0(RegIdx::T1, 12),
        mfc0(RegIdx::T2, 15),
        brk(),
    ]);

    assert_eq!(cpu.regs.read(RegIdx::T1), 0x401);
    assert_eq!(cpu.regs.read(RegIdx::T2), 2);
}

#[test]
fn gte_projection() {
    let code = [
        addiu(RegIdx::T0, RegIdx::ZERO, 0x1000),
        ctc2(RegIdx::T0, 0),
        ctc2(RegIdx::T0, 2),
        ctc2(RegIdx::T0, 4),
        addiu(RegIdx::T0, RegIdx::ZERO, 256),
        ctc2(RegIdx::T0, 26),
        mtc2(RegIdx::T0, 1),
        cop2(0x0018_0001),
        mfc2(RegIdx::T1, 19),
        mfc2(RegIdx::T2, 14),
        cfc2(T3, 31),
        brk(),
    ];

    let cpu = run_code(&code);

    assert_eq!(cpu.regs.read(RegIdx::T1), 256);
    assert_eq!(cpu.regs.read(RegIdx::T2), 0);
    assert_eq!(cpu.regs.read(T3), 0);
}

#[test]
fn gte_register_round_trip() {
    let code = [
        &li(RegIdx::A0, 0x1234_8000)[..],
        &[
            mtc2(RegIdx::A0, 10),
            mfc2(RegIdx::A1, 10),
            mtc2(RegIdx::A0, 0),
            mfc2(RegIdx::A2, 0),
            ctc2(RegIdx::A0, 27),
            cfc2(RegIdx::A3, 27),
            brk(),
        ],
    ]
    .concat();

    let cpu = run_code(&code);

    assert_eq!(cpu.regs.read(RegIdx::A1), 0xffff_8000);
    assert_eq!(cpu.regs.read(RegIdx::A2), 0x1234_8000);
    assert_eq!(cpu.regs.read(RegIdx::A3), 0xffff_8000);
}

#[test]
fn gte_memory_transfer() {
    let code = [
        &li(RegIdx::A0, DATA)[..],
        &[
            lwc2(0, 0, RegIdx::A0),
            swc2(0, 4, RegIdx::A0),
            mfc2(RegIdx::T0, 0),
            brk(),
        ],
    ]
    .concat();

    let mut cpu = load_code(&code, Config::default());
    cpu.mem.store(Width::Word, DATA, 0x0040_0030);
    run_cpu(&mut cpu);

    assert_eq!(cpu.mem.load(Width::Word, DATA + 4), 0x0040_0030);
    assert_eq!(cpu.gte.data_load(0), 0x0040_0030);
}

#[test]
fn step_over_never_taken_branch() {
    let mut cpu = load_code(
        &[
            bne(addr(0), RegIdx::T0, RegIdx::T0, addr(0x40)),
            j(addr(4)),
            addiu(RegIdx::V0, RegIdx::ZERO, 5),
            brk(),
            brk(),
        ],
        Config::default(),
    );

    assert_eq!(cpu.step(), Exit::Jump(addr(1)));
    assert_eq!(cpu.step(), Exit::Jump(addr(4)));
    assert_eq!(cpu.regs.read(RegIdx::V0), 5);
    assert_eq!(cpu.step(), Exit::Exception { pc: addr(4), ex: Exception::Breakpoint });
}

#[test]
fn step_matches_block() {
    let code = [
        addiu(RegIdx::V0, RegIdx::ZERO, 1),
        sll(RegIdx::V0, RegIdx::V0, 1),
        slti(RegIdx::V1, RegIdx::V0, 1024),
        bne(addr(3), RegIdx::V1, RegIdx::ZERO, addr(1)),
        addiu(RegIdx::T0, RegIdx::T0, 1),
        brk(),
    ];

    let block = run_code(&code);

    let mut step = load_code(&code, Config::default());
    loop {
        if let Exit::Exception { ex, .. } = step.step() {
            assert_eq!(ex, Exception::Breakpoint);
            break;
        }
    }

    assert_eq!(step.regs, block.regs);
    assert_eq!(step.pc, block.pc);
    assert_eq!(block.regs.read(RegIdx::T0), 10);
}

#[test]
fn cached_blocks() {
    let mut cpu = load_code(&[addiu(RegIdx::V0, RegIdx::ZERO, 1), brk()], Config::default());
    run_cpu(&mut cpu);
    assert_eq!(cpu.regs.read(RegIdx::V0), 1);

    cpu.mem.store_words(BASE, &[addiu(RegIdx::V0, RegIdx::ZERO, 2)]);

    // The old translation is still used.
    cpu.pc = BASE;
    run_cpu(&mut cpu);
    assert_eq!(cpu.regs.read(RegIdx::V0), 1);

    cpu.invalidate_blocks();
    cpu.pc = BASE;
    run_cpu(&mut cpu);
    assert_eq!(cpu.regs.read(RegIdx::V0), 2);
}

/// Records tagged accesses as `(addr, pc)`.
struct TracedRam {
    ram: Ram,
    reads: Vec<(u32, u32)>,
    writes: Vec<(u32, u32)>,
}

impl AddrSpace for TracedRam {
    fn read8(&mut self, addr: u32) -> u8 {
        self.ram.read8(addr)
    }

    fn read16(&mut self, addr: u32) -> u16 {
        self.ram.read16(addr)
    }

    fn read32(&mut self, addr: u32) -> u32 {
        self.ram.read32(addr)
    }

    fn write8(&mut self, addr: u32, val: u8) {
        self.ram.write8(addr, val);
    }

    fn write16(&mut self, addr: u32, val: u16) {
        self.ram.write16(addr, val);
    }

    fn write32(&mut self, addr: u32, val: u32) {
        self.ram.write32(addr, val);
    }

    fn tag_read(&mut self, addr: u32, pc: u32) {
        self.reads.push((addr, pc));
    }

    fn tag_write(&mut self, addr: u32, pc: u32) {
        self.writes.push((addr, pc));
    }
}

#[test]
fn stack_accesses_untagged() {
    let code = [
        &li(RegIdx::SP, 0x8000_f000)[..],
        &li(RegIdx::A0, DATA)[..],
        &[
            sw(RegIdx::T0, 0, RegIdx::SP),
            lw(RegIdx::T1, 0, RegIdx::SP),
            sw(RegIdx::T0, 4, RegIdx::A0),
            lw(RegIdx::T1, 8, RegIdx::A0),
            swl(RegIdx::T0, 1, RegIdx::A0),
            brk(),
        ],
    ]
    .concat();

    let mut ram = Ram::new(0x10_0000);
    ram.store_words(BASE, &code);
    let mem = TracedRam { ram, reads: Vec::new(), writes: Vec::new() };

    let mut cpu = match Cpu::new(mem, Cop0::new(), Config::default()) {
        Ok(cpu) => cpu,
        Err(err) => panic!("{err}"),
    };
    cpu.pc = BASE;

    while !matches!(cpu.run_block(), Exit::Exception { .. }) {}

    assert_eq!(cpu.mem.reads, [(DATA + 8, addr(7))]);
    assert_eq!(cpu.mem.writes, [(DATA + 4, addr(6)), (DATA, addr(8))]);
}
