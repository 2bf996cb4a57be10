//! The instruction set of the MIPS R3000.
//!
//! Coprocessor 2 (the GTE) is registered separately by [`crate::gte::ins::GteInstructions`].

pub mod alu;
pub mod branch;
pub mod cop;
pub mod mem;
pub mod muldiv;

use crate::Error;
use super::registry::{Descriptor, InstructionProvider, Registry};

pub struct R3000;

impl InstructionProvider for R3000 {
    fn register(&self, registry: &mut Registry) -> Result<(), Error> {
        let primary: [(u32, &'static Descriptor); 35] = [
            (0x02, &branch::J),
            (0x03, &branch::JAL),
            (0x04, &branch::BEQ),
            (0x05, &branch::BNE),
            (0x06, &branch::BLEZ),
            (0x07, &branch::BGTZ),
            (0x08, &alu::ADDI),
            (0x09, &alu::ADDIU),
            (0x0a, &alu::SLTI),
            (0x0b, &alu::SLTIU),
            (0x0c, &alu::ANDI),
            (0x0d, &alu::ORI),
            (0x0e, &alu::XORI),
            (0x0f, &alu::LUI),
            (0x10, &cop::COP0),
            (0x11, &cop::COP1),
            (0x13, &cop::COP3),
            (0x20, &mem::LB),
            (0x21, &mem::LH),
            (0x22, &mem::LWL),
            (0x23, &mem::LW),
            (0x24, &mem::LBU),
            (0x25, &mem::LHU),
            (0x26, &mem::LWR),
            (0x28, &mem::SB),
            (0x29, &mem::SH),
            (0x2a, &mem::SWL),
            (0x2b, &mem::SW),
            (0x2e, &mem::SWR),
            (0x30, &cop::LWC0),
            (0x31, &cop::LWC1),
            (0x33, &cop::LWC3),
            (0x38, &cop::SWC0),
            (0x39, &cop::SWC1),
            (0x3b, &cop::SWC3),
        ];

        let special: [(u32, &'static Descriptor); 28] = [
            (0x00, &alu::SLL),
            (0x02, &alu::SRL),
            (0x03, &alu::SRA),
            (0x04, &alu::SLLV),
            (0x06, &alu::SRLV),
            (0x07, &alu::SRAV),
            (0x08, &branch::JR),
            (0x09, &branch::JALR),
            (0x0c, &cop::SYSCALL),
            (0x0d, &cop::BREAK),
            (0x10, &muldiv::MFHI),
            (0x11, &muldiv::MTHI),
            (0x12, &muldiv::MFLO),
            (0x13, &muldiv::MTLO),
            (0x18, &muldiv::MULT),
            (0x19, &muldiv::MULTU),
            (0x1a, &muldiv::DIV),
            (0x1b, &muldiv::DIVU),
            (0x20, &alu::ADD_INS),
            (0x21, &alu::ADDU),
            (0x22, &alu::SUB_INS),
            (0x23, &alu::SUBU),
            (0x24, &alu::AND),
            (0x25, &alu::OR),
            (0x26, &alu::XOR),
            (0x27, &alu::NOR),
            (0x2a, &alu::SLT),
            (0x2b, &alu::SLTU),
        ];

        for (opcode, desc) in primary {
            registry.set_instruction(opcode, desc)?;
        }

        for (opcode, desc) in special {
            registry.set_special_instruction(opcode, desc)?;
        }

        // Bit 0 picks `bgez` over `bltz`. Selectors 0x10 and 0x11 link, every other selector
        // decodes to the plain variant.
        for selector in 0..32 {
            let link = selector & 0x1e == 0x10;
            let desc = match (selector & 1 == 1, link) {
                (false, false) => &branch::BLTZ,
                (true, false) => &branch::BGEZ,
                (false, true) => &branch::BLTZAL,
                (true, true) => &branch::BGEZAL,
            };
            registry.set_regimm_instruction(selector, desc)?;
        }

        Ok(())
    }
}
