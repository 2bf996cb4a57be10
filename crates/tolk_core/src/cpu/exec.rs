//! Reference backend which runs translated blocks directly.

use crate::bus::{AddrSpace, Width};
use crate::cop0::{Exception, SystemControl};
use crate::gte::Gte;
use super::ir::{Call, MicroOp, Operand, Reg};
use super::translate::Block;
use super::Regs;

use tolk_util::SignExtend;

/// How a block was left.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Exit {
    /// Continue at the address.
    Jump(u32),
    /// An exception was signalled by the instruction at `pc`.
    Exception { pc: u32, ex: Exception },
}

/// Everything a block can touch.
pub struct Env<'a> {
    pub regs: &'a mut Regs,
    pub gte: &'a mut Gte,
    pub mem: &'a mut dyn AddrSpace,
    pub sys: &'a mut dyn SystemControl,
}

/// Run `block` until it leaves.
pub fn run(block: &Block, env: &mut Env) -> Exit {
    let mut temps = vec![0_u32; block.temps as usize];
    let mut pc = block.start;

    macro_rules! val {
        ($operand:expr) => {
            match $operand {
                Operand::Temp(temp) => temps[temp.0 as usize],
                Operand::Const(val) => val,
            }
        };
    }

    for op in &block.ops {
        match *op {
            MicroOp::Ins { addr } => pc = addr,
            MicroOp::LoadReg { dst, reg } => {
                temps[dst.0 as usize] = match reg {
                    Reg::Gpr(idx) => env.regs.read(idx),
                    Reg::Hi => env.regs.hi,
                    Reg::Lo => env.regs.lo,
                };
            }
            MicroOp::StoreReg { reg, src } => {
                let val = val!(src);
                match reg {
                    Reg::Gpr(idx) => env.regs.write(idx, val),
                    Reg::Hi => env.regs.hi = val,
                    Reg::Lo => env.regs.lo = val,
                }
            }
            MicroOp::BinOp { op, dst, lhs, rhs } => match op.eval(val!(lhs), val!(rhs)) {
                Some(val) => temps[dst.0 as usize] = val,
                None => {
                    debug_assert!(op.may_trap());
                    env.sys.signal(Exception::IntegerOverflow);
                    return Exit::Exception { pc, ex: Exception::IntegerOverflow };
                }
            },
            MicroOp::Merge { kind, dst, reg, word, addr } => {
                temps[dst.0 as usize] = kind.merge(val!(reg), val!(word), val!(addr));
            }
            MicroOp::MemRead { width, signed, dst, addr, tagged } => {
                let addr = val!(addr);
                if tagged {
                    env.mem.tag_read(addr, pc);
                }
                let val = env.mem.read(width, addr);
                temps[dst.0 as usize] = match (width, signed) {
                    (Width::Byte, true) => val.sext8(),
                    (Width::Half, true) => val.sext16(),
                    _ => val,
                };
            }
            MicroOp::MemWrite { width, addr, src, tagged } => {
                let addr = val!(addr);
                if tagged {
                    env.mem.tag_write(addr, pc);
                }
                env.mem.write(width, addr, val!(src));
            }
            MicroOp::Branch { cond, target, link } => {
                let taken = match cond {
                    Some(cond) => val!(cond) != 0,
                    None => true,
                };
                if taken {
                    if let Some((reg, val)) = link {
                        env.regs.write(reg, val);
                    }
                    return Exit::Jump(val!(target));
                }
            }
            MicroOp::Call { call, arg, dst } => {
                let arg = arg.map(|arg| val!(arg)).unwrap_or(0);
                let ret = match call {
                    Call::GteDataLoad(reg) => env.gte.data_load(reg),
                    Call::GteDataStore(reg) => {
                        env.gte.data_store(reg, arg);
                        0
                    }
                    Call::GteControlLoad(reg) => env.gte.control_load(reg),
                    Call::GteControlStore(reg) => {
                        env.gte.control_store(reg, arg);
                        0
                    }
                    Call::GteExec(word) => {
                        env.gte.exec(word);
                        0
                    }
                    Call::Cop0Load(reg) => env.sys.read_cop0(reg),
                    Call::Cop0Store(reg) => {
                        env.sys.write_cop0(reg, arg);
                        0
                    }
                    Call::ReturnFromException => {
                        env.sys.return_from_exception();
                        0
                    }
                    Call::Signal(ex) => {
                        env.sys.signal(ex);
                        return Exit::Exception { pc, ex };
                    }
                };
                if let Some(dst) = dst {
                    temps[dst.0 as usize] = ret;
                }
            }
        }
    }

    // Every translated block ends in a branch.
    Exit::Jump(block.end)
}
