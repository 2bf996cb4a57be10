//! The MIPS R3000 execution core.
//!
//! Instructions are decoded through the [`Registry`]. Each instruction either runs directly on
//! the register file through its simulate hook, or gets compiled as part of a basic block into
//! micro-operations which [`exec::run`] executes.

#[macro_use]
pub mod registry;

mod context;

pub mod exec;
pub mod ir;
pub mod opcode;
pub mod r3000;
pub mod translate;

use crate::bus::AddrSpace;
use crate::cop0::SystemControl;
use crate::gte::Gte;
use crate::{Config, Error};

use serde::{Deserialize, Serialize};

use std::collections::hash_map::{Entry, HashMap};

pub use context::CompileContext;
pub use exec::{Env, Exit};
pub use opcode::{Opcode, RegIdx};
pub use registry::{BranchKind, Descriptor, InsFlags, Registry};
pub use translate::{Block, Translator};

/// # Registers
///
/// All registers of the MIPS R3000 are essentially general purpose besides $r0 which always
/// contains the value 0. They are however used for specific purposes depending on convention.
///
/// | Number  | Name    | Usage                 |
/// |---------|---------|-----------------------|
/// | r0      | $zero   | Always 0              |
/// | r1      | $at     | Reserved by assembler |
/// | r2-r3   | $v0-$v1 | Results               |
/// | r4-r7   | $a0-$a3 | Arguments             |
/// | r8-r15  | $t0-$t7 | Temporaries           |
/// | r16-r23 | $s0-$s7 | Storing               |
/// | r24-r25 | $t8-$t9 | Temporaries           |
/// | r26-r27 | $k0-$k1 | Reserved by kernel    |
/// | r28     | $gp     | Global pointer        |
/// | r29     | $sp     | Stack pointer         |
/// | r30     | $fp     | Frame pointer         |
/// | r31     | $ra     | Return address        |
///
/// Results of multiply and divide instructions aren't stored in general purpose registers, but
/// in the two special registers `hi` and `lo`.
#[derive(Clone, Default, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Regs {
    pub gpr: [u32; 32],
    pub hi: u32,
    pub lo: u32,
}

impl Regs {
    #[inline]
    pub fn read(&self, idx: RegIdx) -> u32 {
        self.gpr[idx.idx()]
    }

    /// Writes to `$zero` are discarded.
    #[inline]
    pub fn write(&mut self, idx: RegIdx, val: u32) {
        self.gpr[idx.idx()] = val;
        self.gpr[0] = 0;
    }
}

/// Drives the core one instruction or one block at a time.
pub struct Cpu<M: AddrSpace, S: SystemControl> {
    pub regs: Regs,
    /// The address of the next instruction to execute. After an exception, it's the address of
    /// the instruction which signalled it, which is also handed to [`SystemControl::set_epc`].
    ///
    /// The branch delay (BD) bit of `cause` isn't modelled. If the exception was signalled by the
    /// delay slot of a branch, `pc` and `epc` point at the delay slot itself, so resuming there
    /// skips the branch.
    pub pc: u32,
    pub gte: Gte,
    pub mem: M,
    pub sys: S,
    registry: Registry,
    config: Config,
    blocks: HashMap<u32, Block>,
}

impl<M: AddrSpace, S: SystemControl> Cpu<M, S> {
    pub fn new(mem: M, sys: S, config: Config) -> Result<Self, Error> {
        Self::with_registry(mem, sys, config, Registry::standard()?)
    }

    pub fn with_registry(
        mem: M,
        sys: S,
        config: Config,
        registry: Registry,
    ) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            regs: Regs::default(),
            pc: 0,
            gte: Gte::default(),
            mem,
            sys,
            registry,
            config,
            blocks: HashMap::new(),
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Execute a single instruction at `pc`.
    ///
    /// Instructions which can be simulated run directly on the register file. Everything else,
    /// including branches together with their delay slot, is translated on its own and run.
    pub fn step(&mut self) -> Exit {
        let op = Opcode::new(self.mem.fetch(self.pc));
        let desc = self.registry.decode(op);

        if let Some(simulate) = desc.simulate_fn() {
            if simulate(op, &mut self.regs) {
                self.pc = self.pc.wrapping_add(4);
                return Exit::Jump(self.pc);
            }
        }

        let block = Translator::new(&self.registry, &self.config)
            .with_max_len(1)
            .translate(&mut self.mem, self.pc);

        self.run(&block)
    }

    /// Translate, or find in the cache, the block at `pc` and run it.
    pub fn run_block(&mut self) -> Exit {
        let pc = self.pc;

        if !self.config.cache_blocks {
            let block = Translator::new(&self.registry, &self.config).translate(&mut self.mem, pc);
            return self.run(&block);
        }

        let block = match self.blocks.entry(pc) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let block =
                    Translator::new(&self.registry, &self.config).translate(&mut self.mem, pc);
                debug!("translated block at {pc:08x} with {} instructions", block.len);
                entry.insert(block)
            }
        };

        let mut env = Env {
            regs: &mut self.regs,
            gte: &mut self.gte,
            mem: &mut self.mem,
            sys: &mut self.sys,
        };
        let exit = exec::run(block, &mut env);

        self.take_exit(exit)
    }

    /// Forget every translated block. Must be called when code has been overwritten.
    pub fn invalidate_blocks(&mut self) {
        debug!("invalidating {} blocks", self.blocks.len());
        self.blocks.clear();
    }

    fn run(&mut self, block: &Block) -> Exit {
        let mut env = Env {
            regs: &mut self.regs,
            gte: &mut self.gte,
            mem: &mut self.mem,
            sys: &mut self.sys,
        };
        let exit = exec::run(block, &mut env);
        self.take_exit(exit)
    }

    fn take_exit(&mut self, exit: Exit) -> Exit {
        self.pc = match exit {
            Exit::Jump(target) => target,
            Exit::Exception { pc, .. } => {
                self.sys.set_epc(pc);
                pc
            }
        };
        exit
    }
}
