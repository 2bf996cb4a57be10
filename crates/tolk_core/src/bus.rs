//! The address space as seen from the CPU.
//!
//! The real memory map (RAM, BIOS, IO ports and so on) lives outside the core. The core only
//! needs aligned reads and writes of bytes, half words and words, plus the tagging hooks used to
//! trace memory accesses.

use tolk_util::Bit;

use std::fmt;

/// Width of a memory access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Width {
    Byte,
    Half,
    Word,
}

impl Width {
    pub fn bytes(self) -> u32 {
        match self {
            Width::Byte => 1,
            Width::Half => 2,
            Width::Word => 4,
        }
    }
}

impl fmt::Display for Width {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Width::Byte => f.write_str("8"),
            Width::Half => f.write_str("16"),
            Width::Word => f.write_str("32"),
        }
    }
}

pub trait AddrSpace {
    fn read8(&mut self, addr: u32) -> u8;

    fn read16(&mut self, addr: u32) -> u16;

    fn read32(&mut self, addr: u32) -> u32;

    fn write8(&mut self, addr: u32, val: u8);

    fn write16(&mut self, addr: u32, val: u16);

    fn write32(&mut self, addr: u32, val: u32);

    /// Called before a tagged data load. `pc` is the address of the loading instruction.
    fn tag_read(&mut self, _addr: u32, _pc: u32) {}

    /// Called before a tagged data store.
    fn tag_write(&mut self, _addr: u32, _pc: u32) {}

    /// Fetch an instruction word for translation.
    fn fetch(&mut self, addr: u32) -> u32 {
        self.read32(addr)
    }

    fn read(&mut self, width: Width, addr: u32) -> u32 {
        match width {
            Width::Byte => self.read8(addr).into(),
            Width::Half => self.read16(addr).into(),
            Width::Word => self.read32(addr),
        }
    }

    fn write(&mut self, width: Width, addr: u32, val: u32) {
        match width {
            Width::Byte => self.write8(addr, val as u8),
            Width::Half => self.write16(addr, val as u16),
            Width::Word => self.write32(addr, val),
        }
    }
}

/// Strip the segment bits of a virtual address. KUSEG, KSEG0 and KSEG1 all map to the same
/// physical memory.
#[inline]
pub fn physical_addr(addr: u32) -> u32 {
    addr.bit_range(0, 28)
}

/// Flat little-endian memory, mirrored across the whole physical address range.
///
/// This is enough to run code in tests and tools. A full system would implement [`AddrSpace`]
/// on its bus instead.
pub struct Ram {
    data: Box<[u8]>,
    mask: u32,
}

impl Ram {
    /// Create RAM of `size` bytes, which must be a power of two.
    pub fn new(size: usize) -> Self {
        assert!(size.is_power_of_two(), "RAM size must be a power of two");
        Self {
            data: vec![0; size].into_boxed_slice(),
            mask: size as u32 - 1,
        }
    }

    #[inline]
    fn offset(&self, addr: u32) -> usize {
        (physical_addr(addr) & self.mask) as usize
    }

    pub fn load(&self, width: Width, addr: u32) -> u32 {
        let offset = self.offset(addr);
        (0..width.bytes() as usize).fold(0, |val, byte| {
            val | u32::from(self.data[(offset + byte) & self.mask as usize]) << (8 * byte)
        })
    }

    pub fn store(&mut self, width: Width, addr: u32, val: u32) {
        let offset = self.offset(addr);
        for byte in 0..width.bytes() as usize {
            self.data[(offset + byte) & self.mask as usize] = (val >> (8 * byte)) as u8;
        }
    }

    /// Copy `words` into memory starting at `addr`.
    pub fn store_words(&mut self, addr: u32, words: &[u32]) {
        for (i, word) in words.iter().enumerate() {
            self.store(Width::Word, addr.wrapping_add(i as u32 * 4), *word);
        }
    }
}

impl AddrSpace for Ram {
    fn read8(&mut self, addr: u32) -> u8 {
        self.load(Width::Byte, addr) as u8
    }

    fn read16(&mut self, addr: u32) -> u16 {
        self.load(Width::Half, addr) as u16
    }

    fn read32(&mut self, addr: u32) -> u32 {
        self.load(Width::Word, addr)
    }

    fn write8(&mut self, addr: u32, val: u8) {
        self.store(Width::Byte, addr, val.into());
    }

    fn write16(&mut self, addr: u32, val: u16) {
        self.store(Width::Half, addr, val.into());
    }

    fn write32(&mut self, addr: u32, val: u32) {
        self.store(Width::Word, addr, val);
    }
}
