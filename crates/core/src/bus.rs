//! # Memory Bus
//! Decodes a CPU address into one of the windows of a `MemoryMap` and
//! forwards the access to the device mapped there.

use crate::apu::ApuRegisters;
use crate::cartridge::{Cartridge, Rom};
use crate::map::MemoryMap;
use crate::memory::{Memory, MemoryBlock, MirroredMemory};
use crate::ppu::PpuRegisters;
use crate::{NesError, Result};

/// The window an address falls in.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Window {
    ZeroPage,
    Ram,
    Ppu,
    Apu,
    Cartridge,
    Unmapped,
}

pub struct Bus<P: Memory = PpuRegisters, A: Memory = ApuRegisters> {
    map: MemoryMap,
    zero_page: MemoryBlock,
    ram: MirroredMemory<MemoryBlock>,
    ppu: MirroredMemory<P>,
    apu: A,
    cartridge: Option<Cartridge>,
}

impl Bus {
    /// Bus with the register stubs attached to the PPU and APU windows.
    pub fn new(map: MemoryMap) -> Result<Self> {
        let ppu = PpuRegisters::new(map.ppu_registers);
        let apu = ApuRegisters::new(map.apu_registers);
        Bus::with_devices(map, ppu, apu)
    }
}

impl<P: Memory, A: Memory> Bus<P, A> {
    pub fn with_devices(map: MemoryMap, ppu: P, apu: A) -> Result<Self> {
        map.validate()?;
        Ok(Bus {
            map,
            zero_page: MemoryBlock::new(map.zero_page),
            ram: MirroredMemory::new(MemoryBlock::new(map.ram), map.ram, map.ram_mirror)?,
            ppu: MirroredMemory::new(ppu, map.ppu_registers, map.ppu_mirror)?,
            apu,
            cartridge: None,
        })
    }

    pub fn map(&self) -> &MemoryMap {
        &self.map
    }

    pub fn ppu(&self) -> &P {
        self.ppu.inner()
    }

    pub fn ppu_mut(&mut self) -> &mut P {
        self.ppu.inner_mut()
    }

    pub fn apu(&self) -> &A {
        &self.apu
    }

    pub fn apu_mut(&mut self) -> &mut A {
        &mut self.apu
    }

    pub fn cartridge(&self) -> Option<&Cartridge> {
        self.cartridge.as_ref()
    }

    /// Attaches `rom` to the cartridge window, replacing any earlier one.
    pub fn load(&mut self, rom: Rom) -> Result<()> {
        let cartridge = Cartridge::new(rom, &self.map)?;
        log::debug!(
            "Loaded ROM: PRG {} bytes, CHR {} bytes, mapper {}, {:?} mirroring",
            cartridge.rom().prg_rom().len(),
            cartridge.rom().chr_rom().len(),
            cartridge.rom().mapper(),
            cartridge.rom().mirroring()
        );
        self.cartridge = Some(cartridge);
        Ok(())
    }

    pub fn window(&self, address: u16) -> Window {
        let map = &self.map;
        if map.zero_page.contains(address) {
            Window::ZeroPage
        } else if map.ram.contains(address) || map.ram_mirror.contains(address) {
            Window::Ram
        } else if map.ppu_registers.contains(address) || map.ppu_mirror.contains(address) {
            Window::Ppu
        } else if map.apu_registers.contains(address) {
            Window::Apu
        } else if map.cartridge.contains(address) {
            Window::Cartridge
        } else {
            Window::Unmapped
        }
    }

    fn cartridge_mut(&mut self, address: u16) -> Result<&mut Cartridge> {
        self.cartridge
            .as_mut()
            .ok_or(NesError::MissingCartridge(address))
    }
}

impl<P: Memory, A: Memory> Memory for Bus<P, A> {
    fn read(&mut self, address: u16) -> Result<u8> {
        match self.window(address) {
            Window::ZeroPage => self.zero_page.read(address),
            Window::Ram => self.ram.read(address),
            Window::Ppu => self.ppu.read(address),
            Window::Apu => self.apu.read(address),
            Window::Cartridge => self.cartridge_mut(address)?.read(address),
            Window::Unmapped => Err(NesError::UnmappedAddress(address)),
        }
    }

    fn write(&mut self, address: u16, value: u8) -> Result<()> {
        match self.window(address) {
            Window::ZeroPage => self.zero_page.write(address, value),
            Window::Ram => self.ram.write(address, value),
            Window::Ppu => self.ppu.write(address, value),
            Window::Apu => self.apu.write(address, value),
            Window::Cartridge => self.cartridge_mut(address)?.write(address, value),
            Window::Unmapped => Err(NesError::UnmappedAddress(address)),
        }
    }

    fn peek(&self, address: u16) -> Result<u8> {
        match self.window(address) {
            Window::ZeroPage => self.zero_page.peek(address),
            Window::Ram => self.ram.peek(address),
            Window::Ppu => self.ppu.peek(address),
            Window::Apu => self.apu.peek(address),
            Window::Cartridge => self
                .cartridge
                .as_ref()
                .ok_or(NesError::MissingCartridge(address))?
                .peek(address),
            Window::Unmapped => Err(NesError::UnmappedAddress(address)),
        }
    }
}
