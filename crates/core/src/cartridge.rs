//! # Cartridge
//! iNES header parsing and the NROM view of the cartridge window.

use crate::map::MemoryMap;
use crate::memory::{Memory, MemoryBlock, MemoryRange, MirroredMemory};
use crate::{NesError, Result};
use std::path::Path;

const HEADER_SIZE: usize = 16;
const TRAINER_SIZE: usize = 512;
const PRG_BANK_SIZE: usize = 16 * 1024;
const CHR_BANK_SIZE: usize = 8 * 1024;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    FourScreen,
}

/// Raw contents of an iNES image. Only header fields are interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rom {
    prg_rom: Vec<u8>,
    chr_rom: Vec<u8>,
    mapper: u8,
    mirroring: Mirroring,
    battery: bool,
}

impl Rom {
    pub fn from_bytes(data: &[u8]) -> Result<Rom> {
        if data.len() < HEADER_SIZE {
            return Err(NesError::InvalidRom(format!(
                "ROM too small: {} bytes",
                data.len()
            )));
        }
        if &data[0..4] != b"NES\x1A" {
            return Err(NesError::InvalidRom("Invalid iNES header".to_string()));
        }

        let prg_rom_size = data[4] as usize * PRG_BANK_SIZE;
        let chr_rom_size = data[5] as usize * CHR_BANK_SIZE;
        let flags6 = data[6];
        let flags7 = data[7];

        if prg_rom_size == 0 {
            return Err(NesError::InvalidRom("No PRG ROM banks".to_string()));
        }

        let mapper = (flags7 & 0xF0) | (flags6 >> 4);
        let mirroring = if flags6 & 0x08 != 0 {
            Mirroring::FourScreen
        } else if flags6 & 0x01 != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };
        let battery = flags6 & 0x02 != 0;

        let has_trainer = flags6 & 0x04 != 0;
        let prg_start = HEADER_SIZE + if has_trainer { TRAINER_SIZE } else { 0 };
        let chr_start = prg_start + prg_rom_size;
        let end = chr_start + chr_rom_size;
        if data.len() < end {
            return Err(NesError::InvalidRom(format!(
                "Truncated ROM: header needs {} bytes, got {}",
                end,
                data.len()
            )));
        }

        Ok(Rom {
            prg_rom: data[prg_start..chr_start].to_vec(),
            chr_rom: data[chr_start..end].to_vec(),
            mapper,
            mirroring,
            battery,
        })
    }

    /// Reads and parses an iNES file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Rom> {
        let data = std::fs::read(path)?;
        Rom::from_bytes(&data)
    }

    pub fn prg_rom(&self) -> &[u8] {
        &self.prg_rom
    }

    pub fn chr_rom(&self) -> &[u8] {
        &self.chr_rom
    }

    pub fn mapper(&self) -> u8 {
        self.mapper
    }

    pub fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    pub fn has_battery(&self) -> bool {
        self.battery
    }
}

/// The cartridge window as the CPU sees it: PRG RAM and NROM-mapped PRG ROM.
/// The expansion area below PRG RAM has nothing attached.
pub struct Cartridge {
    prg_ram: MemoryBlock,
    prg_rom: Box<dyn Memory>,
    prg_rom_range: MemoryRange,
    rom: Rom,
}

impl Cartridge {
    pub fn new(rom: Rom, map: &MemoryMap) -> Result<Cartridge> {
        if rom.mapper != 0 {
            log::warn!("Mapper {} is mapped as NROM", rom.mapper);
        }

        let window = map.prg_rom;
        let size = rom.prg_rom.len();
        let prg_rom: Box<dyn Memory> = if size == window.len() {
            Box::new(MemoryBlock::from_bytes(window, rom.prg_rom.clone())?)
        } else if size * 2 == window.len() {
            // 16KB images appear in both banks
            let bank = MemoryRange::new(window.start(), window.start() + (size - 1) as u16)?;
            let mirror = MemoryRange::new(bank.end() + 1, window.end())?;
            let block = MemoryBlock::from_bytes(bank, rom.prg_rom.clone())?;
            Box::new(MirroredMemory::new(block, bank, mirror)?)
        } else {
            return Err(NesError::InvalidRom(format!(
                "PRG ROM of {} bytes does not fit NROM window {}",
                size, window
            )));
        };

        Ok(Cartridge {
            prg_ram: MemoryBlock::new(map.prg_ram),
            prg_rom,
            prg_rom_range: window,
            rom,
        })
    }

    pub fn rom(&self) -> &Rom {
        &self.rom
    }

    fn device(&self, address: u16) -> Result<&dyn Memory> {
        if self.prg_rom_range.contains(address) {
            Ok(self.prg_rom.as_ref())
        } else if self.prg_ram.range().contains(address) {
            Ok(&self.prg_ram)
        } else {
            Err(NesError::UnmappedAddress(address))
        }
    }

    fn device_mut(&mut self, address: u16) -> Result<&mut dyn Memory> {
        if self.prg_rom_range.contains(address) {
            Ok(self.prg_rom.as_mut())
        } else if self.prg_ram.range().contains(address) {
            Ok(&mut self.prg_ram)
        } else {
            Err(NesError::UnmappedAddress(address))
        }
    }
}

impl Memory for Cartridge {
    fn read(&mut self, address: u16) -> Result<u8> {
        self.device_mut(address)?.read(address)
    }

    // PRG ROM stays writable so harnesses can patch vectors.
    fn write(&mut self, address: u16, value: u8) -> Result<()> {
        self.device_mut(address)?.write(address, value)
    }

    fn peek(&self, address: u16) -> Result<u8> {
        self.device(address)?.peek(address)
    }
}
