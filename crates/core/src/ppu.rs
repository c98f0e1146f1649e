//! # PPUレジスタ
//!
//! CPUから見えるPPUの8個のレジスタだけを持つスタブ。描画は行わない。
//! PPUSTATUSの読み込みでVBlankフラグが落ちる副作用だけを再現する。

use crate::memory::{Memory, MemoryBlock, MemoryRange};
use crate::Result;

pub const PPUCTRL: u16 = 0;
pub const PPUMASK: u16 = 1;
pub const PPUSTATUS: u16 = 2;
pub const OAMADDR: u16 = 3;
pub const OAMDATA: u16 = 4;
pub const PPUSCROLL: u16 = 5;
pub const PPUADDR: u16 = 6;
pub const PPUDATA: u16 = 7;

/// VBlank開始フラグ (PPUSTATUS bit 7)
pub const VBLANK: u8 = 0x80;

/// PPUレジスタのラッチ
#[derive(Debug, Clone)]
pub struct PpuRegisters {
    registers: MemoryBlock,
}

impl PpuRegisters {
    /// `range` の先頭から8バイトをレジスタとして扱う
    pub fn new(range: MemoryRange) -> Self {
        PpuRegisters {
            registers: MemoryBlock::new(range),
        }
    }

    pub fn range(&self) -> MemoryRange {
        self.registers.range()
    }

    /// PPUSTATUSの現在値（副作用なし）
    pub fn status(&self) -> u8 {
        self.registers
            .as_slice()
            .get(PPUSTATUS as usize)
            .copied()
            .unwrap_or(0)
    }

    /// PPU側からPPUSTATUSを更新する
    pub fn set_status(&mut self, value: u8) -> Result<()> {
        let address = self.status_address();
        self.registers.write(address, value)
    }

    fn status_address(&self) -> u16 {
        self.range().start() + PPUSTATUS
    }
}

impl Default for PpuRegisters {
    fn default() -> Self {
        PpuRegisters::new(crate::map::MemoryMap::NES.ppu_registers)
    }
}

impl Memory for PpuRegisters {
    fn read(&mut self, address: u16) -> Result<u8> {
        let data = self.registers.read(address)?;
        if address == self.status_address() {
            // Reading PPUSTATUS clears the VBlank flag
            self.registers.write(address, data & !VBLANK)?;
        }
        Ok(data)
    }

    fn write(&mut self, address: u16, value: u8) -> Result<()> {
        self.registers.write(address, value)
    }

    fn peek(&self, address: u16) -> Result<u8> {
        self.registers.peek(address)
    }
}
