//! # NES CPU Core
//! 6502 instruction engine, memory bus and iNES loading for the NES.

pub mod addressing;
pub mod apu;
pub mod bus;
pub mod cartridge;
pub mod compliance;
pub mod cpu;
pub mod error;
mod execute;
pub mod flags;
pub mod map;
pub mod memory;
pub mod opcode;
pub mod ppu;

pub use bus::Bus;
pub use cartridge::Rom;
pub use cpu::{Cpu, Interrupt};
pub use error::{NesError, Result};
pub use flags::StatusFlags;
pub use map::MemoryMap;
pub use memory::{Memory, MemoryBlock, MemoryRange, MirroredMemory};
pub use opcode::{OpCode, OPCODES};

use apu::Port;
use compliance::RunSummary;

/// NESのCPUとバスをまとめたインスタンス
pub struct Nes {
    cpu: Cpu,
}

impl Nes {
    /// 標準のメモリマップで新しいインスタンスを作成
    pub fn new() -> Result<Self> {
        Self::with_map(MemoryMap::NES)
    }

    /// 任意のメモリマップで作成
    pub fn with_map(map: MemoryMap) -> Result<Self> {
        Ok(Self {
            cpu: Cpu::new(Bus::new(map)?),
        })
    }

    /// ROMをロード（電源は入れない）
    pub fn load_rom(&mut self, rom_data: &[u8]) -> Result<()> {
        let rom = Rom::from_bytes(rom_data)?;
        self.cpu.bus.load(rom)
    }

    /// 電源ボタン（ON/OFFを切り替える）
    pub fn power(&mut self) -> Result<()> {
        self.cpu.power()
    }

    /// 1命令（または割り込み処理1回）実行し、消費サイクルを返す
    pub fn step(&mut self) -> Result<u32> {
        self.cpu.step()
    }

    /// 最大 `max_steps` 命令まで実行
    pub fn run(&mut self, max_steps: u64) -> Result<RunSummary> {
        compliance::run(&mut self.cpu, max_steps)
    }

    /// 割り込みを要求
    pub fn interrupt(&mut self, kind: Interrupt) {
        self.cpu.interrupt(kind);
    }

    /// ジョイパッドの入力バイトを設定
    pub fn set_joypad(&mut self, port: Port, value: u8) {
        self.cpu.bus.apu_mut().set_joypad(port, value);
    }

    /// CPU状態の取得（デバッグ用）
    pub fn cpu_state(&self) -> &Cpu {
        &self.cpu
    }

    /// CPU状態のmutable取得
    pub fn cpu_state_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    /// 任意のCPUメモリアドレスを読み取り（副作用なし）
    pub fn peek_memory(&self, address: u16) -> Result<u8> {
        self.cpu.bus.peek(address)
    }

    /// メモリ範囲を読み取り（副作用なし）
    pub fn read_memory_range(&self, start: u16, length: usize) -> Result<Vec<u8>> {
        (0..length)
            .map(|i| self.peek_memory(start.wrapping_add(i as u16)))
            .collect()
    }
}
