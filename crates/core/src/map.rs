//! # メモリマップ
//!
//! バスのアドレス窓、ミラー範囲、割り込みベクタ、スタックページを
//! 一つの設定値にまとめたもの。JSONなどから読み込んで別のマップを差し込める。

use crate::memory::MemoryRange;
use crate::{NesError, Result};
use serde::{Deserialize, Serialize};

/// CPUから見たアドレス空間の配置
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryMap {
    /// ゼロページ + スタック ($0000-$01FF)
    pub zero_page: MemoryRange,
    /// スタックページの先頭 ($0100)
    pub stack_page: u16,
    /// 内部RAM ($0200-$07FF)
    pub ram: MemoryRange,
    /// 内部RAMのミラー ($0800-$1FFF)
    pub ram_mirror: MemoryRange,
    /// PPUレジスタ ($2000-$2007)
    pub ppu_registers: MemoryRange,
    /// PPUレジスタのミラー ($2008-$3FFF、8バイト周期)
    pub ppu_mirror: MemoryRange,
    /// APU/IOレジスタ ($4000-$4017)
    pub apu_registers: MemoryRange,
    /// APUのチャンネルステータスレジスタ ($4015)
    pub apu_status: u16,
    /// APUのフレームカウンタ ($4017)
    pub frame_counter: u16,
    /// カートリッジ窓全体 ($4020-$FFFF)
    pub cartridge: MemoryRange,
    /// カートリッジRAM ($6000-$7FFF)
    pub prg_ram: MemoryRange,
    /// PRG ROM、16KBバンク2枚 ($8000-$FFFF)
    pub prg_rom: MemoryRange,
    pub nmi_vector: u16,
    pub reset_vector: u16,
    pub irq_vector: u16,
}

impl MemoryMap {
    pub const NES: MemoryMap = MemoryMap {
        zero_page: MemoryRange::fixed(0x0000, 0x01FF),
        stack_page: 0x0100,
        ram: MemoryRange::fixed(0x0200, 0x07FF),
        ram_mirror: MemoryRange::fixed(0x0800, 0x1FFF),
        ppu_registers: MemoryRange::fixed(0x2000, 0x2007),
        ppu_mirror: MemoryRange::fixed(0x2008, 0x3FFF),
        apu_registers: MemoryRange::fixed(0x4000, 0x4017),
        apu_status: 0x4015,
        frame_counter: 0x4017,
        cartridge: MemoryRange::fixed(0x4020, 0xFFFF),
        prg_ram: MemoryRange::fixed(0x6000, 0x7FFF),
        prg_rom: MemoryRange::fixed(0x8000, 0xFFFF),
        nmi_vector: 0xFFFA,
        reset_vector: 0xFFFC,
        irq_vector: 0xFFFE,
    };

    /// バスがデコードする窓（低いアドレス順）
    pub fn windows(&self) -> [MemoryRange; 7] {
        [
            self.zero_page,
            self.ram,
            self.ram_mirror,
            self.ppu_registers,
            self.ppu_mirror,
            self.apu_registers,
            self.cartridge,
        ]
    }

    /// 電源投入時に0を書き込むAPUレジスタ
    ///
    /// チャンネルレジスタ ($4000-$4013)、チャンネルステータス、フレームカウンタ。
    pub fn silent_apu_registers(&self) -> impl Iterator<Item = u16> {
        let start = self.apu_registers.start();
        (start..=start.saturating_add(0x13)).chain([self.apu_status, self.frame_counter])
    }

    /// 範囲の整合性と窓同士の重なりを検査
    pub fn validate(&self) -> Result<()> {
        let windows = self.windows();
        for range in windows.iter().chain([&self.prg_ram, &self.prg_rom]) {
            range.validate()?;
        }

        for (i, first) in windows.iter().enumerate() {
            for second in &windows[i + 1..] {
                if first.intersects(second) {
                    return Err(NesError::OverlappingRanges {
                        first: *first,
                        second: *second,
                    });
                }
            }
        }

        for bank in [self.prg_ram, self.prg_rom] {
            if !self.cartridge.contains_range(&bank) {
                return Err(self.cartridge.out_of_range(bank.start()));
            }
        }
        if self.prg_ram.intersects(&self.prg_rom) {
            return Err(NesError::OverlappingRanges {
                first: self.prg_ram,
                second: self.prg_rom,
            });
        }

        if !self.zero_page.contains(self.stack_page)
            || !self.zero_page.contains(self.stack_page | 0x00FF)
        {
            return Err(self.zero_page.out_of_range(self.stack_page | 0x00FF));
        }

        for address in self.silent_apu_registers() {
            if !self.apu_registers.contains(address) {
                return Err(self.apu_registers.out_of_range(address));
            }
        }

        for vector in [self.nmi_vector, self.reset_vector, self.irq_vector] {
            if !self.prg_rom.contains(vector) || !self.prg_rom.contains(vector.wrapping_add(1)) {
                return Err(self.prg_rom.out_of_range(vector));
            }
        }

        Ok(())
    }
}

impl Default for MemoryMap {
    fn default() -> Self {
        MemoryMap::NES
    }
}
